//! Sinks simulados para rodar o nó fora do hardware.
//!
//! - [`SimulatedBroker`] – aceita publicações e as registra no log
//! - [`LogDisplay`] – "desenha" a tela do OLED como uma linha de debug

use rand::Rng;
use sensor_core::{Credentials, DisplaySink, DisplaySnapshot, InboundMessage, LinkInfo, TelemetrySink};
use tracing::{debug, info};

/// Broker em memória. Conecta sempre, aceita tudo e loga cada publish.
pub struct SimulatedBroker {
    connected: bool,
    ip: String,
    mac: String,
    published: u64,
}

impl SimulatedBroker {
    pub fn new(ip: impl Into<String>, mac: impl Into<String>) -> Self {
        Self {
            connected: false,
            ip: ip.into(),
            mac: mac.into(),
            published: 0,
        }
    }

    pub fn published(&self) -> u64 {
        self.published
    }
}

impl TelemetrySink for SimulatedBroker {
    fn connect(&mut self, client_id: &str, credentials: &Credentials) -> bool {
        let user = if credentials.username.is_empty() {
            "anônimo"
        } else {
            credentials.username.as_str()
        };
        info!("Broker simulado: sessão {client_id} ({user})");
        self.connected = true;
        true
    }

    fn is_connected(&self) -> bool {
        self.connected
    }

    fn publish(&mut self, topic: &str, payload: &[u8]) -> bool {
        self.published += 1;
        info!(
            "→ {} bytes em {} | {}",
            payload.len(),
            topic,
            String::from_utf8_lossy(payload)
        );
        true
    }

    fn subscribe(&mut self, topic: &str) -> bool {
        info!("Assinando {topic}");
        true
    }

    fn poll(&mut self) -> Vec<InboundMessage> {
        Vec::new()
    }

    fn link_info(&self) -> LinkInfo {
        LinkInfo {
            ip: self.ip.clone(),
            mac: self.mac.clone(),
            // Sinal oscila como um link Wi-Fi real
            rssi: rand::thread_rng().gen_range(-78..=-52),
        }
    }
}

/// Display que imprime o conteúdo da tela no log.
pub struct LogDisplay {
    title: &'static str,
}

impl LogDisplay {
    pub fn new(title: &'static str) -> Self {
        Self { title }
    }
}

impl DisplaySink for LogDisplay {
    fn render(&mut self, s: &DisplaySnapshot) {
        let credits = match s.credits {
            Some(avail) => format!("{avail:.1}/{:.1}", s.carbon_credits),
            None => format!("{:.1}", s.carbon_credits),
        };
        debug!(
            "[{}] CO2: {} ppm | Umidade: {}% | Créditos: {} | Offset: {} | MQTT: {}",
            self.title,
            s.co2,
            s.humidity,
            credits,
            if s.offset { "SIM" } else { "NÃO" },
            if s.connected { "OK" } else { "ERR" }
        );
    }
}
