//! Estado da conexão com o broker e política de reconexão.
//!
//! Reconexões acontecem só aqui, em backoff fixo. Os canais de
//! publicação apenas consultam [`ConnectionState::is_connected`].

use crate::schedule::Schedule;
use crate::sink::{Credentials, TelemetrySink};
use crate::types::InboundMessage;
use tracing::{info, warn};

#[derive(Debug, Clone)]
pub struct ConnectionState {
    connected: bool,
    retry: Schedule,
    client_id: String,
    credentials: Credentials,
    command_topic: String,
}

impl ConnectionState {
    pub fn new(
        client_id: impl Into<String>,
        credentials: Credentials,
        command_topic: impl Into<String>,
        retry_interval_ms: u64,
    ) -> Self {
        Self {
            connected: false,
            retry: Schedule::periodic(retry_interval_ms),
            client_id: client_id.into(),
            credentials,
            command_topic: command_topic.into(),
        }
    }

    pub fn is_connected(&self) -> bool {
        self.connected
    }

    /// Tenta conectar agora e assina o tópico de comandos se conseguir.
    pub fn connect<S: TelemetrySink>(&mut self, now: u64, sink: &mut S) -> bool {
        self.retry.mark_fired(now);
        info!("🔌 Conectando ao broker como {}...", self.client_id);

        if sink.connect(&self.client_id, &self.credentials) {
            self.connected = true;
            info!("✅ Conectado ao broker");
            if !sink.subscribe(&self.command_topic) {
                warn!("Falha ao assinar {}", self.command_topic);
            }
        } else {
            self.connected = false;
            warn!(
                "❌ Conexão falhou, nova tentativa em {} ms",
                self.retry.interval_ms()
            );
        }
        self.connected
    }

    /// Passo de conexão do tick: reconecta no backoff ou processa mensagens recebidas.
    pub fn service<S: TelemetrySink>(&mut self, now: u64, sink: &mut S) -> Vec<InboundMessage> {
        if !sink.is_connected() {
            if self.connected {
                warn!("Conexão com o broker perdida");
                self.connected = false;
            }
            if self.retry.check(now) {
                self.connect(now, sink);
            }
            return Vec::new();
        }

        if !self.connected {
            self.connected = true;
            info!("✅ Conexão com o broker restaurada");
        }

        let messages = sink.poll();
        for msg in &messages {
            info!(
                "📩 Mensagem em [{}]: {}",
                msg.topic,
                String::from_utf8_lossy(&msg.payload)
            );
        }
        messages
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sink::testing::RecordingSink;

    fn state() -> ConnectionState {
        ConnectionState::new("node-1", Credentials::default(), "carbon/k/commands", 5_000)
    }

    #[test]
    fn connect_subscribes_to_commands() {
        let mut conn = state();
        let mut sink = RecordingSink::default();
        assert!(conn.connect(0, &mut sink));
        assert!(conn.is_connected());
        assert_eq!(sink.subscriptions, vec!["carbon/k/commands".to_string()]);
    }

    #[test]
    fn reconnect_waits_for_backoff() {
        let mut conn = state();
        let mut sink = RecordingSink {
            refuse_connect: true,
            ..Default::default()
        };
        assert!(!conn.connect(0, &mut sink));
        assert_eq!(sink.connect_attempts, 1);

        conn.service(1_000, &mut sink);
        conn.service(4_999, &mut sink);
        assert_eq!(sink.connect_attempts, 1);

        conn.service(5_000, &mut sink);
        assert_eq!(sink.connect_attempts, 2);
        assert!(!conn.is_connected());

        sink.refuse_connect = false;
        conn.service(10_000, &mut sink);
        assert_eq!(sink.connect_attempts, 3);
        assert!(conn.is_connected());
    }

    #[test]
    fn loss_is_detected_and_restoration_picked_up() {
        let mut conn = state();
        let mut sink = RecordingSink::default();
        conn.connect(0, &mut sink);

        sink.connected = false;
        sink.refuse_connect = true;
        conn.service(1_000, &mut sink);
        assert!(!conn.is_connected());

        // Broker volta sozinho (ex: reconexão do próprio cliente)
        sink.connected = true;
        conn.service(2_000, &mut sink);
        assert!(conn.is_connected());
    }

    #[test]
    fn inbound_messages_are_drained() {
        let mut conn = state();
        let mut sink = RecordingSink::default();
        conn.connect(0, &mut sink);
        sink.inbox.push(InboundMessage {
            topic: "carbon/k/commands".into(),
            payload: b"{\"cmd\":\"ping\"}".to_vec(),
        });

        let msgs = conn.service(1_000, &mut sink);
        assert_eq!(msgs.len(), 1);
        assert!(conn.service(2_000, &mut sink).is_empty());
    }
}
