//! Protocolo de publicação: tópicos MQTT e payloads JSON.
//!
//! Tópicos:
//!
//! ```text
//! <prefixo>[/<api_key>]/sensor_data   agregados a cada 15 s
//! <prefixo>[/<api_key>]/alerts        alertas críticos (cooldown 30 s)
//! <prefixo>[/<api_key>]/heartbeat     status a cada 5 min
//! <prefixo>[/<api_key>]/commands      assinatura de comandos
//! ```
//!
//! O tópico de fallback é o mesmo sem o segmento da API key.
//!
//! Cada canal tem um tamanho máximo de payload (os buffers fixos do
//! dispositivo). Payload acima do limite é rejeitado inteiro,
//! nunca truncado.

use crate::alerts::Alert;
use crate::types::{AggregateStats, LinkInfo, Reading};
use serde::Serialize;

/// Limite do payload agregado (bytes).
pub const MAX_SENSOR_DATA_PAYLOAD: usize = 600;
/// Limite do payload de alerta (bytes).
pub const MAX_ALERT_PAYLOAD: usize = 400;
/// Limite do payload de heartbeat (bytes).
pub const MAX_HEARTBEAT_PAYLOAD: usize = 300;

/// Erros do protocolo.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    #[error("Erro de serialização: {0}")]
    Serialize(String),

    #[error("Payload muito grande ({size} bytes, máximo {max})")]
    PayloadTooLarge { size: usize, max: usize },
}

// ──────────────────────────────────────────────
// Tópicos
// ──────────────────────────────────────────────

/// Canal lógico de publicação.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Channel {
    SensorData,
    Alerts,
    Heartbeat,
    Commands,
}

impl Channel {
    pub fn suffix(&self) -> &'static str {
        match self {
            Channel::SensorData => "sensor_data",
            Channel::Alerts => "alerts",
            Channel::Heartbeat => "heartbeat",
            Channel::Commands => "commands",
        }
    }

    pub fn max_payload(&self) -> usize {
        match self {
            Channel::SensorData => MAX_SENSOR_DATA_PAYLOAD,
            Channel::Alerts => MAX_ALERT_PAYLOAD,
            Channel::Heartbeat | Channel::Commands => MAX_HEARTBEAT_PAYLOAD,
        }
    }

    /// Alertas e heartbeats tentam o tópico simples se o primário falhar.
    pub fn uses_fallback(&self) -> bool {
        matches!(self, Channel::Alerts | Channel::Heartbeat)
    }
}

/// Monta os nomes de tópico a partir do prefixo e da API key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Topics {
    prefix: String,
    api_key: Option<String>,
}

impl Topics {
    pub fn new(prefix: &str, api_key: Option<&str>) -> Self {
        Self {
            prefix: prefix.trim_end_matches('/').to_string(),
            api_key: api_key
                .map(str::trim)
                .filter(|k| !k.is_empty())
                .map(str::to_string),
        }
    }

    pub fn primary(&self, channel: Channel) -> String {
        match &self.api_key {
            Some(key) => format!("{}/{}/{}", self.prefix, key, channel.suffix()),
            None => self.fallback_topic(channel),
        }
    }

    /// Tópico sem API key. `None` quando já seria igual ao primário.
    pub fn fallback(&self, channel: Channel) -> Option<String> {
        self.api_key.as_ref().map(|_| self.fallback_topic(channel))
    }

    fn fallback_topic(&self, channel: Channel) -> String {
        format!("{}/{}", self.prefix, channel.suffix())
    }
}

// ──────────────────────────────────────────────
// Payloads
// ──────────────────────────────────────────────

/// Arredonda para uma casa decimal, igual a `%.1f`.
///
/// O formatter arredonda o valor decimal exato do `f64` (1.25 vira 1.2),
/// o que `(v * 10.0).round()` não faz.
pub fn round1(value: f64) -> f64 {
    format!("{value:.1}").parse().unwrap_or(value)
}

/// Payload do canal `sensor_data`.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct SensorDataPayload<'a> {
    pub ip: &'a str,
    pub mac: &'a str,
    pub avg_c: f64,
    pub max_c: i32,
    pub min_c: i32,
    pub avg_h: f64,
    pub max_h: i32,
    pub min_h: i32,
    pub cr: f64,
    pub e: f64,
    pub o: bool,
    pub t: u64,
    #[serde(rename = "type")]
    pub kind: &'a str,
    pub samples: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub credits_avail: Option<f64>,
}

impl<'a> SensorDataPayload<'a> {
    pub fn new(
        link: &'a LinkInfo,
        stats: &AggregateStats,
        reading: &Reading,
        credits_avail: Option<f64>,
        kind: &'a str,
        now: u64,
    ) -> Self {
        Self {
            ip: &link.ip,
            mac: &link.mac,
            avg_c: round1(stats.avg_co2),
            max_c: stats.max_co2,
            min_c: stats.min_co2,
            avg_h: round1(stats.avg_humidity),
            max_h: stats.max_humidity,
            min_h: stats.min_humidity,
            cr: round1(reading.carbon_credits),
            e: round1(reading.emissions),
            o: reading.offset,
            t: now,
            kind,
            samples: stats.samples,
            credits_avail: credits_avail.map(round1),
        }
    }
}

/// Payload do canal `alerts`.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct AlertPayload<'a> {
    pub ip: &'a str,
    pub mac: &'a str,
    pub alert_type: &'static str,
    pub message: &'static str,
    pub co2: i32,
    pub credits: f64,
    pub t: u64,
    #[serde(rename = "type")]
    pub kind: &'static str,
}

impl<'a> AlertPayload<'a> {
    pub fn new(link: &'a LinkInfo, alert: &Alert, now: u64) -> Self {
        Self {
            ip: &link.ip,
            mac: &link.mac,
            alert_type: alert.kind.as_str(),
            message: alert.kind.message(),
            co2: alert.co2,
            credits: round1(alert.credits),
            t: now,
            kind: "alert",
        }
    }
}

/// Payload do canal `heartbeat`.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct HeartbeatPayload<'a> {
    pub ip: &'a str,
    pub mac: &'a str,
    pub status: &'static str,
    pub uptime: u64,
    pub rssi: i32,
    pub t: u64,
    #[serde(rename = "type")]
    pub kind: &'static str,
}

impl<'a> HeartbeatPayload<'a> {
    pub fn new(link: &'a LinkInfo, now: u64) -> Self {
        Self {
            ip: &link.ip,
            mac: &link.mac,
            status: "online",
            uptime: now,
            rssi: link.rssi,
            t: now,
            kind: "heartbeat",
        }
    }
}

/// Serializa um payload em JSON e valida contra o limite do canal.
pub fn encode_payload<T: Serialize>(payload: &T, max: usize) -> Result<Vec<u8>, ProtocolError> {
    let body = serde_json::to_vec(payload).map_err(|e| ProtocolError::Serialize(e.to_string()))?;

    // Um byte do buffer fica reservado para o terminador
    if body.len() >= max {
        return Err(ProtocolError::PayloadTooLarge {
            size: body.len(),
            max,
        });
    }

    Ok(body)
}

// ──────────────────────────────────────────────
// Testes
// ──────────────────────────────────────────────
