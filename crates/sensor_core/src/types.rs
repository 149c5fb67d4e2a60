//! Tipos de dados do nó sensor: amostras, leituras derivadas e snapshots.

use serde::{Deserialize, Serialize};

// ──────────────────────────────────────────────
// Amostra
// ──────────────────────────────────────────────

/// Uma leitura bruta do par de sensores. Imutável depois de gerada.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sample {
    /// CO2 (ppm)
    pub co2: i32,
    /// Umidade relativa (%)
    pub humidity: i32,
}

impl Sample {
    pub fn new(co2: i32, humidity: i32) -> Self {
        Self { co2, humidity }
    }
}

// ──────────────────────────────────────────────
// Leitura derivada
// ──────────────────────────────────────────────

/// Amostra mais os números da economia de créditos calculados sobre ela.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Reading {
    pub sample: Sample,
    /// Créditos gerados (emitter/sequester) ou exigidos (burner)
    pub carbon_credits: f64,
    /// Emissões estimadas a partir da umidade
    pub emissions: f64,
    /// Créditos cobrem a leitura?
    pub offset: bool,
}

// ──────────────────────────────────────────────
// Estatísticas agregadas
// ──────────────────────────────────────────────

/// Min/max/média sobre a janela de amostras do buffer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AggregateStats {
    pub avg_co2: f64,
    pub max_co2: i32,
    pub min_co2: i32,
    pub avg_humidity: f64,
    pub max_humidity: i32,
    pub min_humidity: i32,
    /// Quantidade de amostras consideradas
    pub samples: usize,
}

// ──────────────────────────────────────────────
// Rede
// ──────────────────────────────────────────────

/// Identidade de rede e qualidade do link, reportadas pelo sink.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LinkInfo {
    pub ip: String,
    pub mac: String,
    /// Intensidade do sinal (dBm)
    pub rssi: i32,
}

/// Mensagem de controle recebida do broker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundMessage {
    pub topic: String,
    pub payload: Vec<u8>,
}

// ──────────────────────────────────────────────
// Display
// ──────────────────────────────────────────────

/// O que a tela mostra a cada tick.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct DisplaySnapshot {
    pub co2: i32,
    pub humidity: i32,
    /// Créditos disponíveis no ledger (somente burner)
    pub credits: Option<f64>,
    /// Créditos exigidos (burner) ou gerados (emitter/sequester)
    pub carbon_credits: f64,
    pub offset: bool,
    pub connected: bool,
}
