//! # Sensor Core
//!
//! Núcleo dos nós sensores de carbono: geração de amostras, buffer de
//! agregação, ledger de créditos e publicação em três canais (agregado,
//! alerta, heartbeat) sobre um único sink de telemetria.
//!
//! ## Módulos
//! - [`types`] – Amostras, leituras derivadas e snapshots
//! - [`buffer`] – Buffer circular de 15 amostras com min/max/média
//! - [`generator`] – Gerador de amostras e derivação de créditos/offset
//! - [`ledger`] – Compra automática e queima de créditos (burner)
//! - [`schedule`] – Relógio de canal (periódico ou cooldown)
//! - [`alerts`] – Thresholds críticos e tipos de alerta
//! - [`protocol`] – Tópicos MQTT e payloads JSON com limite de tamanho
//! - [`config`] – Configuração unificada via TOML e presets por variante
//! - [`sink`] – Traits do broker de telemetria e do display
//! - [`connection`] – Reconexão em backoff fixo
//! - [`scheduler`] – Agendador dos três canais de publicação
//! - [`node`] – Tick do nó e estado explícito

pub mod types;
pub mod buffer;
pub mod generator;
pub mod ledger;
pub mod schedule;
pub mod alerts;
pub mod protocol;
pub mod config;
pub mod sink;
pub mod connection;
pub mod scheduler;
pub mod node;

// Re-exports convenientes
pub use config::{NodeConfig, NodeVariant, VariantConfig};
pub use node::{Node, NodeState};
pub use scheduler::{ChannelOutcome, TickReport};
pub use sink::{Credentials, DisplaySink, TelemetrySink};
pub use types::{DisplaySnapshot, InboundMessage, LinkInfo, Sample};
