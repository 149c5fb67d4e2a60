//! Configuração unificada via TOML.
//!
//! Um único `node.toml` define a variante, o broker, os intervalos e o
//! ledger. Faixas, multiplicadores e thresholds de cada variante vêm de
//! [`VariantConfig::preset`].

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

// ──────────────────────────────────────────────
// Variantes
// ──────────────────────────────────────────────

/// Variante do nó.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeVariant {
    #[default]
    Emitter,
    Sequester,
    Burner,
}

impl NodeVariant {
    pub fn as_str(&self) -> &'static str {
        match self {
            NodeVariant::Emitter => "emitter",
            NodeVariant::Sequester => "sequester",
            NodeVariant::Burner => "burner",
        }
    }

    pub fn parse(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "emitter" => Some(NodeVariant::Emitter),
            "sequester" => Some(NodeVariant::Sequester),
            "burner" => Some(NodeVariant::Burner),
            _ => None,
        }
    }
}

/// Como o `offset` é calculado a partir da leitura.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OffsetPolicy {
    /// Créditos gerados >= emissões
    CreditsVsEmissions,
    /// Créditos disponíveis no ledger >= créditos exigidos
    AvailableVsRequired,
}

impl OffsetPolicy {
    pub fn offset(&self, carbon_credits: f64, emissions: f64, available: f64) -> bool {
        match self {
            OffsetPolicy::CreditsVsEmissions => carbon_credits >= emissions,
            OffsetPolicy::AvailableVsRequired => available >= carbon_credits,
        }
    }
}

/// Thresholds críticos que disparam alertas.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AlertThresholds {
    /// Dispara `HIGH_CO2` acima deste valor (ppm)
    pub critical_co2: i32,
    /// Dispara `LOW_CREDITS` abaixo deste valor
    pub critical_credits: f64,
}

/// Parâmetros que diferenciam as variantes.
#[derive(Debug, Clone, PartialEq)]
pub struct VariantConfig {
    pub variant: NodeVariant,
    pub co2_min: i32,
    pub co2_max: i32,
    pub humidity_min: i32,
    pub humidity_max: i32,
    pub credit_multiplier: f64,
    pub emission_multiplier: f64,
    pub offset_policy: OffsetPolicy,
    /// `None` = variante sem alertas
    pub alerts: Option<AlertThresholds>,
    /// Inclui o segmento da API key nos tópicos
    pub api_key_topics: bool,
    /// Campo `type` do payload agregado
    pub payload_type: &'static str,
    /// Variante mantém um ledger de créditos
    pub has_ledger: bool,
}

impl VariantConfig {
    pub fn preset(variant: NodeVariant) -> Self {
        match variant {
            NodeVariant::Emitter => Self {
                variant,
                co2_min: 300,
                co2_max: 2000,
                humidity_min: 20,
                humidity_max: 80,
                credit_multiplier: 0.5,
                emission_multiplier: 0.2,
                offset_policy: OffsetPolicy::CreditsVsEmissions,
                alerts: None,
                api_key_topics: false,
                payload_type: "emitter",
                has_ledger: false,
            },
            NodeVariant::Sequester => Self {
                variant,
                co2_min: 300,
                co2_max: 2000,
                humidity_min: 20,
                humidity_max: 80,
                credit_multiplier: 0.5,
                emission_multiplier: 0.2,
                offset_policy: OffsetPolicy::CreditsVsEmissions,
                alerts: Some(AlertThresholds {
                    critical_co2: 1800,
                    critical_credits: 2.0,
                }),
                api_key_topics: true,
                payload_type: "sequester",
                has_ledger: false,
            },
            NodeVariant::Burner => Self {
                variant,
                co2_min: 800,
                co2_max: 3000,
                humidity_min: 40,
                humidity_max: 90,
                credit_multiplier: 0.8,
                emission_multiplier: 0.3,
                offset_policy: OffsetPolicy::AvailableVsRequired,
                alerts: Some(AlertThresholds {
                    critical_co2: 2500,
                    critical_credits: 5.0,
                }),
                api_key_topics: true,
                // O backend classifica burners como emissores
                payload_type: "emitter",
                has_ledger: true,
            },
        }
    }
}

// ──────────────────────────────────────────────
// Seções do arquivo
// ──────────────────────────────────────────────

/// Conexão com o broker MQTT.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BrokerConfig {
    pub client_id: String,
    pub username: String,
    pub password: String,
    /// Prefixo de todos os tópicos
    pub topic_prefix: String,
    /// Segmento extra nos tópicos (sequester/burner)
    pub api_key: String,
}

impl Default for BrokerConfig {
    fn default() -> Self {
        Self {
            client_id: "carbon-node-01".into(),
            username: String::new(),
            password: String::new(),
            topic_prefix: "carbon".into(),
            api_key: String::new(),
        }
    }
}

/// Intervalos do loop e dos canais (ms).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TimingConfig {
    pub tick_ms: u64,
    pub sample_interval_ms: u64,
    pub aggregate_interval_ms: u64,
    pub alert_cooldown_ms: u64,
    pub heartbeat_interval_ms: u64,
    pub reconnect_interval_ms: u64,
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            tick_ms: 1_000,
            sample_interval_ms: 2_000,
            aggregate_interval_ms: 15_000,
            alert_cooldown_ms: 30_000,
            heartbeat_interval_ms: 300_000,
            reconnect_interval_ms: 5_000,
        }
    }
}

/// Estado inicial e regras de compra do ledger (burner).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LedgerConfig {
    pub initial_credits: f64,
    pub purchase_threshold: f64,
    pub purchase_amount: f64,
    pub auto_purchase: bool,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            initial_credits: 50.0,
            purchase_threshold: 10.0,
            purchase_amount: 100.0,
            auto_purchase: true,
        }
    }
}

/// Configuração raiz do nó.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct NodeConfig {
    pub variant: NodeVariant,
    pub broker: BrokerConfig,
    pub timing: TimingConfig,
    pub ledger: LedgerConfig,
}

impl NodeConfig {
    /// Parâmetros da variante configurada.
    pub fn variant_config(&self) -> VariantConfig {
        VariantConfig::preset(self.variant)
    }

    /// Carrega configuração de um arquivo TOML.
    pub fn load(path: &Path) -> Self {
        if path.exists() {
            match std::fs::read_to_string(path) {
                Ok(content) => match toml::from_str::<NodeConfig>(&content) {
                    Ok(config) => {
                        info!("Configuração carregada de {}", path.display());
                        return config;
                    }
                    Err(e) => {
                        warn!("Erro ao parsear {}: {}", path.display(), e);
                    }
                },
                Err(e) => {
                    warn!("Erro ao ler {}: {}", path.display(), e);
                }
            }
        }

        info!("Usando configuração padrão");
        NodeConfig::default()
    }

    /// Salva configuração em arquivo TOML.
    pub fn save(&self, path: &Path) -> Result<(), String> {
        let content = toml::to_string_pretty(self).map_err(|e| e.to_string())?;
        std::fs::write(path, content).map_err(|e| e.to_string())?;
        info!("Configuração salva em {}", path.display());
        Ok(())
    }

    /// Retorna o caminho padrão do node.toml (ao lado do executável).
    pub fn default_path() -> PathBuf {
        let exe_dir = std::env::current_exe()
            .map(|p| p.parent().unwrap_or(Path::new(".")).to_path_buf())
            .unwrap_or_else(|_| PathBuf::from("."));
        exe_dir.join("node.toml")
    }

    /// Valida a configuração e retorna lista de erros.
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();
        let t = &self.timing;

        if t.tick_ms < 100 || t.tick_ms > 60_000 {
            errors.push(format!("Tick inválido: {} ms (100–60000)", t.tick_ms));
        }
        for (name, value) in [
            ("sample_interval_ms", t.sample_interval_ms),
            ("aggregate_interval_ms", t.aggregate_interval_ms),
            ("alert_cooldown_ms", t.alert_cooldown_ms),
            ("heartbeat_interval_ms", t.heartbeat_interval_ms),
            ("reconnect_interval_ms", t.reconnect_interval_ms),
        ] {
            if value == 0 {
                errors.push(format!("{name} não pode ser 0"));
            }
        }

        if self.broker.topic_prefix.trim().is_empty() {
            errors.push("Prefixo de tópico não pode ser vazio".into());
        }
        if self.broker.client_id.trim().is_empty() {
            errors.push("Client ID não pode ser vazio".into());
        }

        let l = &self.ledger;
        for (name, value) in [
            ("initial_credits", l.initial_credits),
            ("purchase_threshold", l.purchase_threshold),
            ("purchase_amount", l.purchase_amount),
        ] {
            if !value.is_finite() {
                errors.push(format!("{name} precisa ser um número finito"));
            } else if value < 0.0 {
                errors.push(format!("{name} não pode ser negativo"));
            }
        }
        // Compra de lote zero não aumentaria o saldo
        if l.purchase_amount == 0.0 {
            errors.push("purchase_amount precisa ser maior que 0".into());
        }

        errors
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        let config = NodeConfig::default();
        let errors = config.validate();
        assert!(errors.is_empty(), "Erros: {:?}", errors);
    }

    #[test]
    fn roundtrip_toml() {
        let config = NodeConfig {
            variant: NodeVariant::Burner,
            ..Default::default()
        };
        let toml_str = toml::to_string_pretty(&config).unwrap();
        let parsed: NodeConfig = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed.variant, NodeVariant::Burner);
        assert_eq!(parsed.broker.topic_prefix, config.broker.topic_prefix);
        assert_eq!(parsed.timing.heartbeat_interval_ms, 300_000);
    }

    #[test]
    fn partial_toml_uses_defaults() {
        let partial = r#"
variant = "sequester"

[broker]
api_key = "abc123"
"#;
        let config: NodeConfig = toml::from_str(partial).unwrap();
        assert_eq!(config.variant, NodeVariant::Sequester);
        assert_eq!(config.broker.api_key, "abc123");
        // Outros campos devem ter valor padrão
        assert_eq!(config.broker.topic_prefix, "carbon");
        assert_eq!(config.timing.aggregate_interval_ms, 15_000);
        assert_eq!(config.ledger.purchase_amount, 100.0);
    }

    #[test]
    fn rejects_zero_intervals_and_empty_prefix() {
        let mut config = NodeConfig::default();
        config.timing.alert_cooldown_ms = 0;
        config.timing.tick_ms = 10;
        config.broker.topic_prefix = "  ".into();
        let errors = config.validate();
        assert_eq!(errors.len(), 3, "Erros: {:?}", errors);
    }

    #[test]
    fn rejects_zero_purchase_amount() {
        let mut config = NodeConfig::default();
        config.ledger.purchase_amount = 0.0;
        let errors = config.validate();
        assert_eq!(errors.len(), 1, "Erros: {:?}", errors);
        assert!(errors[0].contains("purchase_amount"));
    }

    #[test]
    fn rejects_non_finite_ledger_values() {
        let partial = r#"
[ledger]
initial_credits = nan
purchase_threshold = nan
purchase_amount = inf
"#;
        let config: NodeConfig = toml::from_str(partial).unwrap();
        let errors = config.validate();
        assert_eq!(errors.len(), 3, "Erros: {:?}", errors);
        assert!(errors.iter().all(|e| e.contains("finito")));
    }

    #[test]
    fn rejects_negative_ledger_values() {
        let mut config = NodeConfig::default();
        config.ledger.initial_credits = -1.0;
        config.ledger.purchase_threshold = -0.5;
        let errors = config.validate();
        assert_eq!(errors.len(), 2, "Erros: {:?}", errors);
    }

    #[test]
    fn presets_match_variant_table() {
        let burner = VariantConfig::preset(NodeVariant::Burner);
        assert_eq!((burner.co2_min, burner.co2_max), (800, 3000));
        assert_eq!((burner.humidity_min, burner.humidity_max), (40, 90));
        assert_eq!(burner.offset_policy, OffsetPolicy::AvailableVsRequired);
        assert!(burner.has_ledger);

        let seq = VariantConfig::preset(NodeVariant::Sequester);
        assert_eq!(seq.alerts.unwrap().critical_co2, 1800);
        assert!(!seq.has_ledger);

        let emitter = VariantConfig::preset(NodeVariant::Emitter);
        assert!(emitter.alerts.is_none());
        assert!(!emitter.api_key_topics);
    }

    #[test]
    fn offset_policies() {
        let p = OffsetPolicy::CreditsVsEmissions;
        assert!(p.offset(150.0, 16.0, 0.0));
        assert!(!p.offset(10.0, 16.0, 1000.0));

        let p = OffsetPolicy::AvailableVsRequired;
        assert!(p.offset(800.0, 0.0, 800.0));
        assert!(!p.offset(800.0, 0.0, 50.0));
    }

    #[test]
    fn variant_names_parse() {
        assert_eq!(NodeVariant::parse("Burner"), Some(NodeVariant::Burner));
        assert_eq!(NodeVariant::parse("x"), None);
        assert_eq!(NodeVariant::Sequester.as_str(), "sequester");
    }
}
