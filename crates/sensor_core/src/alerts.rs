//! Sistema de alertas – tipos e avaliação de thresholds críticos.

use crate::config::AlertThresholds;
use serde::{Deserialize, Serialize};

/// Tipo de alerta crítico.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AlertKind {
    HighCo2,
    LowCredits,
}

impl AlertKind {
    /// Valor do campo `alert_type` no payload.
    pub fn as_str(&self) -> &'static str {
        match self {
            AlertKind::HighCo2 => "HIGH_CO2",
            AlertKind::LowCredits => "LOW_CREDITS",
        }
    }

    pub fn message(&self) -> &'static str {
        match self {
            AlertKind::HighCo2 => "Dangerous CO2 levels detected!",
            AlertKind::LowCredits => "Critical low carbon credits!",
        }
    }
}

/// Um alerta disparado.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Alert {
    pub kind: AlertKind,
    pub co2: i32,
    pub credits: f64,
}

/// Avalia CO2 e créditos contra os thresholds.
///
/// No máximo um alerta: CO2 alto tem prioridade sobre créditos baixos.
pub fn evaluate_alert(co2: i32, credits: f64, thresholds: &AlertThresholds) -> Option<Alert> {
    let kind = if co2 > thresholds.critical_co2 {
        AlertKind::HighCo2
    } else if credits < thresholds.critical_credits {
        AlertKind::LowCredits
    } else {
        return None; // Normal, não gera alerta
    };

    Some(Alert { kind, co2, credits })
}
