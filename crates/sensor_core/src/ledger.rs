//! Ledger de créditos de carbono (variante burner).
//!
//! A cada tick, nesta ordem: [`CreditLedger::auto_purchase`] e depois
//! [`CreditLedger::burn_for_offset`]. Nenhuma operação falha e o saldo
//! disponível nunca fica negativo.

use crate::config::LedgerConfig;
use tracing::info;

/// Acima deste CO2 (ppm) o excesso consome créditos.
pub const BURN_BASELINE_CO2: i32 = 1000;

/// ppm acima da linha de base por crédito queimado (0.001 crédito/ppm).
pub const PPM_PER_CREDIT: f64 = 1000.0;

/// Queimas menores que isto são ignoradas (ruído).
pub const MIN_BURN: f64 = 0.01;

#[derive(Debug, Clone, PartialEq)]
pub struct CreditLedger {
    available: f64,
    burned: f64,
    purchase_threshold: f64,
    purchase_amount: f64,
    auto_purchase: bool,
}

impl CreditLedger {
    pub fn new(config: &LedgerConfig) -> Self {
        Self {
            available: config.initial_credits.max(0.0),
            burned: 0.0,
            purchase_threshold: config.purchase_threshold,
            purchase_amount: config.purchase_amount,
            auto_purchase: config.auto_purchase,
        }
    }

    pub fn available(&self) -> f64 {
        self.available
    }

    pub fn burned(&self) -> f64 {
        self.burned
    }

    /// Compra um lote fixo quando o saldo cai abaixo do threshold.
    ///
    /// Retorna `true` se comprou. Um lote por chamada, sem completar até o threshold.
    /// Lote zero ou não finito nunca compra.
    pub fn auto_purchase(&mut self) -> bool {
        let lot_ok = self.purchase_amount.is_finite() && self.purchase_amount > 0.0;
        if !self.auto_purchase || !lot_ok || self.available >= self.purchase_threshold {
            return false;
        }
        self.available += self.purchase_amount;
        info!(
            "🛒 Compra automática: +{:.1} créditos. Total: {:.1}",
            self.purchase_amount, self.available
        );
        true
    }

    /// Queima créditos proporcionais ao CO2 acima de [`BURN_BASELINE_CO2`].
    ///
    /// Retorna quanto foi queimado (0.0 se nada).
    pub fn burn_for_offset(&mut self, co2: i32) -> f64 {
        if co2 <= BURN_BASELINE_CO2 || self.available <= 0.0 {
            return 0.0;
        }

        let excess = f64::from(co2 - BURN_BASELINE_CO2);
        let to_burn = (excess / PPM_PER_CREDIT).min(self.available);
        if to_burn <= MIN_BURN {
            return 0.0;
        }

        self.available = (self.available - to_burn).max(0.0);
        self.burned += to_burn;
        info!("🔥 Queimando {:.4} créditos para offset de CO2", to_burn);
        to_burn
    }
}
