//! Gerador de amostras simuladas.

use crate::config::VariantConfig;
use crate::types::{Reading, Sample};
use rand::Rng;
use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing::info;

/// Produz uma amostra a cada `interval_ms`, sorteada nas faixas da variante.
#[derive(Debug)]
pub struct SampleGenerator<R = StdRng> {
    interval_ms: u64,
    last_update: u64,
    rng: R,
}

impl SampleGenerator<StdRng> {
    pub fn new(interval_ms: u64) -> Self {
        Self::with_rng(interval_ms, StdRng::from_entropy())
    }
}

impl<R: Rng> SampleGenerator<R> {
    pub fn with_rng(interval_ms: u64, rng: R) -> Self {
        Self {
            interval_ms,
            last_update: 0,
            rng,
        }
    }

    /// Gera uma nova amostra se o intervalo venceu. Caso contrário não faz nada.
    pub fn generate(&mut self, now: u64, variant: &VariantConfig) -> Option<Sample> {
        if now.saturating_sub(self.last_update) < self.interval_ms {
            return None;
        }
        self.last_update = now;

        Some(Sample {
            co2: self.rng.gen_range(variant.co2_min..=variant.co2_max),
            humidity: self.rng.gen_range(variant.humidity_min..=variant.humidity_max),
        })
    }
}

/// Calcula créditos, emissões e offset de uma amostra.
///
/// `available` é o saldo do ledger *antes* da compra/queima deste tick.
pub fn derive_reading(sample: Sample, variant: &VariantConfig, available: f64) -> Reading {
    let carbon_credits = f64::from(sample.co2) * variant.credit_multiplier;
    let emissions = f64::from(sample.humidity) * variant.emission_multiplier;
    let offset = variant
        .offset_policy
        .offset(carbon_credits, emissions, available);

    info!(
        "🔄 {} CO2:{} Hum:{} Créditos:{:.1} Emissões:{:.1} Offset:{}",
        variant.variant.as_str(),
        sample.co2,
        sample.humidity,
        carbon_credits,
        emissions,
        if offset { "SIM" } else { "NÃO" }
    );

    Reading {
        sample,
        carbon_credits,
        emissions,
        offset,
    }
}
