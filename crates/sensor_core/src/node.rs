//! Loop do nó: um tick amarra geração, display, ledger e os três canais.
//!
//! Ordem fixa do tick:
//!
//! 1. conexão (reconexão em backoff ou poll de comandos)
//! 2. geração de amostra + offset (saldo *antes* da compra/queima)
//! 3. render do display
//! 4. compra automática, depois queima (burner)
//! 5. canal agregado, canal de alerta, heartbeat
//!
//! Todo o estado mutável fica em [`NodeState`], dono único: o loop.

use crate::buffer::AggregationBuffer;
use crate::config::{NodeConfig, OffsetPolicy, VariantConfig};
use crate::connection::ConnectionState;
use crate::generator::{derive_reading, SampleGenerator};
use crate::ledger::CreditLedger;
use crate::protocol::{Channel, Topics};
use crate::scheduler::{PublicationScheduler, TickReport};
use crate::sink::{Credentials, DisplaySink, TelemetrySink};
use crate::types::{DisplaySnapshot, Reading};
use rand::rngs::StdRng;
use rand::Rng;

/// Estado completo do nó, passado explicitamente a cada componente.
#[derive(Debug)]
pub struct NodeState<R = StdRng> {
    pub generator: SampleGenerator<R>,
    pub buffer: AggregationBuffer,
    /// Só existe na variante burner
    pub ledger: Option<CreditLedger>,
    /// Última leitura gerada (zerada até a primeira amostra)
    pub reading: Reading,
    pub connection: ConnectionState,
    pub scheduler: PublicationScheduler,
}

pub struct Node<R = StdRng> {
    variant: VariantConfig,
    state: NodeState<R>,
}

impl Node<StdRng> {
    pub fn new(config: &NodeConfig) -> Self {
        Self::with_generator(
            config,
            SampleGenerator::new(config.timing.sample_interval_ms),
        )
    }
}

impl<R: Rng> Node<R> {
    pub fn with_generator(config: &NodeConfig, generator: SampleGenerator<R>) -> Self {
        let variant = config.variant_config();
        let api_key = variant
            .api_key_topics
            .then_some(config.broker.api_key.as_str());
        let topics = Topics::new(&config.broker.topic_prefix, api_key);

        let connection = ConnectionState::new(
            config.broker.client_id.clone(),
            Credentials {
                username: config.broker.username.clone(),
                password: config.broker.password.clone(),
            },
            topics.primary(Channel::Commands),
            config.timing.reconnect_interval_ms,
        );

        let state = NodeState {
            generator,
            buffer: AggregationBuffer::new(),
            ledger: variant.has_ledger.then(|| CreditLedger::new(&config.ledger)),
            reading: Reading::default(),
            connection,
            scheduler: PublicationScheduler::new(&config.timing, topics),
        };

        Self { variant, state }
    }

    pub fn variant(&self) -> &VariantConfig {
        &self.variant
    }

    pub fn state(&self) -> &NodeState<R> {
        &self.state
    }

    /// Conexão inicial, antes do primeiro tick.
    pub fn start<S: TelemetrySink>(&mut self, now: u64, sink: &mut S) -> bool {
        self.state.connection.connect(now, sink)
    }

    /// Executa um tick completo.
    pub fn tick<S, D>(&mut self, now: u64, sink: &mut S, display: &mut D) -> TickReport
    where
        S: TelemetrySink,
        D: DisplaySink,
    {
        let state = &mut self.state;

        state.connection.service(now, sink);

        if let Some(sample) = state.generator.generate(now, &self.variant) {
            state.buffer.push(sample);
            let available = state.ledger.as_ref().map_or(0.0, CreditLedger::available);
            state.reading = derive_reading(sample, &self.variant, available);
        }

        display.render(&DisplaySnapshot {
            co2: state.reading.sample.co2,
            humidity: state.reading.sample.humidity,
            credits: state.ledger.as_ref().map(CreditLedger::available),
            carbon_credits: state.reading.carbon_credits,
            offset: state.reading.offset,
            connected: state.connection.is_connected(),
        });

        if let Some(ledger) = state.ledger.as_mut() {
            ledger.auto_purchase();
            ledger.burn_for_offset(state.reading.sample.co2);
        }

        let connected = state.connection.is_connected();
        let credits_avail = state.ledger.as_ref().map(CreditLedger::available);

        let aggregate = state.scheduler.run_aggregate(
            now,
            sink,
            connected,
            &mut state.buffer,
            &state.reading,
            credits_avail,
            self.variant.payload_type,
        );

        let alert_credits = match self.variant.offset_policy {
            OffsetPolicy::AvailableVsRequired => credits_avail.unwrap_or(0.0),
            OffsetPolicy::CreditsVsEmissions => state.reading.carbon_credits,
        };
        let alert = state.scheduler.run_alert(
            now,
            sink,
            connected,
            state.reading.sample.co2,
            alert_credits,
            self.variant.alerts.as_ref(),
        );

        let heartbeat = state.scheduler.run_heartbeat(now, sink, connected);

        TickReport {
            aggregate,
            alert,
            heartbeat,
        }
    }
}

// ──────────────────────────────────────────────
// Testes
// ──────────────────────────────────────────────
