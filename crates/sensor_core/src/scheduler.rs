//! Agendador de publicações – três canais independentes sobre um único sink.
//!
//! | Canal      | Relógio             | Intervalo padrão |
//! |------------|---------------------|------------------|
//! | agregado   | periódico           | 15 s             |
//! | alerta     | cooldown            | 30 s             |
//! | heartbeat  | periódico           | 5 min            |
//!
//! Canais periódicos reiniciam o relógio em toda checagem vencida, mesmo
//! quando a publicação falha. O alerta só reinicia quando dispara. Nada é
//! enfileirado: sem conexão a tentativa vira no-op e o canal espera o
//! próprio próximo ciclo.

use crate::alerts::evaluate_alert;
use crate::buffer::AggregationBuffer;
use crate::config::{AlertThresholds, TimingConfig};
use crate::protocol::{
    encode_payload, AlertPayload, Channel, HeartbeatPayload, ProtocolError, SensorDataPayload,
    Topics,
};
use crate::schedule::Schedule;
use crate::sink::TelemetrySink;
use crate::types::Reading;
use tracing::{error, info, warn};

/// Falhas de publicação. Nunca interrompem o loop.
#[derive(Debug, thiserror::Error)]
pub enum PublishError {
    #[error("Broker desconectado")]
    Disconnected,

    #[error(transparent)]
    Payload(#[from] ProtocolError),

    #[error("Broker rejeitou publish em {topic}")]
    Rejected { topic: String },
}

/// Resultado de um canal em um tick.
#[derive(Debug)]
pub enum ChannelOutcome {
    /// Relógio do canal não venceu
    NotDue,
    /// Venceu mas não havia o que publicar
    Idle,
    Published { topic: String },
    Failed(PublishError),
}

impl ChannelOutcome {
    pub fn is_published(&self) -> bool {
        matches!(self, ChannelOutcome::Published { .. })
    }
}

/// Resumo dos três canais em um tick.
#[derive(Debug)]
pub struct TickReport {
    pub aggregate: ChannelOutcome,
    pub alert: ChannelOutcome,
    pub heartbeat: ChannelOutcome,
}

#[derive(Debug, Clone)]
pub struct PublicationScheduler {
    aggregate: Schedule,
    alert: Schedule,
    heartbeat: Schedule,
    topics: Topics,
}

impl PublicationScheduler {
    pub fn new(timing: &TimingConfig, topics: Topics) -> Self {
        Self {
            aggregate: Schedule::periodic(timing.aggregate_interval_ms),
            alert: Schedule::cooldown(timing.alert_cooldown_ms),
            heartbeat: Schedule::periodic(timing.heartbeat_interval_ms),
            topics,
        }
    }

    pub fn topics(&self) -> &Topics {
        &self.topics
    }

    /// Canal agregado: publica o snapshot do buffer e o limpa se der certo.
    #[allow(clippy::too_many_arguments)]
    pub fn run_aggregate<S: TelemetrySink>(
        &mut self,
        now: u64,
        sink: &mut S,
        connected: bool,
        buffer: &mut AggregationBuffer,
        reading: &Reading,
        credits_avail: Option<f64>,
        kind: &str,
    ) -> ChannelOutcome {
        if !self.aggregate.check(now) {
            return ChannelOutcome::NotDue;
        }

        if !connected || !sink.is_connected() {
            warn!("❌ Broker desconectado – agregado ignorado ({} amostras retidas)", buffer.len());
            return ChannelOutcome::Failed(PublishError::Disconnected);
        }

        let Some(stats) = buffer.snapshot() else {
            info!("Nenhuma amostra para agregar");
            return ChannelOutcome::Idle;
        };

        let link = sink.link_info();
        let payload = SensorDataPayload::new(&link, &stats, reading, credits_avail, kind, now);
        let body = match encode_payload(&payload, Channel::SensorData.max_payload()) {
            Ok(body) => body,
            Err(e) => {
                error!("❌ Payload agregado descartado: {e}");
                return ChannelOutcome::Failed(e.into());
            }
        };

        match self.deliver(sink, Channel::SensorData, &body) {
            Ok(topic) => {
                info!("📊 Agregado publicado em {topic} ({} amostras)", stats.samples);
                buffer.reset();
                ChannelOutcome::Published { topic }
            }
            Err(e) => {
                error!("❌ Falha ao publicar agregado: {e}");
                ChannelOutcome::Failed(e)
            }
        }
    }

    /// Canal de alerta: avalia thresholds e dispara no máximo um alerta.
    pub fn run_alert<S: TelemetrySink>(
        &mut self,
        now: u64,
        sink: &mut S,
        connected: bool,
        co2: i32,
        credits: f64,
        thresholds: Option<&AlertThresholds>,
    ) -> ChannelOutcome {
        if !self.alert.check(now) {
            return ChannelOutcome::NotDue;
        }
        let Some(alert) = thresholds.and_then(|t| evaluate_alert(co2, credits, t)) else {
            return ChannelOutcome::Idle;
        };

        // Cooldown conta a partir do disparo, com ou sem entrega
        self.alert.mark_fired(now);

        if !connected || !sink.is_connected() {
            warn!("❌ Broker desconectado – alerta {} descartado", alert.kind.as_str());
            return ChannelOutcome::Failed(PublishError::Disconnected);
        }

        let link = sink.link_info();
        let body = match encode_payload(&AlertPayload::new(&link, &alert, now), Channel::Alerts.max_payload()) {
            Ok(body) => body,
            Err(e) => {
                error!("❌ Payload de alerta descartado: {e}");
                return ChannelOutcome::Failed(e.into());
            }
        };

        info!("🚨 Enviando alerta crítico: {}", alert.kind.as_str());
        match self.deliver(sink, Channel::Alerts, &body) {
            Ok(topic) => {
                info!("✅ ALERTA enviado: {} - {}", alert.kind.as_str(), alert.kind.message());
                ChannelOutcome::Published { topic }
            }
            Err(e) => {
                error!("❌ Falha ao publicar alerta: {e}");
                ChannelOutcome::Failed(e)
            }
        }
    }

    /// Canal de heartbeat: status do nó, incondicional se conectado.
    pub fn run_heartbeat<S: TelemetrySink>(
        &mut self,
        now: u64,
        sink: &mut S,
        connected: bool,
    ) -> ChannelOutcome {
        if !self.heartbeat.check(now) {
            return ChannelOutcome::NotDue;
        }
        if !connected || !sink.is_connected() {
            warn!("❌ Broker desconectado – heartbeat ignorado");
            return ChannelOutcome::Failed(PublishError::Disconnected);
        }

        let link = sink.link_info();
        let body = match encode_payload(&HeartbeatPayload::new(&link, now), Channel::Heartbeat.max_payload()) {
            Ok(body) => body,
            Err(e) => {
                error!("❌ Payload de heartbeat descartado: {e}");
                return ChannelOutcome::Failed(e.into());
            }
        };

        match self.deliver(sink, Channel::Heartbeat, &body) {
            Ok(topic) => {
                info!("💓 Heartbeat enviado");
                ChannelOutcome::Published { topic }
            }
            Err(e) => {
                error!("❌ Falha ao publicar heartbeat: {e}");
                ChannelOutcome::Failed(e)
            }
        }
    }

    /// Publica no tópico primário e, se o canal permitir, tenta uma vez o fallback.
    fn deliver<S: TelemetrySink>(
        &self,
        sink: &mut S,
        channel: Channel,
        body: &[u8],
    ) -> Result<String, PublishError> {
        let topic = self.topics.primary(channel);
        if sink.publish(&topic, body) {
            return Ok(topic);
        }

        if channel.uses_fallback() {
            if let Some(fallback) = self.topics.fallback(channel) {
                let ok = sink.publish(&fallback, body);
                info!("🔄 Fallback {fallback}: {}", if ok { "SUCESSO" } else { "FALHOU" });
                if ok {
                    return Ok(fallback);
                }
            }
        }

        Err(PublishError::Rejected { topic })
    }
}

// ──────────────────────────────────────────────
// Testes
// ──────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::MAX_SENSOR_DATA_PAYLOAD;
    use crate::sink::testing::RecordingSink;
    use crate::types::{LinkInfo, Sample};

    const BURNER: AlertThresholds = AlertThresholds {
        critical_co2: 2500,
        critical_credits: 5.0,
    };

    fn scheduler() -> PublicationScheduler {
        PublicationScheduler::new(&TimingConfig::default(), Topics::new("carbon", Some("k")))
    }

    fn filled(values: &[i32]) -> AggregationBuffer {
        let mut buf = AggregationBuffer::new();
        for &v in values {
            buf.push(Sample::new(v, 50));
        }
        buf
    }

    // ── Agregado ──

    #[test]
    fn aggregate_publishes_and_resets_buffer() {
        let mut s = scheduler();
        let mut sink = RecordingSink::connected();
        let mut buf = filled(&[400, 500, 600]);

        let out = s.run_aggregate(14_999, &mut sink, true, &mut buf, &Reading::default(), Some(50.0), "emitter");
        assert!(matches!(out, ChannelOutcome::NotDue));

        let out = s.run_aggregate(15_000, &mut sink, true, &mut buf, &Reading::default(), Some(50.0), "emitter");
        assert!(out.is_published());
        assert!(buf.is_empty());
        assert_eq!(sink.topics(), vec!["carbon/k/sensor_data"]);

        let v = sink.last_json();
        assert_eq!(v["avg_c"], 500.0);
        assert_eq!(v["max_c"], 600);
        assert_eq!(v["min_c"], 400);
        assert_eq!(v["samples"], 3);
        assert_eq!(v["credits_avail"], 50.0);
    }

    #[test]
    fn aggregate_disconnected_keeps_buffer() {
        let mut s = scheduler();
        let mut sink = RecordingSink::default();
        let mut buf = filled(&[900, 1000]);

        let out = s.run_aggregate(15_000, &mut sink, false, &mut buf, &Reading::default(), None, "emitter");
        assert!(matches!(out, ChannelOutcome::Failed(PublishError::Disconnected)));
        assert!(sink.attempts.is_empty());
        assert_eq!(buf.len(), 2);

        // Relógio reiniciou mesmo sem publicar
        sink.connected = true;
        let out = s.run_aggregate(29_999, &mut sink, true, &mut buf, &Reading::default(), None, "emitter");
        assert!(matches!(out, ChannelOutcome::NotDue));
        let out = s.run_aggregate(30_000, &mut sink, true, &mut buf, &Reading::default(), None, "emitter");
        assert!(out.is_published());
    }

    #[test]
    fn aggregate_rejection_keeps_buffer_without_fallback() {
        let mut s = scheduler();
        let mut sink = RecordingSink::connected();
        sink.reject("carbon/k/sensor_data");
        let mut buf = filled(&[1500]);

        let out = s.run_aggregate(15_000, &mut sink, true, &mut buf, &Reading::default(), None, "emitter");
        assert!(matches!(out, ChannelOutcome::Failed(PublishError::Rejected { .. })));
        assert_eq!(sink.attempts, vec!["carbon/k/sensor_data".to_string()]);
        assert_eq!(buf.len(), 1);
    }

    #[test]
    fn aggregate_overflow_keeps_buffer() {
        let mut s = scheduler();
        let mut sink = RecordingSink {
            link: Some(LinkInfo {
                ip: "10.0.0.7".into(),
                mac: "M".repeat(600),
                rssi: -60,
            }),
            ..RecordingSink::connected()
        };
        let mut buf = filled(&[1200, 1300]);

        let out = s.run_aggregate(15_000, &mut sink, true, &mut buf, &Reading::default(), Some(10.0), "emitter");
        assert!(matches!(
            out,
            ChannelOutcome::Failed(PublishError::Payload(ProtocolError::PayloadTooLarge {
                max: MAX_SENSOR_DATA_PAYLOAD,
                ..
            }))
        ));
        assert!(sink.attempts.is_empty());
        assert_eq!(buf.len(), 2);
    }

    #[test]
    fn aggregate_empty_buffer_is_idle() {
        let mut s = scheduler();
        let mut sink = RecordingSink::connected();
        let mut buf = AggregationBuffer::new();
        let out = s.run_aggregate(15_000, &mut sink, true, &mut buf, &Reading::default(), None, "emitter");
        assert!(matches!(out, ChannelOutcome::Idle));
        assert!(sink.attempts.is_empty());
    }

    // ── Alerta ──

    #[test]
    fn alert_respects_cooldown_after_firing() {
        let mut s = scheduler();
        let mut sink = RecordingSink::connected();

        let out = s.run_alert(30_000, &mut sink, true, 2700, 50.0, Some(&BURNER));
        assert!(out.is_published());
        assert_eq!(sink.last_json()["alert_type"], "HIGH_CO2");

        for now in (31_000..60_000).step_by(1_000) {
            let out = s.run_alert(now, &mut sink, true, 2900, 1.0, Some(&BURNER));
            assert!(matches!(out, ChannelOutcome::NotDue));
        }
        assert_eq!(sink.published.len(), 1);

        let out = s.run_alert(60_000, &mut sink, true, 900, 1.0, Some(&BURNER));
        assert!(out.is_published());
        assert_eq!(sink.last_json()["alert_type"], "LOW_CREDITS");
    }

    #[test]
    fn quiet_check_does_not_reset_cooldown() {
        let mut s = scheduler();
        let mut sink = RecordingSink::connected();

        let out = s.run_alert(30_000, &mut sink, true, 1200, 50.0, Some(&BURNER));
        assert!(matches!(out, ChannelOutcome::Idle));
        // Próximo tick já pode disparar
        let out = s.run_alert(31_000, &mut sink, true, 2600, 50.0, Some(&BURNER));
        assert!(out.is_published());
    }

    #[test]
    fn alert_while_disconnected_still_starts_cooldown() {
        let mut s = scheduler();
        let mut sink = RecordingSink::default();
        let out = s.run_alert(30_000, &mut sink, false, 2700, 50.0, Some(&BURNER));
        assert!(matches!(out, ChannelOutcome::Failed(PublishError::Disconnected)));

        sink.connected = true;
        let out = s.run_alert(31_000, &mut sink, true, 2700, 50.0, Some(&BURNER));
        assert!(matches!(out, ChannelOutcome::NotDue));
    }

    #[test]
    fn alert_falls_back_to_simple_topic() {
        let mut s = scheduler();
        let mut sink = RecordingSink::connected();
        sink.reject("carbon/k/alerts");

        let out = s.run_alert(30_000, &mut sink, true, 2700, 50.0, Some(&BURNER));
        match out {
            ChannelOutcome::Published { topic } => assert_eq!(topic, "carbon/alerts"),
            other => panic!("esperava publish no fallback, veio {other:?}"),
        }
        assert_eq!(sink.attempts.len(), 2);
    }

    #[test]
    fn alert_gives_up_after_one_fallback() {
        let mut s = scheduler();
        let mut sink = RecordingSink::connected();
        sink.reject("carbon/k/alerts");
        sink.reject("carbon/alerts");

        let out = s.run_alert(30_000, &mut sink, true, 2700, 50.0, Some(&BURNER));
        assert!(matches!(out, ChannelOutcome::Failed(PublishError::Rejected { .. })));
        assert_eq!(sink.attempts.len(), 2);
    }

    #[test]
    fn variant_without_thresholds_never_alerts() {
        let mut s = scheduler();
        let mut sink = RecordingSink::connected();
        let out = s.run_alert(30_000, &mut sink, true, 5000, 0.0, None);
        assert!(matches!(out, ChannelOutcome::Idle));
    }

    // ── Heartbeat ──

    #[test]
    fn heartbeat_every_five_minutes() {
        let mut s = scheduler();
        let mut sink = RecordingSink::connected();
        assert!(matches!(s.run_heartbeat(299_999, &mut sink, true), ChannelOutcome::NotDue));
        assert!(s.run_heartbeat(300_000, &mut sink, true).is_published());
        let v = sink.last_json();
        assert_eq!(v["uptime"], 300_000);
        assert_eq!(v["rssi"], -55);
        assert!(matches!(s.run_heartbeat(300_001, &mut sink, true), ChannelOutcome::NotDue));
    }

    #[test]
    fn heartbeat_without_api_key_has_no_fallback() {
        let mut s = PublicationScheduler::new(&TimingConfig::default(), Topics::new("carbon", None));
        let mut sink = RecordingSink::connected();
        sink.reject("carbon/heartbeat");
        let out = s.run_heartbeat(300_000, &mut sink, true);
        assert!(matches!(out, ChannelOutcome::Failed(PublishError::Rejected { .. })));
        assert_eq!(sink.attempts.len(), 1);
    }
}
