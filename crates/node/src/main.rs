//! # Sensor Node
//!
//! Roda um nó sensor de carbono simulado: gera leituras, mantém o ledger
//! e publica agregados, alertas e heartbeats em um broker simulado.
//!
//! ## Uso
//! ```bash
//! sensor_node                          # Variante do node.toml
//! sensor_node --variant burner         # Força a variante
//! sensor_node --config ./outro.toml    # Outro arquivo de configuração
//! ```

mod sim;

use sensor_core::config::{NodeConfig, NodeVariant};
use sensor_core::protocol::Channel;
use sensor_core::scheduler::ChannelOutcome;
use sensor_core::Node;
use sim::{LogDisplay, SimulatedBroker};
use std::path::PathBuf;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

fn main() {
    // ── Logging ──
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    // ── Argumentos ──
    let args: Vec<String> = std::env::args().collect();
    let config_path = arg_value(&args, "--config")
        .map(PathBuf::from)
        .unwrap_or_else(NodeConfig::default_path);

    // ── Carregar config ──
    let mut config = NodeConfig::load(&config_path);

    // Salva config padrão se não existir
    if !config_path.exists() {
        if let Err(e) = config.save(&config_path) {
            warn!("Não foi possível salvar config padrão: {e}");
        }
    }

    if let Some(name) = arg_value(&args, "--variant") {
        match NodeVariant::parse(name) {
            Some(variant) => config.variant = variant,
            None => warn!("Variante desconhecida '{name}', usando {}", config.variant.as_str()),
        }
    }

    let errors = config.validate();
    if !errors.is_empty() {
        for e in &errors {
            error!("Configuração inválida: {e}");
        }
        std::process::exit(1);
    }

    let tick = Duration::from_millis(config.timing.tick_ms);
    let mut node = Node::new(&config);
    let mut broker = SimulatedBroker::new("192.168.4.20", "24:6F:28:3A:91:C4");
    let mut display = LogDisplay::new(match config.variant {
        NodeVariant::Emitter => "Carbon Credit Monitor",
        NodeVariant::Sequester => "Carbon Sequester",
        NodeVariant::Burner => "Gas Burner Monitor",
    });

    // ── Banner ──
    println!();
    println!("══════════════════════════════════════════════");
    println!("   🌱 SENSOR NODE – ATIVO (Rust)");
    println!("══════════════════════════════════════════════");
    println!("  Variante:  {}", config.variant.as_str());
    println!("  Broker:    {}", config.broker.client_id);
    println!("  Tópicos:   {}", node.state().scheduler.topics().primary(Channel::SensorData));
    println!("  Tick:      {} ms", config.timing.tick_ms);
    println!("══════════════════════════════════════════════");
    println!();

    let boot = Instant::now();
    if !node.start(0, &mut broker) {
        warn!("Conexão inicial falhou – nova tentativa no loop");
    }

    // ── Loop principal ──
    loop {
        let cycle_start = Instant::now();
        let now = boot.elapsed().as_millis() as u64;

        let report = node.tick(now, &mut broker, &mut display);
        for (name, outcome) in [
            ("agregado", &report.aggregate),
            ("alerta", &report.alert),
            ("heartbeat", &report.heartbeat),
        ] {
            if let ChannelOutcome::Failed(e) = outcome {
                debug!("Canal {name} sem entrega neste ciclo: {e}");
            }
        }
        if report.aggregate.is_published() {
            info!("Total publicado: {} mensagens", broker.published());
        }

        // Dormir pelo tempo restante do tick
        let elapsed = cycle_start.elapsed();
        if elapsed < tick {
            std::thread::sleep(tick - elapsed);
        }
    }
}

/// Valor que segue `flag` na linha de comando.
fn arg_value<'a>(args: &'a [String], flag: &str) -> Option<&'a str> {
    args.iter()
        .position(|a| a == flag)
        .and_then(|i| args.get(i + 1))
        .map(String::as_str)
}
