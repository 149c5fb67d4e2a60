//! Interfaces com o mundo externo: broker de telemetria e display.
//!
//! O núcleo nunca fala com rede ou tela diretamente. O loop recebe
//! implementações destes traits e é o único a chamá-las.

use crate::types::{DisplaySnapshot, InboundMessage, LinkInfo};

/// Credenciais repassadas ao broker sem interpretação.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

/// Destino das publicações (cliente MQTT no dispositivo).
///
/// Todas as chamadas são síncronas e limitadas pelo timeout do próprio sink.
pub trait TelemetrySink {
    /// Tenta conectar. `true` se conectado ao final.
    fn connect(&mut self, client_id: &str, credentials: &Credentials) -> bool;

    fn is_connected(&self) -> bool;

    /// Publica um payload. `false` se o broker rejeitou.
    fn publish(&mut self, topic: &str, payload: &[u8]) -> bool;

    fn subscribe(&mut self, topic: &str) -> bool;

    /// Processa tráfego de entrada e devolve mensagens de controle recebidas.
    fn poll(&mut self) -> Vec<InboundMessage>;

    /// IP, MAC e RSSI atuais do link.
    fn link_info(&self) -> LinkInfo;
}

/// Tela local do nó.
pub trait DisplaySink {
    fn render(&mut self, snapshot: &DisplaySnapshot);
}
