// Adapters layer: concrete implementations for external systems (send command, HTTP API, health client).

pub mod command;
pub mod health_client;
pub mod http;
