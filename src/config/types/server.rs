//! Server configuration types
//!
//! Listener address and browser origins allowed to open the stream.

use serde::{Deserialize, Serialize};

/// HTTP/WebSocket listener configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Bind address
    #[serde(default = "default_bind")]
    pub bind: String,
    /// Port to bind to
    #[serde(default = "default_port")]
    pub port: u16,
    /// Origins allowed by the CORS layer
    #[serde(default = "default_origins")]
    pub allowed_origins: Vec<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        ServerConfig {
            bind: default_bind(),
            port: default_port(),
            allowed_origins: default_origins(),
        }
    }
}

impl ServerConfig {
    /// `bind:port` for the listener
    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.bind, self.port)
    }
}

fn default_bind() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8001
}

fn default_origins() -> Vec<String> {
    [
        "http://localhost:5000",
        "http://127.0.0.1:5000",
        "http://localhost:3000",
        "http://127.0.0.1:3000",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}
