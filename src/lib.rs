//! # Storefront Relay
//!
//! A low-latency WebSocket relay between storefront clients and a live
//! conversational agent engine.
//!
//! ## Features
//!
//! - **Two pumps per session:** client to engine and engine to client, supervised with cooperative cancellation
//! - **Event classifier:** engine output normalized by an explicit priority table into wire frames
//! - **Rate gate:** per-session fixed-window throttle in front of the engine
//! - **Tool guard:** identity binding, argument normalization and deterministic short-circuits
//! - **Deferred UI commands:** staged tool results delivered ahead of the next turn

pub mod agent;
pub mod config;
pub mod error;
pub mod gateway;
pub mod relay;
pub mod tools;

pub use config::Config;
pub use error::{Error, Result};

/// Application version from Cargo.toml
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Application name
pub const NAME: &str = env!("CARGO_PKG_NAME");
