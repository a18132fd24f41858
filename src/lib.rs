//! Fish Arena Server Library
//!
//! Server-authoritative simulation core for an "eat smaller, avoid bigger"
//! arena: fixed-step scheduling, collision and growth, NPC and powerup
//! populations, and bots.
//!
//! # Features
//!
//! - `metrics` - Prometheus HTTP endpoint (enabled by default)

pub mod config;
pub mod game;
pub mod metrics;
pub mod net;
pub mod server;
pub mod util;
