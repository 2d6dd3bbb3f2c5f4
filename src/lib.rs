//! Event-Driven Momentum Trading Pipeline
//!
//! A typed publish/subscribe event bus, a pre-trade risk gate, and a
//! stateless strategy signal generator that turn closed candles into
//! risk-checked order intents.

pub mod config;
pub mod error;
pub mod events;
pub mod exchange;
pub mod executor;
pub mod monitor;
pub mod risk;
pub mod strategy;
pub mod types;
