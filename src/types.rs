//! Core domain types shared across the pipeline

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A closed OHLC candle as delivered by the market data feed.
///
/// Prices stay in their wire form (decimal strings) until a consumer parses
/// them; the strategy treats an unparseable price as "no signal" rather than
/// a fault.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Candle {
    /// Instrument symbol (e.g. "BTCUSDT")
    pub symbol: String,
    /// Timeframe tag (e.g. "3m")
    pub timeframe: String,
    /// Open price, decimal string
    pub open: String,
    /// High price, decimal string
    pub high: String,
    /// Low price, decimal string
    pub low: String,
    /// Close price, decimal string
    pub close: String,
    /// Candle close time
    pub close_time: DateTime<Utc>,
}

impl Candle {
    pub fn new(symbol: &str, timeframe: &str, open: &str, high: &str, low: &str, close: &str) -> Self {
        Self {
            symbol: symbol.to_string(),
            timeframe: timeframe.to_string(),
            open: open.to_string(),
            high: high.to_string(),
            low: low.to_string(),
            close: close.to_string(),
            close_time: Utc::now(),
        }
    }
}

/// Side of an open position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PositionSide {
    Long,
    Short,
    Flat,
}

/// Read-only view of a position, supplied by the caller per call.
/// The pipeline never mutates or persists it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PositionSnapshot {
    pub symbol: String,
    pub side: PositionSide,
    pub size: Decimal,
    pub entry_price: Decimal,
}

impl PositionSnapshot {
    /// A flat (no position) snapshot for a symbol
    pub fn flat(symbol: &str) -> Self {
        Self {
            symbol: symbol.to_string(),
            side: PositionSide::Flat,
            size: Decimal::ZERO,
            entry_price: Decimal::ZERO,
        }
    }
}

/// Trade action proposed by a strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum IntentAction {
    OpenLong,
    OpenShort,
    ClosePosition,
}

impl std::fmt::Display for IntentAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::OpenLong => write!(f, "OPEN_LONG"),
            Self::OpenShort => write!(f, "OPEN_SHORT"),
            Self::ClosePosition => write!(f, "CLOSE_POSITION"),
        }
    }
}

/// A proposed trade, not yet risk-checked or executed.
///
/// Intents are immutable value objects: once emitted they are consumed or
/// discarded, never edited.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StrategyIntent {
    pub symbol: String,
    pub action: IntentAction,
    /// Order quantity, serialized as a decimal string
    #[serde(with = "rust_decimal::serde::str")]
    pub quantity: Decimal,
    /// Human-readable reason the strategy emitted this intent
    pub reason: String,
    /// Order may only decrease, never increase, position size
    #[serde(default)]
    pub reduce_only: bool,
    /// Caller-supplied correlation id; the bus generates one when absent
    pub correlation_id: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl StrategyIntent {
    pub fn new(symbol: &str, action: IntentAction, quantity: Decimal, reason: &str) -> Self {
        Self {
            symbol: symbol.to_string(),
            action,
            quantity,
            reason: reason.to_string(),
            reduce_only: false,
            correlation_id: None,
            created_at: Utc::now(),
        }
    }

    pub fn reduce_only(mut self) -> Self {
        self.reduce_only = true;
        self
    }

    pub fn with_correlation_id(mut self, id: &str) -> Self {
        self.correlation_id = Some(id.to_string());
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderSide {
    Buy,
    Sell,
}

impl std::fmt::Display for OrderSide {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Buy => write!(f, "BUY"),
            Self::Sell => write!(f, "SELL"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
    New,
    Filled,
    Rejected,
}

/// Order request handed to the exchange adapter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderRequest {
    pub symbol: String,
    pub side: OrderSide,
    #[serde(with = "rust_decimal::serde::str")]
    pub quantity: Decimal,
    /// Client order id, also the correlation id of the intent chain
    pub client_order_id: String,
    #[serde(default)]
    pub reduce_only: bool,
}

/// Result reported back by the exchange adapter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderResult {
    pub order_id: String,
    pub status: OrderStatus,
    pub symbol: String,
    pub client_order_id: String,
}
