//! Execution boundary traits
//!
//! The pipeline core never touches exchange wire formats; it consumes two
//! capabilities from its environment: an [`ExchangeAdapter`] that places
//! orders and a [`PortfolioView`] that supplies point-in-time portfolio
//! state for risk evaluation.

mod mock;

pub use mock::{FillMode, MockExchange, MockPortfolio, MockState};

use async_trait::async_trait;

use crate::error::Result;
use crate::risk::RiskContext;
use crate::types::{OrderRequest, OrderResult, PositionSnapshot};

/// Order placement capability (allows mocking).
///
/// May fail with a transport-level error; the executor converts that into an
/// `ORDER_REJECTED` event rather than letting it propagate.
#[async_trait]
pub trait ExchangeAdapter: Send + Sync {
    async fn place_order(&self, request: &OrderRequest) -> Result<OrderResult>;
}

/// Portfolio-state provider (allows mocking).
///
/// Both methods return fresh snapshots; the pipeline never caches them.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PortfolioView: Send + Sync {
    /// Risk context for a symbol: open position count, leverage, notional
    async fn risk_context(&self, symbol: &str) -> Result<RiskContext>;

    /// Current position on a symbol, flat if none
    async fn position(&self, symbol: &str) -> Result<PositionSnapshot>;
}
