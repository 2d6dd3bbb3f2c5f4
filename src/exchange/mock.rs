//! Mock exchange for testing and paper trading
//!
//! Provides mock implementations of the execution boundary for:
//! - Unit tests without network calls
//! - Integration tests with controlled responses
//! - Paper-trading sessions

use async_trait::async_trait;
use parking_lot::RwLock;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::error::{BotError, Result};
use crate::exchange::{ExchangeAdapter, PortfolioView};
use crate::risk::RiskContext;
use crate::types::{
    OrderRequest, OrderResult, OrderSide, OrderStatus, PositionSide, PositionSnapshot,
};

/// How the mock responds to placed orders.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FillMode {
    /// Every order fills immediately at the mark price
    Fill,
    /// Every order is acknowledged but rejected by the exchange
    Reject,
    /// Every order fails with a transport-level error
    TransportError,
}

/// Mock state for tracking simulated trades
#[derive(Debug, Clone, Default)]
pub struct MockState {
    /// Every request that reached the adapter, in arrival order
    pub orders: Vec<OrderRequest>,
    /// Simulated open positions by symbol
    pub positions: HashMap<String, PositionSnapshot>,
    pub fills: u32,
}

/// Mock exchange adapter for testing
pub struct MockExchange {
    state: Arc<RwLock<MockState>>,
    mode: FillMode,
    mark_price: Decimal,
    latency_ms: u64,
    next_order_id: AtomicU64,
}

impl Default for MockExchange {
    fn default() -> Self {
        Self::new()
    }
}

impl MockExchange {
    pub fn new() -> Self {
        Self {
            state: Arc::new(RwLock::new(MockState::default())),
            mode: FillMode::Fill,
            mark_price: dec!(100),
            latency_ms: 0,
            next_order_id: AtomicU64::new(1),
        }
    }

    pub fn with_rejections(mut self) -> Self {
        self.mode = FillMode::Reject;
        self
    }

    pub fn with_transport_errors(mut self) -> Self {
        self.mode = FillMode::TransportError;
        self
    }

    pub fn with_latency(mut self, ms: u64) -> Self {
        self.latency_ms = ms;
        self
    }

    pub fn with_mark_price(mut self, price: Decimal) -> Self {
        self.mark_price = price;
        self
    }

    pub fn state(&self) -> Arc<RwLock<MockState>> {
        self.state.clone()
    }

    fn apply_fill(&self, state: &mut MockState, request: &OrderRequest) {
        state.fills += 1;

        match (request.side, request.reduce_only) {
            // Reduce-only orders shrink or flatten the existing position,
            // whichever side it is on (sell closes a long, buy a short)
            (_, true) => {
                if let Some(position) = state.positions.get_mut(&request.symbol) {
                    position.size -= request.quantity;
                    if position.size <= Decimal::ZERO {
                        state.positions.remove(&request.symbol);
                    }
                }
            }
            (OrderSide::Buy, false) => {
                state.positions.insert(
                    request.symbol.clone(),
                    PositionSnapshot {
                        symbol: request.symbol.clone(),
                        side: PositionSide::Long,
                        size: request.quantity,
                        entry_price: self.mark_price,
                    },
                );
            }
            (OrderSide::Sell, false) => {
                state.positions.insert(
                    request.symbol.clone(),
                    PositionSnapshot {
                        symbol: request.symbol.clone(),
                        side: PositionSide::Short,
                        size: request.quantity,
                        entry_price: self.mark_price,
                    },
                );
            }
        }
    }
}

#[async_trait]
impl ExchangeAdapter for MockExchange {
    async fn place_order(&self, request: &OrderRequest) -> Result<OrderResult> {
        if self.latency_ms > 0 {
            tokio::time::sleep(std::time::Duration::from_millis(self.latency_ms)).await;
        }

        self.state.write().orders.push(request.clone());

        match self.mode {
            FillMode::TransportError => {
                Err(BotError::Exchange("simulated transport failure".to_string()))
            }
            FillMode::Reject => Ok(OrderResult {
                order_id: self.next_order_id.fetch_add(1, Ordering::Relaxed).to_string(),
                status: OrderStatus::Rejected,
                symbol: request.symbol.clone(),
                client_order_id: request.client_order_id.clone(),
            }),
            FillMode::Fill => {
                let mut state = self.state.write();
                self.apply_fill(&mut state, request);
                Ok(OrderResult {
                    order_id: self.next_order_id.fetch_add(1, Ordering::Relaxed).to_string(),
                    status: OrderStatus::Filled,
                    symbol: request.symbol.clone(),
                    client_order_id: request.client_order_id.clone(),
                })
            }
        }
    }
}

/// Portfolio provider backed by the mock exchange's simulated state.
pub struct MockPortfolio {
    state: Arc<RwLock<MockState>>,
    leverage: Decimal,
}

impl MockPortfolio {
    pub fn new(state: Arc<RwLock<MockState>>) -> Self {
        Self {
            state,
            leverage: dec!(1),
        }
    }

    pub fn with_leverage(mut self, leverage: Decimal) -> Self {
        self.leverage = leverage;
        self
    }
}

#[async_trait]
impl PortfolioView for MockPortfolio {
    async fn risk_context(&self, symbol: &str) -> Result<RiskContext> {
        let state = self.state.read();
        let notional_usd = state
            .positions
            .get(symbol)
            .map(|p| p.size * p.entry_price)
            .unwrap_or(Decimal::ZERO);

        Ok(RiskContext {
            open_positions: state.positions.len() as u32,
            leverage: self.leverage,
            notional_usd,
        })
    }

    async fn position(&self, symbol: &str) -> Result<PositionSnapshot> {
        let state = self.state.read();
        Ok(state
            .positions
            .get(symbol)
            .cloned()
            .unwrap_or_else(|| PositionSnapshot::flat(symbol)))
    }
}
