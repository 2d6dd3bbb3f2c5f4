//! Momentum strategy: candle in, trade intents out
//!
//! [`SignalGenerator`] is a pure function from `(candle, position)` to a list
//! of intents; identical input yields an identical list apart from the
//! creation timestamp. [`StrategyEngine`] wires it to the bus, turning
//! `CANDLE_CLOSED` events into `STRATEGY_INTENT` events.


use std::str::FromStr;
use std::sync::Arc;

use rust_decimal::Decimal;

use crate::config::StrategyConfig;
use crate::error::Result;
use crate::events::{Event, EventBus, EventError, EventHandler, EventPayload};
use crate::exchange::PortfolioView;
use crate::types::{Candle, IntentAction, PositionSide, PositionSnapshot, StrategyIntent};

/// Stateless signal generator over fixed momentum rules.
pub struct SignalGenerator {
    config: StrategyConfig,
}

impl SignalGenerator {
    pub fn new(config: StrategyConfig) -> Self {
        Self { config }
    }

    /// Generate trade intents for a closed candle.
    ///
    /// Candles of a timeframe other than the configured one yield nothing,
    /// as does a candle whose open/close fail decimal parsing: malformed
    /// numeric input means "no signal", not a fault.
    pub fn generate(&self, candle: &Candle, position: &PositionSnapshot) -> Vec<StrategyIntent> {
        if candle.timeframe != self.config.timeframe {
            return Vec::new();
        }

        let (open, close) = match (
            Decimal::from_str(&candle.open),
            Decimal::from_str(&candle.close),
        ) {
            (Ok(open), Ok(close)) => (open, close),
            _ => {
                tracing::warn!(
                    symbol = %candle.symbol,
                    open = %candle.open,
                    close = %candle.close,
                    "unparseable candle prices, no signal"
                );
                return Vec::new();
            }
        };

        if close > open && position.side != PositionSide::Long {
            let reason = format!("{} candle bullish momentum", self.config.timeframe);
            return vec![StrategyIntent::new(
                &candle.symbol,
                IntentAction::OpenLong,
                self.config.order_quantity,
                &reason,
            )];
        }

        if close < open && position.side == PositionSide::Long {
            let reason = format!("{} candle bearish invalidation", self.config.timeframe);
            return vec![StrategyIntent::new(
                &candle.symbol,
                IntentAction::ClosePosition,
                self.config.order_quantity,
                &reason,
            )
            .reduce_only()];
        }

        Vec::new()
    }
}

/// Bus-facing strategy driver.
///
/// On every `CANDLE_CLOSED` event it fetches the current position snapshot
/// from the portfolio provider, runs the signal generator, and publishes one
/// `STRATEGY_INTENT` event per intent.
pub struct StrategyEngine {
    generator: SignalGenerator,
    portfolio: Arc<dyn PortfolioView>,
    bus: Arc<EventBus>,
}

impl StrategyEngine {
    pub fn new(
        config: StrategyConfig,
        portfolio: Arc<dyn PortfolioView>,
        bus: Arc<EventBus>,
    ) -> Self {
        Self {
            generator: SignalGenerator::new(config),
            portfolio,
            bus,
        }
    }

    async fn on_candle(&self, candle: &Candle) -> Result<()> {
        let position = self.portfolio.position(&candle.symbol).await?;
        let intents = self.generator.generate(candle, &position);

        for intent in intents {
            tracing::info!(
                symbol = %intent.symbol,
                action = %intent.action,
                reason = %intent.reason,
                "strategy intent"
            );
            let payload = EventPayload::StrategyIntent(intent.clone());
            match intent.correlation_id.as_deref() {
                Some(id) => self.bus.publish_correlated(payload, id).await,
                None => self.bus.publish(payload).await,
            };
        }

        Ok(())
    }
}

#[async_trait::async_trait]
impl EventHandler for StrategyEngine {
    fn name(&self) -> &str {
        "strategy-engine"
    }

    async fn handle(&self, event: &Event) -> std::result::Result<(), EventError> {
        if let EventPayload::CandleClosed(candle) = &event.payload {
            self.on_candle(candle)
                .await
                .map_err(|e| EventError::Handler(e.to_string()))?;
        }
        Ok(())
    }
}
