//! Execution boundary: intents in, risk-checked orders out
//!
//! The [`Executor`] subscribes to `STRATEGY_INTENT` and `KILL_SWITCH`
//! events. For each intent it derives a fresh risk context from the
//! portfolio provider, asks the risk engine, and on approval places the
//! order through the exchange adapter, republishing the outcome as
//! `ORDER_SENT` / `ORDER_FILLED` / `ORDER_REJECTED` or `RISK_BLOCKED`.
//! Every republished event carries the intent chain's correlation id, which
//! doubles as the exchange `client_order_id`.
//!
//! Nothing here throws past the bus: adapter faults and risk rejections are
//! reasoned events, not errors.


use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::events::{
    Event, EventBus, EventError, EventHandler, EventPayload, EventType, OrderEventPayload,
    RiskBlockedPayload, Subscription,
};
use crate::exchange::{ExchangeAdapter, PortfolioView};
use crate::risk::RiskEngine;
use crate::types::{
    IntentAction, OrderRequest, OrderSide, OrderStatus, PositionSide, StrategyIntent,
};

pub struct Executor {
    bus: Arc<EventBus>,
    risk: RiskEngine,
    adapter: Arc<dyn ExchangeAdapter>,
    portfolio: Arc<dyn PortfolioView>,
    halted: AtomicBool,
}

impl Executor {
    pub fn new(
        bus: Arc<EventBus>,
        risk: RiskEngine,
        adapter: Arc<dyn ExchangeAdapter>,
        portfolio: Arc<dyn PortfolioView>,
    ) -> Self {
        Self {
            bus,
            risk,
            adapter,
            portfolio,
            halted: AtomicBool::new(false),
        }
    }

    /// Subscribe this executor to the event types it consumes.
    pub fn register(self: &Arc<Self>) -> (Subscription, Subscription) {
        let intents = self
            .bus
            .subscribe(EventType::StrategyIntent, self.clone());
        let kill = self.bus.subscribe(EventType::KillSwitch, self.clone());
        (intents, kill)
    }

    pub fn is_halted(&self) -> bool {
        self.halted.load(Ordering::SeqCst)
    }

    async fn block(&self, intent: &StrategyIntent, correlation_id: &str, reason: String) {
        tracing::warn!(
            symbol = %intent.symbol,
            action = %intent.action,
            reason = %reason,
            "intent blocked"
        );
        self.bus
            .publish_correlated(
                EventPayload::RiskBlocked(RiskBlockedPayload {
                    intent: intent.clone(),
                    reason,
                }),
                correlation_id,
            )
            .await;
    }

    async fn reject(
        &self,
        symbol: &str,
        side: Option<OrderSide>,
        quantity: rust_decimal::Decimal,
        correlation_id: &str,
        reason: String,
    ) {
        tracing::warn!(
            symbol = %symbol,
            client_order_id = %correlation_id,
            reason = %reason,
            "order rejected"
        );
        self.bus
            .publish_correlated(
                EventPayload::OrderRejected(OrderEventPayload {
                    order_id: None,
                    client_order_id: correlation_id.to_string(),
                    symbol: symbol.to_string(),
                    side,
                    quantity,
                    status: OrderStatus::Rejected,
                    reason: Some(reason),
                }),
                correlation_id,
            )
            .await;
    }

    /// Map an intent action onto an order side, consulting the current
    /// position for closes. A close against a flat book yields `None`.
    async fn order_side(&self, intent: &StrategyIntent) -> Result<Option<OrderSide>, String> {
        match intent.action {
            IntentAction::OpenLong => Ok(Some(OrderSide::Buy)),
            IntentAction::OpenShort => Ok(Some(OrderSide::Sell)),
            IntentAction::ClosePosition => {
                let position = self
                    .portfolio
                    .position(&intent.symbol)
                    .await
                    .map_err(|e| format!("portfolio state unavailable: {}", e))?;
                match position.side {
                    PositionSide::Long => Ok(Some(OrderSide::Sell)),
                    PositionSide::Short => Ok(Some(OrderSide::Buy)),
                    PositionSide::Flat => Ok(None),
                }
            }
        }
    }

    async fn handle_intent(&self, intent: &StrategyIntent, correlation_id: &str) {
        if self.is_halted() {
            self.block(intent, correlation_id, "kill switch engaged".to_string())
                .await;
            return;
        }

        let context = match self.portfolio.risk_context(&intent.symbol).await {
            Ok(context) => context,
            Err(e) => {
                self.block(
                    intent,
                    correlation_id,
                    format!("portfolio state unavailable: {}", e),
                )
                .await;
                return;
            }
        };

        let evaluation = self.risk.evaluate(intent, &context);
        if !evaluation.approved {
            self.block(intent, correlation_id, evaluation.reason).await;
            return;
        }

        tracing::info!(
            symbol = %intent.symbol,
            action = %intent.action,
            reason = %evaluation.reason,
            "intent approved"
        );

        let side = match self.order_side(intent).await {
            Ok(Some(side)) => side,
            Ok(None) => {
                // No order was derivable, so the rejection carries no side
                self.reject(
                    &intent.symbol,
                    None,
                    intent.quantity,
                    correlation_id,
                    "no open position to close".to_string(),
                )
                .await;
                return;
            }
            Err(reason) => {
                self.block(intent, correlation_id, reason).await;
                return;
            }
        };

        let request = OrderRequest {
            symbol: intent.symbol.clone(),
            side,
            quantity: intent.quantity,
            client_order_id: correlation_id.to_string(),
            reduce_only: intent.reduce_only,
        };

        self.bus
            .publish_correlated(
                EventPayload::OrderSent(OrderEventPayload {
                    order_id: None,
                    client_order_id: request.client_order_id.clone(),
                    symbol: request.symbol.clone(),
                    side: Some(request.side),
                    quantity: request.quantity,
                    status: OrderStatus::New,
                    reason: None,
                }),
                correlation_id,
            )
            .await;

        match self.adapter.place_order(&request).await {
            Ok(result) => match result.status {
                OrderStatus::Filled => {
                    tracing::info!(
                        symbol = %result.symbol,
                        order_id = %result.order_id,
                        "order filled"
                    );
                    self.bus
                        .publish_correlated(
                            EventPayload::OrderFilled(OrderEventPayload::from_result(
                                &result,
                                request.side,
                                request.quantity,
                            )),
                            correlation_id,
                        )
                        .await;
                }
                OrderStatus::Rejected => {
                    let mut payload =
                        OrderEventPayload::from_result(&result, request.side, request.quantity);
                    payload.reason = Some("rejected by exchange".to_string());
                    tracing::warn!(
                        symbol = %result.symbol,
                        order_id = %result.order_id,
                        "order rejected by exchange"
                    );
                    self.bus
                        .publish_correlated(EventPayload::OrderRejected(payload), correlation_id)
                        .await;
                }
                // Acknowledged but not yet filled; ORDER_SENT already covers it
                OrderStatus::New => {}
            },
            Err(e) => {
                self.reject(
                    &request.symbol,
                    Some(request.side),
                    request.quantity,
                    correlation_id,
                    e.to_string(),
                )
                .await;
            }
        }
    }

    fn handle_kill_switch(&self, engaged: bool, reason: &str) {
        self.halted.store(engaged, Ordering::SeqCst);
        if engaged {
            tracing::warn!(reason = %reason, "kill switch engaged, trading halted");
        } else {
            tracing::info!(reason = %reason, "kill switch released, trading resumed");
        }
    }
}

#[async_trait::async_trait]
impl EventHandler for Executor {
    fn name(&self) -> &str {
        "executor"
    }

    async fn handle(&self, event: &Event) -> Result<(), EventError> {
        match &event.payload {
            EventPayload::StrategyIntent(intent) => {
                self.handle_intent(intent, &event.correlation_id).await;
            }
            EventPayload::KillSwitch(payload) => {
                self.handle_kill_switch(payload.engaged, &payload.reason);
            }
            _ => {}
        }
        Ok(())
    }
}
