//! Typed publish/subscribe event bus
//!
//! The pipeline is event-driven: market data, strategy intents, risk
//! decisions and order lifecycle updates all flow through one in-process
//! [`EventBus`]. The bus is constructed once per process and passed
//! explicitly to every component that publishes or subscribes; there is no
//! ambient global instance.
//!
//! # Architecture
//! ```text
//! CandleClosed -> StrategyEngine -> StrategyIntent -> Executor
//!                                                        |
//!                     RiskBlocked / OrderSent / OrderFilled / OrderRejected
//! ```
//!
//! Dispatch is sequential and in subscription order: for a single event, no
//! two handlers ever run interleaved, and a handler that fails is logged and
//! skipped without affecting its siblings or the publisher.

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use thiserror::Error;
use uuid::Uuid;

use crate::types::{Candle, OrderResult, OrderSide, OrderStatus, PositionSide, StrategyIntent};

/// The closed set of event types flowing through the bus.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EventType {
    CandleClosed,
    WsStatus,
    StrategyIntent,
    OrderSent,
    OrderFilled,
    OrderRejected,
    RiskBlocked,
    StateDrift,
    KillSwitch,
}

impl EventType {
    /// Every member of the taxonomy, in declaration order.
    pub const ALL: [EventType; 9] = [
        EventType::CandleClosed,
        EventType::WsStatus,
        EventType::StrategyIntent,
        EventType::OrderSent,
        EventType::OrderFilled,
        EventType::OrderRejected,
        EventType::RiskBlocked,
        EventType::StateDrift,
        EventType::KillSwitch,
    ];
}

/// Market data feed connectivity status.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WsStatusPayload {
    /// Stream identifier (e.g. "btcusdt@kline_3m")
    pub stream: String,
    pub connected: bool,
    pub detail: Option<String>,
}

/// Order lifecycle payload, shared by OrderSent / OrderFilled / OrderRejected.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderEventPayload {
    /// Exchange-assigned order id, absent until the exchange acknowledged
    pub order_id: Option<String>,
    /// Client order id; equals the correlation id of the intent chain
    pub client_order_id: String,
    pub symbol: String,
    /// Absent when the order was rejected before a side could be derived
    pub side: Option<OrderSide>,
    #[serde(with = "rust_decimal::serde::str")]
    pub quantity: rust_decimal::Decimal,
    pub status: OrderStatus,
    /// Rejection cause, populated for OrderRejected
    pub reason: Option<String>,
}

impl OrderEventPayload {
    /// Build a lifecycle payload from an adapter result.
    pub fn from_result(result: &OrderResult, side: OrderSide, quantity: rust_decimal::Decimal) -> Self {
        Self {
            order_id: Some(result.order_id.clone()),
            client_order_id: result.client_order_id.clone(),
            symbol: result.symbol.clone(),
            side: Some(side),
            quantity,
            status: result.status,
            reason: None,
        }
    }
}

/// A risk-rejected intent, with the engine's reason.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskBlockedPayload {
    pub intent: StrategyIntent,
    pub reason: String,
}

/// Divergence between the locally tracked position and the exchange's view.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StateDriftPayload {
    pub symbol: String,
    pub local_side: PositionSide,
    #[serde(with = "rust_decimal::serde::str")]
    pub local_size: rust_decimal::Decimal,
    pub exchange_side: PositionSide,
    #[serde(with = "rust_decimal::serde::str")]
    pub exchange_size: rust_decimal::Decimal,
    pub detail: String,
}

/// Operator kill switch toggle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KillSwitchPayload {
    pub engaged: bool,
    pub reason: String,
}

/// Event payloads, one variant per [`EventType`].
///
/// The payload determines the event type ([`EventPayload::event_type`] is an
/// exhaustive match), so an event can never be published under a mismatched
/// type: extending the taxonomy requires touching both enums together or the
/// crate stops compiling.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum EventPayload {
    CandleClosed(Candle),
    WsStatus(WsStatusPayload),
    StrategyIntent(StrategyIntent),
    OrderSent(OrderEventPayload),
    OrderFilled(OrderEventPayload),
    OrderRejected(OrderEventPayload),
    RiskBlocked(RiskBlockedPayload),
    StateDrift(StateDriftPayload),
    KillSwitch(KillSwitchPayload),
}

impl EventPayload {
    /// The event type this payload belongs to.
    pub fn event_type(&self) -> EventType {
        match self {
            Self::CandleClosed(_) => EventType::CandleClosed,
            Self::WsStatus(_) => EventType::WsStatus,
            Self::StrategyIntent(_) => EventType::StrategyIntent,
            Self::OrderSent(_) => EventType::OrderSent,
            Self::OrderFilled(_) => EventType::OrderFilled,
            Self::OrderRejected(_) => EventType::OrderRejected,
            Self::RiskBlocked(_) => EventType::RiskBlocked,
            Self::StateDrift(_) => EventType::StateDrift,
            Self::KillSwitch(_) => EventType::KillSwitch,
        }
    }
}

/// Event envelope.
///
/// `correlation_id` threads a logical trade-intent chain (intent -> order ->
/// fill); uniqueness is probabilistic (UUID v4). `timestamp` is assigned at
/// publish time, not at payload creation time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub event_type: EventType,
    pub payload: EventPayload,
    pub correlation_id: String,
    pub timestamp: DateTime<Utc>,
}

impl Event {
    fn new(payload: EventPayload, correlation_id: Option<String>) -> Self {
        Self {
            event_type: payload.event_type(),
            payload,
            correlation_id: correlation_id.unwrap_or_else(|| Uuid::new_v4().to_string()),
            timestamp: Utc::now(),
        }
    }
}

/// Event error types
#[derive(Error, Debug, Clone)]
pub enum EventError {
    #[error("Handler error: {0}")]
    Handler(String),

    #[error("Bus error: {0}")]
    Bus(String),
}

/// Event handler trait - implement this to observe events.
#[async_trait::async_trait]
pub trait EventHandler: Send + Sync {
    /// Handler name for logging
    fn name(&self) -> &str;

    /// Handle an event. An `Err` is logged by the bus and never reaches the
    /// publisher or the sibling handlers.
    async fn handle(&self, event: &Event) -> Result<(), EventError>;
}

/// Adapts a synchronous closure into an [`EventHandler`].
///
/// Convenient for observers that only record or log.
pub struct FnHandler {
    name: String,
    f: Box<dyn Fn(&Event) -> Result<(), EventError> + Send + Sync>,
}

impl FnHandler {
    pub fn new<F>(name: &str, f: F) -> Arc<dyn EventHandler>
    where
        F: Fn(&Event) -> Result<(), EventError> + Send + Sync + 'static,
    {
        Arc::new(Self {
            name: name.to_string(),
            f: Box::new(f),
        })
    }
}

#[async_trait::async_trait]
impl EventHandler for FnHandler {
    fn name(&self) -> &str {
        &self.name
    }

    async fn handle(&self, event: &Event) -> Result<(), EventError> {
        (self.f)(event)
    }
}

/// Capability to deregister a handler; redeem via [`EventBus::unsubscribe`].
#[derive(Debug)]
pub struct Subscription {
    event_type: EventType,
    id: u64,
}

impl Subscription {
    pub fn event_type(&self) -> EventType {
        self.event_type
    }
}

struct HandlerEntry {
    id: u64,
    handler: Arc<dyn EventHandler>,
}

/// In-process publish/subscribe dispatcher.
///
/// Handlers for one event type run strictly in subscription order, each
/// awaited before the next; dispatch iterates a snapshot of the registry
/// taken at publish time, so subscribe/unsubscribe calls made from inside a
/// handler affect only future publishes.
pub struct EventBus {
    handlers: RwLock<HashMap<EventType, Vec<HandlerEntry>>>,
    next_id: AtomicU64,
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

impl EventBus {
    pub fn new() -> Self {
        Self {
            handlers: RwLock::new(HashMap::new()),
            next_id: AtomicU64::new(0),
        }
    }

    /// Register `handler` for `event_type`.
    ///
    /// Duplicate registrations are kept and each receives the event; the bus
    /// does not de-duplicate by identity.
    pub fn subscribe(&self, event_type: EventType, handler: Arc<dyn EventHandler>) -> Subscription {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.handlers
            .write()
            .entry(event_type)
            .or_default()
            .push(HandlerEntry { id, handler });
        Subscription { event_type, id }
    }

    /// Deregister a handler. Safe to call from inside a running handler; the
    /// dispatch already in flight is unaffected.
    pub fn unsubscribe(&self, subscription: Subscription) {
        let mut handlers = self.handlers.write();
        if let Some(entries) = handlers.get_mut(&subscription.event_type) {
            entries.retain(|e| e.id != subscription.id);
        }
    }

    /// Number of handlers currently registered for `event_type`.
    pub fn handler_count(&self, event_type: EventType) -> usize {
        self.handlers
            .read()
            .get(&event_type)
            .map(Vec::len)
            .unwrap_or(0)
    }

    /// Publish a payload with a fresh correlation id.
    ///
    /// Returns the constructed envelope. Always completes: handler faults are
    /// logged and never surface here.
    pub async fn publish(&self, payload: EventPayload) -> Event {
        self.dispatch(Event::new(payload, None)).await
    }

    /// Publish a payload threading an existing correlation id.
    pub async fn publish_correlated(&self, payload: EventPayload, correlation_id: &str) -> Event {
        self.dispatch(Event::new(payload, Some(correlation_id.to_string())))
            .await
    }

    async fn dispatch(&self, event: Event) -> Event {
        // Snapshot before awaiting anything: mutation during iteration must
        // not affect the in-flight dispatch.
        let snapshot: Vec<Arc<dyn EventHandler>> = {
            let handlers = self.handlers.read();
            handlers
                .get(&event.event_type)
                .map(|entries| entries.iter().map(|e| e.handler.clone()).collect())
                .unwrap_or_default()
        };

        for handler in snapshot {
            if let Err(e) = handler.handle(&event).await {
                tracing::error!(
                    event_type = ?event.event_type,
                    handler = handler.name(),
                    error = %e,
                    "event handler failed"
                );
            }
        }

        event
    }
}

// ============================================================================
// Unit Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::IntentAction;
    use parking_lot::Mutex;
    use rust_decimal_macros::dec;
    use std::time::Duration;

    fn candle_payload() -> EventPayload {
        EventPayload::CandleClosed(Candle::new("BTCUSDT", "3m", "100", "106", "99", "105"))
    }

    fn kill_payload(engaged: bool) -> EventPayload {
        EventPayload::KillSwitch(KillSwitchPayload {
            engaged,
            reason: "test".to_string(),
        })
    }

    /// Handler that records every event it sees, tagged with its name.
    fn recorder(name: &str, log: Arc<Mutex<Vec<String>>>) -> Arc<dyn EventHandler> {
        let tag = name.to_string();
        FnHandler::new(name, move |event| {
            log.lock().push(format!("{}:{:?}", tag, event.event_type));
            Ok(())
        })
    }

    struct SlowHandler {
        log: Arc<Mutex<Vec<String>>>,
    }

    #[async_trait::async_trait]
    impl EventHandler for SlowHandler {
        fn name(&self) -> &str {
            "slow"
        }

        async fn handle(&self, _event: &Event) -> Result<(), EventError> {
            tokio::time::sleep(Duration::from_millis(20)).await;
            self.log.lock().push("slow".to_string());
            Ok(())
        }
    }

    #[test]
    fn test_taxonomy_is_total() {
        let samples = vec![
            candle_payload(),
            EventPayload::WsStatus(WsStatusPayload {
                stream: "btcusdt@kline_3m".to_string(),
                connected: true,
                detail: None,
            }),
            EventPayload::StrategyIntent(StrategyIntent::new(
                "BTCUSDT",
                IntentAction::OpenLong,
                dec!(0.001),
                "test",
            )),
            EventPayload::OrderSent(order_payload(OrderStatus::New)),
            EventPayload::OrderFilled(order_payload(OrderStatus::Filled)),
            EventPayload::OrderRejected(order_payload(OrderStatus::Rejected)),
            EventPayload::RiskBlocked(RiskBlockedPayload {
                intent: StrategyIntent::new("BTCUSDT", IntentAction::OpenLong, dec!(0.001), "t"),
                reason: "max notional exceeded".to_string(),
            }),
            EventPayload::StateDrift(StateDriftPayload {
                symbol: "BTCUSDT".to_string(),
                local_side: PositionSide::Long,
                local_size: dec!(0.001),
                exchange_side: PositionSide::Flat,
                exchange_size: dec!(0),
                detail: "side mismatch".to_string(),
            }),
            kill_payload(true),
        ];

        let covered: Vec<EventType> = samples.iter().map(|p| p.event_type()).collect();
        for event_type in EventType::ALL {
            assert!(
                covered.contains(&event_type),
                "no payload maps to {:?}",
                event_type
            );
        }
        assert_eq!(covered.len(), EventType::ALL.len());
    }

    fn order_payload(status: OrderStatus) -> OrderEventPayload {
        OrderEventPayload {
            order_id: Some("1".to_string()),
            client_order_id: "corr-1".to_string(),
            symbol: "BTCUSDT".to_string(),
            side: Some(OrderSide::Buy),
            quantity: dec!(0.001),
            status,
            reason: None,
        }
    }

    #[tokio::test]
    async fn test_publish_no_handlers_is_noop() {
        let bus = EventBus::new();
        let event = bus.publish(candle_payload()).await;

        assert_eq!(event.event_type, EventType::CandleClosed);
        assert!(!event.correlation_id.is_empty());
    }

    #[tokio::test]
    async fn test_publish_preserves_supplied_correlation_id() {
        let bus = EventBus::new();
        let event = bus.publish_correlated(candle_payload(), "corr-42").await;

        assert_eq!(event.correlation_id, "corr-42");
    }

    #[tokio::test]
    async fn test_generated_correlation_ids_are_distinct() {
        let bus = EventBus::new();
        let a = bus.publish(candle_payload()).await;
        let b = bus.publish(candle_payload()).await;

        assert_ne!(a.correlation_id, b.correlation_id);
    }

    #[tokio::test]
    async fn test_dispatch_in_subscription_order() {
        let bus = EventBus::new();
        let log = Arc::new(Mutex::new(Vec::new()));

        bus.subscribe(EventType::CandleClosed, recorder("a", log.clone()));
        bus.subscribe(EventType::CandleClosed, recorder("b", log.clone()));
        bus.subscribe(EventType::CandleClosed, recorder("c", log.clone()));

        bus.publish(candle_payload()).await;

        assert_eq!(
            *log.lock(),
            vec!["a:CandleClosed", "b:CandleClosed", "c:CandleClosed"]
        );
    }

    #[tokio::test]
    async fn test_handlers_only_receive_their_type() {
        let bus = EventBus::new();
        let log = Arc::new(Mutex::new(Vec::new()));

        bus.subscribe(EventType::CandleClosed, recorder("candle", log.clone()));
        bus.subscribe(EventType::KillSwitch, recorder("kill", log.clone()));

        bus.publish(kill_payload(true)).await;

        assert_eq!(*log.lock(), vec!["kill:KillSwitch"]);
    }

    #[tokio::test]
    async fn test_failing_handler_does_not_block_siblings() {
        let bus = EventBus::new();
        let log = Arc::new(Mutex::new(Vec::new()));

        bus.subscribe(EventType::CandleClosed, recorder("first", log.clone()));
        bus.subscribe(
            EventType::CandleClosed,
            FnHandler::new("faulty", |_| Err(EventError::Handler("boom".to_string()))),
        );
        bus.subscribe(EventType::CandleClosed, recorder("last", log.clone()));

        // publish must complete despite the faulty handler
        let event = bus.publish(candle_payload()).await;

        assert_eq!(event.event_type, EventType::CandleClosed);
        assert_eq!(*log.lock(), vec!["first:CandleClosed", "last:CandleClosed"]);
    }

    #[tokio::test]
    async fn test_duplicate_registration_delivers_twice() {
        let bus = EventBus::new();
        let log = Arc::new(Mutex::new(Vec::new()));
        let handler = recorder("dup", log.clone());

        bus.subscribe(EventType::CandleClosed, handler.clone());
        bus.subscribe(EventType::CandleClosed, handler);

        bus.publish(candle_payload()).await;

        assert_eq!(log.lock().len(), 2);
    }

    #[tokio::test]
    async fn test_unsubscribe_stops_future_delivery() {
        let bus = EventBus::new();
        let log = Arc::new(Mutex::new(Vec::new()));

        let sub = bus.subscribe(EventType::CandleClosed, recorder("a", log.clone()));
        bus.publish(candle_payload()).await;
        assert_eq!(log.lock().len(), 1);

        bus.unsubscribe(sub);
        assert_eq!(bus.handler_count(EventType::CandleClosed), 0);

        bus.publish(candle_payload()).await;
        assert_eq!(log.lock().len(), 1);
    }

    #[tokio::test]
    async fn test_unsubscribe_during_dispatch_affects_only_future_publishes() {
        let bus = Arc::new(EventBus::new());
        let log = Arc::new(Mutex::new(Vec::new()));

        // "b" is unsubscribed by "a" mid-dispatch but still receives the
        // event already in flight.
        let pending: Arc<Mutex<Option<Subscription>>> = Arc::new(Mutex::new(None));
        {
            let bus_inner = bus.clone();
            let pending = pending.clone();
            let log = log.clone();
            bus.subscribe(
                EventType::CandleClosed,
                FnHandler::new("a", move |_| {
                    log.lock().push("a".to_string());
                    if let Some(sub) = pending.lock().take() {
                        bus_inner.unsubscribe(sub);
                    }
                    Ok(())
                }),
            );
        }
        let sub_b = bus.subscribe(EventType::CandleClosed, recorder("b", log.clone()));
        *pending.lock() = Some(sub_b);

        bus.publish(candle_payload()).await;
        assert_eq!(*log.lock(), vec!["a", "b:CandleClosed"]);

        bus.publish(candle_payload()).await;
        assert_eq!(*log.lock(), vec!["a", "b:CandleClosed", "a"]);
    }

    #[tokio::test]
    async fn test_slow_handler_delays_but_does_not_crash() {
        let bus = EventBus::new();
        let log = Arc::new(Mutex::new(Vec::new()));

        bus.subscribe(
            EventType::CandleClosed,
            Arc::new(SlowHandler { log: log.clone() }),
        );
        bus.subscribe(EventType::CandleClosed, recorder("after", log.clone()));

        bus.publish(candle_payload()).await;

        // the sibling only runs once the slow handler finished
        assert_eq!(*log.lock(), vec!["slow", "after:CandleClosed"]);
    }

    #[tokio::test]
    async fn test_timestamp_assigned_at_publish_time() {
        let bus = EventBus::new();
        let before = Utc::now();
        let event = bus.publish(candle_payload()).await;
        let after = Utc::now();

        assert!(event.timestamp >= before && event.timestamp <= after);
    }

    #[test]
    fn test_event_type_serialization() {
        let json = serde_json::to_string(&EventType::CandleClosed).unwrap();
        assert_eq!(json, "\"CANDLE_CLOSED\"");
        let json = serde_json::to_string(&EventType::RiskBlocked).unwrap();
        assert_eq!(json, "\"RISK_BLOCKED\"");
    }
}
