//! Position drift detection
//!
//! Compares the locally tracked position against the exchange's view and
//! publishes `STATE_DRIFT` when they diverge. Both snapshots are supplied by
//! the caller; the monitor holds no position state of its own.

use std::sync::Arc;

use crate::events::{Event, EventBus, EventPayload, StateDriftPayload};
use crate::types::PositionSnapshot;

pub struct DriftMonitor {
    bus: Arc<EventBus>,
}

impl DriftMonitor {
    pub fn new(bus: Arc<EventBus>) -> Self {
        Self { bus }
    }

    /// Publish a `STATE_DRIFT` event if the two snapshots disagree on side
    /// or size. Returns the published envelope, or `None` when in sync.
    pub async fn check(
        &self,
        local: &PositionSnapshot,
        exchange: &PositionSnapshot,
    ) -> Option<Event> {
        let detail = if local.side != exchange.side {
            format!(
                "side mismatch: local {:?}, exchange {:?}",
                local.side, exchange.side
            )
        } else if local.size != exchange.size {
            format!(
                "size mismatch: local {}, exchange {}",
                local.size, exchange.size
            )
        } else {
            return None;
        };

        tracing::warn!(symbol = %local.symbol, detail = %detail, "position drift detected");

        let event = self
            .bus
            .publish(EventPayload::StateDrift(StateDriftPayload {
                symbol: local.symbol.clone(),
                local_side: local.side,
                local_size: local.size,
                exchange_side: exchange.side,
                exchange_size: exchange.size,
                detail,
            }))
            .await;
        Some(event)
    }
}
