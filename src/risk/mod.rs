//! Pre-trade risk gate
//!
//! The engine is a pure decision function over its immutable limits and a
//! caller-supplied portfolio snapshot. It holds no positions, performs no
//! I/O, and is safe to call concurrently. Risk correctness therefore depends
//! entirely on the freshness of the context the caller assembles per call.

#[cfg(test)]
mod tests;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::config::RiskConfig;
use crate::types::StrategyIntent;

/// Point-in-time portfolio state supplied fresh on every evaluation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskContext {
    /// Number of currently open positions across the account
    pub open_positions: u32,
    /// Effective leverage on the intent's symbol
    pub leverage: Decimal,
    /// Current notional exposure on the intent's symbol, in USD
    pub notional_usd: Decimal,
}

/// Outcome of a risk check. `reason` is always populated so every decision
/// is self-explaining in logs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RiskEvaluation {
    pub approved: bool,
    pub reason: String,
}

impl RiskEvaluation {
    fn rejected(reason: &str) -> Self {
        Self {
            approved: false,
            reason: reason.to_string(),
        }
    }
}

/// Stateless pre-trade risk engine configured once with fixed limits.
pub struct RiskEngine {
    limits: RiskConfig,
}

impl RiskEngine {
    pub fn new(limits: RiskConfig) -> Self {
        Self { limits }
    }

    pub fn limits(&self) -> &RiskConfig {
        &self.limits
    }

    /// Evaluate an intent against a fresh portfolio snapshot.
    ///
    /// Checks run in fixed order and the first failing check short-circuits
    /// with its specific reason. All thresholds are strict greater-than:
    /// values equal to the limit are allowed.
    pub fn evaluate(&self, intent: &StrategyIntent, context: &RiskContext) -> RiskEvaluation {
        if context.open_positions > self.limits.max_open_positions {
            return RiskEvaluation::rejected("max open positions reached");
        }

        if context.leverage > self.limits.max_leverage_per_symbol {
            return RiskEvaluation::rejected("max leverage exceeded");
        }

        if context.notional_usd > self.limits.max_notional_per_symbol_usd {
            return RiskEvaluation::rejected("max notional exceeded");
        }

        RiskEvaluation {
            approved: true,
            reason: format!("approved:{}", intent.action),
        }
    }
}
