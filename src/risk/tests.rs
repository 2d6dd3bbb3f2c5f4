//! Tests for the pre-trade risk gate

use super::*;
use crate::types::IntentAction;
use rust_decimal_macros::dec;

fn test_limits() -> RiskConfig {
    RiskConfig {
        max_open_positions: 3,
        max_leverage_per_symbol: dec!(10),
        max_notional_per_symbol_usd: dec!(5000),
    }
}

fn test_intent() -> StrategyIntent {
    StrategyIntent::new(
        "BTCUSDT",
        IntentAction::OpenLong,
        dec!(0.001),
        "3m candle bullish momentum",
    )
}

fn test_context() -> RiskContext {
    RiskContext {
        open_positions: 0,
        leverage: dec!(1),
        notional_usd: dec!(10),
    }
}

// =============================================================================
// Approval path
// =============================================================================

#[test]
fn test_approves_within_limits() {
    let engine = RiskEngine::new(test_limits());
    let eval = engine.evaluate(&test_intent(), &test_context());

    assert!(eval.approved);
    assert_eq!(eval.reason, "approved:OPEN_LONG");
}

#[test]
fn test_approval_reason_names_the_action() {
    let engine = RiskEngine::new(test_limits());
    let intent = StrategyIntent::new(
        "BTCUSDT",
        IntentAction::ClosePosition,
        dec!(0.001),
        "3m candle bearish invalidation",
    );

    let eval = engine.evaluate(&intent, &test_context());
    assert_eq!(eval.reason, "approved:CLOSE_POSITION");
}

#[test]
fn test_evaluate_is_deterministic() {
    let engine = RiskEngine::new(test_limits());
    let intent = test_intent();
    let context = test_context();

    let first = engine.evaluate(&intent, &context);
    let second = engine.evaluate(&intent, &context);

    assert_eq!(first, second);
}

// =============================================================================
// Boundary behavior: equal-to-limit is allowed, one unit over is rejected
// =============================================================================

#[test]
fn test_open_positions_at_limit_approved() {
    let engine = RiskEngine::new(test_limits());
    let context = RiskContext {
        open_positions: 3,
        ..test_context()
    };

    assert!(engine.evaluate(&test_intent(), &context).approved);
}

#[test]
fn test_open_positions_over_limit_rejected() {
    let engine = RiskEngine::new(test_limits());
    let context = RiskContext {
        open_positions: 4,
        ..test_context()
    };

    let eval = engine.evaluate(&test_intent(), &context);
    assert!(!eval.approved);
    assert_eq!(eval.reason, "max open positions reached");
}

#[test]
fn test_leverage_at_limit_approved() {
    let engine = RiskEngine::new(test_limits());
    let context = RiskContext {
        leverage: dec!(10),
        ..test_context()
    };

    assert!(engine.evaluate(&test_intent(), &context).approved);
}

#[test]
fn test_leverage_over_limit_rejected() {
    let engine = RiskEngine::new(test_limits());
    let context = RiskContext {
        leverage: dec!(10.01),
        ..test_context()
    };

    let eval = engine.evaluate(&test_intent(), &context);
    assert!(!eval.approved);
    assert_eq!(eval.reason, "max leverage exceeded");
}

#[test]
fn test_notional_at_limit_approved() {
    let engine = RiskEngine::new(test_limits());
    let context = RiskContext {
        notional_usd: dec!(5000),
        ..test_context()
    };

    assert!(engine.evaluate(&test_intent(), &context).approved);
}

#[test]
fn test_notional_over_limit_rejected() {
    let engine = RiskEngine::new(test_limits());
    let context = RiskContext {
        notional_usd: dec!(6000),
        ..test_context()
    };

    let eval = engine.evaluate(&test_intent(), &context);
    assert!(!eval.approved);
    assert_eq!(eval.reason, "max notional exceeded");
}

// =============================================================================
// Check ordering: first failing check wins
// =============================================================================

#[test]
fn test_first_failing_check_short_circuits() {
    let engine = RiskEngine::new(test_limits());
    let context = RiskContext {
        open_positions: 10,
        leverage: dec!(50),
        notional_usd: dec!(999999),
    };

    let eval = engine.evaluate(&test_intent(), &context);
    assert_eq!(eval.reason, "max open positions reached");
}

#[test]
fn test_leverage_checked_before_notional() {
    let engine = RiskEngine::new(test_limits());
    let context = RiskContext {
        open_positions: 0,
        leverage: dec!(50),
        notional_usd: dec!(999999),
    };

    let eval = engine.evaluate(&test_intent(), &context);
    assert_eq!(eval.reason, "max leverage exceeded");
}
