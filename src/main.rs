//! Momentum trading pipeline CLI
//!
//! Runs the event-driven pipeline end to end against the paper-trading
//! exchange, or inspects the effective configuration.

use clap::{Parser, Subcommand};
use momentum_bot::{
    config::Config,
    events::{EventBus, EventPayload, EventType, FnHandler, WsStatusPayload},
    exchange::{MockExchange, MockPortfolio},
    executor::Executor,
    risk::RiskEngine,
    strategy::StrategyEngine,
    types::Candle,
};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "momentum-bot")]
#[command(about = "Event-driven momentum trading pipeline")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Config file path
    #[arg(short, long, default_value = "config.toml")]
    config: String,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a paper-trading session over synthetic candles
    Paper {
        /// Number of candles to replay
        #[arg(short, long, default_value = "6")]
        rounds: u32,
    },
    /// Show the effective risk limits
    Limits,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    let config = if std::path::Path::new(&cli.config).exists() {
        Config::load(&cli.config)?
    } else {
        Config::load_default()?
    };

    match cli.command {
        Commands::Paper { rounds } => run_paper_session(config, rounds).await,
        Commands::Limits => show_limits(config),
    }
}

async fn run_paper_session(config: Config, rounds: u32) -> anyhow::Result<()> {
    tracing::info!("Starting paper-trading session");

    let bus = Arc::new(EventBus::new());
    let exchange = Arc::new(MockExchange::new().with_mark_price(dec!(100)));
    let portfolio = Arc::new(MockPortfolio::new(exchange.state()));

    // Observe every event type for the operator log
    for event_type in EventType::ALL {
        bus.subscribe(
            event_type,
            FnHandler::new("session-log", |event| {
                tracing::info!(
                    event_type = ?event.event_type,
                    correlation_id = %event.correlation_id,
                    "event"
                );
                Ok(())
            }),
        );
    }

    let timeframe = config.strategy.timeframe.clone();
    let strategy = Arc::new(StrategyEngine::new(
        config.strategy,
        portfolio.clone(),
        bus.clone(),
    ));
    bus.subscribe(EventType::CandleClosed, strategy);

    let executor = Arc::new(Executor::new(
        bus.clone(),
        RiskEngine::new(config.risk),
        exchange.clone(),
        portfolio,
    ));
    executor.register();

    bus.publish(EventPayload::WsStatus(WsStatusPayload {
        stream: format!("btcusdt@kline_{}", timeframe),
        connected: true,
        detail: None,
    }))
    .await;

    // Alternating bullish/bearish walk around the mark price
    let mut price = dec!(100);
    for round in 0..rounds {
        let step = if round % 2 == 0 { dec!(5) } else { dec!(-4) };
        let open = price;
        let close = price + step;
        let high = open.max(close) + Decimal::ONE;
        let low = open.min(close) - Decimal::ONE;

        bus.publish(EventPayload::CandleClosed(Candle::new(
            "BTCUSDT",
            &timeframe,
            &open.to_string(),
            &high.to_string(),
            &low.to_string(),
            &close.to_string(),
        )))
        .await;

        price = close;
        tokio::time::sleep(Duration::from_millis(100)).await;
    }

    bus.publish(EventPayload::WsStatus(WsStatusPayload {
        stream: format!("btcusdt@kline_{}", timeframe),
        connected: false,
        detail: Some("session complete".to_string()),
    }))
    .await;

    let state = exchange.state();
    let state = state.read();
    tracing::info!(
        orders = state.orders.len(),
        fills = state.fills,
        open_positions = state.positions.len(),
        "session complete"
    );

    Ok(())
}

fn show_limits(config: Config) -> anyhow::Result<()> {
    println!("Risk limits:");
    println!("  max open positions:        {}", config.risk.max_open_positions);
    println!("  max leverage per symbol:   {}", config.risk.max_leverage_per_symbol);
    println!("  max notional per symbol:   ${}", config.risk.max_notional_per_symbol_usd);
    Ok(())
}
