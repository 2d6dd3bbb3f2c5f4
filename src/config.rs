//! Configuration management

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::Deserialize;
use std::path::Path;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub strategy: StrategyConfig,
    #[serde(default)]
    pub risk: RiskConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StrategyConfig {
    /// Candle timeframe the strategy reacts to
    pub timeframe: String,
    /// Fixed order quantity per intent
    pub order_quantity: Decimal,
}

/// Risk limits, loaded once per engine instance.
#[derive(Debug, Clone, Deserialize)]
pub struct RiskConfig {
    /// Maximum number of concurrently open positions
    pub max_open_positions: u32,
    /// Maximum effective leverage per symbol
    pub max_leverage_per_symbol: Decimal,
    /// Maximum notional exposure per symbol, in USD
    pub max_notional_per_symbol_usd: Decimal,
}

impl Config {
    /// Load configuration from file, with MOMENTUM_* environment overrides
    pub fn load<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let settings = config::Config::builder()
            .add_source(config::File::with_name(path.as_ref().to_str().unwrap()))
            .add_source(config::Environment::with_prefix("MOMENTUM").separator("__"))
            .build()?;

        let config: Config = settings.try_deserialize()?;
        Ok(config)
    }

    /// Load from default locations, falling back to built-in defaults
    pub fn load_default() -> anyhow::Result<Self> {
        let paths = ["config.toml", "~/.config/momentum-bot/config.toml"];

        for path in paths {
            let expanded = shellexpand::tilde(path);
            if Path::new(expanded.as_ref()).exists() {
                return Self::load(expanded.as_ref());
            }
        }

        Ok(Config::default())
    }
}

impl Default for StrategyConfig {
    fn default() -> Self {
        Self {
            timeframe: "3m".to_string(),
            order_quantity: dec!(0.001),
        }
    }
}

impl Default for RiskConfig {
    fn default() -> Self {
        Self {
            max_open_positions: 3,
            max_leverage_per_symbol: dec!(10),
            max_notional_per_symbol_usd: dec!(5000), // $5000 per symbol
        }
    }
}
