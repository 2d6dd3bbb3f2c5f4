//! Error types for the trading pipeline

use thiserror::Error;

#[derive(Error, Debug)]
pub enum BotError {
    #[error("Exchange error: {0}")]
    Exchange(String),

    #[error("Portfolio state error: {0}")]
    Portfolio(String),
}

pub type Result<T> = std::result::Result<T, BotError>;
