//! Error Types for Stock Advisor

use rust_decimal::Decimal;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, AdvisorError>;

#[derive(Error, Debug)]
pub enum AdvisorError {
    #[error("No candidates to rank")]
    EmptyInput,

    #[error("Invalid budget: {0} (must be greater than zero)")]
    InvalidBudget(Decimal),

    #[error("Invalid allocation: {0}")]
    InvalidAllocation(String),

    #[error("Stock universe not loaded")]
    UniverseNotLoaded,

    #[error("Price unavailable for {0}")]
    PriceUnavailable(String),

    #[error("Stock not supported: {0}")]
    UnsupportedStock(String),

    #[error("Cannot {action} while session is {from}")]
    InvalidTransition {
        from: crate::session::Stage,
        action: &'static str,
    },

    #[error("Session not found: {0}")]
    SessionNotFound(String),

    #[error("News error: {0}")]
    News(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl AdvisorError {
    /// Stable machine-readable code for API responses
    pub fn code(&self) -> &'static str {
        match self {
            Self::EmptyInput => "EMPTY_INPUT",
            Self::InvalidBudget(_) => "INVALID_BUDGET",
            Self::InvalidAllocation(_) => "INVALID_ALLOCATION",
            Self::UniverseNotLoaded => "UNIVERSE_NOT_LOADED",
            Self::PriceUnavailable(_) => "PRICE_UNAVAILABLE",
            Self::UnsupportedStock(_) => "UNSUPPORTED_STOCK",
            Self::InvalidTransition { .. } => "INVALID_TRANSITION",
            Self::SessionNotFound(_) => "SESSION_NOT_FOUND",
            Self::News(_) => "NEWS_ERROR",
            Self::Config(_) => "CONFIG_ERROR",
            Self::Io(_) => "IO_ERROR",
            Self::Csv(_) => "CSV_ERROR",
            Self::Serialization(_) => "SERIALIZATION_ERROR",
        }
    }

    /// Whether the caller supplied bad input (as opposed to an internal failure)
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Self::EmptyInput
                | Self::InvalidBudget(_)
                | Self::InvalidAllocation(_)
                | Self::UnsupportedStock(_)
        )
    }
}
