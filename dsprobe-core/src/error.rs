//! Error types for dsprobe

use thiserror::Error;

/// Result type alias for dsprobe operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for dsprobe
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    /// Connection, timeout or decode failure talking to a remote service
    #[error("Transport error: {0}")]
    Transport(String),

    /// Remote service answered with a non-2xx status or an `error` field
    #[error("Service error{}: {message}", status.map(|s| format!(" ({})", s)).unwrap_or_default())]
    Service {
        status: Option<u16>,
        message: String,
    },

    /// UTXO lookup requested without an attacker address
    #[error("Set attacker address first")]
    MissingAddress,

    /// Invalid parameter error
    #[error("Invalid parameter '{name}': {reason}")]
    InvalidParameter { name: String, reason: String },

    /// Operation not permitted in the current orchestrator state
    #[error("Cannot {operation} while {state}")]
    InvalidState {
        operation: &'static str,
        state: String,
    },

    /// An attack dispatch is already in flight for this session
    #[error("An attack is already executing for this session")]
    Busy,

    /// The UTXO index returned nothing spendable
    #[error("No UTXOs found for address {address}")]
    NoUtxoFound { address: String },

    /// Price source returned no usable BTC/USD rate
    #[error("Failed to fetch BTC price")]
    RateUnavailable,

    /// Fiat amount could not be converted
    #[error("Invalid USD amount: {0}")]
    InvalidAmount(String),

    /// In-flight operation was aborted
    #[error("Operation cancelled")]
    Cancelled,
}

/// Coarse classification of [`Error`] values
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Transport,
    Service,
    Validation,
    NotFound,
    Conversion,
    Cancelled,
}

impl Error {
    /// Create a transport error with a custom message
    pub fn transport<S: Into<String>>(msg: S) -> Self {
        Error::Transport(msg.into())
    }

    /// Create a service error
    pub fn service<S: Into<String>>(status: Option<u16>, msg: S) -> Self {
        Error::Service {
            status,
            message: msg.into(),
        }
    }

    /// Create an invalid parameter error
    pub fn invalid_parameter<S: Into<String>>(name: S, reason: S) -> Self {
        Error::InvalidParameter {
            name: name.into(),
            reason: reason.into(),
        }
    }

    /// Which class of failure this is
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Transport(_) => ErrorKind::Transport,
            Error::Service { .. } => ErrorKind::Service,
            Error::MissingAddress
            | Error::InvalidParameter { .. }
            | Error::InvalidState { .. }
            | Error::Busy => ErrorKind::Validation,
            Error::NoUtxoFound { .. } => ErrorKind::NotFound,
            Error::RateUnavailable | Error::InvalidAmount(_) => ErrorKind::Conversion,
            Error::Cancelled => ErrorKind::Cancelled,
        }
    }
}
