use thiserror::Error;

use crate::decimal::Money;

#[derive(Error, Debug)]
pub enum LedgerError {
    #[error("malformed contract: {message}")]
    MalformedContract {
        message: String,
    },

    #[error("invalid payment amount: {amount}")]
    InvalidPaymentAmount {
        amount: Money,
    },

    #[error("invalid override for period {period}: {message}")]
    InvalidOverride {
        period: i64,
        message: String,
    },

    #[error("invalid configuration: {message}")]
    InvalidConfiguration {
        message: String,
    },
}

pub type Result<T> = std::result::Result<T, LedgerError>;
