//! The module contains the errors the engine can throw.
//!
//! Validation and business-rule errors are always raised before any balance
//! mutation; a failed operation leaves no partial effect because every write
//! runs inside a single database transaction.

use sea_orm::DbErr;
use thiserror::Error;

/// Engine custom errors.
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Missing field: {0}")]
    MissingField(String),
    #[error("Invalid transaction kind: {0}")]
    InvalidKind(String),
    #[error("Cannot exchange a currency into itself: {0}")]
    SameCurrencySwap(String),
    #[error("Cannot transfer to the same account: {0}")]
    SameAccountTransfer(String),
    #[error("Insufficient funds: {0}")]
    InsufficientBalance(String),
    #[error("\"{0}\" key not found!")]
    KeyNotFound(String),
    #[error("\"{0}\" already present!")]
    ExistingKey(String),
    #[error("Invalid exchange rate: {0}")]
    InvalidRate(String),
    #[error("Invalid amount: {0}")]
    InvalidAmount(String),
    #[error("Currency mismatch: {0}")]
    CurrencyMismatch(String),
    #[error(transparent)]
    Database(#[from] DbErr),
}

impl PartialEq for EngineError {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::MissingField(a), Self::MissingField(b)) => a == b,
            (Self::InvalidKind(a), Self::InvalidKind(b)) => a == b,
            (Self::SameCurrencySwap(a), Self::SameCurrencySwap(b)) => a == b,
            (Self::SameAccountTransfer(a), Self::SameAccountTransfer(b)) => a == b,
            (Self::InsufficientBalance(a), Self::InsufficientBalance(b)) => a == b,
            (Self::KeyNotFound(a), Self::KeyNotFound(b)) => a == b,
            (Self::ExistingKey(a), Self::ExistingKey(b)) => a == b,
            (Self::InvalidRate(a), Self::InvalidRate(b)) => a == b,
            (Self::InvalidAmount(a), Self::InvalidAmount(b)) => a == b,
            (Self::CurrencyMismatch(a), Self::CurrencyMismatch(b)) => a == b,
            (Self::Database(a), Self::Database(b)) => a.to_string() == b.to_string(),
            _ => false,
        }
    }
}
