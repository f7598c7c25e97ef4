//! Ledger engine for named multi-currency accounts.
//!
//! The engine tracks accounts, one balance per currency, and a log of
//! transactions that mutate those balances. Creating a transaction applies
//! its balance effects; editing reverses the stored effects and applies the
//! new ones; deleting reverses them. Balances therefore always equal the
//! sum of the effects of the currently recorded transactions.
//!
//! Every write operation runs inside a single database transaction, so the
//! multi-step apply/reverse sequences are serialized with respect to each
//! other and can never be observed half-applied.

pub use accounts::{Account, AccountView};
pub use commands::{FeeInstruction, TransactionDraft, TransactionListFilter, TransactionPatch};
pub use currency::Currency;
pub use error::EngineError;
pub use fees::{FeeBreakdown, FeeConfig, FeeDirection, FeeKind, FeeSpec};
pub use ops::{Engine, EngineBuilder};
pub use rates::{RateDirection, convert, direction};
pub use transactions::{Effect, KindTag, Transaction, TransactionKind};

pub mod accounts;
pub mod balances;
mod commands;
mod currency;
mod error;
pub mod fees;
mod ops;
pub mod rates;
pub mod transactions;

type ResultEngine<T> = Result<T, EngineError>;
