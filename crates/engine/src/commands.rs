//! Command structs for engine operations.
//!
//! These types group parameters for write operations (create/update of
//! transactions, fee configuration, listing), keeping call sites readable
//! and avoiding long argument lists.

use uuid::Uuid;

use crate::{Currency, FeeSpec, KindTag, TransactionKind};

/// How a transaction request chooses its fee.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub enum FeeInstruction {
    /// Use the active configured fee for `(currency, kind)`, if any.
    #[default]
    UseConfigured,
    /// Apply no fee even when one is configured.
    Waived,
    /// Apply exactly this fee.
    Explicit(FeeSpec),
}

/// Create a transaction.
///
/// `amount` is the amount the caller entered; when a fee applies, the
/// engine records the post-fee amount and keeps the entered one as
/// `original_amount`.
#[derive(Clone, Debug)]
pub struct TransactionDraft {
    pub account_id: Uuid,
    pub kind: TransactionKind,
    pub description: String,
    pub currency: Currency,
    pub amount: f64,
    pub fee: FeeInstruction,
    pub reference: Option<String>,
    pub notes: Option<String>,
    pub created_by: String,
}

impl TransactionDraft {
    #[must_use]
    pub fn new(
        account_id: Uuid,
        kind: TransactionKind,
        currency: Currency,
        amount: f64,
        description: impl Into<String>,
        created_by: impl Into<String>,
    ) -> Self {
        Self {
            account_id,
            kind,
            description: description.into(),
            currency,
            amount,
            fee: FeeInstruction::default(),
            reference: None,
            notes: None,
            created_by: created_by.into(),
        }
    }

    #[must_use]
    pub fn fee(mut self, fee: FeeInstruction) -> Self {
        self.fee = fee;
        self
    }

    #[must_use]
    pub fn reference(mut self, reference: impl Into<String>) -> Self {
        self.reference = Some(reference.into());
        self
    }

    #[must_use]
    pub fn notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }
}

/// Field-level changes for an existing transaction.
///
/// `None` keeps the stored value. Changing `kind` replaces the whole
/// variant, so switching kinds always supplies the fields the new kind
/// needs and never inherits stale ones. `amount` is the new pre-fee base
/// amount; the fee is re-assessed against it.
#[derive(Clone, Debug, Default)]
pub struct TransactionPatch {
    pub account_id: Option<Uuid>,
    pub kind: Option<TransactionKind>,
    pub description: Option<String>,
    pub currency: Option<Currency>,
    pub amount: Option<f64>,
    pub fee: Option<FeeInstruction>,
    pub reference: Option<String>,
    pub notes: Option<String>,
}

impl TransactionPatch {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn amount(mut self, amount: f64) -> Self {
        self.amount = Some(amount);
        self
    }

    #[must_use]
    pub fn kind(mut self, kind: TransactionKind) -> Self {
        self.kind = Some(kind);
        self
    }

    #[must_use]
    pub fn account_id(mut self, account_id: Uuid) -> Self {
        self.account_id = Some(account_id);
        self
    }

    #[must_use]
    pub fn currency(mut self, currency: Currency) -> Self {
        self.currency = Some(currency);
        self
    }

    #[must_use]
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    #[must_use]
    pub fn fee(mut self, fee: FeeInstruction) -> Self {
        self.fee = Some(fee);
        self
    }

    #[must_use]
    pub fn reference(mut self, reference: impl Into<String>) -> Self {
        self.reference = Some(reference.into());
        self
    }

    #[must_use]
    pub fn notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }
}

/// Filters for transaction listing.
#[derive(Clone, Debug, Default)]
pub struct TransactionListFilter {
    pub account_id: Option<Uuid>,
    pub kind: Option<KindTag>,
    pub currency: Option<Currency>,
    /// Also return internal transfers whose target is the filtered account.
    pub include_incoming_transfers: bool,
    pub limit: Option<u64>,
}

impl TransactionListFilter {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn account_id(mut self, account_id: Uuid) -> Self {
        self.account_id = Some(account_id);
        self
    }

    #[must_use]
    pub fn kind(mut self, kind: KindTag) -> Self {
        self.kind = Some(kind);
        self
    }

    #[must_use]
    pub fn currency(mut self, currency: Currency) -> Self {
        self.currency = Some(currency);
        self
    }

    #[must_use]
    pub fn include_incoming_transfers(mut self) -> Self {
        self.include_incoming_transfers = true;
        self
    }

    #[must_use]
    pub fn limit(mut self, limit: u64) -> Self {
        self.limit = Some(limit);
        self
    }
}
