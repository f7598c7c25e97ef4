use chrono::{DateTime, Utc};
use sea_orm::{
    ConnectionTrait, QueryFilter, QueryOrder, QuerySelect, TransactionTrait, prelude::*,
    sea_query::Condition,
};
use tracing::info;
use uuid::Uuid;

use crate::{
    EngineError, FeeInstruction, FeeSpec, KindTag, ResultEngine, Transaction, TransactionDraft,
    TransactionKind, TransactionListFilter, TransactionPatch, transactions,
};

use super::balances::{apply_effects, guard_overdraft, reverse_effects};
use super::{Engine, normalize_optional_text, normalize_required_text, with_tx};

/// Validates a draft and turns it into a persistable record.
///
/// The recorded `amount` is the post-fee amount; the entered amount is kept
/// as `original_amount` only when a fee was actually applied.
fn build_record(
    draft: &TransactionDraft,
    resolved_fee: Option<FeeSpec>,
    id: Uuid,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
) -> ResultEngine<Transaction> {
    let description = normalize_required_text(&draft.description, "description")?;
    let created_by = normalize_required_text(&draft.created_by, "created_by")?;

    if !draft.amount.is_finite() || draft.amount <= 0.0 {
        return Err(EngineError::InvalidAmount(
            "amount must be > 0".to_string(),
        ));
    }
    draft.kind.validate(draft.account_id, draft.currency)?;

    let (amount, original_amount, fee) = match resolved_fee {
        Some(spec) => {
            spec.validate()?;
            let breakdown = spec.assess(draft.amount, draft.kind.fee_direction());
            if breakdown.fee_amount > 0.0 {
                (breakdown.final_amount, Some(draft.amount), Some(spec))
            } else {
                (draft.amount, None, None)
            }
        }
        None => (draft.amount, None, None),
    };

    Ok(Transaction {
        id,
        account_id: draft.account_id,
        kind: draft.kind,
        description,
        currency: draft.currency,
        amount,
        original_amount,
        fee,
        reference: normalize_optional_text(draft.reference.as_deref()),
        notes: normalize_optional_text(draft.notes.as_deref()),
        created_by,
        created_at,
        updated_at,
    })
}

impl Engine {
    async fn resolve_fee<C: ConnectionTrait>(
        &self,
        db: &C,
        draft: &TransactionDraft,
    ) -> ResultEngine<Option<FeeSpec>> {
        match draft.fee {
            FeeInstruction::Explicit(spec) => Ok(Some(spec)),
            FeeInstruction::Waived => Ok(None),
            FeeInstruction::UseConfigured => {
                self.configured_fee(db, draft.currency, draft.kind.tag())
                    .await
            }
        }
    }

    async fn require_effect_accounts<C: ConnectionTrait>(
        &self,
        db: &C,
        tx: &Transaction,
    ) -> ResultEngine<()> {
        self.require_account(db, tx.account_id).await?;
        if let TransactionKind::InternalTransfer { target_account_id } = tx.kind {
            self.require_account(db, target_account_id).await?;
        }
        Ok(())
    }

    /// Creates a transaction: validates, resolves the fee, applies the
    /// balance effects and persists the record, all in one database
    /// transaction.
    pub async fn create_transaction(&self, draft: TransactionDraft) -> ResultEngine<Transaction> {
        with_tx!(self, |db_tx| {
            let resolved_fee = self.resolve_fee(&db_tx, &draft).await?;
            let now = Utc::now();
            let record = build_record(&draft, resolved_fee, Uuid::new_v4(), now, now)?;

            self.require_effect_accounts(&db_tx, &record).await?;

            let effects = record.effects()?;
            guard_overdraft(&db_tx, &effects).await?;
            apply_effects(&db_tx, &effects).await?;

            transactions::ActiveModel::from(&record).insert(&db_tx).await?;

            info!(
                transaction_id = %record.id,
                account_id = %record.account_id,
                kind = record.kind.tag().as_str(),
                amount = record.amount,
                "transaction created"
            );
            Ok(record)
        })
    }

    /// Edits a stored transaction.
    ///
    /// The stored effects are reversed in full before the merged record is
    /// applied, so a currency appearing on both sides never passes through
    /// an inconsistent intermediate state. The merged record is validated
    /// like a fresh one; the overdraft rule is enforced on the forward
    /// application only.
    pub async fn update_transaction(
        &self,
        transaction_id: Uuid,
        patch: TransactionPatch,
    ) -> ResultEngine<Transaction> {
        with_tx!(self, |db_tx| {
            let stored = load_transaction(&db_tx, transaction_id).await?;

            let draft = merge_patch(&stored, patch);
            let resolved_fee = self.resolve_fee(&db_tx, &draft).await?;
            let record = build_record(
                &draft,
                resolved_fee,
                stored.id,
                stored.created_at,
                Utc::now(),
            )?;

            self.require_effect_accounts(&db_tx, &record).await?;

            reverse_effects(&db_tx, &stored.effects()?).await?;

            let effects = record.effects()?;
            guard_overdraft(&db_tx, &effects).await?;
            apply_effects(&db_tx, &effects).await?;

            transactions::ActiveModel::from(&record).update(&db_tx).await?;

            info!(
                transaction_id = %record.id,
                kind = record.kind.tag().as_str(),
                amount = record.amount,
                "transaction updated"
            );
            Ok(record)
        })
    }

    /// Deletes a stored transaction after reversing its balance effects.
    pub async fn delete_transaction(&self, transaction_id: Uuid) -> ResultEngine<()> {
        with_tx!(self, |db_tx| {
            let stored = load_transaction(&db_tx, transaction_id).await?;

            reverse_effects(&db_tx, &stored.effects()?).await?;
            transactions::Entity::delete_by_id(transaction_id.to_string())
                .exec(&db_tx)
                .await?;

            info!(%transaction_id, "transaction deleted");
            Ok(())
        })
    }

    /// Returns a stored transaction.
    pub async fn transaction(&self, transaction_id: Uuid) -> ResultEngine<Transaction> {
        load_transaction(&self.database, transaction_id).await
    }

    /// Lists transactions newest first, optionally filtered.
    pub async fn list_transactions(
        &self,
        filter: TransactionListFilter,
    ) -> ResultEngine<Vec<Transaction>> {
        let mut query = transactions::Entity::find()
            .order_by_desc(transactions::Column::CreatedAt);

        if let Some(account_id) = filter.account_id {
            let id = account_id.to_string();
            let condition = if filter.include_incoming_transfers {
                Condition::any()
                    .add(transactions::Column::AccountId.eq(id.clone()))
                    .add(
                        Condition::all()
                            .add(transactions::Column::TargetAccountId.eq(id))
                            .add(
                                transactions::Column::Kind
                                    .eq(KindTag::InternalTransfer.as_str()),
                            ),
                    )
            } else {
                Condition::all().add(transactions::Column::AccountId.eq(id))
            };
            query = query.filter(condition);
        }
        if let Some(kind) = filter.kind {
            query = query.filter(transactions::Column::Kind.eq(kind.as_str()));
        }
        if let Some(currency) = filter.currency {
            query = query.filter(transactions::Column::Currency.eq(currency.code()));
        }
        if let Some(limit) = filter.limit {
            query = query.limit(limit);
        }

        let models = query.all(&self.database).await?;
        models.into_iter().map(Transaction::try_from).collect()
    }
}

async fn load_transaction<C: ConnectionTrait>(
    db: &C,
    transaction_id: Uuid,
) -> ResultEngine<Transaction> {
    let model = transactions::Entity::find_by_id(transaction_id.to_string())
        .one(db)
        .await?
        .ok_or_else(|| EngineError::KeyNotFound("transaction not exists".to_string()))?;
    Transaction::try_from(model)
}

/// Merges caller changes onto a stored record, producing a full draft of
/// the same shape used for creation.
///
/// The base amount is the stored pre-fee amount unless the patch supplies a
/// new one; an untouched fee re-applies the stored outcome exactly, so a
/// metadata-only edit reproduces the same balances.
fn merge_patch(stored: &Transaction, patch: TransactionPatch) -> TransactionDraft {
    let stored_base = stored.original_amount.unwrap_or(stored.amount);
    let stored_fee = stored
        .fee
        .map(FeeInstruction::Explicit)
        .unwrap_or(FeeInstruction::Waived);

    TransactionDraft {
        account_id: patch.account_id.unwrap_or(stored.account_id),
        kind: patch.kind.unwrap_or(stored.kind),
        description: patch
            .description
            .unwrap_or_else(|| stored.description.clone()),
        currency: patch.currency.unwrap_or(stored.currency),
        amount: patch.amount.unwrap_or(stored_base),
        fee: patch.fee.unwrap_or(stored_fee),
        reference: match patch.reference {
            Some(value) => normalize_optional_text(Some(&value)),
            None => stored.reference.clone(),
        },
        notes: match patch.notes {
            Some(value) => normalize_optional_text(Some(&value)),
            None => stored.notes.clone(),
        },
        created_by: stored.created_by.clone(),
    }
}
