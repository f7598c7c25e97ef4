use sea_orm::{ActiveValue, ConnectionTrait, prelude::*};
use tracing::warn;
use uuid::Uuid;

use crate::{Currency, Effect, EngineError, ResultEngine, balances};

use super::Engine;

/// Balance held by `account_id` in `currency`; an absent row reads as zero.
pub(super) async fn balance_amount<C: ConnectionTrait>(
    db: &C,
    account_id: Uuid,
    currency: Currency,
) -> ResultEngine<f64> {
    let row = balances::Entity::find_by_id((account_id.to_string(), currency.code().to_string()))
        .one(db)
        .await?;
    Ok(row.map_or(0.0, |model| model.amount))
}

/// Adds `delta` (possibly negative) to one balance entry, creating the row
/// lazily for a currency the account has not seen yet.
pub(super) async fn adjust_balance<C: ConnectionTrait>(
    db: &C,
    account_id: Uuid,
    currency: Currency,
    delta: f64,
) -> ResultEngine<()> {
    let existing =
        balances::Entity::find_by_id((account_id.to_string(), currency.code().to_string()))
            .one(db)
            .await?;
    match existing {
        Some(model) => {
            let amount = model.amount + delta;
            let mut active: balances::ActiveModel = model.into();
            active.amount = ActiveValue::Set(amount);
            active.update(db).await?;
        }
        None => {
            let active = balances::ActiveModel {
                account_id: ActiveValue::Set(account_id.to_string()),
                currency: ActiveValue::Set(currency.code().to_string()),
                amount: ActiveValue::Set(delta),
            };
            active.insert(db).await?;
        }
    }
    Ok(())
}

/// Applies every effect of one transaction, in order, against the same
/// database transaction.
pub(super) async fn apply_effects<C: ConnectionTrait>(
    db: &C,
    effects: &[Effect],
) -> ResultEngine<()> {
    for effect in effects {
        adjust_balance(db, effect.account_id, effect.currency, effect.delta).await?;
    }
    Ok(())
}

/// Same as [`apply_effects`] with every delta negated.
pub(super) async fn reverse_effects<C: ConnectionTrait>(
    db: &C,
    effects: &[Effect],
) -> ResultEngine<()> {
    for effect in effects {
        adjust_balance(db, effect.account_id, effect.currency, -effect.delta).await?;
    }
    Ok(())
}

/// Rejects a forward application that would overdraw an overdraft-protected
/// currency. Reversals are never guarded, so corrections stay possible.
pub(super) async fn guard_overdraft<C: ConnectionTrait>(
    db: &C,
    effects: &[Effect],
) -> ResultEngine<()> {
    for effect in effects {
        if effect.delta < 0.0 && effect.currency.is_overdraft_protected() {
            let balance = balance_amount(db, effect.account_id, effect.currency).await?;
            if -effect.delta > balance {
                warn!(
                    account_id = %effect.account_id,
                    currency = %effect.currency,
                    balance,
                    debit = -effect.delta,
                    "rejecting overdraft on protected currency"
                );
                return Err(EngineError::InsufficientBalance(format!(
                    "{} balance {balance} is less than {}",
                    effect.currency,
                    -effect.delta
                )));
            }
        }
    }
    Ok(())
}

impl Engine {
    /// Current balance of one `(account, currency)` pair.
    pub async fn balance(&self, account_id: Uuid, currency: Currency) -> ResultEngine<f64> {
        self.require_account(&self.database, account_id).await?;
        balance_amount(&self.database, account_id, currency).await
    }
}
