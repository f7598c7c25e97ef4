use sea_orm::{ActiveValue, ConnectionTrait, QueryFilter, QueryOrder, TransactionTrait, prelude::*};
use tracing::info;
use uuid::Uuid;

use crate::{Account, AccountView, Currency, EngineError, ResultEngine, accounts, balances};

use super::{Engine, normalize_required_text, with_tx};

impl Engine {
    pub(super) async fn require_account<C: ConnectionTrait>(
        &self,
        db: &C,
        account_id: Uuid,
    ) -> ResultEngine<accounts::Model> {
        accounts::Entity::find_by_id(account_id.to_string())
            .one(db)
            .await?
            .ok_or_else(|| EngineError::KeyNotFound("account not exists".to_string()))
    }

    /// Creates a named account, optionally with opening balances.
    pub async fn new_account(
        &self,
        name: &str,
        opening_balances: &[(Currency, f64)],
    ) -> ResultEngine<Uuid> {
        let name = normalize_required_text(name, "name")?;
        for (index, (currency, amount)) in opening_balances.iter().enumerate() {
            if !amount.is_finite() {
                return Err(EngineError::InvalidAmount(format!(
                    "opening balance for {currency} must be a number"
                )));
            }
            if opening_balances[..index].iter().any(|(c, _)| c == currency) {
                return Err(EngineError::ExistingKey(format!(
                    "opening balance for {currency}"
                )));
            }
        }

        with_tx!(self, |db_tx| {
            let existing = accounts::Entity::find()
                .filter(accounts::Column::Name.eq(name.clone()))
                .one(&db_tx)
                .await?;
            if existing.is_some() {
                return Err(EngineError::ExistingKey(name));
            }

            let account = Account::new(name);
            accounts::ActiveModel::from(&account).insert(&db_tx).await?;

            for (currency, amount) in opening_balances {
                let row = balances::ActiveModel {
                    account_id: ActiveValue::Set(account.id.to_string()),
                    currency: ActiveValue::Set(currency.code().to_string()),
                    amount: ActiveValue::Set(*amount),
                };
                row.insert(&db_tx).await?;
            }

            info!(account_id = %account.id, name = %account.name, "account created");
            Ok(account.id)
        })
    }

    /// Returns an account together with its balance entries.
    pub async fn account(&self, account_id: Uuid) -> ResultEngine<AccountView> {
        let model = self.require_account(&self.database, account_id).await?;
        self.view_for(model).await
    }

    /// Looks an account up by its unique name.
    pub async fn account_by_name(&self, name: &str) -> ResultEngine<AccountView> {
        let model = accounts::Entity::find()
            .filter(accounts::Column::Name.eq(name.trim()))
            .one(&self.database)
            .await?
            .ok_or_else(|| EngineError::KeyNotFound("account not exists".to_string()))?;
        self.view_for(model).await
    }

    /// Lists every account with its balances, ordered by name.
    pub async fn list_accounts(&self) -> ResultEngine<Vec<AccountView>> {
        let models = accounts::Entity::find()
            .order_by_asc(accounts::Column::Name)
            .all(&self.database)
            .await?;
        let mut views = Vec::with_capacity(models.len());
        for model in models {
            views.push(self.view_for(model).await?);
        }
        Ok(views)
    }

    /// Deletes an account. Balance entries and transactions referencing it
    /// are removed by the schema's cascade rules.
    pub async fn delete_account(&self, account_id: Uuid) -> ResultEngine<()> {
        with_tx!(self, |db_tx| {
            self.require_account(&db_tx, account_id).await?;
            accounts::Entity::delete_by_id(account_id.to_string())
                .exec(&db_tx)
                .await?;
            info!(%account_id, "account deleted");
            Ok(())
        })
    }

    async fn view_for(&self, model: accounts::Model) -> ResultEngine<AccountView> {
        let account = Account::try_from(model)?;
        let rows: Vec<balances::Model> = balances::Entity::find()
            .filter(balances::Column::AccountId.eq(account.id.to_string()))
            .all(&self.database)
            .await?;
        let mut entries = Vec::with_capacity(rows.len());
        for row in rows {
            entries.push((Currency::try_from(row.currency.as_str())?, row.amount));
        }
        Ok(AccountView {
            id: account.id,
            name: account.name,
            balances: entries,
        })
    }
}
