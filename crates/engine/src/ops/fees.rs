use sea_orm::{ActiveValue, ConnectionTrait, QueryFilter, QueryOrder, TransactionTrait, prelude::*};
use tracing::info;
use uuid::Uuid;

use crate::{Currency, EngineError, FeeConfig, FeeSpec, KindTag, ResultEngine, fees};

use super::{Engine, normalize_optional_text, with_tx};

impl Engine {
    /// Creates or replaces the default fee for a `(currency, kind)` pair.
    pub async fn set_fee(
        &self,
        currency: Currency,
        transaction_kind: KindTag,
        spec: FeeSpec,
        description: Option<&str>,
    ) -> ResultEngine<Uuid> {
        spec.validate()?;
        let description = normalize_optional_text(description);

        with_tx!(self, |db_tx| {
            let existing = find_config(&db_tx, currency, transaction_kind).await?;
            let id = match existing {
                Some(model) => {
                    let id = Uuid::parse_str(&model.id)
                        .map_err(|_| EngineError::KeyNotFound("fee not exists".to_string()))?;
                    let mut active: fees::ActiveModel = model.into();
                    active.fee_kind = ActiveValue::Set(spec.kind.as_str().to_string());
                    active.fee_value = ActiveValue::Set(spec.value);
                    active.active = ActiveValue::Set(true);
                    active.description = ActiveValue::Set(description);
                    active.update(&db_tx).await?;
                    id
                }
                None => {
                    let config = FeeConfig {
                        id: Uuid::new_v4(),
                        currency,
                        transaction_kind,
                        spec,
                        active: true,
                        description,
                    };
                    fees::ActiveModel::from(&config).insert(&db_tx).await?;
                    config.id
                }
            };
            info!(
                currency = %currency,
                kind = transaction_kind.as_str(),
                "fee configured"
            );
            Ok(id)
        })
    }

    /// Disables the configured fee for a pair without deleting its record.
    pub async fn deactivate_fee(
        &self,
        currency: Currency,
        transaction_kind: KindTag,
    ) -> ResultEngine<()> {
        with_tx!(self, |db_tx| {
            let model = find_config(&db_tx, currency, transaction_kind)
                .await?
                .ok_or_else(|| EngineError::KeyNotFound("fee not exists".to_string()))?;
            let mut active: fees::ActiveModel = model.into();
            active.active = ActiveValue::Set(false);
            active.update(&db_tx).await?;
            Ok(())
        })
    }

    /// Returns the configured fee for a pair, active or not.
    pub async fn fee(
        &self,
        currency: Currency,
        transaction_kind: KindTag,
    ) -> ResultEngine<Option<FeeConfig>> {
        let model = find_config(&self.database, currency, transaction_kind).await?;
        model.map(FeeConfig::try_from).transpose()
    }

    /// Lists every configured fee.
    pub async fn list_fees(&self) -> ResultEngine<Vec<FeeConfig>> {
        let models = fees::Entity::find()
            .order_by_asc(fees::Column::Currency)
            .order_by_asc(fees::Column::TransactionKind)
            .all(&self.database)
            .await?;
        models.into_iter().map(FeeConfig::try_from).collect()
    }

    /// Active configured fee used to pre-fill a transaction request that
    /// does not carry an explicit fee.
    pub(super) async fn configured_fee<C: ConnectionTrait>(
        &self,
        db: &C,
        currency: Currency,
        transaction_kind: KindTag,
    ) -> ResultEngine<Option<FeeSpec>> {
        let model = find_config(db, currency, transaction_kind).await?;
        match model.filter(|m| m.active) {
            Some(model) => Ok(Some(FeeConfig::try_from(model)?.spec)),
            None => Ok(None),
        }
    }
}

async fn find_config<C: ConnectionTrait>(
    db: &C,
    currency: Currency,
    transaction_kind: KindTag,
) -> ResultEngine<Option<fees::Model>> {
    let model = fees::Entity::find()
        .filter(fees::Column::Currency.eq(currency.code()))
        .filter(fees::Column::TransactionKind.eq(transaction_kind.as_str()))
        .one(db)
        .await?;
    Ok(model)
}
