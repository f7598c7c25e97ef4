//! Transaction primitives.
//!
//! A `Transaction` is an atomic event that changes one or two balance
//! entries. The kind is a closed sum type whose variants carry exactly the
//! fields they need, so a currency exchange without a target currency or a
//! transfer without a destination account cannot be constructed.

use chrono::{DateTime, Utc};
use sea_orm::{ActiveValue, entity::prelude::*};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{Currency, EngineError, FeeDirection, FeeKind, FeeSpec, ResultEngine, rates};

/// Kind selector without variant payload.
///
/// Used where only the discriminant matters: fee configuration lookup and
/// transaction list filters.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KindTag {
    Inflow,
    Outflow,
    CurrencyExchange,
    InternalTransfer,
}

impl KindTag {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Inflow => "inflow",
            Self::Outflow => "outflow",
            Self::CurrencyExchange => "currency_exchange",
            Self::InternalTransfer => "internal_transfer",
        }
    }
}

impl TryFrom<&str> for KindTag {
    type Error = EngineError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "inflow" => Ok(Self::Inflow),
            "outflow" => Ok(Self::Outflow),
            "currency_exchange" => Ok(Self::CurrencyExchange),
            "internal_transfer" => Ok(Self::InternalTransfer),
            other => Err(EngineError::InvalidKind(other.to_string())),
        }
    }
}

/// Transaction kind with the fields each kind requires.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TransactionKind {
    Inflow,
    Outflow,
    CurrencyExchange {
        target_currency: Currency,
        exchange_rate: f64,
    },
    InternalTransfer {
        target_account_id: Uuid,
    },
}

impl TransactionKind {
    #[must_use]
    pub fn tag(&self) -> KindTag {
        match self {
            Self::Inflow => KindTag::Inflow,
            Self::Outflow => KindTag::Outflow,
            Self::CurrencyExchange { .. } => KindTag::CurrencyExchange,
            Self::InternalTransfer { .. } => KindTag::InternalTransfer,
        }
    }

    /// Kind-specific constraints, checked before any balance mutation.
    pub fn validate(&self, account_id: Uuid, currency: Currency) -> ResultEngine<()> {
        match self {
            Self::CurrencyExchange {
                target_currency,
                exchange_rate,
            } => {
                if *target_currency == currency {
                    return Err(EngineError::SameCurrencySwap(currency.code().to_string()));
                }
                rates::ensure_valid_rate(*exchange_rate)
            }
            Self::InternalTransfer { target_account_id } => {
                if *target_account_id == account_id {
                    return Err(EngineError::SameAccountTransfer(account_id.to_string()));
                }
                Ok(())
            }
            Self::Inflow | Self::Outflow => Ok(()),
        }
    }

    /// How a fee adjusts the base amount for this kind.
    #[must_use]
    pub fn fee_direction(&self) -> FeeDirection {
        match self {
            Self::Outflow => FeeDirection::AddedOn,
            _ => FeeDirection::Deducted,
        }
    }
}

/// A single balance delta produced by applying a transaction.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Effect {
    pub account_id: Uuid,
    pub currency: Currency,
    pub delta: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    pub id: Uuid,
    pub account_id: Uuid,
    #[serde(flatten)]
    pub kind: TransactionKind,
    pub description: String,
    /// Source-side currency.
    pub currency: Currency,
    /// The post-fee amount actually applied to the ledger.
    pub amount: f64,
    /// The pre-fee amount entered by the caller, present only when a fee
    /// was applied.
    pub original_amount: Option<f64>,
    /// Fee metadata, present only when a fee was applied.
    pub fee: Option<FeeSpec>,
    pub reference: Option<String>,
    pub notes: Option<String>,
    pub created_by: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Transaction {
    /// The amount debited from the source side.
    ///
    /// For exchanges the caller hands over the entered amount and the fee
    /// reduces what gets converted. Every other kind moves the recorded
    /// (post-fee) amount; in particular a transfer debits and credits the
    /// same amount, so the pair's total never changes.
    #[must_use]
    pub fn debited_amount(&self) -> f64 {
        match self.kind {
            TransactionKind::CurrencyExchange { .. } => {
                self.original_amount.unwrap_or(self.amount)
            }
            TransactionKind::Inflow
            | TransactionKind::Outflow
            | TransactionKind::InternalTransfer { .. } => self.amount,
        }
    }

    /// Expands the transaction into its balance effects.
    ///
    /// The expansion uses stored field values only, so negating every delta
    /// yields the exact inverse needed to reverse the transaction later.
    pub fn effects(&self) -> ResultEngine<Vec<Effect>> {
        let effects = match self.kind {
            TransactionKind::Inflow => vec![Effect {
                account_id: self.account_id,
                currency: self.currency,
                delta: self.amount,
            }],
            TransactionKind::Outflow => vec![Effect {
                account_id: self.account_id,
                currency: self.currency,
                delta: -self.amount,
            }],
            TransactionKind::CurrencyExchange {
                target_currency,
                exchange_rate,
            } => {
                let converted =
                    rates::convert(self.amount, self.currency, target_currency, exchange_rate)?;
                vec![
                    Effect {
                        account_id: self.account_id,
                        currency: self.currency,
                        delta: -self.debited_amount(),
                    },
                    Effect {
                        account_id: self.account_id,
                        currency: target_currency,
                        delta: converted,
                    },
                ]
            }
            TransactionKind::InternalTransfer { target_account_id } => vec![
                Effect {
                    account_id: self.account_id,
                    currency: self.currency,
                    delta: -self.amount,
                },
                Effect {
                    account_id: target_account_id,
                    currency: self.currency,
                    delta: self.amount,
                },
            ],
        };
        Ok(effects)
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "transactions")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub account_id: String,
    pub kind: String,
    pub description: String,
    pub currency: String,
    pub amount: f64,
    pub original_amount: Option<f64>,
    pub target_currency: Option<String>,
    pub exchange_rate: Option<f64>,
    pub target_account_id: Option<String>,
    pub fee_kind: Option<String>,
    pub fee_value: Option<f64>,
    pub reference: Option<String>,
    pub notes: Option<String>,
    pub created_by: String,
    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::accounts::Entity",
        from = "Column::AccountId",
        to = "super::accounts::Column::Id",
        on_update = "NoAction",
        on_delete = "Cascade"
    )]
    Accounts,
}

impl Related<super::accounts::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Accounts.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl From<&Transaction> for ActiveModel {
    fn from(tx: &Transaction) -> Self {
        let (target_currency, exchange_rate, target_account_id) = match tx.kind {
            TransactionKind::CurrencyExchange {
                target_currency,
                exchange_rate,
            } => (
                Some(target_currency.code().to_string()),
                Some(exchange_rate),
                None,
            ),
            TransactionKind::InternalTransfer { target_account_id } => {
                (None, None, Some(target_account_id.to_string()))
            }
            TransactionKind::Inflow | TransactionKind::Outflow => (None, None, None),
        };
        Self {
            id: ActiveValue::Set(tx.id.to_string()),
            account_id: ActiveValue::Set(tx.account_id.to_string()),
            kind: ActiveValue::Set(tx.kind.tag().as_str().to_string()),
            description: ActiveValue::Set(tx.description.clone()),
            currency: ActiveValue::Set(tx.currency.code().to_string()),
            amount: ActiveValue::Set(tx.amount),
            original_amount: ActiveValue::Set(tx.original_amount),
            target_currency: ActiveValue::Set(target_currency),
            exchange_rate: ActiveValue::Set(exchange_rate),
            target_account_id: ActiveValue::Set(target_account_id),
            fee_kind: ActiveValue::Set(tx.fee.map(|f| f.kind.as_str().to_string())),
            fee_value: ActiveValue::Set(tx.fee.map(|f| f.value)),
            reference: ActiveValue::Set(tx.reference.clone()),
            notes: ActiveValue::Set(tx.notes.clone()),
            created_by: ActiveValue::Set(tx.created_by.clone()),
            created_at: ActiveValue::Set(tx.created_at),
            updated_at: ActiveValue::Set(tx.updated_at),
        }
    }
}

impl TryFrom<Model> for Transaction {
    type Error = EngineError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        let tag = KindTag::try_from(model.kind.as_str())?;
        let kind = match tag {
            KindTag::Inflow => TransactionKind::Inflow,
            KindTag::Outflow => TransactionKind::Outflow,
            KindTag::CurrencyExchange => {
                let target_currency = model
                    .target_currency
                    .as_deref()
                    .ok_or_else(|| EngineError::MissingField("target_currency".to_string()))?;
                let exchange_rate = model
                    .exchange_rate
                    .ok_or_else(|| EngineError::MissingField("exchange_rate".to_string()))?;
                TransactionKind::CurrencyExchange {
                    target_currency: Currency::try_from(target_currency)?,
                    exchange_rate,
                }
            }
            KindTag::InternalTransfer => {
                let target_account_id = model
                    .target_account_id
                    .as_deref()
                    .ok_or_else(|| EngineError::MissingField("target_account_id".to_string()))?;
                TransactionKind::InternalTransfer {
                    target_account_id: Uuid::parse_str(target_account_id).map_err(|_| {
                        EngineError::KeyNotFound("account not exists".to_string())
                    })?,
                }
            }
        };

        let fee = match (model.fee_kind.as_deref(), model.fee_value) {
            (Some(kind), Some(value)) => Some(FeeSpec {
                kind: FeeKind::try_from(kind)?,
                value,
            }),
            _ => None,
        };

        Ok(Self {
            id: Uuid::parse_str(&model.id)
                .map_err(|_| EngineError::KeyNotFound("transaction not exists".to_string()))?,
            account_id: Uuid::parse_str(&model.account_id)
                .map_err(|_| EngineError::KeyNotFound("account not exists".to_string()))?,
            kind,
            description: model.description,
            currency: Currency::try_from(model.currency.as_str())?,
            amount: model.amount,
            original_amount: model.original_amount,
            fee,
            reference: model.reference,
            notes: model.notes,
            created_by: model.created_by,
            created_at: model.created_at,
            updated_at: model.updated_at,
        })
    }
}
