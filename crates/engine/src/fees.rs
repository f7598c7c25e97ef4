//! Fee math and persisted fee configuration.
//!
//! A fee changes the amount a transaction actually applies to the ledger.
//! The direction of the adjustment depends on the transaction kind: an
//! outflow pays the fee on top of what leaves the account, every other kind
//! has the fee deducted from what moves on.

use sea_orm::{ActiveValue, entity::prelude::*};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{Currency, EngineError, KindTag, ResultEngine};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeeKind {
    Percentage,
    Fixed,
}

impl FeeKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Percentage => "percentage",
            Self::Fixed => "fixed",
        }
    }
}

impl TryFrom<&str> for FeeKind {
    type Error = EngineError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "percentage" => Ok(Self::Percentage),
            "fixed" => Ok(Self::Fixed),
            other => Err(EngineError::InvalidAmount(format!(
                "invalid fee kind: {other}"
            ))),
        }
    }
}

/// How the fee adjusts the base amount.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FeeDirection {
    /// The fee is deducted from what the receiving side gets
    /// (inflows, exchanges, internal transfers).
    Deducted,
    /// The fee is added on top of what leaves the account (outflows).
    AddedOn,
}

/// Result of assessing a fee against a base amount.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FeeBreakdown {
    pub final_amount: f64,
    pub fee_amount: f64,
}

/// A fee specification: kind plus value.
///
/// For `Percentage` the value is expressed in percent (`1.5` means 1.5%),
/// for `Fixed` it is an absolute amount in the transaction currency.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct FeeSpec {
    pub kind: FeeKind,
    pub value: f64,
}

impl FeeSpec {
    /// Validates the specification before any balance is touched.
    pub fn validate(&self) -> ResultEngine<()> {
        if !self.value.is_finite() || self.value <= 0.0 {
            return Err(EngineError::InvalidAmount(
                "fee value must be > 0".to_string(),
            ));
        }
        if self.kind == FeeKind::Percentage && self.value > 100.0 {
            return Err(EngineError::InvalidAmount(
                "percentage fee must not exceed 100".to_string(),
            ));
        }
        Ok(())
    }

    /// Computes the post-fee amount and the fee amount for a base amount.
    #[must_use]
    pub fn assess(&self, base_amount: f64, direction: FeeDirection) -> FeeBreakdown {
        let fee_amount = match self.kind {
            FeeKind::Percentage => base_amount * self.value / 100.0,
            FeeKind::Fixed => self.value,
        };
        let final_amount = match direction {
            FeeDirection::Deducted => base_amount - fee_amount,
            FeeDirection::AddedOn => base_amount + fee_amount,
        };
        FeeBreakdown {
            final_amount,
            fee_amount,
        }
    }
}

/// A persisted default fee for a `(currency, transaction kind)` pair.
///
/// Used to pre-fill the fee when a transaction request does not carry an
/// explicit one. Managed through its own operations; the transaction flow
/// never writes fee configuration.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FeeConfig {
    pub id: Uuid,
    pub currency: Currency,
    pub transaction_kind: KindTag,
    pub spec: FeeSpec,
    pub active: bool,
    pub description: Option<String>,
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "fees")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub currency: String,
    pub transaction_kind: String,
    pub fee_kind: String,
    pub fee_value: f64,
    pub active: bool,
    pub description: Option<String>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl From<&FeeConfig> for ActiveModel {
    fn from(config: &FeeConfig) -> Self {
        Self {
            id: ActiveValue::Set(config.id.to_string()),
            currency: ActiveValue::Set(config.currency.code().to_string()),
            transaction_kind: ActiveValue::Set(config.transaction_kind.as_str().to_string()),
            fee_kind: ActiveValue::Set(config.spec.kind.as_str().to_string()),
            fee_value: ActiveValue::Set(config.spec.value),
            active: ActiveValue::Set(config.active),
            description: ActiveValue::Set(config.description.clone()),
        }
    }
}

impl TryFrom<Model> for FeeConfig {
    type Error = EngineError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        Ok(Self {
            id: Uuid::parse_str(&model.id)
                .map_err(|_| EngineError::KeyNotFound("fee not exists".to_string()))?,
            currency: Currency::try_from(model.currency.as_str())?,
            transaction_kind: KindTag::try_from(model.transaction_kind.as_str())?,
            spec: FeeSpec {
                kind: FeeKind::try_from(model.fee_kind.as_str())?,
                value: model.fee_value,
            },
            active: model.active,
            description: model.description,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn percentage_fee_is_deducted_on_inflow_direction() {
        let spec = FeeSpec {
            kind: FeeKind::Percentage,
            value: 10.0,
        };
        let breakdown = spec.assess(200.0, FeeDirection::Deducted);
        assert_eq!(breakdown.fee_amount, 20.0);
        assert_eq!(breakdown.final_amount, 180.0);
    }

    #[test]
    fn percentage_fee_is_added_on_outflow_direction() {
        let spec = FeeSpec {
            kind: FeeKind::Percentage,
            value: 5.0,
        };
        let breakdown = spec.assess(100.0, FeeDirection::AddedOn);
        assert_eq!(breakdown.fee_amount, 5.0);
        assert_eq!(breakdown.final_amount, 105.0);
    }

    #[test]
    fn fixed_fee_both_directions() {
        let spec = FeeSpec {
            kind: FeeKind::Fixed,
            value: 5.0,
        };
        assert_eq!(
            spec.assess(100.0, FeeDirection::Deducted).final_amount,
            95.0
        );
        assert_eq!(spec.assess(100.0, FeeDirection::AddedOn).final_amount, 105.0);
    }

    #[test]
    fn validate_rejects_non_positive_and_oversized_values() {
        assert!(
            FeeSpec {
                kind: FeeKind::Fixed,
                value: 0.0
            }
            .validate()
            .is_err()
        );
        assert!(
            FeeSpec {
                kind: FeeKind::Percentage,
                value: 120.0
            }
            .validate()
            .is_err()
        );
        assert!(
            FeeSpec {
                kind: FeeKind::Percentage,
                value: 100.0
            }
            .validate()
            .is_ok()
        );
    }
}
