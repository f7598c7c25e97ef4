use serde::{Deserialize, Serialize};

use crate::EngineError;

/// One of the currencies an account can hold a balance in.
///
/// The set is closed on purpose: the conversion direction table and the
/// cheque overdraft rule are defined per currency, so an open-ended string
/// would push validation down to every call site.
///
/// Amounts are stored as `f64` major units; the ledger applies no rounding.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Currency {
    /// The primary dollar currency ("DÓLAR").
    #[default]
    #[serde(rename = "DÓLAR")]
    Dolar,
    #[serde(rename = "CABLE")]
    Cable,
    #[serde(rename = "PESOS")]
    Pesos,
    #[serde(rename = "CHEQUE")]
    Cheque,
    #[serde(rename = "DOLAR INTERNACIONAL")]
    DolarInternacional,
}

impl Currency {
    /// Canonical currency code.
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Currency::Dolar => "DÓLAR",
            Currency::Cable => "CABLE",
            Currency::Pesos => "PESOS",
            Currency::Cheque => "CHEQUE",
            Currency::DolarInternacional => "DOLAR INTERNACIONAL",
        }
    }

    /// Whether the no-overdraft rule applies to this currency.
    ///
    /// Cheques are the only currency whose balance must never be driven
    /// negative by a forward application.
    #[must_use]
    pub const fn is_overdraft_protected(self) -> bool {
        matches!(self, Currency::Cheque)
    }
}

impl core::fmt::Display for Currency {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.code())
    }
}

impl TryFrom<&str> for Currency {
    type Error = EngineError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value.trim().to_ascii_uppercase().as_str() {
            "DÓLAR" | "DOLAR" => Ok(Currency::Dolar),
            "CABLE" => Ok(Currency::Cable),
            "PESOS" => Ok(Currency::Pesos),
            "CHEQUE" => Ok(Currency::Cheque),
            "DOLAR INTERNACIONAL" => Ok(Currency::DolarInternacional),
            other => Err(EngineError::CurrencyMismatch(format!(
                "unsupported currency: {other}"
            ))),
        }
    }
}
