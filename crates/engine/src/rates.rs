//! Currency conversion for exchange transactions.
//!
//! A quoted rate ordinarily means "1 unit of the source currency equals
//! `rate` units of the target currency", so conversion multiplies. Two
//! currency pairs quote the other way around by market convention; those
//! pairs divide instead. The exceptions live in an explicit table so they
//! can be unit-tested on their own rather than buried in branch logic.

use crate::{Currency, EngineError, ResultEngine};

/// Whether a quoted rate multiplies or divides the source amount.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RateDirection {
    Multiply,
    Divide,
}

/// Currency pairs whose quote is expressed target-to-source.
const INVERTED_PAIRS: &[(Currency, Currency)] = &[
    (Currency::Pesos, Currency::Dolar),
    (Currency::Cheque, Currency::Pesos),
];

/// Resolves the conversion direction for a currency pair.
#[must_use]
pub fn direction(from: Currency, to: Currency) -> RateDirection {
    if INVERTED_PAIRS.contains(&(from, to)) {
        RateDirection::Divide
    } else {
        RateDirection::Multiply
    }
}

/// Converts `amount` from one currency to another at a quoted rate.
///
/// A rate that is zero, negative or not finite is rejected before any
/// balance is touched.
pub fn convert(amount: f64, from: Currency, to: Currency, rate: f64) -> ResultEngine<f64> {
    ensure_valid_rate(rate)?;
    let converted = match direction(from, to) {
        RateDirection::Multiply => amount * rate,
        RateDirection::Divide => amount / rate,
    };
    Ok(converted)
}

pub(crate) fn ensure_valid_rate(rate: f64) -> ResultEngine<()> {
    if !rate.is_finite() || rate <= 0.0 {
        return Err(EngineError::InvalidRate(format!(
            "exchange rate must be a positive number, got {rate}"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_pairs_multiply() {
        assert_eq!(
            direction(Currency::Dolar, Currency::Pesos),
            RateDirection::Multiply
        );
        assert_eq!(
            direction(Currency::Cable, Currency::Cheque),
            RateDirection::Multiply
        );
        assert_eq!(convert(100.0, Currency::Dolar, Currency::Pesos, 1000.0).unwrap(), 100_000.0);
    }

    #[test]
    fn pesos_to_dolar_divides() {
        assert_eq!(
            direction(Currency::Pesos, Currency::Dolar),
            RateDirection::Divide
        );
        assert_eq!(
            convert(100_000.0, Currency::Pesos, Currency::Dolar, 1000.0).unwrap(),
            100.0
        );
    }

    #[test]
    fn cheque_to_pesos_divides() {
        assert_eq!(
            direction(Currency::Cheque, Currency::Pesos),
            RateDirection::Divide
        );
        assert_eq!(
            convert(1500.0, Currency::Cheque, Currency::Pesos, 1500.0).unwrap(),
            1.0
        );
    }

    #[test]
    fn inversion_is_not_symmetric() {
        // Only the listed orderings divide; the reverse pairs multiply.
        assert_eq!(
            direction(Currency::Dolar, Currency::Pesos),
            RateDirection::Multiply
        );
        assert_eq!(
            direction(Currency::Pesos, Currency::Cheque),
            RateDirection::Multiply
        );
    }

    #[test]
    fn invalid_rates_are_rejected() {
        assert!(convert(10.0, Currency::Dolar, Currency::Pesos, 0.0).is_err());
        assert!(convert(10.0, Currency::Dolar, Currency::Pesos, -2.0).is_err());
        assert!(convert(10.0, Currency::Dolar, Currency::Pesos, f64::NAN).is_err());
        assert!(convert(10.0, Currency::Dolar, Currency::Pesos, f64::INFINITY).is_err());
    }
}
