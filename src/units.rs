//! Amount validation and conversion to native integer precision

use alloy::primitives::{utils::parse_units, U256};

use crate::error::BridgeError;

/// Check that `amount` is a plain positive decimal ("10", "0.5", ".5").
///
/// Scientific notation, signs, `inf` and `NaN` are rejected.
pub fn validate_amount(amount: &str) -> Result<f64, BridgeError> {
    let amount = amount.trim();
    if amount.is_empty() {
        return Err(BridgeError::Validation("amount is required".to_string()));
    }

    let well_formed = amount.chars().all(|c| c.is_ascii_digit() || c == '.')
        && amount.matches('.').count() <= 1
        && amount != ".";
    if !well_formed {
        return Err(BridgeError::Validation(format!(
            "amount is not a number: {}",
            amount
        )));
    }

    let value: f64 = amount
        .parse()
        .map_err(|_| BridgeError::Validation(format!("amount is not a number: {}", amount)))?;

    if !value.is_finite() || value <= 0.0 {
        return Err(BridgeError::Validation(format!(
            "amount must be positive: {}",
            amount
        )));
    }

    Ok(value)
}

/// Convert a decimal amount into the token's integer units without rounding.
pub fn to_native_units(amount: &str, decimals: u8) -> Result<U256, BridgeError> {
    validate_amount(amount)?;

    let amount = amount.trim();
    if let Some((_, fraction)) = amount.split_once('.') {
        if fraction.len() > decimals as usize {
            return Err(BridgeError::Validation(format!(
                "amount {} has more than {} decimal places",
                amount, decimals
            )));
        }
    }

    // parse_units wants digits on both sides of the separator
    let mut normalized = amount.trim_end_matches('.').to_string();
    if normalized.starts_with('.') {
        normalized.insert(0, '0');
    }

    let raw = parse_units(&normalized, decimals)
        .map_err(|e| BridgeError::Validation(format!("invalid amount {}: {}", amount, e)))?
        .get_absolute();

    if raw.is_zero() {
        return Err(BridgeError::Validation(format!(
            "amount {} is zero at {} decimals",
            amount, decimals
        )));
    }

    Ok(raw)
}

/// Same as [`to_native_units`] for chains with `u64` balances (Sui coins)
pub fn to_native_u64(amount: &str, decimals: u8) -> Result<u64, BridgeError> {
    let raw = to_native_units(amount, decimals)?;
    u64::try_from(raw).map_err(|_| {
        BridgeError::Validation(format!("amount {} exceeds the u64 coin range", amount))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_to_native_units() {
        assert_eq!(
            to_native_units("10", 18).unwrap(),
            U256::from(10u128 * 10u128.pow(18))
        );
        assert_eq!(
            to_native_units("1.5", 18).unwrap(),
            U256::from(1_500_000_000_000_000_000u128)
        );
        assert_eq!(to_native_units("100", 6).unwrap(), U256::from(100_000_000u64));
        assert_eq!(to_native_units(".5", 2).unwrap(), U256::from(50u64));
        assert_eq!(to_native_units("7.", 0).unwrap(), U256::from(7u64));
    }

    #[test]
    fn test_rejects_excess_precision() {
        assert!(to_native_units("0.001", 2).is_err());
        assert!(to_native_units("1.5", 0).is_err());
    }

    #[test]
    fn test_rejects_malformed() {
        for amount in ["", ".", "1.2.3", "1e3", "-5", "+5", "abc", "0", "0.00"] {
            assert!(to_native_units(amount, 9).is_err(), "{amount}");
        }
    }

    #[test]
    fn test_to_native_u64() {
        assert_eq!(to_native_u64("2.5", 9).unwrap(), 2_500_000_000);
        assert!(to_native_u64("100000000000", 18).is_err());
    }
}
