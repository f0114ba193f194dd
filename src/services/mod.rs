// Fee quoting and promotions
pub mod fees;

// Office network port
pub mod offices;

// Order lifecycle and audit trail
pub mod order_history;
pub mod orders;

// Dispatch
pub mod shipments;

// COD reconciliation and finance ledger
pub mod payment_submissions;
pub mod transactions;

use rust_decimal::Decimal;
use validator::ValidationError;

pub(crate) fn positive_decimal(value: &Decimal) -> Result<(), ValidationError> {
    if *value > Decimal::ZERO {
        Ok(())
    } else {
        let mut err = ValidationError::new("positive");
        err.message = Some("must be greater than zero".into());
        Err(err)
    }
}

pub(crate) fn non_negative_decimal(value: &Decimal) -> Result<(), ValidationError> {
    if *value >= Decimal::ZERO {
        Ok(())
    } else {
        let mut err = ValidationError::new("non_negative");
        err.message = Some("cannot be negative".into());
        Err(err)
    }
}

/// Normalizes 1-based page parameters against a ceiling.
pub(crate) fn page_window(page: Option<u64>, per_page: Option<u64>, max: u64) -> (u64, u64) {
    let page = page.unwrap_or(1).max(1);
    let per_page = per_page.unwrap_or(20).clamp(1, max);
    (page, per_page)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn decimal_validators() {
        assert!(positive_decimal(&dec!(0.1)).is_ok());
        assert!(positive_decimal(&dec!(0)).is_err());
        assert!(non_negative_decimal(&dec!(0)).is_ok());
        assert!(non_negative_decimal(&dec!(-1)).is_err());
    }

    #[test]
    fn page_window_clamps() {
        assert_eq!(page_window(None, None, 100), (1, 20));
        assert_eq!(page_window(Some(0), Some(1000), 100), (1, 100));
        assert_eq!(page_window(Some(3), Some(0), 100), (3, 1));
    }
}
