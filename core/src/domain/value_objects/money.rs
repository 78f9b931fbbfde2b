//! Price and rating arithmetic on `Decimal`

use rust_decimal::{Decimal, RoundingStrategy};

use cm_shared::validation::ValidationError;

/// Largest value a `DECIMAL(10,2)` column holds
pub const MAX_PRICE: Decimal = Decimal::from_parts(1_410_065_407, 2, 0, false, 2); // 99_999_999.99

/// Prices are strictly positive with at most two decimal places
pub fn validate_price(field: &str, value: Decimal) -> Result<(), ValidationError> {
    if value <= Decimal::ZERO {
        return Err(ValidationError::new(field, "Price must be greater than zero.", "min_value"));
    }
    if value.normalize().scale() > 2 {
        return Err(ValidationError::new(
            field,
            "Ensure that there are no more than 2 decimal places.",
            "max_decimal_places",
        ));
    }
    if value > MAX_PRICE {
        return Err(ValidationError::new(field, "Price is too large.", "max_value"));
    }
    Ok(())
}

/// Mean of integer ratings, two decimal places, half-even like SQL `AVG` + quantize
pub fn average_rating<I>(ratings: I) -> Option<Decimal>
where
    I: IntoIterator<Item = u8>,
{
    let (sum, count) = ratings
        .into_iter()
        .fold((0u64, 0u64), |(s, c), r| (s + u64::from(r), c + 1));
    if count == 0 {
        return None;
    }
    let avg = Decimal::from(sum) / Decimal::from(count);
    Some(avg.round_dp_with_strategy(2, RoundingStrategy::MidpointNearestEven))
}

/// Round a stored aggregate to two places
pub fn round_rating(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(2, RoundingStrategy::MidpointNearestEven)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_validate_price() {
        assert!(validate_price("base_price", dec!(49.99)).is_ok());
        assert!(validate_price("base_price", dec!(50.000)).is_ok());
        assert_eq!(validate_price("base_price", dec!(0)).unwrap_err().code, "min_value");
        assert_eq!(validate_price("base_price", dec!(-1)).unwrap_err().code, "min_value");
        assert_eq!(
            validate_price("base_price", dec!(1.005)).unwrap_err().code,
            "max_decimal_places"
        );
        assert_eq!(
            validate_price("base_price", dec!(100000000)).unwrap_err().code,
            "max_value"
        );
    }

    #[test]
    fn test_average_rating() {
        assert_eq!(average_rating(Vec::<u8>::new()), None);
        assert_eq!(average_rating(vec![5, 4]), Some(dec!(4.50)));
        assert_eq!(average_rating(vec![5, 4, 4]), Some(dec!(4.33)));
        assert_eq!(average_rating(vec![1, 2]), Some(dec!(1.50)));
    }
}
