//! Conversion between human-readable decimal strings and on-chain minor units.
//!
//! Parsing is strict: an amount with more fractional digits than the token supports is rejected
//! instead of silently truncated, since the truncated value is not what the user typed.

use num_bigint::BigUint;
use num_traits::Zero;

use crate::{
    errors::{SwapError, SwapResult},
    models::{Amount, Decimals},
};

/// Default number of fractional digits shown for amounts below one.
pub const DEFAULT_DISPLAY_PRECISION: usize = 6;

/// Values strictly between zero and this threshold are displayed as [`DUST_LABEL`].
const DUST_THRESHOLD: f64 = 1e-6;
const DUST_LABEL: &str = "< 0.000001";

/// Parses a base-10 decimal string into minor units for a token with `decimals` fractional
/// digits.
///
/// Accepts `"12"`, `"12.5"`, `".5"` and `"12."`. Surrounding whitespace is ignored.
///
/// # Errors
/// `InvalidAmountFormat` if the string is empty, signed, not a plain decimal number, or has more
/// fractional digits than `decimals`.
pub fn to_minor_units(value: &str, decimals: Decimals) -> SwapResult<Amount> {
    let value = value.trim();
    let invalid = |reason: &str| SwapError::InvalidAmountFormat(format!("{value:?}: {reason}"));

    if value.is_empty() {
        return Err(invalid("amount is empty"));
    }
    if value.starts_with('-') {
        return Err(invalid("amount must not be negative"));
    }

    let (whole, fraction) = value
        .split_once('.')
        .unwrap_or((value, ""));
    if whole.is_empty() && fraction.is_empty() {
        return Err(invalid("amount has no digits"));
    }
    let is_digits = |s: &str| s.chars().all(|c| c.is_ascii_digit());
    if !is_digits(whole) || !is_digits(fraction) {
        return Err(invalid("amount is not a decimal number"));
    }
    if fraction.len() > decimals as usize {
        return Err(invalid(&format!(
            "at most {decimals} fractional digits are supported, got {}",
            fraction.len()
        )));
    }

    let scaled = format!("{whole}{fraction:0<width$}", width = decimals as usize);
    BigUint::parse_bytes(scaled.as_bytes(), 10).ok_or_else(|| invalid("amount is not a number"))
}

/// Renders minor units as the shortest decimal string, without trailing fractional zeros.
pub fn to_decimal_string(amount: &Amount, decimals: Decimals) -> String {
    let digits = amount.to_str_radix(10);
    if decimals == 0 {
        return digits;
    }

    let width = decimals as usize;
    let padded =
        if digits.len() <= width { format!("{digits:0>len$}", len = width + 1) } else { digits };
    let (whole, fraction) = padded.split_at(padded.len() - width);
    let fraction = fraction.trim_end_matches('0');
    if fraction.is_empty() {
        whole.to_string()
    } else {
        format!("{whole}.{fraction}")
    }
}

/// Formats a decimal string for display using tiered rounding:
///
/// | value            | output                                   |
/// |------------------|------------------------------------------|
/// | 0                | `"0"`                                    |
/// | below 0.000001   | `"< 0.000001"`                           |
/// | below 1          | up to `precision` decimals               |
/// | below 1 000      | up to 4 decimals                         |
/// | below 1 000 000  | two decimals with a `K` suffix           |
/// | otherwise        | two decimals with an `M` suffix          |
///
/// Trailing zeros are trimmed in the first two rounded tiers. Unparsable and negative input
/// renders as `"0"`.
///
/// This is a presentation policy only. Never feed its output back into arithmetic.
pub fn format_for_display(value: &str, precision: usize) -> String {
    let number = match value.trim().parse::<f64>() {
        Ok(number) if number.is_finite() && number > 0.0 => number,
        _ => return "0".to_string(),
    };

    if number < DUST_THRESHOLD {
        return DUST_LABEL.to_string();
    }

    // Tiers are picked on the rounded value, e.g. 999.99999 renders as 1.00K.
    let below_one = format!("{number:.precision$}");
    if rounded_below(&below_one, 1.0) {
        return trim_fraction(below_one);
    }
    let units = format!("{number:.4}");
    if rounded_below(&units, 1_000.0) {
        return trim_fraction(units);
    }
    let thousands = format!("{:.2}", number / 1_000.0);
    if rounded_below(&thousands, 1_000.0) {
        return format!("{thousands}K");
    }
    format!("{:.2}M", number / 1_000_000.0)
}

fn rounded_below(rendered: &str, bound: f64) -> bool {
    rendered
        .parse::<f64>()
        .is_ok_and(|value| value < bound)
}

/// Convenience for displaying an on-chain amount directly.
pub fn format_amount_for_display(amount: &Amount, decimals: Decimals, precision: usize) -> String {
    if amount.is_zero() {
        return "0".to_string();
    }
    format_for_display(&to_decimal_string(amount, decimals), precision)
}

fn trim_fraction(formatted: String) -> String {
    if !formatted.contains('.') {
        return formatted;
    }
    formatted
        .trim_end_matches('0')
        .trim_end_matches('.')
        .to_string()
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case::integer("12", 6, 12_000_000u64)]
    #[case::fraction("2.5", 18, 2_500_000_000_000_000_000u64)]
    #[case::leading_dot(".5", 1, 5u64)]
    #[case::trailing_dot("7.", 2, 700u64)]
    #[case::zero("0", 18, 0u64)]
    #[case::zero_decimals("42", 0, 42u64)]
    #[case::whitespace("  1.25 ", 2, 125u64)]
    #[case::full_precision("0.000001", 6, 1u64)]
    fn test_to_minor_units(#[case] input: &str, #[case] decimals: u8, #[case] expected: u64) {
        assert_eq!(to_minor_units(input, decimals).unwrap(), Amount::from(expected));
    }

    #[rstest]
    #[case::empty("", 18)]
    #[case::blank("   ", 18)]
    #[case::dot(".", 18)]
    #[case::negative("-1", 18)]
    #[case::plus("+1", 18)]
    #[case::letters("1e18", 18)]
    #[case::two_dots("1.2.3", 18)]
    #[case::comma("1,5", 18)]
    #[case::too_precise("0.0000001", 6)]
    #[case::fraction_on_integer_token("1.5", 0)]
    fn test_to_minor_units_rejects(#[case] input: &str, #[case] decimals: u8) {
        let err = to_minor_units(input, decimals).unwrap_err();

        assert!(matches!(err, SwapError::InvalidAmountFormat(_)), "{input}: {err}");
    }

    #[test]
    fn test_to_minor_units_large_decimals() {
        let amount = to_minor_units("1", 255).unwrap();

        assert_eq!(amount, num_traits::pow(Amount::from(10u8), 255));
    }

    #[rstest]
    #[case::zero(0, 18, "0")]
    #[case::whole(1_000_000, 6, "1")]
    #[case::trimmed(9_950_000, 6, "9.95")]
    #[case::below_one(5, 3, "0.005")]
    #[case::no_decimals(1234, 0, "1234")]
    #[case::one_wei(1, 18, "0.000000000000000001")]
    fn test_to_decimal_string(#[case] amount: u64, #[case] decimals: u8, #[case] expected: &str) {
        assert_eq!(to_decimal_string(&Amount::from(amount), decimals), expected);
    }

    #[test]
    fn test_round_trip() {
        let amounts = [
            Amount::zero(),
            Amount::from(1u8),
            Amount::from(10u8),
            Amount::from(999_999u32),
            Amount::from(1_000_000u32),
            Amount::from(u64::MAX),
            Amount::from(u128::MAX) * Amount::from(7u8),
        ];
        for decimals in 0..=18u8 {
            for amount in &amounts {
                let rendered = to_decimal_string(amount, decimals);

                assert_eq!(
                    &to_minor_units(&rendered, decimals).unwrap(),
                    amount,
                    "decimals {decimals}, rendered {rendered}"
                );
            }
        }
    }

    #[rstest]
    #[case::zero("0", "0")]
    #[case::zero_with_fraction("0.000", "0")]
    #[case::dust("0.0000001", "< 0.000001")]
    #[case::smallest_shown("0.000001", "0.000001")]
    #[case::below_one("0.1234567", "0.123457")]
    #[case::below_one_trimmed("0.5", "0.5")]
    #[case::units("9.95", "9.95")]
    #[case::units_rounded("12.345678", "12.3457")]
    #[case::thousands("1234.5", "1.23K")]
    #[case::thousands_exact("1000", "1.00K")]
    #[case::millions("2500000", "2.50M")]
    #[case::rounds_up_to_one("0.9999999", "1")]
    #[case::rounds_up_to_thousands("999.99999", "1.00K")]
    #[case::rounds_up_to_millions("999999.999", "1.00M")]
    #[case::negative("-5", "0")]
    #[case::garbage("abc", "0")]
    #[case::empty("", "0")]
    fn test_format_for_display(#[case] input: &str, #[case] expected: &str) {
        assert_eq!(format_for_display(input, DEFAULT_DISPLAY_PRECISION), expected);
    }

    #[test]
    fn test_format_for_display_custom_precision() {
        assert_eq!(format_for_display("0.123456", 2), "0.12");
    }

    #[test]
    fn test_format_amount_for_display() {
        let amount = Amount::from(9_950_000u32);

        assert_eq!(format_amount_for_display(&amount, 6, DEFAULT_DISPLAY_PRECISION), "9.95");
        assert_eq!(format_amount_for_display(&Amount::zero(), 6, DEFAULT_DISPLAY_PRECISION), "0");
    }
}
