//! Helpers for rendering values in `tracing` fields.

use std::fmt::{Display, Formatter};

use tracing::Value;

use crate::{
    models::{Amount, Decimals},
    units::to_decimal_string,
};

/// Renders minor units as an exact decimal string followed by the token symbol.
pub struct DisplayAmount<'a> {
    amount: &'a Amount,
    decimals: Decimals,
    symbol: &'a str,
}

impl Display for DisplayAmount<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}", to_decimal_string(self.amount, self.decimals), self.symbol)
    }
}

/// Lets you write `amount_in = amount(&value, 18, "ETH")` in `tracing` macros.
pub fn amount<'a>(amount: &'a Amount, decimals: Decimals, symbol: &'a str) -> impl Value + 'a {
    tracing::field::display(DisplayAmount { amount, decimals, symbol })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_amount() {
        let value = Amount::from(9_950_000u32);
        let rendered = DisplayAmount { amount: &value, decimals: 6, symbol: "USDC" };

        assert_eq!(rendered.to_string(), "9.95 USDC");
    }
}
