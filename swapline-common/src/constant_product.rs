//! Uniswap-V2 constant product math.
//!
//! Mirrors the integer arithmetic of `UniswapV2Library` so local estimates match what the router
//! computes on-chain, including the 0.3% LP fee and its rounding.

use num_traits::{ToPrimitive, Zero};

use crate::{
    errors::{SwapError, SwapResult},
    models::Amount,
    slippage::BPS_DENOMINATOR,
};

/// Liquidity permanently locked by the pair contract on the first deposit.
pub const MINIMUM_LIQUIDITY: u32 = 1000;

const FEE_NUMERATOR: u32 = 997;
const FEE_DENOMINATOR: u32 = 1000;

fn check_reserves(reserve_in: &Amount, reserve_out: &Amount) -> SwapResult<()> {
    if reserve_in.is_zero() || reserve_out.is_zero() {
        return Err(SwapError::InsufficientReserves("pool has no liquidity".to_string()));
    }
    Ok(())
}

/// Output amount for an exact input, after the LP fee.
pub fn get_amount_out(
    amount_in: &Amount,
    reserve_in: &Amount,
    reserve_out: &Amount,
) -> SwapResult<Amount> {
    if amount_in.is_zero() {
        return Err(SwapError::InvalidAmountFormat("input amount must be positive".to_string()));
    }
    check_reserves(reserve_in, reserve_out)?;

    let amount_in_with_fee = amount_in * FEE_NUMERATOR;
    let numerator = &amount_in_with_fee * reserve_out;
    let denominator = reserve_in * FEE_DENOMINATOR + &amount_in_with_fee;
    Ok(numerator / denominator)
}

/// LP shares minted by the very first deposit into a new pair.
pub fn initial_liquidity(amount_a: &Amount, amount_b: &Amount) -> SwapResult<Amount> {
    let liquidity = (amount_a * amount_b).sqrt();
    let minimum = Amount::from(MINIMUM_LIQUIDITY);
    if liquidity <= minimum {
        return Err(SwapError::InsufficientReserves(format!(
            "deposit mints {liquidity} shares, at least {} are required",
            MINIMUM_LIQUIDITY + 1
        )));
    }
    Ok(liquidity - minimum)
}

/// Price impact of an exact input trade in basis points, excluding the LP fee.
///
/// Compares the actual output against the output at the pool's marginal price.
pub fn price_impact_bps(
    amount_in: &Amount,
    reserve_in: &Amount,
    reserve_out: &Amount,
) -> SwapResult<u32> {
    let actual = get_amount_out(amount_in, reserve_in, reserve_out)?;
    let marginal = amount_in * FEE_NUMERATOR * reserve_out / (reserve_in * FEE_DENOMINATOR);
    if marginal.is_zero() || actual >= marginal {
        return Ok(0);
    }

    let impact = (&marginal - &actual) * BPS_DENOMINATOR / &marginal;
    Ok(impact
        .to_u32()
        .unwrap_or(BPS_DENOMINATOR)
        .min(BPS_DENOMINATOR))
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    fn amount(value: u128) -> Amount {
        Amount::from(value)
    }

    const ETHER: u128 = 1_000_000_000_000_000_000;

    #[test]
    fn test_get_amount_out() {
        // 1 ETH into a 100 ETH / 200_000 USDC pool
        let out = get_amount_out(&amount(ETHER), &amount(100 * ETHER), &amount(200_000_000_000))
            .unwrap();

        assert_eq!(out, amount(1_974_316_068));
    }

    #[rstest]
    #[case::zero_input(0, 100, 100)]
    #[case::empty_in(10, 0, 100)]
    #[case::empty_out(10, 100, 0)]
    fn test_get_amount_out_rejects(#[case] amount_in: u128, #[case] r_in: u128, #[case] r_out: u128) {
        assert!(get_amount_out(&amount(amount_in), &amount(r_in), &amount(r_out)).is_err());
    }

    #[test]
    fn test_initial_liquidity() {
        assert_eq!(initial_liquidity(&amount(1_000_000), &amount(4_000_000)).unwrap(), amount(1_999_000));
        assert!(initial_liquidity(&amount(1_000), &amount(1_000)).is_err());
    }

    #[test]
    fn test_price_impact() {
        let reserve = amount(1_000_000 * ETHER);

        let tiny = price_impact_bps(&amount(ETHER), &reserve, &reserve).unwrap();
        let large = price_impact_bps(&amount(100_000 * ETHER), &reserve, &reserve).unwrap();

        assert_eq!(tiny, 0);
        // 10% of the pool moves the price by about 9%
        assert!((900..=920).contains(&large), "impact {large}");
    }
}
