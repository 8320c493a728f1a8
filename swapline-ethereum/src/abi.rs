//! Contract interfaces of the Uniswap-V2 deployment and the tokens it trades.

use alloy_primitives::U256;
use alloy_sol_types::sol;
use num_bigint::BigUint;
use swapline_common::Amount;
use thiserror::Error;

sol! {
    interface IERC20 {
        function name() external view returns (string);
        function symbol() external view returns (string);
        function decimals() external view returns (uint8);
        function balanceOf(address account) external view returns (uint256);
        function allowance(address owner, address spender) external view returns (uint256);
        function approve(address spender, uint256 amount) external returns (bool);
    }

    interface IWETH9 {
        function deposit() external payable;
        function withdraw(uint256 wad) external;
    }

    interface IUniswapV2Factory {
        function getPair(address tokenA, address tokenB) external view returns (address pair);
        function allPairs(uint256 index) external view returns (address pair);
        function allPairsLength() external view returns (uint256);
    }

    interface IUniswapV2Pair {
        function getReserves() external view returns (uint112 reserve0, uint112 reserve1, uint32 blockTimestampLast);
    }

    interface IUniswapV2Router02 {
        function getAmountsOut(uint256 amountIn, address[] calldata path) external view returns (uint256[] memory amounts);

        function swapExactTokensForTokens(
            uint256 amountIn,
            uint256 amountOutMin,
            address[] calldata path,
            address to,
            uint256 deadline
        ) external returns (uint256[] memory amounts);

        function swapExactETHForTokens(
            uint256 amountOutMin,
            address[] calldata path,
            address to,
            uint256 deadline
        ) external payable returns (uint256[] memory amounts);

        function swapExactTokensForETH(
            uint256 amountIn,
            uint256 amountOutMin,
            address[] calldata path,
            address to,
            uint256 deadline
        ) external returns (uint256[] memory amounts);

        function addLiquidity(
            address tokenA,
            address tokenB,
            uint256 amountADesired,
            uint256 amountBDesired,
            uint256 amountAMin,
            uint256 amountBMin,
            address to,
            uint256 deadline
        ) external returns (uint256 amountA, uint256 amountB, uint256 liquidity);

        function addLiquidityETH(
            address token,
            uint256 amountTokenDesired,
            uint256 amountTokenMin,
            uint256 amountETHMin,
            address to,
            uint256 deadline
        ) external payable returns (uint256 amountToken, uint256 amountETH, uint256 liquidity);
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AmountOverflow {
    #[error("Amount {0} does not fit into uint256")]
    Uint256(Amount),
}

/// Conversion between arbitrary precision amounts and the EVM's `uint256`.
pub trait AmountCodec: Sized {
    fn to_u256(&self) -> Result<U256, AmountOverflow>;

    fn from_u256(value: U256) -> Self;
}

impl AmountCodec for BigUint {
    fn to_u256(&self) -> Result<U256, AmountOverflow> {
        U256::try_from_be_slice(&self.to_bytes_be()).ok_or_else(|| AmountOverflow::Uint256(self.clone()))
    }

    fn from_u256(value: U256) -> Self {
        BigUint::from_bytes_be(&value.to_be_bytes::<32>())
    }
}

/// Decodes a `string` return value, falling back to the `bytes32` encoding some older tokens use
/// for `name()` and `symbol()`.
pub fn decode_string_or_bytes32(data: &[u8]) -> Option<String> {
    use alloy_sol_types::SolValue;

    if let Ok(value) = String::abi_decode(data) {
        return Some(value);
    }
    if data.len() != 32 {
        return None;
    }
    let end = data
        .iter()
        .position(|byte| *byte == 0)
        .unwrap_or(data.len());
    String::from_utf8(data[..end].to_vec()).ok()
}

#[cfg(test)]
mod tests {
    use alloy_primitives::{address, hex};
    use alloy_sol_types::{SolCall, SolValue};
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case::zero(BigUint::from(0u8))]
    #[case::one(BigUint::from(1u8))]
    #[case::wei(BigUint::from(2_500_000_000_000_000_000u64))]
    #[case::max(BigUint::from_bytes_be(&[0xff; 32]))]
    fn test_amount_codec(#[case] amount: BigUint) {
        let encoded = amount.to_u256().unwrap();

        assert_eq!(BigUint::from_u256(encoded), amount);
    }

    #[test]
    fn test_amount_codec_overflow() {
        let too_large = BigUint::from_bytes_be(&[0x01; 33]);

        assert!(matches!(too_large.to_u256(), Err(AmountOverflow::Uint256(_))));
    }

    #[test]
    fn test_selectors() {
        assert_eq!(IERC20::approveCall::SELECTOR, hex!("095ea7b3"));
        assert_eq!(IUniswapV2Factory::getPairCall::SELECTOR, hex!("e6a43905"));
        assert_eq!(IUniswapV2Pair::getReservesCall::SELECTOR, hex!("0902f1ac"));
        assert_eq!(IUniswapV2Router02::getAmountsOutCall::SELECTOR, hex!("d06ca61f"));
        assert_eq!(IUniswapV2Router02::swapExactTokensForTokensCall::SELECTOR, hex!("38ed1739"));
        assert_eq!(IUniswapV2Router02::swapExactETHForTokensCall::SELECTOR, hex!("7ff36ab5"));
        assert_eq!(IUniswapV2Router02::swapExactTokensForETHCall::SELECTOR, hex!("18cbafe5"));
        assert_eq!(IUniswapV2Router02::addLiquidityCall::SELECTOR, hex!("e8e33700"));
        assert_eq!(IUniswapV2Router02::addLiquidityETHCall::SELECTOR, hex!("f305d719"));
        assert_eq!(IWETH9::depositCall::SELECTOR, hex!("d0e30db0"));
        assert_eq!(IWETH9::withdrawCall::SELECTOR, hex!("2e1a7d4d"));
    }

    #[test]
    fn test_encode_balance_of() {
        let account = address!("f39Fd6e51aad88F6F4ce6aB8827279cffFb92266");

        let calldata = IERC20::balanceOfCall { account }.abi_encode();

        assert_eq!(calldata.len(), 36);
        assert_eq!(calldata[..4], hex!("70a08231"));
        assert_eq!(&calldata[16..], account.as_slice());
    }

    #[test]
    fn test_decode_string_or_bytes32() {
        let standard = "USDC".to_string().abi_encode();
        let mut legacy = [0u8; 32];
        legacy[..3].copy_from_slice(b"MKR");

        assert_eq!(decode_string_or_bytes32(&standard), Some("USDC".to_string()));
        assert_eq!(decode_string_or_bytes32(&legacy), Some("MKR".to_string()));
        assert_eq!(decode_string_or_bytes32(&[1, 2, 3]), None);
    }
}
