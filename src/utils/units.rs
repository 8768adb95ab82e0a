use web3::types::U256;

pub const ETHER_DECIMALS: usize = 18;
pub const GWEI_DECIMALS: usize = 9;

/// Render `value / 10^decimals` as a fixed-point string with exactly
/// `decimals` fraction digits.
pub fn format_units(value: U256, decimals: usize) -> String {
    let divisor = U256::exp10(decimals);
    let whole = value / divisor;
    let fraction = (value % divisor).to_string();
    format!("{}.{:0>width$}", whole, fraction, width = decimals)
}

pub fn wei_to_ether(wei: U256) -> String {
    format_units(wei, ETHER_DECIMALS)
}

pub fn wei_to_gwei(wei: U256) -> String {
    format_units(wei, GWEI_DECIMALS)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn one_ether() {
        let wei = U256::from(1_000_000_000_000_000_000u64);
        assert_eq!(wei_to_ether(wei), "1.000000000000000000");
    }

    #[test]
    fn one_gwei() {
        assert_eq!(wei_to_gwei(U256::from(1_000_000_000u64)), "1.000000000");
    }

    #[test]
    fn zero() {
        assert_eq!(wei_to_ether(U256::zero()), "0.000000000000000000");
        assert_eq!(wei_to_gwei(U256::zero()), "0.000000000");
    }

    #[test]
    fn single_wei_keeps_leading_zeros() {
        assert_eq!(wei_to_ether(U256::one()), "0.000000000000000001");
        assert_eq!(wei_to_gwei(U256::one()), "0.000000001");
    }

    #[test]
    fn fractional_gas_price() {
        assert_eq!(wei_to_gwei(U256::from(12_345_678_901u64)), "12.345678901");
    }

    #[test]
    fn balances_beyond_u64_are_exact() {
        // 123456789.123456789123456789 ether
        let wei = U256::from_dec_str("123456789123456789123456789").unwrap();
        assert_eq!(wei_to_ether(wei), "123456789.123456789123456789");
    }

    #[test]
    fn max_u256_does_not_overflow() {
        let out = wei_to_ether(U256::MAX);
        assert_eq!(
            out,
            "115792089237316195423570985008687907853269984665640564039457.584007913129639935"
        );
    }
}
