use anyhow::Context as _;
use spammer_eth_client::U256;

use crate::constants::ETH_DECIMALS;

/// Parses a decimal amount of ether (e.g. `0.0001`) into wei.
pub fn parse_ether(amount: &str) -> anyhow::Result<U256> {
    parse_units(amount, ETH_DECIMALS)
}

fn parse_units(amount: &str, decimals: usize) -> anyhow::Result<U256> {
    let amount = amount.trim();
    let (integer, fraction) = amount.split_once('.').unwrap_or((amount, ""));
    anyhow::ensure!(
        !integer.is_empty() || !fraction.is_empty(),
        "amount `{amount}` is empty"
    );
    let all_digits = |part: &str| part.bytes().all(|byte| byte.is_ascii_digit());
    anyhow::ensure!(
        all_digits(integer) && all_digits(fraction),
        "amount `{amount}` is not a non-negative decimal number"
    );
    anyhow::ensure!(
        fraction.len() <= decimals,
        "amount `{amount}` has more than {decimals} fractional digits"
    );

    let digits = format!("{integer}{fraction:0<decimals$}");
    U256::from_dec_str(&digits).with_context(|| format!("amount `{amount}` is too large"))
}

fn format_units(value: U256, decimals: usize) -> String {
    let base = U256::exp10(decimals);
    let integer = value / base;
    let fraction = (value % base).to_string();
    let fraction = format!("{fraction:0>decimals$}");
    let fraction = fraction.trim_end_matches('0');
    if fraction.is_empty() {
        integer.to_string()
    } else {
        format!("{integer}.{fraction}")
    }
}

pub fn format_eth(value: U256) -> String {
    format!("{}ETH", format_units(value, ETH_DECIMALS))
}

pub fn format_gwei(value: U256) -> String {
    format!("{}GWEI", format_units(value, 9))
}

#[cfg(test)]
mod tests {
    use test_casing::test_casing;

    use super::*;

    const VALID_AMOUNTS: [(&str, u128); 6] = [
        ("400", 400_000_000_000_000_000_000),
        ("0.0001", 100_000_000_000_000),
        ("1.5", 1_500_000_000_000_000_000),
        (".5", 500_000_000_000_000_000),
        ("0", 0),
        ("0.000000000000000001", 1),
    ];

    #[test_casing(6, VALID_AMOUNTS)]
    #[test]
    fn parsing_valid_amounts(amount: &str, expected_wei: u128) {
        assert_eq!(parse_ether(amount).unwrap(), U256::from(expected_wei));
    }

    #[test_casing(6, ["", ".", "-1", "1e18", "0.0000000000000000001", "1.2.3"])]
    #[test]
    fn parsing_invalid_amounts(amount: &str) {
        parse_ether(amount).unwrap_err();
    }

    #[test]
    fn formatting_amounts() {
        assert_eq!(format_eth(parse_ether("400").unwrap()), "400ETH");
        assert_eq!(format_eth(parse_ether("0.0001").unwrap()), "0.0001ETH");
        assert_eq!(format_eth(U256::zero()), "0ETH");
        assert_eq!(format_gwei(U256::from(1_500_000_000_u64)), "1.5GWEI");
    }
}
