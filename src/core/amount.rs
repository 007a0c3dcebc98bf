//! Stake amounts
//!
//! Votes carry arbitrary-precision non-negative amounts. On the wire they
//! travel as decimal strings, an empty string meaning zero.

use num_bigint::BigUint;
use num_traits::Zero;

/// Arbitrary-precision non-negative amount
pub type Amount = BigUint;

/// Parse a decimal amount string. Returns `None` if the string is not a
/// non-negative base-10 integer. An optional leading `+` is accepted;
/// surrounding whitespace is not.
pub fn parse_amount(value: &str) -> Option<Amount> {
    if value.is_empty() {
        return Some(Amount::zero());
    }
    let digits = value.strip_prefix('+').unwrap_or(value);
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    BigUint::parse_bytes(digits.as_bytes(), 10)
}

/// Serde helpers that encode an [`Amount`] as its decimal string.
pub mod decimal {
    use super::{parse_amount, Amount};
    use serde::{de, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(amount: &Amount, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&amount.to_str_radix(10))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Amount, D::Error> {
        let value = String::deserialize(deserializer)?;
        parse_amount(&value)
            .ok_or_else(|| de::Error::custom(format!("invalid decimal amount: {}", value)))
    }
}
