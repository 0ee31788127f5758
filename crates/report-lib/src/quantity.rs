//! Kubernetes resource quantities
//!
//! Quantities are held as signed nano-units so that sums and differences
//! stay exact for every suffix the API server accepts (`n`, `u`, `m`, the
//! decimal SI suffixes, the binary `Ki`..`Ei` suffixes and `e` exponents).

use crate::error::{ReportError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Add, AddAssign, Sub};
use std::str::FromStr;

const NANOS_PER_UNIT: i128 = 1_000_000_000;
const NANOS_PER_MILLI: i128 = 1_000_000;
const BYTES_PER_MEBIBYTE: i128 = 1 << 20;

/// Compute resources the report aggregates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResourceKind {
    Cpu,
    Memory,
}

impl ResourceKind {
    pub const ALL: [ResourceKind; 2] = [ResourceKind::Cpu, ResourceKind::Memory];

    /// Key used in container request/limit maps
    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceKind::Cpu => "cpu",
            ResourceKind::Memory => "memory",
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An exact resource amount
///
/// CPU is measured in cores and memory in bytes; both are stored in
/// nano-units. Source data is never negative, but differences between
/// limits and requests can be.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ResourceQuantity {
    nanos: i128,
}

impl ResourceQuantity {
    pub const fn zero() -> Self {
        Self { nanos: 0 }
    }

    /// Parse a quantity string, naming `resource` in the error
    pub fn parse(resource: &str, value: &str) -> Result<Self> {
        parse_nanos(value)
            .map(|nanos| Self { nanos })
            .map_err(|reason| ReportError::InvalidQuantity {
                resource: resource.to_string(),
                value: value.to_string(),
                reason,
            })
    }

    pub fn is_zero(&self) -> bool {
        self.nanos == 0
    }

    pub fn is_negative(&self) -> bool {
        self.nanos < 0
    }

    /// Value in thousandths of a unit, rounded up in magnitude
    pub fn milli_value(&self) -> i128 {
        div_round_up(self.nanos, NANOS_PER_MILLI)
    }

    /// Value in whole units, rounded up in magnitude
    pub fn value(&self) -> i128 {
        div_round_up(self.nanos, NANOS_PER_UNIT)
    }

    /// Value in mebibytes, rounded up in magnitude
    pub fn mebibytes(&self) -> i128 {
        div_round_up(self.nanos, NANOS_PER_UNIT * BYTES_PER_MEBIBYTE)
    }
}

impl FromStr for ResourceQuantity {
    type Err = ReportError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse("quantity", s)
    }
}

impl Add for ResourceQuantity {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self {
            nanos: self.nanos.saturating_add(rhs.nanos),
        }
    }
}

impl AddAssign for ResourceQuantity {
    fn add_assign(&mut self, rhs: Self) {
        *self = *self + rhs;
    }
}

impl Sub for ResourceQuantity {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self {
        Self {
            nanos: self.nanos.saturating_sub(rhs.nanos),
        }
    }
}

impl std::iter::Sum for ResourceQuantity {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::zero(), Add::add)
    }
}

/// Exact canonical form: whole units, then `m`, then `n`
impl fmt::Display for ResourceQuantity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.nanos % NANOS_PER_UNIT == 0 {
            write!(f, "{}", self.nanos / NANOS_PER_UNIT)
        } else if self.nanos % NANOS_PER_MILLI == 0 {
            write!(f, "{}m", self.nanos / NANOS_PER_MILLI)
        } else {
            write!(f, "{}n", self.nanos)
        }
    }
}

/// Divide, rounding the magnitude up and keeping the sign
fn div_round_up(numerator: i128, denominator: i128) -> i128 {
    let magnitude = numerator
        .unsigned_abs()
        .div_ceil(denominator.unsigned_abs());
    let magnitude = i128::try_from(magnitude).unwrap_or(i128::MAX);
    if (numerator < 0) != (denominator < 0) {
        -magnitude
    } else {
        magnitude
    }
}

/// Returns the (numerator, denominator) multiplier for a suffix
fn suffix_multiplier(suffix: &str) -> std::result::Result<(i128, i128), String> {
    let multiplier = match suffix {
        "" => (1, 1),
        "n" => (1, 1_000_000_000),
        "u" => (1, 1_000_000),
        "m" => (1, 1_000),
        "k" => (1_000, 1),
        "M" => (1_000_000, 1),
        "G" => (1_000_000_000, 1),
        "T" => (1_000_000_000_000, 1),
        "P" => (1_000_000_000_000_000, 1),
        "E" => (1_000_000_000_000_000_000, 1),
        "Ki" => (1 << 10, 1),
        "Mi" => (1 << 20, 1),
        "Gi" => (1 << 30, 1),
        "Ti" => (1 << 40, 1),
        "Pi" => (1 << 50, 1),
        "Ei" => (1 << 60, 1),
        s if s.starts_with('e') || s.starts_with('E') => {
            let exponent: i32 = s[1..]
                .parse()
                .map_err(|_| format!("invalid exponent {:?}", &s[1..]))?;
            let power = 10i128
                .checked_pow(exponent.unsigned_abs())
                .ok_or_else(|| format!("exponent {} out of range", exponent))?;
            if exponent >= 0 {
                (power, 1)
            } else {
                (1, power)
            }
        }
        other => return Err(format!("unknown suffix {:?}", other)),
    };
    Ok(multiplier)
}

fn parse_nanos(input: &str) -> std::result::Result<i128, String> {
    let s = input.trim();
    let (negative, rest) = match s.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, s.strip_prefix('+').unwrap_or(s)),
    };

    let number_end = rest
        .find(|c: char| !(c.is_ascii_digit() || c == '.'))
        .unwrap_or(rest.len());
    let (number, suffix) = rest.split_at(number_end);
    let (whole, fraction) = number.split_once('.').unwrap_or((number, ""));

    if whole.is_empty() && fraction.is_empty() {
        return Err("missing digits".to_string());
    }
    if fraction.contains('.') {
        return Err("more than one decimal point".to_string());
    }

    let (multiplier, divisor) = suffix_multiplier(suffix)?;
    let mantissa: i128 = format!("{}{}", whole, fraction)
        .parse()
        .map_err(|_| "too many digits".to_string())?;
    let scale = u32::try_from(fraction.len())
        .ok()
        .and_then(|digits| 10i128.checked_pow(digits))
        .ok_or_else(|| "too many fractional digits".to_string())?;

    let numerator = mantissa
        .checked_mul(multiplier)
        .and_then(|v| v.checked_mul(NANOS_PER_UNIT))
        .ok_or_else(|| "quantity too large".to_string())?;
    let denominator = scale
        .checked_mul(divisor)
        .ok_or_else(|| "quantity too precise".to_string())?;

    let nanos = div_round_up(numerator, denominator);
    Ok(if negative { -nanos } else { nanos })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn q(s: &str) -> ResourceQuantity {
        s.parse().unwrap()
    }

    #[test]
    fn test_parse_cpu_forms() {
        assert_eq!(q("100m").milli_value(), 100);
        assert_eq!(q("1").milli_value(), 1000);
        assert_eq!(q("0.5").milli_value(), 500);
        assert_eq!(q("2.25").milli_value(), 2250);
        assert_eq!(q("1500000u").milli_value(), 1500);
        assert_eq!(q("250000000n").milli_value(), 250);
    }

    #[test]
    fn test_parse_memory_forms() {
        assert_eq!(q("256Mi").value(), 256 * 1024 * 1024);
        assert_eq!(q("1Gi").mebibytes(), 1024);
        assert_eq!(q("512Ki").value(), 512 * 1024);
        assert_eq!(q("1G").value(), 1_000_000_000);
        assert_eq!(q("128974848").value(), 128_974_848);
        assert_eq!(q("129e6").value(), 129_000_000);
        assert_eq!(q("12E-1").milli_value(), 1200);
    }

    #[test]
    fn test_numeric_equality_across_suffixes() {
        assert_eq!(q("1"), q("1000m"));
        assert_eq!(q("1Gi"), q("1024Mi"));
        assert_eq!(q("1k"), q("1000"));
        assert!(q("1Mi") > q("1M"));
    }

    #[test]
    fn test_parse_rejects_garbage() {
        for bad in ["", "abc", "1.2.3", "10Qi", "1e", "m", "--1"] {
            let err = ResourceQuantity::parse("cpu", bad).unwrap_err();
            assert!(
                matches!(err, ReportError::InvalidQuantity { .. }),
                "expected InvalidQuantity for {:?}",
                bad
            );
        }
    }

    #[test]
    fn test_sub_nano_values_round_up() {
        // 0.1n is not representable; it rounds up to one nano-unit
        assert_eq!(q("0.1n"), ResourceQuantity { nanos: 1 });
        // 1n is a millionth of a millicore, which still shows as 1m
        assert_eq!(q("1n").milli_value(), 1);
    }

    #[test]
    fn test_arithmetic_and_sign() {
        let request = q("300m");
        let limit = q("200m");
        let diff = limit - request;
        assert!(diff.is_negative());
        assert_eq!(diff.milli_value(), -100);
        assert!((request - request).is_zero());
        assert_eq!(request + limit, q("500m"));

        let total: ResourceQuantity = [q("1"), q("500m"), q("250m")].into_iter().sum();
        assert_eq!(total.milli_value(), 1750);
    }

    #[test]
    fn test_mebibyte_rounding() {
        assert_eq!(q("100Mi").mebibytes(), 100);
        // 1G = 953.67Mi, rounded up
        assert_eq!(q("1G").mebibytes(), 954);
        assert_eq!((q("0") - q("1G")).mebibytes(), -954);
    }

    #[test]
    fn test_display() {
        assert_eq!(q("2").to_string(), "2");
        assert_eq!(q("1500m").to_string(), "1500m");
        assert_eq!(q("5n").to_string(), "5n");
        assert_eq!(ResourceQuantity::zero().to_string(), "0");
    }
}
