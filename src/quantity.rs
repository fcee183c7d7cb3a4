//! Kubernetes resource quantity parsing.
//!
//! Queue resource triples are compared dimension by dimension, so quantity
//! strings are parsed into an exact integer count of nano-units. Supported
//! forms:
//! - plain decimals: `100`, `0.5`, `.25`
//! - decimal SI suffixes: `n`, `u`, `m`, `k`, `M`, `G`, `T`, `P`, `E`
//! - binary suffixes: `Ki`, `Mi`, `Gi`, `Ti`, `Pi`, `Ei`
//! - decimal exponents: `1e3`, `5E-3`
//!
//! Precision below one nano-unit is truncated.

use std::cmp::Ordering;
use std::fmt;

use k8s_openapi::apimachinery::pkg::api::resource::Quantity;
use thiserror::Error;

/// Nano-units per whole unit
const NANOS_PER_UNIT: u32 = 9;

/// Longest mantissa (in significant digits) accepted before overflow checks
const MAX_MANTISSA_DIGITS: usize = 30;

/// Quantity parse failure
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QuantityError {
    /// The quantity string was empty
    #[error("quantity must not be empty")]
    Empty,

    /// The quantity string does not follow the quantity grammar
    #[error("quantity '{0}' is not a valid resource quantity")]
    Malformed(String),

    /// The quantity does not fit the comparison range
    #[error("quantity '{0}' is out of range")]
    Overflow(String),
}

/// A parsed quantity, stored as nano-units
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ParsedQuantity {
    nanos: i128,
}

impl ParsedQuantity {
    /// Value in nano-units
    pub fn nanos(&self) -> i128 {
        self.nanos
    }

    /// Whether the quantity is exactly zero
    pub fn is_zero(&self) -> bool {
        self.nanos == 0
    }
}

impl PartialOrd for ParsedQuantity {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for ParsedQuantity {
    fn cmp(&self, other: &Self) -> Ordering {
        self.nanos.cmp(&other.nanos)
    }
}

impl fmt::Display for ParsedQuantity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}n", self.nanos)
    }
}

/// Parse a k8s-openapi [`Quantity`]
pub fn parse_quantity(quantity: &Quantity) -> Result<ParsedQuantity, QuantityError> {
    parse(&quantity.0)
}

/// Parse a quantity string
pub fn parse(raw: &str) -> Result<ParsedQuantity, QuantityError> {
    if raw.is_empty() {
        return Err(QuantityError::Empty);
    }
    let malformed = || QuantityError::Malformed(raw.to_string());
    let overflow = || QuantityError::Overflow(raw.to_string());

    let (negative, unsigned) = match raw.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, raw.strip_prefix('+').unwrap_or(raw)),
    };

    let number_end = unsigned
        .find(|c: char| !(c.is_ascii_digit() || c == '.'))
        .unwrap_or(unsigned.len());
    let (number, suffix) = unsigned.split_at(number_end);

    let (whole, fraction) = match number.split_once('.') {
        Some((whole, fraction)) => (whole, fraction),
        None => (number, ""),
    };
    if fraction.contains('.') || (whole.is_empty() && fraction.is_empty()) {
        return Err(malformed());
    }

    let digits = format!("{whole}{fraction}");
    let significant = digits.trim_start_matches('0');
    if significant.len() > MAX_MANTISSA_DIGITS {
        return Err(overflow());
    }
    let mantissa: i128 = if significant.is_empty() {
        0
    } else {
        significant.parse().map_err(|_| malformed())?
    };

    let (exponent, binary_multiplier) = parse_suffix(suffix).ok_or_else(malformed)?;

    let fraction_len = i32::try_from(fraction.len()).map_err(|_| overflow())?;
    let power = exponent
        .checked_add(NANOS_PER_UNIT as i32)
        .and_then(|p| p.checked_sub(fraction_len))
        .ok_or_else(overflow)?;

    let scaled = mantissa
        .checked_mul(binary_multiplier)
        .ok_or_else(overflow)?;
    let nanos = if power >= 0 {
        let factor = 10i128
            .checked_pow(power.unsigned_abs())
            .ok_or_else(overflow)?;
        scaled.checked_mul(factor).ok_or_else(overflow)?
    } else {
        match 10i128.checked_pow(power.unsigned_abs()) {
            Some(divisor) => scaled / divisor,
            None => 0,
        }
    };

    Ok(ParsedQuantity {
        nanos: if negative { -nanos } else { nanos },
    })
}

/// Map a suffix to (decimal exponent, binary multiplier)
fn parse_suffix(suffix: &str) -> Option<(i32, i128)> {
    let parsed = match suffix {
        "" => (0, 1),
        "n" => (-9, 1),
        "u" => (-6, 1),
        "m" => (-3, 1),
        "k" => (3, 1),
        "M" => (6, 1),
        "G" => (9, 1),
        "T" => (12, 1),
        "P" => (15, 1),
        "E" => (18, 1),
        "Ki" => (0, 1 << 10),
        "Mi" => (0, 1 << 20),
        "Gi" => (0, 1 << 30),
        "Ti" => (0, 1 << 40),
        "Pi" => (0, 1 << 50),
        "Ei" => (0, 1 << 60),
        other => {
            let exponent = other
                .strip_prefix('e')
                .or_else(|| other.strip_prefix('E'))?;
            let digits = exponent
                .strip_prefix('-')
                .or_else(|| exponent.strip_prefix('+'))
                .unwrap_or(exponent);
            if digits.is_empty() || !digits.chars().all(|c| c.is_ascii_digit()) {
                return None;
            }
            (exponent.parse::<i32>().ok()?, 1)
        }
    };
    Some(parsed)
}
