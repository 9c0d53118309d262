//! Primitive values carried by entity and join records.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use thiserror::Error;

/// Largest supported decimal scale.
///
/// Keeps cross-scale comparisons inside i128 range.
pub const MAX_DECIMAL_SCALE: u8 = 12;

/// A fixed-point decimal stored as scaled integer units.
///
/// The numeric value is `units / 10^scale`. Monetary and grade fields use
/// this representation instead of binary floating point so sums and
/// averages stay exact.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Decimal {
    units: i64,
    scale: u8,
}

/// Error parsing a decimal literal.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid decimal literal: {0}")]
pub struct ParseDecimalError(String);

fn pow10(scale: u8) -> i128 {
    10i128.pow(u32::from(scale))
}

impl Decimal {
    /// Create a decimal from raw units at the given scale.
    pub const fn new(units: i64, scale: u8) -> Self {
        Self { units, scale }
    }

    /// The zero value at the given scale.
    pub const fn zero(scale: u8) -> Self {
        Self { units: 0, scale }
    }

    /// Raw scaled units.
    pub fn units(&self) -> i64 {
        self.units
    }

    /// Number of fractional digits.
    pub fn scale(&self) -> u8 {
        self.scale
    }

    /// Parse a literal such as `"2.99"`, `"-0.5"`, or `"15"`.
    ///
    /// The scale is the number of digits after the point.
    pub fn parse(s: &str) -> Result<Self, ParseDecimalError> {
        let err = || ParseDecimalError(s.to_string());
        let (int_part, frac_part) = match s.split_once('.') {
            Some((i, f)) => (i, f),
            None => (s, ""),
        };
        if int_part.is_empty() && frac_part.is_empty() {
            return Err(err());
        }
        let scale = u8::try_from(frac_part.len()).map_err(|_| err())?;
        if scale > MAX_DECIMAL_SCALE {
            return Err(err());
        }
        let negative = int_part.starts_with('-');
        let digits: String = int_part
            .trim_start_matches(['-', '+'])
            .chars()
            .chain(frac_part.chars())
            .collect();
        if digits.is_empty() || !digits.chars().all(|c| c.is_ascii_digit()) {
            return Err(err());
        }
        let mut units: i64 = digits.parse().map_err(|_| err())?;
        if negative {
            units = -units;
        }
        Ok(Self { units, scale })
    }

    /// Add two decimals of the same scale.
    ///
    /// Returns `None` on scale mismatch or overflow.
    pub fn checked_add(self, other: Self) -> Option<Self> {
        if self.scale != other.scale {
            return None;
        }
        Some(Self {
            units: self.units.checked_add(other.units)?,
            scale: self.scale,
        })
    }

    /// Multiply by an integer factor, keeping the scale.
    pub fn checked_mul_int(self, factor: i64) -> Option<Self> {
        Some(Self {
            units: self.units.checked_mul(factor)?,
            scale: self.scale,
        })
    }

    fn cmp_units(&self, other: &Self) -> Ordering {
        let a = i128::from(self.units) * pow10(other.scale);
        let b = i128::from(other.units) * pow10(self.scale);
        a.cmp(&b)
    }
}

impl PartialEq for Decimal {
    fn eq(&self, other: &Self) -> bool {
        self.cmp_units(other) == Ordering::Equal
    }
}

impl Eq for Decimal {}

impl PartialOrd for Decimal {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Decimal {
    fn cmp(&self, other: &Self) -> Ordering {
        self.cmp_units(other)
    }
}

impl fmt::Display for Decimal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.scale == 0 {
            return write!(f, "{}", self.units);
        }
        let divisor = pow10(self.scale);
        let abs = i128::from(self.units).unsigned_abs();
        let sign = if self.units < 0 { "-" } else { "" };
        write!(
            f,
            "{}{}.{:0width$}",
            sign,
            abs / divisor.unsigned_abs(),
            abs % divisor.unsigned_abs(),
            width = usize::from(self.scale)
        )
    }
}

/// A primitive field value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
    /// Absent optional value.
    Null,
    /// Boolean value.
    Bool(bool),
    /// 64-bit signed integer.
    Int(i64),
    /// Fixed-point decimal.
    Decimal(Decimal),
    /// UTF-8 text.
    Text(String),
    /// Ordered sequence of text values.
    TextList(Vec<String>),
}

impl Value {
    /// Check if this value is null.
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Human-readable name of the value's type.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Decimal(_) => "decimal",
            Value::Text(_) => "text",
            Value::TextList(_) => "text list",
        }
    }

    /// Try to compare two values.
    ///
    /// Integers and decimals compare across representations; null compares
    /// with nothing.
    pub fn compare(&self, other: &Value) -> Option<Ordering> {
        match (self, other) {
            (Value::Bool(a), Value::Bool(b)) => Some(a.cmp(b)),
            (Value::Int(a), Value::Int(b)) => Some(a.cmp(b)),
            (Value::Decimal(a), Value::Decimal(b)) => Some(a.cmp(b)),
            (Value::Int(a), Value::Decimal(b)) => Some(Decimal::new(*a, 0).cmp(b)),
            (Value::Decimal(a), Value::Int(b)) => Some(a.cmp(&Decimal::new(*b, 0))),
            (Value::Text(a), Value::Text(b)) => Some(a.cmp(b)),
            _ => None,
        }
    }

    /// Get the integer value, if any.
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            _ => None,
        }
    }

    /// Get the boolean value, if any.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Get the text value, if any.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Get the decimal value, if any.
    pub fn as_decimal(&self) -> Option<Decimal> {
        match self {
            Value::Decimal(d) => Some(*d),
            _ => None,
        }
    }

    /// Get the text list, if any.
    pub fn as_text_list(&self) -> Option<&[String]> {
        match self {
            Value::TextList(items) => Some(items),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "null"),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Int(i) => write!(f, "{}", i),
            Value::Decimal(d) => write!(f, "{}", d),
            Value::Text(s) => write!(f, "{}", s),
            Value::TextList(items) => write!(f, "[{}]", items.join(", ")),
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Int(i)
    }
}

impl From<i32> for Value {
    fn from(i: i32) -> Self {
        Value::Int(i64::from(i))
    }
}

impl From<Decimal> for Value {
    fn from(d: Decimal) -> Self {
        Value::Decimal(d)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Text(s)
    }
}

impl From<Vec<String>> for Value {
    fn from(items: Vec<String>) -> Self {
        Value::TextList(items)
    }
}

impl<T> From<Option<T>> for Value
where
    T: Into<Value>,
{
    fn from(opt: Option<T>) -> Self {
        match opt {
            Some(v) => v.into(),
            None => Value::Null,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decimal_parse() {
        assert_eq!(Decimal::parse("2.99").unwrap(), Decimal::new(299, 2));
        assert_eq!(Decimal::parse("15").unwrap(), Decimal::new(15, 0));
        assert_eq!(Decimal::parse("-0.50").unwrap(), Decimal::new(-50, 2));
        assert!(Decimal::parse("abc").is_err());
        assert!(Decimal::parse("1.2.3").is_err());
        assert!(Decimal::parse("").is_err());
    }

    #[test]
    fn test_decimal_display() {
        assert_eq!(Decimal::new(1599, 2).to_string(), "15.99");
        assert_eq!(Decimal::new(-50, 2).to_string(), "-0.50");
        assert_eq!(Decimal::new(7, 0).to_string(), "7");
    }

    #[test]
    fn test_decimal_cross_scale_compare() {
        assert_eq!(Decimal::new(150, 2), Decimal::new(15, 1));
        assert!(Decimal::new(299, 2) > Decimal::new(2, 0));
        assert!(Decimal::new(100, 2) < Decimal::new(101, 2));
    }

    #[test]
    fn test_decimal_exact_sum() {
        // 0.10 added ten times is exactly 1.00, which f64 cannot promise.
        let dime = Decimal::new(10, 2);
        let mut total = Decimal::zero(2);
        for _ in 0..10 {
            total = total.checked_add(dime).unwrap();
        }
        assert_eq!(total, Decimal::new(100, 2));
    }

    #[test]
    fn test_decimal_add_scale_mismatch() {
        assert!(Decimal::new(1, 2).checked_add(Decimal::new(1, 3)).is_none());
    }

    #[test]
    fn test_value_compare() {
        assert_eq!(
            Value::Int(3).compare(&Value::Int(5)),
            Some(Ordering::Less)
        );
        assert_eq!(
            Value::Int(10).compare(&Value::Decimal(Decimal::new(1000, 2))),
            Some(Ordering::Equal)
        );
        assert!(Value::Null.compare(&Value::Int(1)).is_none());
        assert!(Value::Text("a".into()).compare(&Value::Int(1)).is_none());
    }

    #[test]
    fn test_value_from_option() {
        let v: Value = Option::<i64>::None.into();
        assert!(v.is_null());
        let v: Value = Some(42i64).into();
        assert_eq!(v, Value::Int(42));
    }

    #[test]
    fn test_serde_roundtrip() {
        let v = Value::Decimal(Decimal::new(299, 2));
        let json = serde_json::to_string(&v).unwrap();
        let back: Value = serde_json::from_str(&json).unwrap();
        assert_eq!(v, back);
    }
}
