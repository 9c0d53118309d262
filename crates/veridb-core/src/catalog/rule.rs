//! Reusable per-value constraint rules.
//!
//! Rules are pure and stateless; a field carries an ordered list of them
//! and they compose freely. A rule applied to `Null` passes; absence is
//! the `required` flag's concern, not the rule's.

use crate::value::{Decimal, Value};
use serde::{Deserialize, Serialize};

/// Character-class shape for text values.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Shape {
    /// ASCII letters and spaces only.
    LettersAndSpaces,
    /// ASCII letters and digits only.
    Alphanumeric,
    /// ASCII digits only, optionally of an exact length.
    Digits {
        /// Exact digit count, if required.
        len: Option<usize>,
    },
}

impl Shape {
    fn matches(&self, s: &str) -> bool {
        match self {
            Shape::LettersAndSpaces => {
                !s.is_empty() && s.chars().all(|c| c.is_ascii_alphabetic() || c == ' ')
            }
            Shape::Alphanumeric => !s.is_empty() && s.chars().all(|c| c.is_ascii_alphanumeric()),
            Shape::Digits { len } => {
                let ok = !s.is_empty() && s.chars().all(|c| c.is_ascii_digit());
                match len {
                    Some(len) => ok && s.len() == *len,
                    None => ok,
                }
            }
        }
    }

    fn describe(&self) -> String {
        match self {
            Shape::LettersAndSpaces => "must contain only letters and spaces".to_string(),
            Shape::Alphanumeric => "must contain only letters and digits".to_string(),
            Shape::Digits { len: Some(len) } => format!("must be exactly {} digits", len),
            Shape::Digits { len: None } => "must contain only digits".to_string(),
        }
    }
}

/// A single declarative constraint over one value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ValueRule {
    /// Inclusive integer range.
    IntRange {
        /// Lower bound.
        min: i64,
        /// Upper bound.
        max: i64,
    },
    /// Inclusive decimal range.
    DecimalRange {
        /// Lower bound.
        min: Decimal,
        /// Upper bound.
        max: Decimal,
    },
    /// Inclusive character-count range for text.
    TextLength {
        /// Minimum length.
        min: usize,
        /// Maximum length.
        max: usize,
    },
    /// Character-class pattern for text.
    TextShape(Shape),
    /// Membership in an enumerated set of text values.
    OneOf(Vec<String>),
    /// The sequence must hold at least one element.
    NonEmptyList,
}

impl ValueRule {
    /// Check a value against this rule.
    ///
    /// Returns the violation reason on failure.
    pub fn check(&self, value: &Value) -> Result<(), String> {
        if value.is_null() {
            return Ok(());
        }
        match self {
            ValueRule::IntRange { min, max } => match value.as_int() {
                Some(i) if (*min..=*max).contains(&i) => Ok(()),
                Some(i) => Err(format!("must be between {} and {}, got {}", min, max, i)),
                None => Err(format!("range rule expects an integer, got {}", value.type_name())),
            },
            ValueRule::DecimalRange { min, max } => match value.as_decimal() {
                Some(d) if d >= *min && d <= *max => Ok(()),
                Some(d) => Err(format!("must be between {} and {}, got {}", min, max, d)),
                None => Err(format!("range rule expects a decimal, got {}", value.type_name())),
            },
            ValueRule::TextLength { min, max } => match value.as_text() {
                Some(s) => {
                    let len = s.chars().count();
                    if (*min..=*max).contains(&len) {
                        Ok(())
                    } else {
                        Err(format!(
                            "length must be between {} and {}, got {}",
                            min, max, len
                        ))
                    }
                }
                None => Err(format!("length rule expects text, got {}", value.type_name())),
            },
            ValueRule::TextShape(shape) => match value.as_text() {
                Some(s) if shape.matches(s) => Ok(()),
                Some(_) => Err(shape.describe()),
                None => Err(format!("shape rule expects text, got {}", value.type_name())),
            },
            ValueRule::OneOf(allowed) => match value.as_text() {
                Some(s) if allowed.iter().any(|a| a == s) => Ok(()),
                Some(s) => Err(format!("{} is not one of: {}", s, allowed.join(", "))),
                None => Err(format!("membership rule expects text, got {}", value.type_name())),
            },
            ValueRule::NonEmptyList => match value.as_text_list() {
                Some(items) if !items.is_empty() => Ok(()),
                Some(_) => Err("must contain at least one item".to_string()),
                None => Err(format!("list rule expects a text list, got {}", value.type_name())),
            },
        }
    }
}
