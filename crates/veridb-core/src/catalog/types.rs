//! Field type definitions.

use crate::value::{Value, MAX_DECIMAL_SCALE};
use serde::{Deserialize, Serialize};

/// The type of a declared field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum FieldType {
    /// Boolean flag.
    Bool,
    /// 64-bit signed integer.
    Int,
    /// UTF-8 text.
    Text,
    /// Fixed-point decimal with exactly `scale` fractional digits.
    Decimal {
        /// Required number of fractional digits.
        scale: u8,
    },
    /// Ordered sequence of text values.
    TextList,
    /// Enumerated tag: text restricted to the declared variants.
    Enum {
        /// Allowed values.
        variants: Vec<String>,
    },
    /// Forward-only status chain: text restricted to the declared states,
    /// where an update may advance at most one step and never backwards.
    StateChain {
        /// States in progression order.
        states: Vec<String>,
    },
}

impl FieldType {
    /// Create an enumerated tag type.
    pub fn enumeration(variants: impl IntoIterator<Item = impl Into<String>>) -> Self {
        FieldType::Enum {
            variants: variants.into_iter().map(Into::into).collect(),
        }
    }

    /// Create a forward-only status chain type.
    pub fn state_chain(states: impl IntoIterator<Item = impl Into<String>>) -> Self {
        FieldType::StateChain {
            states: states.into_iter().map(Into::into).collect(),
        }
    }

    /// Check if this type is numeric.
    pub fn is_numeric(&self) -> bool {
        matches!(self, FieldType::Int | FieldType::Decimal { .. })
    }

    /// Position of a state within a state chain.
    pub fn state_position(&self, state: &str) -> Option<usize> {
        match self {
            FieldType::StateChain { states } => states.iter().position(|s| s == state),
            _ => None,
        }
    }

    /// The zero value of this type, used as the aggregate default.
    pub fn zero(&self) -> Value {
        match self {
            FieldType::Bool => Value::Bool(false),
            FieldType::Int => Value::Int(0),
            FieldType::Text | FieldType::Enum { .. } | FieldType::StateChain { .. } => {
                Value::Text(String::new())
            }
            FieldType::Decimal { scale } => Value::Decimal(crate::value::Decimal::zero(*scale)),
            FieldType::TextList => Value::TextList(Vec::new()),
        }
    }

    /// Type-check a non-null value against this type.
    pub fn check(&self, value: &Value) -> Result<(), String> {
        match (self, value) {
            (_, Value::Null) => Ok(()),
            (FieldType::Bool, Value::Bool(_)) => Ok(()),
            (FieldType::Int, Value::Int(_)) => Ok(()),
            (FieldType::Text, Value::Text(_)) => Ok(()),
            (FieldType::TextList, Value::TextList(_)) => Ok(()),
            (FieldType::Decimal { scale }, Value::Decimal(d)) => {
                if d.scale() == *scale {
                    Ok(())
                } else {
                    Err(format!(
                        "must be a decimal with {} fractional digit(s), got {}",
                        scale,
                        d.scale()
                    ))
                }
            }
            (FieldType::Enum { variants }, Value::Text(s)) => {
                if variants.iter().any(|v| v == s) {
                    Ok(())
                } else {
                    Err(format!("must be one of: {}", variants.join(", ")))
                }
            }
            (FieldType::StateChain { states }, Value::Text(s)) => {
                if states.iter().any(|v| v == s) {
                    Ok(())
                } else {
                    Err(format!("must be one of: {}", states.join(", ")))
                }
            }
            (expected, actual) => Err(format!(
                "expected {}, got {}",
                expected.name(),
                actual.type_name()
            )),
        }
    }

    /// Human-readable name of the type.
    pub fn name(&self) -> &'static str {
        match self {
            FieldType::Bool => "bool",
            FieldType::Int => "int",
            FieldType::Text => "text",
            FieldType::Decimal { .. } => "decimal",
            FieldType::TextList => "text list",
            FieldType::Enum { .. } => "enumerated tag",
            FieldType::StateChain { .. } => "status",
        }
    }

    /// Validate the type declaration itself.
    pub(crate) fn validate(&self) -> Result<(), String> {
        match self {
            FieldType::Decimal { scale } if *scale > MAX_DECIMAL_SCALE => Err(format!(
                "decimal scale {} exceeds the maximum of {}",
                scale, MAX_DECIMAL_SCALE
            )),
            FieldType::Enum { variants } if variants.is_empty() => {
                Err("enumeration needs at least one variant".to_string())
            }
            FieldType::StateChain { states } if states.len() < 2 => {
                Err("status chain needs at least two states".to_string())
            }
            _ => Ok(()),
        }
    }
}
