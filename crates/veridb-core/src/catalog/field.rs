//! Field definitions.

use super::rule::ValueRule;
use super::types::FieldType;
use serde::{Deserialize, Serialize};

/// A field declaration: type, requiredness, and an ordered rule list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldDef {
    /// Field name.
    pub name: String,
    /// Field data type.
    pub field_type: FieldType,
    /// Whether a non-null value must be present.
    pub required: bool,
    /// Constraint rules, checked in declaration order.
    pub rules: Vec<ValueRule>,
}

impl FieldDef {
    /// Create a required field.
    pub fn new(name: impl Into<String>, field_type: FieldType) -> Self {
        Self {
            name: name.into(),
            field_type,
            required: true,
            rules: Vec::new(),
        }
    }

    /// Create an optional field (null or absent values pass).
    pub fn optional(name: impl Into<String>, field_type: FieldType) -> Self {
        Self {
            name: name.into(),
            field_type,
            required: false,
            rules: Vec::new(),
        }
    }

    /// Append a constraint rule.
    pub fn with_rule(mut self, rule: ValueRule) -> Self {
        self.rules.push(rule);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_field_builder() {
        let field = FieldDef::new("preparation_time", FieldType::Int)
            .with_rule(ValueRule::IntRange { min: 1, max: 120 });

        assert_eq!(field.name, "preparation_time");
        assert!(field.required);
        assert_eq!(field.rules.len(), 1);
    }

    #[test]
    fn test_optional_field() {
        let field = FieldDef::optional("calories", FieldType::Int);
        assert!(!field.required);
        assert!(field.rules.is_empty());
    }
}
