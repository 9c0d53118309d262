//! Cross-field validation rules.
//!
//! Each rule is declarative, reads a documented dependency set, and is only
//! evaluated once every field it reads has passed its own field-level
//! checks. A rule whose dependency is null or absent passes: optional
//! fields never trip combination rules.

use crate::store::Record;
use crate::validate::CrossViolation;
use crate::value::Value;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// A declarative rule over a combination of fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum CrossRule {
    /// A tag value forbids a boolean flag, e.g. desserts and beverages
    /// cannot be spicy.
    ForbidFlagForTags {
        /// Tag field read.
        tag_field: String,
        /// Tag values that forbid the flag.
        tags: Vec<String>,
        /// Flag field that must then be false.
        flag_field: String,
    },
    /// A tag value caps a numeric field, e.g. beverage preparation time.
    CeilingForTag {
        /// Tag field read.
        tag_field: String,
        /// Tag value that activates the ceiling.
        tag: String,
        /// Numeric field being capped.
        bounded_field: String,
        /// Inclusive upper bound.
        max: Value,
    },
    /// A boolean flag caps a numeric field, e.g. vegetarian calorie limits.
    CeilingWhenFlag {
        /// Flag field read.
        flag_field: String,
        /// Numeric field being capped.
        bounded_field: String,
        /// Inclusive upper bound.
        max: Value,
    },
}

impl CrossRule {
    /// Fields this rule reads.
    pub fn depends_on(&self) -> Vec<&str> {
        match self {
            CrossRule::ForbidFlagForTags {
                tag_field,
                flag_field,
                ..
            } => vec![tag_field, flag_field],
            CrossRule::CeilingForTag {
                tag_field,
                bounded_field,
                ..
            } => vec![tag_field, bounded_field],
            CrossRule::CeilingWhenFlag {
                flag_field,
                bounded_field,
                ..
            } => vec![flag_field, bounded_field],
        }
    }

    /// Evaluate the rule against a record whose fields already passed.
    pub fn check(&self, record: &Record) -> Result<(), CrossViolation> {
        match self {
            CrossRule::ForbidFlagForTags {
                tag_field,
                tags,
                flag_field,
            } => {
                let Some(tag) = record.get(tag_field).and_then(Value::as_text) else {
                    return Ok(());
                };
                let Some(flag) = record.get(flag_field).and_then(Value::as_bool) else {
                    return Ok(());
                };
                if flag && tags.iter().any(|t| t == tag) {
                    return Err(CrossViolation {
                        fields: vec![tag_field.clone(), flag_field.clone()],
                        reason: format!("{} may not be set when {} is {}", flag_field, tag_field, tag),
                    });
                }
                Ok(())
            }
            CrossRule::CeilingForTag {
                tag_field,
                tag,
                bounded_field,
                max,
            } => {
                let Some(actual_tag) = record.get(tag_field).and_then(Value::as_text) else {
                    return Ok(());
                };
                if actual_tag != tag {
                    return Ok(());
                }
                let Some(value) = record.get(bounded_field) else {
                    return Ok(());
                };
                if value.compare(max) == Some(Ordering::Greater) {
                    return Err(CrossViolation {
                        fields: vec![tag_field.clone(), bounded_field.clone()],
                        reason: format!(
                            "{} must be at most {} when {} is {}",
                            bounded_field, max, tag_field, tag
                        ),
                    });
                }
                Ok(())
            }
            CrossRule::CeilingWhenFlag {
                flag_field,
                bounded_field,
                max,
            } => {
                let Some(flag) = record.get(flag_field).and_then(Value::as_bool) else {
                    return Ok(());
                };
                if !flag {
                    return Ok(());
                }
                let Some(value) = record.get(bounded_field) else {
                    return Ok(());
                };
                if value.compare(max) == Some(Ordering::Greater) {
                    return Err(CrossViolation {
                        fields: vec![flag_field.clone(), bounded_field.clone()],
                        reason: format!(
                            "{} must be at most {} when {} is set",
                            bounded_field, max, flag_field
                        ),
                    });
                }
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_forbidden_flag_for_tag() {
        let rule = CrossRule::ForbidFlagForTags {
            tag_field: "category".into(),
            tags: vec!["dessert".into(), "beverage".into()],
            flag_field: "is_spicy".into(),
        };

        let spicy_coffee = Record::new()
            .with("category", "beverage")
            .with("is_spicy", true);
        assert!(rule.check(&spicy_coffee).is_err());

        let mild_coffee = Record::new()
            .with("category", "beverage")
            .with("is_spicy", false);
        assert!(rule.check(&mild_coffee).is_ok());

        let spicy_main = Record::new()
            .with("category", "main_course")
            .with("is_spicy", true);
        assert!(rule.check(&spicy_main).is_ok());
    }

    #[test]
    fn test_ceiling_for_tag() {
        let rule = CrossRule::CeilingForTag {
            tag_field: "category".into(),
            tag: "beverage".into(),
            bounded_field: "preparation_time".into(),
            max: Value::Int(10),
        };

        let slow_drink = Record::new()
            .with("category", "beverage")
            .with("preparation_time", 25i64);
        assert!(rule.check(&slow_drink).is_err());

        let slow_meal = Record::new()
            .with("category", "main_course")
            .with("preparation_time", 25i64);
        assert!(rule.check(&slow_meal).is_ok());
    }

    #[test]
    fn test_ceiling_when_flag() {
        let rule = CrossRule::CeilingWhenFlag {
            flag_field: "is_vegetarian".into(),
            bounded_field: "calories".into(),
            max: Value::Int(799),
        };

        let heavy_veg = Record::new()
            .with("is_vegetarian", true)
            .with("calories", 800i64);
        assert!(rule.check(&heavy_veg).is_err());

        let light_veg = Record::new()
            .with("is_vegetarian", true)
            .with("calories", 650i64);
        assert!(rule.check(&light_veg).is_ok());

        // Null dependency: the rule stays quiet.
        let no_calories = Record::new().with("is_vegetarian", true);
        assert!(rule.check(&no_calories).is_ok());
    }

    #[test]
    fn test_depends_on() {
        let rule = CrossRule::CeilingWhenFlag {
            flag_field: "is_vegetarian".into(),
            bounded_field: "calories".into(),
            max: Value::Int(799),
        };
        assert_eq!(rule.depends_on(), vec!["is_vegetarian", "calories"]);
    }
}
