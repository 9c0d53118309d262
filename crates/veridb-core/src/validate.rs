//! Record validation against declared schemas.
//!
//! Field rules run in declared order: the first failing rule stops that
//! field, independent fields continue, and every violating field is
//! reported together. Cross-field rules run afterwards, and only when the
//! record has no field-level violations, so a cross-field error can never
//! mask the field-level error that caused it.

use crate::catalog::{EntityDef, FieldDef};
use crate::store::Record;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A single field-level rule violation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldViolation {
    /// Violating field.
    pub field: String,
    /// Why the value was rejected.
    pub reason: String,
}

/// A cross-field rule violation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CrossViolation {
    /// Fields the rule read.
    pub fields: Vec<String>,
    /// Why the combination was rejected.
    pub reason: String,
}

/// Everything a validation pass rejected, collected together.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ValidationReport {
    /// Field-level violations, in field declaration order.
    pub field_errors: Vec<FieldViolation>,
    /// Cross-field violations, in rule declaration order.
    pub cross_errors: Vec<CrossViolation>,
}

impl ValidationReport {
    /// Check if the report carries no violations.
    pub fn is_empty(&self) -> bool {
        self.field_errors.is_empty() && self.cross_errors.is_empty()
    }

    /// A report with a single field violation.
    pub fn single_field(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            field_errors: vec![FieldViolation {
                field: field.into(),
                reason: reason.into(),
            }],
            cross_errors: Vec::new(),
        }
    }
}

impl fmt::Display for ValidationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut parts: Vec<String> = Vec::new();
        for v in &self.field_errors {
            parts.push(format!("{}: {}", v.field, v.reason));
        }
        for v in &self.cross_errors {
            parts.push(format!("{}: {}", v.fields.join("/"), v.reason));
        }
        write!(f, "{}", parts.join("; "))
    }
}

/// Run field-level checks over an ordered field list.
///
/// Missing and `Null` values are equivalent; both fail only `required`
/// fields. Undeclared fields in the candidate are rejected.
pub fn field_violations(fields: &[FieldDef], record: &Record) -> Vec<FieldViolation> {
    let mut violations = Vec::new();

    for def in fields {
        let value = record.get(&def.name);
        match value {
            None | Some(crate::value::Value::Null) => {
                if def.required {
                    violations.push(FieldViolation {
                        field: def.name.clone(),
                        reason: "is required".to_string(),
                    });
                }
            }
            Some(value) => {
                if let Err(reason) = def.field_type.check(value) {
                    violations.push(FieldViolation {
                        field: def.name.clone(),
                        reason,
                    });
                    continue;
                }
                for rule in &def.rules {
                    if let Err(reason) = rule.check(value) {
                        violations.push(FieldViolation {
                            field: def.name.clone(),
                            reason,
                        });
                        break;
                    }
                }
            }
        }
    }

    for (name, _) in record.fields() {
        if !fields.iter().any(|def| def.name == *name) {
            violations.push(FieldViolation {
                field: name.clone(),
                reason: "unknown field".to_string(),
            });
        }
    }

    violations
}

/// Validate an ordered field list, e.g. a join payload schema.
pub fn validate_fields(fields: &[FieldDef], record: &Record) -> Result<(), ValidationReport> {
    let field_errors = field_violations(fields, record);
    if field_errors.is_empty() {
        Ok(())
    } else {
        Err(ValidationReport {
            field_errors,
            cross_errors: Vec::new(),
        })
    }
}

/// Validate a candidate record against a full entity schema.
pub fn validate_record(def: &EntityDef, record: &Record) -> Result<(), ValidationReport> {
    let field_errors = field_violations(&def.fields, record);

    let mut cross_errors = Vec::new();
    if field_errors.is_empty() {
        for rule in &def.cross_rules {
            if let Err(violation) = rule.check(record) {
                cross_errors.push(violation);
            }
        }
    }

    if field_errors.is_empty() && cross_errors.is_empty() {
        Ok(())
    } else {
        Err(ValidationReport {
            field_errors,
            cross_errors,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{CrossRule, FieldDef, FieldType, Shape, ValueRule};
    use crate::value::Value;

    fn item_def() -> EntityDef {
        EntityDef::new("MenuItem", "id")
            .with_field(FieldDef::new("id", FieldType::Int))
            .with_field(
                FieldDef::new("name", FieldType::Text)
                    .with_rule(ValueRule::TextLength { min: 3, max: 100 })
                    .with_rule(ValueRule::TextShape(Shape::LettersAndSpaces)),
            )
            .with_field(
                FieldDef::new(
                    "category",
                    FieldType::enumeration(["appetizer", "main_course", "dessert", "beverage"]),
                ),
            )
            .with_field(FieldDef::new("is_spicy", FieldType::Bool))
            .with_field(
                FieldDef::optional("calories", FieldType::Int)
                    .with_rule(ValueRule::IntRange { min: 1, max: 10_000 }),
            )
            .with_cross_rule(CrossRule::ForbidFlagForTags {
                tag_field: "category".into(),
                tags: vec!["dessert".into(), "beverage".into()],
                flag_field: "is_spicy".into(),
            })
    }

    fn valid_item() -> Record {
        Record::new()
            .with("id", 1i64)
            .with("name", "Hot Coffee")
            .with("category", "beverage")
            .with("is_spicy", false)
    }

    #[test]
    fn test_valid_record_passes() {
        assert!(validate_record(&item_def(), &valid_item()).is_ok());
    }

    #[test]
    fn test_all_field_errors_collected() {
        let record = Record::new()
            .with("id", 1i64)
            .with("name", "ab")
            .with("category", "snack")
            .with("is_spicy", false);

        let report = validate_record(&item_def(), &record).unwrap_err();
        let fields: Vec<&str> = report
            .field_errors
            .iter()
            .map(|v| v.field.as_str())
            .collect();
        assert_eq!(fields, vec!["name", "category"]);
        assert!(report.cross_errors.is_empty());
    }

    #[test]
    fn test_first_failing_rule_stops_the_field() {
        // "ab!" violates both length and shape; only length is reported.
        let record = valid_item().with("name", "ab");
        let report = validate_record(&item_def(), &record).unwrap_err();
        assert_eq!(report.field_errors.len(), 1);
        assert!(report.field_errors[0].reason.contains("length"));
    }

    #[test]
    fn test_cross_rule_reported_only_when_fields_pass() {
        // Spicy beverage with an invalid name: the field error wins and the
        // cross rule is not evaluated.
        let record = valid_item().with("name", "x").with("is_spicy", true);
        let report = validate_record(&item_def(), &record).unwrap_err();
        assert_eq!(report.field_errors.len(), 1);
        assert!(report.cross_errors.is_empty());

        // With the name fixed, the cross violation surfaces.
        let record = valid_item().with("is_spicy", true);
        let report = validate_record(&item_def(), &record).unwrap_err();
        assert!(report.field_errors.is_empty());
        assert_eq!(report.cross_errors.len(), 1);
        assert!(report.cross_errors[0].fields.contains(&"is_spicy".to_string()));
    }

    #[test]
    fn test_optional_null_skips_rules() {
        let record = valid_item().with("calories", Value::Null);
        assert!(validate_record(&item_def(), &record).is_ok());
    }

    #[test]
    fn test_missing_required_field() {
        let record = Record::new().with("id", 2i64);
        let report = validate_record(&item_def(), &record).unwrap_err();
        assert!(report
            .field_errors
            .iter()
            .any(|v| v.field == "name" && v.reason == "is required"));
    }

    #[test]
    fn test_unknown_field_rejected() {
        let record = valid_item().with("surprise", 1i64);
        let report = validate_record(&item_def(), &record).unwrap_err();
        assert!(report
            .field_errors
            .iter()
            .any(|v| v.field == "surprise" && v.reason == "unknown field"));
    }
}
