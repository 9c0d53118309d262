//! Entity definitions.

use super::cross::CrossRule;
use super::field::FieldDef;
use super::types::FieldType;
use serde::{Deserialize, Serialize};

/// Behavior when a referenced entity is deleted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DeleteBehavior {
    /// Delete dependent records recursively.
    Cascade,
    /// Refuse the delete while dependents exist.
    Restrict,
}

/// A foreign-key declaration: a field referencing another entity's key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForeignKeyDef {
    /// Referencing field on this entity.
    pub field: String,
    /// Referenced entity type.
    pub references: String,
    /// What happens to this entity when the referenced one is deleted.
    pub on_delete: DeleteBehavior,
}

impl ForeignKeyDef {
    /// Create a cascading foreign key.
    pub fn new(field: impl Into<String>, references: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            references: references.into(),
            on_delete: DeleteBehavior::Cascade,
        }
    }

    /// Set the delete behavior.
    pub fn with_on_delete(mut self, on_delete: DeleteBehavior) -> Self {
        self.on_delete = on_delete;
        self
    }
}

/// An entity definition: key field, ordered fields, combination rules, and
/// foreign keys. Immutable once registered.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityDef {
    /// Entity name (unique within the catalog).
    pub name: String,
    /// Name of the primary-key field.
    pub key_field: String,
    /// Field definitions in validation order.
    pub fields: Vec<FieldDef>,
    /// Cross-field rules in evaluation order.
    pub cross_rules: Vec<CrossRule>,
    /// Foreign-key declarations.
    pub foreign_keys: Vec<ForeignKeyDef>,
}

impl EntityDef {
    /// Create a new entity definition.
    pub fn new(name: impl Into<String>, key_field: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            key_field: key_field.into(),
            fields: Vec::new(),
            cross_rules: Vec::new(),
            foreign_keys: Vec::new(),
        }
    }

    /// Add a field.
    pub fn with_field(mut self, field: FieldDef) -> Self {
        self.fields.push(field);
        self
    }

    /// Add a cross-field rule.
    pub fn with_cross_rule(mut self, rule: CrossRule) -> Self {
        self.cross_rules.push(rule);
        self
    }

    /// Add a foreign key.
    pub fn with_foreign_key(mut self, fk: ForeignKeyDef) -> Self {
        self.foreign_keys.push(fk);
        self
    }

    /// Get a field by name.
    pub fn get_field(&self, name: &str) -> Option<&FieldDef> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Get the key field definition.
    pub fn key_def(&self) -> Option<&FieldDef> {
        self.get_field(&self.key_field)
    }

    /// Get the foreign key declared on a field, if any.
    pub fn foreign_key_for(&self, field: &str) -> Option<&ForeignKeyDef> {
        self.foreign_keys.iter().find(|fk| fk.field == field)
    }

    /// Validate the definition's internal consistency.
    pub(crate) fn validate_definition(&self) -> Result<(), String> {
        let key = self
            .key_def()
            .ok_or_else(|| format!("key field {} is not declared", self.key_field))?;
        if !matches!(key.field_type, FieldType::Int | FieldType::Text) {
            return Err(format!(
                "key field {} must be int or text, got {}",
                self.key_field,
                key.field_type.name()
            ));
        }
        if !key.required {
            return Err(format!("key field {} must be required", self.key_field));
        }
        for field in &self.fields {
            field
                .field_type
                .validate()
                .map_err(|reason| format!("field {}: {}", field.name, reason))?;
        }
        for fk in &self.foreign_keys {
            if self.get_field(&fk.field).is_none() {
                return Err(format!("foreign-key field {} is not declared", fk.field));
            }
        }
        for rule in &self.cross_rules {
            for dep in rule.depends_on() {
                if self.get_field(dep).is_none() {
                    return Err(format!("cross-field rule reads undeclared field {}", dep));
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entity_builder() {
        let course = EntityDef::new("Course", "id")
            .with_field(FieldDef::new("id", FieldType::Int))
            .with_field(FieldDef::new("name", FieldType::Text))
            .with_field(FieldDef::new("professor_id", FieldType::Int))
            .with_foreign_key(ForeignKeyDef::new("professor_id", "Professor"));

        assert_eq!(course.name, "Course");
        assert_eq!(course.fields.len(), 3);
        assert!(course.get_field("name").is_some());
        assert!(course.foreign_key_for("professor_id").is_some());
        assert!(course.foreign_key_for("name").is_none());
        assert!(course.validate_definition().is_ok());
    }

    #[test]
    fn test_missing_key_field_rejected() {
        let bad = EntityDef::new("Course", "id");
        assert!(bad.validate_definition().is_err());
    }

    #[test]
    fn test_non_key_typed_key_rejected() {
        let bad = EntityDef::new("Course", "id")
            .with_field(FieldDef::new("id", FieldType::Bool));
        assert!(bad.validate_definition().is_err());
    }

    #[test]
    fn test_undeclared_fk_field_rejected() {
        let bad = EntityDef::new("Course", "id")
            .with_field(FieldDef::new("id", FieldType::Int))
            .with_foreign_key(ForeignKeyDef::new("professor_id", "Professor"));
        assert!(bad.validate_definition().is_err());
    }
}
