//! Mutation executor for entity write operations.
//!
//! Every write runs the full pipeline: key extraction, duplicate check,
//! schema validation, state-chain transition check, referential-integrity
//! check, commit. Nothing is stored until every step passes.

use tracing::debug;

use veridb_core::catalog::{EntityDef, FieldDef, FieldType};
use veridb_core::error::Error;
use veridb_core::store::{KeyValue, Record};
use veridb_core::validate::{validate_record, ValidationReport};
use veridb_core::value::Value;

use crate::database::DataSet;

/// Executes entity create and update operations against a data set.
pub(crate) struct MutationExecutor<'a> {
    data: &'a mut DataSet,
}

impl<'a> MutationExecutor<'a> {
    /// Create a new mutation executor.
    pub(crate) fn new(data: &'a mut DataSet) -> Self {
        Self { data }
    }

    /// Create a new entity record.
    pub(crate) fn create(&mut self, def: &EntityDef, record: Record) -> Result<KeyValue, Error> {
        let key = extract_key(def, &record)?;
        if self.data.store(&def.name)?.contains(&key) {
            return Err(Error::DuplicateKey {
                entity: def.name.clone(),
                key,
            });
        }
        validate_record(def, &record).map_err(|report| Error::Validation {
            entity: def.name.clone(),
            report,
        })?;
        self.check_foreign_keys(def, &record)?;
        self.data.store_mut(&def.name)?.insert(key.clone(), record)?;
        debug!(entity = %def.name, key = %key, "created entity");
        Ok(key)
    }

    /// Replace an existing entity record.
    ///
    /// The full replacement is revalidated exactly as `create` validates a
    /// new record; partial updates that skip validation do not exist.
    pub(crate) fn update(
        &mut self,
        def: &EntityDef,
        key: &KeyValue,
        record: Record,
    ) -> Result<(), Error> {
        let previous = self
            .data
            .store(&def.name)?
            .get(key)
            .cloned()
            .ok_or_else(|| Error::NotFound {
                entity: def.name.clone(),
                key: key.clone(),
            })?;

        let replacement_key = extract_key(def, &record)?;
        if replacement_key != *key {
            return Err(Error::Validation {
                entity: def.name.clone(),
                report: ValidationReport::single_field(
                    def.key_field.clone(),
                    "primary key is immutable",
                ),
            });
        }

        validate_record(def, &record).map_err(|report| Error::Validation {
            entity: def.name.clone(),
            report,
        })?;
        check_state_transitions(&def.fields, &previous, &record)?;
        self.check_foreign_keys(def, &record)?;
        self.data.store_mut(&def.name)?.replace(key, record)?;
        debug!(entity = %def.name, key = %key, "updated entity");
        Ok(())
    }

    /// Every declared foreign key must resolve to a live entity.
    ///
    /// Null values in optional reference fields pass; a stale reference
    /// can never be committed.
    fn check_foreign_keys(&self, def: &EntityDef, record: &Record) -> Result<(), Error> {
        for fk in &def.foreign_keys {
            let value = match record.get(&fk.field) {
                None | Some(Value::Null) => continue,
                Some(value) => value,
            };
            let key = KeyValue::from_value(value).ok_or_else(|| Error::TypeMismatch {
                context: format!("{}.{}", def.name, fk.field),
                expected: "int or text reference".to_string(),
                actual: value.type_name().to_string(),
            })?;
            if !self.data.store(&fk.references)?.contains(&key) {
                return Err(Error::ReferenceNotFound {
                    entity: def.name.clone(),
                    field: fk.field.clone(),
                    referenced: fk.references.clone(),
                    key,
                });
            }
        }
        Ok(())
    }
}

/// Pull the primary key out of a candidate record.
pub(crate) fn extract_key(def: &EntityDef, record: &Record) -> Result<KeyValue, Error> {
    let value = record.get(&def.key_field).ok_or_else(|| Error::Validation {
        entity: def.name.clone(),
        report: ValidationReport::single_field(def.key_field.clone(), "is required"),
    })?;
    KeyValue::from_value(value).ok_or_else(|| Error::TypeMismatch {
        context: format!("{}.{}", def.name, def.key_field),
        expected: "int or text key".to_string(),
        actual: value.type_name().to_string(),
    })
}

/// Enforce forward-only, single-step moves on every state-chain field.
///
/// Keeping the current state is always allowed; anything else must be the
/// immediate successor. Called with records that already passed schema
/// validation, so both values are declared states.
pub(crate) fn check_state_transitions(
    fields: &[FieldDef],
    previous: &Record,
    candidate: &Record,
) -> Result<(), Error> {
    for field in fields {
        if !matches!(field.field_type, FieldType::StateChain { .. }) {
            continue;
        }
        let (Some(Value::Text(from)), Some(Value::Text(to))) =
            (previous.get(&field.name), candidate.get(&field.name))
        else {
            continue;
        };
        let (Some(from_pos), Some(to_pos)) = (
            field.field_type.state_position(from),
            field.field_type.state_position(to),
        ) else {
            continue;
        };
        if to_pos != from_pos && to_pos != from_pos + 1 {
            return Err(Error::InvalidStateTransition {
                field: field.name.clone(),
                from: from.clone(),
                to: to.clone(),
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn order_fields() -> Vec<FieldDef> {
        vec![FieldDef::new(
            "status",
            FieldType::state_chain(["pending", "confirmed", "ready", "delivered"]),
        )]
    }

    fn with_status(status: &str) -> Record {
        Record::new().with("status", status)
    }

    #[test]
    fn test_forward_step_allowed() {
        let fields = order_fields();
        assert!(
            check_state_transitions(&fields, &with_status("pending"), &with_status("confirmed"))
                .is_ok()
        );
        assert!(
            check_state_transitions(&fields, &with_status("ready"), &with_status("delivered"))
                .is_ok()
        );
    }

    #[test]
    fn test_same_state_allowed() {
        let fields = order_fields();
        assert!(
            check_state_transitions(&fields, &with_status("confirmed"), &with_status("confirmed"))
                .is_ok()
        );
    }

    #[test]
    fn test_skip_and_backward_rejected() {
        let fields = order_fields();
        let skip =
            check_state_transitions(&fields, &with_status("pending"), &with_status("ready"));
        assert!(matches!(skip, Err(Error::InvalidStateTransition { .. })));

        let back =
            check_state_transitions(&fields, &with_status("ready"), &with_status("pending"));
        assert!(matches!(back, Err(Error::InvalidStateTransition { .. })));
    }
}
