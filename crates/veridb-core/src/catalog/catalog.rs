//! The catalog: a concurrent registry of immutable definitions.
//!
//! Definitions are validated once at registration and then shared
//! read-only behind `Arc`s; re-registering a name is an error.

use std::sync::Arc;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use tracing::debug;

use super::aggregate::{AggregateDef, AggregateSource, Reducer};
use super::entity::{EntityDef, ForeignKeyDef};
use super::relation::{RelationDef, Side};
use super::types::FieldType;
use crate::error::Error;

/// Numeric shape of an aggregate contribution or result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum NumericShape {
    Int,
    Decimal(u8),
}

/// Registry of entity, relation, and aggregate definitions.
#[derive(Debug, Default)]
pub struct Catalog {
    entities: DashMap<String, Arc<EntityDef>>,
    relations: DashMap<String, Arc<RelationDef>>,
    aggregates: DashMap<String, Arc<AggregateDef>>,
}

impl Catalog {
    /// Create an empty catalog.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an entity definition.
    ///
    /// Foreign keys may reference previously registered entities or the
    /// entity itself; registration order follows dependency order.
    pub fn register_entity(&self, def: EntityDef) -> Result<(), Error> {
        def.validate_definition()
            .map_err(|reason| Error::InvalidDefinition {
                name: def.name.clone(),
                reason,
            })?;
        for fk in &def.foreign_keys {
            if fk.references != def.name && !self.entities.contains_key(&fk.references) {
                return Err(Error::UnknownEntity(fk.references.clone()));
            }
        }
        let name = def.name.clone();
        match self.entities.entry(name.clone()) {
            Entry::Occupied(_) => Err(Error::SchemaConflict(name)),
            Entry::Vacant(slot) => {
                slot.insert(Arc::new(def));
                debug!(entity = %name, "registered entity definition");
                Ok(())
            }
        }
    }

    /// Register a relation definition.
    pub fn register_relation(&self, def: RelationDef) -> Result<(), Error> {
        let left = self.entity(&def.left_entity)?;
        let right = self.entity(&def.right_entity)?;
        for field in &def.payload_fields {
            field
                .field_type
                .validate()
                .map_err(|reason| Error::InvalidDefinition {
                    name: def.name.clone(),
                    reason: format!("payload field {}: {}", field.name, reason),
                })?;
        }
        if let Some(capacity) = &def.capacity {
            let bounded = match capacity.side {
                Side::Left => &left,
                Side::Right => &right,
            };
            let bound_field = bounded.get_field(&capacity.bound_field).ok_or_else(|| {
                Error::InvalidDefinition {
                    name: def.name.clone(),
                    reason: format!(
                        "capacity bound field {} is not declared on {}",
                        capacity.bound_field, bounded.name
                    ),
                }
            })?;
            if bound_field.field_type != FieldType::Int {
                return Err(Error::InvalidDefinition {
                    name: def.name.clone(),
                    reason: format!(
                        "capacity bound field {} must be an integer",
                        capacity.bound_field
                    ),
                });
            }
        }
        let name = def.name.clone();
        match self.relations.entry(name.clone()) {
            Entry::Occupied(_) => Err(Error::SchemaConflict(name)),
            Entry::Vacant(slot) => {
                slot.insert(Arc::new(def));
                debug!(relation = %name, "registered relation definition");
                Ok(())
            }
        }
    }

    /// Register an aggregate definition.
    pub fn register_aggregate(&self, def: AggregateDef) -> Result<(), Error> {
        let relation = self.relation(&def.relation)?;
        let target_entity = self.entity(relation.entity_on(def.target))?;

        let invalid = |reason: String| Error::InvalidDefinition {
            name: def.name.clone(),
            reason,
        };

        let contribution = contribution_shape(&relation, &def.source).map_err(invalid)?;
        let result = reducer_shape(&def.reducer, contribution).map_err(invalid)?;

        let target_field = target_entity
            .get_field(&def.target_field)
            .ok_or_else(|| {
                invalid(format!(
                    "target field {} is not declared on {}",
                    def.target_field, target_entity.name
                ))
            })?;
        let target_shape = match target_field.field_type {
            FieldType::Int => NumericShape::Int,
            FieldType::Decimal { scale } => NumericShape::Decimal(scale),
            _ => {
                return Err(invalid(format!(
                    "target field {} must be numeric",
                    def.target_field
                )))
            }
        };
        if target_shape != result {
            return Err(invalid(format!(
                "target field {} does not match the reducer's result type",
                def.target_field
            )));
        }

        let name = def.name.clone();
        match self.aggregates.entry(name.clone()) {
            Entry::Occupied(_) => Err(Error::SchemaConflict(name)),
            Entry::Vacant(slot) => {
                slot.insert(Arc::new(def));
                debug!(aggregate = %name, "registered aggregate definition");
                Ok(())
            }
        }
    }

    /// Look up an entity definition.
    pub fn entity(&self, name: &str) -> Result<Arc<EntityDef>, Error> {
        self.entities
            .get(name)
            .map(|e| Arc::clone(e.value()))
            .ok_or_else(|| Error::UnknownEntity(name.to_string()))
    }

    /// Look up a relation definition.
    pub fn relation(&self, name: &str) -> Result<Arc<RelationDef>, Error> {
        self.relations
            .get(name)
            .map(|r| Arc::clone(r.value()))
            .ok_or_else(|| Error::UnknownRelation(name.to_string()))
    }

    /// All registered entity names.
    pub fn entity_names(&self) -> Vec<String> {
        self.entities.iter().map(|e| e.key().clone()).collect()
    }

    /// All relations with the given entity type at either endpoint.
    pub fn relations_with_endpoint(&self, entity: &str) -> Vec<Arc<RelationDef>> {
        self.relations
            .iter()
            .filter(|r| r.left_entity == entity || r.right_entity == entity)
            .map(|r| Arc::clone(r.value()))
            .collect()
    }

    /// All aggregates fed by the given relation.
    pub fn aggregates_for(&self, relation: &str) -> Vec<Arc<AggregateDef>> {
        self.aggregates
            .iter()
            .filter(|a| a.relation == relation)
            .map(|a| Arc::clone(a.value()))
            .collect()
    }

    /// All foreign keys, across the catalog, referencing the given entity.
    pub fn referencing_foreign_keys(&self, target: &str) -> Vec<(Arc<EntityDef>, ForeignKeyDef)> {
        let mut out = Vec::new();
        for entry in self.entities.iter() {
            for fk in &entry.value().foreign_keys {
                if fk.references == target {
                    out.push((Arc::clone(entry.value()), fk.clone()));
                }
            }
        }
        out
    }
}

/// Numeric shape of a contribution, derived from the payload schema.
fn contribution_shape(
    relation: &RelationDef,
    source: &AggregateSource,
) -> Result<NumericShape, String> {
    let shape_of = |field: &str| -> Result<NumericShape, String> {
        let def = relation
            .payload_field(field)
            .ok_or_else(|| format!("payload field {} is not declared", field))?;
        match def.field_type {
            FieldType::Int => Ok(NumericShape::Int),
            FieldType::Decimal { scale } => Ok(NumericShape::Decimal(scale)),
            _ => Err(format!("payload field {} must be numeric", field)),
        }
    };
    match source {
        AggregateSource::Payload(field) => shape_of(field),
        AggregateSource::PayloadProduct(a, b) => match (shape_of(a)?, shape_of(b)?) {
            (NumericShape::Int, NumericShape::Int) => Ok(NumericShape::Int),
            (NumericShape::Int, NumericShape::Decimal(s))
            | (NumericShape::Decimal(s), NumericShape::Int) => Ok(NumericShape::Decimal(s)),
            (NumericShape::Decimal(_), NumericShape::Decimal(_)) => {
                Err(format!("product of two decimals ({} × {}) is not supported", a, b))
            }
        },
    }
}

/// Result shape of a reducer over contributions of the given shape.
fn reducer_shape(reducer: &Reducer, contribution: NumericShape) -> Result<NumericShape, String> {
    match reducer {
        Reducer::Mean { scale } => {
            if let NumericShape::Decimal(s) = contribution {
                if s != *scale {
                    return Err(format!(
                        "mean scale {} does not match contribution scale {}",
                        scale, s
                    ));
                }
            }
            Ok(NumericShape::Decimal(*scale))
        }
        Reducer::Sum => Ok(contribution),
        Reducer::SumPlusFee { fee } => match contribution {
            NumericShape::Decimal(s) if s == fee.scale() => Ok(NumericShape::Decimal(s)),
            _ => Err(format!(
                "sum-plus-fee needs decimal contributions at the fee's scale {}",
                fee.scale()
            )),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{CapacityPolicy, CapacityRule, FieldDef};

    fn registrar_catalog() -> Catalog {
        let catalog = Catalog::new();
        catalog
            .register_entity(
                EntityDef::new("Professor", "id")
                    .with_field(FieldDef::new("id", FieldType::Int))
                    .with_field(FieldDef::new("name", FieldType::Text)),
            )
            .unwrap();
        catalog
            .register_entity(
                EntityDef::new("Course", "id")
                    .with_field(FieldDef::new("id", FieldType::Int))
                    .with_field(FieldDef::new("professor_id", FieldType::Int))
                    .with_field(FieldDef::new("max_capacity", FieldType::Int))
                    .with_foreign_key(ForeignKeyDef::new("professor_id", "Professor")),
            )
            .unwrap();
        catalog
            .register_entity(
                EntityDef::new("Student", "id")
                    .with_field(FieldDef::new("id", FieldType::Text))
                    .with_field(FieldDef::new("gpa", FieldType::Decimal { scale: 2 })),
            )
            .unwrap();
        catalog
    }

    fn enrollments() -> RelationDef {
        RelationDef::pairwise("enrollments", "Student", "Course")
            .with_payload_field(FieldDef::optional("grade", FieldType::Decimal { scale: 2 }))
            .with_capacity(CapacityRule::new(
                Side::Right,
                "max_capacity",
                CapacityPolicy::Waitlist { auto_promote: true },
            ))
    }

    #[test]
    fn test_register_and_lookup() {
        let catalog = registrar_catalog();
        assert!(catalog.entity("Course").is_ok());
        assert!(catalog.entity("Dormitory").is_err());
    }

    #[test]
    fn test_duplicate_registration_rejected() {
        let catalog = registrar_catalog();
        let result = catalog.register_entity(
            EntityDef::new("Student", "id").with_field(FieldDef::new("id", FieldType::Int)),
        );
        assert_eq!(result, Err(Error::SchemaConflict("Student".into())));
    }

    #[test]
    fn test_fk_target_must_exist() {
        let catalog = Catalog::new();
        let result = catalog.register_entity(
            EntityDef::new("Course", "id")
                .with_field(FieldDef::new("id", FieldType::Int))
                .with_field(FieldDef::new("professor_id", FieldType::Int))
                .with_foreign_key(ForeignKeyDef::new("professor_id", "Professor")),
        );
        assert_eq!(result, Err(Error::UnknownEntity("Professor".into())));
    }

    #[test]
    fn test_relation_endpoints_checked() {
        let catalog = registrar_catalog();
        assert!(catalog.register_relation(enrollments()).is_ok());
        assert!(catalog
            .register_relation(RelationDef::pairwise("bad", "Student", "Dormitory"))
            .is_err());
    }

    #[test]
    fn test_capacity_bound_field_checked() {
        let catalog = registrar_catalog();
        let bad = RelationDef::pairwise("bad", "Student", "Course").with_capacity(
            CapacityRule::new(Side::Right, "nonexistent", CapacityPolicy::Reject),
        );
        assert!(catalog.register_relation(bad).is_err());
    }

    #[test]
    fn test_aggregate_type_compatibility() {
        let catalog = registrar_catalog();
        catalog.register_relation(enrollments()).unwrap();

        let gpa = AggregateDef::new(
            "student_gpa",
            "enrollments",
            Side::Left,
            "gpa",
            AggregateSource::Payload("grade".into()),
            Reducer::Mean { scale: 2 },
        );
        assert!(catalog.register_aggregate(gpa).is_ok());

        // Mean into an integer field is a shape mismatch.
        let bad = AggregateDef::new(
            "bad",
            "enrollments",
            Side::Right,
            "max_capacity",
            AggregateSource::Payload("grade".into()),
            Reducer::Mean { scale: 2 },
        );
        assert!(catalog.register_aggregate(bad).is_err());
    }

    #[test]
    fn test_referencing_foreign_keys() {
        let catalog = registrar_catalog();
        let refs = catalog.referencing_foreign_keys("Professor");
        assert_eq!(refs.len(), 1);
        assert_eq!(refs[0].0.name, "Course");
        assert_eq!(refs[0].1.field, "professor_id");
    }
}
