//! The database facade: catalog plus lock-guarded data set.
//!
//! Writers take the exclusive guard for their whole
//! validate-check-commit-recompute span, so two concurrent writes can
//! never both slip past a uniqueness, capacity, or reference check.
//! Readers share the lock and always observe fully applied operations.

use std::collections::HashMap;

use parking_lot::RwLock;

use veridb_core::catalog::{AggregateDef, Catalog, EntityDef, RelationDef, Side};
use veridb_core::error::Error;
use veridb_core::store::{
    EntityStore, JoinId, JoinRecord, JoinStore, KeyValue, Record, WaitlistEntry,
};
use veridb_core::value::{Decimal, Value};

use crate::aggregate::{self, AggregateEngine, RelationStats};
use crate::cascade::CascadeExecutor;
use crate::join::{JoinOutcome, RelationshipManager};
use crate::mutation::MutationExecutor;

/// All mutable state: one entity store per registered entity type, one
/// join store per registered relation.
#[derive(Debug, Default)]
pub(crate) struct DataSet {
    stores: HashMap<String, EntityStore>,
    joins: HashMap<String, JoinStore>,
}

impl DataSet {
    pub(crate) fn store(&self, entity: &str) -> Result<&EntityStore, Error> {
        self.stores
            .get(entity)
            .ok_or_else(|| Error::UnknownEntity(entity.to_string()))
    }

    pub(crate) fn store_mut(&mut self, entity: &str) -> Result<&mut EntityStore, Error> {
        self.stores
            .get_mut(entity)
            .ok_or_else(|| Error::UnknownEntity(entity.to_string()))
    }

    pub(crate) fn join_store(&self, relation: &str) -> Result<&JoinStore, Error> {
        self.joins
            .get(relation)
            .ok_or_else(|| Error::UnknownRelation(relation.to_string()))
    }

    pub(crate) fn join_store_mut(&mut self, relation: &str) -> Result<&mut JoinStore, Error> {
        self.joins
            .get_mut(relation)
            .ok_or_else(|| Error::UnknownRelation(relation.to_string()))
    }
}

/// An in-memory relational database with declarative validation,
/// referential integrity, capacity-bounded relationships, and
/// synchronously recomputed aggregates.
#[derive(Debug, Default)]
pub struct Database {
    catalog: Catalog,
    data: RwLock<DataSet>,
}

impl Database {
    /// Create an empty database with an empty catalog.
    pub fn new() -> Self {
        Self::default()
    }

    /// The definition catalog.
    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    // ── Registration ───────────────────────────────────────────────────

    /// Register an entity type and open its store.
    pub fn register_entity(&self, def: EntityDef) -> Result<(), Error> {
        let name = def.name.clone();
        self.catalog.register_entity(def)?;
        self.data
            .write()
            .stores
            .insert(name.clone(), EntityStore::new(name));
        Ok(())
    }

    /// Register a relation and open its join store.
    pub fn register_relation(&self, def: RelationDef) -> Result<(), Error> {
        let name = def.name.clone();
        self.catalog.register_relation(def)?;
        self.data
            .write()
            .joins
            .insert(name.clone(), JoinStore::new(name));
        Ok(())
    }

    /// Register an aggregate.
    pub fn register_aggregate(&self, def: AggregateDef) -> Result<(), Error> {
        self.catalog.register_aggregate(def)
    }

    // ── Entity operations ──────────────────────────────────────────────

    /// Validate and commit a new record, returning the committed value.
    ///
    /// Declared aggregate fields are seeded with their zero defaults, so a
    /// student with no grades reads back with a 0.00 average.
    pub fn create(&self, entity: &str, record: Record) -> Result<Record, Error> {
        let def = self.catalog.entity(entity)?;
        let mut data = self.data.write();
        let key = MutationExecutor::new(&mut data).create(&def, record)?;
        self.refresh_aggregates(&mut data, entity, &key)?;
        committed(&data, entity, &key)
    }

    /// Read a record by key.
    pub fn read(&self, entity: &str, key: &KeyValue) -> Result<Record, Error> {
        let data = self.data.read();
        committed(&data, entity, key)
    }

    /// Validate and commit a full replacement record.
    ///
    /// Aggregate fields are recomputed afterwards: a replacement record
    /// cannot smuggle in a stale or fabricated derived value.
    pub fn update(&self, entity: &str, key: &KeyValue, record: Record) -> Result<Record, Error> {
        let def = self.catalog.entity(entity)?;
        let mut data = self.data.write();
        MutationExecutor::new(&mut data).update(&def, key, record)?;
        self.refresh_aggregates(&mut data, entity, key)?;
        committed(&data, entity, key)
    }

    /// Delete a record and cascade over everything depending on it.
    pub fn delete(&self, entity: &str, key: &KeyValue) -> Result<(), Error> {
        let def = self.catalog.entity(entity)?;
        let mut data = self.data.write();
        CascadeExecutor::new(&self.catalog, &mut data).delete(&def, key)
    }

    /// All records of an entity type, in insertion order.
    pub fn list(&self, entity: &str) -> Result<Vec<Record>, Error> {
        let data = self.data.read();
        Ok(data.store(entity)?.records().cloned().collect())
    }

    /// Records whose field equals the given value, in insertion order.
    pub fn list_by(&self, entity: &str, field: &str, value: &Value) -> Result<Vec<Record>, Error> {
        let def = self.catalog.entity(entity)?;
        if def.get_field(field).is_none() {
            return Err(Error::UnknownField {
                entity: entity.to_string(),
                field: field.to_string(),
            });
        }
        let data = self.data.read();
        Ok(data
            .store(entity)?
            .records()
            .filter(|record| record.get(field) == Some(value))
            .cloned()
            .collect())
    }

    /// All records ordered by a field instead of by insertion.
    ///
    /// Records whose field is null or incomparable sort last.
    pub fn list_sorted_by(
        &self,
        entity: &str,
        field: &str,
        descending: bool,
    ) -> Result<Vec<Record>, Error> {
        let def = self.catalog.entity(entity)?;
        if def.get_field(field).is_none() {
            return Err(Error::UnknownField {
                entity: entity.to_string(),
                field: field.to_string(),
            });
        }
        let data = self.data.read();
        let mut records: Vec<Record> = data.store(entity)?.records().cloned().collect();
        records.sort_by(|a, b| {
            let left = a.get(field).filter(|v| !v.is_null());
            let right = b.get(field).filter(|v| !v.is_null());
            match (left, right) {
                (Some(left), Some(right)) => {
                    let ordering = left.compare(right).unwrap_or(std::cmp::Ordering::Equal);
                    if descending {
                        ordering.reverse()
                    } else {
                        ordering
                    }
                }
                (Some(_), None) => std::cmp::Ordering::Less,
                (None, Some(_)) => std::cmp::Ordering::Greater,
                (None, None) => std::cmp::Ordering::Equal,
            }
        });
        Ok(records)
    }

    /// Number of records of an entity type.
    pub fn count(&self, entity: &str) -> Result<usize, Error> {
        let data = self.data.read();
        Ok(data.store(entity)?.len())
    }

    // ── Relationship operations ────────────────────────────────────────

    /// Admit, waitlist, or reject a join between two entities.
    pub fn add_join(
        &self,
        relation: &str,
        left: &KeyValue,
        right: &KeyValue,
        payload: Record,
    ) -> Result<JoinOutcome, Error> {
        let def = self.catalog.relation(relation)?;
        let mut data = self.data.write();
        RelationshipManager::new(&self.catalog, &mut data).add_join(&def, left, right, payload)
    }

    /// Remove a join record, auto-promoting the waitlist head where
    /// configured.
    pub fn remove_join(&self, relation: &str, id: &JoinId) -> Result<(), Error> {
        let def = self.catalog.relation(relation)?;
        let mut data = self.data.write();
        RelationshipManager::new(&self.catalog, &mut data).remove_join(&def, id)
    }

    /// Replace a join record's payload after revalidation.
    pub fn update_payload(
        &self,
        relation: &str,
        id: &JoinId,
        payload: Record,
    ) -> Result<(), Error> {
        let def = self.catalog.relation(relation)?;
        let mut data = self.data.write();
        RelationshipManager::new(&self.catalog, &mut data).update_payload(&def, id, payload)
    }

    /// All join records of a relation, in insertion order.
    pub fn joins(&self, relation: &str) -> Result<Vec<JoinRecord>, Error> {
        let data = self.data.read();
        Ok(data.join_store(relation)?.joins().cloned().collect())
    }

    /// Join records with the given key at the given endpoint.
    pub fn joins_for(
        &self,
        relation: &str,
        side: Side,
        key: &KeyValue,
    ) -> Result<Vec<JoinRecord>, Error> {
        let data = self.data.read();
        Ok(data
            .join_store(relation)?
            .joins_for(side, key)
            .into_iter()
            .cloned()
            .collect())
    }

    /// The FIFO waitlist queued against a bounded entity.
    pub fn waitlist_for(&self, relation: &str, key: &KeyValue) -> Result<Vec<WaitlistEntry>, Error> {
        let data = self.data.read();
        Ok(data
            .join_store(relation)?
            .waitlist(key)
            .into_iter()
            .cloned()
            .collect())
    }

    // ── Read-side statistics ───────────────────────────────────────────

    /// Count/mean/min/max of one payload field over an entity's joins.
    pub fn relation_stats(
        &self,
        relation: &str,
        side: Side,
        key: &KeyValue,
        field: &str,
    ) -> Result<RelationStats, Error> {
        let def = self.catalog.relation(relation)?;
        let data = self.data.read();
        aggregate::relation_stats(&data, &def, side, key, field)
    }

    /// Mean of a stored numeric field across an entity type, skipping
    /// zero values (the "no data yet" default).
    pub fn collection_mean(&self, entity: &str, field: &str, scale: u8) -> Result<Decimal, Error> {
        let def = self.catalog.entity(entity)?;
        let data = self.data.read();
        aggregate::collection_mean(&data, &def, field, scale)
    }

    /// Recompute the aggregates targeting one endpoint key from scratch.
    ///
    /// Mutations already keep aggregates current; this exists so callers
    /// can assert idempotence.
    pub fn recompute_aggregates(
        &self,
        relation: &str,
        side: Side,
        key: &KeyValue,
    ) -> Result<(), Error> {
        let def = self.catalog.relation(relation)?;
        let mut data = self.data.write();
        let mut engine = AggregateEngine::new(&self.catalog, &mut data);
        for aggregate in self.catalog.aggregates_for(relation) {
            if aggregate.target == side {
                engine.recompute(&def, &aggregate, key)?;
            }
        }
        Ok(())
    }

    /// Recompute every aggregate targeting one entity record.
    fn refresh_aggregates(
        &self,
        data: &mut DataSet,
        entity: &str,
        key: &KeyValue,
    ) -> Result<(), Error> {
        let mut engine = AggregateEngine::new(&self.catalog, data);
        for relation in self.catalog.relations_with_endpoint(entity) {
            for aggregate in self.catalog.aggregates_for(&relation.name) {
                if relation.entity_on(aggregate.target) == entity {
                    engine.recompute(&relation, &aggregate, key)?;
                }
            }
        }
        Ok(())
    }
}

/// Clone the committed record back out of the store.
fn committed(data: &DataSet, entity: &str, key: &KeyValue) -> Result<Record, Error> {
    data.store(entity)?
        .get(key)
        .cloned()
        .ok_or_else(|| Error::NotFound {
            entity: entity.to_string(),
            key: key.clone(),
        })
}
