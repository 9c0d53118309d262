//! Cascade executor for referential integrity on deletes.
//!
//! Deletes are planned first and applied second: the plan walks the
//! foreign-key graph collecting every doomed record (or refuses outright
//! on a restricting reference), and only then does the apply phase touch
//! the stores. The apply phase is pure in-memory removal, so no reader can
//! ever observe a half-finished cascade and a failed plan changes nothing.

use std::collections::HashSet;
use std::sync::Arc;

use tracing::info;

use veridb_core::catalog::{CapacityPolicy, Catalog, DeleteBehavior, EntityDef, RelationDef, Side};
use veridb_core::error::Error;
use veridb_core::store::KeyValue;

use crate::aggregate::AggregateEngine;
use crate::database::DataSet;
use crate::join::promote_waitlist_head;

/// Maximum cascade depth, guarding against cyclic reference chains.
const MAX_CASCADE_DEPTH: usize = 100;

/// Executes cascading deletes against a data set.
pub(crate) struct CascadeExecutor<'a> {
    catalog: &'a Catalog,
    data: &'a mut DataSet,
}

impl<'a> CascadeExecutor<'a> {
    /// Create a new cascade executor.
    pub(crate) fn new(catalog: &'a Catalog, data: &'a mut DataSet) -> Self {
        Self { catalog, data }
    }

    /// Delete an entity and everything that depends on it.
    pub(crate) fn delete(&mut self, def: &EntityDef, key: &KeyValue) -> Result<(), Error> {
        if !self.data.store(&def.name)?.contains(key) {
            return Err(Error::NotFound {
                entity: def.name.clone(),
                key: key.clone(),
            });
        }

        let mut plan: Vec<(String, KeyValue)> = Vec::new();
        let mut visited: HashSet<(String, KeyValue)> = HashSet::new();
        self.plan_delete(&def.name, key, &mut plan, &mut visited, 0)?;

        info!(
            entity = %def.name,
            key = %key,
            affected = plan.len(),
            "applying cascade delete"
        );
        self.apply(plan)
    }

    /// Walk the foreign-key graph collecting doomed records.
    fn plan_delete(
        &self,
        entity: &str,
        key: &KeyValue,
        plan: &mut Vec<(String, KeyValue)>,
        visited: &mut HashSet<(String, KeyValue)>,
        depth: usize,
    ) -> Result<(), Error> {
        if depth > MAX_CASCADE_DEPTH {
            return Err(Error::CascadeDepthExceeded { depth });
        }
        if !visited.insert((entity.to_string(), key.clone())) {
            return Ok(());
        }
        plan.push((entity.to_string(), key.clone()));

        for (dependent_def, fk) in self.catalog.referencing_foreign_keys(entity) {
            let dependents: Vec<KeyValue> = self
                .data
                .store(&dependent_def.name)?
                .records()
                .filter(|record| {
                    record
                        .get(&fk.field)
                        .and_then(KeyValue::from_value)
                        .map_or(false, |k| k == *key)
                })
                .filter_map(|record| {
                    record
                        .get(&dependent_def.key_field)
                        .and_then(KeyValue::from_value)
                })
                .filter(|k| !visited.contains(&(dependent_def.name.clone(), k.clone())))
                .collect();

            if dependents.is_empty() {
                continue;
            }

            match fk.on_delete {
                DeleteBehavior::Restrict => {
                    return Err(Error::RestrictedDelete {
                        entity: entity.to_string(),
                        key: key.clone(),
                        dependent: dependent_def.name.clone(),
                        count: dependents.len(),
                    });
                }
                DeleteBehavior::Cascade => {
                    for dependent_key in dependents {
                        self.plan_delete(
                            &dependent_def.name,
                            &dependent_key,
                            plan,
                            visited,
                            depth + 1,
                        )?;
                    }
                }
            }
        }

        Ok(())
    }

    /// Apply a planned delete: joins first, then entities, then waitlist
    /// promotions and aggregate recomputation for the survivors.
    fn apply(&mut self, plan: Vec<(String, KeyValue)>) -> Result<(), Error> {
        let doomed: HashSet<(String, KeyValue)> = plan.iter().cloned().collect();
        let mut touched: Vec<(Arc<RelationDef>, Side, KeyValue)> = Vec::new();
        let mut promotions: Vec<(Arc<RelationDef>, KeyValue)> = Vec::new();

        for (entity, key) in &plan {
            for relation in self.catalog.relations_with_endpoint(entity) {
                let removed = {
                    let joins = self.data.join_store_mut(&relation.name)?;
                    let removed = joins.remove_referencing(key);
                    joins.purge_waitlists(key);
                    removed
                };
                for join in removed {
                    for side in [Side::Left, Side::Right] {
                        let partner_key = match side {
                            Side::Left => &join.left,
                            Side::Right => &join.right,
                        };
                        let partner_entity = relation.entity_on(side);
                        if doomed.contains(&(partner_entity.to_string(), partner_key.clone())) {
                            continue;
                        }
                        touched.push((Arc::clone(&relation), side, partner_key.clone()));
                        if let Some(capacity) = &relation.capacity {
                            if capacity.side == side
                                && matches!(
                                    capacity.policy,
                                    CapacityPolicy::Waitlist { auto_promote: true }
                                )
                            {
                                promotions.push((Arc::clone(&relation), partner_key.clone()));
                            }
                        }
                    }
                }
            }
        }

        for (entity, key) in &plan {
            self.data.store_mut(entity)?.remove(key)?;
        }

        // A cascade can free several slots on one bounded key at once, so
        // promote until the capacity or the waitlist runs out.
        let mut promoted: HashSet<(String, KeyValue)> = HashSet::new();
        for (relation, bounded) in promotions {
            if promoted.insert((relation.name.clone(), bounded.clone())) {
                while promote_waitlist_head(self.catalog, self.data, &relation, &bounded)?.is_some()
                {
                }
            }
        }

        let mut seen: HashSet<(String, bool, KeyValue)> = HashSet::new();
        let mut engine = AggregateEngine::new(self.catalog, self.data);
        for (relation, side, key) in touched {
            if !seen.insert((relation.name.clone(), side == Side::Left, key.clone())) {
                continue;
            }
            for aggregate in self.catalog.aggregates_for(&relation.name) {
                if aggregate.target == side {
                    engine.recompute(&relation, &aggregate, &key)?;
                }
            }
        }

        Ok(())
    }
}
