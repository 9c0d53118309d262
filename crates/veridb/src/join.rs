//! Relationship manager: join admission, removal, and payload updates.

use tracing::{debug, info};

use veridb_core::catalog::{CapacityPolicy, CapacityRule, Catalog, JoinKind, RelationDef, Side};
use veridb_core::error::Error;
use veridb_core::store::{JoinId, KeyValue, Record, WaitlistEntry};
use veridb_core::validate::validate_fields;
use veridb_core::value::Value;

use crate::aggregate::AggregateEngine;
use crate::database::DataSet;
use crate::mutation::check_state_transitions;

/// Successful outcome of a join request.
///
/// Waitlisting is a success, not an error: the request is queued and will
/// be admitted on promotion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JoinOutcome {
    /// The join was committed under this identity.
    Admitted(JoinId),
    /// Capacity was full; the request joined the FIFO waitlist.
    Waitlisted,
}

/// Executes join mutations against a data set.
pub(crate) struct RelationshipManager<'a> {
    catalog: &'a Catalog,
    data: &'a mut DataSet,
}

impl<'a> RelationshipManager<'a> {
    /// Create a new relationship manager.
    pub(crate) fn new(catalog: &'a Catalog, data: &'a mut DataSet) -> Self {
        Self { catalog, data }
    }

    /// Admit, waitlist, or reject a join request.
    pub(crate) fn add_join(
        &mut self,
        relation: &RelationDef,
        left: &KeyValue,
        right: &KeyValue,
        payload: Record,
    ) -> Result<JoinOutcome, Error> {
        self.require_endpoint(relation, Side::Left, left)?;
        self.require_endpoint(relation, Side::Right, right)?;
        validate_fields(&relation.payload_fields, &payload).map_err(|report| {
            Error::Validation {
                entity: relation.name.clone(),
                report,
            }
        })?;

        if relation.kind == JoinKind::Pairwise
            && self.data.join_store(&relation.name)?.contains_pair(left, right)
        {
            return Err(Error::DuplicateRelationship {
                relation: relation.name.clone(),
                left: left.clone(),
                right: right.clone(),
            });
        }

        if let Some(capacity) = &relation.capacity {
            let bounded = match capacity.side {
                Side::Left => left,
                Side::Right => right,
            };
            if self
                .data
                .join_store(&relation.name)?
                .waitlist_contains(bounded, left, right)
            {
                return Err(Error::DuplicateRelationship {
                    relation: relation.name.clone(),
                    left: left.clone(),
                    right: right.clone(),
                });
            }
            let bound = capacity_bound(self.data, relation, capacity, bounded)?;
            let active = self.data.join_store(&relation.name)?.count_for(capacity.side, bounded);
            if active as i64 >= bound {
                match capacity.policy {
                    CapacityPolicy::Reject => {
                        return Err(Error::CapacityExceeded {
                            relation: relation.name.clone(),
                            key: bounded.clone(),
                            capacity: bound,
                        })
                    }
                    CapacityPolicy::Waitlist { .. } => {
                        let entry = WaitlistEntry {
                            left: left.clone(),
                            right: right.clone(),
                            payload,
                        };
                        self.data
                            .join_store_mut(&relation.name)?
                            .waitlist_push(bounded.clone(), entry);
                        info!(relation = %relation.name, key = %bounded, "request waitlisted");
                        return Ok(JoinOutcome::Waitlisted);
                    }
                }
            }
        }

        let id = commit_join(self.data, relation, left.clone(), right.clone(), payload)?;
        AggregateEngine::new(self.catalog, self.data).recompute_endpoints(relation, left, right)?;
        debug!(relation = %relation.name, "join admitted");
        Ok(JoinOutcome::Admitted(id))
    }

    /// Remove a join record, promoting the waitlist head if configured.
    pub(crate) fn remove_join(&mut self, relation: &RelationDef, id: &JoinId) -> Result<(), Error> {
        let removed = self.data.join_store_mut(&relation.name)?.remove(id)?;

        if let Some(capacity) = &relation.capacity {
            if matches!(capacity.policy, CapacityPolicy::Waitlist { auto_promote: true }) {
                let bounded = match capacity.side {
                    Side::Left => &removed.left,
                    Side::Right => &removed.right,
                };
                promote_waitlist_head(self.catalog, self.data, relation, bounded)?;
            }
        }

        AggregateEngine::new(self.catalog, self.data).recompute_endpoints(
            relation,
            &removed.left,
            &removed.right,
        )?;
        debug!(relation = %relation.name, "join removed");
        Ok(())
    }

    /// Replace a join record's payload after revalidating it.
    pub(crate) fn update_payload(
        &mut self,
        relation: &RelationDef,
        id: &JoinId,
        payload: Record,
    ) -> Result<(), Error> {
        validate_fields(&relation.payload_fields, &payload).map_err(|report| {
            Error::Validation {
                entity: relation.name.clone(),
                report,
            }
        })?;
        let previous = self
            .data
            .join_store(&relation.name)?
            .get(id)
            .cloned()
            .ok_or_else(|| Error::JoinNotFound {
                relation: relation.name.clone(),
            })?;
        check_state_transitions(&relation.payload_fields, &previous.payload, &payload)?;
        self.data
            .join_store_mut(&relation.name)?
            .set_payload(id, payload)?;
        AggregateEngine::new(self.catalog, self.data).recompute_endpoints(
            relation,
            &previous.left,
            &previous.right,
        )?;
        Ok(())
    }

    /// A join endpoint must resolve to a live entity.
    fn require_endpoint(
        &self,
        relation: &RelationDef,
        side: Side,
        key: &KeyValue,
    ) -> Result<(), Error> {
        let entity = relation.entity_on(side);
        if !self.data.store(entity)?.contains(key) {
            return Err(Error::ReferenceNotFound {
                entity: relation.name.clone(),
                field: match side {
                    Side::Left => "left",
                    Side::Right => "right",
                }
                .to_string(),
                referenced: entity.to_string(),
                key: key.clone(),
            });
        }
        Ok(())
    }
}

/// Commit a join under the relation's identity shape.
fn commit_join(
    data: &mut DataSet,
    relation: &RelationDef,
    left: KeyValue,
    right: KeyValue,
    payload: Record,
) -> Result<JoinId, Error> {
    let store = data.join_store_mut(&relation.name)?;
    match relation.kind {
        JoinKind::Pairwise => store.insert_pair(left, right, payload),
        JoinKind::Sequenced => Ok(store.insert_seq(left, right, payload)),
    }
}

/// Read the capacity bound from the bounded entity's own record.
fn capacity_bound(
    data: &DataSet,
    relation: &RelationDef,
    capacity: &CapacityRule,
    bounded: &KeyValue,
) -> Result<i64, Error> {
    let entity = relation.entity_on(capacity.side);
    let record = data
        .store(entity)?
        .get(bounded)
        .ok_or_else(|| Error::NotFound {
            entity: entity.to_string(),
            key: bounded.clone(),
        })?;
    match record.get(&capacity.bound_field) {
        Some(Value::Int(bound)) => Ok(*bound),
        other => Err(Error::TypeMismatch {
            context: format!("{}.{}", entity, capacity.bound_field),
            expected: "int".to_string(),
            actual: other.map(Value::type_name).unwrap_or("missing").to_string(),
        }),
    }
}

/// Admit the waitlist head if capacity has freed up.
///
/// The promoted request replays through the normal commit path and
/// recomputes the affected aggregates. Returns the new join identity, if
/// a promotion happened.
pub(crate) fn promote_waitlist_head(
    catalog: &Catalog,
    data: &mut DataSet,
    relation: &RelationDef,
    bounded: &KeyValue,
) -> Result<Option<JoinId>, Error> {
    let Some(capacity) = &relation.capacity else {
        return Ok(None);
    };
    let bound = capacity_bound(data, relation, capacity, bounded)?;
    let active = data.join_store(&relation.name)?.count_for(capacity.side, bounded);
    if active as i64 >= bound {
        return Ok(None);
    }
    let Some(entry) = data.join_store_mut(&relation.name)?.waitlist_pop(bounded) else {
        return Ok(None);
    };
    let id = commit_join(
        data,
        relation,
        entry.left.clone(),
        entry.right.clone(),
        entry.payload,
    )?;
    info!(relation = %relation.name, key = %bounded, "promoted waitlist head");
    AggregateEngine::new(catalog, data).recompute_endpoints(relation, &entry.left, &entry.right)?;
    Ok(Some(id))
}
