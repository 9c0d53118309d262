//! The join arena: relationship records and waitlists.

use std::collections::{HashMap, VecDeque};

use serde::{Deserialize, Serialize};

use crate::catalog::Side;
use crate::error::Error;
use crate::store::record::{KeyValue, Record};

/// Composite identity of a join record.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum JoinId {
    /// Set-like identity: one join per (left, right) pair.
    Pair {
        /// Left endpoint key.
        left: KeyValue,
        /// Right endpoint key.
        right: KeyValue,
    },
    /// Ordered-collection identity: (left, sequence index).
    Seq {
        /// Left endpoint key.
        left: KeyValue,
        /// Store-assigned sequence index.
        seq: u64,
    },
}

/// A committed join record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JoinRecord {
    /// Composite identity.
    pub id: JoinId,
    /// Left endpoint key.
    pub left: KeyValue,
    /// Right endpoint key.
    pub right: KeyValue,
    /// Validated payload.
    pub payload: Record,
}

/// A queued relationship request that exceeded a capacity bound.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WaitlistEntry {
    /// Left endpoint key.
    pub left: KeyValue,
    /// Right endpoint key.
    pub right: KeyValue,
    /// Payload to commit on promotion.
    pub payload: Record,
}

/// Join records for one relation, plus its FIFO waitlists.
///
/// Sequence indices for ordered collections are owned here, one counter
/// per left key, never a process-wide variable.
#[derive(Debug, Clone, Default)]
pub struct JoinStore {
    relation: String,
    joins: HashMap<JoinId, JoinRecord>,
    order: Vec<JoinId>,
    next_seq: HashMap<KeyValue, u64>,
    waitlists: HashMap<KeyValue, VecDeque<WaitlistEntry>>,
}

impl JoinStore {
    /// Create an empty join store for a relation.
    pub fn new(relation: impl Into<String>) -> Self {
        Self {
            relation: relation.into(),
            joins: HashMap::new(),
            order: Vec::new(),
            next_seq: HashMap::new(),
            waitlists: HashMap::new(),
        }
    }

    /// Relation name.
    pub fn relation(&self) -> &str {
        &self.relation
    }

    /// Number of active join records.
    pub fn len(&self) -> usize {
        self.joins.len()
    }

    /// Check if there are no active joins.
    pub fn is_empty(&self) -> bool {
        self.joins.is_empty()
    }

    /// Check if a (left, right) pair is already joined.
    pub fn contains_pair(&self, left: &KeyValue, right: &KeyValue) -> bool {
        self.joins.contains_key(&JoinId::Pair {
            left: left.clone(),
            right: right.clone(),
        })
    }

    /// Insert a set-like join.
    pub fn insert_pair(
        &mut self,
        left: KeyValue,
        right: KeyValue,
        payload: Record,
    ) -> Result<JoinId, Error> {
        let id = JoinId::Pair {
            left: left.clone(),
            right: right.clone(),
        };
        if self.joins.contains_key(&id) {
            return Err(Error::DuplicateRelationship {
                relation: self.relation.clone(),
                left,
                right,
            });
        }
        self.order.push(id.clone());
        self.joins.insert(
            id.clone(),
            JoinRecord {
                id: id.clone(),
                left,
                right,
                payload,
            },
        );
        Ok(id)
    }

    /// Insert an ordered-collection join under the next sequence index.
    pub fn insert_seq(&mut self, left: KeyValue, right: KeyValue, payload: Record) -> JoinId {
        let counter = self.next_seq.entry(left.clone()).or_insert(0);
        let seq = *counter;
        *counter += 1;
        let id = JoinId::Seq {
            left: left.clone(),
            seq,
        };
        self.order.push(id.clone());
        self.joins.insert(
            id.clone(),
            JoinRecord {
                id: id.clone(),
                left,
                right,
                payload,
            },
        );
        id
    }

    /// Get a join record by identity.
    pub fn get(&self, id: &JoinId) -> Option<&JoinRecord> {
        self.joins.get(id)
    }

    /// Remove a join record, returning it.
    pub fn remove(&mut self, id: &JoinId) -> Result<JoinRecord, Error> {
        match self.joins.remove(id) {
            Some(record) => {
                self.order.retain(|j| j != id);
                Ok(record)
            }
            None => Err(Error::JoinNotFound {
                relation: self.relation.clone(),
            }),
        }
    }

    /// Replace a join record's payload, returning the previous payload.
    pub fn set_payload(&mut self, id: &JoinId, payload: Record) -> Result<Record, Error> {
        match self.joins.get_mut(id) {
            Some(record) => Ok(std::mem::replace(&mut record.payload, payload)),
            None => Err(Error::JoinNotFound {
                relation: self.relation.clone(),
            }),
        }
    }

    /// All join records in insertion order.
    pub fn joins(&self) -> impl Iterator<Item = &JoinRecord> {
        self.order.iter().filter_map(|id| self.joins.get(id))
    }

    /// Join records with the given key at the given endpoint.
    pub fn joins_for(&self, side: Side, key: &KeyValue) -> Vec<&JoinRecord> {
        self.joins()
            .filter(|j| match side {
                Side::Left => j.left == *key,
                Side::Right => j.right == *key,
            })
            .collect()
    }

    /// Count of active joins with the given key at the given endpoint.
    ///
    /// Waitlisted requests never count.
    pub fn count_for(&self, side: Side, key: &KeyValue) -> usize {
        self.joins_for(side, key).len()
    }

    /// Remove every join referencing the key at either endpoint.
    pub fn remove_referencing(&mut self, key: &KeyValue) -> Vec<JoinRecord> {
        let doomed: Vec<JoinId> = self
            .joins
            .values()
            .filter(|j| j.left == *key || j.right == *key)
            .map(|j| j.id.clone())
            .collect();
        let mut removed = Vec::with_capacity(doomed.len());
        for id in doomed {
            if let Some(record) = self.joins.remove(&id) {
                removed.push(record);
            }
            self.order.retain(|j| *j != id);
        }
        removed
    }

    /// Queue a request on the bounded key's waitlist.
    pub fn waitlist_push(&mut self, bounded: KeyValue, entry: WaitlistEntry) {
        self.waitlists.entry(bounded).or_default().push_back(entry);
    }

    /// Pop the waitlist head for the bounded key.
    pub fn waitlist_pop(&mut self, bounded: &KeyValue) -> Option<WaitlistEntry> {
        let queue = self.waitlists.get_mut(bounded)?;
        let entry = queue.pop_front();
        if queue.is_empty() {
            self.waitlists.remove(bounded);
        }
        entry
    }

    /// Waitlist contents for the bounded key, in FIFO order.
    pub fn waitlist(&self, bounded: &KeyValue) -> Vec<&WaitlistEntry> {
        self.waitlists
            .get(bounded)
            .map(|q| q.iter().collect())
            .unwrap_or_default()
    }

    /// Check if a pair is already queued on the bounded key's waitlist.
    pub fn waitlist_contains(
        &self,
        bounded: &KeyValue,
        left: &KeyValue,
        right: &KeyValue,
    ) -> bool {
        self.waitlists
            .get(bounded)
            .map(|q| q.iter().any(|e| e.left == *left && e.right == *right))
            .unwrap_or(false)
    }

    /// Drop waitlist state referencing a deleted entity key: the key's own
    /// queue and any queued entry pointing at it.
    pub fn purge_waitlists(&mut self, key: &KeyValue) {
        self.waitlists.remove(key);
        for queue in self.waitlists.values_mut() {
            queue.retain(|e| e.left != *key && e.right != *key);
        }
        self.waitlists.retain(|_, q| !q.is_empty());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(s: &str) -> KeyValue {
        KeyValue::Text(s.to_string())
    }

    #[test]
    fn test_pairwise_duplicates_rejected() {
        let mut store = JoinStore::new("enrollments");
        store
            .insert_pair(key("S1"), key("C1"), Record::new())
            .unwrap();
        let err = store
            .insert_pair(key("S1"), key("C1"), Record::new())
            .unwrap_err();
        assert!(matches!(err, Error::DuplicateRelationship { .. }));

        // Same student, different course is fine.
        assert!(store
            .insert_pair(key("S1"), key("C2"), Record::new())
            .is_ok());
    }

    #[test]
    fn test_sequence_indices_are_per_parent() {
        let mut store = JoinStore::new("order_lines");
        let a0 = store.insert_seq(KeyValue::Int(1), key("pizza"), Record::new());
        let a1 = store.insert_seq(KeyValue::Int(1), key("wings"), Record::new());
        let b0 = store.insert_seq(KeyValue::Int(2), key("salad"), Record::new());

        assert_eq!(a0, JoinId::Seq { left: KeyValue::Int(1), seq: 0 });
        assert_eq!(a1, JoinId::Seq { left: KeyValue::Int(1), seq: 1 });
        assert_eq!(b0, JoinId::Seq { left: KeyValue::Int(2), seq: 0 });
    }

    #[test]
    fn test_counts_and_lookup_by_side() {
        let mut store = JoinStore::new("enrollments");
        store
            .insert_pair(key("S1"), key("C1"), Record::new())
            .unwrap();
        store
            .insert_pair(key("S2"), key("C1"), Record::new())
            .unwrap();
        store
            .insert_pair(key("S1"), key("C2"), Record::new())
            .unwrap();

        assert_eq!(store.count_for(Side::Right, &key("C1")), 2);
        assert_eq!(store.count_for(Side::Left, &key("S1")), 2);
        assert_eq!(store.joins_for(Side::Right, &key("C2")).len(), 1);
    }

    #[test]
    fn test_remove_referencing_either_side() {
        let mut store = JoinStore::new("enrollments");
        store
            .insert_pair(key("S1"), key("C1"), Record::new())
            .unwrap();
        store
            .insert_pair(key("S1"), key("C2"), Record::new())
            .unwrap();
        store
            .insert_pair(key("S2"), key("C1"), Record::new())
            .unwrap();

        let removed = store.remove_referencing(&key("C1"));
        assert_eq!(removed.len(), 2);
        assert_eq!(store.len(), 1);
        assert!(store.contains_pair(&key("S1"), &key("C2")));
    }

    #[test]
    fn test_waitlist_fifo() {
        let mut store = JoinStore::new("enrollments");
        store.waitlist_push(
            key("C1"),
            WaitlistEntry { left: key("S3"), right: key("C1"), payload: Record::new() },
        );
        store.waitlist_push(
            key("C1"),
            WaitlistEntry { left: key("S4"), right: key("C1"), payload: Record::new() },
        );

        assert_eq!(store.waitlist(&key("C1")).len(), 2);
        assert!(store.waitlist_contains(&key("C1"), &key("S3"), &key("C1")));

        let head = store.waitlist_pop(&key("C1")).unwrap();
        assert_eq!(head.left, key("S3"));
        let next = store.waitlist_pop(&key("C1")).unwrap();
        assert_eq!(next.left, key("S4"));
        assert!(store.waitlist_pop(&key("C1")).is_none());
    }

    #[test]
    fn test_purge_waitlists() {
        let mut store = JoinStore::new("enrollments");
        store.waitlist_push(
            key("C1"),
            WaitlistEntry { left: key("S3"), right: key("C1"), payload: Record::new() },
        );
        store.waitlist_push(
            key("C2"),
            WaitlistEntry { left: key("S3"), right: key("C2"), payload: Record::new() },
        );

        // Deleting S3 clears its queued requests everywhere.
        store.purge_waitlists(&key("S3"));
        assert!(store.waitlist(&key("C1")).is_empty());
        assert!(store.waitlist(&key("C2")).is_empty());
    }
}
