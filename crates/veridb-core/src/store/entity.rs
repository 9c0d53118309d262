//! Insertion-ordered, keyed entity storage.

use std::collections::HashMap;

use crate::error::Error;
use crate::store::record::{KeyValue, Record};
use crate::value::Value;

/// The record set for one entity type.
///
/// Records are exclusively owned by the store; reads hand out clones.
/// Listing follows insertion order.
#[derive(Debug, Clone, Default)]
pub struct EntityStore {
    name: String,
    records: HashMap<KeyValue, Record>,
    order: Vec<KeyValue>,
}

impl EntityStore {
    /// Create an empty store for an entity type.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            records: HashMap::new(),
            order: Vec::new(),
        }
    }

    /// Entity type name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Number of records.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Check if the store is empty.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Check if a key is present.
    pub fn contains(&self, key: &KeyValue) -> bool {
        self.records.contains_key(key)
    }

    /// Get a record by key.
    pub fn get(&self, key: &KeyValue) -> Option<&Record> {
        self.records.get(key)
    }

    /// Insert a new record under a fresh key.
    pub fn insert(&mut self, key: KeyValue, record: Record) -> Result<(), Error> {
        if self.records.contains_key(&key) {
            return Err(Error::DuplicateKey {
                entity: self.name.clone(),
                key,
            });
        }
        self.order.push(key.clone());
        self.records.insert(key, record);
        Ok(())
    }

    /// Replace an existing record, returning the previous one.
    pub fn replace(&mut self, key: &KeyValue, record: Record) -> Result<Record, Error> {
        match self.records.get_mut(key) {
            Some(slot) => Ok(std::mem::replace(slot, record)),
            None => Err(Error::NotFound {
                entity: self.name.clone(),
                key: key.clone(),
            }),
        }
    }

    /// Remove a record, returning it.
    pub fn remove(&mut self, key: &KeyValue) -> Result<Record, Error> {
        match self.records.remove(key) {
            Some(record) => {
                self.order.retain(|k| k != key);
                Ok(record)
            }
            None => Err(Error::NotFound {
                entity: self.name.clone(),
                key: key.clone(),
            }),
        }
    }

    /// Overwrite a single field of a committed record.
    ///
    /// Only the aggregate engine writes through here; caller updates go
    /// through full-record replacement.
    pub fn set_field(&mut self, key: &KeyValue, field: &str, value: Value) -> Result<(), Error> {
        match self.records.get_mut(key) {
            Some(record) => {
                record.set(field, value);
                Ok(())
            }
            None => Err(Error::NotFound {
                entity: self.name.clone(),
                key: key.clone(),
            }),
        }
    }

    /// All records in insertion order.
    pub fn records(&self) -> impl Iterator<Item = &Record> {
        self.order.iter().filter_map(|k| self.records.get(k))
    }

    /// All keys in insertion order.
    pub fn keys(&self) -> &[KeyValue] {
        &self.order
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store_with(keys: &[i64]) -> EntityStore {
        let mut store = EntityStore::new("Student");
        for key in keys {
            store
                .insert(
                    KeyValue::Int(*key),
                    Record::new().with("id", *key).with("name", "x"),
                )
                .unwrap();
        }
        store
    }

    #[test]
    fn test_insert_and_get() {
        let store = store_with(&[1, 2]);
        assert_eq!(store.len(), 2);
        assert!(store.get(&KeyValue::Int(1)).is_some());
        assert!(store.get(&KeyValue::Int(9)).is_none());
    }

    #[test]
    fn test_duplicate_key_rejected() {
        let mut store = store_with(&[1]);
        let err = store
            .insert(KeyValue::Int(1), Record::new())
            .unwrap_err();
        assert!(matches!(err, Error::DuplicateKey { .. }));
    }

    #[test]
    fn test_insertion_order_preserved() {
        let mut store = store_with(&[3, 1, 2]);
        let keys: Vec<i64> = store
            .records()
            .filter_map(|r| r.get("id").and_then(|v| v.as_int()))
            .collect();
        assert_eq!(keys, vec![3, 1, 2]);

        store.remove(&KeyValue::Int(1)).unwrap();
        let keys: Vec<i64> = store
            .records()
            .filter_map(|r| r.get("id").and_then(|v| v.as_int()))
            .collect();
        assert_eq!(keys, vec![3, 2]);
    }

    #[test]
    fn test_remove_missing() {
        let mut store = store_with(&[1]);
        assert!(matches!(
            store.remove(&KeyValue::Int(9)),
            Err(Error::NotFound { .. })
        ));
    }

    #[test]
    fn test_set_field() {
        let mut store = store_with(&[1]);
        store
            .set_field(&KeyValue::Int(1), "name", Value::Text("renamed".into()))
            .unwrap();
        assert_eq!(
            store.get(&KeyValue::Int(1)).unwrap().get("name"),
            Some(&Value::Text("renamed".into()))
        );
    }
}
