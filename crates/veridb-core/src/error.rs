//! Core error types.
//!
//! Every operation recovers locally: a failed create, update, delete, or
//! join mutation leaves the stores exactly as they were.

use crate::store::KeyValue;
use crate::validate::ValidationReport;
use thiserror::Error;

/// Core engine errors.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum Error {
    /// One or more declared rules rejected the candidate record.
    ///
    /// The report carries every violating field together, plus any
    /// cross-field violations (which are only evaluated once the fields
    /// they read have individually passed).
    #[error("validation failed for {entity}: {report}")]
    Validation {
        /// Entity or relation whose schema rejected the record.
        entity: String,
        /// Collected violations.
        report: ValidationReport,
    },

    /// Create with an already-used primary key.
    #[error("{entity} key {key} already exists")]
    DuplicateKey {
        /// Entity type.
        entity: String,
        /// Offending key.
        key: KeyValue,
    },

    /// Read, update, delete, or join endpoint referencing an absent key.
    #[error("{entity} key {key} not found")]
    NotFound {
        /// Entity type.
        entity: String,
        /// Missing key.
        key: KeyValue,
    },

    /// A foreign key or join endpoint does not resolve.
    #[error("{entity}.{field} references missing {referenced} key {key}")]
    ReferenceNotFound {
        /// Entity or relation holding the reference.
        entity: String,
        /// Referencing field or endpoint.
        field: String,
        /// Referenced entity type.
        referenced: String,
        /// Unresolved key.
        key: KeyValue,
    },

    /// Join already exists (or is already waitlisted) for a set-like
    /// relationship.
    #[error("relationship {relation} between {left} and {right} already exists")]
    DuplicateRelationship {
        /// Relation name.
        relation: String,
        /// Left endpoint key.
        left: KeyValue,
        /// Right endpoint key.
        right: KeyValue,
    },

    /// Capacity-bounded relationship is full and its policy rejects.
    #[error("{relation} is at capacity {capacity} for {key}")]
    CapacityExceeded {
        /// Relation name.
        relation: String,
        /// Bounded entity key.
        key: KeyValue,
        /// Declared capacity.
        capacity: i64,
    },

    /// A status field attempted a backward or skipping move.
    #[error("invalid state transition for {field}: {from} -> {to}")]
    InvalidStateTransition {
        /// Status field name.
        field: String,
        /// Committed state.
        from: String,
        /// Requested state.
        to: String,
    },

    /// No join record under the given identity.
    #[error("join not found in {relation}")]
    JoinNotFound {
        /// Relation name.
        relation: String,
    },

    /// Delete blocked by a restricting foreign key.
    #[error("cannot delete {entity} key {key}: {count} dependent {dependent} record(s)")]
    RestrictedDelete {
        /// Entity being deleted.
        entity: String,
        /// Its key.
        key: KeyValue,
        /// Entity type holding the restricting reference.
        dependent: String,
        /// Number of dependents.
        count: usize,
    },

    /// Entity type is not registered.
    #[error("unknown entity type {0}")]
    UnknownEntity(String),

    /// Relation is not registered.
    #[error("unknown relation {0}")]
    UnknownRelation(String),

    /// Field is not declared on the entity.
    #[error("unknown field {field} on {entity}")]
    UnknownField {
        /// Entity type.
        entity: String,
        /// Missing field.
        field: String,
    },

    /// Registration under an already-used name.
    #[error("{0} is already registered")]
    SchemaConflict(String),

    /// A definition is internally inconsistent.
    #[error("invalid definition for {name}: {reason}")]
    InvalidDefinition {
        /// Definition name.
        name: String,
        /// What is wrong with it.
        reason: String,
    },

    /// A value had the wrong type for its use.
    #[error("type mismatch for {context}: expected {expected}, got {actual}")]
    TypeMismatch {
        /// Where the value was used.
        context: String,
        /// Expected type.
        expected: String,
        /// Actual type.
        actual: String,
    },

    /// Cascade recursion exceeded the depth cap.
    #[error("cascade depth limit exceeded at {depth}")]
    CascadeDepthExceeded {
        /// Depth reached.
        depth: usize,
    },

    /// Numeric overflow while reducing an aggregate.
    #[error("numeric overflow while computing {0}")]
    Overflow(String),
}
