//! Relation definitions between entities.

use super::field::FieldDef;
use serde::{Deserialize, Serialize};

/// One endpoint of a relation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Side {
    /// The left endpoint.
    Left,
    /// The right endpoint.
    Right,
}

impl Side {
    /// The other endpoint.
    pub fn opposite(self) -> Side {
        match self {
            Side::Left => Side::Right,
            Side::Right => Side::Left,
        }
    }
}

/// Identity shape of a relation's join records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum JoinKind {
    /// Set-like: at most one join per (left, right) pair, e.g. an
    /// enrollment.
    Pairwise,
    /// Ordered collection under the left key: identity is
    /// (left, sequence index), e.g. an order's line items.
    Sequenced,
}

/// What to do when a capacity-bounded endpoint is full.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CapacityPolicy {
    /// Refuse the join outright.
    Reject,
    /// Queue the request on an unbounded FIFO waitlist.
    Waitlist {
        /// Promote the waitlist head automatically when a join is removed.
        auto_promote: bool,
    },
}

/// A capacity bound on one endpoint of a relation.
///
/// The bound itself is read from an integer field of the bounded entity,
/// so each course (say) carries its own maximum enrollment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CapacityRule {
    /// Which endpoint is bounded.
    pub side: Side,
    /// Integer field on the bounded entity holding the bound.
    pub bound_field: String,
    /// Overflow policy.
    pub policy: CapacityPolicy,
}

impl CapacityRule {
    /// Create a capacity rule.
    pub fn new(side: Side, bound_field: impl Into<String>, policy: CapacityPolicy) -> Self {
        Self {
            side,
            bound_field: bound_field.into(),
            policy,
        }
    }
}

/// A relation definition between two entity types.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RelationDef {
    /// Relation name (unique within the catalog).
    pub name: String,
    /// Left endpoint entity type.
    pub left_entity: String,
    /// Right endpoint entity type.
    pub right_entity: String,
    /// Join identity shape.
    pub kind: JoinKind,
    /// Payload schema carried by each join record.
    pub payload_fields: Vec<FieldDef>,
    /// Optional capacity bound.
    pub capacity: Option<CapacityRule>,
}

impl RelationDef {
    /// Create a set-like relation.
    pub fn pairwise(
        name: impl Into<String>,
        left_entity: impl Into<String>,
        right_entity: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            left_entity: left_entity.into(),
            right_entity: right_entity.into(),
            kind: JoinKind::Pairwise,
            payload_fields: Vec::new(),
            capacity: None,
        }
    }

    /// Create an ordered-collection relation.
    pub fn sequenced(
        name: impl Into<String>,
        left_entity: impl Into<String>,
        right_entity: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            left_entity: left_entity.into(),
            right_entity: right_entity.into(),
            kind: JoinKind::Sequenced,
            payload_fields: Vec::new(),
            capacity: None,
        }
    }

    /// Add a payload field.
    pub fn with_payload_field(mut self, field: FieldDef) -> Self {
        self.payload_fields.push(field);
        self
    }

    /// Attach a capacity bound.
    pub fn with_capacity(mut self, capacity: CapacityRule) -> Self {
        self.capacity = Some(capacity);
        self
    }

    /// The entity type at an endpoint.
    pub fn entity_on(&self, side: Side) -> &str {
        match side {
            Side::Left => &self.left_entity,
            Side::Right => &self.right_entity,
        }
    }

    /// Get a payload field by name.
    pub fn payload_field(&self, name: &str) -> Option<&FieldDef> {
        self.payload_fields.iter().find(|f| f.name == name)
    }
}
