//! Declarative catalog for VeriDB.
//!
//! The catalog holds immutable definitions: entity schemas (fields, rules,
//! foreign keys), relations between entities, and the aggregates derived
//! from them.

mod aggregate;
mod catalog;
mod cross;
mod entity;
mod field;
mod relation;
mod rule;
mod types;

pub use aggregate::{AggregateDef, AggregateSource, Reducer};
pub use catalog::Catalog;
pub use cross::CrossRule;
pub use entity::{DeleteBehavior, EntityDef, ForeignKeyDef};
pub use field::FieldDef;
pub use relation::{CapacityPolicy, CapacityRule, JoinKind, RelationDef, Side};
pub use rule::{Shape, ValueRule};
pub use types::FieldType;
