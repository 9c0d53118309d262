//! VeriDB - an embeddable in-memory relational engine.
//!
//! VeriDB keeps typed records in per-entity stores and guards every write
//! with a declarative pipeline: ordered field rules, cross-field rules,
//! and foreign-key checks. Relations between entities live in an explicit
//! join arena with optional per-entity capacity bounds (reject or FIFO
//! waitlist), and declared aggregates (grade averages, order totals) are
//! recomputed synchronously inside the mutation that changes their
//! inputs.
//!
//! ```
//! use veridb::{Database, EntityDef, FieldDef, FieldType, Record, ValueRule};
//!
//! let db = Database::new();
//! db.register_entity(
//!     EntityDef::new("Student", "id")
//!         .with_field(FieldDef::new("id", FieldType::Text))
//!         .with_field(
//!             FieldDef::new("name", FieldType::Text)
//!                 .with_rule(ValueRule::TextLength { min: 2, max: 50 }),
//!         ),
//! )
//! .unwrap();
//!
//! let alice = Record::new().with("id", "S001").with("name", "Alice");
//! db.create("Student", alice).unwrap();
//! assert_eq!(db.count("Student").unwrap(), 1);
//! ```

mod aggregate;
mod cascade;
mod database;
mod join;
mod mutation;

pub use aggregate::RelationStats;
pub use database::Database;
pub use join::JoinOutcome;

pub use veridb_core::catalog::{
    AggregateDef, AggregateSource, CapacityPolicy, CapacityRule, Catalog, CrossRule,
    DeleteBehavior, EntityDef, FieldDef, FieldType, ForeignKeyDef, JoinKind, Reducer, RelationDef,
    Shape, Side, ValueRule,
};
pub use veridb_core::error::Error;
pub use veridb_core::store::{JoinId, JoinRecord, KeyValue, Record, WaitlistEntry};
pub use veridb_core::validate::{CrossViolation, FieldViolation, ValidationReport};
pub use veridb_core::value::{Decimal, Value};

/// Re-export of the core crate.
pub use veridb_core as core;
