//! VeriDB Core - catalog, declarative validation, and in-memory stores.
//!
//! This crate provides the definition and storage layers: the `veridb`
//! crate drives them through its `Database` facade.

pub mod catalog;
pub mod error;
pub mod store;
pub mod validate;
pub mod value;

pub use catalog::{
    AggregateDef, AggregateSource, CapacityPolicy, CapacityRule, Catalog, CrossRule,
    DeleteBehavior, EntityDef, FieldDef, FieldType, ForeignKeyDef, JoinKind, Reducer, RelationDef,
    Shape, Side, ValueRule,
};
pub use error::Error;
pub use store::{EntityStore, JoinId, JoinRecord, JoinStore, KeyValue, Record, WaitlistEntry};
pub use validate::{
    field_violations, validate_fields, validate_record, CrossViolation, FieldViolation,
    ValidationReport,
};
pub use value::{Decimal, ParseDecimalError, Value, MAX_DECIMAL_SCALE};
