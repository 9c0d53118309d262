//! In-memory stores: entity record sets and the join arena.

mod entity;
mod join;
mod record;

pub use entity::EntityStore;
pub use join::{JoinId, JoinRecord, JoinStore, WaitlistEntry};
pub use record::{KeyValue, Record};
