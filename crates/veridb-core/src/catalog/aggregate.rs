//! Aggregate definitions.
//!
//! An aggregate is a pure function of one entity's dependent join records,
//! stored into a declared field of that entity and recomputed synchronously
//! by every mutation that touches a dependent join.

use super::relation::Side;
use crate::value::Decimal;
use serde::{Deserialize, Serialize};

/// Where each join record's contribution comes from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum AggregateSource {
    /// A single payload field; null contributions are skipped.
    Payload(String),
    /// The product of two payload fields (e.g. quantity × unit price);
    /// a null in either skips the contribution.
    PayloadProduct(String, String),
}

/// How contributions reduce to one value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Reducer {
    /// Arithmetic mean, rounded half away from zero to `scale` digits.
    Mean {
        /// Scale of the resulting decimal.
        scale: u8,
    },
    /// Plain sum.
    Sum,
    /// Sum plus a fixed fee (e.g. an order's delivery charge).
    SumPlusFee {
        /// Fee added once the sum is taken; its scale is the result scale.
        fee: Decimal,
    },
}

/// A declared aggregate over one relation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregateDef {
    /// Aggregate name (unique within the catalog).
    pub name: String,
    /// Relation whose join records feed the aggregate.
    pub relation: String,
    /// Which endpoint entity receives the result.
    pub target: Side,
    /// Field on the target entity holding the result.
    pub target_field: String,
    /// Contribution source.
    pub source: AggregateSource,
    /// Reduction.
    pub reducer: Reducer,
}

impl AggregateDef {
    /// Create an aggregate definition.
    pub fn new(
        name: impl Into<String>,
        relation: impl Into<String>,
        target: Side,
        target_field: impl Into<String>,
        source: AggregateSource,
        reducer: Reducer,
    ) -> Self {
        Self {
            name: name.into(),
            relation: relation.into(),
            target,
            target_field: target_field.into(),
            source,
            reducer,
        }
    }
}
