//! Aggregate recomputation and read-side statistics.
//!
//! Recomputation is synchronous: every mutation that touches a dependent
//! join record recomputes the affected aggregates before the operation
//! returns. The reduction is a pure function of the current join set, so
//! recomputing twice without an intervening mutation yields the same
//! result, and an entity with no dependent joins holds its type's zero.

use veridb_core::catalog::{
    AggregateDef, AggregateSource, Catalog, EntityDef, FieldType, Reducer, RelationDef, Side,
};
use veridb_core::error::Error;
use veridb_core::store::{KeyValue, Record};
use veridb_core::value::{Decimal, Value};

use crate::database::DataSet;

/// One join record's contribution to a reduction.
#[derive(Debug, Clone, Copy)]
enum Contribution {
    Int(i64),
    Dec(Decimal),
}

/// Recomputes declared aggregates against a data set.
pub(crate) struct AggregateEngine<'a> {
    catalog: &'a Catalog,
    data: &'a mut DataSet,
}

impl<'a> AggregateEngine<'a> {
    /// Create a new aggregate engine.
    pub(crate) fn new(catalog: &'a Catalog, data: &'a mut DataSet) -> Self {
        Self { catalog, data }
    }

    /// Recompute every aggregate fed by the relation, for both endpoint
    /// keys of a changed join record.
    pub(crate) fn recompute_endpoints(
        &mut self,
        relation: &RelationDef,
        left: &KeyValue,
        right: &KeyValue,
    ) -> Result<(), Error> {
        for aggregate in self.catalog.aggregates_for(&relation.name) {
            let key = match aggregate.target {
                Side::Left => left,
                Side::Right => right,
            };
            self.recompute(relation, &aggregate, key)?;
        }
        Ok(())
    }

    /// Recompute one aggregate for one target entity.
    pub(crate) fn recompute(
        &mut self,
        relation: &RelationDef,
        aggregate: &AggregateDef,
        key: &KeyValue,
    ) -> Result<(), Error> {
        let target_entity = relation.entity_on(aggregate.target);
        if !self.data.store(target_entity)?.contains(key) {
            // The target vanished in the same cascade; nothing to store on.
            return Ok(());
        }

        let contributions = {
            let joins = self.data.join_store(&relation.name)?;
            let mut out = Vec::new();
            for join in joins.joins_for(aggregate.target, key) {
                if let Some(c) = contribution(&aggregate.source, &join.payload)? {
                    out.push(c);
                }
            }
            out
        };

        let target_def = self.catalog.entity(target_entity)?;
        let field_def = target_def
            .get_field(&aggregate.target_field)
            .ok_or_else(|| Error::UnknownField {
                entity: target_entity.to_string(),
                field: aggregate.target_field.clone(),
            })?;

        let value = if contributions.is_empty() {
            field_def.field_type.zero()
        } else {
            reduce(&aggregate.reducer, &contributions, &aggregate.name)?
        };

        self.data
            .store_mut(target_entity)?
            .set_field(key, &aggregate.target_field, value)
    }
}

/// Extract a join record's contribution; null payload values are skipped.
fn contribution(
    source: &AggregateSource,
    payload: &Record,
) -> Result<Option<Contribution>, Error> {
    match source {
        AggregateSource::Payload(field) => match payload.get(field) {
            None | Some(Value::Null) => Ok(None),
            Some(Value::Int(i)) => Ok(Some(Contribution::Int(*i))),
            Some(Value::Decimal(d)) => Ok(Some(Contribution::Dec(*d))),
            Some(other) => Err(Error::TypeMismatch {
                context: format!("aggregate source {}", field),
                expected: "numeric payload value".to_string(),
                actual: other.type_name().to_string(),
            }),
        },
        AggregateSource::PayloadProduct(a, b) => match (payload.get(a), payload.get(b)) {
            (None | Some(Value::Null), _) | (_, None | Some(Value::Null)) => Ok(None),
            (Some(Value::Int(x)), Some(Value::Int(y))) => x
                .checked_mul(*y)
                .map(|p| Some(Contribution::Int(p)))
                .ok_or_else(|| Error::Overflow(format!("{} × {}", a, b))),
            (Some(Value::Int(n)), Some(Value::Decimal(d)))
            | (Some(Value::Decimal(d)), Some(Value::Int(n))) => d
                .checked_mul_int(*n)
                .map(|p| Some(Contribution::Dec(p)))
                .ok_or_else(|| Error::Overflow(format!("{} × {}", a, b))),
            (Some(x), Some(y)) => Err(Error::TypeMismatch {
                context: format!("aggregate source {} × {}", a, b),
                expected: "int × decimal".to_string(),
                actual: format!("{} × {}", x.type_name(), y.type_name()),
            }),
        },
    }
}

/// Apply a reducer to a non-empty contribution list.
fn reduce(reducer: &Reducer, contributions: &[Contribution], name: &str) -> Result<Value, Error> {
    match reducer {
        Reducer::Mean { scale } => {
            let factor = 10i128.pow(u32::from(*scale));
            let mut sum: i128 = 0;
            for c in contributions {
                sum += match c {
                    Contribution::Int(i) => i128::from(*i) * factor,
                    Contribution::Dec(d) => i128::from(d.units()),
                };
            }
            let mean = round_half_away(sum, contributions.len() as i128);
            let units = i64::try_from(mean).map_err(|_| Error::Overflow(name.to_string()))?;
            Ok(Value::Decimal(Decimal::new(units, *scale)))
        }
        Reducer::Sum => match contributions.first() {
            None => Ok(Value::Int(0)),
            Some(Contribution::Int(_)) => {
                let mut sum: i128 = 0;
                for c in contributions {
                    if let Contribution::Int(i) = c {
                        sum += i128::from(*i);
                    }
                }
                let total = i64::try_from(sum).map_err(|_| Error::Overflow(name.to_string()))?;
                Ok(Value::Int(total))
            }
            Some(Contribution::Dec(first)) => {
                let scale = first.scale();
                let mut sum: i128 = 0;
                for c in contributions {
                    if let Contribution::Dec(d) = c {
                        sum += i128::from(d.units());
                    }
                }
                let units = i64::try_from(sum).map_err(|_| Error::Overflow(name.to_string()))?;
                Ok(Value::Decimal(Decimal::new(units, scale)))
            }
        },
        Reducer::SumPlusFee { fee } => {
            let factor = 10i128.pow(u32::from(fee.scale()));
            let mut units = i128::from(fee.units());
            for c in contributions {
                units += match c {
                    Contribution::Dec(d) => i128::from(d.units()),
                    Contribution::Int(i) => i128::from(*i) * factor,
                };
            }
            let units = i64::try_from(units).map_err(|_| Error::Overflow(name.to_string()))?;
            Ok(Value::Decimal(Decimal::new(units, fee.scale())))
        }
    }
}

/// Integer division rounded half away from zero.
fn round_half_away(sum: i128, count: i128) -> i128 {
    let quotient = sum / count;
    let remainder = sum % count;
    if remainder.abs() * 2 >= count {
        quotient + if sum < 0 { -1 } else { 1 }
    } else {
        quotient
    }
}

/// Read-side statistics over one entity's joins in a relation.
#[derive(Debug, Clone, PartialEq)]
pub struct RelationStats {
    /// Number of non-null contributions.
    pub count: usize,
    /// Mean of the contributions, if any.
    pub mean: Option<Decimal>,
    /// Smallest contribution, if any.
    pub min: Option<Value>,
    /// Largest contribution, if any.
    pub max: Option<Value>,
}

/// Compute count/mean/min/max of one payload field over an entity's joins.
///
/// The mean uses the payload field's decimal scale, or two digits for
/// integer fields.
pub(crate) fn relation_stats(
    data: &DataSet,
    relation: &RelationDef,
    side: Side,
    key: &KeyValue,
    field: &str,
) -> Result<RelationStats, Error> {
    let field_def = relation
        .payload_field(field)
        .ok_or_else(|| Error::UnknownField {
            entity: relation.name.clone(),
            field: field.to_string(),
        })?;
    let scale = match field_def.field_type {
        FieldType::Decimal { scale } => scale,
        FieldType::Int => 2,
        _ => {
            return Err(Error::TypeMismatch {
                context: format!("{}.{}", relation.name, field),
                expected: "numeric payload field".to_string(),
                actual: field_def.field_type.name().to_string(),
            })
        }
    };

    let joins = data.join_store(&relation.name)?;
    let mut values: Vec<Value> = Vec::new();
    for join in joins.joins_for(side, key) {
        match join.payload.get(field) {
            None | Some(Value::Null) => {}
            Some(value) => values.push(value.clone()),
        }
    }

    if values.is_empty() {
        return Ok(RelationStats {
            count: 0,
            mean: None,
            min: None,
            max: None,
        });
    }

    let factor = 10i128.pow(u32::from(scale));
    let mut sum: i128 = 0;
    for value in &values {
        sum += match value {
            Value::Int(i) => i128::from(*i) * factor,
            Value::Decimal(d) => units_at_scale(d, scale).ok_or_else(|| Error::TypeMismatch {
                context: format!("{}.{}", relation.name, field),
                expected: format!("decimal of scale at most {}", scale),
                actual: format!("decimal of scale {}", d.scale()),
            })?,
            other => {
                return Err(Error::TypeMismatch {
                    context: format!("{}.{}", relation.name, field),
                    expected: "numeric payload value".to_string(),
                    actual: other.type_name().to_string(),
                })
            }
        };
    }
    let mean_units = round_half_away(sum, values.len() as i128);
    let mean_units = i64::try_from(mean_units)
        .map_err(|_| Error::Overflow(format!("{}.{}", relation.name, field)))?;

    let mut min = values[0].clone();
    let mut max = values[0].clone();
    for value in &values[1..] {
        if value.compare(&min) == Some(std::cmp::Ordering::Less) {
            min = value.clone();
        }
        if value.compare(&max) == Some(std::cmp::Ordering::Greater) {
            max = value.clone();
        }
    }

    Ok(RelationStats {
        count: values.len(),
        mean: Some(Decimal::new(mean_units, scale)),
        min: Some(min),
        max: Some(max),
    })
}

/// Mean of a stored numeric field across a whole entity type.
///
/// Zero values are skipped: the aggregate default encodes "no data yet"
/// and would otherwise drag the collection mean down.
pub(crate) fn collection_mean(
    data: &DataSet,
    entity: &EntityDef,
    field: &str,
    scale: u8,
) -> Result<Decimal, Error> {
    let field_def = entity.get_field(field).ok_or_else(|| Error::UnknownField {
        entity: entity.name.clone(),
        field: field.to_string(),
    })?;
    if !field_def.field_type.is_numeric() {
        return Err(Error::TypeMismatch {
            context: format!("{}.{}", entity.name, field),
            expected: "numeric field".to_string(),
            actual: field_def.field_type.name().to_string(),
        });
    }

    let store = data.store(&entity.name)?;
    let factor = 10i128.pow(u32::from(scale));
    let mut sum: i128 = 0;
    let mut count: i128 = 0;
    for record in store.records() {
        let units = match record.get(field) {
            None | Some(Value::Null) => continue,
            Some(Value::Int(0)) => continue,
            Some(Value::Int(i)) => i128::from(*i) * factor,
            Some(Value::Decimal(d)) if d.units() == 0 => continue,
            Some(Value::Decimal(d)) => {
                units_at_scale(d, scale).ok_or_else(|| Error::TypeMismatch {
                    context: format!("{}.{}", entity.name, field),
                    expected: format!("decimal of scale at most {}", scale),
                    actual: format!("decimal of scale {}", d.scale()),
                })?
            }
            Some(other) => {
                return Err(Error::TypeMismatch {
                    context: format!("{}.{}", entity.name, field),
                    expected: "numeric value".to_string(),
                    actual: other.type_name().to_string(),
                })
            }
        };
        sum += units;
        count += 1;
    }

    if count == 0 {
        return Ok(Decimal::zero(scale));
    }
    let units = i64::try_from(round_half_away(sum, count))
        .map_err(|_| Error::Overflow(format!("{}.{}", entity.name, field)))?;
    Ok(Decimal::new(units, scale))
}

/// Rescale decimal units up to the requested scale.
fn units_at_scale(d: &Decimal, scale: u8) -> Option<i128> {
    if d.scale() <= scale {
        Some(i128::from(d.units()) * 10i128.pow(u32::from(scale - d.scale())))
    } else {
        None
    }
}
