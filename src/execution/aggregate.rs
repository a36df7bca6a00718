use std::{collections::HashMap, fmt};

use super::{not_opened, OpIterator};
use crate::{
    error::SmallError,
    storage::{Cell, Field, TableSchema, Tuple, Type},
    types::SmallResult,
};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AggregateOp {
    Count,
    Sum,
    Avg,
    Min,
    Max,
}

impl fmt::Display for AggregateOp {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let s = match self {
            AggregateOp::Count => "count",
            AggregateOp::Sum => "sum",
            AggregateOp::Avg => "avg",
            AggregateOp::Min => "min",
            AggregateOp::Max => "max",
        };
        write!(f, "{}", s)
    }
}

impl AggregateOp {
    /// Compute the aggregate over the values of one group. Return
    /// `None` if the aggregate is undefined for an empty group.
    fn compute(&self, values: &[Cell]) -> Result<Option<i64>, SmallError> {
        if let AggregateOp::Count = self {
            return Ok(Some(values.len() as i64));
        }

        let ints = values
            .iter()
            .map(|c| c.get_int64())
            .collect::<Result<Vec<i64>, SmallError>>()?;

        let result = match self {
            AggregateOp::Count => Some(ints.len() as i64),
            AggregateOp::Sum => Some(checked_sum(&ints)?),
            // integer division, like the values themselves
            AggregateOp::Avg if ints.is_empty() => None,
            AggregateOp::Avg => Some(checked_sum(&ints)? / ints.len() as i64),
            AggregateOp::Min => ints.iter().min().copied(),
            AggregateOp::Max => ints.iter().max().copied(),
        };
        Ok(result)
    }
}

fn checked_sum(ints: &[i64]) -> Result<i64, SmallError> {
    ints.iter()
        .try_fold(0i64, |acc, v| acc.checked_add(*v))
        .ok_or_else(|| SmallError::new("sum overflow"))
}

/// The aggregated values collected so far, by group.
enum Groups {
    Ungrouped(Vec<Cell>),
    GroupedByInt(HashMap<i64, Vec<Cell>>),
    GroupedByString(HashMap<String, Vec<Cell>>),
}

impl Groups {
    fn new(group_type: Option<Type>) -> Result<Self, SmallError> {
        match group_type {
            None => Ok(Groups::Ungrouped(Vec::new())),
            Some(Type::Int64) => Ok(Groups::GroupedByInt(HashMap::new())),
            Some(Type::Bytes(_)) => Ok(Groups::GroupedByString(HashMap::new())),
            Some(t) => Err(SmallError::new(&format!("can't group by a {} field", t))),
        }
    }

    fn merge(&mut self, tuple: &Tuple, agg_field: usize, group_field: Option<usize>) -> SmallResult {
        let value = tuple.get_cell(agg_field);
        match (self, group_field) {
            (Groups::Ungrouped(values), _) => values.push(value),
            (Groups::GroupedByInt(groups), Some(i)) => {
                let key = tuple.get_cell(i).get_int64()?;
                groups.entry(key).or_insert_with(Vec::new).push(value);
            }
            (Groups::GroupedByString(groups), Some(i)) => {
                let key = tuple.get_cell(i).get_string()?;
                groups.entry(key).or_insert_with(Vec::new).push(value);
            }
            (_, None) => return Err(SmallError::new("grouped aggregate without group field")),
        }
        Ok(())
    }

    /// One tuple per group, ordered by group key.
    fn into_tuples(self, op: AggregateOp) -> Result<Vec<Tuple>, SmallError> {
        let mut tuples = Vec::new();
        match self {
            Groups::Ungrouped(values) => {
                if let Some(v) = op.compute(&values)? {
                    tuples.push(Tuple::new(vec![Cell::Int64(v)]));
                }
            }
            Groups::GroupedByInt(groups) => {
                let mut groups: Vec<(i64, Vec<Cell>)> = groups.into_iter().collect();
                groups.sort_by_key(|(k, _)| *k);
                for (key, values) in groups {
                    if let Some(v) = op.compute(&values)? {
                        tuples.push(Tuple::new(vec![Cell::Int64(key), Cell::Int64(v)]));
                    }
                }
            }
            Groups::GroupedByString(groups) => {
                let mut groups: Vec<(String, Vec<Cell>)> = groups.into_iter().collect();
                groups.sort_by(|(a, _), (b, _)| a.cmp(b));
                for (key, values) in groups {
                    if let Some(v) = op.compute(&values)? {
                        tuples.push(Tuple::new(vec![Cell::String(key), Cell::Int64(v)]));
                    }
                }
            }
        }
        Ok(tuples)
    }
}

/// Computes a single aggregate over the child's tuples, optionally
/// grouped by one field.
///
/// The output is `(aggregate)` without grouping and `(group,
/// aggregate)` with it. Non-integer fields only support `Count`.
pub struct Aggregate {
    child: Box<dyn OpIterator>,
    agg_field: usize,
    group_field: Option<usize>,
    op: AggregateOp,
    schema: TableSchema,

    results: Option<std::vec::IntoIter<Tuple>>,
}

impl Aggregate {
    pub fn new(
        child: Box<dyn OpIterator>,
        agg_field: usize,
        group_field: Option<usize>,
        op: AggregateOp,
    ) -> Result<Self, SmallError> {
        let child_schema = child.get_schema();

        let agg = child_schema.get_field(agg_field).ok_or_else(|| {
            SmallError::new(&format!(
                "aggregate field {} out of range, schema: [{}]",
                agg_field, child_schema
            ))
        })?;
        if agg.t != Type::Int64 && op != AggregateOp::Count {
            return Err(SmallError::new(&format!(
                "{} is not supported on {} field {}",
                op, agg.t, agg.name
            )));
        }
        let agg_output = Field::new(&format!("{}({})", op, agg.name), Type::Int64);

        let fields = match group_field {
            None => vec![agg_output],
            Some(i) => {
                let group = child_schema.get_field(i).ok_or_else(|| {
                    SmallError::new(&format!(
                        "group field {} out of range, schema: [{}]",
                        i, child_schema
                    ))
                })?;
                // fail early on an unsupported group type
                Groups::new(Some(group.t))?;
                vec![group.clone(), agg_output]
            }
        };

        Ok(Self {
            child,
            agg_field,
            group_field,
            op,
            schema: TableSchema::new(fields),
            results: None,
        })
    }

    pub fn get_op(&self) -> AggregateOp {
        self.op
    }

    pub fn get_group_field(&self) -> Option<usize> {
        self.group_field
    }

    pub fn get_agg_field(&self) -> usize {
        self.agg_field
    }

    // Drain the child and compute all groups.
    fn compute(&mut self) -> SmallResult {
        let group_type = self
            .group_field
            .and_then(|i| self.child.get_schema().get_field(i))
            .map(|f| f.t);
        let mut groups = Groups::new(group_type)?;

        while let Some(tuple) = self.child.next()? {
            groups.merge(&tuple, self.agg_field, self.group_field)?;
        }

        self.results = Some(groups.into_tuples(self.op)?.into_iter());
        Ok(())
    }
}

impl OpIterator for Aggregate {
    fn open(&mut self) -> SmallResult {
        self.child.open()?;
        self.compute()
    }

    fn next(&mut self) -> Result<Option<Tuple>, SmallError> {
        let results = self.results.as_mut().ok_or_else(|| not_opened("Aggregate"))?;
        Ok(results.next())
    }

    fn rewind(&mut self) -> SmallResult {
        self.child.rewind()?;
        self.compute()
    }

    fn close(&mut self) {
        self.child.close();
        self.results = None;
    }

    fn get_schema(&self) -> &TableSchema {
        &self.schema
    }
}
