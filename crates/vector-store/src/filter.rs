use crate::error::{Result, VectorStoreError};
use crate::types::{Metadata, MetadataValue};
use serde::Deserialize;
use serde_json::Value;
use std::collections::BTreeSet;

/// Parsed metadata predicate.
///
/// Built from the JSON filter grammar: `$and`/`$or` combinators, bare scalar equality per field,
/// or an operator object per field (`$eq $ne $gt $gte $lt $lte $in $nin`). Top-level keys are
/// combined with AND. An empty filter matches everything.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(try_from = "Value")]
pub struct MetadataFilter {
    clauses: Vec<Clause>,
}

#[derive(Debug, Clone, PartialEq)]
enum Clause {
    And(Vec<MetadataFilter>),
    Or(Vec<MetadataFilter>),
    Field { key: String, predicate: Predicate },
}

#[derive(Debug, Clone, PartialEq)]
enum Predicate {
    Equals(Operand),
    Ops(Vec<Op>),
}

/// `None` stands for null, arrays and objects: values no metadata scalar is equal to.
type Operand = Option<MetadataValue>;

#[derive(Debug, Clone, PartialEq)]
enum Op {
    Eq(Operand),
    Ne(Operand),
    Gt(Option<f64>),
    Gte(Option<f64>),
    Lt(Option<f64>),
    Lte(Option<f64>),
    In(Vec<Operand>),
    Nin(Vec<Operand>),
    /// Unknown operator, compared by strict equality
    Other(Operand),
}

impl MetadataFilter {
    /// Filter that matches every item
    #[must_use]
    pub fn all() -> Self {
        Self::default()
    }

    /// `{key: value}`
    pub fn eq(key: impl Into<String>, value: impl Into<MetadataValue>) -> Self {
        Self {
            clauses: vec![Clause::Field {
                key: key.into(),
                predicate: Predicate::Equals(Some(value.into())),
            }],
        }
    }

    /// `{$and: filters}`
    #[must_use]
    pub fn and(filters: Vec<MetadataFilter>) -> Self {
        Self {
            clauses: vec![Clause::And(filters)],
        }
    }

    /// `{$or: filters}`
    #[must_use]
    pub fn or(filters: Vec<MetadataFilter>) -> Self {
        Self {
            clauses: vec![Clause::Or(filters)],
        }
    }

    /// Parse the JSON filter grammar. `null` is the empty filter.
    pub fn from_json(value: &Value) -> Result<Self> {
        match value {
            Value::Null => Ok(Self::default()),
            Value::Object(map) => {
                let mut clauses = Vec::with_capacity(map.len());
                for (key, value) in map {
                    let clause = match key.as_str() {
                        "$and" => Clause::And(parse_filter_list(key, value)?),
                        "$or" => Clause::Or(parse_filter_list(key, value)?),
                        _ => Clause::Field {
                            key: key.clone(),
                            predicate: parse_predicate(key, value)?,
                        },
                    };
                    clauses.push(clause);
                }
                Ok(Self { clauses })
            }
            other => Err(VectorStoreError::InvalidFilter(format!(
                "filter must be an object, got {other}"
            ))),
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.clauses.is_empty()
    }

    pub fn matches(&self, metadata: &Metadata) -> bool {
        self.clauses.iter().all(|clause| clause.matches(metadata))
    }

    /// Every metadata field this filter inspects, at any depth.
    #[must_use]
    pub fn referenced_keys(&self) -> BTreeSet<&str> {
        let mut keys = BTreeSet::new();
        self.collect_keys(&mut keys);
        keys
    }

    fn collect_keys<'a>(&'a self, keys: &mut BTreeSet<&'a str>) {
        for clause in &self.clauses {
            match clause {
                Clause::And(filters) | Clause::Or(filters) => {
                    for filter in filters {
                        filter.collect_keys(keys);
                    }
                }
                Clause::Field { key, .. } => {
                    keys.insert(key.as_str());
                }
            }
        }
    }
}

impl TryFrom<Value> for MetadataFilter {
    type Error = VectorStoreError;

    fn try_from(value: Value) -> Result<Self> {
        Self::from_json(&value)
    }
}

/// `true` when `filter` is absent or `metadata` satisfies it.
pub fn matches(metadata: &Metadata, filter: Option<&MetadataFilter>) -> bool {
    filter.map_or(true, |f| f.matches(metadata))
}

impl Clause {
    fn matches(&self, metadata: &Metadata) -> bool {
        match self {
            Clause::And(filters) => filters.iter().all(|f| f.matches(metadata)),
            Clause::Or(filters) => filters.iter().any(|f| f.matches(metadata)),
            Clause::Field { key, predicate } => metadata
                .get(key)
                .is_some_and(|value| predicate.matches(value)),
        }
    }
}

impl Predicate {
    fn matches(&self, value: &MetadataValue) -> bool {
        match self {
            Predicate::Equals(operand) => strict_eq(value, operand),
            Predicate::Ops(ops) => ops.iter().all(|op| op.matches(value)),
        }
    }
}

impl Op {
    fn matches(&self, value: &MetadataValue) -> bool {
        match self {
            Op::Eq(operand) | Op::Other(operand) => strict_eq(value, operand),
            Op::Ne(operand) => !strict_eq(value, operand),
            Op::Gt(bound) => compare(value, *bound, |v, b| v > b),
            Op::Gte(bound) => compare(value, *bound, |v, b| v >= b),
            Op::Lt(bound) => compare(value, *bound, |v, b| v < b),
            Op::Lte(bound) => compare(value, *bound, |v, b| v <= b),
            Op::In(list) => {
                !matches!(value, MetadataValue::Bool(_))
                    && list.iter().any(|operand| strict_eq(value, operand))
            }
            Op::Nin(list) => {
                !matches!(value, MetadataValue::Bool(_))
                    && !list.iter().any(|operand| strict_eq(value, operand))
            }
        }
    }
}

fn strict_eq(value: &MetadataValue, operand: &Operand) -> bool {
    operand.as_ref() == Some(value)
}

fn compare(value: &MetadataValue, bound: Option<f64>, cmp: impl Fn(f64, f64) -> bool) -> bool {
    match (value.as_f64(), bound) {
        (Some(v), Some(b)) => cmp(v, b),
        _ => false,
    }
}

fn parse_filter_list(key: &str, value: &Value) -> Result<Vec<MetadataFilter>> {
    let Value::Array(items) = value else {
        return Err(VectorStoreError::InvalidFilter(format!(
            "{key} expects an array of filters"
        )));
    };
    items.iter().map(MetadataFilter::from_json).collect()
}

fn parse_predicate(key: &str, value: &Value) -> Result<Predicate> {
    let Value::Object(ops) = value else {
        return Ok(Predicate::Equals(operand(value)));
    };

    let mut parsed = Vec::with_capacity(ops.len());
    for (op, arg) in ops {
        let op = match op.as_str() {
            "$eq" => Op::Eq(operand(arg)),
            "$ne" => Op::Ne(operand(arg)),
            "$gt" => Op::Gt(arg.as_f64()),
            "$gte" => Op::Gte(arg.as_f64()),
            "$lt" => Op::Lt(arg.as_f64()),
            "$lte" => Op::Lte(arg.as_f64()),
            "$in" => Op::In(operand_list(key, op, arg)?),
            "$nin" => Op::Nin(operand_list(key, op, arg)?),
            _ => Op::Other(operand(arg)),
        };
        parsed.push(op);
    }
    Ok(Predicate::Ops(parsed))
}

fn operand(value: &Value) -> Operand {
    match value {
        Value::Bool(b) => Some(MetadataValue::Bool(*b)),
        Value::Number(n) => n.as_f64().map(MetadataValue::Number),
        Value::String(s) => Some(MetadataValue::String(s.clone())),
        Value::Null | Value::Array(_) | Value::Object(_) => None,
    }
}

fn operand_list(key: &str, op: &str, value: &Value) -> Result<Vec<Operand>> {
    match value {
        Value::Array(items) => Ok(items.iter().map(operand).collect()),
        _ => Err(VectorStoreError::InvalidFilter(format!(
            "{key}.{op} expects an array"
        ))),
    }
}
