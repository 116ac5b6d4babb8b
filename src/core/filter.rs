//! Filter documents with materialized pattern predicates
//!
//! Clients send filters as JSON, so a pattern match can only arrive as a
//! string under the `$regex` marker. [`fix_pattern_filters`] turns such a
//! JSON filter into a [`Filter`] in which every pattern is a compiled
//! [`Pattern`], so stores match natively instead of comparing strings.
//!
//! # Format
//!
//! ```text
//! { "name": "Alice" }                          equality
//! { "age": { "$gte": 18, "$lt": 65 } }         operators
//! { "name": { "$regex": "^a", "$options": "i" } }
//! { "$or": [ { "name": "a" }, { "name": "b" } ] }
//! ```

use crate::core::error::InternalError;
use indexmap::IndexMap;
use regex::{Regex, RegexBuilder};
use serde_json::{Map, Value};
use std::fmt;

/// Reserved sub-key marking a pattern match
pub const PATTERN_MARKER: &str = "$regex";

/// Optional flags accompanying [`PATTERN_MARKER`]
pub const PATTERN_OPTIONS: &str = "$options";

/// A compiled pattern, remembering its source and flags
#[derive(Clone)]
pub struct Pattern {
    source: String,
    options: String,
    regex: Regex,
}

impl Pattern {
    /// Compile `source` with the flags in `options` (`i`, `m`, `s`, `x`)
    pub fn new(source: &str, options: &str) -> Result<Self, String> {
        let mut builder = RegexBuilder::new(source);
        for flag in options.chars() {
            match flag {
                'i' => builder.case_insensitive(true),
                'm' => builder.multi_line(true),
                's' => builder.dot_matches_new_line(true),
                'x' => builder.ignore_whitespace(true),
                other => return Err(format!("unsupported pattern option '{}'", other)),
            };
        }
        let regex = builder.build().map_err(|e| e.to_string())?;

        Ok(Self {
            source: source.to_string(),
            options: options.to_string(),
            regex,
        })
    }

    pub fn is_match(&self, haystack: &str) -> bool {
        self.regex.is_match(haystack)
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn options(&self) -> &str {
        &self.options
    }
}

impl PartialEq for Pattern {
    fn eq(&self, other: &Self) -> bool {
        self.source == other.source && self.options == other.options
    }
}

impl fmt::Debug for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "/{}/{}", self.source, self.options)
    }
}

/// Right-hand side of an operator
#[derive(Debug, Clone, PartialEq)]
pub enum Operand {
    Value(Value),
    Pattern(Pattern),
}

/// What a single filter key requires
#[derive(Debug, Clone, PartialEq)]
pub enum Condition {
    /// The field equals the value
    Equals(Value),
    /// Every operator holds for the field (`$gt`, `$regex`, …)
    Operators(IndexMap<String, Operand>),
    /// `$or`: at least one sub-filter matches
    Any(Vec<Filter>),
    /// `$and`: every sub-filter matches
    All(Vec<Filter>),
}

/// A filter whose pattern sub-fields are compiled
///
/// Clauses keep the order in which the client sent them.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Filter {
    clauses: IndexMap<String, Condition>,
}

impl Filter {
    /// The filter matching every document
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.clauses.is_empty()
    }

    pub fn len(&self) -> usize {
        self.clauses.len()
    }

    pub fn get(&self, field: &str) -> Option<&Condition> {
        self.clauses.get(field)
    }

    pub fn clauses(&self) -> impl Iterator<Item = (&str, &Condition)> {
        self.clauses.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Add or replace a clause
    pub fn insert(&mut self, field: impl Into<String>, condition: Condition) {
        self.clauses.insert(field.into(), condition);
    }

    /// Build a filter from a decoded JSON filter document
    pub fn from_value(value: &Value) -> Result<Self, InternalError> {
        match value {
            Value::Null => Ok(Self::empty()),
            Value::Object(map) => Self::from_map(map),
            other => Err(InternalError::invalid_filter(format!(
                "expected an object, got {}",
                json_type(other)
            ))),
        }
    }

    fn from_map(map: &Map<String, Value>) -> Result<Self, InternalError> {
        let mut clauses = IndexMap::with_capacity(map.len());

        for (key, value) in map {
            let condition = match key.as_str() {
                "$or" => Condition::Any(sub_filters(key, value)?),
                "$and" => Condition::All(sub_filters(key, value)?),
                k if k.starts_with('$') => {
                    return Err(InternalError::invalid_filter(format!(
                        "unknown top-level operator '{}'",
                        k
                    )));
                }
                _ => field_condition(key, value)?,
            };
            clauses.insert(key.clone(), condition);
        }

        Ok(Self { clauses })
    }
}

/// Decode the `query` sub-object of a request into a [`Filter`]
///
/// Walks every filter key; where a sub-key is the pattern marker its string
/// value is compiled into a [`Pattern`]. An absent query is the empty filter.
pub fn fix_pattern_filters(query: Option<&Value>) -> Result<Filter, InternalError> {
    match query {
        Some(value) => Filter::from_value(value),
        None => Ok(Filter::empty()),
    }
}

fn sub_filters(key: &str, value: &Value) -> Result<Vec<Filter>, InternalError> {
    let Value::Array(items) = value else {
        return Err(InternalError::invalid_filter(format!(
            "'{}' expects an array of filters",
            key
        )));
    };
    items.iter().map(Filter::from_value).collect()
}

fn field_condition(field: &str, value: &Value) -> Result<Condition, InternalError> {
    let Value::Object(map) = value else {
        return Ok(Condition::Equals(value.clone()));
    };

    let operator_count = map.keys().filter(|k| k.starts_with('$')).count();
    if operator_count == 0 {
        return Ok(Condition::Equals(value.clone()));
    }
    if operator_count != map.len() {
        return Err(InternalError::invalid_filter(format!(
            "field '{}' mixes operators and plain keys",
            field
        )));
    }

    let options = match map.get(PATTERN_OPTIONS) {
        None => "",
        Some(Value::String(options)) => options.as_str(),
        Some(_) => {
            return Err(InternalError::InvalidPattern {
                field: field.to_string(),
                message: format!("{} must be a string", PATTERN_OPTIONS),
            });
        }
    };
    if !options.is_empty() && !map.contains_key(PATTERN_MARKER) {
        return Err(InternalError::InvalidPattern {
            field: field.to_string(),
            message: format!("{} without {}", PATTERN_OPTIONS, PATTERN_MARKER),
        });
    }

    let mut operators = IndexMap::with_capacity(map.len());
    for (op, operand) in map {
        if op == PATTERN_OPTIONS {
            continue;
        }
        let operand = if op == PATTERN_MARKER {
            let Value::String(source) = operand else {
                return Err(InternalError::InvalidPattern {
                    field: field.to_string(),
                    message: format!("expected a string, got {}", json_type(operand)),
                });
            };
            let pattern =
                Pattern::new(source, options).map_err(|message| InternalError::InvalidPattern {
                    field: field.to_string(),
                    message,
                })?;
            Operand::Pattern(pattern)
        } else {
            Operand::Value(operand.clone())
        };
        operators.insert(op.clone(), operand);
    }

    Ok(Condition::Operators(operators))
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
