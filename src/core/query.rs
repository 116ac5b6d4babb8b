//! Read query resolution
//!
//! A read combines server-side configuration with what the client asked for:
//!
//! - **projection**: union of both; on fields named by both sides the server's
//!   flag wins, fields only the client names keep the client's flag
//! - **limit**: the server limit is a ceiling the client may only lower
//! - **skip** and **sort**: taken from the client as-is
//!
//! # Example
//! ```rust,ignore
//! // server: { projection: { password: 0 }, limit: 10 }
//! // client: { projection: { password: 1, name: 1 }, limit: 20 }
//! let resolved = ResolvedQuery::build(&config, &read);
//! // resolved.projection == { password: 0, name: 1 }
//! // resolved.limit == Some(10)
//! ```

use crate::config::ResourceConfig;
use crate::core::collection::{Cursor, ID_FIELD};
use crate::core::filter::Filter;
use crate::core::request::ReadCommand;
use indexmap::IndexMap;
use serde::de::{self, Deserializer};
use serde::ser::{SerializeMap, Serializer};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Field inclusion (`true`) or exclusion (`false`) flags
///
/// Serialized as `1` / `0`; accepts booleans or numbers on input.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Projection(IndexMap<String, bool>);

impl Projection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insertion
    pub fn with(mut self, field: impl Into<String>, include: bool) -> Self {
        self.0.insert(field.into(), include);
        self
    }

    pub fn insert(&mut self, field: impl Into<String>, include: bool) {
        self.0.insert(field.into(), include);
    }

    pub fn get(&self, field: &str) -> Option<bool> {
        self.0.get(field).copied()
    }

    pub fn contains(&self, field: &str) -> bool {
        self.0.contains_key(field)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, bool)> {
        self.0.iter().map(|(k, v)| (k.as_str(), *v))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Drop exclusions that an inclusion already implies
    ///
    /// Once any field other than `_id` is included, every unlisted field is
    /// omitted, so exclusions of other fields add nothing. `_id` keeps its
    /// flag either way.
    pub fn normalized(&self) -> Projection {
        let has_inclusion = self.iter().any(|(f, inc)| inc && f != ID_FIELD);
        if !has_inclusion {
            return self.clone();
        }
        let kept = self.iter().filter(|(f, inc)| *inc || *f == ID_FIELD);
        kept.collect()
    }
}

impl<K: Into<String>> FromIterator<(K, bool)> for Projection {
    fn from_iter<I: IntoIterator<Item = (K, bool)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }
}

impl Serialize for Projection {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (field, include) in &self.0 {
            map.serialize_entry(field, &u8::from(*include))?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for Projection {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = IndexMap::<String, Value>::deserialize(deserializer)?;
        raw.into_iter()
            .map(|(field, flag)| -> Result<(String, bool), D::Error> {
                let include = match &flag {
                    Value::Bool(b) => *b,
                    Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
                    other => {
                        return Err(de::Error::custom(format!(
                            "projection flag for '{}' must be a boolean or number, got {}",
                            field, other
                        )));
                    }
                };
                Ok((field, include))
            })
            .collect()
    }
}

/// Sort direction of one key
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Ascending,
    Descending,
}

impl SortDirection {
    pub fn as_i32(&self) -> i32 {
        match self {
            SortDirection::Ascending => 1,
            SortDirection::Descending => -1,
        }
    }
}

/// Ordered sort keys, e.g. `{ "age": -1, "name": 1 }`
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SortSpec(IndexMap<String, SortDirection>);

impl SortSpec {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, field: impl Into<String>, direction: SortDirection) -> Self {
        self.0.insert(field.into(), direction);
        self
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, SortDirection)> {
        self.0.iter().map(|(k, v)| (k.as_str(), *v))
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl Serialize for SortSpec {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (field, direction) in &self.0 {
            map.serialize_entry(field, &direction.as_i32())?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for SortSpec {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = IndexMap::<String, Value>::deserialize(deserializer)?;
        let mut spec = IndexMap::with_capacity(raw.len());
        for (field, direction) in raw {
            let sign = direction.as_f64().unwrap_or(0.0);
            let direction = match &direction {
                Value::Number(_) if sign > 0.0 => SortDirection::Ascending,
                Value::Number(_) if sign < 0.0 => SortDirection::Descending,
                Value::String(s) if s.eq_ignore_ascii_case("asc") => SortDirection::Ascending,
                Value::String(s) if s.eq_ignore_ascii_case("desc") => SortDirection::Descending,
                other => {
                    return Err(de::Error::custom(format!(
                        "sort direction for '{}' must be 1, -1, \"asc\" or \"desc\", got {}",
                        field, other
                    )));
                }
            };
            spec.insert(field, direction);
        }
        Ok(Self(spec))
    }
}

/// Merge server and client projections
///
/// Neither side: none. One side: that side verbatim. Both: client fields in
/// client order followed by server-only fields; on overlap the server wins.
pub fn resolve_projection(
    server: Option<&Projection>,
    client: Option<&Projection>,
) -> Option<Projection> {
    match (server, client) {
        (None, None) => None,
        (Some(server), None) => Some(server.clone()),
        (None, Some(client)) => Some(client.clone()),
        (Some(server), Some(client)) => {
            let mut merged = Projection::new();
            for (field, include) in client.iter() {
                merged.insert(field, server.get(field).unwrap_or(include));
            }
            for (field, include) in server.iter() {
                if !merged.contains(field) {
                    merged.insert(field, include);
                }
            }
            Some(merged)
        }
    }
}

/// The server limit is a ceiling: the smaller of both wins
pub fn resolve_limit(server: Option<u64>, client: Option<u64>) -> Option<u64> {
    match (server, client) {
        (Some(server), Some(client)) => Some(server.min(client)),
        (server, client) => server.or(client),
    }
}

/// A read with every precedence decision applied
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResolvedQuery {
    pub filter: Filter,
    pub projection: Option<Projection>,
    pub skip: Option<u64>,
    pub limit: Option<u64>,
    pub sort: Option<SortSpec>,
}

impl ResolvedQuery {
    pub fn build(config: &ResourceConfig, read: &ReadCommand) -> Self {
        Self {
            filter: read.filter.clone(),
            projection: resolve_projection(config.projection(), read.projection.as_ref()),
            skip: read.skip,
            limit: resolve_limit(config.limit(), read.limit),
            sort: read.sort.clone(),
        }
    }

    /// Shape a cursor: skip, then limit, then sort
    pub fn into_cursor(self) -> Cursor {
        let mut cursor = Cursor::new(self.filter, self.projection);
        if let Some(skip) = self.skip {
            cursor = cursor.skip(skip);
        }
        if let Some(limit) = self.limit {
            cursor = cursor.limit(limit);
        }
        if let Some(sort) = self.sort {
            cursor = cursor.sort(sort);
        }
        cursor
    }
}
