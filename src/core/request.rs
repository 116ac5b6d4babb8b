//! Request translation
//!
//! Every route carries its arguments as one encoded JSON object in a field
//! named `json`:
//!
//! - `GET`: query string, `?json={"query":{...},"limit":10}`
//! - `POST` / `PUT`: request body, `{"json": "{\"query\":{...}}"}` (the field
//!   may also hold the object directly)
//! - `DELETE`: query string when present, otherwise the body
//!
//! [`translate`] decodes that field into a typed [`Command`], compiling
//! pattern filters along the way.

use crate::config::Method;
use crate::core::error::InternalError;
use crate::core::filter::{Filter, fix_pattern_filters};
use crate::core::query::{Projection, SortSpec};
use axum::body::Bytes;
use axum::http::{HeaderMap, header};
use serde::{Deserialize, Deserializer};
use serde_json::{Map, Value};
use std::collections::HashMap;

/// Name of the field carrying the encoded payload
pub const PAYLOAD_FIELD: &str = "json";

/// The parts of an HTTP request the translator looks at
#[derive(Debug, Clone, Default)]
pub struct RawRequest {
    pub headers: HeaderMap,
    pub query: HashMap<String, String>,
    pub body: Bytes,
}

/// A request as seen by the hooks
#[derive(Debug, Clone)]
pub struct RestRequest {
    pub method: Method,
    pub headers: HeaderMap,
    /// The decoded command; `None` until translation succeeded
    pub command: Option<Command>,
}

impl RestRequest {
    pub fn new(method: Method, headers: HeaderMap) -> Self {
        Self {
            method,
            headers,
            command: None,
        }
    }

    pub fn command(&self) -> Option<&Command> {
        self.command.as_ref()
    }

    /// Whether the client accepts a JSON response
    pub fn accepts_json(&self) -> bool {
        accepts_json(&self.headers)
    }
}

/// Decoded arguments of one operation
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Read(ReadCommand),
    Insert(InsertCommand),
    Update(UpdateCommand),
    Remove(RemoveCommand),
}

/// `GET`
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReadCommand {
    pub filter: Filter,
    pub projection: Option<Projection>,
    pub skip: Option<u64>,
    pub limit: Option<u64>,
    pub sort: Option<SortSpec>,
    pub count: bool,
}

/// `POST`
#[derive(Debug, Clone, PartialEq)]
pub struct InsertCommand {
    pub document: Value,
}

/// `PUT`
#[derive(Debug, Clone, PartialEq)]
pub struct UpdateCommand {
    pub filter: Filter,
    pub update: Value,
    pub upsert: bool,
    pub multi: bool,
}

/// `DELETE`
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RemoveCommand {
    pub filter: Filter,
    pub multi: bool,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ReadPayload {
    query: Option<Value>,
    projection: Option<Projection>,
    skip: Option<u64>,
    limit: Option<u64>,
    sort: Option<SortSpec>,
    #[serde(deserialize_with = "truthy")]
    count: bool,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct InsertPayload {
    query: Option<Value>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct UpdatePayload {
    query: Option<Value>,
    update: Option<Value>,
    #[serde(deserialize_with = "truthy")]
    upsert: bool,
    #[serde(deserialize_with = "truthy")]
    multi: bool,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RemovePayload {
    query: Option<Value>,
    #[serde(deserialize_with = "truthy")]
    multi: bool,
}

/// Decode the payload of `raw` into the command for `method`
pub fn translate(method: Method, raw: &RawRequest) -> Result<Command, InternalError> {
    let payload = Value::Object(encoded_payload(method, raw)?);

    let command = match method {
        Method::Get => {
            let p: ReadPayload = serde_json::from_value(payload)?;
            Command::Read(ReadCommand {
                filter: fix_pattern_filters(p.query.as_ref())?,
                projection: p.projection,
                skip: p.skip.filter(|n| *n > 0),
                limit: p.limit.filter(|n| *n > 0),
                sort: p.sort,
                count: p.count,
            })
        }
        Method::Post => {
            let p: InsertPayload = serde_json::from_value(payload)?;
            Command::Insert(InsertCommand {
                document: p.query.unwrap_or(Value::Null),
            })
        }
        Method::Put => {
            let p: UpdatePayload = serde_json::from_value(payload)?;
            Command::Update(UpdateCommand {
                filter: fix_pattern_filters(p.query.as_ref())?,
                update: p.update.unwrap_or(Value::Null),
                upsert: p.upsert,
                multi: p.multi,
            })
        }
        Method::Delete => {
            let p: RemovePayload = serde_json::from_value(payload)?;
            Command::Remove(RemoveCommand {
                filter: fix_pattern_filters(p.query.as_ref())?,
                multi: p.multi,
            })
        }
    };

    Ok(command)
}

/// Locate and decode the `json` field; absent means `{}`
fn encoded_payload(method: Method, raw: &RawRequest) -> Result<Map<String, Value>, InternalError> {
    let from_query = raw.query.get(PAYLOAD_FIELD);

    let value = match (method, from_query) {
        (Method::Get, Some(encoded)) | (Method::Delete, Some(encoded)) => {
            Some(serde_json::from_str::<Value>(encoded)?)
        }
        (Method::Get, None) => None,
        _ => body_payload(&raw.body)?,
    };

    match value {
        None => Ok(Map::new()),
        Some(Value::Object(map)) => Ok(map),
        Some(other) => Err(InternalError::decode(format!(
            "payload must be an object, got {}",
            other
        ))),
    }
}

fn body_payload(body: &Bytes) -> Result<Option<Value>, InternalError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(None);
    }

    let envelope: Value = serde_json::from_slice(body)?;
    let Value::Object(mut envelope) = envelope else {
        return Err(InternalError::decode("request body must be a JSON object"));
    };

    match envelope.remove(PAYLOAD_FIELD) {
        None => Ok(None),
        Some(Value::String(encoded)) => Ok(Some(serde_json::from_str(&encoded)?)),
        Some(structured) => Ok(Some(structured)),
    }
}

/// JavaScript-style truthiness for flag fields
fn truthy<'de, D: Deserializer<'de>>(deserializer: D) -> Result<bool, D::Error> {
    let value = Value::deserialize(deserializer)?;
    Ok(match value {
        Value::Null => false,
        Value::Bool(b) => b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    })
}

/// Whether the `Accept` headers admit `application/json`
///
/// A request without `Accept` accepts anything. Media ranges with `q=0` are
/// refusals.
pub fn accepts_json(headers: &HeaderMap) -> bool {
    let mut ranges = headers
        .get_all(header::ACCEPT)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(','))
        .map(str::trim)
        .filter(|range| !range.is_empty())
        .peekable();

    if ranges.peek().is_none() {
        return true;
    }

    ranges.any(|range| {
        let mut parts = range.split(';').map(str::trim);
        let media = parts.next().unwrap_or_default().to_ascii_lowercase();
        let refused = parts.any(|param| {
            param
                .strip_prefix("q=")
                .and_then(|q| q.parse::<f32>().ok())
                .is_some_and(|q| q <= 0.0)
        });
        let json_range = matches!(media.as_str(), "application/json" | "application/*");
        !refused && (json_range || matches!(media.as_str(), "*/*" | "*"))
    })
}
