//! Mapping commands onto collection operations
//!
//! Each [`Command`] becomes exactly one call on the [`Collection`]. Store
//! failures come back as [`RestError::Store`]; malformed arguments found while
//! preparing the call come back as [`RestError::Internal`].

use crate::config::{Method, ResourceConfig};
use crate::core::collection::{Collection, Document, RemoveOptions, UpdateOptions};
use crate::core::error::{InternalError, RestError};
use crate::core::outcome::{Outcome, UpdateSummary};
use crate::core::query::ResolvedQuery;
use crate::core::request::Command;
use serde_json::Value;

/// Run `command` against `collection`
pub async fn dispatch(
    collection: &dyn Collection,
    config: &ResourceConfig,
    command: &Command,
) -> Result<Outcome, RestError> {
    match command {
        Command::Read(read) if read.count => {
            tracing::debug!(method = %Method::Get, filter = ?read.filter, "count");
            let count = collection.count(&read.filter).await?;
            tracing::debug!(method = %Method::Get, count, "count returned");
            Ok(Outcome::Count(count))
        }
        Command::Read(read) => {
            let cursor = ResolvedQuery::build(config, read).into_cursor();
            tracing::debug!(method = %Method::Get, ?cursor, "find");
            let documents = collection.find(cursor).await?;
            tracing::debug!(method = %Method::Get, returned = documents.len(), "find returned");
            Ok(Outcome::Documents(documents))
        }
        Command::Insert(insert) => {
            let document = as_document("document", &insert.document)?;
            tracing::debug!(method = %Method::Post, "insert");
            let inserted = collection.insert(document).await?;
            Ok(Outcome::Inserted(inserted))
        }
        Command::Update(update) => {
            let modifications = as_document("update", &update.update)?;
            let options = UpdateOptions {
                upsert: update.upsert,
                multi: update.multi,
            };
            tracing::debug!(method = %Method::Put, filter = ?update.filter, ?options, "update");
            let result = collection
                .update(&update.filter, &modifications, options)
                .await?;
            tracing::debug!(method = %Method::Put, count = result.count, "update returned");
            Ok(Outcome::Updated(UpdateSummary {
                count: result.count,
                new_doc: result.upserted,
            }))
        }
        Command::Remove(remove) => {
            let options = RemoveOptions {
                multi: remove.multi,
            };
            tracing::debug!(method = %Method::Delete, filter = ?remove.filter, ?options, "remove");
            let removed = collection.remove(&remove.filter, options).await?;
            tracing::debug!(method = %Method::Delete, removed, "remove returned");
            Ok(Outcome::Removed(removed))
        }
    }
}

fn as_document(argument: &str, value: &Value) -> Result<Document, InternalError> {
    match value {
        Value::Object(map) => Ok(map.clone()),
        Value::Null => Err(InternalError::InvalidArgument {
            argument: argument.to_string(),
            message: "missing".to_string(),
        }),
        _ => Err(InternalError::InvalidArgument {
            argument: argument.to_string(),
            message: "must be an object".to_string(),
        }),
    }
}
