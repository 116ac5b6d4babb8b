//! MongoDB storage backend using the official MongoDB async driver.
//!
//! Provides a [`MongoCollection`] implementation of [`Collection`] backed by
//! one `mongodb::Collection`.
//!
//! # Feature flag
//!
//! This module is gated behind the `mongodb_backend` feature flag:
//! ```toml
//! [dependencies]
//! collection-rest = { version = "0.1", features = ["mongodb_backend"] }
//! ```
//!
//! # Serialization strategy
//!
//! Documents travel as `serde_json` maps and are converted to BSON at the
//! edge. Compiled patterns become native BSON regular expressions, so
//! pattern filters are evaluated by the server. Identifiers are generated
//! client-side as UUID strings, matching the in-memory backend.

use crate::core::collection::{
    Collection, Cursor, Document, ID_FIELD, RemoveOptions, UpdateOptions, UpdateResult,
};
use crate::core::error::{StoreError, StoreResult};
use crate::core::filter::{Condition, Filter, Operand};
use crate::core::query::{Projection, SortSpec};
use async_trait::async_trait;
use futures::TryStreamExt;
use mongodb::Database;
use mongodb::bson::{self, Bson, Document as BsonDocument, Regex, doc};
use serde_json::Value;
use uuid::Uuid;

// ---------------------------------------------------------------------------
// Conversion helpers
// ---------------------------------------------------------------------------

fn to_bson_document(document: &Document) -> StoreResult<BsonDocument> {
    bson::to_document(document).map_err(|e| StoreError::operation("convert document", e))
}

fn to_bson_value(value: &Value) -> StoreResult<Bson> {
    bson::to_bson(value).map_err(|e| StoreError::operation("convert value", e))
}

/// Convert a BSON document back into a JSON map (relaxed extended JSON)
fn from_bson_document(document: BsonDocument) -> Document {
    match Bson::Document(document).into_relaxed_extjson() {
        Value::Object(map) => map,
        _ => Document::new(),
    }
}

/// Translate a compiled filter into a MongoDB query document
fn filter_to_bson(filter: &Filter) -> StoreResult<BsonDocument> {
    let mut query = BsonDocument::new();

    for (field, condition) in filter.clauses() {
        let value = match condition {
            Condition::Equals(value) => to_bson_value(value)?,
            Condition::Operators(operators) => {
                let mut ops = BsonDocument::new();
                for (operator, operand) in operators {
                    let operand = match operand {
                        Operand::Value(value) => to_bson_value(value)?,
                        Operand::Pattern(pattern) => Bson::RegularExpression(Regex {
                            pattern: pattern.source().to_string(),
                            options: pattern.options().to_string(),
                        }),
                    };
                    ops.insert(operator.as_str(), operand);
                }
                Bson::Document(ops)
            }
            Condition::Any(branches) | Condition::All(branches) => {
                let branches = branches
                    .iter()
                    .map(|branch| filter_to_bson(branch).map(Bson::Document))
                    .collect::<StoreResult<Vec<_>>>()?;
                Bson::Array(branches)
            }
        };
        query.insert(field, value);
    }

    Ok(query)
}

fn projection_to_bson(projection: &Projection) -> BsonDocument {
    projection
        .normalized()
        .iter()
        .map(|(field, include)| (field.to_string(), Bson::Int32(i32::from(include))))
        .collect()
}

fn sort_to_bson(sort: &SortSpec) -> BsonDocument {
    sort.iter()
        .map(|(field, direction)| (field.to_string(), Bson::Int32(direction.as_i32())))
        .collect()
}

fn is_replacement(update: &Document) -> bool {
    !update.keys().any(|k| k.starts_with('$'))
}

// ---------------------------------------------------------------------------
// MongoCollection
// ---------------------------------------------------------------------------

/// Document collection backed by MongoDB.
///
/// # Example
///
/// ```rust,ignore
/// use mongodb::Client;
/// use collection_rest::storage::MongoCollection;
///
/// let client = Client::with_uri_str("mongodb://localhost:27017").await?;
/// let people = MongoCollection::new(&client.database("mydb"), "people");
/// let app = collection_rest::rest(people, None, false);
/// ```
#[derive(Clone, Debug)]
pub struct MongoCollection {
    collection: mongodb::Collection<BsonDocument>,
}

impl MongoCollection {
    /// Use the collection `name` of `database`
    pub fn new(database: &Database, name: &str) -> Self {
        Self {
            collection: database.collection(name),
        }
    }

    /// Get a reference to the underlying driver collection.
    pub fn inner(&self) -> &mongodb::Collection<BsonDocument> {
        &self.collection
    }
}

#[async_trait]
impl Collection for MongoCollection {
    async fn count(&self, filter: &Filter) -> StoreResult<u64> {
        self.collection
            .count_documents(filter_to_bson(filter)?)
            .await
            .map_err(|e| StoreError::operation("count", e))
    }

    async fn find(&self, cursor: Cursor) -> StoreResult<Vec<Document>> {
        let mut find = self.collection.find(filter_to_bson(&cursor.filter)?);
        if let Some(projection) = &cursor.projection {
            find = find.projection(projection_to_bson(projection));
        }
        if let Some(skip) = cursor.skip {
            find = find.skip(skip);
        }
        if let Some(limit) = cursor.limit {
            find = find.limit(i64::try_from(limit).unwrap_or(i64::MAX));
        }
        if let Some(sort) = &cursor.sort {
            find = find.sort(sort_to_bson(sort));
        }

        let docs: Vec<BsonDocument> = find
            .await
            .map_err(|e| StoreError::operation("find", e))?
            .try_collect()
            .await
            .map_err(|e| StoreError::operation("find", e))?;

        Ok(docs.into_iter().map(from_bson_document).collect())
    }

    /// Insert a document, generating a UUID `_id` when it has none.
    async fn insert(&self, mut document: Document) -> StoreResult<Document> {
        if document.get(ID_FIELD).is_none_or(Value::is_null) {
            document.insert(
                ID_FIELD.to_string(),
                Value::String(Uuid::new_v4().simple().to_string()),
            );
        }

        self.collection
            .insert_one(to_bson_document(&document)?)
            .await
            .map_err(|e| StoreError::operation("insert", e))?;

        Ok(document)
    }

    async fn update(
        &self,
        filter: &Filter,
        update: &Document,
        options: UpdateOptions,
    ) -> StoreResult<UpdateResult> {
        let query = filter_to_bson(filter)?;
        let modifications = to_bson_document(update)?;

        let result = if is_replacement(update) {
            if options.multi {
                return Err(StoreError::invalid_update(
                    "a replacement cannot be applied to multiple documents",
                ));
            }
            self.collection
                .replace_one(query, modifications)
                .upsert(options.upsert)
                .await
        } else if options.multi {
            self.collection
                .update_many(query, modifications)
                .upsert(options.upsert)
                .await
        } else {
            self.collection
                .update_one(query, modifications)
                .upsert(options.upsert)
                .await
        }
        .map_err(|e| StoreError::operation("update", e))?;

        let Some(upserted_id) = result.upserted_id else {
            return Ok(UpdateResult {
                count: result.matched_count,
                upserted: None,
            });
        };

        // Read back the inserted document
        let upserted = self
            .collection
            .find_one(doc! { ID_FIELD: upserted_id })
            .await
            .map_err(|e| StoreError::operation("update", e))?
            .map(from_bson_document);

        Ok(UpdateResult {
            count: 1,
            upserted,
        })
    }

    async fn remove(&self, filter: &Filter, options: RemoveOptions) -> StoreResult<u64> {
        let query = filter_to_bson(filter)?;
        let result = if options.multi {
            self.collection.delete_many(query).await
        } else {
            self.collection.delete_one(query).await
        }
        .map_err(|e| StoreError::operation("remove", e))?;

        Ok(result.deleted_count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::filter::fix_pattern_filters;
    use crate::core::query::SortDirection;
    use serde_json::json;

    #[test]
    fn test_pattern_becomes_bson_regex() {
        let filter =
            fix_pattern_filters(Some(&json!({ "name": { "$regex": "^a", "$options": "i" } })))
                .unwrap();
        let query = filter_to_bson(&filter).unwrap();

        let ops = query.get_document("name").unwrap();
        match ops.get("$regex") {
            Some(Bson::RegularExpression(regex)) => {
                assert_eq!(regex.pattern, "^a");
                assert_eq!(regex.options, "i");
            }
            other => panic!("expected a regular expression, got {:?}", other),
        }
    }

    #[test]
    fn test_or_branches_are_translated() {
        let filter =
            fix_pattern_filters(Some(&json!({ "$or": [ { "a": 1 }, { "b": "x" } ] }))).unwrap();
        let query = filter_to_bson(&filter).unwrap();

        let branches = query.get_array("$or").unwrap();
        assert_eq!(branches.len(), 2);
    }

    #[test]
    fn test_projection_and_sort() {
        let projection = projection_to_bson(&Projection::new().with("a", true).with("_id", false));
        assert_eq!(projection, doc! { "a": 1, "_id": 0 });

        let locked = Projection::new().with("name", true).with("password", false);
        assert_eq!(projection_to_bson(&locked), doc! { "name": 1 });

        let sort = sort_to_bson(&SortSpec::new().with("age", SortDirection::Descending));
        assert_eq!(sort, doc! { "age": -1 });
    }

    #[test]
    fn test_replacement_detection() {
        let replacement = json!({ "name": "x" }).as_object().cloned().unwrap();
        let set = json!({ "$set": { "name": "x" } });
        let modifiers = set.as_object().cloned().unwrap();
        assert!(is_replacement(&replacement));
        assert!(!is_replacement(&modifiers));
    }
}
