//! The document collection a resource wraps
//!
//! Implement [`Collection`] to expose a store through the REST adapter. The
//! adapter never touches storage itself; it only calls these operations and
//! reports their results through the hooks.

use crate::core::error::StoreResult;
use crate::core::filter::Filter;
use crate::core::query::{Projection, SortSpec};
use async_trait::async_trait;
use serde_json::{Map, Value};

/// A stored document
pub type Document = Map<String, Value>;

/// Field holding a document's identifier
pub const ID_FIELD: &str = "_id";

/// A lazily-configured read
///
/// # Example
/// ```rust,ignore
/// let cursor = Cursor::new(filter, None).skip(20).limit(10).sort(sort);
/// let docs = collection.find(cursor).await?;
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Cursor {
    pub filter: Filter,
    pub projection: Option<Projection>,
    pub skip: Option<u64>,
    pub limit: Option<u64>,
    pub sort: Option<SortSpec>,
}

impl Cursor {
    pub fn new(filter: Filter, projection: Option<Projection>) -> Self {
        Self {
            filter,
            projection,
            ..Self::default()
        }
    }

    pub fn skip(mut self, skip: u64) -> Self {
        self.skip = Some(skip);
        self
    }

    pub fn limit(mut self, limit: u64) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn sort(mut self, sort: SortSpec) -> Self {
        self.sort = Some(sort);
        self
    }
}

/// Options of an update
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UpdateOptions {
    /// Insert a document when nothing matches
    pub upsert: bool,
    /// Update every match instead of the first
    pub multi: bool,
}

/// Options of a removal
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RemoveOptions {
    /// Remove every match instead of the first
    pub multi: bool,
}

/// Result of an update
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UpdateResult {
    /// Number of documents matched (or inserted by an upsert)
    pub count: u64,
    /// The inserted document when the update turned into an insert
    pub upserted: Option<Document>,
}

/// A document collection
///
/// All operations are asynchronous and report failures as values; nothing is
/// expected to panic across the await point.
#[async_trait]
pub trait Collection: Send + Sync {
    /// Count documents matching `filter`
    async fn count(&self, filter: &Filter) -> StoreResult<u64>;

    /// Run a read
    async fn find(&self, cursor: Cursor) -> StoreResult<Vec<Document>>;

    /// Insert one document, returning it with its generated `_id`
    async fn insert(&self, document: Document) -> StoreResult<Document>;

    /// Apply `update` (modifiers or a replacement) to matching documents
    async fn update(
        &self,
        filter: &Filter,
        update: &Document,
        options: UpdateOptions,
    ) -> StoreResult<UpdateResult>;

    /// Remove matching documents, returning how many were removed
    async fn remove(&self, filter: &Filter, options: RemoveOptions) -> StoreResult<u64>;
}
