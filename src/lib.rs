//! # collection-rest
//!
//! Expose a document collection as a REST resource.
//!
//! Given a [`Collection`](core::Collection) and an optional configuration, the
//! crate builds an axum router answering `GET`, `POST`, `PUT` and `DELETE` on
//! the resource root. Every request runs through a hook pipeline:
//!
//! 1. the encoded `json` payload is decoded and pattern filters are compiled
//! 2. the `validate` hook accepts or rejects the request
//! 3. exactly one collection operation runs (count, find, insert, update, remove)
//! 4. the `success`, `error` or `internalError` hook writes the response
//!
//! ## Features
//!
//! - **Precedence rules**: the server limit is a ceiling the client may only
//!   lower; the server projection wins on fields both sides name
//! - **Native patterns**: `{ "name": { "$regex": "^a" } }` reaches the store as
//!   a compiled pattern, never as a literal string
//! - **Replaceable hooks**: override any of the four hooks, keep the defaults
//!   for the rest
//! - **Debug mode**: verbose error envelopes and hook logging
//! - **Backends**: an in-memory store, and MongoDB behind `mongodb_backend`
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use collection_rest::prelude::*;
//!
//! let people = InMemoryCollection::new();
//! let options = ResourceOptions::new()
//!     .with_methods([Method::Get, Method::Post])
//!     .with_limit(50);
//!
//! let app = Router::new().nest("/people", rest(people, Some(options), false));
//! ```

pub mod config;
pub mod core;
pub mod server;
pub mod storage;

pub use server::rest;

/// Re-exports of commonly used types and traits
pub mod prelude {
    // === Core ===
    pub use crate::core::{
        Collection, Command, Cursor, Document, ErrorEnvelope, ErrorKind, Filter, HookResponse,
        InternalError, Outcome, Projection, RawRequest, RemoveOptions, RestError, RestRequest,
        SortDirection, SortSpec, StoreError, StoreResult, UpdateOptions, UpdateResult,
        UpdateSummary, fix_pattern_filters,
    };

    // === Config ===
    pub use crate::config::{Method, ResourceConfig, ResourceOptions};

    // === Storage ===
    pub use crate::storage::InMemoryCollection;
    #[cfg(feature = "mongodb_backend")]
    pub use crate::storage::MongoCollection;

    // === Server ===
    pub use crate::server::{
        HookPipeline, PipelineState, ResourceRegistry, RestResource, ServerBuilder, rest,
    };

    // === External dependencies ===
    pub use anyhow::Result;
    pub use async_trait::async_trait;
    pub use serde::{Deserialize, Serialize};
    pub use serde_json::{Value, json};

    // === Axum ===
    pub use axum::Router;
}
