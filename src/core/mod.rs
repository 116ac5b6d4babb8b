//! Core module containing the request-to-query translation and the store boundary

pub mod collection;
pub mod dispatch;
pub mod error;
pub mod filter;
pub mod outcome;
pub mod query;
pub mod request;
pub mod response;

pub use collection::{Collection, Cursor, Document, RemoveOptions, UpdateOptions, UpdateResult};
pub use error::{ErrorEnvelope, ErrorKind, InternalError, RestError, StoreError, StoreResult};
pub use filter::{Condition, Filter, Operand, PATTERN_MARKER, Pattern, fix_pattern_filters};
pub use outcome::{Outcome, UpdateSummary};
pub use query::{Projection, ResolvedQuery, SortDirection, SortSpec};
pub use request::{Command, RawRequest, RestRequest};
pub use response::HookResponse;
