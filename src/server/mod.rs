//! Server module: exposing collections over HTTP
//!
//! - [`HookPipeline`] runs a request through translate, validate, dispatch
//!   and the response hooks
//! - [`build_resource_routes`] registers one handler per enabled verb
//! - [`RestResource`] ties a collection to its effective configuration
//! - [`ResourceRegistry`] and [`ServerBuilder`] mount resources and serve them

pub mod builder;
pub mod pipeline;
pub mod resource;
pub mod resource_registry;
pub mod router;

pub use builder::ServerBuilder;
pub use pipeline::{HookPipeline, PipelineRun, PipelineState};
pub use resource::{RestResource, rest};
pub use resource_registry::ResourceRegistry;
pub use router::build_resource_routes;
