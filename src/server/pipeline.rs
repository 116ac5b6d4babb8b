//! The per-request hook pipeline
//!
//! ```text
//! Registered → Translating → Validating → Dispatching → Succeeded | StoreFailed
//!                  │              ├─ false ─→ Rejected
//!                  └──── error ───┴─────────→ InternalFailed
//! ```
//!
//! Each run ends in exactly one terminal state, and exactly one hook writes
//! the response for it. Store failures that surface after the await are
//! routed through the same error hooks as failures found before it.

use crate::config::{Method, ResourceConfig};
use crate::core::collection::Collection;
use crate::core::dispatch::dispatch;
use crate::core::error::{ErrorEnvelope, InternalError, RestError};
use crate::core::request::{RawRequest, RestRequest, translate};
use crate::core::response::HookResponse;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use std::fmt;
use std::sync::Arc;

/// Where a request is in the pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineState {
    Registered,
    Translating,
    Validating,
    Dispatching,
    Succeeded,
    Rejected,
    StoreFailed,
    InternalFailed,
}

impl PipelineState {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            PipelineState::Succeeded
                | PipelineState::Rejected
                | PipelineState::StoreFailed
                | PipelineState::InternalFailed
        )
    }
}

/// The result of running one request through the pipeline
#[derive(Debug)]
pub struct PipelineRun {
    pub state: PipelineState,
    pub request: RestRequest,
    pub response: HookResponse,
}

/// Runs requests against one collection with one effective configuration
#[derive(Clone)]
pub struct HookPipeline {
    config: Arc<ResourceConfig>,
    collection: Arc<dyn Collection>,
}

impl fmt::Debug for HookPipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HookPipeline")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl HookPipeline {
    pub fn new(config: Arc<ResourceConfig>, collection: Arc<dyn Collection>) -> Self {
        Self { config, collection }
    }

    pub fn config(&self) -> &ResourceConfig {
        &self.config
    }

    pub fn collection(&self) -> Arc<dyn Collection> {
        self.collection.clone()
    }

    /// Run `raw` through translate, validate, dispatch and the response hooks
    pub async fn run(&self, method: Method, raw: RawRequest) -> PipelineRun {
        let mut run = PipelineRun {
            state: PipelineState::Registered,
            request: RestRequest::new(method, raw.headers.clone()),
            response: HookResponse::new(),
        };

        run.enter(PipelineState::Translating);
        match translate(method, &raw) {
            Ok(command) => run.request.command = Some(command),
            Err(err) => return self.internal_failure(run, err),
        }

        run.enter(PipelineState::Validating);
        let hooks = self.config.hooks();
        match (hooks.validate)(method, &mut run.request, &mut run.response) {
            Ok(true) => {}
            Ok(false) => {
                if !run.response.is_ended() {
                    // A silent rejection still answers as one
                    if run.response.status_code().is_success() {
                        run.response.status(StatusCode::BAD_REQUEST);
                    }
                    let envelope = ErrorEnvelope::rejected(self.config.debug());
                    run.response.json(envelope);
                }
                run.enter(PipelineState::Rejected);
                return run;
            }
            Err(err) => return self.internal_failure(run, InternalError::Hook(err)),
        }

        run.enter(PipelineState::Dispatching);
        let Some(command) = run.request.command() else {
            return self.internal_failure(
                run,
                InternalError::InvalidArgument {
                    argument: "command".to_string(),
                    message: "removed by the validate hook".to_string(),
                },
            );
        };

        match dispatch(self.collection.as_ref(), &self.config, command).await {
            Ok(outcome) => {
                (hooks.success)(method, &outcome, &run.request, &mut run.response);
                run.enter(PipelineState::Succeeded);
            }
            Err(err @ RestError::Store(_)) => {
                (hooks.error)(method, &err, &run.request, &mut run.response);
                run.enter(PipelineState::StoreFailed);
            }
            Err(err @ RestError::Internal(_)) => {
                (hooks.internal_error)(method, &err, &run.request, &mut run.response);
                run.enter(PipelineState::InternalFailed);
            }
        }

        run
    }

    /// Run the pipeline and turn whatever the hooks wrote into a response
    pub async fn handle(&self, method: Method, raw: RawRequest) -> Response {
        self.run(method, raw).await.response.into_response()
    }

    fn internal_failure(&self, mut run: PipelineRun, err: InternalError) -> PipelineRun {
        let err = RestError::Internal(err);
        let method = run.request.method;
        (self.config.hooks().internal_error)(method, &err, &run.request, &mut run.response);
        run.enter(PipelineState::InternalFailed);
        run
    }
}

impl PipelineRun {
    fn enter(&mut self, state: PipelineState) {
        tracing::debug!(method = %self.request.method, from = ?self.state, to = ?state, "pipeline");
        self.state = state;
    }
}
