//! Hook signatures and the built-in hooks
//!
//! Hooks are plain callbacks stored in the configuration. They receive the
//! verb, the request and a mutable [`HookResponse`] and are the only code
//! that writes a response body.

use super::Method;
use crate::core::error::{ErrorEnvelope, RestError};
use crate::core::outcome::{DataEnvelope, Outcome};
use crate::core::request::RestRequest;
use crate::core::response::HookResponse;
use anyhow::Result;
use axum::http::StatusCode;
use std::sync::Arc;

/// Decides whether a request proceeds to the store
///
/// Returning `Ok(false)` rejects the request; the hook is expected to have
/// written the rejection itself. An `Err` is treated as an internal failure.
pub type ValidateHook =
    Arc<dyn Fn(Method, &mut RestRequest, &mut HookResponse) -> Result<bool> + Send + Sync>;

/// Writes the response for a completed operation
pub type SuccessHook = Arc<dyn Fn(Method, &Outcome, &RestRequest, &mut HookResponse) + Send + Sync>;

/// Writes the response for a store or internal failure
pub type ErrorHook = Arc<dyn Fn(Method, &RestError, &RestRequest, &mut HookResponse) + Send + Sync>;

/// Default `validate`: accept only clients that accept JSON
pub fn accept_json(
    debug: bool,
) -> impl Fn(Method, &mut RestRequest, &mut HookResponse) -> Result<bool> + Send + Sync + Clone {
    move |method: Method, request: &mut RestRequest, response: &mut HookResponse| {
        if request.accepts_json() {
            if debug {
                tracing::debug!(%method, "validated");
            }
            return Ok(true);
        }

        if debug {
            tracing::debug!(%method, "validation error");
        }
        response
            .status(StatusCode::BAD_REQUEST)
            .json(ErrorEnvelope::rejected(debug));
        Ok(false)
    }
}

/// Default `success`: `{ "data": <outcome> }`
pub fn respond_data(
    debug: bool,
) -> impl Fn(Method, &Outcome, &RestRequest, &mut HookResponse) + Send + Sync + Clone {
    move |method: Method, outcome: &Outcome, _: &RestRequest, response: &mut HookResponse| {
        response.json(DataEnvelope { data: outcome });
        response.end();
        if debug {
            tracing::debug!(%method, ?outcome, "success");
        }
    }
}

/// Default `error` and `internalError`: generic 500, verbose in debug mode
pub fn respond_error(
    debug: bool,
) -> impl Fn(Method, &RestError, &RestRequest, &mut HookResponse) + Send + Sync + Clone {
    move |method: Method, err: &RestError, _: &RestRequest, response: &mut HookResponse| {
        response.status(err.status_code());
        if debug {
            tracing::debug!(%method, kind = %err.kind(), error = %err, "request failed");
            response.json(ErrorEnvelope::verbose(method, err));
        } else {
            response.json(ErrorEnvelope::generic());
        }
    }
}
