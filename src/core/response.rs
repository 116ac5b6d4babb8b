//! The response object hooks write to
//!
//! A [`HookResponse`] accumulates status, headers and a JSON body. Writing a
//! body ends the response; later writes are ignored so that a request never
//! produces more than one response.

use axum::Json;
use axum::http::{HeaderMap, HeaderName, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use serde_json::Value;

#[derive(Debug, Clone)]
pub struct HookResponse {
    status: StatusCode,
    headers: HeaderMap,
    body: Option<Value>,
    ended: bool,
}

impl HookResponse {
    pub fn new() -> Self {
        Self {
            status: StatusCode::OK,
            headers: HeaderMap::new(),
            body: None,
            ended: false,
        }
    }

    /// Set the status code
    pub fn status(&mut self, status: StatusCode) -> &mut Self {
        if self.ended {
            tracing::warn!(%status, "status set after the response ended, ignoring");
        } else {
            self.status = status;
        }
        self
    }

    /// Add a response header
    pub fn header(&mut self, name: HeaderName, value: HeaderValue) -> &mut Self {
        if self.ended {
            tracing::warn!(header = %name, "header set after the response ended, ignoring");
        } else {
            self.headers.insert(name, value);
        }
        self
    }

    /// Write a JSON body and end the response
    pub fn json(&mut self, body: impl Serialize) -> &mut Self {
        if self.ended {
            tracing::warn!("response already sent, dropping second body");
            return self;
        }

        match serde_json::to_value(body) {
            Ok(value) => self.body = Some(value),
            Err(err) => {
                tracing::error!(error = %err, "failed to serialize response body");
                self.status = StatusCode::INTERNAL_SERVER_ERROR;
                self.body = Some(serde_json::json!({ "error": "internal error" }));
            }
        }
        self.ended = true;
        self
    }

    /// End the response without (further) body
    pub fn end(&mut self) {
        self.ended = true;
    }

    pub fn is_ended(&self) -> bool {
        self.ended
    }

    pub fn status_code(&self) -> StatusCode {
        self.status
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn body(&self) -> Option<&Value> {
        self.body.as_ref()
    }
}

impl Default for HookResponse {
    fn default() -> Self {
        Self::new()
    }
}

impl IntoResponse for HookResponse {
    fn into_response(self) -> Response {
        let mut response = match self.body {
            Some(body) => (self.status, Json(body)).into_response(),
            None => self.status.into_response(),
        };
        response.headers_mut().extend(self.headers);
        response
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_new_response_is_open() {
        let response = HookResponse::new();
        assert_eq!(response.status_code(), StatusCode::OK);
        assert!(response.body().is_none());
        assert!(!response.is_ended());
    }

    #[test]
    fn test_json_ends_response() {
        let mut response = HookResponse::new();
        response
            .status(StatusCode::CREATED)
            .json(json!({ "ok": true }));
        assert!(response.is_ended());
        assert_eq!(response.status_code(), StatusCode::CREATED);
        assert_eq!(response.body(), Some(&json!({ "ok": true })));
    }

    #[test]
    fn test_second_body_is_dropped() {
        let mut response = HookResponse::new();
        response.json(json!({ "first": 1 }));
        response
            .status(StatusCode::IM_A_TEAPOT)
            .json(json!({ "second": 2 }));
        assert_eq!(response.status_code(), StatusCode::OK);
        assert_eq!(response.body(), Some(&json!({ "first": 1 })));
    }

    #[test]
    fn test_into_response_keeps_status_and_headers() {
        let mut response = HookResponse::new();
        response
            .status(StatusCode::BAD_REQUEST)
            .header(
                HeaderName::from_static("x-resource"),
                HeaderValue::from_static("users"),
            )
            .json(json!({ "error": "bad request" }));

        let response = response.into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(response.headers()["x-resource"], "users");
    }
}
