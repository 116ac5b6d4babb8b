//! Resource configuration loading and resolution
//!
//! Callers describe a resource with a partial [`ResourceOptions`] value (from
//! code, YAML or JSON). [`ResourceConfig::resolve`] merges it with the
//! built-in defaults exactly once and produces the immutable configuration the
//! routes are built from.

pub mod hooks;

use crate::core::error::ConfigError;
use crate::core::query::Projection;
use crate::core::request::RestRequest;
use crate::core::response::HookResponse;
use crate::core::{Outcome, RestError};
use hooks::{ErrorHook, SuccessHook, ValidateHook};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::sync::Arc;
use validator::Validate;

/// HTTP verb a resource can expose
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Method {
    #[serde(alias = "GET")]
    Get,
    #[serde(alias = "POST")]
    Post,
    #[serde(alias = "PUT")]
    Put,
    #[serde(alias = "DELETE")]
    Delete,
}

impl Method {
    /// Every supported verb, in canonical order
    pub const ALL: [Method; 4] = [Method::Get, Method::Post, Method::Put, Method::Delete];

    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "get",
            Method::Post => "post",
            Method::Put => "put",
            Method::Delete => "delete",
        }
    }

    /// Whether the encoded payload travels in the request body
    pub fn carries_body(&self) -> bool {
        matches!(self, Method::Post | Method::Put)
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Hook overrides supplied by the caller; unset slots fall back to defaults
#[derive(Clone, Default)]
pub struct HookOverrides {
    pub validate: Option<ValidateHook>,
    pub success: Option<SuccessHook>,
    pub error: Option<ErrorHook>,
    pub internal_error: Option<ErrorHook>,
}

impl fmt::Debug for HookOverrides {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HookOverrides")
            .field("validate", &self.validate.is_some())
            .field("success", &self.success.is_some())
            .field("error", &self.error.is_some())
            .field("internal_error", &self.internal_error.is_some())
            .finish()
    }
}

/// Caller-supplied, possibly partial, resource configuration
///
/// # Example
///
/// ```yaml
/// methods: [get, post]
/// projection:
///   password: 0
/// limit: 50
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct ResourceOptions {
    /// Verbs to expose (all four when unset)
    #[validate(length(min = 1))]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub methods: Option<Vec<Method>>,

    /// Server-side projection; overrides the client on overlapping fields
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub projection: Option<Projection>,

    /// Ceiling on the number of documents a read returns
    #[validate(range(min = 1))]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit: Option<u64>,

    #[serde(skip)]
    pub hooks: HookOverrides,
}

impl ResourceOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load options from a YAML string
    pub fn from_yaml_str(yaml: &str) -> Result<Self, ConfigError> {
        let options: Self = serde_yaml::from_str(yaml).map_err(|e| ConfigError::Parse {
            message: e.to_string(),
        })?;
        options.validate()?;
        Ok(options)
    }

    /// Load options from a YAML file
    pub fn from_yaml_file(path: &str) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_string(),
            source,
        })?;
        Self::from_yaml_str(&content)
    }

    /// Load options from an already decoded JSON value
    pub fn from_json_value(value: Value) -> Result<Self, ConfigError> {
        if !value.is_object() {
            return Err(ConfigError::Parse {
                message: "resource options must be an object".to_string(),
            });
        }
        let options: Self = serde_json::from_value(value).map_err(|e| ConfigError::Parse {
            message: e.to_string(),
        })?;
        options.validate()?;
        Ok(options)
    }

    pub fn with_methods(mut self, methods: impl IntoIterator<Item = Method>) -> Self {
        self.methods = Some(methods.into_iter().collect());
        self
    }

    pub fn with_projection(mut self, projection: Projection) -> Self {
        self.projection = Some(projection);
        self
    }

    pub fn with_limit(mut self, limit: u64) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Replace the `validate` hook
    pub fn with_validate_hook(
        mut self,
        hook: impl Fn(Method, &mut RestRequest, &mut HookResponse) -> anyhow::Result<bool>
        + Send
        + Sync
        + 'static,
    ) -> Self {
        self.hooks.validate = Some(Arc::new(hook));
        self
    }

    /// Replace the `success` hook
    pub fn with_success_hook(
        mut self,
        hook: impl Fn(Method, &Outcome, &RestRequest, &mut HookResponse) + Send + Sync + 'static,
    ) -> Self {
        self.hooks.success = Some(Arc::new(hook));
        self
    }

    /// Replace the `error` hook (store failures)
    pub fn with_error_hook(
        mut self,
        hook: impl Fn(Method, &RestError, &RestRequest, &mut HookResponse) + Send + Sync + 'static,
    ) -> Self {
        self.hooks.error = Some(Arc::new(hook));
        self
    }

    /// Replace the `internalError` hook (decode, query building and hook failures)
    pub fn with_internal_error_hook(
        mut self,
        hook: impl Fn(Method, &RestError, &RestRequest, &mut HookResponse) + Send + Sync + 'static,
    ) -> Self {
        self.hooks.internal_error = Some(Arc::new(hook));
        self
    }
}

/// The four hooks every request flows through
#[derive(Clone)]
pub struct Hooks {
    pub validate: ValidateHook,
    pub success: SuccessHook,
    pub error: ErrorHook,
    pub internal_error: ErrorHook,
}

impl Hooks {
    /// Built-in hooks; `debug` selects verbose error bodies and logging
    pub fn defaults(debug: bool) -> Self {
        Self {
            validate: Arc::new(hooks::accept_json(debug)),
            success: Arc::new(hooks::respond_data(debug)),
            error: Arc::new(hooks::respond_error(debug)),
            internal_error: Arc::new(hooks::respond_error(debug)),
        }
    }

    fn merge(overrides: HookOverrides, debug: bool) -> Self {
        let defaults = Self::defaults(debug);
        Self {
            validate: overrides.validate.unwrap_or(defaults.validate),
            success: overrides.success.unwrap_or(defaults.success),
            error: overrides.error.unwrap_or(defaults.error),
            internal_error: overrides.internal_error.unwrap_or(defaults.internal_error),
        }
    }
}

impl fmt::Debug for Hooks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Hooks").finish_non_exhaustive()
    }
}

/// Effective, immutable configuration of one resource
#[derive(Debug, Clone)]
pub struct ResourceConfig {
    methods: Vec<Method>,
    projection: Option<Projection>,
    limit: Option<u64>,
    hooks: Hooks,
    debug: bool,
}

impl ResourceConfig {
    /// All defaults: every verb, no projection, no limit, built-in hooks
    pub fn defaults(debug: bool) -> Self {
        Self {
            methods: Method::ALL.to_vec(),
            projection: None,
            limit: None,
            hooks: Hooks::defaults(debug),
            debug,
        }
    }

    /// Merge caller options with the defaults
    ///
    /// Invalid options are discarded as a whole; nothing from them is kept.
    pub fn resolve(options: Option<ResourceOptions>, debug: bool) -> Self {
        let Some(options) = options else {
            return Self::defaults(debug);
        };

        if let Err(errors) = options.validate() {
            tracing::warn!(%errors, "discarding invalid resource options, using defaults");
            return Self::defaults(debug);
        }

        let methods = match options.methods {
            Some(methods) => canonical_methods(methods),
            None => Method::ALL.to_vec(),
        };

        Self {
            methods,
            projection: options.projection,
            limit: options.limit,
            hooks: Hooks::merge(options.hooks, debug),
            debug,
        }
    }

    /// Resolve from an untyped value; anything but a well-formed object yields the defaults
    pub fn resolve_value(value: Option<&Value>, debug: bool) -> Self {
        let Some(value) = value else {
            return Self::defaults(debug);
        };

        match ResourceOptions::from_json_value(value.clone()) {
            Ok(options) => Self::resolve(Some(options), debug),
            Err(err) => {
                tracing::warn!(
                    error = %err,
                    "discarding malformed resource options, using defaults"
                );
                Self::defaults(debug)
            }
        }
    }

    pub fn methods(&self) -> &[Method] {
        &self.methods
    }

    pub fn allows(&self, method: Method) -> bool {
        self.methods.contains(&method)
    }

    pub fn projection(&self) -> Option<&Projection> {
        self.projection.as_ref()
    }

    pub fn limit(&self) -> Option<u64> {
        self.limit
    }

    pub fn hooks(&self) -> &Hooks {
        &self.hooks
    }

    pub fn debug(&self) -> bool {
        self.debug
    }
}

/// Deduplicate and order as get, post, put, delete
fn canonical_methods(mut methods: Vec<Method>) -> Vec<Method> {
    methods.sort();
    methods.dedup();
    methods
}
