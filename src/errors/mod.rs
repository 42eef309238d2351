//! Error handling for the aggregation pipeline and its HTTP surface.
//!
//! Every failure mode described by the pipeline (config load, fetch, document
//! parsing, path traversal, ...) is a variant of [`AggregatorError`]. Each
//! variant carries a `status_code()` so the HTTP layer never has to guess how
//! to report a failure.

/// Result type used throughout the crate.
pub type Result<T> = std::result::Result<T, AggregatorError>;

/// Alias kept for call sites that prefer the generic `Error` name.
pub type Error = AggregatorError;

/// Errors produced by the configuration reader, the aggregation pipeline, and
/// the HTTP handlers built on top of it.
#[derive(thiserror::Error, Debug)]
pub enum AggregatorError {
    /// Configuration failed to load or did not pass validation.
    #[error("configuration error: {message}")]
    Config {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// A value failed field-level validation.
    #[error("validation error: {message}")]
    Validation { message: String, field: Option<String> },

    /// A downstream service could not be reached, returned a non-2xx status,
    /// or timed out.
    #[error("fetch error for {url}: {message}")]
    Fetch { url: String, message: String, retryable: bool },

    /// A downstream document was fetched but could not be parsed as an
    /// OpenAPI document.
    #[error("malformed OpenAPI document from {source_url}: {message}")]
    MalformedDocument { source_url: String, message: String },

    /// The requested service (or named resource) does not exist.
    #[error("not found: {resource_type} '{id}'")]
    NotFound { resource_type: String, id: String },

    /// A resource already exists / a naming collision was detected.
    #[error("conflict: {message}")]
    Conflict { message: String },

    /// A request path attempted to escape the handler's base path.
    #[error("path traversal rejected: {path}")]
    PathTraversal { path: String },

    /// An operation exceeded its allotted time budget.
    #[error("operation timed out: {operation} after {duration_ms}ms")]
    Timeout { operation: String, duration_ms: u64 },

    /// A value could not be parsed or converted.
    #[error("parse error: {context}")]
    Parse {
        context: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Catch-all for unexpected internal failures.
    #[error("internal error: {message}")]
    Internal {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },
}

impl AggregatorError {
    pub fn config<S: Into<String>>(message: S) -> Self {
        Self::Config { message: message.into(), source: None }
    }

    pub fn config_with_source<S: Into<String>>(
        message: S,
        source: Box<dyn std::error::Error + Send + Sync>,
    ) -> Self {
        Self::Config { message: message.into(), source: Some(source) }
    }

    pub fn validation<S: Into<String>>(message: S) -> Self {
        Self::Validation { message: message.into(), field: None }
    }

    pub fn validation_field<S: Into<String>, F: Into<String>>(message: S, field: F) -> Self {
        Self::Validation { message: message.into(), field: Some(field.into()) }
    }

    pub fn fetch<U: Into<String>, S: Into<String>>(url: U, message: S, retryable: bool) -> Self {
        Self::Fetch { url: url.into(), message: message.into(), retryable }
    }

    pub fn malformed_document<U: Into<String>, S: Into<String>>(source_url: U, message: S) -> Self {
        Self::MalformedDocument { source_url: source_url.into(), message: message.into() }
    }

    pub fn not_found<R: Into<String>, I: Into<String>>(resource_type: R, id: I) -> Self {
        Self::NotFound { resource_type: resource_type.into(), id: id.into() }
    }

    pub fn conflict<S: Into<String>>(message: S) -> Self {
        Self::Conflict { message: message.into() }
    }

    pub fn path_traversal<S: Into<String>>(path: S) -> Self {
        Self::PathTraversal { path: path.into() }
    }

    pub fn timeout<S: Into<String>>(operation: S, duration_ms: u64) -> Self {
        Self::Timeout { operation: operation.into(), duration_ms }
    }

    pub fn parse<S: Into<String>>(context: S) -> Self {
        Self::Parse { context: context.into(), source: None }
    }

    pub fn parse_with_source<S: Into<String>>(
        context: S,
        source: Box<dyn std::error::Error + Send + Sync>,
    ) -> Self {
        Self::Parse { context: context.into(), source: Some(source) }
    }

    pub fn internal<S: Into<String>>(message: S) -> Self {
        Self::Internal { message: message.into(), source: None }
    }

    pub fn internal_with_source<S: Into<String>>(
        message: S,
        source: Box<dyn std::error::Error + Send + Sync>,
    ) -> Self {
        Self::Internal { message: message.into(), source: Some(source) }
    }

    /// HTTP status code this error should be reported as.
    pub fn status_code(&self) -> u16 {
        match self {
            AggregatorError::Config { .. } => 500,
            AggregatorError::Validation { .. } => 400,
            AggregatorError::Fetch { .. } => 502,
            AggregatorError::MalformedDocument { .. } => 502,
            AggregatorError::NotFound { .. } => 404,
            AggregatorError::Conflict { .. } => 409,
            AggregatorError::PathTraversal { .. } => 400,
            AggregatorError::Timeout { .. } => 504,
            AggregatorError::Parse { .. } => 400,
            AggregatorError::Internal { .. } => 500,
        }
    }

    /// Whether the condition that produced this error is likely transient.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            AggregatorError::Fetch { retryable: true, .. } | AggregatorError::Timeout { .. }
        )
    }
}

impl From<config::ConfigError> for AggregatorError {
    fn from(error: config::ConfigError) -> Self {
        Self::config_with_source("failed to load configuration", Box::new(error))
    }
}

impl From<validator::ValidationErrors> for AggregatorError {
    fn from(errors: validator::ValidationErrors) -> Self {
        let message = errors
            .field_errors()
            .iter()
            .map(|(field, field_errors)| {
                let messages: Vec<String> = field_errors
                    .iter()
                    .map(|e| e.message.as_ref().map_or("invalid value".to_string(), |m| m.to_string()))
                    .collect();
                format!("{}: {}", field, messages.join(", "))
            })
            .collect::<Vec<_>>()
            .join("; ");

        Self::validation(message)
    }
}

impl From<serde_json::Error> for AggregatorError {
    fn from(error: serde_json::Error) -> Self {
        Self::parse_with_source("JSON parsing failed", Box::new(error))
    }
}

impl From<serde_yaml::Error> for AggregatorError {
    fn from(error: serde_yaml::Error) -> Self {
        Self::parse_with_source("YAML parsing failed", Box::new(error))
    }
}

impl From<url::ParseError> for AggregatorError {
    fn from(error: url::ParseError) -> Self {
        Self::parse_with_source("URL parsing failed", Box::new(error))
    }
}
