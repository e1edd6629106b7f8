use thiserror::Error;

/// Structured error context for better error handling and debugging.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorContext {
    /// Field path or configuration key that caused the error (e.g., "request.model", "LLM_CACHE_TTL_SECS")
    pub field_path: Option<String>,
    /// Additional context about the error (e.g., expected type, actual value)
    pub details: Option<String>,
    /// Source of the error (e.g., "key_deriver", "config_loader")
    pub source: Option<String>,
}

impl ErrorContext {
    pub fn new() -> Self {
        Self {
            field_path: None,
            details: None,
            source: None,
        }
    }

    pub fn with_field_path(mut self, path: impl Into<String>) -> Self {
        self.field_path = Some(path.into());
        self
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }
}

impl Default for ErrorContext {
    fn default() -> Self {
        Self::new()
    }
}

/// Unified error type for the cache runtime.
///
/// Shared-tier failures are reported through [`Error::SharedStore`] by store
/// implementations, but never escape the coordinator: the shared tier wrapper
/// logs and degrades them.
#[derive(Debug, Error)]
pub enum Error {
    #[error("Configuration error: {message}{}", format_context(.context))]
    Configuration {
        message: String,
        context: ErrorContext,
    },

    #[error("Validation error: {message}{}", format_context(.context))]
    Validation {
        message: String,
        context: ErrorContext,
    },

    /// Failure of the wrapped model call, for closures passed to
    /// [`crate::CacheInterceptor::execute`].
    #[error("Runtime error: {message}{}", format_context(.context))]
    Runtime {
        message: String,
        context: ErrorContext,
    },

    #[error("Shared store error ({backend}): {message}")]
    SharedStore {
        backend: &'static str,
        message: String,
    },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

// Helper function to format error context for display
fn format_context(ctx: &ErrorContext) -> String {
    let mut parts = Vec::new();
    if let Some(ref field) = ctx.field_path {
        parts.push(format!("field: {}", field));
    }
    if let Some(ref details) = ctx.details {
        parts.push(format!("details: {}", details));
    }
    if let Some(ref source) = ctx.source {
        parts.push(format!("source: {}", source));
    }
    if parts.is_empty() {
        String::new()
    } else {
        format!(" ({})", parts.join(", "))
    }
}

impl Error {
    /// Create a new runtime error with structured context
    pub fn runtime_with_context(msg: impl Into<String>, context: ErrorContext) -> Self {
        Error::Runtime {
            message: msg.into(),
            context,
        }
    }

    /// Create a new validation error with structured context
    pub fn validation_with_context(msg: impl Into<String>, context: ErrorContext) -> Self {
        Error::Validation {
            message: msg.into(),
            context,
        }
    }

    /// Create a new configuration error with structured context
    pub fn configuration_with_context(msg: impl Into<String>, context: ErrorContext) -> Self {
        Error::Configuration {
            message: msg.into(),
            context,
        }
    }

    /// Create a shared store error tagged with the backend name
    pub fn shared_store(backend: &'static str, msg: impl Into<String>) -> Self {
        Error::SharedStore {
            backend,
            message: msg.into(),
        }
    }

    /// Extract error context if available
    pub fn context(&self) -> Option<&ErrorContext> {
        match self {
            Error::Configuration { context, .. }
            | Error::Validation { context, .. }
            | Error::Runtime { context, .. } => Some(context),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_context_is_rendered_in_display() {
        let err = Error::validation_with_context(
            "model identifier is empty",
            ErrorContext::new()
                .with_field_path("request.model")
                .with_source("key_deriver"),
        );
        let msg = err.to_string();
        assert!(msg.starts_with("Validation error: model identifier is empty"));
        assert!(msg.contains("field: request.model"));
        assert!(msg.contains("source: key_deriver"));
        assert_eq!(
            err.context().and_then(|c| c.field_path.as_deref()),
            Some("request.model")
        );
    }

    #[test]
    fn test_shared_store_error_has_no_context() {
        let err = Error::shared_store("redis", "connection refused");
        assert_eq!(
            err.to_string(),
            "Shared store error (redis): connection refused"
        );
        assert!(err.context().is_none());
    }

    #[test]
    fn test_serde_errors_convert() {
        fn parse(raw: &str) -> Result<serde_json::Value, Error> {
            Ok(serde_json::from_str(raw)?)
        }
        let err = parse("{").unwrap_err();
        assert!(matches!(err, Error::Serialization(_)));
        assert!(err.context().is_none());
    }

    #[test]
    fn test_runtime_error_for_model_failures() {
        let err = Error::runtime_with_context(
            "model call failed",
            ErrorContext::new().with_source("model"),
        );
        assert!(err.to_string().starts_with("Runtime error: model call failed"));
        assert_eq!(err.context().and_then(|c| c.source.as_deref()), Some("model"));
    }
}
