// Error types for the dependency injection container

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Unable to resolve {service}: {reason}")]
    Resolution { service: String, reason: String },

    #[error("Circular dependency detected: {0}")]
    CircularDependency(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Lifetime scope has been disposed: {0}")]
    ScopeDisposed(String),

    #[error("Session has been disposed")]
    Disposed,

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Logging initialization error: {0}")]
    Logging(String),
}

impl Error {
    /// Build a resolution error for the named service
    pub fn resolution(service: impl Into<String>, reason: impl Into<String>) -> Self {
        Error::Resolution {
            service: service.into(),
            reason: reason.into(),
        }
    }

    /// Check if this error means a service could not be satisfied
    pub fn is_resolution_error(&self) -> bool {
        matches!(
            self,
            Error::Resolution { .. } | Error::CircularDependency(_)
        )
    }

    /// Check if this error comes from using something after teardown
    pub fn is_disposed(&self) -> bool {
        matches!(self, Error::ScopeDisposed(_) | Error::Disposed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolution_message_names_service() {
        let err = Error::resolution("app::Config", "no registration");
        assert_eq!(err.to_string(), "Unable to resolve app::Config: no registration");
        assert!(err.is_resolution_error());
        assert!(!err.is_disposed());
    }

    #[test]
    fn test_disposed_predicates() {
        assert!(Error::Disposed.is_disposed());
        assert!(Error::ScopeDisposed("scope#1".into()).is_disposed());
        assert!(!Error::InvalidArgument("key".into()).is_disposed());
    }
}
