// Error types for fake objects

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FakeError {
    #[error("Strict fake {type_name}: call to unconfigured member `{member}`")]
    StrictCall {
        type_name: &'static str,
        member: String,
    },

    #[error("Fake {type_name}: member `{member}` is configured to return {configured}, not {expected}")]
    ReturnType {
        type_name: &'static str,
        member: String,
        configured: &'static str,
        expected: &'static str,
    },

    #[error("Fake {type_name}: member `{member}` failed: {message}")]
    Thrown {
        type_name: &'static str,
        member: String,
        message: String,
    },
}

impl FakeError {
    /// Check if this error came from a strict fake's unconfigured member
    pub fn is_strict_call(&self) -> bool {
        matches!(self, FakeError::StrictCall { .. })
    }

    /// The member the failing call was made to
    pub fn member(&self) -> &str {
        match self {
            FakeError::StrictCall { member, .. }
            | FakeError::ReturnType { member, .. }
            | FakeError::Thrown { member, .. } => member,
        }
    }
}
