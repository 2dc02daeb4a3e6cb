// Scoped dependency injection container for the Armature test tooling
// Registrations live in nested lifetime scopes; registration sources answer
// requests nothing else can

pub mod container;
pub mod context;
pub mod error;
pub mod logging;
pub mod parameter;
pub mod registration;
pub mod service;

// Re-export commonly used types
pub use armature_fake::Fake;
pub use container::*;
pub use context::*;
pub use error::*;
pub use parameter::*;
pub use registration::*;
pub use service::*;
