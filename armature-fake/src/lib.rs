//! Runtime fake objects for Armature tests.
//!
//! A fake is a hand-written struct implementing the faked trait whose
//! members forward to a [`Fake`] handle. The handle records calls, applies
//! configured behavior, enforces strict mode and, for members that have a
//! base body, can delegate to that body instead of intercepting the call.
//!
//! ## Features
//!
//! - **Lenient or strict** - unconfigured members return `Default` or fail
//! - **Configured members** - `returns`, `returns_with`, `throws`, `does_nothing`
//! - **Base delegation** - provided trait bodies run for real when enabled
//! - **Call recording** - `calls`, `call_count`, `was_called`
//! - **Engines** - [`FakeEngine`] hands out handles, [`RecordingFakeEngine`]
//!   keeps track of every fake it created
//!
//! ## Quick Start
//!
//! ```
//! use armature_fake::{create_fake, DefaultFakeEngine, Fake};
//!
//! trait Mailer: Send + Sync {
//!     fn send(&self, to: &str) -> bool;
//! }
//!
//! struct MailerFake(Fake);
//!
//! impl Mailer for MailerFake {
//!     fn send(&self, _to: &str) -> bool {
//!         self.0.invoke("send")
//!     }
//! }
//!
//! let mailer = create_fake(&DefaultFakeEngine, "dyn Mailer", MailerFake, |options| {
//!     options.mark_strict();
//!     options.apply_customization(|fake| {
//!         fake.call_to("send").returns(true);
//!         Ok::<_, String>(())
//!     })?;
//!     Ok::<_, String>(())
//! })
//! .unwrap();
//!
//! assert!(mailer.send("ops@example.com"));
//! assert_eq!(mailer.0.call_count("send"), 1);
//! ```

mod engine;
mod error;
mod fake;

pub use engine::{DefaultFakeEngine, FakeEngine, FakeOptions, RecordingFakeEngine, create_fake};
pub use error::FakeError;
pub use fake::{CallConfiguration, Fake, FakeOption};
