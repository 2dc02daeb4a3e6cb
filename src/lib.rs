//! Auto-faking test sessions for the Armature DI container.
//!
//! An [`AutoFake`] session resolves any service. Registered services resolve
//! normally; an interface or abstract type nobody registered is answered by a
//! fake from [`FallbackFakeProvider`]. Tests replace single dependencies with
//! [`AutoFake::provide`] or [`AutoFake::provide_instance`], each of which
//! opens an override scope on top of the previous one.
//!
//! ## Quick Start
//!
//! ```
//! use armature_autofake::*;
//! use std::sync::Arc;
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
//! fakeable!(dyn Mailer => MailerFake);
//!
//! struct Signup {
//!     mailer: Arc<dyn Mailer>,
//! }
//!
//! impl Construct for Signup {
//!     fn construct(ctx: &mut ResolveContext<'_>) -> Result<Self> {
//!         Ok(Signup { mailer: ctx.resolve()? })
//!     }
//! }
//!
//! service!(Signup);
//!
//! let session = AutoFake::builder()
//!     .configure_fake(|fake| {
//!         fake.call_to("send").returns(true);
//!         Ok(())
//!     })
//!     .build()?;
//!
//! let signup = session.resolve::<Signup>()?;
//! assert!(signup.mailer.send("ada@example.com"));
//! # Ok::<(), armature_autofake::Error>(())
//! ```

pub mod fallback;
pub mod session;

pub use fallback::{FakeCustomization, FakePolicy, FallbackFakeProvider};
pub use session::{AutoFake, AutoFakeBuilder};

// Re-export the container and fake APIs tests need alongside a session
pub use armature_di::{
    Construct, Container, ContainerBuilder, Error, Fakeable, Lifetime, Parameter, Parameters,
    Registrar, ResolveContext, Resolvable, Result, ScopeId, Service, ServiceType, Startable,
    TypeShape, Upcast, fakeable, logging, service, upcast,
};
pub use armature_fake::{
    CallConfiguration, DefaultFakeEngine, Fake, FakeEngine, FakeError, FakeOption,
    RecordingFakeEngine,
};
