// Fake creation: engines and creation-time options

use crate::{Fake, FakeOption};
use parking_lot::Mutex;
use std::sync::Arc;
use tracing::{debug, trace};

/// Produces the interception handle for a new fake
pub trait FakeEngine: Send + Sync {
    fn create(&self, type_name: &'static str) -> Fake;
}

/// Engine handing out fresh lenient fakes
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultFakeEngine;

impl FakeEngine for DefaultFakeEngine {
    fn create(&self, type_name: &'static str) -> Fake {
        Fake::new(type_name)
    }
}

/// Engine wrapper that keeps every fake it created
#[derive(Clone)]
pub struct RecordingFakeEngine {
    inner: Arc<dyn FakeEngine>,
    created: Arc<Mutex<Vec<Fake>>>,
}

impl RecordingFakeEngine {
    /// Record fakes made by the default engine
    pub fn new() -> Self {
        Self::wrap(Arc::new(DefaultFakeEngine))
    }

    /// Record fakes made by another engine
    pub fn wrap(inner: Arc<dyn FakeEngine>) -> Self {
        Self {
            inner,
            created: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Handles of every created fake, in creation order
    pub fn created(&self) -> Vec<Fake> {
        self.created.lock().clone()
    }

    /// Type names of every created fake, in creation order
    pub fn created_types(&self) -> Vec<&'static str> {
        self.created.lock().iter().map(Fake::type_name).collect()
    }

    pub fn created_count(&self) -> usize {
        self.created.lock().len()
    }

    /// Number of fakes created for the named type
    pub fn count_for(&self, type_name: &str) -> usize {
        self.created
            .lock()
            .iter()
            .filter(|fake| fake.type_name() == type_name)
            .count()
    }
}

impl Default for RecordingFakeEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl FakeEngine for RecordingFakeEngine {
    fn create(&self, type_name: &'static str) -> Fake {
        let fake = self.inner.create(type_name);
        self.created.lock().push(fake.clone());
        fake
    }
}

/// Creation-time options for a fake, applied in call order
pub struct FakeOptions<'a> {
    fake: &'a Fake,
}

impl<'a> FakeOptions<'a> {
    pub fn new(fake: &'a Fake) -> Self {
        Self { fake }
    }

    /// The fake being configured
    pub fn fake(&self) -> &Fake {
        self.fake
    }

    /// Make unconfigured members fail
    pub fn mark_strict(&mut self) -> &mut Self {
        self.fake.set_strict();
        self.fake.record_option(FakeOption::Strict);
        self
    }

    /// Run a customization callback against the new fake.
    ///
    /// The callback's error is returned as-is.
    pub fn apply_customization<F, E>(&mut self, customize: F) -> Result<&mut Self, E>
    where
        F: FnOnce(&Fake) -> Result<(), E>,
    {
        self.fake.record_option(FakeOption::Customization);
        customize(self.fake)?;
        Ok(self)
    }

    /// Run base bodies for every member that has one
    pub fn delegate_to_base_methods(&mut self) -> &mut Self {
        self.fake.set_calls_base_methods();
        self.fake.record_option(FakeOption::CallsBaseMethods);
        self
    }
}

/// Create a fake through `engine`.
///
/// `build` wraps the new handle into the faked type, then `configure` applies
/// creation options. Any error from `configure` is returned unchanged and
/// the half-built fake is dropped.
pub fn create_fake<T, E, B, C>(
    engine: &dyn FakeEngine,
    type_name: &'static str,
    build: B,
    configure: C,
) -> Result<T, E>
where
    B: FnOnce(Fake) -> T,
    C: FnOnce(&mut FakeOptions<'_>) -> Result<(), E>,
{
    trace!(fake = type_name, "Creating fake");
    let fake = engine.create(type_name);
    let instance = build(fake.clone());
    configure(&mut FakeOptions::new(&fake))?;
    debug!(
        fake = type_name,
        strict = fake.is_strict(),
        calls_base_methods = fake.calls_base_methods(),
        "Fake created"
    );
    Ok(instance)
}
