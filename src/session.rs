// Auto-faking test session: fallback fakes plus a stack of override scopes

use crate::fallback::{FakePolicy, FallbackFakeProvider};
use armature_di::{
    Construct, Container, ContainerBuilder, Error, Fake, Parameters, Registrar, Resolvable,
    Result, ScopeId, Upcast,
};
use armature_fake::{DefaultFakeEngine, FakeEngine};
use std::any::type_name;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use tracing::{debug, trace, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SessionState {
    Active,
    Disposed,
}

/// Options for an [`AutoFake`] session
pub struct AutoFakeBuilder {
    policy: FakePolicy,
    container_builder: ContainerBuilder,
    configure: Option<Box<dyn FnOnce(&mut ContainerBuilder)>>,
    engine: Arc<dyn FakeEngine>,
}

impl AutoFakeBuilder {
    pub fn new() -> Self {
        Self {
            policy: FakePolicy::default(),
            container_builder: ContainerBuilder::new(),
            configure: None,
            engine: Arc::new(DefaultFakeEngine),
        }
    }

    /// Make fallback fakes fail on unconfigured members
    pub fn strict(mut self, strict: bool) -> Self {
        self.policy.strict = strict;
        self
    }

    /// Let fallback fakes run provided trait bodies
    pub fn calls_base_methods(mut self, calls_base_methods: bool) -> Self {
        self.policy.calls_base_methods = calls_base_methods;
        self
    }

    /// Run `customize` on every fallback fake right after creation.
    ///
    /// An error returned by the callback fails the resolution that created
    /// the fake and is passed through unchanged.
    pub fn configure_fake<F>(mut self, customize: F) -> Self
    where
        F: Fn(&Fake) -> Result<()> + Send + Sync + 'static,
    {
        self.policy = self.policy.customize(customize);
        self
    }

    /// Start from a builder with registrations already made
    pub fn container_builder(mut self, builder: ContainerBuilder) -> Self {
        self.container_builder = builder;
        self
    }

    /// Add registrations after the fallback source is installed
    pub fn configure<F>(mut self, configure: F) -> Self
    where
        F: FnOnce(&mut ContainerBuilder) + 'static,
    {
        self.configure = Some(Box::new(configure));
        self
    }

    /// Create fakes through `engine` instead of the default engine
    pub fn fake_engine<E: FakeEngine + 'static>(mut self, engine: E) -> Self {
        self.engine = Arc::new(engine);
        self
    }

    pub fn build(self) -> Result<AutoFake> {
        let mut builder = self.container_builder;
        builder.register_source(FallbackFakeProvider::new(self.policy, self.engine));
        if let Some(configure) = self.configure {
            configure(&mut builder);
        }

        let container = builder.build()?;
        let root = container.begin_scope(container.root_scope(), |scope| {
            scope.tag("autofake");
        })?;
        debug!(scope = %root, "Auto-fake session created");

        Ok(AutoFake {
            container,
            root,
            overrides: Vec::new(),
            state: SessionState::Active,
        })
    }
}

impl Default for AutoFakeBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for AutoFakeBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AutoFakeBuilder")
            .field("policy", &self.policy)
            .field("container_builder", &self.container_builder)
            .field("configure", &self.configure.is_some())
            .finish()
    }
}

/// A test session that resolves anything.
///
/// Services with a registration resolve normally. Unregistered interfaces
/// and abstract types resolve to fakes, shared within the scope that created
/// them. Each `provide*` call opens a child scope that binds one service and
/// becomes the scope every later call resolves from; earlier bindings and
/// fakes stay reachable for everything the override does not shadow.
///
/// Dropping the session disposes it.
pub struct AutoFake {
    container: Container,
    root: ScopeId,
    overrides: Vec<ScopeId>,
    state: SessionState,
}

impl AutoFake {
    /// A lenient session with no registrations
    pub fn new() -> Result<Self> {
        AutoFakeBuilder::new().build()
    }

    /// Start configuring a session
    pub fn builder() -> AutoFakeBuilder {
        AutoFakeBuilder::new()
    }

    /// The container backing the session
    pub fn container(&self) -> &Container {
        &self.container
    }

    pub fn is_disposed(&self) -> bool {
        self.state == SessionState::Disposed
    }

    /// Number of override scopes opened by `provide*`
    pub fn scope_depth(&self) -> usize {
        self.overrides.len()
    }

    /// The scope resolutions are served from
    pub fn current_scope(&self) -> Result<ScopeId> {
        if self.is_disposed() {
            return Err(Error::Disposed);
        }
        Ok(self.overrides.last().copied().unwrap_or(self.root))
    }

    pub fn resolve<T: Resolvable + ?Sized>(&self) -> Result<Arc<T>> {
        self.resolve_with::<T>(&Parameters::new())
    }

    /// Resolve `T`, passing `parameters` to the activator that builds it
    pub fn resolve_with<T: Resolvable + ?Sized>(&self, parameters: &Parameters) -> Result<Arc<T>> {
        let scope = self.current_scope()?;
        trace!(service = type_name::<T>(), scope = %scope, "Session resolve");
        self.container.resolve_with::<T>(scope, parameters)
    }

    pub fn resolve_keyed<T: Resolvable + ?Sized>(&self, key: &str) -> Result<Arc<T>> {
        let scope = self.current_scope()?;
        self.container.resolve_keyed::<T>(scope, key)
    }

    /// Bind `S` to `I` in a new override scope and return the instance
    pub fn provide<S, I>(&mut self) -> Result<Arc<S>>
    where
        S: Resolvable + ?Sized,
        I: Construct + Upcast<S>,
    {
        self.provide_with::<S, I>(&Parameters::new())
    }

    /// Like [`provide`](Self::provide), passing `parameters` to `I`
    pub fn provide_with<S, I>(&mut self, parameters: &Parameters) -> Result<Arc<S>>
    where
        S: Resolvable + ?Sized,
        I: Construct + Upcast<S>,
    {
        let scope = self.push_override::<S, _>(|scope| {
            scope.register_type::<S, I>().single_instance();
        })?;
        debug!(
            service = type_name::<S>(),
            implementation = type_name::<I>(),
            scope = %scope,
            "Implementation provided"
        );
        self.container.resolve_with::<S>(scope, parameters)
    }

    /// Bind `S` to `instance` in a new override scope
    pub fn provide_instance<S>(&mut self, instance: Arc<S>) -> Result<Arc<S>>
    where
        S: Resolvable + ?Sized,
    {
        let scope = self.push_override::<S, _>(|scope| {
            scope.register_instance(instance);
        })?;
        debug!(service = type_name::<S>(), scope = %scope, "Instance provided");
        self.container.resolve::<S>(scope)
    }

    fn push_override<S, F>(&mut self, register: F) -> Result<ScopeId>
    where
        S: ?Sized,
        F: FnOnce(&mut armature_di::ScopeBuilder),
    {
        let parent = self.current_scope()?;
        let scope = self.container.begin_scope(parent, |scope| {
            scope.tag(format!("provide {}", type_name::<S>()));
            register(scope);
        })?;
        self.overrides.push(scope);
        Ok(scope)
    }

    /// Tear the session down: override scopes newest first, then the session
    /// scope, then the container.
    ///
    /// Calling it again does nothing.
    pub fn dispose(&mut self) -> Result<()> {
        if self.is_disposed() {
            trace!("Auto-fake session already disposed");
            return Ok(());
        }
        self.state = SessionState::Disposed;
        debug!(overrides = self.overrides.len(), "Disposing auto-fake session");

        while let Some(scope) = self.overrides.pop() {
            self.container.dispose_scope(scope)?;
        }
        self.container.dispose_scope(self.root)?;
        self.container.dispose();
        Ok(())
    }
}

impl Drop for AutoFake {
    fn drop(&mut self) {
        match panic::catch_unwind(AssertUnwindSafe(|| self.dispose())) {
            Ok(Ok(())) => {}
            Ok(Err(err)) => warn!(error = %err, "Auto-fake session teardown failed"),
            Err(_) => warn!("Auto-fake session teardown panicked"),
        }
    }
}

impl fmt::Debug for AutoFake {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AutoFake")
            .field("root", &self.root)
            .field("overrides", &self.overrides)
            .field("state", &self.state)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use armature_di::{ResolveContext, fakeable, service, upcast};

    trait Clock: Send + Sync {
        fn now(&self) -> u64;
    }

    struct ClockFake(Fake);

    impl Clock for ClockFake {
        fn now(&self) -> u64 {
            self.0.invoke("now")
        }
    }

    fakeable!(dyn Clock => ClockFake);

    impl std::fmt::Debug for dyn Clock {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            f.write_str("dyn Clock")
        }
    }

    struct FixedClock(u64);

    impl Clock for FixedClock {
        fn now(&self) -> u64 {
            self.0
        }
    }

    upcast!(FixedClock => dyn Clock);

    impl Construct for FixedClock {
        fn construct(ctx: &mut ResolveContext<'_>) -> Result<Self> {
            Ok(FixedClock(ctx.typed_parameter::<u64>().unwrap_or(42)))
        }
    }

    struct Timer {
        clock: Arc<dyn Clock>,
    }

    impl Construct for Timer {
        fn construct(ctx: &mut ResolveContext<'_>) -> Result<Self> {
            Ok(Timer {
                clock: ctx.resolve()?,
            })
        }
    }

    service!(Timer);

    #[test]
    fn test_unregistered_interface_resolves_to_shared_fake() {
        let session = AutoFake::new().unwrap();
        let a = session.resolve::<dyn Clock>().unwrap();
        let b = session.resolve::<dyn Clock>().unwrap();
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(a.now(), 0);

        let timer = session.resolve::<Timer>().unwrap();
        assert!(Arc::ptr_eq(&timer.clock, &a));
    }

    #[test]
    fn test_provide_pushes_scope() {
        let mut session = AutoFake::new().unwrap();
        let clock = session
            .provide_with::<dyn Clock, FixedClock>(&Parameters::new().with_typed(7u64))
            .unwrap();
        assert_eq!(clock.now(), 7);
        assert_eq!(session.scope_depth(), 1);

        let again = session.resolve::<dyn Clock>().unwrap();
        assert!(Arc::ptr_eq(&clock, &again));
        assert_eq!(session.resolve::<Timer>().unwrap().clock.now(), 7);
    }

    #[test]
    fn test_provide_instance_returns_same_arc() {
        let mut session = AutoFake::new().unwrap();
        let clock: Arc<dyn Clock> = Arc::new(FixedClock(3));
        let provided = session.provide_instance(Arc::clone(&clock)).unwrap();
        assert!(Arc::ptr_eq(&clock, &provided));
        assert!(Arc::ptr_eq(&clock, &session.resolve::<dyn Clock>().unwrap()));
    }

    #[test]
    fn test_dispose_is_idempotent_and_final() {
        let mut session = AutoFake::new().unwrap();
        session.provide::<dyn Clock, FixedClock>().unwrap();
        session.dispose().unwrap();
        session.dispose().unwrap();

        assert!(session.is_disposed());
        assert_eq!(session.scope_depth(), 0);
        assert!(matches!(
            session.resolve::<dyn Clock>().unwrap_err(),
            Error::Disposed
        ));
        assert!(session.provide::<dyn Clock, FixedClock>().is_err());
    }

    #[test]
    fn test_empty_key_rejected() {
        let session = AutoFake::new().unwrap();
        assert!(matches!(
            session.resolve_keyed::<dyn Clock>("").unwrap_err(),
            Error::InvalidArgument(_)
        ));
    }
}
