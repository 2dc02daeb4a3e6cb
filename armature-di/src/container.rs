// Dependency injection container with nested lifetime scopes

use crate::logging::{debug, trace};
use crate::{
    Error, Instance, Lifetime, Parameters, Registrar, Registration, RegistrationAccessor,
    RegistrationId, RegistrationSource, ReleaseHook, ResolveContext, Resolvable, Result, Service,
    Startable,
};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::fmt;
use std::mem;
use std::sync::Arc;

const ROOT: ScopeId = ScopeId(0);

/// Handle to a lifetime scope inside a [`Container`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ScopeId(usize);

impl ScopeId {
    pub fn index(&self) -> usize {
        self.0
    }
}

impl fmt::Display for ScopeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "scope#{}", self.0)
    }
}

/// Collects registrations and registration sources, then builds a [`Container`]
#[derive(Default)]
pub struct ContainerBuilder {
    registrations: Vec<Registration>,
    sources: Vec<Arc<dyn RegistrationSource>>,
}

impl ContainerBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a fallback rule; rules are asked in the order they were added
    pub fn register_source<S: RegistrationSource + 'static>(&mut self, source: S) -> &mut Self {
        self.register_shared_source(Arc::new(source))
    }

    pub fn register_shared_source(&mut self, source: Arc<dyn RegistrationSource>) -> &mut Self {
        debug!(source = source.name(), "Registration source added");
        self.sources.push(source);
        self
    }

    pub fn registration_count(&self) -> usize {
        self.registrations.len()
    }

    pub fn source_count(&self) -> usize {
        self.sources.len()
    }

    /// Build the container and start every `dyn Startable` registration
    pub fn build(self) -> Result<Container> {
        let bindings: Vec<Arc<Registration>> =
            self.registrations.into_iter().map(Arc::new).collect();
        debug!(
            registrations = bindings.len(),
            sources = self.sources.len(),
            "Creating new DI container"
        );

        let container = Container {
            state: Mutex::new(ContainerState {
                scopes: vec![ScopeNode::new(None, "root".to_string(), bindings)],
                from_sources: HashMap::new(),
            }),
            sources: self.sources,
        };
        container.start_components()?;
        Ok(container)
    }
}

impl Registrar for ContainerBuilder {
    fn registrations_mut(&mut self) -> &mut Vec<Registration> {
        &mut self.registrations
    }
}

impl fmt::Debug for ContainerBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ContainerBuilder")
            .field("registrations", &self.registrations)
            .field("sources", &self.sources.iter().map(|s| s.name()).collect::<Vec<_>>())
            .finish()
    }
}

/// Registrations for a nested scope, filled in by the scope configurator
#[derive(Default)]
pub struct ScopeBuilder {
    tag: Option<String>,
    registrations: Vec<Registration>,
}

impl ScopeBuilder {
    /// Name the scope in logs
    pub fn tag(&mut self, tag: impl Into<String>) -> &mut Self {
        self.tag = Some(tag.into());
        self
    }
}

impl Registrar for ScopeBuilder {
    fn registrations_mut(&mut self) -> &mut Vec<Registration> {
        &mut self.registrations
    }
}

struct Owned {
    instance: Instance,
    on_release: Option<ReleaseHook>,
}

struct ScopeNode {
    parent: Option<ScopeId>,
    tag: String,
    bindings: Vec<Arc<Registration>>,
    shared: HashMap<RegistrationId, Instance>,
    owned: Vec<Owned>,
    disposed: bool,
}

impl ScopeNode {
    fn new(parent: Option<ScopeId>, tag: String, bindings: Vec<Arc<Registration>>) -> Self {
        Self {
            parent,
            tag,
            bindings,
            shared: HashMap::new(),
            owned: Vec::new(),
            disposed: false,
        }
    }
}

struct ContainerState {
    scopes: Vec<ScopeNode>,
    // memoized answers of non-adapter sources and implicit constructors
    from_sources: HashMap<Service, Arc<Registration>>,
}

impl ContainerState {
    fn node(&self, scope: ScopeId) -> Result<&ScopeNode> {
        self.scopes
            .get(scope.0)
            .ok_or_else(|| Error::InvalidArgument(format!("unknown lifetime scope {scope}")))
    }

    fn node_mut(&mut self, scope: ScopeId) -> Result<&mut ScopeNode> {
        self.scopes
            .get_mut(scope.0)
            .ok_or_else(|| Error::InvalidArgument(format!("unknown lifetime scope {scope}")))
    }

    fn live_node_mut(&mut self, scope: ScopeId) -> Result<&mut ScopeNode> {
        let node = self.node_mut(scope)?;
        if node.disposed {
            return Err(Error::ScopeDisposed(format!("{scope} ({})", node.tag)));
        }
        Ok(node)
    }

    fn check_live(&self, scope: ScopeId) -> Result<()> {
        let node = self.node(scope)?;
        if node.disposed {
            return Err(Error::ScopeDisposed(format!("{scope} ({})", node.tag)));
        }
        Ok(())
    }

    /// `scope`, its parent, ..., the root
    fn chain(&self, scope: ScopeId) -> impl Iterator<Item = ScopeId> + '_ {
        std::iter::successors(Some(scope), |id| {
            self.scopes.get(id.0).and_then(|node| node.parent)
        })
    }

    fn find_binding(&self, scope: ScopeId, service: &Service) -> Option<(Arc<Registration>, ScopeId)> {
        self.chain(scope).find_map(|id| {
            self.scopes[id.0]
                .bindings
                .iter()
                .rev()
                .find(|r| r.service() == service)
                .map(|r| (Arc::clone(r), id))
        })
    }

    fn find_shared(&self, scope: ScopeId, registration: RegistrationId) -> Option<Instance> {
        self.chain(scope)
            .find_map(|id| self.scopes[id.0].shared.get(&registration).cloned())
    }

    fn lookup(&self, scope: ScopeId, service: &Service) -> Lookup {
        let found = self.find_binding(scope, service).or_else(|| {
            self.from_sources
                .get(service)
                .map(|r| (Arc::clone(r), ROOT))
        });
        match found {
            None => Lookup::Missing,
            Some((registration, owner)) => match self.find_shared(scope, registration.id()) {
                Some(instance) => Lookup::Shared(instance),
                None => Lookup::Binding {
                    registration,
                    owner,
                },
            },
        }
    }
}

enum Lookup {
    Shared(Instance),
    Binding {
        registration: Arc<Registration>,
        owner: ScopeId,
    },
    Missing,
}

/// The dependency injection container.
///
/// Owns an arena of lifetime scopes. Scope 0 is the root and holds the
/// builder's registrations; nested scopes add their own registrations and
/// fall back to their parent for everything else. When nothing in the chain
/// answers a request, registration sources are asked in order, then the
/// requested type's own constructor, if it has one.
pub struct Container {
    state: Mutex<ContainerState>,
    sources: Vec<Arc<dyn RegistrationSource>>,
}

impl Container {
    pub fn builder() -> ContainerBuilder {
        ContainerBuilder::new()
    }

    pub fn root_scope(&self) -> ScopeId {
        ROOT
    }

    /// Create a nested scope under `parent`
    pub fn begin_scope<F>(&self, parent: ScopeId, configure: F) -> Result<ScopeId>
    where
        F: FnOnce(&mut ScopeBuilder),
    {
        let mut builder = ScopeBuilder::default();
        configure(&mut builder);
        let bindings: Vec<Arc<Registration>> =
            builder.registrations.into_iter().map(Arc::new).collect();

        let mut state = self.state.lock();
        state.check_live(parent)?;
        let id = ScopeId(state.scopes.len());
        let tag = builder.tag.unwrap_or_else(|| id.to_string());
        debug!(
            scope = %id,
            parent = %parent,
            tag = %tag,
            registrations = bindings.len(),
            "Lifetime scope created"
        );
        state.scopes.push(ScopeNode::new(Some(parent), tag, bindings));
        Ok(id)
    }

    pub fn parent_of(&self, scope: ScopeId) -> Result<Option<ScopeId>> {
        Ok(self.state.lock().node(scope)?.parent)
    }

    pub fn scope_count(&self) -> usize {
        self.state.lock().scopes.len()
    }

    pub fn is_disposed(&self, scope: ScopeId) -> Result<bool> {
        Ok(self.state.lock().node(scope)?.disposed)
    }

    /// Check whether anything visible from `scope` is registered for `service`
    pub fn is_registered(&self, scope: ScopeId, service: &Service) -> bool {
        !ScopeAccessor::new(self, scope)
            .registrations_for(service)
            .is_empty()
    }

    /// Resolve `T` from `scope`
    pub fn resolve<T: Resolvable + ?Sized>(&self, scope: ScopeId) -> Result<Arc<T>> {
        self.resolve_with::<T>(scope, &Parameters::new())
    }

    /// Resolve `T` from `scope`, passing parameters to its activator
    pub fn resolve_with<T: Resolvable + ?Sized>(
        &self,
        scope: ScopeId,
        parameters: &Parameters,
    ) -> Result<Arc<T>> {
        let service = Service::of::<T>();
        let instance = self.resolve_service(scope, &service, parameters)?;
        Self::typed(&service, instance)
    }

    /// Resolve `T` registered under `key`
    pub fn resolve_keyed<T: Resolvable + ?Sized>(&self, scope: ScopeId, key: &str) -> Result<Arc<T>> {
        if key.is_empty() {
            return Err(Error::InvalidArgument("service key must not be empty".into()));
        }
        let service = Service::keyed::<T>(key);
        let instance = self.resolve_service(scope, &service, &Parameters::new())?;
        Self::typed(&service, instance)
    }

    /// Every explicit registration of `T` visible from `scope`, root first
    pub fn resolve_all<T: Resolvable + ?Sized>(&self, scope: ScopeId) -> Result<Vec<Arc<T>>> {
        let service = Service::of::<T>();
        self.resolve_all_in(scope, &service, &mut Vec::new())?
            .into_iter()
            .map(|instance| Self::typed(&service, instance))
            .collect()
    }

    /// Resolve a type-erased service
    pub fn resolve_service(
        &self,
        scope: ScopeId,
        service: &Service,
        parameters: &Parameters,
    ) -> Result<Instance> {
        self.resolve_in(scope, service, parameters, &mut Vec::new())
    }

    pub(crate) fn typed<T: ?Sized + 'static>(service: &Service, instance: Instance) -> Result<Arc<T>> {
        instance.downcast::<T>().ok_or_else(|| {
            Error::resolution(
                service.to_string(),
                format!("activator produced {}", instance.type_name()),
            )
        })
    }

    pub(crate) fn resolve_in(
        &self,
        scope: ScopeId,
        service: &Service,
        parameters: &Parameters,
        path: &mut Vec<Service>,
    ) -> Result<Instance> {
        if path.contains(service) {
            let chain: Vec<String> = path
                .iter()
                .chain(std::iter::once(service))
                .map(ToString::to_string)
                .collect();
            return Err(Error::CircularDependency(chain.join(" -> ")));
        }

        trace!(service = %service, scope = %scope, "Attempting to resolve service");
        let lookup = {
            let state = self.state.lock();
            state.check_live(scope)?;
            state.lookup(scope, service)
        };

        let (registration, owner) = match lookup {
            Lookup::Shared(instance) => {
                trace!(service = %service, scope = %scope, "Resolved shared instance");
                return Ok(instance);
            }
            Lookup::Binding {
                registration,
                owner,
            } => (registration, owner),
            Lookup::Missing => match self.registration_from_sources(scope, service)? {
                Some(found) => found,
                None => {
                    debug!(service = %service, scope = %scope, "Service not found in container");
                    return Err(Error::resolution(
                        service.to_string(),
                        "no registration, registration source or constructor supplies it",
                    ));
                }
            },
        };

        self.activate(scope, owner, &registration, parameters, path)
    }

    pub(crate) fn resolve_all_in(
        &self,
        scope: ScopeId,
        service: &Service,
        path: &mut Vec<Service>,
    ) -> Result<Vec<Instance>> {
        let candidates: Vec<(Arc<Registration>, ScopeId, Option<Instance>)> = {
            let state = self.state.lock();
            state.check_live(scope)?;
            let mut chain: Vec<ScopeId> = state.chain(scope).collect();
            chain.reverse();
            chain
                .into_iter()
                .flat_map(|id| {
                    state.scopes[id.0]
                        .bindings
                        .iter()
                        .filter(|r| r.service() == service)
                        .map(move |r| (Arc::clone(r), id))
                })
                .map(|(registration, owner)| {
                    let shared = state.find_shared(scope, registration.id());
                    (registration, owner, shared)
                })
                .collect()
        };

        trace!(service = %service, count = candidates.len(), "Resolving collection");
        let parameters = Parameters::new();
        candidates
            .into_iter()
            .map(|(registration, owner, shared)| match shared {
                Some(instance) => Ok(instance),
                None => self.activate(scope, owner, &registration, &parameters, path),
            })
            .collect()
    }

    fn registration_from_sources(
        &self,
        scope: ScopeId,
        service: &Service,
    ) -> Result<Option<(Arc<Registration>, ScopeId)>> {
        let accessor = ScopeAccessor::new(self, scope);
        for source in &self.sources {
            let Some(registration) = source.registrations_for(service, &accessor).pop() else {
                continue;
            };
            let registration = Arc::new(registration);

            let mut state = self.state.lock();
            if source.is_adapter_for_individual_components() {
                state.live_node_mut(scope)?.bindings.push(Arc::clone(&registration));
                debug!(service = %service, source = source.name(), scope = %scope, "Adapter registration added");
                return Ok(Some((registration, scope)));
            }
            let registration = Arc::clone(
                state
                    .from_sources
                    .entry(service.clone())
                    .or_insert(registration),
            );
            debug!(service = %service, source = source.name(), "Registration supplied by source");
            return Ok(Some((registration, ROOT)));
        }

        let Service::Typed(ty) = service else {
            return Ok(None);
        };
        let Some(constructor) = ty.constructor() else {
            return Ok(None);
        };
        let lifetime = if ty.shape().is_collection() {
            Lifetime::InstancePerDependency
        } else {
            Lifetime::InstancePerLifetimeScope
        };
        let registration = Registration::new(service.clone(), lifetime, Arc::new(constructor))
            .with_origin("implicit");

        let mut state = self.state.lock();
        let registration = Arc::clone(
            state
                .from_sources
                .entry(service.clone())
                .or_insert_with(|| Arc::new(registration)),
        );
        trace!(service = %service, "Implicit constructor registration added");
        Ok(Some((registration, ROOT)))
    }

    fn activate(
        &self,
        scope: ScopeId,
        owner: ScopeId,
        registration: &Registration,
        parameters: &Parameters,
        path: &mut Vec<Service>,
    ) -> Result<Instance> {
        let service = registration.service();
        trace!(service = %service, origin = registration.origin(), "Activating instance");

        path.push(service.clone());
        let result = {
            let mut ctx = ResolveContext::new(self, scope, parameters, path);
            registration.activate(&mut ctx)
        };
        path.pop();
        let instance = result?;

        let home = match registration.lifetime() {
            Lifetime::SingleInstance => owner,
            Lifetime::InstancePerLifetimeScope | Lifetime::InstancePerDependency => scope,
        };

        let mut state = self.state.lock();
        if registration.lifetime() != Lifetime::InstancePerDependency {
            if let Some(existing) = state.find_shared(scope, registration.id()) {
                return Ok(existing);
            }
        }
        let node = state.live_node_mut(home)?;
        if registration.lifetime() != Lifetime::InstancePerDependency {
            node.shared.insert(registration.id(), instance.clone());
        }
        node.owned.push(Owned {
            instance: instance.clone(),
            on_release: registration.on_release(),
        });
        debug!(
            service = %service,
            scope = %home,
            lifetime = ?registration.lifetime(),
            "Service resolved successfully"
        );
        Ok(instance)
    }

    fn start_components(&self) -> Result<()> {
        let components = self.resolve_all::<dyn Startable>(ROOT)?;
        for component in &components {
            component.start();
        }
        if !components.is_empty() {
            debug!(count = components.len(), "Startable components started");
        }
        Ok(())
    }

    /// Release everything the scope owns, newest first.
    ///
    /// Child scopes are not touched. Disposing twice is a no-op.
    pub fn dispose_scope(&self, scope: ScopeId) -> Result<()> {
        let (tag, shared, owned, bindings) = {
            let mut state = self.state.lock();
            let node = state.node_mut(scope)?;
            if node.disposed {
                trace!(scope = %scope, "Lifetime scope already disposed");
                return Ok(());
            }
            node.disposed = true;
            (
                node.tag.clone(),
                mem::take(&mut node.shared),
                mem::take(&mut node.owned),
                mem::take(&mut node.bindings),
            )
        };

        drop(shared);
        let released = owned.len();
        for item in owned.into_iter().rev() {
            if let Some(hook) = &item.on_release {
                hook(&item.instance);
            }
        }
        drop(bindings);
        debug!(scope = %scope, tag = %tag, released, "Lifetime scope disposed");
        Ok(())
    }

    /// Dispose every scope still alive, newest first, the root last
    pub fn dispose(&self) {
        let count = self.scope_count();
        for index in (0..count).rev() {
            // indices below scope_count always exist
            let _ = self.dispose_scope(ScopeId(index));
        }
    }
}

impl Drop for Container {
    fn drop(&mut self) {
        self.dispose();
    }
}

impl fmt::Debug for Container {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.lock();
        f.debug_struct("Container")
            .field("scopes", &state.scopes.len())
            .field("sources", &self.sources.len())
            .finish()
    }
}

struct ScopeAccessor<'a> {
    container: &'a Container,
    scope: ScopeId,
}

impl<'a> ScopeAccessor<'a> {
    fn new(container: &'a Container, scope: ScopeId) -> Self {
        Self { container, scope }
    }
}

impl RegistrationAccessor for ScopeAccessor<'_> {
    fn registrations_for(&self, service: &Service) -> Vec<Arc<Registration>> {
        let state = self.container.state.lock();
        let mut found: Vec<Arc<Registration>> = state
            .chain(self.scope)
            .flat_map(|id| {
                state.scopes[id.0]
                    .bindings
                    .iter()
                    .filter(|r| r.service() == service)
                    .cloned()
            })
            .collect();
        if let Some(registration) = state.from_sources.get(service) {
            found.push(Arc::clone(registration));
        }
        found
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Construct, Fake, ServiceType, TypeShape};
    use std::sync::atomic::{AtomicUsize, Ordering};

    trait Greeter: Send + Sync {
        fn greet(&self) -> String;
    }

    struct English;

    impl Greeter for English {
        fn greet(&self) -> String {
            "hello".to_string()
        }
    }

    struct French;

    impl Greeter for French {
        fn greet(&self) -> String {
            "bonjour".to_string()
        }
    }

    struct GreeterFake(Fake);

    impl Greeter for GreeterFake {
        fn greet(&self) -> String {
            self.0.invoke("greet")
        }
    }

    crate::fakeable!(dyn Greeter => GreeterFake);

    impl std::fmt::Debug for dyn Greeter {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            f.write_str("dyn Greeter")
        }
    }
    crate::upcast!(English => dyn Greeter);
    crate::upcast!(French => dyn Greeter);

    impl Construct for English {
        fn construct(_ctx: &mut ResolveContext<'_>) -> Result<Self> {
            Ok(English)
        }
    }

    impl Construct for French {
        fn construct(_ctx: &mut ResolveContext<'_>) -> Result<Self> {
            Ok(French)
        }
    }

    #[derive(Debug)]
    struct Host {
        greeter: Arc<dyn Greeter>,
        name: String,
    }

    impl Construct for Host {
        fn construct(ctx: &mut ResolveContext<'_>) -> Result<Self> {
            Ok(Host {
                greeter: ctx.resolve::<dyn Greeter>()?,
                name: ctx.named_parameter("name").unwrap_or_else(|| "anonymous".to_string()),
            })
        }
    }

    crate::service!(Host);

    #[derive(Debug)]
    struct Unbuildable;

    impl Resolvable for Unbuildable {
        fn service_type() -> ServiceType {
            ServiceType::opaque::<Self>(TypeShape::Concrete)
        }
    }

    #[allow(dead_code)]
    #[derive(Debug)]
    struct Ping(Arc<Pong>);
    #[allow(dead_code)]
    #[derive(Debug)]
    struct Pong(Arc<Ping>);

    impl Construct for Ping {
        fn construct(ctx: &mut ResolveContext<'_>) -> Result<Self> {
            Ok(Ping(ctx.resolve()?))
        }
    }

    impl Construct for Pong {
        fn construct(ctx: &mut ResolveContext<'_>) -> Result<Self> {
            Ok(Pong(ctx.resolve()?))
        }
    }

    crate::service!(Ping, Pong);

    #[test]
    fn test_explicit_registration_is_resolved() {
        let mut builder = ContainerBuilder::new();
        builder.register_type::<dyn Greeter, English>();
        let container = builder.build().unwrap();

        let greeter = container.resolve::<dyn Greeter>(container.root_scope()).unwrap();
        assert_eq!(greeter.greet(), "hello");
    }

    #[test]
    fn test_lifetimes() {
        let mut builder = ContainerBuilder::new();
        builder.register_type::<dyn Greeter, English>();
        builder
            .register_type::<dyn Greeter, French>()
            .keyed("fr")
            .instance_per_lifetime_scope();
        let container = builder.build().unwrap();
        let root = container.root_scope();

        let a = container.resolve::<dyn Greeter>(root).unwrap();
        let b = container.resolve::<dyn Greeter>(root).unwrap();
        assert!(!Arc::ptr_eq(&a, &b));

        let c = container.resolve_keyed::<dyn Greeter>(root, "fr").unwrap();
        let d = container.resolve_keyed::<dyn Greeter>(root, "fr").unwrap();
        assert!(Arc::ptr_eq(&c, &d));
        assert_eq!(c.greet(), "bonjour");
    }

    #[test]
    fn test_empty_key_is_invalid() {
        let container = ContainerBuilder::new().build().unwrap();
        let err = container
            .resolve_keyed::<dyn Greeter>(container.root_scope(), "")
            .unwrap_err();
        assert!(matches!(err, Error::InvalidArgument(_)));
    }

    #[test]
    fn test_nested_scope_shadows_parent() {
        let mut builder = ContainerBuilder::new();
        builder.register_type::<dyn Greeter, English>().single_instance();
        let container = builder.build().unwrap();
        let root = container.root_scope();

        let child = container
            .begin_scope(root, |scope| {
                scope.tag("french");
                scope.register_type::<dyn Greeter, French>().single_instance();
            })
            .unwrap();

        assert_eq!(container.resolve::<dyn Greeter>(child).unwrap().greet(), "bonjour");
        assert_eq!(container.resolve::<dyn Greeter>(root).unwrap().greet(), "hello");
        assert_eq!(container.parent_of(child).unwrap(), Some(root));
    }

    #[test]
    fn test_implicit_constructor_with_parameters() {
        let mut builder = ContainerBuilder::new();
        builder.register_type::<dyn Greeter, English>();
        let container = builder.build().unwrap();
        let params = Parameters::new().with_named("name", "ada".to_string());

        let host = container
            .resolve_with::<Host>(container.root_scope(), &params)
            .unwrap();
        assert_eq!(host.name, "ada");
        assert_eq!(host.greeter.greet(), "hello");

        // cached per scope, parameters only matter for the first activation
        let again = container.resolve::<Host>(container.root_scope()).unwrap();
        assert!(Arc::ptr_eq(&host, &again));
    }

    #[test]
    fn test_missing_service_names_type() {
        let container = ContainerBuilder::new().build().unwrap();
        let err = container
            .resolve::<Unbuildable>(container.root_scope())
            .unwrap_err();
        assert!(err.is_resolution_error());
        assert!(err.to_string().contains("Unbuildable"));

        // no source installed, so interfaces are unresolvable too
        assert!(container.resolve::<dyn Greeter>(container.root_scope()).is_err());
    }

    #[test]
    fn test_dependency_error_propagates_unwrapped() {
        let container = ContainerBuilder::new().build().unwrap();
        let err = container.resolve::<Host>(container.root_scope()).unwrap_err();
        match err {
            Error::Resolution { service, .. } => assert!(service.contains("Greeter")),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_circular_dependency_detected() {
        let container = ContainerBuilder::new().build().unwrap();
        let err = container.resolve::<Ping>(container.root_scope()).unwrap_err();
        assert!(matches!(err, Error::CircularDependency(_)));
        assert!(err.to_string().contains("Ping"));
    }

    #[test]
    fn test_collections_gather_explicit_registrations() {
        let mut builder = ContainerBuilder::new();
        builder.register_type::<dyn Greeter, English>();
        let container = builder.build().unwrap();
        let child = container
            .begin_scope(container.root_scope(), |scope| {
                scope.register_type::<dyn Greeter, French>();
            })
            .unwrap();

        let all = container.resolve::<Vec<Arc<dyn Greeter>>>(child).unwrap();
        let words: Vec<String> = all.iter().map(|g| g.greet()).collect();
        assert_eq!(words, vec!["hello", "bonjour"]);

        let array = container.resolve::<Box<[Arc<dyn Greeter>]>>(container.root_scope()).unwrap();
        assert_eq!(array.len(), 1);
    }

    struct CountingSource {
        asked: Arc<AtomicUsize>,
    }

    impl RegistrationSource for CountingSource {
        fn registrations_for(
            &self,
            service: &Service,
            accessor: &dyn RegistrationAccessor,
        ) -> Vec<Registration> {
            self.asked.fetch_add(1, Ordering::SeqCst);
            if *service != Service::of::<dyn Greeter>() || !accessor.registrations_for(service).is_empty() {
                return Vec::new();
            }
            let activator: crate::Activator = Arc::new(|_ctx: &mut ResolveContext<'_>| {
                Ok(Instance::new(Arc::new(French) as Arc<dyn Greeter>))
            });
            vec![Registration::new(service.clone(), Lifetime::InstancePerLifetimeScope, activator)
                .with_origin("counting")]
        }
    }

    #[test]
    fn test_source_consulted_once_and_cached_per_scope() {
        let asked = Arc::new(AtomicUsize::new(0));
        let mut builder = ContainerBuilder::new();
        builder.register_source(CountingSource { asked: asked.clone() });
        let container = builder.build().unwrap();
        let root = container.root_scope();
        let child = container.begin_scope(root, |_| {}).unwrap();

        let in_child = container.resolve::<dyn Greeter>(child).unwrap();
        let again = container.resolve::<dyn Greeter>(child).unwrap();
        let in_root = container.resolve::<dyn Greeter>(root).unwrap();

        assert!(Arc::ptr_eq(&in_child, &again));
        assert!(!Arc::ptr_eq(&in_child, &in_root));
        assert_eq!(asked.load(Ordering::SeqCst), 1);
        assert!(container.is_registered(root, &Service::of::<dyn Greeter>()));
    }

    #[test]
    fn test_dispose_releases_newest_first() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut builder = ContainerBuilder::new();
        let root_log = log.clone();
        builder
            .register_type::<dyn Greeter, English>()
            .single_instance()
            .on_release(move |g| root_log.lock().push(format!("root:{}", g.greet())));
        let container = builder.build().unwrap();
        let root = container.root_scope();
        container.resolve::<dyn Greeter>(root).unwrap();

        let child_log = log.clone();
        let child = container
            .begin_scope(root, move |scope| {
                scope
                    .register_type::<dyn Greeter, French>()
                    .single_instance()
                    .on_release(move |g| child_log.lock().push(format!("child:{}", g.greet())));
            })
            .unwrap();
        container.resolve::<dyn Greeter>(child).unwrap();

        container.dispose();
        container.dispose();
        assert_eq!(*log.lock(), vec!["child:bonjour", "root:hello"]);
        assert!(container.is_disposed(child).unwrap());

        let err = container.resolve::<dyn Greeter>(child).unwrap_err();
        assert!(err.is_disposed());
        assert!(container.begin_scope(root, |_| {}).is_err());
    }

    struct Warmup;

    impl Startable for Warmup {
        fn start(&self) {
            STARTED.fetch_add(1, Ordering::SeqCst);
        }
    }

    static STARTED: AtomicUsize = AtomicUsize::new(0);

    #[test]
    fn test_startable_components_start_on_build() {
        let mut builder = ContainerBuilder::new();
        builder.register::<dyn Startable, _>(|_| Ok(Arc::new(Warmup) as Arc<dyn Startable>));
        let _container = builder.build().unwrap();
        assert_eq!(STARTED.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_unknown_scope_is_invalid_argument() {
        let container = ContainerBuilder::new().build().unwrap();
        let err = container.resolve::<Host>(ScopeId(99)).unwrap_err();
        assert!(matches!(err, Error::InvalidArgument(_)));
    }
}
