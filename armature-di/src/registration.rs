// Registrations, registration sources and the fluent registration API

use crate::{Construct, Instance, ResolveContext, Resolvable, Result, Service, Upcast};
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

/// How long an activated instance is shared
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Lifetime {
    /// A new instance for every request, owned by the requesting scope
    #[default]
    InstancePerDependency,
    /// One instance per requesting scope, visible to its child scopes
    InstancePerLifetimeScope,
    /// One instance in the scope that declared the registration
    SingleInstance,
}

pub type Activator = Arc<dyn Fn(&mut ResolveContext<'_>) -> Result<Instance> + Send + Sync>;
pub type ReleaseHook = Arc<dyn Fn(&Instance) + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RegistrationId(u64);

static NEXT_REGISTRATION_ID: AtomicU64 = AtomicU64::new(1);

/// A binding from a service to the activator that builds it
pub struct Registration {
    id: RegistrationId,
    service: Service,
    lifetime: Lifetime,
    activator: Activator,
    on_release: Option<ReleaseHook>,
    origin: &'static str,
}

impl Registration {
    pub fn new(service: Service, lifetime: Lifetime, activator: Activator) -> Self {
        Self {
            id: RegistrationId(NEXT_REGISTRATION_ID.fetch_add(1, Ordering::Relaxed)),
            service,
            lifetime,
            activator,
            on_release: None,
            origin: "explicit",
        }
    }

    /// Describe where the registration came from, for logs
    pub fn with_origin(mut self, origin: &'static str) -> Self {
        self.origin = origin;
        self
    }

    pub fn id(&self) -> RegistrationId {
        self.id
    }

    pub fn service(&self) -> &Service {
        &self.service
    }

    pub fn lifetime(&self) -> Lifetime {
        self.lifetime
    }

    pub fn origin(&self) -> &'static str {
        self.origin
    }

    pub(crate) fn on_release(&self) -> Option<ReleaseHook> {
        self.on_release.clone()
    }

    pub(crate) fn activate(&self, ctx: &mut ResolveContext<'_>) -> Result<Instance> {
        (self.activator)(ctx)
    }
}

impl fmt::Debug for Registration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registration")
            .field("id", &self.id)
            .field("service", &self.service.to_string())
            .field("lifetime", &self.lifetime)
            .field("origin", &self.origin)
            .finish()
    }
}

/// Fluent configuration of the registration just added
pub struct RegistrationBuilder<'a, S: ?Sized> {
    registration: &'a mut Registration,
    _service: PhantomData<fn() -> Arc<S>>,
}

impl<'a, S: Resolvable + ?Sized> RegistrationBuilder<'a, S> {
    fn new(registration: &'a mut Registration) -> Self {
        Self {
            registration,
            _service: PhantomData,
        }
    }

    pub fn lifetime(self, lifetime: Lifetime) -> Self {
        self.registration.lifetime = lifetime;
        self
    }

    pub fn instance_per_dependency(self) -> Self {
        self.lifetime(Lifetime::InstancePerDependency)
    }

    pub fn instance_per_lifetime_scope(self) -> Self {
        self.lifetime(Lifetime::InstancePerLifetimeScope)
    }

    pub fn single_instance(self) -> Self {
        self.lifetime(Lifetime::SingleInstance)
    }

    /// Expose the registration under a key instead of its bare type
    pub fn keyed(self, key: impl Into<String>) -> Self {
        self.registration.service = Service::keyed::<S>(key);
        self
    }

    /// Run `hook` when the owning scope releases the instance
    pub fn on_release<F>(self, hook: F) -> Self
    where
        F: Fn(&Arc<S>) + Send + Sync + 'static,
    {
        self.registration.on_release = Some(Arc::new(move |instance: &Instance| {
            if let Some(typed) = instance.downcast::<S>() {
                hook(&typed);
            }
        }));
        self
    }

    pub fn id(&self) -> RegistrationId {
        self.registration.id
    }
}

/// Anything that collects registrations: the container builder and the
/// configurator of a nested scope.
pub trait Registrar {
    fn registrations_mut(&mut self) -> &mut Vec<Registration>;

    /// Add a pre-built registration
    fn add_registration(&mut self, registration: Registration) -> &mut Registration {
        let registrations = self.registrations_mut();
        registrations.push(registration);
        let index = registrations.len() - 1;
        &mut registrations[index]
    }

    /// Register `S` built by a closure
    fn register<S, F>(&mut self, activator: F) -> RegistrationBuilder<'_, S>
    where
        S: Resolvable + ?Sized,
        F: Fn(&mut ResolveContext<'_>) -> Result<Arc<S>> + Send + Sync + 'static,
    {
        let activator: Activator =
            Arc::new(move |ctx: &mut ResolveContext<'_>| activator(ctx).map(Instance::new));
        let registration = Registration::new(Service::of::<S>(), Lifetime::default(), activator);
        RegistrationBuilder::new(self.add_registration(registration))
    }

    /// Register `S` implemented by the constructible type `I`
    fn register_type<S, I>(&mut self) -> RegistrationBuilder<'_, S>
    where
        S: Resolvable + ?Sized,
        I: Construct + Upcast<S>,
    {
        self.register::<S, _>(|ctx| {
            let implementation = Arc::new(I::construct(ctx)?);
            Ok(<I as Upcast<S>>::upcast(implementation))
        })
    }

    /// Register an existing instance of `S`
    fn register_instance<S>(&mut self, instance: Arc<S>) -> RegistrationBuilder<'_, S>
    where
        S: Resolvable + ?Sized,
    {
        self.register::<S, _>(move |_| Ok(Arc::clone(&instance)))
            .single_instance()
    }
}

/// Read access to the registrations visible from a scope
pub trait RegistrationAccessor {
    fn registrations_for(&self, service: &Service) -> Vec<Arc<Registration>>;
}

/// A rule consulted when no explicit registration answers a request
pub trait RegistrationSource: Send + Sync {
    /// Registrations able to supply `service`; empty means "no opinion"
    fn registrations_for(
        &self,
        service: &Service,
        accessor: &dyn RegistrationAccessor,
    ) -> Vec<Registration>;

    /// Adapters build on other components and are asked again in each scope
    fn is_adapter_for_individual_components(&self) -> bool {
        false
    }

    fn name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{ServiceType, TypeShape};

    struct Port(u16);

    impl Resolvable for Port {
        fn service_type() -> ServiceType {
            ServiceType::opaque::<Self>(TypeShape::Concrete)
        }
    }

    #[derive(Default)]
    struct Registrations(Vec<Registration>);

    impl Registrar for Registrations {
        fn registrations_mut(&mut self) -> &mut Vec<Registration> {
            &mut self.0
        }
    }

    #[test]
    fn test_fluent_registration() {
        let mut registrations = Registrations::default();
        registrations
            .register::<Port, _>(|_| Ok(Arc::new(Port(80))))
            .instance_per_lifetime_scope()
            .keyed("http");
        registrations.register_instance(Arc::new(Port(443)));

        let first = &registrations.0[0];
        assert_eq!(first.lifetime(), Lifetime::InstancePerLifetimeScope);
        assert_eq!(first.service(), &Service::keyed::<Port>("http"));
        assert_eq!(first.origin(), "explicit");

        let second = &registrations.0[1];
        assert_eq!(second.lifetime(), Lifetime::SingleInstance);
        assert_eq!(second.service(), &Service::of::<Port>());
        assert_ne!(first.id(), second.id());
    }

    #[test]
    fn test_default_lifetime_is_per_dependency() {
        assert_eq!(Lifetime::default(), Lifetime::InstancePerDependency);
    }
}
