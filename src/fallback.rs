// Registration source that answers unregistered abstract services with fakes

use armature_di::{
    Activator, Error, Fake, Instance, Lifetime, Registration, RegistrationAccessor,
    RegistrationSource, ResolveContext, Result, Service, ServiceType,
};
use armature_fake::{DefaultFakeEngine, FakeEngine, create_fake};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, trace};

/// Callback run against every fake right after it is created
pub type FakeCustomization = Arc<dyn Fn(&Fake) -> Result<()> + Send + Sync>;

/// How every fallback fake of a session is configured
#[derive(Clone, Default)]
pub struct FakePolicy {
    pub strict: bool,
    pub calls_base_methods: bool,
    pub customization: Option<FakeCustomization>,
}

impl FakePolicy {
    /// A lenient policy with no customization
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail calls to unconfigured members instead of returning `Default`
    pub fn strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    /// Run provided trait bodies for real
    pub fn calls_base_methods(mut self, calls_base_methods: bool) -> Self {
        self.calls_base_methods = calls_base_methods;
        self
    }

    /// Run `customization` against every fake right after creation
    pub fn customize<F>(mut self, customization: F) -> Self
    where
        F: Fn(&Fake) -> Result<()> + Send + Sync + 'static,
    {
        self.customization = Some(Arc::new(customization));
        self
    }
}

impl fmt::Debug for FakePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FakePolicy")
            .field("strict", &self.strict)
            .field("calls_base_methods", &self.calls_base_methods)
            .field("customization", &self.customization.is_some())
            .finish()
    }
}

/// Supplies a fake for any interface or abstract service nothing else
/// registers.
///
/// Fakes are shared per lifetime scope: the first resolution in a scope
/// creates the fake, later ones in that scope (or its children) get the same
/// instance back.
#[derive(Clone)]
pub struct FallbackFakeProvider {
    policy: FakePolicy,
    engine: Arc<dyn FakeEngine>,
}

impl FallbackFakeProvider {
    pub fn new(policy: FakePolicy, engine: Arc<dyn FakeEngine>) -> Self {
        Self { policy, engine }
    }

    pub fn policy(&self) -> &FakePolicy {
        &self.policy
    }

    /// Check whether `service` may be answered with a fake
    pub fn is_eligible(service: &Service) -> bool {
        let Service::Typed(ty) = service else {
            return false;
        };
        let shape = ty.shape();
        shape.is_abstract() && !shape.is_collection() && !ty.is_auto_start() && ty.can_fake()
    }

    /// Create a fake of `ty` configured by the policy
    pub fn create_fake(&self, ty: &ServiceType) -> Result<Instance> {
        let policy = &self.policy;
        let instance = create_fake(
            &*self.engine,
            ty.name(),
            |fake| ty.fake(fake),
            |options| {
                if policy.strict {
                    options.mark_strict();
                }
                if let Some(customization) = &policy.customization {
                    options.apply_customization(|fake| customization(fake))?;
                }
                if policy.calls_base_methods {
                    options.delegate_to_base_methods();
                }
                Ok::<_, Error>(())
            },
        )?;
        instance.ok_or_else(|| Error::resolution(ty.name(), "type cannot be faked"))
    }
}

impl Default for FallbackFakeProvider {
    fn default() -> Self {
        Self::new(FakePolicy::default(), Arc::new(DefaultFakeEngine))
    }
}

impl fmt::Debug for FallbackFakeProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FallbackFakeProvider")
            .field("policy", &self.policy)
            .finish()
    }
}

impl RegistrationSource for FallbackFakeProvider {
    fn registrations_for(
        &self,
        service: &Service,
        accessor: &dyn RegistrationAccessor,
    ) -> Vec<Registration> {
        if !Self::is_eligible(service) {
            trace!(service = %service, "Not eligible for a fallback fake");
            return Vec::new();
        }
        if !accessor.registrations_for(service).is_empty() {
            trace!(service = %service, "Service already registered, no fallback fake");
            return Vec::new();
        }

        let provider = self.clone();
        let ty = service.service_type().clone();
        let activator: Activator =
            Arc::new(move |_ctx: &mut ResolveContext<'_>| provider.create_fake(&ty));

        debug!(service = %service, "Fallback fake registration supplied");
        vec![
            Registration::new(
                service.clone(),
                Lifetime::InstancePerLifetimeScope,
                activator,
            )
            .with_origin("fallback-fake"),
        ]
    }

    fn name(&self) -> &'static str {
        "fallback-fake"
    }
}
