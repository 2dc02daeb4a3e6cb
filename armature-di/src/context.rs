// Context handed to activators while an instance is being built

use crate::{Container, Error, Parameters, Resolvable, Result, ScopeId, Service};
use std::sync::Arc;

/// The scope and parameters of the activation in progress.
///
/// Dependencies resolved through the context come from the same scope as
/// the component being built and never see its parameters.
pub struct ResolveContext<'a> {
    container: &'a Container,
    scope: ScopeId,
    parameters: &'a Parameters,
    path: &'a mut Vec<Service>,
}

impl<'a> ResolveContext<'a> {
    pub(crate) fn new(
        container: &'a Container,
        scope: ScopeId,
        parameters: &'a Parameters,
        path: &'a mut Vec<Service>,
    ) -> Self {
        Self {
            container,
            scope,
            parameters,
            path,
        }
    }

    /// The scope the activation was requested from
    pub fn scope(&self) -> ScopeId {
        self.scope
    }

    /// The service being built
    pub fn service(&self) -> Option<&Service> {
        self.path.last()
    }

    pub fn parameters(&self) -> &Parameters {
        self.parameters
    }

    pub fn named_parameter<T: Clone + 'static>(&self, name: &str) -> Option<T> {
        self.parameters.named(name)
    }

    pub fn typed_parameter<T: Clone + 'static>(&self) -> Option<T> {
        self.parameters.typed()
    }

    /// A named parameter the component cannot be built without
    pub fn parameter<T: Clone + 'static>(&self, name: &str) -> Result<T> {
        self.named_parameter(name).ok_or_else(|| {
            let service = self
                .service()
                .map(ToString::to_string)
                .unwrap_or_default();
            Error::resolution(
                service,
                format!(
                    "missing parameter `{name}` of type {}",
                    std::any::type_name::<T>()
                ),
            )
        })
    }

    /// Resolve a dependency
    pub fn resolve<T: Resolvable + ?Sized>(&mut self) -> Result<Arc<T>> {
        let service = Service::of::<T>();
        let instance =
            self.container
                .resolve_in(self.scope, &service, &Parameters::new(), self.path)?;
        Container::typed(&service, instance)
    }

    /// Resolve a keyed dependency
    pub fn resolve_keyed<T: Resolvable + ?Sized>(&mut self, key: &str) -> Result<Arc<T>> {
        if key.is_empty() {
            return Err(Error::InvalidArgument("service key must not be empty".into()));
        }
        let service = Service::keyed::<T>(key);
        let instance =
            self.container
                .resolve_in(self.scope, &service, &Parameters::new(), self.path)?;
        Container::typed(&service, instance)
    }

    /// Every explicit registration of `T` visible from the scope
    pub fn resolve_all<T: Resolvable + ?Sized>(&mut self) -> Result<Vec<Arc<T>>> {
        let service = Service::of::<T>();
        self.container
            .resolve_all_in(self.scope, &service, self.path)?
            .into_iter()
            .map(|instance| Container::typed(&service, instance))
            .collect()
    }
}
