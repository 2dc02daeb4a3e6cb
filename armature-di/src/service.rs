// Service identities and the traits that make a type resolvable

use crate::{ResolveContext, Result};
use armature_fake::Fake;
use std::any::{Any, TypeId, type_name};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

/// What kind of type a service is
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TypeShape {
    /// A trait object with no provided members
    Interface,
    /// A trait object with at least one provided (base) member
    Abstract,
    /// A plain struct or enum
    Concrete,
    /// `Vec<Arc<T>>`
    Sequence,
    /// `Box<[Arc<T>]>`
    Array,
}

impl TypeShape {
    /// Interfaces and abstract types can be faked
    pub fn is_abstract(&self) -> bool {
        matches!(self, TypeShape::Interface | TypeShape::Abstract)
    }

    pub fn is_collection(&self) -> bool {
        matches!(self, TypeShape::Sequence | TypeShape::Array)
    }
}

type Constructor = fn(&mut ResolveContext<'_>) -> Result<Instance>;
type Faker = fn(Fake) -> Instance;

/// Runtime identity of a service type.
///
/// Equality and hashing only look at the `TypeId`.
#[derive(Clone)]
pub struct ServiceType {
    id: TypeId,
    name: &'static str,
    shape: TypeShape,
    auto_start: bool,
    constructor: Option<Constructor>,
    faker: Option<Faker>,
}

impl ServiceType {
    /// A type with no way to build itself
    pub fn opaque<T: ?Sized + 'static>(shape: TypeShape) -> Self {
        Self {
            id: TypeId::of::<T>(),
            name: type_name::<T>(),
            shape,
            auto_start: false,
            constructor: None,
            faker: None,
        }
    }

    /// A concrete type built through [`Construct`]
    pub fn concrete<T: Construct>() -> Self {
        Self {
            constructor: Some(construct_activator::<T>),
            ..Self::opaque::<T>(TypeShape::Concrete)
        }
    }

    /// A trait object without base members
    pub fn interface<T: Fakeable + ?Sized>() -> Self {
        Self {
            faker: Some(fake_activator::<T>),
            ..Self::opaque::<T>(TypeShape::Interface)
        }
    }

    /// A trait object with base members
    pub fn abstract_type<T: Fakeable + ?Sized>() -> Self {
        Self {
            faker: Some(fake_activator::<T>),
            ..Self::opaque::<T>(TypeShape::Abstract)
        }
    }

    fn with_constructor(self, constructor: Constructor) -> Self {
        Self {
            constructor: Some(constructor),
            ..self
        }
    }

    /// Flag the type as taking part in container startup
    pub fn auto_start(mut self) -> Self {
        self.auto_start = true;
        self
    }

    pub fn id(&self) -> TypeId {
        self.id
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn shape(&self) -> TypeShape {
        self.shape
    }

    pub fn is_auto_start(&self) -> bool {
        self.auto_start
    }

    pub fn can_fake(&self) -> bool {
        self.faker.is_some()
    }

    pub(crate) fn constructor(&self) -> Option<Constructor> {
        self.constructor
    }

    /// Wrap a fake handle into an instance of this type
    pub fn fake(&self, fake: Fake) -> Option<Instance> {
        self.faker.map(|faker| faker(fake))
    }
}

impl PartialEq for ServiceType {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for ServiceType {}

impl Hash for ServiceType {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Debug for ServiceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceType")
            .field("name", &self.name)
            .field("shape", &self.shape)
            .field("auto_start", &self.auto_start)
            .finish()
    }
}

/// A requested service: a type, optionally qualified by a key
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Service {
    Typed(ServiceType),
    Keyed { ty: ServiceType, key: String },
}

impl Service {
    pub fn of<T: Resolvable + ?Sized>() -> Self {
        Service::Typed(T::service_type())
    }

    pub fn keyed<T: Resolvable + ?Sized>(key: impl Into<String>) -> Self {
        Service::Keyed {
            ty: T::service_type(),
            key: key.into(),
        }
    }

    pub fn service_type(&self) -> &ServiceType {
        match self {
            Service::Typed(ty) | Service::Keyed { ty, .. } => ty,
        }
    }

    pub fn is_keyed(&self) -> bool {
        matches!(self, Service::Keyed { .. })
    }
}

impl fmt::Display for Service {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Service::Typed(ty) => f.write_str(ty.name),
            Service::Keyed { ty, key } => write!(f, "{} (key `{}`)", ty.name, key),
        }
    }
}

/// A resolved value, type-erased.
///
/// Holds an `Arc<T>` for the service type `T`, so trait objects keep their
/// identity through the container.
#[derive(Clone)]
pub struct Instance {
    value: Arc<dyn Any + Send + Sync>,
    type_name: &'static str,
}

impl Instance {
    pub fn new<T: ?Sized + Send + Sync + 'static>(value: Arc<T>) -> Self {
        Self {
            value: Arc::new(value),
            type_name: type_name::<T>(),
        }
    }

    /// Recover the `Arc<T>` this instance was made from
    pub fn downcast<T: ?Sized + 'static>(&self) -> Option<Arc<T>> {
        self.value.downcast_ref::<Arc<T>>().cloned()
    }

    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    /// Check whether both instances wrap the same allocation
    pub fn ptr_eq(&self, other: &Instance) -> bool {
        Arc::ptr_eq(&self.value, &other.value)
    }
}

impl fmt::Debug for Instance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Instance")
            .field("type_name", &self.type_name)
            .finish()
    }
}

/// A type the container can hand out as `Arc<Self>`.
///
/// Implemented for concrete types and for `dyn Trait`; see the
/// [`service!`](crate::service) and [`fakeable!`](crate::fakeable) macros.
pub trait Resolvable: Send + Sync + 'static {
    fn service_type() -> ServiceType;
}

/// Construction of a concrete type from its dependencies
pub trait Construct: Sized + Send + Sync + 'static {
    fn construct(ctx: &mut ResolveContext<'_>) -> Result<Self>;
}

/// A trait object that can be replaced by a fake
pub trait Fakeable: Resolvable {
    fn fake(fake: Fake) -> Arc<Self>;
}

/// Conversion of an implementation into the service it is registered as.
///
/// Every type is its own service; implement it for trait objects with
/// [`upcast!`](crate::upcast).
pub trait Upcast<S: ?Sized>: Send + Sync + 'static {
    fn upcast(self: Arc<Self>) -> Arc<S>;
}

impl<T: Send + Sync + 'static> Upcast<T> for T {
    fn upcast(self: Arc<Self>) -> Arc<T> {
        self
    }
}

/// Marker for components started by the container once it is built
pub trait Startable: Send + Sync {
    fn start(&self);
}

impl Resolvable for dyn Startable {
    fn service_type() -> ServiceType {
        ServiceType::opaque::<Self>(TypeShape::Interface).auto_start()
    }
}

impl<T: Resolvable + ?Sized> Resolvable for Vec<Arc<T>> {
    fn service_type() -> ServiceType {
        ServiceType::opaque::<Self>(TypeShape::Sequence)
            .with_constructor(sequence_activator::<T>)
    }
}

impl<T: Resolvable + ?Sized> Resolvable for Box<[Arc<T>]> {
    fn service_type() -> ServiceType {
        ServiceType::opaque::<Self>(TypeShape::Array)
            .with_constructor(array_activator::<T>)
    }
}

fn construct_activator<T: Construct>(ctx: &mut ResolveContext<'_>) -> Result<Instance> {
    T::construct(ctx).map(|value| Instance::new(Arc::new(value)))
}

fn fake_activator<T: Fakeable + ?Sized>(fake: Fake) -> Instance {
    Instance::new(T::fake(fake))
}

fn sequence_activator<T: Resolvable + ?Sized>(ctx: &mut ResolveContext<'_>) -> Result<Instance> {
    let items: Vec<Arc<T>> = ctx.resolve_all::<T>()?;
    Ok(Instance::new(Arc::new(items)))
}

fn array_activator<T: Resolvable + ?Sized>(ctx: &mut ResolveContext<'_>) -> Result<Instance> {
    let items: Box<[Arc<T>]> = ctx.resolve_all::<T>()?.into_boxed_slice();
    Ok(Instance::new(Arc::new(items)))
}

/// Implement [`Resolvable`] for concrete types built through [`Construct`]
#[macro_export]
macro_rules! service {
    ($($ty:ty),+ $(,)?) => {
        $(
            impl $crate::Resolvable for $ty {
                fn service_type() -> $crate::ServiceType {
                    $crate::ServiceType::concrete::<Self>()
                }
            }
        )+
    };
}

/// Implement [`Resolvable`] and [`Fakeable`] for a trait object.
///
/// The fake type must be a tuple struct around [`Fake`].
///
/// ```ignore
/// fakeable!(dyn Clock => ClockFake);
/// fakeable!(abstract dyn Journal => JournalFake);
/// fakeable!(startable dyn Worker => WorkerFake);
/// ```
#[macro_export]
macro_rules! fakeable {
    (@impl $svc:ty, $fake:path, $service_type:expr) => {
        impl $crate::Resolvable for $svc {
            fn service_type() -> $crate::ServiceType {
                $service_type
            }
        }

        impl $crate::Fakeable for $svc {
            fn fake(fake: $crate::Fake) -> ::std::sync::Arc<Self> {
                ::std::sync::Arc::new($fake(fake))
            }
        }
    };
    (abstract $svc:ty => $fake:path) => {
        $crate::fakeable!(@impl $svc, $fake, $crate::ServiceType::abstract_type::<Self>());
    };
    (startable $svc:ty => $fake:path) => {
        $crate::fakeable!(@impl $svc, $fake, $crate::ServiceType::interface::<Self>().auto_start());
    };
    ($svc:ty => $fake:path) => {
        $crate::fakeable!(@impl $svc, $fake, $crate::ServiceType::interface::<Self>());
    };
}

/// Implement [`Upcast`] from an implementation to the trait objects it serves
#[macro_export]
macro_rules! upcast {
    ($impl:ty => $($svc:ty),+ $(,)?) => {
        $(
            impl $crate::Upcast<$svc> for $impl {
                fn upcast(self: ::std::sync::Arc<Self>) -> ::std::sync::Arc<$svc> {
                    self
                }
            }
        )+
    };
}
