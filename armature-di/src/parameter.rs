// Resolve-time parameters passed to the activator that builds an instance

use std::any::{Any, TypeId, type_name};
use std::fmt;
use std::sync::Arc;

#[derive(Clone)]
enum Matcher {
    Named(String),
    Typed(TypeId),
}

/// A value supplied to the activator of the requested component
#[derive(Clone)]
pub struct Parameter {
    matcher: Matcher,
    type_name: &'static str,
    value: Arc<dyn Any + Send + Sync>,
}

impl Parameter {
    /// A value matched by name
    pub fn named<T: Send + Sync + 'static>(name: impl Into<String>, value: T) -> Self {
        Self {
            matcher: Matcher::Named(name.into()),
            type_name: type_name::<T>(),
            value: Arc::new(value),
        }
    }

    /// A value matched by its type
    pub fn typed<T: Send + Sync + 'static>(value: T) -> Self {
        Self {
            matcher: Matcher::Typed(TypeId::of::<T>()),
            type_name: type_name::<T>(),
            value: Arc::new(value),
        }
    }

    fn value<T: Clone + 'static>(&self) -> Option<T> {
        self.value.downcast_ref::<T>().cloned()
    }
}

impl fmt::Debug for Parameter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.matcher {
            Matcher::Named(name) => write!(f, "Parameter({name}: {})", self.type_name),
            Matcher::Typed(_) => write!(f, "Parameter(<{}>)", self.type_name),
        }
    }
}

/// An ordered set of parameters; the first match wins
#[derive(Debug, Clone, Default)]
pub struct Parameters {
    items: Vec<Parameter>,
}

impl Parameters {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, parameter: Parameter) -> Self {
        self.items.push(parameter);
        self
    }

    pub fn with_named<T: Send + Sync + 'static>(self, name: impl Into<String>, value: T) -> Self {
        self.with(Parameter::named(name, value))
    }

    pub fn with_typed<T: Send + Sync + 'static>(self, value: T) -> Self {
        self.with(Parameter::typed(value))
    }

    /// First parameter called `name` holding a `T`
    pub fn named<T: Clone + 'static>(&self, name: &str) -> Option<T> {
        self.items.iter().find_map(|p| match &p.matcher {
            Matcher::Named(n) if n == name => p.value::<T>(),
            _ => None,
        })
    }

    /// First parameter registered by type `T`
    pub fn typed<T: Clone + 'static>(&self) -> Option<T> {
        let wanted = TypeId::of::<T>();
        self.items.iter().find_map(|p| match p.matcher {
            Matcher::Typed(id) if id == wanted => p.value::<T>(),
            _ => None,
        })
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

impl FromIterator<Parameter> for Parameters {
    fn from_iter<I: IntoIterator<Item = Parameter>>(iter: I) -> Self {
        Self {
            items: iter.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_named_lookup() {
        let params = Parameters::new()
            .with_named("port", 8080u16)
            .with_named("host", "localhost".to_string());

        assert_eq!(params.named::<u16>("port"), Some(8080));
        assert_eq!(params.named::<String>("host").as_deref(), Some("localhost"));
        assert_eq!(params.named::<u32>("port"), None);
        assert_eq!(params.named::<u16>("missing"), None);
        assert_eq!(params.len(), 2);
    }

    #[test]
    fn test_typed_lookup_first_match_wins() {
        let params: Parameters = vec![Parameter::typed(1u8), Parameter::typed(2u8)]
            .into_iter()
            .collect();
        assert_eq!(params.typed::<u8>(), Some(1));
        assert_eq!(params.typed::<i8>(), None);
        assert!(Parameters::new().is_empty());
    }
}
