// Interception state behind a generated test double

use crate::FakeError;
use parking_lot::Mutex;
use std::any::{Any, type_name};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::trace;

type Producer = Arc<dyn Fn() -> Box<dyn Any + Send> + Send + Sync>;

#[derive(Clone)]
enum Behavior {
    Returns {
        produce: Producer,
        type_name: &'static str,
    },
    Throws(String),
    DoesNothing,
}

/// An option applied to a fake while it is being created
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FakeOption {
    /// Unconfigured members fail instead of returning a default
    Strict,
    /// A caller-supplied customization callback ran
    Customization,
    /// Members with a base body run that body
    CallsBaseMethods,
}

struct FakeState {
    type_name: &'static str,
    strict: AtomicBool,
    calls_base: AtomicBool,
    behaviors: Mutex<HashMap<String, Behavior>>,
    calls: Mutex<Vec<String>>,
    options: Mutex<Vec<FakeOption>>,
}

/// Handle to the interception state of one fake object.
///
/// A fake is a small struct implementing the faked trait whose methods
/// forward to [`Fake::invoke`] (abstract members) or
/// [`Fake::invoke_with_base`] (members with a provided body). Cloning the
/// handle shares the state, so a test can keep a clone to configure the fake
/// or inspect its calls after the fake has been handed to a container.
///
/// ```
/// use armature_fake::Fake;
///
/// trait Clock: Send + Sync {
///     fn now(&self) -> u64;
/// }
///
/// struct ClockFake(Fake);
///
/// impl Clock for ClockFake {
///     fn now(&self) -> u64 {
///         self.0.invoke("now")
///     }
/// }
///
/// let fake = Fake::new("dyn Clock");
/// let clock = ClockFake(fake.clone());
/// assert_eq!(clock.now(), 0);
///
/// fake.call_to("now").returns(42u64);
/// assert_eq!(clock.now(), 42);
/// assert_eq!(fake.call_count("now"), 2);
/// ```
#[derive(Clone)]
pub struct Fake {
    state: Arc<FakeState>,
}

impl Fake {
    /// Create a lenient fake for the named type
    pub fn new(type_name: &'static str) -> Self {
        Self {
            state: Arc::new(FakeState {
                type_name,
                strict: AtomicBool::new(false),
                calls_base: AtomicBool::new(false),
                behaviors: Mutex::new(HashMap::new()),
                calls: Mutex::new(Vec::new()),
                options: Mutex::new(Vec::new()),
            }),
        }
    }

    /// Name of the faked type
    pub fn type_name(&self) -> &'static str {
        self.state.type_name
    }

    pub fn is_strict(&self) -> bool {
        self.state.strict.load(Ordering::Relaxed)
    }

    pub fn calls_base_methods(&self) -> bool {
        self.state.calls_base.load(Ordering::Relaxed)
    }

    pub(crate) fn set_strict(&self) {
        self.state.strict.store(true, Ordering::Relaxed);
    }

    pub(crate) fn set_calls_base_methods(&self) {
        self.state.calls_base.store(true, Ordering::Relaxed);
    }

    pub(crate) fn record_option(&self, option: FakeOption) {
        self.state.options.lock().push(option);
    }

    /// Options applied at creation, in the order they were applied
    pub fn applied_options(&self) -> Vec<FakeOption> {
        self.state.options.lock().clone()
    }

    /// Start configuring the behavior of a member
    pub fn call_to(&self, member: &str) -> CallConfiguration<'_> {
        CallConfiguration {
            fake: self,
            member: member.to_string(),
        }
    }

    fn configure(&self, member: String, behavior: Behavior) {
        trace!(fake = self.state.type_name, member = %member, "Configuring fake member");
        self.state.behaviors.lock().insert(member, behavior);
    }

    /// Dispatch a call to a member without a base body.
    ///
    /// # Panics
    ///
    /// Panics with the [`FakeError`] message when the fake is strict and the
    /// member is unconfigured, or when the member was configured to throw.
    pub fn invoke<R: Default + 'static>(&self, member: &str) -> R {
        self.try_invoke(member).unwrap_or_else(|err| panic!("{err}"))
    }

    /// Dispatch a call to a member without a base body
    pub fn try_invoke<R: Default + 'static>(&self, member: &str) -> Result<R, FakeError> {
        self.record_call(member);
        match self.configured(member) {
            Some(result) => result,
            None => self.unconfigured(member),
        }
    }

    /// Dispatch a call to a member that has a base body.
    ///
    /// When base-method delegation is on, `base` runs regardless of any
    /// configured behavior or strictness.
    ///
    /// # Panics
    ///
    /// Same as [`Fake::invoke`] when delegation is off.
    pub fn invoke_with_base<R, F>(&self, member: &str, base: F) -> R
    where
        R: Default + 'static,
        F: FnOnce() -> R,
    {
        self.try_invoke_with_base(member, base)
            .unwrap_or_else(|err| panic!("{err}"))
    }

    pub fn try_invoke_with_base<R, F>(&self, member: &str, base: F) -> Result<R, FakeError>
    where
        R: Default + 'static,
        F: FnOnce() -> R,
    {
        self.record_call(member);
        if self.calls_base_methods() {
            trace!(fake = self.state.type_name, member, "Delegating to base body");
            return Ok(base());
        }
        match self.configured(member) {
            Some(result) => result,
            None => self.unconfigured(member),
        }
    }

    fn record_call(&self, member: &str) {
        self.state.calls.lock().push(member.to_string());
    }

    fn configured<R: Default + 'static>(&self, member: &str) -> Option<Result<R, FakeError>> {
        // cloned out so a producer may call back into this fake
        let behavior = self.state.behaviors.lock().get(member).cloned()?;
        let result = match behavior {
            Behavior::Returns { produce, type_name: configured } => produce()
                .downcast::<R>()
                .map(|value| *value)
                .map_err(|_| FakeError::ReturnType {
                    type_name: self.state.type_name,
                    member: member.to_string(),
                    configured,
                    expected: type_name::<R>(),
                }),
            Behavior::Throws(message) => Err(FakeError::Thrown {
                type_name: self.state.type_name,
                member: member.to_string(),
                message,
            }),
            Behavior::DoesNothing => Ok(R::default()),
        };
        Some(result)
    }

    fn unconfigured<R: Default>(&self, member: &str) -> Result<R, FakeError> {
        if self.is_strict() {
            return Err(FakeError::StrictCall {
                type_name: self.state.type_name,
                member: member.to_string(),
            });
        }
        Ok(R::default())
    }

    /// All recorded calls, in order
    pub fn calls(&self) -> Vec<String> {
        self.state.calls.lock().clone()
    }

    /// Number of calls made to a member
    pub fn call_count(&self, member: &str) -> usize {
        self.state
            .calls
            .lock()
            .iter()
            .filter(|m| m.as_str() == member)
            .count()
    }

    pub fn was_called(&self, member: &str) -> bool {
        self.call_count(member) > 0
    }

    pub fn clear_calls(&self) {
        self.state.calls.lock().clear();
    }

    /// Drop every configured behavior and recorded call.
    ///
    /// Strictness and base delegation are creation-time options and survive.
    pub fn reset(&self) {
        self.state.behaviors.lock().clear();
        self.clear_calls();
    }

    /// Check whether two handles control the same fake
    pub fn ptr_eq(&self, other: &Fake) -> bool {
        Arc::ptr_eq(&self.state, &other.state)
    }
}

impl fmt::Debug for Fake {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Fake")
            .field("type_name", &self.state.type_name)
            .field("strict", &self.is_strict())
            .field("calls_base_methods", &self.calls_base_methods())
            .field("calls", &self.state.calls.lock().len())
            .finish()
    }
}

/// Fluent configuration for one member of a fake
pub struct CallConfiguration<'a> {
    fake: &'a Fake,
    member: String,
}

impl CallConfiguration<'_> {
    /// Return a clone of `value` on every call
    pub fn returns<R>(self, value: R)
    where
        R: Clone + Send + Sync + 'static,
    {
        self.returns_with(move || value.clone());
    }

    /// Compute the return value on every call
    pub fn returns_with<R, F>(self, produce: F)
    where
        R: Send + 'static,
        F: Fn() -> R + Send + Sync + 'static,
    {
        let produce: Producer = Arc::new(move || Box::new(produce()) as Box<dyn Any + Send>);
        self.fake.configure(
            self.member,
            Behavior::Returns {
                produce,
                type_name: type_name::<R>(),
            },
        );
    }

    /// Fail every call with `message`
    pub fn throws(self, message: impl Into<String>) {
        self.fake.configure(self.member, Behavior::Throws(message.into()));
    }

    /// Accept the call and return the default value, even on a strict fake
    pub fn does_nothing(self) {
        self.fake.configure(self.member, Behavior::DoesNothing);
    }
}
