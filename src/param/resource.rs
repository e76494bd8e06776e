//! Scoped resources attached to parameter records.
//!
//! A resource is acquired right before a generated test body runs and
//! released right after it, whatever the outcome. Several resources nest:
//! they are entered in attachment order and exited in reverse.

use std::fmt;
use std::sync::Arc;

use crate::diagnostics::{Failure, TestFailure};
use crate::value::{Kwargs, Value};

/// An acquired resource.
pub trait Resource {
    /// Acquires the resource. The returned value becomes this resource's
    /// entry in the call's context targets.
    fn enter(&mut self) -> Result<Value, TestFailure>;

    /// Releases the resource. `failure` is what is currently propagating out
    /// of the body (or out of inner resources). Returning `Ok(true)` asks to
    /// suppress it, which only takes effect when the resource was attached
    /// with [`ResourceSpec::suppress_exceptions`]. Returning an error replaces
    /// the propagating failure.
    fn exit(&mut self, failure: Option<&Failure>) -> Result<bool, TestFailure>;
}

/// Creates a fresh [`Resource`] for every generated call.
pub trait ResourceFactory: Send + Sync {
    fn create(&self, args: &[Value], kwargs: &Kwargs) -> Result<Box<dyn Resource>, TestFailure>;
}

struct FnFactory<F>(F);

impl<F, R> ResourceFactory for FnFactory<F>
where
    F: Fn(&[Value], &Kwargs) -> Result<R, TestFailure> + Send + Sync,
    R: Resource + 'static,
{
    fn create(&self, args: &[Value], kwargs: &Kwargs) -> Result<Box<dyn Resource>, TestFailure> {
        Ok(Box::new((self.0)(args, kwargs)?))
    }
}

/// A resource factory together with the arguments it is invoked with and
/// its suppression policy.
#[derive(Clone)]
pub struct ResourceSpec {
    factory: Arc<dyn ResourceFactory>,
    args: Vec<Value>,
    kwargs: Kwargs,
    suppress_exceptions: bool,
}

impl ResourceSpec {
    pub fn new<T: ResourceFactory + 'static>(factory: T) -> Self {
        Self {
            factory: Arc::new(factory),
            args: Vec::new(),
            kwargs: Kwargs::new(),
            suppress_exceptions: false,
        }
    }

    /// Builds a spec from a fallible closure receiving the factory arguments.
    pub fn from_fn<F, R>(factory: F) -> Self
    where
        F: Fn(&[Value], &Kwargs) -> Result<R, TestFailure> + Send + Sync + 'static,
        R: Resource + 'static,
    {
        Self::new(FnFactory(factory))
    }

    /// Builds a spec from an infallible constructor taking no arguments.
    pub fn from_make<F, R>(make: F) -> Self
    where
        F: Fn() -> R + Send + Sync + 'static,
        R: Resource + 'static,
    {
        Self::from_fn(move |_: &[Value], _: &Kwargs| Ok(make()))
    }

    pub fn arg(mut self, value: impl Into<Value>) -> Self {
        self.args.push(value.into());
        self
    }

    pub fn kwarg(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.kwargs.insert(key.into(), value.into());
        self
    }

    /// Lets this resource's exit hook suppress a propagating failure.
    /// Off by default.
    pub fn suppress_exceptions(mut self, enabled: bool) -> Self {
        self.suppress_exceptions = enabled;
        self
    }

    pub fn suppresses_exceptions(&self) -> bool {
        self.suppress_exceptions
    }

    pub fn args(&self) -> &[Value] {
        &self.args
    }

    pub fn kwargs(&self) -> &Kwargs {
        &self.kwargs
    }

    pub(crate) fn create(&self) -> Result<Box<dyn Resource>, TestFailure> {
        self.factory.create(&self.args, &self.kwargs)
    }

    /// Two specs are the same when they share the factory object and agree on
    /// arguments and policy.
    pub fn same_as(&self, other: &ResourceSpec) -> bool {
        Arc::ptr_eq(&self.factory, &other.factory)
            && self.args == other.args
            && self.kwargs == other.kwargs
            && self.suppress_exceptions == other.suppress_exceptions
    }
}

impl fmt::Debug for ResourceSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResourceSpec")
            .field("args", &self.args)
            .field("kwargs", &self.kwargs)
            .field("suppress_exceptions", &self.suppress_exceptions)
            .finish_non_exhaustive()
    }
}
