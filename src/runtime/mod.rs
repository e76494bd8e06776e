//! What a generated test sees while it runs.
//!
//! Every call gets its values explicitly through [`Call`]. The same
//! information is also published as thread-local state, readable from
//! anywhere inside the call through [`current()`].

mod current;
mod generated;
mod scope;

use std::sync::Arc;

use crate::container::Signature;
use crate::diagnostics::TestFailure;
use crate::value::{Kwargs, Value};

pub use current::{current, CurrentTest};
pub use generated::{ClassInstance, GeneratedTest, ParametrizedClass};
pub(crate) use scope::ResourceStack;

/// Values of one call of a test body or hook.
#[derive(Debug, Clone, Default)]
pub struct Call {
    args: Vec<Value>,
    kwargs: Kwargs,
    label: String,
    context_targets: Vec<Value>,
    signature: Option<Signature>,
    class_params: Option<Arc<ClassParams>>,
}

impl Call {
    /// A call without parameters, for hooks and unmarked methods.
    pub(crate) fn plain(class_params: Option<Arc<ClassParams>>) -> Self {
        Self {
            class_params,
            ..Self::default()
        }
    }

    pub fn args(&self) -> &[Value] {
        &self.args
    }

    pub fn kwargs(&self) -> &Kwargs {
        &self.kwargs
    }

    pub fn arg(&self, index: usize) -> Result<&Value, TestFailure> {
        self.args.get(index).ok_or_else(|| {
            TestFailure::new(format!(
                "no positional argument at index {} ({} given)",
                index,
                self.args.len()
            ))
        })
    }

    pub fn kwarg(&self, key: &str) -> Result<&Value, TestFailure> {
        self.kwargs
            .get(key)
            .ok_or_else(|| TestFailure::new(format!("no keyword argument '{}'", key)))
    }

    /// Looks a value up by parameter name: named values first, then the
    /// positional value bound to that name by the declared signature.
    pub fn param(&self, name: &str) -> Result<&Value, TestFailure> {
        if let Some(value) = self.kwargs.get(name) {
            return Ok(value);
        }
        self.signature
            .as_ref()
            .and_then(|signature| signature.position(name))
            .and_then(|index| self.args.get(index))
            .ok_or_else(|| TestFailure::new(format!("no argument bound to '{}'", name)))
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    /// Values returned by the enter hooks of the call's resources, in
    /// attachment order.
    pub fn context_targets(&self) -> &[Value] {
        &self.context_targets
    }

    /// Parameters of the enclosing parametrized class, if any.
    pub fn class_params(&self) -> Option<&ClassParams> {
        self.class_params.as_deref()
    }
}

/// Per-instance parameters of a parametrized class.
#[derive(Debug, Clone, Default)]
pub struct ClassParams {
    pub label: String,
    pub params: Vec<Value>,
    pub attrs: Kwargs,
    pub context_targets: Vec<Value>,
}

impl ClassParams {
    pub fn attr(&self, name: &str) -> Result<&Value, TestFailure> {
        self.attrs
            .get(name)
            .ok_or_else(|| TestFailure::new(format!("no class attribute '{}'", name)))
    }
}
