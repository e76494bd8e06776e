//! Generated tests and parametrized classes.

use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use super::current::{self, CurrentTest};
use super::{Call, ClassParams, ResourceStack};
use crate::container::{TestClass, TestMethod, LABEL_KWARG};
use crate::diagnostics::{Failure, TestResult};
use crate::param::Param;
use crate::value::Value;

/// One test generated from a marked method and one combined record.
pub struct GeneratedTest<F> {
    name: String,
    index: usize,
    record: Param,
    label: String,
    original: Arc<TestMethod<F>>,
    inject_generic: bool,
}

impl<F> GeneratedTest<F> {
    pub(crate) fn new(
        name: String,
        index: usize,
        record: Param,
        original: Arc<TestMethod<F>>,
        inject_generic: bool,
    ) -> Self {
        let label = record.effective_label();
        Self {
            name,
            index,
            record,
            label,
            original,
            inject_generic,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn base_name(&self) -> &str {
        self.original.name()
    }

    /// 0-based position among the tests generated from the same method.
    pub fn index(&self) -> usize {
        self.index
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn record(&self) -> &Param {
        &self.record
    }

    pub fn original(&self) -> &TestMethod<F> {
        &self.original
    }
}

impl<F: 'static> GeneratedTest<F> {
    /// Runs the test against `fixture`.
    ///
    /// The record is published as the thread's current test, its resources
    /// are entered in order, the body runs with the record's values, and the
    /// resources are exited in reverse order whatever happened. Failures and
    /// panics of the body reach the caller unchanged unless a resource that
    /// opted in suppressed them.
    pub fn call(&self, fixture: &mut F) -> TestResult {
        self.call_with(fixture, None)
    }

    pub(crate) fn call_with(
        &self,
        fixture: &mut F,
        class_params: Option<Arc<ClassParams>>,
    ) -> TestResult {
        let args = self.record.args_vec();
        let mut kwargs = self.record.named().clone();

        let guard = current::publish(CurrentTest {
            base_name: self.original.name().to_string(),
            name: self.name.clone(),
            index: self.index,
            label: self.label.clone(),
            args: args.clone(),
            kwargs: kwargs.clone(),
            context_targets: Vec::new(),
            original: self.original.clone(),
        });

        let (stack, targets) = match ResourceStack::enter(self.record.resources()) {
            Ok(entered) => entered,
            Err(failure) => return Failure::settle(Some(failure)),
        };
        guard.set_context_targets(targets.clone());

        if self.inject_generic {
            if let Some(signature) = self.original.signature() {
                for key in signature.generic_targets(args.len(), &kwargs) {
                    let value = if key == LABEL_KWARG {
                        Value::from(self.label.as_str())
                    } else {
                        Value::List(targets.clone())
                    };
                    kwargs.insert(key.to_string(), value);
                }
            }
        }

        let call = Call {
            args,
            kwargs,
            label: self.label.clone(),
            context_targets: targets,
            signature: self.original.signature().cloned(),
            class_params,
        };

        tracing::trace!(test = %self.name, "running generated test");
        let outcome = match panic::catch_unwind(AssertUnwindSafe(|| {
            self.original.invoke(fixture, &call)
        })) {
            Ok(Ok(())) => None,
            Ok(Err(err)) => Some(Failure::Error(err)),
            Err(payload) => Some(Failure::Panic(payload)),
        };
        let outcome = stack.exit(outcome);
        drop(guard);
        Failure::settle(outcome)
    }
}

impl<F> Clone for GeneratedTest<F> {
    fn clone(&self) -> Self {
        Self {
            name: self.name.clone(),
            index: self.index,
            record: self.record.clone(),
            label: self.label.clone(),
            original: Arc::clone(&self.original),
            inject_generic: self.inject_generic,
        }
    }
}

impl<F> fmt::Debug for GeneratedTest<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GeneratedTest")
            .field("name", &self.name)
            .field("index", &self.index)
            .field("record", &self.record)
            .finish_non_exhaustive()
    }
}

// =============================
// Parametrized classes
// =============================

/// One copy of a class generated from a class-level record.
pub struct ParametrizedClass<F> {
    name: String,
    index: usize,
    record: Param,
    label: String,
    base: Arc<TestClass<F>>,
}

impl<F> ParametrizedClass<F> {
    pub(crate) fn new(name: String, index: usize, record: Param, base: Arc<TestClass<F>>) -> Self {
        let label = record.effective_label();
        Self {
            name,
            index,
            record,
            label,
            base,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn record(&self) -> &Param {
        &self.record
    }

    pub fn base(&self) -> &TestClass<F> {
        &self.base
    }

    pub fn test_names(&self, prefix: &str) -> Vec<String> {
        self.base.test_names(prefix)
    }

    /// A fresh instance, before set-up.
    pub fn instantiate(&self) -> ClassInstance<'_, F> {
        ClassInstance {
            class: self,
            fixture: self.base.instantiate(),
            stack: None,
            params: None,
        }
    }
}

impl<F> fmt::Debug for ParametrizedClass<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ParametrizedClass")
            .field("name", &self.name)
            .field("base", &self.base.name())
            .field("record", &self.record)
            .finish()
    }
}

/// A live instance of a parametrized class, holding its resources between
/// set-up and tear-down.
pub struct ClassInstance<'a, F> {
    class: &'a ParametrizedClass<F>,
    fixture: F,
    stack: Option<ResourceStack>,
    params: Option<Arc<ClassParams>>,
}

impl<F: 'static> ClassInstance<'_, F> {
    pub fn fixture(&self) -> &F {
        &self.fixture
    }

    pub fn fixture_mut(&mut self) -> &mut F {
        &mut self.fixture
    }

    /// Set once [`ClassInstance::set_up`] has acquired the resources.
    pub fn params(&self) -> Option<&ClassParams> {
        self.params.as_deref()
    }

    /// Acquires the record's resources, publishes the class parameters, then
    /// runs the base set-up hook. If the hook fails, the resources are
    /// released right away with that failure.
    pub fn set_up(&mut self) -> TestResult {
        let class = self.class;
        let record = &class.record;
        let (stack, targets) = match ResourceStack::enter(record.resources()) {
            Ok(entered) => entered,
            Err(failure) => return Failure::settle(Some(failure)),
        };
        let params = Arc::new(ClassParams {
            label: class.label.clone(),
            params: record.args_vec(),
            attrs: record.named().clone(),
            context_targets: targets,
        });
        self.params = Some(Arc::clone(&params));

        let fixture = &mut self.fixture;
        match catch_failure(|| class.base.run_set_up(fixture, Some(params))) {
            None => {
                self.stack = Some(stack);
                Ok(())
            }
            Some(failure) => Failure::settle(stack.exit(Some(failure))),
        }
    }

    /// Runs one test of the base class on this instance.
    pub fn run(&mut self, name: &str) -> TestResult {
        self.class
            .base
            .invoke_with(name, &mut self.fixture, self.params.clone())
    }

    /// Runs the base tear-down hook, then releases the resources, handing
    /// them the hook's failure if any.
    pub fn tear_down(&mut self) -> TestResult {
        let class = self.class;
        let params = self.params.clone();
        let fixture = &mut self.fixture;
        let outcome = catch_failure(|| class.base.run_tear_down(fixture, params));
        let outcome = match self.stack.take() {
            Some(stack) => stack.exit(outcome),
            None => outcome,
        };
        Failure::settle(outcome)
    }
}

fn catch_failure(f: impl FnOnce() -> TestResult) -> Option<Failure> {
    match panic::catch_unwind(AssertUnwindSafe(f)) {
        Ok(Ok(())) => None,
        Ok(Err(err)) => Some(Failure::Error(err)),
        Err(payload) => Some(Failure::Panic(payload)),
    }
}
