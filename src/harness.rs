//! A minimal host for running expanded classes end to end.
//!
//! Discovery is by name prefix. Every test gets a fresh fixture and runs
//! between the class's set-up and tear-down hooks; tear-down runs even when
//! the test fails, and is skipped when set-up fails.

use std::fmt;
use std::panic::{self, AssertUnwindSafe};

use crate::container::{Entry, Namespace, TestClass};
use crate::diagnostics::{panic_message, TestFailure};
use crate::expand::Expansion;
use crate::runtime::ParametrizedClass;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Passed,
    Failed(String),
    Panicked(String),
}

impl Outcome {
    fn is_passed(&self) -> bool {
        matches!(self, Outcome::Passed)
    }
}

/// Result of one test, named `Class.test`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestReport {
    pub name: String,
    pub outcome: Outcome,
}

impl TestReport {
    pub fn passed(&self) -> bool {
        self.outcome.is_passed()
    }
}

impl fmt::Display for TestReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.outcome {
            Outcome::Passed => write!(f, "{} ... ok", self.name),
            Outcome::Failed(message) => write!(f, "{} ... FAIL: {}", self.name, message),
            Outcome::Panicked(message) => write!(f, "{} ... PANIC: {}", self.name, message),
        }
    }
}

/// Runs discovered tests and collects their reports.
#[derive(Debug, Clone)]
pub struct TestRunner {
    prefix: String,
}

impl Default for TestRunner {
    fn default() -> Self {
        Self::new("test")
    }
}

impl TestRunner {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }

    pub fn run_class<F: 'static>(&self, class: &TestClass<F>) -> Vec<TestReport> {
        class
            .test_names(&self.prefix)
            .into_iter()
            .map(|test| TestReport {
                outcome: Self::run_single(class, &test),
                name: format!("{}.{}", class.name(), test),
            })
            .collect()
    }

    pub fn run_parametrized<F: 'static>(&self, class: &ParametrizedClass<F>) -> Vec<TestReport> {
        class
            .test_names(&self.prefix)
            .into_iter()
            .map(|test| TestReport {
                outcome: Self::run_single_parametrized(class, &test),
                name: format!("{}.{}", class.name(), test),
            })
            .collect()
    }

    pub fn run_expansion<F: 'static>(&self, expansion: &Expansion<F>) -> Vec<TestReport> {
        match expansion {
            Expansion::Class(class) => self.run_class(class),
            Expansion::Parametrized { classes, .. } => classes
                .iter()
                .flat_map(|class| self.run_parametrized(class))
                .collect(),
        }
    }

    /// Runs every class in `namespace`. Substitutes are skipped.
    pub fn run_namespace<F: 'static>(&self, namespace: &Namespace<F>) -> Vec<TestReport> {
        namespace
            .entries()
            .flat_map(|(_, entry)| match entry {
                Entry::Class(class) => self.run_class(class),
                Entry::Parametrized(class) => self.run_parametrized(class),
                Entry::Substitute(_) => Vec::new(),
            })
            .collect()
    }

    fn run_single<F: 'static>(class: &TestClass<F>, test: &str) -> Outcome {
        let mut fixture = match guarded(|| Ok(class.instantiate())) {
            Ok(fixture) => fixture,
            Err(outcome) => return outcome,
        };
        if let Err(outcome) = guarded(|| class.run_set_up(&mut fixture, None)) {
            return outcome;
        }
        let body = guarded(|| class.invoke(test, &mut fixture));
        let tear_down = guarded(|| class.run_tear_down(&mut fixture, None));
        body.and(tear_down).err().unwrap_or(Outcome::Passed)
    }

    fn run_single_parametrized<F: 'static>(class: &ParametrizedClass<F>, test: &str) -> Outcome {
        let mut instance = match guarded(|| Ok(class.instantiate())) {
            Ok(instance) => instance,
            Err(outcome) => return outcome,
        };
        if let Err(outcome) = guarded(|| instance.set_up()) {
            return outcome;
        }
        let body = guarded(|| instance.run(test));
        let tear_down = guarded(|| instance.tear_down());
        body.and(tear_down).err().unwrap_or(Outcome::Passed)
    }
}

fn guarded<T>(f: impl FnOnce() -> Result<T, TestFailure>) -> Result<T, Outcome> {
    match panic::catch_unwind(AssertUnwindSafe(f)) {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(err)) => Err(Outcome::Failed(err.to_string())),
        Err(payload) => Err(Outcome::Panicked(panic_message(payload.as_ref()))),
    }
}
