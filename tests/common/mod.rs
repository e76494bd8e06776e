//! Shared helpers for the integration tests.
#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use expander::prelude::*;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

/// Ordered record of what resources and bodies did.
pub type Log = Arc<Mutex<Vec<String>>>;

pub fn new_log() -> Log {
    Arc::default()
}

pub fn push(log: &Log, entry: impl Into<String>) {
    log.lock().unwrap().push(entry.into());
}

pub fn entries(log: &Log) -> Vec<String> {
    log.lock().unwrap().clone()
}

pub fn setup_test_tracing() {
    let _ = tracing_subscriber::registry()
        .with(EnvFilter::new("expander=trace"))
        .with(tracing_subscriber::fmt::layer().with_test_writer())
        .try_init();
}

/// A resource that logs its enter and exit calls.
pub struct Recorder {
    tag: String,
    log: Log,
    fail_enter: bool,
    fail_exit: bool,
    ask_suppress: bool,
}

impl Resource for Recorder {
    fn enter(&mut self) -> Result<Value, TestFailure> {
        push(&self.log, format!("enter {}", self.tag));
        if self.fail_enter {
            return Err(TestFailure::new(format!("{} failed to enter", self.tag)));
        }
        Ok(Value::from(format!("target {}", self.tag)))
    }

    fn exit(&mut self, failure: Option<&Failure>) -> Result<bool, TestFailure> {
        let seen = failure.map_or_else(|| "ok".to_string(), Failure::message);
        push(&self.log, format!("exit {} ({})", self.tag, seen));
        if self.fail_exit {
            return Err(TestFailure::new(format!("{} failed to exit", self.tag)));
        }
        Ok(self.ask_suppress)
    }
}

/// Builds [`Recorder`] resource specs.
#[derive(Clone)]
pub struct RecorderSpec {
    tag: String,
    log: Log,
    fail_enter: bool,
    fail_exit: bool,
    ask_suppress: bool,
}

pub fn recorder(log: &Log, tag: &str) -> RecorderSpec {
    RecorderSpec {
        tag: tag.to_string(),
        log: Arc::clone(log),
        fail_enter: false,
        fail_exit: false,
        ask_suppress: false,
    }
}

impl RecorderSpec {
    pub fn failing_enter(mut self) -> Self {
        self.fail_enter = true;
        self
    }

    pub fn failing_exit(mut self) -> Self {
        self.fail_exit = true;
        self
    }

    pub fn asking_suppress(mut self) -> Self {
        self.ask_suppress = true;
        self
    }

    pub fn spec(self) -> ResourceSpec {
        ResourceSpec::from_make(move || Recorder {
            tag: self.tag.clone(),
            log: Arc::clone(&self.log),
            fail_enter: self.fail_enter,
            fail_exit: self.fail_exit,
            ask_suppress: self.ask_suppress,
        })
    }
}

/// Names of the runnable tests of an expansion's class.
pub fn test_names<F>(expansion: &Expansion<F>) -> Vec<String> {
    expansion.class().test_names("test")
}

/// Runs one generated test of an expanded class against a fresh fixture.
pub fn run<F: 'static>(expansion: &Expansion<F>, name: &str) -> TestResult {
    let class = expansion.class();
    let mut fixture = class.instantiate();
    class.invoke(name, &mut fixture)
}
