//! Unified diagnostics for the expander.
//!
//! Two families of failures live here and never mix:
//!
//! - [`ExpandError`]: everything the expander itself detects. These surface
//!   synchronously while a container is being expanded, before any generated
//!   test runs (bad collection kinds, conflicting named values, records that
//!   do not fit the test body's signature, broken name patterns).
//! - [`TestFailure`] / [`Failure`]: what test bodies and resource hooks
//!   produce at run time. The expander passes these through untouched except
//!   where a resource explicitly opted into suppressing them.

use std::any::Any;
use std::error::Error as StdError;

use miette::Diagnostic;
use thiserror::Error;

/// Boxed error source attached to a [`TestFailure`].
pub type BoxedError = Box<dyn StdError + Send + Sync + 'static>;

/// Outcome of a single test body, set-up hook, or tear-down hook.
pub type TestResult = Result<(), TestFailure>;

/// Type-safe error classification that corresponds to `ExpandError` variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorType {
    /// A value that cannot act as a parameter collection
    InvalidCollectionKind,
    /// Two merged records disagree on a named value
    ParamConflict,
    /// A record does not fit the declared signature of its test body
    SignatureMismatch,
    /// A name pattern could not be rendered
    NamePattern,
    /// Generated names could not be made unique
    NameCollision,
    /// A substituted (already expanded) member was invoked
    NotCallable,
    /// Configuration could not be loaded
    InvalidConfig,
}

impl ErrorType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorType::InvalidCollectionKind => "InvalidCollectionKind",
            ErrorType::ParamConflict => "ParamConflict",
            ErrorType::SignatureMismatch => "SignatureMismatch",
            ErrorType::NamePattern => "NamePattern",
            ErrorType::NameCollision => "NameCollision",
            ErrorType::NotCallable => "NotCallable",
            ErrorType::InvalidConfig => "InvalidConfig",
        }
    }
}

impl std::fmt::Display for ErrorType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Errors detected while normalizing, combining, naming, or installing
/// parameterized tests.
#[derive(Debug, Error, Diagnostic)]
pub enum ExpandError {
    #[error("{kind} value {value} is not a legal parameter collection")]
    #[diagnostic(
        code(expander::invalid_collection_kind),
        help("use a list, a tuple, a string-keyed map, a set, a generator, or a ParamSeq")
    )]
    InvalidCollectionKind { kind: &'static str, value: String },

    #[error("conflicting keyword arguments: {}", quoted_list(.keys))]
    #[diagnostic(
        code(expander::param_conflict),
        help("records combined from stacked collections must agree on every named value they share")
    )]
    ParamConflict { keys: Vec<String> },

    #[error("parameters of `{test}` do not fit its signature: {message}")]
    #[diagnostic(code(expander::signature_mismatch))]
    SignatureMismatch { test: String, message: String },

    #[error("cannot render name pattern {pattern:?}: {message}")]
    #[diagnostic(
        code(expander::name_pattern),
        help("recognized placeholders are base_name, label and count, optionally with a :N or :0N width; double a brace to write it literally")
    )]
    NamePattern { pattern: String, message: String },

    #[error("generated name {name:?} collides with an existing member")]
    #[diagnostic(code(expander::name_collision))]
    NameCollision { name: String },

    #[error("`{name}` was replaced by a substitute during expansion and cannot be called")]
    #[diagnostic(
        code(expander::not_callable),
        help("call one of the generated tests instead")
    )]
    NotCallable { name: String },

    #[error("invalid expander configuration: {message}")]
    #[diagnostic(code(expander::invalid_config))]
    InvalidConfig {
        message: String,
        #[source]
        source: Option<serde_json::Error>,
    },
}

impl ExpandError {
    /// Returns the type-safe classification of this error.
    pub fn error_type(&self) -> ErrorType {
        match self {
            ExpandError::InvalidCollectionKind { .. } => ErrorType::InvalidCollectionKind,
            ExpandError::ParamConflict { .. } => ErrorType::ParamConflict,
            ExpandError::SignatureMismatch { .. } => ErrorType::SignatureMismatch,
            ExpandError::NamePattern { .. } => ErrorType::NamePattern,
            ExpandError::NameCollision { .. } => ErrorType::NameCollision,
            ExpandError::NotCallable { .. } => ErrorType::NotCallable,
            ExpandError::InvalidConfig { .. } => ErrorType::InvalidConfig,
        }
    }
}

fn quoted_list(keys: &[String]) -> String {
    keys.iter()
        .map(|k| format!("'{}'", k))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Constructs an `ExpandError` variant whose only payload is a formatted
/// `message` plus the given named fields.
#[macro_export]
macro_rules! expand_err {
    ($variant:ident { $($field:ident : $value:expr),* $(,)? }, $($fmt:tt)+) => {
        $crate::ExpandError::$variant {
            $($field: $value,)*
            message: format!($($fmt)+),
        }
    };
}

// =============================
// Runtime failures
// =============================

/// A failure reported by a test body or by a resource hook.
#[derive(Debug, Error)]
#[error("{message}")]
pub struct TestFailure {
    message: String,
    #[source]
    source: Option<BoxedError>,
}

impl TestFailure {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            source: None,
        }
    }

    /// Wraps an arbitrary error, keeping it as the source.
    pub fn wrap<E>(error: E) -> Self
    where
        E: StdError + Send + Sync + 'static,
    {
        Self {
            message: error.to_string(),
            source: Some(Box::new(error)),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl From<ExpandError> for TestFailure {
    fn from(err: ExpandError) -> Self {
        TestFailure::wrap(err)
    }
}

/// Whatever is propagating out of a generated call: a returned failure or a
/// panic payload.
pub enum Failure {
    Error(TestFailure),
    Panic(Box<dyn Any + Send + 'static>),
}

impl Failure {
    /// Human-readable description, including panic messages.
    pub fn message(&self) -> String {
        match self {
            Failure::Error(err) => err.to_string(),
            Failure::Panic(payload) => panic_message(payload.as_ref()),
        }
    }

    pub fn is_panic(&self) -> bool {
        matches!(self, Failure::Panic(_))
    }

    /// Hands an outcome back to the caller: failures are returned, panics are
    /// resumed with their original payload.
    pub fn settle(outcome: Option<Failure>) -> TestResult {
        match outcome {
            None => Ok(()),
            Some(Failure::Error(err)) => Err(err),
            Some(Failure::Panic(payload)) => std::panic::resume_unwind(payload),
        }
    }
}

impl std::fmt::Debug for Failure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Failure::Error(err) => f.debug_tuple("Error").field(err).finish(),
            Failure::Panic(payload) => f
                .debug_tuple("Panic")
                .field(&panic_message(payload.as_ref()))
                .finish(),
        }
    }
}

/// Extracts the message of a panic payload produced by `panic!`/`assert!`.
pub fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "panic with a non-string payload".to_string()
    }
}
