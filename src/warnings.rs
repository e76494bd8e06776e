//! Deprecation warnings, logged once per key.
//!
//! The first occurrence of a deprecation is logged at WARN level, later
//! occurrences at DEBUG. Warnings are advisory only: nothing in the expander
//! changes behavior because one was emitted.

use std::collections::HashSet;
use std::sync::Mutex;

use once_cell::sync::Lazy;

/// Deprecated usages the expander reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Deprecation {
    /// A bare tuple given where a parameter collection was expected.
    TupleAsCollection,
    /// Parameter collections attached to a whole test class.
    ClassAttachment,
    /// Generated classes redirected into an external namespace.
    ExpandInto,
    /// An exit hook asked to suppress a failure for a resource that did not
    /// opt in with `suppress_exceptions`.
    IgnoredSuppression,
}

impl Deprecation {
    pub fn key(&self) -> &'static str {
        match self {
            Deprecation::TupleAsCollection => "tuple_as_collection",
            Deprecation::ClassAttachment => "class_attachment",
            Deprecation::ExpandInto => "expand_into",
            Deprecation::IgnoredSuppression => "ignored_suppression",
        }
    }

    fn message(&self) -> &'static str {
        match self {
            Deprecation::TupleAsCollection => {
                "using a tuple as a parameter collection is deprecated; use a list instead"
            }
            Deprecation::ClassAttachment => {
                "attaching parameter collections to test classes is deprecated; attach them to test methods"
            }
            Deprecation::ExpandInto => {
                "redirecting generated classes with expand_into() is deprecated and will be removed"
            }
            Deprecation::IgnoredSuppression => {
                "a resource exit hook asked to suppress a test failure, which is ignored unless the resource was attached with suppress_exceptions(true)"
            }
        }
    }
}

static WARN_REGISTRY: Lazy<Mutex<HashSet<&'static str>>> = Lazy::new(|| Mutex::new(HashSet::new()));

/// Logs a deprecation: WARN the first time per key, DEBUG afterwards.
pub fn deprecated(which: Deprecation) {
    // a poisoned registry only means another thread panicked mid-insert
    let mut seen = match WARN_REGISTRY.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    };

    if seen.insert(which.key()) {
        tracing::warn!(key = %which.key(), "{}", which.message());
    } else {
        tracing::debug!(key = %which.key(), "(rate-limited) {}", which.message());
    }
}

/// Returns whether a deprecation has been reported in this process.
pub fn was_reported(which: Deprecation) -> bool {
    let seen = match WARN_REGISTRY.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    };
    seen.contains(which.key())
}

/// Forgets every reported deprecation so tests can observe them afresh.
pub fn reset_reported() {
    let mut seen = match WARN_REGISTRY.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    };
    seen.clear();
}
