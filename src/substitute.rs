//! Stand-ins for members and classes consumed by expansion.

use std::fmt;
use std::ops::Deref;
use std::sync::Arc;

use crate::diagnostics::ExpandError;

/// Anything that can be substituted carries a name for diagnostics.
pub trait Named {
    fn name(&self) -> &str;
}

/// Takes the place of an expanded method or class.
///
/// Reads are forwarded to the wrapped object through `Deref`, so its name,
/// signature, and attached collections stay inspectable. Calling it always
/// fails with [`ExpandError::NotCallable`], and the expander never expands
/// a substitute again.
pub struct Substitute<T> {
    actual: Arc<T>,
}

impl<T> Substitute<T> {
    pub fn new(actual: T) -> Self {
        Self {
            actual: Arc::new(actual),
        }
    }

    pub fn from_arc(actual: Arc<T>) -> Self {
        Self { actual }
    }

    pub fn actual_object(&self) -> &T {
        &self.actual
    }

    pub fn shared(&self) -> Arc<T> {
        Arc::clone(&self.actual)
    }
}

impl<T: Named> Substitute<T> {
    pub fn call(&self) -> Result<(), ExpandError> {
        Err(ExpandError::NotCallable {
            name: self.actual.name().to_string(),
        })
    }
}

impl<T> Deref for Substitute<T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.actual
    }
}

impl<T> Clone for Substitute<T> {
    fn clone(&self) -> Self {
        Self {
            actual: Arc::clone(&self.actual),
        }
    }
}

impl<T: Named> fmt::Debug for Substitute<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Substitute").field(&self.actual.name()).finish()
    }
}
