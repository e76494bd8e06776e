//! Nested acquisition and release of the resources of one call.

use std::panic::{self, AssertUnwindSafe};

use crate::diagnostics::{Failure, TestFailure};
use crate::param::{Resource, ResourceSpec};
use crate::value::Value;
use crate::warnings::{deprecated, Deprecation};

struct Entered {
    resource: Box<dyn Resource>,
    may_suppress: bool,
}

/// Resources entered so far, released in reverse order.
pub(crate) struct ResourceStack {
    entered: Vec<Entered>,
}

impl ResourceStack {
    /// Enters every resource in order and collects their targets.
    ///
    /// If one fails to be created or entered, the ones already entered are
    /// exited with that failure and the remaining failure is returned. When
    /// an exit hook suppresses it, the call still cannot go on, which is
    /// reported as a failure of its own.
    pub(crate) fn enter<'a, I>(specs: I) -> Result<(Self, Vec<Value>), Failure>
    where
        I: IntoIterator<Item = &'a ResourceSpec>,
    {
        let mut stack = Self {
            entered: Vec::new(),
        };
        let mut targets = Vec::new();

        for spec in specs {
            let acquired = panic::catch_unwind(AssertUnwindSafe(|| {
                let mut resource = spec.create()?;
                let target = resource.enter()?;
                Ok::<_, TestFailure>((resource, target))
            }));
            let failure = match acquired {
                Ok(Ok((resource, target))) => {
                    tracing::trace!(position = targets.len(), "entered resource");
                    stack.entered.push(Entered {
                        resource,
                        may_suppress: spec.suppresses_exceptions(),
                    });
                    targets.push(target);
                    continue;
                }
                Ok(Err(err)) => Failure::Error(err),
                Err(payload) => Failure::Panic(payload),
            };
            return Err(stack.exit(Some(failure)).unwrap_or_else(|| {
                Failure::Error(TestFailure::new(
                    "a resource failed to enter and an outer resource suppressed the failure; the test body did not run",
                ))
            }));
        }

        Ok((stack, targets))
    }

    /// Exits every entered resource, innermost first, and returns what is
    /// still propagating afterwards.
    ///
    /// An exit hook's request to suppress only counts for resources that
    /// opted in, and only while something is propagating. A failing exit hook
    /// replaces the propagating failure.
    pub(crate) fn exit(mut self, mut outcome: Option<Failure>) -> Option<Failure> {
        while let Some(Entered {
            mut resource,
            may_suppress,
        }) = self.entered.pop()
        {
            let released = panic::catch_unwind(AssertUnwindSafe(|| resource.exit(outcome.as_ref())));
            tracing::trace!(
                position = self.entered.len(),
                propagating = outcome.is_some(),
                "exited resource"
            );
            match released {
                Ok(Ok(true)) if outcome.is_some() => {
                    if may_suppress {
                        outcome = None;
                    } else {
                        deprecated(Deprecation::IgnoredSuppression);
                    }
                }
                Ok(Ok(_)) => {}
                Ok(Err(err)) => outcome = Some(Failure::Error(err)),
                Err(payload) => outcome = Some(Failure::Panic(payload)),
            }
        }
        outcome
    }
}
