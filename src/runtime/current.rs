use std::any::Any;
use std::cell::RefCell;
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

use crate::value::{Kwargs, Value};

thread_local! {
    static CURRENT: RefCell<Vec<Arc<CurrentTest>>> = const { RefCell::new(Vec::new()) };
}

/// Identity and values of the generated test running on this thread.
#[derive(Clone)]
pub struct CurrentTest {
    pub(crate) base_name: String,
    pub(crate) name: String,
    pub(crate) index: usize,
    pub(crate) label: String,
    pub(crate) args: Vec<Value>,
    pub(crate) kwargs: Kwargs,
    pub(crate) context_targets: Vec<Value>,
    pub(crate) original: Arc<dyn Any + Send + Sync>,
}

impl CurrentTest {
    /// Name of the method the test was generated from.
    pub fn base_name(&self) -> &str {
        &self.base_name
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// 0-based position among the tests generated from one method.
    pub fn index(&self) -> usize {
        self.index
    }

    /// 1-based position, as rendered by the `{count}` placeholder.
    pub fn count(&self) -> usize {
        self.index + 1
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn args(&self) -> &[Value] {
        &self.args
    }

    pub fn kwargs(&self) -> &Kwargs {
        &self.kwargs
    }

    pub fn context_targets(&self) -> &[Value] {
        &self.context_targets
    }

    /// The method the test was generated from, if it is a `T`.
    pub fn original<T: Any>(&self) -> Option<&T> {
        self.original.downcast_ref::<T>()
    }
}

impl fmt::Debug for CurrentTest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CurrentTest")
            .field("name", &self.name)
            .field("index", &self.index)
            .field("label", &self.label)
            .field("args", &self.args)
            .field("kwargs", &self.kwargs)
            .field("context_targets", &self.context_targets)
            .finish_non_exhaustive()
    }
}

/// The generated test running on the calling thread, if any.
pub fn current() -> Option<Arc<CurrentTest>> {
    CURRENT.with(|stack| stack.borrow().last().cloned())
}

/// Keeps a published test current until dropped. Not `Send`: it must be
/// dropped on the thread that published it.
pub(crate) struct CurrentGuard {
    _thread_bound: PhantomData<*const ()>,
}

pub(crate) fn publish(test: CurrentTest) -> CurrentGuard {
    CURRENT.with(|stack| stack.borrow_mut().push(Arc::new(test)));
    CurrentGuard {
        _thread_bound: PhantomData,
    }
}

impl CurrentGuard {
    pub(crate) fn set_context_targets(&self, targets: Vec<Value>) {
        CURRENT.with(|stack| {
            if let Some(top) = stack.borrow_mut().last_mut() {
                let mut updated = CurrentTest::clone(top);
                updated.context_targets = targets;
                *top = Arc::new(updated);
            }
        });
    }
}

impl Drop for CurrentGuard {
    fn drop(&mut self) {
        let _ = CURRENT.try_with(|stack| stack.borrow_mut().pop());
    }
}
