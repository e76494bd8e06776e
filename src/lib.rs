//! Parameterize test methods and classes into independently named
//! generated tests.
//!
//! Attach parameter collections to methods with [`TestMethod::foreach`],
//! then [`expand`] the class: every marked method is replaced by one
//! generated test per parameter combination.
//!
//! ```rust
//! use expander::prelude::*;
//!
//! let class = TestClass::<()>::with_default("TestSum").method(
//!     TestMethod::new("test_sum", |_: &mut (), call: &Call| {
//!         let items = call.arg(0)?.as_list().unwrap_or(&[]);
//!         let total: i64 = items.iter().filter_map(Value::as_int).sum();
//!         assert_eq!(Some(total), call.arg(1)?.as_int());
//!         Ok(())
//!     })
//!     .foreach(vec![(vec![1, 2], 3), (vec![], 0)]),
//! );
//!
//! let expanded = expand(class).unwrap();
//! let names = expanded.class().test_names("test");
//! assert_eq!(names, vec!["test_sum__<[1, 2],3>", "test_sum__<[],0>"]);
//! ```

pub use crate::diagnostics::{ExpandError, TestFailure, TestResult};
pub use crate::expand::{expand, Expander, Expansion};
pub use crate::runtime::current;

pub mod combine;
pub mod config;
pub mod container;
pub mod diagnostics;
pub mod expand;
pub mod harness;
pub mod naming;
pub mod param;
pub mod paramseq;
pub mod prelude;
pub mod runtime;
pub mod substitute;
pub mod value;
pub mod warnings;
