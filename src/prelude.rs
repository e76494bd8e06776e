//! The everyday surface in one import.

pub use crate::combine::ProductOrder;
pub use crate::config::ExpandConfig;
pub use crate::container::{Entry, Member, Namespace, Signature, TestClass, TestMethod};
pub use crate::diagnostics::{ErrorType, ExpandError, Failure, TestFailure, TestResult};
pub use crate::expand::{expand, Expander, Expansion};
pub use crate::naming::{BraceFormatter, NameFields, NameFormatter};
pub use crate::param;
pub use crate::param::{Param, Resource, ResourceSpec};
pub use crate::paramseq::{OwnerInfo, ParamSeq};
pub use crate::runtime::{current, Call, ClassParams, CurrentTest, GeneratedTest, ParametrizedClass};
pub use crate::substitute::{Named, Substitute};
pub use crate::value::{Kwargs, Value};
