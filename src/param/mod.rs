//! Parameter records.
//!
//! A [`Param`] is one combination of positional values, named values,
//! attached resources, and an optional label. Records are immutable: every
//! builder method returns a new record and leaves the receiver untouched.
//! The persistent `im` collections keep those clones cheap.

pub mod resource;

use im::Vector;

use crate::diagnostics::ExpandError;
use crate::naming::short_repr;
use crate::value::{Kwargs, Value};

pub use resource::{Resource, ResourceFactory, ResourceSpec};

/// Separator placed between component labels of a combined record.
pub const LABEL_SEPARATOR: &str = ", ";

/// One parameter combination for a generated test.
///
/// ```rust
/// use expander::param::Param;
/// let p = Param::new().arg(5).kwarg("expected", false).with_label("five");
/// assert_eq!(p.args_vec().len(), 1);
/// assert_eq!(p.label(), Some("five"));
/// ```
#[derive(Debug, Clone, Default)]
pub struct Param {
    args: Vector<Value>,
    kwargs: Kwargs,
    resources: Vector<ResourceSpec>,
    label: Option<String>,
}

impl Param {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a record with one more positional value.
    pub fn arg(&self, value: impl Into<Value>) -> Self {
        let mut new = self.clone();
        new.args.push_back(value.into());
        new
    }

    /// Returns a record with the given positional values appended.
    pub fn args<I, T>(&self, values: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<Value>,
    {
        let mut new = self.clone();
        new.args.extend(values.into_iter().map(Into::into));
        new
    }

    /// Returns a record with a named value set, replacing an earlier value
    /// under the same key.
    pub fn kwarg(&self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        let mut new = self.clone();
        new.kwargs.insert(key.into(), value.into());
        new
    }

    /// Returns a record with one more resource attached after the existing ones.
    pub fn with_resource(&self, spec: ResourceSpec) -> Self {
        let mut new = self.clone();
        new.resources.push_back(spec);
        new
    }

    /// Returns a record labeled `text`, overwriting any previous label.
    pub fn with_label(&self, text: impl Into<String>) -> Self {
        let mut new = self.clone();
        new.label = Some(text.into());
        new
    }

    pub fn positional(&self) -> impl Iterator<Item = &Value> {
        self.args.iter()
    }

    pub fn args_vec(&self) -> Vec<Value> {
        self.args.iter().cloned().collect()
    }

    pub fn named(&self) -> &Kwargs {
        &self.kwargs
    }

    pub fn resources(&self) -> impl Iterator<Item = &ResourceSpec> {
        self.resources.iter()
    }

    pub fn resource_count(&self) -> usize {
        self.resources.len()
    }

    /// The explicit label, if one was set.
    pub fn label(&self) -> Option<&str> {
        self.label.as_deref()
    }

    /// The explicit label, or one derived from the values: positional
    /// representations first, then `key=value` pairs in key order.
    ///
    /// ```rust
    /// use expander::param::Param;
    /// let p = Param::new().arg(-1).kwarg("expected", false);
    /// assert_eq!(p.effective_label(), "-1,expected=false");
    /// ```
    pub fn effective_label(&self) -> String {
        if let Some(label) = &self.label {
            return label.clone();
        }
        let positional = self.args.iter().map(short_repr);
        let named = self
            .kwargs
            .iter()
            .map(|(key, value)| format!("{}={}", key, short_repr(value)));
        positional.chain(named).collect::<Vec<_>>().join(",")
    }

    /// Merges records into one: positional values and resources are
    /// concatenated in order, named values are united, and the component
    /// labels are joined.
    ///
    /// A key present in two records with values that are not
    /// [`Value::identical`] is a conflict.
    pub fn combine<'a, I>(records: I) -> Result<Param, ExpandError>
    where
        I: IntoIterator<Item = &'a Param>,
    {
        let mut merged = Param::new();
        let mut labels = Vec::new();
        let mut conflicts = Kwargs::new();

        for record in records {
            merged.args.append(record.args.clone());
            for (key, value) in record.kwargs.iter() {
                match merged.kwargs.get(key) {
                    Some(existing) if !existing.identical(value) => {
                        conflicts.insert(key.clone(), value.clone());
                    }
                    Some(_) => {}
                    None => {
                        merged.kwargs.insert(key.clone(), value.clone());
                    }
                }
            }
            merged.resources.append(record.resources.clone());
            labels.push(record.effective_label());
        }

        if !conflicts.is_empty() {
            return Err(ExpandError::ParamConflict {
                keys: conflicts.keys().cloned().collect(),
            });
        }
        merged.label = Some(labels.join(LABEL_SEPARATOR));
        Ok(merged)
    }

    /// Structural equality: values, label, and resources (compared by
    /// factory identity).
    pub fn same_as(&self, other: &Param) -> bool {
        self.args == other.args
            && self.kwargs == other.kwargs
            && self.label == other.label
            && self.resources.len() == other.resources.len()
            && self
                .resources
                .iter()
                .zip(other.resources.iter())
                .all(|(a, b)| a.same_as(b))
    }
}

/// Builds a [`Param`]: positional values, then optionally `;` and
/// `key = value` pairs.
///
/// ```rust
/// use expander::param;
/// let p = param!(1, "a"; expected = true);
/// assert_eq!(p.effective_label(), "1,'a',expected=true");
/// ```
#[macro_export]
macro_rules! param {
    () => {
        $crate::param::Param::new()
    };
    ($($arg:expr),* ; $($key:ident = $val:expr),+ $(,)?) => {
        $crate::param::Param::new()$(.arg($arg))*$(.kwarg(stringify!($key), $val))+
    };
    ($($arg:expr),+ $(,)?) => {
        $crate::param::Param::new()$(.arg($arg))+
    };
}

// =============================
// Collection items
// =============================

/// One item of a parameter collection, before normalization.
///
/// Tuples explode into positional values, a ready [`Param`] is used as is,
/// and any other value becomes a single positional value.
#[derive(Debug, Clone)]
pub enum ParamItem {
    Param(Param),
    Value(Value),
}

impl ParamItem {
    pub fn into_param(self) -> Param {
        match self {
            ParamItem::Param(param) => param,
            ParamItem::Value(Value::Tuple(values)) => Param::new().args(values),
            ParamItem::Value(value) => Param::new().arg(value),
        }
    }
}

impl From<Param> for ParamItem {
    fn from(param: Param) -> Self {
        ParamItem::Param(param)
    }
}

macro_rules! item_from_value {
    ($($ty:ty),*) => {
        $(
            impl From<$ty> for ParamItem {
                fn from(value: $ty) -> Self {
                    ParamItem::Value(value.into())
                }
            }
        )*
    };
}

item_from_value!(Value, bool, i8, i16, i32, i64, u8, u16, u32, usize, f32, f64, String, Kwargs);

impl From<&str> for ParamItem {
    fn from(value: &str) -> Self {
        ParamItem::Value(value.into())
    }
}

impl<T: Into<Value>> From<Vec<T>> for ParamItem {
    fn from(values: Vec<T>) -> Self {
        ParamItem::Value(values.into())
    }
}

impl<T: Into<Value>> From<Option<T>> for ParamItem {
    fn from(value: Option<T>) -> Self {
        ParamItem::Value(value.into())
    }
}

macro_rules! item_from_tuple {
    ($($name:ident),+) => {
        impl<$($name: Into<Value>),+> From<($($name,)+)> for ParamItem {
            fn from(tuple: ($($name,)+)) -> Self {
                ParamItem::Value(tuple.into())
            }
        }
    };
}

item_from_tuple!(A);
item_from_tuple!(A, B);
item_from_tuple!(A, B, C);
item_from_tuple!(A, B, C, D);
item_from_tuple!(A, B, C, D, E);
item_from_tuple!(A, B, C, D, E, G);
