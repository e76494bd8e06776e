use im::OrdMap;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Named values of a parameter record, kept in key order.
pub type Kwargs = OrdMap<String, Value>;

/// Represents a single parameter value handed to a generated test.
///
/// # Examples
///
/// ```rust
/// use expander::value::Value;
/// let n = Value::Int(3);
/// assert_eq!(n.type_name(), "Int");
/// let s = Value::from("hello");
/// assert_eq!(s.type_name(), "String");
/// let nil = Value::default();
/// assert!(nil.is_nil());
/// ```
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub enum Value {
    #[default]
    Nil,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
    List(Vec<Value>),
    /// A fixed group of values. As a collection item it is exploded into
    /// positional arguments.
    Tuple(Vec<Value>),
    Map(OrdMap<String, Value>),
}

impl Value {
    /// Returns the type name of the value as a string.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use expander::value::Value;
    /// let v = Value::Bool(true);
    /// assert_eq!(v.type_name(), "Bool");
    /// ```
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Nil => "Nil",
            Value::Bool(_) => "Bool",
            Value::Int(_) => "Int",
            Value::Float(_) => "Float",
            Value::String(_) => "String",
            Value::List(_) => "List",
            Value::Tuple(_) => "Tuple",
            Value::Map(_) => "Map",
        }
    }

    /// Equality with floats compared bit for bit, so `NaN` matches itself
    /// and `0.0` does not match `-0.0`.
    pub fn identical(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Float(a), Value::Float(b)) => a.to_bits() == b.to_bits(),
            (Value::List(a), Value::List(b)) | (Value::Tuple(a), Value::Tuple(b)) => {
                a.len() == b.len() && a.iter().zip(b).all(|(x, y)| x.identical(y))
            }
            (Value::Map(a), Value::Map(b)) => {
                a.len() == b.len()
                    && a.iter()
                        .zip(b.iter())
                        .all(|((ka, va), (kb, vb))| ka == kb && va.identical(vb))
            }
            _ => self == other,
        }
    }

    /// Returns true if the value is Nil.
    pub fn is_nil(&self) -> bool {
        matches!(self, Value::Nil)
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(n) => Some(*n),
            _ => None,
        }
    }

    /// Returns the value as a float; integers widen.
    pub fn as_float(&self) -> Option<f64> {
        match self {
            Value::Float(n) => Some(*n),
            Value::Int(n) => Some(*n as f64),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    /// Returns the items of a list or tuple.
    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Value::List(items) | Value::Tuple(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&OrdMap<String, Value>> {
        match self {
            Value::Map(map) => Some(map),
            _ => None,
        }
    }

    /// Returns a readable, unambiguous representation: strings are quoted,
    /// floats always carry a fractional part.
    ///
    /// ```rust
    /// use expander::value::Value;
    /// assert_eq!(Value::from(vec![1, 3, 1]).repr(), "[1, 3, 1]");
    /// assert_eq!(Value::from("five").repr(), "'five'");
    /// assert_eq!(Value::Float(2.0).repr(), "2.0");
    /// ```
    pub fn repr(&self) -> String {
        Repr(self).to_string()
    }

    // ------------------------------------------------------------------------
    // Display formatting helpers
    // ------------------------------------------------------------------------

    fn fmt_seq(
        f: &mut fmt::Formatter<'_>,
        items: &[Value],
        open: &str,
        close: &str,
        quoted: bool,
    ) -> fmt::Result {
        write!(f, "{}", open)?;
        for (i, item) in items.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            item.fmt_with(f, quoted)?;
        }
        // one-element tuples keep their trailing comma
        if open == "(" && items.len() == 1 {
            write!(f, ",")?;
        }
        write!(f, "{}", close)
    }

    fn fmt_map(f: &mut fmt::Formatter<'_>, map: &OrdMap<String, Value>, quoted: bool) -> fmt::Result {
        write!(f, "{{")?;
        let mut first = true;
        for (k, v) in map.iter() {
            if !first {
                write!(f, ", ")?;
            }
            if quoted {
                write!(f, "'{}': ", k)?;
            } else {
                write!(f, "{}: ", k)?;
            }
            v.fmt_with(f, quoted)?;
            first = false;
        }
        write!(f, "}}")
    }

    fn fmt_with(&self, f: &mut fmt::Formatter<'_>, quoted: bool) -> fmt::Result {
        match self {
            Value::Nil => write!(f, "nil"),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Int(n) => write!(f, "{}", n),
            Value::Float(n) if quoted => write!(f, "{:?}", n),
            Value::Float(n) => write!(f, "{}", n),
            Value::String(s) if quoted => write!(f, "'{}'", s.replace('\'', "\\'")),
            Value::String(s) => write!(f, "{}", s),
            Value::List(items) => Value::fmt_seq(f, items, "[", "]", quoted),
            Value::Tuple(items) => Value::fmt_seq(f, items, "(", ")", quoted),
            Value::Map(map) => Value::fmt_map(f, map, quoted),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.fmt_with(f, false)
    }
}

struct Repr<'a>(&'a Value);

impl fmt::Display for Repr<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt_with(f, true)
    }
}

// ============================================================================
// Conversions
// ============================================================================

macro_rules! value_from_int {
    ($($ty:ty),*) => {
        $(
            impl From<$ty> for Value {
                fn from(n: $ty) -> Self {
                    Value::Int(n as i64)
                }
            }
        )*
    };
}

value_from_int!(i8, i16, i32, i64, u8, u16, u32, usize);

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Float(n)
    }
}

impl From<f32> for Value {
    fn from(n: f32) -> Self {
        Value::Float(n as f64)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(items: Vec<T>) -> Self {
        Value::List(items.into_iter().map(Into::into).collect())
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Value::Nil, Into::into)
    }
}

impl From<OrdMap<String, Value>> for Value {
    fn from(map: OrdMap<String, Value>) -> Self {
        Value::Map(map)
    }
}

macro_rules! value_from_tuple {
    ($($name:ident),+) => {
        impl<$($name: Into<Value>),+> From<($($name,)+)> for Value {
            #[allow(non_snake_case)]
            fn from(($($name,)+): ($($name,)+)) -> Self {
                Value::Tuple(vec![$($name.into()),+])
            }
        }
    };
}

value_from_tuple!(A);
value_from_tuple!(A, B);
value_from_tuple!(A, B, C);
value_from_tuple!(A, B, C, D);
value_from_tuple!(A, B, C, D, E);
value_from_tuple!(A, B, C, D, E, G);
