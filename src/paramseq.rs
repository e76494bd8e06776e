//! Parameter collections and their normalization into records.
//!
//! A [`ParamSeq`] is built from any supported shape (an ordered sequence, a
//! key/value mapping whose keys become labels, an unordered set, a
//! generator, or another `ParamSeq`) and resolves, when a test unit is
//! expanded, into an ordered list of [`Param`] records.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::fmt;
use std::hash::{BuildHasher, Hash};
use std::ops::Add;
use std::sync::Arc;

use crate::diagnostics::ExpandError;
use crate::param::{Param, ParamItem, ResourceSpec};
use crate::value::{Kwargs, Value};
use crate::warnings::{deprecated, Deprecation};

/// What a one-argument generator is given: the container owning the test
/// unit, reduced to its name and its plain attribute members.
#[derive(Debug, Clone, Default)]
pub struct OwnerInfo {
    pub name: String,
    pub attributes: Kwargs,
}

impl OwnerInfo {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            attributes: Kwargs::new(),
        }
    }

    pub fn attribute(&self, key: &str) -> Option<&Value> {
        self.attributes.get(key)
    }
}

/// Items yielded by a generator.
pub type ParamIter = Box<dyn Iterator<Item = ParamItem>>;

/// A function producing collection items when the collection is resolved.
#[derive(Clone)]
pub enum ParamGenerator {
    Nullary(Arc<dyn Fn() -> ParamIter + Send + Sync>),
    WithOwner(Arc<dyn Fn(&OwnerInfo) -> ParamIter + Send + Sync>),
}

impl ParamGenerator {
    fn produce(&self, owner: &OwnerInfo) -> ParamIter {
        match self {
            ParamGenerator::Nullary(f) => f(),
            ParamGenerator::WithOwner(f) => f(owner),
        }
    }
}

/// The recognized collection shapes.
#[derive(Clone)]
pub enum ParamCollection {
    Sequence(Vec<ParamItem>),
    /// Each value becomes a record labeled with its key.
    Mapping(Vec<(String, ParamItem)>),
    /// Iteration order of the source set; not stable across processes for
    /// hashed sets.
    Set(Vec<ParamItem>),
    Generator(ParamGenerator),
    Normalized(ParamSeq),
}

impl ParamCollection {
    fn kind(&self) -> &'static str {
        match self {
            ParamCollection::Sequence(_) => "sequence",
            ParamCollection::Mapping(_) => "mapping",
            ParamCollection::Set(_) => "set",
            ParamCollection::Generator(_) => "generator",
            ParamCollection::Normalized(_) => "paramseq",
        }
    }
}

/// An ordered, immutable parameter collection.
#[derive(Clone, Default)]
pub struct ParamSeq {
    collections: Vec<ParamCollection>,
    resources: Vec<ResourceSpec>,
}

impl ParamSeq {
    /// An empty collection.
    pub fn new() -> Self {
        Self::default()
    }

    /// Normalizes any supported source. A `ParamSeq` comes back unchanged.
    pub fn normalize(source: impl Into<ParamSeq>) -> Self {
        source.into()
    }

    fn single(collection: ParamCollection) -> Self {
        Self {
            collections: vec![collection],
            resources: Vec::new(),
        }
    }

    pub fn sequence<I, T>(items: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<ParamItem>,
    {
        Self::single(ParamCollection::Sequence(
            items.into_iter().map(Into::into).collect(),
        ))
    }

    /// Each value becomes one record, labeled with its key. Order follows
    /// the iterator.
    pub fn mapping<I, K, T>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, T)>,
        K: Into<String>,
        T: Into<ParamItem>,
    {
        Self::single(ParamCollection::Mapping(
            pairs
                .into_iter()
                .map(|(key, item)| (key.into(), item.into()))
                .collect(),
        ))
    }

    /// Items of an unordered source, in the order it iterates them.
    pub fn set<I, T>(items: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<ParamItem>,
    {
        Self::single(ParamCollection::Set(
            items.into_iter().map(Into::into).collect(),
        ))
    }

    /// A generator invoked without arguments each time the collection is
    /// resolved. It is drained completely before expansion continues.
    pub fn generator<F, I>(f: F) -> Self
    where
        F: Fn() -> I + Send + Sync + 'static,
        I: IntoIterator,
        I::Item: Into<ParamItem> + 'static,
        I::IntoIter: 'static,
    {
        let produce = move || -> ParamIter { Box::new(f().into_iter().map(Into::into)) };
        Self::single(ParamCollection::Generator(ParamGenerator::Nullary(Arc::new(produce))))
    }

    /// A generator invoked with the owning container, for parameters that
    /// depend on it.
    pub fn generator_with_owner<F, I>(f: F) -> Self
    where
        F: Fn(&OwnerInfo) -> I + Send + Sync + 'static,
        I: IntoIterator,
        I::Item: Into<ParamItem> + 'static,
        I::IntoIter: 'static,
    {
        let produce =
            move |owner: &OwnerInfo| -> ParamIter { Box::new(f(owner).into_iter().map(Into::into)) };
        Self::single(ParamCollection::Generator(ParamGenerator::WithOwner(Arc::new(produce))))
    }

    /// Resolves a dynamic value into a collection: lists are sequences,
    /// maps are mappings, tuples still work as sequences but are deprecated.
    /// Text and scalars are rejected.
    pub fn try_from_value(value: Value) -> Result<Self, ExpandError> {
        match value {
            Value::List(items) => Ok(Self::sequence(items)),
            Value::Tuple(items) => {
                deprecated(Deprecation::TupleAsCollection);
                Ok(Self::sequence(items))
            }
            Value::Map(map) => Ok(Self::mapping(map)),
            Value::String(_) => Err(ExpandError::InvalidCollectionKind {
                kind: "text",
                value: value.repr(),
            }),
            other => Err(ExpandError::InvalidCollectionKind {
                kind: other.type_name(),
                value: other.repr(),
            }),
        }
    }

    /// Returns a collection whose records are this one's followed by
    /// `other`'s.
    pub fn concat(&self, other: impl Into<ParamSeq>) -> Self {
        Self {
            collections: vec![
                ParamCollection::Normalized(self.clone()),
                ParamCollection::Normalized(other.into()),
            ],
            resources: Vec::new(),
        }
    }

    /// Returns a collection whose records each get `spec` attached after
    /// their own resources.
    pub fn with_resource(&self, spec: ResourceSpec) -> Self {
        Self {
            collections: vec![ParamCollection::Normalized(self.clone())],
            resources: vec![spec],
        }
    }

    /// Resolves the collection into records, draining every generator.
    pub fn generate(&self, owner: &OwnerInfo) -> Vec<Param> {
        let mut records = Vec::new();
        for collection in &self.collections {
            match collection {
                ParamCollection::Sequence(items) | ParamCollection::Set(items) => {
                    records.extend(items.iter().cloned().map(ParamItem::into_param));
                }
                ParamCollection::Mapping(pairs) => {
                    records.extend(
                        pairs
                            .iter()
                            .map(|(label, item)| item.clone().into_param().with_label(label.clone())),
                    );
                }
                ParamCollection::Generator(generator) => {
                    records.extend(generator.produce(owner).map(ParamItem::into_param));
                }
                ParamCollection::Normalized(seq) => records.extend(seq.generate(owner)),
            }
        }
        if self.resources.is_empty() {
            return records;
        }
        records
            .into_iter()
            .map(|record| {
                self.resources
                    .iter()
                    .fold(record, |record, spec| record.with_resource(spec.clone()))
            })
            .collect()
    }

    pub fn collections(&self) -> &[ParamCollection] {
        &self.collections
    }
}

impl fmt::Debug for ParamSeq {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kinds: Vec<_> = self.collections.iter().map(ParamCollection::kind).collect();
        f.debug_struct("ParamSeq")
            .field("collections", &kinds)
            .field("resources", &self.resources.len())
            .finish()
    }
}

// =============================
// Conversions
// =============================

impl<T: Into<ParamItem>> From<Vec<T>> for ParamSeq {
    fn from(items: Vec<T>) -> Self {
        Self::sequence(items)
    }
}

impl<T: Into<ParamItem>, const N: usize> From<[T; N]> for ParamSeq {
    fn from(items: [T; N]) -> Self {
        Self::sequence(items)
    }
}

impl<K: Into<String>, T: Into<ParamItem>> From<BTreeMap<K, T>> for ParamSeq {
    fn from(map: BTreeMap<K, T>) -> Self {
        Self::mapping(map)
    }
}

impl<K: Into<String>, T: Into<ParamItem>, S: BuildHasher> From<HashMap<K, T, S>> for ParamSeq {
    fn from(map: HashMap<K, T, S>) -> Self {
        Self::mapping(map)
    }
}

impl<T, S> From<HashSet<T, S>> for ParamSeq
where
    T: Into<ParamItem> + Eq + Hash,
    S: BuildHasher,
{
    fn from(set: HashSet<T, S>) -> Self {
        Self::set(set)
    }
}

impl From<ParamGenerator> for ParamSeq {
    fn from(generator: ParamGenerator) -> Self {
        Self::single(ParamCollection::Generator(generator))
    }
}

impl TryFrom<Value> for ParamSeq {
    type Error = ExpandError;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        Self::try_from_value(value)
    }
}

impl<T: Into<ParamSeq>> Add<T> for ParamSeq {
    type Output = ParamSeq;

    fn add(self, other: T) -> ParamSeq {
        self.concat(other)
    }
}

impl<T: Into<ParamItem>> Add<ParamSeq> for Vec<T> {
    type Output = ParamSeq;

    fn add(self, other: ParamSeq) -> ParamSeq {
        ParamSeq::from(self).concat(other)
    }
}
