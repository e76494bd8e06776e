//! Test containers as the expander sees them.
//!
//! A [`TestClass`] is an ordered set of named members plus a fixture
//! factory and optional set-up/tear-down hooks. Methods carry the parameter
//! collections attached to them; expansion turns each marked method into
//! generated tests and leaves a [`Substitute`] in its place.

use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

use crate::diagnostics::{ExpandError, TestFailure, TestResult};
use crate::paramseq::{OwnerInfo, ParamSeq};
use crate::runtime::{Call, ClassParams, GeneratedTest, ParametrizedClass};
use crate::substitute::{Named, Substitute};
use crate::value::{Kwargs, Value};
use crate::warnings::{deprecated, Deprecation};

/// Named value that receives the record's label.
pub const LABEL_KWARG: &str = "label";
/// Named value that receives the values returned by resource enter hooks.
pub const CONTEXT_TARGETS_KWARG: &str = "context_targets";

const GENERIC_KWARGS: [&str; 2] = [CONTEXT_TARGETS_KWARG, LABEL_KWARG];

/// A test body: the fixture plus the call's arguments.
pub type TestBody<F> = Arc<dyn Fn(&mut F, &Call) -> TestResult + Send + Sync>;

/// Builds a fresh fixture for every test run.
pub type FixtureFactory<F> = Arc<dyn Fn() -> F + Send + Sync>;

// =============================
// Signatures
// =============================

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignatureParam {
    pub name: String,
    pub required: bool,
}

/// Declared parameters of a test body, in positional order.
///
/// Declaring a signature is optional. When present, every record is checked
/// against it at expansion time and the call's values can be looked up by
/// parameter name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Signature {
    params: Vec<SignatureParam>,
    var_positional: bool,
    var_keyword: bool,
}

impl Signature {
    pub fn new() -> Self {
        Self::default()
    }

    /// A signature of required parameters only.
    pub fn of<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        names
            .into_iter()
            .fold(Self::new(), |signature, name| signature.param(name))
    }

    pub fn param(mut self, name: impl Into<String>) -> Self {
        self.params.push(SignatureParam {
            name: name.into(),
            required: true,
        });
        self
    }

    /// A parameter with a default value.
    pub fn optional(mut self, name: impl Into<String>) -> Self {
        self.params.push(SignatureParam {
            name: name.into(),
            required: false,
        });
        self
    }

    /// Accepts any number of extra positional values.
    pub fn var_args(mut self) -> Self {
        self.var_positional = true;
        self
    }

    /// Accepts arbitrary named values.
    pub fn var_kwargs(mut self) -> Self {
        self.var_keyword = true;
        self
    }

    pub fn params(&self) -> &[SignatureParam] {
        &self.params
    }

    pub fn position(&self, name: &str) -> Option<usize> {
        self.params.iter().position(|p| p.name == name)
    }

    pub fn accepts_keyword(&self, name: &str) -> bool {
        self.var_keyword || self.position(name).is_some()
    }

    /// Generic named values (`label`, `context_targets`) this body takes
    /// and that a call with `positional` values and `kwargs` leaves unbound.
    pub fn generic_targets(&self, positional: usize, kwargs: &Kwargs) -> Vec<&'static str> {
        GENERIC_KWARGS
            .into_iter()
            .filter(|key| self.accepts_keyword(key))
            .filter(|key| !kwargs.contains_key(*key))
            .filter(|key| self.position(key).map_or(true, |index| index >= positional))
            .collect()
    }

    /// Checks that `positional` values plus the given named values bind to
    /// this signature. The error is a human-readable reason.
    pub fn check<'k, I>(&self, positional: usize, keywords: I) -> Result<(), String>
    where
        I: IntoIterator<Item = &'k str>,
    {
        if positional > self.params.len() && !self.var_positional {
            return Err(format!(
                "takes {} positional arguments but {} were given",
                self.params.len(),
                positional
            ));
        }

        let mut bound: HashSet<&str> = self
            .params
            .iter()
            .take(positional)
            .map(|p| p.name.as_str())
            .collect();

        for key in keywords {
            match self.position(key) {
                Some(_) if !bound.insert(key) => {
                    return Err(format!("got multiple values for argument '{}'", key));
                }
                Some(_) => {}
                None if self.var_keyword => {}
                None => return Err(format!("got an unexpected keyword argument '{}'", key)),
            }
        }

        let missing: Vec<String> = self
            .params
            .iter()
            .filter(|p| p.required && !bound.contains(p.name.as_str()))
            .map(|p| format!("'{}'", p.name))
            .collect();
        if !missing.is_empty() {
            return Err(format!("missing required arguments: {}", missing.join(", ")));
        }
        Ok(())
    }
}

// =============================
// Methods
// =============================

/// A test method, possibly marked with attached parameter collections.
pub struct TestMethod<F> {
    name: String,
    body: TestBody<F>,
    signature: Option<Signature>,
    attachments: Vec<ParamSeq>,
}

impl<F> TestMethod<F> {
    pub fn new<B>(name: impl Into<String>, body: B) -> Self
    where
        B: Fn(&mut F, &Call) -> TestResult + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            body: Arc::new(body),
            signature: None,
            attachments: Vec::new(),
        }
    }

    pub fn with_signature(mut self, signature: Signature) -> Self {
        self.signature = Some(signature);
        self
    }

    /// Attaches one more parameter collection. Several attachments are
    /// multiplied out when the containing class is expanded.
    pub fn foreach(mut self, seq: impl Into<ParamSeq>) -> Self {
        self.attachments.push(seq.into());
        self
    }

    /// Attaches a collection given as a dynamic value.
    pub fn try_foreach(self, value: Value) -> Result<Self, ExpandError> {
        let seq = ParamSeq::try_from_value(value)?;
        Ok(self.foreach(seq))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn signature(&self) -> Option<&Signature> {
        self.signature.as_ref()
    }

    pub fn attachments(&self) -> &[ParamSeq] {
        &self.attachments
    }

    pub fn is_marked(&self) -> bool {
        !self.attachments.is_empty()
    }

    pub fn invoke(&self, fixture: &mut F, call: &Call) -> TestResult {
        (self.body)(fixture, call)
    }
}

impl<F> Named for TestMethod<F> {
    fn name(&self) -> &str {
        TestMethod::name(self)
    }
}

impl<F> Clone for TestMethod<F> {
    fn clone(&self) -> Self {
        Self {
            name: self.name.clone(),
            body: Arc::clone(&self.body),
            signature: self.signature.clone(),
            attachments: self.attachments.clone(),
        }
    }
}

impl<F> fmt::Debug for TestMethod<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TestMethod")
            .field("name", &self.name)
            .field("signature", &self.signature)
            .field("attachments", &self.attachments.len())
            .finish_non_exhaustive()
    }
}

// =============================
// Classes
// =============================

/// A member of a test class.
pub enum Member<F> {
    Method(TestMethod<F>),
    Generated(GeneratedTest<F>),
    Substitute(Substitute<TestMethod<F>>),
    Attribute(Value),
    Class(Arc<TestClass<F>>),
}

impl<F> Member<F> {
    pub fn kind(&self) -> &'static str {
        match self {
            Member::Method(_) => "method",
            Member::Generated(_) => "generated test",
            Member::Substitute(_) => "substitute",
            Member::Attribute(_) => "attribute",
            Member::Class(_) => "class",
        }
    }

    /// Methods and generated tests can be run; substitutes cannot.
    pub fn is_callable(&self) -> bool {
        matches!(self, Member::Method(_) | Member::Generated(_))
    }
}

impl<F> Clone for Member<F> {
    fn clone(&self) -> Self {
        match self {
            Member::Method(method) => Member::Method(method.clone()),
            Member::Generated(test) => Member::Generated(test.clone()),
            Member::Substitute(sub) => Member::Substitute(sub.clone()),
            Member::Attribute(value) => Member::Attribute(value.clone()),
            Member::Class(class) => Member::Class(Arc::clone(class)),
        }
    }
}

impl<F> fmt::Debug for Member<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Member::Method(method) => fmt::Debug::fmt(method, f),
            Member::Generated(test) => f.debug_tuple("Generated").field(&test.name()).finish(),
            Member::Substitute(sub) => fmt::Debug::fmt(sub, f),
            Member::Attribute(value) => f.debug_tuple("Attribute").field(value).finish(),
            Member::Class(class) => f.debug_tuple("Class").field(&class.name()).finish(),
        }
    }
}

pub struct TestClass<F> {
    name: String,
    fixture: FixtureFactory<F>,
    set_up: Option<TestBody<F>>,
    tear_down: Option<TestBody<F>>,
    members: Vec<(String, Member<F>)>,
    attachments: Vec<ParamSeq>,
}

impl<F: Default + 'static> TestClass<F> {
    /// A class whose fixture is `F::default()`.
    pub fn with_default(name: impl Into<String>) -> Self {
        Self::new(name, F::default)
    }
}

impl<F> TestClass<F> {
    pub fn new<M>(name: impl Into<String>, fixture: M) -> Self
    where
        M: Fn() -> F + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            fixture: Arc::new(fixture),
            set_up: None,
            tear_down: None,
            members: Vec::new(),
            attachments: Vec::new(),
        }
    }

    pub fn set_up<B>(mut self, hook: B) -> Self
    where
        B: Fn(&mut F, &Call) -> TestResult + Send + Sync + 'static,
    {
        self.set_up = Some(Arc::new(hook));
        self
    }

    pub fn tear_down<B>(mut self, hook: B) -> Self
    where
        B: Fn(&mut F, &Call) -> TestResult + Send + Sync + 'static,
    {
        self.tear_down = Some(Arc::new(hook));
        self
    }

    /// Adds or replaces a method, keyed by its name.
    pub fn method(self, method: TestMethod<F>) -> Self {
        let name = method.name().to_string();
        self.member(name, Member::Method(method))
    }

    pub fn attribute(self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.member(name, Member::Attribute(value.into()))
    }

    pub fn nested(self, name: impl Into<String>, class: TestClass<F>) -> Self {
        self.member(name, Member::Class(Arc::new(class)))
    }

    /// Adds or replaces a member. A replaced member keeps its position.
    pub fn member(mut self, name: impl Into<String>, member: Member<F>) -> Self {
        let name = name.into();
        match self.members.iter_mut().find(|(existing, _)| *existing == name) {
            Some(slot) => slot.1 = member,
            None => self.members.push((name, member)),
        }
        self
    }

    /// Attaches a parameter collection to the whole class. Each record then
    /// yields one parametrized copy of the class.
    pub fn foreach(mut self, seq: impl Into<ParamSeq>) -> Self {
        deprecated(Deprecation::ClassAttachment);
        self.attachments.push(seq.into());
        self
    }

    /// A subclass named `name`: same fixture, hooks, and members. Class-level
    /// attachments are not inherited, and substituted members stay
    /// substituted.
    pub fn inherit(&self, name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            fixture: Arc::clone(&self.fixture),
            set_up: self.set_up.clone(),
            tear_down: self.tear_down.clone(),
            members: self.members.clone(),
            attachments: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn get(&self, name: &str) -> Option<&Member<F>> {
        self.members
            .iter()
            .find(|(existing, _)| existing == name)
            .map(|(_, member)| member)
    }

    pub fn members(&self) -> impl Iterator<Item = (&str, &Member<F>)> {
        self.members.iter().map(|(name, member)| (name.as_str(), member))
    }

    pub fn member_names(&self) -> impl Iterator<Item = &str> {
        self.members.iter().map(|(name, _)| name.as_str())
    }

    /// Names of the runnable members starting with `prefix`, in member order.
    pub fn test_names(&self, prefix: &str) -> Vec<String> {
        self.members
            .iter()
            .filter(|(name, member)| name.starts_with(prefix) && member.is_callable())
            .map(|(name, _)| name.clone())
            .collect()
    }

    pub fn attachments(&self) -> &[ParamSeq] {
        &self.attachments
    }

    /// The name and plain attributes, as handed to owner-aware generators.
    pub fn owner_info(&self) -> OwnerInfo {
        let mut owner = OwnerInfo::new(self.name.clone());
        for (name, member) in &self.members {
            if let Member::Attribute(value) = member {
                owner.attributes.insert(name.clone(), value.clone());
            }
        }
        owner
    }

    pub fn instantiate(&self) -> F {
        (self.fixture)()
    }

    pub fn has_marked_methods(&self) -> bool {
        self.members
            .iter()
            .any(|(_, member)| matches!(member, Member::Method(method) if method.is_marked()))
    }

    pub(crate) fn take_members(&mut self) -> Vec<(String, Member<F>)> {
        std::mem::take(&mut self.members)
    }

    pub(crate) fn set_members(&mut self, members: Vec<(String, Member<F>)>) {
        self.members = members;
    }
}

impl<F: 'static> TestClass<F> {
    /// Runs the set-up hook, if any.
    pub fn run_set_up(&self, fixture: &mut F, class_params: Option<Arc<ClassParams>>) -> TestResult {
        match &self.set_up {
            Some(hook) => hook(fixture, &Call::plain(class_params)),
            None => Ok(()),
        }
    }

    /// Runs the tear-down hook, if any.
    pub fn run_tear_down(
        &self,
        fixture: &mut F,
        class_params: Option<Arc<ClassParams>>,
    ) -> TestResult {
        match &self.tear_down {
            Some(hook) => hook(fixture, &Call::plain(class_params)),
            None => Ok(()),
        }
    }

    /// Runs one member against `fixture`, without the hooks.
    pub fn invoke(&self, name: &str, fixture: &mut F) -> TestResult {
        self.invoke_with(name, fixture, None)
    }

    pub(crate) fn invoke_with(
        &self,
        name: &str,
        fixture: &mut F,
        class_params: Option<Arc<ClassParams>>,
    ) -> TestResult {
        match self.get(name) {
            Some(Member::Generated(test)) => test.call_with(fixture, class_params),
            Some(Member::Method(method)) => method.invoke(fixture, &Call::plain(class_params)),
            Some(Member::Substitute(sub)) => sub.call().map_err(TestFailure::from),
            Some(Member::Attribute(_)) | Some(Member::Class(_)) => {
                Err(TestFailure::from(ExpandError::NotCallable {
                    name: name.to_string(),
                }))
            }
            None => Err(TestFailure::new(format!(
                "`{}` has no member `{}`",
                self.name, name
            ))),
        }
    }
}

impl<F> Named for TestClass<F> {
    fn name(&self) -> &str {
        TestClass::name(self)
    }
}

impl<F> Clone for TestClass<F> {
    fn clone(&self) -> Self {
        Self {
            name: self.name.clone(),
            fixture: Arc::clone(&self.fixture),
            set_up: self.set_up.clone(),
            tear_down: self.tear_down.clone(),
            members: self.members.clone(),
            attachments: self.attachments.clone(),
        }
    }
}

impl<F> fmt::Debug for TestClass<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TestClass")
            .field("name", &self.name)
            .field("members", &self.members)
            .field("attachments", &self.attachments.len())
            .finish_non_exhaustive()
    }
}

// =============================
// Namespaces
// =============================

/// A top-level entry of a [`Namespace`].
pub enum Entry<F> {
    Class(TestClass<F>),
    Parametrized(ParametrizedClass<F>),
    Substitute(Substitute<TestClass<F>>),
}

impl<F> fmt::Debug for Entry<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Entry::Class(class) => f.debug_tuple("Class").field(&class.name()).finish(),
            Entry::Parametrized(class) => {
                f.debug_tuple("Parametrized").field(&class.name()).finish()
            }
            Entry::Substitute(sub) => fmt::Debug::fmt(sub, f),
        }
    }
}

/// An ordered, module-like collection of test classes.
pub struct Namespace<F> {
    entries: Vec<(String, Entry<F>)>,
}

impl<F> Default for Namespace<F> {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
        }
    }
}

impl<F> Namespace<F> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds or replaces an entry. A replaced entry keeps its position.
    pub fn insert(&mut self, name: impl Into<String>, entry: Entry<F>) {
        let name = name.into();
        match self.entries.iter_mut().find(|(existing, _)| *existing == name) {
            Some(slot) => slot.1 = entry,
            None => self.entries.push((name, entry)),
        }
    }

    pub fn get(&self, name: &str) -> Option<&Entry<F>> {
        self.entries
            .iter()
            .find(|(existing, _)| existing == name)
            .map(|(_, entry)| entry)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(name, _)| name.as_str())
    }

    pub fn entries(&self) -> impl Iterator<Item = (&str, &Entry<F>)> {
        self.entries.iter().map(|(name, entry)| (name.as_str(), entry))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<F> Extend<(String, Entry<F>)> for Namespace<F> {
    fn extend<I: IntoIterator<Item = (String, Entry<F>)>>(&mut self, iter: I) {
        for (name, entry) in iter {
            self.insert(name, entry);
        }
    }
}
