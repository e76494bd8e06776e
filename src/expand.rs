//! The expansion driver.
//!
//! [`Expander::expand`] takes a [`TestClass`] and returns a new one in which
//! every marked method is replaced by a [`Substitute`] followed by one
//! generated test per combined record. A class that carries class-level
//! attachments additionally yields one [`ParametrizedClass`] per record.
//! Expanding a class without marked members returns it unchanged.

use std::fmt;
use std::sync::Arc;

use crate::combine::{combine, ProductOrder};
use crate::config::ExpandConfig;
use crate::container::{Entry, Member, Namespace, Signature, TestClass, TestMethod};
use crate::diagnostics::ExpandError;
use crate::naming::{BraceFormatter, NameFormatter, NameGenerator, UniqueNames};
use crate::param::Param;
use crate::runtime::{GeneratedTest, ParametrizedClass};
use crate::substitute::Substitute;
use crate::warnings::{deprecated, Deprecation};

/// Result of expanding one class.
pub enum Expansion<F> {
    /// No class-level attachments: the class with its methods expanded.
    Class(TestClass<F>),
    /// Class-level attachments: the class is substituted and replaced by its
    /// parametrized copies.
    Parametrized {
        substitute: Substitute<TestClass<F>>,
        classes: Vec<ParametrizedClass<F>>,
    },
}

impl<F> Expansion<F> {
    /// The expanded class itself, substituted or not.
    pub fn class(&self) -> &TestClass<F> {
        match self {
            Expansion::Class(class) => class,
            Expansion::Parametrized { substitute, .. } => substitute.actual_object(),
        }
    }

    pub fn parametrized(&self) -> &[ParametrizedClass<F>] {
        match self {
            Expansion::Class(_) => &[],
            Expansion::Parametrized { classes, .. } => classes,
        }
    }

    /// Entries to bind in a namespace: the class (or its substitute) under
    /// its own name, then each parametrized copy.
    pub fn into_entries(self) -> Vec<(String, Entry<F>)> {
        match self {
            Expansion::Class(class) => vec![(class.name().to_string(), Entry::Class(class))],
            Expansion::Parametrized {
                substitute,
                classes,
            } => {
                let mut entries = Vec::with_capacity(classes.len() + 1);
                entries.push((substitute.name().to_string(), Entry::Substitute(substitute)));
                entries.extend(
                    classes
                        .into_iter()
                        .map(|class| (class.name().to_string(), Entry::Parametrized(class))),
                );
                entries
            }
        }
    }
}

impl<F> fmt::Debug for Expansion<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expansion::Class(class) => f.debug_tuple("Class").field(class).finish(),
            Expansion::Parametrized {
                substitute,
                classes,
            } => f
                .debug_struct("Parametrized")
                .field("substitute", substitute)
                .field("classes", classes)
                .finish(),
        }
    }
}

/// A configured expansion entry point.
#[derive(Clone)]
pub struct Expander {
    config: ExpandConfig,
    formatter: Arc<dyn NameFormatter>,
}

impl Default for Expander {
    fn default() -> Self {
        Self::new(ExpandConfig::default())
    }
}

impl fmt::Debug for Expander {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Expander")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl Expander {
    pub fn new(config: ExpandConfig) -> Self {
        Self {
            config,
            formatter: Arc::new(BraceFormatter),
        }
    }

    pub fn config(&self) -> &ExpandConfig {
        &self.config
    }

    pub fn name_pattern(mut self, pattern: impl Into<String>) -> Self {
        self.config.name_pattern = pattern.into();
        self
    }

    pub fn name_formatter(mut self, formatter: impl NameFormatter + 'static) -> Self {
        self.formatter = Arc::new(formatter);
        self
    }

    pub fn product_order(mut self, order: ProductOrder) -> Self {
        self.config.product_order = order;
        self
    }

    pub fn legacy_signature_introspection(mut self, enabled: bool) -> Self {
        self.config.legacy_signature_introspection = enabled;
        self
    }

    pub fn test_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.config.test_prefix = prefix.into();
        self
    }

    /// Expands `class`. Every error is reported here, before any generated
    /// test can run.
    pub fn expand<F: 'static>(&self, class: TestClass<F>) -> Result<Expansion<F>, ExpandError> {
        let reserved = UniqueNames::with_reserved([class.name()]);
        self.expand_with(class, reserved)
    }

    /// Expands `class` and puts its parametrized copies, if any, into
    /// `into` instead of returning them. Returns what should be bound under
    /// the class's own name.
    #[deprecated(note = "bind the entries of `Expander::expand` instead")]
    pub fn expand_into<F: 'static>(
        &self,
        class: TestClass<F>,
        into: &mut Namespace<F>,
    ) -> Result<Entry<F>, ExpandError> {
        deprecated(Deprecation::ExpandInto);
        let reserved = UniqueNames::with_reserved(into.names().chain([class.name()]));
        match self.expand_with(class, reserved)? {
            Expansion::Class(class) => Ok(Entry::Class(class)),
            Expansion::Parametrized {
                substitute,
                classes,
            } => {
                for class in classes {
                    into.insert(class.name().to_string(), Entry::Parametrized(class));
                }
                Ok(Entry::Substitute(substitute))
            }
        }
    }

    fn expand_with<F: 'static>(
        &self,
        class: TestClass<F>,
        reserved: UniqueNames,
    ) -> Result<Expansion<F>, ExpandError> {
        let class = self.expand_methods(class)?;
        if class.attachments().is_empty() {
            return Ok(Expansion::Class(class));
        }

        let records = combine(class.attachments(), &class.owner_info(), self.config.product_order)?;
        let base = Arc::new(class);
        let mut names = NameGenerator::new(&self.config.name_pattern, self.formatter.as_ref(), reserved);
        let classes = records
            .into_iter()
            .enumerate()
            .map(|(index, record)| {
                let name = names.name_for(base.name(), &record, index + 1)?;
                Ok(ParametrizedClass::new(name, index, record, Arc::clone(&base)))
            })
            .collect::<Result<Vec<_>, ExpandError>>()?;

        tracing::debug!(class = %base.name(), generated = classes.len(), "expanded test class");
        Ok(Expansion::Parametrized {
            substitute: Substitute::from_arc(base),
            classes,
        })
    }

    fn expand_methods<F: 'static>(&self, mut class: TestClass<F>) -> Result<TestClass<F>, ExpandError> {
        if !class.has_marked_methods() {
            return Ok(class);
        }

        let owner = class.owner_info();
        let mut names = UniqueNames::with_reserved(class.member_names());
        let members = class.take_members();
        let mut expanded = Vec::with_capacity(members.len());

        for (name, member) in members {
            let method = match member {
                Member::Method(method) if method.is_marked() => method,
                other => {
                    expanded.push((name, other));
                    continue;
                }
            };

            let records = combine(method.attachments(), &owner, self.config.product_order)?;
            if let Some(signature) = method.signature() {
                for record in &records {
                    self.check_signature(&name, signature, record)?;
                }
            }

            let original = Arc::new(method);
            let generated = self.generate_tests(&name, &original, records, &mut names)?;
            tracing::debug!(test = %name, generated = generated.len(), "expanded test method");

            expanded.push((name, Member::Substitute(Substitute::from_arc(original))));
            expanded.extend(generated);
        }

        class.set_members(expanded);
        Ok(class)
    }

    fn generate_tests<F>(
        &self,
        base_name: &str,
        original: &Arc<TestMethod<F>>,
        records: Vec<Param>,
        names: &mut UniqueNames,
    ) -> Result<Vec<(String, Member<F>)>, ExpandError> {
        let mut generator =
            NameGenerator::new(&self.config.name_pattern, self.formatter.as_ref(), std::mem::take(names));
        let mut generated = Vec::with_capacity(records.len());

        for (index, record) in records.into_iter().enumerate() {
            let name = match generator.name_for(base_name, &record, index + 1) {
                Ok(name) => name,
                Err(err) => {
                    *names = generator.into_names();
                    return Err(err);
                }
            };
            if !name.starts_with(&self.config.test_prefix) {
                tracing::warn!(
                    test = %name,
                    prefix = %self.config.test_prefix,
                    "generated name does not start with the test prefix and will not be discovered"
                );
            }
            let test = GeneratedTest::new(
                name.clone(),
                index,
                record,
                Arc::clone(original),
                self.config.legacy_signature_introspection,
            );
            generated.push((name, Member::Generated(test)));
        }

        *names = generator.into_names();
        Ok(generated)
    }

    fn check_signature(&self, test: &str, signature: &Signature, record: &Param) -> Result<(), ExpandError> {
        let positional = record.positional().count();
        let mut keywords: Vec<&str> = record.named().keys().map(String::as_str).collect();
        if self.config.legacy_signature_introspection {
            keywords.extend(signature.generic_targets(positional, record.named()));
        }
        signature
            .check(positional, keywords)
            .map_err(|message| ExpandError::SignatureMismatch {
                test: test.to_string(),
                message,
            })
    }
}

/// Expands `class` with the default settings.
pub fn expand<F: 'static>(class: TestClass<F>) -> Result<Expansion<F>, ExpandError> {
    Expander::default().expand(class)
}

/// Expands `class` with the default settings, redirecting parametrized copies
/// into `into`.
#[deprecated(note = "bind the entries of `expand` instead")]
#[allow(deprecated)]
pub fn expand_into<F: 'static>(
    class: TestClass<F>,
    into: &mut Namespace<F>,
) -> Result<Entry<F>, ExpandError> {
    Expander::default().expand_into(class, into)
}
