//! Names of generated tests.
//!
//! A generated name is rendered from a pattern such as the default
//! `{base_name}__<{label}>`, where the label is the record's explicit label or
//! one derived from its values. Names are then made unique within one
//! expansion pass: a name that is already taken gets `__2`, `__3`, ...
//! appended.

use std::collections::HashSet;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::diagnostics::ExpandError;
use crate::param::Param;
use crate::value::Value;

/// Default name pattern. Part of the naming contract: unlabeled simple
/// records always render as `<base>__<<values>>`.
pub const DEFAULT_NAME_PATTERN: &str = "{base_name}__<{label}>";

/// Longest value representation embedded verbatim in a derived label.
pub const SHORT_REPR_MAX_LEN: usize = 16;

static PATTERN_TOKEN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\{\{|\}\}|\{([^{}]*)\}|[{}]").expect("pattern token regex is valid")
});

static DISALLOWED_IN_NAME: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\p{Cc}+").expect("control character regex is valid"));

/// Representation of a value as embedded in derived labels, cut down to
/// [`SHORT_REPR_MAX_LEN`] characters.
///
/// ```rust
/// use expander::naming::short_repr;
/// use expander::value::Value;
/// assert_eq!(short_repr(&Value::from(vec![1, 3, 1])), "[1, 3, 1]");
/// assert_eq!(short_repr(&Value::from("0123456789abcdefgh")), "<'0123456789...>");
/// ```
pub fn short_repr(value: &Value) -> String {
    let repr = value.repr();
    if repr.chars().count() <= SHORT_REPR_MAX_LEN {
        return repr;
    }
    let head: String = repr
        .trim_start_matches('<')
        .chars()
        .take(SHORT_REPR_MAX_LEN - 5)
        .collect();
    format!("<{}...>", head)
}

/// Makes a label safe to embed in a test name: runs of control characters
/// (newlines, tabs, ...) become a single `_`. Everything else is kept.
pub fn sanitize_label(label: &str) -> String {
    DISALLOWED_IN_NAME.replace_all(label, "_").into_owned()
}

// =============================
// Name formatting
// =============================

/// Values available to a name pattern.
#[derive(Debug, Clone, Copy)]
pub struct NameFields<'a> {
    pub base_name: &'a str,
    /// Sanitized label of the record.
    pub label: &'a str,
    /// 1-based position of the record among those generated from one unit.
    pub count: usize,
}

impl NameFields<'_> {
    /// Looks up a placeholder by name.
    pub fn get(&self, key: &str) -> Option<String> {
        match key {
            "base_name" => Some(self.base_name.to_string()),
            "label" => Some(self.label.to_string()),
            "count" => Some(self.count.to_string()),
            _ => None,
        }
    }
}

/// Renders a name pattern against a set of fields.
pub trait NameFormatter: Send + Sync {
    fn format(&self, pattern: &str, fields: &NameFields<'_>) -> Result<String, ExpandError>;
}

/// The default formatter: `{field}` placeholders, `{{`/`}}` for literal braces.
#[derive(Debug, Clone, Copy, Default)]
pub struct BraceFormatter;

impl NameFormatter for BraceFormatter {
    fn format(&self, pattern: &str, fields: &NameFields<'_>) -> Result<String, ExpandError> {
        let mut out = String::with_capacity(pattern.len() + fields.label.len());
        let mut last = 0;
        for caps in PATTERN_TOKEN.captures_iter(pattern) {
            let Some(token) = caps.get(0) else {
                continue;
            };
            out.push_str(&pattern[last..token.start()]);
            last = token.end();
            match token.as_str() {
                "{{" => out.push('{'),
                "}}" => out.push('}'),
                "{" | "}" => {
                    return Err(crate::expand_err!(
                        NamePattern { pattern: pattern.to_string() },
                        "unbalanced brace at offset {}",
                        token.start()
                    ));
                }
                _ => {
                    let field = caps.get(1).map_or("", |m| m.as_str());
                    let (key, spec) = field.split_once(':').unwrap_or((field, ""));
                    let value = fields.get(key).ok_or_else(|| {
                        crate::expand_err!(
                            NamePattern { pattern: pattern.to_string() },
                            "unknown placeholder {{{}}}",
                            key
                        )
                    })?;
                    out.push_str(&apply_width(pattern, key, spec, value)?);
                }
            }
        }
        out.push_str(&pattern[last..]);
        Ok(out)
    }
}

static WIDTH_SPEC: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(0?)([0-9]+)$").expect("width spec regex is valid"));

/// Applies a `:N` or `:0N` spec. Numbers are right-aligned (zero-padded with
/// `0N`), text is left-aligned.
fn apply_width(pattern: &str, key: &str, spec: &str, value: String) -> Result<String, ExpandError> {
    if spec.is_empty() {
        return Ok(value);
    }
    let invalid = || {
        crate::expand_err!(
            NamePattern { pattern: pattern.to_string() },
            "unsupported format spec {:?} for {{{}}}",
            spec,
            key
        )
    };
    let caps = WIDTH_SPEC.captures(spec).ok_or_else(invalid)?;
    let width: usize = caps[2].parse().map_err(|_| invalid())?;
    let zero = !caps[1].is_empty();
    Ok(match (key, zero) {
        ("count", true) => format!("{:0>width$}", value, width = width),
        ("count", false) => format!("{:>width$}", value, width = width),
        (_, false) => format!("{:<width$}", value, width = width),
        (_, true) => return Err(invalid()),
    })
}

// =============================
// Uniqueness
// =============================

/// Set of names already taken in one container.
#[derive(Debug, Clone, Default)]
pub struct UniqueNames {
    seen: HashSet<String>,
}

impl UniqueNames {
    /// Starts with the given names reserved.
    pub fn with_reserved<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            seen: names.into_iter().map(Into::into).collect(),
        }
    }

    pub fn reserve(&mut self, name: impl Into<String>) {
        self.seen.insert(name.into());
    }

    pub fn contains(&self, name: &str) -> bool {
        self.seen.contains(name)
    }

    /// Takes `stem` if it is free, otherwise the first free `stem__N` with
    /// `N >= 2`.
    pub fn claim(&mut self, stem: String) -> Result<String, ExpandError> {
        if self.seen.insert(stem.clone()) {
            return Ok(stem);
        }
        // `stem` is taken, so at most len - 1 of these len candidates are too
        for tag in 2..=self.seen.len() + 1 {
            let candidate = format!("{}__{}", stem, tag);
            if self.seen.insert(candidate.clone()) {
                return Ok(candidate);
            }
        }
        Err(ExpandError::NameCollision { name: stem })
    }
}

/// Produces unique names for the records of one expansion pass.
pub struct NameGenerator<'a> {
    pattern: &'a str,
    formatter: &'a dyn NameFormatter,
    names: UniqueNames,
}

impl<'a> NameGenerator<'a> {
    pub fn new(pattern: &'a str, formatter: &'a dyn NameFormatter, names: UniqueNames) -> Self {
        Self {
            pattern,
            formatter,
            names,
        }
    }

    /// Renders and claims the name of the `count`-th (1-based) record.
    pub fn name_for(
        &mut self,
        base_name: &str,
        record: &Param,
        count: usize,
    ) -> Result<String, ExpandError> {
        let label = sanitize_label(&record.effective_label());
        let fields = NameFields {
            base_name,
            label: &label,
            count,
        };
        let stem = self.formatter.format(self.pattern, &fields)?;
        self.names.claim(stem)
    }

    pub fn into_names(self) -> UniqueNames {
        self.names
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::ErrorType;
    use crate::param;

    fn fields<'a>(label: &'a str) -> NameFields<'a> {
        NameFields {
            base_name: "test_even",
            label,
            count: 3,
        }
    }

    #[test]
    fn default_pattern_embeds_label() {
        let name = BraceFormatter
            .format(DEFAULT_NAME_PATTERN, &fields("-14"))
            .unwrap();
        assert_eq!(name, "test_even__<-14>");
    }

    #[test]
    fn count_and_escaped_braces() {
        let name = BraceFormatter
            .format("{base_name}_{{{count}}}", &fields("x"))
            .unwrap();
        assert_eq!(name, "test_even_{3}");
    }

    #[test]
    fn unknown_placeholder_is_rejected() {
        let err = BraceFormatter
            .format("{base_name}_{nope}", &fields("x"))
            .unwrap_err();
        assert_eq!(err.error_type(), ErrorType::NamePattern);
        assert!(err.to_string().contains("{nope}"));
    }

    #[test]
    fn count_accepts_width_specs() {
        let name = BraceFormatter
            .format("{base_name}_{count:03}_{count:2}", &fields("x"))
            .unwrap();
        assert_eq!(name, "test_even_003_ 3");
        let err = BraceFormatter
            .format("{label:x>4}", &fields("x"))
            .unwrap_err();
        assert!(err.to_string().contains("unsupported format spec"));
    }

    #[test]
    fn lone_brace_is_rejected() {
        let err = BraceFormatter.format("{base_name", &fields("x")).unwrap_err();
        assert!(err.to_string().contains("unbalanced"));
    }

    #[test]
    fn sanitize_replaces_control_runs() {
        assert_eq!(sanitize_label("a\n\tb c"), "a_b c");
        assert_eq!(sanitize_label("five"), "five");
    }

    #[test]
    fn collisions_get_running_tags() {
        let mut names = UniqueNames::with_reserved(["test_a"]);
        assert_eq!(names.claim("test_a".into()).unwrap(), "test_a__2");
        assert_eq!(names.claim("test_a".into()).unwrap(), "test_a__3");
        assert_eq!(names.claim("test_b".into()).unwrap(), "test_b");
    }

    #[test]
    fn generator_uses_label_before_values() {
        let formatter = BraceFormatter;
        let mut namer = NameGenerator::new(DEFAULT_NAME_PATTERN, &formatter, UniqueNames::default());
        let labeled = param!(5).with_label("five");
        assert_eq!(namer.name_for("test_x", &labeled, 1).unwrap(), "test_x__<five>");
        let plain = param!(5);
        assert_eq!(namer.name_for("test_x", &plain, 2).unwrap(), "test_x__<5>");
        assert_eq!(namer.name_for("test_x", &plain, 3).unwrap(), "test_x__<5>__2");
    }
}
