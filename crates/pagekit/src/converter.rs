//! Locator converter pipeline.
//!
//! Converters rewrite the selector text of a [`Locator`] before it is sent to
//! the driver. A pipeline is immutable: applying it never changes the stored
//! converters, it returns the converted locator together with the converters
//! still pending. A converter that made no textual change, or whose work is
//! complete, is consumed. Applying the pending pipeline to the converted
//! locator is therefore a no-op, and handles can re-run the full pipeline from
//! the declared locator on every lookup.

use regex::{Captures, Regex};
use std::sync::OnceLock;

use crate::locator::{Locator, PLACEHOLDER};
use crate::result::{PageError, PageResult};

const UPPER: &str = "ABCDEFGHIJKLMNOPQRSTUVWXYZ";
const LOWER: &str = "abcdefghijklmnopqrstuvwxyz";

/// A single text-level locator transformation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LocatorConverter {
    /// Positional arguments substituted into `%s` placeholders, front first
    Format(Vec<String>),
    /// Select only the Nth (0-based) match; XPath only
    Index(usize),
    /// Fold equality and `contains`/`starts-with` comparisons to lower case; XPath only
    CaseInsensitive,
    /// Marks the locator as localized under a translation key; no text rewrite
    Localize(String),
}

impl LocatorConverter {
    /// Converter name for diagnostics
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Format(_) => "format",
            Self::Index(_) => "index",
            Self::CaseInsensitive => "case-insensitive",
            Self::Localize(_) => "localize",
        }
    }

    /// Apply once, returning the converted locator and what remains pending
    pub fn apply(&self, locator: &Locator) -> PageResult<(Locator, Option<Self>)> {
        match self {
            Self::Format(args) => {
                let (text, rest) = substitute(locator.selector(), args);
                let changed = text != locator.selector();
                let pending = (changed && !rest.is_empty()).then(|| Self::Format(rest.to_vec()));
                Ok((locator.with_selector(text), pending))
            }
            Self::Index(index) => {
                require_indexable(locator, self)?;
                let text = format!("({})[{}]", locator.selector(), index + 1);
                Ok((locator.with_selector(text), None))
            }
            Self::CaseInsensitive => {
                require_indexable(locator, self)?;
                Ok((locator.with_selector(fold_case(locator.selector())), None))
            }
            Self::Localize(_) => Ok((locator.clone(), None)),
        }
    }
}

fn require_indexable(locator: &Locator, converter: &LocatorConverter) -> PageResult<()> {
    if locator.strategy().supports_index() {
        Ok(())
    } else {
        Err(PageError::UnsupportedLocator {
            locator: locator.to_string(),
            converter: converter.name(),
        })
    }
}

/// Substitute arguments left to right, returning the text and the unconsumed queue.
///
/// Each argument is consumed once its substitution changes the text; the loop
/// stops at the first argument that changes nothing.
fn substitute<'a>(text: &str, args: &'a [String]) -> (String, &'a [String]) {
    let mut current = text.to_string();
    let mut queue = args;
    while let Some((arg, rest)) = queue.split_first() {
        let next = current.replacen(PLACEHOLDER, arg, 1);
        if next == current {
            break;
        }
        current = next;
        queue = rest;
    }
    (current, queue)
}

fn translate(lhs: &str) -> String {
    format!("translate({lhs}, '{UPPER}', '{LOWER}')")
}

fn quoted(caps: &Captures<'_>) -> String {
    caps.name("sq").map_or_else(
        || format!("\"{}\"", caps.name("dq").map_or("", |m| m.as_str()).to_ascii_lowercase()),
        |m| format!("'{}'", m.as_str().to_ascii_lowercase()),
    )
}

#[allow(clippy::expect_used)]
fn function_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(
            r#"(?P<func>contains|starts-with)\(\s*(?P<lhs>@[\w:.-]+|text\(\)|\.)\s*,\s*(?:'(?P<sq>[^']*)'|"(?P<dq>[^"]*)")\s*\)"#,
        )
        .expect("static function pattern")
    })
}

#[allow(clippy::expect_used)]
fn equality_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r#"(?P<lhs>@[\w:.-]+|text\(\)|\.)\s*=\s*(?:'(?P<sq>[^']*)'|"(?P<dq>[^"]*)")"#)
            .expect("static equality pattern")
    })
}

/// Rewrite comparisons into `translate()`-folded equivalents
fn fold_case(xpath: &str) -> String {
    let folded = function_pattern().replace_all(xpath, |caps: &Captures<'_>| {
        format!("{}({}, {})", &caps["func"], translate(&caps["lhs"]), quoted(caps))
    });
    equality_pattern()
        .replace_all(&folded, |caps: &Captures<'_>| {
            format!("{}={}", translate(&caps["lhs"]), quoted(caps))
        })
        .into_owned()
}

/// Result of running a pipeline
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Converted {
    /// Locator to send to the driver
    pub locator: Locator,
    /// Converters that were not consumed
    pub pending: LocatorPipeline,
}

/// Ordered, immutable list of converters
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LocatorPipeline {
    converters: Vec<LocatorConverter>,
}

impl LocatorPipeline {
    /// Empty pipeline
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// New pipeline with `converter` appended
    #[must_use]
    pub fn with(&self, converter: LocatorConverter) -> Self {
        let mut converters = self.converters.clone();
        converters.push(converter);
        Self { converters }
    }

    /// Converters in run order
    #[must_use]
    pub fn converters(&self) -> &[LocatorConverter] {
        &self.converters
    }

    /// Whether no converter is present
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.converters.is_empty()
    }

    /// Translation key of the first localize marker
    #[must_use]
    pub fn localization_key(&self) -> Option<&str> {
        self.converters.iter().find_map(|c| match c {
            LocatorConverter::Localize(key) => Some(key.as_str()),
            _ => None,
        })
    }

    /// Whether an index converter is present
    #[must_use]
    pub fn has_index(&self) -> bool {
        self.converters
            .iter()
            .any(|c| matches!(c, LocatorConverter::Index(_)))
    }

    /// Run every converter in insertion order
    pub fn apply(&self, locator: &Locator) -> PageResult<Converted> {
        let mut current = locator.clone();
        let mut pending = Vec::new();
        for converter in &self.converters {
            let (next, remaining) = converter.apply(&current)?;
            current = next;
            pending.extend(remaining);
        }
        Ok(Converted {
            locator: current,
            pending: Self {
                converters: pending,
            },
        })
    }

    /// Convenience for callers that only need the final locator
    pub fn convert(&self, locator: &Locator) -> PageResult<Locator> {
        self.apply(locator).map(|c| c.locator)
    }
}

impl FromIterator<LocatorConverter> for LocatorPipeline {
    fn from_iter<I: IntoIterator<Item = LocatorConverter>>(iter: I) -> Self {
        Self {
            converters: iter.into_iter().collect(),
        }
    }
}
