//! Search scopes and their propagation between declared fields.
//!
//! A field searches either the whole session or inside an element resolved
//! from another field it `depends_on`. The dependency is looked up through a
//! chain of frames (the declaring object first, then its containers), resolved
//! once when the field is built, and captured in the field's [`SearchScope`].

use std::collections::HashMap;
use std::fmt;

use crate::converter::{LocatorConverter, LocatorPipeline};
use crate::driver::ElementRef;
use crate::element::ElementHandle;
use crate::list::ListBinding;
use crate::locator::Locator;
use crate::result::{PageError, PageResult};

/// Root within which a locator is evaluated
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum SearchScope {
    /// The whole automation session
    #[default]
    Root,
    /// Inside a previously resolved element
    Element {
        /// Field the element was resolved from
        name: String,
        /// The resolved element
        element: ElementRef,
    },
}

impl SearchScope {
    /// Scope rooted at a resolved element
    #[must_use]
    pub fn element(name: impl Into<String>, element: ElementRef) -> Self {
        Self::Element {
            name: name.into(),
            element,
        }
    }

    /// Element to pass to the driver, `None` for the session root
    #[must_use]
    pub const fn root_element(&self) -> Option<&ElementRef> {
        match self {
            Self::Root => None,
            Self::Element { element, .. } => Some(element),
        }
    }
}

impl fmt::Display for SearchScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Root => f.write_str("session"),
            Self::Element { name, element } => write!(f, "{name} [{element}]"),
        }
    }
}

/// Declaration of a page object field
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldDecl {
    /// Field name
    pub name: String,
    /// Declared locator, possibly templated
    pub locator: Locator,
    /// Field whose element is the search root
    pub depends_on: Option<String>,
    /// Binding policy when the field is a list
    pub binding: ListBinding,
    /// Fold comparisons to lower case
    pub case_insensitive: bool,
    /// Translation key for localized locators
    pub localization_key: Option<String>,
    /// Positional arguments for `%s` placeholders
    pub format_args: Vec<String>,
}

impl FieldDecl {
    /// Declare a field
    #[must_use]
    pub fn new(name: impl Into<String>, locator: Locator) -> Self {
        Self {
            name: name.into(),
            locator,
            depends_on: None,
            binding: ListBinding::Snapshot,
            case_insensitive: false,
            localization_key: None,
            format_args: Vec::new(),
        }
    }

    /// Search inside the element of another field
    #[must_use]
    pub fn depends_on(mut self, field: impl Into<String>) -> Self {
        self.depends_on = Some(field.into());
        self
    }

    /// Re-resolve list items by position
    #[must_use]
    pub const fn indexed(mut self) -> Self {
        self.binding = ListBinding::Indexed;
        self
    }

    /// Fold comparisons to lower case
    #[must_use]
    pub const fn case_insensitive(mut self) -> Self {
        self.case_insensitive = true;
        self
    }

    /// Mark as localized under `key`
    #[must_use]
    pub fn localized(mut self, key: impl Into<String>) -> Self {
        self.localization_key = Some(key.into());
        self
    }

    /// Fill `%s` placeholders with `args`
    #[must_use]
    pub fn format_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.format_args = args.into_iter().map(Into::into).collect();
        self
    }

    /// Converter pipeline implied by the declaration
    #[must_use]
    pub fn pipeline(&self) -> LocatorPipeline {
        let mut pipeline = LocatorPipeline::new();
        if !self.format_args.is_empty() {
            pipeline = pipeline.with(LocatorConverter::Format(self.format_args.clone()));
        }
        if self.case_insensitive {
            pipeline = pipeline.with(LocatorConverter::CaseInsensitive);
        }
        if let Some(key) = &self.localization_key {
            pipeline = pipeline.with(LocatorConverter::Localize(key.clone()));
        }
        pipeline
    }
}

#[derive(Debug, Clone, Default)]
struct Frame {
    fields: HashMap<String, ElementHandle>,
}

/// Resolves the search scope of declared fields
#[derive(Debug, Clone, Default)]
pub struct ScopeResolver {
    root: SearchScope,
    frames: Vec<Frame>,
}

impl ScopeResolver {
    /// Resolver for an object rooted at `root`
    #[must_use]
    pub fn new(root: SearchScope) -> Self {
        Self {
            root,
            frames: vec![Frame::default()],
        }
    }

    /// Root scope of the current object
    #[must_use]
    pub const fn root(&self) -> &SearchScope {
        &self.root
    }

    /// Resolver for a nested object; outer fields stay visible to `depends_on`
    #[must_use]
    pub fn nested(&self, root: SearchScope) -> Self {
        let mut frames = self.frames.clone();
        frames.push(Frame::default());
        Self { root, frames }
    }

    /// Make `handle` available as a dependency under `name`
    pub fn register(&mut self, name: impl Into<String>, handle: ElementHandle) {
        if let Some(frame) = self.frames.last_mut() {
            let _ = frame.fields.insert(name.into(), handle);
        }
    }

    /// Find a field, innermost frame first
    #[must_use]
    pub fn lookup(&self, name: &str) -> Option<&ElementHandle> {
        self.frames.iter().rev().find_map(|f| f.fields.get(name))
    }

    /// Compute the scope for `decl`, resolving its dependency now
    pub fn resolve(&self, decl: &FieldDecl) -> PageResult<SearchScope> {
        let Some(dependency) = decl.depends_on.as_deref() else {
            return Ok(self.root.clone());
        };
        if dependency == decl.name {
            return Err(PageError::ContextCycle {
                chain: vec![decl.name.clone(), decl.name.clone()],
            });
        }
        let missing = |reason: String| PageError::MissingContext {
            field: decl.name.clone(),
            dependency: dependency.to_string(),
            reason,
        };
        let handle = self
            .lookup(dependency)
            .ok_or_else(|| missing("no element field with that name is in scope".to_string()))?;
        match handle.refresh() {
            Ok(element) => {
                tracing::debug!(field = %decl.name, context = dependency, %element, "scope resolved");
                Ok(SearchScope::element(dependency, element))
            }
            Err(err) if err.is_absence() => Err(missing(err.to_string())),
            Err(err) => Err(err),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mark {
    Unvisited,
    InProgress,
    Done,
}

/// Order in which `decls` must be built so dependencies come first.
///
/// Dependencies on names outside `decls` are left to the frame chain.
pub fn plan_build_order(decls: &[FieldDecl]) -> PageResult<Vec<usize>> {
    let index: HashMap<&str, usize> = decls
        .iter()
        .enumerate()
        .map(|(i, d)| (d.name.as_str(), i))
        .collect();
    let mut marks = vec![Mark::Unvisited; decls.len()];
    let mut order = Vec::with_capacity(decls.len());

    for start in 0..decls.len() {
        let mut path: Vec<usize> = Vec::new();
        let mut current = Some(start);
        while let Some(i) = current {
            match marks[i] {
                Mark::Done => break,
                Mark::InProgress => {
                    let from = path.iter().position(|&p| p == i).unwrap_or(0);
                    let mut chain: Vec<String> =
                        path[from..].iter().map(|&p| decls[p].name.clone()).collect();
                    chain.push(decls[i].name.clone());
                    return Err(PageError::ContextCycle { chain });
                }
                Mark::Unvisited => {
                    marks[i] = Mark::InProgress;
                    path.push(i);
                    current = decls[i]
                        .depends_on
                        .as_deref()
                        .and_then(|d| index.get(d).copied());
                }
            }
        }
        for &i in path.iter().rev() {
            marks[i] = Mark::Done;
            order.push(i);
        }
    }
    Ok(order)
}
