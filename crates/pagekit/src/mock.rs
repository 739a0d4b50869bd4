//! In-memory driver for unit and integration tests.
//!
//! Elements form a tree through parent links and answer to the locators they
//! were registered with. XPath index wrappers `(expr)[n]` are evaluated, so
//! indexed lists and scoped lookups behave as against a real session.
//! Removing an element makes its reference (and its descendants') stale.

use serde_json::{json, Value};
use std::collections::{BTreeMap, HashSet};
use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::driver::{Command, Driver, DriverError, ElementRef};
use crate::locator::{Locator, Strategy};

/// Element stored by the mock driver
#[derive(Debug, Clone, PartialEq)]
pub struct MockElement {
    /// Element id
    pub id: String,
    /// Parent element id
    pub parent: Option<String>,
    /// Tag name
    pub tag: String,
    /// Visible text
    pub text: String,
    /// Attributes
    pub attributes: BTreeMap<String, String>,
    /// Displayed flag
    pub displayed: bool,
    /// Enabled flag
    pub enabled: bool,
    /// Selected flag
    pub selected: bool,
    /// Rendered locators this element matches
    pub selectors: Vec<String>,
}

impl MockElement {
    /// New visible, enabled element
    #[must_use]
    pub fn new(id: impl Into<String>, tag: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            parent: None,
            tag: tag.into(),
            text: String::new(),
            attributes: BTreeMap::new(),
            displayed: true,
            enabled: true,
            selected: false,
            selectors: Vec::new(),
        }
    }

    /// Match `locator`
    #[must_use]
    pub fn matching(mut self, locator: &Locator) -> Self {
        self.selectors.push(locator.to_string());
        self
    }

    /// Place under `parent`
    #[must_use]
    pub fn child_of(mut self, parent: impl Into<String>) -> Self {
        self.parent = Some(parent.into());
        self
    }

    /// Set text
    #[must_use]
    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = text.into();
        self
    }

    /// Set an attribute
    #[must_use]
    pub fn with_attribute(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        let _ = self.attributes.insert(name.into(), value.into());
        self
    }

    /// Mark as not displayed
    #[must_use]
    pub const fn hidden(mut self) -> Self {
        self.displayed = false;
        self
    }
}

#[derive(Debug, Default)]
struct MockState {
    elements: Vec<MockElement>,
    removed: HashSet<String>,
    history: Vec<String>,
    failure: Option<DriverError>,
}

impl MockState {
    fn live(&self, id: &str) -> Option<&MockElement> {
        if self.removed.contains(id) {
            return None;
        }
        self.elements.iter().find(|e| e.id == id)
    }

    fn is_within(&self, element: &MockElement, scope: &str) -> bool {
        let mut parent = element.parent.as_deref();
        while let Some(id) = parent {
            if id == scope {
                return true;
            }
            parent = self
                .elements
                .iter()
                .find(|e| e.id == id)
                .and_then(|e| e.parent.as_deref());
        }
        false
    }

    fn is_attached(&self, element: &MockElement) -> bool {
        let mut current = Some(element);
        while let Some(e) = current {
            if self.removed.contains(&e.id) {
                return false;
            }
            current = e
                .parent
                .as_deref()
                .and_then(|p| self.elements.iter().find(|c| c.id == p));
        }
        true
    }

    fn matches(&self, scope: Option<&str>, locator: &Locator) -> Vec<ElementRef> {
        if locator.strategy() == Strategy::XPath {
            if let Some((inner, position)) = split_index(locator.selector()) {
                let found = self.matches(scope, &locator.with_selector(inner));
                return position
                    .checked_sub(1)
                    .and_then(|i| found.get(i).cloned())
                    .into_iter()
                    .collect();
            }
        }
        let rendered = locator.to_string();
        self.elements
            .iter()
            .filter(|e| e.selectors.contains(&rendered))
            .filter(|e| self.is_attached(e))
            .filter(|e| scope.map_or(true, |s| self.is_within(e, s)))
            .map(|e| ElementRef::new(e.id.clone()))
            .collect()
    }
}

/// Split `(expr)[n]` into `expr` and `n`
fn split_index(selector: &str) -> Option<(&str, usize)> {
    let body = selector.strip_prefix('(')?;
    let open = body.rfind(")[")?;
    let position = body[open + 2..].strip_suffix(']')?.parse().ok()?;
    Some((&body[..open], position))
}

/// Mock driver for unit testing
#[derive(Debug, Default)]
pub struct MockDriver {
    state: Mutex<MockState>,
}

impl MockDriver {
    /// Create new mock driver
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Add an element; document order is insertion order
    pub fn add(&self, element: MockElement) {
        self.state().elements.push(element);
    }

    /// Builder-style [`MockDriver::add`]
    #[must_use]
    pub fn with(self, element: MockElement) -> Self {
        self.add(element);
        self
    }

    /// Detach an element and its subtree
    pub fn remove(&self, id: &str) {
        let _ = self.state().removed.insert(id.to_string());
    }

    /// Replace an element's text
    pub fn set_text(&self, id: &str, text: impl Into<String>) {
        let text = text.into();
        if let Some(e) = self.state().elements.iter_mut().find(|e| e.id == id) {
            e.text = text;
        }
    }

    /// Make every subsequent `invoke` fail with `error` (None to clear)
    pub fn set_failure(&self, error: Option<DriverError>) {
        self.state().failure = error;
    }

    /// Snapshot of an element's current state
    #[must_use]
    pub fn element(&self, id: &str) -> Option<MockElement> {
        self.state().elements.iter().find(|e| e.id == id).cloned()
    }

    /// Call history for verification
    #[must_use]
    pub fn history(&self) -> Vec<String> {
        self.state().history.clone()
    }

    /// Check if a call starting with `prefix` was recorded
    #[must_use]
    pub fn was_called(&self, prefix: &str) -> bool {
        self.state().history.iter().any(|c| c.starts_with(prefix))
    }

    /// Number of `find_all` calls so far
    #[must_use]
    pub fn find_count(&self) -> usize {
        self.state()
            .history
            .iter()
            .filter(|c| c.starts_with("find:"))
            .count()
    }

    /// Forget recorded calls
    pub fn clear_history(&self) {
        self.state().history.clear();
    }
}

impl Driver for MockDriver {
    fn find_all(
        &self,
        scope: Option<&ElementRef>,
        locator: &Locator,
    ) -> Result<Vec<ElementRef>, DriverError> {
        let mut state = self.state();
        let scope_id = scope.map(ElementRef::id);
        state.history.push(match scope_id {
            Some(s) => format!("find:{locator} in {s}"),
            None => format!("find:{locator}"),
        });
        if let Some(s) = scope_id {
            if state.live(s).is_none() {
                return Err(DriverError::Stale {
                    message: format!("search root {s} is detached"),
                });
            }
        }
        Ok(state.matches(scope_id, locator))
    }

    fn invoke(&self, element: &ElementRef, command: &Command) -> Result<Value, DriverError> {
        let mut state = self.state();
        state
            .history
            .push(format!("{}:{}", command.name(), element.id()));
        if let Some(err) = state.failure.clone() {
            return Err(err);
        }
        let attached = state
            .live(element.id())
            .map_or(false, |e| state.is_attached(e));
        if !attached {
            return Err(DriverError::Stale {
                message: format!("element {element} is no longer attached"),
            });
        }
        let Some(target) = state.elements.iter_mut().find(|e| e.id == element.id()) else {
            return Err(DriverError::NotFound {
                message: element.to_string(),
            });
        };
        let value = match command {
            Command::Click | Command::DoubleClick | Command::Submit => Value::Null,
            Command::SendKeys(keys) => {
                target
                    .attributes
                    .entry("value".to_string())
                    .or_default()
                    .push_str(keys);
                Value::Null
            }
            Command::Clear => {
                let _ = target.attributes.insert("value".to_string(), String::new());
                Value::Null
            }
            Command::Text => json!(target.text),
            Command::TagName => json!(target.tag),
            Command::Attribute(name) | Command::Property(name) => {
                json!(target.attributes.get(name))
            }
            Command::CssValue(name) => {
                json!(target.attributes.get(name).cloned().unwrap_or_default())
            }
            Command::IsDisplayed => json!(target.displayed),
            Command::IsEnabled => json!(target.enabled),
            Command::IsSelected => json!(target.selected),
            Command::Rect => json!({"x": 0.0, "y": 0.0, "width": 10.0, "height": 10.0}),
        };
        Ok(value)
    }
}
