//! Element capability trait and the lazy element handle.
//!
//! [`Element`] is the operation surface of a UI element. [`RemoteElement`]
//! forwards it to one element reference; [`ElementHandle`] implements the same
//! surface by re-resolving its locator against the live UI tree on every call
//! and then forwarding to the element it found. Nothing resolved is kept
//! between calls, so a handle never goes stale.

use serde::de::DeserializeOwned;
use serde_json::Value;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use crate::converter::{LocatorConverter, LocatorPipeline};
use crate::driver::{Command, Driver, DriverError, ElementRef, Rect};
use crate::locator::Locator;
use crate::result::{PageError, PageResult};
use crate::scope::SearchScope;
use crate::wait::{poll_until, WaitOptions};

fn decode<T: DeserializeOwned>(value: Value) -> PageResult<T> {
    Ok(serde_json::from_value(value)?)
}

/// Operations available on a UI element
pub trait Element {
    /// Invoke a raw command
    fn execute(&self, command: Command) -> PageResult<Value>;

    /// Click the element
    fn click(&self) -> PageResult<()> {
        self.execute(Command::Click).map(drop)
    }

    /// Double click the element
    fn double_click(&self) -> PageResult<()> {
        self.execute(Command::DoubleClick).map(drop)
    }

    /// Type `keys` into the element
    fn send_keys(&self, keys: &str) -> PageResult<()> {
        self.execute(Command::SendKeys(keys.to_string())).map(drop)
    }

    /// Clear an editable element
    fn clear(&self) -> PageResult<()> {
        self.execute(Command::Clear).map(drop)
    }

    /// Submit the enclosing form
    fn submit(&self) -> PageResult<()> {
        self.execute(Command::Submit).map(drop)
    }

    /// Visible text
    fn text(&self) -> PageResult<String> {
        decode(self.execute(Command::Text)?)
    }

    /// Tag name
    fn tag_name(&self) -> PageResult<String> {
        decode(self.execute(Command::TagName)?)
    }

    /// Attribute value, `None` when absent
    fn attribute(&self, name: &str) -> PageResult<Option<String>> {
        decode(self.execute(Command::Attribute(name.to_string()))?)
    }

    /// DOM property value
    fn property(&self, name: &str) -> PageResult<Value> {
        self.execute(Command::Property(name.to_string()))
    }

    /// Computed CSS value
    fn css_value(&self, name: &str) -> PageResult<String> {
        decode(self.execute(Command::CssValue(name.to_string()))?)
    }

    /// Whether the element is displayed
    fn is_displayed(&self) -> PageResult<bool> {
        decode(self.execute(Command::IsDisplayed)?)
    }

    /// Whether the element is enabled
    fn is_enabled(&self) -> PageResult<bool> {
        decode(self.execute(Command::IsEnabled)?)
    }

    /// Whether the element is selected
    fn is_selected(&self) -> PageResult<bool> {
        decode(self.execute(Command::IsSelected)?)
    }

    /// Element bounds
    fn rect(&self) -> PageResult<Rect> {
        decode(self.execute(Command::Rect)?)
    }
}

/// A found element bound to a driver
#[derive(Clone)]
pub struct RemoteElement {
    driver: Arc<dyn Driver>,
    element: ElementRef,
}

impl RemoteElement {
    /// Bind `element` to `driver`
    #[must_use]
    pub fn new(driver: Arc<dyn Driver>, element: ElementRef) -> Self {
        Self { driver, element }
    }

    /// The element reference
    #[must_use]
    pub const fn element(&self) -> &ElementRef {
        &self.element
    }
}

impl fmt::Debug for RemoteElement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RemoteElement")
            .field("element", &self.element)
            .finish_non_exhaustive()
    }
}

impl Element for RemoteElement {
    fn execute(&self, command: Command) -> PageResult<Value> {
        Ok(self.driver.invoke(&self.element, &command)?)
    }
}

#[derive(Debug, Clone)]
enum Target {
    Lazy {
        locator: Locator,
        pipeline: LocatorPipeline,
        scope: SearchScope,
    },
    Bound(ElementRef),
}

/// Deferred-binding element: resolves its locator on every operation
#[derive(Clone)]
pub struct ElementHandle {
    driver: Arc<dyn Driver>,
    name: String,
    target: Target,
    wait: WaitOptions,
}

impl ElementHandle {
    /// Lazy handle for `locator` searched within `scope`
    #[must_use]
    pub fn new(
        driver: Arc<dyn Driver>,
        name: impl Into<String>,
        locator: Locator,
        scope: SearchScope,
    ) -> Self {
        Self {
            driver,
            name: name.into(),
            target: Target::Lazy {
                locator,
                pipeline: LocatorPipeline::new(),
                scope,
            },
            wait: WaitOptions::new(),
        }
    }

    /// Handle bound to an already found element; it never re-finds
    #[must_use]
    pub fn bound(driver: Arc<dyn Driver>, name: impl Into<String>, element: ElementRef) -> Self {
        Self {
            driver,
            name: name.into(),
            target: Target::Bound(element),
            wait: WaitOptions::new(),
        }
    }

    /// Replace the converter pipeline (no effect on bound handles)
    #[must_use]
    pub fn with_pipeline(mut self, pipeline: LocatorPipeline) -> Self {
        if let Target::Lazy { pipeline: p, .. } = &mut self.target {
            *p = pipeline;
        }
        self
    }

    /// Replace the polling options used by presence and visibility checks
    #[must_use]
    pub fn with_wait_options(mut self, wait: WaitOptions) -> Self {
        self.wait = wait;
        self
    }

    /// New handle with `converter` appended to the pipeline
    #[must_use]
    pub fn with_converter(&self, converter: LocatorConverter) -> Self {
        let mut handle = self.clone();
        if let Target::Lazy { pipeline, .. } = &mut handle.target {
            *pipeline = pipeline.with(converter);
        }
        handle
    }

    /// New handle with `%s` placeholders filled from `args`
    #[must_use]
    pub fn format<I, S>(&self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.with_converter(LocatorConverter::Format(
            args.into_iter().map(Into::into).collect(),
        ))
    }

    /// New handle whose comparisons ignore case
    #[must_use]
    pub fn case_insensitive(&self) -> Self {
        self.with_converter(LocatorConverter::CaseInsensitive)
    }

    /// Field name
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Driver the handle resolves against
    #[must_use]
    pub const fn driver(&self) -> &Arc<dyn Driver> {
        &self.driver
    }

    /// Polling options for presence and visibility checks
    #[must_use]
    pub const fn wait_options(&self) -> &WaitOptions {
        &self.wait
    }

    /// Declared locator, `None` for bound handles
    #[must_use]
    pub const fn locator(&self) -> Option<&Locator> {
        match &self.target {
            Target::Lazy { locator, .. } => Some(locator),
            Target::Bound(_) => None,
        }
    }

    /// Search scope, `None` for bound handles
    #[must_use]
    pub const fn scope(&self) -> Option<&SearchScope> {
        match &self.target {
            Target::Lazy { scope, .. } => Some(scope),
            Target::Bound(_) => None,
        }
    }

    /// Converter pipeline, `None` for bound handles
    #[must_use]
    pub const fn pipeline(&self) -> Option<&LocatorPipeline> {
        match &self.target {
            Target::Lazy { pipeline, .. } => Some(pipeline),
            Target::Bound(_) => None,
        }
    }

    /// Element a bound handle points at
    #[must_use]
    pub const fn bound_element(&self) -> Option<&ElementRef> {
        match &self.target {
            Target::Bound(element) => Some(element),
            Target::Lazy { .. } => None,
        }
    }

    /// Translation key for localized handles
    #[must_use]
    pub fn localization_key(&self) -> Option<&str> {
        self.pipeline().and_then(LocatorPipeline::localization_key)
    }

    /// Locator after running the pipeline
    pub fn current_locator(&self) -> PageResult<Option<Locator>> {
        match &self.target {
            Target::Lazy {
                locator, pipeline, ..
            } => pipeline.convert(locator).map(Some),
            Target::Bound(_) => Ok(None),
        }
    }

    fn find_all(&self, locator: &Locator, scope: &SearchScope) -> PageResult<Vec<ElementRef>> {
        match self.driver.find_all(scope.root_element(), locator) {
            Ok(found) => Ok(found),
            Err(DriverError::NotFound { .. }) => Ok(Vec::new()),
            Err(err) => Err(err.into()),
        }
    }

    /// Resolve to the element the next operation would use
    pub fn resolve(&self) -> PageResult<RemoteElement> {
        let (locator, pipeline, scope) = match &self.target {
            Target::Bound(element) => {
                return Ok(RemoteElement::new(self.driver.clone(), element.clone()));
            }
            Target::Lazy {
                locator,
                pipeline,
                scope,
            } => (locator, pipeline, scope),
        };
        let locator = pipeline.convert(locator)?;
        let found = self.find_all(&locator, scope)?;
        tracing::debug!(field = %self.name, %locator, %scope, matches = found.len(), "resolving element");
        if found.len() > 1 {
            tracing::warn!(
                field = %self.name,
                %locator,
                matches = found.len(),
                "locator is ambiguous, using the first match"
            );
        }
        found
            .into_iter()
            .next()
            .map(|element| RemoteElement::new(self.driver.clone(), element))
            .ok_or_else(|| PageError::ElementNotFound {
                name: self.name.clone(),
                locator: locator.to_string(),
            })
    }

    /// Re-resolve and return the element currently matched
    pub fn refresh(&self) -> PageResult<ElementRef> {
        self.resolve().map(|remote| remote.element)
    }

    fn check_present(&self) -> PageResult<bool> {
        match &self.target {
            Target::Lazy {
                locator,
                pipeline,
                scope,
            } => {
                let locator = pipeline.convert(locator)?;
                match self.find_all(&locator, scope) {
                    Ok(found) => Ok(!found.is_empty()),
                    Err(err) if err.is_absence() => Ok(false),
                    Err(err) => Err(err),
                }
            }
            Target::Bound(element) => {
                match self.driver.invoke(element, &Command::TagName) {
                    Ok(_) => Ok(true),
                    Err(DriverError::NotFound { .. } | DriverError::Stale { .. }) => Ok(false),
                    Err(err) => Err(err.into()),
                }
            }
        }
    }

    /// Whether a match appears within `timeout`; absence is `Ok(false)`
    pub fn is_present(&self, timeout: Duration) -> PageResult<bool> {
        self.is_present_with(&self.wait.with_timeout(timeout))
    }

    /// [`ElementHandle::is_present`] with the handle's own timeout
    pub fn wait_for_presence(&self) -> PageResult<bool> {
        self.is_present_with(&self.wait)
    }

    /// [`ElementHandle::is_present`] with explicit polling options
    pub fn is_present_with(&self, options: &WaitOptions) -> PageResult<bool> {
        poll_until(options, || self.check_present())
    }

    /// Whether a displayed match appears within `timeout`
    pub fn is_visible(&self, timeout: Duration) -> PageResult<bool> {
        self.is_visible_with(&self.wait.with_timeout(timeout))
    }

    /// [`ElementHandle::is_visible`] with the handle's own timeout
    pub fn wait_for_visibility(&self) -> PageResult<bool> {
        self.is_visible_with(&self.wait)
    }

    /// [`ElementHandle::is_visible`] with explicit polling options
    pub fn is_visible_with(&self, options: &WaitOptions) -> PageResult<bool> {
        poll_until(options, || match self.resolve().and_then(|e| e.is_displayed()) {
            Ok(displayed) => Ok(displayed),
            Err(err) if err.is_absence() => Ok(false),
            Err(err) => Err(err),
        })
    }

    /// Human-readable description; resolves but never fails
    #[must_use]
    pub fn describe(&self) -> String {
        match &self.target {
            Target::Bound(element) => format!("{} -> {element}", self.name),
            Target::Lazy {
                locator, pipeline, ..
            } => {
                let rendered = pipeline
                    .convert(locator)
                    .map_or_else(|_| locator.to_string(), |l| l.to_string());
                match self.refresh() {
                    Ok(element) => format!("{} ({rendered}) -> {element}", self.name),
                    Err(_) => format!("unresolved: {rendered}"),
                }
            }
        }
    }
}

impl Element for ElementHandle {
    fn execute(&self, command: Command) -> PageResult<Value> {
        let element = self.resolve()?;
        tracing::trace!(field = %self.name, command = command.name(), element = %element.element, "forwarding");
        element.execute(command)
    }
}

impl fmt::Debug for ElementHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ElementHandle")
            .field("name", &self.name)
            .field("target", &self.target)
            .finish_non_exhaustive()
    }
}

impl fmt::Display for ElementHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.target {
            Target::Lazy { locator, .. } => write!(f, "{} ({locator})", self.name),
            Target::Bound(element) => write!(f, "{} [{element}]", self.name),
        }
    }
}
