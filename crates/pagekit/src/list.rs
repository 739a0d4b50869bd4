//! Lazy element lists.
//!
//! Every access re-runs the base locator and materializes a fresh item
//! sequence. With [`ListBinding::Snapshot`] each item is bound to the element
//! found in that pass. With [`ListBinding::Indexed`] each item is a lazy handle
//! for "the Nth match", so items follow positions in the live tree rather than
//! element identity.

use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

use crate::converter::{LocatorConverter, LocatorPipeline};
use crate::driver::{Driver, DriverError, ElementRef};
use crate::element::{Element, ElementHandle};
use crate::locator::Locator;
use crate::page_object::PageContext;
use crate::result::{PageError, PageResult};
use crate::scope::SearchScope;

/// How list items are bound to elements
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum ListBinding {
    /// Items are bound to the elements found when the list was read
    #[default]
    Snapshot,
    /// Items re-resolve by position on every operation
    Indexed,
}

/// Something a list can be made of
pub trait ListItem: Sized {
    /// Build the item around one list position.
    ///
    /// `ctx` is the context the list was declared in; components nest inside
    /// it so they keep its settings and outer fields.
    fn from_handle(ctx: &PageContext, handle: ElementHandle) -> PageResult<Self>;
}

impl ListItem for ElementHandle {
    fn from_handle(_ctx: &PageContext, handle: ElementHandle) -> PageResult<Self> {
        Ok(handle)
    }
}

/// Deferred-binding list of elements (or components) matching a locator
pub struct ElementList<T = ElementHandle> {
    driver: Arc<dyn Driver>,
    name: String,
    locator: Locator,
    pipeline: LocatorPipeline,
    scope: SearchScope,
    binding: ListBinding,
    context: PageContext,
    item: PhantomData<fn() -> T>,
}

impl<T: ListItem> ElementList<T> {
    /// Create a list; indexed lists need an indexable locator strategy
    pub fn new(
        driver: Arc<dyn Driver>,
        name: impl Into<String>,
        locator: Locator,
        scope: SearchScope,
        binding: ListBinding,
    ) -> PageResult<Self> {
        let name = name.into();
        if binding == ListBinding::Indexed && !locator.strategy().supports_index() {
            return Err(PageError::UnsupportedOperation {
                message: format!(
                    "indexed list '{name}' needs an indexable locator, {locator} is not"
                ),
            });
        }
        Ok(Self {
            context: PageContext::new(driver.clone()),
            driver,
            name,
            locator,
            pipeline: LocatorPipeline::new(),
            scope,
            binding,
            item: PhantomData,
        })
    }

    /// Replace the base converter pipeline
    #[must_use]
    pub fn with_pipeline(mut self, pipeline: LocatorPipeline) -> Self {
        self.pipeline = pipeline;
        self
    }

    /// Build items inside `context` instead of a fresh root context
    #[must_use]
    pub fn with_context(mut self, context: PageContext) -> Self {
        self.context = context;
        self
    }

    /// New list with `%s` placeholders filled from `args`
    #[must_use]
    pub fn format<I, S>(&self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut list = self.clone();
        list.pipeline = self.pipeline.with(LocatorConverter::Format(
            args.into_iter().map(Into::into).collect(),
        ));
        list
    }

    /// Field name
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Declared base locator
    #[must_use]
    pub const fn locator(&self) -> &Locator {
        &self.locator
    }

    /// Search scope
    #[must_use]
    pub const fn scope(&self) -> &SearchScope {
        &self.scope
    }

    /// Binding policy
    #[must_use]
    pub const fn binding(&self) -> ListBinding {
        self.binding
    }

    /// Context items are built in
    #[must_use]
    pub const fn context(&self) -> &PageContext {
        &self.context
    }

    fn find(&self) -> PageResult<Vec<ElementRef>> {
        let locator = self.pipeline.convert(&self.locator)?;
        let found = match self.driver.find_all(self.scope.root_element(), &locator) {
            Ok(found) => found,
            Err(DriverError::NotFound { .. }) => Vec::new(),
            Err(err) => return Err(err.into()),
        };
        tracing::debug!(list = %self.name, %locator, scope = %self.scope, matches = found.len(), "resolving list");
        Ok(found)
    }

    /// Fresh item handles for the current matches
    pub fn handles(&self) -> PageResult<Vec<ElementHandle>> {
        let found = self.find()?;
        let wait = self.context.settings().wait_options();
        let handles = found
            .into_iter()
            .enumerate()
            .map(|(i, element)| {
                let name = format!("{}[{i}]", self.name);
                let handle = match self.binding {
                    ListBinding::Snapshot => {
                        ElementHandle::bound(self.driver.clone(), name, element)
                    }
                    ListBinding::Indexed => ElementHandle::new(
                        self.driver.clone(),
                        name,
                        self.locator.clone(),
                        self.scope.clone(),
                    )
                    .with_pipeline(self.pipeline.with(LocatorConverter::Index(i))),
                };
                handle.with_wait_options(wait)
            })
            .collect();
        Ok(handles)
    }

    /// Fresh items for the current matches
    pub fn items(&self) -> PageResult<Vec<T>> {
        self.handles()?
            .into_iter()
            .map(|handle| T::from_handle(&self.context, handle))
            .collect()
    }

    /// Number of current matches
    pub fn len(&self) -> PageResult<usize> {
        Ok(self.find()?.len())
    }

    /// Whether nothing currently matches
    pub fn is_empty(&self) -> PageResult<bool> {
        Ok(self.len()? == 0)
    }

    /// Item at `index` among the current matches
    pub fn get(&self, index: usize) -> PageResult<T> {
        let mut handles = self.handles()?;
        let len = handles.len();
        if index >= len {
            return Err(PageError::IndexOutOfBounds {
                name: self.name.clone(),
                index,
                len,
            });
        }
        T::from_handle(&self.context, handles.swap_remove(index))
    }

    /// First item, `None` when nothing matches
    pub fn first(&self) -> PageResult<Option<T>> {
        self.handles()?
            .into_iter()
            .next()
            .map(|handle| T::from_handle(&self.context, handle))
            .transpose()
    }
}

impl ElementList<ElementHandle> {
    /// Text of every current match
    pub fn texts(&self) -> PageResult<Vec<String>> {
        self.handles()?.iter().map(Element::text).collect()
    }
}

impl<T> Clone for ElementList<T> {
    fn clone(&self) -> Self {
        Self {
            driver: self.driver.clone(),
            name: self.name.clone(),
            locator: self.locator.clone(),
            pipeline: self.pipeline.clone(),
            scope: self.scope.clone(),
            binding: self.binding,
            context: self.context.clone(),
            item: PhantomData,
        }
    }
}

impl<T> fmt::Debug for ElementList<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ElementList")
            .field("name", &self.name)
            .field("locator", &self.locator)
            .field("pipeline", &self.pipeline)
            .field("scope", &self.scope)
            .field("binding", &self.binding)
            .finish_non_exhaustive()
    }
}
