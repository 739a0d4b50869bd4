//! Page Object Model support.
//!
//! A page object is a struct of lazily resolved fields. Each field is
//! described by a [`FieldDecl`] and built through a [`PageContext`], which
//! owns the driver, the search scope of the object being built, and the frames
//! of its containers so that `depends_on` can name fields declared further out.
//!
//! Most page objects derive [`PageObject`] (with the `derive` feature):
//!
//! ```ignore
//! use pagekit::{ElementHandle, ElementList, PageObject};
//!
//! #[derive(PageObject)]
//! struct SearchPage {
//!     #[find(id = "search")]
//!     form: ElementHandle,
//!     #[find(name = "q", depends_on = "form")]
//!     query: ElementHandle,
//!     #[find(xpath = "//li[@class='result']", indexed)]
//!     results: ElementList,
//! }
//!
//! let page = SearchPage::open(driver)?;
//! page.query.send_keys("rust")?;
//! ```

use std::any::type_name;
use std::sync::Arc;

use crate::config::Settings;
use crate::device::DeviceDescriptor;
use crate::driver::Driver;
use crate::element::ElementHandle;
use crate::list::{ElementList, ListItem};
use crate::result::{PageError, PageResult};
use crate::scope::{FieldDecl, ScopeResolver, SearchScope};
use crate::variant::{self, ConstructArgs, VariantRegistry};

/// Trait for page objects representing a page or component in the UI.
pub trait PageObject: Sized {
    /// Build the object inside `ctx`
    fn build(ctx: &mut PageContext) -> PageResult<Self>;

    /// Declarations of the object's fields
    fn field_decls() -> Vec<FieldDecl> {
        Vec::new()
    }

    /// Build at the session root with default settings
    fn open(driver: Arc<dyn Driver>) -> PageResult<Self> {
        PageContext::new(driver).build()
    }

    /// Page name for logging
    fn page_name() -> &'static str {
        type_name::<Self>()
    }
}

/// A value that can be built from a field declaration
pub trait Field: Sized {
    /// Build the field inside `ctx`
    fn from_decl(ctx: &mut PageContext, decl: &FieldDecl) -> PageResult<Self>;
}

impl Field for ElementHandle {
    fn from_decl(ctx: &mut PageContext, decl: &FieldDecl) -> PageResult<Self> {
        ctx.element(decl)
    }
}

impl<T: ListItem> Field for ElementList<T> {
    fn from_decl(ctx: &mut PageContext, decl: &FieldDecl) -> PageResult<Self> {
        ctx.list(decl)
    }
}

/// Everything needed to build page objects against one session
#[derive(Clone)]
pub struct PageContext {
    driver: Arc<dyn Driver>,
    resolver: ScopeResolver,
    settings: Settings,
}

impl PageContext {
    /// Context at the session root with default settings
    #[must_use]
    pub fn new(driver: Arc<dyn Driver>) -> Self {
        Self::with_settings(driver, Settings::default())
    }

    /// Context at the session root
    #[must_use]
    pub fn with_settings(driver: Arc<dyn Driver>, settings: Settings) -> Self {
        Self {
            driver,
            resolver: ScopeResolver::new(SearchScope::Root),
            settings,
        }
    }

    /// Driver shared by every field
    #[must_use]
    pub const fn driver(&self) -> &Arc<dyn Driver> {
        &self.driver
    }

    /// Settings
    #[must_use]
    pub const fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Device under test
    #[must_use]
    pub const fn device(&self) -> &DeviceDescriptor {
        &self.settings.device
    }

    /// Root scope of the object being built
    #[must_use]
    pub const fn scope(&self) -> &SearchScope {
        self.resolver.root()
    }

    /// Element field built so far, innermost object first
    #[must_use]
    pub fn lookup(&self, name: &str) -> Option<&ElementHandle> {
        self.resolver.lookup(name)
    }

    /// Context for a nested object rooted at `root`
    #[must_use]
    pub fn nested(&self, root: SearchScope) -> Self {
        Self {
            driver: self.driver.clone(),
            resolver: self.resolver.nested(root),
            settings: self.settings.clone(),
        }
    }

    /// Context for a nested object searching inside `handle`'s current element
    pub fn within(&self, handle: &ElementHandle) -> PageResult<Self> {
        let element = handle.refresh()?;
        Ok(self.nested(SearchScope::element(handle.name(), element)))
    }

    /// Build a lazy element field and make it available to `depends_on`
    pub fn element(&mut self, decl: &FieldDecl) -> PageResult<ElementHandle> {
        let scope = self.resolver.resolve(decl)?;
        let handle = ElementHandle::new(self.driver.clone(), &decl.name, decl.locator.clone(), scope)
            .with_pipeline(decl.pipeline())
            .with_wait_options(self.settings.wait_options());
        tracing::debug!(field = %decl.name, locator = %decl.locator, scope = %self.scope(), "element field built");
        self.resolver.register(&decl.name, handle.clone());
        Ok(handle)
    }

    /// Build a lazy list field
    pub fn list<T: ListItem>(&mut self, decl: &FieldDecl) -> PageResult<ElementList<T>> {
        let scope = self.resolver.resolve(decl)?;
        let list = ElementList::new(
            self.driver.clone(),
            &decl.name,
            decl.locator.clone(),
            scope,
            decl.binding,
        )?
        .with_pipeline(decl.pipeline())
        .with_context(self.clone());
        tracing::debug!(field = %decl.name, locator = %decl.locator, binding = ?decl.binding, "list field built");
        Ok(list)
    }

    /// Build a nested component rooted at the element `decl` resolves to now
    pub fn component<C: PageObject>(&mut self, decl: &FieldDecl) -> PageResult<C> {
        let handle = self.element(decl)?;
        let mut inner = self.within(&handle)?;
        tracing::debug!(field = %decl.name, component = C::page_name(), scope = %inner.scope(), "building component");
        C::build(&mut inner)
    }

    /// Build any field type
    pub fn field<F: Field>(&mut self, decl: &FieldDecl) -> PageResult<F> {
        F::from_decl(self, decl)
    }

    /// Build a page object in this context
    pub fn build<P: PageObject>(&mut self) -> PageResult<P> {
        tracing::debug!(page = P::page_name(), scope = %self.scope(), "building page");
        P::build(self)
    }

    /// Instantiate the variant of `B` matching this context's device
    pub fn variant<B: ?Sized + 'static>(
        &self,
        registry: &VariantRegistry,
        args: &ConstructArgs,
    ) -> PageResult<Box<B>> {
        registry.instantiate::<B>(self.device(), args)
    }

    /// [`PageContext::variant`] against the process-wide registry
    pub fn global_variant<B: ?Sized + 'static>(&self, args: &ConstructArgs) -> PageResult<Box<B>> {
        let registry = variant::global().ok_or_else(|| PageError::UnsupportedOperation {
            message: "no global variant registry is installed".to_string(),
        })?;
        self.variant::<B>(registry, args)
    }
}

impl std::fmt::Debug for PageContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PageContext")
            .field("resolver", &self.resolver)
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::DeviceType;
    use crate::driver::ElementRef;
    use crate::element::Element;
    use crate::locator::Locator;
    use crate::mock::{MockDriver, MockElement};
    use crate::scope::plan_build_order;
    use crate::variant::{Candidate, ParamKind, VariantDescriptor};
    use std::time::Duration;

    fn search_driver() -> Arc<MockDriver> {
        Arc::new(
            MockDriver::new()
                .with(MockElement::new("outer-q", "input").matching(&Locator::name("q")))
                .with(MockElement::new("search-1", "form").matching(&Locator::id("search")))
                .with(
                    MockElement::new("inner-q", "input")
                        .child_of("search-1")
                        .matching(&Locator::name("q")),
                ),
        )
    }

    struct SearchForm {
        form: ElementHandle,
        query: ElementHandle,
    }

    impl PageObject for SearchForm {
        fn field_decls() -> Vec<FieldDecl> {
            vec![
                FieldDecl::new("query", Locator::name("q")).depends_on("form"),
                FieldDecl::new("form", Locator::id("search")),
            ]
        }

        fn build(ctx: &mut PageContext) -> PageResult<Self> {
            let decls = Self::field_decls();
            let mut form = None;
            let mut query = None;
            for i in plan_build_order(&decls)? {
                match decls[i].name.as_str() {
                    "form" => form = Some(ctx.field(&decls[i])?),
                    _ => query = Some(ctx.field(&decls[i])?),
                }
            }
            Ok(Self {
                form: form.unwrap(),
                query: query.unwrap(),
            })
        }
    }

    mod scope_tests {
        use super::*;

        #[test]
        fn test_depends_on_searches_inside_container() {
            let driver = search_driver();
            let page = SearchForm::open(driver.clone()).unwrap();
            assert_eq!(page.query.refresh().unwrap(), ElementRef::new("inner-q"));
            assert_eq!(
                page.query.scope(),
                Some(&SearchScope::element("form", ElementRef::new("search-1")))
            );
            assert!(driver.was_called("find:By.name: q in search-1"));
            assert_eq!(page.form.refresh().unwrap(), ElementRef::new("search-1"));
        }

        #[test]
        fn test_missing_container_fails_build() {
            let driver = Arc::new(
                MockDriver::new().with(MockElement::new("q", "input").matching(&Locator::name("q"))),
            );
            let err = SearchForm::open(driver).err().unwrap();
            assert!(matches!(err, PageError::MissingContext { .. }));
        }

        #[test]
        fn test_scope_is_captured_at_build_time() {
            let driver = search_driver();
            let page = SearchForm::open(driver.clone()).unwrap();
            driver.remove("search-1");
            driver.add(
                MockElement::new("search-2", "form").matching(&Locator::id("search")),
            );
            let err = page.query.text().unwrap_err();
            assert!(err.is_absence());
        }
    }

    struct Header {
        title: ElementHandle,
    }

    impl PageObject for Header {
        fn build(ctx: &mut PageContext) -> PageResult<Self> {
            Ok(Self {
                title: ctx.element(&FieldDecl::new("title", Locator::css("h1")))?,
            })
        }
    }

    impl ListItem for Header {
        fn from_handle(ctx: &PageContext, handle: ElementHandle) -> PageResult<Self> {
            Self::build(&mut ctx.within(&handle)?)
        }
    }

    struct Article {
        header: Header,
    }

    impl PageObject for Article {
        fn build(ctx: &mut PageContext) -> PageResult<Self> {
            Ok(Self {
                header: ctx.component(&FieldDecl::new("header", Locator::css("header")))?,
            })
        }
    }

    fn article_driver() -> Arc<MockDriver> {
        Arc::new(
            MockDriver::new()
                .with(MockElement::new("banner", "h1").matching(&Locator::css("h1")).with_text("Site"))
                .with(MockElement::new("head", "header").matching(&Locator::css("header")))
                .with(
                    MockElement::new("title", "h1")
                        .child_of("head")
                        .matching(&Locator::css("h1"))
                        .with_text("Article"),
                ),
        )
    }

    mod component_tests {
        use super::*;

        #[test]
        fn test_component_is_rooted_at_its_element() {
            let article: Article = PageContext::new(article_driver()).build().unwrap();
            assert_eq!(article.header.title.text().unwrap(), "Article");
        }

        #[test]
        fn test_component_sees_outer_fields() {
            let mut ctx = PageContext::new(article_driver());
            let _ = ctx.element(&FieldDecl::new("banner", Locator::css("h1"))).unwrap();
            let header = ctx.element(&FieldDecl::new("header", Locator::css("header"))).unwrap();
            let mut inner = ctx.within(&header).unwrap();
            assert!(inner.lookup("banner").is_some());
            let title = inner
                .element(&FieldDecl::new("title", Locator::css("h1")))
                .unwrap();
            assert_eq!(title.text().unwrap(), "Article");
        }

        #[test]
        fn test_list_of_components() {
            let driver = Arc::new(MockDriver::new());
            for i in 0..3 {
                let card = format!("card-{i}");
                driver.add(MockElement::new(card.clone(), "div").matching(&Locator::xpath("//div[@class='card']")));
                driver.add(
                    MockElement::new(format!("t-{i}"), "h1")
                        .child_of(card)
                        .matching(&Locator::css("h1"))
                        .with_text(format!("Card {i}")),
                );
            }
            let mut ctx = PageContext::new(driver);
            let cards: ElementList<Header> = ctx
                .field(&FieldDecl::new("cards", Locator::xpath("//div[@class='card']")).indexed())
                .unwrap();
            let titles: Vec<String> = cards
                .items()
                .unwrap()
                .iter()
                .map(|h| h.title.text().unwrap())
                .collect();
            assert_eq!(titles, vec!["Card 0", "Card 1", "Card 2"]);
        }

        struct Tile {
            device: DeviceType,
            sees_banner: bool,
            title: ElementHandle,
        }

        impl PageObject for Tile {
            fn build(ctx: &mut PageContext) -> PageResult<Self> {
                Ok(Self {
                    device: ctx.device().device_type,
                    sees_banner: ctx.lookup("banner").is_some(),
                    title: ctx.element(&FieldDecl::new("title", Locator::css("h1")))?,
                })
            }
        }

        impl ListItem for Tile {
            fn from_handle(ctx: &PageContext, handle: ElementHandle) -> PageResult<Self> {
                Self::build(&mut ctx.within(&handle)?)
            }
        }

        #[test]
        fn test_list_items_keep_page_context() {
            let driver = article_driver();
            let settings = Settings::new()
                .with_device(DeviceDescriptor::new(DeviceType::AndroidPhone, "13"))
                .with_wait_timeout(Duration::from_millis(40));
            let mut ctx = PageContext::with_settings(driver, settings.clone());
            let _ = ctx.element(&FieldDecl::new("banner", Locator::css("h1"))).unwrap();
            let tiles: ElementList<Tile> = ctx
                .field(&FieldDecl::new("tiles", Locator::css("header")))
                .unwrap();
            let tile = tiles.get(0).unwrap();
            assert_eq!(tile.device, DeviceType::AndroidPhone);
            assert!(tile.sees_banner);
            assert_eq!(tile.title.text().unwrap(), "Article");
            assert_eq!(tile.title.wait_options(), &settings.wait_options());
        }

        #[test]
        fn test_absent_component_fails_build() {
            let driver = Arc::new(MockDriver::new());
            let err = PageContext::new(driver).build::<Article>().err().unwrap();
            assert!(matches!(err, PageError::ElementNotFound { .. }));
        }
    }

    mod settings_tests {
        use super::*;

        #[test]
        fn test_fields_use_settings_wait_options() {
            let settings = Settings::new().with_wait_timeout(Duration::ZERO);
            let driver = Arc::new(MockDriver::new());
            let mut ctx = PageContext::with_settings(driver.clone(), settings.clone());
            let ghost = ctx.element(&FieldDecl::new("ghost", Locator::id("ghost"))).unwrap();
            assert_eq!(ghost.wait_options(), &settings.wait_options());
            assert!(!ghost.wait_for_presence().unwrap());
            assert_eq!(driver.find_count(), 1);
        }

        #[test]
        fn test_list_items_use_settings_wait_options() {
            let settings = Settings::new().with_wait_timeout(Duration::from_millis(5));
            let mut ctx = PageContext::with_settings(search_driver(), settings.clone());
            let inputs: ElementList = ctx
                .list(&FieldDecl::new("inputs", Locator::name("q")))
                .unwrap();
            assert_eq!(inputs.context().settings(), &settings);
            for item in inputs.items().unwrap() {
                assert_eq!(item.wait_options(), &settings.wait_options());
            }
        }

        #[test]
        fn test_default_context_uses_default_wait() {
            let mut ctx = PageContext::new(search_driver());
            let form = ctx.element(&FieldDecl::new("form", Locator::id("search"))).unwrap();
            assert_eq!(form.wait_options(), &crate::wait::WaitOptions::default());
        }
    }

    mod variant_tests {
        use super::*;

        trait Toolbar {
            fn kind(&self) -> &'static str;
        }

        struct Compact;
        impl Toolbar for Compact {
            fn kind(&self) -> &'static str {
                "compact"
            }
        }

        struct Wide;
        impl Toolbar for Wide {
            fn kind(&self) -> &'static str {
                "wide"
            }
        }

        #[test]
        fn test_variant_follows_context_device() {
            let registry = VariantRegistry::new()
                .with(
                    Candidate::<dyn Toolbar>::new(VariantDescriptor::new("Compact", "Toolbar", DeviceType::AndroidPhone))
                        .constructor([ParamKind::Driver], |_| Ok(Box::new(Compact) as Box<dyn Toolbar>)),
                )
                .with(
                    Candidate::<dyn Toolbar>::new(VariantDescriptor::new("Wide", "Toolbar", DeviceType::Desktop))
                        .constructor([ParamKind::Driver], |_| Ok(Box::new(Wide) as Box<dyn Toolbar>)),
                );
            let driver: Arc<dyn Driver> = Arc::new(MockDriver::new());
            let settings = Settings::new().with_device(DeviceDescriptor::new(DeviceType::AndroidTablet, "12"));
            let ctx = PageContext::with_settings(driver.clone(), settings);
            let args = ConstructArgs::new().arg(driver);
            let toolbar = ctx.variant::<dyn Toolbar>(&registry, &args).unwrap();
            assert_eq!(toolbar.kind(), "compact");
        }
    }
}
