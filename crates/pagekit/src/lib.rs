//! pagekit: lazy page objects over WebDriver-style automation drivers
//!
//! Page objects declare their elements once; every operation on a field
//! re-resolves it against the live UI tree, so tests never hold a dead
//! element reference.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────┐   ┌────────────────┐   ┌──────────────┐   ┌──────────┐
//! │ #[find(...)] │──►│ ScopeResolver  │──►│ ElementHandle│──►│  Driver  │
//! │ FieldDecl    │   │ LocatorPipeline│   │ ElementList  │   │ (trait)  │
//! └──────────────┘   └────────────────┘   └──────────────┘   └──────────┘
//!                          VariantRegistry ──► device-specific pages
//! ```
//!
//! - [`LocatorPipeline`] rewrites a declared [`Locator`]: `%s` substitution,
//!   position injection, case folding and localization markers.
//! - [`ScopeResolver`] captures the search root of `depends_on` fields when a
//!   page is built.
//! - [`ElementHandle`] and [`ElementList`] resolve on every call and forward
//!   to the [`Driver`].
//! - [`VariantRegistry`] picks the implementation of a page trait matching
//!   the [`DeviceDescriptor`].

#![warn(missing_docs)]
#![cfg_attr(test, allow(clippy::unwrap_used, clippy::expect_used, clippy::panic))]

mod config;
mod converter;
mod device;
mod driver;
mod element;
mod list;
mod locator;
pub mod mock;
mod page_object;
mod result;
mod scope;
mod tracing_support;
mod variant;
mod wait;

pub use config::{Settings, ENV_DEVICE, ENV_OS_VERSION};
pub use converter::{Converted, LocatorConverter, LocatorPipeline};
pub use device::{major_version, DeviceDescriptor, DeviceType, OsFamily, DEFAULT_MAJOR_VERSION};
pub use driver::{Command, Driver, DriverError, ElementRef, Rect};
pub use element::{Element, ElementHandle, RemoteElement};
pub use list::{ElementList, ListBinding, ListItem};
pub use locator::{Locator, Strategy, PLACEHOLDER};
pub use page_object::{Field, PageContext, PageObject};
pub use result::{PageError, PageResult};
pub use scope::{plan_build_order, FieldDecl, ScopeResolver, SearchScope};
pub use tracing_support::{init_from_settings, init_tracing, LogFormat, DEFAULT_FILTER};
pub use variant::{
    global as global_registry, install_global, select_variant, ArgValue, Candidate, ConstructArgs,
    Constructor, MatchTier, ParamKind, VariantDescriptor, VariantRegistry,
};
pub use wait::{poll_until, WaitOptions, DEFAULT_POLL_INTERVAL_MS, DEFAULT_WAIT_TIMEOUT_MS};

// Re-export the derive macro when the `derive` feature is enabled
#[cfg(feature = "derive")]
pub use pagekit_derive::PageObject;

/// Prelude for convenient imports
pub mod prelude {
    pub use super::{
        Driver, DriverError, Element, ElementHandle, ElementList, ElementRef, Field, ListBinding,
        ListItem, Locator, PageContext, PageError, PageObject, PageResult, SearchScope, Settings,
    };
}
