//! Driver seam: the only surface pagekit consumes from the automation client.
//!
//! A driver finds elements within a scope and invokes commands on found
//! elements. Transport, sessions and capabilities live behind this trait.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

use crate::locator::Locator;

/// Opaque reference to an element the driver has found
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ElementRef(String);

impl ElementRef {
    /// Wrap a driver-issued element id
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// The driver-issued id
    #[must_use]
    pub fn id(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ElementRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Element bounds reported by the driver
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Rect {
    /// X coordinate
    pub x: f64,
    /// Y coordinate
    pub y: f64,
    /// Width
    pub width: f64,
    /// Height
    pub height: f64,
}

/// Command invoked on a found element
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "command", content = "arg", rename_all = "snake_case")]
pub enum Command {
    /// Click the element
    Click,
    /// Double click the element
    DoubleClick,
    /// Type text into the element
    SendKeys(String),
    /// Clear an editable element
    Clear,
    /// Submit the enclosing form
    Submit,
    /// Visible text
    Text,
    /// Tag name
    TagName,
    /// Attribute value
    Attribute(String),
    /// DOM property value
    Property(String),
    /// Computed CSS value
    CssValue(String),
    /// Displayed state
    IsDisplayed,
    /// Enabled state
    IsEnabled,
    /// Selected state
    IsSelected,
    /// Element bounds
    Rect,
}

impl Command {
    /// Operation name, as reported in diagnostics
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Click => "click",
            Self::DoubleClick => "double_click",
            Self::SendKeys(_) => "send_keys",
            Self::Clear => "clear",
            Self::Submit => "submit",
            Self::Text => "text",
            Self::TagName => "tag_name",
            Self::Attribute(_) => "attribute",
            Self::Property(_) => "property",
            Self::CssValue(_) => "css_value",
            Self::IsDisplayed => "is_displayed",
            Self::IsEnabled => "is_enabled",
            Self::IsSelected => "is_selected",
            Self::Rect => "rect",
        }
    }
}

/// Errors raised by the driver
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DriverError {
    /// The driver reports the element does not exist
    #[error("No such element: {message}")]
    NotFound {
        /// Driver message
        message: String,
    },

    /// The element reference is detached from the UI tree
    #[error("Stale element reference: {message}")]
    Stale {
        /// Driver message
        message: String,
    },

    /// The driver timed out
    #[error("Driver timed out after {ms}ms")]
    Timeout {
        /// Timeout in milliseconds
        ms: u64,
    },

    /// Any other driver failure
    #[error("Driver error: {0}")]
    Other(String),
}

/// Automation driver consumed by handles
///
/// Implementations wrap a WebDriver/Appium session. `find_all` returns an
/// empty vector, never an error, when nothing matches.
pub trait Driver: Send + Sync {
    /// Find every element matching `locator` below `scope` (`None` = whole session)
    fn find_all(
        &self,
        scope: Option<&ElementRef>,
        locator: &Locator,
    ) -> Result<Vec<ElementRef>, DriverError>;

    /// Invoke a command on a found element
    fn invoke(
        &self,
        element: &ElementRef,
        command: &Command,
    ) -> Result<serde_json::Value, DriverError>;
}
