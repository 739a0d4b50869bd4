//! Locator expressions: a strategy tag plus a selector string.
//!
//! Locators are immutable. Templated selectors carry `%s` placeholders that
//! the converter pipeline fills in before the locator reaches the driver.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::result::{PageError, PageResult};

/// Placeholder filled by positional format arguments
pub const PLACEHOLDER: &str = "%s";

/// Strategy used by the driver to evaluate a selector
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Strategy {
    /// Element id attribute
    Id,
    /// Element name attribute
    Name,
    /// CSS class name
    ClassName,
    /// Tag name
    TagName,
    /// CSS selector
    Css,
    /// XPath query
    XPath,
    /// Exact link text
    LinkText,
    /// Partial link text
    PartialLinkText,
    /// Mobile accessibility identifier
    AccessibilityId,
    /// Android UiAutomator expression
    AndroidUiAutomator,
    /// iOS NSPredicate string
    IosPredicate,
    /// iOS class chain query
    IosClassChain,
}

impl Strategy {
    /// All strategies, in declaration order
    pub const ALL: [Self; 12] = [
        Self::Id,
        Self::Name,
        Self::ClassName,
        Self::TagName,
        Self::Css,
        Self::XPath,
        Self::LinkText,
        Self::PartialLinkText,
        Self::AccessibilityId,
        Self::AndroidUiAutomator,
        Self::IosPredicate,
        Self::IosClassChain,
    ];

    /// Key used in `By.<key>: ...` renderings and `#[find(<key> = ...)]`
    #[must_use]
    pub const fn key(self) -> &'static str {
        match self {
            Self::Id => "id",
            Self::Name => "name",
            Self::ClassName => "class_name",
            Self::TagName => "tag_name",
            Self::Css => "css",
            Self::XPath => "xpath",
            Self::LinkText => "link_text",
            Self::PartialLinkText => "partial_link_text",
            Self::AccessibilityId => "accessibility_id",
            Self::AndroidUiAutomator => "android_uiautomator",
            Self::IosPredicate => "ios_predicate",
            Self::IosClassChain => "ios_class_chain",
        }
    }

    /// Look a strategy up by its key
    #[must_use]
    pub fn from_key(key: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|s| s.key() == key)
    }

    /// Whether the strategy can select the Nth match through the expression itself
    #[must_use]
    pub const fn supports_index(self) -> bool {
        matches!(self, Self::XPath)
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// A strategy-tagged selector identifying zero or more UI elements
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Locator {
    strategy: Strategy,
    selector: String,
}

impl Locator {
    /// Create a locator
    #[must_use]
    pub fn new(strategy: Strategy, selector: impl Into<String>) -> Self {
        Self {
            strategy,
            selector: selector.into(),
        }
    }

    /// Locate by id attribute
    #[must_use]
    pub fn id(selector: impl Into<String>) -> Self {
        Self::new(Strategy::Id, selector)
    }

    /// Locate by name attribute
    #[must_use]
    pub fn name(selector: impl Into<String>) -> Self {
        Self::new(Strategy::Name, selector)
    }

    /// Locate by CSS selector
    #[must_use]
    pub fn css(selector: impl Into<String>) -> Self {
        Self::new(Strategy::Css, selector)
    }

    /// Locate by XPath
    #[must_use]
    pub fn xpath(selector: impl Into<String>) -> Self {
        Self::new(Strategy::XPath, selector)
    }

    /// Locate by mobile accessibility id
    #[must_use]
    pub fn accessibility_id(selector: impl Into<String>) -> Self {
        Self::new(Strategy::AccessibilityId, selector)
    }

    /// Get the strategy
    #[must_use]
    pub const fn strategy(&self) -> Strategy {
        self.strategy
    }

    /// Get the selector text
    #[must_use]
    pub fn selector(&self) -> &str {
        &self.selector
    }

    /// Same strategy, different selector text
    #[must_use]
    pub fn with_selector(&self, selector: impl Into<String>) -> Self {
        Self::new(self.strategy, selector)
    }

    /// Number of unfilled `%s` placeholders
    #[must_use]
    pub fn placeholder_count(&self) -> usize {
        self.selector.matches(PLACEHOLDER).count()
    }
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "By.{}: {}", self.strategy, self.selector)
    }
}

impl FromStr for Locator {
    type Err = PageError;

    /// Parse the `By.<strategy>: <selector>` rendering
    fn from_str(s: &str) -> PageResult<Self> {
        let invalid = || PageError::InvalidLocator {
            input: s.to_string(),
        };
        let rest = s.trim().strip_prefix("By.").ok_or_else(invalid)?;
        let (key, selector) = rest.split_once(':').ok_or_else(invalid)?;
        let strategy = Strategy::from_key(key.trim()).ok_or_else(invalid)?;
        Ok(Self::new(strategy, selector.trim_start()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    mod strategy_tests {
        use super::*;

        #[test]
        fn test_key_round_trip() {
            for strategy in Strategy::ALL {
                assert_eq!(Strategy::from_key(strategy.key()), Some(strategy));
            }
            assert_eq!(Strategy::from_key("sizzle"), None);
        }

        #[test]
        fn test_only_xpath_is_indexable() {
            assert!(Strategy::XPath.supports_index());
            assert!(!Strategy::Css.supports_index());
            assert!(!Strategy::AccessibilityId.supports_index());
        }
    }

    mod locator_tests {
        use super::*;

        #[test]
        fn test_display() {
            let locator = Locator::xpath("//button[@id='ok']");
            assert_eq!(locator.to_string(), "By.xpath: //button[@id='ok']");
        }

        #[test]
        fn test_parse_rendering() {
            let locator: Locator = "By.css: div.row > span".parse().unwrap();
            assert_eq!(locator.strategy(), Strategy::Css);
            assert_eq!(locator.selector(), "div.row > span");
        }

        #[test]
        fn test_parse_keeps_colons_in_selector() {
            let locator: Locator = "By.xpath: //a[@href='https://x']".parse().unwrap();
            assert_eq!(locator.selector(), "//a[@href='https://x']");
        }

        #[test]
        fn test_parse_rejects_garbage() {
            assert!(matches!(
                "xpath=//a".parse::<Locator>(),
                Err(PageError::InvalidLocator { input }) if input == "xpath=//a"
            ));
            assert!(matches!(
                "By.sizzle: a".parse::<Locator>(),
                Err(PageError::InvalidLocator { .. })
            ));
            assert!(matches!(
                "By.css div".parse::<Locator>(),
                Err(PageError::InvalidLocator { .. })
            ));
        }

        #[test]
        fn test_placeholder_count() {
            let locator = Locator::xpath("//tr[%s]/td[%s]");
            assert_eq!(locator.placeholder_count(), 2);
            assert_eq!(Locator::id("plain").placeholder_count(), 0);
        }
    }
}
