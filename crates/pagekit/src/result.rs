//! Result and error types for pagekit.

use crate::driver::DriverError;
use thiserror::Error;

/// Result type for pagekit operations
pub type PageResult<T> = Result<T, PageError>;

/// Errors that can occur while building or driving page objects
#[derive(Debug, Error)]
pub enum PageError {
    /// No element matched the locator at resolution time
    #[error("Element '{name}' not found using {locator}")]
    ElementNotFound {
        /// Field name of the handle
        name: String,
        /// Rendered locator after conversion
        locator: String,
    },

    /// A converter cannot be applied to the locator strategy
    #[error("Locator {locator} does not support {converter} conversion")]
    UnsupportedLocator {
        /// Rendered locator
        locator: String,
        /// Converter that was rejected
        converter: &'static str,
    },

    /// Locator text is not in `By.<strategy>: <selector>` form
    #[error("Invalid locator '{input}'")]
    InvalidLocator {
        /// Rejected text
        input: String,
    },

    /// Operation is not valid for this declaration
    #[error("Unsupported operation: {message}")]
    UnsupportedOperation {
        /// Error message
        message: String,
    },

    /// A `depends_on` declaration could not be satisfied
    #[error("Field '{field}' depends on '{dependency}': {reason}")]
    MissingContext {
        /// Field declaring the dependency
        field: String,
        /// Name of the field it depends on
        dependency: String,
        /// Why the context is unavailable
        reason: String,
    },

    /// `depends_on` declarations form a cycle
    #[error("Cyclic search context: {}", chain.join(" -> "))]
    ContextCycle {
        /// Field names along the cycle
        chain: Vec<String>,
    },

    /// No registered variant fits the device
    #[error("No variant of {base_type} matches device {device}")]
    NoMatchingVariant {
        /// Base type name
        base_type: String,
        /// Device the lookup ran for
        device: String,
    },

    /// Several variants tie at the winning precedence tier
    #[error("Ambiguous variants of {base_type} for device {device}: {}", candidates.join(", "))]
    AmbiguousVariant {
        /// Base type name
        base_type: String,
        /// Device the lookup ran for
        device: String,
        /// Names of the tied candidates
        candidates: Vec<String>,
    },

    /// Selected variant has no constructor accepting the arguments
    #[error("No constructor of {variant} accepts ({})", args.join(", "))]
    ConstructorNotFound {
        /// Variant name
        variant: String,
        /// Kinds of the supplied arguments
        args: Vec<String>,
    },

    /// List index past the current match count
    #[error("Index {index} out of bounds for '{name}' with {len} elements")]
    IndexOutOfBounds {
        /// List field name
        name: String,
        /// Requested index
        index: usize,
        /// Number of elements found
        len: usize,
    },

    /// Unknown device type string
    #[error("Invalid device type: {value}")]
    InvalidDevice {
        /// Rejected value
        value: String,
    },

    /// Settings could not be parsed
    #[error("Invalid configuration: {message}")]
    InvalidConfig {
        /// Error message
        message: String,
    },

    /// Error raised by the automation driver, passed through unchanged
    #[error(transparent)]
    Driver(#[from] DriverError),

    /// JSON error while decoding a command result
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl PageError {
    /// The driver error carried by this error, if any
    #[must_use]
    pub const fn driver_error(&self) -> Option<&DriverError> {
        match self {
            Self::Driver(err) => Some(err),
            _ => None,
        }
    }

    /// Whether the error means the element is absent or detached
    #[must_use]
    pub const fn is_absence(&self) -> bool {
        matches!(
            self,
            Self::ElementNotFound { .. }
                | Self::Driver(DriverError::NotFound { .. } | DriverError::Stale { .. })
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_driver_error_is_transparent() {
        let err = PageError::from(DriverError::Stale {
            message: "element detached".to_string(),
        });
        assert_eq!(err.to_string(), "Stale element reference: element detached");
        assert!(matches!(err.driver_error(), Some(DriverError::Stale { .. })));
    }

    #[test]
    fn test_absence_classification() {
        let not_found = PageError::ElementNotFound {
            name: "login".to_string(),
            locator: "By.id: login".to_string(),
        };
        assert!(not_found.is_absence());

        let timeout = PageError::from(DriverError::Timeout { ms: 100 });
        assert!(!timeout.is_absence());
    }

    #[test]
    fn test_cycle_message() {
        let err = PageError::ContextCycle {
            chain: vec!["a".to_string(), "b".to_string(), "a".to_string()],
        };
        assert_eq!(err.to_string(), "Cyclic search context: a -> b -> a");
    }
}
