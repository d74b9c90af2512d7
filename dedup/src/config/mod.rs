//! Configuration types for the dedup cache and its remote store.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors produced when validating configuration.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// A configuration field holds a value outside its allowed range.
    #[error("invalid value for `{field}`: {constraint}")]
    InvalidFieldValue {
        /// Name of the offending field.
        field: String,
        /// Constraint the value violated.
        constraint: String,
    },
}

/// Size limits imposed by the remote key/value store on one logical cache.
///
/// The encoded cache blob is split into chunks of at most `max_value_size`
/// characters, grouped into pages of at most `max_keys_per_page` chunk fields.
/// Both limits are overridable per deployment.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct PageLimits {
    /// Maximum number of characters in a single stored chunk value.
    #[serde(default = "default_max_value_size")]
    pub max_value_size: usize,
    /// Maximum number of chunk fields in a single page.
    #[serde(default = "default_max_keys_per_page")]
    pub max_keys_per_page: usize,
}

impl PageLimits {
    /// Default maximum characters per stored chunk value.
    pub const DEFAULT_MAX_VALUE_SIZE: usize = 24500;

    /// Default maximum chunk fields per page.
    pub const DEFAULT_MAX_KEYS_PER_PAGE: usize = 495;

    /// Validates page limit settings.
    ///
    /// Ensures both limits are non-zero, since a zero limit would make the
    /// chunking or grouping step impossible.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.max_value_size == 0 {
            return Err(ValidationError::InvalidFieldValue {
                field: "max_value_size".to_string(),
                constraint: "must be greater than 0".to_string(),
            });
        }

        if self.max_keys_per_page == 0 {
            return Err(ValidationError::InvalidFieldValue {
                field: "max_keys_per_page".to_string(),
                constraint: "must be greater than 0".to_string(),
            });
        }

        Ok(())
    }
}

impl Default for PageLimits {
    fn default() -> Self {
        Self {
            max_value_size: default_max_value_size(),
            max_keys_per_page: default_max_keys_per_page(),
        }
    }
}

fn default_max_value_size() -> usize {
    PageLimits::DEFAULT_MAX_VALUE_SIZE
}

fn default_max_keys_per_page() -> usize {
    PageLimits::DEFAULT_MAX_KEYS_PER_PAGE
}

/// Connection settings for the remote key/value store.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct RemoteStoreConfig {
    /// Base URL of the remote store service.
    pub base_url: String,
    /// Size limits the store imposes on stored values and pages.
    #[serde(default)]
    pub limits: PageLimits,
}
