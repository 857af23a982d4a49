//! Unified error handling with Sentry integration.
//!
//! [`AppError`] aggregates the per-layer errors for front ends (the CLI).
//! Library operations return their own error types; the front end converts
//! with `?` and calls [`AppError::report`] once before exiting.

use thiserror::Error;

use crate::catalog::CatalogError;
use crate::config::ConfigError;
use crate::content::ContentError;
use crate::storage::StorageError;

/// Application-level error type for the storefront.
#[derive(Debug, Error)]
pub enum AppError {
    /// Configuration could not be loaded.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Content backend operation failed.
    #[error("Content error: {0}")]
    Content(#[from] ContentError),

    /// Catalog fetch failed.
    #[error("Catalog error: {0}")]
    Catalog(#[from] CatalogError),

    /// Durable storage operation failed.
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),
}

impl AppError {
    /// Whether this error is worth an error-tracking event.
    ///
    /// User mistakes (unknown ids, bad configuration) are not.
    #[must_use]
    pub const fn is_reportable(&self) -> bool {
        matches!(
            self,
            Self::Content(_) | Self::Catalog(_) | Self::Storage(_)
        )
    }

    /// Log the error and, if reportable, capture it to Sentry.
    pub fn report(&self) {
        if self.is_reportable() {
            let event_id = sentry::capture_error(self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Command failed"
            );
        } else {
            tracing::warn!(error = %self, "Command rejected");
        }
    }
}

/// Result type alias for `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;

/// Add a breadcrumb for user actions.
///
/// Breadcrumbs appear in Sentry error reports to show the trail of user actions
/// leading up to an error.
///
/// # Example
///
/// ```rust,ignore
/// add_breadcrumb("cart", "Added item", Some(&[("product_id", "123")]));
/// ```
pub fn add_breadcrumb(category: &str, message: &str, data: Option<&[(&str, &str)]>) {
    let mut breadcrumb = sentry::Breadcrumb {
        category: Some(category.to_string()),
        message: Some(message.to_string()),
        level: sentry::Level::Info,
        ..Default::default()
    };

    if let Some(pairs) = data {
        for (key, value) in pairs {
            breadcrumb.data.insert(
                (*key).to_string(),
                serde_json::Value::String((*value).to_string()),
            );
        }
    }

    sentry::add_breadcrumb(breadcrumb);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::Stage;

    #[test]
    fn test_app_error_display() {
        let err = AppError::NotFound("product 123".to_string());
        assert_eq!(err.to_string(), "Not found: product 123");

        let err = AppError::from(ConfigError::MissingEnvVar("CONTENT_API_URL".to_string()));
        assert_eq!(
            err.to_string(),
            "Configuration error: Missing environment variable: CONTENT_API_URL"
        );

        let err = AppError::from(CatalogError::Load {
            failed: vec![Stage::Products],
        });
        assert_eq!(err.to_string(), "Catalog error: Catalog load failed for: products");
    }

    #[test]
    fn test_reportable_errors() {
        assert!(AppError::from(StorageError::Poisoned).is_reportable());
        assert!(AppError::from(ContentError::RateLimited(5)).is_reportable());
        assert!(!AppError::NotFound("x".to_string()).is_reportable());
        assert!(!AppError::from(ConfigError::MissingEnvVar("X".to_string())).is_reportable());
    }

    #[test]
    fn test_breadcrumb_without_client_is_noop() {
        add_breadcrumb("cart", "Added item", Some(&[("product_id", "1")]));
        add_breadcrumb("cart", "Cleared cart", None);
        AppError::NotFound("x".to_string()).report();
    }
}
