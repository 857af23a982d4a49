//! Headless content backend (REST) access.
//!
//! # Architecture
//!
//! - [`ContentApi`] is the transport seam: fetch a path, get JSON back
//! - [`ContentClient`] implements it over `reqwest`
//! - [`raw`] decodes the two record shapes the backend has shipped
//!
//! Normalization into catalog entities lives in [`crate::catalog`]; this
//! module knows nothing about products or carts.
//!
//! # Endpoints
//!
//! | Path | Returns |
//! |------|---------|
//! | `categories` | category list |
//! | `sous-categories?populate=*` | subcategories with their parent relation |
//! | `produits?populate=*` | products with image/category/subcategory expanded |
//! | `products/{id}` | legacy single-product lookup |

mod client;
pub mod raw;

use std::future::Future;

use boutique_core::ProductId;
use thiserror::Error;

pub use client::ContentClient;

/// Category list endpoint.
pub const CATEGORIES_PATH: &str = "categories";

/// Subcategory list endpoint, with relations expanded.
pub const SUBCATEGORIES_PATH: &str = "sous-categories?populate=*";

/// Product list endpoint, with relations expanded.
pub const PRODUCTS_PATH: &str = "produits?populate=*";

/// Legacy single-product endpoint.
#[must_use]
pub fn product_path(id: ProductId) -> String {
    format!("products/{id}")
}

/// Errors that can occur when talking to the content backend.
#[derive(Debug, Error)]
pub enum ContentError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Backend answered with a non-success status.
    #[error("HTTP {status}: {body}")]
    Status {
        /// Status code.
        status: u16,
        /// Leading part of the response body.
        body: String,
    },

    /// Rate limited by the backend.
    #[error("Rate limited, retry after {0} seconds")]
    RateLimited(u64),

    /// JSON parsing failed.
    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    /// The body parsed but is not a shape we know.
    #[error("Unexpected response shape: {0}")]
    UnexpectedShape(String),
}

/// Read access to the content backend.
///
/// Paths are relative to the API root (see the endpoint constants).
///
/// # Implementation Notes
///
/// - Implementations must be thread-safe (`Send + Sync`)
/// - No retries: a failed call is reported and the caller decides
pub trait ContentApi: Send + Sync {
    /// `GET` a path and return the decoded JSON body.
    fn get_json(
        &self,
        path: &str,
    ) -> impl Future<Output = Result<serde_json::Value, ContentError>> + Send;
}
