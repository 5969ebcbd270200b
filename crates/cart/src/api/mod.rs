//! Stock and catalog collaborators.
//!
//! # Architecture
//!
//! - [`StockOracle`] reports how many units of a product are available
//! - [`ProductCatalog`] returns product metadata (name, price, image)
//! - [`ApiClient`] implements both over the REST API:
//!   - `GET stock/{id}` → `{ "id": 1, "amount": 5 }`
//!   - `GET products/{id}` → `{ "id": 1, "title": "...", "price": 179.9, "image": "..." }`
//!
//! Product metadata is cached in memory via `moka`. Stock is always fetched
//! fresh, one request per validation.

mod client;

pub use client::ApiClient;

use async_trait::async_trait;
use rocketshoes_core::{Product, ProductId, StockQuote};
use thiserror::Error;

/// Errors that can occur when talking to the stock or catalog API.
#[derive(Debug, Error)]
pub enum ApiError {
    /// HTTP request failed (connection refused, timeout, ...).
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// API returned a non-success status.
    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// JSON parsing failed.
    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    /// The response parsed but does not answer the request.
    #[error("Unexpected response: {0}")]
    UnexpectedResponse(String),

    /// The client could not be built from its configuration.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Source of current stock levels.
#[async_trait]
pub trait StockOracle: Send + Sync {
    /// Fetch the available quantity of a product.
    ///
    /// # Errors
    ///
    /// Returns an error if the stock service is unreachable or does not know
    /// the product.
    async fn stock(&self, product_id: ProductId) -> Result<StockQuote, ApiError>;
}

/// Source of product metadata.
#[async_trait]
pub trait ProductCatalog: Send + Sync {
    /// Fetch a product's metadata.
    ///
    /// # Errors
    ///
    /// Returns an error if the catalog is unreachable or the product does not
    /// exist.
    async fn product(&self, product_id: ProductId) -> Result<Product, ApiError>;
}
