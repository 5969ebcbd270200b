//! REST client for the stock and catalog API.
//!
//! Uses `reqwest` for HTTP and caches product metadata using `moka`.

use std::sync::Arc;

use async_trait::async_trait;
use moka::future::Cache;
use reqwest::StatusCode;
use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderValue};
use rocketshoes_core::{Product, ProductId, StockQuote};
use secrecy::ExposeSecret;
use serde::de::DeserializeOwned;
use tracing::{debug, instrument};
use url::Url;

use super::{ApiError, ProductCatalog, StockOracle};
use crate::config::ApiConfig;

/// Number of body characters kept in error messages and logs.
const BODY_PREVIEW_CHARS: usize = 200;

/// Client for the stock and catalog API.
///
/// Cheap to clone; clones share the HTTP connection pool and product cache.
#[derive(Clone)]
pub struct ApiClient {
    inner: Arc<ApiClientInner>,
}

struct ApiClientInner {
    client: reqwest::Client,
    base_url: Url,
    /// `None` when caching is disabled (zero TTL)
    products: Option<Cache<ProductId, Product>>,
}

impl ApiClient {
    /// Create a new API client.
    ///
    /// # Errors
    ///
    /// Returns an error if the token cannot be used as a header value or the
    /// HTTP client fails to build.
    pub fn new(config: &ApiConfig) -> Result<Self, ApiError> {
        let mut headers = HeaderMap::new();

        if let Some(token) = &config.token {
            let mut value = HeaderValue::from_str(&format!("Bearer {}", token.expose_secret()))
                .map_err(|e| ApiError::InvalidConfig(format!("Invalid API token format: {e}")))?;
            value.set_sensitive(true);
            headers.insert(AUTHORIZATION, value);
        }

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(config.timeout)
            .build()?;

        let products = (!config.catalog_cache_ttl.is_zero()).then(|| {
            Cache::builder()
                .max_capacity(1000)
                .time_to_live(config.catalog_cache_ttl)
                .build()
        });

        Ok(Self {
            inner: Arc::new(ApiClientInner {
                client,
                base_url: config.base_url.clone(),
                products,
            }),
        })
    }

    /// Base URL all requests are resolved against.
    #[must_use]
    pub fn base_url(&self) -> &Url {
        &self.inner.base_url
    }

    /// Drop every cached product.
    pub fn invalidate_products(&self) {
        if let Some(cache) = &self.inner.products {
            cache.invalidate_all();
        }
    }

    fn endpoint(&self, path: &str) -> Result<Url, ApiError> {
        self.inner
            .base_url
            .join(path)
            .map_err(|e| ApiError::InvalidConfig(format!("Cannot build URL for {path}: {e}")))
    }

    /// GET a path and parse the JSON body.
    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        let url = self.endpoint(path)?;

        let response = self.inner.client.get(url).send().await?;
        let status = response.status();

        if status == StatusCode::NOT_FOUND {
            return Err(ApiError::NotFound(path.to_string()));
        }

        // Get response body as text first for better error diagnostics
        let body = response.text().await?;

        if !status.is_success() {
            tracing::error!(
                status = %status,
                path = %path,
                body = %preview(&body),
                "API returned non-success status"
            );
            return Err(ApiError::Api {
                status: status.as_u16(),
                message: preview(&body),
            });
        }

        serde_json::from_str(&body).map_err(|e| {
            tracing::error!(
                error = %e,
                path = %path,
                body = %preview(&body),
                "Failed to parse API response"
            );
            ApiError::Parse(e)
        })
    }
}

#[async_trait]
impl StockOracle for ApiClient {
    #[instrument(skip(self), fields(product_id = %product_id))]
    async fn stock(&self, product_id: ProductId) -> Result<StockQuote, ApiError> {
        let quote: StockQuote = self.get_json(&format!("stock/{product_id}")).await?;

        if quote.id != product_id {
            return Err(ApiError::UnexpectedResponse(format!(
                "requested stock for product {product_id}, got product {}",
                quote.id
            )));
        }

        debug!(available = quote.amount, "Fetched stock");
        Ok(quote)
    }
}

#[async_trait]
impl ProductCatalog for ApiClient {
    #[instrument(skip(self), fields(product_id = %product_id))]
    async fn product(&self, product_id: ProductId) -> Result<Product, ApiError> {
        // Check cache
        if let Some(cache) = &self.inner.products
            && let Some(product) = cache.get(&product_id).await
        {
            debug!("Cache hit for product");
            return Ok(product);
        }

        let product: Product = self.get_json(&format!("products/{product_id}")).await?;

        if product.id != product_id {
            return Err(ApiError::UnexpectedResponse(format!(
                "requested product {product_id}, got product {}",
                product.id
            )));
        }

        // Cache the result
        if let Some(cache) = &self.inner.products {
            cache.insert(product_id, product.clone()).await;
        }

        Ok(product)
    }
}

fn preview(body: &str) -> String {
    body.chars().take(BODY_PREVIEW_CHARS).collect()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::time::Duration;

    use secrecy::SecretString;

    use super::*;

    fn config(url: &str) -> ApiConfig {
        ApiConfig::new(Url::parse(url).unwrap())
    }

    #[test]
    fn test_client_creation() {
        let client = ApiClient::new(&config("http://localhost:3333")).unwrap();
        assert_eq!(client.base_url().as_str(), "http://localhost:3333/");
        assert!(client.inner.products.is_some());
    }

    #[test]
    fn test_endpoint_joins_below_base_path() {
        let client = ApiClient::new(&config("https://shop.example.com/api/v1")).unwrap();
        assert_eq!(
            client.endpoint("products/7").unwrap().as_str(),
            "https://shop.example.com/api/v1/products/7"
        );
    }

    #[test]
    fn test_zero_ttl_disables_cache() {
        let mut config = config("http://localhost:3333");
        config.catalog_cache_ttl = Duration::ZERO;
        let client = ApiClient::new(&config).unwrap();
        assert!(client.inner.products.is_none());
        client.invalidate_products();
    }

    #[test]
    fn test_invalid_token_rejected() {
        let mut config = config("http://localhost:3333");
        config.token = Some(SecretString::from("line\nbreak"));
        let result = ApiClient::new(&config);
        assert!(matches!(result, Err(ApiError::InvalidConfig(_))));
    }

    #[test]
    fn test_preview_truncates() {
        let body = "x".repeat(500);
        assert_eq!(preview(&body).len(), BODY_PREVIEW_CHARS);
        assert_eq!(preview("short"), "short");
    }
}
