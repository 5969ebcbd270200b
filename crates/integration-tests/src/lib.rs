//! Integration tests for the RocketShoes cart.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p rocketshoes-integration-tests
//! ```
//!
//! # Test Categories
//!
//! - `api_client` - HTTP client against an in-process catalog/stock server
//! - `cart_engine` - Engine wired to the HTTP client and a file store
//!
//! The tests need no external services: [`MockApi::start`] serves the
//! `products/{id}` and `stock/{id}` endpoints from memory on an ephemeral
//! localhost port.

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use serde_json::{Value, json};
use url::Url;

/// In-memory catalog and stock data served over HTTP.
#[derive(Debug, Default)]
pub struct MockApi {
    products: Mutex<HashMap<i32, Value>>,
    stock: Mutex<HashMap<i32, u32>>,
    stock_down: AtomicBool,
    product_requests: AtomicUsize,
    stock_requests: AtomicUsize,
    last_authorization: Mutex<Option<String>>,
}

/// Handle to a running [`MockApi`] server.
#[derive(Debug, Clone)]
pub struct MockServer {
    pub url: Url,
    pub api: Arc<MockApi>,
}

impl MockApi {
    /// Create an empty API.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a product with the current field names.
    #[must_use]
    pub fn with_product(self, id: i32, name: &str, price: f64, stock: u32) -> Self {
        let body = json!({
            "id": id,
            "name": name,
            "price": price,
            "imageUrl": format!("https://cdn.rocketshoes.test/{id}.jpg"),
        });
        self.with_raw_product(id, body).with_stock(id, stock)
    }

    /// Add a product with an arbitrary JSON body.
    #[must_use]
    pub fn with_raw_product(self, id: i32, body: Value) -> Self {
        lock(&self.products).insert(id, body);
        self
    }

    /// Set the stock for a product.
    #[must_use]
    pub fn with_stock(self, id: i32, amount: u32) -> Self {
        self.set_stock(id, amount);
        self
    }

    /// Change the stock for a product while the server runs.
    pub fn set_stock(&self, id: i32, amount: u32) {
        lock(&self.stock).insert(id, amount);
    }

    /// Make every stock request fail with a 503.
    pub fn set_stock_down(&self, down: bool) {
        self.stock_down.store(down, Ordering::SeqCst);
    }

    /// Number of `products/{id}` requests served.
    #[must_use]
    pub fn product_requests(&self) -> usize {
        self.product_requests.load(Ordering::SeqCst)
    }

    /// Number of `stock/{id}` requests served.
    #[must_use]
    pub fn stock_requests(&self) -> usize {
        self.stock_requests.load(Ordering::SeqCst)
    }

    /// `Authorization` header of the most recent request.
    #[must_use]
    pub fn last_authorization(&self) -> Option<String> {
        lock(&self.last_authorization).clone()
    }

    /// Serve the API on an ephemeral localhost port.
    ///
    /// # Panics
    ///
    /// Panics if the listener cannot be bound.
    #[allow(clippy::expect_used)]
    pub async fn start(self) -> MockServer {
        let api = Arc::new(self);

        let app = Router::new()
            .route("/products/{id}", get(product))
            .route("/stock/{id}", get(stock))
            .with_state(api.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind mock API listener");
        let addr = listener.local_addr().expect("Listener has no address");

        tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });

        let url = Url::parse(&format!("http://{addr}/")).expect("Mock API URL is valid");
        MockServer { url, api }
    }

    fn record_authorization(&self, headers: &HeaderMap) {
        let value = headers
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        *lock(&self.last_authorization) = value;
    }
}

async fn product(
    State(api): State<Arc<MockApi>>,
    Path(id): Path<i32>,
    headers: HeaderMap,
) -> Response {
    api.product_requests.fetch_add(1, Ordering::SeqCst);
    api.record_authorization(&headers);

    match lock(&api.products).get(&id) {
        Some(body) => Json(body.clone()).into_response(),
        None => StatusCode::NOT_FOUND.into_response(),
    }
}

async fn stock(
    State(api): State<Arc<MockApi>>,
    Path(id): Path<i32>,
    headers: HeaderMap,
) -> Response {
    api.stock_requests.fetch_add(1, Ordering::SeqCst);
    api.record_authorization(&headers);

    if api.stock_down.load(Ordering::SeqCst) {
        return (StatusCode::SERVICE_UNAVAILABLE, "stock service unavailable").into_response();
    }

    match lock(&api.stock).get(&id) {
        Some(amount) => Json(json!({ "id": id, "amount": amount })).into_response(),
        None => StatusCode::NOT_FOUND.into_response(),
    }
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
