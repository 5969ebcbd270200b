//! Cart state engine.
//!
//! [`CartEngine`] owns the canonical cart and is the only way to change it.
//! Every mutation is an atomic transition from one snapshot to the next:
//!
//! 1. Validate against the stock service or catalog
//! 2. Build the new cart
//! 3. Write it through to the persistent store
//! 4. Publish it to subscribers
//!
//! A mutation that fails at any step leaves both the in-memory cart and the
//! store untouched, reports a [`Notice`](crate::error::Notice) to the
//! notifier, and returns the [`CartError`].
//!
//! # Concurrency
//!
//! Mutations are serialized through a FIFO gate held for the whole operation,
//! including the awaited stock or catalog request. Each mutation therefore
//! validates against the latest committed cart and no update is lost when two
//! calls target the same product. Reading the current cart never waits on the
//! gate.

use std::num::NonZeroU32;
use std::sync::Arc;

use rocketshoes_core::{Cart, CartLine, ProductId};
use tokio::sync::{Mutex, watch};
use tracing::{debug, error, info, instrument, warn};

use crate::api::{ApiClient, ApiError, ProductCatalog, StockOracle};
use crate::config::CartConfig;
use crate::error::{CartError, ErrorKind, Result};
use crate::notifier::Notifier;
use crate::store::{CartStore, FileStore, StoreError};

/// Result of a mutation that did not fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// A new cart was persisted and published.
    Committed,
    /// The request was ignored (non-positive quantity).
    Skipped,
}

/// Handle to the shopping cart.
///
/// Cheap to clone; all clones share the same cart.
#[derive(Clone)]
pub struct CartEngine {
    inner: Arc<CartEngineInner>,
}

struct CartEngineInner {
    stock: Arc<dyn StockOracle>,
    catalog: Arc<dyn ProductCatalog>,
    store: Arc<dyn CartStore>,
    notifier: Arc<dyn Notifier>,
    storage_key: String,
    state: watch::Sender<Arc<Cart>>,
    gate: Mutex<()>,
}

impl CartEngine {
    /// Create an engine, loading the cart stored under `storage_key`.
    ///
    /// A missing, unreadable or malformed stored value yields an empty cart.
    pub fn new(
        stock: Arc<dyn StockOracle>,
        catalog: Arc<dyn ProductCatalog>,
        store: Arc<dyn CartStore>,
        notifier: Arc<dyn Notifier>,
        storage_key: impl Into<String>,
    ) -> Self {
        let storage_key = storage_key.into();
        let cart = load_cart(store.as_ref(), &storage_key);
        let (state, _) = watch::channel(Arc::new(cart));

        Self {
            inner: Arc::new(CartEngineInner {
                stock,
                catalog,
                store,
                notifier,
                storage_key,
                state,
                gate: Mutex::new(()),
            }),
        }
    }

    /// Create an engine backed by the HTTP API and the file store.
    ///
    /// # Errors
    ///
    /// Returns an error if the API client cannot be built.
    pub fn from_config(
        config: &CartConfig,
        notifier: Arc<dyn Notifier>,
    ) -> std::result::Result<Self, ApiError> {
        let client = Arc::new(ApiClient::new(&config.api)?);
        let store = Arc::new(FileStore::new(&config.store_path));

        Ok(Self::new(
            client.clone(),
            client,
            store,
            notifier,
            config.storage_key.clone(),
        ))
    }

    /// Current cart snapshot.
    #[must_use]
    pub fn cart(&self) -> Arc<Cart> {
        self.inner.state.borrow().clone()
    }

    /// Subscribe to cart changes. The receiver starts at the current cart.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<Arc<Cart>> {
        self.inner.state.subscribe()
    }

    /// Key the cart is persisted under.
    #[must_use]
    pub fn storage_key(&self) -> &str {
        &self.inner.storage_key
    }

    /// Add one unit of a product.
    ///
    /// A product not yet in the cart is looked up in the catalog and appended
    /// with amount 1; the first unit is not checked against stock. For a
    /// product already in the cart, the incremented amount must fit within
    /// current stock.
    ///
    /// # Errors
    ///
    /// - [`CartError::OutOfStock`] if stock cannot cover one more unit
    /// - [`CartError::AddFailed`] if the stock or catalog request fails
    /// - [`CartError::Storage`] if the new cart cannot be persisted
    #[instrument(skip(self), fields(product_id = %product_id))]
    pub async fn add_product(&self, product_id: ProductId) -> Result<Outcome> {
        let _gate = self.inner.gate.lock().await;
        self.try_add(product_id)
            .await
            .inspect_err(|err| self.report(err))
    }

    /// Remove a product's line.
    ///
    /// Never contacts the stock service or catalog; only waits for a
    /// mutation already in flight.
    ///
    /// # Errors
    ///
    /// - [`CartError::RemoveMissing`] if the product is not in the cart
    /// - [`CartError::Storage`] if the new cart cannot be persisted
    #[instrument(skip(self), fields(product_id = %product_id))]
    pub async fn remove_product(&self, product_id: ProductId) -> Result<Outcome> {
        let _gate = self.inner.gate.lock().await;
        self.try_remove(product_id)
            .inspect_err(|err| self.report(err))
    }

    /// Set a product's amount to exactly `amount`.
    ///
    /// Non-positive amounts are ignored and return [`Outcome::Skipped`]
    /// without any notice.
    ///
    /// # Errors
    ///
    /// - [`CartError::UpdateMissing`] if the product is not in the cart
    /// - [`CartError::OutOfStock`] if stock cannot cover `amount`
    /// - [`CartError::UpdateFailed`] if the stock request fails
    /// - [`CartError::Storage`] if the new cart cannot be persisted
    #[instrument(skip(self), fields(product_id = %product_id))]
    pub async fn update_product_amount(&self, product_id: ProductId, amount: i64) -> Result<Outcome> {
        let Some(requested) = requested_amount(amount) else {
            debug!("Ignoring non-positive amount");
            return Ok(Outcome::Skipped);
        };

        let _gate = self.inner.gate.lock().await;
        self.try_update(product_id, requested)
            .await
            .inspect_err(|err| self.report(err))
    }

    async fn try_add(&self, product_id: ProductId) -> Result<Outcome> {
        let cart = self.cart();

        let next = if let Some(line) = cart.line(product_id) {
            let quote = self
                .inner
                .stock
                .stock(product_id)
                .await
                .map_err(|source| CartError::AddFailed { product_id, source })?;

            let requested = NonZeroU32::MIN.saturating_add(line.amount);
            if !quote.covers(requested.get()) {
                return Err(CartError::OutOfStock {
                    product_id,
                    requested: requested.get(),
                    available: quote.amount,
                });
            }

            cart.with_line(CartLine {
                amount: requested.get(),
                ..line.clone()
            })
        } else {
            let product = self
                .inner
                .catalog
                .product(product_id)
                .await
                .map_err(|source| CartError::AddFailed { product_id, source })?;

            cart.with_line(CartLine::from_product(product, NonZeroU32::MIN))
        };

        self.commit(next)?;
        Ok(Outcome::Committed)
    }

    fn try_remove(&self, product_id: ProductId) -> Result<Outcome> {
        let next = self
            .cart()
            .without(product_id)
            .ok_or(CartError::RemoveMissing(product_id))?;

        self.commit(next)?;
        Ok(Outcome::Committed)
    }

    async fn try_update(&self, product_id: ProductId, requested: NonZeroU32) -> Result<Outcome> {
        let next = self
            .cart()
            .with_amount(product_id, requested)
            .ok_or(CartError::UpdateMissing(product_id))?;

        let quote = self
            .inner
            .stock
            .stock(product_id)
            .await
            .map_err(|source| CartError::UpdateFailed { product_id, source })?;

        if !quote.covers(requested.get()) {
            return Err(CartError::OutOfStock {
                product_id,
                requested: requested.get(),
                available: quote.amount,
            });
        }

        self.commit(next)?;
        Ok(Outcome::Committed)
    }

    /// Write the new cart through to the store, then publish it.
    fn commit(&self, next: Cart) -> Result<()> {
        let payload = serde_json::to_string(&next).map_err(StoreError::from)?;
        self.inner.store.save(&self.inner.storage_key, &payload)?;

        let (lines, units) = (next.len(), next.total_units());
        self.inner.state.send_replace(Arc::new(next));
        info!(lines, units, "Cart committed");
        Ok(())
    }

    fn report(&self, err: &CartError) {
        match err.kind() {
            ErrorKind::Validation | ErrorKind::NotFound => {
                warn!(error = %err, "Cart mutation rejected");
            }
            ErrorKind::Collaborator => error!(error = %err, "Cart collaborator request failed"),
            ErrorKind::Storage => error!(error = %err, "Failed to persist cart"),
        }
        self.inner.notifier.notify(err.notice());
    }
}

/// Read the stored cart, falling back to an empty one.
fn load_cart(store: &dyn CartStore, key: &str) -> Cart {
    let raw = match store.load(key) {
        Ok(Some(raw)) => raw,
        Ok(None) => {
            debug!(key, "No stored cart, starting empty");
            return Cart::new();
        }
        Err(e) => {
            warn!(key, error = %e, "Failed to read stored cart, starting empty");
            return Cart::new();
        }
    };

    let lines: Vec<CartLine> = match serde_json::from_str(&raw) {
        Ok(lines) => lines,
        Err(e) => {
            warn!(key, error = %e, "Stored cart is malformed, starting empty");
            return Cart::new();
        }
    };

    let (cart, dropped) = Cart::sanitized(lines);
    if dropped > 0 {
        warn!(key, dropped, "Dropped invalid lines from stored cart");
    }
    info!(key, lines = cart.len(), "Loaded cart");
    cart
}

/// Positive amounts as a quantity; amounts beyond `u32` saturate.
fn requested_amount(amount: i64) -> Option<NonZeroU32> {
    if amount <= 0 {
        return None;
    }
    Some(
        u32::try_from(amount)
            .ok()
            .and_then(NonZeroU32::new)
            .unwrap_or(NonZeroU32::MAX),
    )
}
