//! End-to-end tests for the cart engine.
//!
//! The engine talks to an in-process API server over HTTP and persists to a
//! file store in a temporary directory, the same wiring the CLI uses.

#![allow(clippy::unwrap_used)]

use std::path::Path;
use std::sync::Arc;

use rocketshoes_cart::notifier::ChannelNotifier;
use rocketshoes_cart::store::{CartStore, FileStore};
use rocketshoes_cart::{ApiConfig, CartConfig, CartEngine, CartError, Notice, Outcome};
use rocketshoes_core::{Price, ProductId};
use rocketshoes_integration_tests::{MockApi, MockServer};
use serde_json::Value;
use tempfile::TempDir;
use tokio::sync::mpsc::UnboundedReceiver;

const KEY: &str = "@RocketShoes:cart";

struct Fixture {
    server: MockServer,
    dir: TempDir,
}

impl Fixture {
    async fn new(api: MockApi) -> Self {
        Self {
            server: api.start().await,
            dir: tempfile::tempdir().unwrap(),
        }
    }

    fn config(&self) -> CartConfig {
        CartConfig {
            api: ApiConfig::new(self.server.url.clone()),
            store_path: self.dir.path().join("storage.json"),
            storage_key: KEY.to_string(),
            sentry_dsn: None,
        }
    }

    fn engine(&self) -> (CartEngine, UnboundedReceiver<Notice>) {
        let (notifier, rx) = ChannelNotifier::new();
        let engine = CartEngine::from_config(&self.config(), Arc::new(notifier)).unwrap();
        (engine, rx)
    }

    fn store_path(&self) -> &Path {
        self.dir.path()
    }

    /// The stored cart as raw JSON.
    fn stored(&self) -> Value {
        let raw = FileStore::new(self.store_path().join("storage.json"))
            .load(KEY)
            .unwrap()
            .unwrap();
        serde_json::from_str(&raw).unwrap()
    }
}

fn catalog() -> MockApi {
    MockApi::new()
        .with_product(1, "Tênis de Caminhada Leve Confortável", 179.9, 3)
        .with_product(2, "Tênis VR Caminhada Confortável", 139.9, 1)
}

#[tokio::test]
async fn test_add_persists_and_survives_restart() {
    let fixture = Fixture::new(catalog()).await;

    {
        let (engine, _rx) = fixture.engine();
        engine.add_product(ProductId::new(1)).await.unwrap();
        engine.add_product(ProductId::new(1)).await.unwrap();
        engine.add_product(ProductId::new(2)).await.unwrap();
    }

    let (engine, _rx) = fixture.engine();
    let cart = engine.cart();
    assert_eq!(cart.len(), 2);
    assert_eq!(cart.line(ProductId::new(1)).unwrap().amount, 2);
    assert_eq!(cart.line(ProductId::new(2)).unwrap().amount, 1);
    assert_eq!(cart.line(ProductId::new(1)).unwrap().price, Price::from_cents(17990));
    assert_eq!(cart.total_units(), 3);
}

#[tokio::test]
async fn test_stored_format() {
    let fixture = Fixture::new(catalog()).await;
    let (engine, _rx) = fixture.engine();

    engine.add_product(ProductId::new(2)).await.unwrap();

    let stored = fixture.stored();
    let line = &stored[0];
    assert_eq!(line["id"], 2);
    assert_eq!(line["name"], "Tênis VR Caminhada Confortável");
    assert_eq!(line["imageUrl"], "https://cdn.rocketshoes.test/2.jpg");
    assert_eq!(line["amount"], 1);
    assert!(line.get("price").is_some());
}

#[tokio::test]
async fn test_out_of_stock_keeps_stored_cart() {
    let fixture = Fixture::new(catalog()).await;
    let (engine, mut rx) = fixture.engine();

    engine.add_product(ProductId::new(2)).await.unwrap();
    let before = fixture.stored();

    let err = engine.add_product(ProductId::new(2)).await.unwrap_err();

    assert!(matches!(
        err,
        CartError::OutOfStock { requested: 2, available: 1, .. }
    ));
    assert_eq!(rx.try_recv().unwrap(), Notice::OutOfStock);
    assert_eq!(fixture.stored(), before);
    assert_eq!(engine.cart().line(ProductId::new(2)).unwrap().amount, 1);
}

#[tokio::test]
async fn test_update_checks_live_stock() {
    let fixture = Fixture::new(catalog()).await;
    let (engine, mut rx) = fixture.engine();

    engine.add_product(ProductId::new(1)).await.unwrap();

    let outcome = engine
        .update_product_amount(ProductId::new(1), 3)
        .await
        .unwrap();
    assert_eq!(outcome, Outcome::Committed);

    fixture.server.api.set_stock(1, 2);
    let err = engine
        .update_product_amount(ProductId::new(1), 3)
        .await
        .unwrap_err();
    assert!(matches!(err, CartError::OutOfStock { available: 2, .. }));
    assert_eq!(rx.try_recv().unwrap(), Notice::OutOfStock);

    engine
        .update_product_amount(ProductId::new(1), 2)
        .await
        .unwrap();
    assert_eq!(fixture.stored()[0]["amount"], 2);
}

#[tokio::test]
async fn test_non_positive_update_is_skipped_without_requests() {
    let fixture = Fixture::new(catalog()).await;
    let (engine, mut rx) = fixture.engine();

    engine.add_product(ProductId::new(1)).await.unwrap();
    let requests = fixture.server.api.stock_requests();

    for amount in [0, -1] {
        let outcome = engine
            .update_product_amount(ProductId::new(1), amount)
            .await
            .unwrap();
        assert_eq!(outcome, Outcome::Skipped);
    }

    assert_eq!(fixture.server.api.stock_requests(), requests);
    assert!(rx.try_recv().is_err());
    assert_eq!(engine.cart().line(ProductId::new(1)).unwrap().amount, 1);
}

#[tokio::test]
async fn test_unknown_product_add_fails() {
    let fixture = Fixture::new(catalog()).await;
    let (engine, mut rx) = fixture.engine();

    let err = engine.add_product(ProductId::new(42)).await.unwrap_err();

    assert!(matches!(err, CartError::AddFailed { .. }));
    assert_eq!(rx.try_recv().unwrap(), Notice::AddFailed);
    assert!(engine.cart().is_empty());
    assert!(!fixture.store_path().join("storage.json").exists());
}

#[tokio::test]
async fn test_stock_outage_fails_update_and_increment() {
    let fixture = Fixture::new(catalog()).await;
    let (engine, mut rx) = fixture.engine();

    engine.add_product(ProductId::new(1)).await.unwrap();
    fixture.server.api.set_stock_down(true);

    let err = engine.add_product(ProductId::new(1)).await.unwrap_err();
    assert!(matches!(err, CartError::AddFailed { .. }));
    assert_eq!(rx.try_recv().unwrap(), Notice::AddFailed);

    let err = engine
        .update_product_amount(ProductId::new(1), 2)
        .await
        .unwrap_err();
    assert!(matches!(err, CartError::UpdateFailed { .. }));
    assert_eq!(rx.try_recv().unwrap(), Notice::UpdateFailed);

    // Removal never needs the stock service
    engine.remove_product(ProductId::new(1)).await.unwrap();
    assert!(engine.cart().is_empty());
    assert_eq!(fixture.stored(), Value::Array(Vec::new()));
}

#[tokio::test]
async fn test_remove_missing_product() {
    let fixture = Fixture::new(catalog()).await;
    let (engine, mut rx) = fixture.engine();

    let err = engine.remove_product(ProductId::new(1)).await.unwrap_err();

    assert!(matches!(err, CartError::RemoveMissing(_)));
    assert_eq!(rx.try_recv().unwrap(), Notice::RemoveFailed);
    assert_eq!(fixture.server.api.stock_requests(), 0);
}

#[tokio::test]
async fn test_corrupt_store_starts_empty_and_recovers() {
    let fixture = Fixture::new(catalog()).await;
    std::fs::write(fixture.store_path().join("storage.json"), "not json at all").unwrap();

    let (engine, _rx) = fixture.engine();
    assert!(engine.cart().is_empty());

    engine.add_product(ProductId::new(1)).await.unwrap();
    assert_eq!(fixture.stored()[0]["id"], 1);
}

#[tokio::test]
async fn test_subscriber_sees_committed_carts() {
    let fixture = Fixture::new(catalog()).await;
    let (engine, _rx) = fixture.engine();
    let mut changes = engine.subscribe();

    engine.add_product(ProductId::new(1)).await.unwrap();
    changes.changed().await.unwrap();
    assert_eq!(changes.borrow_and_update().total_units(), 1);

    // A rejected mutation publishes nothing
    engine.add_product(ProductId::new(9)).await.unwrap_err();
    assert!(!changes.has_changed().unwrap());
}

#[tokio::test]
async fn test_concurrent_adds_respect_stock() {
    let fixture = Fixture::new(catalog()).await;
    let (engine, _rx) = fixture.engine();

    let tasks: Vec<_> = (0..5)
        .map(|_| {
            let engine = engine.clone();
            tokio::spawn(async move { engine.add_product(ProductId::new(1)).await })
        })
        .collect();

    let mut committed = 0;
    for task in tasks {
        if task.await.unwrap().is_ok() {
            committed += 1;
        }
    }

    assert_eq!(committed, 3);
    assert_eq!(engine.cart().line(ProductId::new(1)).unwrap().amount, 3);
    assert_eq!(fixture.stored()[0]["amount"], 3);
}
