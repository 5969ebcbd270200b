//! RocketShoes cart library.
//!
//! Holds the shopping cart in memory, validates every mutation against the
//! stock service, and keeps a durable copy in a key-value store.
//!
//! # Architecture
//!
//! - [`engine::CartEngine`] owns the canonical cart and is the only mutation
//!   path (add, remove, update quantity)
//! - [`api`] defines the stock and catalog collaborators and an HTTP client
//!   implementing both
//! - [`store`] persists the serialized cart under one fixed key
//! - [`notifier`] surfaces user-visible messages for rejected mutations
//!
//! # Example
//!
//! ```rust,ignore
//! use rocketshoes_cart::{CartConfig, CartEngine, notifier::TracingNotifier};
//!
//! let config = CartConfig::from_env()?;
//! let engine = CartEngine::from_config(&config, Arc::new(TracingNotifier))?;
//!
//! engine.add_product(ProductId::new(1)).await?;
//! engine.update_product_amount(ProductId::new(1), 3).await?;
//! println!("{} units", engine.cart().total_units());
//! ```

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod api;
pub mod config;
pub mod engine;
pub mod error;
pub mod notifier;
pub mod store;

pub use config::{ApiConfig, CartConfig, ConfigError};
pub use engine::{CartEngine, Outcome};
pub use error::{CartError, ErrorKind, Notice};
