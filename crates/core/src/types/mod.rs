//! Core types for RocketShoes.
//!
//! This module provides type-safe wrappers for the cart domain.

pub mod cart;
pub mod id;
pub mod price;
pub mod stock;

pub use cart::{Cart, CartLine, Product};
pub use id::*;
pub use price::Price;
pub use stock::StockQuote;
