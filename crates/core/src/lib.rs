//! RocketShoes Core - Shared cart types.
//!
//! This crate provides the types used across all RocketShoes components:
//! - `cart` - Cart state engine, collaborator clients and persistent stores
//! - `cli` - Command-line front end for inspecting and mutating the cart
//!
//! # Architecture
//!
//! The core crate contains only types and pure transitions - no I/O, no
//! storage access, no HTTP clients. This keeps it lightweight and allows it
//! to be used anywhere.
//!
//! # Modules
//!
//! - [`types`] - Product IDs, prices, cart lines, carts and stock quotes

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
