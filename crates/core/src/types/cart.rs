//! Cart lines, carts, and the pure transitions between cart snapshots.
//!
//! A [`Cart`] is an ordered sequence of [`CartLine`]s holding at most one line
//! per product. Transitions never mutate a cart in place: each returns a new
//! cart, so a snapshot handed out to a reader stays valid after the next
//! mutation.

use std::num::NonZeroU32;

use serde::{Deserialize, Serialize};

use super::id::ProductId;
use super::price::Price;

/// Product metadata as returned by the catalog.
///
/// Accepts both the `name`/`imageUrl` field names and the `title`/`image`
/// names used by older catalog payloads.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: ProductId,
    #[serde(alias = "title")]
    pub name: String,
    pub price: Price,
    #[serde(alias = "image")]
    pub image_url: String,
}

/// One product entry in the cart with its requested quantity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartLine {
    /// Catalog product this line refers to.
    #[serde(rename = "id")]
    pub product_id: ProductId,
    /// Display name.
    #[serde(alias = "title")]
    pub name: String,
    /// Unit price at the time the product was added.
    pub price: Price,
    /// Product image URL.
    #[serde(alias = "image")]
    pub image_url: String,
    /// Requested quantity (always at least 1 inside a [`Cart`]).
    pub amount: u32,
}

impl CartLine {
    /// Build a line for a catalog product.
    #[must_use]
    pub fn from_product(product: Product, amount: NonZeroU32) -> Self {
        Self {
            product_id: product.id,
            name: product.name,
            price: product.price,
            image_url: product.image_url,
            amount: amount.get(),
        }
    }
}

/// The ordered collection of product lines a user intends to purchase.
///
/// Serialized transparently as a JSON array of lines.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Cart {
    lines: Vec<CartLine>,
}

impl Cart {
    /// Create an empty cart.
    #[must_use]
    pub const fn new() -> Self {
        Self { lines: Vec::new() }
    }

    /// Build a cart from stored lines, enforcing the cart invariants.
    ///
    /// Lines with a zero amount are dropped, as are repeated product IDs
    /// (the first occurrence wins). Returns the cart and the number of lines
    /// that were dropped.
    #[must_use]
    pub fn sanitized(lines: Vec<CartLine>) -> (Self, usize) {
        let total = lines.len();
        let mut kept: Vec<CartLine> = Vec::with_capacity(total);

        for line in lines {
            if line.amount == 0 || kept.iter().any(|l| l.product_id == line.product_id) {
                continue;
            }
            kept.push(line);
        }

        let dropped = total - kept.len();
        (Self { lines: kept }, dropped)
    }

    /// All lines in insertion order.
    #[must_use]
    pub fn lines(&self) -> &[CartLine] {
        &self.lines
    }

    /// Iterate over the lines in insertion order.
    pub fn iter(&self) -> std::slice::Iter<'_, CartLine> {
        self.lines.iter()
    }

    /// Number of distinct products in the cart.
    #[must_use]
    pub fn len(&self) -> usize {
        self.lines.len()
    }

    /// Whether the cart has no lines.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// The line for a product, if present.
    #[must_use]
    pub fn line(&self, product_id: ProductId) -> Option<&CartLine> {
        self.lines.iter().find(|l| l.product_id == product_id)
    }

    /// Whether the cart holds a line for this product.
    #[must_use]
    pub fn contains(&self, product_id: ProductId) -> bool {
        self.line(product_id).is_some()
    }

    /// Total number of units across all lines.
    #[must_use]
    pub fn total_units(&self) -> u64 {
        self.lines.iter().map(|l| u64::from(l.amount)).sum()
    }

    /// Returns a cart with `line` appended.
    ///
    /// If the cart already holds a line for the same product, that line is
    /// replaced in place instead, so a cart never carries duplicates.
    #[must_use]
    pub fn with_line(&self, line: CartLine) -> Self {
        let mut lines = self.lines.clone();
        match lines.iter_mut().find(|l| l.product_id == line.product_id) {
            Some(existing) => *existing = line,
            None => lines.push(line),
        }
        Self { lines }
    }

    /// Returns a cart with the product's amount replaced, or `None` if the
    /// product is not in the cart.
    #[must_use]
    pub fn with_amount(&self, product_id: ProductId, amount: NonZeroU32) -> Option<Self> {
        let mut lines = self.lines.clone();
        let line = lines.iter_mut().find(|l| l.product_id == product_id)?;
        line.amount = amount.get();
        Some(Self { lines })
    }

    /// Returns a cart without the product's line, or `None` if the product is
    /// not in the cart.
    #[must_use]
    pub fn without(&self, product_id: ProductId) -> Option<Self> {
        let position = self.lines.iter().position(|l| l.product_id == product_id)?;
        let mut lines = self.lines.clone();
        lines.remove(position);
        Some(Self { lines })
    }
}

impl<'a> IntoIterator for &'a Cart {
    type Item = &'a CartLine;
    type IntoIter = std::slice::Iter<'a, CartLine>;

    fn into_iter(self) -> Self::IntoIter {
        self.lines.iter()
    }
}
