//! Stock availability quotes.

use serde::{Deserialize, Serialize};

use super::id::ProductId;

/// Available quantity of a product, as reported by the stock service.
///
/// Quotes are transient: fetch one per validation and drop it afterwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockQuote {
    /// Product the quote applies to.
    pub id: ProductId,
    /// Units currently available.
    pub amount: u32,
}

impl StockQuote {
    /// Whether `requested` units fit within the available stock.
    #[must_use]
    pub const fn covers(&self, requested: u32) -> bool {
        requested <= self.amount
    }
}
