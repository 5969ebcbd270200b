//! Cart mutation errors and the user-visible notices they map to.
//!
//! Every failed mutation produces exactly one [`CartError`]. The engine logs
//! it, hands its [`Notice`] to the configured notifier, and returns it to the
//! caller. None of these errors is fatal: the cart and the store keep their
//! previous state.

use core::fmt;

use rocketshoes_core::ProductId;
use thiserror::Error;

use crate::api::ApiError;
use crate::store::StoreError;

/// Error category of a failed mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// The requested quantity exceeds available stock.
    Validation,
    /// The product is not in the cart.
    NotFound,
    /// The stock service or catalog could not be reached or answered badly.
    Collaborator,
    /// The new cart could not be written to the persistent store.
    Storage,
}

/// User-facing message category for a failed mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Notice {
    OutOfStock,
    AddFailed,
    RemoveFailed,
    UpdateFailed,
    SaveFailed,
}

impl Notice {
    /// Message shown to the user.
    #[must_use]
    pub const fn message(self) -> &'static str {
        match self {
            Self::OutOfStock => "Requested quantity is out of stock",
            Self::AddFailed => "Failed to add product",
            Self::RemoveFailed => "Failed to remove product",
            Self::UpdateFailed => "Failed to update product quantity",
            Self::SaveFailed => "Failed to save cart",
        }
    }
}

impl fmt::Display for Notice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.message())
    }
}

/// Error returned by cart mutations.
#[derive(Debug, Error)]
pub enum CartError {
    /// Stock cannot cover the requested quantity.
    #[error("Requested {requested} of product {product_id}, only {available} in stock")]
    OutOfStock {
        product_id: ProductId,
        requested: u32,
        available: u32,
    },

    /// Stock or catalog lookup failed while adding.
    #[error("Failed to add product {product_id}: {source}")]
    AddFailed {
        product_id: ProductId,
        #[source]
        source: ApiError,
    },

    /// Removal of a product that is not in the cart.
    #[error("Product {0} is not in the cart")]
    RemoveMissing(ProductId),

    /// Quantity update of a product that is not in the cart.
    #[error("Product {0} is not in the cart")]
    UpdateMissing(ProductId),

    /// Stock lookup failed while updating a quantity.
    #[error("Failed to check stock for product {product_id}: {source}")]
    UpdateFailed {
        product_id: ProductId,
        #[source]
        source: ApiError,
    },

    /// Persisting the new cart failed; the previous cart is kept.
    #[error("Failed to persist cart: {0}")]
    Storage(#[from] StoreError),
}

impl CartError {
    /// Error category.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::OutOfStock { .. } => ErrorKind::Validation,
            Self::RemoveMissing(_) | Self::UpdateMissing(_) => ErrorKind::NotFound,
            Self::AddFailed { .. } | Self::UpdateFailed { .. } => ErrorKind::Collaborator,
            Self::Storage(_) => ErrorKind::Storage,
        }
    }

    /// User-facing message category.
    #[must_use]
    pub const fn notice(&self) -> Notice {
        match self {
            Self::OutOfStock { .. } => Notice::OutOfStock,
            Self::AddFailed { .. } => Notice::AddFailed,
            Self::RemoveMissing(_) => Notice::RemoveFailed,
            Self::UpdateMissing(_) | Self::UpdateFailed { .. } => Notice::UpdateFailed,
            Self::Storage(_) => Notice::SaveFailed,
        }
    }

    /// Product the failed mutation targeted, if any.
    #[must_use]
    pub const fn product_id(&self) -> Option<ProductId> {
        match self {
            Self::OutOfStock { product_id, .. }
            | Self::AddFailed { product_id, .. }
            | Self::UpdateFailed { product_id, .. }
            | Self::RemoveMissing(product_id)
            | Self::UpdateMissing(product_id) => Some(*product_id),
            Self::Storage(_) => None,
        }
    }
}

/// Result type alias for `CartError`.
pub type Result<T> = std::result::Result<T, CartError>;
