//! Persistence seam between the checkout workflow and a storage backend.
//!
//! `caisse-db` implements both traits on its `Database` handle; tests use
//! in-memory fakes.

use async_trait::async_trait;

use crate::error::StoreError;
use crate::selection::Scope;
use crate::types::{Product, Sale};

/// Source of the products sellable in a scope.
#[async_trait]
pub trait CatalogSource: Send + Sync {
    /// Active products visible for `scope`, ordered by name.
    async fn products_for(&self, scope: &Scope) -> Result<Vec<Product>, StoreError>;
}

/// Durable storage for completed sales.
#[async_trait]
pub trait SaleStore: Send + Sync {
    /// Stores a sale with its lines atomically and returns it as stored.
    async fn create_sale(&self, sale: &Sale) -> Result<Sale, StoreError>;
}
