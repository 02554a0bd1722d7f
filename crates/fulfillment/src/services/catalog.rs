//! Catalog directory and stock ledger traits with an in-memory implementation.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use domain::booking::ProductId;

use crate::error::FulfillmentError;

/// Trait for looking products up before intake.
#[async_trait]
pub trait CatalogDirectory: Send + Sync {
    /// Returns true if the product exists in the catalog.
    async fn exists(&self, product_id: &ProductId) -> Result<bool, FulfillmentError>;
}

/// Trait for adjusting stock levels after fulfillment.
#[async_trait]
pub trait StockLedger: Send + Sync {
    /// Decrements stock for a product and returns the new level.
    ///
    /// Levels floor at zero; decrementing below zero records zero.
    async fn decrement(
        &self,
        product_id: &ProductId,
        quantity: u32,
    ) -> Result<u32, FulfillmentError>;
}

#[derive(Debug, Default)]
struct InMemoryCatalogState {
    stock: HashMap<ProductId, u32>,
}

/// In-memory catalog backed by a stock map, for tests and the default
/// server wiring.
#[derive(Debug, Clone, Default)]
pub struct InMemoryCatalog {
    state: Arc<RwLock<InMemoryCatalogState>>,
}

impl InMemoryCatalog {
    /// Creates an empty catalog.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a product with the given stock level.
    pub fn with_product(self, product_id: impl Into<ProductId>, stock: u32) -> Self {
        self.set_stock(product_id, stock);
        self
    }

    /// Sets the stock level for a product, inserting it if absent.
    pub fn set_stock(&self, product_id: impl Into<ProductId>, stock: u32) {
        self.state
            .write()
            .unwrap()
            .stock
            .insert(product_id.into(), stock);
    }

    /// Returns the current stock level, or None if the product is unknown.
    pub fn stock_level(&self, product_id: &ProductId) -> Option<u32> {
        self.state.read().unwrap().stock.get(product_id).copied()
    }
}

#[async_trait]
impl CatalogDirectory for InMemoryCatalog {
    async fn exists(&self, product_id: &ProductId) -> Result<bool, FulfillmentError> {
        Ok(self.state.read().unwrap().stock.contains_key(product_id))
    }
}

#[async_trait]
impl StockLedger for InMemoryCatalog {
    async fn decrement(
        &self,
        product_id: &ProductId,
        quantity: u32,
    ) -> Result<u32, FulfillmentError> {
        let mut state = self.state.write().unwrap();
        let level = state.stock.entry(product_id.clone()).or_insert(0);
        *level = level.saturating_sub(quantity);
        Ok(*level)
    }
}
