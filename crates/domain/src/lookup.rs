//! Read-only collaborator interfaces and an in-memory implementation.
//!
//! Store, product and promo data are owned by other subsystems. The checkout
//! core only reads them through these traits.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;

use crate::{
    CommerceError, ProductDetail, ProductId, StoreId, StoreProfile, VendorPromo, VendorSummary,
};

/// Product catalog reads.
#[async_trait]
pub trait ProductLookup: Send + Sync {
    /// Loads a product with its inventory snapshot, volume tiers and owning vendor.
    async fn get_product_detail(
        &self,
        product_id: ProductId,
    ) -> Result<Option<(ProductDetail, VendorSummary)>, CommerceError>;
}

/// Store (buyer and vendor) reads.
#[async_trait]
pub trait StoreLookup: Send + Sync {
    async fn get_by_id(&self, store_id: StoreId) -> Result<Option<StoreProfile>, CommerceError>;
}

/// Vendor promo code reads.
#[async_trait]
pub trait PromoLookup: Send + Sync {
    async fn get_vendor_promo(
        &self,
        vendor_id: StoreId,
        code: &str,
    ) -> Result<Option<VendorPromo>, CommerceError>;
}

#[derive(Debug, Default)]
struct CatalogState {
    stores: HashMap<StoreId, StoreProfile>,
    products: HashMap<ProductId, ProductDetail>,
    promos: HashMap<(StoreId, String), VendorPromo>,
    store_reads: HashMap<StoreId, usize>,
    fail_reads: bool,
}

/// In-memory catalog implementing every lookup, for tests and the demo server.
#[derive(Debug, Clone, Default)]
pub struct InMemoryCatalog {
    state: Arc<RwLock<CatalogState>>,
}

#[derive(Debug, thiserror::Error)]
#[error("catalog unavailable")]
struct CatalogUnavailable;

impl InMemoryCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_store(&self, store: StoreProfile) {
        self.write().stores.insert(store.id, store);
    }

    pub fn insert_product(&self, product: ProductDetail) {
        self.write().products.insert(product.id, product);
    }

    pub fn insert_promo(&self, promo: VendorPromo) {
        self.write()
            .promos
            .insert((promo.vendor_id, promo.code.clone()), promo);
    }

    /// Updates a product in place; does nothing if it is unknown.
    pub fn update_product(&self, product_id: ProductId, f: impl FnOnce(&mut ProductDetail)) {
        if let Some(product) = self.write().products.get_mut(&product_id) {
            f(product);
        }
    }

    /// Returns how many times a store was looked up.
    pub fn store_reads(&self, store_id: StoreId) -> usize {
        self.read().store_reads.get(&store_id).copied().unwrap_or(0)
    }

    /// Makes every subsequent lookup fail with a dependency error.
    pub fn set_fail_reads(&self, fail: bool) {
        self.write().fail_reads = fail;
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, CatalogState> {
        self.state.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, CatalogState> {
        self.state.write().unwrap_or_else(|e| e.into_inner())
    }

    fn check_available(&self) -> Result<(), CommerceError> {
        if self.read().fail_reads {
            return Err(CommerceError::dependency("catalog lookup", CatalogUnavailable));
        }
        Ok(())
    }
}

#[async_trait]
impl ProductLookup for InMemoryCatalog {
    async fn get_product_detail(
        &self,
        product_id: ProductId,
    ) -> Result<Option<(ProductDetail, VendorSummary)>, CommerceError> {
        self.check_available()?;
        let state = self.read();
        Ok(state.products.get(&product_id).map(|product| {
            let vendor_name = state
                .stores
                .get(&product.vendor_id)
                .map(|s| s.name.clone())
                .unwrap_or_default();
            (
                product.clone(),
                VendorSummary {
                    id: product.vendor_id,
                    name: vendor_name,
                },
            )
        }))
    }
}

#[async_trait]
impl StoreLookup for InMemoryCatalog {
    async fn get_by_id(&self, store_id: StoreId) -> Result<Option<StoreProfile>, CommerceError> {
        self.check_available()?;
        let mut state = self.write();
        *state.store_reads.entry(store_id).or_default() += 1;
        Ok(state.stores.get(&store_id).cloned())
    }
}

#[async_trait]
impl PromoLookup for InMemoryCatalog {
    async fn get_vendor_promo(
        &self,
        vendor_id: StoreId,
        code: &str,
    ) -> Result<Option<VendorPromo>, CommerceError> {
        self.check_available()?;
        Ok(self
            .read()
            .promos
            .get(&(vendor_id, code.to_string()))
            .cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{KycStatus, Money, StoreType};

    fn store() -> StoreProfile {
        StoreProfile {
            id: StoreId::new(),
            name: "Vendor".to_string(),
            store_type: StoreType::Vendor,
            kyc_status: KycStatus::Verified,
            subscription_active: true,
            address: None,
        }
    }

    #[tokio::test]
    async fn product_lookup_includes_vendor_summary() {
        let catalog = InMemoryCatalog::new();
        let vendor = store();
        let product = ProductDetail {
            id: ProductId::new(),
            vendor_id: vendor.id,
            name: "Widget".to_string(),
            base_price: Money::from_cents(1000),
            moq: 1,
            max_qty: None,
            is_active: true,
            available_qty: 10,
            volume_tiers: Vec::new(),
        };
        catalog.insert_store(vendor.clone());
        catalog.insert_product(product.clone());

        let (found, summary) = catalog.get_product_detail(product.id).await.unwrap().unwrap();
        assert_eq!(found, product);
        assert_eq!(summary.id, vendor.id);
        assert_eq!(summary.name, "Vendor");
    }

    #[tokio::test]
    async fn store_reads_are_counted() {
        let catalog = InMemoryCatalog::new();
        let vendor = store();
        catalog.insert_store(vendor.clone());

        catalog.get_by_id(vendor.id).await.unwrap();
        catalog.get_by_id(vendor.id).await.unwrap();
        assert_eq!(catalog.store_reads(vendor.id), 2);
    }

    #[tokio::test]
    async fn failing_catalog_returns_dependency_error() {
        let catalog = InMemoryCatalog::new();
        catalog.set_fail_reads(true);

        let result = catalog.get_by_id(StoreId::new()).await;
        assert!(matches!(result, Err(CommerceError::Dependency { .. })));
    }
}
