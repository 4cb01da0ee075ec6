//! In-memory store backend.
//!
//! Holds one [`StoreFixture`] per store and serves all three collaborator
//! traits from it. Used by the CLI and by tests.

use crate::catalog::CatalogSnapshot;
use crate::discount::{Coupon, DiscountRule};
use crate::error::{FixtureError, PricingError};
use crate::ids::{ProductId, StoreId};
use crate::pricing::ShippingPolicy;
use crate::service::{CatalogReader, DiscountSource, ShippingSettings};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Everything known about one store.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StoreFixture {
    /// Storefront slug, used for cart storage keys.
    #[serde(default)]
    pub slug: String,
    pub catalog: CatalogSnapshot,
    #[serde(default)]
    pub rules: Vec<DiscountRule>,
    #[serde(default)]
    pub coupons: Vec<Coupon>,
    /// Store shipping settings. Falls back to the backend default.
    #[serde(default)]
    pub shipping: Option<ShippingPolicy>,
}

impl StoreFixture {
    pub fn new(catalog: CatalogSnapshot) -> Self {
        Self {
            slug: catalog.store_id.to_string(),
            catalog,
            ..Default::default()
        }
    }

    /// Parse and validate a fixture.
    pub fn from_json(json: &str) -> Result<Self, FixtureError> {
        let fixture: Self = serde_json::from_str(json)?;
        fixture.validate().map_err(|source| FixtureError::Invalid {
            store: fixture.store_id().to_string(),
            source,
        })?;
        Ok(fixture)
    }

    /// Check the catalog, every rule and coupon, and the shipping settings.
    pub fn validate(&self) -> Result<(), PricingError> {
        self.catalog.validate()?;
        for rule in &self.rules {
            rule.terms.validate(rule.id.as_str())?;
        }
        for coupon in &self.coupons {
            coupon.terms.validate(coupon.id.as_str())?;
        }
        if let Some(policy) = &self.shipping {
            policy.validate()?;
        }
        Ok(())
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    pub fn store_id(&self) -> &StoreId {
        &self.catalog.store_id
    }
}

/// Backend over in-memory fixtures.
#[derive(Debug, Clone, Default)]
pub struct InMemoryStore {
    stores: BTreeMap<StoreId, StoreFixture>,
    default_shipping: ShippingPolicy,
}

impl InMemoryStore {
    /// Create an empty backend.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_fixture(mut self, fixture: StoreFixture) -> Self {
        self.insert_fixture(fixture);
        self
    }

    pub fn insert_fixture(&mut self, fixture: StoreFixture) {
        self.stores.insert(fixture.store_id().clone(), fixture);
    }

    /// Replace a store's catalog, keeping its rules and coupons.
    pub fn with_snapshot(mut self, snapshot: CatalogSnapshot) -> Self {
        let store = snapshot.store_id.clone();
        match self.stores.get_mut(&store) {
            Some(fixture) => fixture.catalog = snapshot,
            None => self.insert_fixture(StoreFixture::new(snapshot)),
        }
        self
    }

    pub fn with_rule(mut self, store: impl Into<StoreId>, rule: DiscountRule) -> Self {
        self.fixture_mut(store.into()).rules.push(rule);
        self
    }

    pub fn with_coupon(mut self, store: impl Into<StoreId>, coupon: Coupon) -> Self {
        self.fixture_mut(store.into()).coupons.push(coupon);
        self
    }

    pub fn with_shipping(mut self, store: impl Into<StoreId>, policy: ShippingPolicy) -> Self {
        self.fixture_mut(store.into()).shipping = Some(policy);
        self
    }

    /// Shipping for stores without their own settings.
    pub fn with_default_shipping(mut self, policy: ShippingPolicy) -> Self {
        self.default_shipping = policy;
        self
    }

    pub fn fixture(&self, store: &StoreId) -> Option<&StoreFixture> {
        self.stores.get(store)
    }

    /// Look up a store by id or slug.
    pub fn find_store(&self, key: &str) -> Option<&StoreFixture> {
        self.stores
            .values()
            .find(|f| f.store_id().as_str() == key || f.slug == key)
    }

    pub fn stores(&self) -> impl Iterator<Item = &StoreFixture> {
        self.stores.values()
    }

    fn fixture_mut(&mut self, store: StoreId) -> &mut StoreFixture {
        self.stores
            .entry(store.clone())
            .or_insert_with(|| StoreFixture::new(CatalogSnapshot::new(store, 0)))
    }

    fn require(&self, store: &StoreId, collaborator: &'static str) -> Result<&StoreFixture, PricingError> {
        self.stores
            .get(store)
            .ok_or_else(|| PricingError::CollaboratorFailed {
                collaborator,
                message: format!("unknown store {}", store),
            })
    }
}

#[async_trait]
impl CatalogReader for InMemoryStore {
    async fn snapshot(
        &self,
        store: &StoreId,
        products: &[ProductId],
    ) -> Result<CatalogSnapshot, PricingError> {
        let fixture = self.require(store, "catalog")?;
        Ok(fixture.catalog.restricted_to(products))
    }
}

#[async_trait]
impl DiscountSource for InMemoryStore {
    async fn active_rules(
        &self,
        store: &StoreId,
        at: i64,
    ) -> Result<Vec<DiscountRule>, PricingError> {
        let fixture = self.require(store, "discounts")?;
        Ok(fixture
            .rules
            .iter()
            .filter(|r| r.terms.is_live(at))
            .cloned()
            .collect())
    }

    async fn coupon_by_code(
        &self,
        store: &StoreId,
        code: &str,
    ) -> Result<Option<Coupon>, PricingError> {
        let fixture = self.require(store, "discounts")?;
        Ok(fixture.coupons.iter().find(|c| c.matches_code(code)).cloned())
    }
}

#[async_trait]
impl ShippingSettings for InMemoryStore {
    async fn shipping_policy(&self, store: &StoreId) -> Result<ShippingPolicy, PricingError> {
        let fixture = self.require(store, "shipping")?;
        Ok(fixture.shipping.unwrap_or(self.default_shipping))
    }
}
