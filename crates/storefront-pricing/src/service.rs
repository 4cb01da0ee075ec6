//! Collaborator seams and the pricing pipeline.
//!
//! A computation gathers its inputs from the collaborators once, then runs
//! [`price_cart`], which is pure: identical inputs give identical output.

use crate::cart::PricedLine;
use crate::catalog::{Availability, AvailabilityCalculator, CatalogSnapshot, UntrackedInventory};
use crate::discount::{Coupon, CouponBasis, DiscountEngine, DiscountInput, DiscountRule};
use crate::error::PricingError;
use crate::ids::{ProductId, StoreId, VariantId};
use crate::money::{Currency, Money};
use crate::pricing::{aggregate, CartBreakdown, LineAvailability, ShippingPolicy};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, info_span, warn, Instrument};

/// Catalog and inventory read model.
#[async_trait]
pub trait CatalogReader: Send + Sync {
    /// Consistent snapshot holding the requested products, their variants
    /// and the components of any bundle among them.
    async fn snapshot(
        &self,
        store: &StoreId,
        products: &[ProductId],
    ) -> Result<CatalogSnapshot, PricingError>;
}

/// Store of automatic rules and coupons.
#[async_trait]
pub trait DiscountSource: Send + Sync {
    /// Rules to consider at `at`. Window checks are repeated by the engine.
    async fn active_rules(&self, store: &StoreId, at: i64)
        -> Result<Vec<DiscountRule>, PricingError>;

    /// Coupon for a code, compared after normalization.
    async fn coupon_by_code(
        &self,
        store: &StoreId,
        code: &str,
    ) -> Result<Option<Coupon>, PricingError>;
}

/// Per-store shipping settings.
#[async_trait]
pub trait ShippingSettings: Send + Sync {
    async fn shipping_policy(&self, store: &StoreId) -> Result<ShippingPolicy, PricingError>;
}

/// Everything a [`PricingService`] reads from.
pub trait StoreBackend: CatalogReader + DiscountSource + ShippingSettings {}

impl<T: CatalogReader + DiscountSource + ShippingSettings> StoreBackend for T {}

/// Engine policies.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub untracked_inventory: UntrackedInventory,
    pub coupon_basis: CouponBasis,
}

/// One line of a compute request.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RequestLine {
    pub product_id: ProductId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub variant_id: Option<VariantId>,
    pub quantity: i64,
    /// Price captured at add time. Read from the catalog when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit_price: Option<Money>,
}

impl RequestLine {
    pub fn new(product_id: impl Into<ProductId>, quantity: i64) -> Self {
        Self {
            product_id: product_id.into(),
            variant_id: None,
            quantity,
            unit_price: None,
        }
    }

    pub fn with_variant(mut self, variant_id: impl Into<VariantId>) -> Self {
        self.variant_id = Some(variant_id.into());
        self
    }

    pub fn at_price(mut self, unit_price: Money) -> Self {
        self.unit_price = Some(unit_price);
        self
    }
}

/// A request to price a cart.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ComputeRequest {
    /// Sequence number; only the latest result is kept.
    #[serde(default)]
    pub seq: u64,
    pub store_id: StoreId,
    #[serde(default)]
    pub currency: Currency,
    pub lines: Vec<RequestLine>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub coupon_code: Option<String>,
    /// Evaluation time for every active-window check (Unix seconds).
    pub evaluated_at: i64,
}

impl ComputeRequest {
    pub fn new(store_id: impl Into<StoreId>, evaluated_at: i64) -> Self {
        Self {
            seq: 0,
            store_id: store_id.into(),
            currency: Currency::default(),
            lines: Vec::new(),
            coupon_code: None,
            evaluated_at,
        }
    }

    pub fn with_line(mut self, line: RequestLine) -> Self {
        self.lines.push(line);
        self
    }

    pub fn with_coupon(mut self, code: impl Into<String>) -> Self {
        self.coupon_code = Some(code.into());
        self
    }

    pub fn with_seq(mut self, seq: u64) -> Self {
        self.seq = seq;
        self
    }

    /// Distinct products referenced by the request.
    pub fn product_ids(&self) -> Vec<ProductId> {
        let mut ids: Vec<ProductId> = self.lines.iter().map(|l| l.product_id.clone()).collect();
        ids.sort();
        ids.dedup();
        ids
    }
}

/// Price a cart from already-fetched inputs.
///
/// Any catalog inconsistency aborts the computation; coupon problems are
/// reported on the breakdown.
pub fn price_cart(
    config: &EngineConfig,
    request: &ComputeRequest,
    snapshot: &CatalogSnapshot,
    rules: &[DiscountRule],
    coupon: Option<&Coupon>,
    shipping: &ShippingPolicy,
) -> Result<CartBreakdown, PricingError> {
    let calculator = AvailabilityCalculator::new(config.untracked_inventory);
    let mut priced = Vec::with_capacity(request.lines.len());
    let mut availability = Vec::with_capacity(request.lines.len());

    for line in &request.lines {
        if line.quantity <= 0 {
            return Err(PricingError::InvalidLine {
                product: line.product_id.to_string(),
                reason: format!("quantity {} is not positive", line.quantity),
            });
        }

        let product = snapshot.product(&line.product_id)?;
        let unit_price = match line.unit_price {
            Some(price) => {
                // Variant must still exist even when the price was captured earlier.
                if let Some(vid) = &line.variant_id {
                    snapshot.variant_of(&product.id, vid)?;
                }
                price
            }
            None => snapshot.unit_price(&product.id, line.variant_id.as_ref())?,
        };
        if unit_price.currency != request.currency {
            return Err(PricingError::InvalidLine {
                product: product.id.to_string(),
                reason: format!(
                    "priced in {}, cart is {}",
                    unit_price.currency, request.currency
                ),
            });
        }

        let line_total = PricedLine::new(
            product.id.clone(),
            line.variant_id.clone(),
            line.quantity,
            unit_price,
            product.category_ids.clone(),
        )
        .ok_or_else(|| PricingError::overflow("line total"))?;
        priced.push(line_total);

        let available = calculator.line_availability(product, line.variant_id.as_ref(), snapshot)?;
        let report = LineAvailability::new(
            product.id.clone(),
            line.variant_id.clone(),
            line.quantity,
            available,
        );
        if !report.sufficient {
            warn!(
                product = %report.product_id,
                requested = report.requested,
                available = %report.available,
                "insufficient stock for cart line"
            );
        }
        availability.push(report);
    }

    let result = DiscountEngine::new(config.coupon_basis).evaluate(DiscountInput {
        currency: request.currency,
        lines: &priced,
        rules,
        coupon_code: request.coupon_code.as_deref(),
        coupon,
        evaluated_at: request.evaluated_at,
    })?;

    let breakdown = aggregate(result, shipping)?
        .with_line_availability(availability)
        .stamped(request.seq, snapshot.version);

    info!(
        seq = request.seq,
        store = %request.store_id,
        subtotal = %breakdown.subtotal,
        grand_total = %breakdown.grand_total,
        discounts = breakdown.applied_discounts.len(),
        "cart priced"
    );
    Ok(breakdown)
}

/// Prices carts against a store backend.
pub struct PricingService<B: StoreBackend> {
    backend: Arc<B>,
    config: EngineConfig,
}

impl<B: StoreBackend> PricingService<B> {
    /// Create a service with default policies.
    pub fn new(backend: B) -> Self {
        Self::from_shared(Arc::new(backend))
    }

    /// Create a service over a backend shared with other owners.
    pub fn from_shared(backend: Arc<B>) -> Self {
        Self {
            backend,
            config: EngineConfig::default(),
        }
    }

    pub fn with_config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Fetch inputs and price the cart.
    pub async fn compute(&self, request: &ComputeRequest) -> Result<CartBreakdown, PricingError> {
        let span = info_span!("compute", seq = request.seq, store = %request.store_id);
        async {
            let snapshot = self
                .backend
                .snapshot(&request.store_id, &request.product_ids())
                .await?;
            if snapshot.store_id != request.store_id {
                return Err(PricingError::CollaboratorFailed {
                    collaborator: "catalog",
                    message: format!(
                        "snapshot is for store {}, expected {}",
                        snapshot.store_id, request.store_id
                    ),
                });
            }

            let rules = self
                .backend
                .active_rules(&request.store_id, request.evaluated_at)
                .await?;
            let coupon = match request.coupon_code.as_deref() {
                Some(code) => {
                    self.backend
                        .coupon_by_code(&request.store_id, code)
                        .await?
                }
                None => None,
            };
            let shipping = self.backend.shipping_policy(&request.store_id).await?;

            price_cart(
                &self.config,
                request,
                &snapshot,
                &rules,
                coupon.as_ref(),
                &shipping,
            )
        }
        .instrument(span)
        .await
    }

    /// Bundle availability for one product, for "can add to cart" checks.
    pub async fn availability(
        &self,
        store: &StoreId,
        product_id: &ProductId,
        variant_id: Option<&VariantId>,
    ) -> Result<Availability, PricingError> {
        let snapshot = self
            .backend
            .snapshot(store, std::slice::from_ref(product_id))
            .await?;
        let product = snapshot.product(product_id)?;
        AvailabilityCalculator::new(self.config.untracked_inventory)
            .line_availability(product, variant_id, &snapshot)
    }
}
