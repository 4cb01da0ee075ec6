//! Availability lookups.

use anyhow::{bail, Result};
use serde::Serialize;
use storefront_pricing::catalog::{Availability, AvailabilityCalculator, Product};
use storefront_pricing::{ProductId, VariantId};

use super::{select_store, AvailabilityArgs};
use crate::context::Context;
use crate::output::availability_badge;

#[derive(Serialize)]
struct AvailabilityRow {
    product_id: ProductId,
    #[serde(skip_serializing_if = "Option::is_none")]
    variant_id: Option<VariantId>,
    name: String,
    bundle: bool,
    available: Availability,
    #[serde(skip_serializing_if = "Option::is_none")]
    can_add: Option<bool>,
}

/// Run the availability command.
pub async fn run(args: AvailabilityArgs, ctx: &Context) -> Result<()> {
    if args.variant.is_some() && args.product.is_none() {
        bail!("--variant needs a product");
    }
    if let Some(qty) = args.quantity {
        if qty <= 0 {
            bail!("--quantity must be at least 1");
        }
    }

    let service = ctx.service(args.fixture.as_deref())?;
    let fixture = select_store(service.backend(), args.store.as_deref())?;
    let store_id = fixture.store_id().clone();

    let rows = match &args.product {
        Some(product) => {
            let product_id = ProductId::new(product.as_str());
            let variant_id = args.variant.as_deref().map(VariantId::new);
            let available = service
                .availability(&store_id, &product_id, variant_id.as_ref())
                .await?;
            let entry = fixture.catalog.product(&product_id)?;
            vec![row(entry, variant_id, available, args.quantity)]
        }
        None => {
            let calculator = AvailabilityCalculator::new(service.config().untracked_inventory);
            let mut rows = Vec::new();
            for bundle in fixture.catalog.products().filter(|p| p.is_bundle()) {
                let available = calculator.compute_bundle_availability(bundle, &fixture.catalog)?;
                rows.push(row(bundle, None, available, args.quantity));
            }
            rows
        }
    };

    if ctx.output.is_json() {
        ctx.output.json(&rows);
        return Ok(());
    }

    ctx.output.header(&format!("Availability in {}", fixture.slug));
    if rows.is_empty() {
        ctx.output.info("No bundles in this store");
        return Ok(());
    }

    let widths = [20, 24, 12, 8];
    ctx.output.table_row(&["PRODUCT", "NAME", "AVAILABLE", "ADD?"], &widths);
    for r in &rows {
        let id = match &r.variant_id {
            Some(v) => format!("{}:{}", r.product_id, v),
            None => r.product_id.to_string(),
        };
        let badge = availability_badge(r.available, args.quantity);
        let can_add = match r.can_add {
            Some(true) => "yes",
            Some(false) => "no",
            None => "-",
        };
        ctx.output
            .table_row(&[id.as_str(), r.name.as_str(), badge.as_str(), can_add], &widths);
    }
    Ok(())
}

fn row(
    product: &Product,
    variant_id: Option<VariantId>,
    available: Availability,
    quantity: Option<i64>,
) -> AvailabilityRow {
    AvailabilityRow {
        product_id: product.id.clone(),
        variant_id,
        name: product.name.clone(),
        bundle: product.is_bundle(),
        available,
        can_add: quantity.map(|q| u64::try_from(q).is_ok_and(|q| available.covers(q))),
    }
}
