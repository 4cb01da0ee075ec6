//! Cart quoting.

use std::collections::BTreeMap;

use anyhow::{anyhow, bail, Context as _, Result};
use chrono::{DateTime, Utc};
use futures::stream::{self, StreamExt};
use storefront_pricing::cart::CartSession;
use storefront_pricing::memory::{InMemoryStore, StoreFixture};
use storefront_pricing::sequence::SequenceGate;
use storefront_pricing::service::{ComputeRequest, PricingService, RequestLine};
use storefront_pricing::CartBreakdown;

use super::{select_store, QuoteArgs};
use crate::context::Context;
use crate::output::{availability_badge, coupon_message, discount_amount, Output};

/// Run the quote command.
pub async fn run(args: QuoteArgs, ctx: &Context) -> Result<()> {
    let evaluated_at = evaluation_time(args.at.as_deref())?;
    let service = ctx.service(args.fixture.as_deref())?;

    if !args.carts.is_empty() {
        if !args.items.is_empty() {
            bail!("Use either --item or --cart, not both");
        }
        return quote_sessions(&args, evaluated_at, ctx, &service).await;
    }

    if args.items.is_empty() {
        bail!("Nothing to quote. Pass --item PRODUCT=QTY or --cart FILE.");
    }

    let fixture = select_store(service.backend(), args.store.as_deref())?;
    let request = build_request(fixture, &args.items, args.coupon.as_deref(), evaluated_at)?;
    let breakdown = service.compute(&request).await?;

    if ctx.output.is_json() {
        ctx.output.json(&breakdown);
    } else {
        render(&ctx.output, &fixture.slug, &breakdown);
    }
    Ok(())
}

/// Price saved cart sessions; later files for the same cart supersede earlier ones.
async fn quote_sessions(
    args: &QuoteArgs,
    evaluated_at: i64,
    ctx: &Context,
    service: &PricingService<InMemoryStore>,
) -> Result<()> {
    let mut gates: BTreeMap<String, SequenceGate> = BTreeMap::new();
    let mut requests = Vec::with_capacity(args.carts.len());

    for path in &args.carts {
        let resolved = ctx.resolve_path(path);
        let json = std::fs::read_to_string(&resolved)
            .with_context(|| format!("Failed to read cart: {}", resolved.display()))?;
        let mut session = CartSession::from_json(&json)
            .with_context(|| format!("Invalid cart file: {}", resolved.display()))?;
        if let Some(code) = &args.coupon {
            session.apply_coupon(code);
        }

        let key = session.storage_key();
        let seq = gates.entry(key.clone()).or_default().issue();
        let index = requests.len();
        requests.push((index, path.clone(), key, session.to_request(seq, evaluated_at)));
    }

    let pb = ctx.output.progress(requests.len() as u64, "Pricing carts");
    let mut finished: Vec<(usize, String, String, u64, Result<CartBreakdown>)> =
        stream::iter(requests)
            .map(|(index, path, key, request)| {
                let pb = &pb;
                async move {
                    let result = service.compute(&request).await.map_err(anyhow::Error::from);
                    pb.inc(1);
                    (index, path, key, request.seq, result)
                }
            })
            .buffer_unordered(args.concurrency.max(1))
            .collect()
            .await;
    pb.finish_and_clear();

    // Completion order is arbitrary; report in argument order.
    finished.sort_by_key(|entry| entry.0);

    let mut failures = 0;
    let mut report = Vec::with_capacity(finished.len());
    for (_, path, key, seq, result) in finished {
        let gate = gates
            .get(&key)
            .ok_or_else(|| anyhow!("No sequence issued for {}", key))?;
        match result {
            Ok(breakdown) => match gate.accept(seq, breakdown) {
                Some(breakdown) => {
                    if !ctx.output.is_json() {
                        render(&ctx.output, &format!("{} ({})", key, path), &breakdown);
                    }
                    report.push(serde_json::json!({ "cart": path, "breakdown": breakdown }));
                }
                None => {
                    ctx.output
                        .info(&format!("{} superseded by a later file for {}", path, key));
                    report.push(serde_json::json!({ "cart": path, "superseded": true }));
                }
            },
            Err(e) => {
                failures += 1;
                ctx.output.error(&format!("{}: {:#}", path, e));
                report.push(serde_json::json!({ "cart": path, "error": format!("{:#}", e) }));
            }
        }
    }

    if ctx.output.is_json() {
        ctx.output.json(&report);
    }
    if failures > 0 {
        bail!("{} of {} cart(s) could not be priced", failures, report.len());
    }
    Ok(())
}

/// Evaluation time in Unix seconds.
fn evaluation_time(at: Option<&str>) -> Result<i64> {
    match at {
        Some(value) => DateTime::parse_from_rfc3339(value)
            .map(|dt| dt.timestamp())
            .with_context(|| format!("--at '{}' is not an RFC 3339 time", value)),
        None => Ok(Utc::now().timestamp()),
    }
}

/// Parse `product[:variant]=quantity`.
fn parse_item(item: &str) -> Result<RequestLine> {
    let (target, qty) = item
        .rsplit_once('=')
        .ok_or_else(|| anyhow!("Item '{}' must look like PRODUCT[:VARIANT]=QTY", item))?;
    let quantity: i64 = qty
        .trim()
        .parse()
        .with_context(|| format!("Item '{}' has a bad quantity", item))?;

    let (product, variant) = match target.split_once(':') {
        Some((product, variant)) => (product.trim(), Some(variant.trim())),
        None => (target.trim(), None),
    };
    if product.is_empty() {
        bail!("Item '{}' has no product id", item);
    }

    let line = RequestLine::new(product, quantity);
    Ok(match variant {
        Some(variant) if !variant.is_empty() => line.with_variant(variant),
        _ => line,
    })
}

fn build_request(
    fixture: &StoreFixture,
    items: &[String],
    coupon: Option<&str>,
    evaluated_at: i64,
) -> Result<ComputeRequest> {
    let mut request = ComputeRequest::new(fixture.store_id().clone(), evaluated_at);
    for item in items {
        request = request.with_line(parse_item(item)?);
    }

    // Cart currency follows the catalog.
    if let Some(first) = request.lines.first() {
        if let Ok(product) = fixture.catalog.product(&first.product_id) {
            request.currency = product.price.currency;
        }
    }
    if let Some(code) = coupon {
        request = request.with_coupon(code);
    }
    Ok(request)
}

fn render(output: &Output, title: &str, b: &CartBreakdown) {
    output.header(&format!("Quote for {}", title));

    if !b.line_availability.is_empty() {
        output.info("");
        output.table_row(&["PRODUCT", "VARIANT", "QTY", "AVAILABLE"], &[20, 16, 6, 12]);
        for line in &b.line_availability {
            let variant = line.variant_id.as_ref().map(|v| v.as_str()).unwrap_or("-");
            let qty = line.requested.to_string();
            let badge = availability_badge(line.available, Some(line.requested));
            output.table_row(
                &[line.product_id.as_str(), variant, qty.as_str(), badge.as_str()],
                &[20, 16, 6, 12],
            );
        }
        for short in b.short_lines() {
            output.warn(&format!(
                "{}: only {} available, {} requested",
                short.product_id, short.available, short.requested
            ));
        }
    }

    output.info("");
    output.kv("Subtotal", &b.subtotal.display());
    for discount in &b.applied_discounts {
        output.kv(
            &format!("{} ({:?})", discount.name, discount.discount_type),
            &discount_amount(&discount.amount),
        );
    }
    if let Some(code) = &b.coupon_applied {
        output.kv("Coupon", code);
    }
    if let Some(error) = b.coupon_error {
        output.warn(&format!("Coupon not applied: {}", coupon_message(error)));
    }
    output.kv("Total", &b.total.display());
    if b.ships_free() {
        output.kv("Shipping", "free");
    } else {
        output.kv("Shipping", &b.shipping.display());
    }
    output.kv("Grand total", &b.grand_total.display());
    if b.has_discounts() {
        output.success(&format!("You save {}", b.savings.display()));
    }
    if let Some(remaining) = b.amount_to_free_shipping.filter(|m| m.is_positive()) {
        output.info(&format!("Add {} more for free shipping", remaining.display()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use storefront_pricing::catalog::{CatalogSnapshot, Product};
    use storefront_pricing::{Currency, Money};

    #[test]
    fn test_parse_item() {
        let line = parse_item("shirt:red-m=2").unwrap();
        assert_eq!(line.product_id.as_str(), "shirt");
        assert_eq!(line.variant_id.as_ref().map(|v| v.as_str()), Some("red-m"));
        assert_eq!(line.quantity, 2);

        let line = parse_item("mug=1").unwrap();
        assert!(line.variant_id.is_none());
        assert!(line.unit_price.is_none());
    }

    #[test]
    fn test_parse_item_rejects_garbage() {
        assert!(parse_item("mug").is_err());
        assert!(parse_item("=3").is_err());
        assert!(parse_item("mug=lots").is_err());
    }

    #[test]
    fn test_evaluation_time() {
        assert_eq!(evaluation_time(Some("2023-11-14T22:13:20Z")).unwrap(), 1_700_000_000);
        assert!(evaluation_time(Some("yesterday")).is_err());
    }

    #[test]
    fn test_build_request_takes_catalog_currency() {
        let fixture = StoreFixture::new(
            CatalogSnapshot::new("store-1", 1)
                .with_product(Product::simple("mug", "Mug", Money::new(900, Currency::USD), 5)),
        );
        let request =
            build_request(&fixture, &["mug=2".to_string()], Some("welcome"), 10).unwrap();
        assert_eq!(request.currency, Currency::USD);
        assert_eq!(request.coupon_code.as_deref(), Some("welcome"));
        assert_eq!(request.store_id.as_str(), "store-1");
    }
}
