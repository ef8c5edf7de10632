//! Inventory reconciler: turns raw cart records into priced line items and
//! applies the matching stock decrements.
//!
//! This is deliberately best-effort. Carts can reference products that were
//! deleted or carry client-mangled fields; a checkout must still complete,
//! so every per-item problem is downgraded to a data-quality warning and
//! the fold keeps going. Only store failures abort.

use crate::{
    errors::ServiceError,
    services::{catalog, checkout},
};
use rust_decimal::Decimal;
use sea_orm::ConnectionTrait;
use serde_json::{Map, Value};
use tracing::warn;

/// A priced line item ready to persist. Price, name, and image are
/// snapshots: authoritative from the catalog when the product still
/// exists, client-supplied otherwise.
#[derive(Debug, Clone, PartialEq)]
pub struct LineItem {
    pub product_id: Option<i64>,
    pub name: Option<String>,
    pub image: Option<String>,
    pub price: Decimal,
    pub quantity: i32,
}

/// Partial-result fold output: successful items plus the warnings that
/// accumulated along the way. Warnings never fail the checkout.
#[derive(Debug, Default)]
pub struct ReconciledItems {
    pub items: Vec<LineItem>,
    pub warnings: Vec<String>,
}

/// Resolves every raw cart record against the catalog on the given
/// connection (the open checkout transaction), decrementing stock for
/// items that match a live product.
pub async fn reconcile<C: ConnectionTrait>(
    conn: &C,
    raw_items: &[Map<String, Value>],
) -> Result<ReconciledItems, ServiceError> {
    let mut result = ReconciledItems::default();

    for raw in raw_items {
        let product_id = parse_product_id(raw, &mut result.warnings);

        let item = match product_id {
            Some(pid) => match catalog::find_product(conn, pid).await? {
                Some(product) => {
                    let quantity = parse_quantity(raw, &mut result.warnings);
                    catalog::decrement_stock_clamped(conn, pid, quantity).await?;
                    LineItem {
                        product_id: Some(pid),
                        name: Some(product.name),
                        image: product.image,
                        price: product.price,
                        quantity,
                    }
                }
                None => {
                    result
                        .warnings
                        .push(format!("product {pid} no longer exists, using cart data"));
                    item_from_cart_data(raw, product_id, &mut result.warnings)
                }
            },
            None => item_from_cart_data(raw, None, &mut result.warnings),
        };

        if item.name.is_none() || item.price == Decimal::ZERO {
            warn!(?raw, "Order item missing product details");
            result
                .warnings
                .push("order item missing product details".to_string());
        }

        result.items.push(item);
    }

    Ok(result)
}

/// Builds a line item purely from client-supplied cart fields. No catalog
/// mutation happens on this path.
fn item_from_cart_data(
    raw: &Map<String, Value>,
    product_id: Option<i64>,
    warnings: &mut Vec<String>,
) -> LineItem {
    let price = match raw.get("price") {
        None => Decimal::ZERO,
        Some(value) => match coerce_price(value) {
            Some(price) => price,
            None => {
                warn!(price = %value, "Invalid price in cart data");
                warnings.push(format!("invalid price in cart data: {value}"));
                Decimal::ZERO
            }
        },
    };

    LineItem {
        product_id,
        name: checkout::opt_string(raw, "name"),
        image: checkout::opt_string(raw, "image"),
        price,
        quantity: parse_quantity(raw, warnings),
    }
}

fn coerce_price(value: &Value) -> Option<Decimal> {
    match value {
        Value::Number(n) => checkout::parse_decimal(&n.to_string()),
        Value::String(s) => checkout::parse_decimal(s.trim()),
        _ => None,
    }
}

/// Best-effort product id parse. Failures are logged and treated as
/// "no product reference"; they never abort the checkout.
fn parse_product_id(raw: &Map<String, Value>, warnings: &mut Vec<String>) -> Option<i64> {
    let value = raw.get("id")?;
    match checkout::coerce_i64(value) {
        Some(id) => Some(id),
        None => {
            warn!(id = %value, "Invalid product ID");
            warnings.push(format!("invalid product id: {value}"));
            None
        }
    }
}

/// Quantity arrives as a number or numeric string; anything unparseable
/// (or negative) defaults to 1 with a warning.
fn parse_quantity(raw: &Map<String, Value>, warnings: &mut Vec<String>) -> i32 {
    let Some(value) = raw.get("quantity") else {
        return 1;
    };

    let parsed = match value {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().map(|f| f as i64))
            .and_then(|q| i32::try_from(q).ok()),
        Value::String(s) => s.trim().parse::<i32>().ok(),
        _ => None,
    };

    match parsed {
        Some(q) if q >= 0 => q,
        _ => {
            warn!(quantity = %value, "Invalid quantity, using default of 1");
            warnings.push(format!("invalid quantity: {value}, using default of 1"));
            1
        }
    }
}
