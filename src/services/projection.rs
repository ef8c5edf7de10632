//! Order projection: folds an order header, its checkout information, and
//! its line items into the response shape clients consume. Pure functions,
//! no store access.

use crate::entities::{checkout_information, order, order_item};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::Serialize;
use tracing::warn;

pub const SHIPPING_FEE: Decimal = dec!(150.00);
pub const TAX_RATE: Decimal = dec!(0.12);

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderItemView {
    pub product_id: Option<i64>,
    pub name: Option<String>,
    pub image: Option<String>,
    pub price: Decimal,
    pub quantity: i32,
}

/// The client-facing order record. Checkout-information fields are optional
/// because older orders may predate that table; the money breakdown is
/// always present.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderView {
    pub order_id: String,
    pub order_date: DateTime<Utc>,
    pub status: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub shipping_address: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub zip: Option<String>,
    pub country: Option<String>,
    pub shipping_method: Option<String>,
    pub payment_method: Option<String>,
    pub items: Vec<OrderItemView>,
    pub subtotal: Decimal,
    pub shipping: Decimal,
    pub tax: Decimal,
    pub total: Decimal,
}

#[derive(Debug)]
pub struct Projection {
    pub view: OrderView,
    pub warnings: Vec<String>,
}

/// Projects stored rows into an [`OrderView`]. The money breakdown is
/// recomputed from the line items on every read rather than trusted from
/// the stored total:
///
///   subtotal = sum(price * quantity)
///   shipping = flat fee
///   tax      = subtotal * rate
///
/// A line whose extension overflows is skipped from the subtotal with a
/// warning; the item itself still appears in the list.
pub fn project(
    order: &order::Model,
    info: Option<&checkout_information::Model>,
    items: &[order_item::Model],
) -> Projection {
    let mut warnings = Vec::new();
    let mut subtotal = Decimal::ZERO;
    let mut views = Vec::with_capacity(items.len());

    for item in items {
        match item.price.checked_mul(Decimal::from(item.quantity)) {
            Some(extension) => subtotal += extension,
            None => {
                warn!(
                    item_id = item.id,
                    price = %item.price,
                    quantity = item.quantity,
                    "Line extension overflow, excluding from subtotal"
                );
                warnings.push(format!(
                    "line extension overflow for item {}, excluded from subtotal",
                    item.id
                ));
            }
        }

        views.push(OrderItemView {
            product_id: item.product_id,
            name: item.name.clone(),
            image: item.image.clone(),
            price: item.price,
            quantity: item.quantity,
        });
    }

    let tax = subtotal * TAX_RATE;
    let total = subtotal + SHIPPING_FEE + tax;

    let view = OrderView {
        order_id: order.order_id.clone(),
        order_date: order.order_date,
        status: order.status.clone(),
        first_name: info.and_then(|i| i.first_name.clone()),
        last_name: info.and_then(|i| i.last_name.clone()),
        email: info.and_then(|i| i.email.clone()),
        phone: info.and_then(|i| i.phone.clone()),
        shipping_address: info.map(|i| i.shipping_address.clone()),
        city: info.and_then(|i| i.city.clone()),
        state: info.and_then(|i| i.state.clone()),
        zip: info.and_then(|i| i.zip.clone()),
        country: info.and_then(|i| i.country.clone()),
        shipping_method: info.and_then(|i| i.shipping_method.clone()),
        payment_method: info.and_then(|i| i.payment_method.clone()),
        items: views,
        subtotal,
        shipping: SHIPPING_FEE,
        tax,
        total,
    };

    Projection { view, warnings }
}
