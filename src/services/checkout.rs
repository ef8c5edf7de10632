//! Checkout pipeline: normalize the loosely-typed cart payload into a
//! canonical order request, then persist the whole order atomically.
//!
//! Storefront clients have shipped several shapes of this payload over time
//! (combined vs. structured address, `items` vs. `products`, numbers encoded
//! as strings), so every field goes through an explicit fallback chain
//! instead of assuming one schema.

use crate::{
    db::DbPool,
    errors::ServiceError,
    services::{inventory, orders::OrderService},
};
use rust_decimal::Decimal;
use sea_orm::TransactionTrait;
use serde_json::{Map, Value};
use std::str::FromStr;
use std::sync::Arc;
use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;

/// Canonical order-creation request produced by the normalizer.
#[derive(Debug, Clone)]
pub struct CheckoutDraft {
    pub customer_id: i64,
    /// Externally visible order id, caller-supplied or freshly synthesized.
    pub external_order_id: String,
    pub order: OrderDraft,
    pub info: CheckoutInfoDraft,
    /// Raw line-item records, still untyped; the inventory reconciler
    /// resolves them against the catalog.
    pub items: Vec<Map<String, Value>>,
}

/// Order header skeleton.
#[derive(Debug, Clone)]
pub struct OrderDraft {
    pub total: Decimal,
    pub shipping_street: Option<String>,
    pub shipping_city: Option<String>,
    pub shipping_province: Option<String>,
    pub shipping_zip_code: Option<String>,
    pub shipping_country: Option<String>,
    pub shipping_method: Option<String>,
}

/// Checkout metadata skeleton: contact snapshot and shipping/payment labels.
#[derive(Debug, Clone)]
pub struct CheckoutInfoDraft {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub shipping_address: String,
    pub city: Option<String>,
    pub state: Option<String>,
    pub zip: Option<String>,
    pub country: Option<String>,
    pub shipping_method: Option<String>,
    pub payment_method: Option<String>,
    pub terms_accepted: bool,
}

/// Reads the target customer id out of a checkout payload. Split out of
/// [`normalize_checkout`] so the ownership check can run before the rest
/// of the payload is validated.
pub fn target_customer_id(payload: &Map<String, Value>) -> Result<i64, ServiceError> {
    payload
        .get("customerId")
        .and_then(coerce_i64)
        .ok_or_else(|| {
            ServiceError::ValidationError(
                "Invalid or missing customerId in order data".to_string(),
            )
        })
}

/// Parses the open-ended checkout payload into a canonical draft.
/// Pure: no side effects, no store access.
pub fn normalize_checkout(payload: &Map<String, Value>) -> Result<CheckoutDraft, ServiceError> {
    let customer_id = target_customer_id(payload)?;

    let shipping_address = resolve_shipping_address(payload).ok_or_else(|| {
        ServiceError::ValidationError("Missing shipping address".to_string())
    })?;

    let total = coerce_total(payload.get("total"))?;

    let external_order_id = opt_string(payload, "orderId")
        .filter(|id| !id.trim().is_empty())
        .unwrap_or_else(|| Uuid::new_v4().to_string());

    let order = OrderDraft {
        total,
        shipping_street: opt_string(payload, "shippingStreet"),
        shipping_city: opt_string(payload, "shippingCity"),
        shipping_province: opt_string(payload, "shippingProvince"),
        shipping_zip_code: opt_string(payload, "shippingZipCode"),
        shipping_country: opt_string(payload, "shippingCountry"),
        shipping_method: opt_string(payload, "shippingMethod"),
    };

    let info = CheckoutInfoDraft {
        first_name: opt_string(payload, "firstName"),
        last_name: opt_string(payload, "lastName"),
        email: opt_string(payload, "email"),
        phone: opt_string(payload, "phone"),
        shipping_address,
        city: opt_string(payload, "city"),
        state: opt_string(payload, "state"),
        zip: opt_string(payload, "zip"),
        country: opt_string(payload, "country"),
        shipping_method: opt_string(payload, "shippingMethod"),
        payment_method: opt_string(payload, "paymentMethod"),
        terms_accepted: payload
            .get("termsAccepted")
            .and_then(Value::as_bool)
            .unwrap_or(true),
    };

    Ok(CheckoutDraft {
        customer_id,
        external_order_id,
        order,
        info,
        items: extract_items(payload),
    })
}

/// Combined field first, then the legacy `address` key, then a join of the
/// structured shipping fields.
fn resolve_shipping_address(payload: &Map<String, Value>) -> Option<String> {
    if let Some(address) = opt_string(payload, "shippingAddress") {
        return Some(address);
    }
    debug!("No shippingAddress field, trying address");
    if let Some(address) = opt_string(payload, "address") {
        return Some(address);
    }

    debug!("No combined address field, trying structured shipping fields");
    let street = opt_string(payload, "shippingStreet")?;
    let parts: Vec<String> = std::iter::once(street)
        .chain(
            ["shippingCity", "shippingProvince", "shippingZipCode", "shippingCountry"]
                .into_iter()
                .filter_map(|key| opt_string(payload, key)),
        )
        .filter(|part| !part.trim().is_empty())
        .collect();

    if parts.is_empty() {
        None
    } else {
        Some(parts.join(", "))
    }
}

/// The submitted monetary total arrives as a JSON number or a numeric
/// string depending on the client; anything else is a structural failure.
fn coerce_total(value: Option<&Value>) -> Result<Decimal, ServiceError> {
    match value {
        Some(Value::Number(n)) => parse_decimal(&n.to_string()).ok_or_else(|| {
            ServiceError::ValidationError(format!("Invalid total format: {n}"))
        }),
        Some(Value::String(s)) => parse_decimal(s.trim()).ok_or_else(|| {
            ServiceError::ValidationError(format!("Invalid total format: {s}"))
        }),
        Some(other) => Err(ServiceError::ValidationError(format!(
            "Unexpected total type: {other}"
        ))),
        None => Err(ServiceError::ValidationError(
            "Missing order total".to_string(),
        )),
    }
}

/// Line items may arrive under `items` or the legacy `products` key. The
/// list is accepted only as a non-empty array of objects; anything else
/// means "no items". The first key present as an array wins.
fn extract_items(payload: &Map<String, Value>) -> Vec<Map<String, Value>> {
    for key in ["items", "products"] {
        if let Some(Value::Array(list)) = payload.get(key) {
            if list.first().map_or(false, Value::is_object) {
                return list
                    .iter()
                    .filter_map(Value::as_object)
                    .cloned()
                    .collect();
            }
            warn!(key, "Ignoring item list that is not a sequence of records");
            return Vec::new();
        }
    }
    Vec::new()
}

pub(crate) fn parse_decimal(s: &str) -> Option<Decimal> {
    Decimal::from_str(s)
        .or_else(|_| Decimal::from_scientific(s))
        .ok()
}

pub(crate) fn coerce_i64(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Scalar-to-string coercion for optional passthrough fields. Records and
/// arrays are never meaningful here.
pub(crate) fn opt_string(payload: &Map<String, Value>, key: &str) -> Option<String> {
    match payload.get(key) {
        Some(Value::String(s)) => Some(s.clone()),
        Some(Value::Number(n)) => Some(n.to_string()),
        Some(Value::Bool(b)) => Some(b.to_string()),
        _ => None,
    }
}

/// Orchestrates a checkout: one transaction covering the order header, its
/// checkout information, every line item, and the stock decrements.
#[derive(Clone)]
pub struct CheckoutService {
    db: Arc<DbPool>,
    orders: OrderService,
}

impl CheckoutService {
    pub fn new(db: Arc<DbPool>) -> Self {
        let orders = OrderService::new(db.clone());
        Self { db, orders }
    }

    #[instrument(skip(self, draft), fields(customer_id = draft.customer_id, order_id = %draft.external_order_id))]
    pub async fn place_order(&self, draft: CheckoutDraft) -> Result<String, ServiceError> {
        let txn = self.db.begin().await.map_err(|e| {
            error!(error = %e, "Failed to start checkout transaction");
            ServiceError::DatabaseError(e)
        })?;

        let (order_pk, external_order_id) = self
            .orders
            .create_order(
                &txn,
                &draft.order,
                &draft.info,
                &draft.external_order_id,
                draft.customer_id,
            )
            .await?;

        let reconciled = inventory::reconcile(&txn, &draft.items).await?;
        self.orders
            .insert_items(&txn, order_pk, &reconciled.items)
            .await?;

        txn.commit().await.map_err(|e| {
            error!(error = %e, order_id = %external_order_id, "Failed to commit checkout transaction");
            ServiceError::DatabaseError(e)
        })?;

        if !reconciled.warnings.is_empty() {
            warn!(
                order_id = %external_order_id,
                warning_count = reconciled.warnings.len(),
                "Checkout completed with data-quality warnings"
            );
        }
        info!(
            order_id = %external_order_id,
            item_count = reconciled.items.len(),
            "Order created successfully"
        );

        Ok(external_order_id)
    }
}
