//! HTTP surface for checkout and order queries. Handlers resolve the
//! caller's session, enforce ownership, and delegate to the services;
//! they hold no business rules of their own.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde_json::{json, Value};
use tracing::{error, info, instrument, warn};

use crate::{
    auth::{require_owner, AuthSession},
    errors::ServiceError,
    services::{
        checkout::{normalize_checkout, target_customer_id},
        projection,
    },
    ApiResponse, AppState,
};

/// POST /api/orders
///
/// Accepts the loosely-typed checkout payload, normalizes it, verifies the
/// caller owns the target customer account, and places the order in one
/// transaction.
#[instrument(skip(state, payload), fields(caller = %session.email))]
pub async fn checkout(
    State(state): State<AppState>,
    session: AuthSession,
    Json(payload): Json<Value>,
) -> Result<(StatusCode, Json<ApiResponse<Value>>), ServiceError> {
    let customer = state
        .services
        .customers
        .require_active_by_email(&session.email)
        .await?;

    let payload = payload.as_object().ok_or_else(|| {
        ServiceError::ValidationError("Order payload must be a JSON object".to_string())
    })?;

    // ownership is decided on the target customer id alone, before the
    // rest of the payload is validated
    require_owner(customer.id, target_customer_id(payload)?)?;
    let draft = normalize_checkout(payload)?;

    let order_id = state.services.checkout.place_order(draft).await?;

    info!(order_id = %order_id, customer_id = customer.id, "Checkout accepted");
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success(
            json!({ "orderId": order_id }),
            "Order created successfully",
        )),
    ))
}

/// GET /api/orders/checkout/:order_id
///
/// Returns the projected order record. Missing checkout information is
/// tolerated; the contact fields simply come back empty.
#[instrument(skip(state), fields(caller = %session.email))]
pub async fn order_detail(
    State(state): State<AppState>,
    session: AuthSession,
    Path(order_id): Path<String>,
) -> Result<Json<ApiResponse<projection::OrderView>>, ServiceError> {
    let customer = state
        .services
        .customers
        .require_active_by_email(&session.email)
        .await?;

    let order = state
        .services
        .orders
        .find_by_order_id(&order_id)
        .await?
        .ok_or_else(|| ServiceError::NotFound(format!("Order {order_id} not found")))?;

    require_owner(customer.id, order.customer_id)?;

    let info = state.services.orders.checkout_info_for(&order_id).await?;
    let items = state.services.orders.items_for(order.id).await?;

    let projection = projection::project(&order, info.as_ref(), &items);
    for warning in &projection.warnings {
        warn!(order_id = %order_id, warning, "Order projection warning");
    }

    Ok(Json(ApiResponse::success(
        projection.view,
        "Order retrieved successfully",
    )))
}

/// GET /api/orders/customer/:customer_id
///
/// Order history, most recent first. A failure reading one order's detail
/// rows drops that order from the response rather than failing the page.
#[instrument(skip(state), fields(caller = %session.email))]
pub async fn orders_for_customer(
    State(state): State<AppState>,
    session: AuthSession,
    Path(customer_id): Path<i64>,
) -> Result<Json<ApiResponse<Vec<projection::OrderView>>>, ServiceError> {
    let customer = state
        .services
        .customers
        .require_active_by_email(&session.email)
        .await?;
    require_owner(customer.id, customer_id)?;

    let orders = state.services.orders.list_for_customer(customer_id).await?;

    let mut views = Vec::with_capacity(orders.len());
    for order in orders {
        let detail = async {
            let info = state
                .services
                .orders
                .checkout_info_for(&order.order_id)
                .await?;
            let items = state.services.orders.items_for(order.id).await?;
            Ok::<_, ServiceError>((info, items))
        }
        .await;

        match detail {
            Ok((info, items)) => {
                let projection = projection::project(&order, info.as_ref(), &items);
                for warning in &projection.warnings {
                    warn!(order_id = %order.order_id, warning, "Order projection warning");
                }
                views.push(projection.view);
            }
            Err(e) => {
                error!(
                    order_id = %order.order_id,
                    error = %e,
                    "Skipping unreadable order in history"
                );
            }
        }
    }

    Ok(Json(ApiResponse::success(
        views,
        "Orders retrieved successfully",
    )))
}

/// PATCH /api/orders/:order_id/status
///
/// Body: `{"status": "<new status>"}`. The payload is read as loose JSON so
/// a missing or empty status maps to a validation failure rather than a
/// deserialization rejection.
#[instrument(skip(state, payload))]
pub async fn update_status(
    State(state): State<AppState>,
    Path(order_id): Path<String>,
    Json(payload): Json<Value>,
) -> Result<Json<ApiResponse<Value>>, ServiceError> {
    let status = payload
        .get("status")
        .and_then(Value::as_str)
        .unwrap_or_default();

    state
        .services
        .orders
        .update_status(&order_id, status)
        .await?;

    Ok(Json(ApiResponse::success(
        json!({ "orderId": order_id, "status": status.trim() }),
        "Order status updated successfully",
    )))
}
