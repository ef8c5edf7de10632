//! Storefront order API: checkout, order lookup, order history, and status
//! updates over a relational store.

pub mod auth;
pub mod config;
pub mod db;
pub mod entities;
pub mod errors;
pub mod handlers;
pub mod migrator;
pub mod services;

use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, patch, post},
    Json, Router,
};
use serde::Serialize;
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::error;

use crate::{
    auth::AuthService,
    config::AppConfig,
    db::DbPool,
    services::{checkout::CheckoutService, customers::CustomerDirectory, orders::OrderService},
};

/// Response envelope shared by every successful endpoint.
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    pub message: String,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T, message: impl Into<String>) -> Self {
        Self {
            success: true,
            data: Some(data),
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            message: message.into(),
        }
    }
}

/// Service handles shared across requests.
#[derive(Clone)]
pub struct AppServices {
    pub customers: CustomerDirectory,
    pub orders: OrderService,
    pub checkout: CheckoutService,
}

impl AppServices {
    pub fn new(db: Arc<DbPool>) -> Self {
        Self {
            customers: CustomerDirectory::new(db.clone()),
            orders: OrderService::new(db.clone()),
            checkout: CheckoutService::new(db),
        }
    }
}

#[derive(Clone)]
pub struct AppState {
    pub db: Arc<DbPool>,
    pub config: AppConfig,
    pub auth: Arc<AuthService>,
    pub services: AppServices,
}

impl AppState {
    pub fn new(db: Arc<DbPool>, config: AppConfig, auth: Arc<AuthService>) -> Self {
        let services = AppServices::new(db.clone());
        Self {
            db,
            config,
            auth,
            services,
        }
    }
}

/// Builds the API router. Layers (tracing, CORS) are applied by the caller.
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(health_check))
        .route("/api/orders", post(handlers::orders::checkout))
        .route(
            "/api/orders/checkout/:order_id",
            get(handlers::orders::order_detail),
        )
        .route(
            "/api/orders/customer/:customer_id",
            get(handlers::orders::orders_for_customer),
        )
        .route(
            "/api/orders/:order_id/status",
            patch(handlers::orders::update_status),
        )
}

async fn health_check(State(state): State<AppState>) -> (StatusCode, Json<Value>) {
    match state.db.ping().await {
        Ok(()) => (
            StatusCode::OK,
            Json(json!({ "status": "ok", "database": "reachable" })),
        ),
        Err(e) => {
            error!(error = %e, "Health check failed to reach the database");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({ "status": "degraded", "database": "unreachable" })),
            )
        }
    }
}
