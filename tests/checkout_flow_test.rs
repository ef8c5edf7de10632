mod common;

use axum::http::{Method, StatusCode};
use common::{response_json, TestApp};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use sea_orm::EntityTrait;
use serde_json::json;
use std::str::FromStr;
use storefront_api::entities::{order, order_item, product};

fn money(value: &serde_json::Value) -> Decimal {
    Decimal::from_str(value.as_str().expect("decimal field is a string")).expect("parse decimal")
}

#[tokio::test]
async fn checkout_decrements_stock_and_snapshots_the_item() {
    let app = TestApp::spawn().await;
    let customer = app.seed_customer("ana@example.com", false).await;
    let widget = app.seed_product("Widget", dec!(50.00), 5).await;

    let payload = json!({
        "customerId": customer.id,
        "total": 100,
        "shippingAddress": "12 Mabini St",
        "items": [{"id": widget.id, "quantity": 2}],
    });

    let response = app
        .request_as("ana@example.com", Method::POST, "/api/orders", Some(payload))
        .await;
    assert_eq!(response.status(), StatusCode::CREATED);

    let body = response_json(response).await;
    assert_eq!(body["success"], json!(true));
    let order_id = body["data"]["orderId"].as_str().expect("orderId");

    let stored = product::Entity::find_by_id(widget.id)
        .one(&*app.db)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored.stock, 3);

    let detail = app
        .request_as(
            "ana@example.com",
            Method::GET,
            &format!("/api/orders/checkout/{order_id}"),
            None,
        )
        .await;
    assert_eq!(detail.status(), StatusCode::OK);

    let view = response_json(detail).await;
    let data = &view["data"];
    assert_eq!(data["status"], json!("Processing"));
    assert_eq!(data["shippingAddress"], json!("12 Mabini St"));
    assert_eq!(data["items"][0]["name"], json!("Widget"));
    assert_eq!(data["items"][0]["quantity"], json!(2));
    // catalog price is snapshotted onto the item
    assert_eq!(money(&data["items"][0]["price"]), dec!(50.00));
    // subtotal 100, shipping 150, tax 12% of subtotal
    assert_eq!(money(&data["subtotal"]), dec!(100.00));
    assert_eq!(money(&data["shipping"]), dec!(150.00));
    assert_eq!(money(&data["tax"]), dec!(12.00));
    assert_eq!(money(&data["total"]), dec!(262.00));
}

#[tokio::test]
async fn stock_decrement_clamps_at_zero() {
    let app = TestApp::spawn().await;
    let customer = app.seed_customer("ana@example.com", false).await;
    let scarce = app.seed_product("Scarce", dec!(10.00), 1).await;

    let payload = json!({
        "customerId": customer.id,
        "total": 30,
        "shippingAddress": "12 Mabini St",
        "items": [{"id": scarce.id, "quantity": 3}],
    });

    let response = app
        .request_as("ana@example.com", Method::POST, "/api/orders", Some(payload))
        .await;
    assert_eq!(response.status(), StatusCode::CREATED);

    let stored = product::Entity::find_by_id(scarce.id)
        .one(&*app.db)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored.stock, 0);
}

#[tokio::test]
async fn unparseable_quantity_defaults_to_one() {
    let app = TestApp::spawn().await;
    let customer = app.seed_customer("ana@example.com", false).await;
    let widget = app.seed_product("Widget", dec!(50.00), 5).await;

    let payload = json!({
        "customerId": customer.id,
        "total": 50,
        "shippingAddress": "12 Mabini St",
        "items": [{"id": widget.id, "quantity": "abc"}],
    });

    let response = app
        .request_as("ana@example.com", Method::POST, "/api/orders", Some(payload))
        .await;
    assert_eq!(response.status(), StatusCode::CREATED);

    let stored = product::Entity::find_by_id(widget.id)
        .one(&*app.db)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored.stock, 4);

    let items = order_item::Entity::find().all(&*app.db).await.unwrap();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].quantity, 1);
}

#[tokio::test]
async fn unknown_product_falls_back_to_cart_data_without_touching_the_catalog() {
    let app = TestApp::spawn().await;
    let customer = app.seed_customer("ana@example.com", false).await;
    let widget = app.seed_product("Widget", dec!(50.00), 5).await;

    let payload = json!({
        "customerId": customer.id,
        "total": 20,
        "shippingAddress": "12 Mabini St",
        "items": [{
            "id": 9999,
            "name": "Retired Mug",
            "image": "mug.png",
            "price": "19.99",
            "quantity": 1
        }],
    });

    let response = app
        .request_as("ana@example.com", Method::POST, "/api/orders", Some(payload))
        .await;
    assert_eq!(response.status(), StatusCode::CREATED);

    let items = order_item::Entity::find().all(&*app.db).await.unwrap();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].product_id, Some(9999));
    assert_eq!(items[0].name.as_deref(), Some("Retired Mug"));
    assert_eq!(items[0].price, dec!(19.99));

    // the live product is untouched
    let stored = product::Entity::find_by_id(widget.id)
        .one(&*app.db)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored.stock, 5);
}

#[tokio::test]
async fn legacy_products_key_and_string_total_are_accepted() {
    let app = TestApp::spawn().await;
    let customer = app.seed_customer("ana@example.com", false).await;
    let widget = app.seed_product("Widget", dec!(50.00), 5).await;

    let payload = json!({
        "customerId": customer.id,
        "total": "100.00",
        "address": "45 Rizal Ave",
        "products": [{"id": widget.id, "quantity": 1}],
    });

    let response = app
        .request_as("ana@example.com", Method::POST, "/api/orders", Some(payload))
        .await;
    assert_eq!(response.status(), StatusCode::CREATED);

    let stored = product::Entity::find_by_id(widget.id)
        .one(&*app.db)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored.stock, 4);
}

#[tokio::test]
async fn failed_checkout_rolls_back_every_write() {
    let app = TestApp::spawn().await;
    let customer = app.seed_customer("ana@example.com", false).await;
    let widget = app.seed_product("Widget", dec!(50.00), 5).await;

    let first = json!({
        "customerId": customer.id,
        "orderId": "web-dup",
        "total": 50,
        "shippingAddress": "12 Mabini St",
        "items": [{"id": widget.id, "quantity": 1}],
    });
    let response = app
        .request_as("ana@example.com", Method::POST, "/api/orders", Some(first))
        .await;
    assert_eq!(response.status(), StatusCode::CREATED);

    // reusing the external order id violates the unique constraint inside
    // the transaction, so nothing from the second attempt persists
    let duplicate = json!({
        "customerId": customer.id,
        "orderId": "web-dup",
        "total": 50,
        "shippingAddress": "12 Mabini St",
        "items": [{"id": widget.id, "quantity": 1}],
    });
    let response = app
        .request_as("ana@example.com", Method::POST, "/api/orders", Some(duplicate))
        .await;
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

    let orders = order::Entity::find().all(&*app.db).await.unwrap();
    assert_eq!(orders.len(), 1);
    let stored = product::Entity::find_by_id(widget.id)
        .one(&*app.db)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored.stock, 4);
}

#[tokio::test]
async fn checkout_requires_a_session() {
    let app = TestApp::spawn().await;
    let customer = app.seed_customer("ana@example.com", false).await;

    let payload = json!({
        "customerId": customer.id,
        "total": 100,
        "shippingAddress": "12 Mabini St",
    });

    let response = app
        .request(Method::POST, "/api/orders", Some(payload))
        .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn checkout_for_another_customer_is_forbidden() {
    let app = TestApp::spawn().await;
    let ana = app.seed_customer("ana@example.com", false).await;
    app.seed_customer("eve@example.com", false).await;

    let payload = json!({
        "customerId": ana.id,
        "total": 100,
        "shippingAddress": "12 Mabini St",
    });

    let response = app
        .request_as("eve@example.com", Method::POST, "/api/orders", Some(payload))
        .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn ownership_is_decided_before_payload_validation() {
    let app = TestApp::spawn().await;
    let ana = app.seed_customer("ana@example.com", false).await;
    app.seed_customer("eve@example.com", false).await;

    // malformed payload (no total, no address) targeting another customer
    let payload = json!({
        "customerId": ana.id,
    });

    let response = app
        .request_as("eve@example.com", Method::POST, "/api/orders", Some(payload))
        .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn blocked_customers_cannot_check_out() {
    let app = TestApp::spawn().await;
    let blocked = app.seed_customer("blocked@example.com", true).await;

    let payload = json!({
        "customerId": blocked.id,
        "total": 100,
        "shippingAddress": "12 Mabini St",
    });

    let response = app
        .request_as(
            "blocked@example.com",
            Method::POST,
            "/api/orders",
            Some(payload),
        )
        .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let body = response_json(response).await;
    assert_eq!(
        body["message"],
        json!("Forbidden: Your account is blocked. Please contact support.")
    );
}

#[tokio::test]
async fn missing_shipping_address_is_rejected() {
    let app = TestApp::spawn().await;
    let customer = app.seed_customer("ana@example.com", false).await;

    let payload = json!({
        "customerId": customer.id,
        "total": 100,
    });

    let response = app
        .request_as("ana@example.com", Method::POST, "/api/orders", Some(payload))
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    assert!(order::Entity::find()
        .all(&*app.db)
        .await
        .unwrap()
        .is_empty());
}
