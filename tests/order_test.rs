//! Integration tests for checkout, payment verification and delivery

mod common;

use std::sync::atomic::Ordering;

use axum::http::StatusCode;
use serde_json::json;

use common::{setup_test_app, CHECKOUT_URL};
use storefront::model::{PaymentStatus, Role};
use storefront::orders;

#[tokio::test]
async fn test_create_order_is_pending_with_payment_url() {
    let app = setup_test_app();
    let (_, admin_token) = app.admin();
    let (customer, token) = app.customer();
    let product_id = app.create_product(&admin_token, "Body Mist", 1000.0).await;

    let (status, body) = app
        .send(
            "POST",
            "/api/orders",
            Some(&token),
            Some(json!({
                "orderItems": [{ "product": product_id, "qty": 2, "price": 1000 }],
                "totalAmount": 2000
            })),
        )
        .await;

    assert_eq!(status, StatusCode::CREATED, "{}", body);
    assert_eq!(body["success"], true);
    assert_eq!(body["payment_url"], CHECKOUT_URL);

    let order = &body["order"];
    assert_eq!(order["paymentStatus"], "pending");
    assert_eq!(order["orderStatus"], "pending_delivery");
    assert_eq!(order["user"], customer.id.as_str());
    assert_eq!(order["totalAmount"], 2000.0);
    assert_eq!(order["products"][0]["quantity"], 2);

    let tx_ref = order["transactionRef"].as_str().unwrap();
    assert!(tx_ref.starts_with("TX-"));

    let checkout = app.gateway.last_checkout().unwrap();
    assert_eq!(checkout.tx_ref, tx_ref);
    assert_eq!(checkout.amount, 2000.0);
    assert_eq!(checkout.currency, "MWK");
    assert_eq!(checkout.email, "chikondi@example.com");
    assert_eq!(checkout.first_name, "Chikondi");
    assert_eq!(checkout.last_name, "Phiri");
    assert_eq!(
        checkout.callback_url,
        format!("http://shop.test/order-success/{}", order["_id"].as_str().unwrap())
    );
}

#[tokio::test]
async fn test_create_order_accepts_cart_aliases() {
    let app = setup_test_app();
    let (_, token) = app.customer();

    let (status, body) = app
        .send(
            "POST",
            "/api/orders",
            Some(&token),
            Some(json!({
                "orderItems": [{ "_id": "p-1", "quantity": 3, "price": 50 }],
                "totalAmount": 150
            })),
        )
        .await;

    assert_eq!(status, StatusCode::CREATED, "{}", body);
    assert_eq!(body["order"]["products"][0]["product"], "p-1");
    assert_eq!(body["order"]["products"][0]["quantity"], 3);
}

#[tokio::test]
async fn test_checkout_response_uses_frontend_field_names() {
    let app = setup_test_app();
    let (_, token) = app.customer();

    let (status, body) = app
        .send(
            "POST",
            "/api/orders",
            Some(&token),
            Some(json!({
                "orderItems": [{ "_id": "p-1", "qty": 2, "price": 1000 }],
                "totalAmount": 2000
            })),
        )
        .await;

    assert_eq!(status, StatusCode::CREATED, "{}", body);
    assert_eq!(body["payment_url"], CHECKOUT_URL);
    assert!(body.get("paymentUrl").is_none());

    let order = &body["order"];
    assert!(order["_id"].as_str().is_some_and(|id| !id.is_empty()));
    assert!(order.get("id").is_none());
    assert_eq!(order["products"][0]["product"], "p-1");
    assert!(order.get("items").is_none());
}

#[tokio::test]
async fn test_create_order_empty_cart() {
    let app = setup_test_app();
    let (_, token) = app.customer();

    let (status, body) = app
        .send(
            "POST",
            "/api/orders",
            Some(&token),
            Some(json!({ "orderItems": [], "totalAmount": 0 })),
        )
        .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "No order items");
    assert!(app.gateway.last_checkout().is_none());
}

#[tokio::test]
async fn test_create_order_requires_login() {
    let app = setup_test_app();

    let (status, _) = app
        .send(
            "POST",
            "/api/orders",
            None,
            Some(json!({ "orderItems": [{ "product": "p", "qty": 1, "price": 1 }], "totalAmount": 1 })),
        )
        .await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_provider_failure_leaves_pending_order() {
    let app = setup_test_app();
    let (customer, token) = app.customer();
    app.gateway.fail_initialize.store(true, Ordering::SeqCst);

    let (status, body) = app
        .send(
            "POST",
            "/api/orders",
            Some(&token),
            Some(json!({
                "orderItems": [{ "product": "p-1", "qty": 1, "price": 500 }],
                "totalAmount": 500
            })),
        )
        .await;

    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(body["success"], false);

    let stored = orders::list_for_user(&app.store, &customer.id).unwrap();
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].payment_status, PaymentStatus::Pending);
}

#[tokio::test]
async fn test_verify_marks_paid_once() {
    let app = setup_test_app();
    let (_, token) = app.customer();
    let order = app.place_order(&token, "p-1", 2, 1000.0).await;
    let uri = format!("/api/orders/{}/verify", order["_id"].as_str().unwrap());

    app.gateway
        .respond_to_verify(json!({ "status": "success", "data": { "status": "success" } }));

    let (status, body) = app.send("GET", &uri, Some(&token), None).await;
    assert_eq!(status, StatusCode::OK, "{}", body);
    assert_eq!(body["message"], "Payment verified successfully");
    assert_eq!(body["order"]["paymentStatus"], "paid");
    let updated_at = body["order"]["updatedAt"].clone();

    // Verifying again changes nothing
    let (status, body) = app.send("GET", &uri, Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["order"]["paymentStatus"], "paid");
    assert_eq!(body["order"]["updatedAt"], updated_at);
}

#[tokio::test]
async fn test_verify_pending_payment() {
    let app = setup_test_app();
    let (_, token) = app.customer();
    let order = app.place_order(&token, "p-1", 1, 300.0).await;
    let order_id = order["_id"].as_str().unwrap();

    app.gateway.respond_to_verify(json!({ "status": "pending" }));

    let (status, body) = app
        .send("GET", &format!("/api/orders/{}/verify", order_id), Some(&token), None)
        .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Payment verification failed or pending");
    let stored = orders::get(&app.store, order_id).unwrap();
    assert_eq!(stored.payment_status, PaymentStatus::Pending);
}

#[tokio::test]
async fn test_verify_unknown_order() {
    let app = setup_test_app();
    let (_, token) = app.customer();

    let (status, body) = app
        .send("GET", "/api/orders/missing/verify", Some(&token), None)
        .await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["message"], "Order not found");
    assert_eq!(app.gateway.verify_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_verify_other_customers_order() {
    let app = setup_test_app();
    let (_, owner_token) = app.customer();
    let (_, other_token) = app.create_user("Other", "other@example.com", Role::Customer);
    let (_, admin_token) = app.admin();
    let order = app.place_order(&owner_token, "p-1", 1, 300.0).await;
    let uri = format!("/api/orders/{}/verify", order["_id"].as_str().unwrap());
    app.gateway.respond_to_verify(json!({ "status": "success" }));

    let (status, _) = app.send("GET", &uri, Some(&other_token), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = app.send("GET", &uri, Some(&admin_token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["order"]["paymentStatus"], "paid");
}

#[tokio::test]
async fn test_mark_delivered_admin_only() {
    let app = setup_test_app();
    let (_, token) = app.customer();
    let (_, admin_token) = app.admin();
    let order = app.place_order(&token, "p-1", 1, 300.0).await;
    let uri = format!("/api/orders/{}/deliver", order["_id"].as_str().unwrap());

    let (status, _) = app.send("PUT", &uri, Some(&token), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = app.send("PUT", &uri, Some(&admin_token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["order"]["orderStatus"], "delivered");
    // Delivery does not touch the payment status
    assert_eq!(body["order"]["paymentStatus"], "pending");

    let (status, _) = app
        .send("PUT", "/api/orders/missing/deliver", Some(&admin_token), None)
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_my_orders_newest_first() {
    let app = setup_test_app();
    let (_, token) = app.customer();
    let (_, other_token) = app.create_user("Other", "other@example.com", Role::Customer);

    let first = app.place_order(&token, "p-1", 1, 100.0).await;
    tokio::time::sleep(std::time::Duration::from_millis(2)).await;
    let second = app.place_order(&token, "p-2", 1, 200.0).await;
    app.place_order(&other_token, "p-3", 1, 300.0).await;

    let (status, body) = app.send("GET", "/api/orders/my-orders", Some(&token), None).await;

    assert_eq!(status, StatusCode::OK);
    let list = body["orders"].as_array().unwrap();
    assert_eq!(list.len(), 2);
    assert_eq!(list[0]["_id"], second["_id"]);
    assert_eq!(list[1]["_id"], first["_id"]);
}

#[tokio::test]
async fn test_admin_order_list_includes_customer() {
    let app = setup_test_app();
    let (_, token) = app.customer();
    let (_, admin_token) = app.admin();
    app.place_order(&token, "p-1", 1, 100.0).await;

    let (status, _) = app.send("GET", "/api/orders", Some(&token), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = app.send("GET", "/api/orders", Some(&admin_token), None).await;
    assert_eq!(status, StatusCode::OK);
    let list = body["orders"].as_array().unwrap();
    assert_eq!(list.len(), 1);
    assert_eq!(list[0]["customer"]["email"], "chikondi@example.com");
    assert_eq!(list[0]["paymentStatus"], "pending");
}
