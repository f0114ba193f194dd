mod common;

use axum::http::{Method, StatusCode};
use rstest::rstest;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde_json::{json, Value};
use std::str::FromStr;
use uuid::Uuid;

use common::{actor, TestApp};
use parcelflow_api::auth::ActorRole;

fn order_body(app: &TestApp) -> Value {
    json!({
        "sender_name": "Nguyen Van A",
        "sender_phone": "0901234567",
        "sender_city": "Hanoi",
        "sender_address": "12 Kim Ma",
        "recipient_name": "Tran Thi B",
        "recipient_phone": "0912345678",
        "recipient_city": "Ho Chi Minh City",
        "recipient_address": "34 Le Loi",
        "weight": "2",
        "service_type_id": app.standard,
        "cod_amount": "100000",
        "payer": "customer",
        "payment_method": "cash",
        "promotion_code": "WELCOME10"
    })
}

fn money(value: &Value) -> Decimal {
    match value {
        Value::String(s) => Decimal::from_str(s).unwrap(),
        other => Decimal::from_str(&other.to_string()).unwrap(),
    }
}

#[tokio::test]
async fn health_and_status_need_no_token() {
    let app = TestApp::on_disk().await;

    let (status, body) = app.request(Method::GET, "/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "up");

    let (status, body) = app.request(Method::GET, "/health/ready", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["database"], "up");

    let (status, body) = app.request(Method::GET, "/api/v1/status", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["service"], "parcelflow-api");

    let (status, body) = app
        .request(Method::GET, "/api-docs/openapi.json", None, None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["info"]["title"], "Parcelflow API");
}

#[tokio::test]
async fn missing_or_forged_token_is_unauthorized() {
    let app = TestApp::on_disk().await;

    let (status, body) = app.request(Method::GET, "/api/v1/orders", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["success"], false);
    assert_eq!(body["error"], "Unauthorized");

    let request = axum::http::Request::builder()
        .uri("/api/v1/orders")
        .header("authorization", "Bearer not-a-jwt")
        .body(axum::body::Body::empty())
        .unwrap();
    let response = tower::ServiceExt::oneshot(app.router(), request)
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn operator_creates_a_priced_pending_order() {
    let app = TestApp::on_disk().await;
    let operator = app.operator();

    let (status, body) = app
        .request(
            Method::POST,
            "/api/v1/orders",
            Some(&operator),
            Some(order_body(&app)),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["success"], true);
    let order = &body["data"];
    assert_eq!(order["status"], "pending");
    assert_eq!(money(&order["shipping_fee"]), dec!(35000));
    assert_eq!(money(&order["discount_amount"]), dec!(3500));
    assert_eq!(money(&order["payable_fee"]), dec!(31500));

    let tracking = order["tracking_number"].as_str().unwrap();
    let (status, body) = app
        .request(
            Method::GET,
            &format!("/api/v1/orders/tracking/{}", tracking),
            Some(&operator),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["id"], order["id"]);

    let (status, body) = app
        .request(
            Method::GET,
            &format!("/api/v1/orders/{}/history", order["id"].as_str().unwrap()),
            Some(&operator),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"].as_array().map(Vec::len), Some(1));
}

#[tokio::test]
async fn drivers_cannot_create_orders() {
    let app = TestApp::on_disk().await;
    let driver = app.driver();

    let (status, body) = app
        .request(
            Method::POST,
            "/api/v1/orders",
            Some(&driver),
            Some(order_body(&app)),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["success"], false);
}

#[tokio::test]
async fn invalid_payload_is_a_bad_request() {
    let app = TestApp::on_disk().await;
    let mut body = order_body(&app);
    body["weight"] = json!("0");

    let (status, response) = app
        .request(Method::POST, "/api/v1/orders", Some(&app.operator()), Some(body))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(response["error"], "Bad Request");
    assert_eq!(response["success"], false);
}

#[tokio::test]
async fn malformed_input_gets_the_error_envelope() {
    let app = TestApp::on_disk().await;

    let (status, body) = app
        .request(
            Method::POST,
            "/api/v1/shipments/pickup",
            Some(&app.driver()),
            Some(json!({ "vehicle_id": null })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);
    assert_eq!(body["error"], "Bad Request");

    let (status, body) = app
        .request(
            Method::POST,
            "/api/v1/payment-submissions",
            Some(&app.agent()),
            Some(json!({ "order_ids": ["not-a-uuid"], "total_amount_submitted": "1000" })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);

    let (status, body) = app
        .request(
            Method::GET,
            "/api/v1/orders/not-a-uuid",
            Some(&app.operator()),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);
    assert!(body["message"].as_str().unwrap().starts_with("Validation error"));
}

#[tokio::test]
async fn pickup_reports_skipped_orders() {
    let app = TestApp::on_disk().await;
    let order = app.confirmed_order(dec!(0)).await;
    let missing = Uuid::new_v4();
    let driver = app.driver();

    let (status, body) = app
        .request(
            Method::POST,
            "/api/v1/shipments/pickup",
            Some(&driver),
            Some(json!({ "order_ids": [order.id, missing] })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    let items = body["data"]["items"].as_array().unwrap();
    assert_eq!(items[0]["outcome"], "accepted");
    assert_eq!(items[1]["outcome"], "skipped");
    assert_eq!(items[1]["reason"], "not_found");

    // Staff must name the driver whose trips they want.
    let (status, _) = app
        .request(Method::GET, "/api/v1/shipments", Some(&app.operator()), None)
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = app
        .request(Method::GET, "/api/v1/shipments", Some(&driver), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["total"], 1);
    assert_eq!(body["data"]["items"][0]["status"], "pending");
}

#[tokio::test]
async fn pickup_of_only_ineligible_orders_opens_nothing() {
    let app = TestApp::on_disk().await;
    let missing = Uuid::new_v4();

    let (status, body) = app
        .request(
            Method::POST,
            "/api/v1/shipments/pickup",
            Some(&app.driver()),
            Some(json!({ "order_ids": [missing] })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert!(body["data"]["shipment_id"].is_null());
    assert_eq!(body["data"]["items"][0]["order_id"], missing.to_string());
    assert_eq!(body["data"]["items"][0]["reason"], "not_found");
}

#[rstest]
#[case(ActorRole::Finance, StatusCode::OK)]
#[case(ActorRole::OfficeManager, StatusCode::OK)]
#[case(ActorRole::Admin, StatusCode::OK)]
#[case(ActorRole::Driver, StatusCode::FORBIDDEN)]
#[case(ActorRole::Customer, StatusCode::FORBIDDEN)]
#[case(ActorRole::DeliveryAgent, StatusCode::FORBIDDEN)]
#[tokio::test]
async fn ledger_is_for_finance_and_managers(#[case] role: ActorRole, #[case] expected: StatusCode) {
    let app = TestApp::on_disk().await;
    let caller = actor(role, Some(app.saigon_hub));

    let (status, _) = app
        .request(Method::GET, "/api/v1/ledger", Some(&caller), None)
        .await;
    assert_eq!(status, expected);
}

#[tokio::test]
async fn finance_records_manual_ledger_entries() {
    let app = TestApp::on_disk().await;
    let entry = json!({
        "kind": "expense",
        "purpose": "office_expense",
        "amount": "250000",
        "office_id": app.hanoi_hub,
        "description": "van repair"
    });

    let (status, body) = app
        .request(
            Method::POST,
            "/api/v1/ledger",
            Some(&app.finance()),
            Some(entry.clone()),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["data"]["status"], "pending");
    assert_eq!(money(&body["data"]["amount"]), dec!(250000));

    let manager = actor(ActorRole::OfficeManager, Some(app.hanoi_hub));
    let (status, _) = app
        .request(Method::POST, "/api/v1/ledger", Some(&manager), Some(entry.clone()))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let mut transfer = entry;
    transfer["kind"] = json!("income");
    transfer["purpose"] = json!("revenue_transfer");
    let (status, body) = app
        .request(Method::POST, "/api/v1/ledger", Some(&app.finance()), Some(transfer))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);

    let (_, body) = app
        .request(Method::GET, "/api/v1/ledger", Some(&manager), None)
        .await;
    assert_eq!(body["data"]["total"], 1);
}
