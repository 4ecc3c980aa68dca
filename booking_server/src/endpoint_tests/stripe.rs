use actix_web::{
    http::StatusCode,
    test::{self, TestRequest},
    web,
    App,
};
use booking_engine::{traits::ReconciliationDatabase, ReconciliationApi, SqliteDatabase};
use brg_common::{Euros, Secret};
use chrono::Utc;
use serde_json::{json, Value};
use stripe_tools::{compute_signature, StripeApi, StripeConfig};

use crate::{
    endpoint_tests::helpers::{new_test_api, status_and_body},
    stripe_routes::StripeWebhookRoute,
};

const WEBHOOK_SECRET: &str = "whsec_endpoint_test";

fn stripe_api(secret: &str) -> StripeApi {
    let config = StripeConfig { webhook_secret: Secret::new(secret.to_string()), ..Default::default() };
    StripeApi::new(config).unwrap()
}

async fn deliver(
    api: ReconciliationApi<SqliteDatabase>,
    stripe: StripeApi,
    body: String,
    signature: Option<String>,
) -> (StatusCode, String) {
    let app = App::new()
        .app_data(web::Data::new(api))
        .app_data(web::Data::new(stripe))
        .service(StripeWebhookRoute::<SqliteDatabase>::new());
    let service = test::init_service(app).await;
    let mut req = TestRequest::post().uri("/webhook/stripe").set_payload(body);
    if let Some(signature) = signature {
        req = req.insert_header(("stripe-signature", signature));
    }
    status_and_body(test::try_call_service(&service, req.to_request()).await).await
}

fn signed(body: &str) -> Option<String> {
    let timestamp = Utc::now().timestamp();
    Some(format!("t={timestamp},v1={}", compute_signature(timestamp, body.as_bytes(), WEBHOOK_SECRET)))
}

fn completed_event(session: Value) -> String {
    json!({
        "id": "evt_endpoint_1",
        "type": "checkout.session.completed",
        "data": { "object": session }
    })
    .to_string()
}

#[actix_web::test]
async fn missing_signature_header_is_rejected() {
    let api = new_test_api().await;
    let (status, body) = deliver(api, stripe_api(WEBHOOK_SECRET), "{}".to_string(), None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, "Missing signature");
}

#[actix_web::test]
async fn unset_signing_secret_rejects_all_deliveries() {
    let api = new_test_api().await;
    let (status, _) = deliver(api, stripe_api(""), "{}".to_string(), signed("{}")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[actix_web::test]
async fn tampered_payload_is_rejected() {
    let api = new_test_api().await;
    let body = completed_event(json!({"id": "cs_1", "amount_total": 5000}));
    let signature = signed(&body);
    let tampered = body.replace("5000", "5001");
    let (status, response) = deliver(api, stripe_api(WEBHOOK_SECRET), tampered, signature).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(response.starts_with("Webhook Error:"));
}

#[actix_web::test]
async fn non_checkout_events_are_acknowledged_and_ignored() {
    let api = new_test_api().await;
    let body = json!({"id": "evt_2", "type": "payment_intent.created", "data": {"object": {}}}).to_string();
    let signature = signed(&body);
    let (status, response) = deliver(api, stripe_api(WEBHOOK_SECRET), body, signature).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(response, "ignored");
}

#[actix_web::test]
async fn completed_session_settles_against_metadata_order() {
    let api = new_test_api().await;
    let db = api.db().clone();
    let order = db
        .insert_order(booking_engine::db_types::NewOrder {
            customer_email: Some("alice@example.com".to_string()),
            ..Default::default()
        })
        .await
        .unwrap();
    let session = json!({
        "id": "cs_settle_1",
        "amount_total": 5000,
        "payment_intent": "pi_settle_1",
        "customer_details": {"email": "alice@example.com"},
        "metadata": {"order_id": order.id.to_string(), "price": "50"}
    });
    let body = completed_event(session);
    let signature = signed(&body);
    let (status, response) = deliver(api, stripe_api(WEBHOOK_SECRET), body, signature).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(response, "ok");
    let paid = db.fetch_order_by_id(order.id).await.unwrap().unwrap();
    assert_eq!(paid.status, booking_engine::db_types::OrderStatus::Paid);
    assert_eq!(paid.price, Some(Euros::from(50)));
}

#[actix_web::test]
async fn stale_metadata_order_reference_is_a_server_error() {
    let api = new_test_api().await;
    let session = json!({
        "id": "cs_stale_1",
        "amount_total": 5000,
        "payment_intent": "pi_stale_1",
        "metadata": {"order_id": "999999"}
    });
    let body = completed_event(session);
    let signature = signed(&body);
    let (status, _) = deliver(api, stripe_api(WEBHOOK_SECRET), body, signature).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
}
