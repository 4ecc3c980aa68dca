use actix_web::{
    http::StatusCode,
    test::{self, TestRequest},
    web,
    App,
};
use booking_engine::{traits::ReconciliationDatabase, ReconciliationApi, SqliteDatabase};
use brg_common::Secret;
use serde_json::json;

use crate::{
    cal_routes::CalWebhookRoute,
    endpoint_tests::helpers::{new_test_api, status_and_body},
    helpers::calculate_hmac,
    middleware::HmacMiddlewareFactory,
};

const SECRET: &str = "abc";

async fn deliver(
    api: ReconciliationApi<SqliteDatabase>,
    body: String,
    signature: Option<String>,
) -> (StatusCode, String) {
    let app = App::new().app_data(web::Data::new(api)).service(
        web::scope("/webhook/cal")
            .wrap(HmacMiddlewareFactory::new("x-cal-signature-256", Secret::new(SECRET.to_string()), true))
            .service(CalWebhookRoute::<SqliteDatabase>::new()),
    );
    let service = test::init_service(app).await;
    let mut req = TestRequest::post().uri("/webhook/cal").set_payload(body);
    if let Some(signature) = signature {
        req = req.insert_header(("x-cal-signature-256", signature));
    }
    status_and_body(test::try_call_service(&service, req.to_request()).await).await
}

fn signed(body: &str) -> Option<String> {
    Some(calculate_hmac(SECRET, body.as_bytes()))
}

#[actix_web::test]
async fn correctly_signed_garbage_passes_hmac_but_fails_parsing() {
    let api = new_test_api().await;
    let (status, body) = deliver(api, "xyz".to_string(), signed("xyz")).await;
    // Getting "bad json" back proves the signature check accepted the request.
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, "bad json");
}

#[actix_web::test]
async fn tampered_signature_is_rejected() {
    let api = new_test_api().await;
    let mut signature = calculate_hmac(SECRET, b"xyz");
    // Flip the last hex digit.
    let last = if signature.pop() == Some('0') { '1' } else { '0' };
    signature.push(last);
    let (status, _) = deliver(api, "xyz".to_string(), Some(signature)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[actix_web::test]
async fn missing_signature_is_rejected() {
    let api = new_test_api().await;
    let (status, _) = deliver(api, "xyz".to_string(), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[actix_web::test]
async fn unknown_event_is_acknowledged_without_store_access() {
    let api = new_test_api().await;
    let db = api.db().clone();
    let body = json!({"triggerEvent": "MEETING_STARTED"}).to_string();
    let signature = signed(&body);
    let (status, response) = deliver(api, body, signature).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(response, "ignored");
    let candidates = db.fetch_booking_candidates(None, None).await.unwrap();
    assert!(candidates.is_empty());
}

#[actix_web::test]
async fn created_event_inserts_an_order() {
    let api = new_test_api().await;
    let db = api.db().clone();
    let body = json!({
        "triggerEvent": "Réservation créée",
        "payload": {"booking": {
            "uid": "res-cal-1",
            "startTime": "2026-03-01T10:00:00Z",
            "endTime": "2026-03-01T11:00:00Z",
            "attendees": [{"email": "alice@example.com"}]
        }}
    })
    .to_string();
    let (status, response) = deliver(api, body.clone(), signed(&body)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(response, "ok");
    let order = db.fetch_order_by_reservation_id("res-cal-1").await.unwrap().unwrap();
    assert_eq!(order.customer_email.as_deref(), Some("alice@example.com"));
}

#[actix_web::test]
async fn reschedule_without_reservation_id_is_a_bad_request() {
    let api = new_test_api().await;
    let body = json!({"triggerEvent": "BOOKING_RESCHEDULED", "payload": {"booking": {}}}).to_string();
    let (status, response) = deliver(api, body.clone(), signed(&body)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(response, "missing reservation id");
}

#[actix_web::test]
async fn cancellation_for_unknown_reservation_is_acknowledged() {
    let api = new_test_api().await;
    let body = json!({"triggerEvent": "Réservation annulée", "payload": {"booking": {"uid": "never-seen"}}}).to_string();
    let (status, response) = deliver(api, body.clone(), signed(&body)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(response, "ok");
}
