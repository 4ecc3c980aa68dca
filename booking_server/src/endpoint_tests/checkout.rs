use actix_web::{
    http::StatusCode,
    test::{self, TestRequest},
    web,
    App,
};
use serde_json::{json, Value};
use stripe_tools::{StripeApi, StripeConfig};

use crate::{checkout_routes::create_checkout_session, endpoint_tests::helpers::status_and_body};

async fn post_checkout(body: Value) -> (StatusCode, String) {
    let stripe = StripeApi::new(StripeConfig::default()).unwrap();
    let app = App::new().app_data(web::Data::new(stripe)).service(
        web::scope("/checkout")
            .service(create_checkout_session)
            .default_service(web::to(|| async { actix_web::HttpResponse::MethodNotAllowed().body("Method Not Allowed") })),
    );
    let service = test::init_service(app).await;
    let req = TestRequest::post().uri("/checkout/session").set_json(body).to_request();
    status_and_body(test::try_call_service(&service, req).await).await
}

#[actix_web::test]
async fn empty_body_is_missing_fields() {
    let (status, body) = post_checkout(json!({})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, "Missing fields");
}

#[actix_web::test]
async fn zero_amount_is_missing_fields() {
    let (status, body) = post_checkout(json!({
        "productName": "Coaching 1h",
        "amountEuros": 0,
        "successUrl": "https://site/ok?session_id={CHECKOUT_SESSION_ID}",
        "cancelUrl": "https://site/cancel"
    }))
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, "Missing fields");
}

#[actix_web::test]
async fn missing_urls_are_missing_fields() {
    let (status, _) = post_checkout(json!({"productName": "Coaching 1h", "amountEuros": 50})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[actix_web::test]
async fn wrong_method_is_rejected() {
    let stripe = StripeApi::new(StripeConfig::default()).unwrap();
    let app = App::new().app_data(web::Data::new(stripe)).service(
        web::scope("/checkout")
            .service(create_checkout_session)
            .default_service(web::to(|| async { actix_web::HttpResponse::MethodNotAllowed().body("Method Not Allowed") })),
    );
    let service = test::init_service(app).await;
    let req = TestRequest::get().uri("/checkout/session").to_request();
    let (status, _) = status_and_body(test::try_call_service(&service, req).await).await;
    assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);
}
