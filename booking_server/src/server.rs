use std::time::Duration;

use actix_cors::Cors;
use actix_web::{dev::Server, http::KeepAlive, middleware::Logger, web, App, HttpResponse, HttpServer};
use booking_engine::{ReconciliationApi, SqliteDatabase};
use log::warn;
use stripe_tools::StripeApi;

use crate::{
    cal_routes::CalWebhookRoute,
    checkout_routes::create_checkout_session,
    config::ServerConfig,
    errors::ServerError,
    middleware::HmacMiddlewareFactory,
    routes::health,
    stripe_routes::StripeWebhookRoute,
};

pub async fn run_server(config: ServerConfig) -> Result<(), ServerError> {
    let db = SqliteDatabase::new_with_url(&config.database_url, 25)
        .await
        .map_err(|e| ServerError::InitializeError(e.to_string()))?;
    let srv = create_server_instance(config, db)?;
    srv.await.map_err(|e| ServerError::Unspecified(e.to_string()))
}

pub fn create_server_instance(config: ServerConfig, db: SqliteDatabase) -> Result<Server, ServerError> {
    let stripe_api = StripeApi::new(config.stripe_config.clone())
        .map_err(|e| ServerError::InitializeError(format!("Could not create the payment provider client. {e}")))?;
    let hmac_enabled = !config.cal_webhook_secret.is_unset();
    if !hmac_enabled {
        warn!(
            "🚨️ Signature checks on the scheduling webhook are DISABLED because no secret is configured. Do not \
             run like this in production."
        );
    }
    if stripe_api.webhook_secret_is_unset() {
        warn!("🚨️ No payment webhook signing secret is configured. All payment webhook deliveries will be rejected.");
    }
    let srv = HttpServer::new(move || {
        let api = ReconciliationApi::new(db.clone());
        let app = App::new()
            .wrap(Logger::new("%t (%D ms) %s %a %{Host}i %U").log_target("brg::access_log"))
            .app_data(web::Data::new(api))
            .app_data(web::Data::new(stripe_api.clone()));
        let cal_scope = web::scope("/webhook/cal")
            .wrap(HmacMiddlewareFactory::new("x-cal-signature-256", config.cal_webhook_secret.clone(), hmac_enabled))
            .service(CalWebhookRoute::<SqliteDatabase>::new());
        // The checkout endpoint is called from the storefront browser, so it gets CORS; the webhooks are
        // server-to-server and do not.
        let checkout_scope = web::scope("/checkout")
            .wrap(Cors::permissive())
            .service(create_checkout_session)
            .default_service(web::to(method_not_allowed));
        app.service(health)
            .service(cal_scope)
            .service(checkout_scope)
            .service(StripeWebhookRoute::<SqliteDatabase>::new())
    })
    .keep_alive(KeepAlive::Timeout(Duration::from_secs(600)))
    .bind((config.host.as_str(), config.port))?
    .run();
    Ok(srv)
}

async fn method_not_allowed() -> HttpResponse {
    HttpResponse::MethodNotAllowed().body("Method Not Allowed")
}
