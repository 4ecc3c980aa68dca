use actix_web::{dev::ServiceResponse, error::ResponseError, http::StatusCode, test, Error};
use booking_engine::{
    test_utils::{prepare_test_env, random_db_path},
    ReconciliationApi,
    SqliteDatabase,
};

/// A fresh reconciliation API over a brand-new sqlite database.
pub async fn new_test_api() -> ReconciliationApi<SqliteDatabase> {
    let url = random_db_path();
    prepare_test_env(&url).await;
    let db = SqliteDatabase::new_with_url(&url, 5).await.expect("Error creating connection to database");
    ReconciliationApi::new(db)
}

/// Flatten a service call result into (status, body). Middleware rejections surface as `Err` in the test harness
/// rather than as responses, so both arms are needed.
pub async fn status_and_body(result: Result<ServiceResponse, Error>) -> (StatusCode, String) {
    match result {
        Ok(res) => {
            let status = res.status();
            let body = test::read_body(res).await;
            (status, String::from_utf8_lossy(&body).into_owned())
        },
        Err(e) => (e.as_response_error().status_code(), e.to_string()),
    }
}
