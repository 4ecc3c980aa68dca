use actix_web::{
    error::ResponseError,
    http::{header::ContentType, StatusCode},
    HttpResponse,
};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("Could not initialize server. {0}")]
    InitializeError(String),
    #[error("An error occurred on the backend of the server. {0}")]
    BackendError(String),
    #[error("Payload deserialization error")]
    CouldNotDeserializePayload,
    #[error("Could not read request body: {0}")]
    InvalidRequestBody(String),
    #[error("An I/O error happened in the server. {0}")]
    IOError(#[from] std::io::Error),
    #[error("Invalid server configuration. {0}")]
    ConfigurationError(String),
    #[error("UnspecifiedError. {0}")]
    Unspecified(String),
    #[error("The request is missing one or more required fields")]
    MissingFields,
    #[error("The event does not carry a reservation id")]
    MissingReservationId,
    #[error("The payment provider rejected the request. {0}")]
    PaymentProviderError(String),
}

impl ResponseError for ServerError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::CouldNotDeserializePayload => StatusCode::BAD_REQUEST,
            Self::InvalidRequestBody(_) => StatusCode::BAD_REQUEST,
            Self::MissingFields => StatusCode::BAD_REQUEST,
            Self::MissingReservationId => StatusCode::BAD_REQUEST,
            Self::InitializeError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::BackendError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::IOError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::ConfigurationError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Unspecified(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::PaymentProviderError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    // Client-visible error bodies stay terse. The full error is logged server-side where it occurs; callers (the
    // providers' retry loops and the storefront) only need the status code.
    fn error_response(&self) -> HttpResponse {
        let body = match self {
            Self::MissingFields => "Missing fields",
            Self::MissingReservationId => "missing reservation id",
            Self::CouldNotDeserializePayload => "bad json",
            Self::InvalidRequestBody(_) => "bad request",
            Self::BackendError(_) => "db error",
            _ => "server error",
        };
        HttpResponse::build(self.status_code()).insert_header(ContentType::plaintext()).body(body)
    }
}
