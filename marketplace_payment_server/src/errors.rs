use actix_web::{
    error::ResponseError,
    http::{header::ContentType, StatusCode},
    HttpResponse,
};
use marketplace_payment_engine::traits::PaymentGatewayError;
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
    #[error("Could not read request path: {0}")]
    InvalidRequestPath(String),
    #[error("An I/O error happened in the server. {0}")]
    IOError(#[from] std::io::Error),
    #[error("Invalid server configuration. {0}")]
    ConfigurationError(String),
    #[error("UnspecifiedError. {0}")]
    Unspecified(String),
    #[error("The data was not found. {0}")]
    NoRecordFound(String),
    #[error("Insufficient Permissions. {0}")]
    InsufficientPermissions(String),
    #[error("The request conflicts with the current state of the order. {0}")]
    OrderConflict(String),
    #[error("The X-User-Id header is missing or malformed")]
    MissingIdentity,
}

impl ResponseError for ServerError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::CouldNotDeserializePayload => StatusCode::BAD_REQUEST,
            Self::InvalidRequestBody(_) => StatusCode::BAD_REQUEST,
            Self::InvalidRequestPath(_) => StatusCode::BAD_REQUEST,
            Self::InitializeError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::BackendError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::IOError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::ConfigurationError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Unspecified(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::NoRecordFound(_) => StatusCode::NOT_FOUND,
            Self::InsufficientPermissions(_) => StatusCode::FORBIDDEN,
            Self::OrderConflict(_) => StatusCode::CONFLICT,
            Self::MissingIdentity => StatusCode::UNAUTHORIZED,
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code())
            .insert_header(ContentType::json())
            .body(serde_json::json!({ "error": self.to_string() }).to_string())
    }
}

impl From<PaymentGatewayError> for ServerError {
    fn from(e: PaymentGatewayError) -> Self {
        match e {
            PaymentGatewayError::DatabaseError(e) => Self::BackendError(format!("Database error: {e}")),
            PaymentGatewayError::ValidationError(_) => Self::InvalidRequestBody(e.to_string()),
            PaymentGatewayError::ProductNotFound(_) |
            PaymentGatewayError::VariantNotFound(_) |
            PaymentGatewayError::OrderNotFound(_) |
            PaymentGatewayError::OrderLineNotFound(_) |
            PaymentGatewayError::TransactionNotFound(_) => Self::NoRecordFound(e.to_string()),
            PaymentGatewayError::VariantMismatch { .. } => Self::InvalidRequestBody(e.to_string()),
            PaymentGatewayError::InsufficientStock { .. } |
            PaymentGatewayError::IllegalStatusTransition(_) |
            PaymentGatewayError::AmountMismatch { .. } |
            PaymentGatewayError::DuplicateProcessing(_) => Self::OrderConflict(e.to_string()),
            PaymentGatewayError::PermissionDenied(_) => Self::InsufficientPermissions(e.to_string()),
        }
    }
}
