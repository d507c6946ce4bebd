use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;

use crate::util::email::EmailError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum HandlerErrorKind {
    NotFound,
    Validation,
    Unauthorized,
    Delivery,
    Internal,
    Conflict,
}

impl HandlerErrorKind {
    pub fn status(&self) -> StatusCode {
        match self {
            HandlerErrorKind::NotFound => StatusCode::NOT_FOUND,
            HandlerErrorKind::Validation => StatusCode::BAD_REQUEST,
            HandlerErrorKind::Unauthorized => StatusCode::UNAUTHORIZED,
            HandlerErrorKind::Conflict => StatusCode::CONFLICT,
            HandlerErrorKind::Delivery | HandlerErrorKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl std::fmt::Display for HandlerErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            HandlerErrorKind::NotFound => "NotFound",
            HandlerErrorKind::Validation => "Validation",
            HandlerErrorKind::Unauthorized => "Unauthorized",
            HandlerErrorKind::Delivery => "Delivery",
            HandlerErrorKind::Internal => "Internal",
            HandlerErrorKind::Conflict => "Conflict",
        };
        write!(f, "{}", s)
    }
}

/// JSON error body returned by every handler.
#[derive(Debug, Serialize)]
pub struct HandlerError {
    pub success: bool,
    pub error: HandlerErrorKind,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl HandlerError {
    pub fn new<T: Into<String>>(error: HandlerErrorKind, message: T) -> Self {
        HandlerError { success: false, error, message: message.into(), details: None }
    }

    pub fn bad_request<T: Into<String>>(message: T) -> Self {
        Self::new(HandlerErrorKind::Validation, message)
    }

    pub fn unauthorized<T: Into<String>>(message: T) -> Self {
        Self::new(HandlerErrorKind::Unauthorized, message)
    }

    pub fn with_details<T: Into<String>>(mut self, details: T) -> Self {
        self.details = Some(details.into());
        self
    }

    /// Map a service failure to its HTTP shape. Internal detail is only
    /// exposed when `expose_internal` is set (development mode).
    pub fn from_service(err: ServiceError, expose_internal: bool) -> Self {
        match err {
            ServiceError::NotFound(msg) => Self::new(HandlerErrorKind::NotFound, msg),
            ServiceError::InvalidInput(msg) => Self::new(HandlerErrorKind::Validation, msg),
            ServiceError::MissingFields { required, missing } => {
                Self::new(HandlerErrorKind::Validation, format!(
                    "Please fill in all required fields: {}",
                    required.join(", ")
                ))
                .with_details(format!("Missing: {}", missing.join(", ")))
            }
            ServiceError::Unauthorized(msg) => Self::new(HandlerErrorKind::Unauthorized, msg),
            ServiceError::Conflict(msg) => Self::new(HandlerErrorKind::Conflict, msg),
            ServiceError::Delivery(msg) => {
                let err = Self::new(HandlerErrorKind::Delivery, delivery_headline(&msg));
                if expose_internal { err.with_details(msg) } else { err }
            }
            ServiceError::InternalError(msg) => {
                let err = Self::new(
                    HandlerErrorKind::Internal,
                    "Something went wrong. Please try again later.",
                );
                if expose_internal { err.with_details(msg) } else { err }
            }
        }
    }
}

/// First sentence of a delivery message; transport detail follows the colon.
fn delivery_headline(msg: &str) -> String {
    msg.split(':').next().unwrap_or(msg).trim().to_string()
}

impl std::fmt::Display for HandlerError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.error, self.message)
    }
}

impl std::error::Error for HandlerError {}

impl IntoResponse for HandlerError {
    fn into_response(self) -> Response {
        let status = self.error.status();
        (status, axum::Json(self)).into_response()
    }
}

#[derive(Debug, Clone)]
pub enum ServiceError {
    NotFound(String),
    InvalidInput(String),
    MissingFields { required: Vec<String>, missing: Vec<String> },
    Unauthorized(String),
    /// Email could not be handed to the transport
    Delivery(String),
    InternalError(String),
    Conflict(String),
}

impl std::fmt::Display for ServiceError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ServiceError::NotFound(msg) => write!(f, "Not Found: {}", msg),
            ServiceError::InvalidInput(msg) => write!(f, "Invalid Input: {}", msg),
            ServiceError::MissingFields { missing, .. } => {
                write!(f, "Invalid Input: missing required fields {}", missing.join(", "))
            }
            ServiceError::Unauthorized(msg) => write!(f, "Unauthorized: {}", msg),
            ServiceError::Delivery(msg) => write!(f, "Delivery Error: {}", msg),
            ServiceError::InternalError(msg) => write!(f, "Internal Error: {}", msg),
            ServiceError::Conflict(msg) => write!(f, "Conflict: {}", msg),
        }
    }
}

impl std::error::Error for ServiceError {}

// Allow conversion from RepositoryError to ServiceError
impl From<crate::repository::repository_error::RepositoryError> for ServiceError {
    fn from(err: crate::repository::repository_error::RepositoryError) -> Self {
        use crate::repository::repository_error::RepositoryError;
        match err {
            RepositoryError::NotFound(msg) => ServiceError::NotFound(msg),
            RepositoryError::ValidationError(msg) => ServiceError::InvalidInput(msg),
            RepositoryError::AlreadyExists(msg) => ServiceError::Conflict(msg),
            RepositoryError::DatabaseError(msg) => ServiceError::InternalError(msg),
            RepositoryError::ConnectionError(msg) => ServiceError::InternalError(msg),
            RepositoryError::SerializationError(msg) => ServiceError::InternalError(msg),
            RepositoryError::Generic(e) => ServiceError::InternalError(e.to_string()),
        }
    }
}

impl From<EmailError> for ServiceError {
    fn from(err: EmailError) -> Self {
        ServiceError::Delivery(err.to_string())
    }
}
