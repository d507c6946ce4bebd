pub mod contact_handler;
pub mod user_handler;
pub mod visitor_handler;

use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::Json;

use crate::config::Environment;
use crate::util::error::{HandlerError, ServiceError};

/// Shared handler state: one service plus the runtime environment, which
/// decides how much error detail reaches the client.
pub struct ApiState<S: ?Sized> {
    pub service: Arc<S>,
    pub environment: Environment,
}

impl<S: ?Sized> Clone for ApiState<S> {
    fn clone(&self) -> Self {
        ApiState { service: self.service.clone(), environment: self.environment }
    }
}

impl<S: ?Sized> ApiState<S> {
    pub fn new(service: Arc<S>, environment: Environment) -> Self {
        ApiState { service, environment }
    }

    pub fn error(&self, err: ServiceError) -> HandlerError {
        HandlerError::from_service(err, self.environment.is_development())
    }
}

/// Unwrap a JSON body, turning malformed input into a 400.
pub fn json_body<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, HandlerError> {
    payload
        .map(|Json(body)| body)
        .map_err(|rejection| HandlerError::bad_request(format!("Invalid request body: {}", rejection.body_text())))
}
