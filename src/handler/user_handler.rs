use axum::{
    extract::{rejection::JsonRejection, State},
    response::IntoResponse,
    Json,
};
use validator::Validate;

use crate::dto::user_dto::{LoginRequest, RefreshTokenRequest};
use crate::handler::{json_body, ApiState};
use crate::service::user_service::UserService;
use crate::util::error::HandlerError;

pub type UserState = ApiState<dyn UserService>;

// Login
pub async fn login_handler(
    State(state): State<UserState>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<impl IntoResponse, HandlerError> {
    let payload = json_body(payload)?;
    if let Err(e) = payload.validate() {
        return Err(HandlerError::bad_request(format!("Validation error: {}", e)));
    }
    let res = state.service.login(payload).await.map_err(|e| state.error(e))?;
    Ok(Json(res))
}

// Refresh Token
pub async fn refresh_token_handler(
    State(state): State<UserState>,
    payload: Result<Json<RefreshTokenRequest>, JsonRejection>,
) -> Result<impl IntoResponse, HandlerError> {
    let payload = json_body(payload)?;
    if let Err(e) = payload.validate() {
        return Err(HandlerError::bad_request(format!("Validation error: {}", e)));
    }
    let res = state
        .service
        .refresh_token(&payload.refresh_token)
        .await
        .map_err(|e| state.error(e))?;
    Ok(Json(res))
}
