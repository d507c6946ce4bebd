use std::sync::Arc;

use axum::{body::Body, extract::State, http::Request, middleware::Next, response::Response};
use tracing::{debug, warn};

use crate::model::user::ADMIN_ROLE;
use crate::util::error::HandlerError;
use crate::util::jwt::JwtTokenUtils;

pub struct AdminAuthState {
    pub jwt_utils: Arc<dyn JwtTokenUtils>,
}

/// Requires a valid access token whose role is admin. The decoded claims are
/// made available to handlers as a request extension.
pub async fn admin_auth(
    State(state): State<Arc<AdminAuthState>>,
    mut req: Request<Body>,
    next: Next,
) -> Result<Response, HandlerError> {
    let Some(auth_header) = req.headers().get("authorization").and_then(|v| v.to_str().ok()) else {
        debug!("Admin route without authorization header");
        return Err(HandlerError::unauthorized("Access token required"));
    };

    let token = state
        .jwt_utils
        .extract_token_from_header(auth_header)
        .map_err(|_| HandlerError::unauthorized("Malformed authorization header"))?;
    let claims = state.jwt_utils.validate_access_token(&token).map_err(|e| {
        debug!("Rejected access token: {}", e);
        HandlerError::unauthorized("Invalid or expired token")
    })?;

    if claims.role != ADMIN_ROLE {
        warn!(user_id = %claims.sub, "Non-admin token on admin route");
        return Err(HandlerError::unauthorized("Admin access required"));
    }

    req.extensions_mut().insert(claims);
    Ok(next.run(req).await)
}
