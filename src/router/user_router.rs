use axum::{routing::post, Router};

use crate::handler::user_handler::{login_handler, refresh_token_handler, UserState};

pub fn user_router(state: UserState) -> Router {
    Router::new()
        .route("/users/login", post(login_handler))
        .route("/users/refresh-token", post(refresh_token_handler))
        .with_state(state)
}
