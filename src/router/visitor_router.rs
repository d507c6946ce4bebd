use std::sync::Arc;

use axum::{
    middleware,
    routing::{get, post},
    Router,
};

use crate::handler::visitor_handler::{
    analytics_handler, recent_visitors_handler, track_visitor_handler, visitor_details_handler, VisitorState,
};
use crate::middlewares::admin_middleware::{admin_auth, AdminAuthState};

pub fn visitor_router(state: VisitorState, admin_auth_state: Arc<AdminAuthState>) -> Router {
    // Public route
    let public = Router::new().route("/visitors/track", post(track_visitor_handler));

    // Admin-protected routes
    let admin = Router::new()
        .route("/visitors/analytics", get(analytics_handler))
        .route("/visitors/recent", get(recent_visitors_handler))
        .route("/visitors/{id}", get(visitor_details_handler))
        .route_layer(middleware::from_fn_with_state(admin_auth_state, admin_auth));

    public.merge(admin).with_state(state)
}
