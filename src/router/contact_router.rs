use std::sync::Arc;

use axum::{
    middleware,
    routing::{get, post},
    Router,
};

use crate::handler::contact_handler::{
    contact_stats_handler, delete_contact_handler, get_contact_handler, list_contacts_handler,
    reply_contact_handler, submit_contact_handler, update_contact_handler, ContactState,
};
use crate::middlewares::admin_middleware::{admin_auth, AdminAuthState};

pub fn contact_router(state: ContactState, admin_auth_state: Arc<AdminAuthState>) -> Router {
    // Public route
    let public = Router::new().route("/contacts/submit", post(submit_contact_handler));

    // Admin-protected routes
    let admin = Router::new()
        .route("/contacts", get(list_contacts_handler))
        .route("/contacts/stats", get(contact_stats_handler))
        .route(
            "/contacts/{id}",
            get(get_contact_handler).put(update_contact_handler).delete(delete_contact_handler),
        )
        .route("/contacts/{id}/reply", post(reply_contact_handler))
        .route_layer(middleware::from_fn_with_state(admin_auth_state, admin_auth));

    public.merge(admin).with_state(state)
}
