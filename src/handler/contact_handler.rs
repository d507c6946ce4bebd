use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Extension, Json,
};
use tracing::{error, info};

use crate::dto::contact_dto::{
    ContactResponse, ListContactsQuery, MessageResponse, ReplyRequest, SubmitContactRequest, SubmitContactResponse,
    UpdateContactRequest,
};
use crate::handler::{json_body, ApiState};
use crate::service::contact_service::ContactService;
use crate::util::error::{HandlerError, HandlerErrorKind};
use crate::util::jwt::Claims;
use crate::util::request_meta::RequestMeta;

pub type ContactState = ApiState<dyn ContactService>;

// Submit (public)
pub async fn submit_contact_handler(
    State(state): State<ContactState>,
    meta: RequestMeta,
    payload: Result<Json<SubmitContactRequest>, JsonRejection>,
) -> Result<impl IntoResponse, HandlerError> {
    let request = json_body(payload)?;
    let contact_id = state.service.submit(request, meta).await.map_err(|e| {
        error!("Enquiry submission failed: {}", e);
        state.error(e)
    })?;
    info!(contact_id = %contact_id, "Enquiry submitted");
    Ok((
        StatusCode::CREATED,
        Json(SubmitContactResponse {
            success: true,
            message: "Thank you for your enquiry. We will be in touch shortly.".to_string(),
            contact_id,
        }),
    ))
}

pub async fn list_contacts_handler(
    State(state): State<ContactState>,
    Query(query): Query<ListContactsQuery>,
) -> Result<impl IntoResponse, HandlerError> {
    let res = state.service.list(query).await.map_err(|e| state.error(e))?;
    Ok(Json(res))
}

pub async fn contact_stats_handler(State(state): State<ContactState>) -> Result<impl IntoResponse, HandlerError> {
    let res = state.service.stats().await.map_err(|e| state.error(e))?;
    Ok(Json(res))
}

pub async fn get_contact_handler(
    State(state): State<ContactState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, HandlerError> {
    let contact = state.service.get(&id).await.map_err(|e| state.error(e))?;
    Ok(Json(ContactResponse { success: true, message: None, contact }))
}

pub async fn update_contact_handler(
    State(state): State<ContactState>,
    Path(id): Path<String>,
    payload: Result<Json<UpdateContactRequest>, JsonRejection>,
) -> Result<impl IntoResponse, HandlerError> {
    let patch = json_body(payload)?;
    let contact = state.service.update(&id, patch).await.map_err(|e| state.error(e))?;
    Ok(Json(ContactResponse {
        success: true,
        message: Some("Enquiry updated".to_string()),
        contact,
    }))
}

pub async fn delete_contact_handler(
    State(state): State<ContactState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, HandlerError> {
    state.service.delete(&id).await.map_err(|e| state.error(e))?;
    info!(contact_id = %id, "Enquiry deleted");
    Ok(Json(MessageResponse { success: true, message: "Enquiry deleted".to_string() }))
}

pub async fn reply_contact_handler(
    State(state): State<ContactState>,
    Path(id): Path<String>,
    claims: Option<Extension<Claims>>,
    payload: Result<Json<ReplyRequest>, JsonRejection>,
) -> Result<impl IntoResponse, HandlerError> {
    let request = json_body(payload)?;
    let sender_id = claims.as_ref().map(|Extension(c)| c.sub.as_str());
    let contact = state
        .service
        .send_reply(&id, request, sender_id)
        .await
        .map_err(|e| {
            let err = state.error(e);
            if err.error == HandlerErrorKind::Delivery {
                error!(contact_id = %id, "Reply stored but not delivered");
            }
            err
        })?;
    Ok(Json(ContactResponse {
        success: true,
        message: Some("Reply sent".to_string()),
        contact,
    }))
}
