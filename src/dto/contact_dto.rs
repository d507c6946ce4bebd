use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::dto::pagination::Pagination;
use crate::model::catalog::{CatalogRef, Relations};
use crate::model::contact::{
    Contact, ContactStatus, EnquiryType, Priority, ResponseMethod, Urgency, VehicleType,
};

/// Public enquiry form. Every field is optional at the serde level so that
/// missing values are reported together as one validation error.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct SubmitContactRequest {
    #[validate(length(max = 50))]
    pub first_name: Option<String>,
    #[validate(length(max = 50))]
    pub last_name: Option<String>,
    #[validate(length(max = 254))]
    pub email: Option<String>,
    #[validate(length(max = 30))]
    pub phone: Option<String>,
    #[validate(length(max = 100))]
    pub company: Option<String>,
    #[validate(length(max = 100))]
    pub job_title: Option<String>,
    pub enquiry_type: Option<String>,
    pub service_category: Option<String>,
    pub specific_service: Option<String>,
    pub department: Option<String>,
    pub vehicle_type: Option<String>,
    #[validate(length(max = 500))]
    pub vehicle_details: Option<String>,
    pub urgency: Option<String>,
    #[validate(length(max = 5000))]
    pub message: Option<String>,
    pub utm_source: Option<String>,
    pub utm_medium: Option<String>,
    pub utm_campaign: Option<String>,
    pub marketing_consent: Option<bool>,
    pub privacy_consent: Option<bool>,
}

pub const REQUIRED_SUBMIT_FIELDS: [&str; 6] =
    ["firstName", "lastName", "email", "phone", "enquiryType", "message"];

impl SubmitContactRequest {
    /// Names of required fields that are absent or blank.
    pub fn missing_fields(&self) -> Vec<String> {
        let values = [
            &self.first_name,
            &self.last_name,
            &self.email,
            &self.phone,
            &self.enquiry_type,
            &self.message,
        ];
        REQUIRED_SUBMIT_FIELDS
            .iter()
            .zip(values)
            .filter(|(_, value)| value.as_deref().map(str::trim).unwrap_or("").is_empty())
            .map(|(name, _)| name.to_string())
            .collect()
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitContactResponse {
    pub success: bool,
    pub message: String,
    pub contact_id: String,
}

/// Admin patch. Absent fields are left untouched; unknown fields are rejected.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct UpdateContactRequest {
    #[validate(length(min = 1, max = 50))]
    pub first_name: Option<String>,
    #[validate(length(min = 1, max = 50))]
    pub last_name: Option<String>,
    pub email: Option<String>,
    #[validate(length(min = 1, max = 30))]
    pub phone: Option<String>,
    pub company: Option<String>,
    pub job_title: Option<String>,
    pub enquiry_type: Option<EnquiryType>,
    pub service_category: Option<String>,
    pub specific_service: Option<String>,
    pub department: Option<String>,
    pub vehicle_type: Option<VehicleType>,
    pub vehicle_details: Option<String>,
    pub urgency: Option<Urgency>,
    #[validate(length(min = 1, max = 5000))]
    pub message: Option<String>,
    pub status: Option<ContactStatus>,
    pub priority: Option<Priority>,
    #[validate(length(max = 5000))]
    pub notes: Option<String>,
    pub assigned_to: Option<String>,
    pub response_method: Option<ResponseMethod>,
    pub follow_up_date: Option<String>,
    pub marketing_consent: Option<bool>,
}

impl UpdateContactRequest {
    pub fn is_empty(&self) -> bool {
        self.first_name.is_none()
            && self.last_name.is_none()
            && self.email.is_none()
            && self.phone.is_none()
            && self.company.is_none()
            && self.job_title.is_none()
            && self.enquiry_type.is_none()
            && self.service_category.is_none()
            && self.specific_service.is_none()
            && self.department.is_none()
            && self.vehicle_type.is_none()
            && self.vehicle_details.is_none()
            && self.urgency.is_none()
            && self.message.is_none()
            && self.status.is_none()
            && self.priority.is_none()
            && self.notes.is_none()
            && self.assigned_to.is_none()
            && self.response_method.is_none()
            && self.follow_up_date.is_none()
            && self.marketing_consent.is_none()
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReplyRequest {
    pub subject: Option<String>,
    pub message: Option<String>,
    pub response_method: Option<ResponseMethod>,
}

/// Raw list query. Values are parsed by the service so that bad input yields
/// a JSON validation error rather than an extractor rejection.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListContactsQuery {
    pub status: Option<String>,
    pub enquiry_type: Option<String>,
    pub priority: Option<String>,
    pub page: Option<String>,
    pub limit: Option<String>,
    pub search: Option<String>,
    pub sort_by: Option<String>,
    pub sort_order: Option<String>,
}

/// An enquiry as returned to the dashboard, relations populated.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ContactView {
    #[serde(rename = "_id")]
    pub id: String,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: String,
    pub company: Option<String>,
    pub job_title: Option<String>,
    pub enquiry_type: EnquiryType,
    pub service_category: Option<CatalogRef>,
    pub specific_service: Option<CatalogRef>,
    pub department: Option<CatalogRef>,
    pub vehicle_type: Option<VehicleType>,
    pub vehicle_details: Option<String>,
    pub urgency: Option<Urgency>,
    pub message: String,
    pub status: ContactStatus,
    pub priority: Priority,
    pub notes: Option<String>,
    pub assigned_to: Option<String>,
    pub response_date: Option<String>,
    pub response_method: Option<ResponseMethod>,
    pub follow_up_date: Option<String>,
    pub source: String,
    pub utm_source: Option<String>,
    pub utm_medium: Option<String>,
    pub utm_campaign: Option<String>,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
    pub referrer: Option<String>,
    pub page_url: Option<String>,
    pub marketing_consent: bool,
    pub privacy_consent: bool,
    pub created_at: String,
    pub updated_at: String,
}

impl ContactView {
    pub fn new(contact: Contact, relations: Relations) -> Self {
        ContactView {
            id: contact.id.map(|id| id.to_hex()).unwrap_or_default(),
            first_name: contact.first_name,
            last_name: contact.last_name,
            email: contact.email,
            phone: contact.phone,
            company: contact.company,
            job_title: contact.job_title,
            enquiry_type: contact.enquiry_type,
            service_category: relations.service_category,
            specific_service: relations.specific_service,
            department: relations.department,
            vehicle_type: contact.vehicle_type,
            vehicle_details: contact.vehicle_details,
            urgency: contact.urgency,
            message: contact.message,
            status: contact.status,
            priority: contact.priority,
            notes: contact.notes,
            assigned_to: contact.assigned_to.map(|id| id.to_hex()),
            response_date: contact.response_date,
            response_method: contact.response_method,
            follow_up_date: contact.follow_up_date,
            source: contact.source,
            utm_source: contact.utm_source,
            utm_medium: contact.utm_medium,
            utm_campaign: contact.utm_campaign,
            ip_address: contact.ip_address,
            user_agent: contact.user_agent,
            referrer: contact.referrer,
            page_url: contact.page_url,
            marketing_consent: contact.marketing_consent,
            privacy_consent: contact.privacy_consent,
            created_at: contact.created_at,
            updated_at: contact.updated_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ContactListResponse {
    pub success: bool,
    pub contacts: Vec<ContactView>,
    pub pagination: Pagination,
}

#[derive(Debug, Serialize)]
pub struct ContactResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub contact: ContactView,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub success: bool,
    pub message: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusOverview {
    pub total: u64,
    pub new: u64,
    pub in_progress: u64,
    pub contacted: u64,
    pub urgent: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EnquiryTypeCount {
    #[serde(rename = "_id")]
    pub enquiry_type: String,
    pub count: u64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ContactStatsResponse {
    pub success: bool,
    pub overall: StatusOverview,
    pub enquiry_types: Vec<EnquiryTypeCount>,
    pub recent: Vec<ContactView>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_fields_treats_blank_as_missing() {
        let req = SubmitContactRequest {
            first_name: Some("A".into()),
            last_name: Some("  ".into()),
            email: Some("a@b.com".into()),
            phone: Some("123".into()),
            enquiry_type: Some("quote".into()),
            ..Default::default()
        };
        assert_eq!(req.missing_fields(), vec!["lastName".to_string(), "message".to_string()]);
    }

    #[test]
    fn test_update_rejects_unknown_fields() {
        let err = serde_json::from_str::<UpdateContactRequest>(r#"{"status":"new","isAdmin":true}"#);
        assert!(err.is_err());
        let ok: UpdateContactRequest = serde_json::from_str(r#"{"status":"in-progress"}"#).unwrap();
        assert_eq!(ok.status, Some(ContactStatus::InProgress));
        assert!(!ok.is_empty());
        assert!(UpdateContactRequest::default().is_empty());
    }

    #[test]
    fn test_submit_length_limits() {
        let req = SubmitContactRequest { first_name: Some("x".repeat(51)), ..Default::default() };
        assert!(req.validate().is_err());
    }
}
