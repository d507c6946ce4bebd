//! Sends the new-enquiry admin notification for a sample enquiry.
//!
//! cargo run --example send_email -- someone@example.com

use bson::oid::ObjectId;
use dotenv::dotenv;
use servicebody_backend::config::EmailConfig;
use servicebody_backend::model::catalog::Relations;
use servicebody_backend::model::contact::{Contact, ContactStatus, EnquiryType, Priority, Urgency, VehicleType};
use servicebody_backend::util::email::{EmailSender, SmtpEmailService};
use servicebody_backend::util::email_templates;
use servicebody_backend::util::logger::Logger;
use servicebody_backend::util::time::now_iso;
use tracing::{error, info, warn};

fn sample_enquiry() -> Contact {
    let now = now_iso();
    let mut contact = Contact {
        id: Some(ObjectId::new()),
        first_name: "Sam".to_string(),
        last_name: "Driver".to_string(),
        email: "sam.driver@example.com".to_string(),
        phone: "0400 123 456".to_string(),
        company: Some("Driver Plumbing".to_string()),
        job_title: None,
        enquiry_type: EnquiryType::Quote,
        service_category: None,
        specific_service: None,
        department: None,
        vehicle_type: Some(VehicleType::Ute),
        vehicle_details: Some("2022 Hilux dual cab".to_string()),
        urgency: Some(Urgency::High),
        message: "Looking for a price on an aluminium canopy with drawers.".to_string(),
        status: ContactStatus::New,
        priority: Priority::Normal,
        notes: None,
        assigned_to: None,
        response_date: None,
        response_method: None,
        follow_up_date: None,
        source: "website".to_string(),
        utm_source: None,
        utm_medium: None,
        utm_campaign: None,
        ip_address: Some("203.0.113.10".to_string()),
        user_agent: None,
        referrer: None,
        page_url: Some("https://example.com/contact".to_string()),
        marketing_consent: false,
        privacy_consent: true,
        created_at: now.clone(),
        updated_at: now,
    };
    contact.refresh_priority();
    contact
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let logger = Logger::new()?;
    let _guards = logger.guards;

    match dotenv() {
        Ok(_) => info!("✅ Successfully loaded .env file"),
        Err(e) => warn!("⚠️ Failed to load .env file: {} (using system env vars)", e),
    }

    let to = std::env::args().nth(1).ok_or("usage: send_email <recipient>")?;
    let email_config = EmailConfig::from_env().map_err(|e| {
        error!("Failed to load email configuration: {}", e);
        e
    })?;
    let email_service = SmtpEmailService::new(email_config)?;

    let message = email_templates::admin_notification(&sample_enquiry(), &Relations::default(), "Service Bodies", &to);
    match email_service.send_email(message).await {
        Ok(()) => info!("Sample notification sent to {}", to),
        Err(e) => {
            error!("Failed to send email: {}", e);
            return Err(e.into());
        }
    }
    Ok(())
}
