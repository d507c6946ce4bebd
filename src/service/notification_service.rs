use std::sync::Arc;

use tracing::{info, instrument, warn};

use crate::model::catalog::Relations;
use crate::model::contact::Contact;
use crate::util::email::{EmailError, EmailSender};
use crate::util::email_templates;

/// Renders enquiry emails and hands them to the configured sender.
pub struct NotificationService {
    sender: Arc<dyn EmailSender>,
    site_name: String,
    admin_inbox: Option<String>,
}

/// Outcome of the two emails sent for a new enquiry.
#[derive(Debug)]
pub struct IntakeDelivery {
    pub admin: Result<(), EmailError>,
    pub customer: Result<(), EmailError>,
}

impl NotificationService {
    pub fn new(sender: Arc<dyn EmailSender>, site_name: String, admin_inbox: Option<String>) -> Self {
        NotificationService { sender, site_name, admin_inbox }
    }

    /// Admin notification then customer acknowledgement. Failures are logged
    /// and returned, never raised.
    #[instrument(skip_all, fields(contact_id = ?contact.id))]
    pub async fn notify_new_enquiry(&self, contact: &Contact, relations: &Relations) -> IntakeDelivery {
        let admin = match self.admin_inbox.as_deref() {
            Some(inbox) => {
                let message = email_templates::admin_notification(contact, relations, &self.site_name, inbox);
                self.sender.send_email(message).await
            }
            None => Err(EmailError::NotConfigured),
        };
        match &admin {
            Ok(()) => info!("Admin notification sent"),
            Err(e) => warn!("Admin notification not sent: {}", e),
        }

        let message = email_templates::customer_autoreply(contact, relations, &self.site_name);
        let customer = self.sender.send_email(message).await;
        match &customer {
            Ok(()) => info!("Customer acknowledgement sent"),
            Err(e) => warn!("Customer acknowledgement not sent: {}", e),
        }

        IntakeDelivery { admin, customer }
    }

    #[instrument(skip_all, fields(contact_id = ?contact.id, subject = %subject))]
    pub async fn send_reply(
        &self,
        contact: &Contact,
        relations: &Relations,
        subject: &str,
        reply: &str,
        sender_name: &str,
    ) -> Result<(), EmailError> {
        let message =
            email_templates::admin_reply(contact, relations, subject, reply, sender_name, &self.site_name);
        self.sender.send_email(message).await
    }
}
