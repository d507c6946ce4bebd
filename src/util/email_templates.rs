//! HTML and plain-text bodies for enquiry emails. Every submitted value is
//! HTML-escaped before it is embedded.

use html_escape::encode_text;

use crate::model::catalog::Relations;
use crate::model::contact::{Contact, Priority};
use crate::util::email::EmailMessage;

const STYLE: &str = r#"body { font-family: Arial, sans-serif; line-height: 1.6; color: #333; max-width: 640px; margin: 0 auto; padding: 20px; }
        .header { background-color: #1f2933; color: #fff; padding: 20px; border-radius: 8px 8px 0 0; }
        .content { background-color: #fff; padding: 24px; border: 1px solid #dee2e6; }
        .banner { padding: 10px 14px; border-radius: 4px; font-weight: bold; margin-bottom: 16px; }
        .quote { border-left: 4px solid #ced4da; padding: 8px 14px; color: #555; background: #f8f9fa; }
        table { border-collapse: collapse; width: 100%; }
        td { padding: 6px 8px; border-bottom: 1px solid #eee; vertical-align: top; }
        td.label { width: 35%; color: #6c757d; }
        .footer { background-color: #f8f9fa; padding: 14px; text-align: center; font-size: 12px; color: #6c757d; border-radius: 0 0 8px 8px; }"#;

fn page(title: &str, heading: &str, body: &str, footer: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>{title}</title>
    <style>
        {style}
    </style>
</head>
<body>
    <div class="header"><h2>{heading}</h2></div>
    <div class="content">
{body}
    </div>
    <div class="footer"><p>{footer}</p></div>
</body>
</html>"#,
        title = encode_text(title),
        style = STYLE,
        heading = encode_text(heading),
        body = body,
        footer = encode_text(footer),
    )
}

/// Escape free text and keep its line breaks.
fn paragraph(text: &str) -> String {
    encode_text(text).replace('\n', "<br>")
}

fn rows(pairs: &[(&str, Option<String>)]) -> String {
    let mut out = String::from("        <table>\n");
    for (label, value) in pairs {
        if let Some(value) = value.as_deref().filter(|v| !v.is_empty()) {
            out.push_str(&format!(
                "            <tr><td class=\"label\">{}</td><td>{}</td></tr>\n",
                encode_text(label),
                paragraph(value)
            ));
        }
    }
    out.push_str("        </table>\n");
    out
}

fn text_rows(pairs: &[(&str, Option<String>)]) -> String {
    pairs
        .iter()
        .filter_map(|(label, value)| {
            value.as_deref().filter(|v| !v.is_empty()).map(|v| format!("{}: {}", label, v))
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn banner_colours(priority: Priority) -> (&'static str, &'static str) {
    match priority {
        Priority::Urgent => ("#f8d7da", "#721c24"),
        Priority::High => ("#fff3cd", "#856404"),
        Priority::Normal => ("#d1ecf1", "#0c5460"),
        Priority::Low => ("#e2e3e5", "#383d41"),
    }
}

fn enquiry_rows(contact: &Contact, relations: &Relations) -> Vec<(&'static str, Option<String>)> {
    vec![
        ("Enquiry type", Some(contact.enquiry_type.to_string())),
        ("Service category", relations.service_category.as_ref().map(|r| r.label().to_string())),
        ("Service", relations.specific_service.as_ref().map(|r| r.label().to_string())),
        ("Department", relations.department.as_ref().map(|r| r.label().to_string())),
        ("Vehicle type", contact.vehicle_type.map(|v| v.to_string())),
        ("Vehicle details", contact.vehicle_details.clone()),
        ("Urgency", contact.urgency.map(|u| u.to_string())),
    ]
}

/// New-enquiry notification for the sales inbox. Replies go to the submitter.
pub fn admin_notification(contact: &Contact, relations: &Relations, site_name: &str, to: &str) -> EmailMessage {
    let priority = contact.priority;
    let subject = format!(
        "[{}] New {} enquiry from {}",
        priority.as_str().to_uppercase(),
        contact.enquiry_type,
        contact.full_name()
    );

    let submitter = vec![
        ("Name", Some(contact.full_name())),
        ("Email", Some(contact.email.clone())),
        ("Phone", Some(contact.phone.clone())),
        ("Company", contact.company.clone()),
        ("Job title", contact.job_title.clone()),
    ];
    let enquiry = enquiry_rows(contact, relations);
    let provenance = vec![
        ("Received", Some(contact.created_at.clone())),
        ("Source", Some(contact.source.clone())),
        ("Page", contact.page_url.clone()),
        ("Referrer", contact.referrer.clone()),
        ("IP address", contact.ip_address.clone()),
        ("User agent", contact.user_agent.clone()),
        ("Marketing consent", Some(if contact.marketing_consent { "yes" } else { "no" }.to_string())),
    ];

    let (background, colour) = banner_colours(priority);
    let html_body = format!(
        "        <div class=\"banner\" style=\"background-color: {bg}; color: {fg};\">Priority: {priority}</div>\n\
         <h3>Submitter</h3>\n{submitter}\
         <h3>Enquiry</h3>\n{enquiry}\
         <h3>Message</h3>\n        <p class=\"quote\">{message}</p>\n\
         <h3>Provenance</h3>\n{provenance}",
        bg = background,
        fg = colour,
        priority = priority.as_str().to_uppercase(),
        submitter = rows(&submitter),
        enquiry = rows(&enquiry),
        message = paragraph(&contact.message),
        provenance = rows(&provenance),
    );

    let text_body = format!(
        "New enquiry received ({site})\nPriority: {priority}\n\n{submitter}\n\n{enquiry}\n\nMessage:\n{message}\n\n{provenance}\n",
        site = site_name,
        priority = priority.as_str().to_uppercase(),
        submitter = text_rows(&submitter),
        enquiry = text_rows(&enquiry),
        message = contact.message,
        provenance = text_rows(&provenance),
    );

    EmailMessage::new(to.to_string(), subject.clone())
        .with_reply_to(contact.email.clone())
        .with_text_body(text_body)
        .with_html_body(page(&subject, "New website enquiry", &html_body, &format!("{} website", site_name)))
}

/// Thank-you acknowledgement with a summary of what was submitted.
pub fn customer_autoreply(contact: &Contact, relations: &Relations, site_name: &str) -> EmailMessage {
    let subject = format!("Thank you for contacting {}", site_name);
    let summary = enquiry_rows(contact, relations);

    let html_body = format!(
        "        <p>Hi {name},</p>\n\
         <p>Thanks for getting in touch. We have received your enquiry and a member of our team will contact you shortly.</p>\n\
         <h3>Your enquiry</h3>\n{summary}\
         <p class=\"quote\">{message}</p>\n\
         <p>If your request is urgent, please reply to this email or give us a call.</p>\n\
         <p>Kind regards,<br>The {site} team</p>",
        name = encode_text(&contact.first_name),
        summary = rows(&summary),
        message = paragraph(&contact.message),
        site = encode_text(site_name),
    );

    let text_body = format!(
        "Hi {name},\n\nThanks for getting in touch. We have received your enquiry and a member of our team will contact you shortly.\n\n\
         Your enquiry\n{summary}\n\n{message}\n\nKind regards,\nThe {site} team\n",
        name = contact.first_name,
        summary = text_rows(&summary),
        message = contact.message,
        site = site_name,
    );

    EmailMessage::new(contact.email.clone(), subject.clone())
        .with_text_body(text_body)
        .with_html_body(page(
            &subject,
            "We've received your enquiry",
            &html_body,
            "This is an automated acknowledgement.",
        ))
}

/// An admin's answer to an enquiry, quoting the original message.
pub fn admin_reply(
    contact: &Contact,
    relations: &Relations,
    subject: &str,
    reply: &str,
    sender_name: &str,
    site_name: &str,
) -> EmailMessage {
    let original = enquiry_rows(contact, relations);

    let html_body = format!(
        "        <p>Hi {name},</p>\n\
         <p>{reply}</p>\n\
         <p>Kind regards,<br>{sender}<br>{site}</p>\n\
         <hr>\n\
         <h3>Your original enquiry ({received})</h3>\n{original}\
         <p class=\"quote\">{message}</p>",
        name = encode_text(&contact.first_name),
        reply = paragraph(reply),
        sender = encode_text(sender_name),
        site = encode_text(site_name),
        received = encode_text(&contact.created_at),
        original = rows(&original),
        message = paragraph(&contact.message),
    );

    let quoted = contact
        .message
        .lines()
        .map(|line| format!("> {}", line))
        .collect::<Vec<_>>()
        .join("\n");
    let text_body = format!(
        "Hi {name},\n\n{reply}\n\nKind regards,\n{sender}\n{site}\n\n---\nYour original enquiry ({received})\n{original}\n\n{quoted}\n",
        name = contact.first_name,
        reply = reply,
        sender = sender_name,
        site = site_name,
        received = contact.created_at,
        original = text_rows(&original),
        quoted = quoted,
    );

    EmailMessage::new(contact.email.clone(), subject.to_string())
        .with_text_body(text_body)
        .with_html_body(page(subject, site_name, &html_body, &format!("{} - reply to your enquiry", site_name)))
}
