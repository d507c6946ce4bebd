pub mod contact_service;
pub mod notification_service;
pub mod user_service;
pub mod visitor_service;
