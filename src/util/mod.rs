pub mod analytics;
pub mod email;
pub mod email_templates;
pub mod error;
pub mod jwt;
pub mod logger;
pub mod password;
pub mod request_meta;
pub mod time;
pub mod user_agent;
