pub mod contact_router;
pub mod user_router;
pub mod visitor_router;
