pub mod admin_middleware;
pub mod visitor_tracker;
