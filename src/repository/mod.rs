pub mod catalog_repo;
pub mod contact_repo;
pub mod repository_error;
pub mod user_repo;
pub mod visitor_repo;
