pub mod contact_dto;
pub mod pagination;
pub mod user_dto;
pub mod visitor_dto;
