pub mod catalog;
pub mod contact;
pub mod user;
pub mod visitor;
