//! API handlers for Liberis REST endpoints

pub mod admin;
pub mod health;
pub mod holds;
pub mod items;
pub mod loans;
pub mod openapi;
pub mod users;
