//! Liberis Library Circulation Server
//!
//! A Rust implementation of a library circulation and holds allocation
//! engine: issuing and returning physical copies, ordered wait queues,
//! overdue fines and renewal approval, with a periodic sweep scheduler.

use std::sync::Arc;

pub mod api;
pub mod config;
pub mod error;
pub mod fines;
pub mod models;
pub mod repository;
pub mod services;

pub use config::AppConfig;
pub use error::{AppError, AppResult};

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub services: Arc<services::Services>,
}
