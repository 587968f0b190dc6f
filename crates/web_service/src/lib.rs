//! HTTP service for the trip planner.
//!
//! Every endpoint runs through `services::pipeline`: identity, constraint
//! enrichment, prompting, generation, validation and persistence.

pub mod auth;
pub mod config;
pub mod controllers;
pub mod dto;
pub mod error;
pub mod middleware;
pub mod server;
pub mod services;
pub mod storage;

pub use config::AppConfig;
pub use error::AppError;
pub use server::{app_config, build_state, cors, run, AppState, ServerError};
