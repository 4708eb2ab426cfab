// Public API for integration tests and potential library usage

pub mod api;
pub mod auth;
pub mod config;
pub mod error;
pub mod generator;
pub mod geo;
pub mod llm;
pub mod photo;
pub mod protocol;
pub mod rate_limit;
pub mod state;
pub mod types;
pub mod validation;
pub mod ws;

// Re-export broadcast for testing
pub mod broadcast;
