//! Services used by route handlers and middleware.

pub mod auth;
pub mod cookies;
pub mod llm;
