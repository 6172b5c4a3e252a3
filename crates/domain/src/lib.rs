//! Domain layer for the Diocese Management backend.
//!
//! This crate contains:
//! - Domain models (roles, identities, dioceses, testing centers, users, chats)
//! - Access constraint derivation and enforcement helpers
//! - Textual constraint injection for generated SQL
//! - Session resolution over the two authentication mechanisms

pub mod models;
pub mod services;
