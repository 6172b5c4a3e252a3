//! Persistence layer for the Diocese Management backend.
//!
//! This crate contains:
//! - Database connection management
//! - Entity definitions (database row mappings)
//! - Repository implementations, including scoped listings and the
//!   read-only executor for assistant SQL
//! - SQL migrations (`src/migrations`)

pub mod db;
pub mod entities;
pub mod metrics;
pub mod repositories;
