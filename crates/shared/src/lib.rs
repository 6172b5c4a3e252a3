//! Shared utilities for the Diocese Management backend.
//!
//! This crate provides functionality used across the other crates:
//! - Session token format (`db-<id>-<epoch-ms>`) and signing
//! - Hashing helpers for storing session tokens
//! - Password hashing with Argon2id
//! - Managed-auth provider JWT verification
//! - Common validation logic

pub mod crypto;
pub mod jwt;
pub mod password;
pub mod session_token;
pub mod validation;
