//! HTTP route handlers.

pub mod auth;
pub mod chat_query;
pub mod chats;
pub mod debug;
pub mod dioceses;
pub mod health;
pub mod me;
pub mod testing_centers;
pub mod users;
