//! Entity definitions (database row mappings).

pub mod chat;
pub mod diocese;
pub mod session;
pub mod user;

pub use chat::{ChatEntity, ChatSummaryEntity};
pub use diocese::{DioceseEntity, TestingCenterEntity};
pub use session::SessionEntity;
pub use user::UserEntity;
