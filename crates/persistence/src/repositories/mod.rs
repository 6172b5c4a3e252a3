//! Repository implementations for database operations.

pub mod chat;
pub mod chat_sql;
pub mod debug;
pub mod diocese;
pub mod identity_store;
pub mod scope;
pub mod session;
pub mod testing_center;
pub mod user;

pub use chat::{ChatRepository, ChatUpdate};
pub use chat_sql::{ChatSqlRepository, ExecutionLimits};
pub use debug::{DataSnapshot, DebugRepository, TableCounts};
pub use diocese::DioceseRepository;
pub use identity_store::IdentityStoreImpl;
pub use session::SessionRepository;
pub use testing_center::TestingCenterRepository;
pub use user::{NewUser, UserRepository};
