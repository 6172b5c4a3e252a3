//! Domain models for the Diocese Management backend.

pub mod chat;
pub mod diocese;
pub mod identity;
pub mod role;
pub mod user;

pub use chat::{
    Chat, ChatAuthor, ChatMessage, ChatQueryRequest, ChatQueryResponse, ChatSummary,
    CreateChatRequest, UpdateChatRequest,
};
pub use diocese::{
    CreateDioceseRequest, CreateTestingCenterRequest, Diocese, TestingCenter,
    UpdateDioceseRequest, UpdateTestingCenterRequest,
};
pub use identity::{AuthMethod, Identity};
pub use role::{map_external_role, role_should_have_access, ExternalRole, Role};
pub use user::{
    CreateUserRequest, ExternalUserRecord, ImportUsersRequest, ImportUsersResponse,
    ListUsersResponse, SkippedUser, User,
};
