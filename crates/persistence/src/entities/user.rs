//! User entity (database row mapping).

use chrono::{DateTime, Utc};
use domain::models::{AuthMethod, Identity, Role, User};
use sqlx::FromRow;

/// Database row mapping for the users table.
///
/// `role` is stored as text; rows are converted with [`UserEntity::role`],
/// which fails for names outside the three known roles.
#[derive(Debug, Clone, FromRow)]
pub struct UserEntity {
    pub id: i32,
    pub email: String,
    pub username: String,
    pub password_hash: Option<String>,
    pub provider_subject: Option<String>,
    pub role: String,
    pub diocese_id: Option<i32>,
    pub testing_center_id: Option<i32>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl UserEntity {
    pub fn role(&self) -> Result<Role, String> {
        self.role.parse()
    }

    /// Converts the row into a request identity.
    pub fn into_identity(self, auth_method: AuthMethod) -> Result<Identity, String> {
        let role = self.role()?;
        Ok(Identity {
            id: self.id,
            email: self.email,
            username: self.username,
            role,
            diocese_id: self.diocese_id,
            testing_center_id: self.testing_center_id,
            auth_method,
        })
    }
}

impl TryFrom<UserEntity> for User {
    type Error = sqlx::Error;

    fn try_from(entity: UserEntity) -> Result<Self, Self::Error> {
        let role = entity.role().map_err(|e| sqlx::Error::Decode(e.into()))?;
        Ok(User {
            id: entity.id,
            email: entity.email,
            username: entity.username,
            role,
            diocese_id: entity.diocese_id,
            testing_center_id: entity.testing_center_id,
            created_at: entity.created_at,
        })
    }
}
