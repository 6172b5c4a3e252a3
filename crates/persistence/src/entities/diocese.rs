//! Diocese and testing center entities (database row mappings).

use chrono::{DateTime, Utc};
use sqlx::FromRow;

/// Database row mapping for the dioceses table.
#[derive(Debug, Clone, FromRow)]
pub struct DioceseEntity {
    pub id: i32,
    pub name: String,
    pub address: Option<String>,
    pub contact_email: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<DioceseEntity> for domain::models::Diocese {
    fn from(entity: DioceseEntity) -> Self {
        Self {
            id: entity.id,
            name: entity.name,
            address: entity.address,
            contact_email: entity.contact_email,
            created_at: entity.created_at,
            updated_at: entity.updated_at,
        }
    }
}

/// Database row mapping for the testing_centers table.
#[derive(Debug, Clone, FromRow)]
pub struct TestingCenterEntity {
    pub id: i32,
    pub diocese_id: i32,
    pub name: String,
    pub address: Option<String>,
    pub active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<TestingCenterEntity> for domain::models::TestingCenter {
    fn from(entity: TestingCenterEntity) -> Self {
        Self {
            id: entity.id,
            diocese_id: entity.diocese_id,
            name: entity.name,
            address: entity.address,
            active: entity.active,
            created_at: entity.created_at,
            updated_at: entity.updated_at,
        }
    }
}
