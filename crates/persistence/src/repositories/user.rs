//! User repository for database operations.

use domain::models::{Role, User};
use domain::services::AccessConstraint;
use sqlx::{PgPool, Postgres, QueryBuilder};

use super::scope::{push_scope_filters, ScopeColumns};
use crate::entities::UserEntity;
use crate::metrics::QueryTimer;

/// Fields of a new account.
#[derive(Debug, Clone)]
pub struct NewUser<'a> {
    pub email: &'a str,
    pub username: &'a str,
    pub password_hash: Option<&'a str>,
    pub role: Role,
    pub diocese_id: Option<i32>,
    pub testing_center_id: Option<i32>,
}

/// Repository for user-related database operations.
#[derive(Clone)]
pub struct UserRepository {
    pool: PgPool,
}

impl UserRepository {
    /// Creates a new UserRepository with the given connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Lists the users visible under `constraint`, newest first.
    pub async fn list(&self, constraint: &AccessConstraint) -> Result<Vec<User>, sqlx::Error> {
        let timer = QueryTimer::new("list_users");
        let mut builder = QueryBuilder::<Postgres>::new(
            r#"SELECT id, email, username, password_hash, provider_subject, role, diocese_id,
                      testing_center_id, created_at, updated_at
               FROM users"#,
        );
        push_scope_filters(&mut builder, constraint, ScopeColumns::USERS);
        builder.push(" ORDER BY created_at DESC");

        let result = builder
            .build_query_as::<UserEntity>()
            .fetch_all(&self.pool)
            .await;
        timer
            .finish(result)?
            .into_iter()
            .map(User::try_from)
            .collect()
    }

    /// Find a user by ID.
    pub async fn find_by_id(&self, id: i32) -> Result<Option<UserEntity>, sqlx::Error> {
        let timer = QueryTimer::new("find_user_by_id");
        let result = sqlx::query_as::<_, UserEntity>(
            r#"
            SELECT id, email, username, password_hash, provider_subject, role, diocese_id,
                   testing_center_id, created_at, updated_at
            FROM users
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await;
        timer.finish(result)
    }

    /// Find a user by email address (case-insensitive).
    pub async fn find_by_email(&self, email: &str) -> Result<Option<UserEntity>, sqlx::Error> {
        let timer = QueryTimer::new("find_user_by_email");
        let result = sqlx::query_as::<_, UserEntity>(
            r#"
            SELECT id, email, username, password_hash, provider_subject, role, diocese_id,
                   testing_center_id, created_at, updated_at
            FROM users
            WHERE lower(email) = lower($1)
            "#,
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await;
        timer.finish(result)
    }

    /// Find the account an auth-provider session belongs to.
    ///
    /// Matches the stored provider subject first. An account with no subject
    /// yet is matched by email and gets the subject recorded.
    pub async fn find_by_provider_subject(
        &self,
        subject: &str,
        email: Option<&str>,
    ) -> Result<Option<UserEntity>, sqlx::Error> {
        let timer = QueryTimer::new("find_user_by_provider_subject");
        let result = sqlx::query_as::<_, UserEntity>(
            r#"
            SELECT id, email, username, password_hash, provider_subject, role, diocese_id,
                   testing_center_id, created_at, updated_at
            FROM users
            WHERE provider_subject = $1
            "#,
        )
        .bind(subject)
        .fetch_optional(&self.pool)
        .await;
        if let Some(entity) = timer.finish(result)? {
            return Ok(Some(entity));
        }

        let Some(email) = email else {
            return Ok(None);
        };

        let timer = QueryTimer::new("link_provider_subject");
        let result = sqlx::query_as::<_, UserEntity>(
            r#"
            UPDATE users
            SET provider_subject = $1, updated_at = NOW()
            WHERE lower(email) = lower($2) AND provider_subject IS NULL
            RETURNING id, email, username, password_hash, provider_subject, role, diocese_id,
                      testing_center_id, created_at, updated_at
            "#,
        )
        .bind(subject)
        .bind(email)
        .fetch_optional(&self.pool)
        .await;
        let linked = timer.finish(result)?;
        if let Some(entity) = &linked {
            tracing::info!(user_id = entity.id, "Linked auth provider account by email");
        }
        Ok(linked)
    }

    /// Check if an email is already registered.
    pub async fn email_exists(&self, email: &str) -> Result<bool, sqlx::Error> {
        let timer = QueryTimer::new("user_email_exists");
        let result = sqlx::query_scalar::<_, bool>(
            r#"
            SELECT EXISTS(SELECT 1 FROM users WHERE lower(email) = lower($1))
            "#,
        )
        .bind(email)
        .fetch_one(&self.pool)
        .await;
        timer.finish(result)
    }

    pub async fn create(&self, user: &NewUser<'_>) -> Result<User, sqlx::Error> {
        let timer = QueryTimer::new("create_user");
        let result = sqlx::query_as::<_, UserEntity>(
            r#"
            INSERT INTO users (email, username, password_hash, role, diocese_id, testing_center_id)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING id, email, username, password_hash, provider_subject, role, diocese_id,
                      testing_center_id, created_at, updated_at
            "#,
        )
        .bind(user.email.trim())
        .bind(user.username)
        .bind(user.password_hash)
        .bind(user.role.as_str())
        .bind(user.diocese_id)
        .bind(user.testing_center_id)
        .fetch_one(&self.pool)
        .await;
        User::try_from(timer.finish(result)?)
    }

    /// Delete a user. Their sessions and chats go with them.
    pub async fn delete(&self, id: i32) -> Result<bool, sqlx::Error> {
        let timer = QueryTimer::new("delete_user");
        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await;
        Ok(timer.finish(result)?.rows_affected() > 0)
    }
}
