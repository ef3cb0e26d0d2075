//! User repository for database operations.

use chrono::{DateTime, Utc};
use domain::models::user::UpdateProfileRequest;
use sqlx::PgPool;
use uuid::Uuid;

use crate::entities::UserEntity;
use crate::metrics::QueryTimer;

const USER_COLUMNS: &str = r#"
    id, username, email, password_hash, first_name, last_name, phone, bio, date_of_birth,
    is_active, created_at, updated_at, last_login_at
"#;

/// Fields for a new account.
#[derive(Debug, Clone)]
pub struct NewUser<'a> {
    pub username: &'a str,
    pub email: &'a str,
    pub password_hash: &'a str,
    pub first_name: Option<&'a str>,
    pub last_name: Option<&'a str>,
    pub phone: Option<&'a str>,
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

    /// Returns a reference to the connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Find a user by ID.
    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<UserEntity>, sqlx::Error> {
        let timer = QueryTimer::new("find_user_by_id");
        let result = sqlx::query_as::<_, UserEntity>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await;
        timer.record();
        result
    }

    /// Find a user by username or email, case-insensitively.
    pub async fn find_by_login(&self, login: &str) -> Result<Option<UserEntity>, sqlx::Error> {
        let timer = QueryTimer::new("find_user_by_login");
        let result = sqlx::query_as::<_, UserEntity>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE LOWER(username) = LOWER($1) OR LOWER(email) = LOWER($1) LIMIT 1"
        ))
        .bind(login.trim())
        .fetch_optional(&self.pool)
        .await;
        timer.record();
        result
    }

    /// Returns which of the handle and email are already taken.
    pub async fn find_taken(
        &self,
        username: &str,
        email: &str,
    ) -> Result<(bool, bool), sqlx::Error> {
        let timer = QueryTimer::new("find_taken_username_email");
        let result = sqlx::query_as::<_, (bool, bool)>(
            r#"
            SELECT
                EXISTS (SELECT 1 FROM users WHERE LOWER(username) = LOWER($1)),
                EXISTS (SELECT 1 FROM users WHERE LOWER(email) = LOWER($2))
            "#,
        )
        .bind(username)
        .bind(email)
        .fetch_one(&self.pool)
        .await;
        timer.record();
        result
    }

    /// Create a new account and assign it the default role, if that role exists.
    pub async fn create_user(
        &self,
        user: NewUser<'_>,
        default_role_code: &str,
    ) -> Result<UserEntity, sqlx::Error> {
        let timer = QueryTimer::new("create_user");
        let mut tx = self.pool.begin().await?;

        let entity = sqlx::query_as::<_, UserEntity>(&format!(
            r#"
            INSERT INTO users (username, email, password_hash, first_name, last_name, phone)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(user.username)
        .bind(user.email)
        .bind(user.password_hash)
        .bind(user.first_name)
        .bind(user.last_name)
        .bind(user.phone)
        .fetch_one(&mut *tx)
        .await?;

        sqlx::query(
            r#"
            INSERT INTO user_roles (user_id, role_id)
            SELECT $1, id FROM roles WHERE code = $2 AND is_active
            ON CONFLICT DO NOTHING
            "#,
        )
        .bind(entity.id)
        .bind(default_role_code)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        timer.record();
        Ok(entity)
    }

    /// Update user's last login timestamp.
    pub async fn update_last_login(
        &self,
        user_id: Uuid,
        last_login_at: DateTime<Utc>,
    ) -> Result<(), sqlx::Error> {
        let timer = QueryTimer::new("update_user_last_login");
        sqlx::query("UPDATE users SET last_login_at = $1 WHERE id = $2")
            .bind(last_login_at)
            .bind(user_id)
            .execute(&self.pool)
            .await?;
        timer.record();
        Ok(())
    }

    /// Apply a partial profile update; absent fields keep their value.
    pub async fn update_profile(
        &self,
        user_id: Uuid,
        request: &UpdateProfileRequest,
    ) -> Result<Option<UserEntity>, sqlx::Error> {
        let timer = QueryTimer::new("update_user_profile");
        let result = sqlx::query_as::<_, UserEntity>(&format!(
            r#"
            UPDATE users SET
                first_name = COALESCE($2, first_name),
                last_name = COALESCE($3, last_name),
                phone = COALESCE($4, phone),
                bio = COALESCE($5, bio),
                date_of_birth = COALESCE($6, date_of_birth),
                updated_at = NOW()
            WHERE id = $1
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(user_id)
        .bind(request.first_name.as_deref())
        .bind(request.last_name.as_deref())
        .bind(request.phone.as_deref())
        .bind(request.bio.as_deref())
        .bind(request.date_of_birth)
        .fetch_optional(&self.pool)
        .await;
        timer.record();
        result
    }

    /// Set the password hash (admin bootstrap).
    pub async fn set_password_hash(
        &self,
        user_id: Uuid,
        password_hash: &str,
    ) -> Result<(), sqlx::Error> {
        let timer = QueryTimer::new("set_user_password_hash");
        sqlx::query("UPDATE users SET password_hash = $2, updated_at = NOW() WHERE id = $1")
            .bind(user_id)
            .bind(password_hash)
            .execute(&self.pool)
            .await?;
        timer.record();
        Ok(())
    }

    pub async fn count_users(&self) -> Result<i64, sqlx::Error> {
        let timer = QueryTimer::new("count_users");
        let result = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM users")
            .fetch_one(&self.pool)
            .await;
        timer.record();
        result
    }
}
