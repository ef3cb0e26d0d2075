//! User entity (database row mapping).

use chrono::{DateTime, NaiveDate, Utc};
use sqlx::FromRow;
use uuid::Uuid;

/// Database row mapping for the users table.
#[derive(Debug, Clone, FromRow)]
pub struct UserEntity {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub phone: Option<String>,
    pub bio: Option<String>,
    pub date_of_birth: Option<NaiveDate>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub last_login_at: Option<DateTime<Utc>>,
}

impl From<UserEntity> for domain::models::User {
    fn from(entity: UserEntity) -> Self {
        Self {
            id: entity.id,
            username: entity.username,
            email: entity.email,
            password_hash: entity.password_hash,
            first_name: entity.first_name,
            last_name: entity.last_name,
            phone: entity.phone,
            bio: entity.bio,
            date_of_birth: entity.date_of_birth,
            is_active: entity.is_active,
            created_at: entity.created_at,
            updated_at: entity.updated_at,
            last_login_at: entity.last_login_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fake::faker::internet::en::{SafeEmail, Username};
    use fake::Fake;

    #[test]
    fn test_user_entity_into_domain() {
        let entity = UserEntity {
            id: Uuid::new_v4(),
            username: Username().fake(),
            email: SafeEmail().fake(),
            password_hash: "$argon2id$v=19$...".to_string(),
            first_name: Some("Alice".to_string()),
            last_name: Some("Nguyen".to_string()),
            phone: None,
            bio: None,
            date_of_birth: None,
            is_active: true,
            created_at: Utc::now(),
            updated_at: Utc::now(),
            last_login_at: None,
        };

        let user: domain::models::User = entity.clone().into();
        assert_eq!(user.id, entity.id);
        assert_eq!(user.full_name(), "Alice Nguyen");
    }
}
