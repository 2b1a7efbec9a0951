use serde::{Serialize, Deserialize};
use chrono::{DateTime, Utc};
use validator::Validate;
use uuid::Uuid;

use crate::domain::password::validate_password_strength;

/// Staff account. Only created through the maintenance CLI.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub username: String,
    pub password_hash: String,
    pub is_admin: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct UserInsert {
    pub email: String,
    pub username: String,
    pub password_hash: String,
    pub is_admin: bool,
}

#[derive(Debug, Deserialize, Validate)]
pub struct NewAdminUser {
    #[validate(length(min = 3, max = 150, message = "Username must be 3-150 characters"))]
    pub username: String,

    #[validate(email(message = "Invalid email format"))]
    pub email: String,

    #[validate(custom(function = "validate_password_strength"))]
    pub password: String,
}

impl NewAdminUser {
    pub fn prepare_for_insert(&self, password_hash: String) -> UserInsert {
        UserInsert {
            email: self.email.trim().to_lowercase(),
            username: self.username.trim().to_string(),
            password_hash,
            is_admin: true,
        }
    }
}

#[derive(Debug, Deserialize, Validate)]
pub struct LoginUser {
    /// Username or e-mail address.
    #[validate(length(min = 1, max = 254, message = "Username cannot be empty"))]
    pub username: String,

    #[validate(length(min = 1, message = "Password cannot be empty"))]
    pub password: String,
}

impl LoginUser {
    pub fn identifier(&self) -> String {
        self.username.trim().to_string()
    }
}

#[derive(Debug, Serialize)]
pub struct PublicUser {
    pub id: Uuid,
    pub email: String,
    pub username: String,
    pub is_admin: bool,
    pub created_at: DateTime<Utc>,
}

impl From<User> for PublicUser {
    fn from(user: User) -> Self {
        PublicUser {
            id: user.id,
            email: user.email,
            username: user.username,
            is_admin: user.is_admin,
            created_at: user.created_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn weak_admin_passwords_are_rejected() {
        let user = NewAdminUser {
            username: "owner".into(),
            email: "owner@example.com".into(),
            password: "password".into(),
        };
        assert!(user.validate().is_err());
    }

    #[test]
    fn insert_normalizes_email_and_forces_admin() {
        let user = NewAdminUser {
            username: " owner ".into(),
            email: "Owner@Example.com".into(),
            password: "C0rrect-Horse!Battery".into(),
        };
        let insert = user.prepare_for_insert("hash".into());
        assert_eq!(insert.email, "owner@example.com");
        assert_eq!(insert.username, "owner");
        assert!(insert.is_admin);
    }
}
