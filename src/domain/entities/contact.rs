use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

pub const CONTACT_SUCCESS_MESSAGE: &str = "Thank you for your message! I will get back to you soon.";
pub const CONTACT_INVALID_MESSAGE: &str = "Please fill in all required fields.";

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct ContactForm {
    #[validate(length(min = 1, max = 100, message = "Name is required"))]
    pub name: String,

    #[validate(email(message = "Enter a valid email address"))]
    pub email: String,

    #[validate(length(min = 1, max = 200, message = "Subject is required"))]
    pub subject: String,

    #[validate(length(min = 1, message = "Message is required"))]
    pub message: String,
}

impl ContactForm {
    pub fn trimmed(self) -> Self {
        ContactForm {
            name: self.name.trim().to_string(),
            email: self.email.trim().to_string(),
            subject: self.subject.trim().to_string(),
            message: self.message.trim().to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ContactInsert {
    pub name: String,
    pub email: String,
    pub subject: String,
    pub message: String,
    pub ip_address: Option<String>,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct ContactSubmission {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub subject: String,
    pub message: String,
    pub ip_address: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct ContactResponse {
    pub success: bool,
    pub message: String,
}

impl ContactResponse {
    pub fn accepted() -> Self {
        ContactResponse { success: true, message: CONTACT_SUCCESS_MESSAGE.to_string() }
    }
}

#[derive(Debug, Serialize)]
pub struct ContactDetails {
    pub email: String,
    pub phone: String,
    pub location: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn all_fields_are_required() {
        let form = ContactForm {
            name: "Visitor".into(),
            email: "visitor@example.com".into(),
            subject: " ".into(),
            message: "hello".into(),
        }
        .trimmed();
        assert!(form.validate().is_err());
    }

    #[test]
    fn invalid_email_is_rejected() {
        let form = ContactForm {
            name: "Visitor".into(),
            email: "not-an-email".into(),
            subject: "Hi".into(),
            message: "hello".into(),
        };
        let errors = form.validate().unwrap_err();
        assert!(errors.field_errors().contains_key("email"));
    }
}
