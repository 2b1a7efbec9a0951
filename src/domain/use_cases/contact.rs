use std::sync::Arc;

use uuid::Uuid;
use validator::Validate;

use crate::{
    entities::{
        contact::{ContactDetails, ContactForm, ContactInsert, ContactResponse, ContactSubmission},
        pagination::{page_offset, resolve_page, Page},
        security_event::{NewSecurityEvent, RequestContext, SecurityEventType, Severity},
    },
    errors::AppError,
    repositories::contact::ContactRepository,
    settings::PersonalProfile,
    use_cases::security::SecurityAuditor,
};

pub const SUBMISSIONS_PER_PAGE: u32 = 25;

#[derive(Clone)]
pub struct ContactHandler {
    contact_repo: Arc<dyn ContactRepository>,
    auditor: SecurityAuditor,
    profile: PersonalProfile,
}

impl ContactHandler {
    pub fn new(contact_repo: Arc<dyn ContactRepository>, auditor: SecurityAuditor, profile: PersonalProfile) -> Self {
        ContactHandler { contact_repo, auditor, profile }
    }

    pub fn details(&self) -> ContactDetails {
        ContactDetails {
            email: self.profile.email.clone(),
            phone: self.profile.phone.clone(),
            location: self.profile.location.clone(),
        }
    }

    /// Stores a visitor message and logs it to the audit trail.
    pub async fn submit(&self, form: ContactForm, ctx: &RequestContext) -> Result<ContactResponse, AppError> {
        let form = form.trimmed();
        form.validate()?;

        let submission = self
            .contact_repo
            .create_submission(&ContactInsert {
                name: form.name,
                email: form.email,
                subject: form.subject,
                message: form.message,
                ip_address: Some(ctx.ip.clone()).filter(|ip| ip != "unknown"),
            })
            .await?;

        self.auditor
            .record(NewSecurityEvent::for_request(
                SecurityEventType::ContactSubmission,
                Severity::Low,
                ctx,
                format!("Contact form submitted by {} <{}>", submission.name, submission.email),
            ))
            .await;

        Ok(ContactResponse::accepted())
    }

    pub async fn list_submissions(&self, raw_page: Option<&str>) -> Result<Page<ContactSubmission>, AppError> {
        let total = self.contact_repo.count_submissions().await?;
        let page = resolve_page(raw_page, total, SUBMISSIONS_PER_PAGE);
        let items = self
            .contact_repo
            .list_submissions(SUBMISSIONS_PER_PAGE as i64, page_offset(page, SUBMISSIONS_PER_PAGE))
            .await?;
        Ok(Page::new(items, page, SUBMISSIONS_PER_PAGE, total))
    }

    pub async fn delete_submission(&self, id: &Uuid) -> Result<(), AppError> {
        self.contact_repo.delete_submission(id).await.map_err(|e| match e {
            AppError::NotFound(_) => AppError::NotFound("Contact submission not found".to_string()),
            _ => e,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repositories::{contact::MockContactRepository, security_event::MockSecurityEventRepository};
    use chrono::Utc;

    fn form(email: &str) -> ContactForm {
        ContactForm {
            name: " Visitor ".into(),
            email: email.into(),
            subject: "Pentest".into(),
            message: "Can we talk?".into(),
        }
    }

    fn ctx() -> RequestContext {
        RequestContext { ip: "203.0.113.5".into(), method: "POST".into(), path: "/contact".into(), user_agent: "Mozilla".into() }
    }

    #[tokio::test]
    async fn valid_submission_is_stored_and_audited() {
        let mut contacts = MockContactRepository::new();
        contacts
            .expect_create_submission()
            .withf(|s| s.name == "Visitor" && s.ip_address.as_deref() == Some("203.0.113.5"))
            .times(1)
            .returning(|s| {
                Ok(ContactSubmission {
                    id: Uuid::new_v4(),
                    name: s.name.clone(),
                    email: s.email.clone(),
                    subject: s.subject.clone(),
                    message: s.message.clone(),
                    ip_address: s.ip_address.clone(),
                    created_at: Utc::now(),
                })
            });
        let mut events = MockSecurityEventRepository::new();
        events
            .expect_record_event()
            .withf(|e| e.event_type == SecurityEventType::ContactSubmission && e.severity == Severity::Low)
            .times(1)
            .returning(|_| Ok(()));

        let handler = ContactHandler::new(
            Arc::new(contacts),
            SecurityAuditor::new(Arc::new(events)),
            PersonalProfile::default(),
        );
        let response = handler.submit(form("visitor@example.com"), &ctx()).await.unwrap();

        assert!(response.success);
        assert_eq!(response.message, "Thank you for your message! I will get back to you soon.");
    }

    #[tokio::test]
    async fn invalid_email_never_reaches_storage() {
        let mut contacts = MockContactRepository::new();
        contacts.expect_create_submission().never();
        let mut events = MockSecurityEventRepository::new();
        events.expect_record_event().never();

        let handler = ContactHandler::new(
            Arc::new(contacts),
            SecurityAuditor::new(Arc::new(events)),
            PersonalProfile::default(),
        );
        let err = handler.submit(form("nope"), &ctx()).await.unwrap_err();
        assert!(matches!(err, AppError::ValidationError(_)));
    }
}
