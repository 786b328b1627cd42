//! Inbound messages from the contact and admission forms.
//!
//! Both forms land in one list and are told apart by the `type` tag.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::errors::AppError;

/// Which form produced a message.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum MessageType {
    #[default]
    Contact,
    Admission,
}

/// A stored message. Form fields are kept as submitted.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ContactMessage {
    pub id: String,
    #[serde(rename = "type", default)]
    pub kind: MessageType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub submitted_at: Option<String>,
    #[serde(default)]
    pub date: String,
    #[serde(default)]
    pub read: bool,
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

impl ContactMessage {
    /// Submission time, preferring `submittedAt` over `date`.
    pub fn timestamp(&self) -> Option<DateTime<Utc>> {
        self.submitted_at
            .as_deref()
            .and_then(parse_timestamp)
            .or_else(|| parse_timestamp(&self.date))
    }
}

fn parse_timestamp(s: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

/// A validated submission ready to be stored.
#[derive(Debug, Clone)]
pub struct NewMessage {
    pub kind: MessageType,
    pub submitted_at: Option<String>,
    pub fields: Map<String, Value>,
}

/// General contact form.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContactForm {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub subject: String,
    #[serde(default)]
    pub message: String,
}

impl ContactForm {
    pub fn validate(&self) -> Result<(), AppError> {
        let mut problems = Vec::new();
        require(&mut problems, "name", &self.name, "Name is required");
        check_email(&mut problems, &self.email);
        require(&mut problems, "message", &self.message, "Message is required");
        into_result(problems)
    }

    pub fn into_new_message(self) -> Result<NewMessage, AppError> {
        self.validate()?;
        Ok(NewMessage {
            kind: MessageType::Contact,
            submitted_at: None,
            fields: to_fields(&self)?,
        })
    }
}

/// Admission application form.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdmissionForm {
    #[serde(default)]
    pub student_name: String,
    #[serde(default)]
    pub date_of_birth: String,
    #[serde(default)]
    pub grade: String,
    #[serde(default)]
    pub parent_name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub message: String,
}

impl AdmissionForm {
    pub fn validate(&self) -> Result<(), AppError> {
        let mut problems = Vec::new();
        require(&mut problems, "studentName", &self.student_name, "Student name is required");
        require(&mut problems, "dateOfBirth", &self.date_of_birth, "Date of birth is required");
        require(&mut problems, "grade", &self.grade, "Grade is required");
        require(&mut problems, "parentName", &self.parent_name, "Parent/Guardian name is required");
        check_email(&mut problems, &self.email);
        if self.phone.trim().is_empty() {
            problems.push("phone: Phone is required".to_string());
        } else if !looks_like_phone(&self.phone) {
            problems.push("phone: Phone number is invalid".to_string());
        }
        require(&mut problems, "address", &self.address, "Address is required");
        into_result(problems)
    }

    pub fn into_new_message(self) -> Result<NewMessage, AppError> {
        self.validate()?;
        Ok(NewMessage {
            kind: MessageType::Admission,
            submitted_at: Some(Utc::now().to_rfc3339()),
            fields: to_fields(&self)?,
        })
    }
}

/// Time window for the applications view.
#[derive(Debug, Clone, Copy, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum MessageWindow {
    #[default]
    All,
    Today,
    Week,
}

impl MessageWindow {
    pub fn contains(&self, message: &ContactMessage, now: DateTime<Utc>) -> bool {
        match self {
            MessageWindow::All => true,
            MessageWindow::Today => message
                .timestamp()
                .is_some_and(|ts| ts.date_naive() == now.date_naive()),
            MessageWindow::Week => message
                .timestamp()
                .is_some_and(|ts| ts >= now - Duration::days(7)),
        }
    }
}

/// Request body for flagging a message read or unread.
#[derive(Debug, Clone, Deserialize)]
pub struct MarkReadRequest {
    #[serde(default = "default_read")]
    pub read: bool,
}

fn default_read() -> bool {
    true
}

fn require(problems: &mut Vec<String>, field: &str, value: &str, message: &str) {
    if value.trim().is_empty() {
        problems.push(format!("{}: {}", field, message));
    }
}

fn check_email(problems: &mut Vec<String>, email: &str) {
    if email.trim().is_empty() {
        problems.push("email: Email is required".to_string());
    } else if !looks_like_email(email) {
        problems.push("email: Email is invalid".to_string());
    }
}

fn into_result(problems: Vec<String>) -> Result<(), AppError> {
    if problems.is_empty() {
        Ok(())
    } else {
        Err(AppError::Validation(problems.join("; ")))
    }
}

fn to_fields<T: Serialize>(form: &T) -> Result<Map<String, Value>, AppError> {
    match serde_json::to_value(form)? {
        Value::Object(map) => Ok(map),
        _ => Err(AppError::Internal("Form did not serialize to an object".to_string())),
    }
}

/// `something@host.tld`, anywhere in the input.
fn looks_like_email(email: &str) -> bool {
    email.split_whitespace().any(|word| {
        let Some((local, domain)) = word.split_once('@') else {
            return false;
        };
        !local.is_empty()
            && domain
                .char_indices()
                .any(|(i, c)| c == '.' && i > 0 && i + 1 < domain.len())
    })
}

/// Digits, spaces and hyphens with an optional leading `+`.
fn looks_like_phone(phone: &str) -> bool {
    let rest = phone.strip_prefix('+').unwrap_or(phone);
    !rest.is_empty()
        && rest
            .chars()
            .all(|c| c.is_ascii_digit() || c.is_whitespace() || c == '-')
}

#[cfg(test)]
mod tests {
    use super::*;

    fn admission() -> AdmissionForm {
        AdmissionForm {
            student_name: "Asha Rai".to_string(),
            date_of_birth: "2016-04-02".to_string(),
            grade: "4".to_string(),
            parent_name: "Maya Rai".to_string(),
            email: "maya@example.com".to_string(),
            phone: "+977 981-2345678".to_string(),
            address: "Kalanki".to_string(),
            message: String::new(),
        }
    }

    #[test]
    fn test_email_and_phone_shapes() {
        assert!(looks_like_email("a@b.c"));
        assert!(!looks_like_email("a@b"));
        assert!(!looks_like_email("@b.c"));
        assert!(!looks_like_email("a@.c"));
        assert!(looks_like_phone("+977-1-4567890"));
        assert!(!looks_like_phone("call me"));
        assert!(!looks_like_phone("+"));
    }

    #[test]
    fn test_admission_validation_lists_every_field() {
        let form = AdmissionForm {
            student_name: String::new(),
            phone: "abc".to_string(),
            ..admission()
        };
        let err = form.validate().unwrap_err().message();
        assert!(err.contains("studentName"));
        assert!(err.contains("Phone number is invalid"));
        assert!(!err.contains("address"));
    }

    #[test]
    fn test_admission_becomes_tagged_message() {
        let msg = admission().into_new_message().unwrap();
        assert_eq!(msg.kind, MessageType::Admission);
        assert!(msg.submitted_at.is_some());
        assert_eq!(msg.fields["studentName"], "Asha Rai");
    }

    #[test]
    fn test_missing_type_reads_as_contact() {
        let msg: ContactMessage = serde_json::from_str(
            r#"{"id":"1","name":"Hari","email":"h@x.io","date":"2026-01-01T00:00:00Z","read":false}"#,
        )
        .unwrap();
        assert_eq!(msg.kind, MessageType::Contact);
        assert_eq!(msg.fields["name"], "Hari");
        assert!(!msg.fields.contains_key("id"));
    }

    #[test]
    fn test_window_uses_submitted_at() {
        let now = Utc::now();
        let old = (now - Duration::days(10)).to_rfc3339();
        let msg = ContactMessage {
            id: "1".to_string(),
            kind: MessageType::Admission,
            submitted_at: Some(now.to_rfc3339()),
            date: old.clone(),
            read: false,
            fields: Map::new(),
        };
        assert!(MessageWindow::Today.contains(&msg, now));
        assert!(MessageWindow::Week.contains(&msg, now));

        let stale = ContactMessage {
            submitted_at: Some(old),
            ..msg
        };
        assert!(!MessageWindow::Week.contains(&stale, now));
        assert!(MessageWindow::All.contains(&stale, now));
    }
}
