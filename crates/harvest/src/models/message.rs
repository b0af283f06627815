//! Message model for one email fetched from the remote mailbox

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// An email address with optional display name
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmailAddress {
    /// Display name (e.g., "John Doe")
    pub name: Option<String>,
    /// Email address (e.g., "john@example.com")
    pub email: String,
}

impl EmailAddress {
    /// Create a new email address with just the email
    pub fn new(email: impl Into<String>) -> Self {
        Self {
            name: None,
            email: email.into(),
        }
    }

    /// Create a new email address with a display name
    pub fn with_name(name: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            email: email.into(),
        }
    }

    /// Parse an email address from a string like "John Doe <john@example.com>"
    pub fn parse(s: &str) -> Self {
        let s = s.trim();

        if let Some(angle_start) = s.rfind('<')
            && let Some(angle_end) = s.rfind('>')
            && angle_start < angle_end
        {
            let name = s[..angle_start].trim().trim_matches('"');
            let email = s[angle_start + 1..angle_end].trim();
            return Self {
                name: if name.is_empty() {
                    None
                } else {
                    Some(name.to_string())
                },
                email: email.to_string(),
            };
        }

        Self {
            name: None,
            email: s.to_string(),
        }
    }

    /// Case-insensitive comparison on the address part only
    pub fn same_address(&self, other: &str) -> bool {
        self.email.eq_ignore_ascii_case(other.trim())
    }
}

/// Join the bare addresses of a recipient list with ", "
pub fn join_addresses(addresses: &[EmailAddress]) -> String {
    addresses
        .iter()
        .map(|a| a.email.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Message body as delivered by the remote store
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MessageBody {
    Html(String),
    Text(String),
}

impl Default for MessageBody {
    fn default() -> Self {
        MessageBody::Text(String::new())
    }
}

/// A file attached to a message
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attachment {
    /// Remote-supplied file name
    pub name: String,
    /// Raw attachment bytes
    pub content: Vec<u8>,
}

impl Attachment {
    pub fn new(name: impl Into<String>, content: impl Into<Vec<u8>>) -> Self {
        Self {
            name: name.into(),
            content: content.into(),
        }
    }
}

/// One email as bound from the remote store.
///
/// Lives only while a single item is processed; never persisted as-is.
#[derive(Debug, Clone)]
pub struct FetchedMessage {
    /// Remote item identifier
    pub id: String,
    pub from: EmailAddress,
    pub received_at: DateTime<Utc>,
    pub to: Vec<EmailAddress>,
    pub subject: String,
    pub body: MessageBody,
    pub attachments: Vec<Attachment>,
}

impl FetchedMessage {
    pub fn builder(id: impl Into<String>, received_at: DateTime<Utc>) -> FetchedMessageBuilder {
        FetchedMessageBuilder::new(id, received_at)
    }

    /// Attachment names joined with ", "
    pub fn attachment_names(&self) -> String {
        self.attachments
            .iter()
            .map(|a| a.name.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    }
}

/// Builder for [`FetchedMessage`]
pub struct FetchedMessageBuilder {
    id: String,
    received_at: DateTime<Utc>,
    from: Option<EmailAddress>,
    to: Vec<EmailAddress>,
    subject: String,
    body: MessageBody,
    attachments: Vec<Attachment>,
}

impl FetchedMessageBuilder {
    fn new(id: impl Into<String>, received_at: DateTime<Utc>) -> Self {
        Self {
            id: id.into(),
            received_at,
            from: None,
            to: Vec::new(),
            subject: String::new(),
            body: MessageBody::default(),
            attachments: Vec::new(),
        }
    }

    pub fn from(mut self, from: EmailAddress) -> Self {
        self.from = Some(from);
        self
    }

    pub fn to(mut self, to: Vec<EmailAddress>) -> Self {
        self.to = to;
        self
    }

    pub fn subject(mut self, subject: impl Into<String>) -> Self {
        self.subject = subject.into();
        self
    }

    pub fn body(mut self, body: MessageBody) -> Self {
        self.body = body;
        self
    }

    pub fn attachment(mut self, attachment: Attachment) -> Self {
        self.attachments.push(attachment);
        self
    }

    pub fn attachments(mut self, attachments: Vec<Attachment>) -> Self {
        self.attachments = attachments;
        self
    }

    pub fn build(self) -> FetchedMessage {
        FetchedMessage {
            id: self.id,
            from: self.from.unwrap_or_else(|| EmailAddress::new("")),
            received_at: self.received_at,
            to: self.to,
            subject: self.subject,
            body: self.body,
            attachments: self.attachments,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_with_name() {
        let addr = EmailAddress::parse("\"Banco Caja\" <alerts@bank.example>");
        assert_eq!(addr.name.as_deref(), Some("Banco Caja"));
        assert_eq!(addr.email, "alerts@bank.example");
    }

    #[test]
    fn test_parse_bare() {
        let addr = EmailAddress::parse("  alerts@bank.example ");
        assert_eq!(addr.name, None);
        assert_eq!(addr.email, "alerts@bank.example");
    }

    #[test]
    fn test_same_address_ignores_case() {
        let addr = EmailAddress::new("Alerts@Bank.example");
        assert!(addr.same_address("alerts@bank.example"));
        assert!(!addr.same_address("other@bank.example"));
    }

    #[test]
    fn test_join_helpers() {
        let msg = FetchedMessage::builder("m1", Utc::now())
            .to(vec![
                EmailAddress::new("a@example.com"),
                EmailAddress::with_name("B", "b@example.com"),
            ])
            .attachment(Attachment::new("oficio.pdf", b"%PDF".to_vec()))
            .attachment(Attachment::new("anexo.xlsx", Vec::new()))
            .build();

        assert_eq!(join_addresses(&msg.to), "a@example.com, b@example.com");
        assert_eq!(msg.attachment_names(), "oficio.pdf, anexo.xlsx");
    }
}
