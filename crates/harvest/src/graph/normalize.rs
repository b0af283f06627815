//! Graph response normalization
//!
//! Converts Graph API responses to harvester domain models.

use base64::prelude::*;
use chrono::{DateTime, Utc};
use log::debug;

use super::api::{GraphAttachment, GraphMessage, Recipient};
use crate::error::{SyncError, SyncResult};
use crate::models::{Attachment, EmailAddress, FetchedMessage, MessageBody};

const FILE_ATTACHMENT_TYPE: &str = "#microsoft.graph.fileAttachment";

/// Parse a Graph `receivedDateTime` value
pub fn parse_received(value: &str) -> SyncResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| SyncError::remote(format!("Invalid receivedDateTime {:?}: {}", value, e)))
}

fn to_address(recipient: &Recipient) -> EmailAddress {
    let address = recipient.email_address.address.clone().unwrap_or_default();
    match &recipient.email_address.name {
        Some(name) if !name.is_empty() && name != &address => EmailAddress::with_name(name, address),
        _ => EmailAddress::new(address),
    }
}

/// Normalize a Graph message and its attachments.
///
/// Only file attachments are kept; item and reference attachments carry no
/// bytes to write.
pub fn normalize_message(
    message: GraphMessage,
    attachments: Vec<GraphAttachment>,
) -> SyncResult<FetchedMessage> {
    let received_at = parse_received(&message.received_date_time)?;

    let from = message
        .from
        .as_ref()
        .map(to_address)
        .unwrap_or_else(|| EmailAddress::new(""));

    let to = message
        .to_recipients
        .as_deref()
        .unwrap_or_default()
        .iter()
        .map(to_address)
        .collect();

    let body = match message.body {
        Some(body) => {
            let content = body.content.unwrap_or_default();
            match body.content_type.as_deref() {
                Some(ct) if ct.eq_ignore_ascii_case("html") => MessageBody::Html(content),
                _ => MessageBody::Text(content),
            }
        }
        None => MessageBody::default(),
    };

    let mut files = Vec::new();
    for attachment in attachments {
        if attachment.odata_type.as_deref() != Some(FILE_ATTACHMENT_TYPE) {
            debug!(
                "Ignoring non-file attachment {:?} on {}",
                attachment.name, message.id
            );
            continue;
        }
        let name = attachment.name.unwrap_or_default();
        let content = BASE64_STANDARD
            .decode(attachment.content_bytes.unwrap_or_default())
            .map_err(|e| {
                SyncError::remote(format!("Invalid content for attachment {:?}: {}", name, e))
            })?;
        files.push(Attachment::new(name, content));
    }

    Ok(FetchedMessage::builder(message.id, received_at)
        .from(from)
        .to(to)
        .subject(message.subject.unwrap_or_default())
        .body(body)
        .attachments(files)
        .build())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    const MESSAGE_JSON: &str = r#"{
        "id": "AAMkAGI2",
        "receivedDateTime": "2025-07-26T09:00:00Z",
        "subject": "Oficio 123",
        "from": {"emailAddress": {"name": "Banco", "address": "alerts@bank.example"}},
        "toRecipients": [
            {"emailAddress": {"name": "eyr@firm.example", "address": "eyr@firm.example"}},
            {"emailAddress": {"address": "legal@firm.example"}}
        ],
        "body": {"contentType": "html", "content": "<p>Adjunto</p>"},
        "hasAttachments": true
    }"#;

    const ATTACHMENTS_JSON: &str = r##"{
        "value": [
            {"@odata.type": "#microsoft.graph.fileAttachment", "name": "oficio.pdf", "contentBytes": "JVBERi0xLjQ="},
            {"@odata.type": "#microsoft.graph.itemAttachment", "name": "forwarded"}
        ]
    }"##;

    #[test]
    fn test_normalize_message() {
        let message: GraphMessage = serde_json::from_str(MESSAGE_JSON).unwrap();
        let attachments: super::super::api::AttachmentListResponse =
            serde_json::from_str(ATTACHMENTS_JSON).unwrap();

        let fetched = normalize_message(message, attachments.value).unwrap();

        assert_eq!(fetched.id, "AAMkAGI2");
        assert_eq!(
            fetched.received_at,
            Utc.with_ymd_and_hms(2025, 7, 26, 9, 0, 0).unwrap()
        );
        assert_eq!(fetched.from, EmailAddress::with_name("Banco", "alerts@bank.example"));
        assert_eq!(fetched.to.len(), 2);
        assert_eq!(fetched.to[0], EmailAddress::new("eyr@firm.example"));
        assert_eq!(fetched.body, MessageBody::Html("<p>Adjunto</p>".into()));
        assert_eq!(fetched.attachments.len(), 1);
        assert_eq!(fetched.attachments[0].name, "oficio.pdf");
        assert_eq!(fetched.attachments[0].content, b"%PDF-1.4");
    }

    #[test]
    fn test_text_body_and_missing_fields() {
        let json = r#"{
            "id": "m2",
            "receivedDateTime": "2025-07-26T10:00:00.5+00:00",
            "body": {"contentType": "text", "content": "hola"}
        }"#;
        let message: GraphMessage = serde_json::from_str(json).unwrap();
        let fetched = normalize_message(message, Vec::new()).unwrap();

        assert_eq!(fetched.body, MessageBody::Text("hola".into()));
        assert!(fetched.to.is_empty());
        assert_eq!(fetched.subject, "");
    }

    #[test]
    fn test_invalid_timestamp_is_remote_error() {
        assert_eq!(
            parse_received("yesterday").unwrap_err().kind(),
            crate::error::ErrorKind::RemoteService
        );
    }
}
