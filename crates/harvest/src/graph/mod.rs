//! Microsoft Graph integration
//!
//! This module provides:
//! - Client-credentials token acquisition for an application identity
//! - A mailbox client searching and binding messages of one user mailbox
//! - Response normalization to domain models

mod auth;
mod client;
mod normalize;

pub use auth::ClientCredentialsAuth;
pub use client::GraphMailboxClient;
pub use normalize::normalize_message;

/// Graph API response types
pub mod api {
    use serde::Deserialize;

    /// Page of message references from a folder search
    #[derive(Debug, Deserialize)]
    pub struct MessageListResponse {
        #[serde(default)]
        pub value: Vec<MessageRef>,
        #[serde(rename = "@odata.nextLink")]
        pub next_link: Option<String>,
    }

    /// Message id plus its receive time
    #[derive(Debug, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct MessageRef {
        pub id: String,
        pub received_date_time: String,
    }

    /// Message fields needed for materialization
    #[derive(Debug, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct GraphMessage {
        pub id: String,
        pub received_date_time: String,
        pub subject: Option<String>,
        pub from: Option<Recipient>,
        pub to_recipients: Option<Vec<Recipient>>,
        pub body: Option<ItemBody>,
        pub has_attachments: Option<bool>,
    }

    #[derive(Debug, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct Recipient {
        pub email_address: GraphEmailAddress,
    }

    #[derive(Debug, Deserialize)]
    pub struct GraphEmailAddress {
        pub name: Option<String>,
        pub address: Option<String>,
    }

    /// Body content; `content_type` is "html" or "text"
    #[derive(Debug, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct ItemBody {
        pub content_type: Option<String>,
        pub content: Option<String>,
    }

    #[derive(Debug, Deserialize)]
    pub struct AttachmentListResponse {
        #[serde(default)]
        pub value: Vec<GraphAttachment>,
    }

    /// Attachment of any kind; only file attachments carry `content_bytes`
    #[derive(Debug, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct GraphAttachment {
        #[serde(rename = "@odata.type")]
        pub odata_type: Option<String>,
        pub name: Option<String>,
        pub content_bytes: Option<String>,
    }

    /// Error envelope returned with non-success statuses
    #[derive(Debug, Deserialize)]
    pub struct ErrorResponse {
        pub error: ErrorBody,
    }

    #[derive(Debug, Deserialize)]
    pub struct ErrorBody {
        pub code: String,
        pub message: Option<String>,
    }
}
