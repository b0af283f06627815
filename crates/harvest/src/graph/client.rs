//! Graph mailbox client
//!
//! Searches one folder of one user mailbox and binds individual messages.
//! Uses synchronous HTTP (ureq); page fetches are the only blocking points
//! of a run.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::de::DeserializeOwned;
use std::sync::Arc;
use std::time::Duration;

use super::api::{AttachmentListResponse, ErrorResponse, GraphMessage, MessageListResponse};
use super::normalize::{normalize_message, parse_received};
use crate::error::{SyncError, SyncResult};
use crate::mailbox::{CredentialProvider, ItemRef, MailboxClient, Page, PageView, SearchFilter};
use crate::models::FetchedMessage;

/// Graph error codes meaning the address has no usable mailbox store
const MAILBOX_UNAVAILABLE_CODES: &[&str] = &[
    "MailboxNotEnabledForRESTAPI",
    "MailboxNotHostedInExchangeOnline",
    "ErrorMailboxStoreUnavailable",
    "ErrorNonExistentMailbox",
];

const MESSAGE_SELECT_FIELDS: &str = "id,receivedDateTime,subject,from,toRecipients,body,hasAttachments";

/// Format a timestamp for a `$filter` expression
fn filter_timestamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// Build the `$filter` expression for a search (closed interval on receive time)
pub(crate) fn filter_expression(filter: &SearchFilter) -> String {
    format!(
        "receivedDateTime ge {} and receivedDateTime le {} and from/emailAddress/address eq '{}'",
        filter_timestamp(&filter.received_from),
        filter_timestamp(&filter.received_to),
        filter.sender.replace('\'', "''")
    )
}

/// Mailbox client over the Graph REST API
pub struct GraphMailboxClient {
    mailbox: String,
    credentials: Arc<dyn CredentialProvider>,
    agent: ureq::Agent,
    base_url: String,
}

impl GraphMailboxClient {
    /// Graph API base URL
    const BASE_URL: &'static str = "https://graph.microsoft.com/v1.0";

    pub fn new(mailbox: impl Into<String>, credentials: Arc<dyn CredentialProvider>) -> Self {
        let agent: ureq::Agent = ureq::Agent::config_builder()
            .timeout_global(Some(Duration::from_secs(60)))
            .http_status_as_error(false)
            .build()
            .into();

        Self {
            mailbox: mailbox.into(),
            credentials,
            agent,
            base_url: Self::BASE_URL.to_string(),
        }
    }

    /// Point the client at a different API root (national clouds, proxies)
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    fn user_url(&self) -> String {
        format!(
            "{}/users/{}",
            self.base_url,
            urlencoding::encode(&self.mailbox)
        )
    }

    /// Map a non-success response to the error taxonomy
    fn classify_error(&self, status: u16, body: &str) -> SyncError {
        match serde_json::from_str::<ErrorResponse>(body) {
            Ok(resp) if MAILBOX_UNAVAILABLE_CODES.contains(&resp.error.code.as_str()) => {
                SyncError::mailbox_unavailable(&self.mailbox)
            }
            Ok(resp) => SyncError::remote(format!(
                "HTTP {} {}: {}",
                status,
                resp.error.code,
                resp.error.message.unwrap_or_default()
            )),
            Err(_) => SyncError::remote(format!("HTTP {}", status)),
        }
    }

    fn get_json<T: DeserializeOwned>(&self, url: &str, query: &[(&str, String)]) -> SyncResult<T> {
        let access_token = self.credentials.access_token()?;

        let mut request = self
            .agent
            .get(url)
            .header("Authorization", &format!("Bearer {}", access_token));
        for (key, value) in query {
            request = request.query(*key, value);
        }

        let mut response = request
            .call()
            .map_err(|e| SyncError::remote(format!("Failed to send request: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.body_mut().read_to_string().unwrap_or_default();
            return Err(self.classify_error(status, &body));
        }

        response
            .body_mut()
            .read_json::<T>()
            .map_err(|e| SyncError::remote(format!("Failed to parse response: {}", e)))
    }

    fn list_attachments(&self, id: &str) -> SyncResult<AttachmentListResponse> {
        let url = format!(
            "{}/messages/{}/attachments",
            self.user_url(),
            urlencoding::encode(id)
        );
        self.get_json(&url, &[])
    }
}

impl MailboxClient for GraphMailboxClient {
    fn authenticate(&self) -> SyncResult<()> {
        self.credentials.access_token()?;
        Ok(())
    }

    fn find_items(&self, folder: &str, filter: &SearchFilter, view: PageView) -> SyncResult<Page> {
        let url = format!(
            "{}/mailFolders/{}/messages",
            self.user_url(),
            urlencoding::encode(folder)
        );

        let list: MessageListResponse = self.get_json(
            &url,
            &[
                ("$filter", filter_expression(filter)),
                ("$orderby", "receivedDateTime asc".to_string()),
                ("$select", "id,receivedDateTime".to_string()),
                ("$top", view.page_size.to_string()),
                ("$skip", view.offset.to_string()),
            ],
        )?;

        let items = list
            .value
            .into_iter()
            .map(|m| {
                Ok(ItemRef {
                    received_at: parse_received(&m.received_date_time)?,
                    id: m.id,
                })
            })
            .collect::<SyncResult<Vec<_>>>()?;

        Ok(Page {
            items,
            more_available: list.next_link.is_some(),
        })
    }

    fn bind(&self, item: &ItemRef) -> SyncResult<FetchedMessage> {
        let url = format!("{}/messages/{}", self.user_url(), urlencoding::encode(&item.id));
        let message: GraphMessage =
            self.get_json(&url, &[("$select", MESSAGE_SELECT_FIELDS.to_string())])?;

        let attachments = if message.has_attachments.unwrap_or(false) {
            self.list_attachments(&item.id)?.value
        } else {
            Vec::new()
        };

        normalize_message(message, attachments)
    }
}
