//! Rendered message document
//!
//! A header block of labelled paragraphs followed by the body. The header
//! layout is also what [`parse_header`] reads back when a summary is rebuilt
//! from materialized folders.

use crate::models::{FetchedMessage, MessageBody, SummaryRecord, format_timestamp, join_addresses};

const PARAGRAPH_STYLE: &str = "font-family: 'Times New Roman'; font-size: 12pt;";

const LABEL_FROM: &str = "From:";
const LABEL_RECEIVED: &str = "Received:";
const LABEL_TO: &str = "To:";
const LABEL_SUBJECT: &str = "Subject:";
const LABEL_ATTACHMENTS: &str = "Attachments:";

/// Escape text for inclusion in HTML element content
pub fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

fn unescape_html(s: &str) -> String {
    s.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&amp;", "&")
}

fn paragraph(out: &mut String, label: &str, value: &str) {
    out.push_str(&format!(
        "<p style=\"{}\"><strong>{}</strong> {}</p>",
        PARAGRAPH_STYLE,
        label,
        escape_html(value)
    ));
}

/// Render the full document for one message
pub fn render_document(message: &FetchedMessage, title: Option<&str>) -> String {
    let mut out = String::from("<html><body>");

    if let Some(title) = title {
        out.push_str(&format!(
            "<p style=\"{}\"><strong>{}</strong></p>",
            PARAGRAPH_STYLE,
            escape_html(title)
        ));
    }

    paragraph(&mut out, LABEL_FROM, &message.from.email);
    paragraph(&mut out, LABEL_RECEIVED, &format_timestamp(&message.received_at));
    paragraph(&mut out, LABEL_TO, &join_addresses(&message.to));
    paragraph(&mut out, LABEL_SUBJECT, &message.subject);
    paragraph(&mut out, LABEL_ATTACHMENTS, &message.attachment_names());

    match &message.body {
        MessageBody::Html(html) => out.push_str(html),
        MessageBody::Text(text) => {
            out.push_str("<pre>");
            out.push_str(&escape_html(text));
            out.push_str("</pre>");
        }
    }

    out.push_str("</body></html>");
    out
}

fn field(document: &str, label: &str) -> Option<String> {
    let marker = format!("<strong>{}</strong> ", label);
    let start = document.find(&marker)? + marker.len();
    let end = document[start..].find("</p>")? + start;
    Some(unescape_html(&document[start..end]))
}

/// Read the header block of a rendered document back into a summary row.
///
/// Returns `None` if any labelled field is missing.
pub fn parse_header(document: &str) -> Option<SummaryRecord> {
    Some(SummaryRecord {
        from: field(document, LABEL_FROM)?,
        date_time_received: field(document, LABEL_RECEIVED)?,
        to: field(document, LABEL_TO)?,
        subject: field(document, LABEL_SUBJECT)?,
        attachments: field(document, LABEL_ATTACHMENTS)?,
    })
}
