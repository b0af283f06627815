//! Message materialization
//!
//! Writes one fetched message to its own numbered folder:
//!
//! ```text
//! <root>/
//!   20250726/
//!     1/
//!       0.html          # header block + body
//!       oficio.pdf      # attachments under their own names
//!                       # (`attachment-0.html` if one is named `0.html`)
//!     2/
//!       0.html
//! ```

mod rebuild;
mod render;

use chrono::NaiveDate;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::error::{SyncError, SyncResult};
use crate::models::{FetchedMessage, MaterializedOutput};
use crate::pdf::RENDERED_PDF_FILE_NAME;

pub use rebuild::{day_folders, rebuild_summary, scan_day};
pub use render::{escape_html, parse_header, render_document};

/// File name of the rendered document inside each message folder
pub const DOCUMENT_FILE_NAME: &str = "0.html";

/// Folder for message `index` of `day` under `root`
pub fn message_folder(root: &Path, day: NaiveDate, index: u64) -> PathBuf {
    root.join(day.format("%Y%m%d").to_string())
        .join(index.to_string())
}

/// Attachments never take these names inside a message folder
const RESERVED_FILE_NAMES: [&str; 2] = [DOCUMENT_FILE_NAME, RENDERED_PDF_FILE_NAME];

/// On-disk name for an attachment, moved aside if it would clobber a
/// generated file
fn attachment_file_name(name: &str) -> String {
    if RESERVED_FILE_NAMES
        .iter()
        .any(|reserved| reserved.eq_ignore_ascii_case(name))
    {
        format!("attachment-{}", name)
    } else {
        name.to_string()
    }
}

/// Reject attachment names that could escape the message folder
fn validate_attachment_name(name: &str) -> io::Result<()> {
    let invalid = name.is_empty()
        || name == "."
        || name == ".."
        || name.contains(['/', '\\', '\0']);
    if invalid {
        return Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("invalid attachment name {:?}", name),
        ));
    }
    Ok(())
}

/// Writes messages below a fixed output root
pub struct Materializer {
    root: PathBuf,
    title: Option<String>,
}

impl Materializer {
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
            title: None,
        }
    }

    /// Banner line placed above the header block of every document
    pub fn with_title(mut self, title: Option<String>) -> Self {
        self.title = title;
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Write `message` into folder `index` of `day`.
    ///
    /// The folder is created if needed; existing files of the same name are
    /// overwritten. Any filesystem failure aborts this message.
    pub fn materialize(
        &self,
        message: &FetchedMessage,
        day: NaiveDate,
        index: u64,
    ) -> SyncResult<MaterializedOutput> {
        let folder = message_folder(&self.root, day, index);
        fs::create_dir_all(&folder).map_err(|e| SyncError::materialization(&folder, e))?;

        let document_path = folder.join(DOCUMENT_FILE_NAME);
        let document = render_document(message, self.title.as_deref());
        fs::write(&document_path, document)
            .map_err(|e| SyncError::materialization(&document_path, e))?;

        let mut attachment_paths = Vec::with_capacity(message.attachments.len());
        for attachment in &message.attachments {
            let path = folder.join(attachment_file_name(&attachment.name));
            validate_attachment_name(&attachment.name)
                .map_err(|e| SyncError::materialization(&path, e))?;
            fs::write(&path, &attachment.content)
                .map_err(|e| SyncError::materialization(&path, e))?;
            attachment_paths.push(path);
        }

        Ok(MaterializedOutput {
            output_path: folder,
            rendered_document_path: document_path,
            attachment_paths,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::models::{Attachment, EmailAddress, MessageBody};
    use chrono::{TimeZone, Utc};
    use tempfile::tempdir;

    fn day() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 7, 26).unwrap()
    }

    fn message(attachments: Vec<Attachment>) -> FetchedMessage {
        FetchedMessage::builder("m1", Utc.with_ymd_and_hms(2025, 7, 26, 9, 0, 0).unwrap())
            .from(EmailAddress::new("alerts@bank.example"))
            .to(vec![EmailAddress::new("eyr@firm.example")])
            .subject("Oficio 123")
            .body(MessageBody::Html("<p>Adjunto oficio</p>".into()))
            .attachments(attachments)
            .build()
    }

    #[test]
    fn test_materialize_writes_document_and_attachments() {
        let dir = tempdir().unwrap();
        let materializer = Materializer::new(dir.path());

        let output = materializer
            .materialize(
                &message(vec![
                    Attachment::new("oficio.pdf", b"%PDF-1.4".to_vec()),
                    Attachment::new("anexo.txt", b"anexo".to_vec()),
                ]),
                day(),
                3,
            )
            .unwrap();

        assert_eq!(output.output_path, dir.path().join("20250726").join("3"));
        assert_eq!(
            output.rendered_document_path,
            output.output_path.join(DOCUMENT_FILE_NAME)
        );
        let doc = fs::read_to_string(&output.rendered_document_path).unwrap();
        assert!(doc.contains("<p>Adjunto oficio</p>"));

        assert_eq!(output.attachment_paths.len(), 2);
        assert_eq!(
            fs::read(output.output_path.join("oficio.pdf")).unwrap(),
            b"%PDF-1.4"
        );
    }

    #[test]
    fn test_existing_folder_is_reused() {
        let dir = tempdir().unwrap();
        let materializer = Materializer::new(dir.path());
        fs::create_dir_all(message_folder(dir.path(), day(), 1)).unwrap();

        assert!(materializer.materialize(&message(vec![]), day(), 1).is_ok());
    }

    #[test]
    fn test_duplicate_attachment_name_last_write_wins() {
        let dir = tempdir().unwrap();
        let materializer = Materializer::new(dir.path());

        let output = materializer
            .materialize(
                &message(vec![
                    Attachment::new("scan.pdf", b"first".to_vec()),
                    Attachment::new("scan.pdf", b"second".to_vec()),
                ]),
                day(),
                1,
            )
            .unwrap();

        assert_eq!(fs::read(output.output_path.join("scan.pdf")).unwrap(), b"second");
    }

    #[test]
    fn test_attachment_named_like_generated_file_is_moved_aside() {
        let dir = tempdir().unwrap();
        let materializer = Materializer::new(dir.path());

        let output = materializer
            .materialize(
                &message(vec![
                    Attachment::new("0.html", b"ATTACHMENT".to_vec()),
                    Attachment::new("0.PDF", b"%PDF-1.4".to_vec()),
                ]),
                day(),
                1,
            )
            .unwrap();

        let doc = fs::read_to_string(&output.rendered_document_path).unwrap();
        assert!(doc.contains("<p>Adjunto oficio</p>"));
        assert_eq!(
            output.attachment_paths,
            vec![
                output.output_path.join("attachment-0.html"),
                output.output_path.join("attachment-0.PDF"),
            ]
        );
        assert_eq!(
            fs::read(output.output_path.join("attachment-0.html")).unwrap(),
            b"ATTACHMENT"
        );
        assert!(!output.output_path.join("0.PDF").exists());
    }

    #[test]
    fn test_path_traversal_name_rejected() {
        let dir = tempdir().unwrap();
        let materializer = Materializer::new(dir.path().join("out"));

        let err = materializer
            .materialize(
                &message(vec![Attachment::new("../escape.txt", b"x".to_vec())]),
                day(),
                1,
            )
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::Materialization);
        assert!(!dir.path().join("out").join("20250726").join("escape.txt").exists());
    }

    #[test]
    fn test_unwritable_root_fails() {
        let dir = tempdir().unwrap();
        let blocker = dir.path().join("blocker");
        fs::write(&blocker, "file, not a directory").unwrap();

        let err = Materializer::new(&blocker)
            .materialize(&message(vec![]), day(), 1)
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Materialization);
    }
}
