//! PDF rendering of a harvested day
//!
//! Converts each folder's `0.html` to `0.pdf`, then bundles every PDF in the
//! folder (the rendered document first, attachments after, by name) into
//! `PS<day><NNNN>.pdf` next to the folders:
//!
//! ```text
//! 20250726/
//!   1/0.html 1/0.pdf 1/oficio.pdf
//!   PS202507260001.pdf
//! ```

mod merge;

use anyhow::{Context, Result, bail};
use log::{info, warn};
use lopdf::Document;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

use crate::materialize::{DOCUMENT_FILE_NAME, day_folders};

pub use merge::merge_documents;

/// File name of the rendered PDF inside each message folder
pub const RENDERED_PDF_FILE_NAME: &str = "0.pdf";

/// Converts one HTML file to PDF
pub trait HtmlToPdf: Send + Sync {
    fn convert(&self, html: &Path, pdf: &Path) -> Result<()>;
}

/// Converter backed by the `wkhtmltopdf` executable
pub struct Wkhtmltopdf {
    program: PathBuf,
}

impl Wkhtmltopdf {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }
}

impl Default for Wkhtmltopdf {
    /// Look the executable up on `PATH`
    fn default() -> Self {
        Self::new("wkhtmltopdf")
    }
}

impl HtmlToPdf for Wkhtmltopdf {
    fn convert(&self, html: &Path, pdf: &Path) -> Result<()> {
        let status = Command::new(&self.program)
            .args([
                "--quiet",
                "--enable-local-file-access",
                "--no-stop-slow-scripts",
                "--dpi",
                "300",
            ])
            .arg(html)
            .arg(pdf)
            .status()
            .with_context(|| format!("spawn {}", self.program.display()))?;
        if !status.success() {
            bail!("wkhtmltopdf failed on {} with status {}", html.display(), status);
        }
        Ok(())
    }
}

/// Outcome of rendering one day directory
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct PdfReport {
    /// Folders whose document was converted
    pub rendered: usize,
    /// Bundles written
    pub bundles: Vec<PathBuf>,
    /// Folders that could not be converted or bundled
    pub failed: usize,
}

/// Bundle path for folder `index` of `day_dir`
pub fn bundle_path(day_dir: &Path, index: u64) -> PathBuf {
    let day = day_dir
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();
    day_dir.join(format!("PS{}{:04}.pdf", day, index))
}

/// PDFs of one folder in bundle order: the rendered document, then the rest by name
fn folder_pdfs(folder: &Path) -> Result<Vec<PathBuf>> {
    let mut pdfs: Vec<PathBuf> = fs::read_dir(folder)?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| {
            path.is_file()
                && path
                    .extension()
                    .is_some_and(|ext| ext.eq_ignore_ascii_case("pdf"))
        })
        .collect();
    pdfs.sort_by_key(|path| {
        (
            path.file_name().is_none_or(|name| name != RENDERED_PDF_FILE_NAME),
            path.file_name().map(|name| name.to_os_string()),
        )
    });
    Ok(pdfs)
}

fn bundle_folder(folder: &Path, output: &Path) -> Result<usize> {
    let mut documents = Vec::new();
    for pdf in folder_pdfs(folder)? {
        match Document::load(&pdf) {
            Ok(doc) => documents.push(doc),
            Err(e) => warn!("Leaving {} out of the bundle: {}", pdf.display(), e),
        }
    }
    if documents.is_empty() {
        bail!("no readable PDFs in {}", folder.display());
    }
    merge_documents(documents, output)
}

/// Render every numbered folder of `day_dir` and write one bundle per folder.
///
/// A folder that fails is counted and skipped; the rest of the day is still
/// processed. Only a missing or unreadable `day_dir` is an error.
pub fn render_day(day_dir: &Path, converter: &dyn HtmlToPdf) -> Result<PdfReport> {
    let mut report = PdfReport::default();

    for (index, folder) in day_folders(day_dir)? {
        let html = folder.join(DOCUMENT_FILE_NAME);
        if !html.exists() {
            warn!("Skipping {}: no {}", folder.display(), DOCUMENT_FILE_NAME);
            continue;
        }

        let pdf = folder.join(RENDERED_PDF_FILE_NAME);
        if let Err(e) = converter.convert(&html, &pdf) {
            warn!("Failed to convert {}: {:#}", html.display(), e);
            report.failed += 1;
            continue;
        }
        report.rendered += 1;

        let bundle = bundle_path(day_dir, index);
        match bundle_folder(&folder, &bundle) {
            Ok(pages) => {
                info!("Bundled {} pages into {}", pages, bundle.display());
                report.bundles.push(bundle);
            }
            Err(e) => {
                warn!("Failed to bundle {}: {:#}", folder.display(), e);
                report.failed += 1;
            }
        }
    }

    info!(
        "Rendered {} folders of {} ({} failed)",
        report.rendered,
        day_dir.display(),
        report.failed
    );
    Ok(report)
}
