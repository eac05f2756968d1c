//! Export of test records as printable documents.
//!
//! A record is first turned into a [`template::PrintDocument`], then handed
//! to a [`DocumentRenderer`]. Bulk export renders every test of a project and
//! bundles the results into one archive; a record that fails to render is
//! logged and left out rather than aborting the whole export.

pub mod archive;
pub mod pdf;
pub mod template;

pub use archive::{ArchiveEntry, ArchiveFormat};

use crate::models::{Project, Settings, TestRecord};
use crate::{Error, Result};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use regex::Regex;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;
use template::PrintDocument;

static UNSAFE_FILENAME_CHARS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)[^a-z0-9]").expect("filename pattern is valid"));

/// Suffix of bulk export archive names.
pub const BULK_ARCHIVE_SUFFIX: &str = "-pruebas";

/// Replace every character outside `[a-z0-9]` (any case) with `_`.
pub fn sanitize_filename(name: &str) -> String {
    UNSAFE_FILENAME_CHARS.replace_all(name, "_").into_owned()
}

/// Decoded logo image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Logo {
    pub mime: &'static str,
    pub bytes: Vec<u8>,
}

impl Logo {
    pub fn from_bytes(bytes: Vec<u8>) -> Self {
        let mime = if bytes.starts_with(&[0x89, b'P', b'N', b'G']) {
            "image/png"
        } else if bytes.starts_with(&[0xff, 0xd8]) {
            "image/jpeg"
        } else if bytes.starts_with(b"GIF8") {
            "image/gif"
        } else {
            "application/octet-stream"
        };
        Self { mime, bytes }
    }

    /// Decode a stored logo. Accepts bare base64 or a `data:` URL.
    pub fn from_base64(encoded: &str) -> Result<Self> {
        let payload = match encoded.split_once(";base64,") {
            Some((prefix, data)) if prefix.starts_with("data:") => data,
            _ => encoded,
        };
        let bytes = STANDARD
            .decode(payload.trim())
            .map_err(|e| Error::InvalidInput(format!("Invalid logo encoding: {}", e)))?;
        Ok(Self::from_bytes(bytes))
    }

    /// The logo of the global settings, if one is set and decodes.
    pub fn from_settings(settings: &Settings) -> Option<Self> {
        let encoded = settings.logo.as_deref()?;
        match Self::from_base64(encoded) {
            Ok(logo) => Some(logo),
            Err(e) => {
                tracing::warn!(error = %e, "ignoring unreadable logo");
                None
            }
        }
    }

    pub fn data_url(&self) -> String {
        format!("data:{};base64,{}", self.mime, STANDARD.encode(&self.bytes))
    }
}

/// Read an image file and encode it for storage in the settings.
pub fn encode_logo_file(path: &Path) -> Result<String> {
    let bytes = std::fs::read(path)?;
    if bytes.is_empty() {
        return Err(Error::InvalidInput(format!("{} is empty", path.display())));
    }
    Ok(STANDARD.encode(bytes))
}

/// Everything needed to print one record.
#[derive(Debug, Clone, Copy)]
pub struct PrintJob<'a> {
    pub record: &'a TestRecord,
    pub project_name: &'a str,
    pub logo: Option<&'a Logo>,
}

/// Turns a print document into file bytes.
pub trait DocumentRenderer {
    /// File extension of the output, without the dot.
    fn extension(&self) -> &'static str;

    fn render(&self, doc: &PrintDocument) -> Result<Vec<u8>>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct PdfRenderer;

impl DocumentRenderer for PdfRenderer {
    fn extension(&self) -> &'static str {
        "pdf"
    }

    fn render(&self, doc: &PrintDocument) -> Result<Vec<u8>> {
        Ok(pdf::render_pdf(doc))
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct HtmlRenderer;

impl DocumentRenderer for HtmlRenderer {
    fn extension(&self) -> &'static str {
        "html"
    }

    fn render(&self, doc: &PrintDocument) -> Result<Vec<u8>> {
        Ok(template::render_html(doc).into_bytes())
    }
}

/// Document formats selectable from the command line.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentFormat {
    #[default]
    Pdf,
    Html,
}

impl DocumentFormat {
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "pdf" => Some(DocumentFormat::Pdf),
            "html" | "htm" => Some(DocumentFormat::Html),
            _ => None,
        }
    }

    pub fn renderer(&self) -> Box<dyn DocumentRenderer> {
        match self {
            DocumentFormat::Pdf => Box::new(PdfRenderer),
            DocumentFormat::Html => Box::new(HtmlRenderer),
        }
    }
}

/// File name of a single exported record.
pub fn document_filename(record: &TestRecord, renderer: &dyn DocumentRenderer) -> String {
    format!(
        "{}.{}",
        sanitize_filename(&record.document_title()),
        renderer.extension()
    )
}

/// Render one record into `out_dir`. Returns the written path.
pub fn export_test(
    job: &PrintJob<'_>,
    renderer: &dyn DocumentRenderer,
    out_dir: &Path,
) -> Result<PathBuf> {
    let bytes = renderer.render(&PrintDocument::build(job))?;
    let path = out_dir.join(document_filename(job.record, renderer));
    archive::write_atomic(&path, &bytes)?;
    tracing::info!(test = %job.record.id, path = %path.display(), "exported test");
    Ok(path)
}

/// A record left out of a bulk export.
#[derive(Debug, Clone, Serialize)]
pub struct ExportFailure {
    pub test_id: String,
    pub name: String,
    pub error: String,
}

/// Outcome of a bulk export.
#[derive(Debug, Clone, Serialize)]
pub struct BulkExportReport {
    pub archive_path: PathBuf,
    pub format: ArchiveFormat,
    /// Entry names in archive order
    pub exported: Vec<String>,
    pub failed: Vec<ExportFailure>,
}

/// Render every test of a project and bundle them into
/// `<project>-pruebas.<ext>` inside `out_dir`.
///
/// Entries are named by the sanitised test name. When two tests map to the
/// same entry name, the later one replaces the earlier in place.
pub fn export_project(
    project: &Project,
    settings: &Settings,
    renderer: &dyn DocumentRenderer,
    format: ArchiveFormat,
    out_dir: &Path,
) -> Result<BulkExportReport> {
    if project.tests.is_empty() {
        return Err(Error::InvalidInput(format!(
            "Project '{}' has no tests to export",
            project.name
        )));
    }

    let logo = Logo::from_settings(settings);
    let mut entries: Vec<ArchiveEntry> = Vec::new();
    let mut failed = Vec::new();

    for record in &project.tests {
        let job = PrintJob {
            record,
            project_name: &project.name,
            logo: logo.as_ref(),
        };
        match renderer.render(&PrintDocument::build(&job)) {
            Ok(bytes) => {
                let name = format!("{}.{}", sanitize_filename(&record.name), renderer.extension());
                match entries.iter_mut().find(|e| e.name == name) {
                    Some(existing) => {
                        tracing::debug!(entry = %name, "duplicate entry name, replacing");
                        existing.bytes = bytes;
                    }
                    None => entries.push(ArchiveEntry { name, bytes }),
                }
            }
            Err(e) => {
                tracing::warn!(test = %record.id, error = %e, "failed to render test, skipping");
                failed.push(ExportFailure {
                    test_id: record.id.clone(),
                    name: record.name.clone(),
                    error: e.to_string(),
                });
            }
        }
    }

    let archive_name = format!(
        "{}{}.{}",
        sanitize_filename(&project.name),
        BULK_ARCHIVE_SUFFIX,
        format.extension()
    );
    let archive_path = out_dir.join(archive_name);
    let bytes = archive::build_archive(&entries, format)?;
    archive::write_atomic(&archive_path, &bytes)?;

    tracing::info!(
        project = %project.id,
        exported = entries.len(),
        failed = failed.len(),
        path = %archive_path.display(),
        "bulk export finished"
    );

    Ok(BulkExportReport {
        archive_path,
        format,
        exported: entries.into_iter().map(|e| e.name).collect(),
        failed,
    })
}
