//! Document and archive export commands.

use super::{Output, json};
use crate::export::{
    self, ArchiveFormat, BulkExportReport, DocumentFormat, Logo, PrintJob,
};
use crate::storage::Storage;
use crate::{Error, Result};
use serde::Serialize;
use std::path::{Path, PathBuf};

#[derive(Serialize)]
pub struct ExportedDocument {
    pub test_id: String,
    pub path: PathBuf,
    pub format: DocumentFormat,
}

impl Output for ExportedDocument {
    fn to_json(&self) -> String {
        json(self)
    }

    fn to_human(&self) -> String {
        format!("Exported {} to {}", self.test_id, self.path.display())
    }
}

impl Output for BulkExportReport {
    fn to_json(&self) -> String {
        json(self)
    }

    fn to_human(&self) -> String {
        let mut lines = vec![format!(
            "Exported {} document(s) to {}",
            self.exported.len(),
            self.archive_path.display()
        )];
        for failure in &self.failed {
            lines.push(format!(
                "  skipped {} ({}): {}",
                failure.name, failure.test_id, failure.error
            ));
        }
        lines.join("\n")
    }
}

fn document_format(format: &str) -> Result<DocumentFormat> {
    DocumentFormat::parse(format).ok_or_else(|| {
        Error::InvalidInput(format!("Unknown document format '{}' (pdf or html)", format))
    })
}

pub fn export_test(
    data_dir: &Path,
    project: &str,
    test: &str,
    format: &str,
    out_dir: &Path,
) -> Result<ExportedDocument> {
    let format = document_format(format)?;
    let storage = Storage::open_with_data_dir(data_dir)?;
    let project = storage.resolve_project(project)?;
    let record = project
        .get_test(test)
        .ok_or_else(|| Error::NotFound(format!("Test not found: {}", test)))?;
    let logo = Logo::from_settings(&storage.get_settings()?);

    let job = PrintJob {
        record,
        project_name: &project.name,
        logo: logo.as_ref(),
    };
    let path = export::export_test(&job, format.renderer().as_ref(), out_dir)?;
    Ok(ExportedDocument {
        test_id: record.id.clone(),
        path,
        format,
    })
}

pub fn export_project(
    data_dir: &Path,
    project: &str,
    format: &str,
    archive: ArchiveFormat,
    out_dir: &Path,
) -> Result<BulkExportReport> {
    let format = document_format(format)?;
    let storage = Storage::open_with_data_dir(data_dir)?;
    let project = storage.resolve_project(project)?;
    let settings = storage.get_settings()?;
    export::export_project(&project, &settings, format.renderer().as_ref(), archive, out_dir)
}
