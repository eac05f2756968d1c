//! Bundling rendered documents into a compressed archive.

use crate::{Error, Result};
use flate2::Compression;
use flate2::write::GzEncoder;
use serde::{Deserialize, Serialize};
use std::io::{Cursor, Write};
use std::path::Path;
use zip::write::SimpleFileOptions;

/// Compression used for bulk export archives.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ArchiveFormat {
    /// Deflate-compressed zip
    #[default]
    Zip,
    /// gzip-compressed tar
    TarGz,
    /// zstd-compressed tar
    TarZst,
}

impl ArchiveFormat {
    /// Parse from string, case-insensitive.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "zip" => Some(ArchiveFormat::Zip),
            "tar-gz" | "tar.gz" | "tgz" | "gz" => Some(ArchiveFormat::TarGz),
            "tar-zst" | "tar.zst" | "zst" | "zstd" => Some(ArchiveFormat::TarZst),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ArchiveFormat::Zip => "zip",
            ArchiveFormat::TarGz => "tar-gz",
            ArchiveFormat::TarZst => "tar-zst",
        }
    }

    /// File extension, without the leading dot.
    pub fn extension(&self) -> &'static str {
        match self {
            ArchiveFormat::Zip => "zip",
            ArchiveFormat::TarGz => "tar.gz",
            ArchiveFormat::TarZst => "tar.zst",
        }
    }
}

impl std::fmt::Display for ArchiveFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One file inside the archive.
#[derive(Debug, Clone)]
pub struct ArchiveEntry {
    pub name: String,
    pub bytes: Vec<u8>,
}

fn append_entries<W: Write>(builder: &mut tar::Builder<W>, entries: &[ArchiveEntry]) -> Result<()> {
    let mtime = chrono::Utc::now().timestamp().max(0) as u64;
    for entry in entries {
        let mut header = tar::Header::new_gnu();
        header.set_size(entry.bytes.len() as u64);
        header.set_mode(0o644);
        header.set_mtime(mtime);
        header.set_cksum();
        builder.append_data(&mut header, &entry.name, entry.bytes.as_slice())?;
    }
    Ok(())
}

fn zip_error(e: zip::result::ZipError) -> Error {
    Error::Export(format!("zip: {}", e))
}

fn build_zip(entries: &[ArchiveEntry]) -> Result<Vec<u8>> {
    let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default()
        .compression_method(zip::CompressionMethod::Deflated)
        .unix_permissions(0o644);
    for entry in entries {
        writer.start_file(entry.name.as_str(), options).map_err(zip_error)?;
        writer.write_all(&entry.bytes)?;
    }
    Ok(writer.finish().map_err(zip_error)?.into_inner())
}

/// Build an archive in memory.
pub fn build_archive(entries: &[ArchiveEntry], format: ArchiveFormat) -> Result<Vec<u8>> {
    match format {
        ArchiveFormat::Zip => build_zip(entries),
        ArchiveFormat::TarGz => {
            let encoder = GzEncoder::new(Vec::new(), Compression::default());
            let mut builder = tar::Builder::new(encoder);
            append_entries(&mut builder, entries)?;
            Ok(builder.into_inner()?.finish()?)
        }
        ArchiveFormat::TarZst => {
            let encoder = zstd::stream::write::Encoder::new(Vec::new(), 0)?;
            let mut builder = tar::Builder::new(encoder);
            append_entries(&mut builder, entries)?;
            Ok(builder.into_inner()?.finish()?)
        }
    }
}

/// Write `bytes` to `path` through a temporary file in the same directory,
/// so readers never see a partial file.
pub fn write_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
    let dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    std::fs::create_dir_all(dir)?;

    let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
    tmp.write_all(bytes)?;
    tmp.flush()?;
    tmp.persist(path)
        .map_err(|e| Error::Export(format!("Could not write {}: {}", path.display(), e)))?;
    Ok(())
}

/// Names of the entries in an archive. Used to inspect exported bundles.
pub fn list_entries(bytes: &[u8], format: ArchiveFormat) -> Result<Vec<String>> {
    fn names<R: std::io::Read>(mut archive: tar::Archive<R>) -> Result<Vec<String>> {
        let mut names = Vec::new();
        for entry in archive.entries()? {
            let entry = entry?;
            names.push(entry.path()?.to_string_lossy().into_owned());
        }
        Ok(names)
    }

    match format {
        ArchiveFormat::Zip => {
            let mut archive = zip::ZipArchive::new(Cursor::new(bytes)).map_err(zip_error)?;
            let mut names = Vec::with_capacity(archive.len());
            for index in 0..archive.len() {
                names.push(archive.by_index(index).map_err(zip_error)?.name().to_string());
            }
            Ok(names)
        }
        ArchiveFormat::TarGz => names(tar::Archive::new(flate2::read::GzDecoder::new(bytes))),
        ArchiveFormat::TarZst => names(tar::Archive::new(zstd::stream::read::Decoder::new(bytes)?)),
    }
}
