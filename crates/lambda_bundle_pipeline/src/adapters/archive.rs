use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};

use lambda_bundle_core::archive_names::entry_name;
use serde::Serialize;
use sha2::{Digest, Sha256};
use walkdir::WalkDir;
use zip::write::FileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

use crate::adapters::copy::relative_to;
use crate::error::BundleError;

const DIRECTORY_PERMISSIONS: u32 = 0o755;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ArchiveCompression {
    #[default]
    Deflated,
    Stored,
}

impl ArchiveCompression {
    fn method(self) -> CompressionMethod {
        match self {
            Self::Deflated => CompressionMethod::Deflated,
            Self::Stored => CompressionMethod::Stored,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ArchiveSummary {
    pub path: PathBuf,
    pub files: usize,
    pub directories: usize,
    pub uncompressed_bytes: u64,
    pub archive_bytes: u64,
    pub sha256: String,
}

/// Zips the contents of `source_dir` (not the directory itself) into `output`.
///
/// Entries are written in sorted order with the zip format's fixed default
/// timestamp, so identical trees produce identical archives. The archive is
/// assembled at `partial` and renamed onto `output` only once complete.
pub fn write_archive(
    source_dir: &Path,
    output: &Path,
    partial: &Path,
    compression: ArchiveCompression,
) -> Result<ArchiveSummary, BundleError> {
    let written = write_entries(source_dir, partial, compression);
    let mut summary = match written {
        Ok(summary) => summary,
        Err(error) => {
            if let Err(cleanup) = fs::remove_file(partial) {
                if cleanup.kind() != io::ErrorKind::NotFound {
                    tracing::warn!(
                        "failed to remove partial archive {}: {cleanup}",
                        partial.display()
                    );
                }
            }
            return Err(error);
        }
    };

    fs::rename(partial, output).map_err(BundleError::io("move archive into place", output))?;
    summary.path = output.to_path_buf();
    summary.sha256 = sha256_file(output)?;
    Ok(summary)
}

fn write_entries(
    source_dir: &Path,
    destination: &Path,
    compression: ArchiveCompression,
) -> Result<ArchiveSummary, BundleError> {
    let archive_error = |source| BundleError::Archive {
        path: destination.to_path_buf(),
        source,
    };

    let file = File::create(destination).map_err(BundleError::io("create archive", destination))?;
    let mut zip = ZipWriter::new(file);
    let base_options = FileOptions::default().compression_method(compression.method());

    let mut summary = ArchiveSummary {
        path: destination.to_path_buf(),
        files: 0,
        directories: 0,
        uncompressed_bytes: 0,
        archive_bytes: 0,
        sha256: String::new(),
    };

    for entry in WalkDir::new(source_dir)
        .min_depth(1)
        .follow_links(true)
        .sort_by_file_name()
    {
        let entry = entry.map_err(|error| BundleError::Io {
            action: "walk staging directory",
            path: error
                .path()
                .map(Path::to_path_buf)
                .unwrap_or_else(|| source_dir.to_path_buf()),
            source: error.into(),
        })?;

        let relative = relative_to(source_dir, entry.path())?;
        let is_dir = entry.file_type().is_dir();
        let name = entry_name(relative, is_dir)?;

        if is_dir {
            zip.add_directory(
                name,
                base_options.unix_permissions(DIRECTORY_PERMISSIONS),
            )
            .map_err(archive_error)?;
            summary.directories += 1;
            continue;
        }

        let metadata = entry
            .metadata()
            .map_err(|error| BundleError::Io {
                action: "read metadata of",
                path: entry.path().to_path_buf(),
                source: error.into(),
            })?;
        let options = base_options
            .unix_permissions(file_permissions(&metadata))
            .large_file(metadata.len() > u64::from(u32::MAX));

        zip.start_file(name, options).map_err(archive_error)?;
        let mut source = File::open(entry.path()).map_err(BundleError::io("open", entry.path()))?;
        summary.uncompressed_bytes += io::copy(&mut source, &mut zip)
            .map_err(BundleError::io("archive", entry.path()))?;
        summary.files += 1;
    }

    let file = zip.finish().map_err(archive_error)?;
    summary.archive_bytes = file
        .metadata()
        .map_err(BundleError::io("read metadata of", destination))?
        .len();

    tracing::debug!(
        "archived {} files and {} directories ({} bytes uncompressed)",
        summary.files,
        summary.directories,
        summary.uncompressed_bytes
    );
    Ok(summary)
}

#[cfg(unix)]
fn file_permissions(metadata: &fs::Metadata) -> u32 {
    use std::os::unix::fs::PermissionsExt;
    metadata.permissions().mode() & 0o777
}

#[cfg(not(unix))]
fn file_permissions(_metadata: &fs::Metadata) -> u32 {
    0o644
}

pub fn sha256_file(path: &Path) -> Result<String, BundleError> {
    let mut file = File::open(path).map_err(BundleError::io("open", path))?;
    let mut hasher = Sha256::new();
    io::copy(&mut file, &mut hasher).map_err(BundleError::io("hash", path))?;
    Ok(format!("{:x}", hasher.finalize()))
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ArchiveEntry {
    pub name: String,
    pub is_dir: bool,
    pub size: u64,
}

/// Lists the entries of an existing archive in stored order.
pub fn list_entries(path: &Path) -> Result<Vec<ArchiveEntry>, BundleError> {
    let archive_error = |source| BundleError::Archive {
        path: path.to_path_buf(),
        source,
    };

    let file = File::open(path).map_err(BundleError::io("open archive", path))?;
    let mut archive = ZipArchive::new(file).map_err(archive_error)?;

    let mut entries = Vec::with_capacity(archive.len());
    for index in 0..archive.len() {
        let entry = archive.by_index(index).map_err(archive_error)?;
        entries.push(ArchiveEntry {
            name: entry.name().to_string(),
            is_dir: entry.is_dir(),
            size: entry.size(),
        });
    }
    Ok(entries)
}
