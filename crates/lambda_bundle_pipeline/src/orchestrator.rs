use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use lambda_bundle_core::layout::{BundleLayout, ResolvedLayout};
use lambda_bundle_core::manifest::{parse_manifest, Manifest};
use lambda_bundle_core::plan::BuildStep;
use serde::Serialize;

use crate::adapters::archive::{write_archive, ArchiveCompression, ArchiveSummary};
use crate::adapters::copy::{copy_dir_recursive, copy_file};
use crate::adapters::installer::DependencyInstaller;
use crate::adapters::staging::StagingDir;
use crate::error::BundleError;

#[derive(Debug, Clone, Default)]
pub struct BundleOptions {
    pub layout: BundleLayout,
    pub compression: ArchiveCompression,
    /// Leave the staging directory behind after a successful run.
    pub keep_staging: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct BundleReport {
    pub layout: ResolvedLayout,
    pub requirements: usize,
    pub steps_completed: Vec<BuildStep>,
    pub archive: ArchiveSummary,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub staging_kept: Option<PathBuf>,
}

fn step(index: usize, build_step: BuildStep) {
    tracing::info!(
        "=== [{index}/{}] {} ===",
        BuildStep::ALL.len(),
        build_step.label()
    );
}

/// Runs the full package pipeline, stopping at the first failing step.
///
/// Once the layout validates, any archive at the output path is removed, so a
/// failed run never leaves a stale archive that looks like a fresh one. The
/// staging directory is removed on every exit path unless
/// [`BundleOptions::keep_staging`] is set and the run succeeds.
pub fn run_bundle(
    options: &BundleOptions,
    installer: &impl DependencyInstaller,
) -> Result<BundleReport, BundleError> {
    let layout = options.layout.resolve()?;
    remove_stale_archive(&layout)?;

    let manifest = load_manifest(&layout)?;
    ensure_inputs_present(&layout)?;
    installer.preflight()?;

    let mut completed = Vec::with_capacity(BuildStep::ALL.len());

    step(1, BuildStep::CleanStaging);
    let staging = StagingDir::acquire(&layout.staging_dir)?;
    completed.push(BuildStep::CleanStaging);

    step(2, BuildStep::InstallDependencies);
    installer.install(&layout.manifest, staging.path())?;
    completed.push(BuildStep::InstallDependencies);

    step(3, BuildStep::CopyEntryPoint);
    copy_file(&layout.entry_point, &staging.path().join(layout.entry_point_name()))?;
    completed.push(BuildStep::CopyEntryPoint);

    step(4, BuildStep::CopyAssets);
    copy_dir_recursive(&layout.assets_dir, &staging.path().join(layout.assets_dir_name()))?;
    completed.push(BuildStep::CopyAssets);

    step(5, BuildStep::WriteArchive);
    let archive = write_archive(
        staging.path(),
        &layout.output_archive,
        &layout.partial_archive(),
        options.compression,
    )?;
    completed.push(BuildStep::WriteArchive);

    let staging_kept = if options.keep_staging {
        let kept = staging.keep();
        tracing::info!("keeping staging directory {}", kept.display());
        Some(kept)
    } else {
        step(6, BuildStep::RemoveStaging);
        staging.remove()?;
        completed.push(BuildStep::RemoveStaging);
        None
    };

    tracing::info!(
        "packaged {} ({} files, {} bytes, sha256 {})",
        archive.path.display(),
        archive.files,
        archive.archive_bytes,
        archive.sha256
    );

    Ok(BundleReport {
        layout,
        requirements: manifest.requirements().count(),
        steps_completed: completed,
        archive,
        staging_kept,
    })
}

fn remove_stale_archive(layout: &ResolvedLayout) -> Result<(), BundleError> {
    for path in [layout.output_archive.clone(), layout.partial_archive()] {
        match fs::remove_file(&path) {
            Ok(()) => tracing::debug!("removed previous archive {}", path.display()),
            Err(error) if error.kind() == io::ErrorKind::NotFound => {}
            Err(error) => {
                return Err(BundleError::Io {
                    action: "remove previous archive",
                    path,
                    source: error,
                })
            }
        }
    }
    Ok(())
}

fn ensure_inputs_present(layout: &ResolvedLayout) -> Result<(), BundleError> {
    let required: [(&'static str, &Path, fn(&Path) -> bool); 2] = [
        ("entry point", layout.entry_point.as_path(), Path::is_file),
        ("assets directory", layout.assets_dir.as_path(), Path::is_dir),
    ];
    for (what, path, present) in required {
        if !present(path) {
            return Err(BundleError::MissingInput {
                what,
                path: path.to_path_buf(),
            });
        }
    }
    Ok(())
}

/// Reads and pre-flights the manifest; the installer still does the real parse.
pub fn load_manifest(layout: &ResolvedLayout) -> Result<Manifest, BundleError> {
    if !layout.manifest.is_file() {
        return Err(BundleError::MissingInput {
            what: "manifest",
            path: layout.manifest.clone(),
        });
    }

    let contents = fs::read_to_string(&layout.manifest)
        .map_err(BundleError::io("read manifest", &layout.manifest))?;
    let manifest = parse_manifest(&contents).map_err(|source| BundleError::Manifest {
        path: layout.manifest.clone(),
        source,
    })?;

    if manifest.is_empty() {
        tracing::warn!(
            "{} lists no requirements; the bundle will contain no dependencies",
            layout.manifest.display()
        );
    }
    Ok(manifest)
}
