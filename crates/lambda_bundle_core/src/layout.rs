use std::path::{Component, Path, PathBuf};

use serde::Serialize;

pub const DEFAULT_MANIFEST: &str = "requirements.txt";
pub const DEFAULT_ENTRY_POINT: &str = "riots.py";
pub const DEFAULT_ASSETS_DIR: &str = "site";
pub const DEFAULT_STAGING_DIR: &str = "build_func";
pub const DEFAULT_OUTPUT_ARCHIVE: &str = "lambda.zip";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    message: String,
}

impl ValidationError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for ValidationError {}

/// Where the bundle inputs live and where the outputs go.
///
/// Relative paths are interpreted against `project_dir`; absolute paths are
/// used as given.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BundleLayout {
    pub project_dir: PathBuf,
    pub manifest: PathBuf,
    pub entry_point: PathBuf,
    pub assets_dir: PathBuf,
    pub staging_dir: PathBuf,
    pub output_archive: PathBuf,
}

impl Default for BundleLayout {
    fn default() -> Self {
        Self {
            project_dir: PathBuf::from("."),
            manifest: PathBuf::from(DEFAULT_MANIFEST),
            entry_point: PathBuf::from(DEFAULT_ENTRY_POINT),
            assets_dir: PathBuf::from(DEFAULT_ASSETS_DIR),
            staging_dir: PathBuf::from(DEFAULT_STAGING_DIR),
            output_archive: PathBuf::from(DEFAULT_OUTPUT_ARCHIVE),
        }
    }
}

/// A validated layout with every path joined onto the project directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedLayout {
    pub project_dir: PathBuf,
    pub manifest: PathBuf,
    pub entry_point: PathBuf,
    pub assets_dir: PathBuf,
    pub staging_dir: PathBuf,
    pub output_archive: PathBuf,
}

impl ResolvedLayout {
    /// File name the entry point takes inside the staging directory.
    pub fn entry_point_name(&self) -> &Path {
        // resolve() guarantees a final component
        Path::new(self.entry_point.file_name().unwrap_or_default())
    }

    /// Directory name the assets take inside the staging directory.
    pub fn assets_dir_name(&self) -> &Path {
        Path::new(self.assets_dir.file_name().unwrap_or_default())
    }

    pub fn staged_entry_point(&self) -> PathBuf {
        self.staging_dir.join(self.entry_point_name())
    }

    pub fn staged_assets_dir(&self) -> PathBuf {
        self.staging_dir.join(self.assets_dir_name())
    }

    /// Sibling file the archive is written to before being renamed into place.
    pub fn partial_archive(&self) -> PathBuf {
        let mut name = self
            .output_archive
            .file_name()
            .unwrap_or_default()
            .to_os_string();
        name.push(".partial");
        self.output_archive.with_file_name(name)
    }
}

impl BundleLayout {
    /// Joins every path onto the project directory and validates the result.
    ///
    /// The project directory is made absolute against the current working
    /// directory first, so containment checks compare like with like when a
    /// relative project directory meets an absolute override.
    pub fn resolve(&self) -> Result<ResolvedLayout, ValidationError> {
        if self.project_dir.as_os_str().is_empty() {
            return Err(ValidationError::new("project directory cannot be empty"));
        }

        let absolute = std::path::absolute(&self.project_dir).map_err(|error| {
            ValidationError::new(format!(
                "project directory '{}' cannot be made absolute: {error}",
                self.project_dir.display()
            ))
        })?;
        let project_dir = normalize_lexically(&absolute);
        let join = |label: &str, path: &Path| -> Result<PathBuf, ValidationError> {
            if path.as_os_str().is_empty() {
                return Err(ValidationError::new(format!("{label} path cannot be empty")));
            }
            Ok(normalize_lexically(&project_dir.join(path)))
        };

        let resolved = ResolvedLayout {
            manifest: join("manifest", &self.manifest)?,
            entry_point: join("entry point", &self.entry_point)?,
            assets_dir: join("assets directory", &self.assets_dir)?,
            staging_dir: join("staging directory", &self.staging_dir)?,
            output_archive: join("output archive", &self.output_archive)?,
            project_dir,
        };

        validate_resolved(&resolved)?;
        Ok(resolved)
    }
}

fn validate_resolved(layout: &ResolvedLayout) -> Result<(), ValidationError> {
    if layout.entry_point.file_name().is_none() {
        return Err(ValidationError::new(format!(
            "entry point '{}' does not name a file",
            layout.entry_point.display()
        )));
    }

    if layout.assets_dir.file_name().is_none() {
        return Err(ValidationError::new(format!(
            "assets directory '{}' has no final path component",
            layout.assets_dir.display()
        )));
    }

    if layout.output_archive.file_name().is_none() {
        return Err(ValidationError::new(format!(
            "output archive '{}' does not name a file",
            layout.output_archive.display()
        )));
    }

    let staging = &layout.staging_dir;
    if staging.file_name().is_none() || layout.project_dir.starts_with(staging) {
        return Err(ValidationError::new(format!(
            "staging directory '{}' must be a subdirectory, not the project directory or one of its ancestors",
            staging.display()
        )));
    }

    let guarded = [
        ("manifest", &layout.manifest),
        ("entry point", &layout.entry_point),
        ("assets directory", &layout.assets_dir),
        ("output archive", &layout.output_archive),
    ];
    for (label, path) in guarded {
        if path.starts_with(staging) {
            return Err(ValidationError::new(format!(
                "{label} '{}' lies inside staging directory '{}', which is deleted on every run",
                path.display(),
                staging.display()
            )));
        }
        if staging.starts_with(path) && label != "output archive" {
            return Err(ValidationError::new(format!(
                "staging directory '{}' lies inside {label} '{}'",
                staging.display(),
                path.display()
            )));
        }
    }

    // the archive and its partial sibling are deleted before inputs are read
    for archive in [&layout.output_archive, &layout.partial_archive()] {
        let clobbers = [
            ("manifest", *archive == layout.manifest),
            ("entry point", *archive == layout.entry_point),
            ("assets directory", archive.starts_with(&layout.assets_dir)),
        ];
        if let Some((label, _)) = clobbers.iter().find(|(_, hit)| *hit) {
            return Err(ValidationError::new(format!(
                "output archive '{}' would overwrite the {label}",
                archive.display()
            )));
        }
    }

    Ok(())
}

/// Collapses `.` and `..` components without touching the filesystem.
///
/// A `..` that would climb above the start of a relative path is kept.
pub fn normalize_lexically(path: &Path) -> PathBuf {
    let mut normalized = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => match normalized.components().next_back() {
                Some(Component::Normal(_)) => {
                    normalized.pop();
                }
                Some(Component::RootDir) | Some(Component::Prefix(_)) => {}
                _ => normalized.push(".."),
            },
            other => normalized.push(other.as_os_str()),
        }
    }

    if normalized.as_os_str().is_empty() {
        PathBuf::from(".")
    } else {
        normalized
    }
}
