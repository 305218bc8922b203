use std::fs;
use std::path::Path;

use walkdir::WalkDir;

use lambda_bundle_core::layout::ValidationError;

use crate::error::BundleError;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CopyStats {
    pub files: usize,
    pub directories: usize,
    pub bytes: u64,
}

/// `path` relative to the walk root it was yielded from.
pub(crate) fn relative_to<'a>(root: &Path, path: &'a Path) -> Result<&'a Path, BundleError> {
    path.strip_prefix(root).map_err(|_| {
        BundleError::Layout(ValidationError::new(format!(
            "'{}' is outside '{}'",
            path.display(),
            root.display()
        )))
    })
}

pub fn copy_file(source: &Path, destination: &Path) -> Result<u64, BundleError> {
    if !source.is_file() {
        return Err(BundleError::MissingInput {
            what: "file",
            path: source.to_path_buf(),
        });
    }
    if let Some(parent) = destination.parent() {
        fs::create_dir_all(parent).map_err(BundleError::io("create directory", parent))?;
    }
    fs::copy(source, destination).map_err(BundleError::io("copy file", source))
}

/// Copies `source` to `destination` recursively, like `cp -r source destination`
/// when `destination` does not exist yet. Symlinks are followed.
pub fn copy_dir_recursive(source: &Path, destination: &Path) -> Result<CopyStats, BundleError> {
    if !source.is_dir() {
        return Err(BundleError::MissingInput {
            what: "directory",
            path: source.to_path_buf(),
        });
    }

    let mut stats = CopyStats::default();
    for entry in WalkDir::new(source)
        .follow_links(true)
        .sort_by_file_name()
    {
        let entry = entry.map_err(|error| {
            let path = error
                .path()
                .map(Path::to_path_buf)
                .unwrap_or_else(|| source.to_path_buf());
            BundleError::Io {
                action: "walk directory",
                path,
                source: error.into(),
            }
        })?;

        let target = destination.join(relative_to(source, entry.path())?);

        if entry.file_type().is_dir() {
            fs::create_dir_all(&target).map_err(BundleError::io("create directory", &target))?;
            stats.directories += 1;
        } else {
            stats.bytes += fs::copy(entry.path(), &target)
                .map_err(BundleError::io("copy file", entry.path()))?;
            stats.files += 1;
        }
    }

    tracing::debug!(
        "copied {} files in {} directories ({} bytes) from {}",
        stats.files,
        stats.directories,
        stats.bytes,
        source.display()
    );
    Ok(stats)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn copies_nested_tree_under_destination_name() {
        let root = TempDir::new().unwrap();
        let source = root.path().join("site");
        fs::create_dir_all(source.join("css")).unwrap();
        fs::write(source.join("index.mustache"), "{{#releases}}{{/releases}}").unwrap();
        fs::write(source.join("css/style.css"), "body {}").unwrap();

        let destination = root.path().join("build_func/site");
        let stats = copy_dir_recursive(&source, &destination).unwrap();

        assert_eq!(stats.files, 2);
        assert_eq!(stats.directories, 2);
        assert_eq!(
            fs::read_to_string(destination.join("css/style.css")).unwrap(),
            "body {}"
        );
    }

    #[test]
    fn missing_source_directory_is_reported() {
        let root = TempDir::new().unwrap();
        let error = copy_dir_recursive(&root.path().join("sites"), &root.path().join("out"))
            .expect_err("missing directory should fail");
        assert!(matches!(
            error,
            BundleError::MissingInput {
                what: "directory",
                ..
            }
        ));
    }

    #[test]
    fn relative_to_rejects_paths_outside_the_root() {
        let error = relative_to(Path::new("/srv/app/site"), Path::new("/srv/app/other/index.html"))
            .expect_err("foreign path should fail");
        assert!(matches!(error, BundleError::Layout(_)));

        let relative = relative_to(Path::new("/srv/app/site"), Path::new("/srv/app/site/css/a.css"))
            .expect("nested path should resolve");
        assert_eq!(relative, Path::new("css/a.css"));
    }

    #[test]
    fn copy_file_creates_parent_directories() {
        let root = TempDir::new().unwrap();
        let source = root.path().join("riots.py");
        fs::write(&source, "print('hello')\n").unwrap();

        let bytes = copy_file(&source, &root.path().join("nested/out/riots.py")).unwrap();
        assert_eq!(bytes, 15);
    }

    #[cfg(unix)]
    #[test]
    fn symlinked_entries_are_copied_as_regular_content() {
        use std::os::unix::fs::symlink;

        let root = TempDir::new().unwrap();
        let shared = root.path().join("shared");
        fs::create_dir_all(shared.join("fonts")).unwrap();
        fs::write(shared.join("fonts/mono.woff"), "woff").unwrap();
        fs::write(shared.join("logo.svg"), "<svg/>").unwrap();

        let source = root.path().join("site");
        fs::create_dir_all(&source).unwrap();
        symlink(shared.join("fonts"), source.join("fonts")).unwrap();
        symlink(shared.join("logo.svg"), source.join("logo.svg")).unwrap();

        let destination = root.path().join("build_func/site");
        let stats = copy_dir_recursive(&source, &destination).unwrap();

        assert_eq!(stats.files, 2);
        assert!(!fs::symlink_metadata(destination.join("fonts"))
            .unwrap()
            .file_type()
            .is_symlink());
        assert_eq!(
            fs::read_to_string(destination.join("fonts/mono.woff")).unwrap(),
            "woff"
        );
        assert_eq!(
            fs::read_to_string(destination.join("logo.svg")).unwrap(),
            "<svg/>"
        );
    }
}
