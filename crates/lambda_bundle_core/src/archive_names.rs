use std::path::{Component, Path};

use crate::layout::ValidationError;

/// Zip entry name for a path relative to the staging root.
///
/// Names use `/` separators regardless of platform and directories carry a
/// trailing `/`. Absolute paths, `..` components and non-UTF-8 names are
/// rejected because they cannot be represented faithfully in the archive.
pub fn entry_name(relative: &Path, is_dir: bool) -> Result<String, ValidationError> {
    let mut parts = Vec::new();
    for component in relative.components() {
        match component {
            Component::Normal(part) => {
                let part = part.to_str().ok_or_else(|| {
                    ValidationError::new(format!(
                        "path '{}' is not valid UTF-8 and cannot be archived",
                        relative.display()
                    ))
                })?;
                parts.push(part);
            }
            Component::CurDir => {}
            Component::ParentDir | Component::RootDir | Component::Prefix(_) => {
                return Err(ValidationError::new(format!(
                    "path '{}' escapes the staging directory",
                    relative.display()
                )));
            }
        }
    }

    if parts.is_empty() {
        return Err(ValidationError::new("the staging root has no entry name"));
    }

    let mut name = parts.join("/");
    if is_dir {
        name.push('/');
    }
    Ok(name)
}
