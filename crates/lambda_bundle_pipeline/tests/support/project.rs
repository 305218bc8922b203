#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};

use lambda_bundle_pipeline::domain::layout::BundleLayout;
use lambda_bundle_pipeline::orchestrator::BundleOptions;
use tempfile::TempDir;

/// A throwaway project directory shaped like a function repository.
pub struct TestProject {
    dir: TempDir,
    assets_dir: String,
}

impl TestProject {
    /// Manifest pinning one dependency, a one-line entry point and an assets
    /// directory holding `index.html`.
    pub fn new(assets_dir: &str) -> Self {
        let project = Self {
            dir: TempDir::new().expect("temp dir should be created"),
            assets_dir: assets_dir.to_string(),
        };
        project.write("requirements.txt", "requests==2.0.0\n");
        project.write("riots.py", "print('riots')\n");
        project.write(&format!("{assets_dir}/index.html"), "<html></html>\n");
        project
    }

    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    pub fn path(&self, relative: &str) -> PathBuf {
        self.dir.path().join(relative)
    }

    pub fn write(&self, relative: &str, contents: &str) {
        let path = self.path(relative);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("parent directory should be created");
        }
        fs::write(path, contents).expect("fixture file should be written");
    }

    pub fn options(&self) -> BundleOptions {
        BundleOptions {
            layout: BundleLayout {
                project_dir: self.root().to_path_buf(),
                assets_dir: PathBuf::from(&self.assets_dir),
                ..BundleLayout::default()
            },
            ..BundleOptions::default()
        }
    }
}
