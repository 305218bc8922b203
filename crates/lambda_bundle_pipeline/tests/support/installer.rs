#![allow(dead_code)]

use std::cell::RefCell;
use std::fs;
use std::path::{Path, PathBuf};

use lambda_bundle_pipeline::adapters::installer::DependencyInstaller;
use lambda_bundle_pipeline::error::BundleError;

/// Stands in for pip: materializes a package directory per requirement name.
#[derive(Default)]
pub struct FakeInstaller {
    pub packages: Vec<&'static str>,
    pub fail_with: Option<i32>,
    pub unavailable: bool,
    pub calls: RefCell<Vec<(PathBuf, PathBuf)>>,
}

impl FakeInstaller {
    pub fn with_packages(packages: &[&'static str]) -> Self {
        Self {
            packages: packages.to_vec(),
            ..Self::default()
        }
    }

    pub fn failing(code: i32) -> Self {
        Self {
            fail_with: Some(code),
            ..Self::default()
        }
    }
}

impl DependencyInstaller for FakeInstaller {
    fn preflight(&self) -> Result<(), BundleError> {
        if self.unavailable {
            return Err(BundleError::InstallerUnavailable {
                program: "fake-pip".to_string(),
                reason: "not installed".to_string(),
            });
        }
        Ok(())
    }

    fn install(&self, manifest: &Path, target: &Path) -> Result<(), BundleError> {
        self.calls
            .borrow_mut()
            .push((manifest.to_path_buf(), target.to_path_buf()));

        // a real installer leaves partial state behind before failing
        fs::create_dir_all(target.join("half_installed")).expect("target should be writable");

        if let Some(code) = self.fail_with {
            return Err(BundleError::InstallerFailed {
                program: "fake-pip".to_string(),
                code: Some(code),
            });
        }

        for package in &self.packages {
            let package_dir = target.join(package);
            fs::create_dir_all(&package_dir).expect("package dir should be created");
            fs::write(package_dir.join("__init__.py"), "").expect("package init should be written");
        }
        fs::remove_dir_all(target.join("half_installed")).expect("scratch dir should be removed");
        Ok(())
    }
}
