use std::ffi::OsString;
use std::path::Path;
use std::process::Command;

use crate::error::BundleError;

/// Installs the packages listed in a manifest into a target directory.
pub trait DependencyInstaller {
    /// Fails with [`BundleError::InstallerUnavailable`] when the installer
    /// cannot run at all, so the build stops before anything is staged.
    fn preflight(&self) -> Result<(), BundleError>;

    fn install(&self, manifest: &Path, target: &Path) -> Result<(), BundleError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InstallerKind {
    #[default]
    Pip,
    Pip3,
    PythonModule,
}

impl InstallerKind {
    fn default_program(self) -> &'static str {
        match self {
            Self::Pip => "pip",
            Self::Pip3 => "pip3",
            Self::PythonModule => "python3",
        }
    }

    fn leading_args(self) -> &'static [&'static str] {
        match self {
            Self::Pip | Self::Pip3 => &[],
            Self::PythonModule => &["-m", "pip"],
        }
    }
}

/// Runs pip as a child process: `<program> [-m pip] install -r <manifest> -t <target>`.
#[derive(Debug, Clone, Default)]
pub struct PipInstaller {
    kind: InstallerKind,
    program: Option<String>,
    quiet: bool,
}

impl PipInstaller {
    pub fn new(kind: InstallerKind) -> Self {
        Self {
            kind,
            ..Self::default()
        }
    }

    /// Overrides the executable while keeping the argument shape of the kind.
    pub fn with_program(mut self, program: impl Into<String>) -> Self {
        self.program = Some(program.into());
        self
    }

    pub fn quiet(mut self, quiet: bool) -> Self {
        self.quiet = quiet;
        self
    }

    pub fn program(&self) -> &str {
        self.program
            .as_deref()
            .unwrap_or_else(|| self.kind.default_program())
    }

    pub fn install_args(&self, manifest: &Path, target: &Path) -> Vec<OsString> {
        let mut args: Vec<OsString> = self
            .kind
            .leading_args()
            .iter()
            .map(OsString::from)
            .collect();
        args.push("install".into());
        if self.quiet {
            args.push("--quiet".into());
        }
        args.push("-r".into());
        args.push(manifest.as_os_str().to_owned());
        args.push("-t".into());
        args.push(target.as_os_str().to_owned());
        args
    }
}

impl DependencyInstaller for PipInstaller {
    fn preflight(&self) -> Result<(), BundleError> {
        let program = self.program();
        let output = Command::new(program)
            .args(self.kind.leading_args())
            .arg("--version")
            .output()
            .map_err(|error| BundleError::InstallerUnavailable {
                program: program.to_string(),
                reason: error.to_string(),
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(BundleError::InstallerUnavailable {
                program: program.to_string(),
                reason: format!("`--version` exited with {}: {}", output.status, stderr.trim()),
            });
        }

        let version = String::from_utf8_lossy(&output.stdout);
        tracing::debug!("using {}", version.trim());
        Ok(())
    }

    fn install(&self, manifest: &Path, target: &Path) -> Result<(), BundleError> {
        let program = self.program();
        let args = self.install_args(manifest, target);
        tracing::info!("+ {program} {}", display_args(&args));

        let status = Command::new(program).args(&args).status().map_err(|error| {
            BundleError::InstallerUnavailable {
                program: program.to_string(),
                reason: error.to_string(),
            }
        })?;

        if !status.success() {
            return Err(BundleError::InstallerFailed {
                program: program.to_string(),
                code: status.code(),
            });
        }
        Ok(())
    }
}

fn display_args(args: &[OsString]) -> String {
    args.iter()
        .map(|arg| arg.to_string_lossy())
        .collect::<Vec<_>>()
        .join(" ")
}
