use std::io;
use std::path::PathBuf;

use lambda_bundle_core::layout::ValidationError;
use lambda_bundle_core::manifest::ManifestError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum BundleError {
    #[error("invalid bundle layout")]
    Layout(#[from] ValidationError),

    #[error("{what} not found at '{}'", path.display())]
    MissingInput { what: &'static str, path: PathBuf },

    #[error("malformed manifest '{}'", path.display())]
    Manifest {
        path: PathBuf,
        #[source]
        source: ManifestError,
    },

    #[error("installer `{program}` is not available: {reason}")]
    InstallerUnavailable { program: String, reason: String },

    #[error("installer `{program}` failed with {}", describe_exit(*code))]
    InstallerFailed { program: String, code: Option<i32> },

    #[error("failed to {action} '{}'", path.display())]
    Io {
        action: &'static str,
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to process archive '{}'", path.display())]
    Archive {
        path: PathBuf,
        #[source]
        source: zip::result::ZipError,
    },
}

impl BundleError {
    pub(crate) fn io(
        action: &'static str,
        path: impl Into<PathBuf>,
    ) -> impl FnOnce(io::Error) -> Self {
        let path = path.into();
        move |source| Self::Io {
            action,
            path,
            source,
        }
    }

    /// Process exit code a command-line front end should report.
    ///
    /// A failing installer's own status is passed through; everything else is 1.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::InstallerFailed {
                code: Some(code), ..
            } if *code != 0 => *code,
            _ => 1,
        }
    }
}

fn describe_exit(code: Option<i32>) -> String {
    match code {
        Some(code) => format!("exit status {code}"),
        None => "no exit status (terminated by signal)".to_string(),
    }
}
