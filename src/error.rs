use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Exit code when no arguments were supplied.
pub const EXIT_USAGE: u8 = 1;
/// Exit code when a module could not be loaded.
pub const EXIT_LOAD_FAILURE: u8 = 2;

/// No arguments were given on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("no arguments supplied")]
pub struct UsageError;

/// Failures reported by a [`ModuleLoader`](crate::loader::ModuleLoader).
#[derive(Debug, Error)]
pub enum LoaderError {
    #[error("dynamic loader error: {0}")]
    Library(#[from] libloading::Error),
    #[error("module rejected: {0}")]
    Rejected(String),
}

/// Errors that stop a probe run.
#[derive(Debug, Error)]
pub enum ProbeError {
    #[error("load of {} failed", path.display())]
    Load {
        path: PathBuf,
        #[source]
        source: LoaderError,
    },
    #[error("failed to write probe report: {0}")]
    Report(#[from] io::Error),
}

impl ProbeError {
    /// Process exit code documented for this error, if any.
    pub fn exit_code(&self) -> Option<u8> {
        match self {
            ProbeError::Load { .. } => Some(EXIT_LOAD_FAILURE),
            ProbeError::Report(_) => None,
        }
    }
}
