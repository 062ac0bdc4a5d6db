//! Command-line options for the probe.
//!
//! The grammar is deliberately tiny: `-lazy` and `-now` toggle the binding
//! mode (last one wins), every other token is a module path.

use serde::Serialize;
use std::ffi::OsString;
use std::path::PathBuf;

use crate::error::UsageError;

/// Usage line printed when no arguments are given.
pub const USAGE: &str = "usage: ldvst [-lazy | -now] <plugin.vst>...";

/// How the dynamic loader binds a module's imported symbols.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BindingMode {
    /// Resolve every import when the module is opened.
    #[default]
    Now,
    /// Resolve imports on first use.
    Lazy,
}

impl BindingMode {
    pub fn is_lazy(self) -> bool {
        matches!(self, BindingMode::Lazy)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Options {
    pub binding: BindingMode,
    pub module_paths: Vec<PathBuf>,
}

impl Options {
    /// Build options from the argument vector, program name excluded.
    ///
    /// Fails only when the vector is empty. Paths are not checked here; a
    /// vector made solely of flags yields an empty path list.
    pub fn parse<I, T>(args: I) -> Result<Self, UsageError>
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString>,
    {
        let args: Vec<OsString> = args.into_iter().map(Into::into).collect();
        if args.is_empty() {
            return Err(UsageError);
        }

        let mut options = Options::default();
        for arg in args {
            if arg == "-lazy" {
                options.binding = BindingMode::Lazy;
            } else if arg == "-now" {
                options.binding = BindingMode::Now;
            } else {
                options.module_paths.push(PathBuf::from(arg));
            }
        }

        Ok(options)
    }
}
