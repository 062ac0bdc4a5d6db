//! Rendering probe events for people and for scripts.
//!
//! [`TextReport`] produces the classic progress log:
//!
//! ```text
//! load(plugin.so)
//! 0x7f3a1c2b4e10
//! 0x55d0c8a1f2a0
//! unload(plugin.so)
//!
//! ```
//!
//! [`JsonReport`] writes one JSON object per module instead.

use std::env;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::Serialize;
use thiserror::Error;

use crate::entry::Address;
use crate::options::BindingMode;
use crate::probe::{ProbeEvent, ProbeSink};

/// Environment variable selecting the report format.
pub const REPORT_ENV: &str = "LDVST_REPORT";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ReportFormat {
    #[default]
    Text,
    Json,
}

impl ReportFormat {
    /// Read the format from `LDVST_REPORT`, falling back to text.
    pub fn from_env() -> Self {
        match env::var(REPORT_ENV) {
            Ok(value) => value.parse().unwrap_or_else(|err| {
                tracing::warn!("{err}; using text report");
                ReportFormat::Text
            }),
            Err(_) => ReportFormat::Text,
        }
    }

    /// Build the sink for this format on top of `out`.
    pub fn sink<'a, W: Write + 'a>(self, out: W) -> Box<dyn ProbeSink + 'a> {
        match self {
            ReportFormat::Text => Box::new(TextReport::new(out)),
            ReportFormat::Json => Box::new(JsonReport::new(out)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown report format {0:?}")]
pub struct UnknownFormat(String);

impl FromStr for ReportFormat {
    type Err = UnknownFormat;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "" | "text" => Ok(ReportFormat::Text),
            "json" => Ok(ReportFormat::Json),
            _ => Err(UnknownFormat(s.to_string())),
        }
    }
}

/// Line-oriented progress log.
///
/// Each line is flushed as soon as it is written so that the output up to a
/// crashing entry point is never lost in a buffer.
pub struct TextReport<W: Write> {
    out: W,
}

impl<W: Write> TextReport<W> {
    pub fn new(out: W) -> Self {
        TextReport { out }
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write> ProbeSink for TextReport<W> {
    fn record(&mut self, event: &ProbeEvent) -> io::Result<()> {
        match event {
            ProbeEvent::Loading { path, .. } => writeln!(self.out, "load({})", path.display())?,
            ProbeEvent::LoadFailed { path } => {
                writeln!(self.out, "error: load of {} failed", path.display())?
            }
            ProbeEvent::Resolved { entry_point, .. } => {
                writeln!(self.out, "{}", entry_point.unwrap_or(Address::NULL))?
            }
            ProbeEvent::Returned { address, .. } => writeln!(self.out, "{address}")?,
            ProbeEvent::Unloaded { path, error } => {
                writeln!(self.out, "unload({})\n", path.display())?;
                if error.is_some() {
                    writeln!(self.out, "warning: unload of {} failed", path.display())?;
                }
            }
        }
        self.out.flush()
    }
}

/// Machine-readable record of one probed module.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ModuleReport {
    pub path: PathBuf,
    pub binding: BindingMode,
    pub loaded: bool,
    pub entry_point: Option<Address>,
    pub returned: Option<Address>,
    pub unloaded: bool,
    pub unload_error: Option<String>,
    pub md5: Option<String>,
    pub probed_at: String,
}

impl ModuleReport {
    fn started(path: &Path, binding: BindingMode) -> Self {
        ModuleReport {
            path: path.to_path_buf(),
            binding,
            loaded: false,
            entry_point: None,
            returned: None,
            unloaded: false,
            unload_error: None,
            md5: file_digest(path),
            probed_at: chrono::Utc::now().to_rfc3339(),
        }
    }
}

/// Hex MD5 of the module file, if `path` names a readable regular file.
///
/// Bare library names have no digest: the loader resolves them through its
/// search path, not the working directory, so a same-named local file is not
/// the module that was opened.
pub fn file_digest(path: &Path) -> Option<String> {
    if path.components().count() < 2 || !path.is_file() {
        return None;
    }
    match fs::read(path) {
        Ok(bytes) => Some(format!("{:x}", md5::compute(bytes))),
        Err(err) => {
            tracing::debug!(path = %path.display(), error = %err, "cannot fingerprint module");
            None
        }
    }
}

/// Writes one JSON line per module once its probe is finished.
pub struct JsonReport<W: Write> {
    out: W,
    current: Option<ModuleReport>,
}

impl<W: Write> JsonReport<W> {
    pub fn new(out: W) -> Self {
        JsonReport { out, current: None }
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn current(&mut self, path: &Path) -> &mut ModuleReport {
        self.current
            .get_or_insert_with(|| ModuleReport::started(path, BindingMode::default()))
    }

    fn finish(&mut self) -> io::Result<()> {
        if let Some(report) = self.current.take() {
            serde_json::to_writer(&mut self.out, &report)?;
            writeln!(self.out)?;
            self.out.flush()?;
        }
        Ok(())
    }
}

impl<W: Write> ProbeSink for JsonReport<W> {
    fn record(&mut self, event: &ProbeEvent) -> io::Result<()> {
        match event {
            ProbeEvent::Loading { path, binding } => {
                self.finish()?;
                self.current = Some(ModuleReport::started(path, *binding));
            }
            ProbeEvent::LoadFailed { path } => {
                self.current(path).loaded = false;
                self.finish()?;
            }
            ProbeEvent::Resolved { path, entry_point } => {
                let report = self.current(path);
                report.loaded = true;
                report.entry_point = *entry_point;
            }
            ProbeEvent::Returned { path, address } => {
                self.current(path).returned = Some(*address);
            }
            ProbeEvent::Unloaded { path, error } => {
                let report = self.current(path);
                report.loaded = true;
                report.unloaded = error.is_none();
                report.unload_error = error.clone();
                self.finish()?;
            }
        }
        Ok(())
    }
}
