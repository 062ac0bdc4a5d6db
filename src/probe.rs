//! The probe loop.
//!
//! Every module path goes through load, resolve, invoke and unload, strictly
//! in order and one at a time. Progress is reported as [`ProbeEvent`]s so the
//! loop itself never writes to the console.

use std::io;
use std::path::{Path, PathBuf};

use crate::entry::{Address, ENTRY_SYMBOL};
use crate::error::ProbeError;
use crate::loader::ModuleLoader;
use crate::options::{BindingMode, Options};

/// One observable step of probing a module.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProbeEvent {
    /// About to ask the loader for the module.
    Loading { path: PathBuf, binding: BindingMode },
    /// The loader returned no handle. The run stops here.
    LoadFailed { path: PathBuf },
    /// Result of looking up the entry symbol; `None` when absent.
    Resolved { path: PathBuf, entry_point: Option<Address> },
    /// The entry point was called and returned this value.
    Returned { path: PathBuf, address: Address },
    /// The module was released. `error` holds the reason if the loader
    /// reported a failure.
    Unloaded { path: PathBuf, error: Option<String> },
}

/// Receives probe events as they happen.
pub trait ProbeSink {
    fn record(&mut self, event: &ProbeEvent) -> io::Result<()>;
}

impl ProbeSink for Vec<ProbeEvent> {
    fn record(&mut self, event: &ProbeEvent) -> io::Result<()> {
        self.push(event.clone());
        Ok(())
    }
}

/// What happened to a single module that was loaded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleOutcome {
    pub path: PathBuf,
    pub entry_point: Option<Address>,
    pub returned: Option<Address>,
    pub unload_error: Option<String>,
}

/// Outcomes of a run in which every module loaded.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub modules: Vec<ModuleOutcome>,
}

impl RunSummary {
    pub fn unload_failures(&self) -> usize {
        self.modules
            .iter()
            .filter(|outcome| outcome.unload_error.is_some())
            .count()
    }
}

/// Probe every path in `options`, in order.
///
/// Stops at the first module that fails to load; paths after it are never
/// handed to the loader.
pub fn probe_all<L, S>(
    options: &Options,
    loader: &mut L,
    sink: &mut S,
) -> Result<RunSummary, ProbeError>
where
    L: ModuleLoader,
    S: ProbeSink + ?Sized,
{
    let mut summary = RunSummary::default();
    for path in &options.module_paths {
        let outcome = probe_module(path, options.binding, loader, sink)?;
        summary.modules.push(outcome);
    }
    Ok(summary)
}

/// Load, resolve, invoke and unload one module.
///
/// Once the module is loaded it is always unloaded before this returns, even
/// if the sink fails in between.
pub fn probe_module<L, S>(
    path: &Path,
    binding: BindingMode,
    loader: &mut L,
    sink: &mut S,
) -> Result<ModuleOutcome, ProbeError>
where
    L: ModuleLoader,
    S: ProbeSink + ?Sized,
{
    sink.record(&ProbeEvent::Loading {
        path: path.to_path_buf(),
        binding,
    })?;

    let module = match loader.load(path, binding) {
        Ok(module) => module,
        Err(source) => {
            tracing::error!(path = %path.display(), error = %source, "module failed to load");
            sink.record(&ProbeEvent::LoadFailed {
                path: path.to_path_buf(),
            })?;
            return Err(ProbeError::Load {
                path: path.to_path_buf(),
                source,
            });
        }
    };

    let invoked = resolve_and_invoke(path, &module, loader, sink);

    let unload_error = match loader.unload(module) {
        Ok(()) => None,
        Err(err) => {
            tracing::warn!(path = %path.display(), error = %err, "module failed to unload");
            Some(err.to_string())
        }
    };

    let (entry_point, returned) = invoked?;
    sink.record(&ProbeEvent::Unloaded {
        path: path.to_path_buf(),
        error: unload_error.clone(),
    })?;

    Ok(ModuleOutcome {
        path: path.to_path_buf(),
        entry_point,
        returned,
        unload_error,
    })
}

fn resolve_and_invoke<L, S>(
    path: &Path,
    module: &L::Module,
    loader: &mut L,
    sink: &mut S,
) -> io::Result<(Option<Address>, Option<Address>)>
where
    L: ModuleLoader,
    S: ProbeSink + ?Sized,
{
    let entry = loader.resolve(module, ENTRY_SYMBOL);
    let entry_point = entry.as_ref().map(|entry| entry.address());
    sink.record(&ProbeEvent::Resolved {
        path: path.to_path_buf(),
        entry_point,
    })?;

    let Some(entry) = entry else {
        tracing::debug!(path = %path.display(), "no {ENTRY_SYMBOL} export; skipping call");
        return Ok((None, None));
    };

    let returned = entry.call();
    sink.record(&ProbeEvent::Returned {
        path: path.to_path_buf(),
        address: returned,
    })?;

    Ok((entry_point, Some(returned)))
}
