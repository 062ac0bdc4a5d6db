//! ldvst
//!
//! Loads VST2 plugin binaries one at a time, calls their `VSTPluginMain`
//! entry point with no host callback, prints what came back and unloads
//! them again. Useful to check whether a plugin loads cleanly without
//! starting a full audio host.
//!
//! # Modules
//!
//! - `options` - command-line flags and module paths
//! - `loader` - the [`ModuleLoader`] trait and the OS-backed [`NativeLoader`]
//! - `entry` - the typed `VSTPluginMain` handle; the only place plugin code runs
//! - `probe` - the load/resolve/invoke/unload loop, reporting [`ProbeEvent`]s
//! - `report` - text and JSON renderers for those events
//!
//! # Exit codes
//!
//! | Code | Meaning |
//! |---|---|
//! | 0 | every module loaded, probed and unloaded |
//! | 1 | no arguments supplied |
//! | 2 | a module failed to load |

pub mod entry;
pub mod error;
pub mod loader;
pub mod options;
pub mod probe;
pub mod report;

pub use entry::{Address, EntryPoint, VstPluginMain, ENTRY_SYMBOL};
pub use error::{LoaderError, ProbeError, UsageError, EXIT_LOAD_FAILURE, EXIT_USAGE};
pub use loader::{ModuleLoader, NativeLoader};
pub use options::{BindingMode, Options, USAGE};
pub use probe::{probe_all, probe_module, ModuleOutcome, ProbeEvent, ProbeSink, RunSummary};
pub use report::{JsonReport, ModuleReport, ReportFormat, TextReport};
