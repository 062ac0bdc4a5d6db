//! Dynamic loading of plugin modules.
//!
//! The prober only talks to the [`ModuleLoader`] trait. [`NativeLoader`] is
//! the real backend: `dlopen`/`dlsym`/`dlclose` on Unix and
//! `LoadLibrary`/`GetProcAddress`/`FreeLibrary` on Windows, both through
//! `libloading`.
//!
//! # Binding mode
//!
//! On Unix the binding mode maps to `RTLD_NOW` or `RTLD_LAZY`. Windows has no
//! equivalent, so `-lazy` is accepted and ignored there.

use std::ffi::c_void;
use std::path::Path;

use libloading::Library;

use crate::entry::EntryPoint;
use crate::error::LoaderError;
use crate::options::BindingMode;

/// Load, resolve and unload operations over some kind of module handle.
pub trait ModuleLoader {
    /// Handle owning one loaded module.
    type Module;

    /// Open the module at `path`.
    fn load(&mut self, path: &Path, binding: BindingMode) -> Result<Self::Module, LoaderError>;

    /// Look up `symbol` as a `VSTPluginMain` entry point. `None` when the
    /// module does not export it or it resolves to null.
    fn resolve<'m>(&mut self, module: &'m Self::Module, symbol: &str) -> Option<EntryPoint<'m>>;

    /// Release the module.
    fn unload(&mut self, module: Self::Module) -> Result<(), LoaderError>;
}

/// Loader backed by the operating system.
#[derive(Debug, Default, Clone, Copy)]
pub struct NativeLoader;

impl ModuleLoader for NativeLoader {
    type Module = Library;

    fn load(&mut self, path: &Path, binding: BindingMode) -> Result<Library, LoaderError> {
        open_library(path, binding)
    }

    fn resolve<'m>(&mut self, module: &'m Library, symbol: &str) -> Option<EntryPoint<'m>> {
        // SAFETY: the symbol is read as a plain pointer value; nothing is
        // called here.
        let raw = match unsafe { module.get::<*mut c_void>(symbol.as_bytes()) } {
            Ok(sym) => *sym,
            Err(err) => {
                tracing::debug!(symbol, error = %err, "symbol lookup failed");
                return None;
            }
        };

        // SAFETY: an exported `VSTPluginMain` follows the VST2 entry ABI, and
        // the returned entry point borrows `module`, so it cannot outlive it.
        unsafe { EntryPoint::from_raw(raw) }
    }

    fn unload(&mut self, module: Library) -> Result<(), LoaderError> {
        module.close().map_err(LoaderError::from)
    }
}

#[cfg(unix)]
fn open_library(path: &Path, binding: BindingMode) -> Result<Library, LoaderError> {
    use libloading::os::unix::{Library as UnixLibrary, RTLD_LAZY, RTLD_NOW};

    let flags = if binding.is_lazy() { RTLD_LAZY } else { RTLD_NOW };
    tracing::debug!(path = %path.display(), ?binding, flags, "dlopen");

    // SAFETY: opening a module runs its static initialisers, which are
    // foreign code outside our control.
    let library = unsafe { UnixLibrary::open(Some(path), flags) }?;
    Ok(library.into())
}

#[cfg(windows)]
fn open_library(path: &Path, binding: BindingMode) -> Result<Library, LoaderError> {
    use libloading::os::windows::Library as WindowsLibrary;

    if binding.is_lazy() {
        tracing::debug!(path = %path.display(), "LoadLibrary has no lazy binding; ignoring -lazy");
    }
    tracing::debug!(path = %path.display(), "LoadLibrary");

    // SAFETY: see the Unix variant; DllMain runs here.
    let library = unsafe { WindowsLibrary::new(path) }?;
    Ok(library.into())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_module_is_a_loader_error() {
        let mut loader = NativeLoader;
        let result = loader.load(Path::new("/nonexistent/ldvst/missing.vst"), BindingMode::Now);
        assert!(matches!(result, Err(LoaderError::Library(_))));
    }

    #[cfg(all(target_os = "linux", target_env = "gnu"))]
    #[test]
    fn libc_loads_without_entry_point() {
        let mut loader = NativeLoader;
        for binding in [BindingMode::Now, BindingMode::Lazy] {
            let module = loader.load(Path::new("libc.so.6"), binding).unwrap();
            assert!(loader.resolve(&module, crate::entry::ENTRY_SYMBOL).is_none());
            loader.unload(module).unwrap();
        }
    }
}
