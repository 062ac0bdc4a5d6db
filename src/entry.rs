//! The VST2 entry point and the pointer values it hands back.
//!
//! A plugin exports `VSTPluginMain`, which takes the host callback and
//! returns the plugin's effect object. The probe never dereferences that
//! object; it only reports where it lives.

use std::ffi::c_void;
use std::fmt;
use std::marker::PhantomData;
use std::ptr;

use serde::{Serialize, Serializer};

/// Name of the exported entry symbol.
pub const ENTRY_SYMBOL: &str = "VSTPluginMain";

/// Signature of `VSTPluginMain`.
pub type VstPluginMain = unsafe extern "C" fn(host_callback: *mut c_void) -> *mut c_void;

/// A pointer value kept for display only.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Address(usize);

impl Address {
    pub const NULL: Address = Address(0);

    pub fn from_ptr<T>(ptr: *const T) -> Self {
        Address(ptr as usize)
    }

    pub fn is_null(self) -> bool {
        self.0 == 0
    }
}

impl From<usize> for Address {
    fn from(value: usize) -> Self {
        Address(value)
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#x}", self.0)
    }
}

impl Serialize for Address {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// A resolved `VSTPluginMain`, valid while the module it came from is loaded.
#[derive(Clone, Copy)]
pub struct EntryPoint<'module> {
    func: VstPluginMain,
    _module: PhantomData<&'module ()>,
}

impl<'module> EntryPoint<'module> {
    /// Wrap a function pointer exported by a loaded module.
    ///
    /// # Safety
    ///
    /// `func` must be code following the `VSTPluginMain` calling convention,
    /// and the module exporting it must stay loaded for `'module`.
    pub unsafe fn new(func: VstPluginMain) -> Self {
        EntryPoint {
            func,
            _module: PhantomData,
        }
    }

    /// Wrap a raw symbol address. Returns `None` for null.
    ///
    /// # Safety
    ///
    /// Same contract as [`EntryPoint::new`] for any non-null `raw`.
    pub unsafe fn from_raw(raw: *mut c_void) -> Option<Self> {
        if raw.is_null() {
            return None;
        }
        let func = std::mem::transmute::<*mut c_void, VstPluginMain>(raw);
        Some(Self::new(func))
    }

    pub fn address(&self) -> Address {
        Address(self.func as usize)
    }

    /// Run the entry point with no host callback and report what it returned.
    ///
    /// This is the only place foreign plugin code is executed. A plugin that
    /// crashes here takes the process down with it.
    pub fn call(&self) -> Address {
        // SAFETY: the constructor contract guarantees the signature and that
        // the module is still mapped. A null callback is what the probe
        // passes to every plugin.
        let effect = unsafe { (self.func)(ptr::null_mut()) };
        Address::from_ptr(effect)
    }
}

impl fmt::Debug for EntryPoint<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EntryPoint")
            .field("address", &self.address())
            .finish()
    }
}
