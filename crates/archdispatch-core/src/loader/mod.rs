//! Platform loader: the four OS primitives behind one interface.
//!
//! The concrete loader is picked at build time (`dlopen` family on Unix,
//! `LoadLibraryW` family on Windows). [`Module`] owns one opened handle and
//! closes it on drop.

use std::ffi::{c_void, CStr};
use std::path::Path;
use std::ptr::NonNull;

#[cfg(unix)]
mod unix;
#[cfg(windows)]
mod windows;

#[cfg(unix)]
pub(crate) use unix::DlLoader as Platform;
#[cfg(windows)]
pub(crate) use windows::Win32Loader as Platform;

/// Opaque OS module handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct RawModule(NonNull<c_void>);

impl RawModule {
    #[inline]
    pub(crate) fn new(ptr: *mut c_void) -> Option<Self> {
        NonNull::new(ptr).map(Self)
    }

    #[inline]
    pub(crate) fn as_ptr(self) -> *mut c_void {
        self.0.as_ptr()
    }
}

/// Open / close / symbol / last-error, as provided by the host OS.
pub(crate) trait ModuleLoader {
    /// Opens the library at `path`. On failure returns the loader's error text.
    fn open(path: &Path) -> Result<RawModule, String>;

    /// Releases a handle returned by [`open`](Self::open).
    ///
    /// # Safety
    ///
    /// `module` must come from `open` and must not be used afterwards.
    unsafe fn close(module: RawModule);

    /// Address of the exported symbol `name`, if present.
    ///
    /// # Safety
    ///
    /// `module` must be a live handle returned by `open`.
    unsafe fn symbol(module: RawModule, name: &CStr) -> Option<NonNull<c_void>>;

    /// Most recent loader error on this thread, if any.
    fn last_error() -> Option<String>;
}

/// An opened library. Closed exactly once, on drop.
#[derive(Debug)]
pub(crate) struct Module {
    raw: RawModule,
}

impl Module {
    /// Opens `path` with the platform loader.
    pub(crate) fn open(path: &Path) -> Result<Self, String> {
        Platform::open(path).map(|raw| Self { raw })
    }

    /// Looks up an exported symbol.
    pub(crate) fn symbol(&self, name: &CStr) -> Option<NonNull<c_void>> {
        // SAFETY: `symbol` requires a live handle.
        // - Condition 1: `self.raw` was returned by `Platform::open`.
        // - Condition 2: It is only closed in `Drop`, so it is live while `&self` exists.
        // Reason: Symbol resolution is the point of holding the module.
        unsafe { Platform::symbol(self.raw, name) }
    }
}

impl Drop for Module {
    fn drop(&mut self) {
        // SAFETY: `close` requires an `open` handle that is never reused.
        // - Condition 1: `self.raw` was returned by `Platform::open`.
        // - Condition 2: `drop` runs once and `raw` is not reachable afterwards.
        // Reason: Deterministic release of the OS module.
        unsafe { Platform::close(self.raw) };
    }
}

// SAFETY: `Module` is `Send` because OS module handles are not thread-affine.
// - Condition 1: dlclose/FreeLibrary may be called from any thread.
// - Condition 2: The handle is owned exclusively; no aliasing wrapper exists.
// Reason: A dispatcher may be built on one thread and used on another.
unsafe impl Send for Module {}
// SAFETY: `Module` is `Sync` because shared access only resolves symbols.
// - Condition 1: dlsym/GetProcAddress are thread-safe on a live handle.
// - Condition 2: `&self` methods never mutate or close the handle.
// Reason: Concurrent lookups on one loaded library are sound.
unsafe impl Sync for Module {}

/// Most recent platform loader error text, if any.
#[inline]
pub(crate) fn last_error() -> Option<String> {
    Platform::last_error()
}
