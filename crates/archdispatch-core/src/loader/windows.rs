//! `LoadLibraryW` / `GetProcAddress` / `FreeLibrary` / `GetLastError`.

use super::{ModuleLoader, RawModule};
use std::ffi::{c_void, CStr};
use std::os::windows::ffi::OsStrExt;
use std::path::Path;
use std::ptr::NonNull;
use windows_sys::Win32::Foundation::{FreeLibrary, GetLastError};
use windows_sys::Win32::System::LibraryLoader::{GetProcAddress, LoadLibraryW};

pub(crate) struct Win32Loader;

/// Formats `GetLastError()`, or `None` when it is zero.
fn last_os_error() -> Option<String> {
    // SAFETY: `GetLastError` has no preconditions.
    let code = unsafe { GetLastError() };
    if code == 0 {
        None
    } else {
        #[allow(clippy::cast_possible_wrap)] // Reason: Win32 error codes round-trip through i32.
        let code = code as i32;
        Some(std::io::Error::from_raw_os_error(code).to_string())
    }
}

impl ModuleLoader for Win32Loader {
    fn open(path: &Path) -> Result<RawModule, String> {
        let wide: Vec<u16> = path.as_os_str().encode_wide().chain(Some(0)).collect();
        // SAFETY: `LoadLibraryW` requires a NUL-terminated UTF-16 path.
        // - Condition 1: `wide` ends with a 0 terminator and outlives the call.
        // Reason: Loading the selected variant is the purpose of this crate.
        let handle = unsafe { LoadLibraryW(wide.as_ptr()) };
        RawModule::new(handle).ok_or_else(|| {
            last_os_error().unwrap_or_else(|| format!("LoadLibraryW failed for {}", path.display()))
        })
    }

    unsafe fn close(module: RawModule) {
        if FreeLibrary(module.as_ptr()) == 0 {
            tracing::warn!(
                error = last_os_error().as_deref().unwrap_or("unknown"),
                "FreeLibrary failed"
            );
        }
    }

    unsafe fn symbol(module: RawModule, name: &CStr) -> Option<NonNull<c_void>> {
        GetProcAddress(module.as_ptr(), name.as_ptr().cast())
            .and_then(|proc| NonNull::new(proc as *mut c_void))
    }

    fn last_error() -> Option<String> {
        last_os_error()
    }
}
