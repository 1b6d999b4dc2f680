//! `dlopen` / `dlsym` / `dlclose` / `dlerror`.

use super::{ModuleLoader, RawModule};
use std::ffi::{c_void, CStr, CString};
use std::os::unix::ffi::OsStrExt;
use std::path::Path;
use std::ptr::NonNull;

pub(crate) struct DlLoader;

/// Takes and clears the thread's pending `dlerror` message.
fn take_dlerror() -> Option<String> {
    // SAFETY: `dlerror` returns null or a NUL-terminated thread-local string.
    // - Condition 1: The pointer is checked for null before use.
    // - Condition 2: The string is copied out before any other dl* call.
    // Reason: dlerror is the only error channel of the dl* family.
    unsafe {
        let msg = libc::dlerror();
        if msg.is_null() {
            None
        } else {
            Some(CStr::from_ptr(msg).to_string_lossy().into_owned())
        }
    }
}

impl ModuleLoader for DlLoader {
    fn open(path: &Path) -> Result<RawModule, String> {
        let c_path = CString::new(path.as_os_str().as_bytes())
            .map_err(|_| format!("path contains a NUL byte: {}", path.display()))?;
        // Clear stale errors so a failure below reports its own message.
        let _ = take_dlerror();
        // SAFETY: `dlopen` requires a valid NUL-terminated path.
        // - Condition 1: `c_path` is a `CString` alive for the call.
        // - Condition 2: Flags are a valid RTLD_* combination.
        // Reason: Loading the selected variant is the purpose of this crate.
        let handle = unsafe { libc::dlopen(c_path.as_ptr(), libc::RTLD_LAZY | libc::RTLD_LOCAL) };
        RawModule::new(handle).ok_or_else(|| {
            take_dlerror().unwrap_or_else(|| format!("dlopen failed for {}", path.display()))
        })
    }

    unsafe fn close(module: RawModule) {
        if libc::dlclose(module.as_ptr()) != 0 {
            tracing::warn!(
                error = take_dlerror().as_deref().unwrap_or("unknown"),
                "dlclose failed"
            );
        }
    }

    unsafe fn symbol(module: RawModule, name: &CStr) -> Option<NonNull<c_void>> {
        let _ = take_dlerror();
        NonNull::new(libc::dlsym(module.as_ptr(), name.as_ptr()))
    }

    fn last_error() -> Option<String> {
        take_dlerror()
    }
}
