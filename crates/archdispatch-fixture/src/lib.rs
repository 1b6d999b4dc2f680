//! Minimal variant library used to exercise real dynamic loading.
//!
//! Exports the two C entry points the dispatcher tests call:
//! `get_result` (sum of a float buffer) and `simd_main` (a `main`-shaped
//! routine that echoes its argument count back as an exit code when asked).

use std::ffi::{c_char, c_int, CStr};

/// Sums `n` floats starting at `values`.
///
/// # Safety
///
/// `values` must point to `n` readable, initialized `f32`s (or `n` must be 0).
#[no_mangle]
pub unsafe extern "C" fn get_result(values: *const f32, n: u64) -> f32 {
    if values.is_null() || n == 0 {
        return 0.0;
    }
    let Ok(len) = usize::try_from(n) else {
        return f32::NAN;
    };
    std::slice::from_raw_parts(values, len).iter().sum()
}

/// `main`-shaped entry point.
///
/// Returns 0, or `argc` when the last argument is `--exit-argc`.
///
/// # Safety
///
/// `argv` must hold `argc` valid C strings followed by a null pointer.
#[no_mangle]
pub unsafe extern "C" fn simd_main(argc: c_int, argv: *mut *mut c_char) -> c_int {
    let Ok(count) = usize::try_from(argc) else {
        return -1;
    };
    if count == 0 || argv.is_null() {
        return 0;
    }
    let last = *argv.add(count - 1);
    if !last.is_null() && CStr::from_ptr(last).to_bytes() == b"--exit-argc" {
        return argc;
    }
    0
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::ffi::CString;

    #[test]
    fn test_get_result_sums_consecutive_integers() {
        let values: Vec<f32> = (0..256_u16).map(f32::from).collect();
        let sum = unsafe { get_result(values.as_ptr(), values.len() as u64) };
        assert!((sum - 32640.0).abs() < f32::EPSILON);
    }

    #[test]
    fn test_get_result_empty() {
        assert!(unsafe { get_result(std::ptr::null(), 0) }.abs() < f32::EPSILON);
    }

    #[test]
    fn test_simd_main_exit_codes() {
        let owned: Vec<CString> = ["prog", "--exit-argc"]
            .iter()
            .map(|s| CString::new(*s).unwrap())
            .collect();
        let mut argv: Vec<*mut c_char> = owned
            .iter()
            .map(|c| c.as_ptr().cast_mut())
            .chain(std::iter::once(std::ptr::null_mut()))
            .collect();
        assert_eq!(unsafe { simd_main(2, argv.as_mut_ptr()) }, 2);
        assert_eq!(unsafe { simd_main(1, argv.as_mut_ptr()) }, 0);
        assert_eq!(unsafe { simd_main(0, std::ptr::null_mut()) }, 0);
    }
}
