//! One-shot invocation: open, call one symbol, close.
//!
//! Every helper builds a temporary [`Dispatcher`] and drops it before
//! returning, so nothing stays loaded between calls.
//!
//! # Example
//!
//! ```rust,no_run
//! use archdispatch::invoke::run_func;
//! use archdispatch::NamingScheme;
//!
//! type GetResult = unsafe extern "C" fn(*const f32, u64) -> f32;
//! let data: Vec<f32> = (0..256).map(|i| i as f32).collect();
//! // SAFETY: `get_result` is exported with exactly this signature.
//! let (sum, err) = unsafe {
//!     run_func::<GetResult, _>(
//!         "libfor_loop",
//!         "get_result",
//!         &NamingScheme::Suffix,
//!         (data.as_ptr(), data.len() as u64),
//!     )
//! };
//! assert!(err.is_empty(), "{err}");
//! assert_eq!(sum, 32640.0);
//! ```

use crate::config::DispatchConfig;
use crate::dispatcher::Dispatcher;
use crate::error::{Error, Result};
use crate::loader;
use crate::naming::NamingStrategy;
use std::ffi::{c_char, c_int, CString};

/// A foreign function pointer callable with the argument tuple `Args`.
///
/// Implemented for `extern "C" fn` and `unsafe extern "C" fn` pointers with
/// up to six arguments.
pub trait ForeignFn<Args>: Copy {
    /// Return type of the function.
    type Output;

    /// Calls the function with the unpacked argument tuple.
    ///
    /// # Safety
    ///
    /// The pointer must refer to a live function with exactly this signature.
    unsafe fn call(self, args: Args) -> Self::Output;
}

macro_rules! impl_foreign_fn {
    ($($arg:ident),*) => {
        impl<R, $($arg),*> ForeignFn<($($arg,)*)> for unsafe extern "C" fn($($arg),*) -> R {
            type Output = R;

            #[allow(non_snake_case)]
            #[inline]
            unsafe fn call(self, ($($arg,)*): ($($arg,)*)) -> R {
                (self)($($arg),*)
            }
        }

        impl<R, $($arg),*> ForeignFn<($($arg,)*)> for extern "C" fn($($arg),*) -> R {
            type Output = R;

            #[allow(non_snake_case)]
            #[inline]
            unsafe fn call(self, ($($arg,)*): ($($arg,)*)) -> R {
                (self)($($arg),*)
            }
        }
    };
}

impl_foreign_fn!();
impl_foreign_fn!(A);
impl_foreign_fn!(A, B);
impl_foreign_fn!(A, B, C);
impl_foreign_fn!(A, B, C, D);
impl_foreign_fn!(A, B, C, D, E);
impl_foreign_fn!(A, B, C, D, E, F);

/// Signature of a redispatched `main`.
pub type MainFn = unsafe extern "C" fn(c_int, *mut *mut c_char) -> c_int;

unsafe fn call_strict<F, Args>(dispatcher: &Dispatcher, symbol: &str, args: Args) -> Result<F::Output>
where
    F: ForeignFn<Args>,
{
    if !dispatcher.is_loaded() {
        return Err(dispatcher.construction_error());
    }
    let func = dispatcher.require::<F>(symbol)?;
    Ok(func.call(args))
}

/// Loads `base_name`, calls `symbol` with `args`, unloads.
///
/// Returns `(result, "")` on success. If the library cannot be loaded or
/// the symbol is missing, returns `(Output::default(), reason)`; for a
/// missing symbol the reason ends with the platform loader's own message.
///
/// # Safety
///
/// `F` must be the exported symbol's real signature and `args` must satisfy
/// the callee's own preconditions.
pub unsafe fn run_func<F, Args>(
    base_name: &str,
    symbol: &str,
    naming: &dyn NamingStrategy,
    args: Args,
) -> (F::Output, String)
where
    F: ForeignFn<Args>,
    F::Output: Default,
{
    let dispatcher = Dispatcher::builder(base_name).naming(naming).build();
    finish_lenient::<F, Args>(&dispatcher, symbol, args)
}

/// [`run_func`] with naming, search directory and capabilities from `config`.
///
/// An invalid `config` is reported as the failure reason.
///
/// # Safety
///
/// Same contract as [`run_func`].
pub unsafe fn run_func_with_config<F, Args>(
    base_name: &str,
    symbol: &str,
    config: &DispatchConfig,
    args: Args,
) -> (F::Output, String)
where
    F: ForeignFn<Args>,
    F::Output: Default,
{
    match Dispatcher::try_from_config(base_name, config) {
        Ok(dispatcher) => finish_lenient::<F, Args>(&dispatcher, symbol, args),
        Err(err) => (F::Output::default(), err.to_string()),
    }
}

unsafe fn finish_lenient<F, Args>(
    dispatcher: &Dispatcher,
    symbol: &str,
    args: Args,
) -> (F::Output, String)
where
    F: ForeignFn<Args>,
    F::Output: Default,
{
    match call_strict::<F, Args>(dispatcher, symbol, args) {
        Ok(out) => (out, String::new()),
        Err(err @ Error::SymbolNotFound { .. }) => {
            let reason = match loader::last_error() {
                Some(detail) => format!("{err}: {detail}"),
                None => err.to_string(),
            };
            (F::Output::default(), reason)
        }
        Err(err) => (F::Output::default(), err.to_string()),
    }
}

/// Loads `base_name`, calls `symbol` with `args`, unloads; failures are errors.
///
/// Use this when `F::Output` has no meaningful default value.
///
/// # Safety
///
/// Same contract as [`run_func`].
pub unsafe fn try_run_func<F, Args>(
    base_name: &str,
    symbol: &str,
    naming: &dyn NamingStrategy,
    args: Args,
) -> Result<F::Output>
where
    F: ForeignFn<Args>,
{
    let dispatcher = Dispatcher::builder(base_name).naming(naming).build();
    call_strict::<F, Args>(&dispatcher, symbol, args)
}

/// [`try_run_func`] configured from `config`.
///
/// # Safety
///
/// Same contract as [`run_func`].
pub unsafe fn try_run_func_with_config<F, Args>(
    base_name: &str,
    symbol: &str,
    config: &DispatchConfig,
    args: Args,
) -> Result<F::Output>
where
    F: ForeignFn<Args>,
{
    let dispatcher = Dispatcher::try_from_config(base_name, config)?;
    call_strict::<F, Args>(&dispatcher, symbol, args)
}

/// Owned, NUL-terminated `argv` for a C `main`.
struct CArgs {
    _owned: Vec<CString>,
    ptrs: Vec<*mut c_char>,
}

impl CArgs {
    fn new<S: AsRef<str>>(args: &[S]) -> Result<Self> {
        let owned = args
            .iter()
            .map(|a| CString::new(a.as_ref()))
            .collect::<std::result::Result<Vec<_>, _>>()?;
        let ptrs = owned
            .iter()
            .map(|c| c.as_ptr().cast_mut())
            .chain(std::iter::once(std::ptr::null_mut()))
            .collect();
        Ok(Self {
            _owned: owned,
            ptrs,
        })
    }
}

/// Redispatches a whole `main`: calls `symbol` as `int(int, char**)`.
///
/// `args` becomes `argv` (conventionally starting with the program name).
/// Returns `(exit_code, "")` on success or `(0, reason)` on failure.
///
/// # Safety
///
/// `symbol` must be exported with the [`MainFn`] signature.
pub unsafe fn run_main<S: AsRef<str>>(
    base_name: &str,
    symbol: &str,
    naming: &dyn NamingStrategy,
    args: &[S],
) -> (i32, String) {
    let mut argv = match CArgs::new(args) {
        Ok(argv) => argv,
        Err(err) => return (0, err.to_string()),
    };
    let Ok(argc) = c_int::try_from(args.len()) else {
        return (0, format!("too many arguments: {}", args.len()));
    };
    run_func::<MainFn, _>(base_name, symbol, naming, (argc, argv.ptrs.as_mut_ptr()))
}

/// [`run_main`] configured from `config`.
///
/// # Safety
///
/// Same contract as [`run_main`].
pub unsafe fn run_main_with_config<S: AsRef<str>>(
    base_name: &str,
    symbol: &str,
    config: &DispatchConfig,
    args: &[S],
) -> (i32, String) {
    let mut argv = match CArgs::new(args) {
        Ok(argv) => argv,
        Err(err) => return (0, err.to_string()),
    };
    let Ok(argc) = c_int::try_from(args.len()) else {
        return (0, format!("too many arguments: {}", args.len()));
    };
    run_func_with_config::<MainFn, _>(base_name, symbol, config, (argc, argv.ptrs.as_mut_ptr()))
}
