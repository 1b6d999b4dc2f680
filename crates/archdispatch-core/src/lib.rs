//! # archdispatch
//!
//! Pick, at process start, the best pre-built variant of a shared library
//! for the CPU the process is running on, load it, and call into it.
//!
//! A library is shipped as several builds, one per SIMD tier:
//!
//! ```text
//! libfor_loopAVX2.so     # suffix layout      AVX2/libfor_loop.so    # folder layout
//! libfor_loopSSE2.so                          SSE2/libfor_loop.so
//! libfor_loop.so         # generic fallback   libfor_loop.so
//! ```
//!
//! The resolver walks the tiers from most to least capable, skips tiers the
//! CPU lacks, and picks the first file that exists. The generic build is
//! always tried last.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use archdispatch::Dispatcher;
//!
//! let dispatcher = Dispatcher::new("libfor_loop");
//! if !dispatcher.is_loaded() {
//!     eprintln!("cannot load: {}", dispatcher.last_error());
//!     return;
//! }
//! println!("using {:?}", dispatcher.resolved_name());
//!
//! type GetResult = unsafe extern "C" fn(*const f32, u64) -> f32;
//! // SAFETY: the library exports `get_result` with this signature.
//! let get_result = unsafe { dispatcher.require::<GetResult>("get_result") }.unwrap();
//! let data = [1.0_f32, 2.0, 3.0];
//! let sum = unsafe { get_result(data.as_ptr(), 3) };
//! assert_eq!(sum, 6.0);
//! ```

#![warn(missing_docs)]
// Clippy lints configured in workspace Cargo.toml [workspace.lints.clippy]
#![cfg_attr(test, allow(clippy::float_cmp, clippy::cast_precision_loss))]

pub mod arch;
pub mod caps;
pub mod config;
pub mod dispatcher;
pub mod error;
pub mod invoke;
mod loader;
pub mod naming;
pub mod resolver;
#[cfg(test)]
mod resolver_tests;
mod workdir;

pub use arch::{
    best_level, capability_name, supported_mask, CapabilityLevel, CapabilitySet, ParseLevelError,
    REGISTRY,
};
pub use caps::{detect_capabilities, CapabilitySource, FixedCapabilities, HostCapabilities};
pub use config::{ConfigError, DispatchConfig};
pub use dispatcher::{Dispatcher, DispatcherBuilder, Strictness};
pub use error::{Error, Result};
pub use invoke::{run_func, run_main, try_run_func, ForeignFn, MainFn};
pub use naming::{
    format_name_folder, format_name_suffix, NamingScheme, NamingStrategy, LIBRARY_EXTENSION,
};
pub use resolver::{resolve_library, Resolver};
