//! Loader handle: owns the library variant selected for this CPU.
//!
//! # Thread safety
//!
//! Construction briefly changes the process working directory to the
//! library's folder (see [`DispatcherBuilder::change_working_dir`]). Other
//! threads observe that change, so callers must serialize dispatcher
//! construction or disable the directory switch. Lookups on a built
//! dispatcher are safe from any thread.

use crate::arch::CapabilityLevel;
use crate::caps::{CapabilitySource, HostCapabilities};
use crate::config::DispatchConfig;
use crate::error::{Error, Result};
use crate::loader::{self, Module};
use crate::naming::{NamingScheme, NamingStrategy};
use crate::resolver::Resolver;
use crate::workdir::WorkingDirGuard;
use serde::{Deserialize, Serialize};
use std::ffi::{c_void, CString};
use std::path::{Path, PathBuf};

/// What a lookup does when the symbol (or the whole library) is missing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Strictness {
    /// Return `Ok(None)`.
    #[default]
    Lenient,
    /// Return an error.
    Strict,
}

/// Owns zero or one loaded library variant.
///
/// Built from a base name: the resolver picks the most capable variant that
/// exists on disk, and the platform loader opens it. A dispatcher whose
/// resolution or load failed is still valid; it reports `is_loaded() ==
/// false` and explains why through [`last_error`](Self::last_error).
///
/// The module is closed exactly once, when the dispatcher is dropped,
/// replaced, or [`close`](Self::close)d.
///
/// # Example
///
/// ```rust,no_run
/// use archdispatch::Dispatcher;
///
/// let dispatcher = Dispatcher::new("libfor_loop");
/// if !dispatcher.is_loaded() {
///     eprintln!("{}", dispatcher.last_error());
///     return;
/// }
/// type GetResult = unsafe extern "C" fn(*const f32, u64) -> f32;
/// // SAFETY: `get_result` is exported with exactly this signature.
/// if let Ok(Some(get_result)) = unsafe { dispatcher.lookup::<GetResult>("get_result") } {
///     let data = [1.0_f32, 2.0, 3.0];
///     let sum = unsafe { get_result(data.as_ptr(), data.len() as u64) };
///     assert_eq!(sum, 6.0);
/// }
/// ```
#[derive(Debug)]
pub struct Dispatcher {
    base_name: String,
    resolved: Option<PathBuf>,
    level: Option<CapabilityLevel>,
    module: Option<Module>,
    error: Option<Error>,
    strictness: Strictness,
}

impl Dispatcher {
    /// Resolves and loads `base_name` with suffix naming for the host CPU.
    #[must_use]
    pub fn new(base_name: &str) -> Self {
        Self::builder(base_name).build()
    }

    /// Resolves and loads `base_name` with a custom naming strategy.
    #[must_use]
    pub fn with_naming<N>(base_name: &str, naming: &N) -> Self
    where
        N: NamingStrategy,
    {
        Self::builder(base_name).naming(naming).build()
    }

    /// Resolves and loads `base_name` as described by `config`.
    #[must_use]
    pub fn from_config(base_name: &str, config: &DispatchConfig) -> Self {
        let forced = config.capability_override();
        let mut builder = Self::builder(base_name)
            .naming(&config.naming)
            .strictness(config.strictness)
            .search_dir(config.search_dir.as_deref())
            .change_working_dir(config.change_working_dir);
        if let Some(forced) = &forced {
            builder = builder.capabilities(forced);
        }
        builder.build()
    }

    /// Validates `config`, then resolves and loads `base_name` as it describes.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] when [`DispatchConfig::validate`] rejects
    /// `config`. Resolution and load failures are still reported through
    /// the returned dispatcher.
    pub fn try_from_config(base_name: &str, config: &DispatchConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self::from_config(base_name, config))
    }

    /// Starts a builder with suffix naming, host capabilities and lenient lookups.
    #[must_use]
    pub fn builder(base_name: &str) -> DispatcherBuilder<'static> {
        DispatcherBuilder {
            base_name: base_name.to_string(),
            naming: &NamingScheme::Suffix,
            source: &HostCapabilities,
            search_dir: None,
            strictness: Strictness::Lenient,
            change_working_dir: true,
        }
    }

    /// Returns true if a module is currently owned.
    #[inline]
    #[must_use]
    pub fn is_loaded(&self) -> bool {
        self.module.is_some()
    }

    /// Base name this dispatcher was built for.
    #[must_use]
    pub fn base_name(&self) -> &str {
        &self.base_name
    }

    /// Absolute path of the chosen variant, `None` if nothing was found.
    #[must_use]
    pub fn resolved_name(&self) -> Option<&Path> {
        self.resolved.as_deref()
    }

    /// Tier of the chosen variant.
    #[must_use]
    pub fn level(&self) -> Option<CapabilityLevel> {
        self.level
    }

    /// Lookup policy for missing symbols.
    #[must_use]
    pub fn strictness(&self) -> Strictness {
        self.strictness
    }

    /// Changes the lookup policy.
    pub fn set_strictness(&mut self, strictness: Strictness) {
        self.strictness = strictness;
    }

    /// Structured resolution or load error captured at construction.
    #[must_use]
    pub fn error(&self) -> Option<&Error> {
        self.error.as_ref()
    }

    /// Fresh copy of the reason this dispatcher holds no module.
    pub(crate) fn construction_error(&self) -> Error {
        match &self.error {
            Some(Error::Load { path, message }) => Error::Load {
                path: path.clone(),
                message: message.clone(),
            },
            _ if self.resolved.is_none() => Error::Resolution {
                base_name: self.base_name.clone(),
            },
            _ => Error::NotLoaded {
                base_name: self.base_name.clone(),
            },
        }
    }

    /// Human-readable reason for the last failure.
    ///
    /// In order: the captured load error, the "no candidate" message when
    /// resolution failed, the platform loader's latest error, or a generic
    /// fallback.
    #[must_use]
    pub fn last_error(&self) -> String {
        if let Some(err @ Error::Load { .. }) = &self.error {
            return err.to_string();
        }
        if self.resolved.is_none() {
            return Error::Resolution {
                base_name: self.base_name.clone(),
            }
            .to_string();
        }
        loader::last_error().unwrap_or_else(|| "Unknown error occurred".to_string())
    }

    /// Releases the module now. No-op when nothing is loaded.
    pub fn close(&mut self) {
        if let Some(module) = self.module.take() {
            drop(module);
            tracing::debug!(library = %self.base_name, "Closed library");
        }
    }

    /// Looks up `symbol` and reinterprets its address as `F`.
    ///
    /// When the dispatcher is empty or the symbol is absent, returns
    /// `Ok(None)` in lenient mode and an error in strict mode.
    ///
    /// `F` must be pointer-sized (checked at compile time); in practice an
    /// `extern "C" fn(..) -> ..` or `unsafe extern "C" fn(..) -> ..` type.
    ///
    /// # Safety
    ///
    /// `F` must match the exported symbol's real signature and ABI. A
    /// mismatch is undefined behaviour and is not detected. The returned
    /// pointer must not be called after this dispatcher is dropped or closed.
    pub unsafe fn lookup<F: Copy>(&self, symbol: &str) -> Result<Option<F>> {
        self.lookup_with::<F>(symbol, self.strictness)
    }

    /// Strict lookup: a missing library or symbol is an error.
    ///
    /// # Safety
    ///
    /// Same contract as [`lookup`](Self::lookup).
    pub unsafe fn require<F: Copy>(&self, symbol: &str) -> Result<F> {
        self.lookup_with::<F>(symbol, Strictness::Strict)?
            .ok_or_else(|| Error::SymbolNotFound {
                symbol: symbol.to_string(),
                library: self.resolved.clone().unwrap_or_default(),
            })
    }

    unsafe fn lookup_with<F: Copy>(&self, symbol: &str, strictness: Strictness) -> Result<Option<F>> {
        const {
            assert!(
                std::mem::size_of::<F>() == std::mem::size_of::<*mut c_void>(),
                "lookup target must be a function pointer type"
            );
        };

        let Some(module) = &self.module else {
            return match strictness {
                Strictness::Lenient => Ok(None),
                Strictness::Strict => Err(Error::NotLoaded {
                    base_name: self.base_name.clone(),
                }),
            };
        };

        let name = CString::new(symbol)?;
        let Some(addr) = module.symbol(&name) else {
            tracing::debug!(library = %self.base_name, symbol, "Symbol not found");
            return match strictness {
                Strictness::Lenient => Ok(None),
                Strictness::Strict => Err(Error::SymbolNotFound {
                    symbol: symbol.to_string(),
                    library: self.resolved.clone().unwrap_or_default(),
                }),
            };
        };

        let ptr = addr.as_ptr();
        // SAFETY: `transmute_copy` requires `F` to be readable from a pointer.
        // - Condition 1: `F` is pointer-sized (const assertion above).
        // - Condition 2: The caller guarantees `F` is the symbol's real type.
        // Reason: dlsym/GetProcAddress only return untyped addresses.
        Ok(Some(std::mem::transmute_copy::<*mut c_void, F>(&ptr)))
    }
}

/// Configures how a [`Dispatcher`] resolves and opens its library.
pub struct DispatcherBuilder<'a> {
    base_name: String,
    naming: &'a dyn NamingStrategy,
    source: &'a dyn CapabilitySource,
    search_dir: Option<&'a Path>,
    strictness: Strictness,
    change_working_dir: bool,
}

impl<'a> DispatcherBuilder<'a> {
    /// Naming strategy for candidate files.
    #[must_use]
    pub fn naming<'b>(self, naming: &'b dyn NamingStrategy) -> DispatcherBuilder<'b>
    where
        'a: 'b,
    {
        DispatcherBuilder { naming, ..self }
    }

    /// Capability source used instead of the host CPU.
    #[must_use]
    pub fn capabilities<'b>(self, source: &'b dyn CapabilitySource) -> DispatcherBuilder<'b>
    where
        'a: 'b,
    {
        DispatcherBuilder { source, ..self }
    }

    /// Directory relative candidates are resolved against.
    #[must_use]
    pub fn search_dir<'b>(self, dir: Option<&'b Path>) -> DispatcherBuilder<'b>
    where
        'a: 'b,
    {
        DispatcherBuilder {
            search_dir: dir,
            ..self
        }
    }

    /// Lookup policy of the built dispatcher.
    #[must_use]
    pub fn strictness(mut self, strictness: Strictness) -> Self {
        self.strictness = strictness;
        self
    }

    /// Whether to switch into the library's folder while opening it.
    ///
    /// Enabled by default so that sibling libraries the variant depends on
    /// resolve. Disable it when other threads depend on the working directory.
    #[must_use]
    pub fn change_working_dir(mut self, enabled: bool) -> Self {
        self.change_working_dir = enabled;
        self
    }

    /// Resolves and opens the library. Never fails; check `is_loaded()`.
    #[must_use]
    pub fn build(self) -> Dispatcher {
        let mut dispatcher = Dispatcher {
            base_name: self.base_name,
            resolved: None,
            level: None,
            module: None,
            error: None,
            strictness: self.strictness,
        };

        let resolver = Resolver::new(self.source).with_search_dir(self.search_dir);
        let Some((level, path)) = resolver.resolve_level(&dispatcher.base_name, self.naming) else {
            dispatcher.error = Some(Error::Resolution {
                base_name: dispatcher.base_name.clone(),
            });
            return dispatcher;
        };

        match open_module(&path, self.change_working_dir) {
            Ok(module) => {
                tracing::info!(
                    library = %dispatcher.base_name,
                    level = %level,
                    path = %path.display(),
                    "Loaded library variant"
                );
                dispatcher.module = Some(module);
            }
            Err(message) => {
                tracing::warn!(path = %path.display(), error = %message, "Failed to load library");
                dispatcher.error = Some(Error::Load {
                    path: path.clone(),
                    message,
                });
            }
        }
        dispatcher.level = Some(level);
        dispatcher.resolved = Some(path);
        dispatcher
    }
}

/// Opens `path`, from inside its folder when `change_dir` is set.
fn open_module(path: &Path, change_dir: bool) -> std::result::Result<Module, String> {
    let _guard = match path.parent() {
        Some(dir) if change_dir => match WorkingDirGuard::enter(dir) {
            Ok(guard) => Some(guard),
            Err(err) => {
                tracing::warn!(dir = %dir.display(), error = %err, "Could not enter library directory");
                None
            }
        },
        _ => None,
    };
    Module::open(path)
}
