//! Library file naming strategies.
//!
//! A strategy maps `(base name, tier)` to the path a variant is expected at.
//! Strategies must be pure: the resolver may call them any number of times.

use crate::arch::CapabilityLevel;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Native shared library extension (`.so`, `.dylib` or `.dll`).
pub const LIBRARY_EXTENSION: &str = std::env::consts::DLL_SUFFIX;

/// `<base><TierName><ext>`, e.g. `libfor_loopAVX2.so`.
///
/// The sentinel has an empty tier name, giving `libfor_loop.so`.
#[must_use]
pub fn format_name_suffix(base_name: &str, level: CapabilityLevel) -> String {
    let mut name = String::with_capacity(base_name.len() + 8 + LIBRARY_EXTENSION.len());
    name.push_str(base_name);
    name.push_str(level.name());
    name.push_str(LIBRARY_EXTENSION);
    name
}

/// `<TierName>/<base><ext>`, e.g. `AVX2/libfor_loop.so`.
///
/// The sentinel has no folder: `libfor_loop.so`.
#[must_use]
pub fn format_name_folder(base_name: &str, level: CapabilityLevel) -> String {
    let file = format!("{base_name}{LIBRARY_EXTENSION}");
    if level.is_sentinel() {
        file
    } else {
        format!("{}/{file}", level.name())
    }
}

/// Computes the candidate path for one tier of a library.
///
/// Any per-call context lives in the implementor (struct fields or the state
/// captured by a closure).
pub trait NamingStrategy {
    /// Candidate path, absolute or relative to the resolver's search directory.
    fn candidate(&self, base_name: &str, level: CapabilityLevel) -> PathBuf;
}

impl<F> NamingStrategy for F
where
    F: Fn(&str, CapabilityLevel) -> PathBuf,
{
    fn candidate(&self, base_name: &str, level: CapabilityLevel) -> PathBuf {
        self(base_name, level)
    }
}

/// The two standard on-disk layouts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NamingScheme {
    /// Tier name appended to the base name.
    #[default]
    Suffix,
    /// One folder per tier.
    Folder,
}

impl NamingStrategy for NamingScheme {
    fn candidate(&self, base_name: &str, level: CapabilityLevel) -> PathBuf {
        match self {
            Self::Suffix => format_name_suffix(base_name, level).into(),
            Self::Folder => format_name_folder(base_name, level).into(),
        }
    }
}
