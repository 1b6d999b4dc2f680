//! Library resolution: pick the most capable variant present on disk.
//!
//! The registry order is the only source of priority. A lower tier is chosen
//! only when no higher qualifying tier has a file, never because its file
//! happens to be found first.

use crate::arch::{CapabilityLevel, REGISTRY};
use crate::caps::{CapabilitySource, HostCapabilities};
use crate::naming::NamingStrategy;
use std::path::{Path, PathBuf};

/// Searches the registry for the best existing library variant.
#[derive(Clone, Copy)]
pub struct Resolver<'a> {
    source: &'a dyn CapabilitySource,
    search_dir: Option<&'a Path>,
}

impl std::fmt::Debug for Resolver<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Resolver")
            .field("capabilities", &self.source.capabilities())
            .field("search_dir", &self.search_dir)
            .finish()
    }
}

impl Default for Resolver<'static> {
    fn default() -> Self {
        Self::new(&HostCapabilities)
    }
}

impl<'a> Resolver<'a> {
    /// Resolver over the given capability source, relative to the working directory.
    #[must_use]
    pub fn new(source: &'a dyn CapabilitySource) -> Self {
        Self {
            source,
            search_dir: None,
        }
    }

    /// Resolves relative candidates against `dir` instead of the working directory.
    #[must_use]
    pub fn with_search_dir(mut self, dir: Option<&'a Path>) -> Self {
        self.search_dir = dir;
        self
    }

    /// Makes a candidate absolute.
    fn absolute(&self, candidate: &Path) -> PathBuf {
        let joined = match self.search_dir {
            Some(dir) if candidate.is_relative() => dir.join(candidate),
            _ => candidate.to_path_buf(),
        };
        std::path::absolute(&joined).unwrap_or(joined)
    }

    /// Every `(tier, absolute path)` pair the search would probe, in order.
    pub fn candidates<N>(&self, base_name: &str, naming: &N) -> Vec<(CapabilityLevel, PathBuf)>
    where
        N: NamingStrategy + ?Sized,
    {
        let detected = self.source.capabilities().masked();
        REGISTRY
            .iter()
            .copied()
            .filter(|level| level.qualifies(detected))
            .map(|level| (level, self.absolute(&naming.candidate(base_name, level))))
            .collect()
    }

    /// Returns the first qualifying candidate that exists, with its tier.
    pub fn resolve_level<N>(&self, base_name: &str, naming: &N) -> Option<(CapabilityLevel, PathBuf)>
    where
        N: NamingStrategy + ?Sized,
    {
        let detected = self.source.capabilities().masked();
        for level in REGISTRY {
            if !level.qualifies(detected) {
                continue;
            }
            let path = self.absolute(&naming.candidate(base_name, level));
            if path.is_file() {
                tracing::debug!(
                    library = base_name,
                    level = %level,
                    path = %path.display(),
                    "Resolved library variant"
                );
                return Some((level, path));
            }
            tracing::trace!(level = %level, path = %path.display(), "Candidate not found");
        }

        tracing::debug!(
            library = base_name,
            capabilities = %detected,
            "No library variant found"
        );
        None
    }

    /// Absolute path of the best existing variant, or `None`.
    pub fn resolve<N>(&self, base_name: &str, naming: &N) -> Option<PathBuf>
    where
        N: NamingStrategy + ?Sized,
    {
        self.resolve_level(base_name, naming).map(|(_, path)| path)
    }
}

/// Resolves `base_name` for the host CPU, relative to the working directory.
pub fn resolve_library<N>(base_name: &str, naming: &N) -> Option<PathBuf>
where
    N: NamingStrategy + ?Sized,
{
    Resolver::default().resolve(base_name, naming)
}
