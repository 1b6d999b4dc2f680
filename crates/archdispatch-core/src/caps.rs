//! Capability sources: where the detected CPU tier set comes from.
//!
//! The resolver only consumes a [`CapabilitySet`]. The host source probes the
//! CPU once per process; fixed sources stand in for forced overrides and tests.

use crate::arch::{CapabilityLevel, CapabilitySet};
use std::sync::OnceLock;

/// Supplies the capability bit-set of the CPU a library will run on.
pub trait CapabilitySource {
    /// Returns the detected set. May contain bits outside the registry.
    fn capabilities(&self) -> CapabilitySet;
}

impl<F> CapabilitySource for F
where
    F: Fn() -> CapabilitySet,
{
    fn capabilities(&self) -> CapabilitySet {
        self()
    }
}

/// Cached host detection - probed once at first use.
static HOST_CAPS: OnceLock<CapabilitySet> = OnceLock::new();

/// Probes the running CPU.
fn detect_host() -> CapabilitySet {
    #[allow(unused_mut)]
    let mut set = CapabilitySet::EMPTY;

    #[cfg(any(target_arch = "x86", target_arch = "x86_64"))]
    {
        if is_x86_feature_detected!("sse2") {
            set = set.with(CapabilityLevel::Sse2);
        }
        if is_x86_feature_detected!("sse4.1") {
            set = set.with(CapabilityLevel::Sse4_1);
        }
        if is_x86_feature_detected!("avx") {
            set = set.with(CapabilityLevel::Avx);
        }
        if is_x86_feature_detected!("avx2") {
            set = set.with(CapabilityLevel::Avx2);
        }
    }

    set
}

/// The CPU this process is running on.
#[derive(Debug, Clone, Copy, Default)]
pub struct HostCapabilities;

impl CapabilitySource for HostCapabilities {
    #[inline]
    fn capabilities(&self) -> CapabilitySet {
        *HOST_CAPS.get_or_init(|| {
            let set = detect_host();
            tracing::debug!(capabilities = %set, "Detected host SIMD capabilities");
            set
        })
    }
}

/// A fixed capability set, independent of the host CPU.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FixedCapabilities(pub CapabilitySet);

impl FixedCapabilities {
    /// Builds a fixed source from a list of tiers.
    #[must_use]
    pub fn from_levels(levels: &[CapabilityLevel]) -> Self {
        Self(levels.iter().copied().collect())
    }
}

impl CapabilitySource for FixedCapabilities {
    #[inline]
    fn capabilities(&self) -> CapabilitySet {
        self.0
    }
}

/// Host capability set, masked to the registered tiers.
#[must_use]
pub fn detect_capabilities() -> CapabilitySet {
    HostCapabilities.capabilities().masked()
}
