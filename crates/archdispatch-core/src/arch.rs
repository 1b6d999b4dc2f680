//! Architecture registry: the capability tiers a library can be built for.
//!
//! This module provides:
//! - `CapabilityLevel` for a single SIMD tier (plus the `None` sentinel)
//! - `CapabilitySet` for the bit-set reported by a capability source
//! - `REGISTRY`, the fixed priority order used by the resolver
//! - `capability_name()` / `supported_mask()` for naming and masking

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// SIMD capability tier a library variant can be built for.
///
/// Discriminants are single bits so a detected [`CapabilitySet`] can be
/// tested against any tier with a bitwise AND.
///
/// Serializes to the canonical name. Deserialization goes through
/// [`FromStr`], so configuration accepts any casing and `.` for `_`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String")]
#[repr(u32)]
pub enum CapabilityLevel {
    /// No special capability. Always qualifies, always probed last.
    #[serde(rename = "NONE")]
    None = 0,
    /// SSE2.
    #[serde(rename = "SSE2")]
    Sse2 = 1 << 1,
    /// SSE4.1.
    #[serde(rename = "SSE4_1")]
    Sse4_1 = 1 << 4,
    /// AVX.
    #[serde(rename = "AVX")]
    Avx = 1 << 6,
    /// AVX2.
    #[serde(rename = "AVX2")]
    Avx2 = 1 << 7,
}

/// Registered tiers, most capable first. The sentinel is always last.
pub const REGISTRY: [CapabilityLevel; 5] = [
    CapabilityLevel::Avx2,
    CapabilityLevel::Avx,
    CapabilityLevel::Sse4_1,
    CapabilityLevel::Sse2,
    CapabilityLevel::None,
];

impl CapabilityLevel {
    /// Raw bit of this tier (zero for the sentinel).
    #[inline]
    #[must_use]
    pub const fn bits(self) -> u32 {
        self as u32
    }

    /// Returns true for the `None` sentinel.
    #[inline]
    #[must_use]
    pub const fn is_sentinel(self) -> bool {
        self.bits() == 0
    }

    /// Canonical tier name, used verbatim in library file names.
    ///
    /// The sentinel maps to an empty string so that it contributes nothing
    /// to a suffix or folder path.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::None => "",
            Self::Sse2 => "SSE2",
            Self::Sse4_1 => "SSE4_1",
            Self::Avx => "AVX",
            Self::Avx2 => "AVX2",
        }
    }

    /// Whether a CPU reporting `detected` may run a build for this tier.
    ///
    /// The sentinel qualifies unconditionally. `detected` is masked with
    /// [`supported_mask()`] first.
    #[inline]
    #[must_use]
    pub const fn qualifies(self, detected: CapabilitySet) -> bool {
        self.is_sentinel() || detected.masked().0 & self.bits() != 0
    }
}

impl fmt::Display for CapabilityLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_sentinel() {
            f.write_str("NONE")
        } else {
            f.write_str(self.name())
        }
    }
}

/// Error returned when a tier name cannot be parsed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown capability level '{0}'")]
pub struct ParseLevelError(pub String);

impl FromStr for CapabilityLevel {
    type Err = ParseLevelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_uppercase().replace('.', "_");
        match normalized.as_str() {
            "" | "NONE" => Ok(Self::None),
            "SSE2" => Ok(Self::Sse2),
            "SSE4_1" | "SSE41" => Ok(Self::Sse4_1),
            "AVX" => Ok(Self::Avx),
            "AVX2" => Ok(Self::Avx2),
            _ => Err(ParseLevelError(s.to_string())),
        }
    }
}

impl TryFrom<String> for CapabilityLevel {
    type Error = ParseLevelError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// Maps a tier to its canonical name (`""` for the sentinel).
#[inline]
#[must_use]
pub const fn capability_name(level: CapabilityLevel) -> &'static str {
    level.name()
}

/// OR of every registered tier.
#[must_use]
pub const fn supported_mask() -> CapabilitySet {
    let mut out = 0;
    let mut i = 0;
    while i < REGISTRY.len() {
        out |= REGISTRY[i].bits();
        i += 1;
    }
    CapabilitySet(out)
}

/// Highest registered tier contained in `detected`, or the sentinel.
#[must_use]
pub fn best_level(detected: CapabilitySet) -> CapabilityLevel {
    REGISTRY
        .iter()
        .copied()
        .find(|level| !level.is_sentinel() && level.qualifies(detected))
        .unwrap_or(CapabilityLevel::None)
}

/// Bit-set of capability tiers reported for a CPU.
///
/// May carry bits this build does not know about; use [`masked`](Self::masked)
/// before reasoning about tiers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct CapabilitySet(u32);

impl CapabilitySet {
    /// The empty set.
    pub const EMPTY: Self = Self(0);

    /// Wraps raw bits without masking.
    #[inline]
    #[must_use]
    pub const fn from_bits(bits: u32) -> Self {
        Self(bits)
    }

    /// Raw bits.
    #[inline]
    #[must_use]
    pub const fn bits(self) -> u32 {
        self.0
    }

    /// Drops every bit outside [`supported_mask()`].
    #[inline]
    #[must_use]
    pub const fn masked(self) -> Self {
        Self(self.0 & supported_mask().0)
    }

    /// Returns true if the tier's bit is set. The sentinel is always contained.
    #[inline]
    #[must_use]
    pub const fn contains(self, level: CapabilityLevel) -> bool {
        level.is_sentinel() || self.0 & level.bits() != 0
    }

    /// Returns a copy with `level` added.
    #[inline]
    #[must_use]
    pub const fn with(self, level: CapabilityLevel) -> Self {
        Self(self.0 | level.bits())
    }

    /// Returns true if no registered tier is set.
    #[inline]
    #[must_use]
    pub const fn is_empty(self) -> bool {
        self.masked().0 == 0
    }

    /// Registered (non-sentinel) tiers in this set, in priority order.
    pub fn levels(self) -> impl Iterator<Item = CapabilityLevel> {
        REGISTRY
            .into_iter()
            .filter(move |level| !level.is_sentinel() && self.contains(*level))
    }
}

impl FromIterator<CapabilityLevel> for CapabilitySet {
    fn from_iter<I: IntoIterator<Item = CapabilityLevel>>(iter: I) -> Self {
        iter.into_iter().fold(Self::EMPTY, Self::with)
    }
}

impl fmt::Display for CapabilitySet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for level in self.levels() {
            if !first {
                f.write_str("|")?;
            }
            f.write_str(level.name())?;
            first = false;
        }
        if first {
            f.write_str("NONE")?;
        }
        Ok(())
    }
}
