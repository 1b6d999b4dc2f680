//! Tests for library resolution.
//!
//! Resolution only checks file existence, so empty files stand in for
//! library builds here.

use super::arch::{CapabilityLevel, CapabilitySet};
use super::caps::FixedCapabilities;
use super::naming::{format_name_folder, format_name_suffix, NamingScheme};
use super::resolver::Resolver;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

fn touch(dir: &Path, relative: &str) -> PathBuf {
    let path = dir.join(relative);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).expect("create parent");
    }
    std::fs::write(&path, b"").expect("write candidate");
    path
}

fn caps(levels: &[CapabilityLevel]) -> FixedCapabilities {
    FixedCapabilities::from_levels(levels)
}

// ============================================================================
// Not found
// ============================================================================

#[test]
fn test_resolve_returns_none_when_nothing_exists() {
    let dir = TempDir::new().unwrap();
    let source = caps(&[CapabilityLevel::Avx2, CapabilityLevel::Sse2]);
    let resolver = Resolver::new(&source).with_search_dir(Some(dir.path()));

    assert_eq!(resolver.resolve("for_loop", &NamingScheme::Suffix), None);
    assert_eq!(resolver.resolve("for_loop", &NamingScheme::Folder), None);
}

#[test]
fn test_directory_named_like_candidate_is_not_a_library() {
    let dir = TempDir::new().unwrap();
    std::fs::create_dir(dir.path().join(format_name_suffix("for_loop", CapabilityLevel::None)))
        .unwrap();
    let source = caps(&[]);
    let resolver = Resolver::new(&source).with_search_dir(Some(dir.path()));

    assert_eq!(resolver.resolve("for_loop", &NamingScheme::Suffix), None);
}

// ============================================================================
// Priority
// ============================================================================

#[test]
fn test_scenario_a_bare_library_when_no_variants() {
    let dir = TempDir::new().unwrap();
    let bare = touch(dir.path(), &format_name_suffix("for_loop", CapabilityLevel::None));
    let source = caps(&[CapabilityLevel::Avx2, CapabilityLevel::Avx, CapabilityLevel::Sse2]);
    let resolver = Resolver::new(&source).with_search_dir(Some(dir.path()));

    let resolved = resolver.resolve("for_loop", &NamingScheme::Suffix).unwrap();
    assert!(resolved.is_absolute());
    assert_eq!(resolved, bare);
}

#[test]
fn test_scenario_b_avx2_beats_sse2() {
    let dir = TempDir::new().unwrap();
    let avx2 = touch(dir.path(), &format_name_suffix("for_loop", CapabilityLevel::Avx2));
    touch(dir.path(), &format_name_suffix("for_loop", CapabilityLevel::Sse2));
    let source = caps(&[CapabilityLevel::Avx2, CapabilityLevel::Sse2]);
    let resolver = Resolver::new(&source).with_search_dir(Some(dir.path()));

    let (level, path) = resolver.resolve_level("for_loop", &NamingScheme::Suffix).unwrap();
    assert_eq!(level, CapabilityLevel::Avx2);
    assert_eq!(path, avx2);
}

#[test]
fn test_unsupported_tier_file_is_skipped() {
    let dir = TempDir::new().unwrap();
    touch(dir.path(), &format_name_suffix("for_loop", CapabilityLevel::Avx2));
    let sse2 = touch(dir.path(), &format_name_suffix("for_loop", CapabilityLevel::Sse2));
    // CPU without AVX2: the AVX2 build must not be chosen even though it exists.
    let source = caps(&[CapabilityLevel::Sse4_1, CapabilityLevel::Sse2]);
    let resolver = Resolver::new(&source).with_search_dir(Some(dir.path()));

    assert_eq!(resolver.resolve("for_loop", &NamingScheme::Suffix), Some(sse2));
}

#[test]
fn test_lower_tier_used_when_higher_file_missing() {
    let dir = TempDir::new().unwrap();
    let avx = touch(dir.path(), &format_name_suffix("for_loop", CapabilityLevel::Avx));
    touch(dir.path(), &format_name_suffix("for_loop", CapabilityLevel::None));
    let source = caps(&[CapabilityLevel::Avx2, CapabilityLevel::Avx]);
    let resolver = Resolver::new(&source).with_search_dir(Some(dir.path()));

    assert_eq!(resolver.resolve("for_loop", &NamingScheme::Suffix), Some(avx));
}

#[test]
fn test_empty_caps_fall_back_to_sentinel_or_nothing() {
    let dir = TempDir::new().unwrap();
    touch(dir.path(), &format_name_suffix("for_loop", CapabilityLevel::Sse2));
    let source = caps(&[]);
    let resolver = Resolver::new(&source).with_search_dir(Some(dir.path()));
    assert_eq!(resolver.resolve("for_loop", &NamingScheme::Suffix), None);

    let bare = touch(dir.path(), &format_name_suffix("for_loop", CapabilityLevel::None));
    assert_eq!(resolver.resolve("for_loop", &NamingScheme::Suffix), Some(bare));
}

// ============================================================================
// Masking
// ============================================================================

#[test]
fn test_foreign_bits_do_not_change_selection() {
    let dir = TempDir::new().unwrap();
    let sse2 = touch(dir.path(), &format_name_suffix("for_loop", CapabilityLevel::Sse2));
    touch(dir.path(), &format_name_suffix("for_loop", CapabilityLevel::Avx2));

    let plain = FixedCapabilities(CapabilitySet::EMPTY.with(CapabilityLevel::Sse2));
    let noisy = FixedCapabilities(CapabilitySet::from_bits(
        CapabilityLevel::Sse2.bits() | (1 << 30) | (1 << 8) | 1,
    ));

    let a = Resolver::new(&plain)
        .with_search_dir(Some(dir.path()))
        .resolve("for_loop", &NamingScheme::Suffix);
    let b = Resolver::new(&noisy)
        .with_search_dir(Some(dir.path()))
        .resolve("for_loop", &NamingScheme::Suffix);
    assert_eq!(a, Some(sse2));
    assert_eq!(a, b);
}

// ============================================================================
// Folder layout and custom strategies
// ============================================================================

#[test]
fn test_folder_layout() {
    let dir = TempDir::new().unwrap();
    let sse41 = touch(dir.path(), &format_name_folder("libfor_loop", CapabilityLevel::Sse4_1));
    touch(dir.path(), &format_name_folder("libfor_loop", CapabilityLevel::None));
    let source = caps(&[CapabilityLevel::Sse4_1, CapabilityLevel::Sse2]);
    let resolver = Resolver::new(&source).with_search_dir(Some(dir.path()));

    assert_eq!(resolver.resolve("libfor_loop", &NamingScheme::Folder), Some(sse41));
}

#[test]
fn test_closure_strategy_with_absolute_paths() {
    let dir = TempDir::new().unwrap();
    let root = dir.path().to_path_buf();
    let avx = touch(&root, "plugins/codec-avx.bin");
    let strategy = move |base: &str, level: CapabilityLevel| {
        root.join("plugins")
            .join(format!("{base}-{}.bin", level.name().to_ascii_lowercase()))
    };
    let source = caps(&[CapabilityLevel::Avx]);

    // No search dir: the strategy already yields absolute paths.
    assert_eq!(Resolver::new(&source).resolve("codec", &strategy), Some(avx));
}

#[test]
fn test_candidates_follow_registry_order() {
    let dir = TempDir::new().unwrap();
    let source = caps(&[CapabilityLevel::Avx2, CapabilityLevel::Sse2]);
    let resolver = Resolver::new(&source).with_search_dir(Some(dir.path()));

    let levels: Vec<CapabilityLevel> = resolver
        .candidates("x", &NamingScheme::Suffix)
        .into_iter()
        .map(|(level, _)| level)
        .collect();
    assert_eq!(
        levels,
        vec![CapabilityLevel::Avx2, CapabilityLevel::Sse2, CapabilityLevel::None]
    );
}
