//! Locating the normalized-txid-enabled bitcoind binary.
//!
//! The scenario cannot run against a stock node; the binary comes from a
//! patched build supplied by the operator.

use std::path::{Path, PathBuf};

/// Default cache directory for a locally built binary.
pub fn default_cache_dir() -> PathBuf {
    std::env::temp_dir().join("normtx_cache")
}

/// Expected binary path inside the cache directory.
pub fn binary_path(cache_dir: &Path) -> PathBuf {
    cache_dir.join("normtx-bitcoin").join("bin").join("bitcoind")
}

/// Find the bitcoind binary, checking in order:
/// 1. NORMTX_BITCOIND env var
/// 2. Cache directory
/// 3. System PATH
pub fn find_bitcoind(cache_dir: &Path) -> Option<PathBuf> {
    // 1. Environment variable
    if let Ok(path) = std::env::var("NORMTX_BITCOIND") {
        let p = PathBuf::from(path);
        if p.exists() {
            return Some(p);
        }
    }

    // 2. Cache directory
    let cached = binary_path(cache_dir);
    if cached.exists() {
        return Some(cached);
    }

    // 3. System PATH
    if let Ok(output) = std::process::Command::new("which").arg("bitcoind").output() {
        if output.status.success() {
            let path = String::from_utf8_lossy(&output.stdout).trim().to_string();
            if !path.is_empty() {
                return Some(PathBuf::from(path));
            }
        }
    }

    None
}
