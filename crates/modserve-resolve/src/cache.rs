//! Concurrent cache for bare-specifier resolution results.
//!
//! Keyed by (importing directory, specifier) since the node_modules walk
//! depends on where the import appears. Read-mostly; invalidation is
//! coarse (clear everything) and driven by file-change events under
//! node_modules, which are rare during a dev session.

use std::path::{Path, PathBuf};

use dashmap::DashMap;

use crate::error::Result;
use crate::package::resolve_bare;

/// Shared resolution cache, safe to use across concurrent requests.
#[derive(Debug, Default)]
pub struct ResolutionCache {
    entries: DashMap<(PathBuf, String), PathBuf>,
}

impl ResolutionCache {
    /// Create an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolve a bare specifier, consulting the cache first.
    ///
    /// Successful resolutions are cached; failures are not, so a freshly
    /// installed package is picked up on the next request.
    pub fn resolve(&self, specifier: &str, from_dir: &Path, root: &Path) -> Result<PathBuf> {
        let key = (from_dir.to_path_buf(), specifier.to_string());
        if let Some(hit) = self.entries.get(&key) {
            return Ok(hit.clone());
        }

        let resolved = resolve_bare(specifier, from_dir, root)?;
        self.entries.insert(key, resolved.clone());
        Ok(resolved)
    }

    /// Drop every cached resolution.
    pub fn invalidate_all(&self) {
        self.entries.clear();
    }

    /// Number of cached resolutions.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the cache holds no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
