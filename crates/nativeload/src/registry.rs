//! Process-wide extraction registry and search-path publication.

use crate::bundle::BundleId;
use crate::error::LoadResult;
use crate::extract::Extractor;
use crate::platform::Platform;
use crate::search_path::SearchPathHost;
use crate::staging::StagingLayout;
use parking_lot::Mutex;
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Tracks which bundles have been extracted and owns mutation of the
/// runtime-visible search path.
///
/// Construct one per process and keep it alive for the process lifetime.
/// Two locks keep the critical sections independent: the extraction lock
/// covers the membership check and the extraction itself (at most one
/// extraction attempt per bundle, process-wide), and the narrower path
/// lock covers only the read-modify-write of the search path plus the
/// cache-invalidation hook.
pub struct LibraryRegistry {
    resources_root: PathBuf,
    staging: StagingLayout,
    platform: Platform,
    host: Arc<dyn SearchPathHost>,
    extracted: Mutex<HashSet<BundleId>>,
    path_lock: Mutex<()>,
}

impl LibraryRegistry {
    /// Registry for one platform, reading archives under `resources_root`,
    /// staging under `staging`, and publishing through `host`.
    #[must_use]
    pub fn new(
        resources_root: PathBuf,
        staging: StagingLayout,
        platform: Platform,
        host: Arc<dyn SearchPathHost>,
    ) -> Self {
        Self {
            resources_root,
            staging,
            platform,
            host,
            extracted: Mutex::new(HashSet::new()),
            path_lock: Mutex::new(()),
        }
    }

    /// The platform this registry extracts for.
    #[must_use]
    pub fn platform(&self) -> &Platform {
        &self.platform
    }

    /// The staging directory bundles are extracted into.
    #[must_use]
    pub fn staging_dir(&self) -> PathBuf {
        self.staging.dir_for(&self.platform)
    }

    /// Extract a bundle (once per process) and publish the staging
    /// directories into the search path.
    ///
    /// A bundle is recorded as extracted only after verification passes, so
    /// a failed attempt can be retried wholesale. Re-invocation for a
    /// recorded bundle skips extraction and re-runs only the idempotent
    /// publish step.
    pub fn extract_and_publish(&self, bundle: &BundleId) -> LoadResult<bool> {
        let staging_dir = self.staging_dir();
        {
            let mut extracted = self.extracted.lock();
            if extracted.contains(bundle) {
                tracing::debug!(bundle = %bundle, "bundle already extracted, skipping");
            } else {
                let extractor = Extractor::new(
                    &self.resources_root,
                    &staging_dir,
                    self.platform.clone(),
                );
                extractor.extract(bundle)?;
                extracted.insert(bundle.clone());
            }
        }
        self.publish(&staging_dir)
    }

    /// Append the staging root and every nested subdirectory to the search
    /// path, then invalidate the host's cache.
    ///
    /// Entries already on the path (compared in canonical form) are not
    /// duplicated; when nothing new is needed, the path is left untouched
    /// and no invalidation happens.
    fn publish(&self, staging_dir: &Path) -> LoadResult<bool> {
        let dirs = collect_dirs(staging_dir)?;

        let _guard = self.path_lock.lock();
        let delimiter = self.host.delimiter();
        let current = self.host.read().unwrap_or_default();
        let existing: Vec<PathBuf> = current
            .split(delimiter)
            .filter(|entry| !entry.is_empty())
            .map(|entry| canonical_form(Path::new(entry)))
            .collect();

        let mut appended: Vec<PathBuf> = Vec::new();
        for dir in dirs {
            let canonical = canonical_form(&dir);
            if !existing.contains(&canonical) && !appended.contains(&canonical) {
                appended.push(canonical);
            }
        }
        if appended.is_empty() {
            tracing::debug!(path = %current, "search path already up to date");
            return Ok(true);
        }

        let mut updated = current;
        for dir in &appended {
            if !updated.is_empty() {
                updated.push(delimiter);
            }
            updated.push_str(&dir.to_string_lossy());
        }
        tracing::info!(path = %updated, "updating native library search path");
        self.host.write(&updated);
        self.host.invalidate_cache();
        Ok(true)
    }
}

/// A directory and its nested subdirectories, depth-first, root first.
fn collect_dirs(root: &Path) -> std::io::Result<Vec<PathBuf>> {
    let mut dirs = Vec::new();
    let mut pending = vec![root.to_path_buf()];
    while let Some(dir) = pending.pop() {
        if !dir.is_dir() {
            continue;
        }
        for entry in fs::read_dir(&dir)? {
            let entry = entry?;
            if entry.file_type()?.is_dir() {
                pending.push(entry.path());
            }
        }
        dirs.push(dir);
    }
    Ok(dirs)
}

/// Canonicalize for duplicate comparison; paths that cannot be resolved
/// (not yet created, dangling symlink) compare by their literal form.
fn canonical_form(path: &Path) -> PathBuf {
    fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf())
}
