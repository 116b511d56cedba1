//! Runtime-visible native-library search path.
//!
//! The host runtime resolves native binaries by name against a single
//! delimiter-separated path string. How that string is stored, and whether
//! the runtime keeps a parsed cache of it that must be invalidated after a
//! mutation, is the host's business; the registry talks to it through
//! [`SearchPathHost`].

use parking_lot::Mutex;

/// Access to the host runtime's native-library search path.
///
/// `invalidate_cache` must force the runtime to forget any previously
/// parsed copy of the path so newly appended directories take effect on
/// the next lookup. Hosts without such a cache implement it as a no-op.
pub trait SearchPathHost: Send + Sync {
    /// Read the current search path, `None` when unset.
    fn read(&self) -> Option<String>;

    /// Replace the search path.
    fn write(&self, value: &str);

    /// The delimiter separating path entries.
    fn delimiter(&self) -> char;

    /// Drop any cached, parsed copy of the path.
    fn invalidate_cache(&self);
}

/// Search path stored in a process environment variable.
///
/// The environment keeps no parsed cache, so invalidation is a no-op. Uses
/// the platform path-list delimiter.
#[derive(Debug)]
pub struct EnvSearchPath {
    var: String,
}

impl EnvSearchPath {
    /// Host backed by the named environment variable.
    #[must_use]
    pub fn new(var: &str) -> Self {
        Self {
            var: var.to_string(),
        }
    }
}

/// Platform path-list delimiter (`:` on Unix, `;` on Windows).
#[cfg(windows)]
const PATH_DELIMITER: char = ';';
#[cfg(not(windows))]
const PATH_DELIMITER: char = ':';

impl SearchPathHost for EnvSearchPath {
    fn read(&self) -> Option<String> {
        std::env::var(&self.var).ok()
    }

    fn write(&self, value: &str) {
        // SAFETY: single mutation of a process-owned variable; callers
        // serialize writes through the registry's path lock.
        unsafe { std::env::set_var(&self.var, value) };
    }

    fn delimiter(&self) -> char {
        PATH_DELIMITER
    }

    fn invalidate_cache(&self) {}
}

/// In-process search path with an invalidation counter.
///
/// Primarily a test double, but embedders whose runtime keeps the path in
/// ordinary shared state can use it directly.
#[derive(Debug, Default)]
pub struct MemorySearchPath {
    state: Mutex<MemoryState>,
}

#[derive(Debug, Default)]
struct MemoryState {
    value: Option<String>,
    invalidations: u64,
}

impl MemorySearchPath {
    /// Empty search path.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Search path seeded with an initial value.
    #[must_use]
    pub fn with_value(value: &str) -> Self {
        Self {
            state: Mutex::new(MemoryState {
                value: Some(value.to_string()),
                invalidations: 0,
            }),
        }
    }

    /// How many times the cache has been invalidated.
    #[must_use]
    pub fn invalidations(&self) -> u64 {
        self.state.lock().invalidations
    }
}

impl SearchPathHost for MemorySearchPath {
    fn read(&self) -> Option<String> {
        self.state.lock().value.clone()
    }

    fn write(&self, value: &str) {
        self.state.lock().value = Some(value.to_string());
    }

    fn delimiter(&self) -> char {
        PATH_DELIMITER
    }

    fn invalidate_cache(&self) {
        self.state.lock().invalidations += 1;
    }
}
