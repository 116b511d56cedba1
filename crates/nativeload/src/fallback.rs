//! Platform fallback resolution.
//!
//! Some platforms have no dedicated native bundle but can run another
//! platform's binaries. The fallback map substitutes that platform when the
//! requested one has no bundle: each POSIX-on-Windows runtime falls back to
//! plain Windows at the same architecture. The map is acyclic by
//! construction and at most one hop deep today, but the walk terminates on
//! any acyclic map of bounded depth.

use crate::platform::{OperatingSystem, Platform};

/// The substitute platform tried when `platform` has no bundle, if any.
#[must_use]
pub fn fallback_of(platform: &Platform) -> Option<Platform> {
    match platform.os {
        OperatingSystem::Cygwin | OperatingSystem::Mingw | OperatingSystem::Msys => {
            Some(Platform::new(OperatingSystem::Windows, platform.arch))
        }
        _ => None,
    }
}

/// Iterator over a platform and its chain of substitutes, in trial order.
pub struct FallbackChain {
    next: Option<Platform>,
    hops: usize,
}

/// Upper bound on chain length. The map is one hop deep; anything longer
/// indicates a broken map.
const MAX_HOPS: usize = 8;

impl FallbackChain {
    /// Start a walk at the requested platform.
    #[must_use]
    pub fn starting_at(platform: Platform) -> Self {
        Self {
            next: Some(platform),
            hops: 0,
        }
    }
}

impl Iterator for FallbackChain {
    type Item = Platform;

    fn next(&mut self) -> Option<Platform> {
        let current = self.next.take()?;
        self.hops += 1;
        debug_assert!(self.hops <= MAX_HOPS, "fallback map is not acyclic");
        self.next = fallback_of(&current);
        Some(current)
    }
}
