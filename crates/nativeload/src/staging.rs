//! Staging directory layout.

use crate::platform::Platform;
use crate::NATIVE_LIBS_DIR;
use std::path::{Path, PathBuf};

/// Deterministic on-disk layout for extracted bundles:
/// `{root}/{subpath?}/native-libs/{os}/{arch}`.
///
/// The directory itself is created lazily on the first extraction attempt.
#[derive(Debug, Clone)]
pub struct StagingLayout {
    root: PathBuf,
    subpath: Option<PathBuf>,
}

impl StagingLayout {
    /// Layout rooted at a configured directory.
    #[must_use]
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
            subpath: None,
        }
    }

    /// Insert a caller-supplied subpath between the root and the
    /// platform-specific directories.
    #[must_use]
    pub fn with_subpath<P: AsRef<Path>>(mut self, subpath: P) -> Self {
        self.subpath = Some(subpath.as_ref().to_path_buf());
        self
    }

    /// The staging directory for a platform.
    #[must_use]
    pub fn dir_for(&self, platform: &Platform) -> PathBuf {
        let mut dir = self.root.clone();
        if let Some(subpath) = &self.subpath {
            dir.push(subpath);
        }
        dir.push(NATIVE_LIBS_DIR);
        dir.push(platform.os.native_str());
        dir.push(platform.arch.canonical_name());
        dir
    }
}

impl Default for StagingLayout {
    /// Layout rooted at the system temporary directory.
    fn default() -> Self {
        Self::new(std::env::temp_dir())
    }
}

#[cfg(test)]
mod tests {
    #![allow(non_snake_case)]

    use super::*;
    use crate::platform::{Architecture, OperatingSystem};

    #[test]
    fn StagingLayout___dir_for___nests_os_and_arch_under_root() {
        let layout = StagingLayout::new("/var/cache/app");
        let platform = Platform::new(OperatingSystem::Linux, Architecture::X86_64);

        assert_eq!(
            layout.dir_for(&platform),
            PathBuf::from("/var/cache/app/native-libs/linux/x86_64")
        );
    }

    #[test]
    fn StagingLayout___dir_for___includes_optional_subpath() {
        let layout = StagingLayout::new("/tmp").with_subpath("myapp/v2");
        let platform = Platform::new(OperatingSystem::Darwin, Architecture::X86);

        assert_eq!(
            layout.dir_for(&platform),
            PathBuf::from("/tmp/myapp/v2/native-libs/darwin/x86")
        );
    }

    #[test]
    fn StagingLayout___default___roots_at_temp_dir() {
        let layout = StagingLayout::default();
        let platform = Platform::new(OperatingSystem::Windows, Architecture::X86);
        let dir = layout.dir_for(&platform);

        assert!(dir.starts_with(std::env::temp_dir()));
        assert!(dir.ends_with("native-libs/windows/x86"));
    }
}
