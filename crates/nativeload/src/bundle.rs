//! Bundle identity and archive naming.

use crate::error::{LoadError, LoadResult};
use crate::platform::Platform;
use crate::ARCHIVE_EXTENSION;
use std::fmt;

/// Identifies a packaged bundle of native libraries by its resource
/// location and base package name.
///
/// Instances are used as keys in the extraction registry, so identity is
/// value equality over both normalized fields.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct BundleId {
    resource_path: String,
    package: String,
}

impl BundleId {
    /// Create a validated bundle identifier.
    ///
    /// The resource path must be empty or start with `/`; it is normalized
    /// to end with `/`. The package name must be non-empty and must not
    /// contain `/`.
    pub fn new(resource_path: &str, package: &str) -> LoadResult<Self> {
        let resource_path = resource_path.trim();
        let package = package.trim();

        if !resource_path.is_empty() && !resource_path.starts_with('/') {
            return Err(LoadError::Validation(
                "resource path must be empty or start with /".to_string(),
            ));
        }
        if package.is_empty() {
            return Err(LoadError::Validation(
                "package name cannot be empty".to_string(),
            ));
        }
        if package.contains('/') {
            return Err(LoadError::Validation(
                "package name cannot contain /".to_string(),
            ));
        }

        let resource_path = if resource_path.is_empty() || resource_path.ends_with('/') {
            resource_path.to_string()
        } else {
            format!("{resource_path}/")
        };

        Ok(Self {
            resource_path,
            package: package.to_string(),
        })
    }

    /// The normalized resource path prefix (empty or `/`-terminated).
    #[must_use]
    pub fn resource_path(&self) -> &str {
        &self.resource_path
    }

    /// The base package name.
    #[must_use]
    pub fn package(&self) -> &str {
        &self.package
    }

    /// The archive resource name for this bundle on a platform:
    /// `{resource_path}{package}-{os}-{arch}.zip`. Pure, no I/O.
    #[must_use]
    pub fn archive_resource_name(&self, platform: &Platform) -> String {
        format!(
            "{}{}-{}.{}",
            self.resource_path,
            self.package,
            platform.archive_suffix(),
            ARCHIVE_EXTENSION
        )
    }
}

impl fmt::Display for BundleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} [{}]", self.package, self.resource_path)
    }
}
