//! Platform-resolved extraction of packaged native library bundles.
//!
//! This crate canonicalizes the host's free-form OS and architecture
//! strings, locates the matching zip bundle of native libraries (walking a
//! fallback chain when no dedicated bundle exists), extracts it exactly
//! once to a deterministic staging directory, verifies every entry against
//! SHA-256 digests of the packaged copy, and publishes the staging
//! directories into the runtime-visible native-library search path. It
//! stops at the search path: actually binding the extracted binaries into
//! the process is the host runtime's job.
//!
//! # Bundle layout
//!
//! Bundles are plain zip archives named after the platform they target:
//!
//! ```text
//! {resource_path}{package}-{os}-{arch}.zip    e.g. /natives/gdal-windows-x86_64.zip
//! ```
//!
//! and are staged under `{root}/{subpath?}/native-libs/{os}/{arch}/...`,
//! mirroring the archive's internal structure.
//!
//! # Example
//!
//! ```no_run
//! use nativeload::{
//!     BundleId, EnvSearchPath, LibraryRegistry, Platform, StagingLayout,
//! };
//! use std::sync::Arc;
//!
//! let platform = Platform::current().expect("unsupported architecture");
//! let registry = LibraryRegistry::new(
//!     "/opt/app/resources".into(),
//!     StagingLayout::default(),
//!     platform,
//!     Arc::new(EnvSearchPath::new("NATIVE_LIBRARY_PATH")),
//! );
//!
//! let bundle = BundleId::new("/natives", "gdal")?;
//! registry.extract_and_publish(&bundle)?;
//! # Ok::<(), nativeload::LoadError>(())
//! ```

mod bundle;
mod error;
mod fallback;
mod platform;
mod staging;

pub mod extract;
pub mod registry;
pub mod search_path;

pub use bundle::BundleId;
pub use error::{LoadError, LoadResult};
pub use extract::{Extractor, Verifier};
pub use fallback::{FallbackChain, fallback_of};
pub use platform::{Architecture, OperatingSystem, Platform};
pub use registry::LibraryRegistry;
pub use search_path::{EnvSearchPath, MemorySearchPath, SearchPathHost};
pub use staging::StagingLayout;

/// Archive file extension for native bundles.
pub const ARCHIVE_EXTENSION: &str = "zip";

/// Directory component separating staged bundles from the staging root.
pub const NATIVE_LIBS_DIR: &str = "native-libs";
