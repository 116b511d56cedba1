//! Bundle extraction and verification.
//!
//! The [`Extractor`] streams a packaged archive's entries onto disk under
//! the staging directory; the [`Verifier`] decides whether that work has
//! already happened by comparing SHA-256 digests of the packaged entries
//! against the staged files. Both locate the archive the same way, walking
//! the platform fallback chain until an archive resource exists.

use crate::bundle::BundleId;
use crate::error::{LoadError, LoadResult};
use crate::fallback::FallbackChain;
use crate::platform::{OperatingSystem, Platform};
use sha2::{Digest, Sha256};
use std::fs::{self, File};
use std::io::Read;
use std::path::{Path, PathBuf};
use zip::ZipArchive;

/// Locate the archive resource for a bundle, applying the fallback chain.
///
/// Returns the platform whose archive was found together with the archive
/// path. Fails with [`LoadError::BundleNotFound`] when the chain is
/// exhausted.
pub(crate) fn locate_archive(
    resources_root: &Path,
    bundle: &BundleId,
    requested: &Platform,
) -> LoadResult<(Platform, PathBuf)> {
    for candidate in FallbackChain::starting_at(requested.clone()) {
        let resource = bundle.archive_resource_name(&candidate);
        let path = resources_root.join(resource.trim_start_matches('/'));
        if path.is_file() {
            if candidate != *requested {
                tracing::info!(
                    requested = %requested,
                    fallback = %candidate,
                    "no dedicated bundle, using fallback platform"
                );
            }
            return Ok((candidate, path));
        }
        tracing::debug!(archive = %resource, "no archive resource at candidate platform");
    }
    Err(LoadError::BundleNotFound {
        platform: requested.to_string(),
        archive: bundle.archive_resource_name(requested),
    })
}

/// Hex-encoded SHA-256 of everything readable from `reader`.
fn sha256_reader<R: Read>(reader: &mut R) -> std::io::Result<String> {
    let mut hasher = Sha256::new();
    std::io::copy(reader, &mut hasher)?;
    Ok(hex::encode(hasher.finalize()))
}

/// Hex-encoded SHA-256 of a file's contents.
fn sha256_file(path: &Path) -> std::io::Result<String> {
    let mut file = File::open(path)?;
    sha256_reader(&mut file)
}

/// The staged path for an archive entry, rejecting entries that would
/// escape the staging directory.
fn staged_path(staging_dir: &Path, name: &str, safe: Option<PathBuf>) -> LoadResult<PathBuf> {
    let rel = safe.ok_or_else(|| LoadError::Entry {
        entry: name.to_string(),
        dest: staging_dir.to_path_buf(),
        source: std::io::Error::new(std::io::ErrorKind::InvalidData, "unsafe entry path"),
    })?;
    Ok(staging_dir.join(rel))
}

/// Verifies staged bundle contents against the packaged archive.
#[derive(Debug, Clone)]
pub struct Verifier {
    resources_root: PathBuf,
    staging_dir: PathBuf,
    platform: Platform,
}

impl Verifier {
    /// Verifier for a staging directory and platform, reading archives
    /// under `resources_root`.
    #[must_use]
    pub fn new<P: AsRef<Path>, Q: AsRef<Path>>(
        resources_root: P,
        staging_dir: Q,
        platform: Platform,
    ) -> Self {
        Self {
            resources_root: resources_root.as_ref().to_path_buf(),
            staging_dir: staging_dir.as_ref().to_path_buf(),
            platform,
        }
    }

    /// Check that every packaged entry exists on disk with the correct type
    /// and, for files, a matching content digest.
    ///
    /// A missing file, type mismatch, or digest mismatch returns
    /// `Ok(false)`: verification failure is the designed signal that
    /// extraction must (re-)run, not a fault. Archive-side faults are
    /// errors.
    pub fn verify(&self, bundle: &BundleId) -> LoadResult<bool> {
        let (_, archive_path) = locate_archive(&self.resources_root, bundle, &self.platform)?;
        let mut archive = ZipArchive::new(File::open(&archive_path)?)?;

        for index in 0..archive.len() {
            let mut entry = archive.by_index(index)?;
            let name = entry.name().to_string();
            let staged = staged_path(&self.staging_dir, &name, entry.enclosed_name())?;

            if entry.is_dir() {
                if !staged.is_dir() {
                    tracing::warn!(path = %staged.display(), "staged directory is missing");
                    return Ok(false);
                }
                continue;
            }

            if !staged.is_file() {
                tracing::warn!(path = %staged.display(), "staged file is missing");
                return Ok(false);
            }

            let packaged = sha256_reader(&mut entry)?;
            let extracted = sha256_file(&staged)?;
            tracing::debug!(entry = %name, %packaged, %extracted, "comparing digests");

            if packaged != extracted {
                tracing::warn!(path = %staged.display(), "bad checksum for staged file");
                return Ok(false);
            }
        }
        Ok(true)
    }
}

/// Extracts a packaged bundle into the staging directory.
#[derive(Debug, Clone)]
pub struct Extractor {
    resources_root: PathBuf,
    staging_dir: PathBuf,
    platform: Platform,
}

impl Extractor {
    /// Extractor targeting a staging directory for a platform, reading
    /// archives under `resources_root`.
    #[must_use]
    pub fn new<P: AsRef<Path>, Q: AsRef<Path>>(
        resources_root: P,
        staging_dir: Q,
        platform: Platform,
    ) -> Self {
        Self {
            resources_root: resources_root.as_ref().to_path_buf(),
            staging_dir: staging_dir.as_ref().to_path_buf(),
            platform,
        }
    }

    /// The staging directory this extractor writes into.
    #[must_use]
    pub fn staging_dir(&self) -> &Path {
        &self.staging_dir
    }

    /// Extract the bundle, verified.
    ///
    /// Idempotent: when verification already passes, no archive streaming
    /// happens and the returned list is empty. Otherwise every packaged
    /// entry is streamed to disk, the Darwin dual-extension shim runs, and
    /// the extraction is re-verified. Returns the paths of all files
    /// written by this call.
    pub fn extract(&self, bundle: &BundleId) -> LoadResult<Vec<PathBuf>> {
        fs::create_dir_all(&self.staging_dir).map_err(|source| LoadError::StagingDir {
            path: self.staging_dir.clone(),
            source,
        })?;

        let verifier = Verifier::new(
            &self.resources_root,
            &self.staging_dir,
            self.platform.clone(),
        );
        if verifier.verify(bundle)? {
            tracing::info!(bundle = %bundle, "native libraries already extracted");
            return Ok(Vec::new());
        }

        let (found, archive_path) = locate_archive(&self.resources_root, bundle, &self.platform)?;
        tracing::info!(
            bundle = %bundle,
            archive = %archive_path.display(),
            staging = %self.staging_dir.display(),
            "extracting native libraries"
        );

        let mut archive = ZipArchive::new(File::open(&archive_path)?)?;
        let mut written = Vec::new();

        for index in 0..archive.len() {
            let mut entry = archive.by_index(index)?;
            let name = entry.name().to_string();
            let dest = staged_path(&self.staging_dir, &name, entry.enclosed_name())?;
            tracing::debug!(entry = %name, dest = %dest.display(), "extracting entry");

            let wrap = |source: std::io::Error| LoadError::Entry {
                entry: name.clone(),
                dest: dest.clone(),
                source,
            };

            if entry.is_dir() {
                fs::create_dir_all(&dest).map_err(&wrap)?;
            } else {
                if let Some(parent) = dest.parent() {
                    fs::create_dir_all(parent).map_err(&wrap)?;
                }
                let mut out = File::create(&dest).map_err(&wrap)?;
                std::io::copy(&mut entry, &mut out).map_err(&wrap)?;
                written.push(dest);
            }
        }

        if found.os == OperatingSystem::Darwin {
            let siblings = self.mirror_darwin_extensions(bundle, &written)?;
            written.extend(siblings);
        }

        if !verifier.verify(bundle)? {
            return Err(LoadError::Integrity {
                bundle: bundle.to_string(),
                detail: format!(
                    "native libraries were not properly extracted to {}",
                    self.staging_dir.display()
                ),
            });
        }
        Ok(written)
    }

    /// Darwin compatibility shim.
    ///
    /// Historically macOS native libraries were loaded under two file
    /// extensions, `.dylib` and `.jnilib`. For every extracted file carrying
    /// one of them, duplicate the bytes to the missing sibling name and
    /// confirm the duplicate's digest equals the source's.
    fn mirror_darwin_extensions(
        &self,
        bundle: &BundleId,
        extracted: &[PathBuf],
    ) -> LoadResult<Vec<PathBuf>> {
        let mut siblings = Vec::new();
        for file in extracted {
            let Some(ext) = file.extension().and_then(|e| e.to_str()) else {
                continue;
            };
            let other = match ext {
                "dylib" => "jnilib",
                "jnilib" => "dylib",
                _ => continue,
            };
            let sibling = file.with_extension(other);
            if sibling.exists() {
                continue;
            }

            tracing::debug!(
                source = %file.display(),
                sibling = %sibling.display(),
                "duplicating darwin library extension"
            );
            fs::copy(file, &sibling).map_err(|source| LoadError::Entry {
                entry: file.display().to_string(),
                dest: sibling.clone(),
                source,
            })?;

            if sha256_file(file)? != sha256_file(&sibling)? {
                return Err(LoadError::Integrity {
                    bundle: bundle.to_string(),
                    detail: format!(
                        "duplicated library {} does not match {}",
                        sibling.display(),
                        file.display()
                    ),
                });
            }
            siblings.push(sibling);
        }
        Ok(siblings)
    }
}

#[cfg(test)]
mod tests {
    #![allow(non_snake_case)]
    #![allow(clippy::unwrap_used)]

    use super::*;
    use crate::platform::Architecture;
    use std::io::Write;
    use tempfile::TempDir;
    use zip::ZipWriter;
    use zip::write::SimpleFileOptions;

    fn windows_x64() -> Platform {
        Platform::new(OperatingSystem::Windows, Architecture::X86_64)
    }

    fn write_archive(path: &Path, entries: &[(&str, Option<&[u8]>)]) {
        let file = File::create(path).unwrap();
        let mut zip = ZipWriter::new(file);
        let options = SimpleFileOptions::default();
        for (name, contents) in entries {
            match contents {
                Some(bytes) => {
                    zip.start_file(*name, options).unwrap();
                    zip.write_all(bytes).unwrap();
                }
                None => {
                    zip.add_directory(*name, options).unwrap();
                }
            }
        }
        zip.finish().unwrap();
    }

    fn fixture(
        temp: &TempDir,
        platform: &Platform,
        entries: &[(&str, Option<&[u8]>)],
    ) -> (PathBuf, PathBuf, BundleId) {
        let resources = temp.path().join("resources");
        let staging = temp.path().join("staging");
        fs::create_dir_all(&resources).unwrap();

        let bundle = BundleId::new("", "testlib").unwrap();
        let archive = resources.join(bundle.archive_resource_name(platform));
        write_archive(&archive, entries);

        (resources, staging, bundle)
    }

    #[test]
    fn locate_archive___missing_everywhere___returns_bundle_not_found() {
        let temp = TempDir::new().unwrap();
        let bundle = BundleId::new("/natives", "gdal").unwrap();

        let result = locate_archive(temp.path(), &bundle, &windows_x64());

        assert!(matches!(result, Err(LoadError::BundleNotFound { .. })));
    }

    #[test]
    fn locate_archive___fallback___finds_windows_archive_for_cygwin() {
        let temp = TempDir::new().unwrap();
        let windows = windows_x64();
        let (resources, _, bundle) = fixture(&temp, &windows, &[("a.bin", Some(b"x"))]);
        let cygwin = Platform::new(OperatingSystem::Cygwin, Architecture::X86_64);

        let (found, path) = locate_archive(&resources, &bundle, &cygwin).unwrap();

        assert_eq!(found, windows);
        assert!(path.ends_with("testlib-windows-x86_64.zip"));
    }

    #[test]
    fn Extractor___extract___writes_files_and_directories() {
        let temp = TempDir::new().unwrap();
        let platform = windows_x64();
        let (resources, staging, bundle) = fixture(
            &temp,
            &platform,
            &[
                ("sub/", None),
                ("a.bin", Some(&[1, 2, 3])),
                ("sub/b.bin", Some(&[4, 5])),
            ],
        );

        let extractor = Extractor::new(&resources, &staging, platform);
        let written = extractor.extract(&bundle).unwrap();

        assert_eq!(written.len(), 2);
        assert!(staging.join("sub").is_dir());
        assert_eq!(fs::read(staging.join("a.bin")).unwrap(), vec![1, 2, 3]);
        assert_eq!(fs::read(staging.join("sub/b.bin")).unwrap(), vec![4, 5]);
    }

    #[test]
    fn Extractor___extract___second_call_streams_nothing() {
        let temp = TempDir::new().unwrap();
        let platform = windows_x64();
        let (resources, staging, bundle) =
            fixture(&temp, &platform, &[("a.bin", Some(b"contents"))]);

        let extractor = Extractor::new(&resources, &staging, platform);
        let first = extractor.extract(&bundle).unwrap();
        let second = extractor.extract(&bundle).unwrap();

        assert_eq!(first.len(), 1);
        assert!(second.is_empty());
    }

    #[test]
    fn Extractor___extract___missing_bundle___returns_bundle_not_found() {
        let temp = TempDir::new().unwrap();
        let resources = temp.path().join("resources");
        let staging = temp.path().join("staging");
        fs::create_dir_all(&resources).unwrap();
        let bundle = BundleId::new("", "absent").unwrap();

        let extractor = Extractor::new(&resources, &staging, windows_x64());
        let result = extractor.extract(&bundle);

        assert!(matches!(result, Err(LoadError::BundleNotFound { .. })));
    }

    #[test]
    fn Extractor___extract___cygwin___falls_back_to_windows_bundle() {
        let temp = TempDir::new().unwrap();
        let (resources, staging, bundle) =
            fixture(&temp, &windows_x64(), &[("w.bin", Some(b"windows bytes"))]);
        let cygwin = Platform::new(OperatingSystem::Cygwin, Architecture::X86_64);

        let extractor = Extractor::new(&resources, &staging, cygwin);
        let written = extractor.extract(&bundle).unwrap();

        assert_eq!(written.len(), 1);
        assert_eq!(fs::read(staging.join("w.bin")).unwrap(), b"windows bytes");
    }

    #[test]
    fn Extractor___extract___darwin___creates_sibling_extensions() {
        let temp = TempDir::new().unwrap();
        let darwin = Platform::new(OperatingSystem::Darwin, Architecture::X86_64);
        let (resources, staging, bundle) = fixture(
            &temp,
            &darwin,
            &[
                ("libfoo.dylib", Some(b"foo bytes")),
                ("libbar.jnilib", Some(b"bar bytes")),
                ("readme.txt", Some(b"docs")),
            ],
        );

        let extractor = Extractor::new(&resources, &staging, darwin);
        let written = extractor.extract(&bundle).unwrap();

        // Three archive files plus two duplicated siblings; readme untouched.
        assert_eq!(written.len(), 5);
        assert_eq!(
            fs::read(staging.join("libfoo.jnilib")).unwrap(),
            b"foo bytes"
        );
        assert_eq!(fs::read(staging.join("libbar.dylib")).unwrap(), b"bar bytes");
        assert!(!staging.join("readme.dylib").exists());
    }

    #[test]
    fn Extractor___extract___darwin___existing_sibling_is_left_alone() {
        let temp = TempDir::new().unwrap();
        let darwin = Platform::new(OperatingSystem::Darwin, Architecture::X86);
        let (resources, staging, bundle) = fixture(
            &temp,
            &darwin,
            &[
                ("libfoo.dylib", Some(b"dylib bytes")),
                ("libfoo.jnilib", Some(b"jnilib bytes")),
            ],
        );

        let extractor = Extractor::new(&resources, &staging, darwin);
        let written = extractor.extract(&bundle).unwrap();

        // Both names came from the archive, so the shim duplicates nothing.
        assert_eq!(written.len(), 2);
        assert_eq!(
            fs::read(staging.join("libfoo.jnilib")).unwrap(),
            b"jnilib bytes"
        );
    }

    #[test]
    fn Verifier___verify___false_before_extraction_true_after() {
        let temp = TempDir::new().unwrap();
        let platform = windows_x64();
        let (resources, staging, bundle) = fixture(&temp, &platform, &[("a.bin", Some(b"abc"))]);
        fs::create_dir_all(&staging).unwrap();

        let verifier = Verifier::new(&resources, &staging, platform.clone());
        assert!(!verifier.verify(&bundle).unwrap());

        Extractor::new(&resources, &staging, platform)
            .extract(&bundle)
            .unwrap();
        assert!(verifier.verify(&bundle).unwrap());
    }

    #[test]
    fn Verifier___verify___detects_truncated_file() {
        let temp = TempDir::new().unwrap();
        let platform = windows_x64();
        let (resources, staging, bundle) =
            fixture(&temp, &platform, &[("a.bin", Some(&[1, 2, 3]))]);

        Extractor::new(&resources, &staging, platform.clone())
            .extract(&bundle)
            .unwrap();
        fs::write(staging.join("a.bin"), b"").unwrap();

        let verifier = Verifier::new(&resources, &staging, platform);
        assert!(!verifier.verify(&bundle).unwrap());
    }

    #[test]
    fn Verifier___verify___detects_file_where_directory_expected() {
        let temp = TempDir::new().unwrap();
        let platform = windows_x64();
        let (resources, staging, bundle) =
            fixture(&temp, &platform, &[("sub/", None), ("sub/b.bin", Some(b"x"))]);

        Extractor::new(&resources, &staging, platform.clone())
            .extract(&bundle)
            .unwrap();
        fs::remove_dir_all(staging.join("sub")).unwrap();
        fs::write(staging.join("sub"), b"not a directory").unwrap();

        let verifier = Verifier::new(&resources, &staging, platform);
        assert!(!verifier.verify(&bundle).unwrap());
    }

    #[test]
    fn Verifier___verify___missing_bundle___returns_bundle_not_found() {
        let temp = TempDir::new().unwrap();
        let bundle = BundleId::new("", "absent").unwrap();

        let verifier = Verifier::new(temp.path(), temp.path().join("staging"), windows_x64());
        let result = verifier.verify(&bundle);

        assert!(matches!(result, Err(LoadError::BundleNotFound { .. })));
    }

    #[test]
    fn Extractor___extract___restores_truncated_file() {
        let temp = TempDir::new().unwrap();
        let platform = windows_x64();
        let (resources, staging, bundle) =
            fixture(&temp, &platform, &[("a.bin", Some(&[1, 2, 3]))]);

        let extractor = Extractor::new(&resources, &staging, platform);
        extractor.extract(&bundle).unwrap();
        fs::write(staging.join("a.bin"), b"").unwrap();

        let written = extractor.extract(&bundle).unwrap();

        assert_eq!(written.len(), 1);
        assert_eq!(fs::read(staging.join("a.bin")).unwrap(), vec![1, 2, 3]);
    }
}
