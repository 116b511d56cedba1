//! Platform detection and identification.
//!
//! Canonicalizes the free-form OS and CPU architecture strings reported by
//! the running environment into a closed set of families. OS resolution
//! always succeeds (unrecognized systems land in [`OperatingSystem::Other`]
//! with a sanitized identifier); architecture resolution deliberately has no
//! catch-all, so callers must handle `None` explicitly.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Supported operating system families.
///
/// The three POSIX-on-Windows runtimes (Cygwin, MinGW, MSYS) are modelled as
/// independent families so dedicated native bundles can be shipped for them;
/// the fallback chain substitutes plain Windows when they have none.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum OperatingSystem {
    Windows,
    Darwin,
    Linux,
    Solaris,
    Cygwin,
    Mingw,
    Msys,
    /// Unrecognized system. Carries the sanitized raw identifier
    /// (lower-cased, non-word characters stripped).
    Other(String),
}

/// Ordered match table. First match wins, so Windows is tested before the
/// POSIX-on-Windows runtimes whose raw names may also mention it.
const OS_PATTERNS: &[(&[&str], OperatingSystem)] = &[
    (&["windows"], OperatingSystem::Windows),
    (&["mac", "darwin"], OperatingSystem::Darwin),
    (&["linux"], OperatingSystem::Linux),
    (&["sunos", "solaris"], OperatingSystem::Solaris),
    (&["cygwin"], OperatingSystem::Cygwin),
    (&["mingw"], OperatingSystem::Mingw),
    (&["msys"], OperatingSystem::Msys),
];

impl OperatingSystem {
    /// Resolve the canonical OS family from a raw identifier.
    ///
    /// Matching is case-insensitive over the whole input and evaluated in
    /// fixed declaration order. Never fails: anything unmatched becomes
    /// [`OperatingSystem::Other`] with a sanitized copy of the input.
    #[must_use]
    pub fn resolve(raw: Option<&str>) -> Self {
        let lowered = raw.unwrap_or("").to_lowercase();
        for (patterns, os) in OS_PATTERNS {
            if patterns.iter().any(|p| lowered.contains(p)) {
                tracing::debug!(os = %os, raw = %lowered, "resolved canonical operating system");
                return os.clone();
            }
        }
        tracing::warn!(raw = %lowered, "unable to determine canonical operating system, using other");
        Self::Other(sanitize_identifier(&lowered))
    }

    /// The string used to reference this OS when naming native bundles.
    #[must_use]
    pub fn native_str(&self) -> &str {
        match self {
            Self::Windows => "windows",
            Self::Darwin => "darwin",
            Self::Linux => "linux",
            Self::Solaris => "solaris",
            Self::Cygwin => "cygwin",
            Self::Mingw => "mingw",
            Self::Msys => "msys",
            Self::Other(native) => native,
        }
    }

    /// All standard families, in resolution order. Excludes `Other`.
    #[must_use]
    pub fn all() -> Vec<OperatingSystem> {
        OS_PATTERNS.iter().map(|(_, os)| os.clone()).collect()
    }
}

impl fmt::Display for OperatingSystem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.native_str())
    }
}

/// Lower-case and strip non-word characters from a raw identifier.
fn sanitize_identifier(raw: &str) -> String {
    raw.to_lowercase()
        .chars()
        .filter(|c| c.is_alphanumeric() || *c == '_')
        .collect()
}

/// Supported CPU architecture families.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Architecture {
    X86,
    X86_64,
    Ia64,
    Ia64_32,
    Ppc,
    Ppc64,
    Sparc,
    Sparcv9,
}

impl Architecture {
    /// Resolve the canonical architecture from a raw identifier.
    ///
    /// Accepts the canonical name or any documented alias, compared exactly
    /// after lower-casing. There is no catch-all: unrecognized input (and
    /// null/empty input) yields `None`.
    #[must_use]
    pub fn resolve(raw: Option<&str>) -> Option<Self> {
        let lowered = raw.unwrap_or("").to_lowercase();
        let found = Self::all().iter().copied().find(|arch| {
            arch.canonical_name() == lowered || arch.aliases().contains(&lowered.as_str())
        });
        match found {
            Some(arch) => {
                tracing::debug!(arch = %arch, raw = %lowered, "resolved canonical architecture");
            }
            None => {
                tracing::warn!(raw = %lowered, "unable to determine canonical architecture");
            }
        }
        found
    }

    /// The canonical name used when naming native bundles.
    #[must_use]
    pub fn canonical_name(&self) -> &'static str {
        match self {
            Self::X86 => "x86",
            Self::X86_64 => "x86_64",
            Self::Ia64 => "ia64",
            Self::Ia64_32 => "ia64_32",
            Self::Ppc => "ppc",
            Self::Ppc64 => "ppc64",
            Self::Sparc => "sparc",
            Self::Sparcv9 => "sparcv9",
        }
    }

    /// A human-readable description of this architecture.
    #[must_use]
    pub fn description(&self) -> &'static str {
        match self {
            Self::X86 => "x86",
            Self::X86_64 => "x86 (64-bit)",
            Self::Ia64 => "Itanium",
            Self::Ia64_32 => "Itanium (32-bit mode)",
            Self::Ppc => "PowerPC",
            Self::Ppc64 => "PowerPC (64-bit)",
            Self::Sparc => "SPARC",
            Self::Sparcv9 => "SPARCv9 (64-bit)",
        }
    }

    /// Accepted alternate names, already lower-cased.
    #[must_use]
    pub fn aliases(&self) -> &'static [&'static str] {
        match self {
            Self::X86 => &["i386", "i486", "i586", "i686", "pentium"],
            Self::X86_64 => &["amd64", "em64t"],
            Self::Ia64 => &["ia64w"],
            Self::Ia64_32 => &["ia64n"],
            Self::Ppc => &["power", "powerpc", "power_pc", "power_rs"],
            Self::Ppc64 | Self::Sparc | Self::Sparcv9 => &[],
        }
    }

    /// All supported architectures.
    #[must_use]
    pub fn all() -> &'static [Architecture] {
        &[
            Self::X86,
            Self::X86_64,
            Self::Ia64,
            Self::Ia64_32,
            Self::Ppc,
            Self::Ppc64,
            Self::Sparc,
            Self::Sparcv9,
        ]
    }
}

impl fmt::Display for Architecture {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.canonical_name())
    }
}

/// A concrete (OS family, architecture) pairing used to select a bundle.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Platform {
    pub os: OperatingSystem,
    pub arch: Architecture,
}

impl Platform {
    /// Create a platform from its two families.
    #[must_use]
    pub fn new(os: OperatingSystem, arch: Architecture) -> Self {
        Self { os, arch }
    }

    /// Detect the current platform at runtime.
    ///
    /// Returns `None` when the host architecture cannot be canonicalized;
    /// the OS side always resolves (possibly to `Other`).
    #[must_use]
    pub fn current() -> Option<Self> {
        let os = OperatingSystem::resolve(Some(std::env::consts::OS));
        let arch = Architecture::resolve(Some(std::env::consts::ARCH))?;
        Some(Self { os, arch })
    }

    /// The suffix appended to a bundle's package name, e.g. `windows-x86_64`.
    #[must_use]
    pub fn archive_suffix(&self) -> String {
        format!("{}-{}", self.os.native_str(), self.arch.canonical_name())
    }

    /// The staging subdirectory for this platform, e.g. `windows/x86_64`.
    #[must_use]
    pub fn staging_subdir(&self) -> String {
        format!("{}/{}", self.os.native_str(), self.arch.canonical_name())
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.archive_suffix())
    }
}
