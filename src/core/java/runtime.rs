// ─── Runtime Selector ───
// Discovers installed Java runtimes, probes their major version and picks
// one compatible with the target game version.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::process::Command;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::core::error::{LauncherError, LauncherResult};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RuntimeDescriptor {
    pub path: PathBuf,
    pub major: u32,
}

/// Compatibility policy keyed off the game version.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JavaRequirement {
    /// Game versions up to 1.16.5.
    Exactly8,
    /// Game versions from 1.18 on.
    AtLeast17,
    /// The 1.17.x band runs on either, preferring modern.
    Prefer17Fallback8,
}

impl JavaRequirement {
    pub fn satisfied_by(self, major: u32) -> bool {
        match self {
            JavaRequirement::Exactly8 => major == 8,
            JavaRequirement::AtLeast17 => major >= 17,
            JavaRequirement::Prefer17Fallback8 => major >= 17 || major == 8,
        }
    }

    pub fn describe(self) -> &'static str {
        match self {
            JavaRequirement::Exactly8 => "Java 8",
            JavaRequirement::AtLeast17 => "Java 17 or newer",
            JavaRequirement::Prefer17Fallback8 => "Java 17 or newer, or Java 8",
        }
    }
}

pub fn requirement_for(minecraft_version: &str) -> JavaRequirement {
    let mut parts = minecraft_version.split('.');
    let minor = parts
        .nth(1)
        .and_then(|p| p.parse::<u32>().ok())
        .unwrap_or(18);

    if minor <= 16 {
        JavaRequirement::Exactly8
    } else if minor == 17 {
        JavaRequirement::Prefer17Fallback8
    } else {
        JavaRequirement::AtLeast17
    }
}

#[derive(Debug, Clone)]
pub struct Selection {
    pub runtime: RuntimeDescriptor,
    /// True when the previously configured runtime was replaced.
    pub switched: bool,
}

/// Pick a runtime for `minecraft_version`. The current runtime is kept when
/// it already satisfies the threshold; otherwise the first matching candidate
/// is substituted (modern candidates first in the 1.17 band).
pub fn select_runtime(
    minecraft_version: &str,
    current: Option<&RuntimeDescriptor>,
    candidates: &[RuntimeDescriptor],
) -> LauncherResult<Selection> {
    let requirement = requirement_for(minecraft_version);

    if let Some(current) = current {
        if requirement.satisfied_by(current.major) {
            return Ok(Selection {
                runtime: current.clone(),
                switched: false,
            });
        }
    }

    let replacement = match requirement {
        JavaRequirement::Exactly8 => candidates.iter().find(|c| c.major == 8),
        JavaRequirement::AtLeast17 => candidates.iter().find(|c| c.major >= 17),
        JavaRequirement::Prefer17Fallback8 => candidates
            .iter()
            .find(|c| c.major >= 17)
            .or_else(|| candidates.iter().find(|c| c.major == 8)),
    };

    match replacement {
        Some(found) => Ok(Selection {
            runtime: found.clone(),
            switched: true,
        }),
        None => Err(LauncherError::RuntimeUnresolved {
            minecraft_version: minecraft_version.to_string(),
            requirement: requirement.describe().to_string(),
        }),
    }
}

// ── Probing ─────────────────────────────────────────────

/// Invoke the runtime's version banner and parse its major. Returns 0
/// ("unknown") on any execution or parse failure.
pub fn major_version_of(path: &Path) -> u32 {
    let Ok(output) = Command::new(path).arg("-version").output() else {
        return 0;
    };
    let banner = format!(
        "{}\n{}",
        String::from_utf8_lossy(&output.stderr),
        String::from_utf8_lossy(&output.stdout)
    );
    parse_java_major(&banner)
}

/// Parse a `java -version` banner. The quoted version string uses either the
/// legacy `1.x` scheme (maps to `x`) or the modern leading-integer scheme.
pub fn parse_java_major(banner: &str) -> u32 {
    let Some(version) = quoted_version(banner) else {
        return 0;
    };
    let mut parts = version.split('.');
    let first: u32 = parts
        .next()
        .and_then(|p| p.split(['_', '-', '+']).next())
        .and_then(|p| p.parse().ok())
        .unwrap_or(0);
    if first == 1 {
        parts
            .next()
            .and_then(|p| p.split(['_', '-', '+']).next())
            .and_then(|p| p.parse().ok())
            .unwrap_or(0)
    } else {
        first
    }
}

fn quoted_version(banner: &str) -> Option<&str> {
    for line in banner.lines() {
        if !line.contains("version") {
            continue;
        }
        let start = line.find('"')?;
        let rest = &line[start + 1..];
        let end = rest.find('"')?;
        return Some(&rest[..end]);
    }
    None
}

// ── Discovery ───────────────────────────────────────────

fn java_exe() -> &'static str {
    if cfg!(windows) {
        "java.exe"
    } else {
        "java"
    }
}

fn vendor_roots() -> Vec<PathBuf> {
    if cfg!(target_os = "windows") {
        vec![
            PathBuf::from(r"C:\Program Files\Java"),
            PathBuf::from(r"C:\Program Files\Eclipse Adoptium"),
            PathBuf::from(r"C:\Program Files\Microsoft"),
            PathBuf::from(r"C:\Program Files\Zulu"),
            PathBuf::from(r"C:\Program Files (x86)\Java"),
        ]
    } else if cfg!(target_os = "macos") {
        vec![PathBuf::from("/Library/Java/JavaVirtualMachines")]
    } else {
        vec![PathBuf::from("/usr/lib/jvm"), PathBuf::from("/opt/java")]
    }
}

fn binary_under(install_root: &Path) -> PathBuf {
    let direct = install_root.join("bin").join(java_exe());
    if direct.exists() {
        return direct;
    }
    // macOS bundle layout.
    install_root
        .join("Contents")
        .join("Home")
        .join("bin")
        .join(java_exe())
}

fn path_lookups() -> Vec<PathBuf> {
    let (tool, args): (&str, &[&str]) = if cfg!(windows) {
        ("where", &["java"])
    } else {
        ("which", &["-a", "java"])
    };
    let Ok(output) = Command::new(tool).args(args).output() else {
        return vec![];
    };
    String::from_utf8_lossy(&output.stdout)
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .map(PathBuf::from)
        .collect()
}

/// Scan known vendor install roots plus the process search path, probing
/// every binary found. Deduplicates by canonical path.
pub fn detect_candidates() -> Vec<RuntimeDescriptor> {
    let mut binaries: Vec<PathBuf> = Vec::new();
    for root in vendor_roots() {
        let Ok(entries) = std::fs::read_dir(&root) else {
            continue;
        };
        for entry in entries.filter_map(Result::ok) {
            let bin = binary_under(&entry.path());
            if bin.exists() {
                binaries.push(bin);
            }
        }
    }
    binaries.extend(path_lookups());

    let mut seen: HashSet<PathBuf> = HashSet::new();
    let mut candidates = Vec::new();
    for bin in binaries {
        let canonical = std::fs::canonicalize(&bin).unwrap_or_else(|_| bin.clone());
        if !seen.insert(canonical.clone()) {
            continue;
        }
        let major = major_version_of(&canonical);
        if major == 0 {
            warn!("Could not determine version of {:?}, ignoring", canonical);
            continue;
        }
        debug!("Detected Java {} at {:?}", major, canonical);
        candidates.push(RuntimeDescriptor {
            path: canonical,
            major,
        });
    }
    candidates
}

#[cfg(test)]
mod tests {
    use super::*;

    fn runtime(major: u32) -> RuntimeDescriptor {
        RuntimeDescriptor {
            path: PathBuf::from(format!("/java{}/bin/java", major)),
            major,
        }
    }

    #[test]
    fn parses_legacy_and_modern_banners() {
        assert_eq!(
            parse_java_major("java version \"1.8.0_281\"\nJava(TM) SE Runtime"),
            8
        );
        assert_eq!(
            parse_java_major("openjdk version \"17.0.2\" 2022-01-18"),
            17
        );
        assert_eq!(parse_java_major("openjdk version \"21\" 2023-09-19"), 21);
        assert_eq!(parse_java_major("not a java banner"), 0);
        assert_eq!(parse_java_major("version \"garbage\""), 0);
    }

    #[test]
    fn thresholds_by_game_version() {
        assert_eq!(requirement_for("1.16.5"), JavaRequirement::Exactly8);
        assert_eq!(requirement_for("1.12.2"), JavaRequirement::Exactly8);
        assert_eq!(requirement_for("1.17.1"), JavaRequirement::Prefer17Fallback8);
        assert_eq!(requirement_for("1.18"), JavaRequirement::AtLeast17);
        assert_eq!(requirement_for("1.20.1"), JavaRequirement::AtLeast17);
    }

    #[test]
    fn old_game_on_modern_runtime_switches_to_eight() {
        let selection =
            select_runtime("1.16.5", Some(&runtime(17)), &[runtime(17), runtime(8)]).unwrap();
        assert_eq!(selection.runtime.major, 8);
        assert!(selection.switched);

        let unresolved = select_runtime("1.16.5", Some(&runtime(17)), &[runtime(17)]);
        assert!(matches!(
            unresolved,
            Err(LauncherError::RuntimeUnresolved { .. })
        ));
    }

    #[test]
    fn modern_game_on_old_runtime_switches_to_seventeen() {
        let selection =
            select_runtime("1.20.1", Some(&runtime(8)), &[runtime(8), runtime(21)]).unwrap();
        assert_eq!(selection.runtime.major, 21);
        assert!(selection.switched);
    }

    #[test]
    fn satisfying_runtime_is_kept() {
        let selection = select_runtime("1.20.1", Some(&runtime(17)), &[runtime(21)]).unwrap();
        assert_eq!(selection.runtime.major, 17);
        assert!(!selection.switched);
    }

    #[test]
    fn midband_prefers_modern_falls_back_to_eight() {
        let preferred = select_runtime("1.17.1", None, &[runtime(8), runtime(17)]).unwrap();
        assert_eq!(preferred.runtime.major, 17);

        let fallback = select_runtime("1.17.1", None, &[runtime(8)]).unwrap();
        assert_eq!(fallback.runtime.major, 8);
    }
}
