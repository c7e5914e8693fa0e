// ─── Failure Signatures ───
// Known crash shapes recognized in the game's output. Each signature is one
// named row of required substrings; a line matches a row when it contains
// all of them, case-insensitively. Matching flags survive the process so
// the supervisor can consult them after exit.

use std::sync::atomic::{AtomicBool, Ordering};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureSignature {
    /// The loader's entry class never made it onto the classpath.
    LoaderClassMissing,
    /// The same launch flag reached the game twice.
    DuplicateLaunchArgument,
}

struct MatcherRow {
    signature: FailureSignature,
    needles: &'static [&'static str],
}

const MATCHERS: &[MatcherRow] = &[
    MatcherRow {
        signature: FailureSignature::LoaderClassMissing,
        needles: &["could not find or load main class", "knotclient"],
    },
    MatcherRow {
        signature: FailureSignature::LoaderClassMissing,
        needles: &[
            "classnotfoundexception",
            "net.fabricmc.loader.impl.launch.knot.knotclient",
        ],
    },
    MatcherRow {
        signature: FailureSignature::DuplicateLaunchArgument,
        needles: &["multipleargumentsforoptionexception", "launchtarget"],
    },
];

/// First signature whose row fully matches the line, if any.
pub fn match_line(line: &str) -> Option<FailureSignature> {
    let lower = line.to_lowercase();
    MATCHERS
        .iter()
        .find(|row| row.needles.iter().all(|needle| lower.contains(needle)))
        .map(|row| row.signature)
}

/// Sticky per-session record of which signatures fired, shared between the
/// output reader tasks and the supervisor.
#[derive(Debug, Default)]
pub struct SignatureFlags {
    loader_class_missing: AtomicBool,
    duplicate_argument: AtomicBool,
}

impl SignatureFlags {
    pub fn scan(&self, line: &str) {
        if let Some(signature) = match_line(line) {
            self.record(signature);
        }
    }

    pub fn record(&self, signature: FailureSignature) {
        match signature {
            FailureSignature::LoaderClassMissing => {
                self.loader_class_missing.store(true, Ordering::Relaxed)
            }
            FailureSignature::DuplicateLaunchArgument => {
                self.duplicate_argument.store(true, Ordering::Relaxed)
            }
        }
    }

    pub fn any(&self) -> bool {
        self.loader_class_missing.load(Ordering::Relaxed)
            || self.duplicate_argument.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_loader_class_matches_both_shapes() {
        assert_eq!(
            match_line("Error: Could not find or load main class net.fabricmc.loader.impl.launch.knot.KnotClient"),
            Some(FailureSignature::LoaderClassMissing)
        );
        assert_eq!(
            match_line("Caused by: java.lang.ClassNotFoundException: net.fabricmc.loader.impl.launch.knot.KnotClient"),
            Some(FailureSignature::LoaderClassMissing)
        );
    }

    #[test]
    fn duplicate_argument_needs_both_needles() {
        assert_eq!(
            match_line("joptsimple.MultipleArgumentsForOptionException: Found multiple arguments for option launchtarget"),
            Some(FailureSignature::DuplicateLaunchArgument)
        );
        assert_eq!(
            match_line("joptsimple.MultipleArgumentsForOptionException: width"),
            None
        );
    }

    #[test]
    fn ordinary_output_does_not_match() {
        assert_eq!(match_line("[main/INFO]: Setting user: Steve"), None);
        assert_eq!(match_line("Could not find or load main class Foo"), None);
    }

    #[test]
    fn flags_are_sticky_across_lines() {
        let flags = SignatureFlags::default();
        assert!(!flags.any());
        flags.scan("[main/INFO]: Preparing level");
        assert!(!flags.any());
        flags.scan("Error: Could not find or load main class KnotClient");
        flags.scan("[main/INFO]: more output");
        assert!(flags.any());
    }
}
