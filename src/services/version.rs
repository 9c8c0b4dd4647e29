//! Interpreter version parsing and compatibility policy.

use regex::Regex;
use std::fmt;
use std::sync::LazyLock;

static VERSION_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d+)\.(\d+)\.(\d+)").expect("Invalid version regex"));

/// Three-part interpreter version
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PythonVersion {
    pub major: u32,
    pub minor: u32,
    pub patch: u32,
}

impl PythonVersion {
    pub fn new(major: u32, minor: u32, patch: u32) -> Self {
        Self {
            major,
            minor,
            patch,
        }
    }

    /// Extract the first `major.minor.patch` substring from probe output.
    ///
    /// ```ignore
    /// let v = PythonVersion::parse("Python 3.14.0").unwrap();
    /// assert_eq!(v.to_string(), "3.14.0");
    /// ```
    pub fn parse(output: &str) -> Option<Self> {
        let caps = VERSION_PATTERN.captures(output)?;

        Some(Self {
            major: caps[1].parse().ok()?,
            minor: caps[2].parse().ok()?,
            patch: caps[3].parse().ok()?,
        })
    }
}

impl fmt::Display for PythonVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

/// Outcome of the compatibility check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Compatibility {
    Supported,
    LikelyIncompatible,
}

/// Which interpreter versions the separation package is expected to work on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompatibilityPolicy {
    /// First Python 3 minor release flagged as likely incompatible.
    pub incompatible_from_minor: u32,
}

impl Default for CompatibilityPolicy {
    fn default() -> Self {
        Self {
            incompatible_from_minor: 14,
        }
    }
}

impl CompatibilityPolicy {
    pub fn new(incompatible_from_minor: u32) -> Self {
        Self {
            incompatible_from_minor,
        }
    }

    pub fn check(&self, version: PythonVersion) -> Compatibility {
        if version.major == 3 && version.minor >= self.incompatible_from_minor {
            Compatibility::LikelyIncompatible
        } else {
            Compatibility::Supported
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_parse_version_info_output() {
        assert_eq!(
            PythonVersion::parse("3.11.2\n"),
            Some(PythonVersion::new(3, 11, 2))
        );
    }

    #[test]
    fn test_parse_sys_version_output() {
        let v = PythonVersion::parse("3.11.7 (main, Dec  4 2023, 18:10:11) [GCC 13.2.0]").unwrap();
        assert_eq!(v.to_string(), "3.11.7");
    }

    #[test]
    fn test_parse_prefixed_output() {
        let v = PythonVersion::parse("Python 3.14.0").unwrap();
        assert_eq!(v, PythonVersion::new(3, 14, 0));
    }

    #[test]
    fn test_parse_without_version() {
        assert_eq!(PythonVersion::parse("Python 3.11"), None);
        assert_eq!(PythonVersion::parse(""), None);
        assert_eq!(PythonVersion::parse("command not found"), None);
    }

    #[test]
    fn test_compatibility_threshold() {
        let policy = CompatibilityPolicy::default();

        assert_eq!(
            policy.check(PythonVersion::new(3, 14, 0)),
            Compatibility::LikelyIncompatible
        );
        assert_eq!(
            policy.check(PythonVersion::new(3, 15, 1)),
            Compatibility::LikelyIncompatible
        );
        assert_eq!(
            policy.check(PythonVersion::new(3, 13, 9)),
            Compatibility::Supported
        );
        assert_eq!(
            policy.check(PythonVersion::new(2, 99, 0)),
            Compatibility::Supported
        );
    }

    #[test]
    fn test_compatibility_threshold_is_configurable() {
        let policy = CompatibilityPolicy::new(15);
        assert_eq!(
            policy.check(PythonVersion::new(3, 14, 0)),
            Compatibility::Supported
        );
    }

    proptest! {
        #[test]
        fn prop_parse_finds_embedded_version(
            prefix in "[a-zA-Z ]{0,12}",
            major in 0u32..100,
            minor in 0u32..100,
            patch in 0u32..100,
        ) {
            let text = format!("{}{}.{}.{} (tail)", prefix, major, minor, patch);
            prop_assert_eq!(
                PythonVersion::parse(&text),
                Some(PythonVersion::new(major, minor, patch))
            );
        }
    }
}
