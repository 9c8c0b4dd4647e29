//! Ranked interpreter candidates per platform.
//!
//! The search order is data: a [`CandidatePolicy`] is a list of path templates
//! containing `{home}` and `{script_dir}` placeholders, written with `/` and
//! converted to the platform separator on expansion. Templates without any
//! separator (`python3`) are bare aliases resolved through the search path.
//!
//! ```ignore
//! let policy = CandidatePolicy::for_platform(Platform::Linux);
//! let candidates = policy.build(Platform::Linux, home, script_dir);
//! assert_eq!(candidates.last().unwrap().value, "python");
//! ```

use crate::models::Platform;
use camino::Utf8Path;
use serde::{Deserialize, Serialize};
use std::fmt;

pub const HOME_PLACEHOLDER: &str = "{home}";
pub const SCRIPT_DIR_PLACEHOLDER: &str = "{script_dir}";

/// Per-version installer directory suffixes, newest supported first.
const WINDOWS_VERSIONS: &[&str] = &["313", "312", "311", "310", "39"];

/// Whether a candidate is a concrete file or a name looked up on the search path
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CandidateKind {
    Path,
    Alias,
}

/// One interpreter location to probe
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    pub kind: CandidateKind,
    pub value: String,
}

impl Candidate {
    /// Classify `value`: anything containing a path separator is a path.
    pub fn classify(value: impl Into<String>) -> Self {
        let value = value.into();
        let kind = if value.contains('/') || value.contains('\\') {
            CandidateKind::Path
        } else {
            CandidateKind::Alias
        };
        Self { kind, value }
    }

    pub fn alias(value: impl Into<String>) -> Self {
        Self {
            kind: CandidateKind::Alias,
            value: value.into(),
        }
    }

    pub fn is_path(&self) -> bool {
        self.kind == CandidateKind::Path
    }

    pub fn as_path(&self) -> &Utf8Path {
        Utf8Path::new(&self.value)
    }
}

impl fmt::Display for Candidate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.value)
    }
}

/// Ordered list of candidate templates.
///
/// Loadable from YAML so a user can replace the built-in search order:
///
/// ```yaml
/// templates:
///   - "{home}/miniconda3/envs/stems/bin/python"
///   - python3
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CandidatePolicy {
    pub templates: Vec<String>,
}

impl CandidatePolicy {
    pub fn new(templates: Vec<String>) -> Self {
        Self { templates }
    }

    /// Built-in search order for `platform`.
    pub fn for_platform(platform: Platform) -> Self {
        let mut templates = Vec::new();

        match platform {
            Platform::Windows => {
                for v in WINDOWS_VERSIONS {
                    templates.push(format!(
                        "{HOME_PLACEHOLDER}/AppData/Local/Programs/Python/Python{v}/python.exe"
                    ));
                }
                for v in WINDOWS_VERSIONS {
                    templates.push(format!("C:/Program Files/Python{v}/python.exe"));
                }
                for v in WINDOWS_VERSIONS {
                    templates.push(format!("C:/Program Files (x86)/Python{v}-32/python.exe"));
                }
                templates.push(format!(
                    "{HOME_PLACEHOLDER}/AppData/Local/Microsoft/WindowsApps/python.exe"
                ));
                templates.push(format!("{SCRIPT_DIR_PLACEHOLDER}/../../.venv/Scripts/python.exe"));
                templates.push(format!("{SCRIPT_DIR_PLACEHOLDER}/.venv/Scripts/python.exe"));
                templates.push("python".to_string());
            }
            Platform::MacOs | Platform::Linux => {
                templates.push(format!("{SCRIPT_DIR_PLACEHOLDER}/../../.venv/bin/python"));
                templates.push(format!("{SCRIPT_DIR_PLACEHOLDER}/.venv/bin/python"));
                templates.push(format!("{HOME_PLACEHOLDER}/.stemwerk-venv/bin/python"));
                if platform == Platform::MacOs {
                    templates.push("/opt/homebrew/bin/python3".to_string());
                    templates.push("/usr/local/bin/python3".to_string());
                }
                templates.push("/usr/bin/python3".to_string());
                templates.push("python3".to_string());
                templates.push("python".to_string());
            }
        }

        Self { templates }
    }

    /// Expand the templates into concrete candidates. Pure and order-preserving.
    pub fn build(&self, platform: Platform, home: &Utf8Path, script_dir: &Utf8Path) -> Vec<Candidate> {
        self.templates
            .iter()
            .map(|template| expand(template, platform, home, script_dir))
            .collect()
    }
}

fn trim_trailing_separator(path: &Utf8Path) -> &str {
    let s = path.as_str();
    if s.len() > 1 {
        s.trim_end_matches(['/', '\\'])
    } else {
        s
    }
}

fn expand(template: &str, platform: Platform, home: &Utf8Path, script_dir: &Utf8Path) -> Candidate {
    let candidate = Candidate::classify(template);
    if !candidate.is_path() {
        return candidate;
    }

    let mut value = template
        .replace(HOME_PLACEHOLDER, trim_trailing_separator(home))
        .replace(SCRIPT_DIR_PLACEHOLDER, trim_trailing_separator(script_dir));

    if platform == Platform::Windows {
        value = value.replace('/', "\\");
    }

    Candidate {
        kind: CandidateKind::Path,
        value,
    }
}

/// Candidate list for `platform` using the built-in search order.
pub fn build_candidate_list(platform: Platform, home: &Utf8Path, script_dir: &Utf8Path) -> Vec<Candidate> {
    CandidatePolicy::for_platform(platform).build(platform, home, script_dir)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn values(candidates: &[Candidate]) -> Vec<&str> {
        candidates.iter().map(|c| c.value.as_str()).collect()
    }

    #[test]
    fn test_linux_order() {
        let list = build_candidate_list(
            Platform::Linux,
            Utf8Path::new("/home/ana"),
            Utf8Path::new("/opt/stemwerk/scripts/reaper"),
        );

        assert_eq!(
            values(&list),
            vec![
                "/opt/stemwerk/scripts/reaper/../../.venv/bin/python",
                "/opt/stemwerk/scripts/reaper/.venv/bin/python",
                "/home/ana/.stemwerk-venv/bin/python",
                "/usr/bin/python3",
                "python3",
                "python",
            ]
        );
    }

    #[test]
    fn test_macos_adds_homebrew_before_system() {
        let list = build_candidate_list(
            Platform::MacOs,
            Utf8Path::new("/Users/ana"),
            Utf8Path::new("/Users/ana/STEMwerk/scripts/reaper"),
        );
        let values = values(&list);

        let brew = values.iter().position(|v| *v == "/opt/homebrew/bin/python3").unwrap();
        let local = values.iter().position(|v| *v == "/usr/local/bin/python3").unwrap();
        let system = values.iter().position(|v| *v == "/usr/bin/python3").unwrap();
        let venv = values
            .iter()
            .position(|v| *v == "/Users/ana/.stemwerk-venv/bin/python")
            .unwrap();

        assert!(venv < brew);
        assert!(brew < local);
        assert!(local < system);
    }

    #[test]
    fn test_linux_has_no_homebrew() {
        let list = build_candidate_list(Platform::Linux, Utf8Path::new("/h"), Utf8Path::new("/s"));
        assert!(!list.iter().any(|c| c.value.contains("homebrew")));
    }

    #[test]
    fn test_windows_order() {
        let list = build_candidate_list(
            Platform::Windows,
            Utf8Path::new("C:\\Users\\ana"),
            Utf8Path::new("C:\\STEMwerk\\scripts\\reaper"),
        );
        let values = values(&list);

        assert_eq!(
            values[0],
            "C:\\Users\\ana\\AppData\\Local\\Programs\\Python\\Python313\\python.exe"
        );

        let program_files = values
            .iter()
            .position(|v| v.starts_with("C:\\Program Files\\"))
            .unwrap();
        let program_files_x86 = values
            .iter()
            .position(|v| v.starts_with("C:\\Program Files (x86)\\"))
            .unwrap();
        let store_alias = values
            .iter()
            .position(|v| v.contains("WindowsApps"))
            .unwrap();
        let venv = values
            .iter()
            .position(|v| v.ends_with(".venv\\Scripts\\python.exe"))
            .unwrap();

        assert!(program_files < program_files_x86);
        assert!(program_files_x86 < store_alias);
        assert!(store_alias < venv);
        assert_eq!(values.last(), Some(&"python"));
        assert!(values.iter().all(|v| !v.contains('/')));
    }

    #[test]
    fn test_aliases_are_not_paths() {
        let list = build_candidate_list(Platform::Linux, Utf8Path::new("/h"), Utf8Path::new("/s"));
        let aliases: Vec<&Candidate> = list.iter().filter(|c| !c.is_path()).collect();

        assert_eq!(
            aliases,
            vec![&Candidate::alias("python3"), &Candidate::alias("python")]
        );
    }

    #[test]
    fn test_trailing_separator_in_home() {
        let list = build_candidate_list(Platform::Linux, Utf8Path::new("/home/ana/"), Utf8Path::new("/s"));
        assert!(list.iter().any(|c| c.value == "/home/ana/.stemwerk-venv/bin/python"));
    }

    #[test]
    fn test_custom_policy() {
        let policy = CandidatePolicy::new(vec![
            "{home}/pythons/3.12/bin/python".to_string(),
            "py".to_string(),
        ]);
        let list = policy.build(Platform::Linux, Utf8Path::new("/home/ana"), Utf8Path::new("/s"));

        assert_eq!(
            list,
            vec![
                Candidate::classify("/home/ana/pythons/3.12/bin/python"),
                Candidate::alias("py"),
            ]
        );
    }

    fn any_platform() -> impl Strategy<Value = Platform> {
        prop_oneof![
            Just(Platform::Windows),
            Just(Platform::MacOs),
            Just(Platform::Linux),
        ]
    }

    proptest! {
        #[test]
        fn prop_candidate_list_is_deterministic(
            platform in any_platform(),
            home in "/[a-z]{1,8}(/[a-z]{1,8}){0,3}",
            script_dir in "/[a-z]{1,8}(/[a-z]{1,8}){0,3}",
        ) {
            let first = build_candidate_list(platform, Utf8Path::new(&home), Utf8Path::new(&script_dir));
            let second = build_candidate_list(platform, Utf8Path::new(&home), Utf8Path::new(&script_dir));

            prop_assert_eq!(&first, &second);
            prop_assert_eq!(
                first.last().map(|c| c.value.as_str()),
                Some("python")
            );
            prop_assert!(first.iter().all(|c| !c.value.contains('{')), "candidate value contains an unexpanded brace");
        }
    }
}
