use std::fmt;

/// Operating system family the launcher is running on.
///
/// Determined once at startup (see [`Platform::current`] and
/// [`Platform::from_host_os`]) and then passed around as plain data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Platform {
    Windows,
    MacOs,
    Linux,
}

impl Platform {
    /// Platform of the compile target.
    pub fn current() -> Self {
        if cfg!(target_os = "windows") {
            Platform::Windows
        } else if cfg!(target_os = "macos") {
            Platform::MacOs
        } else {
            Platform::Linux
        }
    }

    /// Map a host-reported OS string to a platform.
    ///
    /// Hosts report strings such as `Win32`, `Win64`, `OSX64`, `macOS-arm64`
    /// or `Linux-x86_64`. Anything unrecognised is treated as Linux.
    pub fn from_host_os(host_os: &str) -> Self {
        let os = host_os.trim().to_lowercase();

        if os.starts_with("win") {
            Platform::Windows
        } else if os.starts_with("osx") || os.starts_with("macos") || os.starts_with("darwin") {
            Platform::MacOs
        } else {
            Platform::Linux
        }
    }

    /// Bare interpreter alias returned (unverified) when nothing else works.
    pub fn default_alias(self) -> &'static str {
        match self {
            Platform::Windows => "python",
            Platform::MacOs | Platform::Linux => "python3",
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Platform::Windows => "Windows",
            Platform::MacOs => "macOS",
            Platform::Linux => "Linux",
        };
        f.write_str(name)
    }
}
