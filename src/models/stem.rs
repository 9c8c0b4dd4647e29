use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Stem files the helper writes into its output directory.
pub const VOCALS_FILE: &str = "vocals.wav";
pub const DRUMS_FILE: &str = "drums.wav";
pub const BASS_FILE: &str = "bass.wav";
pub const OTHER_FILE: &str = "other.wav";

/// Which stems the user asked for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stem {
    Vocals,
    Drums,
    Bass,
    All,
}

#[derive(Error, Debug, PartialEq, Eq)]
#[error("Unknown stem selection '{0}' (expected vocals, drums, bass or all)")]
pub struct UnknownStem(pub String);

impl Stem {
    pub fn as_str(self) -> &'static str {
        match self {
            Stem::Vocals => "vocals",
            Stem::Drums => "drums",
            Stem::Bass => "bass",
            Stem::All => "all",
        }
    }

    /// Files that must exist after a successful separation.
    pub fn expected_outputs(self) -> &'static [&'static str] {
        match self {
            Stem::Vocals => &[VOCALS_FILE],
            Stem::Drums => &[DRUMS_FILE],
            Stem::Bass => &[BASS_FILE],
            Stem::All => &[VOCALS_FILE, DRUMS_FILE, BASS_FILE, OTHER_FILE],
        }
    }
}

impl FromStr for Stem {
    type Err = UnknownStem;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "vocals" | "vocal" => Ok(Stem::Vocals),
            "drums" | "drum" => Ok(Stem::Drums),
            "bass" => Ok(Stem::Bass),
            "all" => Ok(Stem::All),
            _ => Err(UnknownStem(s.to_string())),
        }
    }
}

impl fmt::Display for Stem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
