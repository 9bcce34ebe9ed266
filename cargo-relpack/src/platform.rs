use std::fmt;
use std::str::FromStr;

use crate::error::RelpackError;

/// A validated Rust target triple such as `x86_64-unknown-linux-gnu`.
///
/// The platform family is derived once at construction; everything
/// downstream matches on [`PlatformFamily`] instead of searching the string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetTriple {
    triple: String,
    family: PlatformFamily,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlatformFamily {
    Windows,
    Apple,
    Linux,
    Other,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchiveFormat {
    Zip,
    TarXz,
}

impl TargetTriple {
    pub fn as_str(&self) -> &str {
        &self.triple
    }

    pub fn family(&self) -> PlatformFamily {
        self.family
    }

    pub fn archive_format(&self) -> ArchiveFormat {
        self.family.archive_format()
    }

    /// File name cargo gives a binary named `bin` on this target.
    pub fn binary_file_name(&self, bin: &str) -> String {
        format!("{bin}{}", self.family.exe_suffix())
    }
}

impl FromStr for TargetTriple {
    type Err = RelpackError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let triple = s.trim();
        if triple.is_empty() {
            return Err(RelpackError::Usage("target triple is empty".to_string()));
        }
        if triple.chars().any(char::is_whitespace) {
            return Err(RelpackError::Usage(format!(
                "target triple '{triple}' contains whitespace"
            )));
        }

        let segments: Vec<&str> = triple.split('-').collect();
        if segments.len() < 2 || segments.iter().any(|s| s.is_empty()) {
            return Err(RelpackError::Usage(format!(
                "target triple '{triple}' should look like <arch>-<vendor>-<os>[-<abi>]"
            )));
        }

        Ok(Self {
            family: PlatformFamily::from_segments(&segments),
            triple: triple.to_string(),
        })
    }
}

impl fmt::Display for TargetTriple {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.triple)
    }
}

impl PlatformFamily {
    fn from_segments(segments: &[&str]) -> Self {
        // arch is never an OS name, so skip it
        let rest = &segments[1..];
        if rest.iter().any(|s| s.starts_with("windows")) {
            PlatformFamily::Windows
        } else if rest
            .iter()
            .any(|s| matches!(*s, "apple" | "darwin" | "ios" | "tvos" | "watchos" | "visionos"))
        {
            PlatformFamily::Apple
        } else if rest.contains(&"linux") {
            PlatformFamily::Linux
        } else {
            PlatformFamily::Other
        }
    }

    pub fn archive_format(self) -> ArchiveFormat {
        match self {
            PlatformFamily::Windows => ArchiveFormat::Zip,
            PlatformFamily::Apple | PlatformFamily::Linux | PlatformFamily::Other => {
                ArchiveFormat::TarXz
            }
        }
    }

    pub fn exe_suffix(self) -> &'static str {
        match self {
            PlatformFamily::Windows => ".exe",
            _ => "",
        }
    }
}

impl ArchiveFormat {
    pub fn extension(self) -> &'static str {
        match self {
            ArchiveFormat::Zip => "zip",
            ArchiveFormat::TarXz => "tar.xz",
        }
    }
}

impl fmt::Display for ArchiveFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}
