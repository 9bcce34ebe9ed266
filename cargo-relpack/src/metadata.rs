use cargo_manifest::{Manifest, MaybeInherited};
use semver::Version;
use std::ffi::OsString;
use std::fs;
use std::path::Path;
use std::process::Command;

use crate::error::{RelpackError, Result};
use crate::platform::TargetTriple;

/// Naming inputs read from the package manifest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageMetadata {
    pub product: String,
    pub version: Version,
    pub bins: Vec<String>,
}

fn metadata_error(manifest_path: &Path, reason: impl Into<String>) -> RelpackError {
    RelpackError::Metadata {
        manifest: manifest_path.display().to_string(),
        reason: reason.into(),
    }
}

impl PackageMetadata {
    /// Resolve product name, version and binaries for `manifest_path`.
    ///
    /// `product` and `bins` override what the manifest says when given.
    pub fn resolve(manifest_path: &Path, product: Option<&str>, bins: &[String]) -> Result<Self> {
        let contents = fs::read_to_string(manifest_path)
            .map_err(|e| metadata_error(manifest_path, format!("cannot read manifest: {e}")))?;

        let manifest = match Manifest::from_path(manifest_path) {
            Ok(manifest) => Some(manifest),
            Err(e) => {
                tracing::warn!(
                    "Could not parse {} as a Cargo manifest ({}), scanning for a version line",
                    manifest_path.display(),
                    e
                );
                None
            }
        };

        let version_text = manifest
            .as_ref()
            .and_then(|m| manifest_version(m, manifest_path))
            .or_else(|| scan_version_line(&contents))
            .ok_or_else(|| metadata_error(manifest_path, "no version field found"))?;
        let version = parse_version(&version_text)
            .map_err(|reason| metadata_error(manifest_path, reason))?;

        let package_name = manifest
            .as_ref()
            .and_then(|m| m.package.as_ref())
            .map(|p| p.name.clone());

        let product = product
            .map(str::to_string)
            .or_else(|| package_name.clone())
            .map(|p| p.trim().to_string())
            .filter(|p| !p.is_empty())
            .ok_or_else(|| {
                metadata_error(manifest_path, "no package name found; pass --product")
            })?;

        let bins = if !bins.is_empty() {
            bins.to_vec()
        } else {
            let declared: Vec<String> = manifest
                .as_ref()
                .map(|m| m.bin.iter().filter_map(|b| b.name.clone()).collect())
                .unwrap_or_default();
            if declared.is_empty() {
                package_name.into_iter().collect()
            } else {
                declared
            }
        };
        if bins.is_empty() {
            return Err(metadata_error(manifest_path, "no binaries found; pass --bin"));
        }

        Ok(Self {
            product,
            version,
            bins,
        })
    }
}

/// Version from the manifest, following `version.workspace = true`.
fn manifest_version(manifest: &Manifest, manifest_path: &Path) -> Option<String> {
    let local_workspace_version = || {
        manifest
            .workspace
            .as_ref()
            .and_then(|ws| ws.package.as_ref())
            .and_then(|p| p.version.clone())
    };

    match manifest.package.as_ref().and_then(|p| p.version.clone()) {
        Some(MaybeInherited::Local(version)) => Some(version),
        Some(MaybeInherited::Inherited { .. }) => {
            local_workspace_version().or_else(|| workspace_version(manifest_path))
        }
        None => local_workspace_version(),
    }
}

/// `workspace.package.version` from the nearest ancestor workspace manifest.
fn workspace_version(manifest_path: &Path) -> Option<String> {
    let package_dir = manifest_path.parent()?;

    for dir in package_dir.ancestors().skip(1) {
        let candidate = dir.join("Cargo.toml");
        if !candidate.exists() {
            continue;
        }
        if let Ok(manifest) = Manifest::from_path(&candidate) {
            if let Some(workspace) = manifest.workspace {
                tracing::debug!("Using workspace manifest {}", candidate.display());
                return workspace.package.and_then(|p| p.version);
            }
        }
    }

    None
}

/// First `version = "..."` line in `contents`, quotes stripped.
pub fn scan_version_line(contents: &str) -> Option<String> {
    contents.lines().find_map(|line| {
        let rest = line.trim().strip_prefix("version")?;
        let value = rest.trim_start().strip_prefix('=')?.trim_start();
        let value = value.strip_prefix('"')?;
        let end = value.find('"')?;
        Some(value[..end].trim().to_string())
    })
}

fn parse_version(text: &str) -> std::result::Result<Version, String> {
    let text = text.trim();
    if text.is_empty() {
        return Err("version field is empty".to_string());
    }
    Version::parse(text).map_err(|e| format!("invalid version '{text}': {e}"))
}

/// Detect the host target triple by parsing `rustc -vV` output.
pub fn detect_host_triple(rustc: &[OsString]) -> Result<TargetTriple> {
    let (program, leading) = rustc
        .split_first()
        .ok_or_else(|| RelpackError::Toolchain("no rustc command configured".to_string()))?;

    let output = Command::new(program)
        .args(leading)
        .arg("-vV")
        .output()
        .map_err(|e| {
            RelpackError::Toolchain(format!(
                "failed to run `{} -vV`: {e}",
                program.to_string_lossy()
            ))
        })?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(RelpackError::Toolchain(format!(
            "`rustc -vV` exited with {}: {}",
            output.status,
            stderr.trim()
        )));
    }

    let stdout = String::from_utf8_lossy(&output.stdout);
    let host = parse_host_line(&stdout).ok_or_else(|| {
        RelpackError::Toolchain("could not determine host target from `rustc -vV`".to_string())
    })?;

    host.parse()
        .map_err(|e| RelpackError::Toolchain(format!("rustc reported a bad host triple: {e}")))
}

/// The `host: ` value from `rustc -vV` output.
pub fn parse_host_line(output: &str) -> Option<&str> {
    output
        .lines()
        .find_map(|line| line.strip_prefix("host: "))
        .map(str::trim)
        .filter(|host| !host.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_scan_version_line() {
        let contents = r#"
[package]
name = "demo"
version = "1.2.3"
edition = "2021"

[dependencies]
serde = { version = "1.0" }
"#;
        assert_eq!(scan_version_line(contents).as_deref(), Some("1.2.3"));
    }

    #[test]
    fn test_scan_version_line_takes_first_match() {
        let contents = "version = \"0.4.0\"\nversion = \"9.9.9\"\n";
        assert_eq!(scan_version_line(contents).as_deref(), Some("0.4.0"));
    }

    #[test]
    fn test_scan_version_line_strips_inner_whitespace() {
        assert_eq!(
            scan_version_line("  version   =   \" 2.0.1 \"  # pinned").as_deref(),
            Some("2.0.1")
        );
    }

    #[test]
    fn test_scan_version_line_ignores_other_keys() {
        assert_eq!(scan_version_line("rust-version = \"1.70\"\nversions = \"x\""), None);
    }

    #[test]
    fn test_resolve_package_version() {
        let dir = tempdir().unwrap();
        let manifest = dir.path().join("Cargo.toml");
        fs::write(
            &manifest,
            "[package]\nname = \"demo\"\nversion = \"1.2.3\"\nedition = \"2021\"\n",
        )
        .unwrap();
        fs::create_dir_all(dir.path().join("src")).unwrap();
        fs::write(dir.path().join("src/main.rs"), "fn main() {}").unwrap();

        let meta = PackageMetadata::resolve(&manifest, None, &[]).unwrap();
        assert_eq!(meta.product, "demo");
        assert_eq!(meta.version.to_string(), "1.2.3");
        assert_eq!(meta.bins, vec!["demo".to_string()]);
    }

    #[test]
    fn test_resolve_inherited_version() {
        let dir = tempdir().unwrap();
        fs::write(
            dir.path().join("Cargo.toml"),
            "[workspace]\nmembers = [\"tool\"]\n\n[workspace.package]\nversion = \"3.1.4\"\n",
        )
        .unwrap();
        let member = dir.path().join("tool");
        fs::create_dir_all(member.join("src")).unwrap();
        fs::write(member.join("src/main.rs"), "fn main() {}").unwrap();
        fs::write(
            member.join("Cargo.toml"),
            "[package]\nname = \"tool\"\nversion.workspace = true\nedition = \"2021\"\n",
        )
        .unwrap();

        let meta = PackageMetadata::resolve(&member.join("Cargo.toml"), None, &[]).unwrap();
        assert_eq!(meta.version, Version::new(3, 1, 4));
    }

    #[test]
    fn test_resolve_overrides() {
        let dir = tempdir().unwrap();
        let manifest = dir.path().join("Cargo.toml");
        fs::write(&manifest, "[package]\nname = \"demo\"\nversion = \"0.1.0\"\n").unwrap();

        let meta = PackageMetadata::resolve(
            &manifest,
            Some("demo-suite"),
            &["one".to_string(), "two".to_string()],
        )
        .unwrap();
        assert_eq!(meta.product, "demo-suite");
        assert_eq!(meta.bins, vec!["one".to_string(), "two".to_string()]);
    }

    #[test]
    fn test_resolve_rejects_missing_version() {
        let dir = tempdir().unwrap();
        let manifest = dir.path().join("Cargo.toml");
        fs::write(&manifest, "[package]\nname = \"demo\"\n").unwrap();

        let err = PackageMetadata::resolve(&manifest, None, &[]).unwrap_err();
        assert!(matches!(err, RelpackError::Metadata { .. }));
    }

    #[test]
    fn test_resolve_rejects_empty_version() {
        let dir = tempdir().unwrap();
        let manifest = dir.path().join("Cargo.toml");
        fs::write(&manifest, "[package]\nname = \"demo\"\nversion = \"\"\n").unwrap();

        assert!(PackageMetadata::resolve(&manifest, None, &[]).is_err());
    }

    #[test]
    fn test_resolve_missing_manifest() {
        let dir = tempdir().unwrap();
        let err = PackageMetadata::resolve(&dir.path().join("Cargo.toml"), None, &[]).unwrap_err();
        assert_eq!(err.exit_code(), 78);
    }

    #[test]
    fn test_parse_host_line() {
        let output = "rustc 1.80.0 (051478957 2024-07-21)\n\
                      binary: rustc\n\
                      commit-hash: 051478957371ee0084a7c0913941d2a8c4757bb9\n\
                      host: x86_64-unknown-linux-gnu\n\
                      release: 1.80.0\n";
        assert_eq!(parse_host_line(output), Some("x86_64-unknown-linux-gnu"));
        assert_eq!(parse_host_line("binary: rustc\n"), None);
        assert_eq!(parse_host_line("host: \n"), None);
    }

    #[cfg(unix)]
    #[test]
    fn test_detect_host_triple_from_command() {
        let rustc: Vec<OsString> = vec![
            "sh".into(),
            "-c".into(),
            "printf 'binary: rustc\\nhost: aarch64-apple-darwin\\n'".into(),
            "rustc".into(),
        ];
        let triple = detect_host_triple(&rustc).unwrap();
        assert_eq!(triple.as_str(), "aarch64-apple-darwin");
    }

    #[cfg(unix)]
    #[test]
    fn test_detect_host_triple_failure() {
        let rustc: Vec<OsString> = vec!["sh".into(), "-c".into(), "exit 1".into()];
        let err = detect_host_triple(&rustc).unwrap_err();
        assert!(matches!(err, RelpackError::Toolchain(_)));
    }
}
