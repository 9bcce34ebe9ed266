use sha2::{Digest, Sha256};
use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use xz2::write::XzEncoder;

use crate::error::{RelpackError, Result};
use crate::platform::{ArchiveFormat, TargetTriple};

const XZ_PRESET: u32 = 6;
const ARCHIVE_MODE: u32 = 0o755;
const CHECKSUM_SUFFIX: &str = "sha256";

/// `<product>-<version>.<triple>`, the archive name without extension.
pub fn archive_stem(product: &str, version: &semver::Version, triple: &TargetTriple) -> String {
    format!("{product}-{version}.{triple}")
}

/// Sibling checksum path for an archive: the archive name plus `.sha256`.
pub fn checksum_path_for(archive_path: &Path) -> PathBuf {
    let mut name = archive_path.as_os_str().to_owned();
    name.push(".");
    name.push(CHECKSUM_SUFFIX);
    PathBuf::from(name)
}

/// Package binaries into an archive
///
/// The archive is assembled in a temporary file inside `output_dir` and
/// renamed over `<archive_name>.<ext>` once complete, so an interrupted run
/// never leaves a truncated archive behind under the final name. Entries are
/// stored under their bare file names with fixed timestamps and ownership.
pub fn create_archive(
    binaries: &[PathBuf],
    output_dir: &Path,
    archive_name: &str,
    format: ArchiveFormat,
) -> Result<PathBuf> {
    let archive_path = output_dir.join(format!("{archive_name}.{}", format.extension()));

    let mut staging = tempfile::Builder::new()
        .prefix(".relpack-")
        .tempfile_in(output_dir)
        .map_err(|e| RelpackError::archive(&archive_path, e))?;

    let written = match format {
        ArchiveFormat::TarXz => write_tar_xz(staging.as_file_mut(), binaries),
        ArchiveFormat::Zip => write_zip(staging.as_file_mut(), binaries),
    };
    written.map_err(|e| RelpackError::archive(&archive_path, e))?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(staging.path(), fs::Permissions::from_mode(0o644))
            .map_err(|e| RelpackError::archive(&archive_path, e))?;
    }

    staging
        .persist(&archive_path)
        .map_err(|e| RelpackError::archive(&archive_path, e.error))?;

    tracing::info!("Created archive: {}", archive_path.display());
    Ok(archive_path)
}

fn entry_name(file_path: &Path) -> io::Result<&str> {
    file_path
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("invalid file path: {}", file_path.display()),
            )
        })
}

/// Write a tar.xz archive
fn write_tar_xz(out: &mut File, files: &[PathBuf]) -> io::Result<()> {
    let encoder = XzEncoder::new(out, XZ_PRESET);
    let mut tar_builder = tar::Builder::new(encoder);

    for file_path in files {
        let name = entry_name(file_path)?;
        let mut file = File::open(file_path)?;

        let mut header = tar::Header::new_gnu();
        header.set_entry_type(tar::EntryType::Regular);
        header.set_size(file.metadata()?.len());
        header.set_mode(ARCHIVE_MODE);
        header.set_mtime(0);
        header.set_uid(0);
        header.set_gid(0);
        tar_builder.append_data(&mut header, name, &mut file)?;
    }

    let encoder = tar_builder.into_inner()?;
    encoder.finish()?.flush()
}

/// Write a zip archive
fn write_zip(out: &mut File, files: &[PathBuf]) -> io::Result<()> {
    let mut zip = zip::ZipWriter::new(out);

    let options = zip::write::SimpleFileOptions::default()
        .compression_method(zip::CompressionMethod::Deflated)
        .unix_permissions(ARCHIVE_MODE)
        .last_modified_time(zip::DateTime::default());

    for file_path in files {
        let name = entry_name(file_path)?;
        zip.start_file(name, options).map_err(io::Error::other)?;

        let mut file = File::open(file_path)?;
        io::copy(&mut file, &mut zip)?;
    }

    zip.finish().map_err(io::Error::other)?.flush()
}

/// Hex-encoded SHA256 of a file's contents
pub fn sha256_file(path: &Path) -> Result<String> {
    let mut file = File::open(path).map_err(|e| RelpackError::checksum(path, e))?;
    let mut hasher = Sha256::new();
    io::copy(&mut file, &mut hasher).map_err(|e| RelpackError::checksum(path, e))?;
    Ok(hex::encode(hasher.finalize()))
}

/// Write `<digest>  <archive-name>` to `<archive>.sha256`, replacing any old file.
pub fn write_checksum_file(archive_path: &Path) -> Result<PathBuf> {
    let file_name = archive_path
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| RelpackError::checksum(archive_path, "invalid file path"))?;

    let digest = sha256_file(archive_path)?;
    let checksum_path = checksum_path_for(archive_path);
    fs::write(&checksum_path, format!("{digest}  {file_name}\n"))
        .map_err(|e| RelpackError::checksum(&checksum_path, e))?;

    tracing::info!("Generated checksum: {}", checksum_path.display());
    Ok(checksum_path)
}

/// Split a `sha256sum` line into digest and file name.
///
/// Accepts both text (`  `) and binary (` *`) mode separators.
pub fn parse_checksum_line(line: &str) -> Option<(&str, &str)> {
    let line = line.trim_end_matches(['\r', '\n']);
    let (digest, rest) = line.split_once(' ')?;
    let name = rest.strip_prefix(' ').or_else(|| rest.strip_prefix('*'))?;

    let valid_digest = digest.len() == 64 && digest.bytes().all(|b| b.is_ascii_hexdigit());
    if !valid_digest || name.is_empty() {
        return None;
    }
    Some((digest, name))
}

/// Check a `.sha256` file against the file it names, resolved beside it.
pub fn verify_checksum_file(checksum_path: &Path) -> Result<bool> {
    let contents =
        fs::read_to_string(checksum_path).map_err(|e| RelpackError::checksum(checksum_path, e))?;
    let line = contents.lines().next().unwrap_or_default();
    let (expected, name) = parse_checksum_line(line)
        .ok_or_else(|| RelpackError::checksum(checksum_path, "malformed checksum line"))?;

    let dir = checksum_path.parent().unwrap_or_else(|| Path::new("."));
    let actual = sha256_file(&dir.join(name))?;
    Ok(actual.eq_ignore_ascii_case(expected))
}
