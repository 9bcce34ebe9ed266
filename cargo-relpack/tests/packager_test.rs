use cargo_relpack::packager::{
    archive_stem, checksum_path_for, create_archive, parse_checksum_line, write_checksum_file,
};
use cargo_relpack::platform::{ArchiveFormat, TargetTriple};
use std::fs::{self, File};
use std::io::Read;
use std::path::Path;
use tempfile::tempdir;

#[test]
fn test_create_tar_xz_archive() {
    let temp_dir = tempdir().unwrap();
    let output_dir = tempdir().unwrap();

    // Create test binaries
    let binary1 = temp_dir.path().join("test-binary1");
    let binary2 = temp_dir.path().join("test-binary2");
    fs::write(&binary1, b"binary content 1").unwrap();
    fs::write(&binary2, b"binary content 2").unwrap();

    let binaries = vec![binary1, binary2];

    let archive_path = create_archive(
        &binaries,
        output_dir.path(),
        "test-archive",
        ArchiveFormat::TarXz,
    )
    .unwrap();

    assert!(archive_path.exists());
    assert!(archive_path.to_string_lossy().ends_with("test-archive.tar.xz"));

    let decoder = xz2::read::XzDecoder::new(File::open(&archive_path).unwrap());
    let mut archive = tar::Archive::new(decoder);
    let mut contents = Vec::new();
    for entry in archive.entries().unwrap() {
        let mut entry = entry.unwrap();
        assert_eq!(entry.header().mode().unwrap(), 0o755);
        assert_eq!(entry.header().mtime().unwrap(), 0);
        let mut body = String::new();
        entry.read_to_string(&mut body).unwrap();
        contents.push(body);
    }
    assert_eq!(contents, vec!["binary content 1", "binary content 2"]);
}

#[test]
fn test_create_zip_archive() {
    let temp_dir = tempdir().unwrap();
    let output_dir = tempdir().unwrap();

    let binary = temp_dir.path().join("test-binary.exe");
    fs::write(&binary, b"binary content").unwrap();

    let archive_path =
        create_archive(&[binary], output_dir.path(), "test-archive", ArchiveFormat::Zip).unwrap();

    assert!(archive_path.to_string_lossy().ends_with("test-archive.zip"));

    let mut zip = zip::ZipArchive::new(File::open(&archive_path).unwrap()).unwrap();
    let mut entry = zip.by_name("test-binary.exe").unwrap();
    assert_eq!(entry.unix_mode().map(|m| m & 0o777), Some(0o755));
    let mut body = String::new();
    entry.read_to_string(&mut body).unwrap();
    assert_eq!(body, "binary content");
}

#[test]
fn test_existing_archive_is_replaced() {
    let temp_dir = tempdir().unwrap();
    let binary = temp_dir.path().join("demo");
    fs::write(&binary, b"new build").unwrap();

    let stale = temp_dir.path().join("demo-1.0.0.x86_64-unknown-linux-gnu.tar.xz");
    fs::write(&stale, b"stale archive bytes").unwrap();

    let archive_path = create_archive(
        &[binary],
        temp_dir.path(),
        "demo-1.0.0.x86_64-unknown-linux-gnu",
        ArchiveFormat::TarXz,
    )
    .unwrap();

    assert_eq!(archive_path, stale);
    assert_ne!(fs::read(&archive_path).unwrap(), b"stale archive bytes");
}

#[test]
fn test_archive_names_per_platform() {
    let version = semver::Version::new(1, 2, 3);
    let cases = [
        ("x86_64-unknown-linux-gnu", "demo-1.2.3.x86_64-unknown-linux-gnu.tar.xz"),
        ("aarch64-apple-darwin", "demo-1.2.3.aarch64-apple-darwin.tar.xz"),
        ("x86_64-pc-windows-msvc", "demo-1.2.3.x86_64-pc-windows-msvc.zip"),
        ("i686-pc-windows-gnu", "demo-1.2.3.i686-pc-windows-gnu.zip"),
    ];

    for (triple, expected) in cases {
        let triple: TargetTriple = triple.parse().unwrap();
        let name = format!(
            "{}.{}",
            archive_stem("demo", &version, &triple),
            triple.archive_format().extension()
        );
        assert_eq!(name, expected);
        assert_eq!(
            checksum_path_for(Path::new(&name)).to_string_lossy(),
            format!("{expected}.sha256")
        );
    }
}

#[test]
fn test_checksum_format() {
    let temp_dir = tempdir().unwrap();

    // Create a test file with known content
    let file1 = temp_dir.path().join("test.tar.xz");
    fs::write(&file1, b"Hello, World!").unwrap();

    let checksum_path = write_checksum_file(&file1).unwrap();
    let content = fs::read_to_string(&checksum_path).unwrap();

    let (digest, name) = parse_checksum_line(&content).unwrap();
    assert_eq!(
        digest,
        "dffd6021bb2bd5b0af676290809ec3a53191dd81c7f70a4b28688a362182986f"
    );
    assert_eq!(name, "test.tar.xz");
    // two spaces between digest and name, as sha256sum writes it
    assert!(content.contains("  test.tar.xz"));
}
