//! # cargo-relpack
//!
//! A cargo subcommand that builds a binary in release mode and packages it
//! for distribution.
//!
//! ## Overview
//!
//! `cargo-relpack` compiles a package for one target, bundles the resulting
//! binaries into an archive named after the package version and target
//! triple, and writes a SHA256 checksum file next to it:
//!
//! ```text
//! target/relpack/
//!   demo-1.2.3.x86_64-unknown-linux-gnu.tar.xz
//!   demo-1.2.3.x86_64-unknown-linux-gnu.tar.xz.sha256
//! ```
//!
//! Windows targets get a `.zip` containing `<bin>.exe`; every other target
//! gets a `.tar.xz`. Archives are built with fixed timestamps and ownership
//! so identical inputs give identical bytes.
//!
//! ## Usage
//!
//! ```bash
//! # Package for the host triple
//! cargo relpack
//!
//! # Cross-compile and package for Windows
//! cargo relpack --target x86_64-pc-windows-msvc
//!
//! # Fail on unrecognized flags instead of warning
//! cargo relpack --strict-args
//! ```
//!
//! ## Configuration
//!
//! Defaults can be set in `.config/relpack.toml` in your project directory
//! or `relpack.toml` in the user configuration directory.
//!
//! ## Exit codes
//!
//! A failed `cargo build` exits with cargo's own exit code. Other failures
//! use [`error::RelpackError::exit_code`].

/// Build orchestration: plan resolution, compilation, packaging
pub mod builder;

/// Command-line interface definitions and argument parsing
pub mod cli;

/// Configuration file handling and toolchain command selection
pub mod config;

/// Error types and exit codes
pub mod error;

/// Package version, product name and host triple resolution
pub mod metadata;

/// Archive creation and checksum generation utilities
pub mod packager;

/// Target triples, platform families and archive formats
pub mod platform;
