use clap::error::{ContextKind, ContextValue, ErrorKind};
use clap::Parser;
use std::ffi::OsString;
use std::path::PathBuf;

use crate::error::{RelpackError, Result};

/// Name cargo passes as the first argument when run as `cargo relpack`.
const CARGO_SUBCOMMAND: &str = "relpack";

#[derive(Parser, Debug, Clone)]
#[clap(
    name = "cargo-relpack",
    version,
    about = "Build a release binary and package it with a SHA256 checksum",
    long_about = None
)]
pub struct RelpackCli {
    /// Build target (Rust triple format), defaults to the host triple
    /// Example: x86_64-pc-windows-msvc
    #[clap(short, long)]
    pub target: Option<String>,

    /// Path to the Cargo.toml of the package to release
    #[clap(long, default_value = "Cargo.toml")]
    pub manifest_path: PathBuf,

    /// Directory the archive and checksum are written to
    /// Defaults to <target-dir>/relpack
    #[clap(short, long)]
    pub out_dir: Option<PathBuf>,

    /// Cargo target directory, defaults to `target` next to the manifest
    #[clap(long, env = "CARGO_TARGET_DIR")]
    pub target_dir: Option<PathBuf>,

    /// Cargo build profile (release, dev, or a custom profile)
    #[clap(long)]
    pub profile: Option<String>,

    /// Binary names to build and include (defaults to the manifest's binaries)
    #[clap(long = "bin", value_delimiter = ',')]
    pub bins: Vec<String>,

    /// Archive name prefix, defaults to the package name
    #[clap(long)]
    pub product: Option<String>,

    /// Configuration file path
    #[clap(long, default_value = ".config/relpack.toml")]
    pub config: PathBuf,

    /// Abort on unrecognized arguments instead of warning about them
    #[clap(long, env = "RELPACK_STRICT_ARGS")]
    pub strict_args: bool,

    /// Enable verbose output
    #[clap(short, long)]
    pub verbose: bool,
}

/// Resolved command-line arguments, before defaults are filled in.
#[derive(Debug, Clone)]
pub struct Args {
    pub target: Option<String>,
    pub manifest_path: PathBuf,
    pub out_dir: Option<PathBuf>,
    pub target_dir: Option<PathBuf>,
    pub profile: Option<String>,
    pub bins: Vec<String>,
    pub product: Option<String>,
    pub config: Option<PathBuf>,
    pub strict_args: bool,
    pub verbose: bool,
}

impl Default for Args {
    fn default() -> Self {
        Args {
            target: None,
            manifest_path: PathBuf::from("Cargo.toml"),
            out_dir: None,
            target_dir: None,
            profile: None,
            bins: Vec::new(),
            product: None,
            config: None,
            strict_args: false,
            verbose: false,
        }
    }
}

impl From<RelpackCli> for Args {
    fn from(cli: RelpackCli) -> Self {
        Args {
            target: cli.target,
            manifest_path: cli.manifest_path,
            out_dir: cli.out_dir,
            target_dir: cli.target_dir,
            profile: cli.profile,
            bins: cli.bins,
            product: cli.product,
            config: Some(cli.config),
            strict_args: cli.strict_args,
            verbose: cli.verbose,
        }
    }
}

impl Args {
    /// Cargo profile to build with
    pub fn profile(&self) -> &str {
        self.profile.as_deref().unwrap_or("release")
    }

    pub fn unknown_arg_policy(&self) -> UnknownArgPolicy {
        if self.strict_args {
            UnknownArgPolicy::Reject
        } else {
            UnknownArgPolicy::Warn
        }
    }
}

/// What to do with command-line arguments clap did not recognize.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnknownArgPolicy {
    /// Log a usage warning and keep going.
    Warn,
    /// Fail with a usage error.
    Reject,
}

impl UnknownArgPolicy {
    pub fn apply(self, ignored: &[String]) -> Result<()> {
        if ignored.is_empty() {
            return Ok(());
        }

        match self {
            UnknownArgPolicy::Warn => {
                for arg in ignored {
                    tracing::warn!(
                        "Ignoring unrecognized argument '{}' (see --help for usage)",
                        arg
                    );
                }
                Ok(())
            }
            UnknownArgPolicy::Reject => Err(RelpackError::Usage(format!(
                "unrecognized argument(s): {}",
                ignored.join(" ")
            ))),
        }
    }
}

#[derive(Debug)]
pub struct ParsedArgs {
    pub args: Args,
    /// Arguments dropped because clap did not recognize them.
    pub ignored: Vec<String>,
}

/// Parse command-line arguments, setting aside anything unrecognized.
///
/// Works both as `cargo relpack ...` and as `cargo-relpack ...`. Unknown
/// arguments are removed one at a time and parsing is retried; they are
/// returned in [`ParsedArgs::ignored`] so the caller can apply its
/// [`UnknownArgPolicy`] once configuration is known. Any other clap error,
/// including `--help` and `--version`, is returned as-is.
pub fn parse_lenient<I, T>(argv: I) -> std::result::Result<ParsedArgs, clap::Error>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString>,
{
    let mut argv: Vec<OsString> = argv.into_iter().map(Into::into).collect();
    if argv.get(1).and_then(|a| a.to_str()) == Some(CARGO_SUBCOMMAND) {
        argv.remove(1);
    }

    let mut ignored = Vec::new();
    // clap stops at the leftmost bad token, so nothing before `cursor` is unknown
    let mut cursor = 1;
    loop {
        let err = match RelpackCli::try_parse_from(&argv) {
            Ok(cli) => {
                return Ok(ParsedArgs {
                    args: cli.into(),
                    ignored,
                })
            }
            Err(err) => err,
        };

        if err.kind() != ErrorKind::UnknownArgument {
            return Err(err);
        }
        let Some(ContextValue::String(invalid)) = err.get(ContextKind::InvalidArg).cloned()
        else {
            return Err(err);
        };
        let Some((index, removed)) = take_unknown(&mut argv, &invalid, cursor) else {
            return Err(err);
        };

        ignored.push(removed);
        cursor = index;
    }
}

/// Remove the argv token clap reported, looking no earlier than `from`.
///
/// clap reports `--flag=value` as `--flag`, so a prefix match on `=` counts.
/// An unknown short flag inside a cluster such as `-vz` is reported as `-z`;
/// only that character is dropped and the rest of the cluster stays.
fn take_unknown(argv: &mut Vec<OsString>, invalid: &str, from: usize) -> Option<(usize, String)> {
    let with_value = format!("{invalid}=");
    let whole = argv.iter().enumerate().skip(from).find(|(_, token)| {
        token
            .to_str()
            .is_some_and(|t| t == invalid || t.starts_with(&with_value))
    });
    if let Some((index, _)) = whole {
        let removed = argv.remove(index).to_string_lossy().into_owned();
        return Some((index, removed));
    }

    let flag = short_flag(invalid)?;
    let (index, _) = argv.iter().enumerate().skip(from).find(|(_, token)| {
        token
            .to_str()
            .is_some_and(|t| is_short_cluster(t) && t[1..].contains(flag))
    })?;

    let mut cluster = argv[index].to_str()?.to_string();
    let at = cluster[1..].find(flag)? + 1;
    cluster.remove(at);
    if cluster == "-" {
        argv.remove(index);
    } else {
        argv[index] = cluster.into();
    }
    Some((index, invalid.to_string()))
}

/// `z` for `-z`; `None` for long flags and anything longer.
fn short_flag(invalid: &str) -> Option<char> {
    let mut chars = invalid.strip_prefix('-')?.chars();
    let flag = chars.next()?;
    (flag != '-' && chars.next().is_none()).then_some(flag)
}

fn is_short_cluster(token: &str) -> bool {
    token.len() > 2 && token.starts_with('-') && !token.starts_with("--")
}

impl From<clap::Error> for RelpackError {
    fn from(err: clap::Error) -> Self {
        RelpackError::Usage(err.to_string().trim_end().to_string())
    }
}
