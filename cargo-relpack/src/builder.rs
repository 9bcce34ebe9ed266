use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

use crate::cli::Args;
use crate::config::{Config, Toolchain};
use crate::error::{RelpackError, Result};
use crate::metadata::{self, PackageMetadata};
use crate::packager;
use crate::platform::{ArchiveFormat, TargetTriple};

/// Everything one packaging run needs, resolved and validated up front.
///
/// All paths are absolute; nothing downstream depends on the process
/// working directory.
#[derive(Debug, Clone)]
pub struct ReleasePlan {
    pub manifest_path: PathBuf,
    pub target_dir: PathBuf,
    pub out_dir: PathBuf,
    pub profile: String,
    pub triple: TargetTriple,
    /// Whether `--target` was passed to cargo, which moves the artifact
    /// directory under `<target-dir>/<triple>`.
    pub cross: bool,
    pub metadata: PackageMetadata,
}

/// Files produced by a successful run.
#[derive(Debug, Clone)]
pub struct ReleaseOutput {
    pub archive: PathBuf,
    pub checksum: PathBuf,
}

fn absolutize(path: &Path) -> Result<PathBuf> {
    if path.is_absolute() {
        Ok(path.to_path_buf())
    } else {
        Ok(std::env::current_dir()?.join(path))
    }
}

impl ReleasePlan {
    /// Resolve version, triple and paths from arguments.
    ///
    /// Fails before anything is built or written if the manifest, version
    /// or triple cannot be determined.
    pub fn resolve(args: &Args, toolchain: &Toolchain) -> Result<Self> {
        let manifest_path = absolutize(&args.manifest_path)?;
        let metadata =
            PackageMetadata::resolve(&manifest_path, args.product.as_deref(), &args.bins)?;

        let (triple, cross) = match &args.target {
            Some(target) => (target.parse::<TargetTriple>()?, true),
            None => (metadata::detect_host_triple(&toolchain.rustc)?, false),
        };

        let manifest_dir = manifest_path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));
        let target_dir = match &args.target_dir {
            Some(dir) => absolutize(dir)?,
            None => manifest_dir.join("target"),
        };
        let out_dir = match &args.out_dir {
            Some(dir) => absolutize(dir)?,
            None => target_dir.join("relpack"),
        };

        let profile = args.profile().trim().to_string();
        if profile.is_empty() {
            return Err(RelpackError::Usage("build profile is empty".to_string()));
        }

        Ok(Self {
            manifest_path,
            target_dir,
            out_dir,
            profile,
            triple,
            cross,
            metadata,
        })
    }

    /// Directory cargo writes this profile's binaries to.
    pub fn artifact_dir(&self) -> PathBuf {
        let profile_dir = match self.profile.as_str() {
            "dev" | "test" => "debug",
            "bench" => "release",
            other => other,
        };

        if self.cross {
            self.target_dir.join(self.triple.as_str()).join(profile_dir)
        } else {
            self.target_dir.join(profile_dir)
        }
    }

    /// Paths of the binaries the archive should contain.
    pub fn expected_binaries(&self) -> Vec<PathBuf> {
        let dir = self.artifact_dir();
        self.metadata
            .bins
            .iter()
            .map(|bin| dir.join(self.triple.binary_file_name(bin)))
            .collect()
    }

    pub fn archive_format(&self) -> ArchiveFormat {
        self.triple.archive_format()
    }

    pub fn archive_stem(&self) -> String {
        packager::archive_stem(&self.metadata.product, &self.metadata.version, &self.triple)
    }

    pub fn archive_path(&self) -> PathBuf {
        self.out_dir.join(format!(
            "{}.{}",
            self.archive_stem(),
            self.archive_format().extension()
        ))
    }
}

pub struct ReleaseBuilder {
    plan: ReleasePlan,
    toolchain: Toolchain,
}

impl ReleaseBuilder {
    /// Load configuration, apply the unknown-argument policy and resolve the plan.
    pub fn new(mut args: Args, ignored: &[String]) -> Result<Self> {
        let config_path = args
            .config
            .clone()
            .unwrap_or_else(|| PathBuf::from(".config/relpack.toml"));
        let config = Config::discover(&config_path)?;

        config.merge_with_args(&mut args);
        args.unknown_arg_policy().apply(ignored)?;

        let toolchain = Toolchain::from_env().with_overrides(&config.toolchain);
        let plan = ReleasePlan::resolve(&args, &toolchain)?;

        Ok(Self::from_plan(plan, toolchain))
    }

    pub fn from_plan(plan: ReleasePlan, toolchain: Toolchain) -> Self {
        Self { plan, toolchain }
    }

    pub fn plan(&self) -> &ReleasePlan {
        &self.plan
    }

    pub fn run(&self) -> Result<ReleaseOutput> {
        let plan = &self.plan;
        tracing::info!(
            "Packaging {} {} for {}",
            plan.metadata.product,
            plan.metadata.version,
            plan.triple
        );

        self.build()?;
        let binaries = self.collect_artifacts()?;

        fs::create_dir_all(&plan.out_dir)?;
        let archive = packager::create_archive(
            &binaries,
            &plan.out_dir,
            &plan.archive_stem(),
            plan.archive_format(),
        )?;
        let checksum = packager::write_checksum_file(&archive)?;

        Ok(ReleaseOutput { archive, checksum })
    }

    /// `cargo build` invocation for the plan, not yet spawned.
    pub fn build_command(&self) -> Result<Command> {
        let plan = &self.plan;
        let (program, leading) = self
            .toolchain
            .cargo
            .split_first()
            .ok_or_else(|| RelpackError::Toolchain("no cargo command configured".to_string()))?;

        let mut cmd = Command::new(program);
        cmd.args(leading)
            .arg("build")
            .arg("--manifest-path")
            .arg(&plan.manifest_path)
            .arg("--target-dir")
            .arg(&plan.target_dir);

        if plan.profile == "release" {
            cmd.arg("--release");
        } else {
            cmd.arg("--profile").arg(&plan.profile);
        }

        if plan.cross {
            cmd.arg("--target").arg(plan.triple.as_str());
        }

        for bin in &plan.metadata.bins {
            cmd.arg("--bin").arg(bin);
        }

        Ok(cmd)
    }

    fn build(&self) -> Result<()> {
        let mut cmd = self.build_command()?;
        tracing::debug!("Running {:?}", cmd);

        let status = cmd.status().map_err(|e| {
            RelpackError::Toolchain(format!(
                "failed to run {}: {e}",
                cmd.get_program().to_string_lossy()
            ))
        })?;

        if !status.success() {
            // killed by a signal: no code to hand back
            let code = status.code().unwrap_or(1);
            return Err(RelpackError::BuildFailed {
                target: self.plan.triple.to_string(),
                code,
            });
        }

        Ok(())
    }

    fn collect_artifacts(&self) -> Result<Vec<PathBuf>> {
        let binaries = self.plan.expected_binaries();
        for path in &binaries {
            if !path.is_file() {
                return Err(RelpackError::MissingArtifact { path: path.clone() });
            }
            tracing::debug!("Found artifact {}", path.display());
        }
        Ok(binaries)
    }
}
