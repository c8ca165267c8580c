use super::error::{PrepError, Result};
use std::path::{Path, PathBuf};
use std::process::Command;
use tracing::{debug, info};

pub const TRAJECTORY_TOOL: &str = "cpptraj";
pub const PARALLEL_LAUNCHER: &str = "mpirun";
pub const SUBMIT_COMMAND: &str = "sbatch";
/// Resolved on the compute node through `$AMBERHOME`, never on the submit host.
pub const GBSA_ENGINE: &str = "MMPBSA.py.MPI";

pub const REQUIRED_EXECUTABLES: [&str; 3] = [TRAJECTORY_TOOL, PARALLEL_LAUNCHER, SUBMIT_COMMAND];

/// Locates executables by name.
pub trait ExecutableResolver {
    fn resolve(&self, name: &str) -> Option<PathBuf>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandOutput {
    pub success: bool,
    /// Human-readable exit status, e.g. `exit status: 1`.
    pub status: String,
    pub stdout: String,
    pub stderr: String,
}

/// Runs an external program to completion and captures its output.
pub trait CommandRunner {
    fn run(&self, program: &Path, args: &[&str], cwd: &Path) -> std::io::Result<CommandOutput>;
}

/// Everything the pipeline needs from the outside world.
pub trait Toolchain: ExecutableResolver + CommandRunner {}

impl<T: ExecutableResolver + CommandRunner> Toolchain for T {}

/// The real process environment: `PATH` lookup and `std::process`.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemToolchain;

impl ExecutableResolver for SystemToolchain {
    fn resolve(&self, name: &str) -> Option<PathBuf> {
        which::which(name).ok()
    }
}

impl CommandRunner for SystemToolchain {
    fn run(&self, program: &Path, args: &[&str], cwd: &Path) -> std::io::Result<CommandOutput> {
        let output = Command::new(program).args(args).current_dir(cwd).output()?;
        Ok(CommandOutput {
            success: output.status.success(),
            status: output.status.to_string(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedExecutables {
    pub trajectory_tool: PathBuf,
    pub launcher: PathBuf,
    pub submit: PathBuf,
}

/// Resolves all required executables, failing on the first one that is missing.
pub fn resolve_executables(resolver: &impl ExecutableResolver) -> Result<ResolvedExecutables> {
    let resolve = |name: &str| {
        let path = resolver
            .resolve(name)
            .ok_or_else(|| PrepError::MissingExecutable(name.to_string()))?;
        debug!("Resolved '{}' to {:?}", name, path);
        Ok::<_, PrepError>(path)
    };
    Ok(ResolvedExecutables {
        trajectory_tool: resolve(TRAJECTORY_TOOL)?,
        launcher: resolve(PARALLEL_LAUNCHER)?,
        submit: resolve(SUBMIT_COMMAND)?,
    })
}

/// Runs `program args...` in `cwd` and turns launch failures and non-zero exits into
/// [`PrepError::ExternalCommandFailed`], carrying the tool's own output.
pub fn run_checked(
    runner: &impl CommandRunner,
    program: &Path,
    args: &[&str],
    cwd: &Path,
) -> Result<CommandOutput> {
    let command = display_command(program, args);
    info!("[run] {}$ {}", cwd.display(), command);

    let output = runner
        .run(program, args, cwd)
        .map_err(|e| PrepError::ExternalCommandFailed {
            command: command.clone(),
            status: "failed to start".to_string(),
            output: e.to_string(),
        })?;

    if !output.success {
        let text = if output.stderr.trim().is_empty() {
            output.stdout.trim()
        } else {
            output.stderr.trim()
        };
        return Err(PrepError::ExternalCommandFailed {
            command,
            status: output.status.clone(),
            output: text.to_string(),
        });
    }
    Ok(output)
}

fn display_command(program: &Path, args: &[&str]) -> String {
    let name = program
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| program.display().to_string());
    std::iter::once(name)
        .chain(args.iter().map(|a| a.to_string()))
        .collect::<Vec<_>>()
        .join(" ")
}
