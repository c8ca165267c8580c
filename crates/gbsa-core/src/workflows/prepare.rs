use crate::engine::config::RunConfig;
use crate::engine::error::{PrepError, Result};
use crate::engine::progress::{Progress, ProgressReporter};
use crate::engine::submission::{Submission, submit_job_script};
use crate::engine::templates::{cpptraj, gbsa, slurm};
use crate::engine::toolchain::{ResolvedExecutables, Toolchain, resolve_executables, run_checked};
use crate::engine::workspace::{Entity, Workspace};
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::{debug, error, info, instrument};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrepareOptions {
    /// Directory in which `<prefix>_gbsa` is created.
    pub output_root: PathBuf,
    /// Prepare everything but never call the scheduler.
    pub dry_run: bool,
}

impl Default for PrepareOptions {
    fn default() -> Self {
        Self {
            output_root: PathBuf::from("."),
            dry_run: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PipelineState {
    Unvalidated,
    Validated,
    WorkspaceReady,
    ScriptsGenerated,
    Submitted,
    AwaitingManualSubmission,
    Failed(String),
}

impl PipelineState {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            PipelineState::Submitted
                | PipelineState::AwaitingManualSubmission
                | PipelineState::Failed(_)
        )
    }
}

impl fmt::Display for PipelineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PipelineState::Unvalidated => f.write_str("unvalidated"),
            PipelineState::Validated => f.write_str("validated"),
            PipelineState::WorkspaceReady => f.write_str("workspace ready"),
            PipelineState::ScriptsGenerated => f.write_str("scripts generated"),
            PipelineState::Submitted => f.write_str("submitted"),
            PipelineState::AwaitingManualSubmission => f.write_str("awaiting manual submission"),
            PipelineState::Failed(reason) => write!(f, "failed: {}", reason),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ManualReason {
    SubmitDisabled,
    DryRun,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Submitted(Submission),
    AwaitingManualSubmission(ManualReason),
}

#[derive(Debug, Clone)]
pub struct PreparedJob {
    pub workspace: Workspace,
    pub outcome: Outcome,
}

impl PreparedJob {
    pub fn job_script(&self) -> PathBuf {
        self.workspace.job_script()
    }

    pub fn final_state(&self) -> PipelineState {
        match self.outcome {
            Outcome::Submitted(_) => PipelineState::Submitted,
            Outcome::AwaitingManualSubmission(_) => PipelineState::AwaitingManualSubmission,
        }
    }
}

/// A generated file: where it goes and what it contains.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifact {
    pub path: PathBuf,
    pub contents: String,
}

/// Every file this tool writes, rendered up front so that no file is written unless
/// all of them can be produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedArtifacts {
    pub topology_scripts: Vec<(Entity, Artifact)>,
    pub trajectory_script: Artifact,
    pub gbsa_input: Artifact,
    pub job_script: Artifact,
}

impl RenderedArtifacts {
    pub fn iter(&self) -> impl Iterator<Item = &Artifact> {
        self.topology_scripts
            .iter()
            .map(|(_, artifact)| artifact)
            .chain([&self.trajectory_script, &self.gbsa_input, &self.job_script])
    }
}

pub fn render_artifacts(config: &RunConfig, workspace: &Workspace) -> Result<RenderedArtifacts> {
    let topology_scripts = Entity::ALL
        .iter()
        .map(|&entity| {
            (
                entity,
                Artifact {
                    path: workspace.topology_script(entity),
                    contents: cpptraj::render_topology_script(config, workspace, entity),
                },
            )
        })
        .collect();

    Ok(RenderedArtifacts {
        topology_scripts,
        trajectory_script: Artifact {
            path: workspace.trajectory_script(),
            contents: cpptraj::render_trajectory_script(config, workspace),
        },
        gbsa_input: Artifact {
            path: workspace.gbsa_input(),
            contents: gbsa::render_gbsa_input(config)?,
        },
        job_script: Artifact {
            path: workspace.job_script(),
            contents: slurm::render_job_script(config, workspace),
        },
    })
}

struct StateTracker {
    state: PipelineState,
}

impl StateTracker {
    fn new(state: PipelineState) -> Self {
        debug!("Pipeline state: {}", state);
        Self { state }
    }

    fn advance(&mut self, next: PipelineState) {
        debug!("Pipeline state: {} -> {}", self.state, next);
        self.state = next;
    }

    fn fail(&mut self, error: &PrepError) {
        error!("Pipeline failed while {}: {}", self.state, error);
        self.state = PipelineState::Failed(error.to_string());
    }
}

/// Loads and validates `config_path`: the `Unvalidated -> Validated` step of the pipeline.
pub fn load_config(config_path: &Path) -> Result<RunConfig> {
    let mut tracker = StateTracker::new(PipelineState::Unvalidated);
    let config = RunConfig::from_path(config_path).inspect_err(|e| tracker.fail(e))?;
    tracker.advance(PipelineState::Validated);
    Ok(config)
}

/// Loads and validates `config_path`, then runs the pipeline.
pub fn run_from_path(
    config_path: &Path,
    options: &PrepareOptions,
    toolchain: &impl Toolchain,
    reporter: &ProgressReporter,
) -> Result<PreparedJob> {
    let config = load_config(config_path)?;
    run(&config, options, toolchain, reporter)
}

/// Runs the preparation pipeline for an already validated configuration.
///
/// Executables are resolved before anything is written. The trajectory tool runs in
/// the workspace root; the scheduler is only called when `submit_job` is set and
/// `dry_run` is not.
#[instrument(skip_all, name = "prepare_workflow")]
pub fn run(
    config: &RunConfig,
    options: &PrepareOptions,
    toolchain: &impl Toolchain,
    reporter: &ProgressReporter,
) -> Result<PreparedJob> {
    let mut tracker = StateTracker::new(PipelineState::Validated);
    let result = execute(config, options, toolchain, reporter, &mut tracker);
    if let Err(e) = &result {
        tracker.fail(e);
    }
    result
}

fn execute(
    config: &RunConfig,
    options: &PrepareOptions,
    toolchain: &impl Toolchain,
    reporter: &ProgressReporter,
    tracker: &mut StateTracker,
) -> Result<PreparedJob> {
    // === Phase 1: Resolve external tools and plan the workspace ===
    let (executables, workspace, artifacts) = reporter.phase("Checking inputs", || {
        let executables = resolve_executables(toolchain)?;
        let workspace = Workspace::plan(config, &options.output_root)?;
        let artifacts = render_artifacts(config, &workspace)?;
        Ok::<_, PrepError>((executables, workspace, artifacts))
    })?;
    info!(
        "Preparing {} ({}) in {:?}",
        workspace.prefix, config.level_of_theory, workspace.root
    );

    workspace.prepare()?;
    tracker.advance(PipelineState::WorkspaceReady);

    // === Phase 2: Strip topologies and trajectory with cpptraj ===
    reporter.phase("Stripping topologies and trajectory", || {
        run_cpptraj_steps(&workspace, &artifacts, &executables, toolchain, reporter)
    })?;

    // === Phase 3: GBSA input and job script ===
    reporter.phase("Writing GBSA input and job script", || {
        workspace.write_file(&artifacts.gbsa_input.path, &artifacts.gbsa_input.contents)?;
        workspace.write_file(&artifacts.job_script.path, &artifacts.job_script.contents)?;
        make_executable(&artifacts.job_script.path)
    })?;
    tracker.advance(PipelineState::ScriptsGenerated);

    // === Phase 4: Submission ===
    let outcome = if !config.submit_job {
        Outcome::AwaitingManualSubmission(ManualReason::SubmitDisabled)
    } else if options.dry_run {
        Outcome::AwaitingManualSubmission(ManualReason::DryRun)
    } else {
        let submission = reporter.phase("Submitting job", || {
            submit_job_script(toolchain, &executables.submit, &workspace.job_script())
        })?;
        Outcome::Submitted(submission)
    };

    let prepared = PreparedJob { workspace, outcome };
    tracker.advance(prepared.final_state());
    Ok(prepared)
}

fn run_cpptraj_steps(
    workspace: &Workspace,
    artifacts: &RenderedArtifacts,
    executables: &ResolvedExecutables,
    toolchain: &impl Toolchain,
    reporter: &ProgressReporter,
) -> Result<()> {
    let mut steps: Vec<(&Artifact, PathBuf)> = artifacts
        .topology_scripts
        .iter()
        .map(|(entity, artifact)| (artifact, workspace.topology_output(*entity)))
        .collect();
    steps.push((&artifacts.trajectory_script, workspace.trajectory_output()));

    reporter.report(Progress::TaskStart {
        total_steps: steps.len() as u64,
    });
    for (script, expected_output) in steps {
        workspace.write_file(&script.path, &script.contents)?;
        let script_name = script
            .path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();

        remove_stale_output(&expected_output)?;
        run_checked(
            toolchain,
            &executables.trajectory_tool,
            &["-i", script_name.as_str()],
            &workspace.root,
        )?;

        if !expected_output.is_file() {
            return Err(PrepError::ExternalCommandFailed {
                command: format!("cpptraj -i {}", script_name),
                status: "completed".to_string(),
                output: format!("expected output {:?} was not produced", expected_output),
            });
        }
        reporter.report(Progress::TaskIncrement);
    }
    reporter.report(Progress::TaskFinish);
    Ok(())
}

/// Drops a product left by an earlier run so that only this run's cpptraj can satisfy
/// the existence check.
fn remove_stale_output(path: &Path) -> Result<()> {
    match std::fs::remove_file(path) {
        Ok(()) => {
            debug!("Removed stale product {:?}", path);
            Ok(())
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(PrepError::io(path, e)),
    }
}

#[cfg(unix)]
fn make_executable(path: &Path) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o755))
        .map_err(|e| PrepError::io(path, e))
}

#[cfg(not(unix))]
fn make_executable(_path: &Path) -> Result<()> {
    Ok(())
}
