use super::config::RunConfig;
use super::error::{PrepError, Result};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

pub const WORKSPACE_SUFFIX: &str = "_gbsa";
pub const TRAJECTORY_SCRIPT: &str = "strip_traj.in";
pub const PROCESSED_TRAJECTORY: &str = "md.nc";
pub const JOB_SCRIPT: &str = "submit.job";

/// The three systems a binding free energy is assembled from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Entity {
    Complex,
    Receptor,
    Ligand,
}

impl Entity {
    pub const ALL: [Entity; 3] = [Entity::Complex, Entity::Receptor, Entity::Ligand];

    pub fn name(&self) -> &'static str {
        match self {
            Entity::Complex => "complex",
            Entity::Receptor => "receptor",
            Entity::Ligand => "ligand",
        }
    }

    pub fn script_name(&self) -> String {
        format!("{}_prmtop.in", self.name())
    }

    pub fn topology_name(&self) -> String {
        format!("{}.prmtop", self.name())
    }
}

impl fmt::Display for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Resolved input files and the layout of the output tree.
///
/// ```text
/// <output_root>/<prefix>_gbsa/
///     complex_prmtop.in  receptor_prmtop.in  ligand_prmtop.in  strip_traj.in
///     complex.prmtop     receptor.prmtop     ligand.prmtop     md.nc
///     <LEVEL>gbsa/
///         <LEVEL>gbsa.in  submit.job
/// ```
///
/// Planning touches the filesystem only to read; directories are created by
/// [`Workspace::prepare`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Workspace {
    pub source_dir: PathBuf,
    pub topology: PathBuf,
    pub trajectory: PathBuf,
    pub prefix: String,
    pub root: PathBuf,
    pub calc_dir: PathBuf,
    calc_name: String,
}

impl Workspace {
    pub fn plan(config: &RunConfig, output_root: &Path) -> Result<Self> {
        let source_dir = fs::canonicalize(&config.directory)
            .ok()
            .filter(|p| p.is_dir())
            .ok_or_else(|| PrepError::MissingInput(config.directory.clone()))?;
        debug!("Source directory resolved to {:?}", source_dir);

        let trajectory = source_dir.join(&config.inputs.trajectory);
        if !trajectory.is_file() {
            return Err(PrepError::MissingInput(trajectory));
        }
        let topology = match &config.inputs.topology {
            Some(name) => {
                let path = source_dir.join(name);
                if !path.is_file() {
                    return Err(PrepError::MissingInput(path));
                }
                path
            }
            None => find_single_topology(&source_dir)?,
        };

        let output_root = std::path::absolute(output_root).map_err(|e| PrepError::io(output_root, e))?;
        Self::layout(
            source_dir,
            topology,
            trajectory,
            &output_root,
            config.level_of_theory.token(),
        )
    }

    /// Pure layout computation from an already resolved source directory.
    pub fn layout(
        source_dir: PathBuf,
        topology: PathBuf,
        trajectory: PathBuf,
        output_root: &Path,
        level_token: &str,
    ) -> Result<Self> {
        require_script_safe("directory", &source_dir)?;
        require_script_safe("topology", &topology)?;
        require_script_safe("trajectory", &trajectory)?;
        require_script_safe("output_root", output_root)?;

        let prefix = workspace_prefix(&source_dir)?;
        let root = output_root.join(format!("{}{}", prefix, WORKSPACE_SUFFIX));
        let calc_name = format!("{}gbsa", level_token);
        let calc_dir = root.join(&calc_name);
        Ok(Self {
            source_dir,
            topology,
            trajectory,
            prefix,
            root,
            calc_dir,
            calc_name,
        })
    }

    /// Name of the output directory, `<prefix>_gbsa`.
    pub fn dir_name(&self) -> String {
        format!("{}{}", self.prefix, WORKSPACE_SUFFIX)
    }

    pub fn topology_script(&self, entity: Entity) -> PathBuf {
        self.root.join(entity.script_name())
    }

    pub fn topology_output(&self, entity: Entity) -> PathBuf {
        self.root.join(entity.topology_name())
    }

    pub fn trajectory_script(&self) -> PathBuf {
        self.root.join(TRAJECTORY_SCRIPT)
    }

    pub fn trajectory_output(&self) -> PathBuf {
        self.root.join(PROCESSED_TRAJECTORY)
    }

    pub fn gbsa_input_name(&self) -> String {
        format!("{}.in", self.calc_name)
    }

    pub fn gbsa_input(&self) -> PathBuf {
        self.calc_dir.join(self.gbsa_input_name())
    }

    pub fn job_script(&self) -> PathBuf {
        self.calc_dir.join(JOB_SCRIPT)
    }

    /// Creates the output and calculation directories. Existing directories are reused.
    pub fn prepare(&self) -> Result<()> {
        for dir in [&self.root, &self.calc_dir] {
            if dir.exists() && !dir.is_dir() {
                return Err(PrepError::WorkspaceConflict(dir.clone()));
            }
            fs::create_dir_all(dir).map_err(|e| PrepError::io(dir.as_path(), e))?;
        }
        info!("Workspace ready at {:?}", self.root);
        Ok(())
    }

    /// Writes `contents` to `path`, truncating any previous version of the file.
    ///
    /// Only paths below the workspace root are accepted.
    pub fn write_file(&self, path: &Path, contents: &str) -> Result<()> {
        if !path.starts_with(&self.root) {
            return Err(PrepError::WorkspaceConflict(path.to_path_buf()));
        }
        if path.is_dir() {
            return Err(PrepError::WorkspaceConflict(path.to_path_buf()));
        }
        fs::write(path, contents).map_err(|e| PrepError::io(path, e))?;
        debug!("Wrote {} bytes to {:?}", contents.len(), path);
        Ok(())
    }
}

/// cpptraj scripts and `#SBATCH` directives split on whitespace, so paths they
/// embed must not contain any.
fn require_script_safe(field: &str, path: &Path) -> Result<()> {
    if path.to_string_lossy().chars().any(char::is_whitespace) {
        return Err(PrepError::invalid(
            field,
            format!("{:?} contains whitespace, which cpptraj and sbatch cannot parse", path),
        ));
    }
    Ok(())
}

/// The final path segment of the source directory.
pub fn workspace_prefix(source_dir: &Path) -> Result<String> {
    source_dir
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .filter(|name| !name.is_empty())
        .ok_or_else(|| PrepError::invalid("directory", "path has no final segment to name the workspace"))
}

fn find_single_topology(source_dir: &Path) -> Result<PathBuf> {
    let entries = fs::read_dir(source_dir).map_err(|e| PrepError::io(source_dir, e))?;
    let mut candidates = Vec::new();
    for entry in entries {
        let path = entry.map_err(|e| PrepError::io(source_dir, e))?.path();
        let is_prmtop = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("prmtop"));
        if is_prmtop && path.is_file() {
            candidates.push(path);
        }
    }
    candidates.sort();

    match candidates.len() {
        0 => Err(PrepError::MissingInput(source_dir.join("*.prmtop"))),
        1 => Ok(candidates.remove(0)),
        _ => Err(PrepError::invalid(
            "topology",
            format!(
                "several topologies found ({}); name one explicitly",
                candidates
                    .iter()
                    .filter_map(|p| p.file_name())
                    .map(|n| n.to_string_lossy().into_owned())
                    .collect::<Vec<_>>()
                    .join(", ")
            ),
        )),
    }
}
