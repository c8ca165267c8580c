use crate::core::residues::ResidueRange;
use crate::engine::config::RunConfig;
use crate::engine::workspace::{Entity, PROCESSED_TRAJECTORY, Workspace};

pub fn residues_for(config: &RunConfig, entity: Entity) -> &ResidueRange {
    match entity {
        Entity::Complex => &config.complex_residues,
        Entity::Receptor => &config.receptor_residues,
        Entity::Ligand => &config.ligand_residues,
    }
}

/// Strips the solvated topology down to one entity and drops the periodic box.
///
/// Run from the workspace root; the stripped topology is written next to the script.
pub fn render_topology_script(config: &RunConfig, workspace: &Workspace, entity: Entity) -> String {
    format!(
        "parm {topology}\n\
         parmstrip !({mask})\n\
         parmbox nobox\n\
         parmwrite out ./{output}\n\
         run\n\
         quit\n",
        topology = workspace.topology.display(),
        mask = residues_for(config, entity).mask(),
        output = entity.topology_name(),
    )
}

/// Reads the selected frames, autoimages, keeps the complex and writes a boxless trajectory.
pub fn render_trajectory_script(config: &RunConfig, workspace: &Workspace) -> String {
    let frames = config.frames;
    format!(
        "parm {topology}\n\
         trajin {trajectory} {start} {end} {interval}\n\
         autoimage\n\
         strip !({mask})\n\
         trajout ./{output} nobox\n\
         run\n\
         quit\n",
        topology = workspace.topology.display(),
        trajectory = workspace.trajectory.display(),
        start = frames.start,
        end = frames.end,
        interval = frames.interval,
        mask = config.complex_residues.mask(),
        output = PROCESSED_TRAJECTORY,
    )
}
