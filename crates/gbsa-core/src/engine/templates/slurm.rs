use crate::engine::config::RunConfig;
use crate::engine::toolchain::{GBSA_ENGINE, PARALLEL_LAUNCHER};
use crate::engine::workspace::{Entity, PROCESSED_TRAJECTORY, Workspace};

/// Renders the SLURM submission script for the calculation directory.
///
/// Only the job name, working directory, environment script and rank count vary;
/// every other `#SBATCH` line comes from [`JobSettings`](crate::engine::config::JobSettings).
/// Inputs produced by cpptraj are referenced relative to the calculation directory.
pub fn render_job_script(config: &RunConfig, workspace: &Workspace) -> String {
    let job = &config.job;
    let topology = |entity: Entity| format!("../{}", entity.topology_name());

    format!(
        "#!/bin/bash\n\
         #SBATCH --nodes={nodes}\n\
         #SBATCH --job-name={name}\n\
         #SBATCH --partition={partition}\n\
         #SBATCH --ntasks={ntasks}\n\
         #SBATCH --mem={mem}\n\
         #SBATCH --time={time}\n\
         #SBATCH --account={account}\n\
         #SBATCH --chdir={workdir}\n\
         \n\
         set -euo pipefail\n\
         \n\
         source {amber_env}\n\
         \n\
         echo \"[$(date)] Running {engine}...\"\n\
         {launcher} -np {ntasks} \"$AMBERHOME/bin/{engine}\" -O \\\n\
         \x20 -i ./{deck} \\\n\
         \x20 -cp {complex} \\\n\
         \x20 -rp {receptor} \\\n\
         \x20 -lp {ligand} \\\n\
         \x20 -y ../{trajectory} \\\n\
         \x20 > progress.log 2>&1\n\
         \n\
         echo \"[$(date)] Done.\"\n",
        nodes = job.nodes,
        name = workspace.dir_name(),
        partition = job.partition,
        ntasks = job.ntasks,
        mem = job.mem,
        time = job.time,
        account = job.account,
        workdir = workspace.calc_dir.display(),
        amber_env = shell_quote(&job.amber_env.to_string_lossy()),
        engine = GBSA_ENGINE,
        launcher = PARALLEL_LAUNCHER,
        deck = workspace.gbsa_input_name(),
        complex = topology(Entity::Complex),
        receptor = topology(Entity::Receptor),
        ligand = topology(Entity::Ligand),
        trajectory = PROCESSED_TRAJECTORY,
    )
}

/// Single-quotes `word` for bash unless it consists only of characters bash never
/// splits or expands.
fn shell_quote(word: &str) -> String {
    let plain = !word.is_empty()
        && word
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || "/._-+:=@%,".contains(c));
    if plain {
        word.to_string()
    } else {
        format!("'{}'", word.replace('\'', r"'\''"))
    }
}
