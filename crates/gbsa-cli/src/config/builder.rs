use super::models::AppConfig;
use crate::cli::Cli;
use crate::error::Result;
use gbsa_prep::engine::config::RunConfig;
use gbsa_prep::workflows::prepare::{self, PrepareOptions};
use tracing::{debug, info};

pub fn build_config(cli: &Cli) -> Result<AppConfig> {
    info!("Loading job configuration from {:?}", &cli.input);
    let run = prepare::load_config(&cli.input)?;
    Ok(apply_overrides(run, cli))
}

fn apply_overrides(mut run: RunConfig, cli: &Cli) -> AppConfig {
    if let Some(amber_env) = &cli.amber_env {
        debug!("Overriding amber_env with {:?}", amber_env);
        run.job.amber_env = amber_env.clone();
    }
    if let Some(procs) = cli.procs {
        debug!("Overriding MPI rank count with {}", procs);
        run.job.ntasks = procs;
    }

    if cli.dry_run && run.submit_job {
        info!("Dry run requested; the job will not be submitted.");
    }

    AppConfig {
        run,
        options: PrepareOptions {
            output_root: cli.output_root.clone(),
            dry_run: cli.dry_run,
        },
    }
}
