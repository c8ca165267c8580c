use crate::cli::Cli;
use crate::config::build_config;
use crate::error::Result;
use crate::utils::progress::CliProgressHandler;
use gbsa_prep::engine::progress::ProgressReporter;
use gbsa_prep::engine::toolchain::{SUBMIT_COMMAND, SystemToolchain};
use gbsa_prep::engine::workspace::JOB_SCRIPT;
use gbsa_prep::workflows::{
    self,
    prepare::{ManualReason, Outcome, PreparedJob},
};
use tracing::info;

pub fn run(cli: &Cli) -> Result<()> {
    let app = build_config(cli)?;

    let progress_handler = CliProgressHandler::new();
    let reporter = ProgressReporter::with_callback(progress_handler.get_callback());

    info!("Invoking the preparation workflow...");
    let prepared = workflows::prepare::run(&app.run, &app.options, &SystemToolchain, &reporter)
        .inspect_err(|_| progress_handler.abandon())?;

    info!(
        "Workflow finished in state '{}' for {:?}",
        prepared.final_state(),
        prepared.workspace.root
    );
    println!("{}", summary(&prepared));
    Ok(())
}

fn summary(prepared: &PreparedJob) -> String {
    match &prepared.outcome {
        Outcome::Submitted(submission) => {
            let mut text = match &submission.job_id {
                Some(id) => format!(
                    "\nSubmitted: {} (job {})",
                    prepared.job_script().display(),
                    id
                ),
                None => format!("\nSubmitted: {}", prepared.job_script().display()),
            };
            let scheduler_output = submission.scheduler_output.trim_end();
            if !scheduler_output.is_empty() {
                text.push('\n');
                text.push_str(scheduler_output);
            }
            text
        }
        Outcome::AwaitingManualSubmission(reason) => {
            let note = match reason {
                ManualReason::DryRun => "Dry run: the job was not submitted.\n",
                ManualReason::SubmitDisabled => "",
            };
            format!(
                "\nPreparation complete.\n{}To run later:\n  (cd {} && {} {})",
                note,
                prepared.workspace.calc_dir.display(),
                SUBMIT_COMMAND,
                JOB_SCRIPT
            )
        }
    }
}
