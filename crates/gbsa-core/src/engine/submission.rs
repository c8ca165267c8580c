use super::error::Result;
use super::toolchain::{CommandRunner, run_checked};
use std::path::Path;
use tracing::info;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Submission {
    /// Parsed from `Submitted batch job <id>` when the scheduler prints it.
    pub job_id: Option<String>,
    /// The scheduler's stdout, unmodified.
    pub scheduler_output: String,
}

/// Runs `sbatch <script>` from the script's own directory.
pub fn submit_job_script(
    runner: &impl CommandRunner,
    submit_command: &Path,
    job_script: &Path,
) -> Result<Submission> {
    let cwd = job_script
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or(Path::new("."));
    let script_name = job_script
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| job_script.display().to_string());

    let output = run_checked(runner, submit_command, &[script_name.as_str()], cwd)?;
    let job_id = parse_job_id(&output.stdout);
    info!("Scheduler accepted {:?} (job id: {:?})", job_script, job_id);

    Ok(Submission {
        job_id,
        scheduler_output: output.stdout,
    })
}

pub fn parse_job_id(stdout: &str) -> Option<String> {
    stdout.lines().find_map(|line| {
        line.trim()
            .strip_prefix("Submitted batch job")
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .map(str::to_string)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::error::PrepError;
    use crate::engine::toolchain::CommandOutput;
    use std::cell::RefCell;
    use std::path::PathBuf;

    #[derive(Default)]
    struct RecordingRunner {
        calls: RefCell<Vec<(PathBuf, Vec<String>, PathBuf)>>,
        reply: Option<CommandOutput>,
    }

    impl CommandRunner for RecordingRunner {
        fn run(&self, program: &Path, args: &[&str], cwd: &Path) -> std::io::Result<CommandOutput> {
            self.calls.borrow_mut().push((
                program.to_path_buf(),
                args.iter().map(|a| a.to_string()).collect(),
                cwd.to_path_buf(),
            ));
            Ok(self.reply.clone().unwrap_or(CommandOutput {
                success: true,
                status: "exit status: 0".to_string(),
                stdout: "Submitted batch job 4242\n".to_string(),
                stderr: String::new(),
            }))
        }
    }

    #[test]
    fn parses_sbatch_confirmation() {
        assert_eq!(parse_job_id("Submitted batch job 123\n"), Some("123".to_string()));
        assert_eq!(
            parse_job_id("warning: something\nSubmitted batch job 9 \n"),
            Some("9".to_string())
        );
        assert_eq!(parse_job_id("queued"), None);
        assert_eq!(parse_job_id("Submitted batch job "), None);
    }

    #[test]
    fn submits_from_the_script_directory() {
        let runner = RecordingRunner::default();
        let submission = submit_job_script(
            &runner,
            Path::new("/usr/bin/sbatch"),
            Path::new("/scratch/FC_wt_gbsa/MMgbsa/submit.job"),
        )
        .unwrap();

        assert_eq!(submission.job_id.as_deref(), Some("4242"));
        assert_eq!(submission.scheduler_output, "Submitted batch job 4242\n");
        let calls = runner.calls.borrow();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].0, PathBuf::from("/usr/bin/sbatch"));
        assert_eq!(calls[0].1, vec!["submit.job".to_string()]);
        assert_eq!(calls[0].2, PathBuf::from("/scratch/FC_wt_gbsa/MMgbsa"));
    }

    #[test]
    fn scheduler_rejection_is_surfaced() {
        let runner = RecordingRunner {
            reply: Some(CommandOutput {
                success: false,
                status: "exit status: 1".to_string(),
                stdout: String::new(),
                stderr: "sbatch: error: Batch job submission failed: Invalid account\n".to_string(),
            }),
            ..Default::default()
        };
        match submit_job_script(&runner, Path::new("sbatch"), Path::new("/tmp/x/submit.job")) {
            Err(PrepError::ExternalCommandFailed { output, .. }) => {
                assert_eq!(output, "sbatch: error: Batch job submission failed: Invalid account")
            }
            other => panic!("unexpected: {:?}", other),
        }
    }
}
