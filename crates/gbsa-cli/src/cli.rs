use clap::Parser;
use std::path::PathBuf;

const HELP_TEMPLATE: &str = "\
{before-help}{name} {version}
{author-with-newline}{about-with-newline}
{usage-heading} {usage}

{all-args}{after-help}
";

#[derive(Parser, Debug)]
#[command(
    author = "Tony Kan, Ted Yu, William A. Goddard III, Victor Wai Tak Kam",
    version,
    about = "GBSA-prep CLI - Prepares and submits MM-GBSA / QMMM-GBSA calculations for AMBER MD trajectories.",
    help_template = HELP_TEMPLATE,
)]
pub struct Cli {
    /// Path to the job configuration file (JSON, or TOML with a `.toml` extension).
    #[arg(short, long, required = true, value_name = "PATH")]
    pub input: PathBuf,

    /// Generate every file but never call the scheduler, even if `submit_job` is true.
    #[arg(long)]
    pub dry_run: bool,

    /// Directory in which the `<prefix>_gbsa` workspace is created.
    #[arg(short, long, value_name = "DIR", default_value = ".")]
    pub output_root: PathBuf,

    /// Override the shell script sourced by the job to load AMBER.
    #[arg(long, value_name = "PATH")]
    pub amber_env: Option<PathBuf>,

    /// Override the number of MPI ranks (`--ntasks` and `mpirun -np`).
    #[arg(short = 'n', long, value_name = "NUM", value_parser = clap::value_parser!(u32).range(1..))]
    pub procs: Option<u32>,

    /// Increase verbosity level (-v for INFO, -vv for DEBUG, -vvv for TRACE)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Suppress all log output
    #[arg(short, long, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Write logs to a specified file in addition to the console output
    #[arg(long, value_name = "PATH")]
    pub log_file: Option<PathBuf>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn command_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn minimal_invocation_uses_defaults() {
        let cli = Cli::try_parse_from(["gbsa-prep", "-i", "job.json"]).unwrap();
        assert_eq!(cli.input, PathBuf::from("job.json"));
        assert_eq!(cli.output_root, PathBuf::from("."));
        assert!(!cli.dry_run);
        assert!(cli.amber_env.is_none());
        assert!(cli.procs.is_none());
        assert_eq!(cli.verbose, 0);
    }

    #[test]
    fn parses_overrides_and_verbosity() {
        let cli = Cli::try_parse_from([
            "gbsa-prep",
            "--input",
            "job.toml",
            "--dry-run",
            "--amber-env",
            "/opt/amber/amber.sh",
            "--procs",
            "16",
            "-o",
            "/scratch",
            "-vv",
        ])
        .unwrap();
        assert!(cli.dry_run);
        assert_eq!(cli.amber_env, Some(PathBuf::from("/opt/amber/amber.sh")));
        assert_eq!(cli.procs, Some(16));
        assert_eq!(cli.output_root, PathBuf::from("/scratch"));
        assert_eq!(cli.verbose, 2);
    }

    #[test]
    fn rejects_missing_input_zero_procs_and_quiet_with_verbose() {
        assert!(Cli::try_parse_from(["gbsa-prep"]).is_err());
        assert!(Cli::try_parse_from(["gbsa-prep", "-i", "a.json", "--procs", "0"]).is_err());
        assert!(Cli::try_parse_from(["gbsa-prep", "-i", "a.json", "-q", "-v"]).is_err());
    }
}
