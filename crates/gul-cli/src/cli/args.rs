use super::*;
#[derive(Parser)]
#[command(name = "gul", author, version, about = "Command line based utilities for GitLab")]
pub(super) struct Cli {
    #[arg(
        short,
        long,
        global = true,
        action = clap::ArgAction::Count,
        help = "Make the operation more talkative"
    )]
    pub(super) verbose: u8,
    #[arg(long, global = true, help = "Use this config file instead of the default")]
    pub(super) config: Option<PathBuf>,
    #[command(subcommand)]
    pub(super) command: Commands,
}

#[derive(clap::Subcommand)]
pub(super) enum Commands {
    #[command(about = "Configure the application through key-value pairs")]
    Config(ConfigArgs),
    #[command(about = "Execute a mass push operation with instructions found on workdir")]
    Push(PushArgs),
}

#[derive(Parser)]
pub(super) struct ConfigArgs {
    #[arg(value_parser = parse_key)]
    pub(super) key: String,
    pub(super) value: Option<String>,
}

#[derive(Parser)]
pub(super) struct PushArgs {
    pub(super) workdir: PathBuf,
    #[arg(long, help = "List all the projects that will be worked on")]
    pub(super) list: bool,
    #[arg(
        long,
        value_parser = clap::value_parser!(u64).range(1..),
        help = "Amount of targets that will be processed (default: all)"
    )]
    pub(super) count: Option<u64>,
    #[arg(long, help = "Clone the repositories but do no other job")]
    pub(super) no_work: bool,
    #[arg(long, help = "Stop before committing")]
    pub(super) no_commit: bool,
    #[arg(long, help = "Stop before pushing changes upstream")]
    pub(super) no_push: bool,
    #[arg(long, value_name = "SECONDS", help = "Kill a job that runs longer than this")]
    pub(super) job_timeout: Option<u64>,
}

impl PushArgs {
    pub(super) fn flags(&self) -> RunFlags {
        RunFlags {
            no_work: self.no_work,
            no_commit: self.no_commit,
            no_push: self.no_push,
        }
    }
}

fn parse_key(key: &str) -> Result<String, String> {
    validate_key(key).map_err(|err| err.to_string())?;
    Ok(key.to_string())
}
