use super::*;
pub(super) fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();
    logging::init(cli.verbose);
    info!(command = command_label(&cli.command), "Running command");

    let config_path = match cli.config {
        Some(path) => path,
        None => default_config_path()?,
    };
    match cli.command {
        Commands::Config(args) => handle_config(args, &config_path),
        Commands::Push(args) => handle_push(args, &config_path),
    }
}

fn command_label(command: &Commands) -> &'static str {
    match command {
        Commands::Config(_) => "config",
        Commands::Push(_) => "push",
    }
}
