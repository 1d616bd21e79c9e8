use super::*;
pub(super) fn handle_config(args: ConfigArgs, config_path: &std::path::Path) -> anyhow::Result<()> {
    let mut config = ConfigStore::load(config_path)?;
    match args.value {
        Some(value) => {
            config.set(&args.key, &value)?;
            config.save(config_path)?;
            info!(key = %args.key, path = %config_path.display(), "config updated");
        }
        None => println!("{}", config.get(&args.key).unwrap_or_default()),
    }
    Ok(())
}
