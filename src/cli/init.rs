use super::config::{default_config_path, default_store_path, ArautoConfig};
use std::path::PathBuf;

/// Create a default configuration file
pub fn execute(
    config: Option<String>,
    store_path: Option<String>,
    force: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let store_path = store_path
        .map(PathBuf::from)
        .unwrap_or_else(default_store_path);
    let config_path = config
        .map(PathBuf::from)
        .unwrap_or_else(|| default_config_path(&store_path));

    if config_path.exists() && !force {
        return Err(format!(
            "Config file already exists at '{}'. Use --force to overwrite.",
            config_path.display()
        )
        .into());
    }

    ArautoConfig::create_default(&config_path, &store_path)?;

    println!("✅ Created configuration at: {}", config_path.display());
    println!("   WhatsApp store: {}", store_path.display());
    println!();
    println!("Edit the file to point at your contact database, then run 'arauto preview'.");

    Ok(())
}
