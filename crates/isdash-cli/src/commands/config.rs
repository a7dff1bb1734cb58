use anyhow::{Context, Result};
use isdash_infrastructure::ConfigService;

pub fn show() -> Result<()> {
    let service = ConfigService::default();
    let path = service.config_path()?;
    let config = service.get_config()?;

    println!("# {}", path.display());
    print!(
        "{}",
        toml::to_string_pretty(&config).context("Failed to render configuration")?
    );
    Ok(())
}
