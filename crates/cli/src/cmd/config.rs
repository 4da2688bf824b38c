//! Show configuration
//!
//! Prints the config file, its location, or an example to start from.

use anybakup::system_config;
use anyhow::{Context, Result};
use owo_colors::OwoColorize;

/// List all configuration values
pub fn run_list() -> Result<()> {
    let config = system_config::load()?;
    let config_path =
        system_config::config_file_path().context("Could not determine config file path")?;

    println!("{}", "System Configuration".bold());
    println!("{}: {}\n", "Location".dimmed(), config_path.display().dimmed());

    println!(
        "{} = {}",
        "default".cyan(),
        config.default.as_deref().unwrap_or(system_config::DEFAULT_PROFILE)
    );

    println!("\n{}", "[author]".yellow());
    println!("  {} = {}", "name".cyan(), config.author.name);
    println!("  {} = {}", "email".cyan(), config.author.email);

    if config.profile.is_empty() {
        println!("\n{}", "No profiles. Run 'abk init <dir>' to create one.".dimmed());
    }
    for (name, profile) in &config.profile {
        println!("\n{}", format!("[profile.{}]", name).yellow());
        println!("  {} = {}", "repodir".cyan(), profile.repodir.display());
    }

    Ok(())
}

/// Show the config file path
pub fn run_path() -> Result<()> {
    let config_path =
        system_config::config_file_path().context("Could not determine config file path")?;

    println!("{}", config_path.display());
    if !config_path.exists() && system_config::init_if_missing()? {
        println!("{} Created config file with defaults", "✓".green());
    }

    Ok(())
}

/// Show example configuration
pub fn run_example() -> Result<()> {
    println!("{}", system_config::example_config());
    Ok(())
}
