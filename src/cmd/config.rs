//! Configuration view and validation commands: `reflector config`.

use anyhow::Result;
use std::path::PathBuf;

use reflector::config::{CONFIG_FILE_NAME, CliOverrides, ReflectorConfig, ReflectorToml};

use super::super::{Cli, ConfigCommands};

fn print_toml(toml: &ReflectorToml) {
    println!("[storage]");
    println!("  log_dir = \"{}\"", toml.storage.log_dir.display());
    println!("  compact_after = {}", toml.storage.compact_after);
    println!();

    println!("[backend]");
    println!("  kind = \"{}\"", toml.backend.kind);
    if let Some(model) = &toml.backend.model {
        println!("  model = \"{}\"", model);
    }
    if let Some(command) = &toml.backend.command {
        println!("  command = \"{}\"", command);
    }
    if !toml.backend.args.is_empty() {
        println!("  args = {:?}", toml.backend.args);
    }
    println!("  thinking = {}", toml.backend.thinking);
    println!("  prompt_as_arg = {}", toml.backend.prompt_as_arg);
    if let Some(seed) = toml.backend.seed {
        println!("  seed = {}", seed);
    }
    println!();

    if toml.generation.max_tokens.is_some() || toml.generation.temperature.is_some() {
        println!("[generation]");
        if let Some(max_tokens) = toml.generation.max_tokens {
            println!("  max_tokens = {}", max_tokens);
        }
        if let Some(temperature) = toml.generation.temperature {
            println!("  temperature = {}", temperature);
        }
        println!();
    }

    println!("[explore]");
    if let Some(seed) = toml.explore.seed {
        println!("  seed = {}", seed);
    }
    println!("  max_explorations = {}", toml.explore.max_explorations);
    println!("  recent_limit = {}", toml.explore.recent_limit);
    println!("  per_entry = {}", toml.explore.per_entry);
    println!();
}

pub fn cmd_config(cli: &Cli, command: Option<ConfigCommands>) -> Result<()> {
    let config_path = cli
        .config
        .clone()
        .unwrap_or_else(|| PathBuf::from(CONFIG_FILE_NAME));

    match command {
        None | Some(ConfigCommands::Show) => {
            println!();
            println!("Reflector Configuration");
            println!("=======================");
            println!();

            if config_path.exists() {
                println!("Config file: {}", config_path.display());
                println!();
                print_toml(&ReflectorToml::load(&config_path)?);
            } else {
                println!("No {} found at {}", CONFIG_FILE_NAME, config_path.display());
                println!();
                println!("Using default configuration:");
                print_toml(&ReflectorToml::default());
                println!("Run 'reflector config init' to create a {} file.", CONFIG_FILE_NAME);
                println!();
            }

            // Show effective values (including env overrides)
            let overrides = CliOverrides {
                log_dir: cli.log_dir.clone(),
                backend: cli.backend.clone(),
                model: cli.model.clone(),
            };
            let config = ReflectorConfig::resolve(cli.config.as_deref(), &overrides)?;
            println!("Effective values (with env/CLI overrides):");
            println!("  log_dir = \"{}\"", config.log_dir().display());
            println!("  backend = \"{}\"", config.backend().kind);
            if let Some(model) = &config.backend().model {
                println!("  model = \"{}\"", model);
            }
            if let Some(command) = &config.backend().command {
                println!("  command = \"{}\"", command);
            }
            println!();
        }
        Some(ConfigCommands::Validate) => {
            println!();
            println!("Validating configuration...");
            println!();

            if !config_path.exists() {
                println!("No {} found. Using defaults (valid).", CONFIG_FILE_NAME);
                return Ok(());
            }

            let toml = ReflectorToml::load(&config_path)?;
            let warnings = toml.validate();

            if warnings.is_empty() {
                println!("Configuration is valid.");
            } else {
                println!("Configuration warnings:");
                for warning in warnings {
                    println!("  - {}", warning);
                }
            }
            println!();
        }
        Some(ConfigCommands::Init) => {
            if config_path.exists() {
                println!("{} already exists at {}", CONFIG_FILE_NAME, config_path.display());
                println!("Delete it first if you want to recreate it.");
                return Ok(());
            }

            if let Some(parent) = config_path.parent()
                && !parent.as_os_str().is_empty()
                && !parent.exists()
            {
                std::fs::create_dir_all(parent)?;
            }

            let toml = ReflectorToml::default();
            toml.save(&config_path)?;

            println!("Created {} at {}", CONFIG_FILE_NAME, config_path.display());
            println!();
            println!("You can now customize:");
            println!("  - [storage] log_dir, compact_after");
            println!("  - [backend] kind, model, command, args, thinking");
            println!("  - [generation] max_tokens, temperature");
            println!("  - [explore] seed, max_explorations, recent_limit, per_entry");
            println!();
        }
    }

    Ok(())
}
