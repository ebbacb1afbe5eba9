use std::io::{self, Write};

use clap::{Args, Subcommand};

use crate::config::{
    AppConfig, StoredConfig, check_page_size, check_schema_version, config_file_path,
};
use crate::error::AppResult;

#[derive(Args, Debug, Clone)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Subcommand, Debug, Clone)]
pub enum ConfigCommand {
    /// Run the interactive configuration wizard.
    Init,
    /// Show the stored and effective configuration.
    Show,
}

pub fn run(command: ConfigCommand) -> AppResult<()> {
    match command {
        ConfigCommand::Init => run_init(),
        ConfigCommand::Show => run_show(),
    }
}

fn run_init() -> AppResult<()> {
    let mut cfg = StoredConfig::load()?;

    println!("Configuring helpdesk.");
    println!("Press Enter to keep the current value, '-' to clear it.");
    println!();

    apply_prompt("Data directory", &mut cfg.data_dir, any_value)?;
    apply_prompt("Database name", &mut cfg.database, any_value)?;
    apply_prompt("Object store name", &mut cfg.store, any_value)?;
    apply_prompt("Schema version", &mut cfg.schema_version, check_schema_version)?;
    apply_prompt("Rows per page", &mut cfg.page_size, check_page_size)?;

    let path = config_file_path()?;
    let config_dir = path
        .parent()
        .map(|dir| dir.to_path_buf())
        .unwrap_or_default();
    // Saved values must resolve on the next load.
    AppConfig::resolve(config_dir, cfg.clone())?;
    cfg.save()?;

    println!("\nConfiguration saved to {}", path.display());
    Ok(())
}

fn run_show() -> AppResult<()> {
    let cfg = StoredConfig::load()?;
    let path = config_file_path()?;
    let effective = AppConfig::load()?;

    println!("Configuration file: {}", path.display());
    println!("Data directory: {}", display_value(&cfg.data_dir));
    println!("Database name: {}", display_value(&cfg.database));
    println!("Object store name: {}", display_value(&cfg.store));
    println!("Schema version: {}", display_value(&cfg.schema_version));
    println!("Rows per page: {}", display_value(&cfg.page_size));
    println!();
    println!("Effective database file: {}", effective.database_path().display());
    println!(
        "Effective store: {} (version {}), {} rows per page",
        effective.store, effective.schema_version, effective.page_size
    );

    Ok(())
}

type Check = fn(&str) -> AppResult<()>;

/// Asks again until the answer passes `check`.
fn apply_prompt(field: &str, target: &mut Option<String>, check: Check) -> AppResult<()> {
    loop {
        let action = prompt(field, target.as_deref())?;
        match apply_action(target, action, check) {
            Ok(()) => return Ok(()),
            Err(err) => println!("{err}"),
        }
    }
}

fn apply_action(target: &mut Option<String>, action: PromptAction, check: Check) -> AppResult<()> {
    match action {
        PromptAction::Keep => {}
        PromptAction::Clear => *target = None,
        PromptAction::Set(value) => {
            check(&value)?;
            *target = Some(value);
        }
    }
    Ok(())
}

fn any_value(_: &str) -> AppResult<()> {
    Ok(())
}

fn prompt(field: &str, current: Option<&str>) -> AppResult<PromptAction> {
    let mut stdout = io::stdout();

    match current {
        Some(value) => write!(stdout, "{field} [{value}] (Enter to keep, '-' to clear): ")?,
        None => write!(stdout, "{field} (Enter to use the default): ")?,
    }
    stdout.flush()?;

    let mut input = String::new();
    io::stdin().read_line(&mut input)?;
    let trimmed = input.trim();

    if trimmed.is_empty() {
        Ok(PromptAction::Keep)
    } else if trimmed == "-" {
        Ok(PromptAction::Clear)
    } else {
        Ok(PromptAction::Set(trimmed.to_string()))
    }
}

fn display_value(value: &Option<String>) -> String {
    value
        .as_deref()
        .filter(|v| !v.is_empty())
        .map(|v| v.to_string())
        .unwrap_or_else(|| "<default>".to_string())
}

enum PromptAction {
    Keep,
    Clear,
    Set(String),
}
