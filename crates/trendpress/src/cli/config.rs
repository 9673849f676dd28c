//! `trendpress config` - show the effective configuration

use anyhow::{Context, Result};
use serde::Serialize;
use std::path::PathBuf;
use trendpress::TrendpressConfig;

use crate::cli::output::print_json;
use crate::cli::CommandContext;

#[derive(Serialize)]
struct ConfigOutput<'a> {
    config_path: &'a PathBuf,
    config_file_exists: bool,
    home: &'a PathBuf,
    store: PathBuf,
    signals: PathBuf,
    history: PathBuf,
    settings: &'a TrendpressConfig,
}

pub fn run(json: bool, ctx: &CommandContext) -> Result<()> {
    let paths = &ctx.config.paths;
    let output = ConfigOutput {
        config_path: &ctx.config_path,
        config_file_exists: ctx.config_path.exists(),
        home: &ctx.home,
        store: paths.store_path(&ctx.home),
        signals: paths.signals_path(&ctx.home),
        history: paths.history_path(&ctx.home),
        settings: &ctx.config,
    };

    if json {
        return print_json(&output);
    }

    let source = if output.config_file_exists { "" } else { " (not found, using defaults)" };
    println!("Config file: {}{}", output.config_path.display(), source);
    println!("Home:        {}", output.home.display());
    println!("Store:       {}", output.store.display());
    println!("Signals:     {}", output.signals.display());
    println!("History:     {}", output.history.display());
    println!();

    let rendered = toml::to_string_pretty(&ctx.config).context("Failed to render configuration")?;
    print!("{}", rendered);
    Ok(())
}
