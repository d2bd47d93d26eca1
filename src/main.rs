mod backend;
mod cli;
mod commands;
mod config;
mod console;
mod context;
mod env;
mod error;
mod gather;
mod kubectl;
mod namespaces;
mod output;
mod report;
mod resources;
#[cfg(test)]
mod testing;
mod util;
mod validation;

use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use anyhow::{Context as _, Result, anyhow};
use chrono::Utc;
use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use crate::cli::{Cli, Commands, GatherCommands, TestCommands, ValidateCommands};
use crate::commands::{Command, CommandFailed};
use crate::config::Config;
use crate::context::Context;
use crate::env::Env;
use crate::kubectl::{KubectlActions, KubectlBackend};
use crate::util::{ensure_directory, utc_compact_string};

fn main() {
    let cli = Cli::parse();

    if let Err(err) = run(cli) {
        error!(error = %err, "command failed");
        for cause in err.chain().skip(1) {
            error!(cause = %cause, "caused by");
        }
        if err.downcast_ref::<CommandFailed>().is_none() {
            console::error(&err.to_string());
        }
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    let name = cli.command.name();
    let output_dir = cli
        .output
        .unwrap_or_else(|| PathBuf::from(format!("report.{}", utc_compact_string(Utc::now()))));
    ensure_directory(&output_dir)?;
    init_tracing(&output_dir.join(format!("{name}.log")))?;

    info!(
        command = name,
        config = %cli.config.display(),
        output = %output_dir.display(),
        "starting command"
    );

    let config = Config::load(&cli.config)?;
    let env = Env::from_config(&config);
    let backend = Arc::new(KubectlBackend::new(env.clone(), config.namespaces()));
    let mut cmd = Command::new(
        name,
        config.clone(),
        backend,
        output_dir.clone(),
        Context::background(),
    );

    match cli.command {
        Commands::Gather(GatherCommands::Application(args)) => {
            commands::gather::application(&mut cmd, &args.name, &args.namespace)
        }
        Commands::Validate(ValidateCommands::Clusters) => commands::validate::clusters(&mut cmd),
        Commands::Validate(ValidateCommands::Application(args)) => {
            commands::validate::application(&mut cmd, &args.name, &args.namespace)
        }
        Commands::Test(TestCommands::Run) => {
            let actions = KubectlActions::new(&config, env, output_dir.join("workloads"));
            commands::test::run(&mut cmd, &actions)
        }
        Commands::Test(TestCommands::Clean) => {
            let actions = KubectlActions::new(&config, env, output_dir.join("workloads"));
            commands::test::clean(&mut cmd, &actions)
        }
    }
}

fn init_tracing(log_path: &Path) -> Result<()> {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let log_file = File::create(log_path)
        .with_context(|| format!("failed to create log file {}", log_path.display()))?;

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_ansi(false)
        .with_writer(Mutex::new(log_file))
        .try_init()
        .map_err(|err| anyhow!("failed to initialize logging: {err}"))
}
