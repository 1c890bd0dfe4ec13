//! codenat CLI application
//!
//! Drives the three pipeline stages: semantic-preserving transformation of
//! Java methods, infilling of the masked identifiers the transformation
//! leaves behind, and naturalness evaluation of the resulting programs.

use anyhow::{Context, Result};
use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::{Shell, generate};
use codenat_cli::exit::exit_code_for;
use codenat_common::{ConfigBuilder, DEFAULT_CONFIG_FILE, PipelineConfig};
use console::style;
use std::io;
use std::path::{Path, PathBuf};
use tracing::info;

mod commands;

use commands::{EvaluateCommand, InfillCommand, TransformCommand};

/// codenat - naturalness of semantic-preserving code transformations
#[derive(Parser)]
#[command(name = "codenat")]
#[command(about = "Transform, infill and score Java programs for naturalness")]
#[command(long_about = r#"
codenat measures how natural a semantic-preserving transformation of a Java
method looks to a language model.

Examples:
  # Apply rules 1, 4 and 7 to the methods listed in info.json
  codenat transform -i info.json -o out -r 1,4,7

  # Fill the masked identifiers with random names
  codenat infill -i out/rule_4 -o filled/rule_4 -f random

  # Fill them with the three best joint assignments of a masked model
  codenat infill -i out/rule_4 -o filled/rule_4 -f llm -k 3 --masked-command "python mlm_worker.py"

  # Score every filled program against its original
  codenat evaluate -i filled -m info.json -o results.txt --causal-command "python lm_worker.py" --tokenizer tokenizer.json
"#)]
#[command(version)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, value_name = "PATH", global = true)]
    config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, value_name = "LEVEL", global = true)]
    log_level: Option<String>,

    /// Generate shell completions
    #[arg(long, value_name = "SHELL")]
    completions: Option<Shell>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Apply transformation rules with the external tool
    Transform(TransformCommand),

    /// Replace masked identifiers with concrete names
    #[command(alias = "infilling")]
    Infill(InfillCommand),

    /// Score transformed programs against their originals
    #[command(alias = "evaluation")]
    Evaluate(EvaluateCommand),

    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Show the effective configuration
    Show,
    /// Show the configuration file path
    Path,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    if let Some(shell) = cli.completions {
        generate_completions(shell);
        return;
    }

    if let Err(e) = run(cli).await {
        eprintln!("{} {e:#}", style("error:").red().bold());
        std::process::exit(exit_code_for(&e));
    }
}

async fn run(cli: Cli) -> Result<()> {
    let (config, loaded_from) = load_configuration(&cli)?;
    setup_logging(&config);
    match &loaded_from {
        Some(path) => info!("Loaded configuration from {}", path.display()),
        None => info!("Using default configuration"),
    }

    match cli.command {
        Some(Commands::Transform(cmd)) => cmd.execute(&config).await,
        Some(Commands::Infill(cmd)) => cmd.execute(&config),
        Some(Commands::Evaluate(cmd)) => cmd.execute(&config),
        Some(Commands::Config { action }) => {
            handle_config_command(action, &config, cli.config.as_deref())
        }
        None => {
            Cli::command().print_help()?;
            Ok(())
        }
    }
}

fn config_path(cli_path: Option<&Path>) -> PathBuf {
    cli_path.map_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE), Path::to_path_buf)
}

/// Load the configuration file and layer command-line overrides on top.
///
/// An explicit `--config` must exist; the default `codenat.toml` is optional.
fn load_configuration(cli: &Cli) -> Result<(PipelineConfig, Option<PathBuf>)> {
    let path = config_path(cli.config.as_deref());
    let (builder, loaded_from) = if cli.config.is_some() || path.is_file() {
        let builder = ConfigBuilder::from_file(&path)
            .with_context(|| format!("Failed to load configuration from {}", path.display()))?;
        (builder, Some(path))
    } else {
        (ConfigBuilder::new(), None)
    };

    let mut builder = builder.log_level(cli.log_level.clone());
    builder = match &cli.command {
        Some(Commands::Transform(cmd)) => cmd.apply_overrides(builder),
        Some(Commands::Infill(cmd)) => cmd.apply_overrides(builder),
        Some(Commands::Evaluate(cmd)) => cmd.apply_overrides(builder),
        _ => builder,
    };
    let config = builder.build().context("Failed to build configuration")?;
    Ok((config, loaded_from))
}

/// Setup logging based on configuration. `RUST_LOG` wins over everything.
fn setup_logging(config: &PipelineConfig) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.logging.level));

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(io::stderr);

    match config.logging.format.as_str() {
        "json" => {
            subscriber.json().with_timer(tracing_subscriber::fmt::time::uptime()).init();
        }
        "compact" => {
            subscriber.compact().init();
        }
        _ => {
            subscriber.pretty().init();
        }
    }
}

/// Generate shell completions
fn generate_completions(shell: Shell) {
    let mut cmd = Cli::command();
    let name = cmd.get_name().to_string();
    generate(shell, &mut cmd, name, &mut io::stdout());
}

fn handle_config_command(
    action: ConfigAction,
    config: &PipelineConfig,
    cli_path: Option<&Path>,
) -> Result<()> {
    match action {
        ConfigAction::Show => {
            let text = config.to_toml().context("Failed to serialize configuration")?;
            println!("{text}");
        }
        ConfigAction::Path => {
            println!("{}", config_path(cli_path).display());
        }
    }
    Ok(())
}
