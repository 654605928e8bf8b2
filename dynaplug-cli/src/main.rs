//! Dynaplug CLI

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use dynaplug_api::ExecutionContext;
use dynaplug_runtime::{
    load_config, LoadedPlugin, Manager, PluginManager, RuntimeConfig, ValidationOutcome,
    PLUGIN_DIR_ENV,
};
use std::path::PathBuf;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "dynaplug")]
#[command(about = "Load and run dynaplug plugin modules", long_about = None)]
#[command(version)]
struct Cli {
    /// Path to configuration file (yaml, toml or json)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Plugin base directory
    #[arg(short, long, global = true, env = PLUGIN_DIR_ENV)]
    plugin_dir: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, global = true, default_value = "info")]
    log_level: String,

    /// Emit logs as JSON
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Load all plugins and run one of them
    Run {
        /// Plugin to run (defaults to the configured plugin)
        #[arg(long)]
        plugin: Option<String>,

        /// Value stored under the plugin's name before it runs
        #[arg(short, long, default_value = "Hello")]
        input: String,

        /// Execution timeout in milliseconds
        #[arg(long)]
        timeout_ms: Option<u64>,
    },

    /// Load all plugins and list the registered ones
    List,

    /// Validate plugin directories without loading them
    Validate,

    /// Show version information
    Version,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(&cli.log_level, cli.log_json)?;

    match cli.command {
        Commands::Run {
            ref plugin,
            ref input,
            timeout_ms,
        } => {
            let config = resolve_config(&cli)?;
            let name = plugin.clone().unwrap_or_else(|| config.plugin.clone());
            let input = input.clone();

            let output = tokio::task::spawn_blocking(move || -> Result<serde_json::Value> {
                let manager = PluginManager::from_config(&config)?;
                manager.load_plugins()?;

                let plugin = manager
                    .get_plugin(&name)
                    .with_context(|| format!("plugin '{name}' is not loaded"))?;

                let mut ctx = ExecutionContext::background();
                if let Some(ms) = timeout_ms {
                    ctx = ctx.with_timeout(Duration::from_millis(ms));
                }
                ctx.set_value(name.clone(), input);

                tracing::info!(plugin = %name, version = %plugin.version(), "Running plugin");
                plugin
                    .execute(&mut ctx)
                    .with_context(|| format!("plugin '{name}' failed"))?;

                let values: serde_json::Map<String, serde_json::Value> = ctx
                    .keys()
                    .filter_map(|key| {
                        ctx.get_value(key)
                            .map(|value| (key.to_string(), value.clone()))
                    })
                    .collect();
                for (key, value) in &values {
                    tracing::info!(plugin = %name, key = %key, value = %value, "Context value");
                }
                Ok(serde_json::Value::Object(values))
            })
            .await??;

            println!("{}", serde_json::to_string_pretty(&output)?);
            Ok(())
        }

        Commands::List => {
            let config = resolve_config(&cli)?;

            let plugins = tokio::task::spawn_blocking(move || -> Result<Vec<LoadedPlugin>> {
                let manager = PluginManager::from_config(&config)?;
                manager.load_plugins()?;

                Ok(manager
                    .plugin_names()
                    .iter()
                    .filter_map(|name| manager.get_plugin(name).ok())
                    .collect())
            })
            .await??;

            if plugins.is_empty() {
                println!("No plugins loaded");
            }
            for plugin in plugins {
                let path = plugin
                    .descriptor
                    .module_path()
                    .map(|path| path.display().to_string())
                    .unwrap_or_default();
                println!("{}\t{}\t{}", plugin.name(), plugin.version(), path);
            }
            Ok(())
        }

        Commands::Validate => {
            let config = resolve_config(&cli)?;

            let outcomes = tokio::task::spawn_blocking(move || -> Result<Vec<ValidationOutcome>> {
                Ok(PluginManager::from_config(&config)?.validate_plugins()?)
            })
            .await??;

            let mut failed = 0;
            for (path, outcome) in &outcomes {
                match outcome {
                    Ok(descriptor) => tracing::info!(
                        "✓ {} ({} {})",
                        path.display(),
                        descriptor.name,
                        descriptor.version
                    ),
                    Err(e) => {
                        failed += 1;
                        tracing::error!("✗ {}: {}", path.display(), e);
                    }
                }
            }

            tracing::info!(
                checked = outcomes.len(),
                failed,
                "Validation finished"
            );

            if failed > 0 {
                std::process::exit(1);
            }
            Ok(())
        }

        Commands::Version => {
            println!("Dynaplug");
            println!("Version: {}", env!("CARGO_PKG_VERSION"));
            println!("Plugin API: {}", dynaplug_api::API_VERSION);
            println!("Rust version: {}", env!("CARGO_PKG_RUST_VERSION"));
            Ok(())
        }
    }
}

fn resolve_config(cli: &Cli) -> Result<RuntimeConfig> {
    let mut config = match &cli.config {
        Some(path) => load_config(path)
            .with_context(|| format!("failed to load config {}", path.display()))?,
        None => {
            let mut config = RuntimeConfig::default();
            config.apply_env_overrides();
            config
        }
    };

    if let Some(dir) = &cli.plugin_dir {
        config.plugin_dir = dir.clone();
    }
    config.validate()?;

    tracing::debug!(
        plugin_dir = %config.plugin_dir.display(),
        metadata_file = %config.metadata_file,
        "Configuration resolved"
    );

    Ok(config)
}

fn init_tracing(level: &str, json: bool) -> Result<()> {
    let filter = match level.to_lowercase().as_str() {
        "trace" => tracing::Level::TRACE,
        "debug" => tracing::Level::DEBUG,
        "info" => tracing::Level::INFO,
        "warn" => tracing::Level::WARN,
        "error" => tracing::Level::ERROR,
        _ => tracing::Level::INFO,
    };

    let env_filter = tracing_subscriber::EnvFilter::from_default_env().add_directive(filter.into());

    if json {
        tracing_subscriber::registry()
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_target(false)
                    .with_writer(std::io::stderr),
            )
            .with(env_filter)
            .try_init()?;
    } else {
        tracing_subscriber::registry()
            .with(
                tracing_subscriber::fmt::layer()
                    .with_target(false)
                    .with_level(true)
                    .with_writer(std::io::stderr),
            )
            .with(env_filter)
            .try_init()?;
    }

    Ok(())
}
