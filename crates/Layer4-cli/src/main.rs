//! Haul CLI - Main entry point

mod builtin;

use anyhow::Context;
use clap::{Parser, Subcommand};
use haul_core::{AddonManager, Host, PluginManager, PluginManagerConfig};
use haul_foundation::{ConfigStore, EventBus, JobScheduler};
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::debug;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Haul - plugin-driven link resolver
#[derive(Parser, Debug)]
#[command(name = "haul")]
#[command(author, version, about, long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Command,

    /// Config file (default: ~/.haul/config.toml)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// User plugin directory (default: ~/.haul/plugins)
    #[arg(short, long)]
    plugins: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Resolve URLs to hoster/crypter plugins
    Resolve {
        /// URLs to resolve
        #[arg(required = true)]
        urls: Vec<String>,
    },
    /// List addons with their state, services and info
    Addons,
}

fn haul_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".haul")
}

/// 설정 파일 로드 (없으면 빈 설정)
fn load_config(path: &Path, events: Arc<EventBus>) -> anyhow::Result<ConfigStore> {
    if !path.exists() {
        debug!("Config file {:?} not found, using defaults", path);
        return Ok(ConfigStore::new(events));
    }
    ConfigStore::load_file(path, events)
        .with_context(|| format!("failed to load config {}", path.display()))
}

/// `[plugins]` 테이블을 PluginManagerConfig로 변환
fn plugin_config(config: &ConfigStore) -> anyhow::Result<PluginManagerConfig> {
    match config.section("plugins") {
        Some(section) => serde_json::from_value(Value::Object(section))
            .context("invalid [plugins] section"),
        None => Ok(PluginManagerConfig::default()),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Initialize logging
    let log_level = if args.debug { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level)),
        )
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();

    let events = Arc::new(EventBus::new());
    let config_path = args
        .config
        .clone()
        .unwrap_or_else(|| haul_dir().join("config.toml"));
    let config = Arc::new(load_config(&config_path, events)?);

    let mut manager_config = plugin_config(&config)?;
    if let Some(dir) = args.plugins {
        manager_config.user_plugin_dir = Some(dir);
    } else if manager_config.user_plugin_dir.is_none() {
        manager_config.user_plugin_dir = Some(haul_dir().join("plugins"));
    }

    let plugins = Arc::new(
        PluginManager::discover(
            manager_config,
            Arc::new(builtin::source()),
            Arc::new(builtin::catalog()),
        )
        .await?,
    );

    match args.command {
        Command::Resolve { urls } => resolve_cmd(&plugins, &urls),
        Command::Addons => addons_cmd(config, plugins),
    }
}

fn resolve_cmd(plugins: &PluginManager, urls: &[String]) -> anyhow::Result<()> {
    let urls: Vec<&str> = urls.iter().map(String::as_str).collect();
    let parsed = plugins.parse_url_strs(&urls);

    println!("Hoster ({}):", parsed.hoster.len());
    for (url, plugin) in &parsed.hoster {
        println!("  {:<20} {}", plugin, url);
    }
    println!("Crypter ({}):", parsed.crypter.len());
    for (url, plugin) in &parsed.crypter {
        println!("  {:<20} {}", plugin, url);
    }
    Ok(())
}

fn addons_cmd(config: Arc<ConfigStore>, plugins: Arc<PluginManager>) -> anyhow::Result<()> {
    let host = Arc::new(Host::with_parts(
        config,
        Arc::new(JobScheduler::new()),
        Arc::clone(&plugins),
    ));
    let manager = AddonManager::new(host);
    manager.build_index();
    manager.activate_addons();

    let summaries = manager.iter_addons();
    if summaries.is_empty() {
        println!("No addons found.");
    }

    for summary in summaries {
        let state = if summary.internal {
            "internal"
        } else if summary.active {
            "active"
        } else {
            "inactive"
        };
        println!(
            "{} [{}] ({})",
            summary.name,
            plugins.get_category(&summary.name),
            state
        );
        for service in &summary.services {
            println!("  service: {}", service);
        }
        for property in manager.get_info(&summary.name) {
            let value = property.value.unwrap_or(Value::Null);
            println!("  info: {} = {}", property.name, value);
        }
    }

    manager.deactivate_addons();
    Ok(())
}
