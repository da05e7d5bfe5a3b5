use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;
use tracing_subscriber::filter::{EnvFilter, LevelFilter};

mod config;
mod media;
mod server;
mod store;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the config file
    #[arg(short, long)]
    config: Option<String>,

    /// Override the listen port
    #[arg(short, long)]
    port: Option<u16>,
}

fn get_config_path(args: &Args) -> Option<String> {
    if let Some(path) = &args.config {
        return Some(path.clone());
    }

    if let Ok(path) = std::env::var("CONFIG_FILE") {
        return Some(path);
    }

    if let Ok(xdg_config_home) = std::env::var("XDG_CONFIG_HOME") {
        let config_path = format!("{}/ytgrab/config.toml", xdg_config_home);
        if std::path::Path::new(&config_path).exists() {
            return Some(config_path);
        }
    }

    if let Some(home) = dirs::home_dir() {
        let config_path = format!("{}/.config/ytgrab/config.toml", home.display());
        if std::path::Path::new(&config_path).exists() {
            return Some(config_path);
        }
    }

    None
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let mut config = if let Some(config_path) = get_config_path(&args) {
        config::Config::from_file(&config_path)
            .with_context(|| format!("Failed to load config from {}", config_path))?
    } else {
        config::Config::default()
    };
    config.apply_env_overrides();
    if let Some(port) = args.port {
        config.port = port;
    }

    let env_filter = EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy();

    if config.get_logging_format() == "json" {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(env_filter)
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(env_filter).init();
    }

    info!("Starting ytgrab...");

    server::run(config).await
}
