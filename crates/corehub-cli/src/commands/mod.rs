//! CLI command definitions and handlers.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use corehub_core::config::CoreConfig;
use std::path::PathBuf;
use std::sync::Arc;

pub mod seed;
pub mod serve;
pub mod token;
pub mod user;

/// CORE - student services platform API
#[derive(Parser)]
#[command(name = "corehub")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// TOML configuration file
    #[arg(short, long, global = true, env = "CORE_CONFIG")]
    pub config: Option<PathBuf>,

    /// Redis connection URL (overrides the configuration file)
    #[arg(long, global = true, env = "REDIS_URL")]
    pub redis_url: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the REST API server
    Serve(serve::ServeArgs),

    /// Create the default services and install the bundled form
    Seed,

    /// Manage user accounts
    #[command(subcommand)]
    User(user::UserCommands),

    /// Issue access tokens
    #[command(subcommand)]
    Token(token::TokenCommands),
}

impl Cli {
    pub async fn execute(self) -> Result<()> {
        let mut config = CoreConfig::load(self.config.as_deref())
            .with_context(|| "Failed to load configuration")?;
        if let Some(url) = self.redis_url {
            config.redis_url = url;
        }

        match self.command {
            Commands::Serve(args) => serve::execute(args, config).await,
            Commands::Seed => seed::execute(&config).await,
            Commands::User(cmd) => user::execute(cmd, &config).await,
            Commands::Token(cmd) => token::execute(cmd, &config).await,
        }
    }
}

/// Connect to Redis with the configured URL.
pub(crate) async fn connect(config: &CoreConfig) -> Result<Arc<corehub_core::DbPool>> {
    let pool = corehub_redis::init_pool(&config.redis_url)
        .await
        .with_context(|| format!("Failed to connect to Redis at {}", config.redis_url))?;
    Ok(Arc::new(pool))
}
