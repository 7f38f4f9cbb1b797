//! API server command.

use anyhow::Result;
use clap::Args;
use colored::Colorize;
use corehub_core::config::CoreConfig;
use corehub_web::state::AppState;
use std::path::PathBuf;

#[derive(Args)]
pub struct ServeArgs {
    /// Port to listen on
    #[arg(long, default_value = "3030", env = "CORE_PORT")]
    pub port: u16,

    /// Host to bind to
    #[arg(long, default_value = "127.0.0.1", env = "CORE_HOST")]
    pub host: String,

    /// Also write logs to a file
    #[arg(long)]
    pub log: bool,

    /// Log file path (with --log)
    #[arg(long)]
    pub log_file: Option<PathBuf>,
}

pub async fn execute(args: ServeArgs, config: CoreConfig) -> Result<()> {
    let pool = super::connect(&config).await?;
    let state = AppState::new(pool, &config);

    let status = |on: bool| if on { "configured".green() } else { "log only".yellow() };

    println!();
    println!("  {} {}", "CORE".cyan().bold(), "API Server".bold());
    println!();
    println!("  {}       http://{}:{}/api", "API".green(), args.host, args.port);
    println!("  {}    http://{}:{}/api/health", "Health".green(), args.host, args.port);
    println!("  {}     {}", "Redis".green(), config.redis_url);
    println!("  {}      {}", "Mail".green(), status(config.mail.is_configured()));
    println!(
        "  {}  {}",
        "Meetings".green(),
        if state.meetings.is_some() { "zoho".green() } else { "offline only".yellow() }
    );
    println!();
    println!("  {}", "Ctrl+C to stop".dimmed());
    println!();

    corehub_web::run_server(state, &args.host, args.port).await?;

    Ok(())
}
