//! Access token commands.

use anyhow::{bail, Result};
use clap::{Args, Subcommand};
use corehub_core::account;
use corehub_core::config::CoreConfig;
use corehub_web::auth::AuthKeys;

#[derive(Subcommand)]
pub enum TokenCommands {
    /// Print a bearer token for an account
    Issue(IssueArgs),
}

#[derive(Args)]
pub struct IssueArgs {
    #[arg(long, required_unless_present = "email")]
    pub user_id: Option<String>,

    #[arg(long, conflicts_with = "user_id")]
    pub email: Option<String>,
}

pub async fn execute(cmd: TokenCommands, config: &CoreConfig) -> Result<()> {
    match cmd {
        TokenCommands::Issue(args) => issue(args, config).await,
    }
}

async fn issue(args: IssueArgs, config: &CoreConfig) -> Result<()> {
    let pool = super::connect(config).await?;
    let user = match (args.user_id, args.email) {
        (Some(id), _) => account::get_user_unchecked(&pool, &id).await?,
        (None, Some(email)) => match account::find_user_by_email(&pool, &email).await? {
            Some(user) => user,
            None => bail!("No account with email {}", email),
        },
        (None, None) => bail!("Pass --user-id or --email"),
    };
    if !user.is_active {
        bail!("Account {} is inactive", user.id);
    }

    let keys = AuthKeys::new(&config.auth.jwt_secret, config.auth.token_ttl_hours);
    println!("{}", keys.issue(&user)?);
    Ok(())
}
