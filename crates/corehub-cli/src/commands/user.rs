//! Account bootstrap commands.

use anyhow::{bail, Result};
use clap::{Args, Subcommand};
use colored::Colorize;
use corehub_core::access::Role;
use corehub_core::account::{self, model::NewUser};
use corehub_core::config::CoreConfig;

#[derive(Subcommand)]
pub enum UserCommands {
    /// Create an account without an authenticated caller
    Create(CreateArgs),
}

#[derive(Args)]
pub struct CreateArgs {
    /// SUPER_ADMIN, ADMIN, OPS, COUNSELOR or STUDENT
    #[arg(long)]
    pub role: String,

    #[arg(long)]
    pub name: String,

    #[arg(long)]
    pub email: String,

    #[arg(long)]
    pub phone: Option<String>,

    /// Owning admin (staff and students)
    #[arg(long)]
    pub admin_id: Option<String>,

    /// Owning super-admin (admins)
    #[arg(long)]
    pub super_admin_id: Option<String>,

    /// Enquiry page slug (admins)
    #[arg(long)]
    pub slug: Option<String>,

    /// Company name (admins)
    #[arg(long)]
    pub company: Option<String>,
}

pub async fn execute(cmd: UserCommands, config: &CoreConfig) -> Result<()> {
    match cmd {
        UserCommands::Create(args) => create(args, config).await,
    }
}

async fn create(args: CreateArgs, config: &CoreConfig) -> Result<()> {
    let Some(role) = Role::parse(&args.role) else {
        bail!("Unknown role '{}'", args.role);
    };
    if role == Role::Student {
        bail!("Students are created by their admin through the API");
    }

    let pool = super::connect(config).await?;
    let user = account::register_user(
        &pool,
        NewUser {
            role,
            name: args.name,
            email: args.email,
            phone: args.phone,
            admin_id: args.admin_id,
            super_admin_id: args.super_admin_id,
            company_name: args.company,
            enquiry_slug: args.slug,
        },
    )
    .await?;

    println!("{} Created {} {}", "✓".green(), role.as_str().cyan(), user.email.bold());
    crate::output::print_user(&user);
    Ok(())
}
