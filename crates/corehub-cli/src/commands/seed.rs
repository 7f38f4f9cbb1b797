//! Seed the default service catalogue.

use anyhow::Result;
use colored::Colorize;
use corehub_core::config::CoreConfig;
use corehub_core::form::{self, template::FormTemplate};
use corehub_core::service;
use corehub_core::CoreError;

pub async fn execute(config: &CoreConfig) -> Result<()> {
    let pool = super::connect(config).await?;
    let template = FormTemplate::bundled()?;

    let services = service::ensure_default_services(&pool).await?;
    for svc in &services {
        match form::install_template(&pool, &svc.id, &template).await {
            Ok(structure) => println!(
                "{} {} {}",
                "✓".green(),
                svc.name.bold(),
                format!("({} form parts installed)", structure.parts.len()).dimmed()
            ),
            Err(CoreError::Conflict(_)) => println!(
                "{} {} {}",
                "•".dimmed(),
                svc.name.bold(),
                "(form already present)".dimmed()
            ),
            Err(e) => return Err(e.into()),
        }
    }

    println!();
    crate::output::print_services_table(&services);
    Ok(())
}
