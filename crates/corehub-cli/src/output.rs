//! Terminal output formatting.

use colored::Colorize;
use corehub_core::account::model::User;
use corehub_core::service::Service;

/// Print one account.
pub fn print_user(user: &User) {
    println!("  {}: {}", "ID".bold(), user.id);
    println!("  {}: {}", "Name".bold(), user.name);
    println!("  {}: {}", "Role".bold(), user.role.as_str().cyan());
    if let Some(admin_id) = &user.admin_id {
        println!("  {}: {}", "Admin".bold(), admin_id);
    }
    if let Some(slug) = &user.enquiry_slug {
        println!("  {}: /api/enquiry/{}", "Enquiry".bold(), slug);
    }
}

/// Print services as a table.
pub fn print_services_table(services: &[Service]) {
    if services.is_empty() {
        println!("{}", "No services found.".dimmed());
        return;
    }

    println!("{:<38} {:<28} {:<24}", "ID", "Name", "Slug");
    println!("{}", "─".repeat(90));
    for service in services {
        println!(
            "{:<38} {:<28} {:<24}",
            service.id,
            truncate(&service.name, 26),
            service.slug.dimmed()
        );
    }
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let cut: String = s.chars().take(max.saturating_sub(1)).collect();
        format!("{}…", cut)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("Coaching", 26), "Coaching");
        assert_eq!(truncate("Ivy League Admission", 10), "Ivy Leagu…");
    }
}
