//! Small text helpers shared by the domain modules.

use regex::Regex;
use std::sync::LazyLock;

static EMAIL: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").ok());

static PHONE: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"^\+?[0-9][0-9 ()\-]{5,19}$").ok());

/// Lowercase ASCII slug; runs of other characters collapse to one separator.
pub(crate) fn slugify(input: &str, separator: char) -> String {
    let mut slug = String::with_capacity(input.len());
    let mut pending = false;
    for c in input.chars() {
        if c.is_ascii_alphanumeric() {
            if pending && !slug.is_empty() {
                slug.push(separator);
            }
            pending = false;
            slug.push(c.to_ascii_lowercase());
        } else {
            pending = true;
        }
    }
    slug
}

pub(crate) fn is_valid_email(value: &str) -> bool {
    EMAIL.as_ref().is_some_and(|re| re.is_match(value.trim()))
}

pub(crate) fn is_valid_phone(value: &str) -> bool {
    PHONE.as_ref().is_some_and(|re| re.is_match(value.trim()))
}

/// RFC 3339 timestamp for `created_at`/`updated_at` fields.
pub(crate) fn now_rfc3339() -> String {
    chrono::Utc::now().to_rfc3339()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slugify() {
        assert_eq!(slugify("Passport", '_'), "passport");
        assert_eq!(slugify("  IELTS / TOEFL Score!! ", '_'), "ielts_toefl_score");
        assert_eq!(slugify("Acme Study Abroad", '-'), "acme-study-abroad");
        assert_eq!(slugify("***", '_'), "");
    }

    #[test]
    fn test_email_and_phone() {
        assert!(is_valid_email("asha@example.com"));
        assert!(!is_valid_email("asha@example"));
        assert!(!is_valid_email("as ha@example.com"));
        assert!(is_valid_phone("+91 98765-43210"));
        assert!(!is_valid_phone("call me"));
    }
}
