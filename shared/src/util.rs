//! Small helpers shared across crates

/// Normalize an email address for lookups and uniqueness checks
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}
