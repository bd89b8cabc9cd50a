//! E-mail matching policy.
//!
//! Addresses are compared after trimming surrounding whitespace and
//! lowercasing the whole address (local part included). The same
//! normalization runs on save and on lookup, so a given input always
//! resolves to the same account.

/// Normalize an address into its lookup key. Blank input has no key.
pub fn normalize_email(email: &str) -> Option<String> {
    let trimmed = email.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_lowercase())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_case_and_whitespace_are_ignored() {
        assert_eq!(
            normalize_email(" Alice@Example.com\n").as_deref(),
            Some("alice@example.com")
        );
        assert_eq!(
            normalize_email("ALICE@EXAMPLE.COM"),
            normalize_email("alice@example.com")
        );
    }

    #[test]
    fn test_blank_has_no_key() {
        assert_eq!(normalize_email(""), None);
        assert_eq!(normalize_email("   "), None);
    }

    #[test]
    fn test_deterministic() {
        let a = normalize_email("Bob@Example.org");
        let b = normalize_email("Bob@Example.org");
        assert_eq!(a, b);
    }
}
