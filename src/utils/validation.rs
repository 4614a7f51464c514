use validator::ValidateEmail;

pub fn is_valid_email(email: &str) -> bool {
    email.validate_email()
}

/// Free-text fields from admin input: strip control characters, trim, and
/// truncate to `max_len` characters.
pub fn sanitize_text(input: &str, max_len: usize) -> String {
    input
        .chars()
        .filter(|c| !c.is_control())
        .collect::<String>()
        .trim()
        .chars()
        .take(max_len)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sanitize_strips_control_chars_and_trims() {
        assert_eq!(sanitize_text("  Éco\u{0}le du\tNord \n", 100), "École duNord");
    }

    #[test]
    fn sanitize_truncates_by_characters_not_bytes() {
        let long = "é".repeat(150);
        assert_eq!(sanitize_text(&long, 100).chars().count(), 100);
    }

    #[test]
    fn email_check() {
        assert!(is_valid_email("claire@example.fr"));
        assert!(!is_valid_email("pas-un-email"));
    }
}
