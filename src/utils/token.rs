use chrono::{Datelike, Utc};
use rand::{distributions::Alphanumeric, thread_rng, Rng};

pub fn generate_access_token(length: usize) -> String {
    thread_rng()
        .sample_iter(&Alphanumeric)
        .take(length)
        .map(char::from)
        .collect()
}

/// Public credential identifier: `CERT-YYYY-XXXXXXXX` where the suffix is
/// 8 uppercase alphanumerics. Stamped with the issuing year.
pub fn generate_credential_id() -> String {
    let suffix: String = thread_rng()
        .sample_iter(&Alphanumeric)
        .map(char::from)
        .filter(|c| c.is_ascii_digit() || c.is_ascii_uppercase())
        .take(8)
        .collect();
    format!("CERT-{}-{}", Utc::now().year(), suffix)
}

/// Credential ids are checked against this shape before any database read.
pub fn is_valid_credential_id(id: &str) -> bool {
    let mut parts = id.splitn(3, '-');
    let (Some(prefix), Some(year), Some(suffix)) = (parts.next(), parts.next(), parts.next())
    else {
        return false;
    };
    prefix == "CERT"
        && year.len() == 4
        && year.bytes().all(|b| b.is_ascii_digit())
        && suffix.len() == 8
        && suffix
            .bytes()
            .all(|b| b.is_ascii_digit() || b.is_ascii_uppercase())
}

pub fn generate_temporary_password() -> String {
    generate_access_token(12)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_credential_ids_are_valid() {
        for _ in 0..50 {
            let id = generate_credential_id();
            assert!(is_valid_credential_id(&id), "bad id: {}", id);
        }
    }

    #[test]
    fn credential_format_rejects_malformed_ids() {
        assert!(is_valid_credential_id("CERT-2026-A1B2C3D4"));
        assert!(!is_valid_credential_id("CERT-2026-a1b2c3d4"));
        assert!(!is_valid_credential_id("CERT-26-A1B2C3D4"));
        assert!(!is_valid_credential_id("CERT-2026-A1B2C3D"));
        assert!(!is_valid_credential_id("CERT-2026-A1B2C3D45"));
        assert!(!is_valid_credential_id("BADGE-2026-A1B2C3D4"));
        assert!(!is_valid_credential_id("CERT-2026-A1B2-3D4"));
        assert!(!is_valid_credential_id(""));
    }

    #[test]
    fn access_tokens_have_requested_length() {
        assert_eq!(generate_access_token(32).len(), 32);
    }
}
