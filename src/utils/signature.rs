use hmac::{Hmac, Mac};
use sha2::Sha256;
use subtle::ConstantTimeEq;

type HmacSha256 = Hmac<Sha256>;

/// Seconds of clock skew tolerated between the gateway timestamp and ours.
const TIMESTAMP_TOLERANCE_SECS: i64 = 300;

/// Verifies a gateway webhook signature header of the form
/// `t=<unix seconds>,v1=<hex hmac>` where the MAC covers `"{t}.{body}"`.
/// Returns the signed timestamp on success.
pub fn verify_webhook_signature(
    header: &str,
    body: &[u8],
    secret: &str,
    now_unix: i64,
) -> Option<i64> {
    let mut timestamp: Option<i64> = None;
    let mut signature: Option<String> = None;
    for part in header.split(',') {
        let mut kv = part.trim().splitn(2, '=');
        match (kv.next(), kv.next()) {
            (Some("t"), Some(v)) => timestamp = v.parse().ok(),
            (Some("v1"), Some(v)) => signature = Some(v.to_string()),
            _ => {}
        }
    }
    let timestamp = timestamp?;
    let signature = signature?;

    if (now_unix - timestamp).abs() > TIMESTAMP_TOLERANCE_SECS {
        return None;
    }

    let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).ok()?;
    mac.update(timestamp.to_string().as_bytes());
    mac.update(b".");
    mac.update(body);
    let expected = hex::encode(mac.finalize().into_bytes());

    let ok: bool = expected
        .as_bytes()
        .ct_eq(signature.to_ascii_lowercase().as_bytes())
        .into();
    ok.then_some(timestamp)
}

/// Builds the signature header for a given payload. Tests and the gateway
/// simulator share this with the verifier.
pub fn sign_webhook_payload(body: &[u8], secret: &str, timestamp: i64) -> String {
    let mut mac =
        HmacSha256::new_from_slice(secret.as_bytes()).expect("hmac accepts any key length");
    mac.update(timestamp.to_string().as_bytes());
    mac.update(b".");
    mac.update(body);
    format!("t={},v1={}", timestamp, hex::encode(mac.finalize().into_bytes()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn valid_signature_round_trips() {
        let body = br#"{"id":"cs_test_1"}"#;
        let header = sign_webhook_payload(body, "whsec_test", 1_700_000_000);
        assert_eq!(
            verify_webhook_signature(&header, body, "whsec_test", 1_700_000_000),
            Some(1_700_000_000)
        );
    }

    #[test]
    fn tampered_body_is_rejected() {
        let header = sign_webhook_payload(b"{}", "whsec_test", 1_700_000_000);
        assert_eq!(
            verify_webhook_signature(&header, b"{ }", "whsec_test", 1_700_000_000),
            None
        );
    }

    #[test]
    fn wrong_secret_is_rejected() {
        let header = sign_webhook_payload(b"{}", "whsec_test", 1_700_000_000);
        assert_eq!(
            verify_webhook_signature(&header, b"{}", "whsec_other", 1_700_000_000),
            None
        );
    }

    #[test]
    fn stale_timestamp_is_rejected() {
        let header = sign_webhook_payload(b"{}", "whsec_test", 1_700_000_000);
        assert_eq!(
            verify_webhook_signature(&header, b"{}", "whsec_test", 1_700_000_000 + 301),
            None
        );
    }

    #[test]
    fn malformed_header_is_rejected() {
        assert_eq!(
            verify_webhook_signature("v1=abcd", b"{}", "whsec_test", 0),
            None
        );
        assert_eq!(verify_webhook_signature("", b"{}", "whsec_test", 0), None);
    }
}
