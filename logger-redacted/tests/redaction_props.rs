use logger_redacted::PiiRedactor;
use proptest::prelude::*;

proptest! {
    #[test]
    fn phone_numbers_never_survive(suffix in "[0-9]{9}") {
        let phone = format!("+8801{suffix}");
        let redacted = PiiRedactor::default().redact(&format!("login failed for {phone}"));
        prop_assert!(!redacted.contains(&phone), "{}", redacted);
        prop_assert!(redacted.starts_with("login failed for "));
    }

    #[test]
    fn ipv4_addresses_never_survive(a in 1u8..=254, b in 0u8..=255, c in 0u8..=255, d in 1u8..=254) {
        let ip = format!("{a}.{b}.{c}.{d}");
        let redacted = PiiRedactor::default().redact(&format!("auth:{ip}"));
        prop_assert!(!redacted.contains(&ip), "{}", redacted);
    }

    #[test]
    fn bearer_values_are_dropped(token in "[A-Za-z0-9_-]{16,64}") {
        let redacted = PiiRedactor::default().redact(&format!("authorization: Bearer {token}"));
        prop_assert!(!redacted.contains(&token), "{}", redacted);
        prop_assert!(redacted.contains("[REDACTED_TOKEN]"));
    }

    #[test]
    fn correlation_hash_is_deterministic(local in "[a-z]{3,12}") {
        let email = format!("{local}@carenet.example");
        let redactor = PiiRedactor::default();
        prop_assert_eq!(redactor.redact(&email), redactor.redact(&email));
    }
}
