use regex::Regex;
use lazy_static::lazy_static;
use sha2::{Sha256, Digest};
use base64::{Engine as _, engine::general_purpose};

lazy_static! {
    static ref JWT_REGEX: Regex = Regex::new(r"\beyJ[A-Za-z0-9_-]+\.[A-Za-z0-9_-]+\.[A-Za-z0-9_-]*").expect("jwt pattern is valid");
    static ref BEARER_REGEX: Regex = Regex::new(r"(?i)\bbearer\s+[A-Za-z0-9._~+/=-]+").expect("bearer pattern is valid");
    static ref EMAIL_REGEX: Regex = Regex::new(r"\b[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}\b").expect("email pattern is valid");
    static ref IP_REGEX: Regex = Regex::new(r"\b(?:[0-9]{1,3}\.){3}[0-9]{1,3}\b").expect("ip pattern is valid");
    static ref PHONE_REGEX: Regex = Regex::new(r"\+?\(?\b\d{2,4}\)?[-.\s]?\d{3,4}[-.\s]?\d{3,6}\b").expect("phone pattern is valid");
}

const TOKEN_PLACEHOLDER: &str = "[REDACTED_TOKEN]";

/// PII redaction configuration
#[derive(Debug, Clone)]
pub struct RedactionConfig {
    pub redact_tokens: bool,
    pub redact_emails: bool,
    pub redact_phones: bool,
    pub redact_ip_addresses: bool,
    pub hash_for_correlation: bool,
    pub custom_patterns: Vec<(Regex, String)>,
}

impl Default for RedactionConfig {
    fn default() -> Self {
        Self {
            redact_tokens: true,
            redact_emails: true,
            redact_phones: true,
            redact_ip_addresses: true,
            hash_for_correlation: true,
            custom_patterns: Vec::new(),
        }
    }
}

/// PII redactor for log fields and messages.
///
/// Tokens are always dropped entirely; emails, phones and IP addresses are
/// either masked or replaced with a short hash so denials from the same
/// caller can still be correlated.
#[derive(Debug, Clone, Default)]
pub struct PiiRedactor {
    config: RedactionConfig,
}

impl PiiRedactor {
    pub fn new(config: RedactionConfig) -> Self {
        Self { config }
    }

    pub fn redact(&self, text: &str) -> String {
        let mut result = text.to_string();

        // Tokens go first, their base64 segments would otherwise feed the other patterns
        if self.config.redact_tokens {
            result = BEARER_REGEX.replace_all(&result, TOKEN_PLACEHOLDER).to_string();
            result = JWT_REGEX.replace_all(&result, TOKEN_PLACEHOLDER).to_string();
        }

        if self.config.redact_emails {
            result = self.redact_emails(&result);
        }

        if self.config.redact_ip_addresses {
            result = self.redact_ip_addresses(&result);
        }

        if self.config.redact_phones {
            result = self.redact_phones(&result);
        }

        for (pattern, replacement) in &self.config.custom_patterns {
            result = pattern.replace_all(&result, replacement.as_str()).to_string();
        }

        result
    }

    fn redact_emails(&self, text: &str) -> String {
        EMAIL_REGEX.replace_all(text, |caps: &regex::Captures| {
            let email = caps.get(0).map_or("", |m| m.as_str());
            if self.config.hash_for_correlation {
                format!("EMAIL[{}]", self.hash_value(email))
            } else {
                match email.split_once('@') {
                    Some((local, domain)) => format!(
                        "{}***@{}***",
                        local.chars().next().unwrap_or('*'),
                        domain.chars().next().unwrap_or('*'),
                    ),
                    None => "***@***".to_string(),
                }
            }
        }).to_string()
    }

    fn redact_phones(&self, text: &str) -> String {
        PHONE_REGEX.replace_all(text, |caps: &regex::Captures| {
            let phone = caps.get(0).map_or("", |m| m.as_str());
            if self.config.hash_for_correlation {
                format!("PHONE[{}]", self.hash_value(phone))
            } else {
                mask_all_but_last(phone, 2)
            }
        }).to_string()
    }

    fn redact_ip_addresses(&self, text: &str) -> String {
        IP_REGEX.replace_all(text, |caps: &regex::Captures| {
            let ip = caps.get(0).map_or("", |m| m.as_str());
            if self.config.hash_for_correlation {
                format!("IP[{}]", self.hash_value(ip))
            } else {
                let parts: Vec<&str> = ip.split('.').collect();
                match (parts.first(), parts.last()) {
                    (Some(first), Some(last)) if parts.len() == 4 => {
                        format!("{first}.***.***.{last}")
                    }
                    _ => "***.***.***.***".to_string(),
                }
            }
        }).to_string()
    }

    fn hash_value(&self, value: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(value.as_bytes());
        let result = hasher.finalize();
        // First 8 bytes keep the hash short while staying collision-resistant enough for logs
        general_purpose::STANDARD_NO_PAD.encode(result.get(..8).unwrap_or_default())
    }
}

fn mask_all_but_last(value: &str, keep: usize) -> String {
    let digits = value.chars().filter(char::is_ascii_digit).count();
    let mut seen = 0;
    value
        .chars()
        .map(|c| {
            if c.is_ascii_digit() {
                seen += 1;
                if seen + keep > digits { c } else { '*' }
            } else {
                c
            }
        })
        .collect()
}
