// Email grammar used by the bootstrap endpoint.
//
// Validation is all-or-nothing: callers learn that an address was rejected,
// never which rule rejected it.

use once_cell::sync::Lazy;
use regex::Regex;

/// Maximum accepted length of the trimmed address, in characters.
pub const MAX_EMAIL_LEN: usize = 254;

static EMAIL_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^[a-zA-Z0-9.!#$%&'*+/=?^_`{|}~-]+@[a-zA-Z0-9](?:[a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?(?:\.[a-zA-Z0-9](?:[a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?)*\.[a-zA-Z]{2,}$",
    )
    .expect("email pattern is a valid regex")
});

/// The address failed validation. Intentionally carries no detail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("invalid email address")]
pub struct InvalidEmail;

/// An address that passed every rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidEmail {
    trimmed: String,
}

impl ValidEmail {
    /// Trimmed and lowercased form used for directory lookups.
    pub fn normalized(&self) -> String {
        self.trimmed.to_lowercase()
    }

    pub fn as_str(&self) -> &str {
        &self.trimmed
    }
}

pub fn validate_email(raw: &str) -> Result<ValidEmail, InvalidEmail> {
    let trimmed = raw.trim();

    if trimmed.is_empty() || trimmed.chars().count() > MAX_EMAIL_LEN {
        return Err(InvalidEmail);
    }

    if !EMAIL_PATTERN.is_match(trimmed) {
        return Err(InvalidEmail);
    }

    Ok(ValidEmail {
        trimmed: trimmed.to_string(),
    })
}

/// Pull the `email` field out of a parsed request body and validate it.
/// Non-object bodies and non-string values fail the same way a bad address does.
pub fn email_from_body(body: &serde_json::Value) -> Result<ValidEmail, InvalidEmail> {
    body.get("email")
        .and_then(serde_json::Value::as_str)
        .ok_or(InvalidEmail)
        .and_then(validate_email)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const VALID: &[&str] = &[
        "a@b.co",
        "user.name+tag@sub.example.com",
        "owner@example.com",
        "first_last@example.io",
        "x@my-shop.example.org",
        "o'brien@example.ie",
        "UPPER@EXAMPLE.COM",
        "  padded@example.com  ",
    ];

    const INVALID: &[&str] = &[
        "",
        "   ",
        "noatsign",
        "a@b",
        "a@.com",
        "a@b..com",
        "a@b.com.",
        "a@-b.com",
        "a@b-.com",
        "a@b.c",
        "a@b.c0m",
        "@example.com",
        "a b@example.com",
        "a@@example.com",
        "a@exa mple.com",
        "a@example.com\nb@example.com",
    ];

    #[test]
    fn accepts_known_valid_addresses() {
        for email in VALID {
            assert!(validate_email(email).is_ok(), "expected valid: {:?}", email);
        }
    }

    #[test]
    fn rejects_known_invalid_addresses() {
        for email in INVALID {
            assert_eq!(validate_email(email), Err(InvalidEmail), "expected invalid: {:?}", email);
        }
    }

    #[test]
    fn enforces_label_length() {
        let ok_label = "a".repeat(63);
        let long_label = "a".repeat(64);
        assert!(validate_email(&format!("x@{}.com", ok_label)).is_ok());
        assert!(validate_email(&format!("x@{}.com", long_label)).is_err());
    }

    #[test]
    fn enforces_total_length_after_trimming() {
        // 64 + 1 + 185 + 4 = 254
        let local = "a".repeat(64);
        let domain = format!("{}.{}.{}", "b".repeat(61), "c".repeat(61), "d".repeat(61));
        let at_limit = format!("{}@{}.com", local, domain);
        assert_eq!(at_limit.len(), 254);
        assert!(validate_email(&at_limit).is_ok());
        assert!(validate_email(&format!("   {}   ", at_limit)).is_ok());

        let over_limit = format!("a{}", at_limit);
        assert!(validate_email(&over_limit).is_err());
    }

    #[test]
    fn normalizes_by_trimming_and_lowercasing() {
        let email = validate_email("  Owner@Example.COM ").unwrap();
        assert_eq!(email.as_str(), "Owner@Example.COM");
        assert_eq!(email.normalized(), "owner@example.com");
    }

    #[test]
    fn extracts_email_from_request_body() {
        assert!(email_from_body(&json!({ "email": "a@b.co" })).is_ok());
        assert!(email_from_body(&json!({ "email": 42 })).is_err());
        assert!(email_from_body(&json!({ "mail": "a@b.co" })).is_err());
        assert!(email_from_body(&json!(["a@b.co"])).is_err());
        assert!(email_from_body(&json!(null)).is_err());
        assert!(email_from_body(&json!("a@b.co")).is_err());
    }
}
