//! Field validation applied before any row is persisted.
//!
//! SQLite does not check lengths or patterns, so every `New*` payload runs
//! through these helpers in the repository layer.

use std::sync::LazyLock;

use regex::Regex;
use thiserror::Error;

/// International dialing format: optional `+`, optional country digit `1`, 9–15 digits.
static PHONE_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\+?1?\d{9,15}$").expect("phone pattern compiles"));

static EMAIL_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").expect("email pattern compiles")
});

pub const PHONE_MAX_LENGTH: usize = 17;
pub const EMAIL_MAX_LENGTH: usize = 254;
pub const NAME_MAX_LENGTH: usize = 255;
pub const ADDRESS_MAX_LENGTH: usize = 200;
pub const LABEL_MAX_LENGTH: usize = 100;
pub const STATUS_MAX_LENGTH: usize = 50;
pub const RESULT_MAX_LENGTH: usize = 50;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("{0} is required")]
    Required(&'static str),

    #[error("{field} has at most {max} characters (got {actual})")]
    TooLong {
        field: &'static str,
        max: usize,
        actual: usize,
    },

    #[error("Phone number must be entered in the format: '+999999999'. Up to 15 digits allowed.")]
    InvalidPhone(String),

    #[error("Enter a valid email address: {0}")]
    InvalidEmail(String),

    #[error("{field} must not be negative (got {value})")]
    Negative { field: &'static str, value: i64 },
}

pub fn require(field: &'static str, value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::Required(field));
    }
    Ok(())
}

pub fn max_length(field: &'static str, value: &str, max: usize) -> Result<(), ValidationError> {
    let actual = value.chars().count();
    if actual > max {
        return Err(ValidationError::TooLong { field, max, actual });
    }
    Ok(())
}

/// Required text bounded by `max` characters.
pub fn required_text(field: &'static str, value: &str, max: usize) -> Result<(), ValidationError> {
    require(field, value)?;
    max_length(field, value, max)
}

/// Blank phones are allowed; anything else must match the dialing pattern.
pub fn validate_phone(phone: Option<&str>) -> Result<(), ValidationError> {
    match phone {
        None | Some("") => Ok(()),
        Some(p) => {
            max_length("phone", p, PHONE_MAX_LENGTH)?;
            if PHONE_PATTERN.is_match(p) {
                Ok(())
            } else {
                Err(ValidationError::InvalidPhone(p.to_string()))
            }
        }
    }
}

pub fn validate_email(email: &str) -> Result<(), ValidationError> {
    require("email", email)?;
    max_length("email", email, EMAIL_MAX_LENGTH)?;
    if !EMAIL_PATTERN.is_match(email) {
        return Err(ValidationError::InvalidEmail(email.to_string()));
    }
    Ok(())
}

/// Lowercase the domain part; the local part is case-sensitive.
pub fn normalize_email(email: &str) -> String {
    let email = email.trim();
    match email.rsplit_once('@') {
        Some((local, domain)) => format!("{local}@{}", domain.to_lowercase()),
        None => email.to_string(),
    }
}

pub fn non_negative(field: &'static str, value: i64) -> Result<(), ValidationError> {
    if value < 0 {
        return Err(ValidationError::Negative { field, value });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn phone_accepts_international_shapes() {
        for phone in ["+123456789", "123456789", "+1123456789012345", "+999999999999999"] {
            assert!(validate_phone(Some(phone)).is_ok(), "{phone} should be valid");
        }
    }

    #[test]
    fn phone_rejects_short_long_and_non_digit() {
        for phone in ["12345678", "+12-345-6789", "phone", "+9234567890123456", "++123456789"] {
            assert!(
                matches!(
                    validate_phone(Some(phone)),
                    Err(ValidationError::InvalidPhone(_)) | Err(ValidationError::TooLong { .. })
                ),
                "{phone} should be rejected"
            );
        }
    }

    #[test]
    fn blank_phone_is_permitted() {
        assert!(validate_phone(None).is_ok());
        assert!(validate_phone(Some("")).is_ok());
    }

    #[test]
    fn phone_max_length_enforced_before_pattern() {
        let err = validate_phone(Some("+1234567890123456789")).unwrap_err();
        assert!(matches!(err, ValidationError::TooLong { field: "phone", max: 17, .. }));
    }

    #[test]
    fn email_requires_at_and_domain() {
        assert!(validate_email("a@x.com").is_ok());
        assert_eq!(validate_email(""), Err(ValidationError::Required("email")));
        assert!(matches!(validate_email("ax.com"), Err(ValidationError::InvalidEmail(_))));
        assert!(matches!(validate_email("a@x"), Err(ValidationError::InvalidEmail(_))));
    }

    #[test]
    fn normalize_lowercases_domain_only() {
        assert_eq!(normalize_email("  Alice@Example.COM "), "Alice@example.com");
        assert_eq!(normalize_email("no-at-sign"), "no-at-sign");
    }

    #[test]
    fn required_text_checks_blank_and_length() {
        assert_eq!(required_text("location", "  ", 100), Err(ValidationError::Required("location")));
        let long = "x".repeat(101);
        assert!(matches!(
            required_text("location", &long, 100),
            Err(ValidationError::TooLong { actual: 101, .. })
        ));
        assert!(required_text("location", "City", 100).is_ok());
    }

    #[test]
    fn counters_must_not_be_negative() {
        assert!(non_negative("total_tests", 0).is_ok());
        assert_eq!(
            non_negative("total_tests", -1),
            Err(ValidationError::Negative { field: "total_tests", value: -1 })
        );
    }
}
