//! Input validation for API requests.
//!
//! Validators return `Result<(), String>` and are collected per-request with
//! the `ValidationErrorBuilder` from the `error` module. Everything here is
//! local and side-effect free; a request that fails validation never reaches
//! the database or the payment gateway.

use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    /// Pragmatic email shape check; the unique index is the real arbiter.
    static ref EMAIL_REGEX: Regex =
        Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").unwrap();

    /// Phone numbers: optional leading +, then digits, spaces or dashes.
    static ref PHONE_REGEX: Regex = Regex::new(r"^\+?[0-9][0-9 \-]{5,19}$").unwrap();
}

pub const MIN_PASSWORD_LEN: usize = 6;

const VALID_GENDERS: [&str; 3] = ["female", "male", "other"];

/// Validate an email address
pub fn validate_email(email: &str) -> Result<(), String> {
    let email = email.trim();
    if email.is_empty() {
        return Err("Email is required".to_string());
    }
    if email.len() > 254 {
        return Err("Email is too long (max 254 characters)".to_string());
    }
    if !EMAIL_REGEX.is_match(email) {
        return Err("Invalid email format".to_string());
    }
    Ok(())
}

/// Validate a registration/login password
pub fn validate_password(password: &str) -> Result<(), String> {
    if password.is_empty() {
        return Err("Password is required".to_string());
    }
    if password.len() < MIN_PASSWORD_LEN {
        return Err(format!(
            "Password must be at least {} characters",
            MIN_PASSWORD_LEN
        ));
    }
    if password.len() > 128 {
        return Err("Password is too long (max 128 characters)".to_string());
    }
    Ok(())
}

/// Validate that the confirmation matches the password
pub fn validate_password_confirm(password: &str, confirm: &str) -> Result<(), String> {
    if password != confirm {
        return Err("Passwords do not match".to_string());
    }
    Ok(())
}

/// Validate a person or display name
pub fn validate_name(name: &str, field: &str) -> Result<(), String> {
    let name = name.trim();
    if name.is_empty() {
        return Err(format!("{} is required", field));
    }
    if name.len() > 100 {
        return Err(format!("{} is too long (max 100 characters)", field));
    }
    Ok(())
}

/// Validate a phone number (optional field)
pub fn validate_phone(phone: &str) -> Result<(), String> {
    let phone = phone.trim();
    if phone.is_empty() {
        return Err("Phone is required".to_string());
    }
    if !PHONE_REGEX.is_match(phone) {
        return Err("Invalid phone number format".to_string());
    }
    Ok(())
}

/// Validate a gender value
pub fn validate_gender(gender: &str) -> Result<(), String> {
    let lower = gender.trim().to_lowercase();
    if !VALID_GENDERS.contains(&lower.as_str()) {
        return Err(format!(
            "Invalid gender. Must be one of: {}",
            VALID_GENDERS.join(", ")
        ));
    }
    Ok(())
}

/// Validate free text that must be present (address, aspiration, details)
pub fn validate_required_text(text: &str, field: &str, max: usize) -> Result<(), String> {
    let text = text.trim();
    if text.is_empty() {
        return Err(format!("{} is required", field));
    }
    if text.len() > max {
        return Err(format!("{} is too long (max {} characters)", field, max));
    }
    Ok(())
}

/// Generate a URL slug from a display name. Uniqueness is handled by the
/// caller (numeric suffix probe against the table).
pub fn slugify(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    let mut last_dash = true;
    for c in name.trim().to_lowercase().chars() {
        if c.is_ascii_alphanumeric() {
            slug.push(c);
            last_dash = false;
        } else if !last_dash {
            slug.push('-');
            last_dash = true;
        }
    }
    let slug = slug.trim_end_matches('-').to_string();
    if slug.is_empty() {
        "entry".to_string()
    } else {
        slug
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_email() {
        assert!(validate_email("a@x.com").is_ok());
        assert!(validate_email("  user@mail.example.org  ").is_ok());

        assert!(validate_email("").is_err());
        assert!(validate_email("no-at-sign").is_err());
        assert!(validate_email("a@b").is_err());
        assert!(validate_email("a b@x.com").is_err());
    }

    #[test]
    fn test_validate_password_length() {
        // Five characters is blocked before any request is made.
        assert!(validate_password("short").is_err());
        assert!(validate_password("sixchr").is_ok());
        assert!(validate_password("").is_err());
        assert!(validate_password(&"x".repeat(129)).is_err());
    }

    #[test]
    fn test_validate_password_confirm() {
        assert!(validate_password_confirm("secret1", "secret1").is_ok());
        assert!(validate_password_confirm("secret1", "secret2").is_err());
    }

    #[test]
    fn test_validate_phone() {
        assert!(validate_phone("+254 700 123456").is_ok());
        assert!(validate_phone("0712-345-678").is_ok());

        assert!(validate_phone("").is_err());
        assert!(validate_phone("call me").is_err());
        assert!(validate_phone("+1").is_err());
    }

    #[test]
    fn test_validate_gender() {
        assert!(validate_gender("female").is_ok());
        assert!(validate_gender("Male").is_ok());
        assert!(validate_gender("other").is_ok());
        assert!(validate_gender("unknown").is_err());
    }

    #[test]
    fn test_validate_name() {
        assert!(validate_name("Amina", "First name").is_ok());
        assert!(validate_name("  ", "First name").is_err());
        assert!(validate_name(&"x".repeat(101), "First name").is_err());
    }

    #[test]
    fn test_slugify() {
        assert_eq!(slugify("Youth Arts Grant 2026"), "youth-arts-grant-2026");
        assert_eq!(slugify("  Hello,  World!  "), "hello-world");
        assert_eq!(slugify("***"), "entry");
    }
}
