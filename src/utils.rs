use chrono::Utc;
use rand::Rng;
use regex::Regex;
use url::Url;

use crate::error::AppError;

/// Characters the store cannot accept in a record key. Matches the set the
/// document store rejects in path segments.
const KEY_UNSAFE: [char; 6] = ['.', '#', '$', '/', '[', ']'];

pub fn now_millis() -> i64 {
    Utc::now().timestamp_millis()
}

/// Canonical store key for an email address: validate the shape, then
/// replace every key-unsafe character with `_`. Every store access for a
/// per-email record goes through this one function.
pub fn normalize_email(email: &str) -> Result<String, AppError> {
    let email = email.trim();

    if !is_valid_email(email) {
        return Err(AppError::Validation(format!("invalid email: {email}")));
    }

    Ok(email.replace(&KEY_UNSAFE[..], "_"))
}

pub fn is_valid_email(email: &str) -> bool {
    let re = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    re.is_match(email)
}

pub fn require_text(field: &'static str, value: &str) -> Result<String, AppError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(AppError::Validation(format!("{field} is required")));
    }
    Ok(trimmed.to_string())
}

pub fn require_email(field: &'static str, value: &str) -> Result<String, AppError> {
    let trimmed = value.trim();
    if !is_valid_email(trimmed) {
        return Err(AppError::Validation(format!("{field} must be a valid email")));
    }
    Ok(trimmed.to_string())
}

pub fn require_url(field: &'static str, value: &str) -> Result<String, AppError> {
    Url::parse(value.trim())
        .map(|_| value.trim().to_string())
        .map_err(|_| AppError::Validation(format!("{field} must be a valid URL")))
}

pub fn require_national_id(value: &str) -> Result<String, AppError> {
    let trimmed = value.trim();
    if trimmed.len() != 12 || !trimmed.chars().all(|c| c.is_ascii_digit()) {
        return Err(AppError::Validation(
            "nationalId must be exactly 12 digits".to_string(),
        ));
    }
    Ok(trimmed.to_string())
}

/// `IS-` + UTC second timestamp + 3 random digits. The suffix keeps two
/// reports landing in the same second from colliding on one key.
pub fn generate_issue_id() -> String {
    let stamp = Utc::now().format("%Y%m%d%H%M%S");
    let suffix: u16 = rand::rng().random_range(0..1000);

    format!("IS-{stamp}{suffix:03}")
}
