//! Field rules for school submissions.
//!
//! The patterns are kept exactly as the registration form has always
//! applied them: city and state accept ASCII letters and whitespace only,
//! so "Winston-Salem" or "São Paulo" are rejected.

use super::FieldError;
use regex::Regex;
use std::sync::LazyLock;

/// Declared MIME types accepted for the school image. Matched exactly.
pub const ALLOWED_IMAGE_TYPES: [&str; 4] = ["image/jpeg", "image/png", "image/gif", "image/webp"];

const NAME_MIN_CHARS: usize = 3;
const ADDRESS_MIN_CHARS: usize = 10;

static REGION_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-zA-Z\s]+$").expect("region pattern"));

static CONTACT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[0-9]{10}$").expect("contact pattern"));

static EMAIL_RE: LazyLock<Regex> = LazyLock::new(|| {
    // ASCII-only case folding: 'K' must not match U+212A KELVIN SIGN
    Regex::new(r"(?i-u)^[A-Z0-9._%+-]+@[A-Z0-9.-]+\.[A-Z]{2,}$").expect("email pattern")
});

/// Whether a declared content type is on the image allow-list.
/// Parameters such as `; charset=...` are ignored, the type itself is not case-folded.
pub fn is_allowed_image_type(content_type: &str) -> bool {
    let essence = content_type.split(';').next().unwrap_or("").trim();
    ALLOWED_IMAGE_TYPES.contains(&essence)
}

fn required(
    field: &'static str,
    value: Option<String>,
    message: &str,
    errors: &mut Vec<FieldError>,
) -> Option<String> {
    match value {
        Some(v) if !v.is_empty() => Some(v),
        _ => {
            errors.push(FieldError::new(field, message));
            None
        }
    }
}

fn min_chars(
    field: &'static str,
    value: String,
    min: usize,
    message: &str,
    errors: &mut Vec<FieldError>,
) -> Option<String> {
    if value.chars().count() < min {
        errors.push(FieldError::new(field, message));
        None
    } else {
        Some(value)
    }
}

fn matches(
    field: &'static str,
    value: String,
    re: &Regex,
    message: &str,
    errors: &mut Vec<FieldError>,
) -> Option<String> {
    if re.is_match(&value) {
        Some(value)
    } else {
        errors.push(FieldError::new(field, message));
        None
    }
}

pub(super) fn check_name(value: Option<String>, errors: &mut Vec<FieldError>) -> Option<String> {
    let value = required("name", value, "School name is required", errors)?;
    min_chars(
        "name",
        value,
        NAME_MIN_CHARS,
        "School name must be at least 3 characters",
        errors,
    )
}

pub(super) fn check_address(value: Option<String>, errors: &mut Vec<FieldError>) -> Option<String> {
    let value = required("address", value, "Address is required", errors)?;
    min_chars(
        "address",
        value,
        ADDRESS_MIN_CHARS,
        "Address must be at least 10 characters",
        errors,
    )
}

/// City and state share one rule and differ only in wording.
pub(super) fn check_region(
    field: &'static str,
    label: &str,
    value: Option<String>,
    errors: &mut Vec<FieldError>,
) -> Option<String> {
    let value = required(field, value, &format!("{} is required", label), errors)?;
    matches(
        field,
        value,
        &REGION_RE,
        &format!("{} must contain only letters", label),
        errors,
    )
}

pub(super) fn check_contact(value: Option<String>, errors: &mut Vec<FieldError>) -> Option<String> {
    let value = required("contact", value, "Contact number is required", errors)?;
    matches(
        "contact",
        value,
        &CONTACT_RE,
        "Please enter a valid 10-digit phone number",
        errors,
    )
}

pub(super) fn check_email(value: Option<String>, errors: &mut Vec<FieldError>) -> Option<String> {
    let value = required("email_id", value, "Email is required", errors)?;
    matches(
        "email_id",
        value,
        &EMAIL_RE,
        "Please enter a valid email address",
        errors,
    )
}
