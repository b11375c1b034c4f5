//! Request field validation

use crate::error::{AppError, Result};

pub const MAX_NAME_LENGTH: usize = 255;
pub const MAX_EMAIL_LENGTH: usize = 255;
pub const MAX_TEXT_LENGTH: usize = 1000;

pub fn validate_length(field: &str, value: &str, min: usize, max: usize) -> Result<()> {
    let len = value.chars().count();
    if len < min {
        return Err(AppError::BadRequest(format!("The {} field is required", field)));
    }
    if len > max {
        return Err(AppError::BadRequest(format!(
            "The {} field must not be greater than {} characters",
            field, max
        )));
    }
    Ok(())
}

pub fn validate_email(email: &str) -> Result<()> {
    let email = email.trim();
    validate_length("email", email, 1, MAX_EMAIL_LENGTH)?;
    match email.split_once('@') {
        Some((local, domain)) if !local.is_empty() && !domain.is_empty() => Ok(()),
        _ => Err(AppError::BadRequest("The email field must be a valid email address".to_string())),
    }
}

/// Optional free text (message, bio)
pub fn validate_text(field: &str, value: Option<&str>) -> Result<()> {
    match value {
        Some(v) => validate_length(field, v, 0, MAX_TEXT_LENGTH),
        None => Ok(()),
    }
}
