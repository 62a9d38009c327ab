//! Input validation utilities.
//!
//! Purely local, synchronous checks. No I/O.

use serde::Serialize;
use validator::Validate;

use crate::error::PorchError;

#[derive(Debug, Validate)]
struct PasswordInput {
    #[validate(length(
        min = 8,
        max = 128,
        message = "Password must be between 8 and 128 characters"
    ))]
    password: String,
}

/// Outcome of [`validate_password`], shaped for display next to a form field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PasswordCheck {
    pub is_valid: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Check password length (8..=128 characters, counted as chars, not bytes).
pub fn validate_password(password: &str) -> PasswordCheck {
    let input = PasswordInput { password: password.to_owned() };
    match input.validate() {
        Ok(()) => PasswordCheck { is_valid: true, error: None },
        Err(e) => PasswordCheck { is_valid: false, error: Some(format_validation_errors(e)) },
    }
}

/// Same check as [`validate_password`], as a `Result` for `?` chains.
pub fn require_valid_password(password: &str) -> Result<(), PorchError> {
    let check = validate_password(password);
    match check.error {
        None => Ok(()),
        Some(message) => Err(PorchError::Validation { message }),
    }
}

/// Format validation errors into a human-readable string.
fn format_validation_errors(errors: validator::ValidationErrors) -> String {
    errors
        .field_errors()
        .iter()
        .flat_map(|(field, errs)| {
            errs.iter().map(move |e| {
                e.message
                    .as_ref()
                    .map(|m| m.to_string())
                    .unwrap_or_else(|| format!("Invalid value for '{field}'"))
            })
        })
        .collect::<Vec<_>>()
        .join("; ")
}
