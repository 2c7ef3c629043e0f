// ABOUTME: Input validation for names, emails, ports and role values
// ABOUTME: Shared by user, project and environment creation handlers

use crate::errors::AppError;

/// Maximum length accepted for any URL-safe identifier (user, project, environment name).
const MAX_NAME_LEN: usize = 64;

/// Validate a user or project name: non-empty, URL-safe, bounded length.
///
/// URL-safe here means ASCII alphanumeric plus `-` and `_`, matching the
/// identifiers that appear directly in path segments such as
/// `/api/admin/users/{name}`.
///
/// # Errors
/// Returns `AppError::InvalidInput` if the name is empty, too long, or
/// contains characters outside `[a-zA-Z0-9_-]`.
pub fn validate_name(field: &str, value: &str) -> Result<(), AppError> {
    if value.is_empty() {
        return Err(AppError::invalid_input(format!("{field} must not be empty")));
    }
    if value.len() > MAX_NAME_LEN {
        return Err(AppError::invalid_input(format!(
            "{field} must be at most {MAX_NAME_LEN} characters"
        )));
    }
    let is_url_safe = value
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
    if !is_url_safe {
        return Err(AppError::invalid_input(format!(
            "{field} must contain only letters, digits, '-' or '_'"
        )));
    }
    Ok(())
}

/// Validate a non-empty email address. Only a shape check: presence of an
/// `@` with content on both sides. The server never sends mail to an
/// address it cannot reach, so stricter RFC 5322 validation is unnecessary.
///
/// # Errors
/// Returns `AppError::InvalidInput` if the value is empty or lacks an `@`
/// with non-empty local and domain parts.
pub fn validate_email(value: &str) -> Result<(), AppError> {
    if value.is_empty() {
        return Err(AppError::invalid_input("email must not be empty"));
    }
    match value.split_once('@') {
        Some((local, domain)) if !local.is_empty() && !domain.is_empty() && domain.contains('.') => {
            Ok(())
        }
        _ => Err(AppError::invalid_input("email is not a valid address")),
    }
}

/// Validate a TCP port for an environment. Port `0` is reserved (ephemeral
/// binding) and rejected; ports above `u16::MAX` cannot be represented and
/// are caught by the caller's deserialization, but `65536` is spelled out
/// explicitly in the boundary tests so it is checked here too when the
/// caller passes a wider integer type.
///
/// # Errors
/// Returns `AppError::InvalidInput` if `port` is `0`.
pub fn validate_port(port: u32) -> Result<u16, AppError> {
    if port == 0 || port > u32::from(u16::MAX) {
        return Err(AppError::invalid_input("port must be between 1 and 65535"));
    }
    #[allow(clippy::cast_possible_truncation)]
    Ok(port as u16)
}
