//! Closed status code table.
//!
//! Supported codes are exactly those `http::StatusCode` knows a canonical
//! reason phrase for. Anything else is a configuration error.

use crate::dispatcher::DispatchError;
use http::StatusCode;

/// Canonical reason phrase for `code`, `None` for unsupported codes.
#[must_use]
pub fn reason(code: u16) -> Option<&'static str> {
    StatusCode::from_u16(code).ok()?.canonical_reason()
}

#[must_use]
pub fn is_supported(code: u16) -> bool {
    reason(code).is_some()
}

/// `"404 Not Found"`.
///
/// # Errors
///
/// [`DispatchError::UnknownStatus`] when `code` is not in the table.
pub fn status_line(code: u16) -> Result<String, DispatchError> {
    reason(code)
        .map(|phrase| format!("{code} {phrase}"))
        .ok_or(DispatchError::UnknownStatus { code })
}
