//! Caller identity extraction.
//!
//! Rate limits are keyed by identity. An explicit `x-user-id` header wins;
//! otherwise the bearer token itself is the identity.

use axum::http::{header, HeaderMap};

pub const USER_ID_HEADER: &str = "x-user-id";

/// Identity for a request, if it carries one.
pub fn extract_identity(headers: &HeaderMap) -> Option<String> {
    if let Some(user_id) = header_str(headers, USER_ID_HEADER) {
        return Some(user_id.to_string());
    }

    let auth = header_str(headers, header::AUTHORIZATION.as_str())?;
    let token = auth.strip_prefix("Bearer ")?.trim();
    (!token.is_empty()).then(|| token.to_string())
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    let value = headers.get(name)?.to_str().ok()?.trim();
    (!value.is_empty()).then_some(value)
}
