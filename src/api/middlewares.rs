//! Middleware module.
//!
//! Provides the API key guard applied to every directory route.

use axum::{
    body::Body,
    extract::{Request, State},
    middleware::Next,
    response::Response,
};

use crate::api::state::AppState;
use crate::error::AppError;

/// Header carrying the static API key.
pub const API_KEY_HEADER: &str = "X-API-Key";

/// API key authentication middleware.
///
/// # Authentication Header Format
///
/// `X-API-Key: <key>`
///
/// # Error Responses
///
/// - 403 Forbidden `Not authenticated`: header missing or not valid UTF-8
/// - 403 Forbidden `Invalid API key`: header present but wrong
pub async fn api_key_auth(
    State(state): State<AppState>,
    request: Request<Body>,
    next: Next,
) -> Result<Response, AppError> {
    check_api_key(extract_api_key(&request), &state.api_key)?;
    Ok(next.run(request).await)
}

/// Reads the API key header from the request.
fn extract_api_key(request: &Request<Body>) -> Option<&str> {
    request
        .headers()
        .get(API_KEY_HEADER)
        .and_then(|value| value.to_str().ok())
}

/// Compares the presented key with the expected one.
fn check_api_key(presented: Option<&str>, expected: &str) -> Result<(), AppError> {
    let Some(presented) = presented else {
        return Err(AppError::Forbidden("Not authenticated".to_string()));
    };

    if keys_match(presented.as_bytes(), expected.as_bytes()) {
        Ok(())
    } else {
        tracing::warn!("Rejected request with invalid API key");
        Err(AppError::Forbidden("Invalid API key".to_string()))
    }
}

/// Byte comparison whose running time depends only on the lengths.
fn keys_match(presented: &[u8], expected: &[u8]) -> bool {
    if presented.len() != expected.len() {
        return false;
    }

    presented
        .iter()
        .zip(expected)
        .fold(0u8, |diff, (a, b)| diff | (a ^ b))
        == 0
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request;

    fn request_with(header: Option<&str>) -> Request<Body> {
        let mut builder = Request::builder().uri("/organizations/1");
        if let Some(value) = header {
            builder = builder.header(API_KEY_HEADER, value);
        }
        builder.body(Body::empty()).unwrap()
    }

    #[test]
    fn test_extract_api_key_present() {
        let request = request_with(Some("STATIC_API_KEY"));
        assert_eq!(extract_api_key(&request), Some("STATIC_API_KEY"));
    }

    #[test]
    fn test_extract_api_key_header_name_is_case_insensitive() {
        let request = Request::builder()
            .uri("/")
            .header("x-api-key", "abc")
            .body(Body::empty())
            .unwrap();
        assert_eq!(extract_api_key(&request), Some("abc"));
    }

    #[test]
    fn test_extract_api_key_missing() {
        assert!(extract_api_key(&request_with(None)).is_none());
    }

    #[test]
    fn test_check_api_key_accepts_match() {
        assert!(check_api_key(Some("secret"), "secret").is_ok());
    }

    #[test]
    fn test_check_api_key_missing() {
        match check_api_key(None, "secret") {
            Err(AppError::Forbidden(msg)) => assert_eq!(msg, "Not authenticated"),
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn test_check_api_key_mismatch() {
        match check_api_key(Some("Secret"), "secret") {
            Err(AppError::Forbidden(msg)) => assert_eq!(msg, "Invalid API key"),
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn test_keys_match() {
        assert!(keys_match(b"STATIC_API_KEY", b"STATIC_API_KEY"));
        assert!(!keys_match(b"STATIC_API_KEX", b"STATIC_API_KEY"));
        assert!(!keys_match(b"XTATIC_API_KEY", b"STATIC_API_KEY"));
        assert!(!keys_match(b"STATIC", b"STATIC_API_KEY"));
        assert!(keys_match(b"", b""));
    }

    #[test]
    fn test_check_api_key_empty_value() {
        assert!(check_api_key(Some(""), "secret").is_err());
    }
}
