//! Dashboard session cookie: login, logout and the request gate.

use axum::{
    body::Body,
    extract::State,
    http::{header, HeaderMap, HeaderValue, Request, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use serde::Deserialize;

use crate::config::AuthConfig;
use crate::http::server::AppState;

/// Paths reachable without a session.
const PUBLIC_PATHS: &[&str] = &["/health", "/login", "/logout"];

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub token: String,
}

/// Reject requests without a valid session cookie.
///
/// With no dashboard secret configured the gate is open.
pub async fn session_gate(
    State(state): State<AppState>,
    request: Request<Body>,
    next: Next,
) -> Result<Response, StatusCode> {
    let allowed = {
        let config = state.config.load_full();
        match config.auth.dashboard_secret.as_deref() {
            None => true,
            Some(_) if PUBLIC_PATHS.contains(&request.uri().path()) => true,
            Some(secret) => session_cookie(request.headers(), &config.auth.cookie_name)
                .is_some_and(|value| constant_time_eq(value.as_bytes(), secret.as_bytes())),
        }
    };

    if allowed {
        Ok(next.run(request).await)
    } else {
        tracing::debug!(path = %request.uri().path(), "Rejected request without valid session");
        Err(StatusCode::UNAUTHORIZED)
    }
}

pub async fn login(State(state): State<AppState>, Json(body): Json<LoginRequest>) -> Response {
    let config = state.config.load_full();
    let Some(secret) = config.auth.dashboard_secret.as_deref() else {
        return StatusCode::NO_CONTENT.into_response();
    };

    if !constant_time_eq(body.token.as_bytes(), secret.as_bytes()) {
        tracing::warn!("Dashboard login rejected");
        return StatusCode::UNAUTHORIZED.into_response();
    }

    match set_cookie_header(&config.auth, secret, config.auth.cookie_max_age_secs) {
        Some(cookie) => (StatusCode::NO_CONTENT, [(header::SET_COOKIE, cookie)]).into_response(),
        None => StatusCode::INTERNAL_SERVER_ERROR.into_response(),
    }
}

pub async fn logout(State(state): State<AppState>) -> Response {
    let config = state.config.load_full();
    match set_cookie_header(&config.auth, "", 0) {
        Some(cookie) => (StatusCode::NO_CONTENT, [(header::SET_COOKIE, cookie)]).into_response(),
        None => StatusCode::INTERNAL_SERVER_ERROR.into_response(),
    }
}

/// Value of the named cookie across all `Cookie` headers.
pub fn session_cookie<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(key, _)| *key == name)
        .map(|(_, value)| value)
}

/// `Set-Cookie` value for the session cookie.
pub fn set_cookie_header(auth: &AuthConfig, value: &str, max_age_secs: u64) -> Option<HeaderValue> {
    let mut cookie = format!(
        "{}={}; Path=/; HttpOnly; SameSite={}; Max-Age={}",
        auth.cookie_name,
        value,
        auth.cookie_same_site.as_str(),
        max_age_secs
    );
    if auth.cookie_secure {
        cookie.push_str("; Secure");
    }
    HeaderValue::from_str(&cookie).ok()
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SameSite;

    #[test]
    fn test_session_cookie_lookup() {
        let mut headers = HeaderMap::new();
        headers.append(header::COOKIE, HeaderValue::from_static("theme=dark; relay_session=abc"));
        headers.append(header::COOKIE, HeaderValue::from_static("other=1"));

        assert_eq!(session_cookie(&headers, "relay_session"), Some("abc"));
        assert_eq!(session_cookie(&headers, "other"), Some("1"));
        assert_eq!(session_cookie(&headers, "missing"), None);
    }

    #[test]
    fn test_set_cookie_header() {
        let mut auth = AuthConfig::default();
        let value = set_cookie_header(&auth, "tok", 60).unwrap();
        assert_eq!(
            value.to_str().unwrap(),
            "relay_session=tok; Path=/; HttpOnly; SameSite=Strict; Max-Age=60"
        );

        auth.cookie_secure = true;
        auth.cookie_same_site = SameSite::None;
        let value = set_cookie_header(&auth, "", 0).unwrap();
        let value = value.to_str().unwrap();
        assert!(value.contains("SameSite=None"));
        assert!(value.ends_with("Max-Age=0; Secure"));
    }

    #[test]
    fn test_constant_time_eq() {
        assert!(constant_time_eq(b"secret", b"secret"));
        assert!(!constant_time_eq(b"secret", b"secreT"));
        assert!(!constant_time_eq(b"secret", b"secret2"));
    }
}
