//! Session cookie formatting and extraction.
//!
//! One cookie, `token`, with fixed attributes:
//! `HttpOnly; SameSite=Lax; Path=/; Max-Age=<session ttl>` plus `Secure`
//! outside dev mode.

use axum::http::{header, HeaderMap};

use peerflash_protocol::config::{AuthConfig, SESSION_COOKIE_NAME};

/// `Set-Cookie` value delivering a session token.
pub fn session_cookie(token: &str, config: &AuthConfig) -> String {
    build(token, config.session_ttl.num_seconds(), config.cookie_secure)
}

/// `Set-Cookie` value that makes the browser drop the session.
pub fn cleared_session_cookie(config: &AuthConfig) -> String {
    build("", 0, config.cookie_secure)
}

fn build(value: &str, max_age: i64, secure: bool) -> String {
    let mut cookie = format!(
        "{SESSION_COOKIE_NAME}={value}; Path=/; Max-Age={max_age}; HttpOnly; SameSite=Lax"
    );
    if secure {
        cookie.push_str("; Secure");
    }
    cookie
}

/// Pull the session token out of the request's `Cookie` headers.
///
/// Returns `None` if there is no `token` cookie or it is empty.
pub fn session_token(headers: &HeaderMap) -> Option<String> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == SESSION_COOKIE_NAME)
        .map(|(_, value)| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;
    use peerflash_protocol::config::SessionSecret;

    fn config(secure: bool) -> AuthConfig {
        AuthConfig::new(SessionSecret::ephemeral()).with_cookie_secure(secure)
    }

    #[test]
    fn production_cookie_attributes() {
        let cookie = session_cookie("abc.def.ghi", &config(true));
        assert_eq!(
            cookie,
            "token=abc.def.ghi; Path=/; Max-Age=86400; HttpOnly; SameSite=Lax; Secure"
        );
    }

    #[test]
    fn dev_cookie_is_not_secure() {
        let cookie = session_cookie("t", &config(false));
        assert!(!cookie.contains("Secure"));
        assert!(cookie.contains("HttpOnly"));
    }

    #[test]
    fn cleared_cookie_expires_immediately() {
        let cookie = cleared_session_cookie(&config(true));
        assert!(cookie.starts_with("token=;"));
        assert!(cookie.contains("Max-Age=0"));
    }

    #[test]
    fn token_found_among_other_cookies() {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::COOKIE,
            HeaderValue::from_static("theme=dark; token=abc.def; lang=en"),
        );
        assert_eq!(session_token(&headers).as_deref(), Some("abc.def"));
    }

    #[test]
    fn token_found_in_second_cookie_header() {
        let mut headers = HeaderMap::new();
        headers.append(header::COOKIE, HeaderValue::from_static("theme=dark"));
        headers.append(header::COOKIE, HeaderValue::from_static("token=xyz"));
        assert_eq!(session_token(&headers).as_deref(), Some("xyz"));
    }

    #[test]
    fn missing_or_empty_token() {
        let mut headers = HeaderMap::new();
        assert_eq!(session_token(&headers), None);

        headers.insert(header::COOKIE, HeaderValue::from_static("tokenish=1; token="));
        assert_eq!(session_token(&headers), None);
    }
}
