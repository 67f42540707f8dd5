//! Credential transport: HTTP-only cookies, with a bearer header fallback for
//! non-browser clients.

use axum::http::{header, HeaderMap};
use chrono::Duration;

use crate::config::SecurityConfig;

/// Raw credentials found on a request.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Credentials {
    pub access_token: Option<String>,
    pub refresh_token: Option<String>,
}

impl Credentials {
    pub fn from_headers(headers: &HeaderMap, security: &SecurityConfig) -> Self {
        let access_token = read_cookie(headers, &security.access_cookie).or_else(|| bearer_token(headers));
        let refresh_token = read_cookie(headers, &security.refresh_cookie);
        Self { access_token, refresh_token }
    }
}

fn read_cookie(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(key, _)| *key == name)
        .map(|(_, value)| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn bearer_token(headers: &HeaderMap) -> Option<String> {
    let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let token = value.strip_prefix("Bearer ")?.trim();
    if token.is_empty() {
        None
    } else {
        Some(token.to_string())
    }
}

/// `Set-Cookie` value for a session credential.
pub fn session_cookie(name: &str, value: &str, max_age: Duration, security: &SecurityConfig) -> String {
    let mut cookie = format!(
        "{}={}; Path=/; HttpOnly; SameSite=Lax; Max-Age={}",
        name,
        value,
        max_age.num_seconds().max(0)
    );
    if security.secure_cookies {
        cookie.push_str("; Secure");
    }
    cookie
}

pub fn expired_cookie(name: &str, security: &SecurityConfig) -> String {
    session_cookie(name, "", Duration::zero(), security)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AppConfig;
    use axum::http::HeaderValue;

    #[test]
    fn reads_named_cookie_among_others() {
        let mut headers = HeaderMap::new();
        headers.insert(header::COOKIE, HeaderValue::from_static("theme=dark; access_token=abc.def; x=1"));
        assert_eq!(read_cookie(&headers, "access_token").as_deref(), Some("abc.def"));
        assert_eq!(read_cookie(&headers, "refresh_token"), None);
    }

    #[test]
    fn bearer_header_is_a_fallback() {
        let security = AppConfig::development().security;
        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer tok"));
        assert_eq!(Credentials::from_headers(&headers, &security).access_token.as_deref(), Some("tok"));

        headers.insert(header::COOKIE, HeaderValue::from_static("access_token=cookie-tok"));
        assert_eq!(Credentials::from_headers(&headers, &security).access_token.as_deref(), Some("cookie-tok"));
    }

    #[test]
    fn refresh_cookie_is_collected_separately() {
        let security = AppConfig::development().security;
        let mut headers = HeaderMap::new();
        headers.insert(header::COOKIE, HeaderValue::from_static("refresh_token=r.tok"));
        let credentials = Credentials::from_headers(&headers, &security);
        assert_eq!(credentials.refresh_token.as_deref(), Some("r.tok"));
        assert_eq!(credentials.access_token, None);
    }

    #[test]
    fn cookies_are_http_only() {
        let mut security = AppConfig::development().security;
        security.secure_cookies = true;
        let cookie = session_cookie("access_token", "t", Duration::minutes(15), &security);
        assert_eq!(cookie, "access_token=t; Path=/; HttpOnly; SameSite=Lax; Max-Age=900; Secure");
        assert!(expired_cookie("access_token", &security).contains("Max-Age=0"));
    }
}
