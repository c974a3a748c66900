use axum::http::{header::COOKIE, HeaderMap, HeaderValue};

use crate::config::SecurityConfig;

pub const AUTH_COOKIE: &str = "auth_token";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SameSite {
    Lax,
    None,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CookieOptions {
    pub http_only: bool,
    pub secure: bool,
    pub same_site: SameSite,
    pub path: String,
    pub domain: Option<String>,
    pub max_age_secs: i64,
}

impl CookieOptions {
    /// Options for the session cookie. Secure cookies are sent cross-site
    /// (`SameSite=None`), which browsers only accept together with `Secure`.
    pub fn session(config: &SecurityConfig, max_age_secs: i64) -> Self {
        Self {
            http_only: true,
            secure: config.secure_cookies,
            same_site: if config.secure_cookies { SameSite::None } else { SameSite::Lax },
            path: "/".to_string(),
            domain: config.cookie_domain.clone(),
            max_age_secs,
        }
    }

    /// Same attributes as the session cookie with an immediate expiry.
    pub fn clearing(config: &SecurityConfig) -> Self {
        Self::session(config, 0)
    }

    pub fn render(&self, name: &str, value: &str) -> String {
        let mut cookie = format!("{}={}; Path={}; Max-Age={}", name, value, self.path, self.max_age_secs);
        if let Some(domain) = &self.domain {
            cookie.push_str("; Domain=");
            cookie.push_str(domain);
        }
        if self.http_only {
            cookie.push_str("; HttpOnly");
        }
        if self.secure {
            cookie.push_str("; Secure");
        }
        cookie.push_str(match self.same_site {
            SameSite::Lax => "; SameSite=Lax",
            SameSite::None => "; SameSite=None",
        });
        cookie
    }

    pub fn header_value(&self, name: &str, value: &str) -> Result<HeaderValue, axum::http::header::InvalidHeaderValue> {
        HeaderValue::from_str(&self.render(name, value))
    }
}

/// Value of the named cookie from the request's `Cookie` headers.
pub fn read_cookie(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(key, _)| *key == name)
        .map(|(_, value)| value.to_string())
        .filter(|value| !value.is_empty())
}
