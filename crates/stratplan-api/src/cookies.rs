//! Minimal cookie jar for the backend's session and CSRF cookies.
//!
//! The backend runs on a single origin, so cookies are keyed by name only
//! and `Path`/`Domain` are ignored. A cookie the server deletes (empty
//! value, `Max-Age<=0`, or an RFC 2822 `Expires` in the past) is removed.
//! Other expiry dates are not tracked; the jar lives for one process.

use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use reqwest::header::{HeaderMap, SET_COOKIE};

pub const SESSION_COOKIE: &str = "sessionid";
pub const CSRF_COOKIE: &str = "csrftoken";

#[derive(Debug, Default)]
pub struct CookieJar {
    cookies: Mutex<BTreeMap<String, String>>,
}

impl CookieJar {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, BTreeMap<String, String>> {
        self.cookies.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn get(&self, name: &str) -> Option<String> {
        self.lock().get(name).cloned()
    }

    pub fn set(&self, name: impl Into<String>, value: impl Into<String>) {
        self.lock().insert(name.into(), value.into());
    }

    pub fn remove(&self, name: &str) {
        self.lock().remove(name);
    }

    pub fn clear(&self) {
        self.lock().clear();
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    pub fn has_session(&self) -> bool {
        self.get(SESSION_COOKIE).is_some()
    }

    /// Apply every `Set-Cookie` header in a response.
    pub fn store_from(&self, headers: &HeaderMap) {
        for value in headers.get_all(SET_COOKIE) {
            let Ok(raw) = value.to_str() else {
                continue;
            };
            self.store(raw);
        }
    }

    /// Apply a single `Set-Cookie` header value.
    pub fn store(&self, raw: &str) {
        let mut parts = raw.split(';');
        let Some((name, value)) = parts.next().and_then(|pair| pair.split_once('=')) else {
            return;
        };
        let name = name.trim();
        let value = value.trim().trim_matches('"');
        if name.is_empty() {
            return;
        }

        let now = Utc::now();
        let expired = parts.any(|attr| {
            let Some((key, val)) = attr.split_once('=') else {
                return false;
            };
            let (key, val) = (key.trim(), val.trim());
            if key.eq_ignore_ascii_case("max-age") {
                val.parse::<i64>().is_ok_and(|age| age <= 0)
            } else if key.eq_ignore_ascii_case("expires") {
                DateTime::parse_from_rfc2822(val).is_ok_and(|at| at <= now)
            } else {
                false
            }
        });

        if expired || value.is_empty() {
            self.remove(name);
        } else {
            self.set(name, value);
        }
    }

    /// Value for a `Cookie` request header, if any cookies are held.
    pub fn header_value(&self) -> Option<String> {
        let cookies = self.lock();
        if cookies.is_empty() {
            return None;
        }
        Some(
            cookies
                .iter()
                .map(|(name, value)| format!("{name}={value}"))
                .collect::<Vec<_>>()
                .join("; "),
        )
    }
}
