//! HTTP plumbing shared by every query module.
//!
//! - Every request carries the cookie jar; every response updates it.
//! - A 401 anywhere clears cookies and session state and surfaces as
//!   [`ApiError::SessionExpired`]. Nothing is retried after that.
//! - GETs bypass caches (`Cache-Control` plus a `_=<millis>` parameter) and
//!   are retried up to `query_attempts` times on transport errors and 5xx.
//! - Mutations fetch a CSRF token first, echo it in `X-CSRFToken`, and are
//!   never retried.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use reqwest::header::{CACHE_CONTROL, COOKIE, PRAGMA};
use reqwest::{Method, RequestBuilder, Response, StatusCode};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::config::ApiConfig;
use crate::cookies::{CSRF_COOKIE, CookieJar};
use crate::error::{ApiError, message_from_body};
use crate::session::SessionContext;

pub const CSRF_HEADER: &str = "X-CSRFToken";
const NO_CACHE: &str = "no-cache, no-store, must-revalidate";
const RETRY_BACKOFF: Duration = Duration::from_millis(250);

/// Shared API client. Cloning is cheap; clones share cookies and session.
#[derive(Debug, Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    config: ApiConfig,
    cookies: Arc<CookieJar>,
    session: Arc<SessionContext>,
}

impl ApiClient {
    pub fn new(config: ApiConfig) -> Result<Self, ApiError> {
        let http = reqwest::Client::builder()
            .timeout(config.timeout())
            .user_agent(concat!("stratplan/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|source| ApiError::Transport {
                context: "failed to build HTTP client".to_owned(),
                source,
            })?;
        Ok(Self {
            http,
            config,
            cookies: Arc::new(CookieJar::new()),
            session: Arc::new(SessionContext::new()),
        })
    }

    pub fn config(&self) -> &ApiConfig {
        &self.config
    }

    pub fn cookies(&self) -> &CookieJar {
        &self.cookies
    }

    pub fn session(&self) -> &SessionContext {
        &self.session
    }

    /// Drop cookies and session state, as after a 401 or logout.
    pub fn clear_session(&self) {
        self.cookies.clear();
        self.session.clear();
    }

    // -- queries ------------------------------------------------------------

    /// GET and decode. `fallback` is the error message used when the
    /// server gives none.
    pub async fn get<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, &str)],
        fallback: &str,
    ) -> Result<T, ApiError> {
        let value = self.get_value(path, query, fallback).await?;
        decode(value, fallback)
    }

    pub async fn get_value(
        &self,
        path: &str,
        query: &[(&str, &str)],
        fallback: &str,
    ) -> Result<Value, ApiError> {
        let attempts = self.config.query_attempts.max(1);
        let mut attempt = 1;
        loop {
            let buster = Utc::now().timestamp_millis().to_string();
            let request = self
                .http
                .get(self.config.endpoint(path))
                .query(query)
                .query(&[("_", buster.as_str())])
                .header(CACHE_CONTROL, NO_CACHE)
                .header(PRAGMA, "no-cache");

            match self.execute(request, fallback).await {
                Err(err) if err.is_retryable() && attempt < attempts => {
                    tracing::warn!(path, attempt, error = %err, "query failed, retrying");
                    tokio::time::sleep(RETRY_BACKOFF * attempt).await;
                    attempt += 1;
                }
                result => return result,
            }
        }
    }

    // -- mutations ----------------------------------------------------------

    pub async fn post<B, T>(
        &self,
        path: &str,
        query: &[(&str, &str)],
        body: Option<&B>,
        fallback: &str,
    ) -> Result<T, ApiError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let value = self.mutate(Method::POST, path, query, body, fallback).await?;
        decode(value, fallback)
    }

    /// POST without a body (the action endpoints).
    pub async fn post_empty<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, &str)],
        fallback: &str,
    ) -> Result<T, ApiError> {
        self.post::<Value, T>(path, query, None, fallback).await
    }

    pub async fn patch<B, T>(&self, path: &str, body: &B, fallback: &str) -> Result<T, ApiError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let value = self
            .mutate(Method::PATCH, path, &[], Some(body), fallback)
            .await?;
        decode(value, fallback)
    }

    pub async fn delete(&self, path: &str, fallback: &str) -> Result<(), ApiError> {
        self.mutate::<Value>(Method::DELETE, path, &[], None, fallback)
            .await
            .map(|_| ())
    }

    async fn mutate<B>(
        &self,
        method: Method,
        path: &str,
        query: &[(&str, &str)],
        body: Option<&B>,
        fallback: &str,
    ) -> Result<Value, ApiError>
    where
        B: Serialize + ?Sized,
    {
        let token = self.ensure_csrf().await?;
        let mut request = self
            .http
            .request(method, self.config.endpoint(path))
            .query(query)
            .header(CSRF_HEADER, token);
        if let Some(body) = body {
            request = request.json(body);
        }
        self.execute(request, fallback).await
    }

    /// Return the CSRF token, fetching `/auth/csrf/` when none is held.
    pub async fn ensure_csrf(&self) -> Result<String, ApiError> {
        if let Some(token) = self.cookies.get(CSRF_COOKIE) {
            return Ok(token);
        }
        let request = self.http.get(self.config.endpoint("/auth/csrf/"));
        let response = self.send(request).await?;
        let header_token = response
            .headers()
            .get("x-csrftoken")
            .and_then(|v| v.to_str().ok())
            .map(str::to_owned);
        read_body(response, "Failed to get CSRF token").await?;

        if let Some(token) = self.cookies.get(CSRF_COOKIE) {
            return Ok(token);
        }
        match header_token {
            Some(token) => {
                self.cookies.set(CSRF_COOKIE, token.clone());
                Ok(token)
            }
            None => Err(ApiError::Csrf),
        }
    }

    // -- transport ----------------------------------------------------------

    async fn execute(&self, request: RequestBuilder, fallback: &str) -> Result<Value, ApiError> {
        let response = self.send(request).await?;
        if response.status() == StatusCode::FORBIDDEN {
            // A rejected token is refetched on the next mutation.
            self.cookies.remove(CSRF_COOKIE);
        }
        read_body(response, fallback).await
    }

    async fn send(&self, request: RequestBuilder) -> Result<Response, ApiError> {
        let request = match self.cookies.header_value() {
            Some(cookies) => request.header(COOKIE, cookies),
            None => request,
        };
        let request = request.build().map_err(|source| ApiError::Transport {
            context: "failed to build request".to_owned(),
            source,
        })?;
        let method = request.method().clone();
        let url = request.url().path().to_owned();
        tracing::debug!(%method, path = %url, "api request");

        let response = self
            .http
            .execute(request)
            .await
            .map_err(|source| ApiError::Transport {
                context: format!("{method} {url} failed"),
                source,
            })?;

        self.cookies.store_from(response.headers());
        if response.status() == StatusCode::UNAUTHORIZED {
            tracing::warn!(%method, path = %url, "session expired, clearing cookies");
            self.clear_session();
            return Err(ApiError::SessionExpired);
        }
        Ok(response)
    }
}

async fn read_body(response: Response, fallback: &str) -> Result<Value, ApiError> {
    let status = response.status();
    let bytes = response.bytes().await.map_err(|source| ApiError::Transport {
        context: fallback.to_owned(),
        source,
    })?;

    if !status.is_success() {
        let message = serde_json::from_slice::<Value>(&bytes)
            .ok()
            .as_ref()
            .and_then(message_from_body)
            .unwrap_or_else(|| fallback.to_owned());
        tracing::debug!(status = status.as_u16(), %message, "api error response");
        return Err(ApiError::Http {
            status: status.as_u16(),
            message,
        });
    }

    if bytes.is_empty() {
        return Ok(Value::Null);
    }
    serde_json::from_slice(&bytes).map_err(|source| ApiError::Decode {
        context: fallback.to_owned(),
        source,
    })
}

pub(crate) fn decode<T: DeserializeOwned>(value: Value, context: &str) -> Result<T, ApiError> {
    serde_json::from_value(value).map_err(|source| ApiError::Decode {
        context: context.to_owned(),
        source,
    })
}
