//! Login, logout and the shared current-user lookup.

use serde_json::Value;

use crate::client::ApiClient;
use crate::error::ApiError;
use crate::models::{AuthResponse, Credentials, CurrentUser};
use crate::session::SessionState;

const LOGIN_FAILED: &str = "Login failed";

/// Log in and store the user in the session context.
pub async fn login(
    client: &ApiClient,
    username: &str,
    password: &str,
) -> Result<CurrentUser, ApiError> {
    let ticket = client.session().begin();
    let credentials = Credentials { username, password };
    let response: AuthResponse = match client
        .post("/auth/login/", &[], Some(&credentials), LOGIN_FAILED)
        .await
    {
        Ok(response) => response,
        Err(ApiError::SessionExpired) => {
            return Err(ApiError::LoginFailed("Invalid credentials".to_owned()));
        }
        Err(ApiError::Http { message, .. }) => return Err(ApiError::LoginFailed(message)),
        Err(err) => return Err(err),
    };

    if response.success == Some(false) {
        let message = response.error.unwrap_or_else(|| LOGIN_FAILED.to_owned());
        return Err(ApiError::LoginFailed(message));
    }
    let user = response
        .into_current_user()
        .ok_or_else(|| ApiError::LoginFailed(LOGIN_FAILED.to_owned()))?;

    client
        .session()
        .complete(ticket, SessionState::Authenticated(user.clone()));
    tracing::info!(username, organizations = user.organizations.len(), "logged in");
    Ok(user)
}

/// Log out. Local cookies and session state are dropped even when the
/// request fails.
pub async fn logout(client: &ApiClient) -> Result<(), ApiError> {
    let result = client
        .post_empty::<Value>("/auth/logout/", &[], "Logout failed")
        .await;
    client.clear_session();
    match result {
        Ok(_) | Err(ApiError::SessionExpired) => {
            tracing::info!("logged out");
            Ok(())
        }
        Err(err) => Err(err),
    }
}

/// Raw `/auth/check/` call. Does not touch the session context.
pub async fn check(client: &ApiClient) -> Result<AuthResponse, ApiError> {
    client
        .get("/auth/check/", &[], "Failed to check authentication")
        .await
}

/// Re-fetch the current user.
///
/// When a newer refresh, login or logout overtook this one, its result is
/// discarded and the newer state is returned instead.
pub async fn refresh_current_user(client: &ApiClient) -> Result<SessionState, ApiError> {
    let session = client.session();
    let ticket = session.begin();
    let state = match check(client).await {
        Ok(response) if response.is_authenticated => match response.into_current_user() {
            Some(user) => SessionState::Authenticated(user),
            None => SessionState::Anonymous,
        },
        Ok(_) | Err(ApiError::SessionExpired) => SessionState::Anonymous,
        Err(err) => return Err(err),
    };

    if session.complete(ticket, state.clone()) {
        Ok(state)
    } else {
        Ok(session.state())
    }
}

/// The current user, fetched once and then served from the session context.
pub async fn current_user(client: &ApiClient) -> Result<Option<CurrentUser>, ApiError> {
    if client.session().is_known() {
        return Ok(client.session().current_user());
    }
    let state = refresh_current_user(client).await?;
    Ok(state.user().cloned())
}

/// The current user, or [`ApiError::SessionExpired`] when nobody is logged in.
pub async fn require_user(client: &ApiClient) -> Result<CurrentUser, ApiError> {
    current_user(client).await?.ok_or(ApiError::SessionExpired)
}
