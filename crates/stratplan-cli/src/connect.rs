//! Build an API client for remote commands and log in when credentials
//! are configured.

use anyhow::{Context, Result};

use stratplan_api::ApiClient;
use stratplan_api::queries::auth;

use crate::config::StratplanConfig;

/// Create a client for `config`. With a username and `STRATPLAN_PASSWORD`
/// set, the session is opened before any command runs; otherwise requests
/// go out anonymously and the backend decides.
pub async fn connect(config: &StratplanConfig) -> Result<ApiClient> {
    let client = ApiClient::new(config.api_config.clone())
        .with_context(|| format!("cannot create API client for {}", config.api_config.base_url))?;

    if let Some((username, password)) = config.credentials() {
        let user = auth::login(&client, &username, &password)
            .await
            .with_context(|| format!("login as {username} failed"))?;
        tracing::debug!(username = %user.user.username, "logged in");
    }
    Ok(client)
}
