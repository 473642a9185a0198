use serde_json::Value;
use thiserror::Error;

use stratplan_core::budget::BudgetError;
use stratplan_core::normalize::NormalizeError;
use stratplan_core::weight::WeightError;
use stratplan_core::workflow::WorkflowError;

#[derive(Debug, Error)]
pub enum ApiError {
    /// The backend answered 401. Cookies and session state are already
    /// cleared; the caller must log in again.
    #[error("session expired; log in again")]
    SessionExpired,

    #[error("{message}")]
    Http { status: u16, message: String },

    #[error("{context}: {source}")]
    Transport {
        context: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("{context}: unexpected response: {source}")]
    Decode {
        context: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("could not obtain a CSRF token")]
    Csrf,

    #[error("{0}")]
    LoginFailed(String),

    #[error("{0}")]
    Invalid(String),

    #[error(transparent)]
    Weight(#[from] WeightError),

    #[error(transparent)]
    Budget(#[from] BudgetError),

    #[error(transparent)]
    Workflow(#[from] WorkflowError),

    #[error(transparent)]
    Normalize(#[from] NormalizeError),
}

impl ApiError {
    /// Transport failures and 5xx responses are worth another attempt.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Transport { .. } => true,
            Self::Http { status, .. } => *status >= 500,
            _ => false,
        }
    }

    /// Whether the error was raised locally, before any request was sent.
    pub fn is_local(&self) -> bool {
        matches!(
            self,
            Self::Invalid(_) | Self::Weight(_) | Self::Budget(_) | Self::Workflow(_)
        )
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Http { status, .. } => Some(*status),
            Self::SessionExpired => Some(401),
            _ => None,
        }
    }
}

/// Pull a human-readable message out of an error body.
///
/// Tries `detail`, `error` and `message` at the top level and under `data`,
/// then Django-style field errors (`{"weight": ["..."]}`).
pub fn message_from_body(body: &Value) -> Option<String> {
    let object = body.as_object()?;
    for key in ["detail", "error", "message"] {
        if let Some(text) = object.get(key).and_then(text_of) {
            return Some(text);
        }
    }
    if let Some(nested) = object.get("data").and_then(message_from_body) {
        return Some(nested);
    }

    let fields: Vec<String> = object
        .iter()
        .filter_map(|(field, value)| text_of(value).map(|text| format!("{field}: {text}")))
        .collect();
    if fields.is_empty() {
        None
    } else {
        Some(fields.join("; "))
    }
}

fn text_of(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.trim().is_empty() => Some(s.clone()),
        Value::Array(items) => {
            let parts: Vec<String> = items.iter().filter_map(text_of).collect();
            if parts.is_empty() {
                None
            } else {
                Some(parts.join(" "))
            }
        }
        _ => None,
    }
}
