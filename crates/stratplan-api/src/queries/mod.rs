//! Query functions, one module per backend resource family.
//!
//! Every create/update re-reads the siblings it competes with and checks the
//! candidate locally before sending anything, so a rejected weight or an
//! over-funded budget never reaches the network.

pub mod activities;
pub mod auth;
pub mod budgets;
pub mod initiatives;
pub mod measures;
pub mod objectives;
pub mod plans;
pub mod programs;

use serde::de::DeserializeOwned;
use serde_json::Value;

use stratplan_core::normalize::{ListKind, normalize_items};

use crate::error::ApiError;
use crate::models::{WeightVerdict, list_items};

/// Normalize and decode a list response.
pub(crate) fn decode_list<T: DeserializeOwned>(
    kind: ListKind,
    value: Value,
) -> Result<Vec<T>, ApiError> {
    let items = Value::Array(list_items(value));
    Ok(normalize_items(kind, &items)?)
}

/// Normalize and decode a single-entity response.
pub(crate) fn decode_one<T: DeserializeOwned>(
    kind: ListKind,
    value: Value,
    context: &str,
) -> Result<T, ApiError> {
    let body = match value {
        Value::Object(mut map) if map.get("data").is_some_and(Value::is_object) => {
            map.remove("data").unwrap_or(Value::Null)
        }
        other => other,
    };
    if !body.is_object() {
        return Err(ApiError::Invalid(format!("{context}: empty response")));
    }
    normalize_items(kind, &Value::Array(vec![body]))?
        .into_iter()
        .next()
        .ok_or_else(|| ApiError::Invalid(format!("{context}: empty response")))
}

/// Map a 404 to `None`.
pub(crate) fn optional<T>(result: Result<T, ApiError>) -> Result<Option<T>, ApiError> {
    match result {
        Ok(value) => Ok(Some(value)),
        Err(ApiError::Http { status: 404, .. }) => Ok(None),
        Err(err) => Err(err),
    }
}

/// Turn a `validate_*_weight` response into a verdict. The backend answers
/// an invalid total with a 400 carrying the reason.
pub(crate) fn verdict(result: Result<Value, ApiError>) -> Result<WeightVerdict, ApiError> {
    match result {
        Ok(body) => Ok(WeightVerdict::from_value(&body)),
        Err(ApiError::Http { status: 400, message }) => Ok(WeightVerdict {
            is_valid: false,
            message,
        }),
        Err(err) => Err(err),
    }
}

/// Position of `id` among siblings, for the edit case of weight checks.
pub(crate) fn position<'a>(mut ids: impl Iterator<Item = &'a str>, id: &str) -> Option<usize> {
    ids.position(|candidate| candidate == id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use stratplan_core::model::{MainActivity, StrategicInitiative};

    #[test]
    fn list_accepts_wrapped_payloads() {
        let initiatives: Vec<StrategicInitiative> = decode_list(
            ListKind::Initiatives,
            json!({"data": [{"id": 7, "name": "A", "weight": "20.00", "performance_measures": null}]}),
        )
        .unwrap();
        assert_eq!(initiatives.len(), 1);
        assert_eq!(initiatives[0].id, "7");
        assert_eq!(initiatives[0].weight, 20.0);
    }

    #[test]
    fn one_unwraps_data_and_normalizes() {
        let activity: MainActivity = decode_one(
            ListKind::Activities,
            json!({"data": {"id": 3, "selected_months": "JUL"}}),
            "activity",
        )
        .unwrap();
        assert_eq!(activity.period_labels(), vec!["JUL".to_owned()]);
    }

    #[test]
    fn one_rejects_empty_body() {
        let err = decode_one::<MainActivity>(ListKind::Activities, Value::Null, "activity")
            .unwrap_err();
        assert!(matches!(err, ApiError::Invalid(_)));
    }

    #[test]
    fn bad_request_is_invalid_verdict() {
        let rejected = verdict(Err(ApiError::Http {
            status: 400,
            message: "Total weight must be 100%".into(),
        }))
        .unwrap();
        assert!(!rejected.is_valid);
        assert_eq!(rejected.message, "Total weight must be 100%");

        let accepted = verdict(Ok(json!({"is_valid": true, "message": "ok"}))).unwrap();
        assert!(accepted.is_valid);
    }

    #[test]
    fn not_found_is_none() {
        let missing: Result<u8, ApiError> = Err(ApiError::Http {
            status: 404,
            message: "Not found.".into(),
        });
        assert_eq!(optional(missing).unwrap(), None);

        let denied: Result<u8, ApiError> = Err(ApiError::Http {
            status: 403,
            message: "nope".into(),
        });
        assert!(optional(denied).is_err());
    }
}
