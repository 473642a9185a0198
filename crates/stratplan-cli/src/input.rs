//! Reading plan, budget and costing input files.

use std::path::Path;

use anyhow::{Context, Result};
use serde_json::Value;

use stratplan_core::costing::CostAssumptions;
use stratplan_core::model::PlanDocument;
use stratplan_core::normalize::normalize_plan;

/// Read and parse a JSON file.
pub fn read_json(path: &Path) -> Result<Value> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    serde_json::from_str(&content)
        .with_context(|| format!("failed to parse {} as JSON", path.display()))
}

/// Read a plan as the backend serves it and normalize it.
pub fn load_plan(path: &Path) -> Result<PlanDocument> {
    let value = read_json(path)?;
    let (plan, coercions) =
        normalize_plan(&value).with_context(|| format!("invalid plan in {}", path.display()))?;
    if !coercions.is_empty() {
        tracing::debug!(
            path = %path.display(),
            coercions = coercions.len(),
            "plan file normalized"
        );
    }
    Ok(plan)
}

/// Default rates, or the overrides in `path`.
pub fn load_rates(path: Option<&Path>) -> Result<CostAssumptions> {
    match path {
        Some(path) => CostAssumptions::load(path)
            .with_context(|| format!("failed to load rates from {}", path.display())),
        None => Ok(CostAssumptions::default()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn load_plan_normalizes_fixture() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("plan.json");
        std::fs::write(&path, stratplan_test_utils::messy_plan_json().to_string()).unwrap();

        let plan = load_plan(&path).unwrap();
        assert_eq!(plan.id, "42");
        assert_eq!(plan.objectives.len(), 1);
    }

    #[test]
    fn read_json_reports_path() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("broken.json");
        std::fs::write(&path, "{not json").unwrap();

        let err = read_json(&path).unwrap_err();
        assert!(err.to_string().contains("broken.json"), "unexpected error: {err}");
    }

    #[test]
    fn non_object_plan_rejected() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("plan.json");
        std::fs::write(&path, "[1, 2]").unwrap();

        assert!(load_plan(&path).is_err());
    }

    #[test]
    fn rates_default_without_file() {
        let rates = load_rates(None).unwrap();
        assert_eq!(rates, CostAssumptions::default());
    }
}
