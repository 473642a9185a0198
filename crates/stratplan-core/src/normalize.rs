//! Reshape loosely-typed plan payloads into the canonical tree.
//!
//! The backend sometimes returns a nested collection as a single object, as
//! `null`, or not at all. [`normalize_value`] walks a deep copy of the
//! payload and makes every collection along
//! `objectives[].{programs[].{subprograms[]}, initiatives[]}.performance_measures[]/main_activities[].selected_months[]/selected_quarters[]`
//! and `reviews[]` a JSON array:
//!
//! - an array is kept, with `null` and wrongly-typed elements dropped;
//! - `null`, `false`, `0` and `""` become `[]`;
//! - any other value is wrapped in a one-element array.
//!
//! Every change is recorded as a [`Coercion`] and logged, so corrupt
//! upstream data is visible instead of silently masked. Running the pass
//! on its own output changes nothing.

use std::fmt;

use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use thiserror::Error;

use crate::model::PlanDocument;

#[derive(Debug, Error)]
pub enum NormalizeError {
    #[error("plan payload must be a JSON object, got {0}")]
    NotAnObject(&'static str),

    #[error("plan does not match the expected shape: {0}")]
    Shape(#[from] serde_json::Error),
}

/// What the normalizer did at one path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CoercionKind {
    /// Field absent; an empty array was inserted.
    Missing,
    /// Field was null or another falsy scalar; replaced by an empty array.
    Emptied,
    /// Single value wrapped in a one-element array.
    Wrapped,
    /// Array elements that were null or of the wrong type were removed.
    DroppedElements(usize),
}

impl fmt::Display for CoercionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Missing => f.write_str("missing, defaulted to []"),
            Self::Emptied => f.write_str("empty value replaced by []"),
            Self::Wrapped => f.write_str("single value wrapped in array"),
            Self::DroppedElements(n) => write!(f, "dropped {n} invalid element(s)"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Coercion {
    pub path: String,
    pub kind: CoercionKind,
}

/// Output of a normalization pass.
#[derive(Debug, Clone, PartialEq)]
pub struct Normalized {
    pub value: Value,
    pub coercions: Vec<Coercion>,
}

impl Normalized {
    /// Whether the pass changed the shape of anything beyond filling in
    /// absent fields.
    pub fn reshaped(&self) -> bool {
        self.coercions
            .iter()
            .any(|c| c.kind != CoercionKind::Missing)
    }
}

/// Normalize a plan payload. The input is never modified. Non-object
/// payloads are returned unchanged.
pub fn normalize_value(input: &Value) -> Normalized {
    let mut value = input.clone();
    let mut coercions = Vec::new();
    if let Value::Object(plan) = &mut value {
        walk_plan(plan, &mut coercions);
    }
    Normalized { value, coercions }
}

/// Normalize and deserialize into a [`PlanDocument`].
pub fn normalize_plan(input: &Value) -> Result<(PlanDocument, Vec<Coercion>), NormalizeError> {
    if !input.is_object() {
        return Err(NormalizeError::NotAnObject(json_type(input)));
    }
    let Normalized { value, coercions } = normalize_value(input);
    let plan = serde_json::from_value(value)?;
    Ok((plan, coercions))
}

/// Entity lists served by the per-resource endpoints.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListKind {
    Objectives,
    Programs,
    SubPrograms,
    Initiatives,
    Measures,
    Activities,
}

impl ListKind {
    fn key(self) -> &'static str {
        match self {
            Self::Objectives => "objectives",
            Self::Programs => "programs",
            Self::SubPrograms => "subprograms",
            Self::Initiatives => "initiatives",
            Self::Measures => "performance_measures",
            Self::Activities => "main_activities",
        }
    }
}

/// Normalize a list response with the same rules as a plan. The result is
/// always an array.
pub fn normalize_list(kind: ListKind, input: &Value) -> Normalized {
    let key = kind.key();
    let path = "response";
    let mut holder = Map::new();
    holder.insert(key.to_owned(), input.clone());
    let mut coercions = Vec::new();

    let out = &mut coercions;
    for (i, item) in ensure_array(&mut holder, key, Element::Object, path, out)
        .iter_mut()
        .enumerate()
    {
        let Value::Object(item) = item else {
            continue;
        };
        let item_path = format!("{path}.{key}[{i}]");
        match kind {
            ListKind::Objectives => walk_objective(item, &item_path, out),
            ListKind::Programs => walk_program(item, &item_path, out),
            ListKind::SubPrograms => walk_initiatives(item, &item_path, out),
            ListKind::Initiatives => walk_initiative(item, &item_path, out),
            ListKind::Measures => {}
            ListKind::Activities => walk_activity(item, &item_path, out),
        }
    }

    let value = holder.remove(key).unwrap_or_else(|| Value::Array(Vec::new()));
    Normalized { value, coercions }
}

/// Normalize and deserialize a list response.
pub fn normalize_items<T: DeserializeOwned>(
    kind: ListKind,
    input: &Value,
) -> Result<Vec<T>, NormalizeError> {
    let Normalized { value, .. } = normalize_list(kind, input);
    Ok(serde_json::from_value(value)?)
}

// ---------------------------------------------------------------------------

#[derive(Clone, Copy)]
enum Element {
    Object,
    Text,
}

fn walk_plan(plan: &mut Map<String, Value>, out: &mut Vec<Coercion>) {
    let path = "plan";
    for (i, objective) in ensure_array(plan, "objectives", Element::Object, path, out)
        .iter_mut()
        .enumerate()
    {
        if let Value::Object(objective) = objective {
            walk_objective(objective, &format!("{path}.objectives[{i}]"), out);
        }
    }
    ensure_array(plan, "reviews", Element::Object, path, out);
}

fn walk_objective(objective: &mut Map<String, Value>, path: &str, out: &mut Vec<Coercion>) {
    for (i, program) in ensure_array(objective, "programs", Element::Object, path, out)
        .iter_mut()
        .enumerate()
    {
        if let Value::Object(program) = program {
            walk_program(program, &format!("{path}.programs[{i}]"), out);
        }
    }
    walk_initiatives(objective, path, out);
}

fn walk_program(program: &mut Map<String, Value>, path: &str, out: &mut Vec<Coercion>) {
    for (j, sub) in ensure_array(program, "subprograms", Element::Object, path, out)
        .iter_mut()
        .enumerate()
    {
        if let Value::Object(sub) = sub {
            walk_initiatives(sub, &format!("{path}.subprograms[{j}]"), out);
        }
    }
    walk_initiatives(program, path, out);
}

fn walk_initiatives(parent: &mut Map<String, Value>, path: &str, out: &mut Vec<Coercion>) {
    for (i, initiative) in ensure_array(parent, "initiatives", Element::Object, path, out)
        .iter_mut()
        .enumerate()
    {
        if let Value::Object(initiative) = initiative {
            walk_initiative(initiative, &format!("{path}.initiatives[{i}]"), out);
        }
    }
}

fn walk_initiative(initiative: &mut Map<String, Value>, path: &str, out: &mut Vec<Coercion>) {
    ensure_array(initiative, "performance_measures", Element::Object, path, out);
    for (j, activity) in ensure_array(initiative, "main_activities", Element::Object, path, out)
        .iter_mut()
        .enumerate()
    {
        if let Value::Object(activity) = activity {
            walk_activity(activity, &format!("{path}.main_activities[{j}]"), out);
        }
    }
}

fn walk_activity(activity: &mut Map<String, Value>, path: &str, out: &mut Vec<Coercion>) {
    ensure_array(activity, "selected_months", Element::Text, path, out);
    ensure_array(activity, "selected_quarters", Element::Text, path, out);
}

/// Make `obj[key]` an array of `element`s and return it for further walking.
fn ensure_array<'a>(
    obj: &'a mut Map<String, Value>,
    key: &str,
    element: Element,
    path: &str,
    out: &mut Vec<Coercion>,
) -> &'a mut [Value] {
    let field_path = format!("{path}.{key}");
    let present = obj.contains_key(key);
    let slot = obj.entry(key.to_owned()).or_insert(Value::Null);

    let mut items = match slot.take() {
        Value::Array(items) => items,
        _ if !present => {
            record(out, &field_path, CoercionKind::Missing);
            Vec::new()
        }
        other if is_falsy(&other) => {
            record(out, &field_path, CoercionKind::Emptied);
            Vec::new()
        }
        other => {
            record(out, &field_path, CoercionKind::Wrapped);
            vec![other]
        }
    };

    // Null or wrongly-typed elements cannot become entities; they are
    // dropped and recorded rather than failing the whole plan.
    let before = items.len();
    items.retain(|item| match element {
        Element::Object => item.is_object(),
        Element::Text => item.is_string(),
    });
    let dropped = before - items.len();
    if dropped > 0 {
        record(out, &field_path, CoercionKind::DroppedElements(dropped));
    }

    *slot = Value::Array(items);
    match slot {
        Value::Array(items) => items.as_mut_slice(),
        _ => &mut [],
    }
}

fn record(out: &mut Vec<Coercion>, path: &str, kind: CoercionKind) {
    match kind {
        CoercionKind::Missing => tracing::debug!(path, %kind, "plan field coerced"),
        _ => tracing::warn!(path, %kind, "plan field coerced"),
    }
    out.push(Coercion {
        path: path.to_owned(),
        kind,
    });
}

fn is_falsy(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Bool(b) => !b,
        Value::Number(n) => n.as_f64() == Some(0.0),
        Value::String(s) => s.is_empty(),
        _ => false,
    }
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
