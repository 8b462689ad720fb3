//! Intake controller: turns raw form input into validated requests.
//!
//! Everything here is a pure function so it can be exercised without a
//! backend. A request that fails validation is never handed to the gateway.

use serde_json::{Map, Value};

use crate::error::ValidationError;
use crate::models::{DesignRequest, RevisionRequest};

/// Validate and normalize the three intake fields into a [`DesignRequest`].
pub fn build_request(
    raw_requirements: &str,
    raw_assumptions: &str,
    raw_constraints: &str,
) -> Result<DesignRequest, ValidationError> {
    let requirements = raw_requirements.trim();
    if requirements.is_empty() {
        return Err(ValidationError::EmptyRequirements);
    }

    Ok(DesignRequest {
        requirements: requirements.to_string(),
        assumptions: parse_assumptions(raw_assumptions)?,
        constraints: parse_constraints(raw_constraints),
    })
}

/// Validate a revision of an existing design.
pub fn build_revision(design_id: &str, raw_edits: &str) -> Result<RevisionRequest, ValidationError> {
    let design_id = design_id.trim();
    if design_id.is_empty() {
        return Err(ValidationError::EmptyDesignId);
    }
    let user_edits = raw_edits.trim();
    if user_edits.is_empty() {
        return Err(ValidationError::EmptyEdits);
    }

    Ok(RevisionRequest {
        design_id: design_id.to_string(),
        user_edits: user_edits.to_string(),
    })
}

/// Blank text means no assumptions. Anything else must be a JSON object;
/// the values inside are passed through untouched.
pub fn parse_assumptions(raw: &str) -> Result<Map<String, Value>, ValidationError> {
    if raw.trim().is_empty() {
        return Ok(Map::new());
    }

    match serde_json::from_str::<Value>(raw) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(other) => Err(ValidationError::InvalidAssumptionsJson(format!(
            "expected a JSON object, found {}",
            json_type_name(&other)
        ))),
        Err(e) => Err(ValidationError::InvalidAssumptionsJson(e.to_string())),
    }
}

/// Comma-separated list; segments are trimmed and empty ones dropped.
pub fn parse_constraints(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|c| !c.is_empty())
        .map(str::to_string)
        .collect()
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
