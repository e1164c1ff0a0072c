//! Required-parameter validation
//!
//! Every façade call checks its identifiers here before anything is sent,
//! and reports all empty fields at once rather than the first one found.

use thiserror::Error;

/// One or more required parameters were empty
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("missing required parameter(s): {}", .fields.join(", "))]
pub struct ValidationError {
    /// Names of the empty parameters, in the order they were checked
    pub fields: Vec<String>,
}

/// Check that every `(name, value)` pair has a non-empty value
pub fn validate_parameters(params: &[(&str, &str)]) -> Result<(), ValidationError> {
    let fields: Vec<String> = params
        .iter()
        .filter(|(_, value)| value.is_empty())
        .map(|(name, _)| name.to_string())
        .collect();

    if fields.is_empty() {
        Ok(())
    } else {
        Err(ValidationError { fields })
    }
}

/// Render identifiers as `name=value` pairs for error context
pub(crate) fn describe(params: &[(&str, &str)]) -> String {
    params
        .iter()
        .map(|(name, value)| format!("{}={}", name, value))
        .collect::<Vec<_>>()
        .join(" ")
}
