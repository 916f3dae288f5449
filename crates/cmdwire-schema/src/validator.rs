use jsonschema::Validator;
use serde_json::Value;

use crate::error::{Result, SchemaError};

/// Report at most this many violations per failure.
const MAX_REPORTED_ERRORS: usize = 4;

pub(crate) fn validate_params(command: &str, params: &Value, validator: &Validator) -> Result<()> {
    let messages: Vec<String> = validator
        .iter_errors(params)
        .take(MAX_REPORTED_ERRORS)
        .map(|err| err.to_string())
        .collect();

    if messages.is_empty() {
        return Ok(());
    }

    Err(SchemaError::ValidationFailed {
        command: command.to_string(),
        message: messages.join("; "),
    })
}
