//! Data validation against resolved schemas.

use serde_json::Value;

use crate::error::{ResolveError, SchemaError, ValidateError};
use crate::resolver::{resolve, strip_annotations};
use crate::types::ResolveOptions;

/// Validate a data record against a CRF schema.
///
/// Resolves the schema against the record (conditionals applied, undeclared
/// data synthesized), strips the crf:* annotations, then validates the record
/// against the result.
///
/// # Errors
///
/// Returns `ValidateError::Resolve` if the resolved schema can't be compiled,
/// or `ValidateError::Invalid` if the record doesn't match the schema.
pub fn validate(
    schema: &Value,
    data: &Value,
    options: &ResolveOptions,
) -> Result<(), ValidateError> {
    let resolution = resolve(schema, data, options);
    let stripped = strip_annotations(&resolution.schema);
    validate_against_schema(&stripped, data)
}

/// Validate a data record against an already-resolved schema.
///
/// Use this when you've already resolved the schema and want to validate
/// multiple records against it. The schema should be annotation-free; pass
/// it through [`strip_annotations`] first if it came straight out of
/// [`resolve`].
pub fn validate_against_schema(schema: &Value, data: &Value) -> Result<(), ValidateError> {
    let validator = jsonschema::validator_for(schema).map_err(|e| {
        ValidateError::Resolve(ResolveError::InvalidSchema {
            message: e.to_string(),
        })
    })?;

    let errors: Vec<SchemaError> = validator
        .iter_errors(data)
        .map(|e| SchemaError {
            path: e.instance_path.to_string(),
            message: e.to_string(),
        })
        .collect();

    if errors.is_empty() {
        Ok(())
    } else {
        Err(ValidateError::Invalid { errors })
    }
}
