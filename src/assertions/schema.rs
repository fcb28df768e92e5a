//! Strict JSON Schema checks.
//!
//! Schemas used by scenarios must pin array cardinality exactly and may only
//! use keywords of the validator. The rules run before any data is checked,
//! so a loose schema fails even when the document would pass it.

use jsonschema::{Draft, JSONSchema};
use serde_json::{Map, Value};
use thiserror::Error;

/// Keywords a schema may use, without a leading `$`.
const KNOWN_KEYWORDS: &[&str] = &[
    "schema",
    "id",
    "ref",
    "comment",
    "definitions",
    "title",
    "description",
    "default",
    "examples",
    "readOnly",
    "writeOnly",
    "multipleOf",
    "maximum",
    "exclusiveMaximum",
    "minimum",
    "exclusiveMinimum",
    "maxLength",
    "minLength",
    "pattern",
    "additionalItems",
    "items",
    "maxItems",
    "minItems",
    "uniqueItems",
    "contains",
    "maxProperties",
    "minProperties",
    "required",
    "additionalProperties",
    "properties",
    "patternProperties",
    "dependencies",
    "propertyNames",
    "const",
    "enum",
    "type",
    "format",
    "contentMediaType",
    "contentEncoding",
    "if",
    "then",
    "else",
    "allOf",
    "anyOf",
    "oneOf",
    "not",
];

const ARRAY_ONLY: &[&str] = &["items", "maxItems", "minItems", "uniqueItems"];
const OBJECT_ONLY: &[&str] = &["properties", "minProperties", "maxProperties", "required"];

/// Errors raised while checking a schema or validating a document.
#[derive(Debug, Error, Eq, PartialEq)]
pub enum SchemaError {
    /// The schema breaks one of the strictness rules.
    #[error("{0}")]
    Requirement(String),
    /// The schema is not valid JSON Schema.
    #[error("invalid JSON schema: {0}")]
    Compile(String),
    /// The document does not satisfy the schema.
    #[error("JSON Schema validation failed:\n{report}")]
    Validation {
        /// Numbered `pointer: message` entries.
        report: String,
    },
}

fn requirement(message: impl Into<String>) -> SchemaError {
    SchemaError::Requirement(message.into())
}

fn require(condition: bool, message: impl FnOnce() -> String) -> Result<(), SchemaError> {
    if condition {
        Ok(())
    } else {
        Err(requirement(message()))
    }
}

fn has_other_type(schema: &Map<String, Value>, wanted: &str) -> bool {
    schema
        .get("type")
        .is_some_and(|kind| kind.as_str() != Some(wanted))
}

fn check_keywords(schema: &Map<String, Value>) -> Result<(), SchemaError> {
    for keyword in schema.keys() {
        let bare = keyword.trim_start_matches('$');
        require(KNOWN_KEYWORDS.contains(&bare), || {
            format!("Invalid schema validator: '{keyword}'")
        })?;
    }
    Ok(())
}

fn validate_object(value: &Value) -> Result<(), SchemaError> {
    let Some(schema) = value.as_object() else {
        return Ok(());
    };
    check_keywords(schema)?;
    if has_other_type(schema, "object") {
        return Ok(());
    }
    for keyword in ARRAY_ONLY {
        require(!schema.contains_key(*keyword), || {
            format!("'{keyword}' should not be used with object type")
        })?;
    }
    if let Some(properties) = schema.get("properties").and_then(Value::as_object) {
        for property in properties.values() {
            if property.get("type").and_then(Value::as_str) == Some("array") {
                validate_array(property)?;
            }
            validate_object(property)?;
        }
    }
    Ok(())
}

fn validate_items(schema: &Map<String, Value>, max_items: u64) -> Result<(), SchemaError> {
    if max_items == 0 {
        return Ok(());
    }
    let items = schema
        .get("items")
        .ok_or_else(|| requirement("'items' is required when maxItems > 0"))?;
    let items_object = items
        .as_object()
        .ok_or_else(|| requirement("'items' should be an object not an array"))?;
    if max_items > 1 {
        for combinator in ["allOf", "anyOf"] {
            require(!items_object.contains_key(combinator), || {
                format!("'{combinator}' should not be used with 'items'")
            })?;
        }
        if let Some(one_of) = items_object.get("oneOf") {
            let found = one_of.as_array().map_or(0, Vec::len);
            require(u64::try_from(found).is_ok_and(|count| count == max_items), || {
                format!("Expected {max_items} 'oneOf' items but found {found}")
            })?;
        }
    }
    Ok(())
}

fn validate_array(value: &Value) -> Result<(), SchemaError> {
    let Some(schema) = value.as_object() else {
        return Ok(());
    };
    check_keywords(schema)?;
    if has_other_type(schema, "array") {
        return Ok(());
    }
    let has_enum = schema.contains_key("enum");
    let has_const = schema.contains_key("const");
    let has_items = schema.contains_key("items");
    require(
        !((has_enum && has_const) || (has_enum && has_items) || (has_const && has_items)),
        || String::from("'items', 'enum' and 'const' should not be used together"),
    )?;
    if has_enum || has_const {
        return Ok(());
    }
    for keyword in OBJECT_ONLY {
        require(!schema.contains_key(*keyword), || {
            format!("'{keyword}' should not be used with array type")
        })?;
    }
    for keyword in ["maxItems", "minItems"] {
        require(schema.contains_key(keyword), || {
            format!("'{keyword}' is required for array assertion")
        })?;
    }
    require(schema.get("minItems") == schema.get("maxItems"), || {
        String::from("'minItems' and 'maxItems' should be equal for strict assertion")
    })?;
    let max_items = schema.get("maxItems").and_then(Value::as_u64).unwrap_or(0);
    validate_items(schema, max_items)?;
    let min_items = schema.get("minItems").and_then(Value::as_u64).unwrap_or(0);
    if min_items > 1 {
        require(schema.get("uniqueItems") == Some(&Value::Bool(true)), || {
            String::from("'uniqueItems' should be true when minItems > 1")
        })?;
    }
    match schema.get("items") {
        Some(items) => match items.get("oneOf").and_then(Value::as_array) {
            Some(alternatives) => alternatives.iter().try_for_each(validate_object),
            None => validate_object(items),
        },
        None => Ok(()),
    }
}

/// Checks `schema` against the strictness rules: a root `type` is required,
/// only known keywords are allowed, object and array keywords do not mix,
/// and arrays pin their cardinality with equal `minItems`/`maxItems`
/// unless they use `enum` or `const`.
///
/// # Errors
///
/// Returns [`SchemaError::Requirement`] naming the first broken rule.
pub fn validate_schema_requirements(schema: &Value) -> Result<(), SchemaError> {
    let kind = schema
        .get("type")
        .ok_or_else(|| requirement("'type' is required for root schema"))?;
    match kind.as_str() {
        Some("object") => validate_object(schema),
        Some("array") => validate_array(schema),
        _ => Ok(()),
    }
}

fn dotted(pointer: &str) -> String {
    pointer.trim_matches('/').replace('/', ".")
}

/// Validates `document` against `schema` after the strictness rules pass.
/// Violations are reported once per pointer, in order, numbered from 1.
///
/// # Errors
///
/// Returns [`SchemaError::Requirement`] for a loose schema,
/// [`SchemaError::Compile`] for an invalid one and
/// [`SchemaError::Validation`] when the document does not match.
pub fn assert_json_matches_schema(document: &Value, schema: &Value) -> Result<(), SchemaError> {
    validate_schema_requirements(schema)?;
    let compiled = JSONSchema::options()
        .with_draft(Draft::Draft7)
        .compile(schema)
        .map_err(|err| SchemaError::Compile(err.to_string()))?;
    let Err(errors) = compiled.validate(document) else {
        return Ok(());
    };
    let mut entries = Vec::new();
    let mut previous: Option<String> = None;
    for error in errors {
        let schema_pointer = dotted(&error.schema_path.to_string());
        let mut pointer = if schema_pointer.contains("additionalProperties") {
            dotted(&error.instance_path.to_string())
        } else {
            schema_pointer
        };
        if pointer.is_empty() {
            pointer = String::from("{root}");
        }
        if previous.as_deref() == Some(pointer.as_str()) {
            continue;
        }
        entries.push(format!("{}. {pointer}:\n\t - {error}\n", entries.len() + 1));
        previous = Some(pointer);
    }
    Err(SchemaError::Validation {
        report: entries.join("\n"),
    })
}
