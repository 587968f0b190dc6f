//! Decoding of raw model output into validated results.

use crate::models::GenerationResult;
use crate::schema::{Field, FieldType, Schema};
use crate::task::TaskKind;
use serde::de::DeserializeOwned;
use serde_json::Value;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("output is empty")]
    Empty,

    #[error("output is not valid JSON: {0}")]
    NotJson(#[source] serde_json::Error),

    #[error("missing required field `{0}`")]
    MissingField(String),

    #[error("field `{path}` should be {expected}")]
    WrongType { path: String, expected: &'static str },

    #[error("output does not decode as {kind}: {source}")]
    Decode {
        kind: TaskKind,
        #[source]
        source: serde_json::Error,
    },
}

/// Text returned by the generation service, assembled from its content
/// fragments. Only `decode` turns it into something a caller may see.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawOutput {
    text: String,
}

impl RawOutput {
    pub fn from_fragments<I, S>(fragments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let text = fragments
            .into_iter()
            .fold(String::new(), |mut acc, fragment| {
                acc.push_str(fragment.as_ref());
                acc
            });
        Self { text }
    }

    /// The unvalidated text, for diagnostics.
    pub fn as_str(&self) -> &str {
        &self.text
    }

    pub fn is_empty(&self) -> bool {
        self.text.trim().is_empty()
    }

    /// Parses the output and checks it against `schema`.
    ///
    /// Fields not declared by the schema are dropped. Nothing partial is ever
    /// returned: either every declared field is present with the right type or
    /// this fails.
    pub fn decode(&self, schema: &Schema) -> Result<GenerationResult, ValidationError> {
        let body = strip_code_fence(self.text.trim());
        if body.is_empty() {
            return Err(ValidationError::Empty);
        }

        let value: Value = serde_json::from_str(body).map_err(ValidationError::NotJson)?;
        check_object(&value, schema.root, "")?;

        let kind = schema.kind;
        Ok(match kind {
            TaskKind::Itinerary => GenerationResult::Itinerary(typed(kind, value)?),
            TaskKind::Checklist => GenerationResult::Checklist(typed(kind, value)?),
            TaskKind::CommCard => GenerationResult::CommCard(typed(kind, value)?),
            TaskKind::SensoryProfile => GenerationResult::SensoryProfile(typed(kind, value)?),
            TaskKind::Reshuffle => GenerationResult::Reshuffle(typed(kind, value)?),
            TaskKind::Script => GenerationResult::Script(typed(kind, value)?),
        })
    }
}

/// Accepts output wrapped whole in a markdown code fence, nothing else.
fn strip_code_fence(text: &str) -> &str {
    let Some(rest) = text.strip_prefix("```") else {
        return text;
    };
    let Some(inner) = rest.strip_suffix("```") else {
        return text;
    };
    match inner.split_once('\n') {
        Some((lang, body)) if !lang.contains('{') && !lang.contains('[') => body.trim(),
        _ => inner.trim(),
    }
}

fn typed<T: DeserializeOwned>(kind: TaskKind, value: Value) -> Result<T, ValidationError> {
    serde_json::from_value(value).map_err(|source| ValidationError::Decode { kind, source })
}

fn join(path: &str, name: &str) -> String {
    if path.is_empty() {
        name.to_string()
    } else {
        format!("{path}.{name}")
    }
}

fn check_object(value: &Value, fields: &[Field], path: &str) -> Result<(), ValidationError> {
    let Some(object) = value.as_object() else {
        return Err(ValidationError::WrongType {
            path: if path.is_empty() { "$".to_string() } else { path.to_string() },
            expected: "an object",
        });
    };

    for field in fields {
        let field_path = join(path, field.name);
        match object.get(field.name) {
            None | Some(Value::Null) => return Err(ValidationError::MissingField(field_path)),
            Some(child) => check(child, &field.ty, &field_path)?,
        }
    }
    Ok(())
}

fn check(value: &Value, ty: &FieldType, path: &str) -> Result<(), ValidationError> {
    let matches = match ty {
        FieldType::String => value.is_string(),
        FieldType::Integer => value.is_i64() || value.is_u64(),
        FieldType::PositiveInteger => value.as_u64().is_some_and(|n| n >= 1),
        FieldType::Number | FieldType::Score { .. } => value.is_number(),
        FieldType::Array(item) => {
            let Some(items) = value.as_array() else {
                return Err(ValidationError::WrongType {
                    path: path.to_string(),
                    expected: ty.describe(),
                });
            };
            for (index, child) in items.iter().enumerate() {
                check(child, item, &format!("{path}[{index}]"))?;
            }
            true
        }
        FieldType::Object(fields) => return check_object(value, fields, path),
    };

    if matches {
        Ok(())
    } else {
        Err(ValidationError::WrongType {
            path: path.to_string(),
            expected: ty.describe(),
        })
    }
}
