//! Google Gemini `generateContent` wire format.
//!
//! # Example request
//! ```json
//! {
//!   "contents": [{"role": "user", "parts": [{"text": "..."}]}],
//!   "generationConfig": {
//!     "responseMimeType": "application/json",
//!     "responseSchema": {"type": "OBJECT", "properties": {...}, "required": [...]}
//!   }
//! }
//! ```

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use trip_core::{Field, FieldType, Prompt, Schema};

pub const JSON_MIME_TYPE: &str = "application/json";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeminiRequest {
    pub contents: Vec<GeminiContent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub generation_config: Option<GenerationConfig>,
}

impl GeminiRequest {
    /// A single user turn asking for JSON shaped like the prompt's schema.
    pub fn structured(prompt: &Prompt) -> Self {
        Self {
            contents: vec![GeminiContent {
                role: "user".to_string(),
                parts: vec![GeminiPart {
                    text: Some(prompt.text().to_string()),
                }],
            }],
            generation_config: Some(GenerationConfig {
                response_mime_type: JSON_MIME_TYPE.to_string(),
                response_schema: Some(GeminiSchema::from(prompt.schema())),
            }),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationConfig {
    pub response_mime_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_schema: Option<GeminiSchema>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeminiContent {
    /// "user" or "model"
    #[serde(default)]
    pub role: String,
    #[serde(default)]
    pub parts: Vec<GeminiPart>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeminiPart {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SchemaType {
    String,
    Integer,
    Number,
    Array,
    Object,
}

/// OpenAPI-subset schema accepted as `responseSchema`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeminiSchema {
    #[serde(rename = "type")]
    pub schema_type: SchemaType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub properties: Option<BTreeMap<String, GeminiSchema>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub required: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub items: Option<Box<GeminiSchema>>,
}

impl GeminiSchema {
    fn leaf(schema_type: SchemaType) -> Self {
        Self {
            schema_type,
            properties: None,
            required: None,
            items: None,
        }
    }

    fn object(fields: &[Field]) -> Self {
        Self {
            schema_type: SchemaType::Object,
            properties: Some(
                fields
                    .iter()
                    .map(|field| (field.name.to_string(), GeminiSchema::from(&field.ty)))
                    .collect(),
            ),
            required: Some(fields.iter().map(|field| field.name.to_string()).collect()),
            items: None,
        }
    }
}

impl From<&FieldType> for GeminiSchema {
    fn from(ty: &FieldType) -> Self {
        match ty {
            FieldType::String => GeminiSchema::leaf(SchemaType::String),
            FieldType::Integer | FieldType::PositiveInteger => {
                GeminiSchema::leaf(SchemaType::Integer)
            }
            FieldType::Number | FieldType::Score { .. } => GeminiSchema::leaf(SchemaType::Number),
            FieldType::Array(item) => GeminiSchema {
                items: Some(Box::new(GeminiSchema::from(*item))),
                ..GeminiSchema::leaf(SchemaType::Array)
            },
            FieldType::Object(fields) => GeminiSchema::object(fields),
        }
    }
}

impl From<&Schema> for GeminiSchema {
    fn from(schema: &Schema) -> Self {
        GeminiSchema::object(schema.root)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeminiResponse {
    #[serde(default)]
    pub candidates: Vec<GeminiCandidate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prompt_feedback: Option<Value>,
}

impl GeminiResponse {
    /// Text of every part of every candidate, in order.
    pub fn text_fragments(&self) -> impl Iterator<Item = &str> {
        self.candidates
            .iter()
            .filter_map(|candidate| candidate.content.as_ref())
            .flat_map(|content| content.parts.iter())
            .filter_map(|part| part.text.as_deref())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeminiCandidate {
    #[serde(default)]
    pub content: Option<GeminiContent>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finish_reason: Option<String>,
}
