//! Message payload parsing for publish commands.

use crate::service::PubsubMessage;
use serde_json::Value;
use std::collections::BTreeMap;
use thiserror::Error;

/// Input rejected before any remote call is made.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("topic id must not be empty")]
    EmptyTopic,
    #[error("message must be valid JSON: {0}")]
    InvalidJson(String),
    #[error("message must be a JSON object with a \"data\" field")]
    MissingData,
    #[error("attribute {0} must be a string")]
    InvalidAttribute(String),
    #[error("attribute {0} is reserved for the sequence number")]
    ReservedAttribute(String),
}

/// Parsed message ready to be turned into a [`PubsubMessage`].
#[derive(Debug, Clone, PartialEq)]
pub struct MessageDraft {
    pub data: Value,
    pub attributes: BTreeMap<String, String>,
}

impl MessageDraft {
    /// Parse CLI input. Objects carrying `data` use it (plus optional
    /// string `attributes`); any other JSON value is published whole.
    pub fn parse(text: &str) -> Result<Self, ValidationError> {
        let value = parse_json(text)?;
        if has_data(&value) {
            Self::from_value(value)
        } else {
            Ok(Self {
                data: value,
                attributes: BTreeMap::new(),
            })
        }
    }

    /// Build a draft from a value that must contain a non-null `data` field.
    pub fn from_value(value: Value) -> Result<Self, ValidationError> {
        let Value::Object(mut fields) = value else {
            return Err(ValidationError::MissingData);
        };
        let data = match fields.remove("data") {
            Some(Value::Null) | None => return Err(ValidationError::MissingData),
            Some(data) => data,
        };
        let mut attributes = BTreeMap::new();
        if let Some(Value::Object(raw)) = fields.remove("attributes") {
            for (key, value) in raw {
                match value {
                    Value::String(s) => {
                        attributes.insert(key, s);
                    }
                    _ => return Err(ValidationError::InvalidAttribute(key)),
                }
            }
        }
        Ok(Self { data, attributes })
    }

    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }

    pub fn into_message(self) -> PubsubMessage {
        PubsubMessage {
            data: encode_data(&self.data),
            attributes: self.attributes,
            ..Default::default()
        }
    }
}

/// Parse text as JSON, reporting the decoder's diagnostic on failure.
pub fn parse_json(text: &str) -> Result<Value, ValidationError> {
    serde_json::from_str(text).map_err(|err| ValidationError::InvalidJson(err.to_string()))
}

/// Strings travel as their raw UTF-8 bytes, structured values as JSON text.
pub fn encode_data(data: &Value) -> Vec<u8> {
    match data {
        Value::String(s) => s.as_bytes().to_vec(),
        other => other.to_string().into_bytes(),
    }
}

fn has_data(value: &Value) -> bool {
    value.as_object().is_some_and(|obj| obj.contains_key("data"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn non_json_is_rejected() {
        let err = MessageDraft::parse("Hello, world!").unwrap_err();
        assert!(matches!(err, ValidationError::InvalidJson(_)));
    }

    #[test]
    fn object_with_data_uses_field_and_attributes() {
        let draft = MessageDraft::parse(
            r#"{"data":"Hello, world!","attributes":{"origin":"cli"}}"#,
        )
        .unwrap();
        assert_eq!(draft.data, json!("Hello, world!"));
        assert_eq!(draft.attributes.get("origin").map(String::as_str), Some("cli"));
        let msg = draft.into_message();
        assert_eq!(msg.data, b"Hello, world!");
    }

    #[test]
    fn bare_json_is_published_whole() {
        let draft = MessageDraft::parse(r#"{"temperature":21}"#).unwrap();
        assert_eq!(draft.into_message().data, br#"{"temperature":21}"#);
    }

    #[test]
    fn strict_form_requires_data() {
        assert_eq!(
            MessageDraft::from_value(json!({"payload": 1})),
            Err(ValidationError::MissingData)
        );
        assert_eq!(
            MessageDraft::from_value(json!({"data": null})),
            Err(ValidationError::MissingData)
        );
        assert_eq!(
            MessageDraft::from_value(json!("text")),
            Err(ValidationError::MissingData)
        );
    }

    #[test]
    fn non_string_attribute_is_rejected() {
        let err = MessageDraft::from_value(json!({"data": "x", "attributes": {"n": 1}}));
        assert_eq!(err, Err(ValidationError::InvalidAttribute("n".into())));
    }
}
