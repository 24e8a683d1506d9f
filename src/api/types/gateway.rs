//! Wire format for `POST /v1/gateway`

use serde::Deserialize;
use serde_json::Value;

use crate::domain::gateway::GatewayRequest;
use crate::domain::llm::Message;
use crate::domain::{DomainError, FeatureTag};

/// Request body; field names are camelCase on the wire
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GatewayRequestBody {
    pub prompt: String,
    pub feature_tag: String,
    /// Free-form patient context, either a string or any JSON value
    #[serde(default)]
    pub context: Option<Value>,
    #[serde(default)]
    pub system_instruction_override: Option<String>,
    #[serde(default)]
    pub max_tokens: Option<i64>,
    #[serde(default)]
    pub conversation_history: Vec<Message>,
    #[serde(default)]
    pub skip_cache: bool,
}

impl GatewayRequestBody {
    pub fn into_domain(self) -> Result<GatewayRequest, DomainError> {
        let feature_tag: FeatureTag = self.feature_tag.parse()?;

        let mut request = GatewayRequest::new(self.prompt, feature_tag)
            .with_history(self.conversation_history)
            .with_skip_cache(self.skip_cache);

        if let Some(context) = self.context.and_then(context_text) {
            request = request.with_context(context);
        }
        if let Some(instruction) = self.system_instruction_override {
            request = request.with_system_instruction(instruction);
        }
        if let Some(max_tokens) = self.max_tokens {
            request = request.with_max_tokens(max_tokens);
        }

        Ok(request)
    }
}

/// Null and empty values count as no context
fn context_text(value: Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s),
        Value::Object(ref map) if map.is_empty() => None,
        Value::Array(ref items) if items.is_empty() => None,
        other => Some(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn body(value: Value) -> GatewayRequestBody {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_minimal_body() {
        let request = body(json!({"prompt": "q", "featureTag": "drug_lookup"}))
            .into_domain()
            .unwrap();

        assert_eq!(request.feature_tag, FeatureTag::DrugLookup);
        assert!(request.context.is_none());
        assert!(request.max_tokens.is_none());
        assert!(!request.skip_cache);
    }

    #[test]
    fn test_full_body() {
        let request = body(json!({
            "prompt": "follow-up",
            "featureTag": "clinical_chat",
            "context": {"labs": {"na": 130}},
            "systemInstructionOverride": "Be brief",
            "maxTokens": 500,
            "conversationHistory": [
                {"role": "user", "content": "hi"},
                {"role": "assistant", "content": "hello"}
            ],
            "skipCache": true
        }))
        .into_domain()
        .unwrap();

        assert_eq!(request.context.as_deref(), Some(r#"{"labs":{"na":130}}"#));
        assert_eq!(request.system_instruction_override.as_deref(), Some("Be brief"));
        assert_eq!(request.max_tokens, Some(500));
        assert_eq!(request.conversation_history.len(), 2);
        assert!(request.skip_cache);
    }

    #[test]
    fn test_empty_context_values_are_absent() {
        for context in [json!(null), json!({}), json!([])] {
            let request = body(json!({"prompt": "q", "featureTag": "general", "context": context}))
                .into_domain()
                .unwrap();
            assert!(request.context.is_none());
        }
    }

    #[test]
    fn test_unknown_feature_tag_is_validation_error() {
        let err = body(json!({"prompt": "q", "featureTag": "radiology"}))
            .into_domain()
            .unwrap_err();

        assert_eq!(err.kind(), "invalid_argument");
    }
}
