//! Gateway request and response models

use serde::{Deserialize, Serialize};

use crate::domain::audit::CacheType;
use crate::domain::cache::TokenUsage;
use crate::domain::feature::FeatureTag;
use crate::domain::llm::Message;

/// Raw request as received from a caller, before validation
#[derive(Debug, Clone, PartialEq)]
pub struct GatewayRequest {
    pub prompt: String,
    pub feature_tag: FeatureTag,
    /// Auxiliary patient context; any non-empty value disables caching
    pub context: Option<String>,
    pub system_instruction_override: Option<String>,
    pub max_tokens: Option<i64>,
    pub conversation_history: Vec<Message>,
    pub skip_cache: bool,
}

impl GatewayRequest {
    pub fn new(prompt: impl Into<String>, feature_tag: FeatureTag) -> Self {
        Self {
            prompt: prompt.into(),
            feature_tag,
            context: None,
            system_instruction_override: None,
            max_tokens: None,
            conversation_history: Vec::new(),
            skip_cache: false,
        }
    }

    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context = Some(context.into());
        self
    }

    pub fn with_system_instruction(mut self, instruction: impl Into<String>) -> Self {
        self.system_instruction_override = Some(instruction.into());
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: i64) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    pub fn with_history(mut self, history: Vec<Message>) -> Self {
        self.conversation_history = history;
        self
    }

    pub fn with_skip_cache(mut self, skip: bool) -> Self {
        self.skip_cache = skip;
        self
    }
}

/// Result returned to the caller
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GatewayResponse {
    pub response: String,
    pub cache_hit: bool,
    pub cache_type: CacheType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub usage: Option<TokenUsage>,
}

impl GatewayResponse {
    pub fn from_cache(response: impl Into<String>, cache_type: CacheType) -> Self {
        Self {
            response: response.into(),
            cache_hit: cache_type.is_hit(),
            cache_type,
            usage: None,
        }
    }

    pub fn fresh(response: impl Into<String>, usage: Option<TokenUsage>) -> Self {
        Self {
            response: response.into(),
            cache_hit: false,
            cache_type: CacheType::None,
            usage,
        }
    }
}
