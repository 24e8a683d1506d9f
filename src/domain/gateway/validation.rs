//! Input validation and clamping

use serde::{Deserialize, Serialize};

use super::GatewayRequest;
use crate::domain::feature::{CacheableFeatures, FeatureTag};
use crate::domain::llm::{Message, MessageRole};
use crate::domain::DomainError;

/// Size limits enforced before any side effect
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayLimits {
    #[serde(default = "default_max_prompt_chars")]
    pub max_prompt_chars: usize,
    #[serde(default = "default_max_context_chars")]
    pub max_context_chars: usize,
    #[serde(default = "default_max_tokens")]
    pub default_max_tokens: u32,
    #[serde(default = "default_max_max_tokens")]
    pub max_max_tokens: u32,
    /// Most recent conversation turns forwarded to the model
    #[serde(default = "default_history_turns")]
    pub history_turns: usize,
}

fn default_max_prompt_chars() -> usize {
    15_000
}

fn default_max_context_chars() -> usize {
    50_000
}

fn default_max_tokens() -> u32 {
    2_048
}

fn default_max_max_tokens() -> u32 {
    8_192
}

fn default_history_turns() -> usize {
    20
}

impl Default for GatewayLimits {
    fn default() -> Self {
        Self {
            max_prompt_chars: default_max_prompt_chars(),
            max_context_chars: default_max_context_chars(),
            default_max_tokens: default_max_tokens(),
            max_max_tokens: default_max_max_tokens(),
            history_turns: default_history_turns(),
        }
    }
}

/// A request that passed validation, with limits applied
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedRequest {
    pub prompt: String,
    pub feature_tag: FeatureTag,
    pub context: Option<String>,
    pub system_instruction_override: Option<String>,
    pub max_tokens: u32,
    pub history: Vec<Message>,
    pub skip_cache: bool,
}

impl ValidatedRequest {
    /// Whether this request may read from or write to the response cache
    pub fn cache_allowed(&self, cacheable: &CacheableFeatures) -> bool {
        !self.skip_cache && self.context.is_none() && cacheable.contains(self.feature_tag)
    }
}

impl GatewayLimits {
    pub fn validate(&self, request: GatewayRequest) -> Result<ValidatedRequest, DomainError> {
        if request.prompt.trim().is_empty() {
            return Err(DomainError::validation("prompt must not be empty"));
        }

        let prompt_chars = request.prompt.chars().count();
        if prompt_chars > self.max_prompt_chars {
            return Err(DomainError::validation(format!(
                "prompt exceeds {} characters",
                self.max_prompt_chars
            )));
        }

        let context = request.context.filter(|c| !c.trim().is_empty());
        if let Some(ref context) = context {
            if context.chars().count() > self.max_context_chars {
                return Err(DomainError::validation(format!(
                    "context exceeds {} characters",
                    self.max_context_chars
                )));
            }
        }

        let max_tokens = match request.max_tokens {
            None => self.default_max_tokens,
            Some(requested) => requested.clamp(1, i64::from(self.max_max_tokens)) as u32,
        };

        Ok(ValidatedRequest {
            prompt: request.prompt,
            feature_tag: request.feature_tag,
            context,
            system_instruction_override: request
                .system_instruction_override
                .filter(|s| !s.trim().is_empty()),
            max_tokens,
            history: self.cap_history(request.conversation_history),
            skip_cache: request.skip_cache,
        })
    }

    fn cap_history(&self, history: Vec<Message>) -> Vec<Message> {
        let turns: Vec<Message> = history
            .into_iter()
            .filter(|m| m.role != MessageRole::System && !m.content.trim().is_empty())
            .collect();

        let skip = turns.len().saturating_sub(self.history_turns);
        turns.into_iter().skip(skip).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(prompt: &str) -> GatewayRequest {
        GatewayRequest::new(prompt, FeatureTag::ClinicalGuidelines)
    }

    #[test]
    fn test_rejects_blank_prompt() {
        let err = GatewayLimits::default().validate(request("   \n")).unwrap_err();
        assert_eq!(err.kind(), "invalid_argument");
    }

    #[test]
    fn test_prompt_length_limit_counts_chars() {
        let limits = GatewayLimits {
            max_prompt_chars: 5,
            ..Default::default()
        };

        assert!(limits.validate(request("ééééé")).is_ok());
        assert!(limits.validate(request("abcdef")).is_err());
    }

    #[test]
    fn test_context_length_limit() {
        let limits = GatewayLimits {
            max_context_chars: 10,
            ..Default::default()
        };

        let err = limits
            .validate(request("q").with_context("x".repeat(11)))
            .unwrap_err();
        assert!(err.to_string().contains("context"));
    }

    #[test]
    fn test_max_tokens_default_and_clamping() {
        let limits = GatewayLimits::default();

        assert_eq!(limits.validate(request("q")).unwrap().max_tokens, 2_048);
        assert_eq!(
            limits.validate(request("q").with_max_tokens(0)).unwrap().max_tokens,
            1
        );
        assert_eq!(
            limits.validate(request("q").with_max_tokens(-40)).unwrap().max_tokens,
            1
        );
        assert_eq!(
            limits
                .validate(request("q").with_max_tokens(100_000))
                .unwrap()
                .max_tokens,
            8_192
        );
        assert_eq!(
            limits.validate(request("q").with_max_tokens(512)).unwrap().max_tokens,
            512
        );
    }

    #[test]
    fn test_history_capped_to_most_recent_turns() {
        let limits = GatewayLimits {
            history_turns: 3,
            ..Default::default()
        };
        let history: Vec<Message> = (0..6)
            .map(|i| {
                if i % 2 == 0 {
                    Message::user(format!("q{}", i))
                } else {
                    Message::assistant(format!("a{}", i))
                }
            })
            .chain(std::iter::once(Message::system("ignored")))
            .collect();

        let validated = limits.validate(request("now").with_history(history)).unwrap();

        let contents: Vec<&str> = validated.history.iter().map(|m| m.content_text()).collect();
        assert_eq!(contents, vec!["a3", "q4", "a5"]);
    }

    #[test]
    fn test_cache_allowed_rules() {
        let limits = GatewayLimits::default();
        let cacheable = CacheableFeatures::default();

        let plain = limits.validate(request("First-line treatment for CAP?")).unwrap();
        assert!(plain.cache_allowed(&cacheable));

        let skipped = limits.validate(request("q").with_skip_cache(true)).unwrap();
        assert!(!skipped.cache_allowed(&cacheable));

        let with_context = limits
            .validate(request("q").with_context("{\"na\":130}"))
            .unwrap();
        assert!(!with_context.cache_allowed(&cacheable));

        let lab = limits
            .validate(GatewayRequest::new("Interpret Na 130", FeatureTag::LabAnalysis))
            .unwrap();
        assert!(!lab.cache_allowed(&cacheable));
    }

    #[test]
    fn test_blank_context_treated_as_absent() {
        let validated = GatewayLimits::default()
            .validate(request("q").with_context("  "))
            .unwrap();

        assert!(validated.context.is_none());
        assert!(validated.cache_allowed(&CacheableFeatures::default()));
    }
}
