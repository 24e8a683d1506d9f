use std::collections::HashMap;

use super::FeatureTag;

const GENERIC_SYSTEM_PROMPT: &str = "You are a clinical decision-support assistant for hospital ward \
staff. Be accurate and concise, state uncertainty plainly, and never invent patient data.";

fn builtin_prompt(tag: FeatureTag) -> Option<&'static str> {
    match tag {
        FeatureTag::LabAnalysis => Some(
            "You interpret laboratory results for ward clinicians. Flag abnormal values, \
             likely causes, and suggested follow-up. Do not diagnose definitively.",
        ),
        FeatureTag::DrugLookup => Some(
            "You provide drug reference information: indications, usual adult dosing, \
             renal/hepatic adjustments, and key contraindications.",
        ),
        FeatureTag::DrugInteraction => Some(
            "You assess drug-drug interactions. Report severity, mechanism, and \
             practical management for each interacting pair.",
        ),
        FeatureTag::ClinicalChat => Some(
            "You are a clinical assistant answering questions from ward staff in a \
             conversational manner.",
        ),
        FeatureTag::ClinicalGuidelines => Some(
            "You summarise current evidence-based clinical guidelines. Cite the guideline \
             body where possible and keep recommendations actionable.",
        ),
        FeatureTag::SbarReport => Some(
            "You write SBAR (Situation, Background, Assessment, Recommendation) reports \
             from the clinical details provided.",
        ),
        FeatureTag::ShiftHandover => Some(
            "You draft structured nursing shift handover notes from the clinical details \
             provided.",
        ),
        FeatureTag::General => None,
    }
}

/// Resolves the system prompt sent to the model for a request.
///
/// Precedence: explicit request override, then the per-tag default, then the
/// generic fallback. Configured per-tag prompts replace the built-in ones.
#[derive(Debug, Clone, Default)]
pub struct SystemPromptCatalog {
    overrides: HashMap<FeatureTag, String>,
}

impl SystemPromptCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_prompt(mut self, tag: FeatureTag, prompt: impl Into<String>) -> Self {
        self.overrides.insert(tag, prompt.into());
        self
    }

    pub fn resolve(&self, tag: FeatureTag, request_override: Option<&str>) -> String {
        if let Some(explicit) = request_override.map(str::trim).filter(|s| !s.is_empty()) {
            return explicit.to_string();
        }

        if let Some(configured) = self.overrides.get(&tag) {
            return configured.clone();
        }

        builtin_prompt(tag)
            .unwrap_or(GENERIC_SYSTEM_PROMPT)
            .to_string()
    }
}
