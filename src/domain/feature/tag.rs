use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::domain::DomainError;

/// Use case a gateway request belongs to.
///
/// The tag selects the default system prompt and decides whether the
/// response may be served from, or written to, the response cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeatureTag {
    LabAnalysis,
    DrugLookup,
    DrugInteraction,
    ClinicalChat,
    ClinicalGuidelines,
    SbarReport,
    ShiftHandover,
    General,
}

impl FeatureTag {
    pub const ALL: [FeatureTag; 8] = [
        FeatureTag::LabAnalysis,
        FeatureTag::DrugLookup,
        FeatureTag::DrugInteraction,
        FeatureTag::ClinicalChat,
        FeatureTag::ClinicalGuidelines,
        FeatureTag::SbarReport,
        FeatureTag::ShiftHandover,
        FeatureTag::General,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::LabAnalysis => "lab_analysis",
            Self::DrugLookup => "drug_lookup",
            Self::DrugInteraction => "drug_interaction",
            Self::ClinicalChat => "clinical_chat",
            Self::ClinicalGuidelines => "clinical_guidelines",
            Self::SbarReport => "sbar_report",
            Self::ShiftHandover => "shift_handover",
            Self::General => "general",
        }
    }

    /// Tags that are cacheable unless configuration says otherwise
    pub fn default_cacheable() -> Vec<FeatureTag> {
        vec![
            FeatureTag::ClinicalGuidelines,
            FeatureTag::DrugLookup,
            FeatureTag::DrugInteraction,
        ]
    }
}

impl fmt::Display for FeatureTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FeatureTag {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let needle = s.trim();

        Self::ALL
            .iter()
            .copied()
            .find(|tag| tag.as_str().eq_ignore_ascii_case(needle))
            .ok_or_else(|| DomainError::validation(format!("Unknown feature tag '{}'", s)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_known_tags() {
        for tag in FeatureTag::ALL {
            assert_eq!(tag.as_str().parse::<FeatureTag>().unwrap(), tag);
        }

        assert_eq!(
            " Drug_Lookup ".parse::<FeatureTag>().unwrap(),
            FeatureTag::DrugLookup
        );
    }

    #[test]
    fn test_parse_unknown_tag() {
        let err = "radiology".parse::<FeatureTag>().unwrap_err();
        assert!(matches!(err, DomainError::Validation { .. }));
    }

    #[test]
    fn test_serde_uses_snake_case() {
        let json = serde_json::to_string(&FeatureTag::ClinicalGuidelines).unwrap();
        assert_eq!(json, "\"clinical_guidelines\"");
    }

    #[test]
    fn test_lab_analysis_not_cacheable_by_default() {
        let defaults = FeatureTag::default_cacheable();
        assert!(!defaults.contains(&FeatureTag::LabAnalysis));
        assert!(defaults.contains(&FeatureTag::ClinicalGuidelines));
    }
}
