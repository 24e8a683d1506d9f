//! PHI redaction and text normalization
//!
//! Redaction runs before anything derived from user text is hashed, embedded,
//! or stored. It is pure, deterministic, and idempotent.

mod rules;

use std::borrow::Cow;

pub use rules::{
    DATE_PLACEHOLDER, EMAIL_PLACEHOLDER, ID_PLACEHOLDER, MRN_PLACEHOLDER, NAME_PLACEHOLDER,
    NUMBER_PLACEHOLDER, PHONE_PLACEHOLDER,
};

/// Redacted text plus the names of the rules that changed it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Redacted {
    pub text: String,
    pub rules_applied: Vec<&'static str>,
}

impl Redacted {
    pub fn was_modified(&self) -> bool {
        !self.rules_applied.is_empty()
    }
}

/// Passes allowed before the output is taken as settled. One pass settles
/// almost every input; the second catches matches exposed by the first.
const MAX_PASSES: usize = 4;

/// Apply every PHI rule in order, repeating until a pass changes nothing
pub fn redact_phi(text: &str) -> Redacted {
    let mut current: Cow<'_, str> = Cow::Borrowed(text);
    let mut rules_applied: Vec<&'static str> = Vec::new();

    for _ in 0..MAX_PASSES {
        let mut changed_this_pass = false;

        for rule in rules::RULES.iter() {
            let next = rule.apply(&current);

            if let Cow::Owned(changed) = next {
                if changed == current.as_ref() {
                    continue;
                }
                if !rules_applied.contains(&rule.name) {
                    rules_applied.push(rule.name);
                }
                changed_this_pass = true;
                current = Cow::Owned(changed);
            }
        }

        if !changed_this_pass {
            break;
        }
    }

    Redacted {
        text: current.into_owned(),
        rules_applied,
    }
}

/// Lowercase, trim, and collapse runs of whitespace to a single space
pub fn normalize(text: &str) -> String {
    text.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}
