//! Ordered PHI rules.
//!
//! Placeholders are bracketed and digit-free. A rule can still expose new
//! matches for a later rule (a name glued to digits leaves a word boundary
//! behind), so name rules run before the bare-number rule and the caller
//! repeats the pass until nothing changes.

use std::borrow::Cow;

use once_cell::sync::Lazy;
use regex::{NoExpand, Regex};

pub const EMAIL_PLACEHOLDER: &str = "[EMAIL]";
pub const PHONE_PLACEHOLDER: &str = "[PHONE]";
pub const DATE_PLACEHOLDER: &str = "[DATE]";
pub const MRN_PLACEHOLDER: &str = "[MRN]";
pub const ID_PLACEHOLDER: &str = "[ID]";
pub const NUMBER_PLACEHOLDER: &str = "[NUMBER]";
pub const NAME_PLACEHOLDER: &str = "[NAME]";

const MONTH: &str = r"(?:jan(?:uary)?|feb(?:ruary)?|mar(?:ch)?|apr(?:il)?|may|june?|july?|aug(?:ust)?|sep(?:t(?:ember)?)?|oct(?:ober)?|nov(?:ember)?|dec(?:ember)?)";

static EMAIL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\b[a-z0-9._%+\-]+@[a-z0-9.\-]+\.[a-z]{2,}\b").unwrap());

static PHONE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(concat!(
        // international, +CC prefix
        r"\+\d{1,3}[\s.\-]?(?:\(\d{1,4}\)[\s.\-]?)?\d{2,4}(?:[\s.\-]?\d{2,4}){1,3}",
        // north american
        r"|(?:\(\d{3}\)\s?|\b\d{3}[\s.\-])\d{3}[\s.\-]\d{4}\b",
        // seven-digit local, hyphenated so decimals stay intact
        r"|\b\d{3}-\d{4}\b",
        // uk and gulf trunk-prefixed
        r"|\b0\d{2,4}[\s\-]?\d{3,4}[\s\-]?\d{3,4}\b",
        // gulf eight-digit local
        r"|\b[2569]\d{3}[\s\-]?\d{4}\b",
    ))
    .unwrap()
});

static DATE: Lazy<Regex> = Lazy::new(|| {
    let pattern = format!(
        concat!(
            r"(?i)\b\d{{4}}[\-/.]\d{{1,2}}[\-/.]\d{{1,2}}\b",
            r"|\b\d{{1,2}}[\-/.]\d{{1,2}}[\-/.]\d{{2,4}}\b",
            r"|\b\d{{1,2}}(?:st|nd|rd|th)?[\s\-]+{m}\.?,?[\s\-]+\d{{2,4}}\b",
            r"|\b{m}\.?[\s\-]+\d{{1,2}}(?:st|nd|rd|th)?,?[\s\-]+\d{{2,4}}\b",
            r"|\b{m}\.?[\s\-]+(?:19|20)\d{{2}}\b",
        ),
        m = MONTH
    );
    Regex::new(&pattern).unwrap()
});

static MRN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(concat!(
        r"(?i)(?P<label>\b(?:mrn\b|medical\s+record(?:\s*(?:no\b\.?|number|#))?",
        r"|(?:file|hospital|record)\s*(?:no\b\.?|number|#))\s*[:#]?\s*)",
        r"[a-z]{0,3}-?\d[a-z0-9\-]{2,}",
    ))
    .unwrap()
});

static LABELLED_ID: Lazy<Regex> = Lazy::new(|| {
    Regex::new(concat!(
        r"(?i)(?P<label>\b(?:civil\s*id\b|national\s*id\b|emirates\s*id\b|id\s*(?:no\b\.?|number|#)",
        r"|passport(?:\s*(?:no\b\.?|number|#))?|iqama(?:\s*(?:no\b\.?|number))?|ssn\b",
        r"|nhs\s*(?:no\b\.?|number))\s*[:#]?\s*)",
        r"[a-z]{0,2}\d(?:[ \-]?\d){4,}",
    ))
    .unwrap()
});

static BARE_CIVIL_ID: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b[23]\d{11}\b").unwrap());

static LONG_NUMBER: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b\d{6,}\b").unwrap());

static CLINICAL_UNIT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(concat!(
        r"(?i)^\s*(?:mg|mcg|µg|ug|ng|pg|g|kg|ml|dl|l|mmol|umol|µmol|mol|meq|iu|units?|u",
        r"|mmhg|mm|cm|bpm|%|/l|/ul|/µl|/mcl|/mm3|cells|copies|x\s?10)",
        r"(?:[^a-z]|$)",
    ))
    .unwrap()
});

// Any number of name tokens (an initial, a capitalised word in any Latin
// script, or an Arabic-script word) joined by spaces and optional lowercase
// particles ("bin", "al", "de").
macro_rules! name_run {
    () => {
        concat!(
            r"(?:\p{Lu}\.|\p{Lu}[\p{L}\p{M}'\-]*|[\p{Arabic}\p{M}]+)",
            r"(?:[ \t]+(?:(?:bin|bint|ibn|abu|al|el|de|del|da|van|von)[ \t]+)?",
            r"(?:\p{Lu}\.|\p{Lu}[\p{L}\p{M}'\-]*|[\p{Arabic}\p{M}]+))*",
        )
    };
}

static LABELLED_NAME: Lazy<Regex> = Lazy::new(|| {
    Regex::new(concat!(
        r"(?P<label>\b(?i:patient(?:'s)?(?:\s+name)?|pt|name)\b\.?\s*[:\-]?\s*)",
        name_run!(),
    ))
    .unwrap()
});

static HONORIFIC_NAME: Lazy<Regex> = Lazy::new(|| {
    Regex::new(concat!(
        r"(?P<label>\b(?i:mrs|mr|ms|miss|dr)\b\.?[ \t]+)",
        name_run!(),
    ))
    .unwrap()
});

/// How a rule rewrites its match
#[derive(Debug, Clone, Copy)]
pub enum Replacement {
    /// Replace the whole match
    Whole(&'static str),
    /// Keep the `label` capture, replace the value after it
    AfterLabel(&'static str),
    /// Long numbers, unless a clinical unit follows
    UnitAwareNumber,
}

/// A single redaction rule
#[derive(Debug)]
pub struct Rule {
    pub name: &'static str,
    pattern: &'static Lazy<Regex>,
    replacement: Replacement,
}

impl Rule {
    pub fn apply<'a>(&self, text: &'a str) -> Cow<'a, str> {
        match self.replacement {
            Replacement::Whole(placeholder) => {
                self.pattern.replace_all(text, NoExpand(placeholder))
            }
            Replacement::AfterLabel(placeholder) => {
                let template = format!("${{label}}{}", placeholder);
                self.pattern.replace_all(text, template.as_str())
            }
            Replacement::UnitAwareNumber => replace_unitless_numbers(self.pattern, text),
        }
    }
}

/// Most-specific rules first
pub static RULES: [Rule; 9] = [
    Rule {
        name: "email",
        pattern: &EMAIL,
        replacement: Replacement::Whole(EMAIL_PLACEHOLDER),
    },
    Rule {
        name: "phone",
        pattern: &PHONE,
        replacement: Replacement::Whole(PHONE_PLACEHOLDER),
    },
    Rule {
        name: "date",
        pattern: &DATE,
        replacement: Replacement::Whole(DATE_PLACEHOLDER),
    },
    Rule {
        name: "mrn",
        pattern: &MRN,
        replacement: Replacement::AfterLabel(MRN_PLACEHOLDER),
    },
    Rule {
        name: "labelled_id",
        pattern: &LABELLED_ID,
        replacement: Replacement::AfterLabel(ID_PLACEHOLDER),
    },
    Rule {
        name: "civil_id",
        pattern: &BARE_CIVIL_ID,
        replacement: Replacement::Whole(ID_PLACEHOLDER),
    },
    Rule {
        name: "labelled_name",
        pattern: &LABELLED_NAME,
        replacement: Replacement::AfterLabel(NAME_PLACEHOLDER),
    },
    Rule {
        name: "honorific_name",
        pattern: &HONORIFIC_NAME,
        replacement: Replacement::AfterLabel(NAME_PLACEHOLDER),
    },
    Rule {
        name: "long_number",
        pattern: &LONG_NUMBER,
        replacement: Replacement::UnitAwareNumber,
    },
];

fn replace_unitless_numbers<'a>(pattern: &Regex, text: &'a str) -> Cow<'a, str> {
    let mut out = String::with_capacity(text.len());
    let mut last = 0;
    let mut replaced = false;

    for m in pattern.find_iter(text) {
        if CLINICAL_UNIT.is_match(&text[m.end()..]) {
            continue;
        }

        out.push_str(&text[last..m.start()]);
        out.push_str(NUMBER_PLACEHOLDER);
        last = m.end();
        replaced = true;
    }

    if !replaced {
        return Cow::Borrowed(text);
    }

    out.push_str(&text[last..]);
    Cow::Owned(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rule(name: &str) -> &'static Rule {
        RULES.iter().find(|r| r.name == name).unwrap()
    }

    #[test]
    fn test_email_rule() {
        let out = rule("email").apply("Contact j.doe+ward@hospital.org.kw today");
        assert_eq!(out, "Contact [EMAIL] today");
    }

    #[test]
    fn test_phone_formats() {
        let phone = rule("phone");

        assert_eq!(phone.apply("call +965 2222 3333"), "call [PHONE]");
        assert_eq!(phone.apply("call +44 20 7946 0958"), "call [PHONE]");
        assert_eq!(phone.apply("call (555) 123-4567"), "call [PHONE]");
        assert_eq!(phone.apply("call 555-123-4567"), "call [PHONE]");
        assert_eq!(phone.apply("call 07700 900123"), "call [PHONE]");
        assert_eq!(phone.apply("call 9876 5432"), "call [PHONE]");
        assert_eq!(phone.apply("call 99887766"), "call [PHONE]");
        assert_eq!(phone.apply("call back on 555-1234"), "call back on [PHONE]");
    }

    #[test]
    fn test_phone_leaves_lab_values() {
        let phone = rule("phone");
        assert_eq!(phone.apply("Na 130 K 4.1"), "Na 130 K 4.1");
        assert_eq!(phone.apply("Give 0.9% saline 1000 ml"), "Give 0.9% saline 1000 ml");
        assert_eq!(phone.apply("Cr 104.1234 umol/L"), "Cr 104.1234 umol/L");
        assert_eq!(phone.apply("WBC 12.5, Hb 110"), "WBC 12.5, Hb 110");
    }

    #[test]
    fn test_date_formats() {
        let date = rule("date");

        assert_eq!(date.apply("seen 12/03/2024"), "seen [DATE]");
        assert_eq!(date.apply("seen 2024-03-12"), "seen [DATE]");
        assert_eq!(date.apply("seen 3rd March 2024"), "seen [DATE]");
        assert_eq!(date.apply("seen Mar 3, 2024"), "seen [DATE]");
        assert_eq!(date.apply("since January 2023"), "since [DATE]");
    }

    #[test]
    fn test_mrn_keeps_label() {
        assert_eq!(rule("mrn").apply("MRN: A1234567"), "MRN: [MRN]");
        assert_eq!(rule("mrn").apply("File No. 88-1234"), "File No. [MRN]");
    }

    #[test]
    fn test_mrn_ignores_mrna() {
        let text = "received mRNA-1273 booster";
        assert_eq!(rule("mrn").apply(text), text);
    }

    #[test]
    fn test_labelled_ids() {
        let id = rule("labelled_id");
        assert_eq!(id.apply("Civil ID: 289012345678"), "Civil ID: [ID]");
        assert_eq!(id.apply("NHS number 943 476 5919"), "NHS number [ID]");
        assert_eq!(id.apply("Passport K1234567"), "Passport [ID]");
    }

    #[test]
    fn test_bare_civil_id() {
        assert_eq!(
            rule("civil_id").apply("id 289012345678 on file"),
            "id [ID] on file"
        );
    }

    #[test]
    fn test_long_number_skips_clinical_units() {
        let number = rule("long_number");

        assert_eq!(number.apply("ref 12345678"), "ref [NUMBER]");
        assert_eq!(number.apply("Plt 250000 /uL"), "Plt 250000 /uL");
        assert_eq!(number.apply("heparin 1000000 units"), "heparin 1000000 units");
        assert_eq!(number.apply("Na 130"), "Na 130");
    }

    #[test]
    fn test_labelled_name() {
        let name = rule("labelled_name");
        assert_eq!(name.apply("Patient: Ahmed Al-Sabah"), "Patient: [NAME]");
        assert_eq!(name.apply("Patient name: John Smith, 45y"), "Patient name: [NAME], 45y");
        assert_eq!(name.apply("Patient is stable"), "Patient is stable");
    }

    #[test]
    fn test_labelled_name_covers_long_and_non_ascii_names() {
        let name = rule("labelled_name");

        assert_eq!(
            name.apply("Patient: Ahmed Mohammed Abdullah Alsabah, K 3.1"),
            "Patient: [NAME], K 3.1"
        );
        assert_eq!(name.apply("Patient: José Álvarez has CAP"), "Patient: [NAME] has CAP");
        assert_eq!(name.apply("Patient: محمد العنزي has CAP"), "Patient: [NAME] has CAP");
        assert_eq!(
            name.apply("Name: Khalid bin Saud Al Rashid, 60y"),
            "Name: [NAME], 60y"
        );
        assert_eq!(name.apply("Pt: Ahmed A. Alsabah, on warfarin"), "Pt: [NAME], on warfarin");
    }

    #[test]
    fn test_honorific_name() {
        let name = rule("honorific_name");
        assert_eq!(name.apply("seen by Dr. Fatima Hassan"), "seen by Dr. [NAME]");
        assert_eq!(name.apply("Mrs Jones reports pain"), "Mrs [NAME] reports pain");
        assert_eq!(
            name.apply("Dr Abdulaziz Fahad Nasser Al-Mutairi on call"),
            "Dr [NAME] on call"
        );
        assert_eq!(name.apply("Dr. Ñúñez reviewed"), "Dr. [NAME] reviewed");
    }
}
