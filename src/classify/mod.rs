//! Classification of institution records
//!
//! A [`Ruleset`] decides whether a normalized record belongs to the target
//! institution class. Checks run in a fixed order and the first match wins:
//!
//! 1. names shorter than two characters are rejected
//! 2. names that fail [`is_english_only`] are rejected
//! 3. an excluded `type`/`organizationType` tag rejects
//! 4. an allowed tag accepts
//! 5. when no tag is in either set (absent or ambiguous), name keywords
//!    decide (excluded first)
//! 6. anything else is rejected

mod language;

pub use language::{is_english_only, rejected_script, ALLOWED_PUNCTUATION, REJECTED_SCRIPT_RANGES};

use crate::config::RulesConfig;
use crate::store::InstitutionRecord;
use std::collections::HashSet;

/// Minimum number of characters in an accepted name
pub const MIN_NAME_CHARS: usize = 2;

/// Outcome of classifying one record
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Accept,
    Reject(RejectReason),
}

impl Verdict {
    pub fn is_accept(self) -> bool {
        matches!(self, Verdict::Accept)
    }
}

/// Why a record was rejected
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RejectReason {
    NameTooShort,
    NonEnglishName,
    ExcludedType,
    ExcludedKeyword,
    UnrecognizedType,
}

/// Tag and keyword sets used to accept or reject records
#[derive(Debug, Clone, Default)]
pub struct Ruleset {
    allowed_types: HashSet<String>,
    excluded_types: HashSet<String>,
    allowed_name_keywords: Vec<String>,
    excluded_name_keywords: Vec<String>,
}

impl Ruleset {
    /// Creates a ruleset; tags are matched upper-case, keywords lower-case
    pub fn new<I, J>(allowed_types: I, excluded_types: J) -> Self
    where
        I: IntoIterator,
        I::Item: AsRef<str>,
        J: IntoIterator,
        J::Item: AsRef<str>,
    {
        Self {
            allowed_types: fold_tags(allowed_types),
            excluded_types: fold_tags(excluded_types),
            allowed_name_keywords: Vec::new(),
            excluded_name_keywords: Vec::new(),
        }
    }

    /// Adds name keywords consulted when no tag is allowed or excluded
    pub fn with_name_keywords<I, J>(mut self, allowed: I, excluded: J) -> Self
    where
        I: IntoIterator,
        I::Item: AsRef<str>,
        J: IntoIterator,
        J::Item: AsRef<str>,
    {
        self.allowed_name_keywords = fold_keywords(allowed);
        self.excluded_name_keywords = fold_keywords(excluded);
        self
    }

    pub fn from_config(config: &RulesConfig) -> Self {
        Self::new(&config.allowed_types, &config.excluded_types)
            .with_name_keywords(&config.allowed_name_keywords, &config.excluded_name_keywords)
    }

    /// Classifies a normalized record
    pub fn classify(&self, record: &InstitutionRecord) -> Verdict {
        let name = record.name.trim();
        if name.chars().count() < MIN_NAME_CHARS {
            return Verdict::Reject(RejectReason::NameTooShort);
        }

        if !is_english_only(name) {
            return Verdict::Reject(RejectReason::NonEnglishName);
        }

        let tags: Vec<String> = [&record.kind, &record.organization_type]
            .into_iter()
            .flatten()
            .map(|tag| tag.trim().to_ascii_uppercase())
            .filter(|tag| !tag.is_empty())
            .collect();

        if tags.iter().any(|tag| self.excluded_types.contains(tag)) {
            return Verdict::Reject(RejectReason::ExcludedType);
        }

        if tags.iter().any(|tag| self.allowed_types.contains(tag)) {
            return Verdict::Accept;
        }

        let lowered = name.to_lowercase();
        if self
            .excluded_name_keywords
            .iter()
            .any(|kw| lowered.contains(kw.as_str()))
        {
            return Verdict::Reject(RejectReason::ExcludedKeyword);
        }
        if self
            .allowed_name_keywords
            .iter()
            .any(|kw| lowered.contains(kw.as_str()))
        {
            return Verdict::Accept;
        }

        Verdict::Reject(RejectReason::UnrecognizedType)
    }

    pub fn accepts(&self, record: &InstitutionRecord) -> bool {
        self.classify(record).is_accept()
    }
}

fn fold_tags<I>(items: I) -> HashSet<String>
where
    I: IntoIterator,
    I::Item: AsRef<str>,
{
    items
        .into_iter()
        .map(|s| s.as_ref().trim().to_ascii_uppercase())
        .filter(|s| !s.is_empty())
        .collect()
}

fn fold_keywords<I>(items: I) -> Vec<String>
where
    I: IntoIterator,
    I::Item: AsRef<str>,
{
    items
        .into_iter()
        .map(|s| s.as_ref().trim().to_lowercase())
        .filter(|s| !s.is_empty())
        .collect()
}
