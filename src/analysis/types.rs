use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::cache::CacheEntry;
use crate::sources::types::{PartyInput, Theme};

/// Placeholder summary for every theme of a party whose source could not be read.
pub const RETRIEVAL_FAILED: &str = "information retrieval failed";

/// party id -> theme key -> summary. Ordered so cached and fresh responses
/// serialize identically.
pub type AnalysisResult = BTreeMap<String, BTreeMap<String, String>>;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FreeformAnswer {
    pub question: String,
    pub answer: String,
}

/// Body of `POST /api/analyze`. Required fields are optional here so their
/// absence is reported as a validation error rather than a parse error.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyzeRequest {
    #[serde(default)]
    pub parties: Option<Vec<PartyInput>>,
    #[serde(default)]
    pub themes: Option<Vec<Theme>>,
    #[serde(default)]
    pub freeform_question: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyzeResponse {
    pub analysis: AnalysisResult,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub freeform_answer: Option<FreeformAnswer>,
    pub from_cache: bool,
}

impl AnalyzeResponse {
    pub fn from_entry(entry: CacheEntry, from_cache: bool) -> Self {
        Self {
            analysis: entry.analysis,
            freeform_answer: entry.freeform_answer,
            from_cache,
        }
    }
}
