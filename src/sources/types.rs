use serde::{Deserialize, Serialize};

/// A named entity whose published text gets analysed.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PartyInput {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub policy_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub policy_text: Option<String>,
}

impl PartyInput {
    /// Resolve the content source. A non-empty URL wins over raw text.
    pub fn source(&self) -> Source<'_> {
        if let Some(url) = trimmed_non_empty(&self.policy_url) {
            Source::Url(url)
        } else if let Some(text) = self.policy_text.as_deref().filter(|t| !t.trim().is_empty()) {
            Source::Text(text)
        } else {
            Source::None
        }
    }
}

fn trimmed_non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Source<'a> {
    Url(&'a str),
    Text(&'a str),
    None,
}

impl Source<'_> {
    /// Stable identifier used when fingerprinting a request.
    ///
    /// URLs identify themselves; raw text is hashed so large pastes stay short
    /// and distinct texts never collide; absent sources are pinned to their party.
    pub fn identifier(&self, party_id: &str) -> String {
        match self {
            Source::Url(url) => url.to_string(),
            Source::Text(text) => format!("text:{}", blake3::hash(text.as_bytes()).to_hex()),
            Source::None => format!("none:{}", party_id),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Theme {
    pub key: String,
    pub label: String,
}

/// Result of turning one source into text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Extraction {
    Success { text: String },
    Failure { reason: String },
}

#[derive(Debug, Clone)]
pub struct ExtractionOutcome {
    pub party_id: String,
    pub name: String,
    pub extraction: Extraction,
}

impl ExtractionOutcome {
    pub fn is_ok(&self) -> bool {
        matches!(self.extraction, Extraction::Success { .. })
    }

    pub fn text(&self) -> Option<&str> {
        match &self.extraction {
            Extraction::Success { text } => Some(text),
            Extraction::Failure { .. } => None,
        }
    }
}

impl std::fmt::Display for Extraction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Extraction::Success { text } => write!(f, "extracted {} chars", text.chars().count()),
            Extraction::Failure { reason } => write!(f, "extraction failed: {}", reason),
        }
    }
}
