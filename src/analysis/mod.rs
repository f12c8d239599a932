pub mod freeform;
pub mod prompts;
pub mod summarize;
pub mod types;

use std::collections::HashSet;
use std::sync::Arc;

use anyhow::Result;
use tracing::{info, warn};

use crate::cache::key::CacheKey;
use crate::cache::{CacheEntry, ResultCache};
use crate::error::AnalysisError;
use crate::llm::TextGenerator;
use crate::sources::types::{ExtractionOutcome, PartyInput, Theme};
use crate::sources::SourceExtractor;
use crate::state::PipelineConfig;

use types::{AnalyzeRequest, AnalyzeResponse, RETRIEVAL_FAILED};

/// A request that passed validation.
struct Validated {
    parties: Vec<PartyInput>,
    themes: Vec<Theme>,
    question: Option<String>,
}

/// Request orchestrator: cache lookup, extraction fan-out, the two model
/// calls, failure merging and the cache write.
pub struct Analyzer {
    llm: Arc<dyn TextGenerator>,
    extractor: SourceExtractor,
    cache: ResultCache,
    config: PipelineConfig,
}

impl Analyzer {
    pub fn new(
        llm: Arc<dyn TextGenerator>,
        cache: ResultCache,
        config: PipelineConfig,
    ) -> Result<Self> {
        let extractor = SourceExtractor::new(config.extract_timeout, config.max_source_chars)?;
        Ok(Self {
            llm,
            extractor,
            cache,
            config,
        })
    }

    pub fn llm_configured(&self) -> bool {
        self.llm.has_credential()
    }

    pub fn cache_backend(&self) -> &'static str {
        self.cache.backend()
    }

    pub async fn analyze(&self, request: AnalyzeRequest) -> Result<AnalyzeResponse, AnalysisError> {
        let request = self.validate(request)?;
        if !self.llm.has_credential() {
            return Err(AnalysisError::Configuration(
                "Model API key is not configured".to_string(),
            ));
        }

        let key = CacheKey::build(
            request.parties.iter().map(|p| p.source().identifier(&p.id)),
            request.question.as_deref(),
        );

        if self.config.caching_enabled {
            if let Some(entry) = self.cache.get(&key).await {
                info!(key = %key.store_key(), "Serving analysis from cache");
                return Ok(AnalyzeResponse::from_entry(entry, true));
            }
        }

        let deadline = self.config.request_deadline;
        let (entry, complete) = tokio::time::timeout(deadline, self.compute(&request))
            .await
            .map_err(|_| {
                warn!(deadline_secs = deadline.as_secs(), "Analysis deadline exceeded");
                AnalysisError::DeadlineExceeded(deadline.as_secs())
            })??;

        // A missing free-form answer should be retried by the next request
        if self.config.caching_enabled && complete {
            self.cache.set(&key, &entry).await;
        }

        Ok(AnalyzeResponse::from_entry(entry, false))
    }

    fn validate(&self, request: AnalyzeRequest) -> Result<Validated, AnalysisError> {
        let parties = request
            .parties
            .ok_or_else(|| AnalysisError::Validation("Missing parties".to_string()))?;
        let themes = request
            .themes
            .ok_or_else(|| AnalysisError::Validation("Missing themes".to_string()))?;

        if parties.is_empty() {
            return Err(AnalysisError::Validation(
                "At least one party is required".to_string(),
            ));
        }
        let mut ids = HashSet::new();
        for party in &parties {
            if party.id.trim().is_empty() {
                return Err(AnalysisError::Validation("Party id must not be empty".to_string()));
            }
            if !ids.insert(party.id.as_str()) {
                return Err(AnalysisError::Validation(format!(
                    "Duplicate party id: {}",
                    party.id
                )));
            }
        }
        let mut keys = HashSet::new();
        for theme in &themes {
            if !keys.insert(theme.key.as_str()) {
                return Err(AnalysisError::Validation(format!(
                    "Duplicate theme key: {}",
                    theme.key
                )));
            }
        }

        let question = request
            .freeform_question
            .map(|q| q.trim().to_string())
            .filter(|q| !q.is_empty() && self.config.freeform_enabled);

        Ok(Validated {
            parties,
            themes,
            question,
        })
    }

    /// Extract, summarize and merge. The flag is false when a requested
    /// free-form answer could not be produced.
    async fn compute(&self, request: &Validated) -> Result<(CacheEntry, bool), AnalysisError> {
        info!(
            parties = request.parties.len(),
            themes = request.themes.len(),
            question = request.question.is_some(),
            "Extracting sources"
        );
        let outcomes = self.extractor.extract_all(&request.parties).await;
        let (extracted, failed): (Vec<&ExtractionOutcome>, Vec<&ExtractionOutcome>) =
            outcomes.iter().partition(|o| o.is_ok());

        if extracted.is_empty() {
            warn!(failed = failed.len(), "Every source failed, nothing to analyse");
            return Err(AnalysisError::NoSourceRetrieved);
        }
        info!(ok = extracted.len(), failed = failed.len(), "Extraction finished");

        let llm = self.llm.as_ref();
        let (summaries, freeform) = tokio::join!(
            summarize::summarize(llm, &extracted, &request.themes),
            async {
                match request.question.as_deref() {
                    Some(question) => Some(freeform::answer(llm, &extracted, question).await),
                    None => None,
                }
            }
        );

        let mut analysis = summaries.map_err(|e| {
            let message = format!("{:#}", e);
            warn!(error = %message, "Theme summarization failed");
            AnalysisError::Summarization(if message.is_empty() {
                "Theme summarization failed".to_string()
            } else {
                message
            })
        })?;

        let (freeform_answer, complete) = match freeform {
            Some(Ok(answer)) => (Some(answer), true),
            Some(Err(e)) => {
                warn!(error = %format!("{:#}", e), "Free-form answer failed, omitting it");
                (None, false)
            }
            None => (None, true),
        };

        if !request.themes.is_empty() {
            for outcome in &failed {
                let placeholders = request
                    .themes
                    .iter()
                    .map(|t| (t.key.clone(), RETRIEVAL_FAILED.to_string()))
                    .collect();
                analysis.insert(outcome.party_id.clone(), placeholders);
            }
        }

        Ok((
            CacheEntry {
                analysis,
                freeform_answer,
            },
            complete,
        ))
    }
}
