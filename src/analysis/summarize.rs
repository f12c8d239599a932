use std::collections::{BTreeMap, HashSet};

use anyhow::{bail, Context, Result};
use serde::Serialize;
use tracing::{debug, info};

use super::prompts::SUMMARY_SYSTEM_PROMPT;
use super::types::AnalysisResult;
use crate::llm::{Message, ResponseFormat, TextGenerator};
use crate::sources::types::{ExtractionOutcome, Theme};

#[derive(Serialize)]
struct PartyText<'a> {
    id: &'a str,
    name: &'a str,
    text: &'a str,
}

/// Summarize every theme for every successfully extracted party in one call.
pub async fn summarize(
    llm: &dyn TextGenerator,
    extracted: &[&ExtractionOutcome],
    themes: &[Theme],
) -> Result<AnalysisResult> {
    if themes.is_empty() {
        return Ok(AnalysisResult::new());
    }

    let parties: Vec<PartyText> = extracted
        .iter()
        .filter_map(|&o| {
            o.text().map(|text| PartyText {
                id: &o.party_id,
                name: &o.name,
                text,
            })
        })
        .collect();
    let party_json = serde_json::to_string_pretty(&parties).context("serialize party texts")?;

    let theme_lines: Vec<String> = themes
        .iter()
        .map(|t| format!("- {}: {}", t.key, t.label))
        .collect();

    let prompt = format!(
        "Party texts (JSON list of {{id, name, text}}):\n{}\n\n\
         Themes (theme key: label):\n{}\n\n\
         For each party and each theme, write a summary of about 100 characters. \
         Return a JSON object keyed first by party id, then by theme key.",
        party_json,
        theme_lines.join("\n")
    );
    debug!(prompt_chars = prompt.len(), parties = parties.len(), "Summary prompt built");

    let messages = vec![Message::system(SUMMARY_SYSTEM_PROMPT), Message::user(prompt)];
    let raw = llm.generate(&messages, ResponseFormat::Json).await?;
    debug!(response_len = raw.len(), "Summary response received");

    let party_ids: HashSet<&str> = parties.iter().map(|p| p.id).collect();
    let theme_keys: HashSet<&str> = themes.iter().map(|t| t.key.as_str()).collect();
    let result = parse_summaries(&raw, &party_ids, &theme_keys)?;

    info!(
        parties = result.len(),
        summaries = result.values().map(|t| t.len()).sum::<usize>(),
        "Theme summaries parsed"
    );
    Ok(result)
}

/// Parse the model's JSON, keeping only requested parties and themes.
/// Every requested party gets an entry; themes the model skipped stay absent.
fn parse_summaries(
    raw: &str,
    party_ids: &HashSet<&str>,
    theme_keys: &HashSet<&str>,
) -> Result<AnalysisResult> {
    let value: serde_json::Value = serde_json::from_str(strip_code_fence(raw))
        .context("Model returned invalid JSON")?;
    let Some(by_party) = value.as_object() else {
        bail!("Model returned JSON that is not an object");
    };

    let mut result: AnalysisResult = party_ids
        .iter()
        .map(|id| (id.to_string(), BTreeMap::new()))
        .collect();

    for (party_id, themes) in by_party {
        let Some(slot) = result.get_mut(party_id) else {
            continue;
        };
        let Some(themes) = themes.as_object() else {
            continue;
        };
        for (key, summary) in themes {
            if !theme_keys.contains(key.as_str()) {
                continue;
            }
            if let Some(summary) = summary.as_str().map(str::trim).filter(|s| !s.is_empty()) {
                slot.insert(key.clone(), summary.to_string());
            }
        }
    }

    Ok(result)
}

/// Accept a bare JSON payload or one wrapped in a ```json fence.
fn strip_code_fence(raw: &str) -> &str {
    let trimmed = raw.trim();
    let Some(after_open) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let body_start = after_open.find('\n').map(|i| i + 1).unwrap_or(after_open.len());
    let body = &after_open[body_start..];
    body.rfind("```").map(|end| &body[..end]).unwrap_or(body).trim()
}
