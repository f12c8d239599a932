use anyhow::{bail, Result};
use tracing::debug;

use super::prompts::FREEFORM_SYSTEM_PROMPT;
use super::types::FreeformAnswer;
use crate::llm::{Message, ResponseFormat, TextGenerator};
use crate::sources::types::ExtractionOutcome;

/// Answer a free-form question from the extracted texts alone.
///
/// Grounding is requested in the prompt only; the answer is not validated
/// against the sources.
pub async fn answer(
    llm: &dyn TextGenerator,
    extracted: &[&ExtractionOutcome],
    question: &str,
) -> Result<FreeformAnswer> {
    let texts: Vec<String> = extracted
        .iter()
        .filter_map(|o| {
            o.text()
                .map(|text| format!("### {} (id: {})\n{}", o.name, o.party_id, text))
        })
        .collect();

    let prompt = format!(
        "Party texts:\n\n{}\n\nQuestion: {}\n\n\
         Answer using only the texts above and compare the parties explicitly.",
        texts.join("\n\n"),
        question
    );
    debug!(prompt_chars = prompt.len(), "Free-form prompt built");

    let messages = vec![Message::system(FREEFORM_SYSTEM_PROMPT), Message::user(prompt)];
    let answer = llm.generate(&messages, ResponseFormat::Text).await?;
    if answer.trim().is_empty() {
        bail!("Model returned no content");
    }

    Ok(FreeformAnswer {
        question: question.to_string(),
        answer,
    })
}
