use anyhow::Result;
use async_trait::async_trait;

use haulbot_core::{field_labels, CriteriaField};

/// Single request/response completion call with a bounded token budget.
/// Failures must not propagate past the criteria extractor.
#[async_trait]
pub trait LlmClient: Send + Sync {
    async fn complete(&self, prompt: &str) -> Result<String>;
}

/// Shown when the assist service is unavailable; the missing fields are
/// appended separately so the user always learns what to add.
pub const ASSIST_APOLOGY: &str =
    "Sorry, I'm having trouble understanding right now. Please try rephrasing the load details.";

pub fn clarification_prompt(text: &str, missing: &[CriteriaField]) -> String {
    format!(
        "A carrier asked for a freight rate quote with this message:\n\
         \"{text}\"\n\n\
         These details are still missing or unclear: {}.\n\
         Write a short, friendly reply asking the carrier for exactly those \
         details. Do not quote a price and do not ask for anything else.",
        field_labels(missing)
    )
}
