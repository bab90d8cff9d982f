//! Dialog runtime - criteria extraction and conversation orchestration
//!
//! This crate is the decision-making layer of haulbot:
//! - **Criteria Extraction** (`extract`) - Parse free text → structured load
//!   criteria, with a one-shot language-model assist when fields are missing
//! - **Assist Seam** (`llm`) - Pluggable trait for the completion service
//! - **Dialog Runtime** (`runtime`) - Session store plus the per-turn loop
//!   that drives the transition table in `haulbot-core`
//!
//! # Safety Principle
//!
//! The language model is strictly a clarifier. It NEVER prices loads,
//! verifies carriers, or advances the conversation state. Those are
//! deterministic decisions made by the core.

pub mod extract;
pub mod llm;
pub mod runtime;
