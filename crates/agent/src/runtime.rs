use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;
use tracing::{info, warn};

use haulbot_core::{
    ApplicationError, CarrierNumber, CarrierQuoteFlow, ConversationState, DialogAction,
    DialogContext, DialogEngine, DialogEvent, DomainError, IdentityVerifier, InterfaceError,
    PartialCriteria, Provenance, RateEstimator, RateResult, VerificationOutcome,
};

use crate::extract::{CriteriaExtractor, Extraction};

/// One outbound chat message plus what to do with the reply keyboard.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BotReply {
    pub text: String,
    pub keyboard: KeyboardRequest,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum KeyboardRequest {
    None,
    /// One-time YES/NO quick-reply keyboard.
    YesNo,
    Remove,
}

impl BotReply {
    pub fn plain(text: impl Into<String>) -> Self {
        Self { text: text.into(), keyboard: KeyboardRequest::None }
    }

    pub fn yes_no(text: impl Into<String>) -> Self {
        Self { text: text.into(), keyboard: KeyboardRequest::YesNo }
    }

    pub fn remove_keyboard(text: impl Into<String>) -> Self {
        Self { text: text.into(), keyboard: KeyboardRequest::Remove }
    }
}

/// Private-channel membership check. Implementations fail closed: an error
/// answering the question means "not a member".
#[async_trait]
pub trait MembershipGate: Send + Sync {
    async fn is_member(&self, user_id: i64) -> bool;
}

/// Session-keyed conversation store, injected into the runtime so tests get
/// an isolated instance. Each entry carries its own lock; holding it for a
/// whole turn is what serializes turns per session while distinct sessions
/// proceed concurrently.
#[derive(Default)]
pub struct SessionStore {
    sessions: Mutex<HashMap<i64, Arc<Mutex<ConversationState>>>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the session entry and whether this call created it.
    pub async fn entry(&self, chat_id: i64) -> (Arc<Mutex<ConversationState>>, bool) {
        let mut sessions = self.sessions.lock().await;
        match sessions.get(&chat_id) {
            Some(existing) => (existing.clone(), false),
            None => {
                let created = Arc::new(Mutex::new(ConversationState::default()));
                sessions.insert(chat_id, created.clone());
                (created, true)
            }
        }
    }

    pub async fn remove(&self, chat_id: i64) {
        self.sessions.lock().await.remove(&chat_id);
    }

    pub async fn active_sessions(&self) -> usize {
        self.sessions.lock().await.len()
    }
}

/// Everything a classified turn carries into action rendering.
#[derive(Debug, Default)]
struct TurnData {
    candidate: Option<haulbot_core::CarrierRecord>,
    quote: Option<RateResult>,
    assist_message: Option<String>,
    merged_criteria: Option<PartialCriteria>,
    lookup_reply: Option<String>,
}

/// The dialog controller: classifies each inbound message against the
/// current phase, runs the transition table, and renders the resulting
/// actions into replies. State is only touched while the session lock is
/// held.
pub struct DialogRuntime {
    sessions: SessionStore,
    gate: Arc<dyn MembershipGate>,
    verifier: IdentityVerifier,
    extractor: CriteriaExtractor,
    estimator: RateEstimator,
    engine: DialogEngine<CarrierQuoteFlow>,
}

impl DialogRuntime {
    pub fn new(
        sessions: SessionStore,
        gate: Arc<dyn MembershipGate>,
        verifier: IdentityVerifier,
        extractor: CriteriaExtractor,
        estimator: RateEstimator,
    ) -> Self {
        Self {
            sessions,
            gate,
            verifier,
            extractor,
            estimator,
            engine: DialogEngine::default(),
        }
    }

    pub fn sessions(&self) -> &SessionStore {
        &self.sessions
    }

    pub async fn handle_message(&self, chat_id: i64, user_id: i64, text: &str) -> Vec<BotReply> {
        let text = text.trim();
        let (session, created) = self.sessions.entry(chat_id).await;
        let mut state = session.lock().await;

        if created {
            if !self.gate.is_member(user_id).await {
                drop(state);
                self.sessions.remove(chat_id).await;
                info!(chat_id, user_id, "membership check failed; conversation refused");
                return vec![BotReply::plain(prompts::MEMBERS_ONLY)];
            }
            info!(chat_id, "conversation opened");
            return vec![BotReply::remove_keyboard(prompts::GREETING)];
        }

        let (event, data) = self.classify(&mut state, text).await;

        let context = DialogContext { verification_attempts: state.verification_attempts };
        let outcome = match self.engine.apply(state.phase, event, &context) {
            Ok(outcome) => outcome,
            Err(error) => {
                warn!(chat_id, phase = ?state.phase, ?event, %error, "dialog transition rejected");
                let interface =
                    InterfaceError::from(ApplicationError::from(DomainError::from(error)));
                return vec![BotReply::plain(interface.user_message())];
            }
        };

        info!(chat_id, from = ?outcome.from, to = ?outcome.to, event = ?outcome.event, "dialog transition applied");

        state.phase = outcome.to;
        if let Some(candidate) = data.candidate {
            state.candidate_company = Some(candidate);
        }
        if let Some(merged) = data.merged_criteria {
            state.pending_criteria = merged;
        }

        let mut replies = Vec::new();
        let mut end_session = false;
        for action in &outcome.actions {
            match action {
                DialogAction::PromptIdentityFormat => {
                    replies.push(BotReply::plain(prompts::IDENTITY_FORMAT));
                }
                DialogAction::PromptVerificationRetry => {
                    replies.push(BotReply::plain(prompts::VERIFICATION_FAILED));
                }
                DialogAction::PromptConfirmCompany => {
                    let name = state
                        .candidate_company
                        .as_ref()
                        .map(|record| record.display_name().to_string())
                        .unwrap_or_else(|| "Unknown Company".to_string());
                    replies.push(BotReply::yes_no(format!("Is {name} your company?")));
                }
                DialogAction::ConfirmCompany => {
                    // Replaced wholesale; a re-verification never edits the
                    // old record in place.
                    state.verified_company = state.candidate_company.take();
                }
                DialogAction::DiscardCandidate => {
                    state.candidate_company = None;
                }
                DialogAction::PromptReenterIdentity => {
                    replies.push(BotReply::remove_keyboard(prompts::REENTER_IDENTITY));
                }
                DialogAction::SendVerifiedCommands => {
                    replies.push(BotReply::remove_keyboard(prompts::VERIFIED_COMMANDS));
                }
                DialogAction::ResetCriteria => {
                    state.pending_criteria = PartialCriteria::default();
                }
                DialogAction::PromptCriteria => {
                    replies.push(BotReply::remove_keyboard(prompts::CRITERIA_PROMPT));
                }
                DialogAction::PromptNextLoad => {
                    replies.push(BotReply::remove_keyboard(prompts::NEXT_LOAD_PROMPT));
                }
                DialogAction::SendAssistReply => {
                    let message = data
                        .assist_message
                        .clone()
                        .unwrap_or_else(|| crate::llm::ASSIST_APOLOGY.to_string());
                    replies.push(BotReply::plain(message));
                }
                DialogAction::SendQuote => match &data.quote {
                    Some(quote) => replies.push(BotReply::plain(quote_message(quote))),
                    None => replies.push(BotReply::plain(
                        InterfaceError::Internal { message: "quote missing".to_string() }
                            .user_message(),
                    )),
                },
                DialogAction::PromptPostQuote => {
                    replies.push(BotReply::yes_no(prompts::POST_QUOTE_PROMPT));
                }
                DialogAction::SendLookupResult => {
                    let message =
                        data.lookup_reply.clone().unwrap_or_else(|| prompts::LOOKUP_USAGE.to_string());
                    replies.push(BotReply::plain(message));
                }
                DialogAction::SendHelp => {
                    replies.push(BotReply::plain(prompts::HELP_TEXT));
                }
                DialogAction::SendFarewell => {
                    replies.push(BotReply::remove_keyboard(prompts::FAREWELL));
                }
                DialogAction::SendCancelled => {
                    replies.push(BotReply::remove_keyboard(prompts::CANCELLED));
                }
                DialogAction::SendVerificationExhausted => {
                    replies.push(BotReply::remove_keyboard(prompts::VERIFICATION_EXHAUSTED));
                }
                DialogAction::EndSession => {
                    end_session = true;
                }
            }
        }

        drop(state);
        if end_session {
            self.sessions.remove(chat_id).await;
        }

        replies
    }

    /// Resolve the inbound text (and any external calls it requires) into a
    /// dialog event before the pure transition table runs.
    async fn classify(
        &self,
        state: &mut ConversationState,
        text: &str,
    ) -> (DialogEvent, TurnData) {
        use haulbot_core::Phase;

        if text.eq_ignore_ascii_case("/cancel") {
            return (DialogEvent::CancelRequested, TurnData::default());
        }
        if text.eq_ignore_ascii_case("/help") {
            return (DialogEvent::HelpRequested, TurnData::default());
        }

        match state.phase {
            Phase::AwaitingIdentity => self.classify_identity(state, text).await,
            Phase::AwaitingConfirmation | Phase::AwaitingPostQuoteDecision => {
                (classify_reply(text), TurnData::default())
            }
            Phase::ReadyForCommand => self.classify_command(text).await,
            Phase::AwaitingLoadCriteria => self.classify_criteria(state, text).await,
            // Terminated sessions are removed from the store; reaching here
            // means a stale handle, and the engine will reject the event.
            Phase::Terminated => (DialogEvent::ReplyAmbiguous, TurnData::default()),
        }
    }

    async fn classify_identity(
        &self,
        state: &mut ConversationState,
        text: &str,
    ) -> (DialogEvent, TurnData) {
        let number = match CarrierNumber::parse(text) {
            Ok(number) => number,
            Err(error) => {
                info!(%error, "carrier number rejected before lookup");
                return (DialogEvent::IdentityMalformed, TurnData::default());
            }
        };

        match self.verifier.verify(&number).await {
            VerificationOutcome::Verified(record) => (
                DialogEvent::IdentityVerified,
                TurnData { candidate: Some(record), ..TurnData::default() },
            ),
            VerificationOutcome::NotVerified => {
                state.verification_attempts += 1;
                (DialogEvent::IdentityNotVerified, TurnData::default())
            }
            VerificationOutcome::VerificationError(error) => {
                state.verification_attempts += 1;
                warn!(%error, "registry lookup failed");
                (DialogEvent::IdentityLookupFailed, TurnData::default())
            }
        }
    }

    async fn classify_command(&self, text: &str) -> (DialogEvent, TurnData) {
        if text.eq_ignore_ascii_case("/rate") {
            return (DialogEvent::RateRequested, TurnData::default());
        }

        if let Some(argument) = strip_command(text, "/lookup") {
            let reply = self.lookup_reply(argument).await;
            return (
                DialogEvent::LookupRequested,
                TurnData { lookup_reply: Some(reply), ..TurnData::default() },
            );
        }

        (DialogEvent::ReplyAmbiguous, TurnData::default())
    }

    async fn lookup_reply(&self, argument: &str) -> String {
        let number = match CarrierNumber::parse(argument) {
            Ok(number) => number,
            Err(_) => return prompts::LOOKUP_USAGE.to_string(),
        };

        match self.verifier.verify(&number).await {
            VerificationOutcome::Verified(record) => format!(
                "Company: {}\nSafety Rating: {}",
                record.display_name(),
                record.safety_rating_display()
            ),
            VerificationOutcome::NotVerified => prompts::LOOKUP_NOT_FOUND.to_string(),
            VerificationOutcome::VerificationError(error) => {
                warn!(%error, "registry lookup failed during /lookup");
                InterfaceError::ServiceUnavailable { message: error.to_string() }
                    .user_message()
                    .to_string()
            }
        }
    }

    async fn classify_criteria(
        &self,
        state: &mut ConversationState,
        text: &str,
    ) -> (DialogEvent, TurnData) {
        match self.extractor.extract(text, &state.pending_criteria).await {
            Extraction::Complete(criteria) => {
                let quote = self.estimator.estimate(&criteria).await;
                if let Some(store_error) = &quote.store_error {
                    warn!(%store_error, "historical store unavailable; priced by formula");
                }
                (
                    DialogEvent::CriteriaComplete,
                    TurnData { quote: Some(quote), ..TurnData::default() },
                )
            }
            Extraction::Clarify { partial, missing, message } => {
                info!(missing = ?missing, "criteria incomplete after deterministic pass");
                (
                    DialogEvent::CriteriaIncomplete,
                    TurnData {
                        merged_criteria: Some(partial),
                        assist_message: Some(message),
                        ..TurnData::default()
                    },
                )
            }
        }
    }
}

fn classify_reply(text: &str) -> DialogEvent {
    let token = text.trim().trim_matches(|ch: char| !ch.is_ascii_alphanumeric());
    if token.eq_ignore_ascii_case("yes") {
        DialogEvent::ReplyYes
    } else if token.eq_ignore_ascii_case("no") {
        DialogEvent::ReplyNo
    } else {
        DialogEvent::ReplyAmbiguous
    }
}

fn strip_command<'a>(text: &'a str, command: &str) -> Option<&'a str> {
    if text.eq_ignore_ascii_case(command) {
        return Some("");
    }
    let head = text.get(..command.len())?;
    let rest = &text[command.len()..];
    if head.eq_ignore_ascii_case(command) && rest.starts_with(char::is_whitespace) {
        Some(rest.trim())
    } else {
        None
    }
}

fn quote_message(quote: &RateResult) -> String {
    match quote.provenance {
        Provenance::HistoricalMatch => format!(
            "The estimated rate based on historically similar loads is: {}",
            quote.display_amount()
        ),
        Provenance::FormulaFallback => format!(
            "Based on my analysis and calculations of the information provided, the estimated rate is: {}",
            quote.display_amount()
        ),
    }
}

pub mod prompts {
    pub const MEMBERS_ONLY: &str =
        "Sorry, this bot is only available to members of our private channel.";
    pub const GREETING: &str =
        "Hi, thanks for being a member of Haul Line Logistics and welcome to HaulBot! \
         Please enter your MC or DOT number (e.g., 'MC 123456' or 'DOT 654321') to get started.";
    pub const IDENTITY_FORMAT: &str =
        "Please enter a valid MC or DOT number in the format: 'MC 123456' or 'DOT 654321'.";
    pub const VERIFICATION_FAILED: &str =
        "Your MC/DOT number could not be verified. Please try again.";
    pub const VERIFICATION_EXHAUSTED: &str =
        "I couldn't verify an MC/DOT number after several attempts. \
         Please check the number with your dispatcher and start again later.";
    pub const REENTER_IDENTITY: &str = "Please re-enter your MC or DOT number.";
    pub const VERIFIED_COMMANDS: &str =
        "Your MC/DOT number is verified. You can now use the following commands:\n\
         /rate - Request a rate quote for a load.\n\
         /lookup - Look up the safety rating of a company by MC/DOT number.\n\
         /cancel - Cancel the current operation.\n\
         /help - Display this help message.";
    pub const HELP_TEXT: &str = "/rate - Request a rate quote for a load.\n\
         /lookup - Look up the safety rating of a company by MC/DOT number.\n\
         /cancel - Cancel the current operation.\n\
         /help - Display this help message.";
    pub const CRITERIA_PROMPT: &str =
        "Sure, let's calculate a rate quote. Please provide the following details: \
         shipper city, consignee city, distance, weight, equipment type, hazmat (yes/no), \
         number of extra stops, and driver assistance (yes/no).";
    pub const NEXT_LOAD_PROMPT: &str = "Please provide the new details for your rate quote.";
    pub const POST_QUOTE_PROMPT: &str =
        "Have another load to quote? Please reply with 'Yes' to continue or 'No' to exit.";
    pub const FAREWELL: &str = "Thank you for using HaulBot. Have a great day!";
    pub const CANCELLED: &str = "Operation cancelled.";
    pub const LOOKUP_USAGE: &str =
        "Please provide the MC or DOT number in the format: '/lookup MC 123456' or '/lookup DOT 654321'.";
    pub const LOOKUP_NOT_FOUND: &str =
        "The MC/DOT number you provided could not be verified. Please try again.";
}
