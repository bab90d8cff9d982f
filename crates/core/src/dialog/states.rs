use serde::{Deserialize, Serialize};

use crate::domain::carrier::CarrierRecord;
use crate::domain::criteria::PartialCriteria;

/// Where a conversation currently stands. `ReadyForCommand` is the post-
/// confirmation resting state where `/rate` and `/lookup` are accepted.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Phase {
    #[default]
    AwaitingIdentity,
    AwaitingConfirmation,
    ReadyForCommand,
    AwaitingLoadCriteria,
    AwaitingPostQuoteDecision,
    Terminated,
}

/// One fully-classified inbound turn. External results (registry outcome,
/// extraction completeness, reply tokens) are resolved before the event is
/// built, so the transition table stays pure.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum DialogEvent {
    IdentityMalformed,
    IdentityVerified,
    IdentityNotVerified,
    IdentityLookupFailed,
    ReplyYes,
    ReplyNo,
    ReplyAmbiguous,
    RateRequested,
    LookupRequested,
    HelpRequested,
    CancelRequested,
    CriteriaComplete,
    CriteriaIncomplete,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DialogContext {
    /// Failed verification attempts so far, including the one that produced
    /// the current event.
    pub verification_attempts: u32,
}

/// Side effects the runtime executes after a transition is accepted.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum DialogAction {
    PromptIdentityFormat,
    PromptVerificationRetry,
    PromptConfirmCompany,
    ConfirmCompany,
    DiscardCandidate,
    PromptReenterIdentity,
    SendVerifiedCommands,
    ResetCriteria,
    PromptCriteria,
    PromptNextLoad,
    SendAssistReply,
    SendQuote,
    PromptPostQuote,
    SendLookupResult,
    SendHelp,
    SendFarewell,
    SendCancelled,
    SendVerificationExhausted,
    EndSession,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransitionOutcome {
    pub from: Phase,
    pub to: Phase,
    pub event: DialogEvent,
    pub actions: Vec<DialogAction>,
}

/// Per-session dialog state, mutated only by the dialog runtime while the
/// session lock is held.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ConversationState {
    pub phase: Phase,
    /// Set exactly when the user answered "yes" in AwaitingConfirmation.
    /// Replaced wholesale on re-verification, never edited in place.
    pub verified_company: Option<CarrierRecord>,
    /// Held only while AwaitingConfirmation; promoted or discarded there.
    pub candidate_company: Option<CarrierRecord>,
    pub pending_criteria: PartialCriteria,
    pub verification_attempts: u32,
}
