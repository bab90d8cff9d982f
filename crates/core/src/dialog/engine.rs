use thiserror::Error;

use crate::dialog::states::{
    DialogAction, DialogContext, DialogEvent, Phase, TransitionOutcome,
};

/// Failed verification attempts a session may burn before it is terminated.
pub const VERIFICATION_RETRY_BUDGET: u32 = 5;

pub trait DialogFlow {
    fn initial_phase(&self) -> Phase;
    fn transition(
        &self,
        current: Phase,
        event: DialogEvent,
        context: &DialogContext,
    ) -> Result<TransitionOutcome, DialogTransitionError>;
}

/// The carrier-verification-then-quote conversation.
#[derive(Clone, Debug, Default)]
pub struct CarrierQuoteFlow;

impl DialogFlow for CarrierQuoteFlow {
    fn initial_phase(&self) -> Phase {
        Phase::AwaitingIdentity
    }

    fn transition(
        &self,
        current: Phase,
        event: DialogEvent,
        context: &DialogContext,
    ) -> Result<TransitionOutcome, DialogTransitionError> {
        transition_carrier_quote(current, event, context)
    }
}

pub struct DialogEngine<F> {
    flow: F,
}

impl<F> DialogEngine<F>
where
    F: DialogFlow,
{
    pub fn new(flow: F) -> Self {
        Self { flow }
    }

    pub fn initial_phase(&self) -> Phase {
        self.flow.initial_phase()
    }

    pub fn apply(
        &self,
        current: Phase,
        event: DialogEvent,
        context: &DialogContext,
    ) -> Result<TransitionOutcome, DialogTransitionError> {
        self.flow.transition(current, event, context)
    }
}

impl Default for DialogEngine<CarrierQuoteFlow> {
    fn default() -> Self {
        Self::new(CarrierQuoteFlow)
    }
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum DialogTransitionError {
    #[error("no transition from {phase:?} for event {event:?}")]
    InvalidTransition { phase: Phase, event: DialogEvent },
}

fn transition_carrier_quote(
    current: Phase,
    event: DialogEvent,
    context: &DialogContext,
) -> Result<TransitionOutcome, DialogTransitionError> {
    use DialogAction::{
        ConfirmCompany, DiscardCandidate, EndSession, PromptConfirmCompany, PromptCriteria,
        PromptIdentityFormat, PromptNextLoad, PromptPostQuote, PromptReenterIdentity,
        PromptVerificationRetry, ResetCriteria, SendAssistReply, SendCancelled, SendFarewell,
        SendHelp, SendLookupResult, SendQuote, SendVerificationExhausted, SendVerifiedCommands,
    };
    use DialogEvent::{
        CancelRequested, CriteriaComplete, CriteriaIncomplete, HelpRequested, IdentityLookupFailed,
        IdentityMalformed, IdentityNotVerified, IdentityVerified, LookupRequested, RateRequested,
        ReplyAmbiguous, ReplyNo, ReplyYes,
    };
    use Phase::{
        AwaitingConfirmation, AwaitingIdentity, AwaitingLoadCriteria, AwaitingPostQuoteDecision,
        ReadyForCommand, Terminated,
    };

    let invalid =
        || Err(DialogTransitionError::InvalidTransition { phase: current, event });

    let (to, actions) = match (current, event) {
        (Terminated, _) => return invalid(),

        // Available from every live phase.
        (_, CancelRequested) => (Terminated, vec![SendCancelled, EndSession]),
        (phase, HelpRequested) => (phase, vec![SendHelp]),

        (AwaitingIdentity, IdentityMalformed) => {
            (AwaitingIdentity, vec![PromptIdentityFormat])
        }
        (AwaitingIdentity, IdentityVerified) => {
            (AwaitingConfirmation, vec![PromptConfirmCompany])
        }
        (AwaitingIdentity, IdentityNotVerified | IdentityLookupFailed) => {
            if context.verification_attempts >= VERIFICATION_RETRY_BUDGET {
                (Terminated, vec![SendVerificationExhausted, EndSession])
            } else {
                (AwaitingIdentity, vec![PromptVerificationRetry])
            }
        }

        (AwaitingConfirmation, ReplyYes) => {
            (ReadyForCommand, vec![ConfirmCompany, SendVerifiedCommands])
        }
        (AwaitingConfirmation, ReplyNo) => {
            (AwaitingIdentity, vec![DiscardCandidate, PromptReenterIdentity])
        }
        // Ambiguous replies in a binary-choice state re-prompt without
        // advancing; no default interpretation.
        (AwaitingConfirmation, ReplyAmbiguous) => {
            (AwaitingConfirmation, vec![PromptConfirmCompany])
        }

        (ReadyForCommand, RateRequested) => {
            (AwaitingLoadCriteria, vec![ResetCriteria, PromptCriteria])
        }
        (ReadyForCommand, LookupRequested) => (ReadyForCommand, vec![SendLookupResult]),
        (ReadyForCommand, ReplyYes | ReplyNo | ReplyAmbiguous) => {
            (ReadyForCommand, vec![SendHelp])
        }

        (AwaitingLoadCriteria, CriteriaComplete) => {
            (AwaitingPostQuoteDecision, vec![SendQuote, PromptPostQuote])
        }
        (AwaitingLoadCriteria, CriteriaIncomplete) => {
            (AwaitingLoadCriteria, vec![SendAssistReply])
        }

        (AwaitingPostQuoteDecision, ReplyYes) => {
            (AwaitingLoadCriteria, vec![ResetCriteria, PromptNextLoad])
        }
        (AwaitingPostQuoteDecision, ReplyNo) => (Terminated, vec![SendFarewell, EndSession]),
        (AwaitingPostQuoteDecision, ReplyAmbiguous) => {
            (AwaitingPostQuoteDecision, vec![PromptPostQuote])
        }

        _ => return invalid(),
    };

    Ok(TransitionOutcome { from: current, to, event, actions })
}

#[cfg(test)]
mod tests {
    use crate::dialog::engine::{
        CarrierQuoteFlow, DialogEngine, DialogTransitionError, VERIFICATION_RETRY_BUDGET,
    };
    use crate::dialog::states::{DialogAction, DialogContext, DialogEvent, Phase};

    #[test]
    fn happy_path_from_identity_to_farewell() {
        let engine = DialogEngine::default();
        let context = DialogContext::default();
        let mut phase = engine.initial_phase();

        phase = engine
            .apply(phase, DialogEvent::IdentityVerified, &context)
            .expect("identity -> confirmation")
            .to;
        assert_eq!(phase, Phase::AwaitingConfirmation);

        phase = engine
            .apply(phase, DialogEvent::ReplyYes, &context)
            .expect("confirmation -> ready")
            .to;
        assert_eq!(phase, Phase::ReadyForCommand);

        let to_criteria = engine
            .apply(phase, DialogEvent::RateRequested, &context)
            .expect("ready -> criteria");
        assert_eq!(to_criteria.to, Phase::AwaitingLoadCriteria);
        assert!(to_criteria.actions.contains(&DialogAction::ResetCriteria));

        phase = engine
            .apply(to_criteria.to, DialogEvent::CriteriaComplete, &context)
            .expect("criteria -> post-quote")
            .to;
        assert_eq!(phase, Phase::AwaitingPostQuoteDecision);

        let farewell = engine
            .apply(phase, DialogEvent::ReplyNo, &context)
            .expect("post-quote no -> terminated");
        assert_eq!(farewell.to, Phase::Terminated);
        assert!(farewell.actions.contains(&DialogAction::EndSession));
    }

    #[test]
    fn every_entry_into_criteria_collection_resets_criteria() {
        let engine = DialogEngine::default();
        let context = DialogContext::default();

        for (phase, event) in [
            (Phase::ReadyForCommand, DialogEvent::RateRequested),
            (Phase::AwaitingPostQuoteDecision, DialogEvent::ReplyYes),
        ] {
            let outcome = engine.apply(phase, event, &context).expect("transition");
            assert_eq!(outcome.to, Phase::AwaitingLoadCriteria);
            assert!(
                outcome.actions.contains(&DialogAction::ResetCriteria),
                "entry via {event:?} must reset criteria"
            );
        }
    }

    #[test]
    fn ambiguous_confirmation_reply_reprompts_without_advancing() {
        let engine = DialogEngine::default();
        let outcome = engine
            .apply(
                Phase::AwaitingConfirmation,
                DialogEvent::ReplyAmbiguous,
                &DialogContext::default(),
            )
            .expect("ambiguous reply should be accepted");

        assert_eq!(outcome.to, Phase::AwaitingConfirmation);
        assert_eq!(outcome.actions, vec![DialogAction::PromptConfirmCompany]);
    }

    #[test]
    fn confirmation_no_returns_to_identity_and_drops_candidate() {
        let engine = DialogEngine::default();
        let outcome = engine
            .apply(Phase::AwaitingConfirmation, DialogEvent::ReplyNo, &DialogContext::default())
            .expect("no should be accepted");

        assert_eq!(outcome.to, Phase::AwaitingIdentity);
        assert!(outcome.actions.contains(&DialogAction::DiscardCandidate));
    }

    #[test]
    fn verification_failures_stay_in_identity_until_budget_exhausted() {
        let engine = DialogEngine::default();

        let retry = engine
            .apply(
                Phase::AwaitingIdentity,
                DialogEvent::IdentityNotVerified,
                &DialogContext { verification_attempts: VERIFICATION_RETRY_BUDGET - 1 },
            )
            .expect("retry should be accepted");
        assert_eq!(retry.to, Phase::AwaitingIdentity);

        let exhausted = engine
            .apply(
                Phase::AwaitingIdentity,
                DialogEvent::IdentityLookupFailed,
                &DialogContext { verification_attempts: VERIFICATION_RETRY_BUDGET },
            )
            .expect("exhaustion should be accepted");
        assert_eq!(exhausted.to, Phase::Terminated);
        assert!(exhausted.actions.contains(&DialogAction::SendVerificationExhausted));
    }

    #[test]
    fn cancel_terminates_from_any_live_phase() {
        let engine = DialogEngine::default();
        for phase in [
            Phase::AwaitingIdentity,
            Phase::AwaitingConfirmation,
            Phase::ReadyForCommand,
            Phase::AwaitingLoadCriteria,
            Phase::AwaitingPostQuoteDecision,
        ] {
            let outcome = engine
                .apply(phase, DialogEvent::CancelRequested, &DialogContext::default())
                .expect("cancel should be accepted");
            assert_eq!(outcome.to, Phase::Terminated);
            assert!(outcome.actions.contains(&DialogAction::EndSession));
        }
    }

    #[test]
    fn help_never_changes_phase() {
        let engine = DialogEngine::default();
        for phase in [
            Phase::AwaitingIdentity,
            Phase::AwaitingConfirmation,
            Phase::ReadyForCommand,
            Phase::AwaitingLoadCriteria,
            Phase::AwaitingPostQuoteDecision,
        ] {
            let outcome = engine
                .apply(phase, DialogEvent::HelpRequested, &DialogContext::default())
                .expect("help should be accepted");
            assert_eq!(outcome.to, phase);
            assert_eq!(outcome.actions, vec![DialogAction::SendHelp]);
        }
    }

    #[test]
    fn unreachable_pairs_are_rejected() {
        let engine = DialogEngine::default();

        let error = engine
            .apply(Phase::AwaitingIdentity, DialogEvent::CriteriaComplete, &DialogContext::default())
            .expect_err("criteria events make no sense while awaiting identity");
        assert!(matches!(error, DialogTransitionError::InvalidTransition { .. }));

        let error = engine
            .apply(Phase::Terminated, DialogEvent::HelpRequested, &DialogContext::default())
            .expect_err("terminated sessions accept nothing");
        assert!(matches!(
            error,
            DialogTransitionError::InvalidTransition { phase: Phase::Terminated, .. }
        ));
    }

    #[test]
    fn replay_is_deterministic_for_same_event_sequence() {
        let engine = DialogEngine::new(CarrierQuoteFlow);
        let events = [
            DialogEvent::IdentityVerified,
            DialogEvent::ReplyYes,
            DialogEvent::RateRequested,
            DialogEvent::CriteriaIncomplete,
            DialogEvent::CriteriaComplete,
            DialogEvent::ReplyYes,
        ];

        let run = |engine: &DialogEngine<CarrierQuoteFlow>| {
            let mut phase = engine.initial_phase();
            let mut actions = Vec::new();
            for event in events {
                let outcome = engine
                    .apply(phase, event, &DialogContext::default())
                    .expect("deterministic run");
                actions.push(outcome.actions.clone());
                phase = outcome.to;
            }
            (phase, actions)
        };

        assert_eq!(run(&engine), run(&engine));
    }
}
