pub mod engine;
pub mod states;

pub use engine::{
    CarrierQuoteFlow, DialogEngine, DialogFlow, DialogTransitionError, VERIFICATION_RETRY_BUDGET,
};
pub use states::{
    ConversationState, DialogAction, DialogContext, DialogEvent, Phase, TransitionOutcome,
};
