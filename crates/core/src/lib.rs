pub mod config;
pub mod dialog;
pub mod domain;
pub mod errors;
pub mod pricing;
pub mod verify;

pub use dialog::{
    CarrierQuoteFlow, ConversationState, DialogAction, DialogContext, DialogEngine, DialogEvent,
    DialogTransitionError, Phase, TransitionOutcome, VERIFICATION_RETRY_BUDGET,
};
pub use domain::carrier::{
    CarrierNumber, CarrierRecord, CarrierScheme, IdentityParseError,
};
pub use domain::criteria::{
    field_labels, CriteriaField, EquipmentType, LoadCriteria, PartialCriteria,
};
pub use errors::{ApplicationError, DomainError, InterfaceError};
pub use pricing::{
    HistoricalRateStore, Provenance, RateEstimator, RateQuery, RateResult, RateStoreError,
};
pub use verify::{CarrierRegistry, IdentityVerifier, RegistryError, VerificationOutcome};
