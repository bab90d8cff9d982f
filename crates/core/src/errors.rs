use thiserror::Error;

use crate::dialog::DialogTransitionError;

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum DomainError {
    #[error(transparent)]
    DialogTransition(#[from] DialogTransitionError),
    #[error("domain invariant violation: {0}")]
    InvariantViolation(String),
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ApplicationError {
    #[error(transparent)]
    Domain(#[from] DomainError),
    #[error("persistence failure: {0}")]
    Persistence(String),
    #[error("integration failure: {0}")]
    Integration(String),
    #[error("configuration failure: {0}")]
    Configuration(String),
}

/// Chat-facing error classification. The technical detail stays in the logs;
/// only `user_message` ever reaches the conversation.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum InterfaceError {
    #[error("bad request: {message}")]
    BadRequest { message: String },
    #[error("service unavailable: {message}")]
    ServiceUnavailable { message: String },
    #[error("internal error: {message}")]
    Internal { message: String },
}

impl InterfaceError {
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::BadRequest { .. } => {
                "I couldn't process that. Please check the format and try again."
            }
            Self::ServiceUnavailable { .. } => {
                "A service I depend on is temporarily unavailable. Please try again shortly."
            }
            Self::Internal { .. } => {
                "An error occurred. Please try again or type '/cancel' to restart."
            }
        }
    }
}

impl From<ApplicationError> for InterfaceError {
    fn from(value: ApplicationError) -> Self {
        match value {
            ApplicationError::Domain(error) => Self::BadRequest { message: error.to_string() },
            ApplicationError::Persistence(message) | ApplicationError::Integration(message) => {
                Self::ServiceUnavailable { message }
            }
            ApplicationError::Configuration(message) => Self::Internal { message },
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::dialog::{DialogEvent, DialogTransitionError, Phase};
    use crate::errors::{ApplicationError, DomainError, InterfaceError};

    #[test]
    fn dialog_transition_error_maps_to_bad_request() {
        let interface = InterfaceError::from(ApplicationError::from(DomainError::from(
            DialogTransitionError::InvalidTransition {
                phase: Phase::AwaitingIdentity,
                event: DialogEvent::CriteriaComplete,
            },
        )));

        assert!(matches!(interface, InterfaceError::BadRequest { .. }));
        assert_eq!(
            interface.user_message(),
            "I couldn't process that. Please check the format and try again."
        );
    }

    #[test]
    fn integration_failure_maps_to_service_unavailable() {
        let interface =
            InterfaceError::from(ApplicationError::Integration("registry timed out".to_string()));

        assert!(matches!(interface, InterfaceError::ServiceUnavailable { .. }));
    }

    #[test]
    fn user_messages_never_contain_technical_detail() {
        let interface = InterfaceError::from(ApplicationError::Persistence(
            "database lock timeout on load_history".to_string(),
        ));

        assert!(!interface.user_message().contains("load_history"));
    }

    #[test]
    fn configuration_failure_maps_to_internal() {
        let interface =
            InterfaceError::from(ApplicationError::Configuration("bad token".to_string()));
        assert!(matches!(interface, InterfaceError::Internal { .. }));
        assert_eq!(
            interface.user_message(),
            "An error occurred. Please try again or type '/cancel' to restart."
        );
    }
}
