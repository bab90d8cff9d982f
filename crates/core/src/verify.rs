use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::carrier::{CarrierNumber, CarrierRecord, CarrierScheme};

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum RegistryError {
    #[error("registry request failed: {0}")]
    Network(String),
    #[error("registry returned status {status}")]
    Status { status: u16 },
    #[error("registry payload could not be decoded: {0}")]
    Decode(String),
}

/// Carrier registry lookup behind a narrow seam.
///
/// `Ok(None)` means the registry answered and found nothing under the given
/// scheme; transport and protocol failures are `Err` and must never be
/// collapsed into not-found.
#[async_trait]
pub trait CarrierRegistry: Send + Sync {
    async fn lookup(
        &self,
        scheme: CarrierScheme,
        value: &str,
    ) -> Result<Option<CarrierRecord>, RegistryError>;
}

#[derive(Clone, Debug, PartialEq)]
pub enum VerificationOutcome {
    Verified(CarrierRecord),
    NotVerified,
    VerificationError(RegistryError),
}

pub struct IdentityVerifier {
    registry: Arc<dyn CarrierRegistry>,
}

impl IdentityVerifier {
    pub fn new(registry: Arc<dyn CarrierRegistry>) -> Self {
        Self { registry }
    }

    /// Scheme-ordered lookup: DOT first, the MC docket only when DOT reports
    /// not-found. A transport failure stops the fallback so an outage is
    /// never reported to the user as an unknown number.
    ///
    /// The scheme the user typed only validates input shape; the registry is
    /// consulted in the fixed order regardless.
    pub async fn verify(&self, number: &CarrierNumber) -> VerificationOutcome {
        match self.registry.lookup(CarrierScheme::Dot, &number.value).await {
            Ok(Some(record)) => return VerificationOutcome::Verified(record),
            Ok(None) => {}
            Err(error) => return VerificationOutcome::VerificationError(error),
        }

        match self.registry.lookup(CarrierScheme::Mc, &number.value).await {
            Ok(Some(record)) => VerificationOutcome::Verified(record),
            Ok(None) => VerificationOutcome::NotVerified,
            Err(error) => VerificationOutcome::VerificationError(error),
        }
    }
}
