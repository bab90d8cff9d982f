use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;

use haulbot_core::config::RegistryConfig;
use haulbot_core::{CarrierRecord, CarrierRegistry, CarrierScheme, RegistryError};

/// FMCSA QCMobile client. A 200 answer with empty `content` is "not found";
/// any other status, a network failure, or an undecodable payload is a
/// `RegistryError` so outages never masquerade as unknown numbers.
pub struct FmcsaRegistry {
    client: Client,
    base_url: String,
    web_key: SecretString,
}

#[derive(Debug, Default, Deserialize)]
struct CarrierSearchResponse {
    #[serde(default)]
    content: Vec<CarrierEnvelope>,
}

#[derive(Debug, Deserialize)]
struct CarrierEnvelope {
    #[serde(default)]
    carrier: Option<CarrierPayload>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CarrierPayload {
    #[serde(default)]
    legal_name: Option<String>,
    #[serde(default)]
    dba_name: Option<String>,
    #[serde(default)]
    safety_rating: Option<String>,
    #[serde(default)]
    allowed_to_operate: Option<String>,
    #[serde(default)]
    phy_street: Option<String>,
    #[serde(default)]
    phy_city: Option<String>,
    #[serde(default)]
    phy_state: Option<String>,
    #[serde(default)]
    phy_zipcode: Option<String>,
}

impl FmcsaRegistry {
    pub fn new(config: &RegistryConfig) -> Result<Self, reqwest::Error> {
        let client = Client::builder().timeout(Duration::from_secs(config.timeout_secs)).build()?;
        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            web_key: config.web_key.clone(),
        })
    }

    fn lookup_url(&self, scheme: CarrierScheme, value: &str) -> String {
        let path = match scheme {
            CarrierScheme::Dot => format!("carriers/{value}"),
            CarrierScheme::Mc => format!("carriers/docket-number/{value}"),
        };
        format!("{}/{path}?webKey={}", self.base_url, self.web_key.expose_secret())
    }
}

#[async_trait]
impl CarrierRegistry for FmcsaRegistry {
    async fn lookup(
        &self,
        scheme: CarrierScheme,
        value: &str,
    ) -> Result<Option<CarrierRecord>, RegistryError> {
        let response = self
            .client
            .get(self.lookup_url(scheme, value))
            .send()
            .await
            .map_err(|error| RegistryError::Network(error.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(RegistryError::Status { status: status.as_u16() });
        }

        let payload: CarrierSearchResponse =
            response.json().await.map_err(|error| RegistryError::Decode(error.to_string()))?;

        Ok(payload.content.into_iter().next().map(record_from_envelope))
    }
}

fn record_from_envelope(envelope: CarrierEnvelope) -> CarrierRecord {
    let carrier = envelope.carrier.unwrap_or_default();

    let address_parts: Vec<String> = [
        carrier.phy_street.clone(),
        carrier.phy_city.clone(),
        carrier.phy_state.clone(),
        carrier.phy_zipcode.clone(),
    ]
    .into_iter()
    .flatten()
    .map(|part| part.trim().to_string())
    .filter(|part| !part.is_empty())
    .collect();

    CarrierRecord {
        legal_name: carrier.legal_name,
        dba_name: carrier.dba_name,
        safety_rating: carrier.safety_rating,
        operating_authority: carrier.allowed_to_operate,
        physical_address: if address_parts.is_empty() {
            None
        } else {
            Some(address_parts.join(", "))
        },
    }
}

#[cfg(test)]
mod tests {
    use haulbot_core::config::RegistryConfig;
    use haulbot_core::{CarrierRegistry, CarrierScheme, RegistryError};

    use super::{CarrierSearchResponse, FmcsaRegistry};

    fn registry() -> FmcsaRegistry {
        FmcsaRegistry::new(&RegistryConfig {
            base_url: "https://mobile.fmcsa.dot.gov/qc/services/".to_string(),
            web_key: String::from("test-key").into(),
            timeout_secs: 5,
        })
        .expect("client should build")
    }

    #[test]
    fn lookup_urls_follow_the_qcmobile_paths() {
        let registry = registry();

        assert_eq!(
            registry.lookup_url(CarrierScheme::Dot, "654321"),
            "https://mobile.fmcsa.dot.gov/qc/services/carriers/654321?webKey=test-key"
        );
        assert_eq!(
            registry.lookup_url(CarrierScheme::Mc, "123456"),
            "https://mobile.fmcsa.dot.gov/qc/services/carriers/docket-number/123456?webKey=test-key"
        );
    }

    #[test]
    fn payload_with_carrier_content_decodes_into_a_record() {
        let payload: CarrierSearchResponse = serde_json::from_str(
            r#"{
                "content": [{
                    "carrier": {
                        "legalName": "ACME FREIGHT LLC",
                        "dbaName": "ACME",
                        "safetyRating": "S",
                        "allowedToOperate": "Y",
                        "phyStreet": "12 DOCK RD",
                        "phyCity": "CHICAGO",
                        "phyState": "IL",
                        "phyZipcode": "60601"
                    }
                }]
            }"#,
        )
        .expect("payload should decode");

        let record = super::record_from_envelope(
            payload.content.into_iter().next().expect("one envelope"),
        );
        assert_eq!(record.display_name(), "ACME FREIGHT LLC");
        assert_eq!(record.safety_rating.as_deref(), Some("S"));
        assert_eq!(record.operating_authority.as_deref(), Some("Y"));
        assert_eq!(
            record.physical_address.as_deref(),
            Some("12 DOCK RD, CHICAGO, IL, 60601")
        );
    }

    #[test]
    fn empty_content_decodes_as_not_found() {
        let payload: CarrierSearchResponse =
            serde_json::from_str(r#"{"content": []}"#).expect("payload should decode");
        assert!(payload.content.is_empty());

        let payload: CarrierSearchResponse =
            serde_json::from_str(r#"{}"#).expect("missing content should default");
        assert!(payload.content.is_empty());
    }

    #[tokio::test]
    async fn unreachable_registry_is_a_network_error() {
        let registry = FmcsaRegistry::new(&haulbot_core::config::RegistryConfig {
            base_url: "http://127.0.0.1:1".to_string(),
            web_key: String::from("test-key").into(),
            timeout_secs: 1,
        })
        .expect("client should build");

        let error = registry
            .lookup(CarrierScheme::Dot, "654321")
            .await
            .expect_err("connection should fail");
        assert!(matches!(error, RegistryError::Network(_)));
    }
}
