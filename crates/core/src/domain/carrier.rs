use serde::{Deserialize, Serialize};
use thiserror::Error;

/// The two carrier-numbering schemes the FMCSA registry answers for.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CarrierScheme {
    /// USDOT number, the primary lookup.
    Dot,
    /// MC docket number, tried when the DOT lookup reports not-found.
    Mc,
}

impl CarrierScheme {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Dot => "DOT",
            Self::Mc => "MC",
        }
    }
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum IdentityParseError {
    #[error("expected a scheme and a value, e.g. `MC 123456` or `DOT 654321`")]
    WrongTokenCount,
    #[error("unknown carrier numbering scheme `{0}`")]
    UnknownScheme(String),
}

/// A carrier identifier as typed by the user, e.g. `MC 123456`.
///
/// Parsing happens before any registry call so malformed input never leaves
/// the process.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CarrierNumber {
    pub scheme: CarrierScheme,
    pub value: String,
}

impl CarrierNumber {
    pub fn parse(raw: &str) -> Result<Self, IdentityParseError> {
        let mut tokens = raw.split_whitespace();
        let (Some(scheme_token), Some(value), None) = (tokens.next(), tokens.next(), tokens.next())
        else {
            return Err(IdentityParseError::WrongTokenCount);
        };

        let scheme = match scheme_token.to_ascii_uppercase().as_str() {
            "DOT" | "USDOT" => CarrierScheme::Dot,
            "MC" => CarrierScheme::Mc,
            other => return Err(IdentityParseError::UnknownScheme(other.to_string())),
        };

        Ok(Self { scheme, value: value.to_string() })
    }
}

/// Registry result for a verified carrier. Read-only: displayed or stored
/// as-is, never mutated by this crate.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CarrierRecord {
    pub legal_name: Option<String>,
    pub dba_name: Option<String>,
    pub safety_rating: Option<String>,
    pub operating_authority: Option<String>,
    pub physical_address: Option<String>,
}

impl CarrierRecord {
    pub fn display_name(&self) -> &str {
        self.legal_name
            .as_deref()
            .filter(|name| !name.trim().is_empty())
            .or(self.dba_name.as_deref().filter(|name| !name.trim().is_empty()))
            .unwrap_or("Unknown Company")
    }

    pub fn safety_rating_display(&self) -> &str {
        self.safety_rating
            .as_deref()
            .filter(|rating| !rating.trim().is_empty())
            .unwrap_or("No safety rating available")
    }
}

#[cfg(test)]
mod tests {
    use super::{CarrierNumber, CarrierRecord, CarrierScheme, IdentityParseError};

    #[test]
    fn parses_both_schemes_case_insensitively() {
        let number = CarrierNumber::parse("mc 123456").expect("mc should parse");
        assert_eq!(number.scheme, CarrierScheme::Mc);
        assert_eq!(number.value, "123456");

        let number = CarrierNumber::parse("DOT 654321").expect("dot should parse");
        assert_eq!(number.scheme, CarrierScheme::Dot);
    }

    #[test]
    fn missing_value_token_is_malformed() {
        assert_eq!(CarrierNumber::parse("MC"), Err(IdentityParseError::WrongTokenCount));
    }

    #[test]
    fn extra_tokens_are_malformed() {
        assert_eq!(CarrierNumber::parse("MC 123 456"), Err(IdentityParseError::WrongTokenCount));
    }

    #[test]
    fn unknown_scheme_is_rejected_without_lookup() {
        assert_eq!(
            CarrierNumber::parse("EIN 123456"),
            Err(IdentityParseError::UnknownScheme("EIN".to_string()))
        );
    }

    #[test]
    fn display_name_prefers_legal_name_then_dba() {
        let record = CarrierRecord {
            legal_name: Some("ACME FREIGHT LLC".to_string()),
            dba_name: Some("ACME".to_string()),
            ..CarrierRecord::default()
        };
        assert_eq!(record.display_name(), "ACME FREIGHT LLC");

        let record = CarrierRecord {
            legal_name: Some("   ".to_string()),
            dba_name: Some("ACME".to_string()),
            ..CarrierRecord::default()
        };
        assert_eq!(record.display_name(), "ACME");

        assert_eq!(CarrierRecord::default().display_name(), "Unknown Company");
    }

    #[test]
    fn safety_rating_falls_back_to_placeholder() {
        assert_eq!(CarrierRecord::default().safety_rating_display(), "No safety rating available");
    }
}
