//! Typed results returned by the registries.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Outcome of a VAT identity check against the business registry.
///
/// Unknown provider fields are kept in `extra` so schema drift on the
/// provider side does not break parsing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerificationResult {
    /// Whether the identity is registered and active.
    pub valid: bool,
    /// Registered trader name.
    #[serde(default, alias = "traderName")]
    pub name: Option<String>,
    /// Registered trader address.
    #[serde(default, alias = "traderAddress")]
    pub address: Option<String>,
    /// Date the registry answered the request.
    #[serde(default)]
    pub request_date: Option<String>,
    /// Consultation number issued when a requester identity was supplied.
    #[serde(default)]
    pub request_identifier: Option<String>,
    /// Name match indicator.
    #[serde(default)]
    pub trader_name_match: Option<String>,
    /// Address match indicator.
    #[serde(default)]
    pub trader_address_match: Option<String>,
    /// Company type match indicator.
    #[serde(default)]
    pub trader_company_type_match: Option<String>,
    /// Street match indicator.
    #[serde(default)]
    pub trader_street_match: Option<String>,
    /// Postal code match indicator.
    #[serde(default)]
    pub trader_postal_code_match: Option<String>,
    /// City match indicator.
    #[serde(default)]
    pub trader_city_match: Option<String>,
    /// Provider fields this crate does not interpret.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl VerificationResult {
    /// A result carrying only the validity flag.
    #[must_use]
    pub fn with_validity(valid: bool) -> Self {
        Self {
            valid,
            name: None,
            address: None,
            request_date: None,
            request_identifier: None,
            trader_name_match: None,
            trader_address_match: None,
            trader_company_type_match: None,
            trader_street_match: None,
            trader_postal_code_match: None,
            trader_city_match: None,
            extra: Map::new(),
        }
    }
}

/// Reliability verdict for a taxpayer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Reliability {
    /// Not listed as unreliable.
    Reliable,
    /// Listed as an unreliable payer.
    Unreliable,
    /// The registry does not know the identifier.
    NotFound,
}

/// A bank account published for a taxpayer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BankAccount {
    /// Account number (domestic format or IBAN).
    pub number: String,
    /// Bank code for domestic-format numbers.
    #[serde(default)]
    pub bank_code: Option<String>,
    /// Date the account was published.
    #[serde(default)]
    pub published_since: Option<String>,
}

/// Outcome of a reliability status lookup.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusResult {
    /// Identifier the status applies to.
    pub local_id: String,
    /// Reliability verdict.
    pub reliability: Reliability,
    /// Date the payer was listed as unreliable.
    #[serde(default)]
    pub unreliable_since: Option<String>,
    /// Responsible tax office.
    #[serde(default)]
    pub tax_office: Option<String>,
    /// Published bank accounts.
    #[serde(default)]
    pub bank_accounts: Vec<BankAccount>,
    /// Provider fields this crate does not interpret.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl StatusResult {
    /// Whether the payer is currently listed as unreliable.
    #[must_use]
    pub fn is_unreliable(&self) -> bool {
        self.reliability == Reliability::Unreliable
    }
}
