//! Shape checks applied to raw registry payloads before they are trusted.
//!
//! A payload that is absent altogether (null, `{}`, no `payers` list) means
//! the call went through but produced nothing usable and is reported as
//! [`Error::UnexpectedState`]. A payload that is present but wrong is
//! [`Error::ResponseValidation`] with every offending field listed. Fields
//! not checked here are carried into `extra` untouched.

use crate::error::{Error, Result};
use crate::registry::types::{Reliability, StatusResult, VerificationResult};
use serde_json::{Map, Value};

/// Optional string fields of a verification payload.
const VERIFICATION_TEXT_FIELDS: [&str; 12] = [
    "name",
    "traderName",
    "address",
    "traderAddress",
    "requestDate",
    "requestIdentifier",
    "traderNameMatch",
    "traderAddressMatch",
    "traderCompanyTypeMatch",
    "traderStreetMatch",
    "traderPostalCodeMatch",
    "traderCityMatch",
];

/// Optional string fields of a payer record.
const PAYER_TEXT_FIELDS: [&str; 2] = ["unreliableSince", "taxOffice"];

/// Validate a business registry payload.
///
/// # Errors
///
/// - [`Error::UnexpectedState`] if the payload section is missing
/// - [`Error::ResponseValidation`] if any checked field has the wrong type
pub fn validate_verification(payload: Value) -> Result<VerificationResult> {
    let Some(object) = non_empty_object(&payload) else {
        return Err(Error::UnexpectedState(
            "registry returned no verification payload".to_string(),
        ));
    };

    let mut problems = Vec::new();
    match object.get("valid") {
        Some(Value::Bool(_)) => {}
        Some(other) => problems.push(format!("valid: expected boolean, got {}", kind(other))),
        None => problems.push("valid: missing".to_string()),
    }
    check_text_fields(object, &VERIFICATION_TEXT_FIELDS, "", &mut problems);
    if object.contains_key("name") && object.contains_key("traderName") {
        problems.push("name: given twice (name and traderName)".to_string());
    }
    if object.contains_key("address") && object.contains_key("traderAddress") {
        problems.push("address: given twice (address and traderAddress)".to_string());
    }
    fail_on(problems)?;

    serde_json::from_value(payload).map_err(|e| Error::ResponseValidation {
        details: e.to_string(),
    })
}

/// Validate a reliability registry payload for `local_id`.
///
/// The envelope carries `status.code` (zero on success) and a `payers` list.
/// A list with no record for `local_id` means the registry does not know the
/// identifier; records for other identifiers are never returned.
///
/// # Errors
///
/// - [`Error::RemoteFault`] if the status code is non-zero
/// - [`Error::UnexpectedState`] if the payload or the `payers` list is missing
/// - [`Error::ResponseValidation`] if any checked field has the wrong type
pub fn validate_status(local_id: &str, payload: Value) -> Result<StatusResult> {
    let Some(object) = non_empty_object(&payload) else {
        return Err(Error::UnexpectedState(
            "registry returned no status payload".to_string(),
        ));
    };

    check_status_code(object)?;

    let payers = match object.get("payers") {
        Some(Value::Array(payers)) => payers,
        Some(Value::Null) | None => {
            return Err(Error::UnexpectedState(
                "status payload has no payers list".to_string(),
            ))
        }
        Some(other) => {
            return Err(Error::ResponseValidation {
                details: format!("payers: expected array, got {}", kind(other)),
            })
        }
    };

    let mut problems = Vec::new();
    for (index, payer) in payers.iter().enumerate() {
        match payer.get("localId") {
            Some(Value::String(_)) => {}
            _ if !payer.is_object() => problems.push(format!(
                "payers[{index}]: expected object, got {}",
                kind(payer)
            )),
            Some(other) => problems.push(format!(
                "payers[{index}].localId: expected string, got {}",
                kind(other)
            )),
            None => problems.push(format!("payers[{index}].localId: missing")),
        }
    }
    fail_on(problems)?;

    // Only the record for the requested identifier answers the lookup.
    let record = payers
        .iter()
        .filter_map(Value::as_object)
        .find(|record| record.get("localId").and_then(Value::as_str) == Some(local_id));
    let Some(record) = record else {
        return Ok(StatusResult {
            local_id: local_id.to_string(),
            reliability: Reliability::NotFound,
            unreliable_since: None,
            tax_office: None,
            bank_accounts: Vec::new(),
            extra: Map::new(),
        });
    };

    let mut problems = Vec::new();
    match record.get("reliability") {
        Some(Value::String(s)) if parse_reliability(s).is_some() => {}
        Some(Value::String(s)) => problems.push(format!("reliability: unknown value {s:?}")),
        Some(other) => problems.push(format!("reliability: expected string, got {}", kind(other))),
        None => problems.push("reliability: missing".to_string()),
    }
    check_text_fields(record, &PAYER_TEXT_FIELDS, "", &mut problems);
    check_bank_accounts(record, &mut problems);
    fail_on(problems)?;

    serde_json::from_value(Value::Object(record.clone())).map_err(|e| Error::ResponseValidation {
        details: e.to_string(),
    })
}

fn check_status_code(object: &Map<String, Value>) -> Result<()> {
    let Some(status) = object.get("status") else {
        return Ok(());
    };
    let code = status.get("code").and_then(Value::as_i64).unwrap_or(0);
    if code == 0 {
        return Ok(());
    }
    let text = status
        .get("text")
        .and_then(Value::as_str)
        .unwrap_or("registry reported an error");
    Err(Error::RemoteFault {
        message: format!("{text} (status {code})"),
    })
}

fn check_bank_accounts(record: &Map<String, Value>, problems: &mut Vec<String>) {
    let accounts = match record.get("bankAccounts") {
        None | Some(Value::Null) => return,
        Some(Value::Array(accounts)) => accounts,
        Some(other) => {
            problems.push(format!("bankAccounts: expected array, got {}", kind(other)));
            return;
        }
    };

    for (index, account) in accounts.iter().enumerate() {
        let prefix = format!("bankAccounts[{index}].");
        let Value::Object(account) = account else {
            problems.push(format!("bankAccounts[{index}]: expected object, got {}", kind(account)));
            continue;
        };
        match account.get("number") {
            Some(Value::String(_)) => {}
            Some(other) => problems.push(format!("{prefix}number: expected string, got {}", kind(other))),
            None => problems.push(format!("{prefix}number: missing")),
        }
        check_text_fields(account, &["bankCode", "publishedSince"], &prefix, problems);
    }
}

fn check_text_fields(
    object: &Map<String, Value>,
    fields: &[&str],
    prefix: &str,
    problems: &mut Vec<String>,
) {
    for field in fields {
        match object.get(*field) {
            None | Some(Value::Null | Value::String(_)) => {}
            Some(other) => problems.push(format!(
                "{prefix}{field}: expected string or null, got {}",
                kind(other)
            )),
        }
    }
}

fn fail_on(problems: Vec<String>) -> Result<()> {
    if problems.is_empty() {
        Ok(())
    } else {
        Err(Error::ResponseValidation {
            details: problems.join("; "),
        })
    }
}

fn non_empty_object(payload: &Value) -> Option<&Map<String, Value>> {
    match payload {
        Value::Object(map) if !map.is_empty() => Some(map),
        _ => None,
    }
}

fn parse_reliability(value: &str) -> Option<Reliability> {
    serde_json::from_value(Value::String(value.to_string())).ok()
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
