//! Schema-driven sanity checks for raw check records

use chrono::{DateTime, TimeZone, Utc};
use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeSet;

use super::models::{CheckDefinition, CheckState, HttpMethod, Protocol};
use crate::config::CheckConfig;

lazy_static! {
    static ref TOKEN_REGEX: Regex = Regex::new(r"^[a-zA-Z0-9]+$").unwrap();
    static ref PHONE_REGEX: Regex = Regex::new(r"^[0-9]+$").unwrap();
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldViolation {
    pub field: String,
    pub expected: String,
    pub reason: String,
}

/// Every field that failed validation for one record.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ValidationReport {
    pub check_id: Option<String>,
    pub violations: Vec<FieldViolation>,
}

impl ValidationReport {
    pub fn is_empty(&self) -> bool {
        self.violations.is_empty()
    }

    pub fn fields(&self) -> Vec<&str> {
        self.violations.iter().map(|v| v.field.as_str()).collect()
    }

    pub fn add(&mut self, field: &str, expected: &str, reason: impl Into<String>) {
        self.violations.push(FieldViolation {
            field: field.to_string(),
            expected: expected.to_string(),
            reason: reason.into(),
        });
    }
}

impl std::fmt::Display for ValidationReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let id = self.check_id.as_deref().unwrap_or("<unknown>");
        write!(f, "check {} has invalid data in: ", id)?;
        let parts: Vec<String> = self
            .violations
            .iter()
            .map(|v| format!("{} ({})", v.field, v.reason))
            .collect();
        write!(f, "{}", parts.join(", "))
    }
}

/// Values parsed so far; a slot stays empty when its field failed.
#[derive(Default)]
struct ParsedFields {
    id: Option<String>,
    phone: Option<String>,
    protocol: Option<Protocol>,
    url: Option<String>,
    method: Option<HttpMethod>,
    success_codes: Option<BTreeSet<u16>>,
    timeout_seconds: Option<u64>,
}

type FieldParser = fn(Option<&Value>, &CheckValidator, &mut ParsedFields) -> Result<(), String>;

struct FieldRule {
    field: &'static str,
    expected: &'static str,
    parse: FieldParser,
}

static CHECK_SCHEMA: &[FieldRule] = &[
    FieldRule {
        field: "id",
        expected: "alphanumeric token of the configured length",
        parse: |v, validator, parsed| {
            parsed.id = Some(validator.parse_id(v)?);
            Ok(())
        },
    },
    FieldRule {
        field: "phone",
        expected: "digit string of the configured length",
        parse: |v, validator, parsed| {
            parsed.phone = Some(validator.parse_phone(v)?);
            Ok(())
        },
    },
    FieldRule {
        field: "protocol",
        expected: "one of: http, https",
        parse: |v, _, parsed| {
            parsed.protocol = Some(parse_protocol(v)?);
            Ok(())
        },
    },
    FieldRule {
        field: "url",
        expected: "non-empty host and path without a scheme",
        parse: |v, _, parsed| {
            parsed.url = Some(parse_url(v)?);
            Ok(())
        },
    },
    FieldRule {
        field: "method",
        expected: "one of: get, post, put, delete, head",
        parse: |v, _, parsed| {
            parsed.method = Some(parse_method(v)?);
            Ok(())
        },
    },
    FieldRule {
        field: "successCodes",
        expected: "non-empty array of HTTP status codes",
        parse: |v, _, parsed| {
            parsed.success_codes = Some(parse_success_codes(v)?);
            Ok(())
        },
    },
    FieldRule {
        field: "timeoutSeconds",
        expected: "whole number of seconds, at least 1",
        parse: |v, _, parsed| {
            parsed.timeout_seconds = Some(parse_timeout(v)?);
            Ok(())
        },
    },
];

#[derive(Debug, Clone)]
pub struct CheckValidator {
    token_length: usize,
    phone_length: usize,
}

impl Default for CheckValidator {
    fn default() -> Self {
        Self::from_config(&CheckConfig::default())
    }
}

impl CheckValidator {
    pub fn new(token_length: usize, phone_length: usize) -> Self {
        Self {
            token_length,
            phone_length,
        }
    }

    pub fn from_config(config: &CheckConfig) -> Self {
        Self::new(config.token_length, config.phone_length)
    }

    /// Validates a raw record, reporting every bad field at once.
    pub fn validate(&self, raw: &Value) -> Result<CheckDefinition, ValidationReport> {
        let empty = Map::new();
        let fields = raw.as_object().unwrap_or(&empty);

        let mut report = ValidationReport {
            check_id: fields.get("id").and_then(Value::as_str).map(str::to_string),
            violations: Vec::new(),
        };

        if !raw.is_object() {
            report.add("record", "JSON object", "record is not an object");
        }

        let mut parsed = ParsedFields::default();
        for rule in CHECK_SCHEMA {
            if let Err(reason) = (rule.parse)(fields.get(rule.field), self, &mut parsed) {
                report.add(rule.field, rule.expected, reason);
            }
        }

        match parsed {
            ParsedFields {
                id: Some(id),
                phone: Some(phone),
                protocol: Some(protocol),
                url: Some(url),
                method: Some(method),
                success_codes: Some(success_codes),
                timeout_seconds: Some(timeout_seconds),
            } if report.is_empty() => Ok(CheckDefinition {
                id,
                phone,
                protocol,
                url,
                method,
                success_codes,
                timeout_seconds,
                state: parse_state(fields.get("state")),
                last_checked: parse_last_checked(fields.get("lastChecked")),
            }),
            _ => Err(report),
        }
    }

    fn parse_id(&self, value: Option<&Value>) -> Result<String, String> {
        let id = required_str(value)?;
        if id.len() != self.token_length {
            return Err(format!("expected {} characters, got {}", self.token_length, id.len()));
        }
        if !TOKEN_REGEX.is_match(id) {
            return Err("contains non-alphanumeric characters".to_string());
        }
        Ok(id.to_string())
    }

    fn parse_phone(&self, value: Option<&Value>) -> Result<String, String> {
        let phone = required_str(value)?.trim();
        if phone.len() != self.phone_length {
            return Err(format!("expected {} digits, got {}", self.phone_length, phone.len()));
        }
        if !PHONE_REGEX.is_match(phone) {
            return Err("contains non-digit characters".to_string());
        }
        Ok(phone.to_string())
    }
}

fn required_str(value: Option<&Value>) -> Result<&str, String> {
    match value {
        None | Some(Value::Null) => Err("missing".to_string()),
        Some(Value::String(s)) => Ok(s.as_str()),
        Some(other) => Err(format!("expected a string, got {}", type_name(other))),
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn parse_protocol(value: Option<&Value>) -> Result<Protocol, String> {
    match required_str(value)?.trim().to_ascii_lowercase().as_str() {
        "http" => Ok(Protocol::Http),
        "https" => Ok(Protocol::Https),
        other => Err(format!("unsupported protocol '{}'", other)),
    }
}

fn parse_url(value: Option<&Value>) -> Result<String, String> {
    let url = required_str(value)?.trim();
    if url.is_empty() {
        return Err("empty".to_string());
    }
    if url.contains("://") {
        return Err("must not include a scheme".to_string());
    }
    if url.chars().any(char::is_whitespace) {
        return Err("contains whitespace".to_string());
    }
    Ok(url.to_string())
}

fn parse_method(value: Option<&Value>) -> Result<HttpMethod, String> {
    match required_str(value)?.trim().to_ascii_lowercase().as_str() {
        "get" => Ok(HttpMethod::Get),
        "post" => Ok(HttpMethod::Post),
        "put" => Ok(HttpMethod::Put),
        "delete" => Ok(HttpMethod::Delete),
        "head" => Ok(HttpMethod::Head),
        other => Err(format!("unsupported method '{}'", other)),
    }
}

fn parse_success_codes(value: Option<&Value>) -> Result<BTreeSet<u16>, String> {
    let codes = match value {
        None | Some(Value::Null) => return Err("missing".to_string()),
        Some(Value::Array(codes)) => codes,
        Some(other) => return Err(format!("expected an array, got {}", type_name(other))),
    };
    if codes.is_empty() {
        return Err("empty".to_string());
    }

    codes
        .iter()
        .map(|code| {
            code.as_u64()
                .filter(|c| (100..=599).contains(c))
                .map(|c| c as u16)
                .ok_or_else(|| format!("{} is not an HTTP status code", code))
        })
        .collect()
}

fn parse_timeout(value: Option<&Value>) -> Result<u64, String> {
    let number = match value {
        None | Some(Value::Null) => return Err("missing".to_string()),
        Some(Value::Number(n)) => n,
        Some(other) => return Err(format!("expected a number, got {}", type_name(other))),
    };

    let seconds = match number.as_u64() {
        Some(s) => s,
        None => match number.as_f64() {
            Some(f) if f.fract() == 0.0 && f >= 1.0 => f as u64,
            _ => return Err(format!("{} is not a whole number of seconds", number)),
        },
    };

    if seconds < 1 {
        return Err(format!("{} is below the 1 second minimum", seconds));
    }
    Ok(seconds)
}

fn parse_state(value: Option<&Value>) -> CheckState {
    match value.and_then(Value::as_str) {
        Some("up") => CheckState::Up,
        _ => CheckState::Down,
    }
}

fn parse_last_checked(value: Option<&Value>) -> Option<DateTime<Utc>> {
    value
        .and_then(Value::as_i64)
        .filter(|millis| *millis > 0)
        .and_then(|millis| Utc.timestamp_millis_opt(millis).single())
}
