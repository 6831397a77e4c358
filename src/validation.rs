// Copyright (c) 2025, The Ruskit Authors
// MIT License
// All rights reserved.

//! # Validation Rules
//!
//! Pure rule functions and the structured report they feed. Each config type
//! runs its own rules and returns a [`ValidationErrors`] keyed by field name;
//! reports from nested entities are recorded under the key of the owning entry.

use std::{collections::BTreeMap, fmt, net::IpAddr};
use thiserror::Error;

pub(crate) const MSG_REQUIRED: &str = "cannot be blank";
pub(crate) const MSG_HOST: &str = "must be a valid IP address or DNS name";
pub(crate) const MSG_PORT: &str = "must be a valid port number";
pub(crate) const MSG_IN: &str = "must be a valid value";

const DNS_NAME_MAX_LEN: usize = 255;
const DNS_LABEL_MAX_LEN: usize = 63;

/// A single failed field: either a rule message or the report of a nested entity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldError {
    Invalid(String),
    Nested(ValidationErrors),
}

impl fmt::Display for FieldError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldError::Invalid(msg) => f.write_str(msg),
            FieldError::Nested(errs) => write!(f, "({})", render(&errs.fields)),
        }
    }
}

/// Structured validation report, keyed by field or entry name.
#[derive(Error, Debug, Clone, Default, PartialEq, Eq)]
#[error("{}", render(.fields))]
pub struct ValidationErrors {
    fields: BTreeMap<String, FieldError>,
}

impl ValidationErrors {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records `msg` under `key` when a rule produced one.
    pub fn check(&mut self, key: &str, msg: Option<String>) {
        if let Some(msg) = msg {
            self.fields.insert(key.to_owned(), FieldError::Invalid(msg));
        }
    }

    /// Records a nested report under `key` when the nested entity failed.
    pub fn nest(&mut self, key: &str, res: Result<(), ValidationErrors>) {
        if let Err(errs) = res {
            self.fields.insert(key.to_owned(), FieldError::Nested(errs));
        }
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.fields.contains_key(key)
    }

    pub fn get(&self, key: &str) -> Option<&FieldError> {
        self.fields.get(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn into_result(self) -> Result<(), ValidationErrors> {
        if self.is_empty() {
            return Ok(());
        }
        Err(self)
    }
}

fn render(fields: &BTreeMap<String, FieldError>) -> String {
    let mut out = fields
        .iter()
        .map(|(key, err)| format!("{}: {}", key, err))
        .collect::<Vec<_>>()
        .join("; ");
    if !out.is_empty() {
        out.push('.');
    }
    out
}

/// Rejects the empty string only; whitespace counts as a value.
pub fn required(value: &str) -> Option<String> {
    if value.is_empty() {
        return Some(MSG_REQUIRED.to_owned());
    }
    None
}

/// Accepts an IP address or a DNS name. Empty values are left to [`required`].
pub fn is_host(value: &str) -> Option<String> {
    if value.is_empty() || value.parse::<IpAddr>().is_ok() || is_dns_name(value) {
        return None;
    }
    Some(MSG_HOST.to_owned())
}

/// Accepts a decimal integer in `1..=65535`. Empty values are left to [`required`].
pub fn is_port(value: &str) -> Option<String> {
    if value.is_empty() {
        return None;
    }
    match value.parse::<u32>() {
        Ok(port) if (1..=65535).contains(&port) => None,
        _ => Some(MSG_PORT.to_owned()),
    }
}

pub fn one_of(value: &str, allowed: &[&str]) -> Option<String> {
    if allowed.contains(&value) {
        return None;
    }
    Some(MSG_IN.to_owned())
}

fn is_dns_name(value: &str) -> bool {
    if value.replace('.', "").len() > DNS_NAME_MAX_LEN {
        return false;
    }

    let trimmed = value
        .strip_suffix('.')
        .or_else(|| value.strip_suffix('_'))
        .unwrap_or(value);
    if trimmed.is_empty() {
        return false;
    }

    trimmed.split('.').all(|label| {
        let mut chars = label.chars();
        match chars.next() {
            Some(first) if first.is_ascii_alphanumeric() || first == '_' => {}
            _ => return false,
        }
        label.len() <= DNS_LABEL_MAX_LEN
            && chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn host_rule() {
        assert_eq!(is_host("localhost"), None);
        assert_eq!(is_host("rabbitmq.internal.example.com"), None);
        assert_eq!(is_host("127.0.0.1"), None);
        assert_eq!(is_host("::1"), None);
        assert_eq!(is_host("broker."), None);

        assert_eq!(is_host("test@gmail.com"), Some(MSG_HOST.to_owned()));
        assert_eq!(is_host("@@1234"), Some(MSG_HOST.to_owned()));
        assert_eq!(is_host("-broker"), Some(MSG_HOST.to_owned()));
        assert_eq!(is_host("a..b"), Some(MSG_HOST.to_owned()));
        assert_eq!(is_host(&"a".repeat(64)), Some(MSG_HOST.to_owned()));
    }

    #[test]
    fn port_rule() {
        assert_eq!(is_port("5672"), None);
        assert_eq!(is_port("65535"), None);

        assert_eq!(is_port("0"), Some(MSG_PORT.to_owned()));
        assert_eq!(is_port("65536"), Some(MSG_PORT.to_owned()));
        assert_eq!(is_port("999999999"), Some(MSG_PORT.to_owned()));
        assert_eq!(is_port("test"), Some(MSG_PORT.to_owned()));
        assert_eq!(is_port("-1"), Some(MSG_PORT.to_owned()));
    }

    #[test]
    fn required_rule() {
        assert_eq!(required("guest"), None);
        assert_eq!(required(""), Some(MSG_REQUIRED.to_owned()));
        assert_eq!(required("   "), None);
    }

    #[test]
    fn report_renders_nested_entries() {
        let mut inner = ValidationErrors::new();
        inner.check("type", one_of("invalid", &["direct"]));

        let mut errs = ValidationErrors::new();
        errs.check("Username", required(""));
        errs.nest("orders", inner.into_result());

        assert_eq!(errs.len(), 2);
        assert_eq!(
            errs.to_string(),
            "Username: cannot be blank; orders: (type: must be a valid value.)."
        );
    }

    #[test]
    fn empty_report_is_ok() {
        let mut errs = ValidationErrors::new();
        errs.check("Host", is_host("localhost"));
        errs.nest("orders", Ok(()));
        assert!(errs.into_result().is_ok());
    }
}
