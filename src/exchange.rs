// Copyright (c) 2025, The Ruskit Authors
// MIT License
// All rights reserved.

//! # Exchange Configuration
//!
//! This module provides the exchange section of the store configuration.
//! Exchanges are the routing mechanism in RabbitMQ that determine how messages are
//! distributed to queues. Besides the standard kinds, the delayed message exchange
//! plugin is supported, which needs a second, base kind to route once the delay
//! has elapsed.

use crate::{
    args::Arguments,
    errors::AmqpError,
    queue::QueueConfig,
    validation::{one_of, ValidationErrors},
};
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

/// Type name of the delayed message exchange provided by the broker plugin
pub const EXCHANGE_DELAYED: &str = "x-delayed-message";

/// Argument holding the base exchange type of a delayed exchange
pub const AMQP_HEADERS_DELAYED_EXCHANGE_TYPE: &str = "x-delayed-type";

/// Exchange types accepted by the configuration.
pub const EXCHANGE_TYPES: [&str; 4] = ["fanout", "direct", "topic", EXCHANGE_DELAYED];

/// Exchange types a delayed exchange may route with.
pub const BASE_EXCHANGE_TYPES: [&str; 3] = ["fanout", "direct", "topic"];

/// Represents the types of exchanges the store can declare.
///
/// - Direct: Routes messages to queues based on an exact match of routing keys
/// - Fanout: Broadcasts messages to all bound queues regardless of routing keys
/// - Topic: Routes messages based on wildcard pattern matching of routing keys
/// - XMessageDelayed: Extension for delayed message delivery (plugin required)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ExchangeKind {
    #[default]
    Direct,
    Fanout,
    Topic,
    XMessageDelayed,
}

impl ExchangeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExchangeKind::Direct => "direct",
            ExchangeKind::Fanout => "fanout",
            ExchangeKind::Topic => "topic",
            ExchangeKind::XMessageDelayed => EXCHANGE_DELAYED,
        }
    }
}

impl fmt::Display for ExchangeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ExchangeKind {
    type Err = AmqpError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "direct" => Ok(ExchangeKind::Direct),
            "fanout" => Ok(ExchangeKind::Fanout),
            "topic" => Ok(ExchangeKind::Topic),
            EXCHANGE_DELAYED => Ok(ExchangeKind::XMessageDelayed),
            other => Err(AmqpError::InvalidExchangeKind(other.to_owned())),
        }
    }
}

impl From<ExchangeKind> for lapin::ExchangeKind {
    /// The delayed kind is declared as a custom exchange type, which requires
    /// the delayed message exchange plugin on the broker.
    fn from(kind: ExchangeKind) -> lapin::ExchangeKind {
        match kind {
            ExchangeKind::Direct => lapin::ExchangeKind::Direct,
            ExchangeKind::Fanout => lapin::ExchangeKind::Fanout,
            ExchangeKind::Topic => lapin::ExchangeKind::Topic,
            ExchangeKind::XMessageDelayed => {
                lapin::ExchangeKind::Custom(EXCHANGE_DELAYED.to_owned())
            }
        }
    }
}

/// Exchange section of a publish or consume entry.
///
/// The type is kept as written in the configuration so an unknown value can be
/// reported by [`ExchangeConfig::validate`] instead of failing deserialization.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExchangeConfig {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub durable: bool,
    pub auto_delete: bool,
    pub internal: bool,
    pub no_wait: bool,
    pub routing_key: String,
    pub args: Arguments,
    pub queue: QueueConfig,
}

impl ExchangeConfig {
    pub fn new(name: &str, kind: ExchangeKind) -> Self {
        ExchangeConfig {
            name: name.to_owned(),
            kind: kind.as_str().to_owned(),
            ..Default::default()
        }
    }

    /// Parses the configured type.
    pub fn kind(&self) -> Result<ExchangeKind, AmqpError> {
        self.kind.parse()
    }

    /// Checks the exchange type and, for delayed exchanges, the base type
    /// carried in the `x-delayed-type` argument.
    ///
    /// Both a missing and an invalid base type are reported under `"args"`.
    pub fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errs = ValidationErrors::new();
        errs.check("type", one_of(&self.kind, &EXCHANGE_TYPES));
        if !errs.is_empty() {
            return Err(errs);
        }

        if self.kind == EXCHANGE_DELAYED {
            errs.check("args", self.delayed_type_error());
        }

        errs.into_result()
    }

    fn delayed_type_error(&self) -> Option<String> {
        let Some(value) = self.args.get(AMQP_HEADERS_DELAYED_EXCHANGE_TYPE) else {
            return Some(format!(
                "exchange '{}' with type [{}] must contain '{}' argument",
                self.name, EXCHANGE_DELAYED, AMQP_HEADERS_DELAYED_EXCHANGE_TYPE
            ));
        };

        match value.as_str() {
            Some(base) if BASE_EXCHANGE_TYPES.contains(&base) => None,
            Some(base) => Some(format!(
                "invalid type [{}] for {} argument",
                base, AMQP_HEADERS_DELAYED_EXCHANGE_TYPE
            )),
            None => Some(format!(
                "invalid type [{}] for {} argument",
                value, AMQP_HEADERS_DELAYED_EXCHANGE_TYPE
            )),
        }
    }

    /// Sets the delayed kind together with its base routing kind.
    pub fn delayed(mut self, base: ExchangeKind) -> Self {
        self.kind = EXCHANGE_DELAYED.to_owned();
        self.args.insert(
            AMQP_HEADERS_DELAYED_EXCHANGE_TYPE.to_owned(),
            serde_json::Value::String(base.as_str().to_owned()),
        );
        self
    }

    pub fn routing_key(mut self, key: &str) -> Self {
        self.routing_key = key.to_owned();
        self
    }

    pub fn durable(mut self) -> Self {
        self.durable = true;
        self
    }

    pub fn queue(mut self, queue: QueueConfig) -> Self {
        self.queue = queue;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validation::FieldError;
    use serde_json::json;

    fn exchange(kind: &str, args: Option<(&str, serde_json::Value)>) -> ExchangeConfig {
        let mut exch = ExchangeConfig {
            name: "orders".to_owned(),
            kind: kind.to_owned(),
            ..Default::default()
        };
        if let Some((key, value)) = args {
            exch.args.insert(key.to_owned(), value);
        }
        exch
    }

    #[test]
    fn validate_accepts_base_kinds() {
        for kind in BASE_EXCHANGE_TYPES {
            assert!(exchange(kind, None).validate().is_ok(), "{}", kind);
        }
    }

    #[test]
    fn validate_rejects_unknown_kind() {
        for kind in ["test", "headers", ""] {
            let errs = exchange(kind, None).validate().unwrap_err();
            assert!(errs.contains_key("type"), "{}", kind);
            assert!(!errs.contains_key("args"));
        }
    }

    #[test]
    fn validate_delayed_with_base_kind() {
        for base in BASE_EXCHANGE_TYPES {
            let exch = exchange(EXCHANGE_DELAYED, Some(("x-delayed-type", json!(base))));
            assert!(exch.validate().is_ok(), "{}", base);
        }
    }

    #[test]
    fn validate_delayed_without_base_kind() {
        let errs = exchange(EXCHANGE_DELAYED, None).validate().unwrap_err();
        assert_eq!(
            errs.get("args"),
            Some(&FieldError::Invalid(
                "exchange 'orders' with type [x-delayed-message] must contain 'x-delayed-type' argument"
                    .to_owned()
            ))
        );
    }

    #[test]
    fn validate_delayed_with_invalid_base_kind() {
        let errs = exchange(EXCHANGE_DELAYED, Some(("x-delayed-type", json!("test"))))
            .validate()
            .unwrap_err();
        assert_eq!(
            errs.get("args"),
            Some(&FieldError::Invalid(
                "invalid type [test] for x-delayed-type argument".to_owned()
            ))
        );

        let errs = exchange(EXCHANGE_DELAYED, Some(("x-delayed-type", json!(EXCHANGE_DELAYED))))
            .validate()
            .unwrap_err();
        assert!(errs.contains_key("args"));

        let errs = exchange(EXCHANGE_DELAYED, Some(("x-delayed-type", json!(1))))
            .validate()
            .unwrap_err();
        assert!(errs.contains_key("args"));
    }

    #[test]
    fn delayed_builder_is_valid() {
        let exch = ExchangeConfig::new("orders", ExchangeKind::Topic).delayed(ExchangeKind::Fanout);
        assert_eq!(exch.kind(), Ok(ExchangeKind::XMessageDelayed));
        assert!(exch.validate().is_ok());
    }

    #[test]
    fn kind_round_trips_through_strings() {
        for kind in EXCHANGE_TYPES {
            assert_eq!(kind.parse::<ExchangeKind>().map(|k| k.as_str()), Ok(kind));
        }
        assert_eq!(
            "headers".parse::<ExchangeKind>(),
            Err(AmqpError::InvalidExchangeKind("headers".to_owned()))
        );
    }

    #[test]
    fn deserializes_type_field() {
        let exch: ExchangeConfig = serde_json::from_value(json!({
            "name": "orders",
            "type": "x-delayed-message",
            "auto_delete": true,
            "routing_key": "orders.created",
            "args": {"x-delayed-type": "topic"},
            "queue": {"name": "orders-queue", "durable": true}
        }))
        .unwrap();

        assert_eq!(exch.kind, EXCHANGE_DELAYED);
        assert!(exch.auto_delete);
        assert_eq!(exch.routing_key, "orders.created");
        assert_eq!(exch.queue.name, "orders-queue");
        assert!(exch.queue.durable);
        assert!(exch.validate().is_ok());
    }
}
