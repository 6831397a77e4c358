// Copyright (c) 2025, The Ruskit Authors
// MIT License
// All rights reserved.

//! # Outgoing Messages
//!
//! This module provides the message value handed to [`crate::store::Store::publish`]
//! and the property preparation applied right before publishing: the
//! OpenTelemetry context is injected into the headers and a message id is
//! assigned when the caller did not set one.

use crate::{errors::AmqpError, otel::RabbitMQTracePropagator};
use lapin::{
    types::{AMQPValue, FieldTable, ShortString},
    BasicProperties,
};
use opentelemetry::{global, Context};
use serde::Serialize;
use std::collections::BTreeMap;
use uuid::Uuid;

/// Default content type for JSON messages
pub const JSON_CONTENT_TYPE: &str = "application/json";

/// Body and metadata of a message to publish.
#[derive(Debug, Clone, Default)]
pub struct Publishing {
    pub body: Vec<u8>,
    pub properties: BasicProperties,
}

impl Publishing {
    pub fn new(body: impl Into<Vec<u8>>) -> Self {
        Publishing {
            body: body.into(),
            properties: BasicProperties::default(),
        }
    }

    /// Serializes `payload` as JSON and sets the matching content type.
    pub fn json<T: Serialize>(payload: &T) -> Result<Self, AmqpError> {
        let body = serde_json::to_vec(payload)
            .map_err(|err| AmqpError::SerializePayloadError(err.to_string()))?;

        Ok(Publishing::new(body)
            .with_properties(BasicProperties::default().with_content_type(JSON_CONTENT_TYPE.into())))
    }

    pub fn with_properties(mut self, properties: BasicProperties) -> Self {
        self.properties = properties;
        self
    }

    /// Returns the message with trace headers merged over the caller's headers
    /// and a message id assigned when missing.
    pub(crate) fn prepare(mut self, ctx: &Context) -> Self {
        let mut btree = match self.properties.headers() {
            Some(headers) => headers.inner().clone(),
            None => BTreeMap::<ShortString, AMQPValue>::default(),
        };

        global::get_text_map_propagator(|propagator| {
            propagator.inject_context(ctx, &mut RabbitMQTracePropagator::new(&mut btree))
        });

        let mut properties = self.properties.with_headers(FieldTable::from(btree));
        if properties.message_id().is_none() {
            properties = properties.with_message_id(ShortString::from(Uuid::new_v4().to_string()));
        }

        self.properties = properties;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lapin::types::LongString;

    #[test]
    fn prepare_assigns_message_id() {
        let msg = Publishing::new("payload").prepare(&Context::new());

        let id = msg.properties.message_id().clone().unwrap();
        assert!(Uuid::parse_str(id.as_str()).is_ok());
        assert_eq!(msg.body, b"payload".to_vec());
    }

    #[test]
    fn prepare_keeps_caller_metadata() {
        let mut headers = BTreeMap::new();
        headers.insert(
            ShortString::from("tenant"),
            AMQPValue::LongString(LongString::from("acme")),
        );

        let msg = Publishing::new(vec![1, 2, 3])
            .with_properties(
                BasicProperties::default()
                    .with_message_id(ShortString::from("msg-1"))
                    .with_headers(FieldTable::from(headers)),
            )
            .prepare(&Context::new());

        assert_eq!(
            msg.properties.message_id(),
            &Some(ShortString::from("msg-1"))
        );
        let headers = msg.properties.headers().clone().unwrap();
        assert_eq!(
            headers.inner().get("tenant"),
            Some(&AMQPValue::LongString(LongString::from("acme")))
        );
    }

    #[test]
    fn json_sets_content_type() {
        let msg = Publishing::json(&serde_json::json!({"ok": true})).unwrap();
        assert_eq!(msg.body, br#"{"ok":true}"#.to_vec());
        assert_eq!(
            msg.properties.content_type(),
            &Some(ShortString::from(JSON_CONTENT_TYPE))
        );
    }
}
