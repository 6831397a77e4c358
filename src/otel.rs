// Copyright (c) 2025, The Ruskit Authors
// MIT License
// All rights reserved.

//! # OpenTelemetry Integration for the AMQP Store
//!
//! This module provides utilities for propagating trace context through RabbitMQ
//! message headers and for creating the consumer span of each delivery.

use lapin::{
    message::Delivery,
    types::{AMQPValue, ShortString},
};
use opentelemetry::{
    global::{self, BoxedSpan, BoxedTracer},
    propagation::{Extractor, Injector},
    trace::{SpanKind, Tracer},
    Context,
};
use std::{borrow::Cow, collections::BTreeMap};
use tracing::error;

/// Name of the tracer used by the consume loop
pub(crate) const CONSUMER_TRACER: &str = "amqp consumer";

/// Reads and writes trace context in the header table of an AMQP message.
///
/// Used as the `Injector` when a message is published and as the `Extractor`
/// when a delivery reaches the consume loop.
pub(crate) struct RabbitMQTracePropagator<'a> {
    headers: &'a mut BTreeMap<ShortString, AMQPValue>,
}

impl<'a> RabbitMQTracePropagator<'a> {
    /// Wraps a header table.
    ///
    /// # Parameters
    /// * `headers` - Message headers to read from or write into
    pub(crate) fn new(headers: &'a mut BTreeMap<ShortString, AMQPValue>) -> Self {
        Self { headers }
    }
}

impl Injector for RabbitMQTracePropagator<'_> {
    /// Stores `value` as a long string under the lowercased `key`.
    ///
    /// # Parameters
    /// * `key` - Propagation field name, such as `traceparent`
    /// * `value` - Encoded field value
    fn set(&mut self, key: &str, value: String) {
        self.headers.insert(
            key.to_lowercase().into(),
            AMQPValue::LongString(value.into()),
        );
    }
}

impl Extractor for RabbitMQTracePropagator<'_> {
    /// Looks up a propagation field.
    ///
    /// # Parameters
    /// * `key` - Lowercase propagation field name
    ///
    /// # Returns
    /// The value when the header exists and holds a UTF-8 long string
    fn get(&self, key: &str) -> Option<&str> {
        self.headers.get(key).and_then(|header_value| {
            if let AMQPValue::LongString(header_value) = header_value {
                std::str::from_utf8(header_value.as_bytes())
                    .map_err(|e| error!("Error decoding header value {:?}", e))
                    .ok()
            } else {
                None
            }
        })
    }

    /// Lists every header name, propagation fields or not.
    fn keys(&self) -> Vec<&str> {
        self.headers.keys().map(|header| header.as_str()).collect()
    }
}

/// Extracts the propagated context from the delivery headers and starts the
/// consumer span of the delivery.
///
/// # Parameters
/// * `delivery` - Delivery whose headers carry the producer's context
/// * `tracer` - Tracer that starts the span
///
/// # Returns
/// The extracted parent context and a `SpanKind::Consumer` span named
/// `<exchange> receive`, or `amqp default exchange` for the nameless exchange
pub(crate) fn new_span(delivery: &Delivery, tracer: &BoxedTracer) -> (Context, BoxedSpan) {
    let mut headers = delivery
        .properties
        .headers()
        .clone()
        .unwrap_or_default()
        .inner()
        .clone();

    let ctx = global::get_text_map_propagator(|propagator| {
        propagator.extract(&RabbitMQTracePropagator::new(&mut headers))
    });

    let name = match delivery.exchange.as_str() {
        "" => "amqp default exchange".to_owned(),
        exchange => format!("{} receive", exchange),
    };

    let span = tracer
        .span_builder(Cow::from(name))
        .with_kind(SpanKind::Consumer)
        .start_with_context(tracer, &ctx);

    (ctx, span)
}
