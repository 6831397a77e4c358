// Copyright (c) 2025, The Ruskit Authors
// MIT License
// All rights reserved.

//! # Error Types for the AMQP Store
//!
//! This module provides the error taxonomy for the store lifecycle and the
//! broker transport. Validation failures are reported separately through
//! [`crate::validation::ValidationErrors`].

use std::time::Duration;
use thiserror::Error;

/// Represents errors that can occur during AMQP/RabbitMQ operations.
///
/// `NotRunning` is the lifecycle sentinel: it is returned before any broker I/O
/// when the store is used outside of the running state. Every other variant
/// wraps a failure reported by the broker driver, carrying its message.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AmqpError {
    /// The store was used before `start` or after `shutdown`
    #[error("store: is not running")]
    NotRunning,

    /// The connection string could not be parsed
    #[error("invalid connection string: {0}")]
    InvalidDsn(String),

    /// Error establishing a connection to the RabbitMQ server
    #[error("failure to connect: {0}")]
    ConnectionError(String),

    /// The dial did not complete within the configured timeout
    #[error("failure to connect: timed out after {0:?}")]
    DialTimeout(Duration),

    /// Error creating a channel from an established connection
    #[error("failure to create a channel: {0}")]
    ChannelError(String),

    /// The exchange type is not one the broker driver can declare
    #[error("unsupported exchange type `{0}`")]
    InvalidExchangeKind(String),

    /// Error declaring an exchange with the given name
    #[error("failure to declare an exchange `{name}`: {reason}")]
    DeclareExchangeError { name: String, reason: String },

    /// Error declaring a queue with the given name
    #[error("failure to declare a queue `{name}`: {reason}")]
    DeclareQueueError { name: String, reason: String },

    /// Error binding an exchange to a queue
    #[error("failure to binding exchange `{exchange}` to queue `{queue}`: {reason}")]
    BindingExchangeToQueueError {
        exchange: String,
        queue: String,
        reason: String,
    },

    /// Error binding a consumer to a queue
    #[error("failure to declare consumer on queue `{queue}`: {reason}")]
    BindingConsumerError { queue: String, reason: String },

    /// Error publishing a message
    #[error("failure to publish to exchange `{exchange}`: {reason}")]
    PublishingError { exchange: String, reason: String },

    /// Error serializing a message payload
    #[error("failure to serialize payload: {0}")]
    SerializePayloadError(String),

    /// Error reported by a delivery stream
    #[error("failure to consume message `{0}`")]
    ConsumerError(String),

    /// Error closing a connection or channel
    #[error("failure to close: {0}")]
    CloseError(String),
}
