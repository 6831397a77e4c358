// Copyright (c) 2025, The Ruskit Authors
// MIT License
// All rights reserved.

//! # Broker Transport Contract
//!
//! The store orchestrates calls to a broker driver without speaking the wire
//! protocol itself. This module describes what it needs from that driver: a
//! connector that dials connections, connections that open channels, and
//! channels that declare topology, publish and consume. [`crate::channel`]
//! provides the lapin implementation.

use crate::{
    config::ConsumeConfig, errors::AmqpError, exchange::ExchangeConfig, publisher::Publishing,
    queue::QueueConfig,
};
use async_trait::async_trait;
use futures_util::stream::BoxStream;
use lapin::{message::Delivery, options::BasicPublishOptions};
use std::{sync::Arc, time::Duration};

#[cfg(any(test, feature = "mocks"))]
use mockall::automock;

/// Heartbeat negotiated with the broker
pub const DEFAULT_HEARTBEAT: Duration = Duration::from_secs(10);
/// Locale announced to the broker
pub const DEFAULT_LOCALE: &str = "en_US";

/// Stream of deliveries produced by a consumer.
pub type DeliveryStream = BoxStream<'static, Result<Delivery, AmqpError>>;

/// Parameters applied when dialing a connection.
///
/// `timeout` bounds both the TCP connect and the protocol handshake.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DialConfig {
    pub timeout: Duration,
    pub heartbeat: Duration,
    pub locale: String,
}

impl DialConfig {
    pub fn new(timeout: Duration) -> Self {
        DialConfig {
            timeout,
            heartbeat: DEFAULT_HEARTBEAT,
            locale: DEFAULT_LOCALE.to_owned(),
        }
    }
}

#[cfg_attr(any(test, feature = "mocks"), automock)]
#[async_trait]
pub trait Connector: Send + Sync {
    async fn dial(
        &self,
        dsn: &str,
        cfg: &DialConfig,
    ) -> Result<Arc<dyn AmqpConnection>, AmqpError>;
}

#[cfg_attr(any(test, feature = "mocks"), automock)]
#[async_trait]
pub trait AmqpConnection: Send + Sync {
    async fn channel(&self) -> Result<Arc<dyn AmqpChannel>, AmqpError>;
    async fn close(&self) -> Result<(), AmqpError>;
    fn is_closed(&self) -> bool;
}

#[cfg_attr(any(test, feature = "mocks"), automock)]
#[async_trait]
pub trait AmqpChannel: Send + Sync {
    /// Declares the exchange; succeeds when it already exists with the same properties.
    async fn exchange_declare(&self, exchange: &ExchangeConfig) -> Result<(), AmqpError>;

    /// Declares the queue and returns its name, which the broker generates
    /// when the configured one is empty.
    async fn queue_declare(&self, queue: &QueueConfig) -> Result<String, AmqpError>;

    async fn queue_bind(
        &self,
        queue: &str,
        exchange: &str,
        routing_key: &str,
        no_wait: bool,
    ) -> Result<(), AmqpError>;

    async fn consume(
        &self,
        queue: &str,
        consumer: &ConsumeConfig,
    ) -> Result<DeliveryStream, AmqpError>;

    async fn publish(
        &self,
        exchange: &str,
        routing_key: &str,
        options: BasicPublishOptions,
        message: Publishing,
    ) -> Result<(), AmqpError>;

    async fn close(&self) -> Result<(), AmqpError>;
}
