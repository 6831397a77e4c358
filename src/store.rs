// Copyright (c) 2025, The Ruskit Authors
// MIT License
// All rights reserved.

//! # AMQP Store
//!
//! The store owns two broker connections, one dedicated to publishing and one to
//! consuming, each with a single channel. It is created not running; `start`
//! dials both connections and opens their channels, `shutdown` closes them.
//!
//! The four handles and the running flag live behind one lock, so callers only
//! ever observe a store with every handle open or with none. `publish` and
//! `subscribe` hold the read side for the duration of the call, which makes
//! `shutdown` wait for in-flight calls instead of closing under them. Frames on a
//! channel are serialized by the broker driver; the store adds no channel lock.

use crate::{
    channel::LapinConnector,
    config::{ConsumeConfig, PublishConfig},
    consumer::{consume_loop, DeliveryHandler},
    errors::AmqpError,
    publisher::Publishing,
    transport::{AmqpChannel, AmqpConnection, Connector, DialConfig},
};
use async_trait::async_trait;
use lapin::options::BasicPublishOptions;
use opentelemetry::Context;
use std::{
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    time::Duration,
};
use tokio::sync::RwLock;
use tracing::{debug, warn};

#[cfg(any(test, feature = "mocks"))]
use mockall::automock;

/// Publish/subscribe facade over a RabbitMQ broker.
#[cfg_attr(any(test, feature = "mocks"), automock)]
#[async_trait]
pub trait MessageStore: Send + Sync {
    /// Dials the publish and consume connections and opens their channels.
    ///
    /// On failure every handle opened so far is closed, in reverse order, before
    /// the error is returned, and the store stays not running. Calling `start` on
    /// a running store does nothing.
    async fn start(&self) -> Result<(), AmqpError>;

    /// Reports whether the last `start` succeeded and no `shutdown` followed.
    /// Does not probe the broker.
    fn is_running(&self) -> bool;

    /// Declares the exchange of `cfg` and publishes `message` to it with the
    /// configured routing key and mandatory/immediate flags.
    ///
    /// The declaration runs on every call, so a broker restart does not lose the
    /// exchange; it fails when the exchange exists with other properties.
    async fn publish(
        &self,
        ctx: &Context,
        cfg: &PublishConfig,
        message: Publishing,
    ) -> Result<(), AmqpError>;

    /// Declares the exchange and queue of `cfg`, binds them with the routing key
    /// and starts consuming.
    ///
    /// Returns once the consumer is registered. Deliveries are handed to `handler`
    /// by a background task that runs until the delivery stream closes; it can
    /// only be stopped by shutting the store down.
    async fn subscribe(
        &self,
        cfg: &ConsumeConfig,
        handler: Arc<dyn DeliveryHandler>,
    ) -> Result<(), AmqpError>;

    /// Closes both connections and marks the store not running.
    ///
    /// Close failures are logged and swallowed. Safe to call at any time.
    async fn shutdown(&self);
}

struct Handles {
    publish_conn: Arc<dyn AmqpConnection>,
    publish_channel: Arc<dyn AmqpChannel>,
    consume_conn: Arc<dyn AmqpConnection>,
    consume_channel: Arc<dyn AmqpChannel>,
}

enum CleanupTask {
    Connection(Arc<dyn AmqpConnection>),
    Channel(Arc<dyn AmqpChannel>),
}

/// Handles opened during `start`, closed in reverse order when a later step fails.
#[derive(Default)]
struct CleanupTasks {
    tasks: Vec<CleanupTask>,
}

impl CleanupTasks {
    fn connection(&mut self, conn: &Arc<dyn AmqpConnection>) {
        self.tasks.push(CleanupTask::Connection(conn.clone()));
    }

    fn channel(&mut self, channel: &Arc<dyn AmqpChannel>) {
        self.tasks.push(CleanupTask::Channel(channel.clone()));
    }

    async fn close_all(self) {
        for task in self.tasks.into_iter().rev() {
            let res = match task {
                CleanupTask::Connection(conn) => conn.close().await,
                CleanupTask::Channel(channel) => channel.close().await,
            };
            if let Err(err) = res {
                warn!(error = err.to_string(), "error while closing rabbitmq object");
            }
        }
    }
}

pub struct Store {
    connector: Arc<dyn Connector>,
    dsn: String,
    dial_config: DialConfig,
    running: AtomicBool,
    handles: RwLock<Option<Handles>>,
}

impl Store {
    /// Creates a not running store that dials `dsn` with lapin.
    pub fn new(dsn: &str, timeout: Duration) -> Store {
        Store::with_connector(Arc::new(LapinConnector), dsn, DialConfig::new(timeout))
    }

    pub fn with_connector(
        connector: Arc<dyn Connector>,
        dsn: &str,
        dial_config: DialConfig,
    ) -> Store {
        Store {
            connector,
            dsn: dsn.to_owned(),
            dial_config,
            running: AtomicBool::new(false),
            handles: RwLock::new(None),
        }
    }

    pub fn dsn(&self) -> &str {
        &self.dsn
    }

    async fn open(&self, cleanup: &mut CleanupTasks) -> Result<Handles, AmqpError> {
        let publish_conn = self.connector.dial(&self.dsn, &self.dial_config).await?;
        cleanup.connection(&publish_conn);

        let publish_channel = publish_conn.channel().await?;
        cleanup.channel(&publish_channel);

        let consume_conn = self.connector.dial(&self.dsn, &self.dial_config).await?;
        cleanup.connection(&consume_conn);

        let consume_channel = consume_conn.channel().await?;
        cleanup.channel(&consume_channel);

        Ok(Handles {
            publish_conn,
            publish_channel,
            consume_conn,
            consume_channel,
        })
    }
}

#[async_trait]
impl MessageStore for Store {
    async fn start(&self) -> Result<(), AmqpError> {
        let mut handles = self.handles.write().await;
        if handles.is_some() {
            debug!("store already running");
            return Ok(());
        }

        let mut cleanup = CleanupTasks::default();
        match self.open(&mut cleanup).await {
            Ok(opened) => {
                *handles = Some(opened);
                self.running.store(true, Ordering::SeqCst);
                debug!("store started");
                Ok(())
            }
            Err(err) => {
                cleanup.close_all().await;
                Err(err)
            }
        }
    }

    fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    async fn publish(
        &self,
        ctx: &Context,
        cfg: &PublishConfig,
        message: Publishing,
    ) -> Result<(), AmqpError> {
        let handles = self.handles.read().await;
        let Some(handles) = handles.as_ref() else {
            return Err(AmqpError::NotRunning);
        };

        let channel = &handles.publish_channel;
        channel.exchange_declare(&cfg.exchange).await?;

        channel
            .publish(
                &cfg.exchange.name,
                &cfg.exchange.routing_key,
                BasicPublishOptions {
                    mandatory: cfg.mandatory,
                    immediate: cfg.immediate,
                },
                message.prepare(ctx),
            )
            .await
    }

    async fn subscribe(
        &self,
        cfg: &ConsumeConfig,
        handler: Arc<dyn DeliveryHandler>,
    ) -> Result<(), AmqpError> {
        let handles = self.handles.read().await;
        let Some(handles) = handles.as_ref() else {
            return Err(AmqpError::NotRunning);
        };

        let channel = &handles.consume_channel;
        let exchange = &cfg.exchange;

        channel.exchange_declare(exchange).await?;
        let queue = channel.queue_declare(&exchange.queue).await?;
        channel
            .queue_bind(
                &queue,
                &exchange.name,
                &exchange.routing_key,
                exchange.queue.no_wait,
            )
            .await?;
        let deliveries = channel.consume(&queue, cfg).await?;

        tokio::spawn(consume_loop(deliveries, handler));
        debug!(queue = queue.as_str(), consumer = cfg.name.as_str(), "consumer started");

        Ok(())
    }

    async fn shutdown(&self) {
        let mut handles = self.handles.write().await;
        if let Some(opened) = handles.take() {
            for conn in [&opened.consume_conn, &opened.publish_conn] {
                if conn.is_closed() {
                    continue;
                }
                if let Err(err) = conn.close().await {
                    warn!(error = err.to_string(), "error while closing rabbitmq connection");
                }
            }
        }

        self.running.store(false, Ordering::SeqCst);
        debug!("store stopped");
    }
}
