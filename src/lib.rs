// Copyright (c) 2025, The Ruskit Authors
// MIT License
// All rights reserved.

mod otel;

pub mod args;
pub mod channel;
pub mod config;
pub mod consumer;
pub mod errors;
pub mod exchange;
pub mod publisher;
pub mod queue;
pub mod store;
pub mod transport;
pub mod validation;

pub use config::{Config, ConsumeConfig, PublishConfig};
pub use consumer::DeliveryHandler;
pub use errors::AmqpError;
pub use exchange::{ExchangeConfig, ExchangeKind};
pub use publisher::Publishing;
pub use queue::QueueConfig;
pub use store::{MessageStore, Store};
pub use validation::ValidationErrors;

pub use lapin::{message::Delivery, BasicProperties};
