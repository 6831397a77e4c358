// Copyright (c) 2025, The Ruskit Authors
// MIT License
// All rights reserved.

//! # Delivery Consumption
//!
//! Every successful subscription spawns one consume loop. The loop drains the
//! delivery stream and awaits the handler once per delivery, in delivery order,
//! until the stream ends because the consumer was cancelled or the connection
//! was closed. Nothing is returned to the subscriber: the loop can only be
//! stopped by closing the owning connection.

use crate::{otel, transport::DeliveryStream};
use async_trait::async_trait;
use futures_util::StreamExt;
use lapin::message::Delivery;
use opentelemetry::{global, trace::TraceContextExt, Context};
use std::{future::Future, sync::Arc};
use tracing::{debug, error};

/// Callback invoked for each delivery of a subscription.
///
/// The context carries the span of the delivery so work done by the handler,
/// publishing included, is traced under it. Acknowledgement is up to the
/// handler when the subscription is not `auto_ack`.
#[async_trait]
pub trait DeliveryHandler: Send + Sync {
    async fn handle(&self, ctx: Context, delivery: Delivery);
}

#[async_trait]
impl<F, Fut> DeliveryHandler for F
where
    F: Fn(Context, Delivery) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    async fn handle(&self, ctx: Context, delivery: Delivery) {
        (self)(ctx, delivery).await
    }
}

pub(crate) async fn consume_loop(
    mut deliveries: DeliveryStream,
    handler: Arc<dyn DeliveryHandler>,
) {
    let tracer = global::tracer(otel::CONSUMER_TRACER);

    while let Some(result) = deliveries.next().await {
        match result {
            Ok(delivery) => {
                debug!(
                    exchange = delivery.exchange.as_str(),
                    routing_key = delivery.routing_key.as_str(),
                    delivery_tag = delivery.delivery_tag,
                    "received delivery"
                );

                let (ctx, span) = otel::new_span(&delivery, &tracer);
                let ctx = ctx.with_span(span);
                handler.handle(ctx.clone(), delivery).await;
                ctx.span().end();
            }
            Err(err) => error!(error = err.to_string(), "errors consume msg"),
        }
    }

    debug!("delivery stream closed, consumer stopped");
}
