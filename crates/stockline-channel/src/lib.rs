//! Stockline Channel — AMQP 0-9-1 transport for domain events.

pub mod amqp_event_channel;

pub use amqp_event_channel::{AmqpChannelSettings, AmqpEventChannel};
