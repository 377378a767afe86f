// src/broadcast/mod.rs
//! Broadcast fan-out
//!
//! Real-time event distribution to connected subscribers:
//! - Event framing and per-subscriber delivery (fanout)
//! - TCP line-frame subscriber server (server)

pub mod fanout;
pub mod server;

pub use fanout::{Event, FanoutManager, SubscriberId, Subscription};
pub use server::BroadcastServer;
