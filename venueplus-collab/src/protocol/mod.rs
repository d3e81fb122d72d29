//! The JSON message contract spoken over a connection.
//!
//! Every frame is a single object whose `type` field selects the message.
//! Inbound frames are decoded type first, so a frame with a known type but a
//! bad payload can still be answered with the matching failure reply.

mod client;
mod server;

pub use client::*;
pub use server::*;
