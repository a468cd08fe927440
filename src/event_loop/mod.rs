//! Event Loop Module
//!
//! The single logical queue every connection callback runs on. Transport
//! drivers and timers push [`LoopCommand`]s through a [`LoopClient`]; the
//! [`EventLoop`] pops them one at a time and runs the matching handlers.

mod client;
mod engine;
mod listeners;

pub use client::{LoopClient, LoopCommand};
pub use engine::{Context, EventLoop, TimerId};
pub use listeners::{Handler, Listeners};
