//! # roost-server
//!
//! Webhook surface for Roost.
//!
//! Receives inbound texts and voice callbacks from the provider, answers with
//! TwiML, and runs the two background ticks (due assignments and timers).

pub mod routes;
mod server;
pub mod twilio;
pub mod twiml;

pub use server::{router, serve, spawn_ticks, AppState, SharedState};
pub use twilio::TwilioClient;
