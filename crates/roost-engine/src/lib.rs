//! # roost-engine
//!
//! Scheduling and conversation engine for Roost.
//!
//! This crate provides:
//! - Rotation queue and weekly schedule planning
//! - Assignment lifecycle with escalation timers
//! - The pure conversation state machine and backup command parser
//! - Persistent storage of people, tasks and assignments
//! - The [`Dispatcher`] that runs every inbound event against the household

pub mod calendar;
pub mod clock;
pub mod commands;
pub mod conversation;
pub mod dayparse;
pub mod dispatcher;
pub mod lifecycle;
pub mod messages;
pub mod rotation;
pub mod store;
pub mod sunset;
pub mod timers;
pub mod transport;
pub mod voice;

pub use calendar::{mark_task_dates, Calendar, WeekPlan};
pub use clock::{Clock, ManualClock, SystemClock};
pub use conversation::{transition, Action};
pub use dispatcher::{reply_text, Dispatcher, HouseholdView, InboundMessage};
pub use lifecycle::Lifecycle;
pub use rotation::{select_person, RotationQueue};
pub use store::{JsonFileStore, MemoryStore, Snapshot, Store};
pub use sunset::TaskClock;
pub use timers::{Timer, TimerKey, TimerTable};
pub use transport::{CallbackUrls, MessageTransport, RecordingTransport, VoiceTransport};
pub use voice::{VoiceScript, VoiceStep};
