//! Pure conversation state machine
//!
//! `transition(context, reply, today) -> (context, actions)` decides how one inbound
//! message moves a person's context. It performs no I/O; the dispatcher executes
//! the returned actions against the household.
//!
//! - No async, no store access
//! - Unparsable replies keep the context and answer with a corrective prompt
//! - Messages that are not part of a dialogue come back as [`Action::Forward`]

use chrono::NaiveDate;
use roost_core::{Context, HalfDay};

use crate::{commands, dayparse, messages};

/// Side effects requested by a transition
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    /// Reply to the sender with fixed text
    Reply(String),
    /// Not a dialogue reply: backup command for the backup, relay for anyone else
    Forward,
    /// Complete the sender's current assignment
    MarkDone,
    /// Snooze the sender's current assignment
    Snooze,
    /// Add full-day away entries, replacing any on the same dates
    AddAwayDays(Vec<NaiveDate>),
    /// Qualify existing away entries
    SetAwayPart { dates: Vec<NaiveDate>, part: HalfDay },
    /// Drop this round's away entries
    RemoveAwayDays(Vec<NaiveDate>),
    /// Reply with the current away days and ask whether they are all full days
    AskFullDays,
    /// Reply with the current away days and ask for confirmation
    AskConfirm,
    /// Sender finished the weekly dialogue
    BecameReady,
}

fn invalid(context: Context, prompt: &str) -> (Context, Vec<Action>) {
    (context, vec![Action::Reply(prompt.to_string())])
}

/// Transition function for one inbound message
///
/// `today` anchors day-token resolution. Never panics.
pub fn transition(context: Context, reply: &str, today: NaiveDate) -> (Context, Vec<Action>) {
    match context {
        Context::Ready | Context::Announce | Context::Chat { .. } => (context, vec![Action::Forward]),

        Context::Assignment => {
            if commands::is_yes(reply) {
                (Context::Ready, vec![Action::MarkDone])
            } else if commands::is_snooze(reply) {
                (Context::Assignment, vec![Action::Snooze])
            } else {
                (Context::Assignment, vec![Action::Forward])
            }
        }

        Context::ScheduleStart => {
            if commands::is_yes(reply) {
                (
                    Context::ScheduleAwayDays,
                    vec![Action::Reply(messages::ASK_AWAY_DAYS.to_string())],
                )
            } else if commands::is_no(reply) {
                (Context::Ready, vec![Action::BecameReady])
            } else {
                invalid(context, messages::YES_OR_NO)
            }
        }

        Context::ScheduleAwayDays => match dayparse::parse_days(reply, today) {
            Ok(days) => (
                Context::ScheduleAwayFull { days: days.clone() },
                vec![Action::AddAwayDays(days), Action::AskFullDays],
            ),
            Err(e) => invalid(context, &e.to_string()),
        },

        Context::ScheduleAwayFull { days } => {
            if commands::is_yes(reply) {
                (
                    Context::Ready,
                    vec![
                        Action::SetAwayPart {
                            dates: days,
                            part: HalfDay::FullDay,
                        },
                        Action::BecameReady,
                    ],
                )
            } else if commands::is_no(reply) {
                match days.first().copied() {
                    Some(first) => (
                        Context::ScheduleAwayTime { days, index: 0 },
                        vec![Action::Reply(messages::away_time(first))],
                    ),
                    None => (Context::Ready, vec![Action::BecameReady]),
                }
            } else {
                invalid(Context::ScheduleAwayFull { days }, messages::YES_OR_NO)
            }
        }

        Context::ScheduleAwayTime { days, index } => {
            let Some(part) = commands::half_day(reply) else {
                return invalid(Context::ScheduleAwayTime { days, index }, messages::AM_PM_OR_FULL);
            };
            let mut actions = Vec::new();
            if let Some(date) = days.get(index).copied() {
                actions.push(Action::SetAwayPart {
                    dates: vec![date],
                    part,
                });
            }
            let next = index + 1;
            match days.get(next).copied() {
                Some(date) => {
                    actions.push(Action::Reply(messages::away_time(date)));
                    (Context::ScheduleAwayTime { days, index: next }, actions)
                }
                None => {
                    actions.push(Action::AskConfirm);
                    (Context::ScheduleAwayConfirm { days }, actions)
                }
            }
        }

        Context::ScheduleAwayConfirm { days } => {
            if commands::is_yes(reply) {
                (Context::Ready, vec![Action::BecameReady])
            } else if commands::is_no(reply) {
                (
                    Context::ScheduleStart,
                    vec![
                        Action::RemoveAwayDays(days),
                        Action::Reply(messages::START_OVER.to_string()),
                    ],
                )
            } else {
                invalid(Context::ScheduleAwayConfirm { days }, messages::YES_OR_NO)
            }
        }
    }
}
