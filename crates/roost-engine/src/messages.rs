//! Outbound message text

use chrono::{Duration, NaiveDate, NaiveTime};
use rand::seq::SliceRandom;
use roost_core::{away, format_clock, Assignment, AwayDay, Person, PersonStatus};

pub const YES_OR_NO: &str = "Sorry, please reply Y or N.";
pub const AM_PM_OR_FULL: &str = "Sorry, please reply with AM, PM, or Full.";
pub const UNKNOWN_COMMAND: &str = "Sorry, I didn't understand that command.";
pub const UNKNOWN_SENDER: &str = "Sorry, I don't know who you are.";
pub const SOMETHING_WENT_WRONG: &str = "Oops, sorry something went wrong.";
pub const WAITING_FOR_EVERYONE: &str =
    "Thank you, I will send your schedule as soon as I hear back from everyone.";
pub const ASK_AWAY_DAYS: &str = "Which days will you be away this week? [reply with comma-separated days: Mon, Tue or 6/17, 6/18]";
pub const START_OVER: &str =
    "Ok, let's start over. Are there any days you will be away this week? [reply Y or N]";
pub const MEDIA_ONLY: &str = "[media]";

pub const NOW_ANNOUNCING: &str = "[Now announcing messages]";
pub const DONE_ANNOUNCING: &str = "[Done announcing messages]";
pub const RESETTING_CONTEXT: &str = "[Resetting temporary context]";
pub const ABANDONING_ASSIGNMENT: &str = "[Abandoning assignment]";
pub const YOU_ARE_READY: &str = "[You are ready]";

pub const VOICE_INSTRUCTIONS: &str =
    "Please press 1 if you are done with the task. Press 2 to snooze the task if you need more time.";
pub const GOODBYE: &str = "Goodbye!";

/// Last entry is text-only
const AFFIRMATIONS: &[&str] = &[
    "Thank you!",
    "The household appreciates you so much.",
    "Excellent, thank you.",
    "You're the best!",
    "❤️🏠❤️",
];

/// A random thank-you; `spoken` leaves out the emoji entry
pub fn affirmation(spoken: bool) -> &'static str {
    let choices = if spoken {
        &AFFIRMATIONS[..AFFIRMATIONS.len() - 1]
    } else {
        AFFIRMATIONS
    };
    choices
        .choose(&mut rand::thread_rng())
        .copied()
        .unwrap_or(AFFIRMATIONS[0])
}

pub fn short_date(date: NaiveDate) -> String {
    date.format("%a %-m/%-d").to_string()
}

pub fn task_prompt(name: &str, question: &str) -> String {
    format!(
        "Hi {}, {} [reply Y if you're done or Snooze for more time]",
        name, question
    )
}

pub fn snoozed(time: NaiveTime) -> String {
    format!(
        "Great, I'll ask again at {}. [reply Y at any time once you're done]",
        format_clock(time)
    )
}

pub fn voice_prompt(name: &str, question: &str) -> String {
    format!("Hello {}, {} {}", name, question, VOICE_INSTRUCTIONS)
}

pub fn voice_snoozed(time: NaiveTime) -> String {
    format!("Great, I'll ask again at {}.", format_clock(time))
}

pub fn schedule_start(name: &str) -> String {
    format!(
        "Hi {}, it is time to schedule this week's tasks. Are there any days you will be away this week? [reply Y or N]",
        name
    )
}

pub fn away_collected(away: &[AwayDay]) -> String {
    format!(
        "Your current away days are: {}\n\nWill you be away for the full day on all of those days? [Reply Y for full days or N to specify when you'll be away on each day]",
        away::describe(away)
    )
}

pub fn away_time(date: NaiveDate) -> String {
    format!(
        "When will you be away on {}? [Reply AM for morning, PM for evening, or Full for the full day]",
        short_date(date)
    )
}

pub fn away_confirm(away: &[AwayDay]) -> String {
    format!(
        "Thank you, here are your current away days: {}\n\nDo those look right to you? [Reply Y or N]",
        away::describe(away)
    )
}

/// Sent to the backup when someone finishes the away-day dialogue
pub fn ready_notice(name: &str, waiting_on: &[String]) -> String {
    if waiting_on.is_empty() {
        format!("{} is ready to schedule tasks.", name)
    } else {
        format!(
            "{} is ready to schedule tasks. Still waiting on: {}",
            name,
            waiting_on.join(", ")
        )
    }
}

pub fn overdue(task: &str, person: &str, after: Duration) -> String {
    format!(
        "Still pending after {}: {}, assigned to {}.",
        describe_delay(after),
        task,
        person
    )
}

/// "one hour", "2 hours", "45 minutes"
fn describe_delay(delay: Duration) -> String {
    let minutes = delay.num_minutes();
    match (minutes / 60, minutes % 60) {
        (1, 0) => "one hour".to_string(),
        (h, 0) if h > 1 => format!("{} hours", h),
        _ if minutes == 1 => "one minute".to_string(),
        _ => format!("{} minutes", minutes),
    }
}

pub fn now_chatting(name: &str) -> String {
    format!("[Now chatting with {}]", name)
}

pub fn done_chatting(name: &str) -> String {
    format!("[Done chatting with {}]", name)
}

pub fn relayed(from: &str, body: &str) -> String {
    format!("{}: {}", from, body)
}

pub fn announcement_sent(count: usize, body: &str) -> String {
    format!("Sent announcement to {} people: {}", count, body)
}

pub fn made_backup(new_backup: &str, old_backup: &str) -> String {
    format!(
        "Hi {}, {} has made you the new designated backup.",
        new_backup, old_backup
    )
}

pub fn backup_notified(new_backup: &str) -> String {
    format!(
        "{} has been notified that they are now the designated backup.",
        new_backup
    )
}

/// Relay of a failed message to the backup
pub fn error_relay(from: &str, body: &str, error: &str) -> String {
    format!("{}: {}\n\n---\n{}", from, body, error)
}

/// Weekly summary for one person, `None` when they have nothing this week
pub fn schedule_summary(person: &Person, assignments: &[Assignment]) -> Option<String> {
    let lines: Vec<String> = assignments
        .iter()
        .filter(|a| a.person == person.name)
        .map(|a| format!("{}: {}", short_date(a.date), a.task))
        .collect();
    if lines.is_empty() {
        return None;
    }
    let apology = if person.status == PersonStatus::Vacation {
        "sorry to interrupt your vacation but "
    } else {
        ""
    };
    Some(format!(
        "Hi {}, {}here are your scheduled tasks for this week:\n{}",
        person.name,
        apology,
        lines.join("\n")
    ))
}
