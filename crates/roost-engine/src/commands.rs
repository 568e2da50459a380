//! Reply vocabulary and backup command parsing

use roost_core::{Context, HalfDay};

const YES: &[&str] = &["y", "yes", "yep", "yeah", "yea", "indeed", "affirmative"];
const NO: &[&str] = &["n", "no", "nope", "nay", "negative"];

/// Trim, lowercase and drop trailing `!`/`.`
pub fn normalize(text: &str) -> String {
    text.trim()
        .to_lowercase()
        .trim_end_matches(['!', '.'])
        .trim_end()
        .to_string()
}

pub fn is_yes(text: &str) -> bool {
    YES.contains(&normalize(text).as_str())
}

pub fn is_no(text: &str) -> bool {
    NO.contains(&normalize(text).as_str())
}

pub fn is_snooze(text: &str) -> bool {
    normalize(text) == "snooze"
}

/// "am", "pm" or "full"
pub fn half_day(text: &str) -> Option<HalfDay> {
    normalize(text).parse().ok()
}

/// What a message from the backup asks for
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackupCommand {
    /// `schedule!`: skip the dialogue and schedule now
    QuickSchedule,
    /// `schedule`: start the weekly away-day dialogue
    StartSchedule,
    /// `announce`: broadcast following messages
    EnterAnnounce,
    /// `ready`
    Ready,
    /// Free text while announcing
    Announce { text: String },
    /// `<name>: <text>`
    Relay { to: String, text: String },
    /// `announce: <text>`
    AnnounceOnce { text: String },
    /// `backup: <name>`
    Reassign { name: String },
    /// Free text while chatting
    Chat { with: String, text: String },
    Unknown,
}

/// Parse a backup message given their current context and the household names
///
/// Checked in order: keywords, announce text, `<name>:` relay, `announce:`,
/// `backup:`, chat text.
pub fn parse_backup_command(text: &str, context: &Context, names: &[&str]) -> BackupCommand {
    let raw = text.trim();
    if raw.eq_ignore_ascii_case("schedule!") {
        return BackupCommand::QuickSchedule;
    }

    match normalize(raw).as_str() {
        "schedule" => return BackupCommand::StartSchedule,
        "announce" => return BackupCommand::EnterAnnounce,
        "ready" => return BackupCommand::Ready,
        _ => {}
    }

    if *context == Context::Announce {
        return BackupCommand::Announce {
            text: raw.to_string(),
        };
    }

    if let Some((prefix, rest)) = raw.split_once(':') {
        let prefix = prefix.trim();
        let rest = rest.trim().to_string();
        if let Some(name) = names.iter().find(|n| n.eq_ignore_ascii_case(prefix)) {
            return BackupCommand::Relay {
                to: name.to_string(),
                text: rest,
            };
        }
        if prefix.eq_ignore_ascii_case("announce") {
            return BackupCommand::AnnounceOnce { text: rest };
        }
        if prefix.eq_ignore_ascii_case("backup") {
            return BackupCommand::Reassign { name: rest };
        }
    }

    if let Context::Chat { with } = context {
        return BackupCommand::Chat {
            with: with.clone(),
            text: raw.to_string(),
        };
    }

    BackupCommand::Unknown
}
