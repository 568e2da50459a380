//! Process-wide dispatcher
//!
//! Owns the household state and every collaborator. Each public operation holds
//! the household lock for its whole duration, so inbound messages, voice
//! callbacks, ticks and timer firings are processed one at a time and never
//! interleave on the same person or assignment.
//!
//! The weekly cycle is guarded by the `scheduling` flag: it is opened by the
//! `schedule` command and closed by the ready-check before planning, so a
//! repeated "everyone is ready" observation can never plan twice.

use chrono::{Duration, NaiveDateTime};
use rand::rngs::StdRng;
use rand::SeedableRng;
use roost_core::fail_open::fail_open;
use roost_core::{
    normalize_phone, Assignment, AssignmentId, AssignmentStatus, CallId, Context, Person,
    PersonStatus, Result, RoostConfig, RoostError, Task,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;

use crate::calendar::{mark_task_dates, Calendar};
use crate::clock::Clock;
use crate::commands::{parse_backup_command, BackupCommand};
use crate::conversation::{self, Action};
use crate::lifecycle::Lifecycle;
use crate::messages;
use crate::rotation::RotationQueue;
use crate::store::Store;
use crate::sunset::TaskClock;
use crate::timers::{Timer, TimerKey, TimerTable};
use crate::transport::{CallbackUrls, MessageTransport, VoiceTransport};
use crate::voice::VoiceScript;

/// An inbound text message
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InboundMessage {
    /// Sender's number in any format
    pub from: String,
    pub body: String,
    #[serde(default)]
    pub media: Vec<String>,
}

impl InboundMessage {
    pub fn new(from: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            from: from.into(),
            body: body.into(),
            media: Vec::new(),
        }
    }

    pub fn with_media(mut self, url: impl Into<String>) -> Self {
        self.media.push(url.into());
        self
    }

    /// Trimmed body, or a placeholder for media-only messages
    fn text(&self) -> String {
        body_or_media(&self.body, &self.media)
    }
}

fn body_or_media(body: &str, media: &[String]) -> String {
    let body = body.trim();
    if body.is_empty() && !media.is_empty() {
        messages::MEDIA_ONLY.to_string()
    } else {
        body.to_string()
    }
}

/// Text to send back for the result of [`Dispatcher::handle_inbound_message`]
pub fn reply_text(result: &Result<String>) -> String {
    match result {
        Ok(reply) => reply.clone(),
        Err(e) if e.is_validation() => e.to_string(),
        Err(_) => messages::SOMETHING_WENT_WRONG.to_string(),
    }
}

/// A voice call waiting for callbacks
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActiveCall {
    pub person: String,
    pub assignment: AssignmentId,
}

/// Mutable state shared by every event
#[derive(Debug)]
pub struct Household {
    pub people: Vec<Person>,
    pub tasks: Vec<Task>,
    /// Assignments of the current cycle (plus unfinished earlier ones)
    pub assignments: Vec<Assignment>,
    pub queue: RotationQueue,
    pub timers: TimerTable,
    pub calls: HashMap<CallId, ActiveCall>,
    /// A weekly cycle is open and waiting for the ready-check
    pub scheduling: bool,
    rng: StdRng,
}

impl Household {
    fn new(rng: StdRng) -> Self {
        Self {
            people: Vec::new(),
            tasks: Vec::new(),
            assignments: Vec::new(),
            queue: RotationQueue::default(),
            timers: TimerTable::new(),
            calls: HashMap::new(),
            scheduling: false,
            rng,
        }
    }

    pub fn person(&self, name: &str) -> Option<&Person> {
        self.people.iter().find(|p| p.name == name)
    }

    fn person_index(&self, name: &str) -> Option<usize> {
        self.people.iter().position(|p| p.name == name)
    }

    fn person_by_phone(&self, phone: &str) -> Option<usize> {
        let phone = normalize_phone(phone);
        self.people.iter().position(|p| p.phone == phone)
    }

    pub fn backup(&self) -> Option<&Person> {
        self.people.iter().find(|p| p.is_backup())
    }

    fn backup_index(&self) -> Option<usize> {
        self.people.iter().position(|p| p.is_backup())
    }

    pub fn task(&self, name: &str) -> Option<&Task> {
        self.tasks.iter().find(|t| t.name == name)
    }

    pub fn assignment(&self, id: &str) -> Option<&Assignment> {
        self.assignments.iter().find(|a| a.id() == id)
    }

    fn assignment_index(&self, id: &str) -> Option<usize> {
        self.assignments.iter().position(|a| a.id() == id)
    }

    fn active_names(&self) -> Vec<String> {
        self.people
            .iter()
            .filter(|p| p.is_active())
            .map(|p| p.name.clone())
            .collect()
    }

    /// Replace people with freshly loaded rows, keeping runtime conversation state
    fn merge_people(&mut self, fresh: Vec<Person>) {
        let previous = std::mem::take(&mut self.people);
        self.people = fresh
            .into_iter()
            .map(|mut person| {
                person.phone = normalize_phone(&person.phone);
                if let Some(old) = previous.iter().find(|o| o.name == person.name) {
                    person.context = old.context.clone();
                    person.assignment = old.assignment.clone();
                }
                person
            })
            .collect();
    }
}

/// Read-only copy of the household for views and tests
#[derive(Debug, Clone, Serialize)]
pub struct HouseholdView {
    pub people: Vec<Person>,
    pub tasks: Vec<Task>,
    pub assignments: Vec<Assignment>,
    pub queue: RotationQueue,
    pub scheduling: bool,
    pub timers: usize,
    pub calls: usize,
}

impl HouseholdView {
    pub fn person(&self, name: &str) -> Option<&Person> {
        self.people.iter().find(|p| p.name == name)
    }

    pub fn assignment(&self, id: &str) -> Option<&Assignment> {
        self.assignments.iter().find(|a| a.id() == id)
    }
}

pub struct Dispatcher {
    store: Arc<dyn Store>,
    messages: Arc<dyn MessageTransport>,
    voice: Arc<dyn VoiceTransport>,
    clock: Arc<dyn Clock>,
    calendar: Calendar,
    lifecycle: Lifecycle,
    context_timeout: Duration,
    public_url: String,
    household: Mutex<Household>,
}

impl Dispatcher {
    pub fn new(
        store: Arc<dyn Store>,
        messages: Arc<dyn MessageTransport>,
        voice: Arc<dyn VoiceTransport>,
        clock: Arc<dyn Clock>,
        config: &RoostConfig,
    ) -> Self {
        Self {
            store,
            messages,
            voice,
            clock,
            calendar: Calendar::new(TaskClock::from_config(&config.calendar)),
            lifecycle: Lifecycle::from_config(&config.timing),
            context_timeout: Duration::minutes(config.timing.context_timeout_minutes),
            public_url: config.server.public_url.clone(),
            household: Mutex::new(Household::new(StdRng::from_entropy())),
        }
    }

    /// Seed the rotation shuffle (deterministic tests and previews)
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.household.get_mut().rng = StdRng::seed_from_u64(seed);
        self
    }

    /// Load people, tasks and the current cycle from the store
    ///
    /// Task dates are re-derived from every known assignment. Assignments still
    /// PENDING get their escalation re-armed and their person put back in the
    /// assignment context.
    #[instrument(skip(self))]
    pub async fn load(&self) -> Result<()> {
        let snapshot = self.store.load().await?;
        let now = self.clock.now();
        let mut guard = self.household.lock().await;
        let house = &mut *guard;

        house.merge_people(snapshot.people);
        let mut tasks = snapshot.tasks;
        mark_task_dates(
            &mut tasks,
            snapshot.upcoming.iter().chain(snapshot.archive.iter()),
            now.date(),
        );
        house.tasks = tasks;
        house.assignments = snapshot.upcoming;
        house.queue = RotationQueue::shuffled(house.active_names(), &mut house.rng);

        let escalate_at = now + self.lifecycle.escalate_after();
        for assignment in house
            .assignments
            .iter()
            .filter(|a| a.status == AssignmentStatus::Pending)
        {
            let id = assignment.id();
            house.timers.arm(
                Timer::Escalation {
                    assignment: id.clone(),
                },
                escalate_at,
            );
            if let Some(person) = house.people.iter_mut().find(|p| p.name == assignment.person) {
                person.context = Context::Assignment;
                person.assignment = Some(id);
            }
        }

        info!(
            "Loaded {} people, {} tasks, {} assignments",
            house.people.len(),
            house.tasks.len(),
            house.assignments.len()
        );
        Ok(())
    }

    pub async fn snapshot(&self) -> HouseholdView {
        let house = self.household.lock().await;
        HouseholdView {
            people: house.people.clone(),
            tasks: house.tasks.clone(),
            assignments: house.assignments.clone(),
            queue: house.queue.clone(),
            scheduling: house.scheduling,
            timers: house.timers.len(),
            calls: house.calls.len(),
        }
    }

    /// Timer rows currently armed, for inspection
    pub async fn timer_deadline(&self, key: &TimerKey) -> Option<NaiveDateTime> {
        self.household.lock().await.timers.deadline(key)
    }

    // ---- inbound text ----

    /// Handle one inbound text and return the reply for the sender
    ///
    /// Validation errors carry the corrective prompt for the sender. Any other
    /// error is relayed to the backup before it is returned.
    #[instrument(skip(self, message), fields(from = %message.from))]
    pub async fn handle_inbound_message(&self, message: InboundMessage) -> Result<String> {
        let mut guard = self.household.lock().await;
        let house = &mut *guard;
        let now = self.clock.now();

        let Some(idx) = house.person_by_phone(&message.from) else {
            warn!("Message from unknown number {}", message.from);
            return Err(RoostError::Validation(messages::UNKNOWN_SENDER.to_string()));
        };
        let name = house.people[idx].name.clone();
        let body = message.text();
        info!("Message from {}: {}", name, body);

        match self
            .process_message(house, idx, &body, &message.media, now)
            .await
        {
            Ok(reply) => Ok(reply),
            Err(e) if e.is_validation() => Err(e),
            Err(e) => {
                error!("Failed to handle message from {}: {}", name, e);
                if let Some(backup) = house.backup().cloned() {
                    let relay = messages::error_relay(&name, &body, &e.to_string());
                    fail_open("error relay", || self.send(&backup, &relay, &message.media)).await;
                }
                Err(e)
            }
        }
    }

    async fn process_message(
        &self,
        house: &mut Household,
        idx: usize,
        body: &str,
        media: &[String],
        now: NaiveDateTime,
    ) -> Result<String> {
        let today = now.date();
        let current = house.people[idx].context.clone();
        let (next, actions) = conversation::transition(current.clone(), body, today);
        if next != current {
            debug!("{}: {} -> {}", house.people[idx].name, current, next);
        }
        house.people[idx].context = next;

        match self.apply_actions(house, idx, actions, body, media, now).await {
            Ok(reply) => Ok(reply),
            Err(e) => {
                // A failed done or snooze keeps the prompt open for a retry
                if current == Context::Assignment {
                    house.people[idx].context = current;
                }
                Err(e)
            }
        }
    }

    async fn apply_actions(
        &self,
        house: &mut Household,
        idx: usize,
        actions: Vec<Action>,
        body: &str,
        media: &[String],
        now: NaiveDateTime,
    ) -> Result<String> {
        let today = now.date();
        let mut replies = Vec::new();
        for action in actions {
            let reply = match action {
                Action::Reply(text) => text,
                Action::Forward => {
                    if house.people[idx].is_backup() {
                        self.backup_command(house, idx, body, media, now).await?
                    } else {
                        self.relay_to_backup(house, idx, body, media, now).await?;
                        String::new()
                    }
                }
                Action::MarkDone => {
                    self.complete_assignment(house, idx, now).await?;
                    messages::affirmation(false).to_string()
                }
                Action::Snooze => {
                    let until = self.snooze_assignment(house, idx, now).await?;
                    messages::snoozed(until.time())
                }
                Action::AddAwayDays(dates) => {
                    house.people[idx].add_away_days(&dates, today);
                    self.store.save_person(&house.people[idx]).await?;
                    String::new()
                }
                Action::SetAwayPart { dates, part } => {
                    house.people[idx].set_away_part(&dates, part);
                    self.store.save_person(&house.people[idx]).await?;
                    String::new()
                }
                Action::RemoveAwayDays(dates) => {
                    house.people[idx].remove_away_days(&dates);
                    self.store.save_person(&house.people[idx]).await?;
                    String::new()
                }
                Action::AskFullDays => messages::away_collected(&house.people[idx].away),
                Action::AskConfirm => messages::away_confirm(&house.people[idx].away),
                Action::BecameReady => self.ready_check(house, Some(idx), now).await?,
            };
            if !reply.is_empty() {
                replies.push(reply);
            }
        }
        Ok(replies.join("\n\n"))
    }

    async fn complete_assignment(
        &self,
        house: &mut Household,
        idx: usize,
        now: NaiveDateTime,
    ) -> Result<()> {
        let person = &house.people[idx];
        let id = person.assignment.clone().ok_or_else(|| {
            RoostError::Other(format!("{} replied without an open assignment", person.name))
        })?;
        let ai = house
            .assignment_index(&id)
            .ok_or_else(|| RoostError::AssignmentNotFound(id.clone()))?;
        self.lifecycle
            .mark_done(&mut house.assignments[ai], &*self.store, &mut house.timers, now)
            .await?;
        house.people[idx].assignment = None;
        Ok(())
    }

    async fn snooze_assignment(
        &self,
        house: &mut Household,
        idx: usize,
        now: NaiveDateTime,
    ) -> Result<NaiveDateTime> {
        let person = &house.people[idx];
        let id = person.assignment.clone().ok_or_else(|| {
            RoostError::Other(format!("{} snoozed without an open assignment", person.name))
        })?;
        let ai = house
            .assignment_index(&id)
            .ok_or_else(|| RoostError::AssignmentNotFound(id.clone()))?;
        self.lifecycle
            .snooze(&mut house.assignments[ai], &*self.store, &mut house.timers, now)
            .await
    }

    /// Forward a message to the backup and point the backup's chat at the sender
    async fn relay_to_backup(
        &self,
        house: &mut Household,
        idx: usize,
        body: &str,
        media: &[String],
        now: NaiveDateTime,
    ) -> Result<()> {
        let backup_idx = house
            .backup_index()
            .ok_or_else(|| RoostError::PersonNotFound("backup".to_string()))?;
        let sender = house.people[idx].name.clone();
        let backup = house.people[backup_idx].clone();
        self.send(&backup, &messages::relayed(&sender, body), media)
            .await?;

        // Never pull the backup out of a task prompt or the weekly dialogue
        if backup.is_ready() || backup.context.is_temporary() {
            self.enter_temporary(house, backup_idx, Context::Chat { with: sender }, now)
                .await?;
        }
        Ok(())
    }

    /// Enter (or stay in) a temporary context and restart its expiry timer
    async fn enter_temporary(
        &self,
        house: &mut Household,
        idx: usize,
        context: Context,
        now: NaiveDateTime,
    ) -> Result<()> {
        let person = &mut house.people[idx];
        let already = person.context == context;
        person.context = context.clone();
        let name = person.name.clone();

        house.timers.cancel(&TimerKey::ContextExpiry(name.clone()));
        house.timers.arm(
            Timer::ContextExpiry {
                person: name,
                context: context.clone(),
            },
            now + self.context_timeout,
        );
        if already {
            return Ok(());
        }

        let notice = match &context {
            Context::Announce => messages::NOW_ANNOUNCING.to_string(),
            Context::Chat { with } => messages::now_chatting(with),
            _ => return Ok(()),
        };
        let person = house.people[idx].clone();
        self.send(&person, &notice, &[]).await
    }

    // ---- backup commands ----

    async fn backup_command(
        &self,
        house: &mut Household,
        idx: usize,
        body: &str,
        media: &[String],
        now: NaiveDateTime,
    ) -> Result<String> {
        let names: Vec<String> = house.people.iter().map(|p| p.name.clone()).collect();
        let names: Vec<&str> = names.iter().map(String::as_str).collect();
        let context = house.people[idx].context.clone();
        let command = parse_backup_command(body, &context, &names);
        debug!("Backup command: {:?}", command);

        match command {
            BackupCommand::QuickSchedule => {
                self.quick_schedule(house, now).await?;
                Ok(String::new())
            }
            BackupCommand::StartSchedule => {
                self.begin_schedule(house, now).await?;
                Ok(String::new())
            }
            BackupCommand::EnterAnnounce => {
                self.enter_temporary(house, idx, Context::Announce, now)
                    .await?;
                Ok(String::new())
            }
            BackupCommand::Ready => self.ready_command(house, idx, now).await,
            BackupCommand::Announce { text } => {
                self.enter_temporary(house, idx, Context::Announce, now)
                    .await?;
                self.broadcast(house, &text, media).await
            }
            BackupCommand::AnnounceOnce { text } => {
                let text = body_or_media(&text, media);
                self.broadcast(house, &text, media).await
            }
            BackupCommand::Relay { to, text } => {
                let target = house
                    .person(&to)
                    .cloned()
                    .ok_or_else(|| RoostError::PersonNotFound(to.clone()))?;
                self.send(&target, &body_or_media(&text, media), media)
                    .await?;
                if target.name != house.people[idx].name {
                    self.enter_temporary(house, idx, Context::Chat { with: to }, now)
                        .await?;
                }
                Ok(String::new())
            }
            BackupCommand::Chat { with, text } => {
                let target = house
                    .person(&with)
                    .cloned()
                    .ok_or_else(|| RoostError::PersonNotFound(with.clone()))?;
                self.send(&target, &text, media).await?;
                self.enter_temporary(house, idx, Context::Chat { with }, now)
                    .await?;
                Ok(String::new())
            }
            BackupCommand::Reassign { name } => self.reassign_backup(house, idx, &name).await,
            BackupCommand::Unknown => Ok(messages::UNKNOWN_COMMAND.to_string()),
        }
    }

    /// Send to everyone active except the backup and people on vacation
    async fn broadcast(&self, house: &Household, text: &str, media: &[String]) -> Result<String> {
        let recipients: Vec<&Person> = house
            .people
            .iter()
            .filter(|p| p.is_active() && !p.is_backup() && p.status != PersonStatus::Vacation)
            .collect();
        for person in &recipients {
            self.send(person, text, media).await?;
        }
        info!("Announced to {} people", recipients.len());
        Ok(messages::announcement_sent(recipients.len(), text))
    }

    async fn ready_command(
        &self,
        house: &mut Household,
        idx: usize,
        now: NaiveDateTime,
    ) -> Result<String> {
        let name = house.people[idx].name.clone();
        house.timers.cancel(&TimerKey::ContextExpiry(name));
        let previous = std::mem::take(&mut house.people[idx].context);

        if house.scheduling {
            return self.ready_check(house, None, now).await;
        }
        let reply = match previous {
            Context::Announce | Context::Chat { .. } => messages::RESETTING_CONTEXT,
            Context::Assignment => {
                house.people[idx].assignment = None;
                messages::ABANDONING_ASSIGNMENT
            }
            _ => messages::YOU_ARE_READY,
        };
        Ok(reply.to_string())
    }

    /// `backup: <name>`
    async fn reassign_backup(&self, house: &mut Household, idx: usize, name: &str) -> Result<String> {
        let name = name.trim();
        let target = house
            .people
            .iter()
            .position(|p| p.name.eq_ignore_ascii_case(name))
            .ok_or_else(|| {
                RoostError::Validation(format!("Sorry, I don't know anyone named {}.", name))
            })?;
        let current = house.backup_index().unwrap_or(idx);
        if target == current {
            return Err(RoostError::Validation(format!(
                "{} is already the designated backup.",
                house.people[target].name
            )));
        }

        let old = &mut house.people[current];
        old.status = PersonStatus::Active;
        if old.context.is_temporary() {
            old.context = Context::Ready;
            let old_name = old.name.clone();
            house.timers.cancel(&TimerKey::ContextExpiry(old_name));
        }
        self.store.save_person(&house.people[current]).await?;

        house.people[target].status = PersonStatus::Backup;
        self.store.save_person(&house.people[target]).await?;

        let old_name = house.people[current].name.clone();
        let new_backup = house.people[target].clone();
        info!("Backup reassigned from {} to {}", old_name, new_backup.name);
        self.send(
            &new_backup,
            &messages::made_backup(&new_backup.name, &old_name),
            &[],
        )
        .await?;
        Ok(messages::backup_notified(&new_backup.name))
    }

    // ---- weekly cycle ----

    /// Open a weekly cycle and ask everyone about their away days
    pub async fn start_schedule(&self) -> Result<usize> {
        let mut guard = self.household.lock().await;
        let now = self.clock.now();
        self.begin_schedule(&mut guard, now).await
    }

    /// Skip the dialogue: everyone is ready, schedule now
    pub async fn run_weekly_schedule(&self) -> Result<usize> {
        let mut guard = self.household.lock().await;
        let now = self.clock.now();
        self.quick_schedule(&mut guard, now).await
    }

    #[instrument(skip(self, house))]
    async fn begin_schedule(&self, house: &mut Household, now: NaiveDateTime) -> Result<usize> {
        house.scheduling = true;
        let mut asked = 0;
        for idx in 0..house.people.len() {
            let person = &mut house.people[idx];
            if !person.is_active() || person.status == PersonStatus::Vacation {
                continue;
            }
            person.context = Context::ScheduleStart;
            let person = person.clone();
            house
                .timers
                .cancel(&TimerKey::ContextExpiry(person.name.clone()));

            let prompt = messages::schedule_start(&person.name);
            if fail_open("schedule prompt", || self.send(&person, &prompt, &[]))
                .await
                .is_some()
            {
                asked += 1;
            }
        }
        info!("Weekly schedule started, asked {} people", asked);

        if house.people.iter().all(|p| !p.is_active() || p.is_ready()) {
            self.run_cycle(house, now).await?;
        }
        Ok(asked)
    }

    async fn quick_schedule(&self, house: &mut Household, now: NaiveDateTime) -> Result<usize> {
        for person in house.people.iter_mut().filter(|p| p.is_active()) {
            if !person.is_ready() {
                house
                    .timers
                    .cancel(&TimerKey::ContextExpiry(person.name.clone()));
                person.context = Context::Ready;
                person.assignment = None;
            }
        }
        house.scheduling = true;
        self.run_cycle(house, now).await
    }

    /// Gate of the weekly cycle: plans once every active person is READY
    ///
    /// `who` just finished the dialogue; the backup hears about it. Returns the
    /// reply for the person who triggered the check.
    async fn ready_check(
        &self,
        house: &mut Household,
        who: Option<usize>,
        now: NaiveDateTime,
    ) -> Result<String> {
        if !house.scheduling {
            debug!("Ready-check outside an open cycle");
            return Ok(String::new());
        }

        let waiting: Vec<String> = house
            .people
            .iter()
            .filter(|p| p.is_active() && !p.is_ready())
            .map(|p| {
                if p.is_backup() {
                    "you".to_string()
                } else {
                    p.name.clone()
                }
            })
            .collect();

        if let Some(idx) = who {
            let person = &house.people[idx];
            if !person.is_backup() {
                if let Some(backup) = house.backup() {
                    let notice = messages::ready_notice(&person.name, &waiting);
                    fail_open("ready notice", || self.send(backup, &notice, &[])).await;
                }
            }
        }

        if !waiting.is_empty() {
            debug!("Still waiting on {}", waiting.join(", "));
            return Ok(messages::WAITING_FOR_EVERYONE.to_string());
        }
        self.run_cycle(house, now).await?;
        Ok(String::new())
    }

    /// Close the cycle, plan the week, archive the old one and send summaries
    ///
    /// Planning happens before anything is written, so an impossible week leaves
    /// the store, tasks and rotation queue untouched.
    #[instrument(skip(self, house))]
    async fn run_cycle(&self, house: &mut Household, now: NaiveDateTime) -> Result<usize> {
        house.scheduling = false;
        let today = now.date();

        let snapshot = self.store.load().await?;
        house.merge_people(snapshot.people);
        let mut tasks = snapshot.tasks;
        mark_task_dates(
            &mut tasks,
            snapshot.upcoming.iter().chain(snapshot.archive.iter()),
            today,
        );
        let queue = RotationQueue::shuffled(house.active_names(), &mut house.rng);

        let plan = match self.calendar.plan_week(&tasks, &queue, &house.people, today) {
            Ok(plan) => plan,
            Err(e) => {
                error!("Weekly scheduling aborted: {}", e);
                return Err(e);
            }
        };

        let archived = self.store.archive_upcoming(true).await?;
        self.store.append_upcoming(&plan.assignments).await?;
        debug!("Archived {} assignments", archived);

        house.assignments.retain(|a| !a.status.is_finished());
        house.assignments.extend(plan.assignments.iter().cloned());
        house.tasks = plan.tasks;
        house.queue = plan.queue;
        info!("Scheduled {} assignments", plan.assignments.len());

        for person in house.people.iter().filter(|p| p.is_active()) {
            if let Some(summary) = messages::schedule_summary(person, &plan.assignments) {
                fail_open("schedule summary", || self.send(person, &summary, &[])).await;
            }
        }
        Ok(plan.assignments.len())
    }

    // ---- ticks ----

    /// Prompt every SCHEDULED assignment due now; returns how many went out
    #[instrument(skip(self))]
    pub async fn check_due_assignments(&self) -> usize {
        let mut guard = self.household.lock().await;
        let house = &mut *guard;
        let now = self.clock.now();

        let due: Vec<AssignmentId> = house
            .assignments
            .iter()
            .filter(|a| a.is_due(now))
            .map(|a| a.id())
            .collect();

        let mut prompted = 0;
        for id in due {
            match self.prompt_assignment(house, &id, now).await {
                Ok(()) => prompted += 1,
                Err(e) if e.is_lookup() => warn!("Skipping {}: {}", id, e),
                Err(e) => error!("Failed to prompt {}: {}", id, e),
            }
        }
        prompted
    }

    async fn prompt_assignment(
        &self,
        house: &mut Household,
        id: &str,
        now: NaiveDateTime,
    ) -> Result<()> {
        let ai = house
            .assignment_index(id)
            .ok_or_else(|| RoostError::AssignmentNotFound(id.to_string()))?;
        let assignment = &house.assignments[ai];
        let pi = house
            .person_index(&assignment.person)
            .ok_or_else(|| RoostError::PersonNotFound(assignment.person.clone()))?;
        let task = house
            .task(&assignment.task)
            .cloned()
            .ok_or_else(|| RoostError::TaskNotFound(assignment.task.clone()))?;

        self.lifecycle
            .mark_pending(&mut house.assignments[ai], &*self.store, &mut house.timers, now)
            .await?;
        house.people[pi].context = Context::Assignment;
        house.people[pi].assignment = Some(id.to_string());

        let person = house.people[pi].clone();
        if person.call {
            match self.place_call(house, &person, id).await {
                Ok(()) => return Ok(()),
                Err(e) => warn!("Call to {} failed, texting instead: {}", person.name, e),
            }
        }
        self.send(&person, &messages::task_prompt(&person.name, &task.question), &[])
            .await
    }

    async fn place_call(&self, house: &mut Household, person: &Person, id: &str) -> Result<()> {
        let call_id = Uuid::new_v4().to_string();
        let urls = CallbackUrls::for_call(&self.public_url, &call_id);
        house.calls.insert(
            call_id.clone(),
            ActiveCall {
                person: person.name.clone(),
                assignment: id.to_string(),
            },
        );
        if let Err(e) = self.voice.initiate_call(person, &urls).await {
            house.calls.remove(&call_id);
            return Err(e);
        }
        info!("Calling {} about {} (call {})", person.name, id, call_id);
        Ok(())
    }

    /// Fire every timer whose deadline has passed; returns how many fired
    #[instrument(skip(self))]
    pub async fn fire_due_timers(&self) -> usize {
        let mut guard = self.household.lock().await;
        let house = &mut *guard;
        let due = house.timers.take_due(self.clock.now());
        let fired = due.len();
        for timer in due {
            match timer {
                Timer::Escalation { assignment } => self.escalate(house, &assignment).await,
                Timer::ContextExpiry { person, context } => {
                    self.expire_context(house, &person, &context).await
                }
            }
        }
        fired
    }

    async fn escalate(&self, house: &Household, id: &str) {
        let Some(assignment) = house.assignment(id) else {
            warn!("Escalation for unknown assignment {}", id);
            return;
        };
        if assignment.status != AssignmentStatus::Pending {
            debug!("{} is {}, no escalation", id, assignment.status);
            return;
        }
        let Some(backup) = house.backup() else {
            error!("No backup to escalate {} to", id);
            return;
        };
        warn!("{} still pending, escalating to {}", id, backup.name);
        let notice = messages::overdue(
            &assignment.task,
            &assignment.person,
            self.lifecycle.escalate_after(),
        );
        fail_open("escalation", || self.send(backup, &notice, &[])).await;
    }

    async fn expire_context(&self, house: &mut Household, name: &str, context: &Context) {
        let Some(pi) = house.person_index(name) else {
            warn!("Context expiry for unknown person {}", name);
            return;
        };
        if house.people[pi].context != *context {
            debug!("{} already left {}", name, context);
            return;
        }
        house.people[pi].context = Context::Ready;
        info!("{} timed out of {}", name, context);

        let notice = match context {
            Context::Announce => messages::DONE_ANNOUNCING.to_string(),
            Context::Chat { with } => messages::done_chatting(with),
            _ => return,
        };
        let person = house.people[pi].clone();
        fail_open("context expiry notice", || self.send(&person, &notice, &[])).await;
    }

    // ---- voice ----

    pub async fn handle_voice_prompt(&self, call_id: &str) -> VoiceScript {
        let house = self.household.lock().await;
        match self.voice_prompt(&house, call_id) {
            Ok(script) => script,
            Err(e) => {
                warn!("Voice prompt for {}: {}", call_id, e);
                VoiceScript::apology()
            }
        }
    }

    fn voice_prompt(&self, house: &Household, call_id: &str) -> Result<VoiceScript> {
        let call = house
            .calls
            .get(call_id)
            .ok_or_else(|| RoostError::CallNotFound(call_id.to_string()))?;
        let assignment = house
            .assignment(&call.assignment)
            .ok_or_else(|| RoostError::AssignmentNotFound(call.assignment.clone()))?;
        let task = house
            .task(&assignment.task)
            .ok_or_else(|| RoostError::TaskNotFound(assignment.task.clone()))?;
        let urls = CallbackUrls::for_call(&self.public_url, call_id);
        Ok(VoiceScript::new()
            .say(messages::voice_prompt(&call.person, &task.question))
            .gather(urls.digits, 1))
    }

    pub async fn handle_voice_digits(&self, call_id: &str, digits: &str) -> VoiceScript {
        let mut guard = self.household.lock().await;
        let now = self.clock.now();
        match self.voice_digits(&mut guard, call_id, digits, now).await {
            Ok(script) => script,
            Err(e) => {
                warn!("Voice digits for {}: {}", call_id, e);
                VoiceScript::apology()
            }
        }
    }

    async fn voice_digits(
        &self,
        house: &mut Household,
        call_id: &str,
        digits: &str,
        now: NaiveDateTime,
    ) -> Result<VoiceScript> {
        let call = house
            .calls
            .get(call_id)
            .cloned()
            .ok_or_else(|| RoostError::CallNotFound(call_id.to_string()))?;
        let ai = house
            .assignment_index(&call.assignment)
            .ok_or_else(|| RoostError::AssignmentNotFound(call.assignment.clone()))?;
        info!("{} pressed {} on call {}", call.person, digits, call_id);

        match digits.trim() {
            "1" => {
                self.lifecycle
                    .mark_done(&mut house.assignments[ai], &*self.store, &mut house.timers, now)
                    .await?;
                if let Some(pi) = house.person_index(&call.person) {
                    let person = &mut house.people[pi];
                    if person.assignment.as_deref() == Some(call.assignment.as_str()) {
                        person.assignment = None;
                        if person.context == Context::Assignment {
                            person.context = Context::Ready;
                        }
                    }
                }
                Ok(VoiceScript::new()
                    .say(messages::affirmation(true))
                    .say(messages::GOODBYE)
                    .hangup())
            }
            "2" => {
                let until = self
                    .lifecycle
                    .snooze(&mut house.assignments[ai], &*self.store, &mut house.timers, now)
                    .await?;
                Ok(VoiceScript::new()
                    .say(messages::voice_snoozed(until.time()))
                    .say(messages::GOODBYE)
                    .hangup())
            }
            _ => {
                let urls = CallbackUrls::for_call(&self.public_url, call_id);
                Ok(VoiceScript::new()
                    .say(messages::VOICE_INSTRUCTIONS)
                    .gather(urls.digits, 1))
            }
        }
    }

    /// Call ended; if nobody answered the prompt goes out by text instead
    #[instrument(skip(self))]
    pub async fn handle_voice_status(&self, call_id: &str, status: &str) -> Result<()> {
        let mut guard = self.household.lock().await;
        let house = &mut *guard;
        let call = house
            .calls
            .remove(call_id)
            .ok_or_else(|| RoostError::CallNotFound(call_id.to_string()))?;
        info!("Call {} to {} ended: {}", call_id, call.person, status);

        let assignment = house
            .assignment(&call.assignment)
            .ok_or_else(|| RoostError::AssignmentNotFound(call.assignment.clone()))?;
        if assignment.status != AssignmentStatus::Pending {
            return Ok(());
        }
        let task = house
            .task(&assignment.task)
            .ok_or_else(|| RoostError::TaskNotFound(assignment.task.clone()))?;
        let person = house
            .person(&call.person)
            .ok_or_else(|| RoostError::PersonNotFound(call.person.clone()))?;
        info!("No answer from {}, texting instead", person.name);
        self.send(person, &messages::task_prompt(&person.name, &task.question), &[])
            .await
    }

    async fn send(&self, to: &Person, body: &str, media: &[String]) -> Result<()> {
        info!("Sending to {}: {}", to.name, body);
        self.messages.send(to, body, media).await
    }
}
