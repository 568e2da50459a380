//! End-to-end flows through the dispatcher.
//!
//! Every test drives a household of three (Alex is the backup) with a manual
//! clock, an in-memory store and a recording transport.

use chrono::{Duration, NaiveDate, NaiveDateTime, NaiveTime};
use roost_core::{
    Assignment, AssignmentStatus, AwayDay, Context, HalfDay, Person, PersonStatus, RoostConfig,
    RoostError, Task, TaskTime,
};
use roost_engine::messages;
use roost_engine::{
    reply_text, Dispatcher, InboundMessage, ManualClock, MemoryStore, RecordingTransport,
    Snapshot, Store, TimerKey,
};
use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

const ALEX: &str = "555-000-0001";
const BLAIR: &str = "(555) 000-0002";
const SAM: &str = "5550000003";

// 2026-06-14 is a Sunday
fn date(d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 6, d).unwrap()
}

fn at(d: u32, h: u32, m: u32) -> NaiveDateTime {
    date(d).and_hms_opt(h, m, 0).unwrap()
}

fn feed_task() -> Task {
    Task::new(
        "Feed",
        1,
        TaskTime::At(NaiveTime::from_hms_opt(8, 0, 0).unwrap()),
        "did you feed the chickens?",
    )
}

fn household() -> Snapshot {
    Snapshot::default()
        .with_person(Person::new("Alex", ALEX).with_status(PersonStatus::Backup))
        .with_person(Person::new("Blair", BLAIR))
        .with_person(Person::new("Sam", SAM))
        .with_task(feed_task())
}

struct Harness {
    dispatcher: Dispatcher,
    store: Arc<MemoryStore>,
    transport: Arc<RecordingTransport>,
    clock: Arc<ManualClock>,
}

impl Harness {
    async fn new(snapshot: Snapshot, now: NaiveDateTime) -> Self {
        let store = Arc::new(MemoryStore::with_snapshot(snapshot));
        let transport = Arc::new(RecordingTransport::new());
        let clock = Arc::new(ManualClock::new(now));
        let dispatcher = Dispatcher::new(
            store.clone(),
            transport.clone(),
            transport.clone(),
            clock.clone(),
            &RoostConfig::default(),
        )
        .with_seed(7);
        dispatcher.load().await.unwrap();
        Self {
            dispatcher,
            store,
            transport,
            clock,
        }
    }

    async fn text(&self, from: &str, body: &str) -> String {
        let result = self
            .dispatcher
            .handle_inbound_message(InboundMessage::new(from, body))
            .await;
        reply_text(&result)
    }

    fn bodies_to(&self, name: &str) -> Vec<String> {
        self.transport
            .messages_to(name)
            .into_iter()
            .map(|m| m.body)
            .collect()
    }
}

fn seeded_prompt(person: &str, h: u32) -> Assignment {
    Assignment::new(
        "Feed",
        person,
        date(14),
        NaiveTime::from_hms_opt(h, 0, 0).unwrap(),
    )
}

#[tokio::test]
async fn test_weekly_dialogue_with_away_days() {
    let h = Harness::new(household(), at(14, 18, 0)).await;

    let asked = h.dispatcher.start_schedule().await.unwrap();
    assert_eq!(asked, 3);
    assert_eq!(h.bodies_to("Blair"), vec![messages::schedule_start("Blair")]);

    assert_eq!(h.text(BLAIR, "yes").await, messages::ASK_AWAY_DAYS);
    let reply = h.text(BLAIR, "Mon, 6/20").await;
    assert!(reply.contains("Mon 6/15"));
    assert!(reply.contains("Sat 6/20"));

    assert_eq!(h.text(BLAIR, "n").await, messages::away_time(date(15)));
    assert_eq!(h.text(BLAIR, "maybe").await, messages::AM_PM_OR_FULL);
    assert_eq!(h.text(BLAIR, "am").await, messages::away_time(date(20)));
    let confirm = h.text(BLAIR, "full").await;
    assert!(confirm.contains("Do those look right"));
    assert_eq!(h.text(BLAIR, "Y").await, messages::WAITING_FOR_EVERYONE);

    let view = h.dispatcher.snapshot().await;
    let blair = view.person("Blair").unwrap();
    assert_eq!(
        blair.away,
        vec![
            AwayDay::full(date(15)).with_part(HalfDay::Morning),
            AwayDay::full(date(20)).with_part(HalfDay::FullDay),
        ]
    );
    assert!(view.scheduling);

    // The backup hears about each person who finishes
    let to_alex = h.bodies_to("Alex");
    assert!(to_alex.contains(&messages::ready_notice(
        "Blair",
        &["you".to_string(), "Sam".to_string()]
    )));

    assert_eq!(h.text(SAM, "no").await, messages::WAITING_FOR_EVERYONE);
    assert_eq!(h.text(ALEX, "nope").await, "");

    let view = h.dispatcher.snapshot().await;
    assert!(!view.scheduling);
    assert_eq!(view.assignments.len(), 7);
    for a in view.assignments.iter().filter(|a| a.person == "Blair") {
        assert_ne!(a.date, date(15));
        assert_ne!(a.date, date(20));
    }
    assert_eq!(h.store.load().await.unwrap().upcoming.len(), 7);

    // Away days were persisted with the person
    let stored = h.store.load().await.unwrap();
    assert_eq!(stored.person("Blair").unwrap().away.len(), 2);
}

#[tokio::test]
async fn test_ready_check_plans_only_once() {
    let h = Harness::new(household(), at(14, 18, 0)).await;
    h.dispatcher.start_schedule().await.unwrap();

    h.text(BLAIR, "n").await;
    h.text(SAM, "n").await;
    h.text(ALEX, "n").await;
    assert_eq!(h.dispatcher.snapshot().await.assignments.len(), 7);

    // Nothing is open any more; "ready" just resets the backup
    assert_eq!(h.text(ALEX, "ready").await, messages::YOU_ARE_READY);
    let view = h.dispatcher.snapshot().await;
    assert_eq!(view.assignments.len(), 7);
    assert_eq!(h.store.load().await.unwrap().upcoming.len(), 7);
}

#[tokio::test]
async fn test_confirm_no_starts_over() {
    let h = Harness::new(household(), at(14, 18, 0)).await;
    h.dispatcher.start_schedule().await.unwrap();

    h.text(SAM, "y").await;
    h.text(SAM, "tue").await;
    h.text(SAM, "yes").await;
    let view = h.dispatcher.snapshot().await;
    assert_eq!(view.person("Sam").unwrap().context, Context::Ready);
    assert_eq!(view.person("Sam").unwrap().away.len(), 1);

    h.dispatcher.start_schedule().await.unwrap();
    h.text(SAM, "y").await;
    h.text(SAM, "wed").await;
    h.text(SAM, "n").await;
    h.text(SAM, "pm").await;
    assert_eq!(h.text(SAM, "no").await, messages::START_OVER);

    let view = h.dispatcher.snapshot().await;
    let sam = view.person("Sam").unwrap();
    assert_eq!(sam.context, Context::ScheduleStart);
    assert_eq!(
        sam.away,
        vec![AwayDay::full(date(16)).with_part(HalfDay::FullDay)]
    );
}

#[tokio::test]
async fn test_quick_schedule_skips_the_dialogue() {
    let h = Harness::new(household(), at(14, 18, 0)).await;
    h.dispatcher.start_schedule().await.unwrap();
    h.text(BLAIR, "y").await;

    // The backup is mid-dialogue too, so the forced run comes from the API
    assert_eq!(h.dispatcher.run_weekly_schedule().await.unwrap(), 7);
    let view = h.dispatcher.snapshot().await;
    assert!(!view.scheduling);
    assert_eq!(view.assignments.len(), 7);
    assert!(view.people.iter().all(|p| p.context == Context::Ready));
    assert!(h
        .bodies_to("Sam")
        .iter()
        .any(|b| b.contains("here are your scheduled tasks")));

    h.dispatcher.start_schedule().await.unwrap();
    h.text(ALEX, "n").await;
    h.text(BLAIR, "n").await;
    assert!(h.dispatcher.snapshot().await.scheduling);
    assert_eq!(h.text(SAM, "hi").await, messages::YES_OR_NO);
}

#[tokio::test]
async fn test_quick_schedule_by_text() {
    let h = Harness::new(household(), at(14, 18, 0)).await;
    assert_eq!(h.text(ALEX, "Schedule!").await, "");
    assert_eq!(h.dispatcher.snapshot().await.assignments.len(), 7);
}

#[tokio::test]
async fn test_impossible_week_changes_nothing() {
    let everyone_away: Vec<AwayDay> = (15..=21).map(|d| AwayDay::full(date(d))).collect();
    let snapshot = Snapshot::default()
        .with_person(Person::new("Blair", BLAIR).with_away(everyone_away.clone()))
        .with_person(Person::new("Sam", SAM).with_away(everyone_away))
        .with_task(feed_task());
    let h = Harness::new(snapshot, at(14, 18, 0)).await;
    let before = h.dispatcher.snapshot().await;

    let err = h.dispatcher.run_weekly_schedule().await.unwrap_err();
    assert!(matches!(err, RoostError::SchedulingImpossible(_)));

    let after = h.dispatcher.snapshot().await;
    assert_eq!(after.queue, before.queue);
    assert!(after.assignments.is_empty());
    assert_eq!(after.tasks[0].next_run, before.tasks[0].next_run);
    assert!(h.store.load().await.unwrap().upcoming.is_empty());
}

#[tokio::test]
async fn test_escalation_fires_exactly_once() {
    let snapshot = household().with_upcoming(seeded_prompt("Blair", 9));
    let h = Harness::new(snapshot, at(14, 9, 0)).await;
    let id = seeded_prompt("Blair", 9).id();

    assert_eq!(h.dispatcher.check_due_assignments().await, 1);
    assert_eq!(
        h.bodies_to("Blair"),
        vec![messages::task_prompt("Blair", "did you feed the chickens?")]
    );
    assert_eq!(
        h.dispatcher
            .timer_deadline(&TimerKey::Escalation(id.clone()))
            .await,
        Some(at(14, 10, 0))
    );

    h.clock.set(at(14, 9, 59));
    assert_eq!(h.dispatcher.fire_due_timers().await, 0);
    assert_eq!(h.dispatcher.check_due_assignments().await, 0);

    h.clock.set(at(14, 10, 0));
    assert_eq!(h.dispatcher.fire_due_timers().await, 1);
    h.clock.set(at(14, 11, 0));
    assert_eq!(h.dispatcher.fire_due_timers().await, 0);

    let overdue = messages::overdue("Feed", "Blair", Duration::hours(1));
    let to_alex = h.bodies_to("Alex");
    assert_eq!(to_alex.iter().filter(|b| **b == overdue).count(), 1);
}

#[tokio::test]
async fn test_snooze_then_done() {
    let snapshot = household().with_upcoming(seeded_prompt("Blair", 9));
    let h = Harness::new(snapshot, at(14, 9, 0)).await;
    let id = seeded_prompt("Blair", 9).id();
    h.dispatcher.check_due_assignments().await;

    h.clock.set(at(14, 9, 10));
    let reply = h.text(BLAIR, "Snooze").await;
    assert_eq!(
        reply,
        messages::snoozed(NaiveTime::from_hms_opt(10, 10, 0).unwrap())
    );
    assert_eq!(
        h.dispatcher
            .timer_deadline(&TimerKey::Escalation(id.clone()))
            .await,
        None
    );

    h.clock.set(at(14, 10, 0));
    assert_eq!(h.dispatcher.fire_due_timers().await, 0);
    assert_eq!(h.dispatcher.check_due_assignments().await, 0);

    h.clock.set(at(14, 10, 10));
    assert_eq!(h.dispatcher.check_due_assignments().await, 1);
    assert_eq!(h.bodies_to("Blair").len(), 2);

    h.clock.set(at(14, 10, 20));
    let reply = h.text(BLAIR, "yes").await;
    assert!(!reply.is_empty());

    let view = h.dispatcher.snapshot().await;
    let done = view.assignment(&id).unwrap();
    assert_eq!(done.status, AssignmentStatus::Done);
    assert_eq!(done.completed_at, Some(at(14, 10, 20)));
    assert_eq!(view.person("Blair").unwrap().context, Context::Ready);

    h.clock.set(at(14, 12, 0));
    assert_eq!(h.dispatcher.fire_due_timers().await, 0);
    assert!(h.bodies_to("Alex").is_empty());

    let stored = h.store.load().await.unwrap();
    assert_eq!(stored.upcoming[0].status, AssignmentStatus::Done);
}

#[tokio::test]
async fn test_pending_assignment_survives_restart() {
    let mut pending = seeded_prompt("Sam", 8);
    pending.status = AssignmentStatus::Pending;
    let h = Harness::new(household().with_upcoming(pending.clone()), at(14, 8, 30)).await;

    let view = h.dispatcher.snapshot().await;
    assert_eq!(view.person("Sam").unwrap().context, Context::Assignment);
    assert_eq!(
        h.dispatcher
            .timer_deadline(&TimerKey::Escalation(pending.id()))
            .await,
        Some(at(14, 9, 30))
    );

    h.text(SAM, "y").await;
    let view = h.dispatcher.snapshot().await;
    assert_eq!(
        view.assignment(&pending.id()).unwrap().status,
        AssignmentStatus::Done
    );
}

#[tokio::test]
async fn test_relay_and_chat_expiry() {
    let h = Harness::new(household(), at(14, 12, 0)).await;

    assert_eq!(h.text(BLAIR, "Is there more feed?").await, "");
    assert_eq!(
        h.bodies_to("Alex"),
        vec![
            messages::relayed("Blair", "Is there more feed?"),
            messages::now_chatting("Blair"),
        ]
    );

    h.text(ALEX, "In the garage").await;
    assert_eq!(h.bodies_to("Blair"), vec!["In the garage".to_string()]);

    h.clock.set(at(14, 12, 30));
    h.text(ALEX, "Top shelf").await;
    assert_eq!(
        h.dispatcher
            .timer_deadline(&TimerKey::ContextExpiry("Alex".to_string()))
            .await,
        Some(at(14, 13, 30))
    );

    h.clock.set(at(14, 13, 0));
    assert_eq!(h.dispatcher.fire_due_timers().await, 0);
    h.clock.set(at(14, 13, 30));
    assert_eq!(h.dispatcher.fire_due_timers().await, 1);

    let view = h.dispatcher.snapshot().await;
    assert_eq!(view.person("Alex").unwrap().context, Context::Ready);
    assert_eq!(
        h.bodies_to("Alex").last().unwrap(),
        &messages::done_chatting("Blair")
    );
}

#[tokio::test]
async fn test_backup_relay_switches_chat() {
    let h = Harness::new(household(), at(14, 12, 0)).await;

    assert_eq!(h.text(ALEX, "sam: dinner at 6").await, "");
    assert_eq!(h.bodies_to("Sam"), vec!["dinner at 6".to_string()]);
    let view = h.dispatcher.snapshot().await;
    assert_eq!(
        view.person("Alex").unwrap().context,
        Context::Chat {
            with: "Sam".to_string()
        }
    );

    assert_eq!(h.text(ALEX, "ready").await, messages::RESETTING_CONTEXT);
    let view = h.dispatcher.snapshot().await;
    assert_eq!(view.person("Alex").unwrap().context, Context::Ready);
    assert_eq!(view.timers, 0);
}

#[tokio::test]
async fn test_announce_skips_vacation() {
    let snapshot = Snapshot::default()
        .with_person(Person::new("Alex", ALEX).with_status(PersonStatus::Backup))
        .with_person(Person::new("Blair", BLAIR))
        .with_person(Person::new("Sam", SAM).with_status(PersonStatus::Vacation))
        .with_task(feed_task());
    let h = Harness::new(snapshot, at(14, 12, 0)).await;

    assert_eq!(h.text(ALEX, "announce").await, "");
    assert_eq!(h.bodies_to("Alex"), vec![messages::NOW_ANNOUNCING.to_string()]);

    let reply = h.text(ALEX, "Coop door is broken").await;
    assert_eq!(reply, messages::announcement_sent(1, "Coop door is broken"));
    assert_eq!(h.bodies_to("Blair"), vec!["Coop door is broken".to_string()]);
    assert!(h.bodies_to("Sam").is_empty());

    h.clock.advance(Duration::minutes(61));
    assert_eq!(h.dispatcher.fire_due_timers().await, 1);
    assert_eq!(
        h.bodies_to("Alex").last().unwrap(),
        messages::DONE_ANNOUNCING
    );

    let reply = h.text(ALEX, "announce: Eggs in the fridge").await;
    assert_eq!(reply, messages::announcement_sent(1, "Eggs in the fridge"));
    let view = h.dispatcher.snapshot().await;
    assert_eq!(view.person("Alex").unwrap().context, Context::Ready);
}

#[tokio::test]
async fn test_reassign_backup() {
    let h = Harness::new(household(), at(14, 12, 0)).await;

    let reply = h.text(ALEX, "backup: blair").await;
    assert_eq!(reply, messages::backup_notified("Blair"));
    assert_eq!(
        h.bodies_to("Blair"),
        vec![messages::made_backup("Blair", "Alex")]
    );

    let stored = h.store.load().await.unwrap();
    assert_eq!(stored.person("Alex").unwrap().status, PersonStatus::Active);
    assert_eq!(stored.person("Blair").unwrap().status, PersonStatus::Backup);

    assert_eq!(
        h.text(BLAIR, "backup: Blair").await,
        "Blair is already the designated backup."
    );
    assert_eq!(
        h.text(BLAIR, "backup: Morgan").await,
        "Sorry, I don't know anyone named Morgan."
    );
}

#[tokio::test]
async fn test_voice_prompt_flow() {
    let snapshot = Snapshot::default()
        .with_person(Person::new("Alex", ALEX).with_status(PersonStatus::Backup))
        .with_person(Person::new("Blair", BLAIR).with_call(true))
        .with_task(feed_task())
        .with_upcoming(seeded_prompt("Blair", 9));
    let h = Harness::new(snapshot, at(14, 9, 0)).await;
    let id = seeded_prompt("Blair", 9).id();

    assert_eq!(h.dispatcher.check_due_assignments().await, 1);
    let calls = h.transport.calls();
    assert_eq!(calls.len(), 1);
    assert!(h.bodies_to("Blair").is_empty());
    let call_id = calls[0]
        .callbacks
        .prompt
        .rsplit('/')
        .next()
        .unwrap()
        .to_string();

    let script = h.dispatcher.handle_voice_prompt(&call_id).await;
    assert!(script.spoken_text().contains("did you feed the chickens?"));
    assert!(script.gathers());

    let script = h.dispatcher.handle_voice_digits(&call_id, "7").await;
    assert!(script.spoken_text().contains("Please press 1"));
    assert!(!script.hangs_up());

    let script = h.dispatcher.handle_voice_digits(&call_id, "2").await;
    assert!(script.hangs_up());
    let view = h.dispatcher.snapshot().await;
    assert_eq!(view.assignment(&id).unwrap().status, AssignmentStatus::Scheduled);

    // Finished call with nothing pending sends no text
    h.dispatcher
        .handle_voice_status(&call_id, "completed")
        .await
        .unwrap();
    assert!(h.bodies_to("Blair").is_empty());

    h.clock.set(at(14, 10, 0));
    assert_eq!(h.dispatcher.check_due_assignments().await, 1);
    let second = h.transport.calls()[1]
        .callbacks
        .prompt
        .rsplit('/')
        .next()
        .unwrap()
        .to_string();
    let script = h.dispatcher.handle_voice_digits(&second, "1").await;
    assert!(script.spoken_text().ends_with(messages::GOODBYE));

    let view = h.dispatcher.snapshot().await;
    assert_eq!(view.assignment(&id).unwrap().status, AssignmentStatus::Done);
    assert_eq!(view.person("Blair").unwrap().context, Context::Ready);

    let script = h.dispatcher.handle_voice_prompt("no-such-call").await;
    assert_eq!(script, roost_engine::VoiceScript::apology());
}

#[tokio::test]
async fn test_unanswered_call_falls_back_to_text() {
    let snapshot = Snapshot::default()
        .with_person(Person::new("Alex", ALEX).with_status(PersonStatus::Backup))
        .with_person(Person::new("Blair", BLAIR).with_call(true))
        .with_task(feed_task())
        .with_upcoming(seeded_prompt("Blair", 9));
    let h = Harness::new(snapshot, at(14, 9, 0)).await;

    h.dispatcher.check_due_assignments().await;
    let call_id = h.transport.calls()[0]
        .callbacks
        .prompt
        .rsplit('/')
        .next()
        .unwrap()
        .to_string();

    h.dispatcher
        .handle_voice_status(&call_id, "no-answer")
        .await
        .unwrap();
    assert_eq!(
        h.bodies_to("Blair"),
        vec![messages::task_prompt("Blair", "did you feed the chickens?")]
    );
    assert!(matches!(
        h.dispatcher.handle_voice_status(&call_id, "completed").await,
        Err(RoostError::CallNotFound(_))
    ));
}

#[tokio::test]
async fn test_unknown_sender_and_delivery_failure() {
    let h = Harness::new(household(), at(14, 12, 0)).await;

    assert_eq!(h.text("5559999999", "hi").await, messages::UNKNOWN_SENDER);

    h.transport.set_failing(true);
    assert_eq!(h.text(BLAIR, "hello?").await, messages::SOMETHING_WENT_WRONG);
}

#[tokio::test]
async fn test_media_only_message_is_relayed() {
    let h = Harness::new(household(), at(14, 12, 0)).await;
    let message = InboundMessage::new(SAM, "").with_media("https://media.example/1.jpg");
    h.dispatcher.handle_inbound_message(message).await.unwrap();

    let to_alex = h.transport.messages_to("Alex");
    assert_eq!(to_alex[0].body, messages::relayed("Sam", messages::MEDIA_ONLY));
    assert_eq!(to_alex[0].media, vec!["https://media.example/1.jpg".to_string()]);
}

/// Memory store whose assignment writes can be switched off
struct FlakyStore {
    inner: MemoryStore,
    down: AtomicBool,
}

#[async_trait]
impl Store for FlakyStore {
    async fn load(&self) -> roost_core::Result<Snapshot> {
        self.inner.load().await
    }

    async fn save_person(&self, person: &Person) -> roost_core::Result<()> {
        self.inner.save_person(person).await
    }

    async fn save_assignment(&self, assignment: &Assignment) -> roost_core::Result<()> {
        if self.down.load(Ordering::SeqCst) {
            return Err(RoostError::Store("down".to_string()));
        }
        self.inner.save_assignment(assignment).await
    }

    async fn append_upcoming(&self, assignments: &[Assignment]) -> roost_core::Result<()> {
        self.inner.append_upcoming(assignments).await
    }

    async fn archive_upcoming(&self, keep_unfinished: bool) -> roost_core::Result<usize> {
        self.inner.archive_upcoming(keep_unfinished).await
    }
}

#[tokio::test]
async fn test_failed_done_can_be_retried() {
    let store = Arc::new(FlakyStore {
        inner: MemoryStore::with_snapshot(household().with_upcoming(seeded_prompt("Blair", 9))),
        down: AtomicBool::new(false),
    });
    let transport = Arc::new(RecordingTransport::new());
    let clock = Arc::new(ManualClock::new(at(14, 9, 0)));
    let dispatcher = Dispatcher::new(
        store.clone(),
        transport.clone(),
        transport.clone(),
        clock.clone(),
        &RoostConfig::default(),
    )
    .with_seed(7);
    dispatcher.load().await.unwrap();
    let id = seeded_prompt("Blair", 9).id();
    assert_eq!(dispatcher.check_due_assignments().await, 1);

    store.down.store(true, Ordering::SeqCst);
    clock.set(at(14, 9, 5));
    let err = dispatcher
        .handle_inbound_message(InboundMessage::new(BLAIR, "yes"))
        .await
        .unwrap_err();
    assert!(matches!(err, RoostError::Store(_)));

    // Still prompted, still pending, escalation still armed
    let view = dispatcher.snapshot().await;
    let blair = view.person("Blair").unwrap();
    assert_eq!(blair.context, Context::Assignment);
    assert_eq!(blair.assignment.as_deref(), Some(id.as_str()));
    assert_eq!(view.assignment(&id).unwrap().status, AssignmentStatus::Pending);
    assert_eq!(
        dispatcher.timer_deadline(&TimerKey::Escalation(id.clone())).await,
        Some(at(14, 10, 0))
    );
    assert_eq!(
        store.load().await.unwrap().upcoming[0].status,
        AssignmentStatus::Pending
    );

    store.down.store(false, Ordering::SeqCst);
    assert!(dispatcher
        .handle_inbound_message(InboundMessage::new(BLAIR, "yes"))
        .await
        .is_ok());

    let view = dispatcher.snapshot().await;
    let blair = view.person("Blair").unwrap();
    assert_eq!(blair.context, Context::Ready);
    assert_eq!(blair.assignment, None);
    assert_eq!(view.assignment(&id).unwrap().status, AssignmentStatus::Done);
    assert_eq!(
        dispatcher.timer_deadline(&TimerKey::Escalation(id)).await,
        None
    );
    assert_eq!(
        store.load().await.unwrap().upcoming[0].status,
        AssignmentStatus::Done
    );

    // The retry completed the task instead of opening a chat with the backup
    let to_alex: Vec<String> = transport
        .messages_to("Alex")
        .into_iter()
        .map(|m| m.body)
        .collect();
    assert!(!to_alex.contains(&messages::relayed("Blair", "yes")));
    assert!(!to_alex.contains(&messages::now_chatting("Blair")));

    clock.set(at(14, 10, 0));
    assert_eq!(dispatcher.fire_due_timers().await, 0);
}

