//! Tests for the monitoring job: detection, notification dedup and
//! partial-failure behaviour, driven through in-memory fakes of the three
//! collaborator ports.

use async_trait::async_trait;
use parcel_guardian::carrier::{CarrierProvider, SimulatedCarrier};
use parcel_guardian::entity::{exception_rule, tracking, tracking_exception};
use parcel_guardian::error::{CarrierError, MonitorError, NotifyError};
use parcel_guardian::matcher::MatchMode;
use parcel_guardian::monitor::MonitorJob;
use parcel_guardian::monitor::store::{DetectedException, MonitorStore, PendingNotification};
use parcel_guardian::notify::{Notifier, OutboundEmail};
use sea_orm::DbErr;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use time::OffsetDateTime;
use uuid::Uuid;

// =============================================================================
// In-memory fakes
// =============================================================================

#[derive(Default)]
struct StoreState {
    trackings: Vec<tracking::Model>,
    rules: Vec<exception_rule::Model>,
    user_emails: HashMap<Uuid, String>,
    exceptions: Vec<tracking_exception::Model>,
    email_log: Vec<(Uuid, String, String)>,
    fail_active_trackings: bool,
    fail_rules: bool,
}

#[derive(Clone)]
struct InMemoryStore {
    state: Arc<Mutex<StoreState>>,
}

impl InMemoryStore {
    fn new(state: StoreState) -> (Self, Arc<Mutex<StoreState>>) {
        let shared = Arc::new(Mutex::new(state));
        (
            Self {
                state: shared.clone(),
            },
            shared,
        )
    }
}

#[async_trait]
impl MonitorStore for InMemoryStore {
    async fn active_trackings(&self) -> Result<Vec<tracking::Model>, DbErr> {
        let state = self.state.lock().unwrap();
        if state.fail_active_trackings {
            return Err(DbErr::Custom("store unreachable".into()));
        }
        Ok(state
            .trackings
            .iter()
            .filter(|t| t.status == "active" && t.delivered_at.is_none())
            .cloned()
            .collect())
    }

    async fn notify_rules(&self) -> Result<Vec<exception_rule::Model>, DbErr> {
        let state = self.state.lock().unwrap();
        if state.fail_rules {
            return Err(DbErr::Custom("store unreachable".into()));
        }
        Ok(state.rules.clone())
    }

    async fn user_email(&self, user_id: Uuid) -> Result<Option<String>, DbErr> {
        Ok(self.state.lock().unwrap().user_emails.get(&user_id).cloned())
    }

    async fn record_exception(
        &self,
        detection: &DetectedException,
        now: OffsetDateTime,
    ) -> Result<Uuid, DbErr> {
        let mut state = self.state.lock().unwrap();
        let exception_id = Uuid::new_v4();
        state.exceptions.push(tracking_exception::Model {
            id: exception_id,
            tracking_id: detection.tracking_id,
            exception_type: detection.exception_type.clone(),
            severity: detection.severity.clone(),
            status_raw: detection.status_raw.clone(),
            email_sent: false,
            email_sent_at: None,
            created_at: now,
        });
        if let Some(t) = state
            .trackings
            .iter_mut()
            .find(|t| t.id == detection.tracking_id)
        {
            t.status = "exception".to_string();
            t.flow_stage = "exception".to_string();
            t.last_status_raw = Some(detection.status_raw.clone());
            t.last_checked_at = Some(now);
        }
        Ok(exception_id)
    }

    async fn pending_notifications(&self) -> Result<Vec<PendingNotification>, DbErr> {
        let state = self.state.lock().unwrap();
        let mut out = Vec::new();
        for e in state.exceptions.iter().filter(|e| !e.email_sent) {
            let Some(t) = state.trackings.iter().find(|t| t.id == e.tracking_id) else {
                continue;
            };
            out.push(PendingNotification {
                exception_id: e.id,
                tracking_id: t.id,
                tracking_code: t.tracking_code.clone(),
                user_id: t.user_id,
                status_raw: e.status_raw.clone(),
            });
        }
        Ok(out)
    }

    async fn mark_notified(
        &self,
        exception_id: Uuid,
        tracking_id: Uuid,
        now: OffsetDateTime,
    ) -> Result<(), DbErr> {
        let mut state = self.state.lock().unwrap();
        if let Some(e) = state
            .exceptions
            .iter_mut()
            .find(|e| e.id == exception_id && !e.email_sent)
        {
            e.email_sent = true;
            e.email_sent_at = Some(now);
        }
        if let Some(t) = state.trackings.iter_mut().find(|t| t.id == tracking_id) {
            t.alert_sent = true;
        }
        Ok(())
    }

    async fn touch_last_checked(
        &self,
        tracking_id: Uuid,
        now: OffsetDateTime,
    ) -> Result<(), DbErr> {
        let mut state = self.state.lock().unwrap();
        if let Some(t) = state.trackings.iter_mut().find(|t| t.id == tracking_id) {
            t.last_checked_at = Some(now);
        }
        Ok(())
    }

    async fn log_email(
        &self,
        tracking_id: Uuid,
        email: &str,
        email_type: &str,
        _status_raw: Option<&str>,
        _now: OffsetDateTime,
    ) -> Result<(), DbErr> {
        self.state
            .lock()
            .unwrap()
            .email_log
            .push((tracking_id, email.to_string(), email_type.to_string()));
        Ok(())
    }
}

struct RecordingNotifier {
    sent: Arc<Mutex<Vec<OutboundEmail>>>,
    /// Fail every send whose recipient equals this address.
    fail_recipient: Option<String>,
}

impl RecordingNotifier {
    fn new() -> (Self, Arc<Mutex<Vec<OutboundEmail>>>) {
        let sent = Arc::new(Mutex::new(Vec::new()));
        (
            Self {
                sent: sent.clone(),
                fail_recipient: None,
            },
            sent,
        )
    }

    fn failing_for(recipient: &str) -> (Self, Arc<Mutex<Vec<OutboundEmail>>>) {
        let sent = Arc::new(Mutex::new(Vec::new()));
        (
            Self {
                sent: sent.clone(),
                fail_recipient: Some(recipient.to_string()),
            },
            sent,
        )
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn send(&self, email: OutboundEmail) -> Result<(), NotifyError> {
        if self.fail_recipient.as_deref() == Some(email.to.as_str()) {
            return Err(NotifyError::Timeout(std::time::Duration::from_secs(30)));
        }
        self.sent.lock().unwrap().push(email);
        Ok(())
    }
}

struct FailingCarrier;

#[async_trait]
impl CarrierProvider for FailingCarrier {
    async fn status(&self, code: &str) -> Result<String, CarrierError> {
        Err(CarrierError::Unavailable(format!("no route for {code}")))
    }
}

// =============================================================================
// Fixtures
// =============================================================================

fn active_tracking(code: &str, user_id: Option<Uuid>) -> tracking::Model {
    tracking::Model {
        id: Uuid::new_v4(),
        user_id,
        tracking_code: code.to_string(),
        status: "active".to_string(),
        flow_stage: "active".to_string(),
        last_status_raw: None,
        last_checked_at: None,
        alert_sent: false,
        delivered_at: None,
        created_at: OffsetDateTime::now_utc(),
    }
}

fn notify_rule(status_match: &str) -> exception_rule::Model {
    exception_rule::Model {
        id: Uuid::new_v4(),
        name: status_match.to_lowercase(),
        status_match: status_match.to_string(),
        severity: "high".to_string(),
        notify: true,
        created_at: OffsetDateTime::now_utc(),
    }
}

// =============================================================================
// Tests
// =============================================================================

#[tokio::test]
async fn end_to_end_pickup_exception() {
    let owner = Uuid::new_v4();
    let mut state = StoreState::default();
    state.trackings.push(active_tracking("BR123", Some(owner)));
    state.rules.push(notify_rule("RETIRADA"));
    state.user_emails.insert(owner, "owner@example.com".into());
    let (store, shared) = InMemoryStore::new(state);
    let (notifier, sent) = RecordingNotifier::new();

    let job = MonitorJob::new(
        Box::new(store),
        Box::new(SimulatedCarrier),
        Box::new(notifier),
        MatchMode::CaseSensitive,
    );
    let summary = job.run_pass().await.unwrap();

    assert_eq!(summary.processed, 1);
    assert_eq!(summary.detected, 1);
    assert_eq!(summary.notified, 1);
    assert_eq!(summary.send_failures, 0);

    let sent = sent.lock().unwrap();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].to, "owner@example.com");
    assert!(sent[0].text.contains("BR123"));
    assert!(sent[0].text.contains("AGUARDANDO RETIRADA"));

    let state = shared.lock().unwrap();
    let t = &state.trackings[0];
    assert_eq!(t.status, "exception");
    assert!(t.alert_sent);
    assert_eq!(t.last_status_raw.as_deref(), Some("AGUARDANDO RETIRADA"));
    assert_eq!(state.exceptions.len(), 1);
    assert!(state.exceptions[0].email_sent);
    assert_eq!(state.email_log.len(), 1);
}

#[tokio::test]
async fn second_pass_is_idempotent() {
    let owner = Uuid::new_v4();
    let mut state = StoreState::default();
    state.trackings.push(active_tracking("BR123", Some(owner)));
    state.rules.push(notify_rule("RETIRADA"));
    state.user_emails.insert(owner, "owner@example.com".into());
    let (store, shared) = InMemoryStore::new(state);
    let (notifier, sent) = RecordingNotifier::new();

    let job = MonitorJob::new(
        Box::new(store),
        Box::new(SimulatedCarrier),
        Box::new(notifier),
        MatchMode::CaseSensitive,
    );
    job.run_pass().await.unwrap();
    let second = job.run_pass().await.unwrap();

    // The tracking is no longer active and its exception is no longer
    // pending: nothing left for the second pass to do.
    assert_eq!(second.notified, 0);
    assert_eq!(second.detected, 0);
    assert_eq!(sent.lock().unwrap().len(), 1);
    assert_eq!(shared.lock().unwrap().exceptions.len(), 1);
}

#[tokio::test]
async fn already_alerted_tracking_is_never_re_notified() {
    let owner = Uuid::new_v4();
    let mut t = active_tracking("BR777", Some(owner));
    t.alert_sent = true;
    let mut state = StoreState::default();
    state.trackings.push(t);
    state.rules.push(notify_rule("RETIRADA"));
    state.user_emails.insert(owner, "owner@example.com".into());
    let (store, _) = InMemoryStore::new(state);
    let (notifier, sent) = RecordingNotifier::new();

    let job = MonitorJob::new(
        Box::new(store),
        Box::new(SimulatedCarrier),
        Box::new(notifier),
        MatchMode::CaseSensitive,
    );
    let summary = job.run_pass().await.unwrap();

    assert_eq!(summary.skipped, 1);
    assert_eq!(summary.notified, 0);
    assert!(sent.lock().unwrap().is_empty());
}

#[tokio::test]
async fn notifier_failure_leaves_the_exception_pending() {
    let good_one = Uuid::new_v4();
    let broken = Uuid::new_v4();
    let good_two = Uuid::new_v4();
    let mut state = StoreState::default();
    state.trackings.push(active_tracking("BR001", Some(good_one)));
    state.trackings.push(active_tracking("BR002", Some(broken)));
    state.trackings.push(active_tracking("BR003", Some(good_two)));
    state.rules.push(notify_rule("RETIRADA"));
    state.user_emails.insert(good_one, "one@example.com".into());
    state.user_emails.insert(broken, "two@example.com".into());
    state.user_emails.insert(good_two, "three@example.com".into());
    let (store, shared) = InMemoryStore::new(state);
    let (notifier, sent) = RecordingNotifier::failing_for("two@example.com");

    let job = MonitorJob::new(
        Box::new(store),
        Box::new(SimulatedCarrier),
        Box::new(notifier),
        MatchMode::CaseSensitive,
    );
    let summary = job.run_pass().await.unwrap();

    assert_eq!(summary.processed, 3);
    assert_eq!(summary.detected, 3);
    assert_eq!(summary.notified, 2);
    assert_eq!(summary.send_failures, 1);

    let recipients: Vec<String> = sent.lock().unwrap().iter().map(|e| e.to.clone()).collect();
    assert_eq!(recipients, vec!["one@example.com", "three@example.com"]);

    let state = shared.lock().unwrap();
    let failed = state
        .trackings
        .iter()
        .find(|t| t.tracking_code == "BR002")
        .unwrap();
    assert!(!failed.alert_sent);
    let pending = state
        .exceptions
        .iter()
        .find(|e| e.tracking_id == failed.id)
        .unwrap();
    assert!(!pending.email_sent);
}

#[tokio::test]
async fn retried_send_goes_out_exactly_once() {
    let owner = Uuid::new_v4();
    let mut state = StoreState::default();
    state.trackings.push(active_tracking("BR002", Some(owner)));
    state.rules.push(notify_rule("RETIRADA"));
    state.user_emails.insert(owner, "owner@example.com".into());
    let (store, shared) = InMemoryStore::new(state);

    let (failing, _) = RecordingNotifier::failing_for("owner@example.com");
    let job = MonitorJob::new(
        Box::new(store.clone()),
        Box::new(SimulatedCarrier),
        Box::new(failing),
        MatchMode::CaseSensitive,
    );
    let first = job.run_pass().await.unwrap();
    assert_eq!(first.send_failures, 1);

    // Next pass with a healthy transport drains the pending row once.
    let (healthy, sent) = RecordingNotifier::new();
    let job = MonitorJob::new(
        Box::new(store),
        Box::new(SimulatedCarrier),
        Box::new(healthy),
        MatchMode::CaseSensitive,
    );
    let second = job.run_pass().await.unwrap();
    assert_eq!(second.notified, 1);
    // The tracking already moved to exception, so nothing was re-detected.
    assert_eq!(second.detected, 0);
    assert_eq!(sent.lock().unwrap().len(), 1);
    assert_eq!(shared.lock().unwrap().exceptions.len(), 1);
}

#[tokio::test]
async fn ownerless_tracking_is_skipped_without_aborting() {
    let owner = Uuid::new_v4();
    let mut state = StoreState::default();
    state.trackings.push(active_tracking("BR100", None));
    state.trackings.push(active_tracking("BR200", Some(owner)));
    state.rules.push(notify_rule("RETIRADA"));
    state.user_emails.insert(owner, "owner@example.com".into());
    let (store, _) = InMemoryStore::new(state);
    let (notifier, sent) = RecordingNotifier::new();

    let job = MonitorJob::new(
        Box::new(store),
        Box::new(SimulatedCarrier),
        Box::new(notifier),
        MatchMode::CaseSensitive,
    );
    let summary = job.run_pass().await.unwrap();

    assert_eq!(summary.skipped, 1);
    assert_eq!(summary.notified, 1);
    assert_eq!(sent.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn missing_owner_email_skips_the_notification() {
    let owner = Uuid::new_v4();
    let mut state = StoreState::default();
    state.trackings.push(active_tracking("BR300", Some(owner)));
    state.rules.push(notify_rule("RETIRADA"));
    // No email recorded for the owner.
    let (store, shared) = InMemoryStore::new(state);
    let (notifier, sent) = RecordingNotifier::new();

    let job = MonitorJob::new(
        Box::new(store),
        Box::new(SimulatedCarrier),
        Box::new(notifier),
        MatchMode::CaseSensitive,
    );
    let summary = job.run_pass().await.unwrap();

    assert_eq!(summary.detected, 1);
    assert_eq!(summary.notified, 0);
    assert!(sent.lock().unwrap().is_empty());
    // The exception stays pending for when the email gets fixed.
    assert!(!shared.lock().unwrap().exceptions[0].email_sent);
}

#[tokio::test]
async fn carrier_failure_skips_only_that_tracking() {
    let owner = Uuid::new_v4();
    let mut state = StoreState::default();
    state.trackings.push(active_tracking("BR400", Some(owner)));
    state.rules.push(notify_rule("RETIRADA"));
    state.user_emails.insert(owner, "owner@example.com".into());
    let (store, shared) = InMemoryStore::new(state);
    let (notifier, sent) = RecordingNotifier::new();

    let job = MonitorJob::new(
        Box::new(store),
        Box::new(FailingCarrier),
        Box::new(notifier),
        MatchMode::CaseSensitive,
    );
    let summary = job.run_pass().await.unwrap();

    assert_eq!(summary.processed, 1);
    assert_eq!(summary.skipped, 1);
    assert!(sent.lock().unwrap().is_empty());
    assert!(shared.lock().unwrap().exceptions.is_empty());
}

#[tokio::test]
async fn no_matching_rule_only_bumps_last_checked_at() {
    let owner = Uuid::new_v4();
    let mut state = StoreState::default();
    state.trackings.push(active_tracking("BR500", Some(owner)));
    state.rules.push(notify_rule("EXTRAVIO"));
    state.user_emails.insert(owner, "owner@example.com".into());
    let (store, shared) = InMemoryStore::new(state);
    let (notifier, sent) = RecordingNotifier::new();

    let job = MonitorJob::new(
        Box::new(store),
        Box::new(SimulatedCarrier),
        Box::new(notifier),
        MatchMode::CaseSensitive,
    );
    let summary = job.run_pass().await.unwrap();

    assert_eq!(summary.detected, 0);
    assert!(sent.lock().unwrap().is_empty());
    let state = shared.lock().unwrap();
    assert_eq!(state.trackings[0].status, "active");
    assert!(state.trackings[0].last_checked_at.is_some());
}

#[tokio::test]
async fn tracking_fetch_failure_aborts_the_pass() {
    let state = StoreState {
        fail_active_trackings: true,
        ..Default::default()
    };
    let (store, _) = InMemoryStore::new(state);
    let (notifier, _) = RecordingNotifier::new();

    let job = MonitorJob::new(
        Box::new(store),
        Box::new(SimulatedCarrier),
        Box::new(notifier),
        MatchMode::CaseSensitive,
    );
    let err = job.run_pass().await.unwrap_err();
    assert!(matches!(err, MonitorError::FetchTrackings(_)));
    assert!(err.is_retryable());
}

#[tokio::test]
async fn rule_fetch_failure_aborts_the_pass() {
    let state = StoreState {
        fail_rules: true,
        ..Default::default()
    };
    let (store, _) = InMemoryStore::new(state);
    let (notifier, _) = RecordingNotifier::new();

    let job = MonitorJob::new(
        Box::new(store),
        Box::new(SimulatedCarrier),
        Box::new(notifier),
        MatchMode::CaseSensitive,
    );
    let err = job.run_pass().await.unwrap_err();
    assert!(matches!(err, MonitorError::FetchRules(_)));
}
