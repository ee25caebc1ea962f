//! The monitoring job: one pass over all open trackings.
//!
//! A pass has two phases. Detection scans active trackings, asks the carrier
//! for the current status, matches it against the notify rules and records a
//! pending exception row for every hit. Notification drains the pending rows
//! and sends exactly one email per exception, flipping the dedup flags only
//! after the send succeeded, so a failed send is retried on the next pass.
//!
//! Only the bulk reads are fatal; every per-record failure is logged,
//! counted and skipped.

pub mod store;

use crate::carrier::CarrierProvider;
use crate::email_templates::ExceptionEmailTemplate;
use crate::error::MonitorError;
use crate::matcher::{MatchMode, match_rule};
use crate::notify::{Notifier, OutboundEmail};
use serde::Serialize;
use store::{DetectedException, MonitorStore, PendingNotification};
use time::OffsetDateTime;
use utoipa::ToSchema;

pub use store::SeaOrmStore;

/// Outcome counters for one monitor pass.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, ToSchema)]
pub struct PassSummary {
    /// Trackings examined in the detection phase.
    pub processed: usize,
    /// New exceptions recorded.
    pub detected: usize,
    /// Notifications delivered.
    pub notified: usize,
    /// Records skipped for per-record conditions (missing owner, carrier
    /// lookup failure, already alerted).
    pub skipped: usize,
    /// Notifier failures left pending for the next pass.
    pub send_failures: usize,
}

/// The monitoring job. Collaborators are injected at construction; the job
/// keeps no state between passes beyond the guard that serializes them.
pub struct MonitorJob {
    store: Box<dyn MonitorStore>,
    carrier: Box<dyn CarrierProvider>,
    notifier: Box<dyn Notifier>,
    match_mode: MatchMode,
    pass_guard: tokio::sync::Mutex<()>,
}

impl MonitorJob {
    pub fn new(
        store: Box<dyn MonitorStore>,
        carrier: Box<dyn CarrierProvider>,
        notifier: Box<dyn Notifier>,
        match_mode: MatchMode,
    ) -> Self {
        Self {
            store,
            carrier,
            notifier,
            match_mode,
            pass_guard: tokio::sync::Mutex::new(()),
        }
    }

    /// Run one full pass. Errors only on the fatal bulk reads; per-record
    /// failures are reflected in the summary.
    #[tracing::instrument(skip(self))]
    pub async fn run_pass(&self) -> Result<PassSummary, MonitorError> {
        // Two overlapping passes could double-send; serialize them.
        let _guard = self.pass_guard.lock().await;

        let mut summary = PassSummary::default();
        self.detect(&mut summary).await?;
        self.notify_pending(&mut summary).await?;

        tracing::info!(
            name = "monitor.pass.finished",
            target = concat!(env!("CARGO_PKG_NAME"), "::", module_path!()),
            processed = summary.processed,
            detected = summary.detected,
            notified = summary.notified,
            skipped = summary.skipped,
            send_failures = summary.send_failures,
            message = "Monitor pass finished"
        );
        Ok(summary)
    }

    async fn detect(&self, summary: &mut PassSummary) -> Result<(), MonitorError> {
        let trackings = self
            .store
            .active_trackings()
            .await
            .map_err(MonitorError::FetchTrackings)?;
        let rules = self
            .store
            .notify_rules()
            .await
            .map_err(MonitorError::FetchRules)?;

        tracing::info!(
            name = "monitor.pass.started",
            target = concat!(env!("CARGO_PKG_NAME"), "::", module_path!()),
            active_trackings = trackings.len(),
            notify_rules = rules.len(),
            message = "Starting monitor pass"
        );

        for t in &trackings {
            summary.processed += 1;

            if t.user_id.is_none() {
                tracing::warn!(
                    name = "monitor.detect.orphan_tracking",
                    target = concat!(env!("CARGO_PKG_NAME"), "::", module_path!()),
                    tracking_id = %t.id,
                    message = "Tracking has no owner, skipping"
                );
                summary.skipped += 1;
                continue;
            }
            if t.alert_sent {
                summary.skipped += 1;
                continue;
            }

            let raw_status = match self.carrier.status(&t.tracking_code).await {
                Ok(s) => s,
                Err(e) => {
                    tracing::warn!(
                        name = "monitor.detect.carrier_error",
                        target = concat!(env!("CARGO_PKG_NAME"), "::", module_path!()),
                        tracking_code = %t.tracking_code,
                        error = %e,
                        message = "Carrier lookup failed, skipping tracking"
                    );
                    summary.skipped += 1;
                    continue;
                }
            };

            let now = OffsetDateTime::now_utc();
            let Some(rule) = match_rule(&raw_status, &rules, self.match_mode) else {
                if let Err(e) = self.store.touch_last_checked(t.id, now).await {
                    tracing::debug!(
                        name = "monitor.detect.touch_failed",
                        target = concat!(env!("CARGO_PKG_NAME"), "::", module_path!()),
                        tracking_id = %t.id,
                        error = %e,
                        message = "Could not update last_checked_at"
                    );
                }
                continue;
            };

            let detection = DetectedException {
                tracking_id: t.id,
                exception_type: rule.name.clone(),
                severity: rule.severity.clone(),
                status_raw: raw_status.clone(),
            };
            match self.store.record_exception(&detection, now).await {
                Ok(exception_id) => {
                    summary.detected += 1;
                    tracing::info!(
                        name = "monitor.detect.exception_recorded",
                        target = concat!(env!("CARGO_PKG_NAME"), "::", module_path!()),
                        tracking_code = %t.tracking_code,
                        exception_id = %exception_id,
                        rule = %rule.name,
                        status_raw = %raw_status,
                        message = "Exception detected"
                    );
                }
                Err(e) => {
                    tracing::error!(
                        name = "monitor.detect.record_failed",
                        target = concat!(env!("CARGO_PKG_NAME"), "::", module_path!()),
                        tracking_id = %t.id,
                        error = %e,
                        message = "Failed to record exception, will re-detect next pass"
                    );
                    summary.skipped += 1;
                }
            }
        }
        Ok(())
    }

    async fn notify_pending(&self, summary: &mut PassSummary) -> Result<(), MonitorError> {
        let pending = self
            .store
            .pending_notifications()
            .await
            .map_err(MonitorError::FetchPending)?;

        for p in pending {
            match self.notify_one(&p).await {
                NotifyOutcome::Sent => summary.notified += 1,
                NotifyOutcome::Skipped => summary.skipped += 1,
                NotifyOutcome::SendFailed => summary.send_failures += 1,
            }
        }
        Ok(())
    }

    async fn notify_one(&self, p: &PendingNotification) -> NotifyOutcome {
        let Some(user_id) = p.user_id else {
            tracing::warn!(
                name = "monitor.notify.orphan_exception",
                target = concat!(env!("CARGO_PKG_NAME"), "::", module_path!()),
                exception_id = %p.exception_id,
                message = "Pending exception belongs to an ownerless tracking"
            );
            return NotifyOutcome::Skipped;
        };

        let email = match self.store.user_email(user_id).await {
            Ok(Some(email)) if !email.trim().is_empty() => email,
            Ok(_) => {
                tracing::warn!(
                    name = "monitor.notify.missing_email",
                    target = concat!(env!("CARGO_PKG_NAME"), "::", module_path!()),
                    exception_id = %p.exception_id,
                    user_id = %user_id,
                    message = "Owner has no usable email address"
                );
                return NotifyOutcome::Skipped;
            }
            Err(e) => {
                tracing::error!(
                    name = "monitor.notify.user_lookup_failed",
                    target = concat!(env!("CARGO_PKG_NAME"), "::", module_path!()),
                    exception_id = %p.exception_id,
                    error = %e,
                    message = "Owner lookup failed, skipping"
                );
                return NotifyOutcome::Skipped;
            }
        };

        let template = ExceptionEmailTemplate {
            tracking_code: p.tracking_code.clone(),
            status_raw: p.status_raw.clone(),
        };
        let outbound = OutboundEmail {
            to: email.clone(),
            subject: template.subject(),
            text: template.render_text(),
        };
        if let Err(e) = self.notifier.send(outbound).await {
            // State untouched: the row stays pending and the next pass
            // retries the send.
            tracing::error!(
                name = "monitor.notify.send_failed",
                target = concat!(env!("CARGO_PKG_NAME"), "::", module_path!()),
                exception_id = %p.exception_id,
                tracking_code = %p.tracking_code,
                error = %e,
                message = "Alert email failed, will retry next pass"
            );
            return NotifyOutcome::SendFailed;
        }

        let now = OffsetDateTime::now_utc();
        if let Err(e) = self.store.mark_notified(p.exception_id, p.tracking_id, now).await {
            // The email already went out; log loudly but never resend
            // proactively.
            tracing::error!(
                name = "monitor.notify.mark_failed",
                target = concat!(env!("CARGO_PKG_NAME"), "::", module_path!()),
                exception_id = %p.exception_id,
                error = %e,
                message = "Email sent but flags not persisted"
            );
        }
        if let Err(e) = self
            .store
            .log_email(p.tracking_id, &email, "exception", Some(&p.status_raw), now)
            .await
        {
            tracing::warn!(
                name = "monitor.notify.audit_log_failed",
                target = concat!(env!("CARGO_PKG_NAME"), "::", module_path!()),
                exception_id = %p.exception_id,
                error = %e,
                message = "Could not append to the email audit log"
            );
        }

        tracing::info!(
            name = "monitor.notify.alert_sent",
            target = concat!(env!("CARGO_PKG_NAME"), "::", module_path!()),
            tracking_code = %p.tracking_code,
            exception_id = %p.exception_id,
            message = "Alert email sent"
        );
        NotifyOutcome::Sent
    }
}

enum NotifyOutcome {
    Sent,
    Skipped,
    SendFailed,
}
