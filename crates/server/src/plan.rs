//! Subscription plans and the active-tracking quota.
//!
//! Quota counts every tracking that is not yet delivered: an unresolved
//! exception still occupies a monitoring slot. Expired essential plans are
//! treated as free at check time; the caller persists the downgrade lazily.

use crate::entity::user;
use thiserror::Error;
use time::OffsetDateTime;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Plan {
    Free,
    Essential,
}

impl Plan {
    /// Maximum number of concurrently monitored (non-delivered) trackings.
    pub fn tracking_limit(&self) -> u64 {
        match self {
            Plan::Free => 1,
            Plan::Essential => 50,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Plan::Free => "free",
            Plan::Essential => "essential",
        }
    }

    /// Unknown plan strings fall back to free rather than erroring, so a bad
    /// row can never grant extra quota.
    pub fn from_str_lossy(s: &str) -> Plan {
        match s {
            "essential" => Plan::Essential,
            _ => Plan::Free,
        }
    }
}

impl std::fmt::Display for Plan {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("Tracking quota exceeded: {in_use} of {limit} slots in use on the {plan} plan")]
pub struct QuotaExceeded {
    pub plan: Plan,
    pub limit: u64,
    pub in_use: u64,
}

/// Resolve the plan a user is entitled to right now.
///
/// An essential plan whose `plan_paid_until` is in the past counts as free
/// immediately, before any downgrade write lands.
pub fn effective_plan(user: &user::Model, now: OffsetDateTime) -> Plan {
    match Plan::from_str_lossy(&user.plan) {
        Plan::Essential => match user.plan_paid_until {
            Some(paid_until) if paid_until < now => Plan::Free,
            _ => Plan::Essential,
        },
        Plan::Free => Plan::Free,
    }
}

/// Whether the user's paid plan has lapsed and should be persisted as free.
pub fn plan_expired(user: &user::Model, now: OffsetDateTime) -> bool {
    Plan::from_str_lossy(&user.plan) == Plan::Essential && effective_plan(user, now) == Plan::Free
}

/// Gate a tracking creation against the plan quota.
///
/// `non_delivered_count` is the number of the user's trackings with
/// `status != delivered`.
pub fn check_quota(plan: Plan, non_delivered_count: u64) -> Result<(), QuotaExceeded> {
    let limit = plan.tracking_limit();
    if non_delivered_count >= limit {
        return Err(QuotaExceeded {
            plan,
            limit,
            in_use: non_delivered_count,
        });
    }
    Ok(())
}
