//! Plan lifecycle tracking
//!
//! Execution reports arrive from the execution collaborator and move a
//! plan through its states:
//!
//! ```text
//! Pending --first fill--> Executing --all routed filled--> Completed | Partial
//!    |                        |
//!    +--cancel/expiry---------+--> Cancelled | Expired (no fills) or Partial (fills)
//! ```
//!
//! A plan generated under-routed starts out `Partial` but stays open until
//! its first fill or until it is closed. Closed plans reject every further
//! transition, stay queryable for the retention window, then are dropped by
//! the next [`PlanTracker::expire_due`] sweep.

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use rust_decimal::Decimal;
use std::collections::HashMap;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::types::{ExecutionReport, ExecutionStats, PlanStatus, SorPlan};
use crate::common::errors::{Result, SorError};
use crate::common::types::VenueId;

/// Default execution report buffer size
pub const DEFAULT_REPORT_CHANNEL_SIZE: usize = 1000;

/// Default time a closed plan is kept before eviction
pub const DEFAULT_PLAN_RETENTION_SECS: i64 = 600;

/// Create an execution report channel for [`PlanTracker::run`]
pub fn report_channel(size: usize) -> (mpsc::Sender<ExecutionReport>, mpsc::Receiver<ExecutionReport>) {
    mpsc::channel(size.max(1))
}

#[derive(Debug, Clone)]
struct TrackedPlan {
    status: PlanStatus,
    /// Set when the plan reaches a terminal state
    closed_at: Option<DateTime<Utc>>,
    stats: ExecutionStats,
    min_fill_rate: Decimal,
    total_quantity: u64,
    routed_quantity: u64,
    expires_at: DateTime<Utc>,
    /// (priority, venue) per route
    routes: Vec<(u32, VenueId)>,
}

impl TrackedPlan {
    fn fill_rate(&self) -> Decimal {
        if self.total_quantity == 0 {
            return Decimal::ZERO;
        }
        Decimal::from(self.stats.filled_quantity) / Decimal::from(self.total_quantity)
    }

    fn is_closed(&self) -> bool {
        self.closed_at.is_some()
    }

    fn close(&mut self, status: PlanStatus, at: DateTime<Utc>) -> PlanStatus {
        self.status = status;
        self.closed_at = Some(at);
        status
    }

    fn close_without_completion(&mut self, no_fill_status: PlanStatus, at: DateTime<Utc>) -> PlanStatus {
        let status = if self.stats.filled_quantity > 0 {
            PlanStatus::Partial
        } else {
            no_fill_status
        };
        self.close(status, at)
    }
}

/// Tracks the status and fills of generated plans
#[derive(Debug)]
pub struct PlanTracker {
    plans: Mutex<HashMap<Uuid, TrackedPlan>>,
    retention: chrono::Duration,
}

impl Default for PlanTracker {
    fn default() -> Self {
        Self::with_retention(chrono::Duration::seconds(DEFAULT_PLAN_RETENTION_SECS))
    }
}

impl PlanTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Tracker that drops closed plans `retention` after they close
    pub fn with_retention(retention: chrono::Duration) -> Self {
        Self {
            plans: Mutex::new(HashMap::new()),
            retention,
        }
    }

    /// Start tracking a freshly generated plan
    pub fn track(&self, plan: &SorPlan, min_fill_rate: Decimal) {
        let tracked = TrackedPlan {
            status: plan.status,
            closed_at: None,
            stats: ExecutionStats::default(),
            min_fill_rate,
            total_quantity: plan.total_quantity,
            routed_quantity: plan.routed_quantity(),
            expires_at: plan.expires_at,
            routes: plan
                .routes
                .iter()
                .map(|r| (r.priority, r.venue_id.clone()))
                .collect(),
        };
        debug!("Tracking plan {} ({})", plan.id, plan.status);
        self.plans.lock().insert(plan.id, tracked);
    }

    /// Apply a fill and return the plan's new status
    pub fn apply(&self, report: &ExecutionReport) -> Result<PlanStatus> {
        let mut plans = self.plans.lock();
        let plan = plans
            .get_mut(&report.plan_id)
            .ok_or_else(|| SorError::PlanNotFound(report.plan_id.to_string()))?;

        if plan.is_closed() {
            return Err(SorError::InvalidTransition(format!(
                "plan {} is {}",
                report.plan_id, plan.status
            )));
        }

        let known_route = plan
            .routes
            .iter()
            .any(|(priority, venue)| *priority == report.route_priority && *venue == report.venue_id);
        if !known_route {
            return Err(SorError::InvalidRequest(format!(
                "plan {} has no route {} at {}",
                report.plan_id, report.route_priority, report.venue_id
            )));
        }

        plan.stats.record(report);

        if plan.stats.filled_quantity >= plan.routed_quantity {
            if plan.stats.filled_quantity > plan.routed_quantity {
                warn!(
                    "Plan {} overfilled: {} filled, {} routed",
                    report.plan_id, plan.stats.filled_quantity, plan.routed_quantity
                );
            }
            let status = if plan.fill_rate() >= plan.min_fill_rate {
                PlanStatus::Completed
            } else {
                PlanStatus::Partial
            };
            plan.close(status, Utc::now());
            info!("Plan {} closed as {}", report.plan_id, plan.status);
        } else {
            plan.status = PlanStatus::Executing;
        }

        Ok(plan.status)
    }

    /// Cancel an open plan
    pub fn cancel(&self, plan_id: Uuid) -> Result<PlanStatus> {
        let mut plans = self.plans.lock();
        let plan = plans
            .get_mut(&plan_id)
            .ok_or_else(|| SorError::PlanNotFound(plan_id.to_string()))?;

        if plan.is_closed() {
            return Err(SorError::InvalidTransition(format!(
                "plan {} is already {}",
                plan_id, plan.status
            )));
        }

        let status = plan.close_without_completion(PlanStatus::Cancelled, Utc::now());
        info!("Plan {} cancelled as {}", plan_id, status);
        Ok(status)
    }

    /// Close every open plan whose expiry is before `now`
    ///
    /// Plans closed longer than the retention window before `now` are
    /// dropped in the same sweep. Returns the plans expired by this call.
    pub fn expire_due(&self, now: DateTime<Utc>) -> Vec<(Uuid, PlanStatus)> {
        let mut plans = self.plans.lock();
        let expired: Vec<(Uuid, PlanStatus)> = plans
            .iter_mut()
            .filter(|(_, plan)| !plan.is_closed() && now > plan.expires_at)
            .map(|(id, plan)| (*id, plan.close_without_completion(PlanStatus::Expired, now)))
            .collect();

        let before = plans.len();
        let cutoff = now - self.retention;
        plans.retain(|_, plan| plan.closed_at.map_or(true, |at| at > cutoff));
        let evicted = before - plans.len();

        if !expired.is_empty() || evicted > 0 {
            info!("Expired {} plans, evicted {} closed plans", expired.len(), evicted);
        }
        expired
    }

    /// Stop tracking a closed plan
    ///
    /// Open plans are kept so their fills are not lost.
    pub fn forget(&self, plan_id: Uuid) -> Result<ExecutionStats> {
        let mut plans = self.plans.lock();
        let plan = plans
            .get(&plan_id)
            .ok_or_else(|| SorError::PlanNotFound(plan_id.to_string()))?;

        if !plan.is_closed() {
            return Err(SorError::InvalidTransition(format!(
                "plan {} is still open ({})",
                plan_id, plan.status
            )));
        }

        let stats = plans.remove(&plan_id).map(|p| p.stats).unwrap_or_default();
        debug!("Forgot plan {}", plan_id);
        Ok(stats)
    }

    pub fn status(&self, plan_id: Uuid) -> Result<PlanStatus> {
        self.plans
            .lock()
            .get(&plan_id)
            .map(|p| p.status)
            .ok_or_else(|| SorError::PlanNotFound(plan_id.to_string()))
    }

    pub fn stats(&self, plan_id: Uuid) -> Result<ExecutionStats> {
        self.plans
            .lock()
            .get(&plan_id)
            .map(|p| p.stats.clone())
            .ok_or_else(|| SorError::PlanNotFound(plan_id.to_string()))
    }

    /// Whether the plan still accepts fills
    pub fn is_open(&self, plan_id: Uuid) -> bool {
        self.plans.lock().get(&plan_id).map_or(false, |p| !p.is_closed())
    }

    pub fn len(&self) -> usize {
        self.plans.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.plans.lock().is_empty()
    }

    /// Consume execution reports until every sender is dropped
    ///
    /// Rejected reports are logged and skipped. Returns the number of
    /// reports applied.
    pub async fn run(&self, mut receiver: mpsc::Receiver<ExecutionReport>) -> usize {
        let mut applied = 0;
        while let Some(report) = receiver.recv().await {
            match self.apply(&report) {
                Ok(status) => {
                    applied += 1;
                    debug!(
                        "Fill {} @ {} on {} -> {}",
                        report.filled_quantity, report.fill_price, report.venue_id, status
                    );
                }
                Err(e) => warn!("Rejected execution report for {}: {}", report.plan_id, e),
            }
        }
        info!("Execution report channel closed after {} fills", applied);
        applied
    }
}
