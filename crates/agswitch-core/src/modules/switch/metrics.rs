//! Per-scope switch outcome counters.
//!
//! One instance is constructed at startup and shared by every flow. Each
//! record call is a single critical section, so a snapshot never observes a
//! failure without its rollback outcome.

use agswitch_types::error::SwitchFailureReason;
use agswitch_types::models::{SwitchFailureMetadata, SwitchMetricsSnapshot, SwitchScope};
use metrics::{counter, describe_counter};
use parking_lot::Mutex;
use tracing::{info, warn};

/// Register metric descriptions with the installed recorder, if any.
pub fn describe_switch_metrics() {
    describe_counter!("agswitch_switch_total", "Finished account switches by scope and outcome");
    describe_counter!("agswitch_switch_failures_total", "Failed account switches by scope and reason");
    describe_counter!("agswitch_rollbacks_total", "Fingerprint rollbacks by scope and outcome");
}

fn record_switch_counter(scope: SwitchScope, outcome: &'static str) {
    let labels = [("scope", scope.as_str().to_string()), ("outcome", outcome.to_string())];
    counter!("agswitch_switch_total", &labels).increment(1);
}

fn record_rollback_counter(scope: SwitchScope, succeeded: bool) {
    let outcome = if succeeded { "success" } else { "failure" };
    let labels = [("scope", scope.as_str().to_string()), ("outcome", outcome.to_string())];
    counter!("agswitch_rollbacks_total", &labels).increment(1);
}

/// Switch outcome counters for the `local` and `cloud` scopes.
#[derive(Debug, Default)]
pub struct SwitchMetrics {
    buckets: Mutex<SwitchMetricsSnapshot>,
}

impl SwitchMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_success(&self, scope: SwitchScope) {
        let mut buckets = self.buckets.lock();
        let bucket = buckets.bucket_mut(scope);
        bucket.switch_success += 1;
        info!(scope = %scope, total = bucket.switch_success, "switch_success_recorded");
        record_switch_counter(scope, "success");
    }

    /// Record a terminal failure together with its rollback outcome.
    ///
    /// `rollback` is `None` when no rollback was attempted.
    pub fn record_failure(
        &self,
        scope: SwitchScope,
        reason: SwitchFailureReason,
        message: &str,
        rollback: Option<bool>,
    ) {
        let mut buckets = self.buckets.lock();
        let bucket = buckets.bucket_mut(scope);

        bucket.switch_failure += 1;
        *bucket.failure_reasons.entry(reason).or_insert(0) += 1;
        bucket.last_failure = Some(SwitchFailureMetadata {
            reason,
            message: message.to_string(),
            occurred_at: chrono::Utc::now().timestamp_millis(),
        });
        if let Some(succeeded) = rollback {
            bucket.rollback_attempt += 1;
            if succeeded {
                bucket.rollback_success += 1;
            } else {
                bucket.rollback_failure += 1;
            }
        }

        warn!(
            scope = %scope,
            reason = %reason,
            rollback = ?rollback,
            total = bucket.switch_failure,
            "switch_failure_recorded: {}",
            message
        );

        record_switch_counter(scope, "failure");
        let labels = [("scope", scope.as_str().to_string()), ("reason", reason.as_str().to_string())];
        counter!("agswitch_switch_failures_total", &labels).increment(1);
        if let Some(succeeded) = rollback {
            record_rollback_counter(scope, succeeded);
        }
    }

    /// Owned copy of every bucket.
    pub fn snapshot(&self) -> SwitchMetricsSnapshot {
        self.buckets.lock().clone()
    }
}
