//! Account switch state machine.
//!
//! ```text
//! Idle -> StoppingProcess -> ApplyingProfile -> PerformingSwitch -> Verifying -> Completed
//!                                  |                  |
//!                                  +--> RollingBack --+--> Failed
//! ```
//!
//! Only the device fingerprint is rolled back here. The data-swap callback
//! must leave the account store untouched when it fails.

use agswitch_types::error::{SwitchFailure, SwitchFailureReason};
use agswitch_types::models::{DeviceProfile, SwitchScope};
use futures::future::BoxFuture;
use futures::FutureExt;
use serde::Serialize;
use std::fmt;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};

use super::metrics::SwitchMetrics;
use crate::error::{AppError, AppResult};
use crate::modules::device::DeviceProfileManager;
use crate::modules::process::ProcessController;

/// Extra time granted to a controller that overruns its own stop timeout.
const STOP_GRACE: Duration = Duration::from_millis(500);

/// Stage of a switch flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SwitchFlowState {
    Idle,
    StoppingProcess,
    ApplyingProfile,
    PerformingSwitch,
    Verifying,
    Completed,
    RollingBack,
    Failed,
}

impl fmt::Display for SwitchFlowState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Idle => "idle",
            Self::StoppingProcess => "stopping_process",
            Self::ApplyingProfile => "applying_profile",
            Self::PerformingSwitch => "performing_switch",
            Self::Verifying => "verifying",
            Self::Completed => "completed",
            Self::RollingBack => "rolling_back",
            Self::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// Inputs of one switch.
pub struct SwitchFlowConfig {
    pub scope: SwitchScope,
    /// Profile bound to the target account
    pub target_profile: Option<DeviceProfile>,
    pub apply_fingerprint: bool,
    pub process_exit_timeout: Duration,
    /// Start the target once the swap has committed
    pub restart_process: bool,
    /// Data swap; runs after the fingerprint is in place
    pub perform_switch: BoxFuture<'static, AppResult<()>>,
}

impl fmt::Debug for SwitchFlowConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SwitchFlowConfig")
            .field("scope", &self.scope)
            .field("target_profile", &self.target_profile)
            .field("apply_fingerprint", &self.apply_fingerprint)
            .field("process_exit_timeout", &self.process_exit_timeout)
            .field("restart_process", &self.restart_process)
            .finish_non_exhaustive()
    }
}

/// Outcome of a completed flow.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SwitchFlowReport {
    pub scope: SwitchScope,
    /// Every state entered, in order
    pub states: Vec<SwitchFlowState>,
    pub fingerprint_applied: bool,
    pub process_started: bool,
}

/// Mutable record of one run, shared by the success and failure paths.
struct FlowRun {
    scope: SwitchScope,
    states: Vec<SwitchFlowState>,
    fingerprint_applied: bool,
    process_started: bool,
}

impl FlowRun {
    fn new(scope: SwitchScope) -> Self {
        Self {
            scope,
            states: vec![SwitchFlowState::Idle],
            fingerprint_applied: false,
            process_started: false,
        }
    }

    fn enter(&mut self, state: SwitchFlowState) {
        tracing::debug!(scope = %self.scope, %state, "switch_flow_state");
        self.states.push(state);
    }

    fn fail(&self, reason: SwitchFailureReason, message: impl Into<String>) -> SwitchFailure {
        SwitchFailure::new(self.scope, reason, message)
    }

    /// Join errors never belong to the step that spawned them.
    fn fail_with(&self, reason: SwitchFailureReason, err: AppError) -> SwitchFailure {
        match err {
            AppError::TaskJoin(_) => self.fail(SwitchFailureReason::Unknown, err.to_string()),
            other => self.fail(reason, other.to_string()),
        }
    }
}

/// Drives one switch through its states against the injected collaborators.
///
/// Callers must hold the switch guard for the duration of [`SwitchFlow::execute`].
#[derive(Clone)]
pub struct SwitchFlow {
    process: Arc<dyn ProcessController>,
    profiles: Arc<DeviceProfileManager>,
    metrics: Arc<SwitchMetrics>,
}

impl SwitchFlow {
    pub fn new(
        process: Arc<dyn ProcessController>,
        profiles: Arc<DeviceProfileManager>,
        metrics: Arc<SwitchMetrics>,
    ) -> Self {
        Self { process, profiles, metrics }
    }

    pub async fn execute(&self, config: SwitchFlowConfig) -> AppResult<SwitchFlowReport> {
        let mut run = FlowRun::new(config.scope);
        info!(scope = %run.scope, "switch_flow_started");

        match self.drive(config, &mut run).await {
            Ok(()) => {
                run.enter(SwitchFlowState::Completed);
                self.metrics.record_success(run.scope);
                info!(scope = %run.scope, states = ?run.states, "switch_flow_completed");
                Ok(SwitchFlowReport {
                    scope: run.scope,
                    states: run.states,
                    fingerprint_applied: run.fingerprint_applied,
                    process_started: run.process_started,
                })
            },
            Err(failure) => {
                run.enter(SwitchFlowState::Failed);
                self.metrics.record_failure(
                    failure.scope,
                    failure.reason,
                    &failure.message,
                    failure.rollback_succeeded,
                );
                error!(scope = %run.scope, states = ?run.states, "{}", failure);
                Err(failure.into())
            },
        }
    }

    async fn drive(&self, config: SwitchFlowConfig, run: &mut FlowRun) -> Result<(), SwitchFailure> {
        run.enter(SwitchFlowState::StoppingProcess);
        self.stop_process(config.process_exit_timeout, run).await?;

        let previous = if config.apply_fingerprint {
            run.enter(SwitchFlowState::ApplyingProfile);
            let target = config.target_profile.ok_or_else(|| {
                run.fail(
                    SwitchFailureReason::MissingBoundProfile,
                    "no device profile bound to the target account",
                )
            })?;
            Some(self.apply_profile(target, run).await?)
        } else {
            None
        };

        run.enter(SwitchFlowState::PerformingSwitch);
        let outcome = AssertUnwindSafe(config.perform_switch).catch_unwind().await;
        let failure = match outcome {
            Ok(Ok(())) => None,
            Ok(Err(e)) => Some(run.fail_with(SwitchFailureReason::PerformSwitchFailed, e)),
            Err(_) => Some(run.fail(SwitchFailureReason::Unknown, "data swap panicked")),
        };
        if let Some(failure) = failure {
            return Err(match previous {
                Some(previous) => self.rollback(previous, failure, run).await,
                None => failure,
            });
        }

        run.enter(SwitchFlowState::Verifying);
        if config.restart_process {
            self.process
                .start()
                .await
                .map_err(|e| run.fail_with(SwitchFailureReason::StartProcessFailed, e))?;
            run.process_started = true;
        }
        Ok(())
    }

    async fn stop_process(&self, timeout: Duration, run: &FlowRun) -> Result<(), SwitchFailure> {
        let reason = SwitchFailureReason::ProcessCloseFailed;
        match tokio::time::timeout(timeout.saturating_add(STOP_GRACE), self.process.stop(timeout))
            .await
        {
            Ok(Ok(true)) => Ok(()),
            Ok(Ok(false)) => Err(run.fail(
                reason,
                format!("target process did not exit within {} ms", timeout.as_millis()),
            )),
            Ok(Err(e)) => Err(run.fail_with(reason, e)),
            Err(_) => Err(run.fail(
                reason,
                format!("process stop timed out after {} ms", timeout.as_millis()),
            )),
        }
    }

    /// Applies `target` and returns the profile it replaced.
    async fn apply_profile(
        &self,
        target: DeviceProfile,
        run: &mut FlowRun,
    ) -> Result<DeviceProfile, SwitchFailure> {
        let reason = SwitchFailureReason::ApplyDeviceProfileFailed;
        let previous = self
            .blocking(DeviceProfileManager::capture)
            .await
            .map_err(|e| run.fail_with(reason, e))?;

        let applied = self
            .blocking(move |profiles| {
                profiles.apply(&target)?;
                let written = profiles.capture()?;
                if written != target {
                    return Err(AppError::Storage(
                        "device_profile_verification_mismatch".to_string(),
                    ));
                }
                Ok(())
            })
            .await;

        match applied {
            Ok(()) => {
                run.fingerprint_applied = true;
                Ok(previous)
            },
            Err(e) => {
                let failure = run.fail_with(reason, e);
                Err(self.rollback(previous, failure, run).await)
            },
        }
    }

    /// Restores `previous` and attaches the outcome to `failure`.
    async fn rollback(
        &self,
        previous: DeviceProfile,
        failure: SwitchFailure,
        run: &mut FlowRun,
    ) -> SwitchFailure {
        run.enter(SwitchFlowState::RollingBack);
        warn!(scope = %run.scope, reason = %failure.reason, "rolling_back_device_profile");

        match self.blocking(move |profiles| profiles.apply(&previous)).await {
            Ok(()) => {
                run.fingerprint_applied = false;
                info!(scope = %run.scope, "device_profile_rolled_back");
                failure.with_rollback(true)
            },
            Err(e) => {
                error!(scope = %run.scope, "device_profile_rollback_failed: {}", e);
                failure.with_rollback(false)
            },
        }
    }

    async fn blocking<T, F>(&self, task: F) -> AppResult<T>
    where
        T: Send + 'static,
        F: FnOnce(&DeviceProfileManager) -> AppResult<T> + Send + 'static,
    {
        let profiles = Arc::clone(&self.profiles);
        tokio::task::spawn_blocking(move || task(&profiles)).await?
    }
}

impl fmt::Debug for SwitchFlow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SwitchFlow").field("profiles", &self.profiles).finish_non_exhaustive()
    }
}
