//! Process-wide single-flight queue for account switches.
//!
//! Requests go through one channel to one worker task, so they run strictly
//! in admission order and never overlap. A failing or panicking action only
//! affects its own caller.

use agswitch_types::models::{SwitchGuardSnapshot, SwitchScope};
use futures::future::BoxFuture;
use futures::FutureExt;
use parking_lot::Mutex;
use std::any::Any;
use std::collections::VecDeque;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info};

use crate::error::{AppError, AppResult};

/// Queued action; delivers its own result through a oneshot.
struct GuardRequest {
    owner: SwitchScope,
    job: BoxFuture<'static, ()>,
}

#[derive(Debug, Default)]
struct GuardState {
    active: Option<SwitchScope>,
    pending: VecDeque<SwitchScope>,
}

/// FIFO mutual exclusion across every switch scope.
pub struct SwitchGuard {
    tx: mpsc::UnboundedSender<GuardRequest>,
    state: Arc<Mutex<GuardState>>,
}

impl SwitchGuard {
    /// Spawns the worker task; must be called inside a Tokio runtime.
    pub fn new() -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let state = Arc::new(Mutex::new(GuardState::default()));
        drop(tokio::spawn(run_worker(rx, Arc::clone(&state))));
        Self { tx, state }
    }

    /// Queue `action` behind every earlier request and wait for its result.
    ///
    /// Once admitted the action runs to completion even if this future is
    /// dropped.
    pub async fn run<T, F, Fut>(&self, owner: SwitchScope, action: F) -> AppResult<T>
    where
        T: Send + 'static,
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = AppResult<T>> + Send + 'static,
    {
        let (result_tx, result_rx) = oneshot::channel();
        let job = async move {
            let outcome = match AssertUnwindSafe(async move { action().await }).catch_unwind().await
            {
                Ok(result) => result,
                Err(panic) => Err(AppError::Unknown(format!(
                    "{} action panicked: {}",
                    owner.owner_tag(),
                    panic_message(panic.as_ref())
                ))),
            };
            let _ = result_tx.send(outcome);
        }
        .boxed();

        {
            let mut state = self.state.lock();
            if self.tx.send(GuardRequest { owner, job }).is_err() {
                return Err(AppError::Unknown("switch_guard_closed".to_string()));
            }
            state.pending.push_back(owner);
            debug!(owner = owner.owner_tag(), pending = state.pending.len(), "switch_guard_enqueued");
        }

        result_rx
            .await
            .map_err(|_| AppError::Unknown(format!("{} result dropped", owner.owner_tag())))?
    }

    /// Active owner and waiting owners in admission order.
    pub fn snapshot(&self) -> SwitchGuardSnapshot {
        let state = self.state.lock();
        SwitchGuardSnapshot {
            active_owner: state.active,
            pending_owners: state.pending.iter().copied().collect(),
            pending_count: state.pending.len(),
        }
    }
}

impl Default for SwitchGuard {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for SwitchGuard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SwitchGuard").field("state", &*self.state.lock()).finish()
    }
}

async fn run_worker(mut rx: mpsc::UnboundedReceiver<GuardRequest>, state: Arc<Mutex<GuardState>>) {
    while let Some(GuardRequest { owner, job }) = rx.recv().await {
        {
            let mut state = state.lock();
            let _ = state.pending.pop_front();
            state.active = Some(owner);
        }
        info!(owner = owner.owner_tag(), "switch_guard_acquired");

        job.await;

        state.lock().active = None;
        info!(owner = owner.owner_tag(), "switch_guard_released");
    }
    debug!("switch_guard_worker_stopped");
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic payload".to_string()
    }
}
