//! TaskOrchestrator - 整理タスクの状態機械
//!
//! # フロー
//! 1. 設定を検証（失敗したら running に入らない）
//! 2. TaskStore で check-and-set（running 中なら AlreadyRunning）
//! 3. fetching-tabs → ungrouping → calling-ai → creating-groups を順に実行
//! 4. completed / error / cancelled で終了
//!
//! # キャンセル
//! 2 つの経路を両方見ます。
//! - CancellationToken（同一プロセス、AI 呼び出しを即座に中断）
//! - 永続化された `cancelled` 状態（別プロセスの UI から書かれる）
//!
//! 永続側の変更は watcher がトークンに橋渡しします。フェーズ境界では
//! 両方を確認し、状態の書き込みは「まだ running のときだけ」行うので、
//! 外から書かれた `cancelled` を上書きすることはありません。

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::Instrument;

use super::applier::{ApplyOptions, TabMutationApplier};
use crate::config::{AiConfig, OrganizeSettings};
use crate::domain::{OrganizeError, RunId, StartError, TaskPhase, TaskState};
use crate::grouping::GroupingClient;
use crate::ports::{
    Clock, DebugLog, DebugSink, IdGenerator, NoopDebugSink, StoreError, SystemClock, TabPlatform,
    TaskStore, UlidGenerator,
};

/// Message stored when a run left behind by a dead process is cleaned up.
pub const INTERRUPTED_MESSAGE: &str = "the previous organize task was interrupted";

const CANCEL_POLL_INTERVAL: Duration = Duration::from_millis(500);

/// Everything one run needs from the caller.
#[derive(Debug, Clone)]
pub struct OrganizeRequest {
    pub config: AiConfig,
    pub settings: OrganizeSettings,
}

impl OrganizeRequest {
    pub fn new(config: AiConfig, settings: OrganizeSettings) -> Self {
        Self { config, settings }
    }
}

/// Returned by [`TaskOrchestrator::start`]. Dropping it does not stop the task.
pub struct TaskHandle {
    run_id: RunId,
    cancel: CancellationToken,
    join: JoinHandle<TaskState>,
}

impl TaskHandle {
    pub fn run_id(&self) -> RunId {
        self.run_id
    }

    /// Cooperative cancellation from the process that started the task.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Wait for the terminal state.
    pub async fn join(self) -> Result<TaskState, tokio::task::JoinError> {
        self.join.await
    }
}

#[derive(Clone)]
pub struct TaskOrchestrator {
    store: Arc<dyn TaskStore>,
    applier: TabMutationApplier,
    client: Arc<GroupingClient>,
    clock: Arc<dyn Clock>,
    ids: Arc<dyn IdGenerator>,
}

impl TaskOrchestrator {
    pub fn new(
        store: Arc<dyn TaskStore>,
        platform: Arc<dyn TabPlatform>,
        client: GroupingClient,
    ) -> Self {
        let clock: Arc<dyn Clock> = Arc::new(SystemClock);
        Self {
            store,
            applier: TabMutationApplier::new(platform),
            client: Arc::new(client),
            ids: Arc::new(UlidGenerator::new(clock.clone())),
            clock,
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.ids = Arc::new(UlidGenerator::new(clock.clone()));
        self.clock = clock;
        self
    }

    pub fn store(&self) -> &Arc<dyn TaskStore> {
        &self.store
    }

    /// Validate, claim the running slot and continue in the background.
    ///
    /// Returns as soon as the state is `running`; progress is visible only
    /// through the store.
    pub async fn start(&self, request: OrganizeRequest) -> Result<TaskHandle, StartError> {
        let run_id = self.begin(&request).await?;
        let cancel = CancellationToken::new();
        let this = self.clone();
        let token = cancel.clone();
        let join = tokio::spawn(async move { this.execute(run_id, request, token).await });
        Ok(TaskHandle {
            run_id,
            cancel,
            join,
        })
    }

    /// Same as [`TaskOrchestrator::start`] but runs to the terminal state in
    /// the current task.
    pub async fn run(
        &self,
        request: OrganizeRequest,
        cancel: CancellationToken,
    ) -> Result<TaskState, StartError> {
        let run_id = self.begin(&request).await?;
        Ok(self.execute(run_id, request, cancel).await)
    }

    /// Turn a `running` state older than `max_age` into an error. Meant for
    /// process start-up, when no task of this process can be running yet.
    pub async fn recover_stale(&self, max_age: Duration) -> Result<Option<TaskState>, StoreError> {
        let now = self.clock.now();
        let max_age = chrono::Duration::from_std(max_age).unwrap_or(chrono::Duration::MAX);
        let recovered = self
            .store
            .update(Box::new(move |state: &TaskState| match state {
                TaskState::Running { started_at, .. } if now - *started_at > max_age => {
                    Some(TaskState::Error {
                        message: INTERRUPTED_MESSAGE.to_string(),
                        debug_log: None,
                        failed_at: now,
                    })
                }
                _ => None,
            }))
            .await?;
        if recovered.is_some() {
            tracing::warn!("cleared a stale running task");
        }
        Ok(recovered)
    }

    async fn begin(&self, request: &OrganizeRequest) -> Result<RunId, StartError> {
        request.config.validate()?;

        let started_at = self.clock.now();
        let claimed = self
            .store
            .update(Box::new(move |state: &TaskState| {
                (!state.is_running()).then(|| TaskState::running(TaskPhase::FetchingTabs, started_at))
            }))
            .await?;
        if claimed.is_none() {
            return Err(StartError::AlreadyRunning);
        }

        let run_id = self.ids.generate_run_id();
        tracing::info!(%run_id, model = %request.config.model, "organize task started");
        Ok(run_id)
    }

    async fn execute(
        &self,
        run_id: RunId,
        request: OrganizeRequest,
        cancel: CancellationToken,
    ) -> TaskState {
        let span = tracing::info_span!("organize", %run_id);
        async {
            let watcher = self.watch_persisted_cancel(cancel.clone());
            let log = DebugLog::new();
            let sink: &dyn DebugSink = if request.settings.debug {
                log.push(format!("run {run_id}"));
                &log
            } else {
                &NoopDebugSink
            };
            let debug_log = || request.settings.debug.then(|| log.lines());

            let outcome = self.pipeline(&request, &cancel, sink).await;
            watcher.abort();

            let now = self.clock.now();
            let result = match outcome {
                Ok(group_count) => {
                    tracing::info!(group_count, "organize task completed");
                    self.finish(TaskState::Completed {
                        group_count,
                        debug_log: debug_log(),
                        completed_at: now,
                    })
                    .await
                }
                Err(OrganizeError::Cancelled) => {
                    tracing::info!("organize task cancelled");
                    self.finish(TaskState::Cancelled { cancelled_at: now }).await
                }
                Err(err) => {
                    tracing::warn!(%err, kind = ?err.kind(), "organize task failed");
                    sink.push(format!("failed ({:?}): {err:?}", err.kind()));
                    self.finish(TaskState::Error {
                        message: err.to_string(),
                        debug_log: debug_log(),
                        failed_at: now,
                    })
                    .await
                }
            };

            match result {
                Ok(state) => state,
                Err(err) => {
                    tracing::error!(%err, "could not persist the final task state");
                    TaskState::Error {
                        message: OrganizeError::from(err).to_string(),
                        debug_log: None,
                        failed_at: now,
                    }
                }
            }
        }
        .instrument(span)
        .await
    }

    /// Phases in order. Returns the number of groups created.
    async fn pipeline(
        &self,
        request: &OrganizeRequest,
        cancel: &CancellationToken,
        debug: &dyn DebugSink,
    ) -> Result<usize, OrganizeError> {
        // fetching-tabs (entered by `begin`)
        self.checkpoint(cancel).await?;
        let tabs = self.applier.list_tabs().await?;
        debug.push(format!("fetched {} tabs", tabs.len()));
        self.checkpoint(cancel).await?;
        if tabs.is_empty() {
            return Err(OrganizeError::NoTabs);
        }

        self.advance(TaskPhase::Ungrouping).await?;
        self.checkpoint(cancel).await?;
        let ungrouped = self.applier.ungroup_all().await?;
        debug.push(format!("ungrouped {ungrouped} tabs"));
        self.checkpoint(cancel).await?;

        self.advance(TaskPhase::CallingAi).await?;
        self.checkpoint(cancel).await?;
        let groups = self
            .client
            .organize(&tabs, &request.config, cancel, debug)
            .await?;
        self.checkpoint(cancel).await?;

        self.advance(TaskPhase::CreatingGroups).await?;
        self.checkpoint(cancel).await?;
        // The user may have switched tabs while the AI was thinking.
        let active_tab = match self.applier.platform().active_tab().await {
            Ok(active) => active,
            Err(err) => {
                tracing::warn!(%err, "could not resolve the active tab");
                None
            }
        };
        let report = self
            .applier
            .apply_groups(
                &groups,
                ApplyOptions {
                    collapse_others: request.settings.collapse_others,
                    active_tab,
                },
            )
            .await;
        debug.push(format!(
            "created {} groups, skipped {} empty, {} failed",
            report.applied,
            report.skipped_empty,
            report.failed.len()
        ));
        if report.is_partial() {
            tracing::warn!(failed = report.failed.len(), "some groups could not be created");
            for failure in &report.failed {
                debug.push(format!("group {:?} failed: {}", failure.name, failure.reason));
            }
        }
        self.checkpoint(cancel).await?;

        Ok(report.applied)
    }

    /// Stop if either cancellation source fired, or if the run lost the
    /// running slot for any other reason.
    async fn checkpoint(&self, cancel: &CancellationToken) -> Result<(), OrganizeError> {
        if cancel.is_cancelled() {
            return Err(OrganizeError::Cancelled);
        }
        if !self.store.load().await?.is_running() {
            cancel.cancel();
            return Err(OrganizeError::Cancelled);
        }
        Ok(())
    }

    async fn advance(&self, phase: TaskPhase) -> Result<(), OrganizeError> {
        let advanced = self
            .store
            .update(Box::new(move |state: &TaskState| match state {
                TaskState::Running { started_at, .. } => {
                    Some(TaskState::running(phase, *started_at))
                }
                _ => None,
            }))
            .await?;
        match advanced {
            Some(_) => {
                tracing::info!(phase = phase.as_str(), "phase");
                Ok(())
            }
            None => Err(OrganizeError::Cancelled),
        }
    }

    /// Write the terminal state only while still running; otherwise keep
    /// whatever is there (an external `cancelled`).
    async fn finish(&self, terminal: TaskState) -> Result<TaskState, StoreError> {
        let written = self
            .store
            .update(Box::new(move |state: &TaskState| {
                state.is_running().then(|| terminal.clone())
            }))
            .await?;
        match written {
            Some(state) => Ok(state),
            None => self.store.load().await,
        }
    }

    /// Fire `cancel` when the persisted state turns `cancelled`. Writes from
    /// another process do not reach the watch channel, so the store is also
    /// polled.
    fn watch_persisted_cancel(&self, cancel: CancellationToken) -> JoinHandle<()> {
        let store = self.store.clone();
        let mut rx = store.subscribe();
        tokio::spawn(async move {
            loop {
                let cancelled = tokio::select! {
                    _ = cancel.cancelled() => return,
                    changed = rx.changed() => match changed {
                        Ok(()) => rx.borrow_and_update().is_cancelled(),
                        Err(_) => return,
                    },
                    _ = tokio::time::sleep(CANCEL_POLL_INTERVAL) => {
                        store.load().await.is_ok_and(|state| state.is_cancelled())
                    }
                };
                if cancelled {
                    tracing::info!("cancellation requested");
                    cancel.cancel();
                    return;
                }
            }
        })
    }
}
