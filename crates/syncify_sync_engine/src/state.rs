//! Polling sync driver with connection status tracking.

use crate::config::SyncConfig;
use crate::differences::{Differences, Divergence};
use crate::error::{SyncError, SyncResult};
use crate::fetcher::RemoteFetcher;
use crate::synchronizer::{BranchSynchronizer, Conflict, SyncOutcome};
use parking_lot::RwLock;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::SystemTime;
use syncify_core::{
    topological_order, Branch, BranchKind, CommandRef, CoreResult, State, Workspace,
    WorkspaceManipulator,
};
use tokio::sync::watch;
use tokio::time::{self, Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

/// Source of wall-clock time for `last_synced`.
pub trait Clock: Send + Sync {
    /// Returns the current time.
    fn now(&self) -> SystemTime;
}

/// [`Clock`] reading the system time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> SystemTime {
        SystemTime::now()
    }
}

/// Connection state of a [`SyncEngine`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionStatus {
    /// No workspace yet; the first tick clones the branch.
    Loading,
    /// Seeded with a workspace, never synchronized.
    Initial,
    /// Last cycle succeeded.
    Synced,
    /// Last cycle found diverged histories.
    Conflict,
    /// Every attempt so far has failed and there is no workspace.
    NeverConnected,
    /// Last cycle failed; the workspace is still usable.
    DisconnectedSynced,
    /// Last cycle failed while a conflict was pending.
    DisconnectedConflict,
}

impl ConnectionStatus {
    /// Returns true if the last cycle reached the remote.
    pub fn is_connected(&self) -> bool {
        matches!(self, ConnectionStatus::Synced | ConnectionStatus::Conflict)
    }

    /// Returns true while a conflict awaits resolution.
    pub fn has_conflict(&self) -> bool {
        matches!(
            self,
            ConnectionStatus::Conflict | ConnectionStatus::DisconnectedConflict
        )
    }

    /// Returns the status after a failed cycle.
    pub fn after_failure(self) -> Self {
        match self {
            ConnectionStatus::Loading | ConnectionStatus::NeverConnected => {
                ConnectionStatus::NeverConnected
            }
            ConnectionStatus::Initial
            | ConnectionStatus::Synced
            | ConnectionStatus::DisconnectedSynced => ConnectionStatus::DisconnectedSynced,
            ConnectionStatus::Conflict | ConnectionStatus::DisconnectedConflict => {
                ConnectionStatus::DisconnectedConflict
            }
        }
    }
}

/// How to settle a pending conflict.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConflictResolution {
    /// Keep the local state.
    KeepLocal,
    /// Adopt the remote state.
    AcceptRemote,
}

/// Result of [`SyncEngine::tick`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// Another cycle was in flight.
    Skipped,
    /// A cycle ran and left the engine in this status.
    Completed(ConnectionStatus),
}

/// Statistics about sync operations.
#[derive(Debug, Clone, Default)]
pub struct SyncStats {
    /// Total number of sync cycles completed.
    pub cycles_completed: u64,
    /// Total number of commits received from the remote.
    pub commits_received: u64,
    /// Total number of cycles that ended in a conflict.
    pub conflicts_encountered: u64,
    /// Total number of failed cycles.
    pub failures: u64,
    /// Total number of retries.
    pub retries: u64,
    /// Ticks skipped because a cycle was in flight.
    pub skipped_ticks: u64,
    /// Last error message.
    pub last_error: Option<String>,
}

struct EngineState<S> {
    workspace: Option<Workspace<S>>,
    conflict: Option<Conflict<S>>,
    status: ConnectionStatus,
    /// Bumped by every local edit.
    version: u64,
    last_synced: Option<SystemTime>,
}

/// Clears the in-flight flag when a tick ends, however it ends.
struct InFlight<'a>(&'a AtomicBool);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// Keeps one branch of a local workspace synchronized with a remote.
///
/// Edits go through [`apply`](Self::apply), [`undo`](Self::undo) and
/// [`redo`](Self::redo). [`tick`](Self::tick) runs one cycle;
/// [`run`](Self::run) ticks on an interval until shutdown. At most one
/// cycle is in flight; overlapping ticks are skipped, not queued.
pub struct SyncEngine<S, F> {
    config: SyncConfig,
    synchronizer: BranchSynchronizer<S, F>,
    clock: Arc<dyn Clock>,
    state: RwLock<EngineState<S>>,
    stats: RwLock<SyncStats>,
    in_flight: AtomicBool,
}

impl<S, F> fmt::Debug for SyncEngine<S, F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SyncEngine")
            .field("config", &self.config)
            .field("status", &self.state.read().status)
            .finish_non_exhaustive()
    }
}

impl<S: State, F: RemoteFetcher> SyncEngine<S, F> {
    /// Creates an engine. Without an `initial` workspace the first tick
    /// clones the branch from the remote.
    ///
    /// # Errors
    ///
    /// [`SyncError::InvalidConfig`] if `config` is out of bounds.
    pub fn new(
        config: SyncConfig,
        synchronizer: BranchSynchronizer<S, F>,
        initial: Option<Workspace<S>>,
    ) -> SyncResult<Self> {
        config.validate()?;
        let status = match initial {
            Some(_) => ConnectionStatus::Initial,
            None => ConnectionStatus::Loading,
        };

        Ok(Self {
            config,
            synchronizer,
            clock: Arc::new(SystemClock),
            state: RwLock::new(EngineState {
                workspace: initial,
                conflict: None,
                status,
                version: 0,
                last_synced: None,
            }),
            stats: RwLock::new(SyncStats::default()),
            in_flight: AtomicBool::new(false),
        })
    }

    /// Replaces the clock.
    pub fn with_clock(mut self, clock: impl Clock + 'static) -> Self {
        self.clock = Arc::new(clock);
        self
    }

    /// Returns the configuration.
    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    /// Returns the synchronizer.
    pub fn synchronizer(&self) -> &BranchSynchronizer<S, F> {
        &self.synchronizer
    }

    /// Gets the current status.
    pub fn status(&self) -> ConnectionStatus {
        self.state.read().status
    }

    /// Gets the current stats.
    pub fn stats(&self) -> SyncStats {
        self.stats.read().clone()
    }

    /// Returns the current workspace, if any.
    pub fn workspace(&self) -> Option<Workspace<S>> {
        self.state.read().workspace.clone()
    }

    /// Returns the pending conflict, if any.
    pub fn conflict(&self) -> Option<Conflict<S>> {
        self.state.read().conflict.clone()
    }

    /// Returns when the last cycle ended in sync.
    pub fn last_synced(&self) -> Option<SystemTime> {
        self.state.read().last_synced
    }

    /// Returns true while a cycle is in flight.
    pub fn is_syncing(&self) -> bool {
        self.in_flight.load(Ordering::SeqCst)
    }

    /// Returns the state at the head of the synchronized branch.
    pub fn head_state(&self) -> SyncResult<Option<S>> {
        match self.workspace() {
            Some(ws) => Ok(Some(ws.head_state(&self.config.branch)?)),
            None => Ok(None),
        }
    }

    /// Records a command on the branch.
    ///
    /// # Errors
    ///
    /// [`SyncError::UnresolvedConflict`] while a conflict is pending.
    pub fn apply(&self, command: CommandRef<S>) -> SyncResult<()> {
        self.edit(move |m| m.apply(command))
    }

    /// Undoes the latest undoable edit on the branch.
    pub fn undo(&self) -> SyncResult<()> {
        self.edit(WorkspaceManipulator::undo)
    }

    /// Redoes the latest undo on the branch.
    pub fn redo(&self) -> SyncResult<()> {
        self.edit(WorkspaceManipulator::redo)
    }

    /// Returns true if [`undo`](Self::undo) would succeed.
    pub fn can_undo(&self) -> bool {
        self.manipulator().is_some_and(|m| m.can_undo())
    }

    /// Returns true if [`redo`](Self::redo) would succeed.
    pub fn can_redo(&self) -> bool {
        self.manipulator().is_some_and(|m| m.can_redo())
    }

    fn manipulator(&self) -> Option<WorkspaceManipulator<S>> {
        let state = self.state.read();
        if state.conflict.is_some() {
            return None;
        }
        let workspace = state.workspace.clone()?;
        Some(WorkspaceManipulator::new(workspace).on_branch(self.config.branch.clone()))
    }

    fn edit<E>(&self, op: E) -> SyncResult<()>
    where
        E: FnOnce(WorkspaceManipulator<S>) -> CoreResult<WorkspaceManipulator<S>>,
    {
        let branch = &self.config.branch;
        let mut state = self.state.write();
        if state.conflict.is_some() {
            return Err(SyncError::UnresolvedConflict {
                branch: branch.clone(),
            });
        }
        let workspace = state
            .workspace
            .clone()
            .ok_or_else(|| SyncError::MissingLocalBranch {
                branch: branch.clone(),
            })?;

        let next = op(WorkspaceManipulator::new(workspace).on_branch(branch.clone()))?;
        state.workspace = Some(next.into_workspace());
        state.version += 1;
        Ok(())
    }

    /// Settles the pending conflict with a merge commit.
    ///
    /// # Errors
    ///
    /// [`SyncError::ImpossibleSyncState`] if no conflict is pending.
    pub fn resolve(&self, resolution: ConflictResolution) -> SyncResult<()> {
        let branch = &self.config.branch;
        let mut state = self.state.write();
        let conflict = state
            .conflict
            .clone()
            .ok_or_else(|| SyncError::impossible(branch, "no conflict to resolve"))?;

        let workspace = match resolution {
            ConflictResolution::KeepLocal => conflict.take_local()?,
            ConflictResolution::AcceptRemote => conflict.take_remote()?,
        };

        state.conflict = None;
        state.workspace = Some(workspace);
        state.version += 1;
        state.status = match state.status {
            ConnectionStatus::DisconnectedConflict => ConnectionStatus::DisconnectedSynced,
            _ => ConnectionStatus::Synced,
        };
        Ok(())
    }

    /// Runs one synchronization cycle with retries.
    ///
    /// Returns [`TickOutcome::Skipped`] without doing anything if another
    /// cycle is in flight. Commits fetched before a failure are kept.
    pub async fn tick(&self) -> SyncResult<TickOutcome> {
        if self.in_flight.swap(true, Ordering::SeqCst) {
            debug!("sync already in flight, skipping tick");
            self.stats.write().skipped_ticks += 1;
            return Ok(TickOutcome::Skipped);
        }
        let _flight = InFlight(&self.in_flight);

        let (seed, version) = {
            let state = self.state.read();
            (state.workspace.clone(), state.version)
        };
        let seed_len = seed.as_ref().map_or(0, Workspace::len);

        let mut progress = None;
        match self.sync_with_retry(seed, &mut progress).await {
            Ok(outcome) => {
                let received = outcome.workspace().len().saturating_sub(seed_len);
                let status = match self.absorb_outcome(outcome, version) {
                    Ok(status) => status,
                    Err(e) => {
                        self.handle_error(&e);
                        return Err(e);
                    }
                };

                let mut stats = self.stats.write();
                stats.cycles_completed += 1;
                stats.commits_received += received as u64;
                if status == ConnectionStatus::Conflict {
                    stats.conflicts_encountered += 1;
                }
                stats.last_error = None;
                Ok(TickOutcome::Completed(status))
            }
            Err(e) => {
                if let Some(fetched) = progress {
                    let mut state = self.state.write();
                    if let Ok(merged) = self.reconcile_edits(&state, fetched, version) {
                        if state.conflict.is_none() {
                            state.workspace = Some(merged);
                        }
                    }
                }
                self.handle_error(&e);
                Err(e)
            }
        }
    }

    /// Performs a cycle with retry on transient errors.
    async fn sync_with_retry(
        &self,
        seed: Option<Workspace<S>>,
        progress: &mut Option<Workspace<S>>,
    ) -> SyncResult<SyncOutcome<S>> {
        let retry_config = &self.config.retry;
        let mut attempt = 0;

        loop {
            if attempt > 0 {
                time::sleep(retry_config.delay_for_attempt(attempt)).await;
                self.stats.write().retries += 1;
            }

            let start = progress.clone().or_else(|| seed.clone());
            match self.attempt(start, progress).await {
                Ok(outcome) => return Ok(outcome),
                Err(e) if e.is_retryable() && attempt + 1 < retry_config.max_attempts => {
                    warn!(attempt, error = %e, "sync attempt failed, retrying");
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// One attempt bounded by the configured timeout. Each completed step
    /// is recorded in `progress`.
    async fn attempt(
        &self,
        seed: Option<Workspace<S>>,
        progress: &mut Option<Workspace<S>>,
    ) -> SyncResult<SyncOutcome<S>> {
        let branch = self.config.branch.as_str();
        let cycle = async {
            let Some(workspace) = seed else {
                let cloned = self.synchronizer.clone_branch(branch).await?;
                return Ok(SyncOutcome::Synced(cloned));
            };
            let fetched = self.synchronizer.fetch(workspace, branch).await?;
            *progress = Some(fetched.clone());
            let ensured = self.synchronizer.ensure_remote_branch(fetched, branch).await?;
            *progress = Some(ensured.clone());
            self.synchronizer.reconcile(ensured, branch).await
        };

        time::timeout(self.config.timeout, cycle)
            .await
            .map_err(|_| SyncError::Timeout)?
    }

    /// Installs a finished cycle's result, keeping edits made while it
    /// was in flight. With such edits the outcome is stale, so the status
    /// is derived from the merged workspace instead.
    fn absorb_outcome(&self, outcome: SyncOutcome<S>, version: u64) -> SyncResult<ConnectionStatus> {
        let branch = &self.config.branch;
        let mut state = self.state.write();
        let edited = state.version != version;

        let diverged = match &outcome {
            _ if edited => None,
            SyncOutcome::Synced(_) => Some(false),
            SyncOutcome::Conflict(_) => Some(true),
        };
        let ws = self.reconcile_edits(&state, outcome.into_workspace(), version)?;
        let diverged = match diverged {
            Some(diverged) => diverged,
            None => Differences::between(&ws, branch)?.divergence() == Divergence::Diverged,
        };

        if diverged {
            state.conflict = Some(Conflict::new(ws.clone(), branch.clone())?);
            state.status = ConnectionStatus::Conflict;
        } else {
            state.conflict = None;
            state.status = ConnectionStatus::Synced;
            state.last_synced = Some(self.clock.now());
        }
        state.workspace = Some(ws);

        info!(branch = %branch, status = ?state.status, edited, "sync cycle complete");
        Ok(state.status)
    }

    /// Returns `fetched` if no edit happened since `version`, otherwise
    /// the current workspace plus the fetched commits and remote ref.
    fn reconcile_edits(
        &self,
        state: &EngineState<S>,
        fetched: Workspace<S>,
        version: u64,
    ) -> SyncResult<Workspace<S>> {
        let current = match &state.workspace {
            Some(current) if state.version != version => current,
            _ => return Ok(fetched),
        };

        debug!(
            since = version,
            now = state.version,
            "local edits during sync, merging fetched commits"
        );
        let new_commits: Vec<_> = fetched
            .commits()
            .filter(|c| !current.has_commit(c.hash()))
            .cloned()
            .collect();
        let mut merged = current.add_commits(topological_order(new_commits))?;

        let branch = &self.config.branch;
        if let Some(remote) = fetched.branches().head(BranchKind::Remote, branch) {
            merged = merged.upsert_branch(Branch::remote(branch.clone(), remote.clone()))?;
        }
        Ok(merged)
    }

    /// Handles an error by updating status and stats.
    fn handle_error(&self, error: &SyncError) {
        let status = {
            let mut state = self.state.write();
            state.status = state.status.after_failure();
            state.status
        };
        warn!(error = %error, status = ?status, "sync cycle failed");

        let mut stats = self.stats.write();
        stats.failures += 1;
        stats.last_error = Some(error.to_string());
    }
}

impl<S: State, F: RemoteFetcher + 'static> SyncEngine<S, F> {
    /// Ticks every `sync_interval` until `shutdown` turns true or its
    /// sender is dropped. The first tick fires one interval after start.
    ///
    /// Each tick runs on its own task, so a slow cycle makes later ticks
    /// skip rather than pile up.
    pub async fn run(self: Arc<Self>, mut shutdown: watch::Receiver<bool>) {
        let period = self.config.sync_interval;
        let mut interval = time::interval_at(Instant::now() + period, period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
        info!(branch = %self.config.branch, ?period, "sync loop started");

        loop {
            tokio::select! {
                _ = interval.tick() => {
                    let engine = Arc::clone(&self);
                    tokio::spawn(async move {
                        if let Err(e) = engine.tick().await {
                            debug!(error = %e, "scheduled tick failed");
                        }
                    });
                }
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
            }
        }

        info!(branch = %self.config.branch, "sync loop stopped");
    }
}
