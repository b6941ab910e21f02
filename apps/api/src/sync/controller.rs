//! Autosave state machine.
//!
//! One actor task owns the document, the last-confirmed-saved snapshot, the
//! debounce deadline and the refresh interval. Edits and commit-now requests
//! arrive as commands; remote calls run as spawned tasks and report back as
//! completions, so a `get` and a `set` may finish in either order.
//!
//! ```text
//! Uninitialized --sign_in--> Loading --get ok--> Ready
//!                               |
//!                               +--get err--> Loading (no retry)
//! ```
//!
//! In `Ready`, a change that differs from the snapshot (re)arms the debounce
//! deadline. When it fires, or on `commit_now`, the save procedure runs. Every
//! refresh interval the remote document is fetched and overwrites local state.
//!
//! Saves carry the refresh epoch they started under. A save that completes after
//! a refresh has been applied does not touch the snapshot.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::time::{interval_at, Instant, Interval, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::config::SyncConfig;
use crate::cv::cache::{CacheWriter, LocalCache};
use crate::cv::{CvDocument, EditError, EditOp, LocalEditStore};
use crate::sync::admission::{admit, Admission};
use crate::sync::debounce::Debouncer;
use crate::sync::notify::Notification;
use crate::sync::store::{ProfileStore, StoreError, UserId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Uninitialized,
    Loading,
    Ready,
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Uninitialized => write!(f, "Uninitialized"),
            Self::Loading => write!(f, "Loading"),
            Self::Ready => write!(f, "Ready"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SyncStatus {
    pub phase: Phase,
    /// A debounce deadline is armed.
    pub pending_save: bool,
    /// At least one `set` is in flight.
    pub saving: bool,
    /// The local document differs from the last-confirmed-saved snapshot.
    pub dirty: bool,
    pub last_saved_at: Option<DateTime<Utc>>,
}

impl SyncStatus {
    fn initial() -> Self {
        Self {
            phase: Phase::Uninitialized,
            pending_save: false,
            saving: false,
            dirty: false,
            last_saved_at: None,
        }
    }
}

#[derive(Debug, Error)]
pub enum SyncError {
    #[error("document is not loaded yet")]
    NotReady,

    #[error(transparent)]
    Edit(#[from] EditError),

    #[error("sync controller has shut down")]
    Closed,
}

enum Command {
    SignIn(UserId),
    Apply {
        op: EditOp,
        reply: oneshot::Sender<Result<bool, SyncError>>,
    },
    CommitNow {
        reply: oneshot::Sender<bool>,
    },
    Confirmed {
        reply: oneshot::Sender<Option<CvDocument>>,
    },
    Shutdown,
}

enum Completion {
    Loaded(Result<Option<CvDocument>, StoreError>),
    Saved {
        document: CvDocument,
        refresh_epoch: u64,
        result: Result<(), StoreError>,
    },
    Refreshed(Result<Option<CvDocument>, StoreError>),
}

/// Cloneable front end to the controller task.
#[derive(Clone)]
pub struct SyncHandle {
    commands: mpsc::UnboundedSender<Command>,
    status: watch::Receiver<SyncStatus>,
    document: watch::Receiver<CvDocument>,
}

impl SyncHandle {
    /// Starts the initial load for `user`. Ignored once a user is signed in.
    pub fn sign_in(&self, user: UserId) -> Result<(), SyncError> {
        self.send(Command::SignIn(user))
    }

    /// Applies an edit. Returns whether the document changed.
    pub async fn apply(&self, op: EditOp) -> Result<bool, SyncError> {
        let (reply, rx) = oneshot::channel();
        self.send(Command::Apply { op, reply })?;
        rx.await.map_err(|_| SyncError::Closed)?
    }

    /// Eager flush, e.g. when the edit surface loses focus. Returns whether a save was issued.
    pub async fn commit_now(&self) -> Result<bool, SyncError> {
        let (reply, rx) = oneshot::channel();
        self.send(Command::CommitNow { reply })?;
        rx.await.map_err(|_| SyncError::Closed)
    }

    /// The last-confirmed-saved snapshot, if a load has succeeded.
    pub async fn confirmed(&self) -> Result<Option<CvDocument>, SyncError> {
        let (reply, rx) = oneshot::channel();
        self.send(Command::Confirmed { reply })?;
        rx.await.map_err(|_| SyncError::Closed)
    }

    pub fn document(&self) -> CvDocument {
        self.document.borrow().clone()
    }

    pub fn subscribe_document(&self) -> watch::Receiver<CvDocument> {
        self.document.clone()
    }

    pub fn status(&self) -> SyncStatus {
        self.status.borrow().clone()
    }

    pub fn subscribe_status(&self) -> watch::Receiver<SyncStatus> {
        self.status.clone()
    }

    pub fn shutdown(&self) {
        // Already gone is fine.
        let _ = self.commands.send(Command::Shutdown);
    }

    fn send(&self, command: Command) -> Result<(), SyncError> {
        self.commands.send(command).map_err(|_| SyncError::Closed)
    }
}

pub struct SyncController;

impl SyncController {
    /// Spawns the controller task on the current runtime.
    ///
    /// With a cache, the cached document is shown until the first load completes,
    /// and every local change is flushed to it.
    pub fn spawn(
        store: Arc<dyn ProfileStore>,
        config: SyncConfig,
        cache: Option<LocalCache>,
    ) -> (SyncHandle, mpsc::UnboundedReceiver<Notification>) {
        let initial = cache
            .as_ref()
            .map(LocalCache::load_or_default)
            .unwrap_or_default();
        let edits = LocalEditStore::new(initial);

        let (command_tx, command_rx) = mpsc::unbounded_channel();
        let (completion_tx, completion_rx) = mpsc::unbounded_channel();
        let (notify_tx, notify_rx) = mpsc::unbounded_channel();
        let (status_tx, status_rx) = watch::channel(SyncStatus::initial());

        let handle = SyncHandle {
            commands: command_tx,
            status: status_rx,
            document: edits.subscribe(),
        };

        let actor = Actor {
            debounce: Debouncer::new(config.debounce),
            store,
            config,
            cache: cache.map(CacheWriter::spawn),
            user: None,
            phase: Phase::Uninitialized,
            edits,
            snapshot: None,
            refresh: None,
            refreshing: false,
            refresh_epoch: 0,
            saves_in_flight: 0,
            last_submitted: None,
            suppressed: None,
            last_saved_at: None,
            status_tx,
            notify_tx,
            completion_tx,
        };
        tokio::spawn(actor.run(command_rx, completion_rx));

        (handle, notify_rx)
    }
}

struct Actor {
    store: Arc<dyn ProfileStore>,
    config: SyncConfig,
    cache: Option<CacheWriter>,
    user: Option<UserId>,
    phase: Phase,
    edits: LocalEditStore,
    snapshot: Option<CvDocument>,
    debounce: Debouncer,
    refresh: Option<Interval>,
    refreshing: bool,
    /// Bumped each time a refresh result is applied.
    refresh_epoch: u64,
    saves_in_flight: usize,
    /// Most recent document handed to `set`, while that call is outstanding.
    last_submitted: Option<CvDocument>,
    /// Document rejected by admission control; not retried until it changes.
    suppressed: Option<CvDocument>,
    last_saved_at: Option<DateTime<Utc>>,
    status_tx: watch::Sender<SyncStatus>,
    notify_tx: mpsc::UnboundedSender<Notification>,
    completion_tx: mpsc::UnboundedSender<Completion>,
}

impl Actor {
    async fn run(
        mut self,
        mut commands: mpsc::UnboundedReceiver<Command>,
        mut completions: mpsc::UnboundedReceiver<Completion>,
    ) {
        loop {
            tokio::select! {
                command = commands.recv() => match command {
                    Some(Command::Shutdown) | None => break,
                    Some(command) => self.on_command(command),
                },
                Some(completion) = completions.recv() => self.on_completion(completion),
                _ = self.debounce.elapsed() => self.on_debounce_elapsed(),
                _ = next_tick(&mut self.refresh) => self.start_refresh(),
            }
            self.publish_status();
        }
        debug!("Sync controller stopped");
    }

    fn on_command(&mut self, command: Command) {
        match command {
            Command::SignIn(user) => self.sign_in(user),
            Command::Apply { op, reply } => {
                let _ = reply.send(self.apply(op));
            }
            Command::CommitNow { reply } => {
                let _ = reply.send(self.commit_now());
            }
            Command::Confirmed { reply } => {
                let _ = reply.send(self.snapshot.clone());
            }
            Command::Shutdown => {}
        }
    }

    fn sign_in(&mut self, user: UserId) {
        if self.phase != Phase::Uninitialized {
            debug!("Ignoring sign-in for {user}: already {}", self.phase);
            return;
        }
        info!("Loading CV for user {user}");
        self.phase = Phase::Loading;
        self.user = Some(user.clone());

        let store = Arc::clone(&self.store);
        let tx = self.completion_tx.clone();
        tokio::spawn(async move {
            let result = store.get(&user).await;
            let _ = tx.send(Completion::Loaded(result));
        });
    }

    fn apply(&mut self, op: EditOp) -> Result<bool, SyncError> {
        if self.phase != Phase::Ready {
            return Err(SyncError::NotReady);
        }
        let changed = self.edits.apply(op)?;
        if changed {
            self.persist_local();
            self.observe_change();
        }
        Ok(changed)
    }

    fn observe_change(&mut self) {
        let current = self.edits.current();
        if self.needs_save(&current) {
            self.debounce.arm();
        } else {
            self.debounce.cancel();
        }
    }

    fn commit_now(&mut self) -> bool {
        if self.phase != Phase::Ready {
            return false;
        }
        let current = self.edits.current();
        if !self.needs_save(&current) {
            return false;
        }
        self.debounce.cancel();
        self.save(current)
    }

    fn on_debounce_elapsed(&mut self) {
        let current = self.edits.current();
        if self.needs_save(&current) {
            self.save(current);
        }
    }

    fn needs_save(&self, doc: &CvDocument) -> bool {
        self.snapshot.as_ref() != Some(doc)
            && self.last_submitted.as_ref() != Some(doc)
            && self.suppressed.as_ref() != Some(doc)
    }

    /// Admission control followed by the remote write. Returns whether `set` was issued.
    fn save(&mut self, document: CvDocument) -> bool {
        let Some(user) = self.user.clone() else {
            return false;
        };

        match admit(&document, self.config.max_payload_bytes) {
            Ok(Admission::Admitted { size }) => {
                debug!("Saving CV for user {user} ({size} bytes)");
            }
            Ok(Admission::TooLarge { size, limit }) => {
                warn!("Not saving CV for {user}: payload {size} bytes exceeds {limit}");
                self.suppressed = Some(document);
                self.notify(Notification::PayloadTooLarge { size, limit });
                return false;
            }
            Err(e) => {
                warn!("Not saving CV for {user}: serialization failed: {e}");
                self.notify(Notification::SaveFailed {
                    reason: e.to_string(),
                });
                return false;
            }
        }

        self.saves_in_flight += 1;
        self.last_submitted = Some(document.clone());

        let refresh_epoch = self.refresh_epoch;
        let store = Arc::clone(&self.store);
        let tx = self.completion_tx.clone();
        tokio::spawn(async move {
            let result = store.set(&user, &document).await;
            let _ = tx.send(Completion::Saved {
                document,
                refresh_epoch,
                result,
            });
        });
        true
    }

    fn start_refresh(&mut self) {
        if self.phase != Phase::Ready || self.refreshing {
            return;
        }
        let Some(user) = self.user.clone() else {
            return;
        };
        debug!("Refreshing CV for user {user}");
        self.refreshing = true;

        let store = Arc::clone(&self.store);
        let tx = self.completion_tx.clone();
        tokio::spawn(async move {
            let result = store.get(&user).await;
            let _ = tx.send(Completion::Refreshed(result));
        });
    }

    fn on_completion(&mut self, completion: Completion) {
        match completion {
            Completion::Loaded(result) => self.on_loaded(result),
            Completion::Saved {
                document,
                refresh_epoch,
                result,
            } => self.on_saved(document, refresh_epoch, result),
            Completion::Refreshed(result) => self.on_refreshed(result),
        }
    }

    fn on_loaded(&mut self, result: Result<Option<CvDocument>, StoreError>) {
        match result {
            Ok(found) => {
                let document = found.unwrap_or_default();
                self.edits.replace(document.clone());
                self.snapshot = Some(document);
                self.phase = Phase::Ready;
                self.persist_local();
                self.refresh = Some(refresh_interval(self.config.refresh_interval));
                info!("CV loaded, sync controller ready");
            }
            Err(e) => {
                warn!("Initial CV load failed: {e}");
                self.notify_store_error(e, |reason| Notification::LoadFailed { reason });
            }
        }
    }

    fn on_saved(
        &mut self,
        document: CvDocument,
        refresh_epoch: u64,
        result: Result<(), StoreError>,
    ) {
        self.saves_in_flight = self.saves_in_flight.saturating_sub(1);
        if self.last_submitted.as_ref() == Some(&document) {
            self.last_submitted = None;
        }

        match result {
            Ok(()) => {
                if refresh_epoch == self.refresh_epoch {
                    self.snapshot = Some(document);
                    self.last_saved_at = Some(Utc::now());
                } else {
                    debug!("Save completed after a refresh was applied; snapshot left as refreshed");
                }
                self.notify(Notification::Saved);
            }
            Err(e) => {
                warn!("CV save failed: {e}");
                self.notify_store_error(e, |reason| Notification::SaveFailed { reason });
            }
        }
    }

    fn on_refreshed(&mut self, result: Result<Option<CvDocument>, StoreError>) {
        self.refreshing = false;
        match result {
            Ok(Some(document)) => {
                self.refresh_epoch += 1;
                self.debounce.cancel();
                self.suppressed = None;
                if self.edits.replace(document.clone()) {
                    debug!("Refresh replaced local CV");
                    self.persist_local();
                }
                self.snapshot = Some(document);
            }
            Ok(None) => debug!("Refresh found no stored CV; keeping local document"),
            Err(e) => {
                warn!("CV refresh failed: {e}");
                self.notify_store_error(e, |reason| Notification::RefreshFailed { reason });
            }
        }
    }

    fn notify_store_error(&self, error: StoreError, other: impl FnOnce(String) -> Notification) {
        let notification = match error {
            StoreError::Unauthenticated => Notification::SignInRequired,
            StoreError::RemoteUnavailable(reason) => other(reason),
        };
        self.notify(notification);
    }

    fn notify(&self, notification: Notification) {
        // Nobody listening is fine.
        let _ = self.notify_tx.send(notification);
    }

    fn persist_local(&self) {
        if let Some(cache) = &self.cache {
            cache.submit(self.edits.current());
        }
    }

    fn publish_status(&self) {
        let next = SyncStatus {
            phase: self.phase,
            pending_save: self.debounce.is_armed(),
            saving: self.saves_in_flight > 0,
            dirty: self
                .snapshot
                .as_ref()
                .is_some_and(|snapshot| !self.edits.matches(snapshot)),
            last_saved_at: self.last_saved_at,
        };
        self.status_tx.send_if_modified(|status| {
            if *status == next {
                return false;
            }
            *status = next;
            true
        });
    }
}

fn refresh_interval(period: std::time::Duration) -> Interval {
    let mut interval = interval_at(Instant::now() + period, period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
    interval
}

async fn next_tick(interval: &mut Option<Interval>) {
    match interval {
        Some(interval) => {
            interval.tick().await;
        }
        None => std::future::pending::<()>().await,
    }
}
