//! # Discovery Coordinator
//!
//! One task owns the discovery state for the current session. UI handlers
//! and finished background fetches both talk to it through a single command
//! channel, so a poll result can never overwrite an optimistic change it did
//! not know about. Every change is published as a [`DiscoveryState`]
//! snapshot on a `watch` channel.
//!
//! ## Architecture
//!
//! - **Network Monitor** (`network_monitor.rs`): reachability, shared with
//!   the retry executor and the offline queue
//! - **Scheduler** (`scheduler.rs`): fixed-interval polling, paused while
//!   offline
//!
//! ## Usage
//!
//! ```rust,no_run
//! use mingle::client::sync::SyncService;
//! # async fn example(client: std::sync::Arc<mingle::client::MingleClient>, session: mingle::client::session::CachedSession) {
//! let handle = SyncService::spawn(client, session, std::time::Duration::from_secs(60));
//! handle.refresh().await.ok();
//! let state = handle.snapshot();
//! println!("{} candidates", state.candidates.len());
//! handle.stop().await;
//! # }
//! ```

pub mod network_monitor;
pub mod scheduler;

pub use network_monitor::{NetworkMonitor, NetworkStatus};
pub use scheduler::SyncScheduler;

use crate::client::discovery::{self, DiscoveryFilters, LikeOutcome};
use crate::client::error::CoreError;
use crate::client::offline::OptimisticLikes;
use crate::client::session::CachedSession;
use crate::client::{MingleClient, WriteOutcome};
use crate::shared::{Like, Profile};
use chrono::{DateTime, Utc};
use futures_util::future::try_join3;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;

const COMMAND_BUFFER: usize = 64;

#[derive(Debug, Error)]
pub enum SyncError {
    #[error("discovery coordinator has stopped")]
    Stopped,

    #[error(transparent)]
    Core(#[from] CoreError),
}

/// What the discovery view renders
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DiscoveryState {
    /// The session's own profile, once it exists in the store
    pub me: Option<Profile>,
    pub filters: DiscoveryFilters,
    pub candidates: Vec<Profile>,
    /// Confirmed likes sent by this session
    pub likes_sent: Vec<Like>,
    /// Session ids this session is matched with
    pub matches: Vec<String>,
    /// Targets shown as liked while the write is unconfirmed
    pub optimistic: Vec<String>,
    pub online: bool,
    pub last_refreshed: Option<DateTime<Utc>>,
    pub last_error: Option<String>,
}

impl DiscoveryState {
    /// Whether `target` shows as liked, confirmed or not
    pub fn is_liked(&self, target: &str) -> bool {
        self.optimistic.iter().any(|t| t == target)
            || self.likes_sent.iter().any(|like| like.liked_session_id == target)
    }
}

type LikeReply = oneshot::Sender<Result<WriteOutcome<LikeOutcome>, CoreError>>;

/// Result of one background poll
#[derive(Debug)]
struct Poll {
    me: Option<Profile>,
    visible: Vec<Profile>,
    likes_sent: Vec<Like>,
}

enum SyncCommand {
    Refresh,
    SetFilters(DiscoveryFilters),
    Like { target: String, reply: LikeReply },
    Polled { generation: u64, result: Result<Poll, CoreError> },
    LikeFinished {
        target: String,
        result: Result<WriteOutcome<LikeOutcome>, CoreError>,
        reply: LikeReply,
    },
    Stop,
}

/// Handle to a running coordinator
#[derive(Debug)]
pub struct SyncHandle {
    commands: mpsc::Sender<SyncCommand>,
    state: watch::Receiver<DiscoveryState>,
    task: JoinHandle<()>,
}

impl std::fmt::Debug for SyncCommand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            SyncCommand::Refresh => "Refresh",
            SyncCommand::SetFilters(_) => "SetFilters",
            SyncCommand::Like { .. } => "Like",
            SyncCommand::Polled { .. } => "Polled",
            SyncCommand::LikeFinished { .. } => "LikeFinished",
            SyncCommand::Stop => "Stop",
        };
        f.write_str(name)
    }
}

impl SyncHandle {
    /// Poll now instead of waiting for the interval
    pub async fn refresh(&self) -> Result<(), SyncError> {
        self.send(SyncCommand::Refresh).await
    }

    pub async fn set_filters(&self, filters: DiscoveryFilters) -> Result<(), SyncError> {
        self.send(SyncCommand::SetFilters(filters)).await
    }

    /// Like `target`. The snapshot shows the optimistic marker before this
    /// resolves.
    pub async fn like(&self, target: impl Into<String>) -> Result<WriteOutcome<LikeOutcome>, SyncError> {
        let (reply, response) = oneshot::channel();
        self.send(SyncCommand::Like {
            target: target.into(),
            reply,
        })
        .await?;
        Ok(response.await.map_err(|_| SyncError::Stopped)??)
    }

    pub fn subscribe(&self) -> watch::Receiver<DiscoveryState> {
        self.state.clone()
    }

    pub fn snapshot(&self) -> DiscoveryState {
        self.state.borrow().clone()
    }

    /// Stop polling and wait for the coordinator to exit. In-flight requests
    /// are abandoned.
    pub async fn stop(self) {
        let _ = self.commands.send(SyncCommand::Stop).await;
        if let Err(err) = self.task.await {
            tracing::warn!(error = %err, "discovery coordinator ended abnormally");
        }
    }

    async fn send(&self, command: SyncCommand) -> Result<(), SyncError> {
        self.commands.send(command).await.map_err(|_| SyncError::Stopped)
    }
}

/// The coordinator task
pub struct SyncService {
    client: Arc<MingleClient>,
    session: CachedSession,
    state: DiscoveryState,
    visible: Vec<Profile>,
    optimistic: OptimisticLikes,
    scheduler: SyncScheduler,
    /// Generation of the most recently issued poll
    issued: u64,
    /// Generation of the most recently applied poll
    applied: u64,
    /// Weak so dropping every handle ends the task
    commands: mpsc::WeakSender<SyncCommand>,
    publish: watch::Sender<DiscoveryState>,
}

impl SyncService {
    /// Start the coordinator for `session`
    pub fn spawn(client: Arc<MingleClient>, session: CachedSession, poll_interval: Duration) -> SyncHandle {
        let (commands, inbox) = mpsc::channel(COMMAND_BUFFER);
        let (service, snapshots) = SyncService::new(client, session, poll_interval, commands.downgrade());
        let task = tokio::spawn(service.run(inbox));

        SyncHandle {
            commands,
            state: snapshots,
            task,
        }
    }

    fn new(
        client: Arc<MingleClient>,
        session: CachedSession,
        poll_interval: Duration,
        commands: mpsc::WeakSender<SyncCommand>,
    ) -> (Self, watch::Receiver<DiscoveryState>) {
        let state = DiscoveryState {
            online: client.network().is_online(),
            ..DiscoveryState::default()
        };
        let (publish, snapshots) = watch::channel(state.clone());
        let service = SyncService {
            client,
            session,
            state,
            visible: Vec::new(),
            optimistic: OptimisticLikes::new(),
            scheduler: SyncScheduler::new(poll_interval),
            issued: 0,
            applied: 0,
            commands,
            publish,
        };
        (service, snapshots)
    }

    async fn run(mut self, mut inbox: mpsc::Receiver<SyncCommand>) {
        let mut network = self.client.network().subscribe();
        let mut ticker = tokio::time::interval(self.scheduler.interval());
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        tracing::info!(
            event_id = %self.session.event.id,
            interval_secs = self.scheduler.interval().as_secs(),
            "discovery coordinator started"
        );

        loop {
            tokio::select! {
                command = inbox.recv() => match command {
                    None | Some(SyncCommand::Stop) => break,
                    Some(command) => self.handle(command),
                },
                _ = ticker.tick() => {
                    if self.scheduler.should_poll(self.client.network().is_online()) {
                        self.start_poll();
                    }
                }
                changed = network.changed() => {
                    if changed.is_err() {
                        continue;
                    }
                    let online = *network.borrow_and_update() == NetworkStatus::Online;
                    self.state.online = online;
                    self.publish();
                    if online {
                        self.start_poll();
                    }
                }
            }
        }

        self.scheduler.stop();
        tracing::info!(event_id = %self.session.event.id, "discovery coordinator stopped");
    }

    fn handle(&mut self, command: SyncCommand) {
        match command {
            SyncCommand::Refresh => self.start_poll(),
            SyncCommand::SetFilters(filters) => {
                self.state.filters = filters;
                self.recompute_candidates();
                self.publish();
            }
            SyncCommand::Like { target, reply } => self.start_like(target, reply),
            SyncCommand::Polled { generation, result } => self.apply_poll(generation, result),
            SyncCommand::LikeFinished {
                target,
                result,
                reply,
            } => self.finish_like(target, result, reply),
            SyncCommand::Stop => {}
        }
    }

    fn start_poll(&mut self) {
        self.scheduler.record_poll();
        self.issued += 1;
        let generation = self.issued;
        let client = self.client.clone();
        let event_id = self.session.event.id.clone();
        let session_id = self.session.session_id.clone();
        let commands = self.commands.clone();

        tokio::spawn(async move {
            let result = poll(&client, &event_id, &session_id).await;
            if let Some(commands) = commands.upgrade() {
                let _ = commands.send(SyncCommand::Polled { generation, result }).await;
            }
        });
    }

    fn apply_poll(&mut self, generation: u64, result: Result<Poll, CoreError>) {
        if generation <= self.applied {
            tracing::debug!(generation, applied = self.applied, "ignoring stale poll result");
            return;
        }

        match result {
            Ok(poll) => {
                self.applied = generation;
                self.optimistic.retain_unconfirmed(
                    poll.likes_sent
                        .iter()
                        .map(|like| like.liked_session_id.as_str()),
                );
                self.state.likes_sent = merge_likes(&self.state.likes_sent, poll.likes_sent);
                self.state.matches = self
                    .state
                    .likes_sent
                    .iter()
                    .filter(|like| like.is_mutual)
                    .map(|like| like.liked_session_id.clone())
                    .collect();
                self.state.me = poll.me;
                self.visible = poll.visible;
                self.state.last_refreshed = Some(Utc::now());
                self.state.last_error = None;
                self.recompute_candidates();
            }
            Err(err) => {
                tracing::warn!(error = %err, "discovery poll failed");
                self.state.last_error = Some(err.to_string());
            }
        }
        self.publish();
    }

    fn start_like(&mut self, target: String, reply: LikeReply) {
        if self.state.is_liked(&target) {
            let _ = reply.send(Ok(WriteOutcome::Applied(LikeOutcome::AlreadyLiked)));
            return;
        }

        self.optimistic.apply(&target);
        self.publish();

        let client = self.client.clone();
        let event = self.session.event.clone();
        let liker = self.session.session_id.clone();
        let known = self.state.likes_sent.clone();
        let commands = self.commands.clone();

        tokio::spawn(async move {
            let result = client.like(&event, &liker, &target, &known).await;
            if let Some(commands) = commands.upgrade() {
                let _ = commands
                    .send(SyncCommand::LikeFinished {
                        target,
                        result,
                        reply,
                    })
                    .await;
            }
        });
    }

    fn finish_like(
        &mut self,
        target: String,
        result: Result<WriteOutcome<LikeOutcome>, CoreError>,
        reply: LikeReply,
    ) {
        match &result {
            Ok(WriteOutcome::Applied(outcome)) => {
                self.optimistic.confirm(&target);
                match outcome {
                    LikeOutcome::Pending(like) => self.record_like(like.clone()),
                    LikeOutcome::Matched { mine, .. } => {
                        self.record_like(mine.clone());
                        if !self.state.matches.contains(&target) {
                            self.state.matches.push(target.clone());
                        }
                    }
                    LikeOutcome::AlreadyLiked | LikeOutcome::Ignored => {}
                }
            }
            Ok(WriteOutcome::Queued(id)) => {
                tracing::info!(target_session = %target, operation_id = %id, "like queued until back online");
                self.optimistic.mark_queued(&target);
            }
            Err(err) => {
                self.optimistic.rollback(&target);
                self.state.last_error = Some(err.to_string());
            }
        }
        self.publish();
        let _ = reply.send(result);
    }

    fn record_like(&mut self, like: Like) {
        self.state
            .likes_sent
            .retain(|existing| existing.liked_session_id != like.liked_session_id);
        self.state.likes_sent.push(like);
    }

    fn recompute_candidates(&mut self) {
        self.state.candidates = match &self.state.me {
            Some(me) => discovery::candidate_pool(me, &self.visible, &self.state.filters),
            None => Vec::new(),
        };
    }

    fn publish(&mut self) {
        let mut optimistic: Vec<String> = self.optimistic.targets().map(str::to_string).collect();
        optimistic.sort();
        self.state.optimistic = optimistic;
        self.publish.send_replace(self.state.clone());
    }
}

/// Likes are never withdrawn and mutual is terminal, so a poll that started
/// before a local like landed must not erase it.
fn merge_likes(local: &[Like], polled: Vec<Like>) -> Vec<Like> {
    let mut merged = polled;
    for like in local {
        match merged
            .iter_mut()
            .find(|p| p.liked_session_id == like.liked_session_id)
        {
            Some(existing) if like.is_mutual && !existing.is_mutual => *existing = like.clone(),
            Some(_) => {}
            None => merged.push(like.clone()),
        }
    }
    merged
}

async fn poll(client: &MingleClient, event_id: &str, session_id: &str) -> Result<Poll, CoreError> {
    let directory = client.directory();

    if let Err(err) = client.matcher().reconcile_matches(event_id).await {
        tracing::warn!(error = %err, "match reconciliation failed");
    }

    let (me, visible, likes_sent) = try_join3(
        directory.profile_for_session(event_id, session_id),
        directory.visible_profiles(event_id),
        directory.likes_from(event_id, session_id),
    )
    .await?;
    Ok(Poll {
        me,
        visible,
        likes_sent,
    })
}
