//! Room actor: an isolated Tokio task that owns one race session.
//!
//! Each room runs in its own task and is the single writer of its state —
//! commands arrive through an mpsc channel and are processed to completion
//! in order. Article resolution (the only slow, fallible step) happens
//! *before* a command is enqueued, in the pipeline layer; the actor then
//! re-validates preconditions at apply time, because the room may have
//! legitimately changed while the resolver round-trip was in flight.

use std::collections::HashMap;
use std::time::Duration;

use tokio::sync::{mpsc, oneshot};
use wikirace_protocol::{
    FinishedState, InitState, LeaderboardEntry, Mode, PastRound, PastRoundEntry, PlayerProgress,
    RoomDelta, RoomId, RoomPhase, RoomSnapshot, RoundDelta, RoundResultEntry, RulesPatch,
    ServerEvent, StartBroadcast, Username,
};
use wikirace_resolver::{PageKind, PageNamespace, Resolution};

use crate::clock::{ClockEvent, RoundClock, elapsed_secs, now_millis};
use crate::error::{GameError, RoundSlot};
use crate::scoring;

/// Channel sender delivering room events to one player's connection.
pub type PlayerSender = mpsc::UnboundedSender<ServerEvent>;

/// A snapshot of room metadata for listings and the idle sweeper.
#[derive(Debug, Clone)]
pub struct RoomInfo {
    pub room_id: RoomId,
    pub state: RoomPhase,
    /// Active connections (not the recorded roster, which may contain
    /// phantom entries after a restore).
    pub connected: usize,
    /// Unix milliseconds of the last handled operation.
    pub updated: u64,
}

/// A round slot (start or target) after canonicalization. Empty strings
/// mean the raw title did not resolve.
#[derive(Debug, Clone)]
pub(crate) struct ResolvedSlot {
    pub title: String,
    pub thumbnail: String,
}

/// The round portion of a validated settings change.
#[derive(Debug, Clone, Default)]
pub(crate) struct RoundChange {
    pub start: Option<ResolvedSlot>,
    pub target: Option<ResolvedSlot>,
}

/// A settings mutation after resolution: titles canonicalized, banned
/// entries filtered. Applied compare-and-apply by the actor.
#[derive(Debug, Clone, Default)]
pub(crate) struct SettingsChange {
    pub host: Option<Username>,
    pub round: Option<RoundChange>,
    pub rules: Option<RulesPatch>,
}

/// Commands sent to a room actor through its channel.
pub(crate) enum RoomCommand {
    Join {
        username: Username,
        sender: PlayerSender,
        reply: oneshot::Sender<Result<(), GameError>>,
    },
    /// Reply is `true` when the room emptied and should be destroyed.
    Leave {
        username: Username,
        reply: oneshot::Sender<bool>,
    },
    /// Cheap precondition check before a settings resolution round-trip.
    /// Replies with the room language the resolver should use.
    PrecheckSettings {
        requester: Username,
        op: &'static str,
        reply: oneshot::Sender<Result<String, GameError>>,
    },
    ApplySettings {
        requester: Username,
        change: SettingsChange,
        reply: oneshot::Sender<Result<RoomDelta, GameError>>,
    },
    ChangeLanguage {
        requester: Username,
        language: String,
        reply: oneshot::Sender<Result<RoomDelta, GameError>>,
    },
    Start {
        requester: Username,
        reply: oneshot::Sender<Result<StartBroadcast, GameError>>,
    },
    /// Cheap precondition check before a click/navigate resolution.
    PrecheckMove {
        username: Username,
        reply: oneshot::Sender<Result<String, GameError>>,
    },
    ApplyClick {
        username: Username,
        resolution: Resolution,
        reply: oneshot::Sender<Result<PlayerProgress, GameError>>,
    },
    ApplyNavigate {
        username: Username,
        resolution: Resolution,
        reply: oneshot::Sender<Result<PlayerProgress, GameError>>,
    },
    Info {
        reply: oneshot::Sender<RoomInfo>,
    },
    Snapshot {
        reply: oneshot::Sender<RoomSnapshot>,
    },
    Shutdown,
}

/// Handle to a running room actor. Cheap to clone — an mpsc sender plus
/// the room id.
#[derive(Clone)]
pub struct RoomHandle {
    room_id: RoomId,
    sender: mpsc::Sender<RoomCommand>,
}

impl RoomHandle {
    /// Returns the room's unique id.
    pub fn room_id(&self) -> &RoomId {
        &self.room_id
    }

    /// Sends a command and waits for its reply. A closed channel means the
    /// actor is gone; callers treat the room as destroyed.
    async fn request<T>(
        &self,
        make: impl FnOnce(oneshot::Sender<T>) -> RoomCommand,
    ) -> Result<T, GameError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.sender
            .send(make(reply_tx))
            .await
            .map_err(|_| GameError::RoomClosed(self.room_id.clone()))?;
        reply_rx
            .await
            .map_err(|_| GameError::RoomClosed(self.room_id.clone()))
    }

    /// Adds a player. The actor pushes the full `Init` snapshot through
    /// `sender` on success.
    pub async fn join(&self, username: Username, sender: PlayerSender) -> Result<(), GameError> {
        self.request(|reply| RoomCommand::Join {
            username,
            sender,
            reply,
        })
        .await?
    }

    /// Removes a player. Returns `true` when the room is now empty.
    pub async fn leave(&self, username: Username) -> Result<bool, GameError> {
        self.request(|reply| RoomCommand::Leave { username, reply })
            .await
    }

    /// Starts the round (host only).
    pub async fn start(&self, requester: Username) -> Result<StartBroadcast, GameError> {
        self.request(|reply| RoomCommand::Start { requester, reply })
            .await?
    }

    pub(crate) async fn precheck_settings(
        &self,
        requester: Username,
        op: &'static str,
    ) -> Result<String, GameError> {
        self.request(|reply| RoomCommand::PrecheckSettings {
            requester,
            op,
            reply,
        })
        .await?
    }

    pub(crate) async fn apply_settings(
        &self,
        requester: Username,
        change: SettingsChange,
    ) -> Result<RoomDelta, GameError> {
        self.request(|reply| RoomCommand::ApplySettings {
            requester,
            change,
            reply,
        })
        .await?
    }

    pub(crate) async fn change_language(
        &self,
        requester: Username,
        language: String,
    ) -> Result<RoomDelta, GameError> {
        self.request(|reply| RoomCommand::ChangeLanguage {
            requester,
            language,
            reply,
        })
        .await?
    }

    pub(crate) async fn precheck_move(&self, username: Username) -> Result<String, GameError> {
        self.request(|reply| RoomCommand::PrecheckMove { username, reply })
            .await?
    }

    pub(crate) async fn apply_click(
        &self,
        username: Username,
        resolution: Resolution,
    ) -> Result<PlayerProgress, GameError> {
        self.request(|reply| RoomCommand::ApplyClick {
            username,
            resolution,
            reply,
        })
        .await?
    }

    pub(crate) async fn apply_navigate(
        &self,
        username: Username,
        resolution: Resolution,
    ) -> Result<PlayerProgress, GameError> {
        self.request(|reply| RoomCommand::ApplyNavigate {
            username,
            resolution,
            reply,
        })
        .await?
    }

    /// Returns room metadata for listings and GC.
    pub async fn info(&self) -> Result<RoomInfo, GameError> {
        self.request(|reply| RoomCommand::Info { reply }).await
    }

    /// Returns the full serializable room state.
    pub async fn snapshot(&self) -> Result<RoomSnapshot, GameError> {
        self.request(|reply| RoomCommand::Snapshot { reply }).await
    }

    /// Tells the room actor to stop.
    pub async fn shutdown(&self) -> Result<(), GameError> {
        self.sender
            .send(RoomCommand::Shutdown)
            .await
            .map_err(|_| GameError::RoomClosed(self.room_id.clone()))
    }
}

/// Spawns a room actor for the given state (fresh or restored) and returns
/// a handle to it.
pub(crate) fn spawn_room(snapshot: RoomSnapshot, channel_size: usize) -> RoomHandle {
    let (tx, rx) = mpsc::channel(channel_size);
    let room_id = snapshot.room_id.clone();
    let actor = RoomActor {
        room: snapshot,
        senders: HashMap::new(),
        clock: RoundClock::idle(),
        receiver: rx,
    };
    tokio::spawn(actor.run());
    RoomHandle {
        room_id,
        sender: tx,
    }
}

/// The room actor state. Lives inside a Tokio task.
struct RoomActor {
    room: RoomSnapshot,
    /// Per-player outbound channels; the key set is the set of *active*
    /// connections, which is what uniqueness and host checks run against.
    senders: HashMap<Username, PlayerSender>,
    clock: RoundClock,
    receiver: mpsc::Receiver<RoomCommand>,
}

impl RoomActor {
    async fn run(mut self) {
        tracing::info!(room_id = %self.room.room_id, "room started");

        // A room restored mid-round picks its deadline back up from the
        // stored timestamp instead of restarting the countdown.
        if self.room.state == RoomPhase::Playing {
            self.rearm_restored_round();
        }

        loop {
            tokio::select! {
                cmd = self.receiver.recv() => match cmd {
                    Some(RoomCommand::Shutdown) | None => break,
                    Some(cmd) => self.handle_command(cmd),
                },
                event = self.clock.wait() => match event {
                    ClockEvent::Tick => self.handle_tick(),
                    ClockEvent::Deadline => {
                        // The sleep completed; it must not be polled again.
                        self.clock.cancel();
                        self.complete_round();
                    }
                },
            }
        }

        tracing::info!(room_id = %self.room.room_id, "room stopped");
    }

    fn handle_command(&mut self, cmd: RoomCommand) {
        match cmd {
            RoomCommand::Join {
                username,
                sender,
                reply,
            } => {
                let _ = reply.send(self.handle_join(username, sender));
            }
            RoomCommand::Leave { username, reply } => {
                let _ = reply.send(self.handle_leave(&username));
            }
            RoomCommand::PrecheckSettings {
                requester,
                op,
                reply,
            } => {
                let _ = reply.send(self.check_settings_allowed(&requester, op));
            }
            RoomCommand::ApplySettings {
                requester,
                change,
                reply,
            } => {
                let _ = reply.send(self.handle_apply_settings(&requester, change));
            }
            RoomCommand::ChangeLanguage {
                requester,
                language,
                reply,
            } => {
                let _ = reply.send(self.handle_change_language(&requester, language));
            }
            RoomCommand::Start { requester, reply } => {
                let _ = reply.send(self.handle_start(&requester));
            }
            RoomCommand::PrecheckMove { username, reply } => {
                let _ = reply.send(self.check_move_allowed(&username));
            }
            RoomCommand::ApplyClick {
                username,
                resolution,
                reply,
            } => {
                let _ = reply.send(self.handle_apply_click(&username, resolution));
            }
            RoomCommand::ApplyNavigate {
                username,
                resolution,
                reply,
            } => {
                let _ = reply.send(self.handle_apply_navigate(&username, resolution));
            }
            RoomCommand::Info { reply } => {
                let _ = reply.send(RoomInfo {
                    room_id: self.room.room_id.clone(),
                    state: self.room.state,
                    connected: self.senders.len(),
                    updated: self.room.updated,
                });
            }
            RoomCommand::Snapshot { reply } => {
                let _ = reply.send(self.room.clone());
            }
            RoomCommand::Shutdown => {}
        }
    }

    // -- Join / leave ------------------------------------------------------

    fn handle_join(&mut self, username: Username, sender: PlayerSender) -> Result<(), GameError> {
        if self.senders.contains_key(&username) {
            return Err(GameError::DuplicateUsername(username));
        }
        if self.room.mode == Mode::Single && !self.senders.is_empty() {
            return Err(GameError::SingleModeViolation);
        }

        // Orphaned room (fresh, or restored with no live connections):
        // the joiner becomes host so the room is never host-less.
        if self.senders.is_empty() {
            self.room.host = username.clone();
        }

        if !self.room.players.contains(&username) {
            self.room.players.push(username.clone());
        }
        self.senders.insert(username.clone(), sender);

        // Late joiners and reconnecting players start the live round over
        // from the start article; prior progress is not restored.
        if self.room.state == RoomPhase::Playing {
            self.room.current_state.insert(
                username.clone(),
                PlayerProgress::seeded(&self.room.current_round.start),
            );
            self.rebuild_result();
        }

        if !self.room.leaderboard.iter().any(|l| l.username == username) {
            self.room.leaderboard.push(LeaderboardEntry {
                username: username.clone(),
                score: 0,
            });
        }
        self.touch();

        tracing::info!(
            room_id = %self.room.room_id,
            %username,
            connected = self.senders.len(),
            "player joined"
        );

        let round_delta = (self.room.state == RoomPhase::Playing).then(|| RoundDelta {
            result: Some(self.room.current_round.result.clone()),
            ..RoundDelta::default()
        });
        self.broadcast_except(
            &username,
            ServerEvent::Update {
                patch: RoomDelta {
                    host: Some(self.room.host.clone()),
                    players: Some(self.room.players.clone()),
                    leaderboard: Some(self.room.leaderboard.clone()),
                    current_round: round_delta,
                    ..RoomDelta::default()
                },
            },
        );
        self.broadcast_except(
            &username,
            ServerEvent::Notification {
                message: format!("{username} has joined the room!"),
            },
        );
        let init = self.init_state(&username);
        self.send_to(&username, ServerEvent::Init(init));
        Ok(())
    }

    fn handle_leave(&mut self, username: &Username) -> bool {
        self.senders.remove(username);
        self.room.players.retain(|p| p != username);

        tracing::info!(
            room_id = %self.room.room_id,
            %username,
            connected = self.senders.len(),
            "player left"
        );

        if self.room.players.is_empty() {
            return true;
        }

        if &self.room.host == username {
            self.room.host = self.room.players[0].clone();
            tracing::info!(
                room_id = %self.room.room_id,
                new_host = %self.room.host,
                "host transferred"
            );
        }
        self.touch();

        self.broadcast(ServerEvent::Update {
            patch: RoomDelta {
                host: Some(self.room.host.clone()),
                players: Some(self.room.players.clone()),
                ..RoomDelta::default()
            },
        });
        self.broadcast(ServerEvent::Notification {
            message: format!("{username} disconnected from the room"),
        });
        false
    }

    // -- Settings ----------------------------------------------------------

    fn check_settings_allowed(
        &self,
        requester: &Username,
        op: &'static str,
    ) -> Result<String, GameError> {
        if &self.room.host != requester {
            return Err(GameError::NotHost(op));
        }
        if self.room.current_round.started {
            return Err(GameError::RoundStarted);
        }
        Ok(self.room.language.clone())
    }

    fn handle_apply_settings(
        &mut self,
        requester: &Username,
        change: SettingsChange,
    ) -> Result<RoomDelta, GameError> {
        // Required re-check: a start (or a host change) may have won the
        // race while the resolver round-trip was in flight.
        self.check_settings_allowed(requester, "update")?;

        if let Some(host) = &change.host {
            if !self.senders.contains_key(host) {
                return Err(GameError::HostNotOnline);
            }
        }
        if let Some(rules) = &change.rules {
            if rules.time_limit == Some(0) {
                return Err(GameError::InvalidTimeLimit);
            }
        }

        let mut delta = RoomDelta::default();
        if let Some(host) = change.host {
            self.room.host = host.clone();
            delta.host = Some(host);
        }
        if let Some(round) = change.round {
            let mut round_delta = RoundDelta::default();
            if let Some(slot) = round.start {
                self.room.current_round.start = slot.title.clone();
                self.room.current_round.start_thumbnail = slot.thumbnail.clone();
                round_delta.start = Some(slot.title);
                round_delta.start_thumbnail = Some(slot.thumbnail);
            }
            if let Some(slot) = round.target {
                self.room.current_round.target = slot.title.clone();
                self.room.current_round.target_thumbnail = slot.thumbnail.clone();
                round_delta.target = Some(slot.title);
                round_delta.target_thumbnail = Some(slot.thumbnail);
            }
            delta.current_round = Some(round_delta);
        }
        if let Some(rules) = change.rules {
            rules.apply_to(&mut self.room.rules);
            delta.rules = Some(rules);
        }
        self.touch();

        tracing::debug!(room_id = %self.room.room_id, %requester, "settings updated");

        // Only the changes go out; the requester gets the echo in the ack.
        self.broadcast_except(
            requester,
            ServerEvent::Update {
                patch: delta.clone(),
            },
        );
        Ok(delta)
    }

    fn handle_change_language(
        &mut self,
        requester: &Username,
        language: String,
    ) -> Result<RoomDelta, GameError> {
        self.check_settings_allowed(requester, "change_lang")?;

        self.room.language = language.clone();
        // Canonical titles don't carry across wikis; drop the pair.
        let round = &mut self.room.current_round;
        round.start.clear();
        round.target.clear();
        round.start_thumbnail.clear();
        round.target_thumbnail.clear();
        self.touch();

        tracing::info!(room_id = %self.room.room_id, %language, "language changed");

        let delta = RoomDelta {
            language: Some(language),
            current_round: Some(RoundDelta {
                start: Some(String::new()),
                target: Some(String::new()),
                start_thumbnail: Some(String::new()),
                target_thumbnail: Some(String::new()),
                ..RoundDelta::default()
            }),
            ..RoomDelta::default()
        };
        self.broadcast_except(
            requester,
            ServerEvent::Update {
                patch: delta.clone(),
            },
        );
        Ok(delta)
    }

    // -- Start -------------------------------------------------------------

    fn handle_start(&mut self, requester: &Username) -> Result<StartBroadcast, GameError> {
        if &self.room.host != requester {
            return Err(GameError::NotHost("start"));
        }
        if self.room.current_round.started {
            return Err(GameError::RoundStarted);
        }

        let round = &self.room.current_round;
        if round.start.is_empty() {
            return Err(GameError::EmptyStartOrTarget(RoundSlot::Start));
        }
        if round.target.is_empty() {
            return Err(GameError::EmptyStartOrTarget(RoundSlot::Target));
        }
        let banned = &self.room.rules.banned_articles;
        if banned.contains(&round.start) {
            return Err(GameError::RoundArticleBanned(RoundSlot::Start));
        }
        if banned.contains(&round.target) {
            return Err(GameError::RoundArticleBanned(RoundSlot::Target));
        }

        let time_limit = self.room.rules.time_limit;
        let round = &mut self.room.current_round;
        round.started = true;
        round.start_timestamp = Some(now_millis());
        round.time_left = Some(time_limit as i64);
        self.room.state = RoomPhase::Playing;

        // Every player starts from an identical seed.
        let seeded = PlayerProgress::seeded(&self.room.current_round.start);
        self.room.current_state = self
            .room
            .players
            .iter()
            .map(|p| (p.clone(), seeded.clone()))
            .collect();
        self.rebuild_result();
        self.clock.arm(Duration::from_secs(time_limit));
        self.touch();

        tracing::info!(
            room_id = %self.room.room_id,
            start = %self.room.current_round.start,
            target = %self.room.current_round.target,
            time_limit,
            "round started"
        );

        let broadcast = StartBroadcast {
            state: self.room.state,
            current_round: self.room.current_round.clone(),
            current_state: seeded,
        };
        self.broadcast_except(requester, ServerEvent::Start(broadcast.clone()));
        Ok(broadcast)
    }

    // -- Click / navigate --------------------------------------------------

    fn check_move_allowed(&self, username: &Username) -> Result<String, GameError> {
        if self.room.state != RoomPhase::Playing {
            return Err(GameError::RoundNotStarted);
        }
        if self
            .room
            .current_state
            .get(username)
            .is_some_and(|p| p.finished)
        {
            return Err(GameError::AlreadyFinished);
        }
        Ok(self.room.language.clone())
    }

    fn handle_apply_click(
        &mut self,
        username: &Username,
        resolution: Resolution,
    ) -> Result<PlayerProgress, GameError> {
        // Re-check: the round may have completed while resolving.
        if self.room.state != RoomPhase::Playing {
            return Err(GameError::RoundNotStarted);
        }
        let article = match resolution {
            Resolution::Found(article) => article,
            Resolution::NotFound => return Err(GameError::ArticleNotFound),
        };

        let rules = &self.room.rules;
        if rules.banned_articles.contains(&article.title) {
            return Err(GameError::ArticleBanned(article.title));
        }
        if !rules.allow_disambiguation && article.kind == PageKind::Disambiguation {
            return Err(GameError::ArticleDisambiguationDisallowed(article.title));
        }
        match article.namespace {
            PageNamespace::Main => {}
            PageNamespace::Category if rules.allow_category => {}
            _ => return Err(GameError::ArticleNamespaceDisallowed(article.title)),
        }

        let target = self.room.current_round.target.clone();
        let start_ts = self
            .room
            .current_round
            .start_timestamp
            .unwrap_or_else(now_millis);
        let rules = self.room.rules.clone();

        let progress = self
            .room
            .current_state
            .get_mut(username)
            .ok_or(GameError::RoundNotStarted)?;
        if progress.finished {
            return Err(GameError::AlreadyFinished);
        }

        // Anchor/self clicks are idempotent: no path growth, no click cost.
        if progress.path.last().map(String::as_str) != Some(article.title.as_str()) {
            progress.path.push(article.title.clone());
            progress.navigation_stack.push(article.title.clone());
            progress.clicks += 1;
        }

        let just_finished = article.title == target;
        if just_finished {
            progress.finished = true;
            progress.time_taken = elapsed_secs(start_ts);
            progress.score = scoring::score(progress, &rules);
        }
        let snapshot = progress.clone();

        self.rebuild_result();
        self.touch();
        self.broadcast(ServerEvent::Update {
            patch: RoomDelta::round_result(self.room.current_round.result.clone()),
        });

        if just_finished {
            tracing::info!(
                room_id = %self.room.room_id,
                %username,
                clicks = snapshot.clicks,
                score = snapshot.score,
                "player finished"
            );
            self.broadcast(ServerEvent::Notification {
                message: format!("{username} finished with score {}!", snapshot.score),
            });
            if self.all_connected_finished() {
                self.complete_round();
            }
        }

        Ok(snapshot)
    }

    fn handle_apply_navigate(
        &mut self,
        username: &Username,
        resolution: Resolution,
    ) -> Result<PlayerProgress, GameError> {
        if self.room.state != RoomPhase::Playing {
            return Err(GameError::RoundNotStarted);
        }
        let article = match resolution {
            Resolution::Found(article) => article,
            Resolution::NotFound => return Err(GameError::ArticleNotFound),
        };
        let allow_back = self.room.rules.allow_back;

        let progress = self
            .room
            .current_state
            .get_mut(username)
            .ok_or(GameError::RoundNotStarted)?;
        if progress.finished {
            return Err(GameError::AlreadyFinished);
        }

        // Hash/anchor navigation lands on the article already shown.
        if progress.path.last().map(String::as_str) == Some(article.title.as_str()) {
            return Ok(progress.clone());
        }

        let stack = &progress.navigation_stack;
        let is_one_step_back =
            stack.len() >= 2 && stack[stack.len() - 2] == article.title;
        if !(allow_back && is_one_step_back) {
            return Err(GameError::InvalidNavigation);
        }

        // Each back-move costs more than the last.
        progress.backs += 1;
        progress.clicks += progress.backs;
        progress.navigation_stack.pop();
        progress.path.push(article.title.clone());
        let snapshot = progress.clone();

        self.rebuild_result();
        self.touch();
        self.broadcast(ServerEvent::Update {
            patch: RoomDelta::round_result(self.room.current_round.result.clone()),
        });
        Ok(snapshot)
    }

    // -- Timers and completion ---------------------------------------------

    /// Recomputes the deadline of a restored mid-round room. Fires
    /// completion immediately when the limit already elapsed offline.
    fn rearm_restored_round(&mut self) {
        let Some(start_ts) = self.room.current_round.start_timestamp else {
            // Inconsistent snapshot; fall back to the lobby.
            self.room.state = RoomPhase::Lobby;
            self.room.current_round.started = false;
            return;
        };
        let elapsed = elapsed_secs(start_ts);
        let time_limit = self.room.rules.time_limit;
        if elapsed >= time_limit {
            tracing::info!(
                room_id = %self.room.room_id,
                "restored round already past its deadline, completing"
            );
            self.complete_round();
        } else {
            self.clock.arm(Duration::from_secs(time_limit - elapsed));
            tracing::info!(
                room_id = %self.room.room_id,
                remaining = time_limit - elapsed,
                "restored round, deadline recomputed"
            );
        }
    }

    fn handle_tick(&mut self) {
        // Stale tick after completion: a no-op, not an error.
        if self.room.state != RoomPhase::Playing {
            return;
        }
        let Some(start_ts) = self.room.current_round.start_timestamp else {
            return;
        };
        let time_left = self.room.rules.time_limit as i64 - elapsed_secs(start_ts) as i64;
        self.room.current_round.time_left = Some(time_left);
        if time_left > 0 {
            self.broadcast(ServerEvent::Update {
                patch: RoomDelta::time_left(time_left),
            });
        } else {
            // Countdown exhausted. Completion stays with the deadline
            // timer; the ticker just stops broadcasting.
            self.clock.stop_ticker();
        }
    }

    /// Ends the round: fold scores, archive the round, reset to the lobby.
    /// Idempotent — a second trigger finds the room already in the lobby.
    fn complete_round(&mut self) {
        if self.room.state != RoomPhase::Playing {
            return;
        }
        self.clock.cancel();
        self.room.state = RoomPhase::Lobby;

        for (username, progress) in &self.room.current_state {
            match self
                .room
                .leaderboard
                .iter()
                .position(|l| &l.username == username)
            {
                Some(i) => self.room.leaderboard[i].score += progress.score as i64,
                None => self.room.leaderboard.push(LeaderboardEntry {
                    username: username.clone(),
                    score: progress.score as i64,
                }),
            }
        }
        self.room.leaderboard.sort_by(|a, b| b.score.cmp(&a.score));

        // Archive the round with each player's full path, now public.
        self.rebuild_result();
        let mut entries: Vec<PastRoundEntry> = self
            .room
            .current_round
            .result
            .iter()
            .map(|entry| PastRoundEntry {
                result: entry.clone(),
                path: self
                    .room
                    .current_state
                    .get(&entry.username)
                    .map(|p| p.path.clone())
                    .unwrap_or_default(),
            })
            .collect();
        entries.sort_by(|a, b| b.result.score.cmp(&a.result.score));

        let last_round = PastRound {
            start: self.room.current_round.start.clone(),
            target: self.room.current_round.target.clone(),
            rules: self.room.rules.clone(),
            result: entries,
        };
        self.room.past_rounds.push(last_round.clone());

        self.room.current_round = self.room.current_round.reset_to_lobby();
        self.room.current_state.clear();
        self.touch();

        tracing::info!(
            room_id = %self.room.room_id,
            rounds = self.room.past_rounds.len(),
            "round finished"
        );

        self.broadcast(ServerEvent::Finished(FinishedState {
            state: self.room.state,
            current_round: self.room.current_round.clone(),
            leaderboard: self.room.leaderboard.clone(),
            last_round,
        }));
    }

    // -- Helpers -----------------------------------------------------------

    fn all_connected_finished(&self) -> bool {
        self.senders.keys().all(|username| {
            self.room
                .current_state
                .get(username)
                .is_none_or(|p| p.finished)
        })
    }

    /// Recomputes the public result projection: connected players in join
    /// order, then players who left mid-round (they keep their line until
    /// the round ends), by name.
    fn rebuild_result(&mut self) {
        let mut result: Vec<RoundResultEntry> = self
            .room
            .players
            .iter()
            .filter_map(|username| {
                self.room
                    .current_state
                    .get(username)
                    .map(|p| p.result_entry(username))
            })
            .collect();
        let mut departed: Vec<RoundResultEntry> = self
            .room
            .current_state
            .iter()
            .filter(|(username, _)| !self.room.players.contains(username))
            .map(|(username, p)| p.result_entry(username))
            .collect();
        departed.sort_by(|a, b| a.username.as_str().cmp(b.username.as_str()));
        result.extend(departed);
        self.room.current_round.result = result;
    }

    fn init_state(&self, username: &Username) -> InitState {
        InitState {
            room_id: self.room.room_id.clone(),
            mode: self.room.mode,
            language: self.room.language.clone(),
            host: self.room.host.clone(),
            state: self.room.state,
            players: self.room.players.clone(),
            current_round: self.room.current_round.clone(),
            rules: self.room.rules.clone(),
            leaderboard: self.room.leaderboard.clone(),
            last_round: self.room.past_rounds.last().cloned(),
            current_state: self.room.current_state.get(username).cloned(),
        }
    }

    fn touch(&mut self) {
        self.room.updated = now_millis();
    }

    fn broadcast(&self, event: ServerEvent) {
        for sender in self.senders.values() {
            let _ = sender.send(event.clone());
        }
    }

    fn broadcast_except(&self, skip: &Username, event: ServerEvent) {
        for (username, sender) in &self.senders {
            if username != skip {
                let _ = sender.send(event.clone());
            }
        }
    }

    /// Sends to a single player; silently drops if the receiver is gone.
    fn send_to(&self, username: &Username, event: ServerEvent) {
        if let Some(sender) = self.senders.get(username) {
            let _ = sender.send(event);
        }
    }
}
