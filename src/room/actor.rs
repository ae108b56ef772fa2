//! The single-threaded room actor (C5): owns one room's state and timer
//! exclusively, dispatches inbound messages through the host/team/watcher
//! protocol state machine, and emits outbound broadcasts.
//!
//! Grounded on `congress/src/ws/mod.rs`'s `tokio::select!` merge of a
//! broadcast subscription with an inbound stream, and on
//! `congress/src/ws/handlers.rs`/`congress/src/ws/host.rs`'s role-checked
//! dispatch returning `Option<ServerMessage>` — generalized from one
//! process-wide `AppState` behind an `RwLock` to one actor task per room
//! with no locking at all (§5 "single-threaded cooperative per room").

use std::collections::HashMap;
use std::time::{Duration, Instant};

use tokio::sync::{mpsc, oneshot};

use crate::error::RoomError;
use crate::protocol::{
    ClientMessage, GameStateSnapshot, HostAction, ScoreboardSnapshot, ServerMessage,
    TeamAction, TeamGameStateSnapshot, WatcherAction,
};
use crate::room::outbound::OutboundTx;
use crate::room::state::Room;
use crate::room::timer::{Timer, TimerEvent};
use crate::types::GameCode;

pub type SessionId = String;

/// Command queue depth for one room's actor. Generous: this only needs to
/// absorb a burst of simultaneous team submissions right at timer expiry.
const COMMAND_QUEUE_DEPTH: usize = 256;

#[derive(Debug, Clone, Copy)]
pub struct RoomStatus {
    pub host_connected: bool,
    pub any_team_connected: bool,
    pub idle_for: Duration,
}

pub enum RoomCommand {
    /// A decoded client frame from a session, carrying that session's
    /// outbound buffer so the actor can (re-)register it.
    Inbound {
        session_id: SessionId,
        outbound: OutboundTx,
        message: ClientMessage,
    },
    /// The session's socket closed.
    Detach { session_id: SessionId },
    /// Read-only status probe, used by the directory's idle reaper.
    Status { reply: oneshot::Sender<RoomStatus> },
    /// Stop the actor loop. Sent by the directory once it has decided to
    /// retire this room.
    Shutdown,
}

/// A cheap, cloneable reference to a running room actor.
#[derive(Clone)]
pub struct RoomHandle {
    pub game_code: GameCode,
    cmd_tx: mpsc::Sender<RoomCommand>,
}

impl RoomHandle {
    pub async fn send_inbound(&self, session_id: SessionId, outbound: OutboundTx, message: ClientMessage) {
        let _ = self
            .cmd_tx
            .send(RoomCommand::Inbound {
                session_id,
                outbound,
                message,
            })
            .await;
    }

    pub async fn detach(&self, session_id: SessionId) {
        let _ = self.cmd_tx.send(RoomCommand::Detach { session_id }).await;
    }

    pub async fn status(&self) -> Option<RoomStatus> {
        let (tx, rx) = oneshot::channel();
        self.cmd_tx.send(RoomCommand::Status { reply: tx }).await.ok()?;
        rx.await.ok()
    }

    pub async fn shutdown(&self) {
        let _ = self.cmd_tx.send(RoomCommand::Shutdown).await;
    }
}

/// Spawn a fresh room actor for `game_code` and return a handle to it.
pub fn spawn(game_code: GameCode) -> RoomHandle {
    let (tx, rx) = mpsc::channel(COMMAND_QUEUE_DEPTH);
    let handle = RoomHandle {
        game_code: game_code.clone(),
        cmd_tx: tx,
    };
    let room = Room::new(game_code);
    let timer = Timer::new(room.current_question().timer_duration);
    let actor = RoomActor {
        room,
        timer,
        sessions: HashMap::new(),
        host_session_id: None,
        cmd_rx: rx,
        last_activity: Instant::now(),
    };
    tokio::spawn(actor.run());
    handle
}

#[derive(Clone)]
enum SessionRole {
    Unbound,
    Host,
    Team(String),
    Watcher,
}

struct SessionInfo {
    outbound: OutboundTx,
    role: SessionRole,
}

struct RoomActor {
    room: Room,
    timer: Timer,
    sessions: HashMap<SessionId, SessionInfo>,
    host_session_id: Option<SessionId>,
    cmd_rx: mpsc::Receiver<RoomCommand>,
    last_activity: Instant,
}

impl RoomActor {
    async fn run(mut self) {
        let game_code = self.room.game_code.clone();
        tracing::info!(game_code = %game_code, "room actor started");
        let mut ticker = tokio::time::interval(Duration::from_secs(1));
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                cmd = self.cmd_rx.recv() => {
                    match cmd {
                        Some(RoomCommand::Inbound { session_id, outbound, message }) => {
                            self.last_activity = Instant::now();
                            self.handle_inbound(session_id, outbound, message);
                        }
                        Some(RoomCommand::Detach { session_id }) => {
                            self.handle_detach(session_id);
                        }
                        Some(RoomCommand::Status { reply }) => {
                            let _ = reply.send(self.status());
                        }
                        Some(RoomCommand::Shutdown) | None => break,
                    }
                }
                _ = ticker.tick() => {
                    if let Some(event) = self.timer.tick() {
                        self.handle_timer_event(event);
                    }
                }
            }
        }
        tracing::info!(game_code = %game_code, "room actor stopped");
    }

    fn status(&self) -> RoomStatus {
        RoomStatus {
            host_connected: self.host_session_id.is_some(),
            any_team_connected: self.room.teams.values().any(|t| t.connected),
            idle_for: self.last_activity.elapsed(),
        }
    }

    fn handle_inbound(&mut self, session_id: SessionId, outbound: OutboundTx, message: ClientMessage) {
        self.sessions
            .entry(session_id.clone())
            .and_modify(|info| info.outbound = outbound.clone())
            .or_insert_with(|| SessionInfo {
                outbound,
                role: SessionRole::Unbound,
            });

        let result = match message {
            ClientMessage::Host(action) => self.handle_host_action(&session_id, action),
            ClientMessage::Team(action) => self.handle_team_action(&session_id, action),
            ClientMessage::Watcher(action) => self.handle_watcher_action(&session_id, action),
        };
        if let Err(err) = result {
            tracing::debug!(session_id = %session_id, error = %err, "rejected command");
            self.reply_error(&session_id, err);
        }
    }

    fn handle_detach(&mut self, session_id: SessionId) {
        let Some(info) = self.sessions.remove(&session_id) else {
            return;
        };
        match info.role {
            SessionRole::Host => {
                if self.host_session_id.as_deref() == Some(session_id.as_str()) {
                    self.host_session_id = None;
                }
            }
            SessionRole::Team(name) => {
                self.room.set_team_connected(&name, false);
                self.broadcast_all();
            }
            SessionRole::Watcher | SessionRole::Unbound => {}
        }
    }

    // === Host-side transitions (§4.5) ===

    fn handle_host_action(&mut self, session_id: &SessionId, action: HostAction) -> Result<(), RoomError> {
        if let HostAction::CreateGame { .. } = &action {
            return self.handle_create_game(session_id);
        }

        if self.host_session_id.as_deref() != Some(session_id.as_str()) {
            return Err(RoomError::Unauthorized(
                "only the connected host session may issue this command".to_string(),
            ));
        }
        self.apply_host_action(action)?;
        self.broadcast_all();
        Ok(())
    }

    fn handle_create_game(&mut self, session_id: &SessionId) -> Result<(), RoomError> {
        if let Some(current) = &self.host_session_id {
            if current != session_id {
                return Err(RoomError::GameCodeConflict(self.room.game_code.clone()));
            }
        }
        self.host_session_id = Some(session_id.clone());
        if let Some(info) = self.sessions.get_mut(session_id) {
            info.role = SessionRole::Host;
        }
        self.broadcast_all();
        Ok(())
    }

    fn apply_host_action(&mut self, action: HostAction) -> Result<(), RoomError> {
        match action {
            HostAction::CreateGame { .. } => unreachable!("handled by handle_create_game"),
            HostAction::StartTimer => {
                self.timer.start();
                self.sync_timer();
                Ok(())
            }
            HostAction::PauseTimer => {
                self.timer.pause();
                self.sync_timer();
                Ok(())
            }
            HostAction::ResetTimer => {
                let duration = self.room.current_question().timer_duration;
                self.timer.reset(duration);
                self.sync_timer();
                Ok(())
            }
            HostAction::NextQuestion => {
                self.room.advance_question();
                self.timer = Timer::new(self.room.current_question().timer_duration);
                Ok(())
            }
            HostAction::PrevQuestion => {
                self.room.retreat_question()?;
                self.timer = Timer::new(self.room.current_question().timer_duration);
                Ok(())
            }
            HostAction::ScoreAnswer {
                question_number,
                team_name,
                score,
            } => {
                self.room
                    .set_correctness(question_number, &team_name, score.question_points)?;
                let current = self.room.answer_score(question_number, &team_name)?;
                let bonus_delta = score.bonus_points - current.bonus_points;
                if bonus_delta != 0 {
                    self.room.adjust_bonus(question_number, &team_name, bonus_delta)?;
                }
                Ok(())
            }
            HostAction::OverrideTeamScore {
                team_name,
                override_points: target,
            } => {
                let current_override = self
                    .room
                    .find_team(&team_name)
                    .ok_or_else(|| RoomError::GameNotFound(team_name.clone()))?
                    .override_points;
                let without_override = self.room.team_total(&team_name) - current_override;
                self.room.set_override(&team_name, target - without_override)
            }
            HostAction::UpdateQuestionSettings {
                question_number,
                timer_duration,
                question_points,
                bonus_increment,
                question_kind,
                question_config,
                speed_bonus_enabled,
            } => {
                let is_current = question_number == self.room.current_question_number;
                self.room.update_question_settings(
                    question_number,
                    timer_duration,
                    question_points,
                    bonus_increment,
                    question_kind,
                    question_config,
                    speed_bonus_enabled,
                )?;
                if is_current && !self.timer.running() {
                    self.timer = Timer::new(timer_duration);
                }
                Ok(())
            }
            HostAction::UpdateGameSettings { settings } => {
                self.room.update_game_settings(settings);
                Ok(())
            }
        }
    }

    fn sync_timer(&mut self) {
        self.room
            .set_timer(self.timer.running(), self.timer.seconds_remaining());
    }

    // === Team-side transitions (§4.5) ===

    fn handle_team_action(&mut self, session_id: &SessionId, action: TeamAction) -> Result<(), RoomError> {
        match action {
            TeamAction::ValidateJoin { game_code, team_name } => {
                self.check_game_code(&game_code)?;
                if let Some(existing) = self.room.find_team(&team_name) {
                    if existing.connected {
                        return Err(RoomError::NameConflict(team_name));
                    }
                }
                self.reply(session_id, ServerMessage::JoinValidated);
                Ok(())
            }
            TeamAction::JoinGame {
                game_code,
                team_name,
                team_members,
                color,
            } => {
                self.check_game_code(&game_code)?;
                self.room.create_team(&team_name, team_members, color)?;
                if let Some(info) = self.sessions.get_mut(session_id) {
                    info.role = SessionRole::Team(team_name);
                }
                self.broadcast_all();
                Ok(())
            }
            TeamAction::SubmitAnswer { content } => {
                let team_name = self.team_name_for(session_id)?;
                self.room.record_answer(&team_name, content)?;
                self.broadcast_all();
                Ok(())
            }
        }
    }

    fn team_name_for(&self, session_id: &SessionId) -> Result<String, RoomError> {
        match self.sessions.get(session_id).map(|s| &s.role) {
            Some(SessionRole::Team(name)) => Ok(name.clone()),
            _ => Err(RoomError::Unauthorized(
                "session has not joined as a team".to_string(),
            )),
        }
    }

    // === Watcher-side transitions (§4.5) ===

    fn handle_watcher_action(&mut self, session_id: &SessionId, action: WatcherAction) -> Result<(), RoomError> {
        match action {
            WatcherAction::Subscribe { game_code } => {
                self.check_game_code(&game_code)?;
                if let Some(info) = self.sessions.get_mut(session_id) {
                    info.role = SessionRole::Watcher;
                }
                self.reply(
                    session_id,
                    ServerMessage::ScoreboardData {
                        state: ScoreboardSnapshot::from_room(&self.room),
                    },
                );
                Ok(())
            }
        }
    }

    fn check_game_code(&self, game_code: &str) -> Result<(), RoomError> {
        if game_code.eq_ignore_ascii_case(&self.room.game_code) {
            Ok(())
        } else {
            Err(RoomError::GameNotFound(game_code.to_string()))
        }
    }

    // === Timer events (§4.4/§4.5) ===

    fn handle_timer_event(&mut self, event: TimerEvent) {
        match event {
            TimerEvent::Ticked(seconds_remaining) => {
                self.room.timer_seconds_remaining = seconds_remaining;
                self.broadcast_tick(seconds_remaining);
            }
            TimerEvent::Expired => {
                self.room.set_timer(false, 0);
                self.room.close_current_question_for_expiry();
                self.broadcast_tick(0);
                self.broadcast_all();
            }
        }
    }

    fn broadcast_tick(&self, seconds_remaining: u32) {
        let msg = ServerMessage::TimerTick { seconds_remaining };
        for info in self.sessions.values() {
            info.outbound.push(msg.clone());
        }
    }

    // === Broadcast policy (§4.5) ===

    fn broadcast_all(&mut self) {
        let host_view = ServerMessage::GameState {
            state: GameStateSnapshot::from_room(&self.room),
        };
        let scoreboard_view = ServerMessage::ScoreboardData {
            state: ScoreboardSnapshot::from_room(&self.room),
        };
        for info in self.sessions.values() {
            match &info.role {
                SessionRole::Host => info.outbound.push(host_view.clone()),
                SessionRole::Team(name) => {
                    if let Some(state) = TeamGameStateSnapshot::from_room(&self.room, name) {
                        info.outbound.push(ServerMessage::TeamGameState { state });
                    }
                }
                SessionRole::Watcher => info.outbound.push(scoreboard_view.clone()),
                SessionRole::Unbound => {}
            }
        }
    }

    fn reply(&self, session_id: &SessionId, message: ServerMessage) {
        if let Some(info) = self.sessions.get(session_id) {
            info.outbound.push(message);
        }
    }

    /// §7 "For host commands that could leave the client optimistic UI
    /// out of sync, the reply optionally includes the current
    /// authoritative snapshot".
    fn reply_error(&mut self, session_id: &SessionId, err: RoomError) {
        let is_host = matches!(self.sessions.get(session_id).map(|s| &s.role), Some(SessionRole::Host));
        let message = if is_host {
            ServerMessage::error_with_resync(err.to_string(), GameStateSnapshot::from_room(&self.room))
        } else {
            ServerMessage::error(err.to_string())
        };
        self.reply(session_id, message);
    }
}
