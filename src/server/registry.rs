//! Live session registry
//!
//! The composition root owns one [`SessionRegistry`]. It maps session ids to
//! running sessions, starts a fixed-step scheduler per session and forwards
//! each tick's output to the transport. Transport calls always happen after
//! the session lock is released.

use std::collections::HashMap;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::{Mutex, RwLock};
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::config::GameConfig;
use crate::game::scheduler::{self, FixedStepScheduler, SchedulerHandle, TickControl, TickInfo};
use crate::game::session::{GameSession, TickOutput};
use crate::game::state::{LobbyId, PlayerId, PlayerInfo, SessionId, SessionState};
use crate::metrics::Metrics;
use crate::net::transport::Transport;
use crate::util::vec2::Vec2;

/// Errors reported to the caller of a registry operation
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SessionError {
    #[error("Session not found")]
    SessionNotFound,
    #[error("Player not found in session")]
    PlayerNotFound,
    #[error("Only the session leader can do that")]
    NotLeader,
    #[error("Session already exists")]
    SessionExists,
    #[error("Direction components must be -1, 0 or 1")]
    InvalidDirection,
}

impl SessionError {
    /// Stable code for clients
    pub fn code(&self) -> &'static str {
        match self {
            SessionError::SessionNotFound => "SESSION_NOT_FOUND",
            SessionError::PlayerNotFound => "PLAYER_NOT_FOUND",
            SessionError::NotLeader => "NOT_LEADER",
            SessionError::SessionExists => "SESSION_EXISTS",
            SessionError::InvalidDirection => "INVALID_DIRECTION",
        }
    }
}

type SharedSession = Arc<Mutex<GameSession>>;

struct SessionHandle {
    lobby_id: LobbyId,
    session: SharedSession,
    scheduler: SchedulerHandle,
}

enum PauseNotice {
    Paused {
        initiator_name: Option<String>,
        remaining_ms: u64,
    },
    Resumed {
        remaining_ms: u64,
    },
}

#[derive(Clone)]
pub struct SessionRegistry {
    sessions: Arc<RwLock<HashMap<SessionId, SessionHandle>>>,
    transport: Arc<dyn Transport>,
    config: Arc<GameConfig>,
    metrics: Arc<Metrics>,
    epoch: Instant,
}

impl SessionRegistry {
    pub fn new(transport: Arc<dyn Transport>, config: Arc<GameConfig>, metrics: Arc<Metrics>) -> Self {
        Self {
            sessions: Arc::new(RwLock::new(HashMap::new())),
            transport,
            config,
            metrics,
            epoch: Instant::now(),
        }
    }

    /// Monotonic milliseconds since the registry was created. Every session
    /// timestamp uses this clock.
    pub fn now_ms(&self) -> u64 {
        millis_since(self.epoch)
    }

    pub fn session_count(&self) -> usize {
        self.sessions.read().len()
    }

    pub fn contains(&self, session_id: SessionId) -> bool {
        self.sessions.read().contains_key(&session_id)
    }

    /// Create the session state, seed bots and start ticking. Must be called
    /// from within a tokio runtime.
    pub fn start_session(
        &self,
        session_id: SessionId,
        lobby_id: LobbyId,
        players: Vec<PlayerInfo>,
    ) -> Result<(), SessionError> {
        let mut sessions = self.sessions.write();
        if sessions.contains_key(&session_id) {
            return Err(SessionError::SessionExists);
        }

        let seed = session_id.as_u64_pair().0;
        let session = Arc::new(Mutex::new(GameSession::new(
            session_id,
            lobby_id,
            players,
            self.config.clone(),
            self.now_ms(),
            seed,
        )));

        let interval = Duration::from_millis(self.config.timing.tick_interval_ms);
        let plan = FixedStepScheduler::new(interval, self.config.timing.max_catch_up, Instant::now());
        let scheduler = scheduler::spawn(plan, self.tick_handler(session_id, session.clone()));

        sessions.insert(
            session_id,
            SessionHandle {
                lobby_id,
                session,
                scheduler,
            },
        );
        self.metrics.session_started();

        info!(
            "Session {} started for lobby {} at {} Hz",
            session_id,
            lobby_id,
            1000 / self.config.timing.tick_interval_ms.max(1)
        );
        Ok(())
    }

    /// Stop scheduling and release the session
    pub fn stop_session(&self, session_id: SessionId) -> Result<(), SessionError> {
        let handle = self
            .sessions
            .write()
            .remove(&session_id)
            .ok_or(SessionError::SessionNotFound)?;
        handle.scheduler.stop();
        self.metrics.session_ended();
        info!("Session {} stopped", session_id);
        Ok(())
    }

    /// Stop every session that belongs to `lobby_id`. Returns how many were
    /// stopped.
    pub fn stop_lobby_sessions(&self, lobby_id: LobbyId) -> usize {
        let stopped: Vec<(SessionId, SessionHandle)> = {
            let mut sessions = self.sessions.write();
            let ids: Vec<SessionId> = sessions
                .iter()
                .filter(|(_, h)| h.lobby_id == lobby_id)
                .map(|(id, _)| *id)
                .collect();
            ids.into_iter()
                .filter_map(|id| sessions.remove(&id).map(|h| (id, h)))
                .collect()
        };

        for (id, handle) in &stopped {
            handle.scheduler.stop();
            self.metrics.session_ended();
            info!("Session {} stopped, lobby {} emptied", id, lobby_id);
        }
        stopped.len()
    }

    /// Stop every session and wait for their schedulers to exit
    pub async fn shutdown(&self) {
        let handles: Vec<SessionHandle> = self.sessions.write().drain().map(|(_, h)| h).collect();
        let count = handles.len();
        for handle in handles {
            handle.scheduler.shutdown().await;
            self.metrics.session_ended();
        }
        info!("Stopped {} sessions", count);
    }

    /// Set a player's desired direction. Input for a player who is not alive
    /// is accepted and ignored.
    pub fn apply_player_input(
        &self,
        session_id: SessionId,
        player_id: PlayerId,
        direction: Vec2,
    ) -> Result<(), SessionError> {
        if !direction.is_axis_direction() {
            return Err(SessionError::InvalidDirection);
        }
        let session = self.session(session_id)?;
        let now = self.now_ms();
        let mut game = session.lock();
        let state = game.state_mut();
        if state.player(player_id).is_none() {
            return Err(SessionError::PlayerNotFound);
        }
        state.apply_player_input(player_id, direction, now);
        Ok(())
    }

    /// Pause or resume on behalf of the leader. Returns whether the pause
    /// state changed.
    pub fn toggle_pause(
        &self,
        session_id: SessionId,
        player_id: PlayerId,
        want_paused: bool,
    ) -> Result<bool, SessionError> {
        let session = self.session(session_id)?;
        let now = self.now_ms();

        let notice = {
            let mut game = session.lock();
            let state = game.state_mut();
            let player = state.player(player_id).ok_or(SessionError::PlayerNotFound)?;
            if !player.is_leader {
                return Err(SessionError::NotLeader);
            }

            if want_paused {
                state.pause_game(player_id, now).then(|| PauseNotice::Paused {
                    initiator_name: state.pause_initiator_name().map(str::to_owned),
                    remaining_ms: state.time_remaining_ms(now),
                })
            } else {
                state.resume_game(now).then(|| PauseNotice::Resumed {
                    remaining_ms: state.time_remaining_ms(now),
                })
            }
        };

        match notice {
            Some(PauseNotice::Paused {
                initiator_name,
                remaining_ms,
            }) => {
                info!("Session {} paused by {}", session_id, player_id);
                self.transport.broadcast_paused(session_id, initiator_name, remaining_ms);
                Ok(true)
            }
            Some(PauseNotice::Resumed { remaining_ms }) => {
                info!("Session {} resumed with {} ms left", session_id, remaining_ms);
                self.transport.broadcast_resumed(session_id, remaining_ms);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Mark a player as quit. They stay in history and on the leaderboard.
    pub fn mark_player_quit(&self, session_id: SessionId, player_id: PlayerId) -> Result<(), SessionError> {
        let session = self.session(session_id)?;
        if !session.lock().state_mut().mark_player_quit(player_id) {
            return Err(SessionError::PlayerNotFound);
        }
        info!("Player {} quit session {}", player_id, session_id);
        Ok(())
    }

    /// Read-only access to a live session's state
    pub fn with_state<R>(
        &self,
        session_id: SessionId,
        f: impl FnOnce(&SessionState) -> R,
    ) -> Result<R, SessionError> {
        let session = self.session(session_id)?;
        let game = session.lock();
        Ok(f(game.state()))
    }

    fn session(&self, session_id: SessionId) -> Result<SharedSession, SessionError> {
        self.sessions
            .read()
            .get(&session_id)
            .map(|h| h.session.clone())
            .ok_or(SessionError::SessionNotFound)
    }

    fn tick_handler(
        &self,
        session_id: SessionId,
        session: SharedSession,
    ) -> impl FnMut(TickInfo) -> TickControl + Send + 'static {
        let sessions = self.sessions.clone();
        let transport = self.transport.clone();
        let metrics = self.metrics.clone();
        let epoch = self.epoch;
        let budget = Duration::from_millis(self.config.timing.tick_interval_ms);

        move |info: TickInfo| {
            if info.batch_index == 0 && info.plan.ticks > 1 {
                metrics.record_catch_up(info.plan.ticks - 1, info.plan.resynced());
            }

            let started = std::time::Instant::now();
            let output = session.lock().tick(millis_since(epoch));
            let elapsed = started.elapsed();
            metrics.record_tick_time(elapsed);
            if elapsed > budget {
                warn!("Session {} slow tick: {:?} (budget {:?})", session_id, elapsed, budget);
            }

            if !emit(transport.as_ref(), &metrics, session_id, output) {
                return TickControl::Continue;
            }

            if sessions.write().remove(&session_id).is_some() {
                metrics.session_ended();
            }
            debug!("Session {} released after match end", session_id);
            TickControl::Stop
        }
    }
}

fn millis_since(epoch: Instant) -> u64 {
    Instant::now().duration_since(epoch).as_millis() as u64
}

/// Hand a tick's output to the transport. Returns true when the match ended.
fn emit(transport: &dyn Transport, metrics: &Metrics, session_id: SessionId, output: TickOutput) -> bool {
    if let Some(snapshot) = output.snapshot {
        metrics.record_broadcast(snapshot.events.len());
        transport.broadcast_state(session_id, snapshot);
    }
    if let Some(remaining_ms) = output.timer_tick {
        metrics.timer_ticks.fetch_add(1, Ordering::Relaxed);
        transport.broadcast_timer_tick(session_id, remaining_ms);
    }
    match output.ended {
        Some(result) => {
            transport.broadcast_ended(session_id, result);
            true
        }
        None => false,
    }
}
