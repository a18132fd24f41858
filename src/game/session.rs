//! Per-session tick handler
//!
//! A [`GameSession`] owns the authoritative state of one match together with
//! the spawn managers, bots and the session RNG. Only its own scheduler calls
//! [`GameSession::tick`], so every mutation within a tick is single-writer.

use std::sync::Arc;

use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing::{debug, info};

use crate::config::GameConfig;
use crate::game::bot::BotManager;
use crate::game::match_result::{check_match_end, determine_result, MatchEndReason, MatchResult};
use crate::game::state::{LobbyId, PlayerInfo, SessionId, SessionState, SessionStatus};
use crate::game::systems::npc::NpcManager;
use crate::game::systems::powerup::PowerupManager;
use crate::game::systems::{collision, movement, respawn};
use crate::net::protocol::StateSnapshot;

/// What one tick asks the transport to emit
#[derive(Debug, Default)]
pub struct TickOutput {
    pub snapshot: Option<StateSnapshot>,
    pub timer_tick: Option<u64>,
    pub ended: Option<MatchResult>,
}

impl TickOutput {
    pub fn is_empty(&self) -> bool {
        self.snapshot.is_none() && self.timer_tick.is_none() && self.ended.is_none()
    }
}

pub struct GameSession {
    state: SessionState,
    npc_manager: NpcManager,
    powerup_manager: PowerupManager,
    bots: BotManager,
    rng: StdRng,
    config: Arc<GameConfig>,
    /// Scheduler steps taken while live, paused ones included. Drives
    /// broadcast decimation.
    frames: u64,
}

impl GameSession {
    pub fn new(
        id: SessionId,
        lobby_id: LobbyId,
        roster: Vec<PlayerInfo>,
        config: Arc<GameConfig>,
        now: u64,
        seed: u64,
    ) -> Self {
        let state = SessionState::new(id, lobby_id, roster, &config, now);

        let mut bots = BotManager::new();
        for player in state.players.iter().filter(|p| p.is_bot) {
            bots.register_bot(player.id, config.bot.difficulty);
        }

        info!(
            "Session {} created with {} players ({} bots, {})",
            id,
            state.players.len(),
            bots.len(),
            config.bot.difficulty
        );

        Self {
            state,
            npc_manager: NpcManager::new(),
            powerup_manager: PowerupManager::new(),
            bots,
            rng: StdRng::seed_from_u64(seed),
            config,
            frames: 0,
        }
    }

    pub fn id(&self) -> SessionId {
        self.state.id
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn state_mut(&mut self) -> &mut SessionState {
        &mut self.state
    }

    pub fn bots(&self) -> &BotManager {
        &self.bots
    }

    /// Advance the simulation by one fixed step. A paused session keeps
    /// broadcasting its frozen state; an ended one does nothing.
    pub fn tick(&mut self, now: u64) -> TickOutput {
        match self.state.status {
            SessionStatus::Ended => return TickOutput::default(),
            SessionStatus::Paused => return self.broadcast(now),
            SessionStatus::Active => {}
        }

        if let Some(reason) = check_match_end(&self.state, now) {
            return self.end(reason, now);
        }

        self.state.tick += 1;
        let config = Arc::clone(&self.config);

        self.state.expire_player_powerups(now);
        respawn::update(&mut self.state, &config.player, &mut self.rng, now);

        let spawned = self.npc_manager.update(&mut self.state, &config.npc, &mut self.rng, now);
        if spawned > 0 {
            debug!("Tick {}: spawned {} NPCs", self.state.tick, spawned);
        }
        self.powerup_manager
            .update(&mut self.state, &config.powerup, &mut self.rng, now);

        self.bots.update(&mut self.state, now);
        movement::update(&mut self.state, config.dt());
        collision::update(&mut self.state, config.player.respawn_delay_ms, now);

        self.broadcast(now)
    }

    /// Count a step and emit whatever falls due on it
    fn broadcast(&mut self, now: u64) -> TickOutput {
        self.frames += 1;
        let timing = &self.config.timing;
        let snapshot_due = self.frames % timing.broadcast_every.max(1) == 0;
        let timer_due = self.frames % timing.timer_tick_every.max(1) == 0;

        TickOutput {
            snapshot: snapshot_due.then(|| self.snapshot(now)),
            timer_tick: timer_due.then(|| self.state.time_remaining_ms(now)),
            ended: None,
        }
    }

    /// Refresh the leaderboard, drain pending events and capture everything
    pub fn snapshot(&mut self, now: u64) -> StateSnapshot {
        self.state.refresh_leaderboard();
        let events = self.state.drain_events();
        StateSnapshot::capture(&self.state, events, now)
    }

    /// End the match now. The final snapshot carries any undelivered events.
    pub fn end(&mut self, reason: MatchEndReason, now: u64) -> TickOutput {
        if self.state.is_paused() {
            self.state.resume_game(now);
        }
        let result = determine_result(&self.state, reason, now);
        self.state.status = SessionStatus::Ended;

        info!(
            "Session {} ended ({:?}) after {} ms, winner: {}",
            self.state.id,
            reason,
            result.duration_ms,
            result.winner_name.as_deref().unwrap_or("draw")
        );

        TickOutput {
            snapshot: Some(self.snapshot(now)),
            timer_tick: None,
            ended: Some(result),
        }
    }
}
