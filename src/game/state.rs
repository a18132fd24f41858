//! Authoritative per-session state
//!
//! Owns every player, NPC and powerup of one match plus the timer/pause
//! bookkeeping and the pending event queue. Only the session's tick handler
//! mutates it.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::GameConfig;
use crate::game::constants::{npc, powerup};
use crate::game::events::GameEvent;
use crate::game::rules;
use crate::util::vec2::Vec2;

/// Unique player identifier
pub type PlayerId = Uuid;

/// Unique session identifier
pub type SessionId = Uuid;

/// Lobby that owns a session
pub type LobbyId = Uuid;

/// Identifier for NPCs and powerups, unique within a session
pub type EntityId = u64;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum SessionStatus {
    Active,
    Paused,
    Ended,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum PlayerStatus {
    Alive,
    Respawning,
    Spectating,
    Quit,
}

/// NPC feeding tier
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum NpcType {
    Small,
    Medium,
    Large,
}

impl NpcType {
    pub const ALL: [NpcType; 3] = [NpcType::Small, NpcType::Medium, NpcType::Large];

    fn stats(self) -> (u32, f32, f32, f32) {
        match self {
            NpcType::Small => npc::SMALL,
            NpcType::Medium => npc::MEDIUM,
            NpcType::Large => npc::LARGE,
        }
    }

    /// XP awarded when eaten
    pub fn xp(self) -> u32 {
        self.stats().0
    }

    pub fn radius(self) -> f32 {
        self.stats().1
    }

    pub fn visual_size(self) -> f32 {
        self.stats().2
    }

    /// Wander speed in units per second
    pub fn speed(self) -> f32 {
        self.stats().3
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum NpcStatus {
    Spawning,
    Alive,
    Despawning,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum PowerupType {
    Invincibility,
    SpeedBoost,
    DoubleXp,
}

impl PowerupType {
    pub const ALL: [PowerupType; 3] = [
        PowerupType::Invincibility,
        PowerupType::SpeedBoost,
        PowerupType::DoubleXp,
    ];

    /// How long the effect lasts once collected
    pub fn duration_ms(self) -> u64 {
        match self {
            PowerupType::Invincibility => powerup::INVINCIBILITY_MS,
            PowerupType::SpeedBoost => powerup::SPEED_BOOST_MS,
            PowerupType::DoubleXp => powerup::DOUBLE_XP_MS,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum PowerupStatus {
    Spawning,
    Available,
    Collected,
    Despawning,
}

/// The single powerup currently modifying a player
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct ActivePowerup {
    pub kind: PowerupType,
    pub expires_at: u64,
}

/// Roster entry handed over by the lobby when a session starts
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlayerInfo {
    pub id: PlayerId,
    pub display_name: String,
    pub color: String,
    pub is_leader: bool,
    pub is_bot: bool,
}

impl PlayerInfo {
    pub fn new(display_name: impl Into<String>, color: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            display_name: display_name.into(),
            color: color.into(),
            is_leader: false,
            is_bot: false,
        }
    }

    pub fn leader(mut self) -> Self {
        self.is_leader = true;
        self
    }

    pub fn bot(mut self) -> Self {
        self.is_bot = true;
        self
    }
}

/// Player state
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Player {
    pub id: PlayerId,
    pub display_name: String,
    pub color: String,
    pub is_leader: bool,
    pub is_bot: bool,
    pub position: Vec2,
    pub velocity: Vec2,
    pub xp: u32,
    /// Always `rules::growth_phase_for_xp(xp)`
    pub growth_phase: u8,
    pub radius: f32,
    pub visual_size: f32,
    pub status: PlayerStatus,
    pub respawn_at: Option<u64>,
    /// Cannot be eaten before this timestamp
    pub grace_until: Option<u64>,
    pub active_powerup: Option<ActivePowerup>,
    pub players_eaten: u32,
    pub npcs_eaten: u32,
    pub deaths: u32,
}

impl Player {
    pub fn new(info: PlayerInfo, position: Vec2) -> Self {
        let mut player = Self {
            id: info.id,
            display_name: info.display_name,
            color: info.color,
            is_leader: info.is_leader,
            is_bot: info.is_bot,
            position,
            velocity: Vec2::ZERO,
            xp: 0,
            growth_phase: 1,
            radius: 0.0,
            visual_size: 0.0,
            status: PlayerStatus::Alive,
            respawn_at: None,
            grace_until: None,
            active_powerup: None,
            players_eaten: 0,
            npcs_eaten: 0,
            deaths: 0,
        };
        player.set_xp(0);
        player
    }

    pub fn is_alive(&self) -> bool {
        self.status == PlayerStatus::Alive
    }

    /// Set xp and recompute phase, radius and visual size together.
    /// Returns true when the growth phase changed.
    pub fn set_xp(&mut self, xp: u32) -> bool {
        let phase = rules::growth_phase_for_xp(xp);
        let changed = phase != self.growth_phase;
        self.xp = xp;
        self.growth_phase = phase;
        self.radius = rules::radius_for_phase(phase);
        self.visual_size = rules::visual_size_for_phase(phase);
        changed
    }

    pub fn in_grace(&self, now: u64) -> bool {
        rules::in_grace(self.grace_until, now)
    }

    pub fn has_powerup(&self, kind: PowerupType, now: u64) -> bool {
        matches!(self.active_powerup, Some(active) if active.kind == kind && now < active.expires_at)
    }

    pub fn is_invincible(&self, now: u64) -> bool {
        self.has_powerup(PowerupType::Invincibility, now)
    }

    /// Grace or invincibility
    pub fn is_protected(&self, now: u64) -> bool {
        self.in_grace(now) || self.is_invincible(now)
    }
}

/// Computer-controlled fish
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Npc {
    pub id: EntityId,
    pub npc_type: NpcType,
    pub position: Vec2,
    pub velocity: Vec2,
    pub status: NpcStatus,
    pub spawned_at: u64,
    /// When the current status was entered
    pub status_since: u64,
}

impl Npc {
    pub fn radius(&self) -> f32 {
        self.npc_type.radius()
    }

    /// Only fully spawned NPCs eat or get eaten
    pub fn is_alive(&self) -> bool {
        self.status == NpcStatus::Alive
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Powerup {
    pub id: EntityId,
    pub kind: PowerupType,
    pub position: Vec2,
    pub radius: f32,
    pub status: PowerupStatus,
    pub spawned_at: u64,
    pub status_since: u64,
}

impl Powerup {
    pub fn is_available(&self) -> bool {
        self.status == PowerupStatus::Available
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LeaderboardEntry {
    pub rank: u32,
    pub player_id: PlayerId,
    pub display_name: String,
    pub xp: u32,
}

/// Arena bounds, origin top-left
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Bounds {
    pub width: f32,
    pub height: f32,
}

impl Bounds {
    pub fn center(&self) -> Vec2 {
        Vec2::new(self.width * 0.5, self.height * 0.5)
    }

    /// Keep a circle of `radius` fully inside
    pub fn clamp_circle(&self, position: Vec2, radius: f32) -> Vec2 {
        Vec2::new(
            position.x.clamp(radius, (self.width - radius).max(radius)),
            position.y.clamp(radius, (self.height - radius).max(radius)),
        )
    }
}

/// Complete state of one match
#[derive(Debug, Clone)]
pub struct SessionState {
    pub id: SessionId,
    pub lobby_id: LobbyId,
    pub created_at: u64,
    pub started_at: u64,
    pub status: SessionStatus,
    pub timer_origin: u64,
    pub duration_ms: u64,
    pub paused_accumulated_ms: u64,
    pub paused_at: Option<u64>,
    pub pause_initiator: Option<PlayerId>,
    pub tick: u64,
    pub bounds: Bounds,
    /// Join order; every player-centric pass iterates in this order
    pub players: Vec<Player>,
    pub npcs: Vec<Npc>,
    pub powerups: Vec<Powerup>,
    pub leaderboard: Vec<LeaderboardEntry>,
    base_speed: f32,
    speed_multiplier: f32,
    events: VecDeque<GameEvent>,
    next_entity_id: EntityId,
}

impl SessionState {
    pub fn new(
        id: SessionId,
        lobby_id: LobbyId,
        roster: Vec<PlayerInfo>,
        config: &GameConfig,
        now: u64,
    ) -> Self {
        let bounds = Bounds {
            width: config.arena.width,
            height: config.arena.height,
        };
        let count = roster.len().max(1);
        let ring = bounds.width.min(bounds.height) * 0.35;
        let players = roster
            .into_iter()
            .enumerate()
            .map(|(i, info)| {
                let angle = std::f32::consts::TAU * i as f32 / count as f32;
                Player::new(info, bounds.center() + Vec2::from_angle(angle) * ring)
            })
            .collect();

        let mut state = Self {
            id,
            lobby_id,
            created_at: now,
            started_at: now,
            status: SessionStatus::Active,
            timer_origin: now,
            duration_ms: config.timing.match_duration_ms,
            paused_accumulated_ms: 0,
            paused_at: None,
            pause_initiator: None,
            tick: 0,
            bounds,
            players,
            npcs: Vec::new(),
            powerups: Vec::new(),
            leaderboard: Vec::new(),
            base_speed: config.player.base_speed,
            speed_multiplier: config.powerup.speed_multiplier,
            events: VecDeque::new(),
            next_entity_id: 1,
        };
        state.refresh_leaderboard();
        state
    }

    /// Generate a new unique entity ID
    pub fn next_entity_id(&mut self) -> EntityId {
        let id = self.next_entity_id;
        self.next_entity_id += 1;
        id
    }

    pub fn player(&self, id: PlayerId) -> Option<&Player> {
        self.players.iter().find(|p| p.id == id)
    }

    pub fn player_mut(&mut self, id: PlayerId) -> Option<&mut Player> {
        self.players.iter_mut().find(|p| p.id == id)
    }

    pub fn player_index(&self, id: PlayerId) -> Option<usize> {
        self.players.iter().position(|p| p.id == id)
    }

    pub fn alive_players(&self) -> impl Iterator<Item = &Player> {
        self.players.iter().filter(|p| p.is_alive())
    }

    pub fn is_paused(&self) -> bool {
        self.status == SessionStatus::Paused
    }

    pub fn is_ended(&self) -> bool {
        self.status == SessionStatus::Ended
    }

    /// Set velocity from a unit-or-zero direction. No-op unless the player is
    /// alive; returns whether the input was applied.
    pub fn apply_player_input(&mut self, id: PlayerId, direction: Vec2, now: u64) -> bool {
        let (base_speed, boost) = (self.base_speed, self.speed_multiplier);
        let Some(player) = self.player_mut(id) else {
            return false;
        };
        if !player.is_alive() {
            return false;
        }
        let boosted = player.has_powerup(PowerupType::SpeedBoost, now);
        player.velocity = direction.normalize() * move_speed(base_speed, boost, boosted);
        true
    }

    /// Add xp and recompute growth. Returns true when the phase changed.
    pub fn update_player_xp(&mut self, id: PlayerId, delta: u32) -> bool {
        match self.player_mut(id) {
            Some(player) => {
                let xp = player.xp.saturating_add(delta);
                player.set_xp(xp)
            }
            None => false,
        }
    }

    /// Reset a player to baseline and schedule their respawn
    pub fn set_player_respawning(&mut self, id: PlayerId, delay_ms: u64, now: u64) -> bool {
        let Some(player) = self.player_mut(id) else {
            return false;
        };
        if player.status == PlayerStatus::Quit {
            return false;
        }
        player.set_xp(0);
        player.active_powerup = None;
        player.velocity = Vec2::ZERO;
        player.status = PlayerStatus::Respawning;
        player.respawn_at = Some(now + delay_ms);
        player.grace_until = None;
        player.deaths += 1;
        true
    }

    /// Bring a respawning player back at `position` with a fresh grace period
    pub fn complete_player_respawn(
        &mut self,
        id: PlayerId,
        position: Vec2,
        now: u64,
        grace_ms: u64,
    ) -> bool {
        let Some(player) = self.player_mut(id) else {
            return false;
        };
        if player.status != PlayerStatus::Respawning {
            return false;
        }
        player.status = PlayerStatus::Alive;
        player.position = position;
        player.velocity = Vec2::ZERO;
        player.respawn_at = None;
        player.grace_until = Some(now + grace_ms);
        true
    }

    pub fn is_player_in_grace(&self, id: PlayerId, now: u64) -> bool {
        self.player(id).is_some_and(|p| p.in_grace(now))
    }

    /// Quit players stay in history and on the leaderboard
    pub fn mark_player_quit(&mut self, id: PlayerId) -> bool {
        match self.player_mut(id) {
            Some(player) => {
                player.status = PlayerStatus::Quit;
                player.velocity = Vec2::ZERO;
                player.respawn_at = None;
                true
            }
            None => false,
        }
    }

    /// Grant a powerup, replacing whatever was active
    pub fn grant_powerup(&mut self, id: PlayerId, kind: PowerupType, now: u64) -> Option<u64> {
        let (base_speed, boost) = (self.base_speed, self.speed_multiplier);
        let player = self.player_mut(id)?;
        let was_boosted = player.has_powerup(PowerupType::SpeedBoost, now);
        let expires_at = now + kind.duration_ms();
        player.active_powerup = Some(ActivePowerup { kind, expires_at });

        // Current heading picks up the new speed immediately
        let boosted = kind == PowerupType::SpeedBoost;
        if boosted != was_boosted {
            player.velocity = player.velocity.normalize() * move_speed(base_speed, boost, boosted);
        }
        Some(expires_at)
    }

    /// Clear powerups whose effect ended and queue `PowerupExpired`
    pub fn expire_player_powerups(&mut self, now: u64) {
        let base_speed = self.base_speed;
        let mut expired = Vec::new();
        for player in &mut self.players {
            if let Some(active) = player.active_powerup {
                if now >= active.expires_at {
                    player.active_powerup = None;
                    if active.kind == PowerupType::SpeedBoost {
                        player.velocity = player.velocity.normalize() * base_speed;
                    }
                    expired.push(GameEvent::PowerupExpired {
                        player_id: player.id,
                        powerup_type: active.kind,
                    });
                }
            }
        }
        self.queue_events(expired);
    }

    pub fn pause_game(&mut self, initiator: PlayerId, now: u64) -> bool {
        if self.status != SessionStatus::Active {
            return false;
        }
        self.status = SessionStatus::Paused;
        self.paused_at = Some(now);
        self.pause_initiator = Some(initiator);
        true
    }

    pub fn resume_game(&mut self, now: u64) -> bool {
        if self.status != SessionStatus::Paused {
            return false;
        }
        if let Some(paused_at) = self.paused_at.take() {
            self.paused_accumulated_ms += now.saturating_sub(paused_at);
        }
        self.status = SessionStatus::Active;
        self.pause_initiator = None;
        true
    }

    /// Unpaused time since the timer origin
    pub fn active_elapsed_ms(&self, now: u64) -> u64 {
        let current_pause = self.paused_at.map_or(0, |at| now.saturating_sub(at));
        now.saturating_sub(self.timer_origin)
            .saturating_sub(self.paused_accumulated_ms)
            .saturating_sub(current_pause)
    }

    pub fn time_remaining_ms(&self, now: u64) -> u64 {
        self.duration_ms.saturating_sub(self.active_elapsed_ms(now))
    }

    pub fn pause_initiator_name(&self) -> Option<&str> {
        self.pause_initiator
            .and_then(|id| self.player(id))
            .map(|p| p.display_name.as_str())
    }

    pub fn queue_event(&mut self, event: GameEvent) {
        self.events.push_back(event);
    }

    pub fn queue_events(&mut self, events: impl IntoIterator<Item = GameEvent>) {
        self.events.extend(events);
    }

    /// Take every pending event in FIFO order
    pub fn drain_events(&mut self) -> Vec<GameEvent> {
        self.events.drain(..).collect()
    }

    pub fn pending_event_count(&self) -> usize {
        self.events.len()
    }

    /// Rank by xp descending; join order breaks ties
    pub fn ranked_players(&self) -> Vec<&Player> {
        let mut ranked: Vec<&Player> = self.players.iter().collect();
        // Stable sort keeps join order among equal xp
        ranked.sort_by(|a, b| b.xp.cmp(&a.xp));
        ranked
    }

    pub fn refresh_leaderboard(&mut self) {
        self.leaderboard = self
            .ranked_players()
            .into_iter()
            .enumerate()
            .map(|(i, p)| LeaderboardEntry {
                rank: i as u32 + 1,
                player_id: p.id,
                display_name: p.display_name.clone(),
                xp: p.xp,
            })
            .collect();
    }

    pub fn add_npc(&mut self, npc_type: NpcType, position: Vec2, velocity: Vec2, now: u64) -> EntityId {
        let id = self.next_entity_id();
        self.npcs.push(Npc {
            id,
            npc_type,
            position,
            velocity,
            status: NpcStatus::Spawning,
            spawned_at: now,
            status_since: now,
        });
        id
    }

    /// NPCs of a type still counting against its cap
    pub fn npc_count(&self, npc_type: NpcType) -> usize {
        self.npcs
            .iter()
            .filter(|n| n.npc_type == npc_type && n.status != NpcStatus::Despawning)
            .count()
    }

    pub fn add_powerup(&mut self, kind: PowerupType, position: Vec2, radius: f32, now: u64) -> EntityId {
        let id = self.next_entity_id();
        self.powerups.push(Powerup {
            id,
            kind,
            position,
            radius,
            status: PowerupStatus::Spawning,
            spawned_at: now,
            status_since: now,
        });
        id
    }

    /// Powerups still counting against the global cap
    pub fn active_powerup_count(&self) -> usize {
        self.powerups
            .iter()
            .filter(|p| matches!(p.status, PowerupStatus::Spawning | PowerupStatus::Available))
            .count()
    }
}

fn move_speed(base_speed: f32, boost: f32, boosted: bool) -> f32 {
    if boosted {
        base_speed * boost
    } else {
        base_speed
    }
}
