use serde::{Deserialize, Serialize};

use crate::game::events::GameEvent;
use crate::game::match_result::MatchResult;
use crate::game::state::{
    EntityId, LeaderboardEntry, NpcType, PlayerId, PlayerStatus, PowerupStatus, PowerupType,
    SessionState, SessionStatus,
};
use crate::util::vec2::Vec2;

/// Messages from server to the room of one session
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub enum ServerMessage {
    /// Full state snapshot with the events drained since the last one
    Snapshot(StateSnapshot),
    /// Remaining match time only
    TimerTick { remaining_ms: u64 },
    /// Leader paused the match
    Paused {
        initiator_name: Option<String>,
        remaining_ms: u64,
    },
    /// Leader resumed the match
    Resumed { remaining_ms: u64 },
    /// Match is over
    Ended(MatchResult),
}

impl ServerMessage {
    pub fn kind(&self) -> &'static str {
        match self {
            ServerMessage::Snapshot(_) => "snapshot",
            ServerMessage::TimerTick { .. } => "timer_tick",
            ServerMessage::Paused { .. } => "paused",
            ServerMessage::Resumed { .. } => "resumed",
            ServerMessage::Ended(_) => "ended",
        }
    }
}

/// Everything a client needs to render one frame
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StateSnapshot {
    pub tick: u64,
    pub status: SessionStatus,
    pub paused: bool,
    pub pause_initiator_name: Option<String>,
    pub remaining_ms: u64,
    pub players: Vec<PlayerSnapshot>,
    pub npcs: Vec<NpcSnapshot>,
    pub powerups: Vec<PowerupSnapshot>,
    pub events: Vec<GameEvent>,
    pub leaderboard: Vec<LeaderboardEntry>,
}

impl StateSnapshot {
    /// Capture `state` together with already drained `events`. The leaderboard
    /// is taken as cached, so refresh it first.
    pub fn capture(state: &SessionState, events: Vec<GameEvent>, now: u64) -> Self {
        Self {
            tick: state.tick,
            status: state.status,
            paused: state.is_paused(),
            pause_initiator_name: state.pause_initiator_name().map(str::to_owned),
            remaining_ms: state.time_remaining_ms(now),
            players: state
                .players
                .iter()
                .map(|p| PlayerSnapshot::from_player(p, now))
                .collect(),
            npcs: state.npcs.iter().map(NpcSnapshot::from_npc).collect(),
            powerups: state.powerups.iter().map(PowerupSnapshot::from_powerup).collect(),
            events,
            leaderboard: state.leaderboard.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PlayerSnapshot {
    pub id: PlayerId,
    pub display_name: String,
    pub color: String,
    pub position: Vec2,
    pub velocity: Vec2,
    pub xp: u32,
    pub growth_phase: u8,
    pub visual_size: f32,
    pub status: PlayerStatus,
    /// At most one entry under current rules
    pub active_powerups: Vec<ActivePowerupSnapshot>,
    pub in_grace: bool,
    pub is_bot: bool,
}

impl PlayerSnapshot {
    pub fn from_player(player: &crate::game::state::Player, now: u64) -> Self {
        let active_powerups = player
            .active_powerup
            .filter(|active| now < active.expires_at)
            .map(|active| ActivePowerupSnapshot {
                kind: active.kind,
                remaining_ms: active.expires_at - now,
            })
            .into_iter()
            .collect();

        Self {
            id: player.id,
            display_name: player.display_name.clone(),
            color: player.color.clone(),
            position: player.position,
            velocity: player.velocity,
            xp: player.xp,
            growth_phase: player.growth_phase,
            visual_size: player.visual_size,
            status: player.status,
            active_powerups,
            in_grace: player.in_grace(now),
            is_bot: player.is_bot,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct ActivePowerupSnapshot {
    pub kind: PowerupType,
    pub remaining_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NpcSnapshot {
    pub id: EntityId,
    pub npc_type: NpcType,
    pub position: Vec2,
    pub velocity: Vec2,
    pub visual_size: f32,
}

impl NpcSnapshot {
    pub fn from_npc(npc: &crate::game::state::Npc) -> Self {
        Self {
            id: npc.id,
            npc_type: npc.npc_type,
            position: npc.position,
            velocity: npc.velocity,
            visual_size: npc.npc_type.visual_size(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PowerupSnapshot {
    pub id: EntityId,
    pub kind: PowerupType,
    pub position: Vec2,
    pub status: PowerupStatus,
    pub radius: f32,
}

impl PowerupSnapshot {
    pub fn from_powerup(powerup: &crate::game::state::Powerup) -> Self {
        Self {
            id: powerup.id,
            kind: powerup.kind,
            position: powerup.position,
            status: powerup.status,
            radius: powerup.radius,
        }
    }
}

/// Encode a message using bincode
/// Uses legacy config for fixed-size integers
pub fn encode<T: Serialize>(message: &T) -> Result<Vec<u8>, ProtocolError> {
    bincode::serde::encode_to_vec(message, bincode::config::legacy())
        .map_err(|e| ProtocolError::Encode(e.to_string()))
}

/// Decode a message using bincode
pub fn decode<T: for<'de> Deserialize<'de>>(data: &[u8]) -> Result<T, ProtocolError> {
    bincode::serde::decode_from_slice(data, bincode::config::legacy())
        .map(|(msg, _)| msg)
        .map_err(|e| ProtocolError::Decode(e.to_string()))
}

#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    #[error("Encode error: {0}")]
    Encode(String),
    #[error("Decode error: {0}")]
    Decode(String),
}
