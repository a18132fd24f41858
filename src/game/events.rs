//! Discrete gameplay events queued during a tick and drained on broadcast

use serde::{Deserialize, Serialize};

use crate::game::state::{EntityId, NpcType, PlayerId, PowerupType};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GameEvent {
    NpcEaten {
        player_id: PlayerId,
        npc_id: EntityId,
        npc_type: NpcType,
        xp_gained: u32,
    },
    PlayerEaten {
        eater_id: PlayerId,
        victim_id: PlayerId,
        xp_gained: u32,
    },
    PlayerKilledByNpc {
        npc_id: EntityId,
        victim_id: PlayerId,
        xp_lost: u32,
    },
    PowerupCollected {
        player_id: PlayerId,
        powerup_id: EntityId,
        powerup_type: PowerupType,
        expires_at: u64,
    },
    PowerupExpired {
        player_id: PlayerId,
        powerup_type: PowerupType,
    },
    PlayerRespawned {
        player_id: PlayerId,
        x: f32,
        y: f32,
    },
}

impl GameEvent {
    /// Short label used in logs and metrics
    pub fn kind(&self) -> &'static str {
        match self {
            GameEvent::NpcEaten { .. } => "npc_eaten",
            GameEvent::PlayerEaten { .. } => "player_eaten",
            GameEvent::PlayerKilledByNpc { .. } => "player_killed_by_npc",
            GameEvent::PowerupCollected { .. } => "powerup_collected",
            GameEvent::PowerupExpired { .. } => "powerup_expired",
            GameEvent::PlayerRespawned { .. } => "player_respawned",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn test_json_shape() {
        let event = GameEvent::PlayerEaten {
            eater_id: Uuid::nil(),
            victim_id: Uuid::nil(),
            xp_gained: 10,
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["player_eaten"]["xp_gained"], 10);
        assert_eq!(event.kind(), "player_eaten");
    }
}
