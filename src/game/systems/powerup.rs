//! Powerup spawning and lifecycle

use rand::seq::SliceRandom;
use rand::Rng;
use tracing::debug;

use crate::config::PowerupConfig;
use crate::game::state::{PowerupStatus, PowerupType, SessionState};
use crate::game::systems::spawn::{find_safe_location, SpawnQuery};

#[derive(Debug, Clone, Default)]
pub struct PowerupManager {
    last_spawn: Option<u64>,
}

impl PowerupManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Advance lifecycles and spawn at most one powerup. Returns whether one
    /// was spawned.
    pub fn update<R: Rng + ?Sized>(
        &mut self,
        state: &mut SessionState,
        config: &PowerupConfig,
        rng: &mut R,
        now: u64,
    ) -> bool {
        advance_lifecycle(state, config, now);
        self.try_spawn(state, config, rng, now)
    }

    pub fn try_spawn<R: Rng + ?Sized>(
        &mut self,
        state: &mut SessionState,
        config: &PowerupConfig,
        rng: &mut R,
        now: u64,
    ) -> bool {
        if let Some(last) = self.last_spawn {
            if now.saturating_sub(last) < config.spawn_interval_ms {
                return false;
            }
        }
        if state.active_powerup_count() >= config.max_active {
            return false;
        }

        let query = SpawnQuery {
            radius: config.radius,
            clearance: config.spawn_clearance,
            attempts: config.spawn_attempts,
            exclude: None,
        };
        let Some(position) = find_safe_location(rng, state, query) else {
            debug!("No safe location for powerup, retrying next tick");
            return false;
        };

        let kind = *PowerupType::ALL.choose(rng).unwrap_or(&PowerupType::SpeedBoost);
        state.add_powerup(kind, position, config.radius, now);
        self.last_spawn = Some(now);
        true
    }
}

/// spawning -> available -> despawning -> removed. Collected powerups linger
/// for the same grace window before removal.
pub fn advance_lifecycle(state: &mut SessionState, config: &PowerupConfig, now: u64) {
    for powerup in &mut state.powerups {
        match powerup.status {
            PowerupStatus::Spawning if now.saturating_sub(powerup.status_since) >= config.spawning_ms => {
                powerup.status = PowerupStatus::Available;
                powerup.status_since = now;
            }
            PowerupStatus::Available if now.saturating_sub(powerup.spawned_at) >= config.lifetime_ms => {
                powerup.status = PowerupStatus::Despawning;
                powerup.status_since = now;
            }
            _ => {}
        }
    }

    state.powerups.retain(|p| match p.status {
        PowerupStatus::Despawning | PowerupStatus::Collected => {
            now.saturating_sub(p.status_since) < config.despawn_grace_ms
        }
        _ => true,
    });
}
