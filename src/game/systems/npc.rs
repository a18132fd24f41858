//! NPC population: spawn cadence, swarms, wandering and despawn cleanup

use rand::Rng;
use tracing::debug;

use crate::config::NpcConfig;
use crate::game::state::{NpcStatus, NpcType, SessionState};
use crate::game::systems::spawn::{find_safe_location, scatter_around, SpawnQuery};
use crate::util::vec2::Vec2;

/// Maximum deviation from a pure left/right heading, in radians
const HORIZONTAL_SPREAD: f32 = 0.5;

/// Per-type spawn bookkeeping for one session
#[derive(Debug, Clone, Default)]
pub struct NpcManager {
    last_spawn: [Option<u64>; 3],
}

fn type_index(npc_type: NpcType) -> usize {
    match npc_type {
        NpcType::Small => 0,
        NpcType::Medium => 1,
        NpcType::Large => 2,
    }
}

impl NpcManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Advance lifecycles, spawn what is due and steer wanderers.
    /// Returns the number of NPCs created this tick.
    pub fn update<R: Rng + ?Sized>(
        &mut self,
        state: &mut SessionState,
        config: &NpcConfig,
        rng: &mut R,
        now: u64,
    ) -> usize {
        advance_lifecycle(state, config, now);

        let mut spawned = 0;
        for npc_type in NpcType::ALL {
            spawned += self.try_spawn(state, config, npc_type, rng, now);
        }

        wander(state, config, rng);
        spawned
    }

    /// Spawn a single NPC or a swarm of `npc_type` when its interval has
    /// elapsed and it is below cap. A failed location search leaves the timer
    /// untouched so the next tick retries.
    pub fn try_spawn<R: Rng + ?Sized>(
        &mut self,
        state: &mut SessionState,
        config: &NpcConfig,
        npc_type: NpcType,
        rng: &mut R,
        now: u64,
    ) -> usize {
        let spawn = config.spawn(npc_type);
        let slot = &mut self.last_spawn[type_index(npc_type)];
        if let Some(last) = *slot {
            if now.saturating_sub(last) < spawn.interval_ms {
                return 0;
            }
        }

        let existing = state.npc_count(npc_type);
        if existing >= spawn.cap {
            return 0;
        }

        let radius = npc_type.radius();
        let query = SpawnQuery {
            radius,
            clearance: config.spawn_clearance,
            attempts: config.spawn_attempts,
            exclude: None,
        };
        let Some(center) = find_safe_location(rng, state, query) else {
            debug!("No safe location for {:?} NPC, retrying next tick", npc_type);
            return 0;
        };

        let room = spawn.cap - existing;
        let count = if spawn.swarm_size > 1 && rng.gen::<f32>() < spawn.swarm_chance {
            spawn.swarm_size.min(room)
        } else {
            1
        };

        if count == 1 {
            state.add_npc(npc_type, center, Vec2::ZERO, now);
        } else {
            for _ in 0..count {
                let position = scatter_around(rng, state, center, config.swarm_spread, radius);
                state.add_npc(npc_type, position, Vec2::ZERO, now);
            }
        }

        *slot = Some(now);
        count
    }
}

/// spawning -> alive -> despawning -> removed
pub fn advance_lifecycle(state: &mut SessionState, config: &NpcConfig, now: u64) {
    for npc in &mut state.npcs {
        match npc.status {
            NpcStatus::Spawning if now.saturating_sub(npc.status_since) >= config.spawning_ms => {
                npc.status = NpcStatus::Alive;
                npc.status_since = now;
            }
            NpcStatus::Alive if now.saturating_sub(npc.spawned_at) >= config.lifetime_ms => {
                npc.status = NpcStatus::Despawning;
                npc.status_since = now;
            }
            _ => {}
        }
    }

    state.npcs.retain(|npc| {
        npc.status != NpcStatus::Despawning || now.saturating_sub(npc.status_since) < config.despawn_grace_ms
    });
}

/// Organic wandering without per-NPC AI state
pub fn wander<R: Rng + ?Sized>(state: &mut SessionState, config: &NpcConfig, rng: &mut R) {
    for npc in state.npcs.iter_mut().filter(|n| n.is_alive()) {
        let speed = npc.npc_type.speed();
        if npc.velocity.is_zero(1e-4) {
            npc.velocity = horizontal_heading(rng) * speed;
        } else if rng.gen::<f32>() < config.heading_change_chance {
            let heading = if rng.gen::<f32>() < config.horizontal_bias {
                horizontal_heading(rng)
            } else {
                Vec2::from_angle(rng.gen_range(0.0..std::f32::consts::TAU))
            };
            npc.velocity = heading * speed;
        }
    }
}

/// Mostly-left or mostly-right unit heading
fn horizontal_heading<R: Rng + ?Sized>(rng: &mut R) -> Vec2 {
    let base = if rng.gen_bool(0.5) { 0.0 } else { std::f32::consts::PI };
    Vec2::from_angle(base + rng.gen_range(-HORIZONTAL_SPREAD..HORIZONTAL_SPREAD))
}
