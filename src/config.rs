use std::str::FromStr;

use crate::game::bot::BotDifficulty;
use crate::game::constants::{arena, game, npc, player, powerup, tick};
use crate::game::state::NpcType;

/// Simulation configuration shared by every session in the process
#[derive(Debug, Clone)]
pub struct GameConfig {
    pub timing: TimingConfig,
    pub arena: ArenaConfig,
    pub player: PlayerConfig,
    pub npc: NpcConfig,
    pub powerup: PowerupConfig,
    pub bot: BotConfig,
}

/// Tick cadence and match length
#[derive(Debug, Clone)]
pub struct TimingConfig {
    pub tick_interval_ms: u64,
    /// Full snapshot every N ticks
    pub broadcast_every: u64,
    /// Timer-only message every N ticks
    pub timer_tick_every: u64,
    pub max_catch_up: u32,
    pub match_duration_ms: u64,
}

#[derive(Debug, Clone)]
pub struct ArenaConfig {
    pub width: f32,
    pub height: f32,
}

#[derive(Debug, Clone)]
pub struct PlayerConfig {
    pub base_speed: f32,
    pub respawn_delay_ms: u64,
    pub grace_period_ms: u64,
    pub spawn_clearance: f32,
    pub spawn_attempts: u32,
}

/// Spawn cadence for one NPC type
#[derive(Debug, Clone)]
pub struct NpcSpawnConfig {
    pub interval_ms: u64,
    pub cap: usize,
    pub swarm_size: usize,
    pub swarm_chance: f32,
}

impl NpcSpawnConfig {
    fn from_tuple((interval_ms, cap, swarm_size, swarm_chance): (u64, usize, usize, f32)) -> Self {
        Self {
            interval_ms,
            cap,
            swarm_size,
            swarm_chance,
        }
    }
}

#[derive(Debug, Clone)]
pub struct NpcConfig {
    pub small: NpcSpawnConfig,
    pub medium: NpcSpawnConfig,
    pub large: NpcSpawnConfig,
    pub spawn_clearance: f32,
    pub spawn_attempts: u32,
    pub swarm_spread: f32,
    pub spawning_ms: u64,
    pub lifetime_ms: u64,
    pub despawn_grace_ms: u64,
    pub heading_change_chance: f32,
    pub horizontal_bias: f32,
}

impl NpcConfig {
    pub fn spawn(&self, npc_type: NpcType) -> &NpcSpawnConfig {
        match npc_type {
            NpcType::Small => &self.small,
            NpcType::Medium => &self.medium,
            NpcType::Large => &self.large,
        }
    }
}

#[derive(Debug, Clone)]
pub struct PowerupConfig {
    pub spawn_interval_ms: u64,
    pub max_active: usize,
    pub radius: f32,
    pub spawning_ms: u64,
    pub lifetime_ms: u64,
    pub despawn_grace_ms: u64,
    pub spawn_clearance: f32,
    pub spawn_attempts: u32,
    pub speed_multiplier: f32,
}

#[derive(Debug, Clone)]
pub struct BotConfig {
    pub difficulty: BotDifficulty,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            timing: TimingConfig {
                tick_interval_ms: tick::INTERVAL_MS,
                broadcast_every: tick::BROADCAST_EVERY,
                timer_tick_every: tick::TIMER_TICK_EVERY,
                max_catch_up: tick::MAX_CATCH_UP,
                match_duration_ms: game::MATCH_DURATION_MS,
            },
            arena: ArenaConfig {
                width: arena::WIDTH,
                height: arena::HEIGHT,
            },
            player: PlayerConfig {
                base_speed: player::BASE_SPEED,
                respawn_delay_ms: player::RESPAWN_DELAY_MS,
                grace_period_ms: player::GRACE_PERIOD_MS,
                spawn_clearance: player::SPAWN_CLEARANCE,
                spawn_attempts: player::SPAWN_ATTEMPTS,
            },
            npc: NpcConfig {
                small: NpcSpawnConfig::from_tuple(npc::SMALL_SPAWN),
                medium: NpcSpawnConfig::from_tuple(npc::MEDIUM_SPAWN),
                large: NpcSpawnConfig::from_tuple(npc::LARGE_SPAWN),
                spawn_clearance: npc::SPAWN_CLEARANCE,
                spawn_attempts: npc::SPAWN_ATTEMPTS,
                swarm_spread: npc::SWARM_SPREAD,
                spawning_ms: npc::SPAWNING_MS,
                lifetime_ms: npc::LIFETIME_MS,
                despawn_grace_ms: npc::DESPAWN_GRACE_MS,
                heading_change_chance: npc::HEADING_CHANGE_CHANCE,
                horizontal_bias: npc::HORIZONTAL_BIAS,
            },
            powerup: PowerupConfig {
                spawn_interval_ms: powerup::SPAWN_INTERVAL_MS,
                max_active: powerup::MAX_ACTIVE,
                radius: powerup::RADIUS,
                spawning_ms: powerup::SPAWNING_MS,
                lifetime_ms: powerup::LIFETIME_MS,
                despawn_grace_ms: powerup::DESPAWN_GRACE_MS,
                spawn_clearance: powerup::SPAWN_CLEARANCE,
                spawn_attempts: powerup::SPAWN_ATTEMPTS,
                speed_multiplier: powerup::SPEED_MULTIPLIER,
            },
            bot: BotConfig {
                difficulty: BotDifficulty::Medium,
            },
        }
    }
}

/// Parse an environment variable, keeping `current` when unset or invalid
fn env_override<T: FromStr>(name: &str, current: T, valid: impl Fn(&T) -> bool) -> T {
    match std::env::var(name) {
        Ok(raw) => match raw.parse::<T>() {
            Ok(parsed) if valid(&parsed) => parsed,
            Ok(_) => {
                tracing::warn!("{} out of range ('{}'), using default", name, raw);
                current
            }
            Err(_) => {
                tracing::warn!("Invalid {} '{}', using default", name, raw);
                current
            }
        },
        Err(_) => current,
    }
}

impl GameConfig {
    /// Load config from environment or use defaults
    pub fn load_or_default() -> Self {
        let mut config = Self::default();

        config.timing.tick_interval_ms =
            env_override("TICK_INTERVAL_MS", config.timing.tick_interval_ms, |v| *v > 0 && *v <= 1000);
        config.timing.match_duration_ms =
            env_override("MATCH_DURATION_MS", config.timing.match_duration_ms, |v| *v > 0);
        config.timing.broadcast_every =
            env_override("BROADCAST_EVERY_TICKS", config.timing.broadcast_every, |v| *v > 0);
        config.timing.timer_tick_every =
            env_override("TIMER_TICK_EVERY_TICKS", config.timing.timer_tick_every, |v| *v > 0);
        config.timing.max_catch_up =
            env_override("MAX_CATCH_UP_TICKS", config.timing.max_catch_up, |v| *v > 0 && *v <= 100);
        config.arena.width = env_override("ARENA_WIDTH", config.arena.width, |v| *v >= 200.0);
        config.arena.height = env_override("ARENA_HEIGHT", config.arena.height, |v| *v >= 200.0);
        config.bot.difficulty = env_override("BOT_DIFFICULTY", config.bot.difficulty, |_| true);

        config
    }

    /// Validate configuration after loading
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.timing.tick_interval_ms == 0 {
            return Err(ConfigError::Invalid("tick_interval_ms must be at least 1"));
        }
        if self.timing.broadcast_every == 0 || self.timing.timer_tick_every == 0 {
            return Err(ConfigError::Invalid("decimation factors must be at least 1"));
        }
        if self.timing.max_catch_up == 0 {
            return Err(ConfigError::Invalid("max_catch_up must be at least 1"));
        }
        let largest_radius = player::PHASE_RADIUS[2].max(npc::LARGE.1);
        if self.arena.width <= largest_radius * 2.0 || self.arena.height <= largest_radius * 2.0 {
            return Err(ConfigError::Invalid("arena is smaller than the largest entity"));
        }
        if self.powerup.speed_multiplier <= 0.0 {
            return Err(ConfigError::Invalid("powerup.speed_multiplier must be positive"));
        }
        if self.powerup.max_active == 0 {
            return Err(ConfigError::Invalid("powerup.max_active must be at least 1"));
        }
        for spawn in [&self.npc.small, &self.npc.medium, &self.npc.large] {
            if spawn.interval_ms == 0 || spawn.swarm_size == 0 {
                return Err(ConfigError::Invalid("npc spawn interval and swarm size must be positive"));
            }
            if !(0.0..=1.0).contains(&spawn.swarm_chance) {
                return Err(ConfigError::Invalid("npc swarm chance must be within 0..=1"));
            }
        }
        Ok(())
    }

    /// Tick length in seconds
    pub fn dt(&self) -> f32 {
        self.timing.tick_interval_ms as f32 / 1000.0
    }
}

/// Configuration errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid configuration: {0}")]
    Invalid(&'static str),
}

/// Demo / process-level settings that do not affect the simulation
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub bot_count: usize,
    pub metrics_port: u16,
}

impl ServerConfig {
    pub fn load_or_default() -> Self {
        Self {
            bot_count: env_override("BOT_COUNT", 5usize, |v| *v <= 64),
            metrics_port: env_override("METRICS_PORT", 9090u16, |v| *v > 0),
        }
    }
}
