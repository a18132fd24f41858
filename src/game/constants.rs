//! Simulation defaults. `GameConfig` starts from these and may override
//! a subset from the environment.

/// Tick scheduling
pub mod tick {
    /// Simulation tick interval in milliseconds (~60 Hz)
    pub const INTERVAL_MS: u64 = 16;
    /// Full-state broadcast every N ticks (~10 Hz)
    pub const BROADCAST_EVERY: u64 = 6;
    /// Timer-only message every N ticks (~1 Hz)
    pub const TIMER_TICK_EVERY: u64 = 60;
    /// Maximum consecutive catch-up ticks after a stall
    pub const MAX_CATCH_UP: u32 = 5;
}

/// Match timing
pub mod game {
    /// Default match duration
    pub const MATCH_DURATION_MS: u64 = 180_000;
}

/// Arena bounds (origin top-left)
pub mod arena {
    pub const WIDTH: f32 = 2000.0;
    pub const HEIGHT: f32 = 1200.0;
}

/// Player growth and movement
pub mod player {
    /// Base speed in units per second
    pub const BASE_SPEED: f32 = 220.0;
    /// XP needed to enter phases 1, 2, 3
    pub const PHASE_THRESHOLDS: [u32; 3] = [0, 50, 150];
    /// Collision radius per growth phase
    pub const PHASE_RADIUS: [f32; 3] = [20.0, 30.0, 42.0];
    /// Render scale per growth phase
    pub const PHASE_VISUAL_SIZE: [f32; 3] = [1.0, 1.5, 2.1];
    /// Delay between being eaten and reappearing
    pub const RESPAWN_DELAY_MS: u64 = 3000;
    /// Post-respawn window during which the player cannot be eaten
    pub const GRACE_PERIOD_MS: u64 = 2000;
    /// Minimum distance from other living players when placing a respawn
    pub const SPAWN_CLEARANCE: f32 = 180.0;
    /// Random placement attempts before deferring the respawn
    pub const SPAWN_ATTEMPTS: u32 = 20;
}

/// Computer-controlled fish
pub mod npc {
    /// Per-type stats: (xp, radius, visual size, speed)
    pub const SMALL: (u32, f32, f32, f32) = (5, 12.0, 0.6, 70.0);
    pub const MEDIUM: (u32, f32, f32, f32) = (15, 26.0, 1.3, 50.0);
    pub const LARGE: (u32, f32, f32, f32) = (40, 40.0, 2.0, 35.0);

    /// Per-type spawn cadence: (interval ms, cap, swarm size, swarm chance)
    pub const SMALL_SPAWN: (u64, usize, usize, f32) = (1500, 24, 5, 0.3);
    pub const MEDIUM_SPAWN: (u64, usize, usize, f32) = (4000, 8, 3, 0.15);
    pub const LARGE_SPAWN: (u64, usize, usize, f32) = (9000, 3, 1, 0.0);

    pub const SPAWN_CLEARANCE: f32 = 150.0;
    pub const SPAWN_ATTEMPTS: u32 = 10;
    /// Max distance of a swarm member from the swarm center
    pub const SWARM_SPREAD: f32 = 60.0;
    /// Spawn animation before an NPC becomes edible
    pub const SPAWNING_MS: u64 = 300;
    /// Age after which an NPC starts despawning
    pub const LIFETIME_MS: u64 = 60_000;
    /// Time an NPC stays in the despawning state before removal
    pub const DESPAWN_GRACE_MS: u64 = 500;
    /// Per-tick probability of a heading change
    pub const HEADING_CHANGE_CHANCE: f32 = 0.02;
    /// Fraction of heading changes that stay mostly horizontal
    pub const HORIZONTAL_BIAS: f32 = 0.7;
}

/// Powerups
pub mod powerup {
    pub const SPAWN_INTERVAL_MS: u64 = 8000;
    pub const MAX_ACTIVE: usize = 3;
    pub const RADIUS: f32 = 16.0;
    pub const SPAWNING_MS: u64 = 300;
    pub const LIFETIME_MS: u64 = 10_000;
    pub const DESPAWN_GRACE_MS: u64 = 1000;
    pub const SPAWN_CLEARANCE: f32 = 120.0;
    pub const SPAWN_ATTEMPTS: u32 = 10;

    pub const INVINCIBILITY_MS: u64 = 5000;
    pub const SPEED_BOOST_MS: u64 = 6000;
    pub const DOUBLE_XP_MS: u64 = 8000;
    /// Speed multiplier while speed boost is active
    pub const SPEED_MULTIPLIER: f32 = 1.6;
}

/// Bot decision making
pub mod bot {
    /// Per difficulty (easy, medium, hard)
    pub const REACTION_MS: [u64; 3] = [600, 350, 200];
    pub const PLAYER_VALUE_MULTIPLIER: [f32; 3] = [0.6, 1.0, 1.4];
    pub const DIRECTION_COOLDOWN_MS: [u64; 3] = [250, 150, 80];
    pub const PANIC_BUFFER: [f32; 3] = [40.0, 60.0, 90.0];

    /// Minimum time on a player target before upgrading to a better one
    pub const UPGRADE_COOLDOWN_MS: u64 = 1500;
    /// Forced re-evaluation of a player target
    pub const RETARGET_INTERVAL_MS: u64 = 5000;
    /// How long a disengaged opponent is ignored
    pub const IGNORE_COOLDOWN_MS: u64 = 3000;
    /// Value of an uncollected powerup
    pub const POWERUP_BASE_VALUE: f32 = 25.0;
    /// Discount when the bot already holds that powerup type
    pub const POWERUP_HELD_FACTOR: f32 = 0.4;
    /// Distance scale for the inverse-square discount
    pub const DISTANCE_SCALE: f32 = 100.0;
    /// Dead zone when snapping steering vectors to axis directions
    pub const AXIS_DEAD_ZONE: f32 = 0.38;
}

/// Coarse pathfinding grid
pub mod pathfinding {
    pub const CELL_SIZE: f32 = 50.0;
    pub const MAX_EXPANSIONS: usize = 600;
    /// Influence radius as a multiple of the hazard's hard radius
    pub const INFLUENCE_FACTOR: f32 = 2.5;
    /// Extra cost at the edge of a hard radius (scaled down linearly outward)
    pub const HAZARD_COST: u32 = 60;
    pub const STRAIGHT_COST: u32 = 10;
    pub const DIAGONAL_COST: u32 = 14;
}
