//! Virtual opponents
//!
//! Each bot-controlled player gets a [`BotState`] held outside the session
//! state. Every tick the bot first checks for immediate threats (always
//! honoured), then, at most once per reaction interval, re-evaluates its
//! target and steers toward it over the pathfinding grid. The resulting
//! direction goes through the same input path as a human's.

pub mod pathfinding;
pub mod targeting;
pub mod threat;

use std::fmt;
use std::str::FromStr;

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::game::constants::bot::{
    AXIS_DEAD_ZONE, DIRECTION_COOLDOWN_MS, IGNORE_COOLDOWN_MS, PANIC_BUFFER,
    PLAYER_VALUE_MULTIPLIER, REACTION_MS, RETARGET_INTERVAL_MS, UPGRADE_COOLDOWN_MS,
};
use crate::game::constants::pathfinding::{CELL_SIZE, MAX_EXPANSIONS};
use crate::game::state::{Player, PlayerId, SessionState};
use crate::util::rng::BotRng;
use crate::util::vec2::Vec2;

use self::pathfinding::NavGrid;
use self::targeting::{best_candidate, score_candidates, score_target, ScoringContext, TargetRef};

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum BotDifficulty {
    Easy,
    #[default]
    Medium,
    Hard,
}

impl BotDifficulty {
    fn index(self) -> usize {
        match self {
            BotDifficulty::Easy => 0,
            BotDifficulty::Medium => 1,
            BotDifficulty::Hard => 2,
        }
    }

    /// Minimum time between target evaluations
    pub fn reaction_ms(self) -> u64 {
        REACTION_MS[self.index()]
    }

    pub fn player_value_multiplier(self) -> f32 {
        PLAYER_VALUE_MULTIPLIER[self.index()]
    }

    pub fn direction_cooldown_ms(self) -> u64 {
        DIRECTION_COOLDOWN_MS[self.index()]
    }

    pub fn panic_buffer(self) -> f32 {
        PANIC_BUFFER[self.index()]
    }
}

impl FromStr for BotDifficulty {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "easy" => Ok(BotDifficulty::Easy),
            "medium" => Ok(BotDifficulty::Medium),
            "hard" => Ok(BotDifficulty::Hard),
            other => Err(format!("unknown bot difficulty '{}'", other)),
        }
    }
}

impl fmt::Display for BotDifficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            BotDifficulty::Easy => "easy",
            BotDifficulty::Medium => "medium",
            BotDifficulty::Hard => "hard",
        };
        f.write_str(name)
    }
}

/// Eight discrete headings, each component in {-1, 0, 1}
const DIRECTIONS: [Vec2; 8] = [
    Vec2 { x: 1.0, y: 0.0 },
    Vec2 { x: 1.0, y: 1.0 },
    Vec2 { x: 0.0, y: 1.0 },
    Vec2 { x: -1.0, y: 1.0 },
    Vec2 { x: -1.0, y: 0.0 },
    Vec2 { x: -1.0, y: -1.0 },
    Vec2 { x: 0.0, y: -1.0 },
    Vec2 { x: 1.0, y: -1.0 },
];

/// Why a direction was chosen, mostly for tests and tracing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Intent {
    Escape,
    Seek,
    Flee,
    Wander,
}

/// Decision state for one bot
#[derive(Debug, Clone)]
pub struct BotState {
    pub player_id: PlayerId,
    pub difficulty: BotDifficulty,
    pub target: Option<TargetRef>,
    pub target_score: f32,
    /// When the current target was picked
    pub target_since: u64,
    pub next_decision_at: u64,
    /// Last issued direction, components in {-1, 0, 1}
    pub last_direction: Vec2,
    pub last_direction_at: Option<u64>,
    pub last_intent: Option<Intent>,
    /// Opponent -> ignored until
    pub ignored: FxHashMap<PlayerId, u64>,
    rng: BotRng,
}

impl BotState {
    pub fn new(player_id: PlayerId, difficulty: BotDifficulty) -> Self {
        Self::with_seed(player_id, difficulty, BotRng::seed_from_bytes(player_id.as_bytes()))
    }

    pub fn with_seed(player_id: PlayerId, difficulty: BotDifficulty, seed: u32) -> Self {
        Self {
            player_id,
            difficulty,
            target: None,
            target_score: 0.0,
            target_since: 0,
            next_decision_at: 0,
            last_direction: Vec2::ZERO,
            last_direction_at: None,
            last_intent: None,
            ignored: FxHashMap::default(),
            rng: BotRng::new(seed),
        }
    }

    /// Run one tick of decision making. Returns the direction to apply, or
    /// `None` when the bot keeps its current heading.
    pub fn think(&mut self, state: &SessionState, now: u64) -> Option<Vec2> {
        let bot = state.player(self.player_id)?;
        if !bot.is_alive() {
            self.target = None;
            self.target_score = 0.0;
            return None;
        }

        // Threats override everything, every tick
        let threats = threat::immediate_threats(state, bot, self.difficulty.panic_buffer(), now);
        if !threats.is_empty() {
            let heading = threat::escape_vector(bot, &threats).unwrap_or_else(|| self.random_direction());
            let direction = snap(heading).unwrap_or_else(|| self.random_direction());
            return Some(self.issue(direction, Intent::Escape, true, now));
        }

        if now < self.next_decision_at {
            return None;
        }
        self.next_decision_at = now + self.difficulty.reaction_ms();

        self.evaluate_target(state, bot, now);
        let (direction, intent) = match self.seek_direction(state, bot, now) {
            Some(found) => found,
            None => (self.wander_direction(), Intent::Wander),
        };
        Some(self.issue(direction, intent, false, now))
    }

    /// Pick or keep a target. Switching away from a player target needs its
    /// score collapsing, the upgrade cooldown or the forced retarget interval.
    fn evaluate_target(&mut self, state: &SessionState, bot: &Player, now: u64) {
        self.ignored.retain(|_, until| now < *until);

        let ctx = ScoringContext {
            bot,
            player_value_multiplier: self.difficulty.player_value_multiplier(),
            ignored: &self.ignored,
            now,
        };
        let best = best_candidate(&score_candidates(state, &ctx));
        let current = self
            .target
            .and_then(|t| score_target(state, &ctx, t))
            .filter(|c| c.score > 0.0);

        let keep = match (self.target, current) {
            (Some(target), Some(cur)) if target.is_player() => {
                let held_for = now.saturating_sub(self.target_since);
                let forced = held_for >= RETARGET_INTERVAL_MS;
                let upgrade = held_for >= UPGRADE_COOLDOWN_MS
                    && best.is_some_and(|b| b.target != target && b.score > cur.score);
                if forced || upgrade {
                    None
                } else {
                    Some(cur)
                }
            }
            _ => None,
        };

        if let Some(cur) = keep {
            self.target_score = cur.score;
            return;
        }

        let next = best;
        if let Some(TargetRef::Player(previous)) = self.target {
            if next.map(|c| c.target) != self.target {
                self.ignored.insert(previous, now + IGNORE_COOLDOWN_MS);
                trace!("Bot {} disengaging from {}", self.player_id, previous);
            }
        }

        match next {
            Some(candidate) => {
                if self.target != Some(candidate.target) {
                    self.target_since = now;
                }
                self.target = Some(candidate.target);
                self.target_score = candidate.score;
            }
            None => {
                self.target = None;
                self.target_score = 0.0;
            }
        }
    }

    /// Direction along the hazard-aware path to the current target
    fn seek_direction(&self, state: &SessionState, bot: &Player, now: u64) -> Option<(Vec2, Intent)> {
        let target = self.target?;
        let (goal, outranked) = match target {
            TargetRef::Player(id) => {
                let other = state.player(id)?;
                (other.position, other.xp > bot.xp)
            }
            TargetRef::Npc(id) => (state.npcs.iter().find(|n| n.id == id)?.position, false),
            TargetRef::Powerup(id) => (state.powerups.iter().find(|p| p.id == id)?.position, false),
        };

        let threats: Vec<_> = threat::potential_threats(state, bot, now)
            .into_iter()
            .filter(|t| !matches!((t.source, target), (threat::ThreatSource::Player(a), TargetRef::Player(b)) if a == b))
            .collect();
        let hazards = threat::as_hazards(bot, &threats);
        let grid = NavGrid::build(state.bounds, CELL_SIZE, &hazards);
        let heading = pathfinding::steer(&grid, bot.position, goal, MAX_EXPANSIONS)?;

        if outranked {
            Some((snap(-heading)?, Intent::Flee))
        } else {
            Some((snap(heading)?, Intent::Seek))
        }
    }

    /// Random heading that differs from the last one
    fn wander_direction(&mut self) -> Vec2 {
        let idx = self.rng.next_index(DIRECTIONS.len());
        if DIRECTIONS[idx] != self.last_direction {
            return DIRECTIONS[idx];
        }
        let offset = 1 + self.rng.next_index(DIRECTIONS.len() - 1);
        DIRECTIONS[(idx + offset) % DIRECTIONS.len()]
    }

    fn random_direction(&mut self) -> Vec2 {
        DIRECTIONS[self.rng.next_index(DIRECTIONS.len())]
    }

    /// Debounce direction changes. Returns the direction that should be in
    /// effect, which is the previous one when the cooldown blocks a change.
    fn issue(&mut self, direction: Vec2, intent: Intent, force: bool, now: u64) -> Vec2 {
        if direction == self.last_direction {
            return direction;
        }
        let cooling = self
            .last_direction_at
            .is_some_and(|at| now.saturating_sub(at) < self.difficulty.direction_cooldown_ms());
        if cooling && !force {
            return self.last_direction;
        }
        self.last_direction = direction;
        self.last_direction_at = Some(now);
        self.last_intent = Some(intent);
        direction
    }
}

/// Snap a heading to a discrete axis direction, `None` inside the dead zone
fn snap(heading: Vec2) -> Option<Vec2> {
    let direction = heading.to_axes(AXIS_DEAD_ZONE);
    if direction.is_zero(0.5) {
        None
    } else {
        Some(direction)
    }
}

/// All bots of one session, iterated in registration order
#[derive(Debug, Clone, Default)]
pub struct BotManager {
    bots: Vec<BotState>,
}

impl BotManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_bot(&mut self, player_id: PlayerId, difficulty: BotDifficulty) {
        self.register(BotState::new(player_id, difficulty));
    }

    pub fn register(&mut self, bot: BotState) {
        self.bots.retain(|b| b.player_id != bot.player_id);
        self.bots.push(bot);
    }

    pub fn unregister_bot(&mut self, player_id: PlayerId) {
        self.bots.retain(|b| b.player_id != player_id);
    }

    pub fn get(&self, player_id: PlayerId) -> Option<&BotState> {
        self.bots.iter().find(|b| b.player_id == player_id)
    }

    pub fn get_mut(&mut self, player_id: PlayerId) -> Option<&mut BotState> {
        self.bots.iter_mut().find(|b| b.player_id == player_id)
    }

    pub fn len(&self) -> usize {
        self.bots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bots.is_empty()
    }

    /// Decide for every bot and apply the results as player input
    pub fn update(&mut self, state: &mut SessionState, now: u64) {
        for bot in &mut self.bots {
            if let Some(direction) = bot.think(state, now) {
                state.apply_player_input(bot.player_id, direction, now);
            }
        }
    }
}
