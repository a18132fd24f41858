//! Target scoring
//!
//! Every candidate gets a raw value that depends on its kind, zeroed when the
//! bot cannot eat or collect it, then discounted by squared distance.

use rustc_hash::FxHashMap;

use crate::game::constants::bot::{DISTANCE_SCALE, POWERUP_BASE_VALUE, POWERUP_HELD_FACTOR};
use crate::game::rules::can_eat;
use crate::game::state::{EntityId, NpcType, Player, PlayerId, SessionState};
use crate::util::vec2::Vec2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TargetRef {
    Player(PlayerId),
    Npc(EntityId),
    Powerup(EntityId),
}

impl TargetRef {
    pub fn is_player(&self) -> bool {
        matches!(self, TargetRef::Player(_))
    }
}

#[derive(Debug, Clone, Copy)]
pub struct Candidate {
    pub target: TargetRef,
    pub position: Vec2,
    pub score: f32,
}

/// Inputs that vary per bot
#[derive(Debug, Clone, Copy)]
pub struct ScoringContext<'a> {
    pub bot: &'a Player,
    pub player_value_multiplier: f32,
    pub ignored: &'a FxHashMap<PlayerId, u64>,
    pub now: u64,
}

impl ScoringContext<'_> {
    fn is_ignored(&self, id: PlayerId) -> bool {
        self.ignored.get(&id).is_some_and(|&until| self.now < until)
    }

    fn discount(&self, value: f32, position: Vec2) -> f32 {
        if value <= 0.0 {
            return 0.0;
        }
        let scaled = self.bot.position.distance_to(position) / DISTANCE_SCALE;
        value / (1.0 + scaled * scaled)
    }
}

/// Raw value of an opposing player, before distance
pub fn player_value(ctx: &ScoringContext<'_>, other: &Player) -> f32 {
    let bot = ctx.bot;
    if other.id == bot.id || !other.is_alive() || ctx.is_ignored(other.id) {
        return 0.0;
    }
    // Equal xp can never eat either way. A bigger player in reach still
    // scores so an outranked target can be fled from.
    if other.xp == bot.xp || !can_eat(bot.radius, other.radius) || other.is_protected(ctx.now) {
        return 0.0;
    }
    // Floor at the smallest NPC so a fresh player still registers
    let normalized = (other.xp as f32).max(NpcType::Small.xp() as f32);
    normalized * ctx.player_value_multiplier
}

/// Score one target, `None` when it no longer exists
pub fn score_target(state: &SessionState, ctx: &ScoringContext<'_>, target: TargetRef) -> Option<Candidate> {
    let bot = ctx.bot;
    let (position, value) = match target {
        TargetRef::Player(id) => {
            let other = state.player(id)?;
            (other.position, player_value(ctx, other))
        }
        TargetRef::Npc(id) => {
            let npc = state.npcs.iter().find(|n| n.id == id)?;
            let edible = npc.is_alive() && can_eat(bot.radius, npc.radius());
            (npc.position, if edible { npc.npc_type.xp() as f32 } else { 0.0 })
        }
        TargetRef::Powerup(id) => {
            let powerup = state.powerups.iter().find(|p| p.id == id)?;
            let value = if !powerup.is_available() {
                0.0
            } else if bot.has_powerup(powerup.kind, ctx.now) {
                POWERUP_BASE_VALUE * POWERUP_HELD_FACTOR
            } else {
                POWERUP_BASE_VALUE
            };
            (powerup.position, value)
        }
    };
    Some(Candidate {
        target,
        position,
        score: ctx.discount(value, position),
    })
}

/// Every candidate with a positive score, in stable order: players (join
/// order), then NPCs, then powerups
pub fn score_candidates(state: &SessionState, ctx: &ScoringContext<'_>) -> Vec<Candidate> {
    let players = state.players.iter().map(|p| TargetRef::Player(p.id));
    let npcs = state.npcs.iter().map(|n| TargetRef::Npc(n.id));
    let powerups = state.powerups.iter().map(|p| TargetRef::Powerup(p.id));

    players
        .chain(npcs)
        .chain(powerups)
        .filter_map(|target| score_target(state, ctx, target))
        .filter(|c| c.score > 0.0)
        .collect()
}

/// Highest score wins; earlier candidates win ties
pub fn best_candidate(candidates: &[Candidate]) -> Option<Candidate> {
    candidates.iter().copied().fold(None, |best, c| match best {
        Some(b) if b.score >= c.score => Some(b),
        _ => Some(c),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::state::tests::create_test_state;
    use crate::game::state::{NpcStatus, PowerupStatus, PowerupType};

    fn ctx<'a>(bot: &'a Player, ignored: &'a FxHashMap<PlayerId, u64>) -> ScoringContext<'a> {
        ScoringContext {
            bot,
            player_value_multiplier: 1.0,
            ignored,
            now: 0,
        }
    }

    fn alive_npc(state: &mut SessionState, npc_type: NpcType, at: Vec2) -> EntityId {
        let id = state.add_npc(npc_type, at, Vec2::ZERO, 0);
        state.npcs.iter_mut().find(|n| n.id == id).unwrap().status = NpcStatus::Alive;
        id
    }

    #[test]
    fn test_inedible_npc_scores_zero() {
        let mut state = create_test_state(1);
        let bot_pos = state.players[0].position;
        let large = alive_npc(&mut state, NpcType::Large, bot_pos + Vec2::new(50.0, 0.0));
        let small = alive_npc(&mut state, NpcType::Small, bot_pos + Vec2::new(300.0, 0.0));
        let ignored = FxHashMap::default();
        let bot = state.players[0].clone();

        let candidates = score_candidates(&state, &ctx(&bot, &ignored));
        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].target, TargetRef::Npc(small));
        assert!(score_target(&state, &ctx(&bot, &ignored), TargetRef::Npc(large)).unwrap().score == 0.0);
    }

    #[test]
    fn test_distance_discount() {
        let mut state = create_test_state(1);
        let bot_pos = state.players[0].position;
        let near = alive_npc(&mut state, NpcType::Small, bot_pos + Vec2::new(100.0, 0.0));
        let far = alive_npc(&mut state, NpcType::Small, bot_pos + Vec2::new(300.0, 0.0));
        let ignored = FxHashMap::default();
        let bot = state.players[0].clone();
        let c = ctx(&bot, &ignored);

        let near_score = score_target(&state, &c, TargetRef::Npc(near)).unwrap().score;
        let far_score = score_target(&state, &c, TargetRef::Npc(far)).unwrap().score;
        assert!((near_score - NpcType::Small.xp() as f32 / 2.0).abs() < 1e-3);
        assert!((far_score - NpcType::Small.xp() as f32 / 10.0).abs() < 1e-3);
        assert_eq!(best_candidate(&score_candidates(&state, &c)).unwrap().target, TargetRef::Npc(near));
    }

    #[test]
    fn test_held_powerup_is_discounted() {
        let mut state = create_test_state(1);
        let id = state.players[0].id;
        let pos = state.players[0].position + Vec2::new(100.0, 0.0);
        let pu = state.add_powerup(PowerupType::SpeedBoost, pos, 16.0, 0);
        state.powerups[0].status = PowerupStatus::Available;
        let ignored = FxHashMap::default();

        let bot = state.players[0].clone();
        let fresh = score_target(&state, &ctx(&bot, &ignored), TargetRef::Powerup(pu)).unwrap().score;
        state.grant_powerup(id, PowerupType::SpeedBoost, 0);
        let bot = state.players[0].clone();
        let held = score_target(&state, &ctx(&bot, &ignored), TargetRef::Powerup(pu)).unwrap().score;
        assert!((held - fresh * POWERUP_HELD_FACTOR).abs() < 1e-3);
    }

    #[test]
    fn test_player_value_rules() {
        let mut state = create_test_state(5);
        let ids: Vec<_> = state.players.iter().map(|p| p.id).collect();
        state.update_player_xp(ids[0], 60);
        state.update_player_xp(ids[1], 20);
        state.update_player_xp(ids[2], 100);
        state.update_player_xp(ids[3], 200);
        state.update_player_xp(ids[4], 60);
        let mut ignored = FxHashMap::default();
        let bot = state.players[0].clone();

        assert!((player_value(&ctx(&bot, &ignored), &state.players[1]) - 20.0).abs() < 1e-3);
        // Same radius but more xp still scores
        assert!((player_value(&ctx(&bot, &ignored), &state.players[2]) - 100.0).abs() < 1e-3);
        // Out of radius reach
        assert_eq!(player_value(&ctx(&bot, &ignored), &state.players[3]), 0.0);
        // Equal xp
        assert_eq!(player_value(&ctx(&bot, &ignored), &state.players[4]), 0.0);

        ignored.insert(ids[1], 500);
        assert_eq!(player_value(&ctx(&bot, &ignored), &state.players[1]), 0.0);

        state.players[1].grace_until = Some(100);
        ignored.clear();
        assert_eq!(player_value(&ctx(&bot, &ignored), &state.players[1]), 0.0);
    }

    #[test]
    fn test_missing_target_returns_none() {
        let state = create_test_state(1);
        let ignored = FxHashMap::default();
        let bot = state.players[0].clone();
        assert!(score_target(&state, &ctx(&bot, &ignored), TargetRef::Npc(999)).is_none());
    }
}
