//! Threat detection and escape steering

use smallvec::SmallVec;

use crate::game::bot::pathfinding::Hazard;
use crate::game::rules::can_eat;
use crate::game::state::{EntityId, Player, PlayerId, SessionState};
use crate::util::vec2::Vec2;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThreatSource {
    Player(PlayerId),
    Npc(EntityId),
}

/// Anything that could eat the bot right now
#[derive(Debug, Clone, Copy)]
pub struct Threat {
    pub source: ThreatSource,
    pub position: Vec2,
    pub radius: f32,
    /// Edge-to-edge distance to the bot (negative when overlapping)
    pub gap: f32,
}

/// Every entity able to eat `bot`. A protected bot has no threats.
pub fn potential_threats(state: &SessionState, bot: &Player, now: u64) -> SmallVec<[Threat; 8]> {
    let mut threats = SmallVec::new();
    if !bot.is_alive() || bot.is_protected(now) {
        return threats;
    }

    let gap_to = |position: Vec2, radius: f32| bot.position.distance_to(position) - bot.radius - radius;

    for other in state.alive_players().filter(|p| p.id != bot.id && p.xp > bot.xp) {
        threats.push(Threat {
            source: ThreatSource::Player(other.id),
            position: other.position,
            radius: other.radius,
            gap: gap_to(other.position, other.radius),
        });
    }

    for npc in state.npcs.iter().filter(|n| n.is_alive() && can_eat(n.radius(), bot.radius)) {
        threats.push(Threat {
            source: ThreatSource::Npc(npc.id),
            position: npc.position,
            radius: npc.radius(),
            gap: gap_to(npc.position, npc.radius()),
        });
    }

    threats
}

/// Threats close enough to trigger an escape
pub fn immediate_threats(
    state: &SessionState,
    bot: &Player,
    panic_buffer: f32,
    now: u64,
) -> SmallVec<[Threat; 8]> {
    potential_threats(state, bot, now)
        .into_iter()
        .filter(|t| t.gap <= panic_buffer)
        .collect()
}

/// Weighted repulsion away from every threat. Closer and larger threats pull
/// harder. Returns `None` when the forces cancel out.
pub fn escape_vector(bot: &Player, threats: &[Threat]) -> Option<Vec2> {
    let mut repulsion = Vec2::ZERO;
    for threat in threats {
        let away = bot.position - threat.position;
        let direction = if away.is_zero(1e-4) { Vec2::new(1.0, 0.0) } else { away.normalize() };
        let size_weight = threat.radius / bot.radius.max(1.0);
        let proximity_weight = 1.0 / threat.gap.max(1.0);
        repulsion += direction * (size_weight * proximity_weight);
    }

    let heading = repulsion.normalize();
    if heading.is_zero(1e-6) {
        None
    } else {
        Some(heading)
    }
}

/// Hazard field for pathfinding. The hard radius covers the threat's reach.
pub fn as_hazards(bot: &Player, threats: &[Threat]) -> SmallVec<[Hazard; 8]> {
    threats
        .iter()
        .map(|t| Hazard {
            position: t.position,
            hard_radius: t.radius + bot.radius,
        })
        .collect()
}
