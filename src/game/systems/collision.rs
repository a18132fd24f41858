//! Collision and eating resolution
//!
//! Five passes run in a fixed order every tick:
//! 1. boundary clamp (NPCs bounce, players only clamp)
//! 2. player eats NPC
//! 3. player eats player
//! 4. NPC eats player
//! 5. powerup pickup
//!
//! Players are always visited in join order. Each eaten entity is recorded in
//! a per-tick resolved set so it is removed or respawned at most once.

use hashbrown::HashSet;

use crate::game::events::GameEvent;
use crate::game::rules::{can_eat, circles_overlap};
use crate::game::state::{EntityId, PlayerId, PowerupStatus, PowerupType, SessionState};

/// Ids already resolved during the current tick
#[derive(Debug, Default)]
pub struct Resolved {
    pub npcs: HashSet<EntityId>,
    pub players: HashSet<PlayerId>,
}

/// Run all passes and queue the resulting events. Returns how many events were
/// produced.
pub fn update(state: &mut SessionState, respawn_delay_ms: u64, now: u64) -> usize {
    let mut resolved = Resolved::default();
    let mut events = Vec::new();

    clamp_to_bounds(state);
    events.extend(players_eat_npcs(state, &mut resolved, now));
    events.extend(players_eat_players(state, &mut resolved, respawn_delay_ms, now));
    events.extend(npcs_eat_players(state, &mut resolved, respawn_delay_ms, now));
    events.extend(collect_powerups(state, now));

    let count = events.len();
    state.queue_events(events);
    count
}

/// Pass 1: keep every circle inside the arena
pub fn clamp_to_bounds(state: &mut SessionState) {
    let bounds = state.bounds;

    for player in state.players.iter_mut().filter(|p| p.is_alive()) {
        player.position = bounds.clamp_circle(player.position, player.radius);
    }

    for npc in &mut state.npcs {
        let radius = npc.radius();
        let clamped = bounds.clamp_circle(npc.position, radius);
        if clamped.x != npc.position.x {
            // Reflect only when heading further out
            if (npc.position.x < radius && npc.velocity.x < 0.0)
                || (npc.position.x > bounds.width - radius && npc.velocity.x > 0.0)
            {
                npc.velocity.x = -npc.velocity.x;
            }
        }
        if clamped.y != npc.position.y {
            if (npc.position.y < radius && npc.velocity.y < 0.0)
                || (npc.position.y > bounds.height - radius && npc.velocity.y > 0.0)
            {
                npc.velocity.y = -npc.velocity.y;
            }
        }
        npc.position = clamped;
    }
}

/// Pass 2
pub fn players_eat_npcs(state: &mut SessionState, resolved: &mut Resolved, now: u64) -> Vec<GameEvent> {
    let mut events = Vec::new();

    for player in state.players.iter_mut() {
        if !player.is_alive() || player.in_grace(now) {
            continue;
        }
        for npc in state.npcs.iter().filter(|n| n.is_alive()) {
            if resolved.npcs.contains(&npc.id) {
                continue;
            }
            if !can_eat(player.radius, npc.radius())
                || !circles_overlap(player.position, player.radius, npc.position, npc.radius())
            {
                continue;
            }

            let multiplier = if player.has_powerup(PowerupType::DoubleXp, now) { 2 } else { 1 };
            let xp_gained = npc.npc_type.xp() * multiplier;
            player.set_xp(player.xp.saturating_add(xp_gained));
            player.npcs_eaten += 1;
            resolved.npcs.insert(npc.id);
            events.push(GameEvent::NpcEaten {
                player_id: player.id,
                npc_id: npc.id,
                npc_type: npc.npc_type,
                xp_gained,
            });
        }
    }

    if !resolved.npcs.is_empty() {
        state.npcs.retain(|n| !resolved.npcs.contains(&n.id));
    }
    events
}

/// Pass 3: the higher-xp player of an overlapping pair eats the other
pub fn players_eat_players(
    state: &mut SessionState,
    resolved: &mut Resolved,
    respawn_delay_ms: u64,
    now: u64,
) -> Vec<GameEvent> {
    let mut events = Vec::new();
    let count = state.players.len();

    for i in 0..count {
        for j in (i + 1)..count {
            let (a, b) = (&state.players[i], &state.players[j]);
            if !a.is_alive() || !b.is_alive() || a.xp == b.xp {
                continue;
            }
            if resolved.players.contains(&a.id) || resolved.players.contains(&b.id) {
                continue;
            }
            if !circles_overlap(a.position, a.radius, b.position, b.radius) {
                continue;
            }

            let (eater_idx, victim_idx) = if a.xp > b.xp { (i, j) } else { (j, i) };
            let victim = &state.players[victim_idx];
            if victim.is_protected(now) {
                continue;
            }

            let victim_id = victim.id;
            let xp_gained = victim.xp;
            let eater = &mut state.players[eater_idx];
            eater.set_xp(eater.xp.saturating_add(xp_gained));
            eater.players_eaten += 1;
            let eater_id = eater.id;

            state.set_player_respawning(victim_id, respawn_delay_ms, now);
            resolved.players.insert(victim_id);
            events.push(GameEvent::PlayerEaten {
                eater_id,
                victim_id,
                xp_gained,
            });
        }
    }

    events
}

/// Pass 4: NPCs at least as large as a player send it to respawn
pub fn npcs_eat_players(
    state: &mut SessionState,
    resolved: &mut Resolved,
    respawn_delay_ms: u64,
    now: u64,
) -> Vec<GameEvent> {
    let mut victims = Vec::new();

    for player in state.players.iter() {
        if !player.is_alive() || resolved.players.contains(&player.id) || player.is_protected(now) {
            continue;
        }
        let eater = state.npcs.iter().filter(|n| n.is_alive()).find(|npc| {
            can_eat(npc.radius(), player.radius)
                && circles_overlap(npc.position, npc.radius(), player.position, player.radius)
        });
        if let Some(npc) = eater {
            victims.push((npc.id, player.id, player.xp));
        }
    }

    victims
        .into_iter()
        .map(|(npc_id, victim_id, xp_lost)| {
            state.set_player_respawning(victim_id, respawn_delay_ms, now);
            resolved.players.insert(victim_id);
            GameEvent::PlayerKilledByNpc {
                npc_id,
                victim_id,
                xp_lost,
            }
        })
        .collect()
}

/// Pass 5
pub fn collect_powerups(state: &mut SessionState, now: u64) -> Vec<GameEvent> {
    let mut pickups = Vec::new();

    for player in state.players.iter().filter(|p| p.is_alive()) {
        for powerup in state.powerups.iter_mut() {
            if !powerup.is_available() {
                continue;
            }
            if circles_overlap(player.position, player.radius, powerup.position, powerup.radius) {
                powerup.status = PowerupStatus::Collected;
                powerup.status_since = now;
                pickups.push((player.id, powerup.id, powerup.kind));
                // One pickup per player per tick
                break;
            }
        }
    }

    pickups
        .into_iter()
        .filter_map(|(player_id, powerup_id, powerup_type)| {
            let expires_at = state.grant_powerup(player_id, powerup_type, now)?;
            Some(GameEvent::PowerupCollected {
                player_id,
                powerup_id,
                powerup_type,
                expires_at,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::constants::player::RESPAWN_DELAY_MS;
    use crate::game::state::tests::create_test_state;
    use crate::game::state::{NpcStatus, NpcType, PlayerStatus};
    use crate::util::vec2::Vec2;

    fn place(state: &mut SessionState, idx: usize, x: f32, y: f32) {
        state.players[idx].position = Vec2::new(x, y);
    }

    fn add_alive_npc(state: &mut SessionState, npc_type: NpcType, x: f32, y: f32) -> EntityId {
        let id = state.add_npc(npc_type, Vec2::new(x, y), Vec2::ZERO, 0);
        if let Some(npc) = state.npcs.iter_mut().find(|n| n.id == id) {
            npc.status = NpcStatus::Alive;
        }
        id
    }

    #[test]
    fn test_boundary_bounces_npc_and_clamps_player() {
        let mut state = create_test_state(1);
        place(&mut state, 0, -50.0, 100.0);
        state.players[0].velocity = Vec2::new(-100.0, 0.0);
        let width = state.bounds.width;
        let id = add_alive_npc(&mut state, NpcType::Small, width + 5.0, 100.0);
        state.npcs[0].velocity = Vec2::new(30.0, 10.0);

        clamp_to_bounds(&mut state);

        assert_eq!(state.players[0].position.x, state.players[0].radius);
        assert_eq!(state.players[0].velocity, Vec2::new(-100.0, 0.0));
        let npc = state.npcs.iter().find(|n| n.id == id).unwrap();
        assert_eq!(npc.position.x, state.bounds.width - npc.radius());
        assert_eq!(npc.velocity, Vec2::new(-30.0, 10.0));
    }

    #[test]
    fn test_player_eats_small_npc() {
        let mut state = create_test_state(1);
        place(&mut state, 0, 300.0, 300.0);
        add_alive_npc(&mut state, NpcType::Small, 310.0, 300.0);

        let produced = update(&mut state, RESPAWN_DELAY_MS, 0);

        assert_eq!(produced, 1);
        assert!(state.npcs.is_empty());
        assert_eq!(state.players[0].xp, NpcType::Small.xp());
        assert_eq!(state.players[0].npcs_eaten, 1);
    }

    #[test]
    fn test_double_xp_doubles_npc_value() {
        let mut state = create_test_state(1);
        let id = state.players[0].id;
        place(&mut state, 0, 300.0, 300.0);
        state.grant_powerup(id, PowerupType::DoubleXp, 0);
        add_alive_npc(&mut state, NpcType::Small, 300.0, 300.0);

        update(&mut state, RESPAWN_DELAY_MS, 10);
        assert_eq!(state.players[0].xp, NpcType::Small.xp() * 2);
    }

    #[test]
    fn test_player_in_grace_cannot_eat() {
        let mut state = create_test_state(1);
        place(&mut state, 0, 300.0, 300.0);
        state.players[0].grace_until = Some(1000);
        add_alive_npc(&mut state, NpcType::Small, 300.0, 300.0);

        update(&mut state, RESPAWN_DELAY_MS, 500);
        assert_eq!(state.npcs.len(), 1);
        assert_eq!(state.players[0].xp, 0);
    }

    #[test]
    fn test_spawning_npc_is_not_edible() {
        let mut state = create_test_state(1);
        place(&mut state, 0, 300.0, 300.0);
        state.add_npc(NpcType::Small, Vec2::new(300.0, 300.0), Vec2::ZERO, 0);

        update(&mut state, RESPAWN_DELAY_MS, 0);
        assert_eq!(state.npcs.len(), 1);
    }

    #[test]
    fn test_contested_npc_goes_to_first_joined() {
        let mut state = create_test_state(2);
        place(&mut state, 0, 300.0, 300.0);
        place(&mut state, 1, 320.0, 300.0);
        add_alive_npc(&mut state, NpcType::Small, 310.0, 300.0);

        players_eat_npcs(&mut state, &mut Resolved::default(), 0);
        assert_eq!(state.players[0].xp, NpcType::Small.xp());
        assert_eq!(state.players[1].xp, 0);
    }

    #[test]
    fn test_higher_xp_player_eats_lower() {
        let mut state = create_test_state(2);
        let (a, b) = (state.players[0].id, state.players[1].id);
        state.update_player_xp(a, 30);
        state.update_player_xp(b, 10);
        place(&mut state, 0, 500.0, 500.0);
        place(&mut state, 1, 510.0, 500.0);

        update(&mut state, RESPAWN_DELAY_MS, 1000);

        assert_eq!(state.players[0].xp, 40);
        assert_eq!(state.players[1].xp, 0);
        assert_eq!(state.players[1].status, PlayerStatus::Respawning);
        assert_eq!(state.players[1].respawn_at, Some(1000 + RESPAWN_DELAY_MS));
        let events = state.drain_events();
        assert_eq!(
            events,
            vec![GameEvent::PlayerEaten {
                eater_id: a,
                victim_id: b,
                xp_gained: 10
            }]
        );
    }

    #[test]
    fn test_equal_xp_is_noop() {
        let mut state = create_test_state(2);
        place(&mut state, 0, 500.0, 500.0);
        place(&mut state, 1, 505.0, 500.0);
        assert_eq!(update(&mut state, RESPAWN_DELAY_MS, 0), 0);
        assert!(state.players.iter().all(|p| p.is_alive()));
    }

    #[test]
    fn test_protected_victims_survive_every_pass() {
        for protection in ["grace", "invincible"] {
            let mut state = create_test_state(2);
            let (a, b) = (state.players[0].id, state.players[1].id);
            state.update_player_xp(a, 100);
            state.update_player_xp(b, 10);
            match protection {
                "grace" => state.players[1].grace_until = Some(5000),
                _ => {
                    state.grant_powerup(b, PowerupType::Invincibility, 0);
                }
            }
            place(&mut state, 0, 500.0, 500.0);
            place(&mut state, 1, 505.0, 500.0);
            add_alive_npc(&mut state, NpcType::Large, 505.0, 505.0);

            update(&mut state, RESPAWN_DELAY_MS, 100);

            assert!(state.players[1].is_alive(), "{} player was eaten", protection);
            assert_eq!(state.players[1].xp, 10);
        }
    }

    #[test]
    fn test_victim_eaten_once_with_multiple_eaters() {
        let mut state = create_test_state(3);
        let ids: Vec<_> = state.players.iter().map(|p| p.id).collect();
        state.update_player_xp(ids[0], 60);
        state.update_player_xp(ids[1], 80);
        state.update_player_xp(ids[2], 20);
        // Both big players overlap the victim but not each other
        place(&mut state, 0, 560.0, 500.0);
        place(&mut state, 1, 640.0, 500.0);
        place(&mut state, 2, 600.0, 500.0);

        update(&mut state, RESPAWN_DELAY_MS, 0);

        let events = state.drain_events();
        let victim_events = events
            .iter()
            .filter(|e| match e {
                GameEvent::PlayerEaten { victim_id, .. } => *victim_id == ids[2],
                GameEvent::PlayerKilledByNpc { victim_id, .. } => *victim_id == ids[2],
                _ => false,
            })
            .count();
        assert_eq!(victim_events, 1);
        assert_eq!(state.players[2].deaths, 1);
        // First eligible pair in join order wins
        assert_eq!(state.players[0].xp, 80);
        assert_eq!(state.players[1].xp, 80);
    }

    #[test]
    fn test_large_npc_eats_small_player() {
        let mut state = create_test_state(1);
        let id = state.players[0].id;
        state.update_player_xp(id, 20);
        place(&mut state, 0, 400.0, 400.0);
        let npc_id = add_alive_npc(&mut state, NpcType::Large, 420.0, 400.0);

        update(&mut state, RESPAWN_DELAY_MS, 0);

        assert_eq!(state.players[0].status, PlayerStatus::Respawning);
        assert_eq!(state.players[0].xp, 0);
        assert_eq!(state.npcs.len(), 1);
        assert_eq!(
            state.drain_events(),
            vec![GameEvent::PlayerKilledByNpc {
                npc_id,
                victim_id: id,
                xp_lost: 20
            }]
        );
    }

    #[test]
    fn test_grown_player_eats_large_npc() {
        let mut state = create_test_state(1);
        let id = state.players[0].id;
        state.update_player_xp(id, 150);
        place(&mut state, 0, 400.0, 400.0);
        add_alive_npc(&mut state, NpcType::Large, 420.0, 400.0);

        update(&mut state, RESPAWN_DELAY_MS, 0);
        assert!(state.players[0].is_alive());
        assert!(state.npcs.is_empty());
        assert_eq!(state.players[0].xp, 150 + NpcType::Large.xp());
    }

    #[test]
    fn test_player_eaten_victim_skipped_by_npc_pass() {
        let mut state = create_test_state(2);
        let ids: Vec<_> = state.players.iter().map(|p| p.id).collect();
        state.update_player_xp(ids[0], 60);
        state.update_player_xp(ids[1], 10);
        place(&mut state, 0, 560.0, 500.0);
        place(&mut state, 1, 600.0, 500.0);
        // Large enough to eat the victim, out of reach of the eater
        add_alive_npc(&mut state, NpcType::Large, 650.0, 500.0);

        update(&mut state, RESPAWN_DELAY_MS, 0);

        let events = state.drain_events();
        assert_eq!(events.len(), 1);
        assert!(matches!(
            events[0],
            GameEvent::PlayerEaten { eater_id, victim_id, xp_gained: 10 } if eater_id == ids[0] && victim_id == ids[1]
        ));
        assert_eq!(state.players[1].deaths, 1);
        assert_eq!(state.players[0].xp, 70);
        assert_eq!(state.npcs.len(), 1);
    }

    #[test]
    fn test_powerup_pickup_replaces_active() {
        let mut state = create_test_state(1);
        let id = state.players[0].id;
        place(&mut state, 0, 200.0, 200.0);
        state.grant_powerup(id, PowerupType::Invincibility, 0);
        state.add_powerup(PowerupType::SpeedBoost, Vec2::new(205.0, 200.0), 16.0, 0);
        state.powerups[0].status = PowerupStatus::Available;

        update(&mut state, RESPAWN_DELAY_MS, 500);

        let active = state.players[0].active_powerup.unwrap();
        assert_eq!(active.kind, PowerupType::SpeedBoost);
        assert_eq!(active.expires_at, 500 + PowerupType::SpeedBoost.duration_ms());
        assert_eq!(state.powerups[0].status, PowerupStatus::Collected);
    }

    #[test]
    fn test_powerup_collected_once() {
        let mut state = create_test_state(2);
        place(&mut state, 0, 200.0, 200.0);
        place(&mut state, 1, 210.0, 200.0);
        state.add_powerup(PowerupType::DoubleXp, Vec2::new(205.0, 200.0), 16.0, 0);
        state.powerups[0].status = PowerupStatus::Available;

        let events = collect_powerups(&mut state, 0);
        assert_eq!(events.len(), 1);
        assert!(state.players[0].active_powerup.is_some());
        assert!(state.players[1].active_powerup.is_none());
    }

    #[test]
    fn test_one_powerup_per_player_per_tick() {
        let mut state = create_test_state(1);
        place(&mut state, 0, 200.0, 200.0);
        state.add_powerup(PowerupType::DoubleXp, Vec2::new(195.0, 200.0), 16.0, 0);
        state.add_powerup(PowerupType::SpeedBoost, Vec2::new(205.0, 200.0), 16.0, 0);
        for powerup in &mut state.powerups {
            powerup.status = PowerupStatus::Available;
        }

        let events = collect_powerups(&mut state, 0);
        assert_eq!(events.len(), 1);
        assert_eq!(state.players[0].active_powerup.unwrap().kind, PowerupType::DoubleXp);
        assert_eq!(state.powerups[1].status, PowerupStatus::Available);

        let events = collect_powerups(&mut state, 16);
        assert_eq!(events.len(), 1);
        assert_eq!(state.players[0].active_powerup.unwrap().kind, PowerupType::SpeedBoost);
    }
}
