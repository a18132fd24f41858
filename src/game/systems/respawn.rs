use rand::Rng;
use tracing::debug;

use crate::config::PlayerConfig;
use crate::game::events::GameEvent;
use crate::game::rules;
use crate::game::state::{PlayerStatus, SessionState};
use crate::game::systems::spawn::{find_safe_location, SpawnQuery};

/// Respawn every player whose delay has elapsed. Players without a safe spot
/// stay respawning and are retried next tick. Returns the number respawned.
pub fn update<R: Rng + ?Sized>(
    state: &mut SessionState,
    config: &PlayerConfig,
    rng: &mut R,
    now: u64,
) -> usize {
    let due: Vec<_> = state
        .players
        .iter()
        .filter(|p| p.status == PlayerStatus::Respawning && p.respawn_at.is_some_and(|at| now >= at))
        .map(|p| p.id)
        .collect();

    let mut respawned = 0;
    for id in due {
        let query = SpawnQuery {
            radius: rules::radius_for_phase(1),
            clearance: config.spawn_clearance,
            attempts: config.spawn_attempts,
            exclude: Some(id),
        };
        let Some(position) = find_safe_location(rng, state, query) else {
            debug!("No safe respawn spot for {}, deferring", id);
            continue;
        };
        if state.complete_player_respawn(id, position, now, config.grace_period_ms) {
            state.queue_event(GameEvent::PlayerRespawned {
                player_id: id,
                x: position.x,
                y: position.y,
            });
            respawned += 1;
        }
    }
    respawned
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GameConfig;
    use crate::game::state::tests::create_test_state;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_respawn_after_delay() {
        let mut state = create_test_state(2);
        let config = GameConfig::default().player;
        let mut rng = StdRng::seed_from_u64(1);
        let id = state.players[1].id;
        state.set_player_respawning(id, config.respawn_delay_ms, 1000);

        assert_eq!(update(&mut state, &config, &mut rng, 1000 + config.respawn_delay_ms - 1), 0);
        assert_eq!(update(&mut state, &config, &mut rng, 1000 + config.respawn_delay_ms), 1);

        let now = 1000 + config.respawn_delay_ms;
        assert!(state.players[1].is_alive());
        assert!(state.is_player_in_grace(id, now + config.grace_period_ms - 1));
        let other = state.players[0].position;
        assert!(state.players[1].position.distance_to(other) >= config.spawn_clearance);
        assert!(matches!(
            state.drain_events().as_slice(),
            [GameEvent::PlayerRespawned { player_id, .. }] if *player_id == id
        ));
    }

    #[test]
    fn test_exhausted_search_defers() {
        let mut state = create_test_state(2);
        let mut config = GameConfig::default().player;
        config.spawn_clearance = 100_000.0;
        let mut rng = StdRng::seed_from_u64(2);
        let id = state.players[0].id;
        state.set_player_respawning(id, 0, 0);

        assert_eq!(update(&mut state, &config, &mut rng, 10), 0);
        assert_eq!(state.players[0].status, PlayerStatus::Respawning);
        assert_eq!(state.pending_event_count(), 0);

        config.spawn_clearance = 0.0;
        assert_eq!(update(&mut state, &config, &mut rng, 26), 1);
    }
}
