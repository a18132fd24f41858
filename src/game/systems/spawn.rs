//! Safe-location search shared by NPC, powerup and respawn placement

use rand::Rng;

use crate::game::state::{PlayerId, SessionState};
use crate::util::vec2::Vec2;

/// Placement constraints for one search
#[derive(Debug, Clone, Copy)]
pub struct SpawnQuery {
    /// Radius of the entity being placed; keeps it fully inside the arena
    pub radius: f32,
    /// Minimum distance to every living player
    pub clearance: f32,
    pub attempts: u32,
    /// Player ignored by the clearance check (the one being respawned)
    pub exclude: Option<PlayerId>,
}

/// Try up to `attempts` random positions and return the first one far enough
/// from every living player. `None` means the caller should retry later.
pub fn find_safe_location<R: Rng + ?Sized>(
    rng: &mut R,
    state: &SessionState,
    query: SpawnQuery,
) -> Option<Vec2> {
    let bounds = state.bounds;
    let max_x = (bounds.width - query.radius).max(query.radius);
    let max_y = (bounds.height - query.radius).max(query.radius);
    let clearance_sq = query.clearance * query.clearance;

    for _ in 0..query.attempts {
        let candidate = Vec2::new(
            rng.gen_range(query.radius..=max_x),
            rng.gen_range(query.radius..=max_y),
        );
        let clear = state
            .alive_players()
            .filter(|p| Some(p.id) != query.exclude)
            .all(|p| p.position.distance_sq_to(candidate) >= clearance_sq);
        if clear {
            return Some(candidate);
        }
    }

    None
}

/// Random point within `spread` of `center`, clamped inside the arena
pub fn scatter_around<R: Rng + ?Sized>(
    rng: &mut R,
    state: &SessionState,
    center: Vec2,
    spread: f32,
    radius: f32,
) -> Vec2 {
    let angle = rng.gen_range(0.0..std::f32::consts::TAU);
    let distance = rng.gen_range(0.0..=spread);
    state
        .bounds
        .clamp_circle(center + Vec2::from_angle(angle) * distance, radius)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::state::tests::create_test_state;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn query(clearance: f32) -> SpawnQuery {
        SpawnQuery {
            radius: 12.0,
            clearance,
            attempts: 20,
            exclude: None,
        }
    }

    #[test]
    fn test_location_respects_clearance() {
        let state = create_test_state(4);
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..50 {
            let pos = find_safe_location(&mut rng, &state, query(150.0)).unwrap();
            for p in state.alive_players() {
                assert!(p.position.distance_to(pos) >= 150.0);
            }
            assert!(pos.x >= 12.0 && pos.x <= state.bounds.width - 12.0);
        }
    }

    #[test]
    fn test_exhaustion_returns_none() {
        let state = create_test_state(2);
        let mut rng = StdRng::seed_from_u64(1);
        // Clearance larger than the arena diagonal can never be satisfied
        assert!(find_safe_location(&mut rng, &state, query(10_000.0)).is_none());
    }

    #[test]
    fn test_excluded_player_is_ignored() {
        let mut state = create_test_state(1);
        state.bounds.width = 100.0;
        state.bounds.height = 100.0;
        state.players[0].position = Vec2::new(50.0, 50.0);
        let mut rng = StdRng::seed_from_u64(3);
        let mut q = query(500.0);
        assert!(find_safe_location(&mut rng, &state, q).is_none());
        q.exclude = Some(state.players[0].id);
        assert!(find_safe_location(&mut rng, &state, q).is_some());
    }

    #[test]
    fn test_scatter_stays_in_bounds() {
        let state = create_test_state(1);
        let mut rng = StdRng::seed_from_u64(11);
        for _ in 0..100 {
            let p = scatter_around(&mut rng, &state, Vec2::new(5.0, 5.0), 60.0, 12.0);
            assert!(p.x >= 12.0 && p.y >= 12.0);
            assert!(p.distance_to(Vec2::new(5.0, 5.0)) <= 60.0 + 12.0);
        }
    }
}
