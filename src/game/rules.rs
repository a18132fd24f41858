//! Geometry and eating rules
//!
//! Stateless predicates shared by the collision pipeline and the bots.

use crate::game::constants::player;
use crate::util::vec2::Vec2;

/// True when two circles intersect or touch
#[inline]
pub fn circles_overlap(a: Vec2, a_radius: f32, b: Vec2, b_radius: f32) -> bool {
    let reach = a_radius + b_radius;
    a.distance_sq_to(b) <= reach * reach
}

/// An eater can swallow anything no larger than itself
#[inline]
pub fn can_eat(eater_radius: f32, prey_radius: f32) -> bool {
    eater_radius >= prey_radius
}

/// Grace lasts while `now` is strictly before the recorded end
#[inline]
pub fn in_grace(grace_until: Option<u64>, now: u64) -> bool {
    matches!(grace_until, Some(end) if now < end)
}

/// Growth phase (1..=3) for an xp total
pub fn growth_phase_for_xp(xp: u32) -> u8 {
    player::PHASE_THRESHOLDS
        .iter()
        .rposition(|&threshold| xp >= threshold)
        .map_or(1, |idx| idx as u8 + 1)
}

/// Collision radius for a growth phase
pub fn radius_for_phase(phase: u8) -> f32 {
    player::PHASE_RADIUS[phase_index(phase)]
}

/// Render scale for a growth phase
pub fn visual_size_for_phase(phase: u8) -> f32 {
    player::PHASE_VISUAL_SIZE[phase_index(phase)]
}

fn phase_index(phase: u8) -> usize {
    (phase.clamp(1, 3) - 1) as usize
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_circles_overlap() {
        let a = Vec2::new(0.0, 0.0);
        assert!(circles_overlap(a, 10.0, Vec2::new(15.0, 0.0), 5.0));
        assert!(circles_overlap(a, 10.0, Vec2::new(14.0, 0.0), 5.0));
        assert!(!circles_overlap(a, 10.0, Vec2::new(16.0, 0.0), 5.0));
    }

    #[test]
    fn test_can_eat_equal_radius() {
        assert!(can_eat(20.0, 20.0));
        assert!(can_eat(30.0, 12.0));
        assert!(!can_eat(20.0, 26.0));
    }

    #[test]
    fn test_in_grace() {
        assert!(!in_grace(None, 100));
        assert!(in_grace(Some(200), 100));
        assert!(!in_grace(Some(200), 200));
        assert!(!in_grace(Some(200), 300));
    }

    #[test]
    fn test_growth_phase_thresholds() {
        assert_eq!(growth_phase_for_xp(0), 1);
        assert_eq!(growth_phase_for_xp(49), 1);
        assert_eq!(growth_phase_for_xp(50), 2);
        assert_eq!(growth_phase_for_xp(149), 2);
        assert_eq!(growth_phase_for_xp(150), 3);
        assert_eq!(growth_phase_for_xp(10_000), 3);
    }

    #[test]
    fn test_phase_sizes_are_monotonic() {
        assert!(radius_for_phase(1) < radius_for_phase(2));
        assert!(radius_for_phase(2) < radius_for_phase(3));
        assert!(visual_size_for_phase(1) < visual_size_for_phase(3));
        // Out-of-range phases clamp
        assert_eq!(radius_for_phase(0), radius_for_phase(1));
        assert_eq!(radius_for_phase(9), radius_for_phase(3));
    }
}
