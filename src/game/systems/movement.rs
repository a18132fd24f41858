use crate::game::state::{NpcStatus, SessionState};

/// Integrate positions for living players and moving NPCs
pub fn update(state: &mut SessionState, dt: f32) {
    for player in state.players.iter_mut().filter(|p| p.is_alive()) {
        player.position += player.velocity * dt;
    }

    // Spawning NPCs hold still until they become edible
    for npc in state.npcs.iter_mut().filter(|n| n.status != NpcStatus::Spawning) {
        npc.position += npc.velocity * dt;
    }
}
