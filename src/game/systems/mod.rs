pub mod collision;
pub mod movement;
pub mod npc;
pub mod powerup;
pub mod respawn;
pub mod spawn;
