pub mod bot;
pub mod constants;
pub mod events;
pub mod match_result;
pub mod rules;
pub mod scheduler;
pub mod session;
pub mod state;
pub mod systems;
