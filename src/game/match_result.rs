//! Final match results and rankings

use serde::{Deserialize, Serialize};

use crate::game::state::{PlayerId, PlayerStatus, SessionState};

/// Final result handed to the transport when a match ends
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MatchResult {
    pub winner_id: Option<PlayerId>,
    pub winner_name: Option<String>,
    /// Top two scores tied
    pub is_draw: bool,
    pub rankings: Vec<PlayerRanking>,
    /// Wall time minus paused time
    pub duration_ms: u64,
    pub reason: MatchEndReason,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PlayerRanking {
    pub player_id: PlayerId,
    pub display_name: String,
    pub rank: u32,
    pub xp: u32,
    pub players_eaten: u32,
    pub npcs_eaten: u32,
    pub deaths: u32,
    pub is_bot: bool,
    pub quit: bool,
}

/// Reason why match ended
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum MatchEndReason {
    /// Match timer reached zero
    TimeLimit,
    /// Every player left
    AllPlayersQuit,
}

/// Check if match should end
pub fn check_match_end(state: &SessionState, now: u64) -> Option<MatchEndReason> {
    if state.is_ended() || state.is_paused() {
        return None;
    }
    if state.time_remaining_ms(now) == 0 {
        return Some(MatchEndReason::TimeLimit);
    }
    if !state.players.is_empty() && state.players.iter().all(|p| p.status == PlayerStatus::Quit) {
        return Some(MatchEndReason::AllPlayersQuit);
    }
    None
}

/// Rank players by xp (join order breaks ties) and pick the winner
pub fn determine_result(state: &SessionState, reason: MatchEndReason, now: u64) -> MatchResult {
    let rankings: Vec<PlayerRanking> = state
        .ranked_players()
        .into_iter()
        .enumerate()
        .map(|(i, p)| PlayerRanking {
            player_id: p.id,
            display_name: p.display_name.clone(),
            rank: i as u32 + 1,
            xp: p.xp,
            players_eaten: p.players_eaten,
            npcs_eaten: p.npcs_eaten,
            deaths: p.deaths,
            is_bot: p.is_bot,
            quit: p.status == PlayerStatus::Quit,
        })
        .collect();

    let is_draw = matches!(rankings.as_slice(), [first, second, ..] if first.xp == second.xp);
    let (winner_id, winner_name) = match rankings.first() {
        Some(first) if !is_draw => (Some(first.player_id), Some(first.display_name.clone())),
        _ => (None, None),
    };

    MatchResult {
        winner_id,
        winner_name,
        is_draw,
        rankings,
        duration_ms: state.active_elapsed_ms(now).min(state.duration_ms),
        reason,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::state::tests::create_test_state;

    #[test]
    fn test_single_winner() {
        let mut state = create_test_state(3);
        let ids: Vec<_> = state.players.iter().map(|p| p.id).collect();
        state.update_player_xp(ids[1], 70);
        state.update_player_xp(ids[2], 30);

        let result = determine_result(&state, MatchEndReason::TimeLimit, 1000);
        assert!(!result.is_draw);
        assert_eq!(result.winner_id, Some(ids[1]));
        assert_eq!(result.winner_name.as_deref(), Some("Player1"));
        assert_eq!(result.rankings[0].rank, 1);
        assert_eq!(result.rankings[2].player_id, ids[0]);
    }

    #[test]
    fn test_tied_top_scores_are_a_draw() {
        let mut state = create_test_state(3);
        let ids: Vec<_> = state.players.iter().map(|p| p.id).collect();
        state.update_player_xp(ids[0], 40);
        state.update_player_xp(ids[2], 40);

        let result = determine_result(&state, MatchEndReason::TimeLimit, 1000);
        assert!(result.is_draw);
        assert!(result.winner_id.is_none());
        // Ties keep join order
        assert_eq!(result.rankings[0].player_id, ids[0]);
        assert_eq!(result.rankings[1].player_id, ids[2]);
    }

    #[test]
    fn test_solo_player_wins() {
        let state = create_test_state(1);
        let result = determine_result(&state, MatchEndReason::TimeLimit, 0);
        assert!(!result.is_draw);
        assert_eq!(result.winner_id, Some(state.players[0].id));
    }

    #[test]
    fn test_duration_excludes_pause() {
        let mut state = create_test_state(1);
        let leader = state.players[0].id;
        state.pause_game(leader, 10_000);
        state.resume_game(25_000);
        let result = determine_result(&state, MatchEndReason::TimeLimit, 40_000);
        assert_eq!(result.duration_ms, 25_000);
    }

    #[test]
    fn test_check_match_end_time_limit() {
        let state = create_test_state(2);
        assert_eq!(check_match_end(&state, state.duration_ms - 1), None);
        assert_eq!(check_match_end(&state, state.duration_ms), Some(MatchEndReason::TimeLimit));
    }

    #[test]
    fn test_check_match_end_not_while_paused() {
        let mut state = create_test_state(1);
        let leader = state.players[0].id;
        state.pause_game(leader, 100);
        assert_eq!(check_match_end(&state, state.duration_ms * 2), None);
    }

    #[test]
    fn test_check_match_end_all_quit() {
        let mut state = create_test_state(2);
        let ids: Vec<_> = state.players.iter().map(|p| p.id).collect();
        state.mark_player_quit(ids[0]);
        assert_eq!(check_match_end(&state, 10), None);
        state.mark_player_quit(ids[1]);
        assert_eq!(check_match_end(&state, 10), Some(MatchEndReason::AllPlayersQuit));
    }
}
