use super::{room_mut, AppState};
use crate::error::{GameError, GameResult};
use crate::machine::GameStateMachine;
use crate::rules::{self, MissionTally};
use crate::types::*;
use rand::seq::SliceRandom;

impl AppState {
    /// Deal characters, shuffle the seating and leave the lobby
    pub async fn start_game(&self, room_id: &str, player_id: &str) -> GameResult<GameState> {
        let mut rooms = self.rooms.write().await;
        let room = room_mut(&mut rooms, room_id)?;
        room.require_host(player_id, "start the game")?;

        let phase = room.phase();
        if phase != GamePhase::Lobby {
            return Err(GameError::WrongPhase {
                action: "start the game",
                phase,
            });
        }

        let player_count = room.players.len();
        let check = rules::can_start_game(player_count);
        if !check.can_start {
            return Err(GameError::CannotStart(check.errors));
        }
        if room.players.iter().any(|p| !p.ready) {
            return Err(GameError::PlayersNotReady);
        }
        let mut characters = rules::characters_for(player_count, &room.config).ok_or_else(|| {
            GameError::CannotStart(vec![format!("No setup for {} players", player_count)])
        })?;

        {
            let mut rng = rand::rng();
            room.players.shuffle(&mut rng);
            characters.shuffle(&mut rng);
        }
        for (player, character) in room.players.iter_mut().zip(characters) {
            player.character = Some(character);
        }

        room.machine.try_transition(GamePhase::RoleReveal)?;
        tracing::info!(room_id, players = player_count, "Game started");

        self.broadcast_state(room);
        Ok(room.machine.game_state())
    }

    /// Close the role reveal and open the first team proposal
    pub async fn begin_voting(&self, room_id: &str, player_id: &str) -> GameResult<GameState> {
        let mut rooms = self.rooms.write().await;
        let room = room_mut(&mut rooms, room_id)?;
        room.require_host(player_id, "begin voting")?;

        let phase = room.phase();
        if phase != GamePhase::RoleReveal {
            return Err(GameError::WrongPhase {
                action: "begin voting",
                phase,
            });
        }
        room.machine.try_transition(GamePhase::Voting)?;

        self.broadcast_state(room);
        Ok(room.machine.game_state())
    }

    /// Leave `missionResult`: next round, assassin endgame, or game over
    pub async fn continue_after_result(
        &self,
        room_id: &str,
        player_id: &str,
    ) -> GameResult<GameState> {
        let mut rooms = self.rooms.write().await;
        let room = room_mut(&mut rooms, room_id)?;
        room.require_host(player_id, "continue the game")?;

        let phase = room.phase();
        if phase != GamePhase::MissionResult {
            return Err(GameError::WrongPhase {
                action: "continue the game",
                phase,
            });
        }

        let tally = MissionTally::from_missions(&room.machine.state().missions);
        let next = tally.next_phase();
        match next {
            GamePhase::GameOver => room.machine.finish(Team::Evil)?,
            GamePhase::Voting => {
                room.machine.try_transition(GamePhase::Voting)?;
                room.machine.rotate_leader(room.players.len());
            }
            other => room.machine.try_transition(other)?,
        }
        tracing::info!(
            room_id,
            successes = tally.successes,
            failures = tally.failures,
            next = %next,
            "Mission result closed"
        );

        self.broadcast_state(room);
        Ok(room.machine.game_state())
    }

    /// Host override: request any phase the transition table allows.
    ///
    /// Leaving the lobby is refused, since it would skip dealing characters.
    /// Leaving `missionResult` goes through `continue_after_result`, which
    /// tallies the missions and rotates the leader.
    pub async fn transition_phase(
        &self,
        room_id: &str,
        player_id: &str,
        phase: GamePhase,
    ) -> GameResult<GameState> {
        let mut rooms = self.rooms.write().await;
        let room = room_mut(&mut rooms, room_id)?;
        room.require_host(player_id, "change the phase")?;

        let current = room.phase();
        if matches!(current, GamePhase::Lobby | GamePhase::MissionResult) {
            return Err(GameError::WrongPhase {
                action: "override the phase",
                phase: current,
            });
        }
        room.machine.try_transition(phase)?;
        tracing::info!(room_id, from = %current, to = %phase, "Host changed phase");

        self.broadcast_state(room);
        Ok(room.machine.game_state())
    }

    /// Return a finished (or decided) game to a fresh lobby, keeping the roster
    pub async fn reset_room(&self, room_id: &str, player_id: &str) -> GameResult<GameState> {
        let mut rooms = self.rooms.write().await;
        let room = room_mut(&mut rooms, room_id)?;
        room.require_host(player_id, "reset the room")?;

        let state = room.machine.state();
        if state.phase != GamePhase::GameOver && state.winner.is_none() {
            return Err(GameError::WrongPhase {
                action: "reset the room",
                phase: state.phase,
            });
        }

        room.machine = GameStateMachine::new();
        for player in &mut room.players {
            player.character = None;
            player.ready = false;
        }
        tracing::info!(room_id, "Room reset to lobby");

        self.broadcast_state(room);
        Ok(room.machine.game_state())
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::*;
    use super::*;
    use std::collections::HashSet;

    #[tokio::test]
    async fn test_start_game_deals_characters() {
        let state = AppState::new();
        let (room_id, host_id, ids) = ready_room(&state, 7).await;

        let game = state.start_game(&room_id, &host_id).await.unwrap();
        assert_eq!(game.phase, GamePhase::RoleReveal);
        assert_eq!(game.round, 1);
        assert_eq!(game.leader_index, 0);
        assert!(game.started_at.is_some());

        let room = state.get_room(&room_id).await.unwrap();
        let seated: HashSet<_> = room.players.iter().map(|p| p.id.clone()).collect();
        assert_eq!(seated, ids.into_iter().collect());
        let evil = room
            .players
            .iter()
            .filter(|p| p.team() == Some(Team::Evil))
            .count();
        assert_eq!(evil, 3);
        assert!(room.players.iter().all(|p| p.character.is_some()));
    }

    #[tokio::test]
    async fn test_start_game_requires_host() {
        let state = AppState::new();
        let (room_id, _, ids) = ready_room(&state, 5).await;
        let result = state.start_game(&room_id, &ids[1]).await;
        assert!(matches!(result, Err(GameError::NotHost(_))));
    }

    #[tokio::test]
    async fn test_start_game_with_too_few_players() {
        let state = AppState::new();
        let (room_id, host_id, _) = ready_room(&state, 4).await;
        let err = state.start_game(&room_id, &host_id).await.unwrap_err();
        assert_eq!(err.code(), "CANNOT_START");
        assert!(err.to_string().contains("at least 5 players"));
        assert_eq!(state.get_state(&room_id).await.unwrap().phase, GamePhase::Lobby);
    }

    #[tokio::test]
    async fn test_start_game_requires_everyone_ready() {
        let state = AppState::new();
        let (room_id, host_id, ids) = ready_room(&state, 5).await;
        state.set_ready(&room_id, &ids[2], false).await.unwrap();
        let result = state.start_game(&room_id, &host_id).await;
        assert!(matches!(result, Err(GameError::PlayersNotReady)));
    }

    #[tokio::test]
    async fn test_cannot_join_started_game() {
        let state = AppState::new();
        let (room_id, host_id, _) = ready_room(&state, 5).await;
        state.start_game(&room_id, &host_id).await.unwrap();
        let code = state.get_room(&room_id).await.unwrap().code;
        let result = state.join_room(&code, None).await;
        assert!(matches!(result, Err(GameError::WrongPhase { .. })));
    }

    #[tokio::test]
    async fn test_transition_override_follows_table() {
        let state = AppState::new();
        let (room_id, host_id) = voting_room(&state, 5).await;

        let result = state
            .transition_phase(&room_id, &host_id, GamePhase::GameOver)
            .await;
        assert!(matches!(result, Err(GameError::IllegalTransition { .. })));

        let game = state
            .transition_phase(&room_id, &host_id, GamePhase::MissionSelect)
            .await
            .unwrap();
        assert_eq!(game.phase, GamePhase::MissionSelect);
    }

    #[tokio::test]
    async fn test_transition_override_cannot_leave_lobby() {
        let state = AppState::new();
        let (room_id, host_id, _) = ready_room(&state, 5).await;
        let result = state
            .transition_phase(&room_id, &host_id, GamePhase::RoleReveal)
            .await;
        assert!(matches!(result, Err(GameError::WrongPhase { .. })));
    }

    #[tokio::test]
    async fn test_transition_override_cannot_skip_mission_result() {
        let state = AppState::new();
        let (room_id, host_id) = voting_room(&state, 5).await;
        let room = state.get_room(&room_id).await.unwrap();
        let leader = room.leader().unwrap().id.clone();
        let team: Vec<PlayerId> = room.players[..2].iter().map(|p| p.id.clone()).collect();

        state
            .propose_team(&room_id, &leader, team.clone())
            .await
            .unwrap();
        for player in &room.players {
            state
                .cast_team_vote(&room_id, &player.id, true)
                .await
                .unwrap();
        }
        for id in &team {
            state.cast_mission_vote(&room_id, id, true).await.unwrap();
        }
        assert_eq!(
            state.get_state(&room_id).await.unwrap().phase,
            GamePhase::MissionResult
        );

        let err = state
            .transition_phase(&room_id, &host_id, GamePhase::Voting)
            .await
            .unwrap_err();
        assert_eq!(err.code(), "WRONG_PHASE");
        let game = state.get_state(&room_id).await.unwrap();
        assert_eq!(game.phase, GamePhase::MissionResult);
        assert_eq!(game.round, 1);

        let game = state
            .continue_after_result(&room_id, &host_id)
            .await
            .unwrap();
        assert_eq!(game.phase, GamePhase::Voting);
        assert_eq!(game.round, 2);
        assert_eq!(game.leader_index, 1);
    }

    #[tokio::test]
    async fn test_reset_only_after_game_over() {
        let state = AppState::new();
        let (room_id, host_id) = voting_room(&state, 5).await;
        let result = state.reset_room(&room_id, &host_id).await;
        assert!(matches!(result, Err(GameError::WrongPhase { .. })));
    }
}
