//! Client message dispatch
//!
//! Maps each `ClientMessage` onto the matching `AppState` operation and turns
//! the result into a reply. Authorization (host, leader, assassin) is checked
//! by the state operations themselves.

use crate::error::{GameError, GameResult};
use crate::machine::GameStateMachine;
use crate::protocol::{ClientMessage, PlayerInfo, ServerMessage};
use crate::state::{state_message, AppState};
use crate::types::*;

fn error_reply(err: GameError) -> ServerMessage {
    tracing::warn!(code = err.code(), "Command refused: {}", err);
    ServerMessage::Error {
        code: err.code().to_string(),
        msg: err.to_string(),
    }
}

fn state_reply(room_id: RoomId, result: GameResult<GameState>) -> ServerMessage {
    match result {
        Ok(state) => ServerMessage::GameState {
            room_id,
            valid_transitions: GameStateMachine::allowed_transitions(state.phase).to_vec(),
            state,
        },
        Err(e) => error_reply(e),
    }
}

/// Handle a client message and return the reply for the sender, if any
pub async fn handle_message(msg: ClientMessage, state: &AppState) -> Option<ServerMessage> {
    match msg {
        ClientMessage::CreateRoom { display_name } => {
            let (room, host) = state.create_room(display_name).await;
            Some(ServerMessage::RoomCreated {
                room_id: room.id,
                code: room.code,
                player: PlayerInfo::from(&host),
            })
        }

        ClientMessage::JoinRoom { code, display_name } => {
            tracing::info!("Join request with code: {}", code);
            match state.join_room(&code, display_name).await {
                Ok((room, player)) => Some(ServerMessage::Joined {
                    room_id: room.id,
                    player: PlayerInfo::from(&player),
                    players: room.players.iter().map(PlayerInfo::from).collect(),
                }),
                Err(e) => Some(error_reply(e)),
            }
        }

        // The remaining players learn about it from the roster broadcast
        ClientMessage::LeaveRoom { room_id, player_id } => {
            match state.leave_room(&room_id, &player_id).await {
                Ok(()) => None,
                Err(e) => Some(error_reply(e)),
            }
        }

        ClientMessage::SetReady {
            room_id,
            player_id,
            ready,
        } => match state.set_ready(&room_id, &player_id, ready).await {
            Ok(room) => Some(ServerMessage::Roster {
                room_id: room.id,
                host_id: room.host_id,
                players: room.players.iter().map(PlayerInfo::from).collect(),
            }),
            Err(e) => Some(error_reply(e)),
        },

        ClientMessage::StartGame { room_id, player_id } => {
            tracing::info!("Start game requested for room {}", room_id);
            let result = state.start_game(&room_id, &player_id).await;
            Some(state_reply(room_id, result))
        }

        ClientMessage::BeginVoting { room_id, player_id } => {
            let result = state.begin_voting(&room_id, &player_id).await;
            Some(state_reply(room_id, result))
        }

        ClientMessage::Continue { room_id, player_id } => {
            let result = state.continue_after_result(&room_id, &player_id).await;
            Some(state_reply(room_id, result))
        }

        ClientMessage::ResetRoom { room_id, player_id } => {
            let result = state.reset_room(&room_id, &player_id).await;
            Some(state_reply(room_id, result))
        }

        ClientMessage::TransitionPhase {
            room_id,
            player_id,
            phase,
        } => {
            tracing::info!("Host transitioning room {} to phase: {}", room_id, phase);
            let result = state.transition_phase(&room_id, &player_id, phase).await;
            Some(state_reply(room_id, result))
        }

        ClientMessage::ExportRoom { room_id, player_id } => {
            match state.export_room(&room_id, &player_id).await {
                Ok(export) => Some(ServerMessage::RoomExported { export }),
                Err(e) => Some(error_reply(e)),
            }
        }

        ClientMessage::ImportRoom { export } => match state.import_room(export).await {
            Ok(room_id) => Some(ServerMessage::RoomImported { room_id }),
            Err(e) => Some(error_reply(e)),
        },

        ClientMessage::ProposeTeam {
            room_id,
            player_id,
            members,
        } => {
            let result = state
                .propose_team(&room_id, &player_id, members)
                .await
                .map(|_| ());
            match result {
                Ok(()) => Some(current_state(state, room_id).await),
                Err(e) => Some(error_reply(e)),
            }
        }

        ClientMessage::TeamVote {
            room_id,
            player_id,
            approve,
        } => {
            let result = state.cast_team_vote(&room_id, &player_id, approve).await;
            Some(state_reply(room_id, result))
        }

        ClientMessage::MissionVote {
            room_id,
            player_id,
            success,
        } => {
            let result = state.cast_mission_vote(&room_id, &player_id, success).await;
            Some(state_reply(room_id, result))
        }

        ClientMessage::Assassinate {
            room_id,
            player_id,
            target_id,
        } => {
            let result = state.assassinate(&room_id, &player_id, &target_id).await;
            Some(state_reply(room_id, result))
        }

        ClientMessage::GetState { room_id } => Some(current_state(state, room_id).await),

        ClientMessage::GetRole { room_id, player_id } => {
            match state.role_reveal(&room_id, &player_id).await {
                Ok(reveal) => Some(ServerMessage::RoleReveal { room_id, reveal }),
                Err(e) => Some(error_reply(e)),
            }
        }
    }
}

async fn current_state(state: &AppState, room_id: RoomId) -> ServerMessage {
    match state.get_room(&room_id).await {
        Ok(room) => state_message(&room),
        Err(e) => error_reply(e),
    }
}
