mod export;
mod game;
mod mission;
mod reveal;
mod room;

pub use export::{RoomExport, EXPORT_SCHEMA_VERSION};
pub use reveal::RoleReveal;

use crate::config::GameConfig;
use crate::error::{GameError, GameResult};
use crate::machine::GameStateMachine;
use crate::protocol::ServerMessage;
use crate::types::*;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{broadcast, RwLock};

/// Shared application state: every room and its game
#[derive(Clone)]
pub struct AppState {
    pub rooms: Arc<RwLock<HashMap<RoomId, Room>>>,
    /// Characters dealt in newly created rooms
    pub config: GameConfig,
    /// Broadcast channel for game state updates
    pub broadcast: broadcast::Sender<ServerMessage>,
}

impl AppState {
    pub fn new() -> Self {
        Self::with_config(GameConfig::default())
    }

    pub fn with_config(config: GameConfig) -> Self {
        let (tx, _rx) = broadcast::channel(100);
        Self {
            rooms: Arc::new(RwLock::new(HashMap::new())),
            config,
            broadcast: tx,
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ServerMessage> {
        self.broadcast.subscribe()
    }

    /// Snapshot of a room's game state
    pub async fn get_state(&self, room_id: &str) -> GameResult<GameState> {
        let rooms = self.rooms.read().await;
        let room = rooms
            .get(room_id)
            .ok_or_else(|| GameError::RoomNotFound(room_id.to_string()))?;
        Ok(room.machine.game_state())
    }

    /// Snapshot of a room (roster and machine)
    pub async fn get_room(&self, room_id: &str) -> GameResult<Room> {
        self.rooms
            .read()
            .await
            .get(room_id)
            .cloned()
            .ok_or_else(|| GameError::RoomNotFound(room_id.to_string()))
    }

    /// Publish the room's state to subscribers
    fn broadcast_state(&self, room: &Room) {
        // No receivers connected is fine
        let _ = self.broadcast.send(state_message(room));
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::new()
    }
}

fn room_mut<'a>(rooms: &'a mut HashMap<RoomId, Room>, room_id: &str) -> GameResult<&'a mut Room> {
    rooms
        .get_mut(room_id)
        .ok_or_else(|| GameError::RoomNotFound(room_id.to_string()))
}

/// `GameState` message for a room, including the phases the UI may offer next
pub fn state_message(room: &Room) -> ServerMessage {
    ServerMessage::GameState {
        room_id: room.id.clone(),
        state: room.machine.game_state(),
        valid_transitions: GameStateMachine::allowed_transitions(room.phase()).to_vec(),
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_get_state_unknown_room() {
        let state = AppState::new();
        let result = state.get_state("missing").await;
        assert!(matches!(result, Err(GameError::RoomNotFound(_))));
    }

    #[tokio::test]
    async fn test_mutations_are_broadcast() {
        let state = AppState::new();
        let mut rx = state.subscribe();
        let (room_id, host_id, _) = test_support::ready_room(&state, 5).await;
        state.start_game(&room_id, &host_id).await.unwrap();

        let mut last_phase = None;
        while let Ok(msg) = rx.try_recv() {
            if let ServerMessage::GameState {
                state,
                valid_transitions,
                ..
            } = msg
            {
                last_phase = Some(state.phase);
                assert_eq!(
                    valid_transitions,
                    GameStateMachine::allowed_transitions(state.phase).to_vec()
                );
            }
        }
        assert_eq!(last_phase, Some(GamePhase::RoleReveal));
    }
}
