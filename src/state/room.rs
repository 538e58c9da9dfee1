use super::{room_mut, AppState};
use crate::error::{GameError, GameResult};
use crate::machine::GameStateMachine;
use crate::protocol::{PlayerInfo, ServerMessage};
use crate::rules::MAX_PLAYERS;
use crate::types::*;
use rand::Rng;

/// Safe character set for join codes (excludes 0/O, 1/I/L to avoid confusion)
const CODE_CHARS: &[u8] = b"ABCDEFGHJKMNPQRSTUVWXYZ23456789";
const CODE_LENGTH: usize = 5;

fn generate_room_code() -> String {
    let mut rng = rand::rng();
    (0..CODE_LENGTH)
        .map(|_| CODE_CHARS[rng.random_range(0..CODE_CHARS.len())] as char)
        .collect()
}

/// Use the requested name, or a generated one when it is blank
fn display_name_or_generated(display_name: Option<String>) -> String {
    display_name
        .map(|name| name.trim().to_string())
        .filter(|name| !name.is_empty())
        .or_else(|| petname::petname(2, " "))
        .unwrap_or_else(|| "Anonymous Knight".to_string())
}

fn new_player(display_name: Option<String>) -> Player {
    Player {
        id: ulid::Ulid::new().to_string(),
        display_name: display_name_or_generated(display_name),
        ready: false,
        character: None,
    }
}

pub(crate) fn roster_message(room: &Room) -> ServerMessage {
    ServerMessage::Roster {
        room_id: room.id.clone(),
        host_id: room.host_id.clone(),
        players: room.players.iter().map(PlayerInfo::from).collect(),
    }
}

impl AppState {
    /// Create a room; the creator becomes its host and first player
    pub async fn create_room(&self, host_name: Option<String>) -> (Room, Player) {
        let host = new_player(host_name);
        let mut rooms = self.rooms.write().await;

        let code = loop {
            let code = generate_room_code();
            if !rooms.values().any(|r| r.code == code) {
                break code;
            }
        };

        let room = Room {
            id: ulid::Ulid::new().to_string(),
            code,
            host_id: host.id.clone(),
            players: vec![host.clone()],
            config: self.config.clone(),
            machine: GameStateMachine::new(),
            created_at: chrono::Utc::now().to_rfc3339(),
        };
        tracing::info!(room_id = %room.id, code = %room.code, host = %host.display_name, "Room created");

        rooms.insert(room.id.clone(), room.clone());
        (room, host)
    }

    /// Join a room in the lobby by its code
    pub async fn join_room(
        &self,
        code: &str,
        display_name: Option<String>,
    ) -> GameResult<(Room, Player)> {
        let code = code.trim().to_uppercase();
        let mut rooms = self.rooms.write().await;
        let room = rooms
            .values_mut()
            .find(|r| r.code == code)
            .ok_or_else(|| GameError::RoomNotFound(code.clone()))?;

        let phase = room.phase();
        if phase != GamePhase::Lobby {
            return Err(GameError::WrongPhase {
                action: "join a room",
                phase,
            });
        }
        if room.players.len() >= MAX_PLAYERS {
            return Err(GameError::RoomFull(MAX_PLAYERS));
        }

        let player = new_player(display_name);
        room.players.push(player.clone());
        tracing::info!(room_id = %room.id, player = %player.display_name, "Player joined");

        let _ = self.broadcast.send(roster_message(room));
        Ok((room.clone(), player))
    }

    /// Leave a room in the lobby. The host role passes to the next player;
    /// the room is dropped once empty.
    pub async fn leave_room(&self, room_id: &str, player_id: &str) -> GameResult<()> {
        let mut rooms = self.rooms.write().await;
        let room = room_mut(&mut rooms, room_id)?;

        let phase = room.phase();
        if phase != GamePhase::Lobby {
            return Err(GameError::WrongPhase {
                action: "leave a room",
                phase,
            });
        }
        room.player(player_id)?;
        room.players.retain(|p| p.id != player_id);
        tracing::info!(room_id, player_id, "Player left");

        if room.players.is_empty() {
            rooms.remove(room_id);
            tracing::info!(room_id, "Room closed");
            return Ok(());
        }
        if room.host_id == player_id {
            room.host_id = room.players[0].id.clone();
            tracing::info!(room_id, host_id = %room.host_id, "Host handed over");
        }
        let _ = self.broadcast.send(roster_message(room));
        Ok(())
    }

    pub async fn set_ready(&self, room_id: &str, player_id: &str, ready: bool) -> GameResult<Room> {
        let mut rooms = self.rooms.write().await;
        let room = room_mut(&mut rooms, room_id)?;

        let phase = room.phase();
        if phase != GamePhase::Lobby {
            return Err(GameError::WrongPhase {
                action: "change readiness",
                phase,
            });
        }
        room.player_mut(player_id)?.ready = ready;

        let _ = self.broadcast.send(roster_message(room));
        Ok(room.clone())
    }
}
