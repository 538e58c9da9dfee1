//! Room export/import for handing a game to another process or restoring it.
//!
//! The game state is validated on the way in; a snapshot that breaks the
//! structural rules is refused instead of being repaired.

use super::AppState;
use crate::config::GameConfig;
use crate::error::{GameError, GameResult};
use crate::machine::GameStateMachine;
use crate::types::*;
use serde::{Deserialize, Serialize};

/// Schema version for export format compatibility
pub const EXPORT_SCHEMA_VERSION: u32 = 1;

/// A serializable snapshot of one room.
///
/// Carries characters, so it must only be handed to the host.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoomExport {
    pub schema_version: u32,
    /// Export timestamp (ISO8601)
    pub exported_at: String,
    pub room_id: RoomId,
    pub code: String,
    pub host_id: PlayerId,
    pub created_at: String,
    pub players: Vec<Player>,
    #[serde(default)]
    pub config: GameConfig,
    pub state: GameState,
}

impl RoomExport {
    fn from_room(room: &Room) -> Self {
        Self {
            schema_version: EXPORT_SCHEMA_VERSION,
            exported_at: chrono::Utc::now().to_rfc3339(),
            room_id: room.id.clone(),
            code: room.code.clone(),
            host_id: room.host_id.clone(),
            created_at: room.created_at.clone(),
            players: room.players.clone(),
            config: room.config.clone(),
            state: room.machine.game_state(),
        }
    }

    fn into_room(self) -> GameResult<Room> {
        if self.schema_version != EXPORT_SCHEMA_VERSION {
            return Err(GameError::InvalidState(vec![format!(
                "Unsupported schema version: {}",
                self.schema_version
            )]));
        }
        if !self.players.iter().any(|p| p.id == self.host_id) {
            return Err(GameError::InvalidState(vec![format!(
                "Host {} is not a player",
                self.host_id
            )]));
        }
        let machine = GameStateMachine::from_state(self.state)?;
        Ok(Room {
            id: self.room_id,
            code: self.code,
            host_id: self.host_id,
            players: self.players,
            config: self.config,
            machine,
            created_at: self.created_at,
        })
    }
}

impl AppState {
    /// Export a room (host only)
    pub async fn export_room(&self, room_id: &str, player_id: &str) -> GameResult<RoomExport> {
        let rooms = self.rooms.read().await;
        let room = rooms
            .get(room_id)
            .ok_or_else(|| GameError::RoomNotFound(room_id.to_string()))?;
        room.require_host(player_id, "export the room")?;
        Ok(RoomExport::from_room(room))
    }

    /// Import a room. Live rooms are never replaced, and the join code must be free.
    pub async fn import_room(&self, export: RoomExport) -> GameResult<RoomId> {
        let room = export.into_room()?;
        let mut rooms = self.rooms.write().await;
        if rooms.contains_key(&room.id) {
            return Err(GameError::RoomExists(room.id));
        }
        if rooms.values().any(|r| r.code == room.code) {
            return Err(GameError::CodeInUse(room.code));
        }

        let room_id = room.id.clone();
        tracing::info!(room_id = %room_id, phase = %room.phase(), "Room imported");
        self.broadcast_state(&room);
        rooms.insert(room_id.clone(), room);
        Ok(room_id)
    }

    /// Import from JSON, checking the raw game state before deserializing it
    pub async fn import_room_json(&self, json: &str) -> GameResult<RoomId> {
        let value: serde_json::Value = serde_json::from_str(json)?;
        let raw_state = value.get("state").cloned().unwrap_or_default();
        let report = GameStateMachine::validate_wire_state(&raw_state);
        if !report.valid {
            return Err(GameError::InvalidState(report.errors));
        }
        let export: RoomExport = serde_json::from_value(value)?;
        self.import_room(export).await
    }
}
