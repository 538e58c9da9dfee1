use crate::state::{RoleReveal, RoomExport};
use crate::types::*;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "t", rename_all = "snake_case")]
pub enum ClientMessage {
    CreateRoom {
        display_name: Option<String>,
    },
    JoinRoom {
        code: String,
        display_name: Option<String>,
    },
    LeaveRoom {
        room_id: RoomId,
        player_id: PlayerId,
    },
    SetReady {
        room_id: RoomId,
        player_id: PlayerId,
        ready: bool,
    },
    // Host-only messages
    StartGame {
        room_id: RoomId,
        player_id: PlayerId,
    },
    BeginVoting {
        room_id: RoomId,
        player_id: PlayerId,
    },
    /// Move on from `missionResult` (next round, assassin or game over)
    Continue {
        room_id: RoomId,
        player_id: PlayerId,
    },
    ResetRoom {
        room_id: RoomId,
        player_id: PlayerId,
    },
    /// Manual override through the transition table
    TransitionPhase {
        room_id: RoomId,
        player_id: PlayerId,
        phase: GamePhase,
    },
    ExportRoom {
        room_id: RoomId,
        player_id: PlayerId,
    },
    ImportRoom {
        export: RoomExport,
    },
    // Player messages
    ProposeTeam {
        room_id: RoomId,
        player_id: PlayerId,
        members: Vec<PlayerId>,
    },
    TeamVote {
        room_id: RoomId,
        player_id: PlayerId,
        approve: bool,
    },
    MissionVote {
        room_id: RoomId,
        player_id: PlayerId,
        success: bool,
    },
    Assassinate {
        room_id: RoomId,
        player_id: PlayerId,
        target_id: PlayerId,
    },
    GetState {
        room_id: RoomId,
    },
    GetRole {
        room_id: RoomId,
        player_id: PlayerId,
    },
}

/// Public view of a player (never includes the character)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PlayerInfo {
    pub id: PlayerId,
    pub display_name: String,
    pub ready: bool,
}

impl From<&Player> for PlayerInfo {
    fn from(player: &Player) -> Self {
        Self {
            id: player.id.clone(),
            display_name: player.display_name.clone(),
            ready: player.ready,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "t", rename_all = "snake_case")]
pub enum ServerMessage {
    RoomCreated {
        room_id: RoomId,
        code: String,
        player: PlayerInfo,
    },
    Joined {
        room_id: RoomId,
        player: PlayerInfo,
        players: Vec<PlayerInfo>,
    },
    Roster {
        room_id: RoomId,
        host_id: PlayerId,
        players: Vec<PlayerInfo>,
    },
    GameState {
        room_id: RoomId,
        state: GameState,
        valid_transitions: Vec<GamePhase>,
    },
    RoleReveal {
        room_id: RoomId,
        reveal: RoleReveal,
    },
    RoomExported {
        export: RoomExport,
    },
    RoomImported {
        room_id: RoomId,
    },
    Error {
        code: String,
        msg: String,
    },
}
