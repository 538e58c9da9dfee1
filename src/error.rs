use crate::types::{GamePhase, PlayerId};

/// Result type for room and game operations
pub type GameResult<T> = Result<T, GameError>;

/// Errors returned when a room command cannot be applied
#[derive(Debug, thiserror::Error)]
pub enum GameError {
    #[error("Room not found: {0}")]
    RoomNotFound(String),

    #[error("Player not found: {0}")]
    PlayerNotFound(String),

    #[error("Room already exists: {0}")]
    RoomExists(String),

    #[error("Join code already in use: {0}")]
    CodeInUse(String),

    #[error("Room is full (maximum is {0} players)")]
    RoomFull(usize),

    #[error("Only the host can {0}")]
    NotHost(&'static str),

    #[error("Only the current leader can propose a team")]
    NotLeader,

    #[error("Cannot {action} during {phase} phase")]
    WrongPhase {
        action: &'static str,
        phase: GamePhase,
    },

    #[error("Invalid phase transition from {from} to {to}")]
    IllegalTransition { from: GamePhase, to: GamePhase },

    #[error("{}", .0.join("; "))]
    CannotStart(Vec<String>),

    #[error("Not all players are ready")]
    PlayersNotReady,

    #[error("Invalid team: {0}")]
    InvalidTeam(String),

    #[error("Player {0} has already voted")]
    AlreadyVoted(PlayerId),

    #[error("Player {0} is not on the mission team")]
    NotOnTeam(PlayerId),

    #[error("Loyal players cannot fail a mission")]
    GoodCannotFail,

    #[error("Only the assassin can make the assassination attempt")]
    NotAssassin,

    #[error("Invalid assassination target: {0}")]
    InvalidTarget(PlayerId),

    #[error("The game has already been decided")]
    GameAlreadyDecided,

    #[error("Invalid game state: {}", .0.join("; "))]
    InvalidState(Vec<String>),

    #[error("Serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl GameError {
    /// Stable error code sent to clients
    pub fn code(&self) -> &'static str {
        match self {
            GameError::RoomNotFound(_) => "ROOM_NOT_FOUND",
            GameError::PlayerNotFound(_) => "PLAYER_NOT_FOUND",
            GameError::RoomExists(_) => "ROOM_EXISTS",
            GameError::CodeInUse(_) => "CODE_IN_USE",
            GameError::RoomFull(_) => "ROOM_FULL",
            GameError::NotHost(_) => "UNAUTHORIZED",
            GameError::NotLeader => "NOT_LEADER",
            GameError::WrongPhase { .. } => "WRONG_PHASE",
            GameError::IllegalTransition { .. } => "TRANSITION_FAILED",
            GameError::CannotStart(_) => "CANNOT_START",
            GameError::PlayersNotReady => "PLAYERS_NOT_READY",
            GameError::InvalidTeam(_) => "INVALID_TEAM",
            GameError::AlreadyVoted(_) => "ALREADY_VOTED",
            GameError::NotOnTeam(_) => "NOT_ON_TEAM",
            GameError::GoodCannotFail => "GOOD_CANNOT_FAIL",
            GameError::NotAssassin => "NOT_ASSASSIN",
            GameError::InvalidTarget(_) => "INVALID_TARGET",
            GameError::GameAlreadyDecided => "GAME_DECIDED",
            GameError::InvalidState(_) => "INVALID_STATE",
            GameError::Serialization(_) => "SERIALIZATION_FAILED",
        }
    }
}
