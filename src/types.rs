use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use crate::config::GameConfig;
use crate::error::{GameError, GameResult};
use crate::machine::GameStateMachine;

/// Opaque ID types for type safety
pub type RoomId = String;
pub type PlayerId = String;
pub type MissionId = String;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "camelCase")]
pub enum GamePhase {
    Lobby,
    RoleReveal,
    Voting,
    MissionSelect,
    MissionVote,
    MissionResult,
    AssassinAttempt,
    GameOver,
}

impl GamePhase {
    pub const ALL: [GamePhase; 8] = [
        GamePhase::Lobby,
        GamePhase::RoleReveal,
        GamePhase::Voting,
        GamePhase::MissionSelect,
        GamePhase::MissionVote,
        GamePhase::MissionResult,
        GamePhase::AssassinAttempt,
        GamePhase::GameOver,
    ];

    /// Wire name of the phase
    pub fn as_str(&self) -> &'static str {
        match self {
            GamePhase::Lobby => "lobby",
            GamePhase::RoleReveal => "roleReveal",
            GamePhase::Voting => "voting",
            GamePhase::MissionSelect => "missionSelect",
            GamePhase::MissionVote => "missionVote",
            GamePhase::MissionResult => "missionResult",
            GamePhase::AssassinAttempt => "assassinAttempt",
            GamePhase::GameOver => "gameOver",
        }
    }
}

impl fmt::Display for GamePhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for GamePhase {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        GamePhase::ALL
            .iter()
            .copied()
            .find(|phase| phase.as_str() == s)
            .ok_or_else(|| format!("Invalid phase: {}", s))
    }
}

/// Team-approval vote on a proposed mission team
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum VoteChoice {
    Approve,
    Reject,
}

/// Vote cast by a team member while on a mission
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum MissionChoice {
    Success,
    Fail,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Vote {
    pub player_id: PlayerId,
    pub vote: VoteChoice,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct MissionVote {
    pub player_id: PlayerId,
    pub vote: MissionChoice,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct MissionOutcome {
    pub succeeded: bool,
    pub fail_votes: u32,
    pub fails_required: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Mission {
    pub id: MissionId,
    pub round: u32,
    pub team_size: u32,
    pub team_members: BTreeSet<PlayerId>,
    pub votes: Vec<MissionVote>,
    /// Set once every team member has voted
    #[serde(default)]
    pub outcome: Option<MissionOutcome>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct AssassinAttempt {
    pub assassin_id: PlayerId,
    pub target_id: PlayerId,
    pub succeeded: bool,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Team {
    Good,
    Evil,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "camelCase")]
pub enum Character {
    Merlin,
    Percival,
    LoyalServant,
    Assassin,
    Morgana,
    Mordred,
    Oberon,
    Minion,
}

impl Character {
    pub fn team(&self) -> Team {
        match self {
            Character::Merlin | Character::Percival | Character::LoyalServant => Team::Good,
            Character::Assassin
            | Character::Morgana
            | Character::Mordred
            | Character::Oberon
            | Character::Minion => Team::Evil,
        }
    }
}

/// Authoritative state of one game.
///
/// `round` is 0 only while in the lobby. `started_at` is stamped when the
/// game leaves the lobby and kept until the room is reset.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct GameState {
    pub phase: GamePhase,
    pub round: u32,
    pub leader_index: usize,
    pub started_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub votes: Vec<Vote>,
    #[serde(default)]
    pub missions: Vec<Mission>,
    pub assassin_attempt: Option<AssassinAttempt>,
    #[serde(default)]
    pub winner: Option<Team>,
    /// Consecutive rejected proposals in the current round
    #[serde(default)]
    pub rejected_proposals: u32,
}

impl Default for GameState {
    fn default() -> Self {
        Self {
            phase: GamePhase::Lobby,
            round: 0,
            leader_index: 0,
            started_at: None,
            votes: Vec::new(),
            missions: Vec::new(),
            assassin_attempt: None,
            winner: None,
            rejected_proposals: 0,
        }
    }
}

impl GameState {
    /// Mission belonging to the current round, if a team has been proposed
    pub fn current_mission(&self) -> Option<&Mission> {
        self.missions.iter().find(|m| m.round == self.round)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Player {
    pub id: PlayerId,
    pub display_name: String,
    pub ready: bool,
    #[serde(default)]
    pub character: Option<Character>,
}

impl Player {
    pub fn team(&self) -> Option<Team> {
        self.character.map(|c| c.team())
    }
}

/// A game room: the roster plus the state machine driving its game.
///
/// `players` is in seat order; the leader is `players[leader_index]`.
#[derive(Debug, Clone)]
pub struct Room {
    pub id: RoomId,
    pub code: String,
    pub host_id: PlayerId,
    pub players: Vec<Player>,
    pub config: GameConfig,
    pub machine: GameStateMachine,
    pub created_at: String,
}

impl Room {
    pub fn player(&self, player_id: &str) -> GameResult<&Player> {
        self.players
            .iter()
            .find(|p| p.id == player_id)
            .ok_or_else(|| GameError::PlayerNotFound(player_id.to_string()))
    }

    pub fn player_mut(&mut self, player_id: &str) -> GameResult<&mut Player> {
        self.players
            .iter_mut()
            .find(|p| p.id == player_id)
            .ok_or_else(|| GameError::PlayerNotFound(player_id.to_string()))
    }

    /// Current team leader
    pub fn leader(&self) -> Option<&Player> {
        if self.players.is_empty() {
            return None;
        }
        let index = self.machine.state().leader_index % self.players.len();
        self.players.get(index)
    }

    pub fn require_host(&self, player_id: &str, action: &'static str) -> GameResult<()> {
        if self.host_id != player_id {
            return Err(GameError::NotHost(action));
        }
        Ok(())
    }

    pub fn phase(&self) -> GamePhase {
        self.machine.current_phase()
    }
}
