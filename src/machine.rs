//! Phase state machine for a single game.
//!
//! The machine is the only thing allowed to change a [`GameState`]. Phase
//! changes go through a fixed transition table; the orchestrator decides
//! *which* legal phase to request (e.g. after a mission result) but can never
//! skip the table.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeSet;

use crate::error::{GameError, GameResult};
use crate::rules;
use crate::types::*;

/// Allowed next phases for every phase
const TRANSITIONS: &[(GamePhase, &[GamePhase])] = &[
    (GamePhase::Lobby, &[GamePhase::RoleReveal]),
    (GamePhase::RoleReveal, &[GamePhase::Voting]),
    (
        GamePhase::Voting,
        &[GamePhase::MissionSelect, GamePhase::MissionVote],
    ),
    (GamePhase::MissionSelect, &[GamePhase::Voting]),
    (GamePhase::MissionVote, &[GamePhase::MissionResult]),
    (
        GamePhase::MissionResult,
        &[
            GamePhase::Voting,
            GamePhase::AssassinAttempt,
            GamePhase::GameOver,
        ],
    ),
    (GamePhase::AssassinAttempt, &[GamePhase::GameOver]),
    (GamePhase::GameOver, &[]),
];

const MAX_ROUND: u32 = rules::MISSION_COUNT as u32;

/// Outcome of a structural check
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationReport {
    pub valid: bool,
    pub errors: Vec<String>,
}

impl ValidationReport {
    fn from_errors(errors: Vec<String>) -> Self {
        Self {
            valid: errors.is_empty(),
            errors,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct GameStateMachine {
    state: GameState,
}

impl GameStateMachine {
    /// Fresh machine in the lobby
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild a machine from a snapshot, refusing structurally invalid state
    pub fn from_state(state: GameState) -> GameResult<Self> {
        let report = Self::validate_game_state(&state);
        if !report.valid {
            return Err(GameError::InvalidState(report.errors));
        }
        Ok(Self { state })
    }

    /// Rebuild a machine from untyped state received over the network or loaded from storage
    pub fn from_wire(value: Value) -> GameResult<Self> {
        let report = Self::validate_wire_state(&value);
        if !report.valid {
            return Err(GameError::InvalidState(report.errors));
        }
        let state: GameState = serde_json::from_value(value)?;
        Self::from_state(state)
    }

    /// Phases reachable in one hop from `phase`
    pub fn allowed_transitions(phase: GamePhase) -> &'static [GamePhase] {
        TRANSITIONS
            .iter()
            .find(|(from, _)| *from == phase)
            .map(|(_, to)| *to)
            .unwrap_or(&[])
    }

    pub fn current_phase(&self) -> GamePhase {
        self.state.phase
    }

    /// Read-only view of the state
    pub fn state(&self) -> &GameState {
        &self.state
    }

    /// Owned snapshot of the state
    pub fn game_state(&self) -> GameState {
        self.state.clone()
    }

    pub fn can_transition_to(&self, target: GamePhase) -> bool {
        Self::allowed_transitions(self.state.phase).contains(&target)
    }

    pub fn valid_next_phases(&self) -> BTreeSet<GamePhase> {
        Self::allowed_transitions(self.state.phase)
            .iter()
            .copied()
            .collect()
    }

    /// Move to `target` if the table allows it; returns false and leaves
    /// the state untouched otherwise.
    pub fn transition_to(&mut self, target: GamePhase) -> bool {
        let from = self.state.phase;
        if !self.can_transition_to(target) {
            tracing::warn!(%from, to = %target, "Rejected phase transition");
            return false;
        }

        match (from, target) {
            (_, GamePhase::RoleReveal) if self.state.started_at.is_none() => {
                self.state.started_at = Some(Utc::now());
                self.state.round = 1;
                self.state.leader_index = 0;
            }
            (GamePhase::MissionResult, GamePhase::Voting) => {
                // Next round
                self.state.round = (self.state.round + 1).min(MAX_ROUND);
                self.state.votes.clear();
                self.state.rejected_proposals = 0;
            }
            _ => {}
        }

        self.state.phase = target;
        tracing::debug!(%from, to = %target, round = self.state.round, "Phase transition");
        true
    }

    /// Like [`transition_to`](Self::transition_to), but reports an illegal move as an error
    pub fn try_transition(&mut self, target: GamePhase) -> GameResult<()> {
        let from = self.state.phase;
        if self.transition_to(target) {
            Ok(())
        } else {
            Err(GameError::IllegalTransition { from, to: target })
        }
    }

    /// Structural checks on a typed state; every violated rule is reported
    pub fn validate_game_state(state: &GameState) -> ValidationReport {
        let mut errors = Vec::new();

        if state.round > MAX_ROUND {
            errors.push(format!("Invalid round: {}", state.round));
        }
        if state.phase != GamePhase::Lobby && state.started_at.is_none() {
            errors.push("Game must have startedAt timestamp after lobby phase".to_string());
        }
        if state.missions.len() > rules::MISSION_COUNT {
            errors.push(format!("Too many missions: {}", state.missions.len()));
        }

        ValidationReport::from_errors(errors)
    }

    /// Structural checks on untyped state, before it is trusted enough to deserialize
    pub fn validate_wire_state(value: &Value) -> ValidationReport {
        let mut errors = Vec::new();

        let phase = value.get("phase").unwrap_or(&Value::Null);
        let parsed_phase = phase.as_str().and_then(|s| s.parse::<GamePhase>().ok());
        if parsed_phase.is_none() {
            errors.push(format!("Invalid phase: {}", display_value(phase)));
        }

        let round = value.get("round").unwrap_or(&Value::Null);
        match round.as_i64() {
            Some(r) if (0..=i64::from(MAX_ROUND)).contains(&r) => {}
            _ => errors.push(format!("Invalid round: {}", display_value(round))),
        }

        let leader_index = value.get("leaderIndex").unwrap_or(&Value::Null);
        match leader_index.as_i64() {
            Some(i) if i >= 0 => {}
            _ => errors.push(format!(
                "Invalid leader index: {}",
                display_value(leader_index)
            )),
        }

        let has_started_at = value.get("startedAt").is_some_and(|v| !v.is_null());
        if parsed_phase != Some(GamePhase::Lobby) && !has_started_at {
            errors.push("Game must have startedAt timestamp after lobby phase".to_string());
        }

        if let Some(missions) = value.get("missions").and_then(Value::as_array) {
            if missions.len() > rules::MISSION_COUNT {
                errors.push(format!("Too many missions: {}", missions.len()));
            }
        }

        ValidationReport::from_errors(errors)
    }

    fn ensure_undecided(&self) -> GameResult<()> {
        if self.state.winner.is_some() {
            return Err(GameError::GameAlreadyDecided);
        }
        Ok(())
    }

    fn require_phase(&self, phase: GamePhase, action: &'static str) -> GameResult<()> {
        if self.state.phase != phase {
            return Err(GameError::WrongPhase {
                action,
                phase: self.state.phase,
            });
        }
        Ok(())
    }

    fn current_mission_mut(&mut self) -> Option<&mut Mission> {
        let round = self.state.round;
        self.state.missions.iter_mut().find(|m| m.round == round)
    }

    /// A proposed team is waiting for its approval vote
    pub fn has_open_proposal(&self) -> bool {
        self.state.phase == GamePhase::Voting
            && self
                .state
                .current_mission()
                .is_some_and(|m| m.outcome.is_none() && !m.team_members.is_empty())
    }

    /// Record the leader's team for the current round.
    ///
    /// Replaces an earlier rejected team for the same round; a mission that
    /// already has an outcome is never replaced. From
    /// `missionSelect` the machine moves back to `voting`.
    pub fn propose_team(
        &mut self,
        team_size: u32,
        members: BTreeSet<PlayerId>,
    ) -> GameResult<Mission> {
        self.ensure_undecided()?;
        match self.state.phase {
            GamePhase::Voting if self.has_open_proposal() => {
                return Err(GameError::InvalidTeam(
                    "a team is already up for a vote".to_string(),
                ));
            }
            GamePhase::Voting | GamePhase::MissionSelect => {}
            phase => {
                return Err(GameError::WrongPhase {
                    action: "propose a team",
                    phase,
                })
            }
        }
        if members.len() != team_size as usize {
            return Err(GameError::InvalidTeam(format!(
                "mission {} needs {} members, got {}",
                self.state.round,
                team_size,
                members.len()
            )));
        }

        let round = self.state.round;
        let existing = self.state.missions.iter().position(|m| m.round == round);
        let mission = match existing {
            Some(index) if self.state.missions[index].outcome.is_some() => {
                return Err(GameError::InvalidTeam(format!(
                    "mission {} has already been played",
                    round
                )));
            }
            Some(index) => {
                let mission = &mut self.state.missions[index];
                mission.team_size = team_size;
                mission.team_members = members;
                mission.votes.clear();
                mission.outcome = None;
                mission.clone()
            }
            None => {
                if self.state.missions.len() >= rules::MISSION_COUNT {
                    return Err(GameError::InvalidState(vec![format!(
                        "Too many missions: {}",
                        self.state.missions.len() + 1
                    )]));
                }
                let mission = Mission {
                    id: ulid::Ulid::new().to_string(),
                    round,
                    team_size,
                    team_members: members,
                    votes: Vec::new(),
                    outcome: None,
                };
                self.state.missions.push(mission.clone());
                mission
            }
        };
        self.state.votes.clear();

        if self.state.phase == GamePhase::MissionSelect {
            self.try_transition(GamePhase::Voting)?;
        }
        Ok(mission)
    }

    pub fn record_team_vote(&mut self, vote: Vote) -> GameResult<()> {
        self.ensure_undecided()?;
        self.require_phase(GamePhase::Voting, "vote on a team")?;
        if !self.has_open_proposal() {
            return Err(GameError::InvalidTeam(
                "no team has been proposed yet".to_string(),
            ));
        }
        if self.state.votes.iter().any(|v| v.player_id == vote.player_id) {
            return Err(GameError::AlreadyVoted(vote.player_id));
        }
        self.state.votes.push(vote);
        Ok(())
    }

    /// Close the approval vote. An approved team goes on its mission;
    /// a rejected one passes leadership on and returns to team selection.
    pub fn resolve_team_vote(&mut self, player_count: usize) -> GameResult<bool> {
        self.require_phase(GamePhase::Voting, "close the team vote")?;
        let approved = rules::team_vote_passes(&self.state.votes);
        if approved {
            self.try_transition(GamePhase::MissionVote)?;
            self.state.rejected_proposals = 0;
        } else {
            self.try_transition(GamePhase::MissionSelect)?;
            if let Some(mission) = self.current_mission_mut() {
                mission.team_members.clear();
            }
            self.state.rejected_proposals += 1;
            self.rotate_leader(player_count);
        }
        Ok(approved)
    }

    pub fn record_mission_vote(&mut self, vote: MissionVote) -> GameResult<()> {
        self.require_phase(GamePhase::MissionVote, "vote on a mission")?;
        let mission = self
            .current_mission_mut()
            .ok_or_else(|| GameError::InvalidTeam("no team is on a mission".to_string()))?;
        if !mission.team_members.contains(&vote.player_id) {
            return Err(GameError::NotOnTeam(vote.player_id));
        }
        if mission.votes.iter().any(|v| v.player_id == vote.player_id) {
            return Err(GameError::AlreadyVoted(vote.player_id));
        }
        mission.votes.push(vote);
        Ok(())
    }

    /// Score the current mission and move to `missionResult`
    pub fn settle_mission(&mut self, player_count: usize) -> GameResult<MissionOutcome> {
        self.require_phase(GamePhase::MissionVote, "settle a mission")?;
        let round = self.state.round;
        let mission = self
            .current_mission_mut()
            .ok_or_else(|| GameError::InvalidTeam("no team is on a mission".to_string()))?;
        let outcome = rules::evaluate_mission(player_count, round, &mission.votes);
        mission.outcome = Some(outcome);
        self.try_transition(GamePhase::MissionResult)?;
        Ok(outcome)
    }

    pub fn record_assassin_attempt(&mut self, attempt: AssassinAttempt) -> GameResult<()> {
        self.require_phase(GamePhase::AssassinAttempt, "attempt an assassination")?;
        let winner = if attempt.succeeded {
            Team::Evil
        } else {
            Team::Good
        };
        self.state.assassin_attempt = Some(attempt);
        self.finish(winner)
    }

    /// End the game in favor of `winner`
    pub fn finish(&mut self, winner: Team) -> GameResult<()> {
        self.try_transition(GamePhase::GameOver)?;
        self.state.winner = Some(winner);
        Ok(())
    }

    /// Record a winner without leaving the current phase
    pub fn declare_winner(&mut self, winner: Team) {
        self.state.winner = Some(winner);
    }

    pub fn rotate_leader(&mut self, player_count: usize) {
        if player_count > 0 {
            self.state.leader_index = (self.state.leader_index + 1) % player_count;
        }
    }
}

fn display_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => "undefined".to_string(),
        other => other.to_string(),
    }
}
