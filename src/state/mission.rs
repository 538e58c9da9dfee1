use super::{room_mut, AppState};
use crate::error::{GameError, GameResult};
use crate::rules::{self, MAX_REJECTED_PROPOSALS};
use crate::types::*;
use std::collections::BTreeSet;

impl AppState {
    /// Current leader proposes a team for this round's mission
    pub async fn propose_team(
        &self,
        room_id: &str,
        player_id: &str,
        members: Vec<PlayerId>,
    ) -> GameResult<Mission> {
        let mut rooms = self.rooms.write().await;
        let room = room_mut(&mut rooms, room_id)?;
        room.player(player_id)?;

        let leader = room.leader().map(|p| p.id.as_str());
        if leader != Some(player_id) {
            return Err(GameError::NotLeader);
        }

        let requested = members.len();
        let team: BTreeSet<PlayerId> = members.into_iter().collect();
        if team.len() != requested {
            return Err(GameError::InvalidTeam("duplicate team members".to_string()));
        }
        if let Some(stranger) = team.iter().find(|id| room.player(id).is_err()) {
            return Err(GameError::InvalidTeam(format!(
                "{} is not in this room",
                stranger
            )));
        }

        let round = room.machine.state().round;
        let team_size = rules::mission_team_size(room.players.len(), round).ok_or(
            GameError::WrongPhase {
                action: "propose a team",
                phase: room.phase(),
            },
        )?;
        let mission = room.machine.propose_team(team_size, team)?;
        tracing::info!(room_id, round, leader = player_id, team = ?mission.team_members, "Team proposed");

        self.broadcast_state(room);
        Ok(mission)
    }

    /// Approve or reject the proposed team. The vote closes when every player has voted.
    pub async fn cast_team_vote(
        &self,
        room_id: &str,
        player_id: &str,
        approve: bool,
    ) -> GameResult<GameState> {
        let mut rooms = self.rooms.write().await;
        let room = room_mut(&mut rooms, room_id)?;
        room.player(player_id)?;

        let vote = if approve {
            VoteChoice::Approve
        } else {
            VoteChoice::Reject
        };
        room.machine.record_team_vote(Vote {
            player_id: player_id.to_string(),
            vote,
        })?;

        let player_count = room.players.len();
        if room.machine.state().votes.len() == player_count {
            let approved = room.machine.resolve_team_vote(player_count)?;
            let rejected = room.machine.state().rejected_proposals;
            tracing::info!(room_id, approved, rejected, "Team vote closed");

            if !approved && rejected >= MAX_REJECTED_PROPOSALS {
                room.machine.declare_winner(Team::Evil);
                tracing::info!(room_id, "Too many rejected teams, evil wins");
            }
        }

        self.broadcast_state(room);
        Ok(room.machine.game_state())
    }

    /// Succeed or fail the mission. Loyal characters can only succeed.
    pub async fn cast_mission_vote(
        &self,
        room_id: &str,
        player_id: &str,
        success: bool,
    ) -> GameResult<GameState> {
        let mut rooms = self.rooms.write().await;
        let room = room_mut(&mut rooms, room_id)?;

        let player = room.player(player_id)?;
        let phase = room.phase();
        if phase != GamePhase::MissionVote {
            return Err(GameError::WrongPhase {
                action: "vote on a mission",
                phase,
            });
        }
        if !success && player.team() == Some(Team::Good) {
            return Err(GameError::GoodCannotFail);
        }
        let vote = if success {
            MissionChoice::Success
        } else {
            MissionChoice::Fail
        };
        room.machine.record_mission_vote(MissionVote {
            player_id: player_id.to_string(),
            vote,
        })?;

        let team_complete = room
            .machine
            .state()
            .current_mission()
            .is_some_and(|m| m.votes.len() == m.team_members.len());
        if team_complete {
            let outcome = room.machine.settle_mission(room.players.len())?;
            tracing::info!(
                room_id,
                succeeded = outcome.succeeded,
                fail_votes = outcome.fail_votes,
                "Mission settled"
            );
        }

        self.broadcast_state(room);
        Ok(room.machine.game_state())
    }

    /// The Assassin names the player they believe is Merlin
    pub async fn assassinate(
        &self,
        room_id: &str,
        player_id: &str,
        target_id: &str,
    ) -> GameResult<GameState> {
        let mut rooms = self.rooms.write().await;
        let room = room_mut(&mut rooms, room_id)?;

        let phase = room.phase();
        if phase != GamePhase::AssassinAttempt {
            return Err(GameError::WrongPhase {
                action: "attempt an assassination",
                phase,
            });
        }
        if room.player(player_id)?.character != Some(Character::Assassin) {
            return Err(GameError::NotAssassin);
        }
        let target = room
            .player(target_id)
            .map_err(|_| GameError::InvalidTarget(target_id.to_string()))?;
        if target.team() != Some(Team::Good) {
            return Err(GameError::InvalidTarget(target_id.to_string()));
        }

        let succeeded = target.character == Some(Character::Merlin);
        room.machine.record_assassin_attempt(AssassinAttempt {
            assassin_id: player_id.to_string(),
            target_id: target_id.to_string(),
            succeeded,
        })?;
        tracing::info!(room_id, target_id, succeeded, "Assassination attempted");

        self.broadcast_state(room);
        Ok(room.machine.game_state())
    }
}
