use super::AppState;
use crate::error::{GameError, GameResult};
use crate::types::*;
use serde::{Deserialize, Serialize};

/// What one player learns when characters are revealed
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RoleReveal {
    pub character: Character,
    pub team: Team,
    /// Players this character knows to be evil
    pub known_evil: Vec<PlayerId>,
    /// For Percival: Merlin and Morgana, indistinguishable
    pub merlin_candidates: Vec<PlayerId>,
}

fn ids_where(players: &[Player], me: &str, pred: impl Fn(Character) -> bool) -> Vec<PlayerId> {
    let mut ids: Vec<PlayerId> = players
        .iter()
        .filter(|p| p.id != me)
        .filter(|p| p.character.is_some_and(&pred))
        .map(|p| p.id.clone())
        .collect();
    ids.sort();
    ids
}

pub(crate) fn reveal_for(players: &[Player], player: &Player) -> Option<RoleReveal> {
    let character = player.character?;
    let me = player.id.as_str();

    let known_evil = match character {
        Character::Merlin => ids_where(players, me, |c| {
            c.team() == Team::Evil && c != Character::Mordred
        }),
        Character::Oberon => Vec::new(),
        c if c.team() == Team::Evil => ids_where(players, me, |c| {
            c.team() == Team::Evil && c != Character::Oberon
        }),
        _ => Vec::new(),
    };
    let merlin_candidates = if character == Character::Percival {
        ids_where(players, me, |c| {
            matches!(c, Character::Merlin | Character::Morgana)
        })
    } else {
        Vec::new()
    };

    Some(RoleReveal {
        character,
        team: character.team(),
        known_evil,
        merlin_candidates,
    })
}

impl AppState {
    /// Private role information for one player, available once the game has started
    pub async fn role_reveal(&self, room_id: &str, player_id: &str) -> GameResult<RoleReveal> {
        let rooms = self.rooms.read().await;
        let room = rooms
            .get(room_id)
            .ok_or_else(|| GameError::RoomNotFound(room_id.to_string()))?;

        let phase = room.phase();
        if phase == GamePhase::Lobby {
            return Err(GameError::WrongPhase {
                action: "reveal roles",
                phase,
            });
        }
        let player = room.player(player_id)?;
        reveal_for(&room.players, player)
            .ok_or_else(|| GameError::PlayerNotFound(player_id.to_string()))
    }
}
