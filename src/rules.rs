//! Rule tables that depend only on the number of players.

use crate::config::GameConfig;
use crate::types::{
    Character, GamePhase, Mission, MissionChoice, MissionOutcome, MissionVote, Vote, VoteChoice,
};
use serde::{Deserialize, Serialize};

pub const MIN_PLAYERS: usize = 5;
pub const MAX_PLAYERS: usize = 10;
pub const MISSION_COUNT: usize = 5;
/// Missions one side must win to decide the game
pub const MISSIONS_TO_WIN: u32 = 3;
/// Consecutive rejected proposals that hand the game to evil
pub const MAX_REJECTED_PROPOSALS: u32 = 5;

/// Team size for each of the five missions.
///
/// Player counts outside 5..=10 fall back to the five-player table.
pub fn mission_team_sizes(player_count: usize) -> [u32; MISSION_COUNT] {
    match player_count {
        6 => [2, 3, 4, 3, 4],
        7 => [2, 3, 3, 4, 4],
        8..=10 => [3, 4, 4, 5, 5],
        _ => [2, 3, 2, 3, 3],
    }
}

/// Team size for a 1-based round, `None` outside 1..=5
pub fn mission_team_size(player_count: usize, round: u32) -> Option<u32> {
    let index = usize::try_from(round).ok()?.checked_sub(1)?;
    mission_team_sizes(player_count).get(index).copied()
}

/// Only the fourth mission with seven or more players needs two fails
pub fn mission_needs_two_fails(player_count: usize, mission_number: u32) -> bool {
    mission_number == 4 && player_count >= 7
}

pub fn fails_required(player_count: usize, mission_number: u32) -> u32 {
    if mission_needs_two_fails(player_count, mission_number) {
        2
    } else {
        1
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartCheck {
    pub can_start: bool,
    pub errors: Vec<String>,
}

pub fn can_start_game(player_count: usize) -> StartCheck {
    let mut errors = Vec::new();
    if player_count < MIN_PLAYERS {
        errors.push(format!(
            "Need at least {} players to start (currently {})",
            MIN_PLAYERS, player_count
        ));
    }
    if player_count > MAX_PLAYERS {
        errors.push(format!(
            "Too many players ({}), maximum is {}",
            player_count, MAX_PLAYERS
        ));
    }
    StartCheck {
        can_start: errors.is_empty(),
        errors,
    }
}

/// (good, evil) split for a supported player count
pub fn team_composition(player_count: usize) -> Option<(usize, usize)> {
    match player_count {
        5 => Some((3, 2)),
        6 => Some((4, 2)),
        7 => Some((4, 3)),
        8 => Some((5, 3)),
        9 => Some((6, 3)),
        10 => Some((6, 4)),
        _ => None,
    }
}

/// Characters to deal for a game, good side first.
///
/// Merlin and the Assassin are always in play; the optional characters
/// take evil seats in the order Morgana, Mordred, Oberon while seats remain.
pub fn characters_for(player_count: usize, config: &GameConfig) -> Option<Vec<Character>> {
    let (good, evil) = team_composition(player_count)?;

    let mut good_side = vec![Character::Merlin];
    if config.percival_and_morgana {
        good_side.push(Character::Percival);
    }
    good_side.resize(good, Character::LoyalServant);

    let mut evil_side = vec![Character::Assassin];
    let optional = [
        (config.percival_and_morgana, Character::Morgana),
        (config.mordred, Character::Mordred),
        (config.oberon, Character::Oberon),
    ];
    for (enabled, character) in optional {
        if enabled && evil_side.len() < evil {
            evil_side.push(character);
        }
    }
    evil_side.resize(evil, Character::Minion);

    good_side.extend(evil_side);
    Some(good_side)
}

/// Strict majority of approvals
pub fn team_vote_passes(votes: &[Vote]) -> bool {
    let approvals = votes
        .iter()
        .filter(|v| v.vote == VoteChoice::Approve)
        .count();
    approvals * 2 > votes.len()
}

pub fn evaluate_mission(
    player_count: usize,
    mission_number: u32,
    votes: &[MissionVote],
) -> MissionOutcome {
    let fail_votes = votes
        .iter()
        .filter(|v| v.vote == MissionChoice::Fail)
        .count() as u32;
    let fails_required = fails_required(player_count, mission_number);
    MissionOutcome {
        succeeded: fail_votes < fails_required,
        fail_votes,
        fails_required,
    }
}

/// Running score across settled missions
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MissionTally {
    pub successes: u32,
    pub failures: u32,
}

impl MissionTally {
    pub fn from_missions(missions: &[Mission]) -> Self {
        missions
            .iter()
            .filter_map(|m| m.outcome)
            .fold(Self::default(), |mut tally, outcome| {
                if outcome.succeeded {
                    tally.successes += 1;
                } else {
                    tally.failures += 1;
                }
                tally
            })
    }

    /// Phase that follows `missionResult` for this score
    pub fn next_phase(&self) -> GamePhase {
        if self.failures >= MISSIONS_TO_WIN {
            GamePhase::GameOver
        } else if self.successes >= MISSIONS_TO_WIN {
            GamePhase::AssassinAttempt
        } else {
            GamePhase::Voting
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Team, VoteChoice};

    fn mission_votes(fails: usize, successes: usize) -> Vec<MissionVote> {
        let fail = (0..fails).map(|i| MissionVote {
            player_id: format!("f{}", i),
            vote: MissionChoice::Fail,
        });
        let success = (0..successes).map(|i| MissionVote {
            player_id: format!("s{}", i),
            vote: MissionChoice::Success,
        });
        fail.chain(success).collect()
    }

    fn settled(round: u32, succeeded: bool) -> Mission {
        Mission {
            id: format!("m{}", round),
            round,
            team_size: 2,
            team_members: Default::default(),
            votes: Vec::new(),
            outcome: Some(MissionOutcome {
                succeeded,
                fail_votes: u32::from(!succeeded),
                fails_required: 1,
            }),
        }
    }

    #[test]
    fn test_mission_team_sizes_by_player_count() {
        assert_eq!(mission_team_sizes(5), [2, 3, 2, 3, 3]);
        assert_eq!(mission_team_sizes(6), [2, 3, 4, 3, 4]);
        assert_eq!(mission_team_sizes(7), [2, 3, 3, 4, 4]);
        assert_eq!(mission_team_sizes(8), [3, 4, 4, 5, 5]);
        assert_eq!(mission_team_sizes(9), mission_team_sizes(8));
        assert_eq!(mission_team_sizes(10), mission_team_sizes(8));
    }

    #[test]
    fn test_unsupported_counts_fall_back_to_five_player_table() {
        assert_eq!(mission_team_sizes(0), [2, 3, 2, 3, 3]);
        assert_eq!(mission_team_sizes(4), [2, 3, 2, 3, 3]);
        assert_eq!(mission_team_sizes(11), [2, 3, 2, 3, 3]);
    }

    #[test]
    fn test_mission_team_size_by_round() {
        assert_eq!(mission_team_size(7, 1), Some(2));
        assert_eq!(mission_team_size(7, 5), Some(4));
        assert_eq!(mission_team_size(7, 0), None);
        assert_eq!(mission_team_size(7, 6), None);
    }

    #[test]
    fn test_two_fail_rule() {
        assert!(mission_needs_two_fails(7, 4));
        assert!(mission_needs_two_fails(10, 4));
        assert!(!mission_needs_two_fails(6, 4));
        for mission in [1, 2, 3, 5] {
            assert!(!mission_needs_two_fails(7, mission));
        }
        assert_eq!(fails_required(8, 4), 2);
        assert_eq!(fails_required(8, 3), 1);
    }

    #[test]
    fn test_can_start_game_bounds() {
        let too_few = can_start_game(4);
        assert!(!too_few.can_start);
        assert_eq!(too_few.errors.len(), 1);
        assert!(too_few.errors[0].contains("at least 5 players"));
        assert!(too_few.errors[0].contains("currently 4"));

        let too_many = can_start_game(11);
        assert!(!too_many.can_start);
        assert_eq!(too_many.errors, vec!["Too many players (11), maximum is 10"]);

        for count in [5, 10] {
            let check = can_start_game(count);
            assert!(check.can_start);
            assert!(check.errors.is_empty());
        }
    }

    #[test]
    fn test_characters_match_team_composition() {
        let config = GameConfig {
            percival_and_morgana: true,
            mordred: true,
            oberon: true,
        };
        for count in MIN_PLAYERS..=MAX_PLAYERS {
            let characters = characters_for(count, &config).unwrap();
            let (good, evil) = team_composition(count).unwrap();
            assert_eq!(characters.len(), count);
            let evil_count = characters.iter().filter(|c| c.team() == Team::Evil).count();
            assert_eq!(evil_count, evil);
            assert_eq!(count - evil_count, good);
            assert!(characters.contains(&Character::Merlin));
            assert!(characters.contains(&Character::Assassin));
        }
        assert!(characters_for(4, &config).is_none());
    }

    #[test]
    fn test_optional_characters_limited_by_evil_seats() {
        let config = GameConfig {
            percival_and_morgana: true,
            mordred: true,
            oberon: true,
        };
        let five = characters_for(5, &config).unwrap();
        assert!(five.contains(&Character::Morgana));
        assert!(!five.contains(&Character::Mordred));
        assert!(!five.contains(&Character::Oberon));

        let ten = characters_for(10, &config).unwrap();
        assert!(ten.contains(&Character::Oberon));
        assert!(!ten.contains(&Character::Minion));
    }

    #[test]
    fn test_plain_game_uses_servants_and_minions() {
        let config = GameConfig {
            percival_and_morgana: false,
            mordred: false,
            oberon: false,
        };
        let characters = characters_for(7, &config).unwrap();
        assert_eq!(
            characters,
            vec![
                Character::Merlin,
                Character::LoyalServant,
                Character::LoyalServant,
                Character::LoyalServant,
                Character::Assassin,
                Character::Minion,
                Character::Minion,
            ]
        );
    }

    #[test]
    fn test_team_vote_needs_strict_majority() {
        let votes = |approve: usize, reject: usize| -> Vec<Vote> {
            (0..approve)
                .map(|_| VoteChoice::Approve)
                .chain((0..reject).map(|_| VoteChoice::Reject))
                .enumerate()
                .map(|(i, vote)| Vote {
                    player_id: format!("p{}", i),
                    vote,
                })
                .collect()
        };
        assert!(team_vote_passes(&votes(3, 2)));
        assert!(!team_vote_passes(&votes(3, 3)));
        assert!(!team_vote_passes(&votes(0, 0)));
    }

    #[test]
    fn test_fourth_mission_survives_one_fail_with_seven_players() {
        let outcome = evaluate_mission(7, 4, &mission_votes(1, 3));
        assert!(outcome.succeeded);
        assert_eq!(outcome.fails_required, 2);

        let outcome = evaluate_mission(7, 4, &mission_votes(2, 2));
        assert!(!outcome.succeeded);

        let outcome = evaluate_mission(6, 4, &mission_votes(1, 2));
        assert!(!outcome.succeeded);
    }

    #[test]
    fn test_tally_picks_next_phase() {
        let tally = MissionTally::from_missions(&[settled(1, true), settled(2, false)]);
        assert_eq!(tally, MissionTally { successes: 1, failures: 1 });
        assert_eq!(tally.next_phase(), GamePhase::Voting);

        let good = MissionTally::from_missions(&[
            settled(1, true),
            settled(2, false),
            settled(3, true),
            settled(4, true),
        ]);
        assert_eq!(good.next_phase(), GamePhase::AssassinAttempt);

        let evil = MissionTally::from_missions(&[
            settled(1, false),
            settled(2, false),
            settled(3, false),
        ]);
        assert_eq!(evil.next_phase(), GamePhase::GameOver);
    }
}
