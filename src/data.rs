use std::fmt;
use std::str::FromStr;

use rusqlite::{params, Connection, OptionalExtension, Result, Row};
use serde::Serialize;

use crate::elo::DEFAULT_RATING;

#[derive(Debug, Clone)]
pub struct Player {
	pub id: i64,
	pub name: String,
	pub rating: i64,
	pub games_played: i64,
}

impl Player {
	pub(crate) fn from_row(row: &Row<'_>) -> Result<Self> {
		Ok(Self {
			id: row.get(0)?,
			name: row.get(1)?,
			rating: row.get(2)?,
			games_played: row.get(3)?,
		})
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum GameMode {
	Single,
	Team,
}

impl fmt::Display for GameMode {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Self::Single => f.write_str("single"),
			Self::Team => f.write_str("team"),
		}
	}
}

impl FromStr for GameMode {
	type Err = ();

	fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
		match s {
			"single" => Ok(Self::Single),
			"team" => Ok(Self::Team),
			_ => Err(()),
		}
	}
}

/// Rating movement of one participant in one recorded game.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RatingChange {
	pub name: String,
	pub old_rating: i64,
	pub new_rating: i64,
	pub change: i64,
}

impl RatingChange {
	pub fn new(name: &str, old_rating: i64, new_rating: i64) -> Self {
		Self {
			name: name.to_string(),
			old_rating,
			new_rating,
			change: new_rating - old_rating,
		}
	}
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SingleGame {
	pub id: i64,
	pub date: String,
	pub winner: String,
	pub loser: String,
	pub winner_rating_before: i64,
	pub winner_rating_after: i64,
	pub loser_rating_before: i64,
	pub loser_rating_after: i64,
}

impl SingleGame {
	pub(crate) fn from_row(row: &Row<'_>) -> Result<Self> {
		Ok(Self {
			id: row.get(0)?,
			date: row.get(1)?,
			winner: row.get(2)?,
			loser: row.get(3)?,
			winner_rating_before: row.get(4)?,
			winner_rating_after: row.get(5)?,
			loser_rating_before: row.get(6)?,
			loser_rating_after: row.get(7)?,
		})
	}
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TeamGame {
	pub id: i64,
	pub date: String,
	pub winner_attack: String,
	pub winner_defense: String,
	pub loser_attack: String,
	pub loser_defense: String,
	pub winner_attack_rating_before: i64,
	pub winner_attack_rating_after: i64,
	pub winner_defense_rating_before: i64,
	pub winner_defense_rating_after: i64,
	pub loser_attack_rating_before: i64,
	pub loser_attack_rating_after: i64,
	pub loser_defense_rating_before: i64,
	pub loser_defense_rating_after: i64,
}

impl TeamGame {
	pub(crate) fn from_row(row: &Row<'_>) -> Result<Self> {
		Ok(Self {
			id: row.get(0)?,
			date: row.get(1)?,
			winner_attack: row.get(2)?,
			winner_defense: row.get(3)?,
			loser_attack: row.get(4)?,
			loser_defense: row.get(5)?,
			winner_attack_rating_before: row.get(6)?,
			winner_attack_rating_after: row.get(7)?,
			winner_defense_rating_before: row.get(8)?,
			winner_defense_rating_after: row.get(9)?,
			loser_attack_rating_before: row.get(10)?,
			loser_attack_rating_after: row.get(11)?,
			loser_defense_rating_before: row.get(12)?,
			loser_defense_rating_after: row.get(13)?,
		})
	}
}

/// Case-insensitive lookup; `players.name` carries the NOCASE collation.
pub fn find_player(conn: &Connection, name: &str) -> Result<Option<Player>> {
	let mut stmt = conn.prepare(
		"SELECT id, name, rating, games_played FROM players WHERE name = ?1;",
	)?;

	stmt.query_row([name], Player::from_row).optional()
}

/// Returns the existing player for `name`, creating one at the default
/// rating on first sight. The stored casing wins over the caller's: a later
/// "ALICE" still resolves to the row registered as "Alice". Two submissions
/// racing on a brand-new name both land on the unique constraint, so the
/// insert loser reselects instead of failing.
pub fn resolve_player(conn: &Connection, name: &str) -> Result<Player> {
	if let Some(player) = find_player(conn, name)? {
		return Ok(player);
	}

	let inserted = conn.execute(
		"INSERT INTO players (name, rating, games_played) VALUES (?1, ?2, 0);",
		params![name, DEFAULT_RATING],
	);
	match inserted {
		Ok(_) => {}
		Err(err) if is_unique_violation(&err) => {}
		Err(err) => return Err(err),
	}

	find_player(conn, name)?.ok_or(rusqlite::Error::QueryReturnedNoRows)
}

fn is_unique_violation(err: &rusqlite::Error) -> bool {
	matches!(
		err,
		rusqlite::Error::SqliteFailure(e, _) if e.code == rusqlite::ErrorCode::ConstraintViolation
	)
}

pub fn find_single_game(conn: &Connection, id: i64) -> Result<Option<SingleGame>> {
	let mut stmt = conn.prepare(
		"SELECT id, date, winner, loser,
		        winner_rating_before, winner_rating_after,
		        loser_rating_before, loser_rating_after
		 FROM single_game_results
		 WHERE id = ?1;",
	)?;

	stmt.query_row([id], SingleGame::from_row).optional()
}

pub fn find_team_game(conn: &Connection, id: i64) -> Result<Option<TeamGame>> {
	let mut stmt = conn.prepare(
		"SELECT id, date, winner_attack, winner_defense, loser_attack, loser_defense,
		        winner_attack_rating_before, winner_attack_rating_after,
		        winner_defense_rating_before, winner_defense_rating_after,
		        loser_attack_rating_before, loser_attack_rating_after,
		        loser_defense_rating_before, loser_defense_rating_after
		 FROM team_game_results
		 WHERE id = ?1;",
	)?;

	stmt.query_row([id], TeamGame::from_row).optional()
}
