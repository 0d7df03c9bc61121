use std::collections::BTreeMap;

use rusqlite::Connection;
use serde::Serialize;

use crate::data::{find_player, GameMode, SingleGame, TeamGame};
use crate::db::Db;
use crate::elo::DEFAULT_RATING;
use crate::error::AppError;

/// How many recent rating changes a player's history carries.
const HISTORY_LEN: usize = 5;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RankedPlayer {
	pub name: String,
	pub rating: i64,
	pub rank: usize,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerStats {
	pub name: String,
	pub rating: i64,
	pub games_played: i64,
	pub single_wins: i64,
	pub team_wins: i64,
	pub total_wins: i64,
	pub single_losses: i64,
	pub team_losses: i64,
	pub total_losses: i64,
	pub rating_history: Vec<i64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
	Attack,
	Defense,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum GameResult {
	Win,
	Loss,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ParticipantSummary {
	pub name: String,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub role: Option<Role>,
	pub result: GameResult,
	pub rating_before: i64,
	pub rating_after: i64,
	pub change: i64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GameSummary {
	pub id: i64,
	pub mode: GameMode,
	pub date: String,
	pub players: Vec<ParticipantSummary>,
}

const PARTICIPANT_NAMES_SQL: &str = "
	SELECT DISTINCT name FROM (
		SELECT LOWER(winner) AS name FROM single_game_results
		UNION
		SELECT LOWER(loser) FROM single_game_results
		UNION
		SELECT LOWER(winner_attack) FROM team_game_results
		UNION
		SELECT LOWER(winner_defense) FROM team_game_results
		UNION
		SELECT LOWER(loser_attack) FROM team_game_results
		UNION
		SELECT LOWER(loser_defense) FROM team_game_results
	) all_players
	ORDER BY name;";

const TEAM_WINS_SQL: &str = "
	SELECT name, SUM(wins) FROM (
		SELECT LOWER(winner_attack) AS name, COUNT(*) AS wins
		FROM team_game_results
		GROUP BY LOWER(winner_attack)
		UNION ALL
		SELECT LOWER(winner_defense), COUNT(*)
		FROM team_game_results
		GROUP BY LOWER(winner_defense)
	) combined
	GROUP BY name;";

const TEAM_LOSSES_SQL: &str = "
	SELECT name, SUM(losses) FROM (
		SELECT LOWER(loser_attack) AS name, COUNT(*) AS losses
		FROM team_game_results
		GROUP BY LOWER(loser_attack)
		UNION ALL
		SELECT LOWER(loser_defense), COUNT(*)
		FROM team_game_results
		GROUP BY LOWER(loser_defense)
	) combined
	GROUP BY name;";

const RATING_HISTORY_SQL: &str = "
	SELECT date, rating_change FROM (
		SELECT date,
		       CASE
		           WHEN LOWER(winner) = ?1 THEN winner_rating_after - winner_rating_before
		           WHEN LOWER(loser) = ?1 THEN loser_rating_after - loser_rating_before
		       END AS rating_change
		FROM single_game_results
		WHERE LOWER(winner) = ?1 OR LOWER(loser) = ?1

		UNION ALL

		SELECT date,
		       CASE
		           WHEN LOWER(winner_attack) = ?1 THEN winner_attack_rating_after - winner_attack_rating_before
		           WHEN LOWER(winner_defense) = ?1 THEN winner_defense_rating_after - winner_defense_rating_before
		           WHEN LOWER(loser_attack) = ?1 THEN loser_attack_rating_after - loser_attack_rating_before
		           WHEN LOWER(loser_defense) = ?1 THEN loser_defense_rating_after - loser_defense_rating_before
		       END
		FROM team_game_results
		WHERE LOWER(winner_attack) = ?1 OR LOWER(winner_defense) = ?1
		   OR LOWER(loser_attack) = ?1 OR LOWER(loser_defense) = ?1
	) all_games
	WHERE rating_change IS NOT NULL
	ORDER BY date DESC
	LIMIT ?2;";

/// Everyone who appears in any stored game, ordered by current rating.
/// Ratings come from the live player row; a name that only exists in game
/// rows falls back to the default. Equal ratings share a rank and the next
/// distinct rating skips past them.
pub fn leaderboard(db: &Db) -> Result<Vec<RankedPlayer>, AppError> {
	let conn = db.lock();

	let mut stmt = conn.prepare(PARTICIPANT_NAMES_SQL)?;
	let names = stmt
		.query_map([], |row| row.get::<_, String>(0))?
		.collect::<rusqlite::Result<Vec<_>>>()?;

	let mut players = Vec::with_capacity(names.len());
	for name in names {
		let rating = find_player(&conn, &name)?.map_or(DEFAULT_RATING, |p| p.rating);
		players.push((name, rating));
	}

	players.sort_by(|a, b| b.1.cmp(&a.1));

	let mut ranked = Vec::with_capacity(players.len());
	let mut rank = 0;
	let mut previous_rating = None;
	for (index, (name, rating)) in players.into_iter().enumerate() {
		if previous_rating != Some(rating) {
			rank = index + 1;
			previous_rating = Some(rating);
		}
		ranked.push(RankedPlayer {
			name: display_name(&name),
			rating,
			rank,
		});
	}

	Ok(ranked)
}

#[derive(Default)]
struct WinLossCounts {
	single_wins: i64,
	team_wins: i64,
	single_losses: i64,
	team_losses: i64,
}

/// Full per-player statistics: win/loss counts split by mode, live rating
/// and games played, and the recent rating history. Grouping is
/// case-insensitive on the lower-cased name.
pub fn player_stats(db: &Db) -> Result<Vec<PlayerStats>, AppError> {
	let conn = db.lock();
	let mut totals: BTreeMap<String, WinLossCounts> = BTreeMap::new();

	fold_counts(
		&conn,
		"SELECT LOWER(winner), COUNT(*) FROM single_game_results GROUP BY LOWER(winner);",
		&mut totals,
		|counts, n| counts.single_wins += n,
	)?;
	fold_counts(
		&conn,
		"SELECT LOWER(loser), COUNT(*) FROM single_game_results GROUP BY LOWER(loser);",
		&mut totals,
		|counts, n| counts.single_losses += n,
	)?;
	fold_counts(&conn, TEAM_WINS_SQL, &mut totals, |counts, n| {
		counts.team_wins += n
	})?;
	fold_counts(&conn, TEAM_LOSSES_SQL, &mut totals, |counts, n| {
		counts.team_losses += n
	})?;

	let mut stats = Vec::with_capacity(totals.len());
	for (name, counts) in totals {
		let (rating, games_played) = match find_player(&conn, &name)? {
			Some(player) => (player.rating, player.games_played),
			None => (DEFAULT_RATING, 0),
		};
		let rating_history = rating_history_for(&conn, &name)?;

		stats.push(PlayerStats {
			name: display_name(&name),
			rating,
			games_played,
			single_wins: counts.single_wins,
			team_wins: counts.team_wins,
			total_wins: counts.single_wins + counts.team_wins,
			single_losses: counts.single_losses,
			team_losses: counts.team_losses,
			total_losses: counts.single_losses + counts.team_losses,
			rating_history,
		});
	}

	// Stable, so players on equal ratings keep their alphabetical order.
	stats.sort_by(|a, b| b.rating.cmp(&a.rating));

	Ok(stats)
}

/// Most-recent-first view over both game tables.
pub fn recent_games(db: &Db, limit: usize) -> Result<Vec<GameSummary>, AppError> {
	let conn = db.lock();
	let mut games = Vec::new();

	let mut stmt = conn.prepare(
		"SELECT id, date, winner, loser,
		        winner_rating_before, winner_rating_after,
		        loser_rating_before, loser_rating_after
		 FROM single_game_results
		 ORDER BY date DESC
		 LIMIT ?1;",
	)?;
	let singles = stmt
		.query_map([limit as i64], SingleGame::from_row)?
		.collect::<rusqlite::Result<Vec<_>>>()?;
	for game in singles {
		games.push(single_summary(game));
	}

	let mut stmt = conn.prepare(
		"SELECT id, date, winner_attack, winner_defense, loser_attack, loser_defense,
		        winner_attack_rating_before, winner_attack_rating_after,
		        winner_defense_rating_before, winner_defense_rating_after,
		        loser_attack_rating_before, loser_attack_rating_after,
		        loser_defense_rating_before, loser_defense_rating_after
		 FROM team_game_results
		 ORDER BY date DESC
		 LIMIT ?1;",
	)?;
	let teams = stmt
		.query_map([limit as i64], TeamGame::from_row)?
		.collect::<rusqlite::Result<Vec<_>>>()?;
	for game in teams {
		games.push(team_summary(game));
	}

	games.sort_by(|a, b| b.date.cmp(&a.date));
	games.truncate(limit);

	Ok(games)
}

fn fold_counts(
	conn: &Connection,
	sql: &str,
	totals: &mut BTreeMap<String, WinLossCounts>,
	mut apply: impl FnMut(&mut WinLossCounts, i64),
) -> rusqlite::Result<()> {
	let mut stmt = conn.prepare(sql)?;
	let rows = stmt.query_map([], |row| {
		Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?))
	})?;

	for row in rows {
		let (name, count) = row?;
		apply(totals.entry(name).or_default(), count);
	}

	Ok(())
}

/// The player's most recent rating deltas, newest first, from whichever
/// slot they occupied in either game shape.
fn rating_history_for(conn: &Connection, name: &str) -> rusqlite::Result<Vec<i64>> {
	let key = name.trim().to_lowercase();

	let mut stmt = conn.prepare(RATING_HISTORY_SQL)?;
	let rows = stmt.query_map(rusqlite::params![key, HISTORY_LEN as i64], |row| {
		row.get::<_, i64>(1)
	})?;

	rows.collect()
}

fn single_summary(game: SingleGame) -> GameSummary {
	GameSummary {
		id: game.id,
		mode: GameMode::Single,
		date: game.date,
		players: vec![
			ParticipantSummary {
				name: game.winner,
				role: None,
				result: GameResult::Win,
				rating_before: game.winner_rating_before,
				rating_after: game.winner_rating_after,
				change: game.winner_rating_after - game.winner_rating_before,
			},
			ParticipantSummary {
				name: game.loser,
				role: None,
				result: GameResult::Loss,
				rating_before: game.loser_rating_before,
				rating_after: game.loser_rating_after,
				change: game.loser_rating_after - game.loser_rating_before,
			},
		],
	}
}

fn team_summary(game: TeamGame) -> GameSummary {
	GameSummary {
		id: game.id,
		mode: GameMode::Team,
		date: game.date,
		players: vec![
			ParticipantSummary {
				name: game.winner_attack,
				role: Some(Role::Attack),
				result: GameResult::Win,
				rating_before: game.winner_attack_rating_before,
				rating_after: game.winner_attack_rating_after,
				change: game.winner_attack_rating_after - game.winner_attack_rating_before,
			},
			ParticipantSummary {
				name: game.winner_defense,
				role: Some(Role::Defense),
				result: GameResult::Win,
				rating_before: game.winner_defense_rating_before,
				rating_after: game.winner_defense_rating_after,
				change: game.winner_defense_rating_after - game.winner_defense_rating_before,
			},
			ParticipantSummary {
				name: game.loser_attack,
				role: Some(Role::Attack),
				result: GameResult::Loss,
				rating_before: game.loser_attack_rating_before,
				rating_after: game.loser_attack_rating_after,
				change: game.loser_attack_rating_after - game.loser_attack_rating_before,
			},
			ParticipantSummary {
				name: game.loser_defense,
				role: Some(Role::Defense),
				result: GameResult::Loss,
				rating_before: game.loser_defense_rating_before,
				rating_after: game.loser_defense_rating_after,
				change: game.loser_defense_rating_after - game.loser_defense_rating_before,
			},
		],
	}
}

/// Lower-cased grouping key shown with its first letter capitalized.
fn display_name(lower: &str) -> String {
	let mut chars = lower.chars();
	match chars.next() {
		Some(first) => first.to_uppercase().chain(chars).collect(),
		None => String::new(),
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::ledger::{record_single, record_team};

	fn test_db() -> Db {
		let db = Db::in_memory().expect("in-memory database");
		db.migrate().expect("migrations");
		db
	}

	fn date(day: u8) -> String {
		format!("2026-04-{day:02}T12:00:00.000Z")
	}

	#[test]
	fn leaderboard_ranks_with_shared_places() {
		let db = test_db();
		record_single(&db, "Alice", "Bob", &date(1)).unwrap();
		record_single(&db, "Carol", "Dave", &date(2)).unwrap();

		let board = leaderboard(&db).unwrap();
		let summary: Vec<_> = board
			.iter()
			.map(|p| (p.name.as_str(), p.rating, p.rank))
			.collect();

		// Two winners tie at 1220, two losers tie at 1180; ties share a
		// rank and the next rating resumes at its position.
		assert_eq!(
			summary,
			vec![
				("Alice", 1220, 1),
				("Carol", 1220, 1),
				("Bob", 1180, 3),
				("Dave", 1180, 3),
			]
		);
	}

	#[test]
	fn leaderboard_keeps_players_known_only_from_game_rows() {
		let db = test_db();
		// A hand-imported game references players with no player row.
		db.lock()
			.execute(
				"INSERT INTO single_game_results (
					date, winner, loser,
					winner_rating_before, winner_rating_after,
					loser_rating_before, loser_rating_after
				)
				VALUES ('2026-04-01T12:00:00.000Z', 'ghost', 'phantom', 1200, 1220, 1200, 1180);",
				[],
			)
			.unwrap();

		let board = leaderboard(&db).unwrap();
		assert_eq!(board.len(), 2);
		assert!(board
			.iter()
			.all(|p| p.rating == DEFAULT_RATING && (p.name == "Ghost" || p.name == "Phantom")));
	}

	#[test]
	fn stats_split_wins_and_losses_by_mode() {
		let db = test_db();
		record_single(&db, "Alice", "Bob", &date(1)).unwrap();
		record_team(&db, "Alice", "Carol", "Bob", "Dave", &date(2)).unwrap();
		record_single(&db, "Bob", "ALICE", &date(3)).unwrap();

		let stats = player_stats(&db).unwrap();
		let alice = stats.iter().find(|p| p.name == "Alice").unwrap();

		assert_eq!(alice.single_wins, 1);
		assert_eq!(alice.team_wins, 1);
		assert_eq!(alice.total_wins, 2);
		assert_eq!(alice.single_losses, 1);
		assert_eq!(alice.team_losses, 0);
		assert_eq!(alice.total_losses, 1);
		assert_eq!(alice.games_played, 3);
		assert_eq!(alice.rating_history.len(), 3);

		// Ordered by rating, highest first.
		let ratings: Vec<_> = stats.iter().map(|p| p.rating).collect();
		let mut sorted = ratings.clone();
		sorted.sort_by(|a, b| b.cmp(a));
		assert_eq!(ratings, sorted);
	}

	#[test]
	fn history_keeps_the_five_most_recent_deltas() {
		let db = test_db();
		for day in 1..=6 {
			// Alternate winners so the deltas keep moving.
			if day % 2 == 0 {
				record_single(&db, "Alice", "Bob", &date(day)).unwrap();
			} else {
				record_single(&db, "Bob", "Alice", &date(day)).unwrap();
			}
		}

		let history = rating_history_for(&db.lock(), "alice").unwrap();
		assert_eq!(history.len(), HISTORY_LEN);

		// Newest first: day 6 was an Alice win, day 5 a loss.
		assert!(history[0] > 0);
		assert!(history[1] < 0);
	}

	#[test]
	fn history_is_case_insensitive_and_spans_both_modes() {
		let db = test_db();
		record_single(&db, "Alice", "Bob", &date(1)).unwrap();
		record_team(&db, "Carol", "Dave", "ALICE", "Bob", &date(2)).unwrap();

		let history = rating_history_for(&db.lock(), "Alice").unwrap();
		assert_eq!(history.len(), 2);
		assert!(history[0] < 0, "newest entry is the team loss");
		assert_eq!(history[1], 20);
	}

	#[test]
	fn recent_games_merge_both_modes_newest_first() {
		let db = test_db();
		record_single(&db, "Alice", "Bob", &date(1)).unwrap();
		record_team(&db, "Alice", "Carol", "Bob", "Dave", &date(2)).unwrap();
		record_single(&db, "Bob", "Alice", &date(3)).unwrap();

		let games = recent_games(&db, 10).unwrap();
		assert_eq!(games.len(), 3);
		assert_eq!(games[0].date, date(3));
		assert_eq!(games[1].mode, GameMode::Team);
		assert_eq!(games[2].date, date(1));

		let team = &games[1];
		assert_eq!(team.players.len(), 4);
		assert_eq!(team.players[0].role, Some(Role::Attack));
		assert_eq!(team.players[0].result, GameResult::Win);
		assert_eq!(team.players[3].role, Some(Role::Defense));
		assert_eq!(team.players[3].result, GameResult::Loss);

		let single = &games[2];
		assert_eq!(single.players.len(), 2);
		assert!(single.players[0].role.is_none());
		assert_eq!(single.players[0].change, 20);
		assert_eq!(single.players[1].change, -20);
	}

	#[test]
	fn recent_games_honor_the_limit() {
		let db = test_db();
		for day in 1..=4 {
			record_single(&db, "Alice", "Bob", &date(day)).unwrap();
		}

		let games = recent_games(&db, 2).unwrap();
		assert_eq!(games.len(), 2);
		assert_eq!(games[0].date, date(4));
		assert_eq!(games[1].date, date(3));
	}

	#[test]
	fn display_names_capitalize_the_first_letter() {
		assert_eq!(display_name("alice"), "Alice");
		assert_eq!(display_name(""), "");
	}
}
