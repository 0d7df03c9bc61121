use rusqlite::{params, Transaction};
use serde::Serialize;
use skillratings::Outcomes;

use crate::data::{
	find_single_game, find_team_game, resolve_player, GameMode, Player, RatingChange,
	SingleGame, TeamGame,
};
use crate::db::Db;
use crate::elo;
use crate::error::AppError;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SingleOutcome {
	pub winner: RatingChange,
	pub loser: RatingChange,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TeamOutcome {
	pub winner_attack: RatingChange,
	pub winner_defense: RatingChange,
	pub loser_attack: RatingChange,
	pub loser_defense: RatingChange,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum DeletedGame {
	Single(SingleGame),
	Team(TeamGame),
}

fn required_name(name: &str) -> Result<&str, AppError> {
	let trimmed = name.trim();
	if trimmed.is_empty() {
		return Err(AppError::MissingName);
	}

	Ok(trimmed)
}

/// Records a 1v1 result: snapshot both players, compute both new ratings
/// from the pre-game snapshots, persist the game row, then apply the
/// updates. One transaction; a failure anywhere leaves nothing behind.
pub fn record_single(
	db: &Db,
	winner: &str,
	loser: &str,
	date: &str,
) -> Result<SingleOutcome, AppError> {
	let winner = required_name(winner)?;
	let loser = required_name(loser)?;

	let mut conn = db.lock();
	let tx = conn.transaction()?;

	// Both snapshots are read before any write, so neither update can feed
	// the other player's expectation.
	let winner_player = resolve_player(&tx, winner)?;
	let loser_player = resolve_player(&tx, loser)?;

	let winner_new = elo::new_rating(
		winner_player.rating,
		loser_player.rating,
		Outcomes::WIN,
		winner_player.games_played,
		false,
	);
	let loser_new = elo::new_rating(
		loser_player.rating,
		winner_player.rating,
		Outcomes::LOSS,
		loser_player.games_played,
		false,
	);

	tx.execute(
		"INSERT INTO single_game_results (
			date, winner, loser,
			winner_rating_before, winner_rating_after,
			loser_rating_before, loser_rating_after
		)
		VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7);",
		params![
			date,
			winner,
			loser,
			winner_player.rating,
			winner_new,
			loser_player.rating,
			loser_new
		],
	)?;

	apply_result(&tx, &winner_player, winner_new)?;
	apply_result(&tx, &loser_player, loser_new)?;

	tx.commit()?;

	Ok(SingleOutcome {
		winner: RatingChange::new(&winner_player.name, winner_player.rating, winner_new),
		loser: RatingChange::new(&loser_player.name, loser_player.rating, loser_new),
	})
}

/// Records a 2v2 result. Every player is rated individually against the
/// rounded average of the opposing pair, with their own K-factor.
pub fn record_team(
	db: &Db,
	winner_attack: &str,
	winner_defense: &str,
	loser_attack: &str,
	loser_defense: &str,
	date: &str,
) -> Result<TeamOutcome, AppError> {
	let winner_attack = required_name(winner_attack)?;
	let winner_defense = required_name(winner_defense)?;
	let loser_attack = required_name(loser_attack)?;
	let loser_defense = required_name(loser_defense)?;

	let mut conn = db.lock();
	let tx = conn.transaction()?;

	let wa = resolve_player(&tx, winner_attack)?;
	let wd = resolve_player(&tx, winner_defense)?;
	let la = resolve_player(&tx, loser_attack)?;
	let ld = resolve_player(&tx, loser_defense)?;

	let winning_average = elo::team_average(wa.rating, wd.rating);
	let losing_average = elo::team_average(la.rating, ld.rating);

	let wa_new = elo::new_rating(wa.rating, losing_average, Outcomes::WIN, wa.games_played, true);
	let wd_new = elo::new_rating(wd.rating, losing_average, Outcomes::WIN, wd.games_played, true);
	let la_new = elo::new_rating(la.rating, winning_average, Outcomes::LOSS, la.games_played, true);
	let ld_new = elo::new_rating(ld.rating, winning_average, Outcomes::LOSS, ld.games_played, true);

	tx.execute(
		"INSERT INTO team_game_results (
			date, winner_attack, winner_defense, loser_attack, loser_defense,
			winner_attack_rating_before, winner_attack_rating_after,
			winner_defense_rating_before, winner_defense_rating_after,
			loser_attack_rating_before, loser_attack_rating_after,
			loser_defense_rating_before, loser_defense_rating_after
		)
		VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13);",
		params![
			date,
			winner_attack,
			winner_defense,
			loser_attack,
			loser_defense,
			wa.rating,
			wa_new,
			wd.rating,
			wd_new,
			la.rating,
			la_new,
			ld.rating,
			ld_new
		],
	)?;

	apply_result(&tx, &wa, wa_new)?;
	apply_result(&tx, &wd, wd_new)?;
	apply_result(&tx, &la, la_new)?;
	apply_result(&tx, &ld, ld_new)?;

	tx.commit()?;

	Ok(TeamOutcome {
		winner_attack: RatingChange::new(&wa.name, wa.rating, wa_new),
		winner_defense: RatingChange::new(&wd.name, wd.rating, wd_new),
		loser_attack: RatingChange::new(&la.name, la.rating, la_new),
		loser_defense: RatingChange::new(&ld.name, ld.rating, ld_new),
	})
}

/// Deletes a recorded game and undoes its effect on every participant by
/// replaying the stored snapshot in reverse. The inverse is local: games
/// recorded after the deleted one keep the snapshots they were written
/// with. Returns the deleted row for confirmation.
pub fn delete_game(db: &Db, mode: GameMode, id: i64) -> Result<DeletedGame, AppError> {
	let mut conn = db.lock();
	let tx = conn.transaction()?;

	let deleted = match mode {
		GameMode::Single => {
			let game =
				find_single_game(&tx, id)?.ok_or(AppError::GameNotFound { mode, id })?;
			tx.execute("DELETE FROM single_game_results WHERE id = ?1;", [id])?;

			revert_result(
				&tx,
				&game.winner,
				game.winner_rating_after - game.winner_rating_before,
			)?;
			revert_result(
				&tx,
				&game.loser,
				game.loser_rating_after - game.loser_rating_before,
			)?;

			DeletedGame::Single(game)
		}
		GameMode::Team => {
			let game =
				find_team_game(&tx, id)?.ok_or(AppError::GameNotFound { mode, id })?;
			tx.execute("DELETE FROM team_game_results WHERE id = ?1;", [id])?;

			revert_result(
				&tx,
				&game.winner_attack,
				game.winner_attack_rating_after - game.winner_attack_rating_before,
			)?;
			revert_result(
				&tx,
				&game.winner_defense,
				game.winner_defense_rating_after - game.winner_defense_rating_before,
			)?;
			revert_result(
				&tx,
				&game.loser_attack,
				game.loser_attack_rating_after - game.loser_attack_rating_before,
			)?;
			revert_result(
				&tx,
				&game.loser_defense,
				game.loser_defense_rating_after - game.loser_defense_rating_before,
			)?;

			DeletedGame::Team(game)
		}
	};

	tx.commit()?;

	Ok(deleted)
}

fn apply_result(tx: &Transaction<'_>, player: &Player, new_rating: i64) -> rusqlite::Result<()> {
	tx.execute(
		"UPDATE players
		 SET rating = ?1,
		     games_played = games_played + 1,
		     updated_at = CURRENT_TIMESTAMP
		 WHERE id = ?2;",
		params![new_rating, player.id],
	)?;

	Ok(())
}

fn revert_result(tx: &Transaction<'_>, name: &str, change: i64) -> rusqlite::Result<()> {
	// games_played never drops below zero, even on hand-imported rows.
	tx.execute(
		"UPDATE players
		 SET rating = rating - ?1,
		     games_played = MAX(games_played - 1, 0),
		     updated_at = CURRENT_TIMESTAMP
		 WHERE name = ?2;",
		params![change, name],
	)?;

	Ok(())
}
