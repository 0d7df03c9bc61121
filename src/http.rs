use std::str::FromStr;
use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::routing::{delete, get, post};
use axum::{Json, Router};
use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

use crate::data::GameMode;
use crate::db::Db;
use crate::error::AppError;
use crate::ledger::{self, DeletedGame, SingleOutcome, TeamOutcome};
use crate::stats::{self, GameSummary, PlayerStats, RankedPlayer};

const DEFAULT_RECENT_GAMES: usize = 10;

pub fn router(db: Arc<Db>) -> Router {
	Router::new()
		.route("/saveSingle", post(save_single))
		.route("/saveTeam", post(save_team))
		.route("/players", get(players))
		.route("/stats", get(player_stats))
		.route("/recentGames", get(recent_games))
		.route("/deleteGame/:mode/:id", delete(delete_game))
		.with_state(db)
}

#[derive(Debug, Deserialize)]
struct SaveSingleRequest {
	winner: Option<String>,
	loser: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SaveTeamRequest {
	winner_attack: Option<String>,
	winner_defense: Option<String>,
	loser_attack: Option<String>,
	loser_defense: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RecentGamesParams {
	limit: Option<usize>,
}

#[derive(Debug, Serialize)]
struct SaveResponse<T> {
	success: bool,
	message: &'static str,
	ratings: T,
}

#[derive(Debug, Serialize)]
struct DeleteResponse {
	message: &'static str,
	game: DeletedGame,
}

fn submission_date() -> String {
	Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

async fn save_single(
	State(db): State<Arc<Db>>,
	Json(request): Json<SaveSingleRequest>,
) -> Result<Json<SaveResponse<SingleOutcome>>, AppError> {
	let ratings = ledger::record_single(
		&db,
		request.winner.as_deref().unwrap_or(""),
		request.loser.as_deref().unwrap_or(""),
		&submission_date(),
	)?;

	Ok(Json(SaveResponse {
		success: true,
		message: "Saved successfully!",
		ratings,
	}))
}

async fn save_team(
	State(db): State<Arc<Db>>,
	Json(request): Json<SaveTeamRequest>,
) -> Result<Json<SaveResponse<TeamOutcome>>, AppError> {
	let ratings = ledger::record_team(
		&db,
		request.winner_attack.as_deref().unwrap_or(""),
		request.winner_defense.as_deref().unwrap_or(""),
		request.loser_attack.as_deref().unwrap_or(""),
		request.loser_defense.as_deref().unwrap_or(""),
		&submission_date(),
	)?;

	Ok(Json(SaveResponse {
		success: true,
		message: "Saved successfully!",
		ratings,
	}))
}

async fn players(State(db): State<Arc<Db>>) -> Result<Json<Vec<RankedPlayer>>, AppError> {
	Ok(Json(stats::leaderboard(&db)?))
}

async fn player_stats(State(db): State<Arc<Db>>) -> Result<Json<Vec<PlayerStats>>, AppError> {
	Ok(Json(stats::player_stats(&db)?))
}

async fn recent_games(
	State(db): State<Arc<Db>>,
	Query(params): Query<RecentGamesParams>,
) -> Result<Json<Vec<GameSummary>>, AppError> {
	let limit = params.limit.unwrap_or(DEFAULT_RECENT_GAMES);

	Ok(Json(stats::recent_games(&db, limit)?))
}

async fn delete_game(
	State(db): State<Arc<Db>>,
	Path((mode, id)): Path<(String, i64)>,
) -> Result<Json<DeleteResponse>, AppError> {
	let mode = GameMode::from_str(&mode).map_err(|_| AppError::UnknownGameType(mode))?;
	let game = ledger::delete_game(&db, mode, id)?;

	Ok(Json(DeleteResponse {
		message: "Game deleted successfully",
		game,
	}))
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::data::RatingChange;

	#[test]
	fn save_response_uses_the_wire_casing() {
		let response = SaveResponse {
			success: true,
			message: "Saved successfully!",
			ratings: SingleOutcome {
				winner: RatingChange::new("Alice", 1200, 1220),
				loser: RatingChange::new("Bob", 1200, 1180),
			},
		};

		let json = serde_json::to_value(&response).unwrap();
		assert_eq!(json["success"], true);
		assert_eq!(json["ratings"]["winner"]["oldRating"], 1200);
		assert_eq!(json["ratings"]["winner"]["newRating"], 1220);
		assert_eq!(json["ratings"]["loser"]["change"], -20);
	}

	#[test]
	fn submission_dates_are_utc_and_sortable() {
		let date = submission_date();
		assert!(date.ends_with('Z'));
		assert!(date.len() == "2026-08-07T12:00:00.000Z".len());
	}
}
