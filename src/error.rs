use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;

use crate::data::GameMode;

/// Everything a request can fail with. The HTTP layer translates these to
/// status codes in exactly one place, `IntoResponse` below.
#[derive(Debug, Error)]
pub enum AppError {
	#[error("a name is required in all fields of a game")]
	MissingName,

	#[error("unknown game type: {0}")]
	UnknownGameType(String),

	#[error("no {mode} game with id {id}")]
	GameNotFound { mode: GameMode, id: i64 },

	#[error("database error: {0}")]
	Database(#[from] rusqlite::Error),
}

impl AppError {
	#[must_use]
	pub fn status_code(&self) -> StatusCode {
		match self {
			Self::MissingName | Self::UnknownGameType(_) => StatusCode::BAD_REQUEST,
			Self::GameNotFound { .. } => StatusCode::NOT_FOUND,
			Self::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
		}
	}
}

impl IntoResponse for AppError {
	fn into_response(self) -> Response {
		let status = self.status_code();
		// Database detail stays in the log, never in the response body.
		let message = match &self {
			Self::Database(err) => {
				tracing::error!(%err, "database failure");
				"internal server error".to_string()
			}
			other => other.to_string(),
		};
		(status, Json(json!({ "error": message }))).into_response()
	}
}
