use skillratings::elo::{expected_score as elo_expected_score, EloRating};
use skillratings::Outcomes;

/// Rating every player starts from.
pub const DEFAULT_RATING: i64 = 1200;

/// Games below which a player is still considered provisional.
const PROVISIONAL_GAMES: i64 = 20;

/// Logistic expectation of `rating` scoring against `opponent`,
/// `1 / (1 + 10^((opponent - rating) / 400))`.
pub fn expected_score(rating: i64, opponent: i64) -> f64 {
	let (expected, _) = elo_expected_score(
		&EloRating {
			rating: rating as f64,
		},
		&EloRating {
			rating: opponent as f64,
		},
	);
	expected
}

/// 40 below twenty recorded games, 20 from then on; team games scale the
/// result by 0.75 since an individual only partly owns the outcome.
pub fn k_factor(games_played: i64, team_game: bool) -> f64 {
	let base = if games_played < PROVISIONAL_GAMES {
		40.0
	} else {
		20.0
	};

	if team_game {
		base * 0.75
	} else {
		base
	}
}

/// Post-game rating: `current + K * (score - expected)`, rounded half away
/// from zero to an integer. No floor or ceiling applies.
pub fn new_rating(
	current: i64,
	opponent: i64,
	outcome: Outcomes,
	games_played: i64,
	team_game: bool,
) -> i64 {
	let score = match outcome {
		Outcomes::WIN => 1.0,
		Outcomes::DRAW => 0.5,
		Outcomes::LOSS => 0.0,
	};

	let k = k_factor(games_played, team_game);
	let updated = current as f64 + k * (score - expected_score(current, opponent));

	updated.round() as i64
}

/// Rounded mean of a team's two ratings, the single opponent value seen by
/// both members of the other team.
pub fn team_average(a: i64, b: i64) -> i64 {
	((a + b) as f64 / 2.0).round() as i64
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn expectations_sum_to_one() {
		for (a, b) in [(1200, 1200), (1340, 1180), (900, 2100), (1500, 1499)] {
			let total = expected_score(a, b) + expected_score(b, a);
			assert!((total - 1.0).abs() < 1e-9, "{a} vs {b} summed to {total}");
		}
	}

	#[test]
	fn equal_ratings_expect_half() {
		assert!((expected_score(1200, 1200) - 0.5).abs() < 1e-9);
	}

	#[test]
	fn new_player_win_and_loss_move_twenty() {
		assert_eq!(new_rating(1200, 1200, Outcomes::WIN, 0, false), 1220);
		assert_eq!(new_rating(1200, 1200, Outcomes::LOSS, 0, false), 1180);
	}

	#[test]
	fn k_factor_drops_at_twenty_games() {
		assert_eq!(k_factor(19, false), 40.0);
		assert_eq!(k_factor(20, false), 20.0);
		assert_eq!(new_rating(1200, 1200, Outcomes::WIN, 19, false), 1220);
		assert_eq!(new_rating(1200, 1200, Outcomes::WIN, 20, false), 1210);
	}

	#[test]
	fn team_games_dampen_k() {
		assert_eq!(k_factor(0, true), 30.0);
		assert_eq!(k_factor(25, true), 15.0);
		assert_eq!(new_rating(1200, 1200, Outcomes::WIN, 0, true), 1215);
		assert_eq!(new_rating(1200, 1200, Outcomes::LOSS, 0, true), 1185);
	}

	#[test]
	fn underdog_gains_more_than_favorite() {
		let favorite = new_rating(1300, 1200, Outcomes::WIN, 0, true);
		let underdog = new_rating(1100, 1200, Outcomes::WIN, 0, true);
		assert_eq!(favorite, 1311);
		assert_eq!(underdog, 1119);
	}

	#[test]
	fn team_average_rounds_to_integer() {
		assert_eq!(team_average(1200, 1200), 1200);
		assert_eq!(team_average(1300, 1100), 1200);
		assert_eq!(team_average(1201, 1200), 1201);
	}
}
