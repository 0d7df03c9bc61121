use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use rusqlite::Connection;
use tracing::info;

use crate::error::AppError;

/// Migrations embedded at compile time, applied in filename order.
const MIGRATIONS: &[(&str, &str)] = &[
	(
		"0001_create_players.sql",
		include_str!("../migrations/0001_create_players.sql"),
	),
	(
		"0002_create_game_results.sql",
		include_str!("../migrations/0002_create_game_results.sql"),
	),
	(
		"0003_add_game_indexes.sql",
		include_str!("../migrations/0003_add_game_indexes.sql"),
	),
];

/// Handle on the league database. The connection sits behind a mutex so the
/// handle can be shared across request handlers; every multi-step operation
/// additionally runs inside its own SQLite transaction.
pub struct Db {
	conn: Mutex<Connection>,
}

impl Db {
	pub fn open(path: impl AsRef<Path>) -> Result<Self, AppError> {
		let conn = Connection::open(path)?;
		Self::initialize_connection(&conn)?;

		Ok(Self {
			conn: Mutex::new(conn),
		})
	}

	#[cfg(test)]
	pub fn in_memory() -> Result<Self, AppError> {
		let conn = Connection::open_in_memory()?;
		Self::initialize_connection(&conn)?;

		Ok(Self {
			conn: Mutex::new(conn),
		})
	}

	fn initialize_connection(conn: &Connection) -> Result<(), AppError> {
		conn.execute_batch("PRAGMA journal_mode = WAL; PRAGMA foreign_keys = ON;")?;
		Ok(())
	}

	/// A poisoned lock means another thread panicked mid-operation; nothing
	/// sound is left to recover.
	pub(crate) fn lock(&self) -> MutexGuard<'_, Connection> {
		self.conn.lock().unwrap()
	}

	/// Applies pending migrations and returns how many ran. Each migration
	/// commits together with its `schema_migrations` bookkeeping row, so a
	/// failed migration leaves neither behind. Safe to run repeatedly.
	pub fn migrate(&self) -> Result<usize, AppError> {
		let mut conn = self.lock();

		conn.execute(
			"CREATE TABLE IF NOT EXISTS schema_migrations (
				id             INTEGER PRIMARY KEY AUTOINCREMENT,
				migration_name TEXT    NOT NULL
				                       UNIQUE,
				applied_at     TEXT    NOT NULL
				                       DEFAULT CURRENT_TIMESTAMP
			);",
			[],
		)?;

		let mut applied = 0;
		for &(name, sql) in MIGRATIONS {
			let already_applied: bool = conn.query_row(
				"SELECT EXISTS (SELECT 1 FROM schema_migrations WHERE migration_name = ?1);",
				[name],
				|row| row.get(0),
			)?;
			if already_applied {
				continue;
			}

			let tx = conn.transaction()?;
			tx.execute_batch(sql)?;
			tx.execute(
				"INSERT INTO schema_migrations (migration_name) VALUES (?1);",
				[name],
			)?;
			tx.commit()?;

			info!(migration = name, "applied migration");
			applied += 1;
		}

		Ok(applied)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn migrate_applies_once() {
		let db = Db::in_memory().unwrap();
		assert_eq!(db.migrate().unwrap(), MIGRATIONS.len());
		assert_eq!(db.migrate().unwrap(), 0);

		let recorded: i64 = db
			.lock()
			.query_row("SELECT COUNT(*) FROM schema_migrations;", [], |row| {
				row.get(0)
			})
			.unwrap();
		assert_eq!(recorded, MIGRATIONS.len() as i64);
	}

	#[test]
	fn migrate_creates_the_ledger_tables() {
		let db = Db::in_memory().unwrap();
		db.migrate().unwrap();

		let conn = db.lock();
		for table in ["players", "single_game_results", "team_game_results"] {
			let found: bool = conn
				.query_row(
					"SELECT EXISTS (SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = ?1);",
					[table],
					|row| row.get(0),
				)
				.unwrap();
			assert!(found, "missing table {table}");
		}
	}

	#[test]
	fn open_initializes_a_fresh_file() {
		let dir = tempfile::tempdir().unwrap();
		let path = dir.path().join("league.db");

		let db = Db::open(&path).unwrap();
		assert_eq!(db.migrate().unwrap(), MIGRATIONS.len());
		drop(db);

		// Reopening finds the schema already in place.
		let db = Db::open(&path).unwrap();
		assert_eq!(db.migrate().unwrap(), 0);
	}
}
