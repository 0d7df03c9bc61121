use std::path::PathBuf;

use clap::Parser;

#[derive(Parser)]
#[command(author, version, long_about = None)]
pub struct Cli {
	/// League database file, created on first run.
	#[arg(short, long, value_name = "FILE", default_value = "league.db")]
	pub database: PathBuf,

	/// Port to listen on.
	#[arg(short, long, default_value_t = 3000)]
	pub port: u16,
}
