mod cli;
mod data;
mod db;
mod elo;
mod error;
mod http;
mod ledger;
mod stats;

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use cli::Cli;
use db::Db;
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
	tracing_subscriber::fmt()
		.with_env_filter(
			EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
		)
		.init();

	let cli = Cli::parse();

	let db = Db::open(&cli.database)
		.with_context(|| format!("could not open database at {}", cli.database.display()))?;
	let applied = db.migrate().context("running migrations")?;
	info!(applied, database = %cli.database.display(), "database ready");

	let app = http::router(Arc::new(db));
	let addr = SocketAddr::from(([0, 0, 0, 0], cli.port));
	let listener = TcpListener::bind(addr)
		.await
		.with_context(|| format!("could not bind {addr}"))?;
	info!(%addr, "listening");

	axum::serve(listener, app).await.context("server error")?;

	Ok(())
}
