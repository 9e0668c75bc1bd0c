// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

//! Steward server binary.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use steward_server::{cookies, create_app_state, create_router, version};
use steward_server_config::LogFormat;
use steward_server_db::PostgrestStore;
use steward_server_gotrue::GoTrueClient;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Steward server - administration and impersonation over a hosted backend.
#[derive(Parser, Debug)]
#[command(name = "steward-server", about = "Steward administration server", version)]
struct Args {
	/// Path to a TOML config file (defaults to /etc/steward/server.toml)
	#[arg(long, env = "STEWARD_CONFIG")]
	config: Option<PathBuf>,

	#[command(subcommand)]
	command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
	/// Show version and build information
	Version,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
	let args = Args::parse();

	if let Some(Command::Version) = args.command {
		println!("{}", version::format_version_info());
		return Ok(());
	}

	dotenvy::dotenv().ok();

	let config = steward_server_config::load_config_with_file(args.config.as_deref())?;

	let json_logs = config.logging.format == LogFormat::Json;
	tracing_subscriber::registry()
		.with(
			tracing_subscriber::EnvFilter::try_from_default_env()
				.unwrap_or_else(|_| config.logging.level.clone().into()),
		)
		.with(json_logs.then(|| tracing_subscriber::fmt::layer().json()))
		.with((!json_logs).then(tracing_subscriber::fmt::layer))
		.init();

	tracing::info!(
		host = %config.http.host,
		port = config.http.port,
		backend = %config.backend.url,
		"starting steward-server"
	);

	let anon_key = config
		.backend
		.anon_key
		.clone()
		.ok_or("backend anon key is not configured")?;
	let service_role_key = config.backend.service_role_key.clone();
	if service_role_key.is_none() {
		tracing::warn!("no service-role key configured; admin operations will fail");
	}

	let provider = GoTrueClient::with_timeout(
		&config.backend.url,
		anon_key.clone(),
		service_role_key.clone(),
		config.backend.request_timeout(),
	)?;
	let store = PostgrestStore::with_timeout(
		&config.backend.url,
		service_role_key.unwrap_or(anon_key),
		config.backend.request_timeout(),
	)?;
	let cookie_key = cookies::cookie_key(config.session.cookie_secret.as_ref())?;

	let state = create_app_state(&config, Arc::new(provider), Arc::new(store), cookie_key);
	let app = create_router(state);

	let addr = config.http.bind_addr();
	tracing::info!("listening on {}", addr);

	let listener = tokio::net::TcpListener::bind(&addr).await?;

	tokio::select! {
		result = axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>()) => {
			if let Err(e) = result {
				tracing::error!(error = %e, "Server error");
			}
		}
		_ = tokio::signal::ctrl_c() => {
			tracing::info!("Received shutdown signal");
		}
	}

	tracing::info!("Server shutdown complete");
	Ok(())
}
