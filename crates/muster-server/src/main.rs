// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Muster server binary.

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use muster_config::{ServerConfig, SnapshotTarget};
use muster_db::{CredentialRepository, CredentialStore};
use muster_discord::{DiscordGuildClient, DiscordOAuthClient, DiscordOAuthConfig};
use muster_jobs::JobScheduler;
use muster_provisioning::{BatchJoinOrchestrator, ExclusionList, ProvisioningSettings};
use muster_server::{create_router, AppState};
use muster_snapshot::{
	FileSnapshotSink, GitHubSnapshotConfig, GitHubSnapshotSink, RestoreOutcome, SnapshotJob,
	SnapshotService, SnapshotSink,
};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Muster - bulk Discord membership provisioning.
#[derive(Parser, Debug)]
#[command(name = "muster-server", about = "Bulk membership provisioning server", version)]
struct Args {
	/// Path to a TOML config file (defaults to /etc/muster/server.toml)
	#[arg(long, env = "MUSTER_CONFIG")]
	config: Option<PathBuf>,

	#[command(subcommand)]
	command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
	/// Show version information
	Version,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
	let args = Args::parse();

	if let Some(Command::Version) = args.command {
		println!("muster-server {}", env!("CARGO_PKG_VERSION"));
		return Ok(());
	}

	dotenvy::dotenv().ok();

	let config = match &args.config {
		Some(path) => muster_config::load_config_with_file(path)?,
		None => muster_config::load_config()?,
	};

	tracing_subscriber::registry()
		.with(
			tracing_subscriber::EnvFilter::try_from_default_env()
				.unwrap_or_else(|_| config.logging.level.clone().into()),
		)
		.with(tracing_subscriber::fmt::layer())
		.init();

	tracing::info!(
		host = %config.http.host,
		port = config.http.port,
		database = %config.database.url,
		"starting muster-server"
	);

	if config.admin.api_token.is_none() {
		tracing::warn!("no admin API token configured; operator API will reject every request");
	}

	let pool = muster_db::create_pool(&config.database.url).await?;
	muster_db::run_migrations(&pool).await?;
	let store: Arc<dyn CredentialStore> = Arc::new(CredentialRepository::new(pool));

	let http_client = muster_discord::http::new_client()?;

	let mut oauth_config = DiscordOAuthConfig::new(
		config.discord.client_id.clone(),
		config.discord.client_secret.clone(),
		config.discord.redirect_uri.clone(),
	)
	.with_api_base(config.discord.api_base.clone());
	oauth_config.scopes = config.discord.scopes.clone();
	oauth_config.validate()?;
	let oauth = Arc::new(DiscordOAuthClient::with_http_client(
		oauth_config,
		http_client.clone(),
	));

	let guild = Arc::new(DiscordGuildClient::with_http_client(
		http_client.clone(),
		config.discord.api_base.clone(),
		config.discord.bot_token.clone(),
	));

	let exclusions = Arc::new(ExclusionList::new());

	let snapshot = match snapshot_sink(&config, http_client) {
		Some(sink) => {
			let service = Arc::new(SnapshotService::new(
				store.clone(),
				exclusions.clone(),
				sink,
			));
			match service.restore().await? {
				RestoreOutcome::Restored {
					records,
					excluded,
					kept_local,
				} => {
					tracing::info!(
						records,
						excluded,
						kept_local,
						sink = service.sink_name(),
						"restored snapshot"
					);
				}
				RestoreOutcome::Empty => {
					tracing::info!(sink = service.sink_name(), "no snapshot found, starting fresh");
				}
			}
			Some(service)
		}
		None => {
			tracing::info!("credential snapshots disabled");
			None
		}
	};

	let orchestrator = Arc::new(BatchJoinOrchestrator::new(
		store.clone(),
		oauth.clone(),
		guild,
		exclusions,
		ProvisioningSettings {
			pacing_interval: config.provisioning.pacing_interval,
			quotas: config.provisioning.quotas,
		},
	));

	let mut scheduler = JobScheduler::new();
	if let Some(service) = &snapshot {
		scheduler.register_periodic(
			Arc::new(SnapshotJob::new(service.clone())),
			config.snapshot.interval,
		);
	}
	let scheduler = Arc::new(scheduler);
	scheduler.start().await;

	let state = AppState {
		orchestrator,
		store,
		oauth,
		scheduler: Some(scheduler.clone()),
		admin_token: config.admin.api_token.clone(),
	};

	let app = create_router(state).layer(TraceLayer::new_for_http());

	let addr = config.socket_addr();
	tracing::info!("listening on {}", addr);
	let listener = tokio::net::TcpListener::bind(&addr).await?;

	tokio::select! {
		result = axum::serve(listener, app) => {
			if let Err(e) = result {
				tracing::error!(error = %e, "Server error");
			}
		}
		_ = tokio::signal::ctrl_c() => {
			tracing::info!("Received shutdown signal");
		}
	}

	tracing::info!("Shutting down job scheduler...");
	scheduler.shutdown().await;

	if let Some(service) = snapshot {
		match service.backup().await {
			Ok(outcome) => tracing::info!(?outcome, "final snapshot"),
			Err(e) => tracing::error!(error = %e, "final snapshot failed"),
		}
	}

	tracing::info!("Server shutdown complete");
	Ok(())
}

fn snapshot_sink(config: &ServerConfig, http_client: reqwest::Client) -> Option<Arc<dyn SnapshotSink>> {
	match &config.snapshot.target {
		SnapshotTarget::Disabled => None,
		SnapshotTarget::File { path } => Some(Arc::new(FileSnapshotSink::new(path.clone()))),
		SnapshotTarget::GitHub(gh) => {
			let mut sink_config =
				GitHubSnapshotConfig::new(gh.owner.clone(), gh.repo.clone(), gh.token.clone());
			sink_config.branch = gh.branch.clone();
			sink_config.path = gh.path.clone();
			sink_config.api_base = gh.api_base.clone();
			Some(Arc::new(GitHubSnapshotSink::new(sink_config, http_client)))
		}
	}
}
