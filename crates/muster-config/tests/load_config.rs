// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use std::time::Duration;

use muster_config::{load_config_with_file, ConfigError, SnapshotTarget};

fn write_config(contents: &str) -> (tempfile::TempDir, std::path::PathBuf) {
	let dir = tempfile::tempdir().unwrap();
	let path = dir.path().join("server.toml");
	std::fs::write(&path, contents).unwrap();
	(dir, path)
}

#[test]
fn full_file_loads() {
	let (_dir, path) = write_config(
		r#"
[http]
host = "127.0.0.1"
port = 8443
base_url = "https://muster.example.com"

[database]
url = "sqlite:/var/lib/muster/muster.db"

[discord]
client_id = "1100000000000000000"
client_secret = "client-secret"
redirect_uri = "https://muster.example.com/callback"
bot_token = "bot-token"

[provisioning]
pacing_interval_ms = 1500

[provisioning.quotas]
bronze = 5

[snapshot]
backend = "file"
path = "/var/lib/muster/snapshot.json"
interval_secs = 120

[admin]
api_token = "operator-token"

[logging]
level = "debug"
"#,
	);

	let config = load_config_with_file(&path).unwrap();

	assert_eq!(config.socket_addr(), "127.0.0.1:8443");
	assert_eq!(config.http.base_url, "https://muster.example.com");
	assert_eq!(config.database.url, "sqlite:/var/lib/muster/muster.db");
	assert_eq!(config.discord.bot_token.expose(), "bot-token");
	assert_eq!(config.provisioning.pacing_interval, Duration::from_millis(1500));
	assert_eq!(config.provisioning.quotas.bronze, 5);
	assert_eq!(config.snapshot.interval, Duration::from_secs(120));
	match &config.snapshot.target {
		SnapshotTarget::File { path } => {
			assert_eq!(path.to_str(), Some("/var/lib/muster/snapshot.json"))
		}
		other => panic!("unexpected snapshot target: {other:?}"),
	}
	assert_eq!(config.admin.api_token.unwrap().expose(), "operator-token");
	assert_eq!(config.logging.level, "debug");
}

#[test]
fn github_backend_without_token_is_rejected() {
	let (_dir, path) = write_config(
		r#"
[discord]
client_id = "1"
client_secret = "s"
redirect_uri = "https://muster.example.com/callback"
bot_token = "b"

[snapshot]
backend = "github"

[snapshot.github]
owner = "acme"
repo = "vault"
"#,
	);

	let err = load_config_with_file(&path).unwrap_err();
	assert!(matches!(err, ConfigError::Validation(_)));
}

#[test]
fn malformed_file_is_a_parse_error() {
	let (_dir, path) = write_config("[discord\n");
	assert!(matches!(
		load_config_with_file(&path),
		Err(ConfigError::TomlParse { .. })
	));
}
