use std::sync::Arc;

use gateway::{CredentialSource, GatewayApi, GatewayConfig};
use remote::{ObjectStore, RcloneStore};

#[tokio::main]
async fn main() {
    // Load environment variables from .env file
    let _ = dotenv::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    // Optional port as the first CLI argument, overriding ALD_PORT
    let port_override = match std::env::args().nth(1) {
        Some(raw) => match raw.parse::<u16>() {
            Ok(port) => Some(port),
            Err(_) => {
                eprintln!("Invalid port argument: {}", raw);
                std::process::exit(1);
            }
        },
        None => None,
    };

    let (config, source) = match GatewayConfig::from_env(port_override) {
        Ok(loaded) => loaded,
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            std::process::exit(1);
        }
    };

    let store = RcloneStore::new(config.remote.clone());

    // Fail fast when the remote is not configured in rclone, instead of
    // failing every request later.
    match store.check_remote().await {
        Ok(true) => {}
        Ok(false) => {
            eprintln!("Error: remote '{}' not found in rclone", store.remote());
            eprintln!("Available remotes:");
            match RcloneStore::list_remotes().await {
                Ok(remotes) if !remotes.is_empty() => {
                    for remote in remotes {
                        eprintln!("  {}", remote);
                    }
                }
                _ => eprintln!("  (none)"),
            }
            std::process::exit(1);
        }
        Err(e) => {
            eprintln!("Failed to query rclone remotes: {}", e);
            eprintln!("Is rclone installed and on PATH?");
            std::process::exit(1);
        }
    }

    if let Ok(entries) = store.list("").await {
        if entries.is_empty() {
            tracing::warn!(
                "remote {} lists empty at the root; check the rclone configuration",
                store.remote()
            );
        }
    }

    match source {
        CredentialSource::Generated => {
            if let Some(credential) = &config.credential {
                println!("Generated credentials (set ALD_USERNAME/ALD_PASSWORD to override):");
                println!("  username: {}", credential.username);
                println!("  password: {}", credential.password);
            }
        }
        CredentialSource::Disabled => {
            println!("Authentication disabled (ALD_NO_AUTH): serving to any client");
        }
        CredentialSource::Explicit => {}
    }

    println!("Serving {} on http://{}", store.remote(), config.bind_addr());
    println!("Add the address to your media player (Infuse: Other/Network Share)");
    println!("Press Ctrl+C to stop");

    let api = GatewayApi::new(config, Arc::new(store));
    if let Err(e) = api.serve().await {
        eprintln!("Server error: {}", e);
        std::process::exit(1);
    }
}
