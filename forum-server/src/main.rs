use clap::{Parser, ValueEnum};
use forum_core::{IdentityResolver, MessageStore, StoreError};
use forum_hub::{
    ConfigError, Hub, ServerConfig, ServerConfigBuilder,
    http::{AppState, PassthroughResolver, router},
};
use forum_store::InMemoryMessageStore;
use std::{net::SocketAddr, path::PathBuf, sync::Arc};
use tracing::{error, info, warn};

mod shutdown;

use shutdown::shutdown_signal;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum LogFormat {
    Json,
    Text,
}

#[derive(Parser, Debug)]
#[command(name = "forum-server", version)]
#[command(about = "Forum chat hub: WebSocket chat with presence and history")]
struct Cli {
    /// Listen address (overrides FORUM_BIND_ADDR)
    #[arg(long)]
    bind: Option<SocketAddr>,

    /// SQLite database file (overrides FORUM_DATABASE_PATH)
    #[arg(long)]
    database: Option<PathBuf>,

    /// Log output format
    #[arg(long, value_enum, default_value = "json")]
    log_format: LogFormat,

    /// Accept the session id itself as the identity. Development only.
    #[arg(long)]
    trust_session_as_identity: bool,
}

#[derive(Debug, thiserror::Error)]
enum ServerError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("Failed to open message store: {0}")]
    Store(#[from] StoreError),

    #[error("No session source: set a database path or pass --trust-session-as-identity")]
    NoSessionSource,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Message store plus the session lookup connections authenticate through
struct Backends {
    store: Arc<dyn MessageStore>,
    sessions: Option<Arc<dyn IdentityResolver>>,
}

type InitError = Box<dyn std::error::Error + Send + Sync + 'static>;

fn try_init_tracing(format: LogFormat) -> Result<(), InitError> {
    let env_filter = tracing_subscriber::EnvFilter::from_default_env();
    let env_filter = match "info".parse() {
        Ok(directive) => env_filter.add_directive(directive),
        Err(_) => env_filter,
    };

    let builder = tracing_subscriber::fmt().with_env_filter(env_filter);
    match format {
        LogFormat::Json => builder.json().try_init(),
        LogFormat::Text => builder.compact().try_init(),
    }
}

fn init_tracing(format: LogFormat) {
    if let Err(e) = try_init_tracing(format) {
        eprintln!("Failed to initialize logging: {e}");
    }
}

fn load_config(cli: &Cli) -> Result<ServerConfig, ConfigError> {
    let mut builder = ServerConfigBuilder::from_env()?;
    if let Some(addr) = cli.bind {
        builder = builder.bind_addr(addr);
    }
    if let Some(path) = &cli.database {
        builder = builder.database_path(path.clone());
    }
    builder.build()
}

#[cfg(feature = "sqlite")]
fn open_backends(config: &ServerConfig) -> Result<Backends, StoreError> {
    match &config.database_path {
        Some(path) => {
            info!(path = %path.display(), "Using SQLite message store and sessions");
            let store = forum_store::SqliteMessageStore::open(path)?;
            let sessions = forum_store::SqliteSessionResolver::new(&store);
            Ok(Backends {
                store: Arc::new(store),
                sessions: Some(Arc::new(sessions)),
            })
        }
        None => {
            info!("Using in-memory message store");
            Ok(Backends {
                store: Arc::new(InMemoryMessageStore::new()),
                sessions: None,
            })
        }
    }
}

#[cfg(not(feature = "sqlite"))]
fn open_backends(config: &ServerConfig) -> Result<Backends, StoreError> {
    if config.database_path.is_some() {
        warn!("Built without SQLite support, ignoring database path");
    }
    info!("Using in-memory message store");
    Ok(Backends {
        store: Arc::new(InMemoryMessageStore::new()),
        sessions: None,
    })
}

async fn run(cli: Cli) -> Result<(), ServerError> {
    let config = load_config(&cli)?;
    let Backends { store, sessions } = open_backends(&config)?;

    let identities: Arc<dyn IdentityResolver> = if cli.trust_session_as_identity {
        warn!("Session ids are trusted as identities; do not use in production");
        Arc::new(PassthroughResolver)
    } else {
        sessions.ok_or(ServerError::NoSessionSource)?
    };

    let hub = Hub::new(config.hub.clone(), store);
    let state = AppState::new(hub, identities).with_history_max_limit(config.history_max_limit);
    let app = router(state, config.enable_cors);

    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;
    info!(
        addr = %config.bind_addr,
        queue_capacity = config.hub.outbound_queue_capacity,
        duplicate_login = ?config.hub.duplicate_login,
        "Forum chat server listening"
    );

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    info!("Server stopped");
    Ok(())
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_tracing(cli.log_format);

    if let Err(e) = run(cli).await {
        error!(error = %e, "Server failed");
        std::process::exit(1);
    }
}
