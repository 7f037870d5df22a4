use api::{app, AppState};
use config::{AppConfig, LoggingConfig};
use database::Database;
use services::auth::mock::{InMemoryTokenRepository, InMemoryUserRepository, MockProviderClient};
use services::auth::{AuthService, GoogleOAuthClient, ProviderClient, TokenRepository, UserRepository};
use std::sync::Arc;
use tracing::{info, warn};

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    // Load configuration first to get logging settings
    let config = AppConfig::from_env().unwrap_or_else(|e| {
        eprintln!("Failed to load configuration: {}", e);
        std::process::exit(1);
    });

    init_tracing(&config.logging);

    let (provider, users, tokens): (
        Arc<dyn ProviderClient>,
        Arc<dyn UserRepository>,
        Arc<dyn TokenRepository>,
    ) = if config.auth.mock {
        warn!("AUTH_MOCK is set; using in-memory storage and a canned provider");
        (
            Arc::new(MockProviderClient::new()),
            Arc::new(InMemoryUserRepository::default()),
            Arc::new(InMemoryTokenRepository::default()),
        )
    } else {
        let database = Database::from_config(&config.database)
            .await
            .unwrap_or_else(|e| {
                tracing::error!(error = %e, "Failed to connect to database");
                std::process::exit(1);
            });

        database.run_migrations().await.unwrap_or_else(|e| {
            tracing::error!(error = %e, "Failed to run migrations");
            std::process::exit(1);
        });

        let provider = GoogleOAuthClient::new(config.google.clone()).unwrap_or_else(|e| {
            tracing::error!(error = %e, "Failed to build provider client");
            std::process::exit(1);
        });

        (
            Arc::new(provider),
            database.users.clone(),
            database.tokens.clone(),
        )
    };

    let auth = Arc::new(AuthService::new(
        provider,
        users,
        tokens,
        config.auth.clone(),
    ));
    let state = AppState {
        auth,
        auth_config: config.auth.clone(),
    };

    let bind_address = config.server.bind_address();
    let listener = tokio::net::TcpListener::bind(&bind_address)
        .await
        .unwrap_or_else(|e| {
            tracing::error!(error = %e, "Failed to bind {bind_address}");
            std::process::exit(1);
        });

    info!("Listening on {bind_address}");

    if let Err(e) = axum::serve(listener, app(state)).await {
        tracing::error!(error = %e, "Server exited with error");
        std::process::exit(1);
    }
}

fn init_tracing(logging_config: &LoggingConfig) {
    // Build the filter string from the logging configuration
    let mut filter = logging_config.level.clone();

    for (module, level) in &logging_config.modules {
        filter.push_str(&format!(",{}={}", module, level));
    }

    // Initialize tracing based on the format specified in config
    match logging_config.format.as_str() {
        "json" => {
            tracing_subscriber::fmt()
                .json()
                .with_env_filter(filter)
                .init();
        }
        "compact" => {
            tracing_subscriber::fmt()
                .compact()
                .with_env_filter(filter)
                .init();
        }
        _ => {
            tracing_subscriber::fmt()
                .pretty()
                .with_env_filter(filter)
                .init();
        }
    }
}
