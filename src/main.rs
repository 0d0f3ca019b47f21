use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use ladder::{
    auth::TokenConfig,
    matches::{InMemoryMatchRepository, MatchRepository, MatchService, PostgresMatchRepository},
    matchmaking::MatchmakingService,
    players::{InMemoryPlayerRepository, PlayerRepository, PlayerService, PostgresPlayerRepository},
    rating::EloFormulaFactory,
    routes::create_router,
    shared::AppState,
    Settings,
};

type Repositories = (
    Arc<dyn MatchRepository + Send + Sync>,
    Arc<dyn PlayerRepository + Send + Sync>,
);

/// Postgres when DATABASE_URL is set, in-memory otherwise
async fn build_repositories(settings: &Settings) -> Result<Repositories, sqlx::Error> {
    match &settings.database_url {
        Some(database_url) => {
            let pool = PgPoolOptions::new()
                .max_connections(10)
                .connect(database_url)
                .await?;
            sqlx::migrate!("./migrations").run(&pool).await?;
            info!("Connected to PostgreSQL, migrations applied");
            let matches: Arc<dyn MatchRepository + Send + Sync> =
                Arc::new(PostgresMatchRepository::new(pool.clone()));
            let players: Arc<dyn PlayerRepository + Send + Sync> =
                Arc::new(PostgresPlayerRepository::new(pool));
            Ok((matches, players))
        }
        None => {
            info!("DATABASE_URL not set, using in-memory repositories");
            let players = Arc::new(InMemoryPlayerRepository::new());
            let matches: Arc<dyn MatchRepository + Send + Sync> =
                Arc::new(InMemoryMatchRepository::new(players.clone()));
            let players: Arc<dyn PlayerRepository + Send + Sync> = players;
            Ok((matches, players))
        }
    }
}

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "ladder=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting ladder server");

    let settings = match Settings::from_env() {
        Ok(settings) => settings,
        Err(err) => {
            error!(error = %err, "Invalid configuration");
            std::process::exit(1);
        }
    };

    let (match_repository, player_repository) = match build_repositories(&settings).await {
        Ok(repositories) => repositories,
        Err(err) => {
            error!(error = %err, "Failed to connect to database");
            std::process::exit(1);
        }
    };

    // Formula is chosen once here and injected
    let formula = EloFormulaFactory::create_formula(settings.formula_version);
    info!(
        version = %settings.formula_version,
        k_factor = settings.k_factor,
        "Rating formula selected"
    );

    let app_state = AppState::new(
        Arc::new(MatchService::new(
            match_repository,
            player_repository.clone(),
            formula,
            settings.k_factor,
        )),
        Arc::new(PlayerService::new(player_repository.clone())),
        Arc::new(MatchmakingService::new(player_repository)),
        TokenConfig::new(&settings.jwt_secret),
    );

    let app = create_router(app_state);

    let listener = match tokio::net::TcpListener::bind(&settings.bind_addr).await {
        Ok(listener) => listener,
        Err(err) => {
            error!(error = %err, addr = %settings.bind_addr, "Failed to bind");
            std::process::exit(1);
        }
    };
    info!("Server running on http://{}", settings.bind_addr);

    if let Err(err) = axum::serve(listener, app).await {
        error!(error = %err, "Server error");
    }
}
