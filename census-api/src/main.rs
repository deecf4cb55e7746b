use axum::Router;
use config::Config;
use envconfig::Envconfig;
use eyre::Result;

use census_common::database;
use census_common::metrics::setup_metrics_routes;

mod api;
mod auth;
mod config;
mod handlers;
mod state;

async fn listen(app: Router, bind: String) -> Result<()> {
    let listener = tokio::net::TcpListener::bind(bind).await?;

    axum::serve(listener, app).await?;

    Ok(())
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt::init();

    let config = Config::init_from_env().expect("failed to load configuration from env");

    let pool = database::get_pool(&config.database_url, config.max_pg_connections)
        .await
        .expect("failed to connect to database");
    database::run_migrations(&pool)
        .await
        .expect("failed to run database migrations");

    let state = state::AppState {
        pool,
        gate: auth::AccessGate::new(config.production, config.access_control_password.clone()),
    };

    let app = handlers::add_routes(Router::new(), state);
    let app = setup_metrics_routes(app);

    match listen(app, config.bind()).await {
        Ok(_) => {}
        Err(e) => tracing::error!("failed to start census-api http server, {}", e),
    }
}
