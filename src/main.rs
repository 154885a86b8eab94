use std::sync::Arc;

use tracing_subscriber::EnvFilter;

use parcel_flow::api;
use parcel_flow::auth::token::hash_password;
use parcel_flow::config::{Config, SeedAdmin};
use parcel_flow::error::AppError;
use parcel_flow::models::user::{Role, User};
use parcel_flow::state::AppState;

#[tokio::main]
async fn main() -> Result<(), AppError> {
    let config = Config::from_env()?;

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(config.log_level.clone()))
        .with_target(false)
        .compact()
        .init();

    let shared_state = Arc::new(AppState::new(
        config.event_buffer_size,
        config.fees,
        &config.auth,
    ));

    if let Some(seed) = &config.seed_admin {
        seed_admin(&shared_state, seed).await?;
    }

    let app = api::rest::router(shared_state.clone(), &config.static_dir);

    let bind_addr = format!("0.0.0.0:{}", config.http_port);
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .map_err(|err| AppError::Internal(format!("failed to bind {bind_addr}: {err}")))?;

    tracing::info!(
        http_port = config.http_port,
        base_fee = config.fees.base_fee,
        per_kg_fee = config.fees.per_kg_fee,
        "http server started"
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|err| AppError::Internal(format!("server error: {err}")))?;

    Ok(())
}

async fn seed_admin(state: &AppState, seed: &SeedAdmin) -> Result<(), AppError> {
    if let Some(existing) = state.find_user_by_email(&seed.email) {
        tracing::info!(user_id = %existing.id, "admin already present");
        return Ok(());
    }

    let mut admin = User::new(
        seed.name.clone(),
        seed.email.trim().to_lowercase(),
        String::new(),
        String::new(),
        Role::Admin,
    );
    admin.password_hash = hash_password(seed.password.clone(), state.tokens.bcrypt_cost()).await?;

    let admin = state.insert_user(admin);
    tracing::info!(user_id = %admin.id, email = %admin.email, "seeded admin account");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %err, "failed to listen for shutdown signal");
    }
}
