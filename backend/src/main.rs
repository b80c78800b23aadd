//! Service entry-point: loads configuration, wires adapters, publishes the
//! HTTP endpoint, and withdraws every registration on shutdown.

mod server;

use std::sync::Arc;

use actix_web::web;
use color_eyre::eyre::{Result, WrapErr, eyre};
use mockable::DefaultClock;
use ortho_config::OrthoConfig;
use tracing::{error, info, warn};
use tracing_subscriber::{EnvFilter, fmt};

use user_service::domain::LifecycleManager;
use user_service::inbound::http::health::HealthState;

use server::{
    ServiceSettings, build_http_state, build_registry_connector, build_token_issuer,
    build_user_store, create_server,
};

#[actix_web::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    if let Err(e) = fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .json()
        .try_init()
    {
        warn!(error = %e, "tracing init failed");
    }

    let settings = ServiceSettings::load_from_iter(std::env::args_os())
        .map_err(|err| eyre!("failed to load configuration: {err}"))?;

    let store =
        build_user_store(settings.database_url.as_deref(), settings.request_timeout()).await?;
    let tokens = build_token_issuer(settings.token_secret_file.as_deref(), settings.token_ttl())?;
    let http_state = build_http_state(store, tokens, settings.request_timeout());
    let lifecycle = LifecycleManager::new(
        build_registry_connector(settings.registry_url.as_deref()),
        settings.lifecycle(),
        Arc::new(DefaultClock),
    );

    let health_state = web::Data::new(HealthState::new());
    let server = create_server(
        health_state.clone(),
        http_state,
        (settings.http_address(), settings.http_port()),
    )
    .wrap_err("failed to bind HTTP server")?;
    let handle = server.handle();
    let serving = actix_web::rt::spawn(server);
    info!(
        address = settings.http_address(),
        port = settings.http_port(),
        "http server listening"
    );

    if let Err(err) = publish(&lifecycle, &settings).await {
        handle.stop(true).await;
        withdraw(&lifecycle, &health_state).await;
        return Err(err);
    }
    health_state.mark_ready();

    let served = serving.await;
    withdraw(&lifecycle, &health_state).await;
    served
        .wrap_err("http server task failed")?
        .wrap_err("http server failed")?;
    Ok(())
}

async fn publish(lifecycle: &LifecycleManager, settings: &ServiceSettings) -> Result<()> {
    lifecycle
        .initialize()
        .await
        .wrap_err("failed to connect to the service registry")?;
    if settings.publish_endpoint() {
        lifecycle
            .publish_endpoint(
                settings.service_name(),
                settings.advertised_host(),
                settings.http_port(),
            )
            .await
            .wrap_err("failed to publish the HTTP endpoint")?;
    }
    Ok(())
}

async fn withdraw(lifecycle: &LifecycleManager, health_state: &HealthState) {
    health_state.mark_unhealthy();
    match lifecycle.shutdown().await {
        Ok(()) => info!("service registrations withdrawn"),
        Err(err) => error!(error = %err, "failed to withdraw service registrations"),
    }
}
