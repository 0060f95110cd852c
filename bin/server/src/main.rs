use authflow_continuation::{AuthRequestRouter, FlowServices, RouterOptions};
use authflow_server::{
    api::PlatformClient,
    config::ServerConfig,
    routes::{AppState, app},
};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration from environment
    let config = ServerConfig::from_env().expect("failed to load configuration");
    tracing::info!(
        api = %config.api.base_url,
        base_path = %config.base_path(),
        "Loaded configuration"
    );

    let client = PlatformClient::new(&config.api).expect("failed to create platform client");

    let public_url = config.public_login_url();
    let services = FlowServices::from_platform(Arc::new(client), &public_url);
    let router = AuthRequestRouter::new(
        services,
        RouterOptions {
            public_url,
            require_verified_email: config.login.email_verification,
        },
    );

    let app = app(AppState::new(router, &config));

    let listener = tokio::net::TcpListener::bind(config.listen_addr)
        .await
        .expect("failed to bind to address");

    tracing::info!("listening on http://{}", config.listen_addr);

    axum::serve(listener, app.into_make_service())
        .await
        .expect("server error");
}
