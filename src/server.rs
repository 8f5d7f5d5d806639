use crate::{
    config::Config,
    error::Result,
    evaluator::PermissionEvaluator,
    grantee::CanonicalUser,
    middleware::logging::log_requests,
    resolver::InMemoryDirectory,
    s3::{routes, xml::AclXmlCodec},
    store::AclStore,
};
use axum::{middleware, Router};
use std::{net::SocketAddr, sync::Arc};
use tokio::signal;
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};

pub struct AppState {
    pub config: Config,
    pub store: AclStore,
    pub directory: Arc<InMemoryDirectory>,
    pub codec: AclXmlCodec,
    pub evaluator: PermissionEvaluator,
}

impl AppState {
    pub async fn new(config: Config) -> Result<Self> {
        let directory = Arc::new(InMemoryDirectory::new());

        for entry in &config.directory.users {
            let user = CanonicalUser::new(entry.id.as_str(), entry.display_name.as_str())?;
            directory.add_user(user, entry.email.as_deref()).await;
        }
        for id in &config.directory.log_delivery_ids {
            if directory.user(id).await.is_none() {
                warn!("LogDelivery member {} is not a known user", id);
            }
            directory.add_log_delivery_member(id).await;
        }
        info!(
            "Directory seeded with {} users, {} LogDelivery members",
            config.directory.users.len(),
            config.directory.log_delivery_ids.len()
        );

        Ok(Self {
            codec: AclXmlCodec::with_max_grants(config.acl.max_grants),
            config,
            store: AclStore::new(),
            directory,
            evaluator: PermissionEvaluator::new(),
        })
    }
}

pub async fn run(config: Config) -> anyhow::Result<()> {
    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port).parse()?;
    let state = Arc::new(AppState::new(config).await?);

    let app = build_app(state);

    info!("IronBucket ACL service listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

pub fn build_app(state: Arc<AppState>) -> Router {
    routes::create_routes()
        .layer(middleware::from_fn_with_state(state.clone(), log_requests))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                error!("Failed to install signal handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down...");
        },
        _ = terminate => {
            info!("Received terminate signal, shutting down...");
        },
    }
}
