use actix_web::dev::Server;
use actix_web::{web, App, HttpServer};
use sqlx::postgres::PgPoolOptions;
use sqlx::{Pool, Postgres};
use std::net::TcpListener;
use std::sync::Arc;
use tracing_actix_web::TracingLogger;

use crate::config::{DatabaseSettings, Settings, StoreBackend};
use crate::registry::SubscriberRegistry;
use crate::routes::{handle_subscribe, handle_unsubscribe, health_check};
use crate::store::{InMemorySubscriberStore, PostgresSubscriberStore, SubscriberStore};

#[derive(thiserror::Error, Debug)]
pub enum StartupError {
    #[error("Failed to bind the server address.")]
    Bind(#[from] std::io::Error),
    #[error("Failed to run database migrations.")]
    Migrate(#[from] sqlx::migrate::MigrateError),
}

pub struct Application {
    pub port: u16,
    pub server: Server,
}

impl Application {
    pub async fn build(config: Settings) -> Result<Self, StartupError> {
        let store = build_store(&config).await?;

        Self::build_with_store(config, store)
    }

    /// Serves a registry backed by an already constructed store.
    pub fn build_with_store(
        config: Settings,
        store: Arc<dyn SubscriberStore>,
    ) -> Result<Self, StartupError> {
        let registry = SubscriberRegistry::new(store);

        let listener = TcpListener::bind(config.get_address())?;
        let port = listener.local_addr()?.port();
        let server = run(listener, registry)?;

        tracing::info!("Server listening on {}", config.get_address());

        Ok(Self { port, server })
    }

    pub fn get_port(&self) -> u16 {
        self.port
    }

    pub async fn run_until_stop(self) -> Result<(), std::io::Error> {
        self.server.await
    }
}

/// Picks the store named by the settings. The Postgres schema is migrated before the store is
/// handed out.
pub async fn build_store(config: &Settings) -> Result<Arc<dyn SubscriberStore>, StartupError> {
    match config.get_store_backend() {
        StoreBackend::InMemory => Ok(Arc::new(InMemorySubscriberStore::new())),
        StoreBackend::Postgres => {
            let db_pool = get_connection_db_pool(&config.database);
            sqlx::migrate!("./migrations").run(&db_pool).await?;

            Ok(Arc::new(PostgresSubscriberStore::new(db_pool)))
        }
    }
}

pub fn run(listener: TcpListener, registry: SubscriberRegistry) -> Result<Server, std::io::Error> {
    let registry = web::Data::new(registry);

    let server = HttpServer::new(move || {
        // App is where your application logic lives: routing, middlewares, request handler, etc
        App::new()
            // 'wrap' method adds a middleware to the App. This specific middleware provide incoming
            // request logger
            .wrap(TracingLogger::default())
            .route("/health_check", web::get().to(health_check))
            .route("/subscriptions", web::post().to(handle_subscribe))
            .route("/subscriptions/unsubscribe", web::post().to(handle_unsubscribe))
            .app_data(registry.clone())
    })
    .listen(listener)?
    .run();

    Ok(server)
}

pub fn get_connection_db_pool(config: &DatabaseSettings) -> Pool<Postgres> {
    PgPoolOptions::new()
        .acquire_timeout(std::time::Duration::from_secs(2))
        .connect_lazy_with(config.get_db_options())
}
