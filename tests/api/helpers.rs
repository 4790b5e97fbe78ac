use reqwest::Response;
use sqlx::{Connection, Executor, PgConnection, PgPool};
use std::sync::Arc;
use uuid::Uuid;

use digest_registry::{
    config::{get_configuration, DatabaseSettings, Settings, StoreBackend},
    domain::{subscriber::SubscriberRecord, subscriber_email::SubscriberEmail},
    registry::SubscriberRegistry,
    startup::{get_connection_db_pool, Application},
    store::{InMemorySubscriberStore, PostgresSubscriberStore, SubscriberStore},
};

pub struct TestApp {
    pub config: Settings,
    pub address: String,
    pub store: Arc<InMemorySubscriberStore>,
    pub registry: SubscriberRegistry,
}

impl TestApp {
    pub async fn spawn_app() -> TestApp {
        let mut config = get_configuration().expect("Missing configuration file.");
        let store = Arc::new(InMemorySubscriberStore::new());

        // We are using port 0 as way to define a different port per each test. Port 0 is a special case that operating systems
        // take into account: when port is 0, the OS will search for the first available port
        config.set_app_port(0);
        config.set_store_backend(StoreBackend::InMemory);

        let application = Application::build_with_store(config.clone(), store.clone())
            .expect("Failed to build application.");

        let address = format!("http://127.0.0.1:{}", application.get_port());

        tokio::spawn(application.run_until_stop());

        TestApp {
            address,
            config,
            registry: SubscriberRegistry::new(store.clone()),
            store,
        }
    }

    /// Serves the app on top of any store, for tests that need the store to misbehave.
    pub fn spawn_app_with_store(store: Arc<dyn SubscriberStore>) -> String {
        let mut config = get_configuration().expect("Missing configuration file.");
        config.set_app_port(0);

        let application =
            Application::build_with_store(config, store).expect("Failed to build application.");
        let address = format!("http://127.0.0.1:{}", application.get_port());

        tokio::spawn(application.run_until_stop());

        address
    }

    pub async fn post_subscription(&self, body: serde_json::Value) -> Response {
        reqwest::Client::new()
            .post(&format!("{}/subscriptions", self.address))
            .json(&body)
            .send()
            .await
            .expect("Failed to execute request.")
    }

    pub async fn post_unsubscribe(&self, body: serde_json::Value) -> Response {
        reqwest::Client::new()
            .post(&format!("{}/subscriptions/unsubscribe", self.address))
            .json(&body)
            .send()
            .await
            .expect("Failed to execute request.")
    }

    pub async fn stored_subscriber(&self, email: &str) -> Option<SubscriberRecord> {
        let email = SubscriberEmail::parse(email.to_string()).expect("Invalid test email.");

        self.registry
            .find(&email)
            .await
            .expect("Failed to look up subscriber.")
    }
}

/// App backed by Postgres. Every instance gets its own freshly migrated database.
pub struct PostgresTestApp {
    pub address: String,
    pub db_pool: PgPool,
    pub registry: SubscriberRegistry,
}

impl PostgresTestApp {
    pub async fn spawn_app() -> PostgresTestApp {
        let mut config = get_configuration().expect("Missing configuration file.");
        let db_test_name = format!("db_{}", Uuid::new_v4().to_string().replace('-', "_"));

        config.set_app_port(0);
        config.set_store_backend(StoreBackend::Postgres);
        create_db(&config.database, &db_test_name).await;
        config.database.name = db_test_name;

        // `build` runs the migrations against the new database
        let application = Application::build(config.clone())
            .await
            .expect("Failed to build application.");
        let address = format!("http://127.0.0.1:{}", application.get_port());

        tokio::spawn(application.run_until_stop());

        let db_pool = get_connection_db_pool(&config.database);

        PostgresTestApp {
            address,
            registry: SubscriberRegistry::new(Arc::new(PostgresSubscriberStore::new(
                db_pool.clone(),
            ))),
            db_pool,
        }
    }

    pub async fn post_subscription(&self, body: serde_json::Value) -> Response {
        reqwest::Client::new()
            .post(&format!("{}/subscriptions", self.address))
            .json(&body)
            .send()
            .await
            .expect("Failed to execute request.")
    }

    pub async fn post_unsubscribe(&self, body: serde_json::Value) -> Response {
        reqwest::Client::new()
            .post(&format!("{}/subscriptions/unsubscribe", self.address))
            .json(&body)
            .send()
            .await
            .expect("Failed to execute request.")
    }

    pub async fn stored_subscriber(&self, email: &str) -> Option<SubscriberRecord> {
        let email = SubscriberEmail::parse(email.to_string()).expect("Invalid test email.");

        self.registry
            .find(&email)
            .await
            .expect("Failed to look up subscriber.")
    }

    pub async fn subscriber_count(&self) -> i64 {
        sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM subscribers")
            .fetch_one(&self.db_pool)
            .await
            .expect("Failed to count subscribers.")
    }
}

async fn create_db(db_config: &DatabaseSettings, db_test_name: &str) {
    let mut connection = PgConnection::connect_with(&db_config.get_db_options().database("postgres"))
        .await
        .expect("Failed to connect to Postgres.");

    connection
        .execute(&*format!(r#"CREATE DATABASE "{}";"#, db_test_name))
        .await
        .expect("Failed to create database.");

    connection
        .close()
        .await
        .expect("Failed to close connection.");
}
