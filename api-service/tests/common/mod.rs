//! Test helpers for api-service integration tests.
//!
//! Router-level tests run without any database: [`unreachable_state`] hands
//! the router a lazily-connecting client pointed at a closed port.
//!
//! Database-backed tests go through [`TestSuite`], which owns an ephemeral
//! MongoDB container for the lifetime of one test file:
//! `start` (before all), `run` (before each: empty every collection),
//! `finish` (after all: drop the database, close, stop the container).

#![allow(dead_code)]

use api_service::config::{ApiConfig, AuthConfig, MongoConfig, ObservabilityConfig};
use api_service::services::MongoDb;
use api_service::startup::{AppState, Application};
use mongodb::Client as MongoClient;
use secrecy::Secret;
use service_core::config::Config as CoreConfig;
use std::future::Future;
use std::time::Duration;
use testcontainers::{runners::AsyncRunner, ContainerAsync};
use testcontainers_modules::mongo::Mongo;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use uuid::Uuid;

pub const UNREACHABLE_URI: &str = "mongodb://127.0.0.1:1/?directConnection=true";

pub fn test_config(uri: &str, database: &str) -> ApiConfig {
    // Placeholder secret for auth middleware, as long as the caller did not set one.
    let jwt_secret = std::env::var("JWT_SECRET").unwrap_or_else(|_| "testsecret".to_string());

    ApiConfig {
        common: CoreConfig { port: 0 },
        mongodb: MongoConfig {
            uri: uri.to_string(),
            database: Some(database.to_string()),
            connect_timeout: Duration::from_secs(5),
        },
        auth: AuthConfig {
            jwt_secret: Some(Secret::new(jwt_secret)),
        },
        observability: ObservabilityConfig::default(),
    }
}

/// App state whose database handle never connected and never will.
pub async fn unreachable_state() -> AppState {
    let client = MongoClient::with_uri_str(UNREACHABLE_URI)
        .await
        .expect("Failed to build lazy MongoDB client");

    AppState {
        db: MongoDb::from_client(client, "unreachable"),
    }
}

/// An `Application` serving on a random port.
pub struct TestApp {
    pub address: String,
    pub port: u16,
    shutdown: oneshot::Sender<()>,
    handle: JoinHandle<std::io::Result<()>>,
}

impl TestApp {
    pub async fn spawn(config: ApiConfig) -> Self {
        let (shutdown, rx) = oneshot::channel::<()>();
        let app = Application::build_with_shutdown(config, async move {
            let _ = rx.await;
        })
        .await
        .expect("Failed to build test application");

        let port = app.port();
        let handle = tokio::spawn(app.run_until_stopped());

        TestApp {
            address: format!("http://127.0.0.1:{}", port),
            port,
            shutdown,
            handle,
        }
    }

    pub async fn stop(self) {
        let _ = self.shutdown.send(());
        self.handle
            .await
            .expect("Server task panicked")
            .expect("Server exited with an error");
    }
}

pub struct TestSuite {
    container: ContainerAsync<Mongo>,
    pub uri: String,
    pub config: ApiConfig,
    pub db: MongoDb,
}

impl TestSuite {
    pub async fn start() -> Self {
        let container = Mongo::default()
            .start()
            .await
            .expect("Failed to start MongoDB container");
        let host = container
            .get_host()
            .await
            .expect("Failed to get container host");
        let port = container
            .get_host_port_ipv4(27017)
            .await
            .expect("Failed to get MongoDB port");

        let uri = format!("mongodb://{}:{}", host, port);
        let database = format!("api_test_{}", Uuid::new_v4().simple());
        let config = test_config(&uri, &database);

        let db = MongoDb::connect(&config.mongodb)
            .await
            .expect("Failed to connect to ephemeral MongoDB");

        TestSuite {
            container,
            uri,
            config,
            db,
        }
    }

    /// Runs one test against emptied collections.
    pub async fn run<F, Fut>(&self, name: &str, test: F)
    where
        F: FnOnce(MongoDb) -> Fut,
        Fut: Future<Output = ()>,
    {
        self.db
            .clear_collections()
            .await
            .expect("Failed to reset test database");

        println!("suite test: {}", name);
        test(self.db.clone()).await;
    }

    pub async fn finish(self) {
        let TestSuite { container, db, .. } = self;

        db.drop_database()
            .await
            .expect("Failed to drop test database");
        db.close().await;

        container
            .stop()
            .await
            .expect("Failed to stop MongoDB container");
    }
}
