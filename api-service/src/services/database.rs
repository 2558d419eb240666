use crate::config::MongoConfig;
use mongodb::{
    bson::{doc, Document},
    options::ClientOptions,
    Client as MongoClient, Collection, Database,
};
use service_core::error::AppError;
use std::time::Duration;

/// Database used when neither `MONGO_DATABASE` nor the URI path names one.
pub const DEFAULT_DATABASE: &str = "test";

const APP_NAME: &str = "api-service";

/// Added to the connect timeout for the outer deadline; the driver's own
/// server selection timeout must fire first.
const CONNECT_GRACE: Duration = Duration::from_secs(2);

#[derive(Clone)]
pub struct MongoDb {
    client: MongoClient,
    db: Database,
}

impl MongoDb {
    /// Opens the connection and proves it with a `ping`.
    ///
    /// Unreachable hosts, rejected credentials and malformed URIs all come back
    /// as [`AppError::DatabaseError`]; so does running past the configured
    /// connect timeout.
    pub async fn connect(config: &MongoConfig) -> Result<Self, AppError> {
        let deadline = config.connect_timeout + CONNECT_GRACE;
        match tokio::time::timeout(deadline, Self::establish(config)).await {
            Ok(result) => result,
            Err(_) => {
                tracing::error!(
                    timeout_secs = deadline.as_secs(),
                    "Timed out connecting to MongoDB"
                );
                Err(AppError::DatabaseError(anyhow::anyhow!(
                    "Timed out after {:?} connecting to MongoDB",
                    deadline
                )))
            }
        }
    }

    async fn establish(config: &MongoConfig) -> Result<Self, AppError> {
        let mut options = ClientOptions::parse(&config.uri).await.map_err(|e| {
            tracing::error!("Invalid MongoDB connection string: {}", e);
            AppError::from(e)
        })?;

        options.connect_timeout = Some(config.connect_timeout);
        options.server_selection_timeout = Some(config.connect_timeout);
        if options.app_name.is_none() {
            options.app_name = Some(APP_NAME.to_string());
        }

        let database = resolve_database(
            config.database.as_deref(),
            options.default_database.as_deref(),
        );
        let hosts = options
            .hosts
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(",");

        tracing::info!(hosts = %hosts, database = %database, "Connecting to MongoDB");

        let client = MongoClient::with_options(options).map_err(|e| {
            tracing::error!("Failed to create MongoDB client for {}: {}", hosts, e);
            AppError::from(e)
        })?;
        let mongo = Self::from_client(client, &database);

        mongo.health_check().await.map_err(|e| {
            tracing::error!("MongoDB connection error: {}", e);
            e
        })?;

        tracing::info!(database = %database, "MongoDB connected successfully");
        Ok(mongo)
    }

    /// Wraps an existing client without contacting the server.
    pub fn from_client(client: MongoClient, database: &str) -> Self {
        let db = client.database(database);
        Self { client, db }
    }

    pub async fn health_check(&self) -> Result<(), AppError> {
        self.client
            .database("admin")
            .run_command(doc! { "ping": 1 }, None)
            .await?;
        Ok(())
    }

    /// Empties every collection in the database but keeps the collections
    /// themselves (and their indexes). Returns the number of documents removed.
    pub async fn clear_collections(&self) -> Result<u64, AppError> {
        let names = self
            .db
            .list_collection_names(doc! { "type": "collection" })
            .await?;

        let mut deleted = 0;
        for name in names.iter().filter(|n| !n.starts_with("system.")) {
            let result = self
                .db
                .collection::<Document>(name)
                .delete_many(doc! {}, None)
                .await?;
            deleted += result.deleted_count;
        }

        tracing::debug!(
            collections = names.len(),
            deleted,
            "Cleared MongoDB collections"
        );
        Ok(deleted)
    }

    pub async fn drop_database(&self) -> Result<(), AppError> {
        tracing::info!(database = %self.db.name(), "Dropping MongoDB database");
        self.db.drop(None).await?;
        Ok(())
    }

    /// Shuts the client down, closing pooled connections.
    pub async fn close(self) {
        tracing::info!(database = %self.db.name(), "Closing MongoDB connection");
        self.client.shutdown().await;
    }

    pub fn collection<T>(&self, name: &str) -> Collection<T> {
        self.db.collection(name)
    }

    pub fn database(&self) -> &Database {
        &self.db
    }
}

fn resolve_database(explicit: Option<&str>, from_uri: Option<&str>) -> String {
    explicit
        .or(from_uri)
        .filter(|name| !name.is_empty())
        .unwrap_or(DEFAULT_DATABASE)
        .to_string()
}
