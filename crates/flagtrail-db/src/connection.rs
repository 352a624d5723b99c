//! Event store bootstrap.
//!
//! A [`DbManager`] holds a client whose namespace and database are selected
//! and whose schema is migrated. Repositories are handed out from it, so the
//! server (remote WebSocket engine) and embedded use (in-memory engine) share
//! one startup path.

use surrealdb::engine::local::{Db, Mem};
use surrealdb::engine::remote::ws::{Client, Ws};
use surrealdb::opt::auth::Root;
use surrealdb::{Connection, Surreal};
use tracing::info;

use crate::error::DbError;
use crate::repository::{SurrealEventRepository, SurrealWebhookRepository};
use crate::schema::run_migrations;

/// Where the event store lives and how to sign in to it.
#[derive(Debug, Clone)]
pub struct DbConfig {
    /// WebSocket address, e.g. `127.0.0.1:8000`.
    pub url: String,
    pub namespace: String,
    pub database: String,
    /// Root credentials.
    pub username: String,
    pub password: String,
}

impl Default for DbConfig {
    fn default() -> Self {
        Self {
            url: "127.0.0.1:8000".into(),
            namespace: "flagtrail".into(),
            database: "events".into(),
            username: "root".into(),
            password: "root".into(),
        }
    }
}

/// A migrated event store connection.
#[derive(Clone)]
pub struct DbManager<C: Connection> {
    db: Surreal<C>,
}

impl DbManager<Client> {
    /// Connect to a SurrealDB server, sign in as root and migrate.
    pub async fn connect(config: &DbConfig) -> Result<Self, DbError> {
        info!(url = %config.url, "Connecting to SurrealDB");

        let db = Surreal::new::<Ws>(&config.url).await?;
        db.signin(Root {
            username: config.username.clone(),
            password: config.password.clone(),
        })
        .await?;

        Self::open(db, &config.namespace, &config.database).await
    }
}

impl DbManager<Db> {
    /// Embedded store that lives only as long as the process.
    pub async fn in_memory(namespace: &str, database: &str) -> Result<Self, DbError> {
        let db = Surreal::new::<Mem>(()).await?;
        Self::open(db, namespace, database).await
    }
}

impl<C: Connection> DbManager<C> {
    async fn open(db: Surreal<C>, namespace: &str, database: &str) -> Result<Self, DbError> {
        db.use_ns(namespace).use_db(database).await?;
        run_migrations(&db).await?;
        info!(namespace, database, "Event store ready");
        Ok(Self { db })
    }

    pub fn client(&self) -> &Surreal<C> {
        &self.db
    }

    pub fn events(&self) -> SurrealEventRepository<C> {
        SurrealEventRepository::new(self.db.clone())
    }

    pub fn webhooks(&self) -> SurrealWebhookRepository<C> {
        SurrealWebhookRepository::new(self.db.clone())
    }
}
