// Store selection plus the SQLite-backed traveler store
// SQLite keeps each traveler aggregate as one JSON document guarded by a version column.

use std::sync::Arc;

use crate::config::{NexusConfig, StoreBackend};
use crate::store::{MemoryStore, Store};

#[cfg(feature = "database")]
pub use sqlite::SqliteStore;

/// Build the store named by the configuration
pub async fn open_store(config: &NexusConfig) -> anyhow::Result<Arc<dyn Store>> {
    match config.store.backend {
        StoreBackend::Memory => {
            tracing::info!("Using in-memory traveler store");
            Ok(Arc::new(MemoryStore::new()))
        }
        StoreBackend::Sqlite => open_sqlite(config).await,
    }
}

#[cfg(feature = "database")]
async fn open_sqlite(config: &NexusConfig) -> anyhow::Result<Arc<dyn Store>> {
    let db_config = config
        .database
        .as_ref()
        .ok_or_else(|| anyhow::anyhow!("store backend is sqlite but [database] is not configured"))?;
    let store = SqliteStore::open(&db_config.url, db_config.max_connections, db_config.auto_migrate).await?;
    Ok(Arc::new(store))
}

// Stub for when the database feature is not enabled
#[cfg(not(feature = "database"))]
async fn open_sqlite(_config: &NexusConfig) -> anyhow::Result<Arc<dyn Store>> {
    anyhow::bail!("store backend is sqlite but nexus was built without the `database` feature")
}

#[cfg(feature = "database")]
mod sqlite {
    use async_trait::async_trait;
    use chrono::Utc;
    use sqlx::migrate::MigrateDatabase;
    use sqlx::sqlite::SqlitePoolOptions;
    use sqlx::{Row, SqlitePool};
    use tracing::{debug, info};

    use crate::error::{Entity, NexusError, Result};
    use crate::model::{NewUser, Traveler, TravelerId, User, UserId};
    use crate::store::{TravelerStore, UserDirectory};

    /// Traveler store on a SQLite pool
    pub struct SqliteStore {
        pool: SqlitePool,
    }

    impl SqliteStore {
        /// Open the pool, creating the database file and running migrations if asked
        pub async fn open(database_url: &str, max_connections: u32, auto_migrate: bool) -> Result<Self> {
            if !sqlx::Sqlite::database_exists(database_url).await? {
                info!("Creating database at {}", database_url);
                sqlx::Sqlite::create_database(database_url).await?;
            }

            let pool = SqlitePoolOptions::new()
                .max_connections(max_connections.max(1))
                .connect(database_url)
                .await?;

            if auto_migrate {
                info!("Running database migrations...");
                sqlx::migrate!("./migrations").run(&pool).await?;
                info!("Database migrations completed");
            }

            Ok(Self { pool })
        }

        async fn current_version(&self, id: TravelerId) -> Result<Option<u64>> {
            let row = sqlx::query("SELECT version FROM travelers WHERE id = ?1")
                .bind(id as i64)
                .fetch_optional(&self.pool)
                .await?;
            Ok(row.map(|r| r.get::<i64, _>("version") as u64))
        }
    }

    fn decode_traveler(document: &str) -> Result<Traveler> {
        Ok(serde_json::from_str(document)?)
    }

    fn decode_user(id: i64, document: &str) -> Result<User> {
        let mut user: User = serde_json::from_str(document)?;
        user.id = id as UserId;
        Ok(user)
    }

    #[async_trait]
    impl TravelerStore for SqliteStore {
        async fn next_traveler_id(&self) -> Result<TravelerId> {
            let row = sqlx::query("INSERT INTO traveler_ids DEFAULT VALUES RETURNING id")
                .fetch_one(&self.pool)
                .await?;
            Ok(row.get::<i64, _>("id") as TravelerId)
        }

        async fn insert(&self, mut traveler: Traveler) -> Result<Traveler> {
            traveler.version = 1;
            let document = serde_json::to_string(&traveler)?;
            sqlx::query(
                r#"
                INSERT INTO travelers (id, version, document, updated_at)
                VALUES (?1, ?2, ?3, ?4)
                "#,
            )
            .bind(traveler.id as i64)
            .bind(traveler.version as i64)
            .bind(document)
            .bind(Utc::now().to_rfc3339())
            .execute(&self.pool)
            .await?;
            Ok(traveler)
        }

        async fn get(&self, id: TravelerId) -> Result<Traveler> {
            let row = sqlx::query("SELECT document FROM travelers WHERE id = ?1")
                .bind(id as i64)
                .fetch_optional(&self.pool)
                .await?
                .ok_or_else(|| NexusError::not_found(Entity::Traveler, id))?;
            decode_traveler(row.get("document"))
        }

        async fn list(&self) -> Result<Vec<Traveler>> {
            let rows = sqlx::query("SELECT document FROM travelers ORDER BY id ASC")
                .fetch_all(&self.pool)
                .await?;
            rows.iter().map(|row| decode_traveler(row.get("document"))).collect()
        }

        async fn commit(&self, mut traveler: Traveler, expected_version: u64) -> Result<Traveler> {
            traveler.version = expected_version + 1;
            let document = serde_json::to_string(&traveler)?;
            let result = sqlx::query(
                r#"
                UPDATE travelers
                SET version = ?1, document = ?2, updated_at = ?3
                WHERE id = ?4 AND version = ?5
                "#,
            )
            .bind(traveler.version as i64)
            .bind(document)
            .bind(Utc::now().to_rfc3339())
            .bind(traveler.id as i64)
            .bind(expected_version as i64)
            .execute(&self.pool)
            .await?;

            if result.rows_affected() == 0 {
                return match self.current_version(traveler.id).await? {
                    None => Err(NexusError::not_found(Entity::Traveler, traveler.id)),
                    Some(actual) => {
                        debug!(
                            traveler.id = traveler.id,
                            expected = expected_version,
                            actual,
                            "Rejecting stale commit"
                        );
                        Err(NexusError::ConcurrentModification {
                            traveler_id: traveler.id,
                            expected: expected_version,
                            actual,
                        })
                    }
                };
            }
            Ok(traveler)
        }

        async fn delete(&self, id: TravelerId, expected_version: u64) -> Result<()> {
            let result = sqlx::query("DELETE FROM travelers WHERE id = ?1 AND version = ?2")
                .bind(id as i64)
                .bind(expected_version as i64)
                .execute(&self.pool)
                .await?;
            if result.rows_affected() == 0 {
                return match self.current_version(id).await? {
                    None => Err(NexusError::not_found(Entity::Traveler, id)),
                    Some(actual) => Err(NexusError::ConcurrentModification {
                        traveler_id: id,
                        expected: expected_version,
                        actual,
                    }),
                };
            }
            Ok(())
        }

        async fn close(&self) {
            info!("Shutting down database connections...");
            self.pool.close().await;
            info!("Database connections closed");
        }
    }

    #[async_trait]
    impl UserDirectory for SqliteStore {
        async fn create_user(&self, user: NewUser) -> Result<User> {
            let mut user = user.into_user(0)?;
            let document = serde_json::to_string(&user)?;
            let inserted = sqlx::query("INSERT INTO users (username, document) VALUES (?1, ?2) RETURNING id")
                .bind(&user.username)
                .bind(document)
                .fetch_one(&self.pool)
                .await;

            match inserted {
                Ok(row) => {
                    user.id = row.get::<i64, _>("id") as UserId;
                    Ok(user)
                }
                Err(sqlx::Error::Database(db)) if db.is_unique_violation() => Err(NexusError::validation(
                    "username",
                    format!("'{}' is already taken", user.username),
                )),
                Err(e) => Err(e.into()),
            }
        }

        async fn user(&self, id: UserId) -> Result<User> {
            let row = sqlx::query("SELECT id, document FROM users WHERE id = ?1")
                .bind(id as i64)
                .fetch_optional(&self.pool)
                .await?
                .ok_or_else(|| NexusError::not_found(Entity::User, id))?;
            decode_user(row.get("id"), row.get("document"))
        }

        async fn user_by_username(&self, username: &str) -> Result<Option<User>> {
            let row = sqlx::query("SELECT id, document FROM users WHERE username = ?1")
                .bind(username.trim())
                .fetch_optional(&self.pool)
                .await?;
            row.map(|r| decode_user(r.get("id"), r.get("document"))).transpose()
        }

        async fn users(&self) -> Result<Vec<User>> {
            let rows = sqlx::query("SELECT id, document FROM users ORDER BY id ASC")
                .fetch_all(&self.pool)
                .await?;
            rows.iter()
                .map(|r| decode_user(r.get("id"), r.get("document")))
                .collect()
        }
    }
}
