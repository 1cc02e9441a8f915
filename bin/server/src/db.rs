//! Lazy database connection cache and the identity repository.
//!
//! The deployment model may invoke request handlers against a process with
//! no warm state, so the connection pool is established lazily on first use
//! and shared for the remaining process lifetime. [`Database`] guarantees at
//! most one connect attempt is in flight regardless of how many requests
//! arrive before the first one completes, and a failed attempt is not
//! cached: a transient partition at cold start is retried on the next call.

use chrono::{DateTime, Utc};
use sqlx::postgres::PgPoolOptions;
use sqlx::{FromRow, PgPool};
use std::future::Future;
use std::str::FromStr;
use std::sync::Arc;
use tokio::sync::OnceCell;

use amber_gateway_core::UserId;
use amber_gateway_identity::{Identity, ProviderProfile, Role};

/// Default connection pool size.
const MAX_CONNECTIONS: u32 = 5;

/// Errors from the store layer.
#[derive(Debug)]
pub enum StoreError {
    /// The store could not be reached. Recoverable; the connection is
    /// retried lazily on the next call.
    Unavailable(String),
    /// A uniqueness constraint rejected a write. Recovered locally by
    /// re-reading the existing record.
    Conflict,
    /// Any other query failure.
    Query(String),
}

impl std::fmt::Display for StoreError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Unavailable(msg) => write!(f, "store unavailable: {msg}"),
            Self::Conflict => write!(f, "uniqueness constraint violation"),
            Self::Query(msg) => write!(f, "store query failed: {msg}"),
        }
    }
}

impl std::error::Error for StoreError {}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::Database(db_err) if db_err.is_unique_violation() => Self::Conflict,
            sqlx::Error::Io(_) | sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed => {
                Self::Unavailable(err.to_string())
            }
            _ => Self::Query(err.to_string()),
        }
    }
}

/// Process-wide lazy connection cache.
///
/// The pool is owned by the process, not by any single request, and is torn
/// down only at process shutdown.
pub struct Database {
    url: String,
    pool: OnceCell<PgPool>,
}

impl Database {
    /// Creates a database handle. No connection is attempted until the
    /// first call to [`Database::pool`].
    #[must_use]
    pub fn new(url: String) -> Self {
        Self {
            url,
            pool: OnceCell::new(),
        }
    }

    /// Returns the shared pool, connecting on first use.
    ///
    /// Concurrent callers before the first successful connect await a
    /// single in-flight attempt rather than racing to connect.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Unavailable`] if connecting (or running the
    /// embedded migrations) fails; the failure is not cached.
    pub async fn pool(&self) -> Result<&PgPool, StoreError> {
        init_once(&self.pool, || Self::connect(&self.url)).await
    }

    /// Establishes the connection if it does not exist yet.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Unavailable`] if connecting fails.
    pub async fn ensure_connected(&self) -> Result<(), StoreError> {
        self.pool().await.map(|_| ())
    }

    async fn connect(url: &str) -> Result<PgPool, StoreError> {
        let pool = PgPoolOptions::new()
            .max_connections(MAX_CONNECTIONS)
            .connect(url)
            .await
            .map_err(|e| StoreError::Unavailable(e.to_string()))?;

        // The uniqueness constraint must exist before any query runs.
        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .map_err(|e| StoreError::Unavailable(format!("migration failed: {e}")))?;

        tracing::info!("connected to database");
        Ok(pool)
    }
}

/// Initializes a cell at most once across concurrent callers.
///
/// While an attempt is in flight, other callers wait for it instead of
/// starting their own. A failed attempt leaves the cell empty so a later
/// call retries.
async fn init_once<'a, T, E, F, Fut>(cell: &'a OnceCell<T>, init: F) -> Result<&'a T, E>
where
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    cell.get_or_try_init(init).await
}

/// Row type for identity queries.
#[derive(FromRow)]
struct IdentityRow {
    id: String,
    provider: String,
    subject: String,
    email: String,
    display_name: Option<String>,
    avatar_url: Option<String>,
    role: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl IdentityRow {
    fn try_into_identity(self) -> Result<Identity, StoreError> {
        let id = UserId::from_str(&self.id)
            .map_err(|e| StoreError::Query(format!("invalid identity id '{}': {e}", self.id)))?;
        let role = Role::from_str(&self.role)
            .map_err(|e| StoreError::Query(format!("invalid stored role: {e}")))?;
        Ok(Identity::with_all_fields(
            id,
            self.provider,
            self.subject,
            self.email,
            self.display_name,
            self.avatar_url,
            role,
            self.created_at,
            self.updated_at,
        ))
    }
}

/// Repository for identity records.
///
/// Every operation goes through [`Database::pool`] first, so a cold-start
/// process reconnects transparently and connection failures surface as
/// [`StoreError::Unavailable`].
pub struct IdentityRepository {
    db: Arc<Database>,
}

impl IdentityRepository {
    /// Creates a new identity repository.
    #[must_use]
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    /// Finds an identity by its provider and subject identifier.
    pub async fn find_by_subject(
        &self,
        provider: &str,
        subject: &str,
    ) -> Result<Option<Identity>, StoreError> {
        let pool = self.db.pool().await?;
        let row: Option<IdentityRow> = sqlx::query_as(
            r#"
            SELECT id, provider, subject, email, display_name, avatar_url, role,
                   created_at, updated_at
            FROM identities
            WHERE provider = $1 AND subject = $2
            "#,
        )
        .bind(provider)
        .bind(subject)
        .fetch_optional(pool)
        .await?;

        match row {
            Some(r) => Ok(Some(r.try_into_identity()?)),
            None => Ok(None),
        }
    }

    /// Finds an identity by its internal ID.
    pub async fn find_by_id(&self, id: UserId) -> Result<Option<Identity>, StoreError> {
        let pool = self.db.pool().await?;
        let row: Option<IdentityRow> = sqlx::query_as(
            r#"
            SELECT id, provider, subject, email, display_name, avatar_url, role,
                   created_at, updated_at
            FROM identities
            WHERE id = $1
            "#,
        )
        .bind(id.to_string())
        .fetch_optional(pool)
        .await?;

        match row {
            Some(r) => Ok(Some(r.try_into_identity()?)),
            None => Ok(None),
        }
    }

    /// Inserts a new identity.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Conflict`] if an identity for the same
    /// `(provider, subject)` already exists.
    pub async fn create(&self, identity: &Identity) -> Result<(), StoreError> {
        let pool = self.db.pool().await?;
        sqlx::query(
            r#"
            INSERT INTO identities (id, provider, subject, email, display_name,
                                    avatar_url, role, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
        .bind(identity.id().to_string())
        .bind(identity.provider())
        .bind(identity.subject())
        .bind(identity.email())
        .bind(identity.display_name())
        .bind(identity.avatar_url())
        .bind(identity.role().as_str())
        .bind(identity.created_at())
        .bind(identity.updated_at())
        .execute(pool)
        .await?;

        Ok(())
    }

    /// Resolves a provider profile into a local identity, creating one on
    /// first login.
    ///
    /// Concurrent first logins for the same subject race on the database
    /// uniqueness constraint; the loser's conflict is recovered by
    /// re-reading the winning row. Repeated logins return the same record
    /// and do not mutate stored profile fields.
    pub async fn find_or_create(
        &self,
        provider: &str,
        profile: &ProviderProfile,
    ) -> Result<Identity, StoreError> {
        if let Some(existing) = self.find_by_subject(provider, &profile.subject).await? {
            return Ok(existing);
        }

        let fresh = Identity::from_profile(provider, profile);
        match self.create(&fresh).await {
            Ok(()) => Ok(fresh),
            Err(StoreError::Conflict) => {
                tracing::debug!(
                    provider,
                    subject = %profile.subject,
                    "lost first-login race, using existing identity"
                );
                self.find_by_subject(provider, &profile.subject)
                    .await?
                    .ok_or_else(|| {
                        StoreError::Query("identity disappeared after conflict".to_string())
                    })
            }
            Err(e) => Err(e),
        }
    }
}
