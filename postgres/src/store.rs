//! Ticket store backed by a `PostgreSQL` connection pool.

use sqlx::postgres::{PgPool, PgPoolOptions};
use sqlx::{FromRow, Postgres, Transaction};
use std::time::Duration;
use ticketbox_core::{
    HealthProbe, NewTicket, StoreError, Ticket, TicketId, TicketStore, TicketTransaction,
};

/// SQLSTATE raised when `lock_timeout` expires.
const LOCK_NOT_AVAILABLE: &str = "55P03";

/// `PostgreSQL` ticket store.
///
/// Cloning is cheap; clones share the connection pool.
#[derive(Clone, Debug)]
pub struct PostgresTicketStore {
    pool: PgPool,
    lock_timeout: Option<Duration>,
}

impl PostgresTicketStore {
    /// Connect with a default pool.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Database`] if the database is unreachable.
    pub async fn new(database_url: &str) -> Result<Self, StoreError> {
        let pool = PgPoolOptions::new()
            .max_connections(10)
            .connect(database_url)
            .await
            .map_err(|e| StoreError::Database(format!("Failed to connect: {e}")))?;

        Ok(Self::from_pool(pool))
    }

    /// Wrap an existing pool.
    #[must_use]
    pub const fn from_pool(pool: PgPool) -> Self {
        Self {
            pool,
            lock_timeout: None,
        }
    }

    /// Bound how long a transaction waits for a row lock.
    ///
    /// Applied with `SET LOCAL lock_timeout` at the start of every
    /// transaction; an expired wait surfaces as [`StoreError::LockTimeout`].
    #[must_use]
    pub const fn with_lock_timeout(mut self, timeout: Duration) -> Self {
        self.lock_timeout = Some(timeout);
        self
    }

    /// Get the underlying connection pool.
    #[must_use]
    pub const fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Create the `ticket` table if it does not exist.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Database`] if a migration fails.
    pub async fn migrate(&self) -> Result<(), StoreError> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| StoreError::Database(format!("Migration failed: {e}")))?;
        Ok(())
    }
}

impl PostgresTicketStore {
    async fn open(&self, lock_timeout: Option<Duration>) -> Result<PostgresTransaction, StoreError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| StoreError::Begin(e.to_string()))?;

        if let Some(timeout) = lock_timeout {
            // SET does not take bind parameters; the value is a plain integer
            let millis = timeout.as_millis().max(1);
            sqlx::query(&format!("SET LOCAL lock_timeout = '{millis}ms'"))
                .execute(&mut *tx)
                .await
                .map_err(|e| StoreError::Begin(format!("Failed to set lock timeout: {e}")))?;
        }

        Ok(PostgresTransaction { tx })
    }
}

#[derive(FromRow)]
struct TicketRow {
    id: i64,
    name: String,
    description: String,
    allocation: i32,
}

impl From<TicketRow> for Ticket {
    fn from(row: TicketRow) -> Self {
        Self {
            id: TicketId::new(row.id),
            name: row.name,
            description: row.description,
            allocation: i64::from(row.allocation),
        }
    }
}

fn to_column(allocation: i64) -> Result<i32, StoreError> {
    i32::try_from(allocation)
        .map_err(|_| StoreError::Database(format!("Allocation {allocation} out of range")))
}

fn query_error(context: &str, e: &sqlx::Error) -> StoreError {
    if let sqlx::Error::Database(db_err) = e {
        if db_err.code().as_deref() == Some(LOCK_NOT_AVAILABLE) {
            tracing::debug!(context, "Row lock wait exceeded lock_timeout");
            return StoreError::LockTimeout(db_err.message().to_string());
        }
    }
    StoreError::Database(format!("{context}: {e}"))
}

impl TicketStore for PostgresTicketStore {
    type Transaction = PostgresTransaction;

    async fn insert(&self, ticket: &NewTicket) -> Result<TicketId, StoreError> {
        let (id,): (i64,) = sqlx::query_as(
            "INSERT INTO ticket (name, description, allocation) VALUES ($1, $2, $3) RETURNING id",
        )
        .bind(&ticket.name)
        .bind(&ticket.description)
        .bind(to_column(ticket.allocation)?)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| query_error("Failed to insert ticket", &e))?;

        Ok(TicketId::new(id))
    }

    async fn find(&self, id: TicketId) -> Result<Option<Ticket>, StoreError> {
        let row: Option<TicketRow> =
            sqlx::query_as("SELECT id, name, description, allocation FROM ticket WHERE id = $1")
                .bind(id.get())
                .fetch_optional(&self.pool)
                .await
                .map_err(|e| query_error("Failed to get ticket", &e))?;

        Ok(row.map(Ticket::from))
    }

    async fn begin(&self) -> Result<PostgresTransaction, StoreError> {
        self.open(self.lock_timeout).await
    }

    async fn begin_within(&self, lock_wait: Duration) -> Result<PostgresTransaction, StoreError> {
        let timeout = self
            .lock_timeout
            .map_or(lock_wait, |configured| configured.min(lock_wait));
        self.open(Some(timeout)).await
    }
}

impl HealthProbe for PostgresTicketStore {
    fn component(&self) -> &'static str {
        "database"
    }

    async fn ping(&self) -> Result<(), String> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map(|_| ())
            .map_err(|e| e.to_string())
    }
}

/// Open `PostgreSQL` transaction.
///
/// Dropping it without committing returns the connection to the pool, which
/// rolls the transaction back and releases its row locks.
pub struct PostgresTransaction {
    tx: Transaction<'static, Postgres>,
}

impl TicketTransaction for PostgresTransaction {
    async fn find_for_update(&mut self, id: TicketId) -> Result<Option<Ticket>, StoreError> {
        let row: Option<TicketRow> = sqlx::query_as(
            "SELECT id, name, description, allocation FROM ticket WHERE id = $1 FOR UPDATE",
        )
        .bind(id.get())
        .fetch_optional(&mut *self.tx)
        .await
        .map_err(|e| query_error("Failed to lock ticket", &e))?;

        Ok(row.map(Ticket::from))
    }

    async fn update_allocation(&mut self, id: TicketId, allocation: i64) -> Result<(), StoreError> {
        let result = sqlx::query("UPDATE ticket SET allocation = $2 WHERE id = $1")
            .bind(id.get())
            .bind(to_column(allocation)?)
            .execute(&mut *self.tx)
            .await
            .map_err(|e| query_error("Failed to update allocation", &e))?;

        if result.rows_affected() != 1 {
            return Err(StoreError::Database(format!(
                "Ticket {id} vanished during update"
            )));
        }
        Ok(())
    }

    async fn commit(self) -> Result<(), StoreError> {
        self.tx
            .commit()
            .await
            .map_err(|e| StoreError::Commit(e.to_string()))
    }

    async fn rollback(self) -> Result<(), StoreError> {
        self.tx
            .rollback()
            .await
            .map_err(|e| StoreError::Database(format!("Failed to roll back: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_row_converts_to_ticket() {
        let row = TicketRow {
            id: 7,
            name: "Concert".into(),
            description: String::new(),
            allocation: i32::MAX,
        };

        let ticket = Ticket::from(row);

        assert_eq!(ticket.id, TicketId::new(7));
        assert_eq!(ticket.allocation, i64::from(i32::MAX));
    }

    #[test]
    fn test_allocation_column_range() {
        assert_eq!(to_column(100), Ok(100));
        assert!(to_column(i64::from(i32::MAX) + 1).is_err());
    }

    #[test]
    fn test_non_database_errors_are_generic() {
        let err = query_error("Failed to get ticket", &sqlx::Error::RowNotFound);
        assert!(matches!(err, StoreError::Database(msg) if msg.starts_with("Failed to get ticket")));
    }
}
