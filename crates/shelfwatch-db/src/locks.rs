//! Postgres advisory locks: per-product mutual exclusion and cross-replica
//! leader election.
//!
//! Keys are namespaced 64-bit integers, `(namespace << 32) | job_id`.
//! Advisory locks are session-scoped, so every helper here pins one pool
//! connection for the lock's lifetime and releases on that same connection.
//! [`with_product_lock`] is the only sanctioned idiom for per-product locks;
//! manual acquire/release outside it loses the released-on-every-exit-path
//! guarantee.

use std::future::Future;

use sqlx::{PgConnection, PgPool};

use crate::DbError;

/// High 32 bits of an advisory key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockNamespace {
    /// Cross-replica singletons (the main scheduler).
    Scheduler = 0,
    /// Per-product check serialization.
    ProductCheck = 1,
}

/// Job id of the global scheduler-leader lock.
pub const MAIN_SCHEDULER_JOB_ID: i64 = 0;

/// Compose the 64-bit advisory key.
#[must_use]
pub fn advisory_key(namespace: LockNamespace, job_id: i64) -> i64 {
    ((namespace as i64) << 32) | (job_id & 0xFFFF_FFFF)
}

async fn try_lock(conn: &mut PgConnection, key: i64) -> Result<bool, DbError> {
    let locked: bool = sqlx::query_scalar("SELECT pg_try_advisory_lock($1)")
        .bind(key)
        .fetch_one(&mut *conn)
        .await?;
    Ok(locked)
}

async fn unlock(conn: &mut PgConnection, key: i64) -> Result<bool, DbError> {
    let released: bool = sqlx::query_scalar("SELECT pg_advisory_unlock($1)")
        .bind(key)
        .fetch_one(&mut *conn)
        .await?;
    Ok(released)
}

/// Run `work` under the product's advisory lock.
///
/// Non-blocking: returns `Ok(None)` when another session holds the lock
/// (the caller records a skip, not an error). The lock is taken on a
/// dedicated connection and released on that connection whether `work`
/// succeeds or fails.
///
/// # Errors
///
/// Returns the error from `work`, or a [`DbError`] (converted into `E`) if
/// lock acquisition itself fails.
pub async fn with_product_lock<T, E, F, Fut>(
    pool: &PgPool,
    product_id: i64,
    work: F,
) -> Result<Option<T>, E>
where
    E: From<DbError>,
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    let mut conn = pool
        .acquire()
        .await
        .map_err(|e| E::from(DbError::from(e)))?;
    let key = advisory_key(LockNamespace::ProductCheck, product_id);

    if !try_lock(&mut conn, key).await.map_err(E::from)? {
        tracing::debug!(product_id, key, "product advisory lock contended; skipping");
        return Ok(None);
    }

    let result = work().await;

    match unlock(&mut conn, key).await {
        Ok(true) => {}
        Ok(false) => {
            tracing::error!(product_id, key, "advisory unlock reported no lock held");
        }
        Err(e) => {
            tracing::error!(product_id, key, error = %e, "failed to release product advisory lock");
        }
    }

    result.map(Some)
}

/// The cross-replica leadership lock.
///
/// Holds a connection detached from the pool for the process lifetime; if
/// the guard is dropped without [`LeaderLock::release`], closing the
/// connection releases the lock server-side, so a crashed leader never
/// wedges the fleet.
pub struct LeaderLock {
    conn: PgConnection,
    key: i64,
}

impl LeaderLock {
    /// Try to become the leader. `Ok(None)` means another worker already
    /// holds the `MAIN_SCHEDULER` lock.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Sqlx`] if the connection or lock query fails.
    pub async fn acquire(pool: &PgPool) -> Result<Option<Self>, DbError> {
        let conn = pool.acquire().await?;
        let mut conn = conn.detach();
        let key = advisory_key(LockNamespace::Scheduler, MAIN_SCHEDULER_JOB_ID);

        if try_lock(&mut conn, key).await? {
            Ok(Some(Self { conn, key }))
        } else {
            Ok(None)
        }
    }

    /// The advisory key this guard holds, for status reporting.
    #[must_use]
    pub fn key(&self) -> i64 {
        self.key
    }

    /// Release the lock explicitly during graceful shutdown.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Sqlx`] if the unlock query fails; the connection
    /// is closed regardless.
    pub async fn release(mut self) -> Result<(), DbError> {
        unlock(&mut self.conn, self.key).await?;
        Ok(())
    }
}
