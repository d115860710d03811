// Embedded SQLite destination
//
// One connection, one writer. Every column is TEXT. A transaction opened by
// `begin` routes all statements through itself until `commit`.

use super::{Checkpoint, Destination};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use nibrs_common::{NibrsError, Result};
use sqlx::pool::PoolConnection;
use sqlx::sqlite::{
    SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions, SqliteSynchronous,
};
use sqlx::{QueryBuilder, Row, Sqlite, SqliteConnection, Transaction};
use std::collections::{HashMap, HashSet};
use std::ops::{Deref, DerefMut};
use std::path::Path;
use std::time::Duration;
use tracing::{debug, info};

/// Bound parameters allowed in one statement (SQLITE_MAX_VARIABLE_NUMBER)
const MAX_BIND_PARAMS: usize = 32_766;

const CHECKPOINT_TABLE: &str = "_nibrs_checkpoints";

fn db_err(e: sqlx::Error) -> NibrsError {
    NibrsError::Database(e.to_string())
}

/// Quote an identifier for use in SQL text
fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

enum Conn<'a> {
    Tx(&'a mut SqliteConnection),
    Pooled(PoolConnection<Sqlite>),
}

impl Deref for Conn<'_> {
    type Target = SqliteConnection;

    fn deref(&self) -> &SqliteConnection {
        match self {
            Conn::Tx(conn) => &**conn,
            Conn::Pooled(conn) => &**conn,
        }
    }
}

impl DerefMut for Conn<'_> {
    fn deref_mut(&mut self) -> &mut SqliteConnection {
        match self {
            Conn::Tx(conn) => &mut **conn,
            Conn::Pooled(conn) => &mut **conn,
        }
    }
}

pub struct SqliteDestination {
    pool: SqlitePool,
    tx: Option<Transaction<'static, Sqlite>>,
    /// Tables already created or verified by this handle
    verified: HashMap<String, HashSet<String>>,
}

impl SqliteDestination {
    /// Open or create a database file
    pub async fn connect(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let options = Self::base_options().filename(path).create_if_missing(true);
        info!(path = %path.display(), "Opening SQLite destination");
        Self::new(options).await
    }

    /// Private in-memory database, gone once the handle is closed
    pub async fn connect_in_memory() -> Result<Self> {
        Self::new(Self::base_options().filename(":memory:")).await
    }

    fn base_options() -> SqliteConnectOptions {
        SqliteConnectOptions::new()
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal)
            .busy_timeout(Duration::from_secs(5))
    }

    async fn new(options: SqliteConnectOptions) -> Result<Self> {
        // A single connection that never expires: it serialises writers and
        // keeps an in-memory database alive for the life of the handle.
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .min_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await
            .map_err(db_err)?;

        sqlx::query(&format!(
            "CREATE TABLE IF NOT EXISTS {} (
                source_key TEXT PRIMARY KEY,
                lines_consumed INTEGER NOT NULL,
                chunks_committed INTEGER NOT NULL,
                updated_at TEXT NOT NULL
            )",
            CHECKPOINT_TABLE
        ))
        .execute(&pool)
        .await
        .map_err(db_err)?;

        Ok(Self {
            pool,
            tx: None,
            verified: HashMap::new(),
        })
    }

    /// Direct access to the pool, for ad-hoc queries in tests and tools
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    async fn conn(&mut self) -> Result<Conn<'_>> {
        match self.tx.as_mut() {
            Some(tx) => Ok(Conn::Tx(&mut **tx)),
            None => Ok(Conn::Pooled(self.pool.acquire().await.map_err(db_err)?)),
        }
    }

    async fn table_columns(&mut self, table: &str) -> Result<HashSet<String>> {
        let mut conn = self.conn().await?;
        let rows = sqlx::query("SELECT name FROM pragma_table_info(?1)")
            .bind(table)
            .fetch_all(&mut *conn)
            .await
            .map_err(db_err)?;

        rows.iter()
            .map(|row| row.try_get::<String, _>("name").map_err(db_err))
            .collect()
    }
}

#[async_trait]
impl Destination for SqliteDestination {
    async fn ensure_table(&mut self, table: &str, columns: &[&str]) -> Result<()> {
        if let Some(known) = self.verified.get(table) {
            if columns.iter().all(|c| known.contains(*c)) {
                return Ok(());
            }
        }

        let column_defs = columns
            .iter()
            .map(|c| format!("{} TEXT", quote_ident(c)))
            .collect::<Vec<_>>()
            .join(", ");
        let sql = format!("CREATE TABLE IF NOT EXISTS {} ({})", quote_ident(table), column_defs);
        {
            let mut conn = self.conn().await?;
            sqlx::query(&sql).execute(&mut *conn).await.map_err(db_err)?;
        }

        let existing = self.table_columns(table).await?;
        let missing: Vec<String> = columns
            .iter()
            .filter(|c| !existing.contains(**c))
            .map(|c| c.to_string())
            .collect();
        if !missing.is_empty() {
            return Err(NibrsError::SchemaMismatch {
                table: table.to_string(),
                missing,
            });
        }

        debug!(table, columns = columns.len(), "Table ready");
        self.verified.insert(table.to_string(), existing);
        Ok(())
    }

    async fn append_rows(&mut self, table: &str, columns: &[&str], rows: &[Vec<String>]) -> Result<u64> {
        if rows.is_empty() || columns.is_empty() {
            return Ok(0);
        }

        let insert = format!(
            "INSERT INTO {} ({}) ",
            quote_ident(table),
            columns.iter().map(|c| quote_ident(c)).collect::<Vec<_>>().join(", ")
        );
        let rows_per_statement = (MAX_BIND_PARAMS / columns.len()).max(1);

        let mut conn = self.conn().await?;
        let mut written = 0u64;
        for batch in rows.chunks(rows_per_statement) {
            let mut query_builder: QueryBuilder<Sqlite> = QueryBuilder::new(insert.as_str());
            query_builder.push_values(batch, |mut b, row| {
                for value in row {
                    b.push_bind(value.as_str());
                }
            });

            let result = query_builder
                .build()
                .execute(&mut *conn)
                .await
                .map_err(db_err)?;
            written += result.rows_affected();
        }

        Ok(written)
    }

    async fn count_rows(&mut self, table: &str) -> Result<u64> {
        let sql = format!("SELECT COUNT(*) FROM {}", quote_ident(table));
        let mut conn = self.conn().await?;
        let count = sqlx::query_scalar::<_, i64>(&sql)
            .fetch_one(&mut *conn)
            .await
            .map_err(db_err)?;
        Ok(count.max(0) as u64)
    }

    async fn list_tables(&mut self) -> Result<Vec<String>> {
        let mut conn = self.conn().await?;
        sqlx::query_scalar::<_, String>(
            r#"
            SELECT name FROM sqlite_master
            WHERE type = 'table'
              AND name NOT LIKE 'sqlite\_%' ESCAPE '\'
              AND name NOT LIKE '\_nibrs\_%' ESCAPE '\'
            ORDER BY name
            "#,
        )
        .fetch_all(&mut *conn)
        .await
        .map_err(db_err)
    }

    async fn begin(&mut self) -> Result<()> {
        if self.tx.is_some() {
            return Err(NibrsError::Database("transaction already open".to_string()));
        }
        self.tx = Some(self.pool.begin().await.map_err(db_err)?);
        Ok(())
    }

    async fn commit(&mut self) -> Result<()> {
        let tx = self
            .tx
            .take()
            .ok_or_else(|| NibrsError::Database("commit without an open transaction".to_string()))?;
        tx.commit().await.map_err(db_err)
    }

    async fn load_checkpoint(&mut self, source_key: &str) -> Result<Option<Checkpoint>> {
        let sql = format!(
            "SELECT source_key, lines_consumed, chunks_committed, updated_at FROM {} WHERE source_key = ?1",
            CHECKPOINT_TABLE
        );
        let mut conn = self.conn().await?;
        let row = sqlx::query(&sql)
            .bind(source_key)
            .fetch_optional(&mut *conn)
            .await
            .map_err(db_err)?;

        row.map(|row| {
            Ok(Checkpoint {
                source_key: row.try_get("source_key").map_err(db_err)?,
                lines_consumed: row.try_get::<i64, _>("lines_consumed").map_err(db_err)?.max(0) as u64,
                chunks_committed: row.try_get::<i64, _>("chunks_committed").map_err(db_err)?.max(0) as u64,
                updated_at: row.try_get::<DateTime<Utc>, _>("updated_at").map_err(db_err)?,
            })
        })
        .transpose()
    }

    async fn store_checkpoint(&mut self, checkpoint: &Checkpoint) -> Result<()> {
        let sql = format!(
            "INSERT INTO {} (source_key, lines_consumed, chunks_committed, updated_at)
             VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(source_key) DO UPDATE SET
                lines_consumed = excluded.lines_consumed,
                chunks_committed = excluded.chunks_committed,
                updated_at = excluded.updated_at",
            CHECKPOINT_TABLE
        );
        let mut conn = self.conn().await?;
        sqlx::query(&sql)
            .bind(&checkpoint.source_key)
            .bind(checkpoint.lines_consumed as i64)
            .bind(checkpoint.chunks_committed as i64)
            .bind(checkpoint.updated_at)
            .execute(&mut *conn)
            .await
            .map_err(db_err)?;
        Ok(())
    }

    async fn close(&mut self) -> Result<()> {
        if let Some(tx) = self.tx.take() {
            tx.rollback().await.map_err(db_err)?;
        }
        self.pool.close().await;
        Ok(())
    }
}
