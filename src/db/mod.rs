use std::sync::Arc;

use anyhow::Context;
use serde_json::Value;
#[cfg(feature = "postgres")]
use sqlx::any::AnyKind;
use sqlx::any::AnyPoolOptions;
use sqlx::AnyPool;
use tokio::sync::OnceCell;
use tracing::{debug, info, warn};

use crate::config;
use crate::keys::generate_key;
use crate::models::{now_timestamp, Fields, PasteRow, PasteSummary};

pub mod select;
use select::{quote, Placeholders, Select};

/// Tries at a fresh generated id before giving up on an insert.
const MAX_KEY_ATTEMPTS: usize = 8;

/// The table every paste lives in.
pub const TABLE: &str = "paste";

const SCHEMA: &[&str] = &[
    r#"CREATE TABLE IF NOT EXISTS "paste" (
        "id" TEXT PRIMARY KEY,
        "type" TEXT NOT NULL,
        "summary" TEXT NOT NULL DEFAULT '',
        "user" TEXT NOT NULL DEFAULT '',
        "content" TEXT NOT NULL,
        "created" TEXT NOT NULL,
        "expires" TEXT,
        "parent" TEXT
    )"#,
    r#"CREATE INDEX IF NOT EXISTS "paste_parent" ON "paste" ("parent")"#,
];

/// Relational access to the paste table.
pub trait Store {
    /// Insert a row and return its id.
    async fn insert(&self, values: &Fields) -> crate::AppResult<String>;

    async fn fetch_row(&self, select: &Select) -> crate::AppResult<Option<PasteRow>>;

    async fn fetch_all(&self, select: &Select) -> crate::AppResult<Vec<PasteSummary>>;

    /// The first column of every row.
    async fn fetch_col(&self, select: &Select) -> crate::AppResult<Vec<String>>;

    /// The first column of the first row.
    async fn fetch_one(&self, select: &Select) -> crate::AppResult<i64>;

    /// The table's column names.
    async fn columns(&self) -> crate::AppResult<Vec<String>>;
}

#[derive(Clone)]
pub struct Database {
    pool: AnyPool,
    key_length: usize,
    columns: Arc<OnceCell<Vec<String>>>,
}

impl Database {
    /// Connect to a database by URL.
    pub async fn connect(config: &config::Database) -> anyhow::Result<Self> {
        let mut options = AnyPoolOptions::new().max_connections(config.max_connections.max(1));
        if config.url.contains(":memory:") {
            // every connection to an in-memory SQLite database gets its own database
            options = options
                .max_connections(1)
                .idle_timeout(None)
                .max_lifetime(None);
        }

        let pool = options
            .connect(&config.url)
            .await
            .with_context(|| format!("failed to connect to {}", config.url))?;

        Ok(Self {
            pool,
            key_length: crate::keys::DEFAULT_KEY_LENGTH,
            columns: Arc::new(OnceCell::new()),
        })
    }

    /// Length of generated paste ids.
    pub fn with_key_length(mut self, key_length: usize) -> Self {
        self.key_length = key_length;
        self
    }

    /// Create the paste table and its index if they are missing.
    pub async fn create_schema(&self) -> crate::AppResult<()> {
        for statement in SCHEMA {
            sqlx::query(statement).execute(&self.pool).await?;
        }
        Ok(())
    }

    fn placeholders(&self) -> Placeholders {
        match self.pool.any_kind() {
            #[cfg(feature = "postgres")]
            AnyKind::Postgres => Placeholders::Numbered,
            #[allow(unreachable_patterns)]
            _ => Placeholders::Question,
        }
    }

    async fn introspect_columns(&self) -> crate::AppResult<Vec<String>> {
        let sql = match self.pool.any_kind() {
            #[cfg(feature = "postgres")]
            AnyKind::Postgres => {
                "SELECT column_name::text FROM information_schema.columns WHERE table_name = $1 \
                 ORDER BY ordinal_position"
            }
            #[allow(unreachable_patterns)]
            _ => "SELECT name FROM pragma_table_info(?) ORDER BY cid",
        };
        Ok(sqlx::query_scalar::<_, String>(sql)
            .bind(TABLE)
            .fetch_all(&self.pool)
            .await?)
    }
}

impl Store for Database {
    async fn insert(&self, values: &Fields) -> crate::AppResult<String> {
        let columns = self.columns().await?;

        let supplied = match values.get("id") {
            Some(Value::String(id)) if !id.is_empty() => Some(id.clone()),
            _ => None,
        };
        let created = match values.get("created") {
            Some(Value::String(created)) if !created.is_empty() => created.clone(),
            _ => now_timestamp(),
        };

        let mut names = vec![quote("id"), quote("created")];
        let mut params = vec![None, Some(created)];
        for (name, value) in values {
            if name == "id" || name == "created" {
                continue;
            }
            if !columns.contains(name) {
                warn!("dropping unknown field '{name}'");
                continue;
            }
            names.push(quote(name));
            params.push(match value {
                Value::Null => None,
                Value::String(s) => Some(s.clone()),
                other => Some(other.to_string()),
            });
        }

        let placeholders = self.placeholders();
        let marks: Vec<String> = (1..=params.len()).map(|n| placeholders.nth(n)).collect();
        let sql = format!(
            "INSERT INTO {} ({}) VALUES ({})",
            quote(TABLE),
            names.join(", "),
            marks.join(", ")
        );
        debug!("{sql}");

        let mut attempt = 1;
        loop {
            let id = supplied
                .clone()
                .unwrap_or_else(|| generate_key(self.key_length));
            params[0] = Some(id.clone());

            let mut query = sqlx::query(&sql);
            for param in &params {
                query = query.bind(param.as_deref());
            }
            match query.execute(&self.pool).await {
                Ok(_) => {
                    info!("new paste: id='{id}'");
                    return Ok(id);
                }
                // only generated ids are retried
                Err(error)
                    if supplied.is_none()
                        && attempt < MAX_KEY_ATTEMPTS
                        && is_unique_violation(&error) =>
                {
                    warn!("generated id '{id}' is taken, retrying");
                    attempt += 1;
                }
                Err(error) => return Err(error.into()),
            }
        }
    }

    async fn fetch_row(&self, select: &Select) -> crate::AppResult<Option<PasteRow>> {
        let (sql, params) = select.render(self.placeholders());
        debug!("{sql}");
        let mut query = sqlx::query_as::<_, PasteRow>(&sql);
        for param in params {
            query = query.bind(param);
        }
        Ok(query.fetch_optional(&self.pool).await?)
    }

    async fn fetch_all(&self, select: &Select) -> crate::AppResult<Vec<PasteSummary>> {
        let (sql, params) = select.render(self.placeholders());
        debug!("{sql}");
        let mut query = sqlx::query_as::<_, PasteSummary>(&sql);
        for param in params {
            query = query.bind(param);
        }
        Ok(query.fetch_all(&self.pool).await?)
    }

    async fn fetch_col(&self, select: &Select) -> crate::AppResult<Vec<String>> {
        let (sql, params) = select.render(self.placeholders());
        debug!("{sql}");
        let mut query = sqlx::query_scalar::<_, String>(&sql);
        for param in params {
            query = query.bind(param);
        }
        Ok(query.fetch_all(&self.pool).await?)
    }

    async fn fetch_one(&self, select: &Select) -> crate::AppResult<i64> {
        let (sql, params) = select.render(self.placeholders());
        debug!("{sql}");
        let mut query = sqlx::query_scalar::<_, i64>(&sql);
        for param in params {
            query = query.bind(param);
        }
        Ok(query.fetch_one(&self.pool).await?)
    }

    async fn columns(&self) -> crate::AppResult<Vec<String>> {
        if let Some(columns) = self.columns.get() {
            return Ok(columns.clone());
        }
        // an empty list means the table is not there yet; ask again next time
        let columns = self.introspect_columns().await?;
        if !columns.is_empty() {
            _ = self.columns.set(columns.clone());
        }
        Ok(columns)
    }
}

/// Primary key or unique constraint failures, by backend error code.
fn is_unique_violation(error: &sqlx::Error) -> bool {
    let sqlx::Error::Database(error) = error else {
        return false;
    };
    // SQLite extended codes for PRIMARY KEY and UNIQUE, Postgres `unique_violation`
    matches!(error.code().as_deref(), Some("1555" | "2067" | "23505"))
}
