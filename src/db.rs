use anyhow::Context;
use sqlx::{
    postgres::{PgConnectOptions, PgPoolOptions},
    PgPool, Postgres, Transaction,
};
use std::str::FromStr;
use std::time::Duration;

use crate::config::Config;

#[derive(Clone)]
pub struct Database {
    pub pool: PgPool,
}

impl Database {
    pub async fn new(config: &Config) -> anyhow::Result<Self> {
        let pool = Self::pool_options(config)
            .connect_with(Self::connect_options(config)?)
            .await?;

        Ok(Database { pool })
    }

    /// Builds the pool without opening a connection; the first query connects.
    pub fn connect_lazy(config: &Config) -> anyhow::Result<Self> {
        let pool = Self::pool_options(config).connect_lazy_with(Self::connect_options(config)?);
        Ok(Database { pool })
    }

    fn pool_options(config: &Config) -> PgPoolOptions {
        PgPoolOptions::new()
            .max_connections(config.db_max_connections)
            .min_connections(1)
            .acquire_timeout(Duration::from_secs(config.db_acquire_timeout_secs))
            .idle_timeout(Duration::from_secs(600))
            .max_lifetime(Duration::from_secs(3600))
    }

    fn connect_options(config: &Config) -> anyhow::Result<PgConnectOptions> {
        let options = match config.database_url {
            Some(ref url) => PgConnectOptions::from_str(url)?,
            None => PgConnectOptions::new()
                .host(&config.db_host)
                .port(config.db_port)
                .username(&config.db_user)
                .password(&config.db_password)
                .database(&config.db_name)
                .ssl_mode(config.db_ssl_mode),
        };

        Ok(match config.db_ssl_root_cert {
            Some(ref path) => options.ssl_root_cert(path),
            None => options,
        })
    }

    pub async fn run_migrations(&self) -> anyhow::Result<()> {
        let migrations = vec![include_str!("../migrations/postgres/001_initial.sql")];

        for (idx, migration_sql) in migrations.iter().enumerate() {
            tracing::info!("Running migration {}", idx + 1);
            self.apply_migration(migration_sql)
                .await
                .with_context(|| format!("Migration {} failed", idx + 1))?;
        }

        tracing::info!("All migrations completed");
        Ok(())
    }

    /// Executes each `;`-separated statement of `migration_sql`.
    ///
    /// Objects that already exist are skipped. A unique index that cannot be
    /// built over existing duplicate rows is logged and skipped. Any other
    /// failure aborts the migration.
    pub async fn apply_migration(&self, migration_sql: &str) -> anyhow::Result<()> {
        for statement in migration_sql.split(';') {
            let trimmed = statement.trim();
            if trimmed.is_empty() || trimmed.lines().all(|l| l.trim_start().starts_with("--")) {
                continue;
            }

            match sqlx::query(trimmed).execute(&self.pool).await {
                Ok(_) => {}
                Err(e) if e.to_string().contains("already exists") => {
                    tracing::debug!("Skipping existing object: {}", e);
                }
                Err(e) if is_unique_violation(&e) => {
                    tracing::warn!(
                        "Unique index skipped, existing rows are duplicated: {} - Error: {}",
                        trimmed,
                        e
                    );
                }
                Err(e) => {
                    return Err(anyhow::Error::new(e).context(format!("Statement failed: {}", trimmed)));
                }
            }
        }

        Ok(())
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    pub async fn begin(&self) -> Result<Transaction<'static, Postgres>, sqlx::Error> {
        self.pool.begin().await
    }

    pub async fn ping(&self) -> Result<(), sqlx::Error> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    err.as_database_error()
        .is_some_and(|db_err| db_err.is_unique_violation())
}
