use sqlx::any::AnyPoolOptions;
use sqlx::AnyPool;

use crate::error::{AppError, Result};

/// SQL dialect behind the pool, picked from the connection URL
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backend {
    MySql,
    Sqlite,
}

impl Backend {
    pub fn from_url(url: &str) -> Result<Self> {
        if url.starts_with("mysql:") || url.starts_with("mariadb:") {
            Ok(Backend::MySql)
        } else if url.starts_with("sqlite:") {
            Ok(Backend::Sqlite)
        } else {
            Err(AppError::Internal(
                "Unsupported database URL scheme (expected mysql: or sqlite:)".to_string(),
            ))
        }
    }
}

/// Database connection pool wrapper
#[derive(Clone)]
pub struct Database {
    pool: AnyPool,
    backend: Backend,
}

impl Database {
    /// Open a bounded connection pool
    pub async fn new(url: &str, max_connections: u32) -> Result<Self> {
        let backend = Backend::from_url(url)?;
        sqlx::any::install_default_drivers();

        let pool = AnyPoolOptions::new()
            .max_connections(max_connections)
            .connect(url)
            .await?;

        Ok(Self { pool, backend })
    }

    /// Get the connection pool
    pub fn pool(&self) -> &AnyPool {
        &self.pool
    }

    pub fn backend(&self) -> Backend {
        self.backend
    }

    /// Create the tables if they do not exist yet
    pub async fn run_migrations(&self) -> Result<()> {
        match self.backend {
            Backend::Sqlite => {
                sqlx::query(
                    r#"
                    CREATE TABLE IF NOT EXISTS authors (
                        id INTEGER PRIMARY KEY AUTOINCREMENT,
                        name TEXT NOT NULL
                    )
                    "#,
                )
                .execute(&self.pool)
                .await?;

                sqlx::query(
                    r#"
                    CREATE TABLE IF NOT EXISTS blogs (
                        id INTEGER PRIMARY KEY AUTOINCREMENT,
                        author INTEGER NOT NULL,
                        content TEXT NOT NULL,
                        image TEXT NOT NULL,
                        title TEXT NOT NULL
                    )
                    "#,
                )
                .execute(&self.pool)
                .await?;

                sqlx::query("CREATE INDEX IF NOT EXISTS idx_blogs_author ON blogs(author)")
                    .execute(&self.pool)
                    .await?;
            }
            Backend::MySql => {
                sqlx::query(
                    r#"
                    CREATE TABLE IF NOT EXISTS authors (
                        id BIGINT AUTO_INCREMENT PRIMARY KEY,
                        name TEXT NOT NULL
                    )
                    "#,
                )
                .execute(&self.pool)
                .await?;

                // MySQL has no CREATE INDEX IF NOT EXISTS, so the index is inline
                sqlx::query(
                    r#"
                    CREATE TABLE IF NOT EXISTS blogs (
                        id BIGINT AUTO_INCREMENT PRIMARY KEY,
                        author BIGINT NOT NULL,
                        content TEXT NOT NULL,
                        image TEXT NOT NULL,
                        title TEXT NOT NULL,
                        INDEX idx_blogs_author (author)
                    )
                    "#,
                )
                .execute(&self.pool)
                .await?;
            }
        }

        tracing::info!("Database migrations completed ({:?})", self.backend);
        Ok(())
    }
}
