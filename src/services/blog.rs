use crate::db::{Backend, Database};
use crate::error::{AppError, Result};
use crate::models::{Blog, BlogRow};
use crate::storage::ImageStore;

const SELECT_BLOG: &str = "SELECT id, author, content, image, title FROM blogs";

/// Persistence for blog posts
pub struct BlogRepository;

impl BlogRepository {
    /// Insert a blog and return the id the database assigned
    pub async fn insert(db: &Database, blog: &Blog) -> Result<i64> {
        let row = blog.to_row()?;

        // The generated id is per connection, so read it back on the same one
        let mut conn = db.pool().acquire().await?;
        let result =
            sqlx::query("INSERT INTO blogs (author, content, image, title) VALUES (?, ?, ?, ?)")
                .bind(row.author)
                .bind(row.content)
                .bind(row.image)
                .bind(row.title)
                .execute(&mut *conn)
                .await?;

        let id = match result.last_insert_id() {
            Some(id) => id,
            None => {
                let sql = match db.backend() {
                    Backend::Sqlite => "SELECT last_insert_rowid()",
                    Backend::MySql => "SELECT CAST(LAST_INSERT_ID() AS SIGNED)",
                };
                sqlx::query_scalar::<_, i64>(sql).fetch_one(&mut *conn).await?
            }
        };

        if id <= 0 {
            return Err(AppError::Internal(
                "Database did not report the id of the inserted blog".to_string(),
            ));
        }
        Ok(id)
    }

    pub async fn fetch_by_id(db: &Database, id: i64) -> Result<Blog> {
        let row: BlogRow = sqlx::query_as(&format!("{} WHERE id = ?", SELECT_BLOG))
            .bind(id)
            .fetch_optional(db.pool())
            .await?
            .ok_or_else(|| AppError::NotFound(format!("blog {} not found", id)))?;

        Blog::try_from(row)
    }

    pub async fn list_by_author(db: &Database, author_id: i64) -> Result<Vec<Blog>> {
        let rows: Vec<BlogRow> =
            sqlx::query_as(&format!("{} WHERE author = ? ORDER BY id", SELECT_BLOG))
                .bind(author_id)
                .fetch_all(db.pool())
                .await?;

        rows.into_iter().map(Blog::try_from).collect()
    }

    /// Blogs whose content contains `term` literally; an empty term matches every row
    pub async fn search(db: &Database, term: &str) -> Result<Vec<Blog>> {
        // INSTR instead of LIKE: no wildcard escaping, same in MySQL and SQLite
        let rows: Vec<BlogRow> =
            sqlx::query_as(&format!("{} WHERE INSTR(content, ?) > 0 ORDER BY id", SELECT_BLOG))
                .bind(term)
                .fetch_all(db.pool())
                .await?;

        rows.into_iter().map(Blog::try_from).collect()
    }

    /// Number of blogs by an author.
    ///
    /// Unknown authors count as zero, the same as authors without posts, so
    /// the endpoint cannot be used to discover which author ids exist.
    pub async fn count_by_author(db: &Database, author_id: i64) -> Result<i64> {
        let count: Option<i64> = sqlx::query_scalar("SELECT COUNT(*) FROM blogs WHERE author = ?")
            .bind(author_id)
            .fetch_optional(db.pool())
            .await?;

        Ok(count.unwrap_or(0))
    }

    /// Delete a blog and, best-effort, its images.
    ///
    /// Image cleanup never blocks the row delete; failures are logged so the
    /// orphaned files can be reconciled. A missing id is not an error.
    pub async fn delete(db: &Database, images: &ImageStore, id: i64) -> Result<()> {
        match Self::fetch_by_id(db, id).await {
            Ok(blog) => {
                let failed = images.remove_all(&blog.images, Some(blog.author_id)).await;
                if failed > 0 {
                    tracing::warn!(
                        blog_id = id,
                        author_id = blog.author_id,
                        failed,
                        "Some images of the deleted blog were left on disk"
                    );
                }
            }
            Err(AppError::NotFound(_)) => {}
            Err(e) => {
                tracing::warn!(
                    blog_id = id,
                    "Skipping image cleanup, blog could not be read: {}",
                    e
                );
            }
        }

        let result = sqlx::query("DELETE FROM blogs WHERE id = ?")
            .bind(id)
            .execute(db.pool())
            .await?;

        tracing::debug!(blog_id = id, rows = result.rows_affected(), "Deleted blog");
        Ok(())
    }
}
