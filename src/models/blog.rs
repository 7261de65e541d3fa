use serde::{Deserialize, Serialize};
use sqlx::any::AnyRow;
use sqlx::{FromRow, Row};

use crate::error::AppError;

/// Blog post
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Blog {
    /// Assigned by the database; 0 until inserted
    pub id: i64,
    pub title: String,
    pub content: String,
    /// Generated image file names, in upload order
    pub images: Vec<String>,
    pub author_id: i64,
}

/// Raw `blogs` row
#[derive(Debug, Clone)]
pub struct BlogRow {
    pub id: i64,
    pub author: i64,
    pub content: String,
    /// JSON array of image file names
    pub image: String,
    pub title: String,
}

impl FromRow<'_, AnyRow> for BlogRow {
    fn from_row(row: &AnyRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            id: row.try_get("id")?,
            author: row.try_get("author")?,
            content: text_column(row, "content")?,
            image: text_column(row, "image")?,
            title: text_column(row, "title")?,
        })
    }
}

// MySQL TEXT can reach the Any driver as a blob
fn text_column(row: &AnyRow, column: &str) -> Result<String, sqlx::Error> {
    match row.try_get::<String, _>(column) {
        Ok(text) => Ok(text),
        Err(_) => {
            let bytes: Vec<u8> = row.try_get(column)?;
            String::from_utf8(bytes).map_err(|e| sqlx::Error::ColumnDecode {
                index: column.to_string(),
                source: Box::new(e),
            })
        }
    }
}

/// Column values for an insert
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewBlogRow {
    pub author: i64,
    pub content: String,
    pub image: String,
    pub title: String,
}

impl Blog {
    pub fn to_row(&self) -> Result<NewBlogRow, AppError> {
        let image = serde_json::to_string(&self.images)
            .map_err(|e| AppError::Internal(format!("Failed to encode images: {}", e)))?;

        Ok(NewBlogRow {
            author: self.author_id,
            content: self.content.clone(),
            image,
            title: self.title.clone(),
        })
    }
}

impl TryFrom<BlogRow> for Blog {
    type Error = AppError;

    fn try_from(row: BlogRow) -> Result<Self, Self::Error> {
        let images: Vec<String> = serde_json::from_str(&row.image).map_err(|e| {
            AppError::CorruptData(format!("blog {} has an unreadable image list: {}", row.id, e))
        })?;

        Ok(Blog {
            id: row.id,
            title: row.title,
            content: row.content,
            images,
            author_id: row.author,
        })
    }
}

/// `?id=`
#[derive(Debug, Deserialize)]
pub struct IdQuery {
    pub id: i64,
}

/// `?q=`; a missing term searches for the empty string
#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    #[serde(default)]
    pub q: String,
}

/// `?authorID=`
#[derive(Debug, Deserialize)]
pub struct AuthorCountQuery {
    #[serde(rename = "authorID")]
    pub author_id: i64,
}
