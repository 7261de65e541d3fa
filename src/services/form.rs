use axum::extract::multipart::{Field, MultipartError};
use axum::extract::Multipart;
use axum::http::StatusCode;
use std::path::PathBuf;
use tokio::io::AsyncWriteExt;
use uuid::Uuid;

use crate::error::{AppError, Result};
use crate::models::Blog;
use crate::storage::ImageStore;

const IMAGES_FAILED: &str = "images could not be processed";

/// An uploaded file part spooled to a temporary file, removed on drop
struct SpooledFile {
    original_name: String,
    path: PathBuf,
}

impl Drop for SpooledFile {
    fn drop(&mut self) {
        if let Err(e) = std::fs::remove_file(&self.path) {
            if e.kind() != std::io::ErrorKind::NotFound {
                tracing::error!("Failed to remove temp file {:?}: {}", self.path, e);
            }
        }
    }
}

/// Fields of the upload form as sent, before validation
#[derive(Default)]
struct RawForm {
    title: Option<String>,
    author_id: Option<String>,
    content: Option<String>,
    images: Vec<SpooledFile>,
}

/// Decoder for the multipart blog upload form
pub struct BlogForm;

impl BlogForm {
    /// Read and validate an upload, storing its images under the author's namespace.
    ///
    /// Checks run in the order title, author id, content, images. If any image
    /// fails, the images already stored for this request are removed again.
    pub async fn decode(multipart: Multipart, images: &ImageStore) -> Result<Blog> {
        let form = Self::read(multipart).await?;

        // Blank checks trim, the stored title does not
        let title = form
            .title
            .as_deref()
            .filter(|t| !t.trim().is_empty())
            .ok_or_else(|| AppError::BadRequest("title is empty".to_string()))?;

        let author_id = form
            .author_id
            .as_deref()
            .and_then(|v| v.trim().parse::<i64>().ok())
            .filter(|id| *id > 0)
            .ok_or_else(|| AppError::BadRequest("authorId is not a valid number".to_string()))?;

        let content = form
            .content
            .as_deref()
            .filter(|c| !c.trim().is_empty())
            .ok_or_else(|| AppError::BadRequest("content is empty".to_string()))?;

        let mut stored = Vec::with_capacity(form.images.len());
        for file in &form.images {
            match images
                .store_file(&file.path, &file.original_name, Some(author_id))
                .await
            {
                Ok(name) => stored.push(name),
                Err(e) => {
                    tracing::warn!(
                        author_id,
                        file = %file.original_name,
                        rolled_back = stored.len(),
                        "Image upload failed: {}",
                        e
                    );
                    images.remove_all(&stored, Some(author_id)).await;
                    return Err(match e {
                        AppError::InvalidInput(_) => {
                            AppError::BadRequest(IMAGES_FAILED.to_string())
                        }
                        _ => AppError::Internal(IMAGES_FAILED.to_string()),
                    });
                }
            }
        }

        Ok(Blog {
            id: 0,
            title: title.to_string(),
            content: content.to_string(),
            images: stored,
            author_id,
        })
    }

    /// Drain the multipart stream. The first value of each text field wins.
    async fn read(mut multipart: Multipart) -> Result<RawForm> {
        let mut form = RawForm::default();

        while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
            let name = field.name().unwrap_or("").to_string();

            match name.as_str() {
                "title" => set_once(&mut form.title, field).await?,
                "author_id" => set_once(&mut form.author_id, field).await?,
                "content" => set_once(&mut form.content, field).await?,
                "images" | "images[]" => {
                    // Browsers send an unnamed empty part when no file was picked
                    let original_name = match field.file_name() {
                        Some(n) if !n.is_empty() => n.to_string(),
                        _ => continue,
                    };
                    form.images.push(spool(field, original_name).await?);
                }
                _ => {}
            }
        }

        Ok(form)
    }
}

async fn set_once(slot: &mut Option<String>, field: Field<'_>) -> Result<()> {
    let text = field.text().await.map_err(multipart_error)?;
    if slot.is_none() {
        *slot = Some(text);
    }
    Ok(())
}

async fn spool(mut field: Field<'_>, original_name: String) -> Result<SpooledFile> {
    let spooled = SpooledFile {
        original_name,
        path: std::env::temp_dir().join(format!("blogd_upload_{}", Uuid::new_v4())),
    };

    let mut file = tokio::fs::File::create(&spooled.path)
        .await
        .map_err(|e| AppError::Internal(format!("Failed to create temp file: {}", e)))?;

    while let Some(chunk) = field.chunk().await.map_err(multipart_error)? {
        file.write_all(&chunk)
            .await
            .map_err(|e| AppError::Internal(format!("Failed to write to temp file: {}", e)))?;
    }

    file.flush()
        .await
        .map_err(|e| AppError::Internal(format!("Failed to flush temp file: {}", e)))?;

    Ok(spooled)
}

fn multipart_error(e: MultipartError) -> AppError {
    if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
        AppError::PayloadTooLarge(e.body_text())
    } else {
        AppError::BadRequest(format!("Failed to process multipart: {}", e.body_text()))
    }
}
