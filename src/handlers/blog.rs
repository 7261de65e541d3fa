use axum::{
    extract::{rejection::QueryRejection, Multipart, Query, State},
    http::StatusCode,
    Json,
};

use crate::error::{AppError, Result};
use crate::models::{AuthorCountQuery, Blog, IdQuery, SearchQuery};
use crate::services::{BlogForm, BlogRepository};
use crate::AppState;

fn query<T>(extracted: std::result::Result<Query<T>, QueryRejection>) -> Result<T> {
    extracted
        .map(|Query(q)| q)
        .map_err(|rejection| AppError::BadRequest(rejection.body_text()))
}

/// Publish a blog from a multipart form
/// POST /api/upload
pub async fn upload(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<(StatusCode, &'static str)> {
    let blog = BlogForm::decode(multipart, &state.images).await?;

    match BlogRepository::insert(&state.db, &blog).await {
        Ok(id) => {
            tracing::info!(
                blog_id = id,
                author_id = blog.author_id,
                images = blog.images.len(),
                "Blog published"
            );
            Ok((StatusCode::CREATED, "Uploaded successfully!"))
        }
        Err(e) => {
            // The row never landed, so its images would be unreachable
            state.images.remove_all(&blog.images, Some(blog.author_id)).await;
            Err(e)
        }
    }
}

/// Blogs whose content contains the search term
/// GET /api/search?q=term
pub async fn search(
    State(state): State<AppState>,
    params: std::result::Result<Query<SearchQuery>, QueryRejection>,
) -> Result<Json<Vec<Blog>>> {
    let params = query(params)?;
    let blogs = BlogRepository::search(&state.db, &params.q).await?;
    Ok(Json(blogs))
}

/// Blogs written by an author
/// GET /api/author?id=3
pub async fn list_by_author(
    State(state): State<AppState>,
    params: std::result::Result<Query<IdQuery>, QueryRejection>,
) -> Result<Json<Vec<Blog>>> {
    let params = query(params)?;
    let blogs = BlogRepository::list_by_author(&state.db, params.id).await?;
    Ok(Json(blogs))
}

/// Number of blogs by an author
/// GET /api/blog-count?authorID=2
pub async fn blog_count(
    State(state): State<AppState>,
    params: std::result::Result<Query<AuthorCountQuery>, QueryRejection>,
) -> Result<Json<i64>> {
    let params = query(params)?;
    let count = BlogRepository::count_by_author(&state.db, params.author_id).await?;
    Ok(Json(count))
}

/// GET /api/blog?id=3
pub async fn get_blog(
    State(state): State<AppState>,
    params: std::result::Result<Query<IdQuery>, QueryRejection>,
) -> Result<Json<Blog>> {
    let params = query(params)?;
    let blog = BlogRepository::fetch_by_id(&state.db, params.id).await?;
    Ok(Json(blog))
}

/// Delete a blog and its images
/// DELETE /api/delete-blog?id=3 (GET accepted too)
pub async fn delete_blog(
    State(state): State<AppState>,
    params: std::result::Result<Query<IdQuery>, QueryRejection>,
) -> Result<StatusCode> {
    let params = query(params)?;
    BlogRepository::delete(&state.db, &state.images, params.id).await?;
    Ok(StatusCode::NO_CONTENT)
}
