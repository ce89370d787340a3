// ABOUTME: HTTP handlers for the comments resource
// ABOUTME: Create, show, partial update, delete, and filtered listing

use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection, QueryRejection},
        Path, Query, State,
    },
    http::{header, HeaderMap, HeaderValue, StatusCode},
    response::IntoResponse,
    Json,
};
use parley_core::Validator;
use parley_storage::{validate_comment, Filters, NewComment};
use serde::Deserialize;
use serde_json::json;
use tracing::info;

use crate::error::{ApiResult, AppError};
use crate::state::AppState;

const SORT_SAFE_LIST: [&str; 4] = ["id", "author", "-id", "-author"];

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CreateCommentInput {
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub author: String,
}

/// Absent fields are left unchanged.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UpdateCommentInput {
    pub content: Option<String>,
    pub author: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ListCommentsQuery {
    pub content: Option<String>,
    pub author: Option<String>,
    pub page: Option<String>,
    pub page_size: Option<String>,
    pub sort: Option<String>,
}

/// Non-positive or non-numeric ids never match a record.
fn comment_id(path: Result<Path<i64>, PathRejection>) -> ApiResult<i64> {
    match path {
        Ok(Path(id)) if id >= 1 => Ok(id),
        _ => Err(AppError::not_found()),
    }
}

fn integer_param(v: &mut Validator, raw: Option<&str>, key: &str, default: i64) -> i64 {
    match raw {
        None | Some("") => default,
        Some(raw) => raw.parse().unwrap_or_else(|_| {
            v.add_error(key, "must be an integer value");
            default
        }),
    }
}

pub async fn create_comment(
    State(state): State<AppState>,
    payload: Result<Json<CreateCommentInput>, JsonRejection>,
) -> ApiResult<impl IntoResponse> {
    let Json(input) = payload?;

    let mut v = Validator::new();
    validate_comment(&mut v, &input.content, &input.author);
    if !v.is_valid() {
        return Err(AppError::validation(v.into_errors()));
    }

    let comment = state
        .comments
        .insert(&NewComment {
            content: input.content,
            author: input.author,
        })
        .await?;
    info!(comment_id = comment.id, "Comment created");

    let mut headers = HeaderMap::new();
    let location = format!("/v1/comments/{}", comment.id);
    if let Ok(value) = HeaderValue::from_str(&location) {
        headers.insert(header::LOCATION, value);
    }

    Ok((
        StatusCode::CREATED,
        headers,
        Json(json!({ "comment": comment })),
    ))
}

pub async fn show_comment(
    State(state): State<AppState>,
    path: Result<Path<i64>, PathRejection>,
) -> ApiResult<impl IntoResponse> {
    let id = comment_id(path)?;
    let comment = state.comments.get(id).await?;

    Ok(Json(json!({ "comment": comment })))
}

pub async fn update_comment(
    State(state): State<AppState>,
    path: Result<Path<i64>, PathRejection>,
    payload: Result<Json<UpdateCommentInput>, JsonRejection>,
) -> ApiResult<impl IntoResponse> {
    let id = comment_id(path)?;
    let mut comment = state.comments.get(id).await?;
    let Json(input) = payload?;

    if let Some(content) = input.content {
        comment.content = content;
    }
    if let Some(author) = input.author {
        comment.author = author;
    }

    let mut v = Validator::new();
    validate_comment(&mut v, &comment.content, &comment.author);
    if !v.is_valid() {
        return Err(AppError::validation(v.into_errors()));
    }

    let comment = state.comments.update(&comment).await?;

    Ok(Json(json!({ "comment": comment })))
}

pub async fn delete_comment(
    State(state): State<AppState>,
    path: Result<Path<i64>, PathRejection>,
) -> ApiResult<impl IntoResponse> {
    let id = comment_id(path)?;
    state.comments.delete(id).await?;
    info!(comment_id = id, "Comment deleted");

    Ok(Json(json!({ "message": "comment successfully deleted" })))
}

pub async fn list_comments(
    State(state): State<AppState>,
    query: Result<Query<ListCommentsQuery>, QueryRejection>,
) -> ApiResult<impl IntoResponse> {
    let Query(query) = query?;

    let mut v = Validator::new();
    let filters = Filters {
        page: integer_param(&mut v, query.page.as_deref(), "page", 1),
        page_size: integer_param(&mut v, query.page_size.as_deref(), "page_size", 10),
        sort: query
            .sort
            .filter(|sort| !sort.is_empty())
            .unwrap_or_else(|| "id".to_string()),
        sort_safe_list: SORT_SAFE_LIST.iter().map(|s| s.to_string()).collect(),
    };
    filters.validate(&mut v);
    if !v.is_valid() {
        return Err(AppError::validation(v.into_errors()));
    }

    let (comments, metadata) = state
        .comments
        .list(
            query.content.as_deref().unwrap_or_default(),
            query.author.as_deref().unwrap_or_default(),
            &filters,
        )
        .await?;

    Ok(Json(json!({
        "comments": comments,
        "@metadata": metadata,
    })))
}
