// rest/routes/tasks.rs — Task CRUD routes.

use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::rest::error::ApiError;
use crate::storage::{TaskPatch, TaskRow};
use crate::AppContext;

const MAX_TITLE_LEN: usize = 100;
const MAX_DESCRIPTION_LEN: usize = 500;

const DEFAULT_SKIP: i64 = 0;
const DEFAULT_LIMIT: i64 = 100;

/// Uniform wrapper around every successful response body.
#[derive(Debug, Serialize)]
pub struct Envelope<T> {
    pub ok: bool,
    pub message: String,
    pub data: T,
}

impl<T> Envelope<T> {
    fn new(message: &str, data: T) -> Json<Self> {
        Json(Self {
            ok: true,
            message: message.to_string(),
            data,
        })
    }
}

// ─── Transfer models ──────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct CreateTaskRequest {
    pub title: String,
    pub description: Option<String>,
    pub completed: Option<bool>,
}

impl CreateTaskRequest {
    fn validate(&self) -> Result<(), ApiError> {
        check_title(&self.title)?;
        if let Some(d) = &self.description {
            check_description(d)?;
        }
        Ok(())
    }
}

/// `None` fields are "not supplied" and keep their stored value.
#[derive(Debug, Deserialize)]
pub struct UpdateTaskRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub completed: Option<bool>,
}

impl UpdateTaskRequest {
    fn validate(&self) -> Result<(), ApiError> {
        if let Some(t) = &self.title {
            check_title(t)?;
        }
        if let Some(d) = &self.description {
            check_description(d)?;
        }
        Ok(())
    }
}

fn check_title(title: &str) -> Result<(), ApiError> {
    if title.is_empty() {
        return Err(ApiError::Validation {
            field: "title",
            message: "title must not be empty".to_string(),
        });
    }
    if title.chars().count() > MAX_TITLE_LEN {
        return Err(ApiError::Validation {
            field: "title",
            message: format!("title must be at most {MAX_TITLE_LEN} characters"),
        });
    }
    Ok(())
}

fn check_description(description: &str) -> Result<(), ApiError> {
    if description.chars().count() > MAX_DESCRIPTION_LEN {
        return Err(ApiError::Validation {
            field: "description",
            message: format!("description must be at most {MAX_DESCRIPTION_LEN} characters"),
        });
    }
    Ok(())
}

#[derive(Debug, Default, Deserialize)]
pub struct ListParams {
    pub skip: Option<i64>,
    pub limit: Option<i64>,
}

// ─── Handlers ─────────────────────────────────────────────────────────────────

pub async fn create_task(
    State(ctx): State<Arc<AppContext>>,
    Json(body): Json<CreateTaskRequest>,
) -> Result<Json<Envelope<TaskRow>>, ApiError> {
    body.validate()?;
    let task = ctx
        .storage
        .create_task(
            &body.title,
            body.description.as_deref(),
            body.completed.unwrap_or(false),
        )
        .await?;
    Ok(Envelope::new("task created successfully", task))
}

pub async fn list_tasks(
    State(ctx): State<Arc<AppContext>>,
    Query(params): Query<ListParams>,
) -> Result<Json<Envelope<Vec<TaskRow>>>, ApiError> {
    // No upper bound on `limit` — unbounded result sets are a known scaling
    // limitation of this endpoint, not a bug.
    let skip = params.skip.unwrap_or(DEFAULT_SKIP).max(0);
    let limit = params.limit.unwrap_or(DEFAULT_LIMIT).max(0);
    let tasks = ctx.storage.list_tasks(skip, limit).await?;
    Ok(Envelope::new("tasks retrieved successfully", tasks))
}

pub async fn get_task(
    State(ctx): State<Arc<AppContext>>,
    Path(id): Path<i64>,
) -> Result<Json<Envelope<TaskRow>>, ApiError> {
    let task = ctx.storage.get_task(id).await?.ok_or(ApiError::NotFound)?;
    Ok(Envelope::new("task retrieved successfully", task))
}

/// PUT with patch semantics: only fields present in the body change.
/// The service this replaces behaved that way despite the replace-semantics
/// verb, and clients depend on it, so the behavior is kept.
pub async fn update_task(
    State(ctx): State<Arc<AppContext>>,
    Path(id): Path<i64>,
    Json(body): Json<UpdateTaskRequest>,
) -> Result<Json<Envelope<TaskRow>>, ApiError> {
    body.validate()?;
    let patch = TaskPatch {
        title: body.title,
        description: body.description,
        completed: body.completed,
    };
    let task = ctx
        .storage
        .update_task(id, &patch)
        .await?
        .ok_or(ApiError::NotFound)?;
    Ok(Envelope::new("task updated successfully", task))
}

#[derive(Debug, Serialize)]
pub struct DeletedTask {
    pub id: i64,
}

pub async fn delete_task(
    State(ctx): State<Arc<AppContext>>,
    Path(id): Path<i64>,
) -> Result<Json<Envelope<DeletedTask>>, ApiError> {
    if !ctx.storage.delete_task(id).await? {
        return Err(ApiError::NotFound);
    }
    Ok(Envelope::new("task deleted successfully", DeletedTask { id }))
}

// ─── Tests ────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_title_limits() {
        assert!(check_title("Buy milk").is_ok());
        assert!(check_title("").is_err());
        assert!(check_title(&"x".repeat(100)).is_ok());
        assert!(check_title(&"x".repeat(101)).is_err());
    }

    #[test]
    fn test_description_limit() {
        assert!(check_description(&"x".repeat(500)).is_ok());
        assert!(check_description(&"x".repeat(501)).is_err());
    }

    #[test]
    fn test_update_request_skips_absent_fields() {
        let req = UpdateTaskRequest {
            title: None,
            description: None,
            completed: Some(true),
        };
        assert!(req.validate().is_ok());
    }
}
