// src/task.rs

use actix_multipart::Multipart;
use actix_web::{web, HttpRequest, HttpResponse};
use chrono::Utc;
use log::{debug, info};
use serde_json::json;

use crate::access::{
    can_view_task, effective_assignee, ensure_task_deletable, ensure_task_mutable,
    ensure_task_visible,
};
use crate::app_state::AppState;
use crate::auth::Identity;
use crate::error::ApiError;
use crate::models::task::{
    non_empty, Attachment, CreateTaskRequest, Priority, Task, TaskStatus, UpdateTaskRequest,
};
use crate::store::new_id;
use crate::upload::{discard_attachments, discard_file, read_form, store_file};

fn find_task(data: &AppState, task_id: &str) -> Result<Task, ApiError> {
    data.stores
        .tasks
        .find(task_id)
        .ok_or_else(|| ApiError::not_found("Task not found"))
}

fn check_project(data: &AppState, project_id: Option<&str>) -> Result<(), ApiError> {
    match project_id {
        Some(id) if !data.stores.projects.contains(id) => {
            Err(ApiError::validation("Invalid projectId"))
        }
        _ => Ok(()),
    }
}

/// POST /api/tasks
///
/// Staff always end up as the assignee of what they create.
pub async fn create_task(
    identity: Identity,
    data: web::Data<AppState>,
    req: web::Json<CreateTaskRequest>,
) -> Result<HttpResponse, ApiError> {
    let req = req.into_inner();
    let title = non_empty(req.title)
        .map(|t| t.trim().to_string())
        .ok_or_else(|| ApiError::validation("Task title is required"))?;
    let project_id = non_empty(req.project_id);
    check_project(&data, project_id.as_deref())?;

    let assignee_id = effective_assignee(&identity, non_empty(req.assignee_id))
        .unwrap_or_else(|| identity.id.clone());
    let now = Utc::now();
    let new_task = Task {
        id: new_id(),
        title,
        description: req.description.unwrap_or_default(),
        status: req
            .status
            .as_deref()
            .and_then(TaskStatus::parse)
            .unwrap_or_default(),
        priority: req
            .priority
            .as_deref()
            .and_then(Priority::parse)
            .unwrap_or_default(),
        deadline: non_empty(req.deadline),
        assignee_id,
        project_id,
        attachments: req.attachments.unwrap_or_default(),
        created_by_id: identity.id.clone(),
        created_at: now,
        updated_at: now,
    };
    let task = data.stores.tasks.insert_front(new_task);
    info!("Task {} created by {} for {}", task.id, identity.id, task.assignee_id);
    Ok(HttpResponse::Created().json(task))
}

/// GET /api/tasks
pub async fn list_tasks(
    identity: Identity,
    data: web::Data<AppState>,
) -> Result<HttpResponse, ApiError> {
    let tasks = if identity.is_admin() {
        data.stores.tasks.list()
    } else {
        data.stores.tasks.filter(|t| can_view_task(&identity, t))
    };
    Ok(HttpResponse::Ok().json(tasks))
}

/// GET /api/tasks/{task_id}
pub async fn get_task(
    identity: Identity,
    data: web::Data<AppState>,
    task_id: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    let task = find_task(&data, &task_id)?;
    ensure_task_visible(&identity, &task)?;
    Ok(HttpResponse::Ok().json(task))
}

/// PUT /api/tasks/{task_id}
///
/// Unknown status or priority values are ignored rather than rejected.
pub async fn update_task(
    identity: Identity,
    data: web::Data<AppState>,
    task_id: web::Path<String>,
    req: web::Json<UpdateTaskRequest>,
) -> Result<HttpResponse, ApiError> {
    let task = find_task(&data, &task_id)?;
    ensure_task_mutable(&identity, &task)?;

    let req = req.into_inner();
    debug!("Updating task {} with {:?}", task.id, req);
    let project_id = req.project_id.map(non_empty);
    if let Some(pid) = &project_id {
        check_project(&data, pid.as_deref())?;
    }
    let title = non_empty(req.title).map(|t| t.trim().to_string());
    let status = req.status.as_deref().and_then(TaskStatus::parse);
    let priority = req.priority.as_deref().and_then(Priority::parse);
    let assignee_id = effective_assignee(&identity, non_empty(req.assignee_id));
    let deadline = req.deadline.map(non_empty);

    let updated = data
        .stores
        .tasks
        .update(&task.id, |t| {
            if let Some(title) = title {
                t.title = title;
            }
            if let Some(description) = req.description {
                t.description = description;
            }
            if let Some(status) = status {
                t.status = status;
            }
            if let Some(priority) = priority {
                t.priority = priority;
            }
            if let Some(assignee_id) = assignee_id {
                t.assignee_id = assignee_id;
            }
            if let Some(project_id) = project_id {
                t.project_id = project_id;
            }
            if let Some(deadline) = deadline {
                t.deadline = deadline;
            }
            if let Some(attachments) = req.attachments {
                t.attachments = attachments;
            }
        })
        .ok_or_else(|| ApiError::not_found("Task not found"))?;
    Ok(HttpResponse::Ok().json(updated))
}

/// DELETE /api/tasks/{task_id}
pub async fn delete_task(
    identity: Identity,
    data: web::Data<AppState>,
    task_id: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    ensure_task_deletable(&identity)?;
    let task = data
        .stores
        .tasks
        .remove(&task_id)
        .ok_or_else(|| ApiError::not_found("Task not found"))?;
    discard_attachments(&data, std::slice::from_ref(&task)).await;
    info!("Admin {} deleted task {}", identity.id, task.id);
    Ok(HttpResponse::Ok().json(json!({ "message": "Task deleted" })))
}

/// POST /api/tasks/{task_id}/attachments
pub async fn add_attachment(
    identity: Identity,
    data: web::Data<AppState>,
    http_req: HttpRequest,
    task_id: web::Path<String>,
    payload: Multipart,
) -> Result<HttpResponse, ApiError> {
    let task = find_task(&data, &task_id)?;
    ensure_task_visible(&identity, &task)?;

    let form = read_form(payload, data.config.max_upload_bytes).await?;
    let file = form
        .file
        .ok_or_else(|| ApiError::validation("No file uploaded"))?;
    let original_name = file.original_name.clone();
    let stored = store_file(&data, &http_req, file).await?;

    let attachment = Attachment {
        id: new_id(),
        original_name,
        file_name: stored.file_name.clone(),
        size: stored.size,
        url: stored.url,
        uploaded_at: Some(Utc::now()),
        uploaded_by: identity.id.clone(),
    };
    match data
        .stores
        .tasks
        .update(&task.id, |t| t.attachments.insert(0, attachment))
    {
        Some(updated) => Ok(HttpResponse::Created().json(updated)),
        None => {
            // The task vanished while the upload was being written.
            discard_file(&data, &stored.file_name).await;
            Err(ApiError::not_found("Task not found"))
        }
    }
}

/// DELETE /api/tasks/{task_id}/attachments/{attachment_id}
pub async fn remove_attachment(
    identity: Identity,
    data: web::Data<AppState>,
    path: web::Path<(String, String)>,
) -> Result<HttpResponse, ApiError> {
    let (task_id, attachment_id) = path.into_inner();
    let task = find_task(&data, &task_id)?;
    ensure_task_visible(&identity, &task)?;

    let attachment = task
        .attachments
        .iter()
        .find(|a| a.id == attachment_id)
        .cloned()
        .ok_or_else(|| ApiError::not_found("Attachment not found"))?;

    let updated = data
        .stores
        .tasks
        .update(&task.id, |t| t.attachments.retain(|a| a.id != attachment_id))
        .ok_or_else(|| ApiError::not_found("Task not found"))?;
    if !attachment.file_name.is_empty() {
        discard_file(&data, &attachment.file_name).await;
    }
    Ok(HttpResponse::Ok().json(updated))
}
