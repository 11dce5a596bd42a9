// src/project.rs

use actix_web::{web, HttpResponse};
use chrono::Utc;
use log::{debug, info};
use serde_json::json;

use crate::access::require_admin;
use crate::app_state::AppState;
use crate::auth::Identity;
use crate::error::ApiError;
use crate::models::project::{CreateProjectRequest, Project, UpdateProjectRequest};
use crate::store::new_id;
use crate::upload::discard_attachments;

/// POST /api/projects
pub async fn create_project(
    identity: Identity,
    data: web::Data<AppState>,
    project_info: web::Json<CreateProjectRequest>,
) -> Result<HttpResponse, ApiError> {
    debug!("Received create_project request: {:?}", project_info);
    require_admin(&identity)?;
    let project_info = project_info.into_inner();

    let name = project_info
        .name
        .map(|n| n.trim().to_string())
        .filter(|n| !n.is_empty())
        .ok_or_else(|| ApiError::validation("Project name is required"))?;

    let now = Utc::now();
    let new_project = Project {
        id: new_id(),
        name,
        description: project_info.description.unwrap_or_default(),
        member_ids: project_info.member_ids.unwrap_or_default(),
        created_by: identity.id.clone(),
        created_at: now,
        updated_at: now,
    };
    let project = data.stores.projects.insert_front(new_project);
    info!("Project created {:?}", project.id);
    Ok(HttpResponse::Created().json(project))
}

/// GET /api/projects
pub async fn list_projects(
    _identity: Identity,
    data: web::Data<AppState>,
) -> Result<HttpResponse, ApiError> {
    Ok(HttpResponse::Ok().json(data.stores.projects.list()))
}

/// GET /api/projects/{project_id}
pub async fn get_project(
    _identity: Identity,
    data: web::Data<AppState>,
    project_id: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    match data.stores.projects.find(&project_id) {
        Some(project) => Ok(HttpResponse::Ok().json(project)),
        None => Err(ApiError::not_found("Project not found")),
    }
}

/// PUT /api/projects/{project_id}
pub async fn update_project(
    identity: Identity,
    data: web::Data<AppState>,
    project_id: web::Path<String>,
    update_info: web::Json<UpdateProjectRequest>,
) -> Result<HttpResponse, ApiError> {
    require_admin(&identity)?;
    let update_info = update_info.into_inner();
    let name = update_info
        .name
        .map(|n| n.trim().to_string())
        .filter(|n| !n.is_empty());

    let updated = data
        .stores
        .projects
        .update(&project_id, |project| {
            if let Some(name) = name {
                project.name = name;
            }
            if let Some(description) = update_info.description {
                project.description = description;
            }
            if let Some(member_ids) = update_info.member_ids {
                project.member_ids = member_ids;
            }
        })
        .ok_or_else(|| ApiError::not_found("Project not found"))?;
    Ok(HttpResponse::Ok().json(updated))
}

/// DELETE /api/projects/{project_id}
///
/// Tasks filed under the project go with it.
pub async fn delete_project(
    identity: Identity,
    data: web::Data<AppState>,
    project_id: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    require_admin(&identity)?;
    let (project, removed_tasks) = data
        .stores
        .delete_project(&project_id)
        .ok_or_else(|| ApiError::not_found("Project not found"))?;
    discard_attachments(&data, &removed_tasks).await;
    info!("Admin {} deleted project {}", identity.id, project.id);
    Ok(HttpResponse::Ok().json(json!({
        "message": "Project deleted",
        "removedTasks": removed_tasks.len(),
    })))
}
