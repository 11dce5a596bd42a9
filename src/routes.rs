// src/routes.rs

use actix_web::{web, HttpResponse};
use serde_json::json;

use crate::auth::{login, logout, me, register, Authentication};
use crate::dashboard::get_dashboard;
use crate::error::ApiError;
use crate::file::{delete_file, list_files, upload_file};
use crate::project::{create_project, delete_project, get_project, list_projects, update_project};
use crate::task::{
    add_attachment, create_task, delete_task, get_task, list_tasks, remove_attachment,
    update_task,
};
use crate::user_management::{
    change_password, create_user, delete_user, get_user, list_users, update_user,
};

async fn health() -> HttpResponse {
    HttpResponse::Ok().json(json!({ "status": "OK", "message": "Server is running" }))
}

/// Mounts everything under `/api`. Shared by `main` and the handler tests.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.app_data(
        web::JsonConfig::default()
            .error_handler(|err, _req| ApiError::validation(format!("Invalid JSON body: {err}")).into()),
    )
    .service(
        web::scope("/api")
            .route("/health", web::get().to(health))
            // AUTH
            .service(
                web::scope("/auth")
                    .route("/register", web::post().to(register))
                    .route("/login", web::post().to(login))
                    .service(
                        web::resource("/logout")
                            .wrap(Authentication)
                            .route(web::post().to(logout)),
                    )
                    .service(
                        web::resource("/me")
                            .wrap(Authentication)
                            .route(web::get().to(me)),
                    ),
            )
            // USERS
            .service(
                web::scope("/users")
                    .wrap(Authentication)
                    .route("", web::get().to(list_users))
                    .route("", web::post().to(create_user))
                    .route("/change-password", web::put().to(change_password))
                    .route("/{user_id}", web::get().to(get_user))
                    .route("/{user_id}", web::put().to(update_user))
                    .route("/{user_id}", web::delete().to(delete_user)),
            )
            // FILES
            .service(
                web::scope("/files")
                    .wrap(Authentication)
                    .route("", web::get().to(list_files))
                    .route("/upload", web::post().to(upload_file))
                    .route("/{file_id}", web::delete().to(delete_file)),
            )
            // PROJECTS
            .service(
                web::scope("/projects")
                    .wrap(Authentication)
                    .route("", web::get().to(list_projects))
                    .route("", web::post().to(create_project))
                    .route("/{project_id}", web::get().to(get_project))
                    .route("/{project_id}", web::put().to(update_project))
                    .route("/{project_id}", web::delete().to(delete_project)),
            )
            // TASKS
            .service(
                web::scope("/tasks")
                    .wrap(Authentication)
                    .route("", web::get().to(list_tasks))
                    .route("", web::post().to(create_task))
                    .route("/{task_id}", web::get().to(get_task))
                    .route("/{task_id}", web::put().to(update_task))
                    .route("/{task_id}", web::delete().to(delete_task))
                    .route("/{task_id}/attachments", web::post().to(add_attachment))
                    .route(
                        "/{task_id}/attachments/{attachment_id}",
                        web::delete().to(remove_attachment),
                    ),
            )
            .service(
                web::resource("/dashboard")
                    .wrap(Authentication)
                    .route(web::get().to(get_dashboard)),
            ),
    );
}
