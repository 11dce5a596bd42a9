// src/access.rs
//
// Who may see and change what. Everything here is a pure function of the
// caller and the record; handlers call these before touching a store.

use crate::auth::Identity;
use crate::error::ApiError;
use crate::models::file::FileRecord;
use crate::models::task::Task;
use crate::models::user::Role;

pub fn require_admin(identity: &Identity) -> Result<(), ApiError> {
    if identity.is_admin() {
        Ok(())
    } else {
        Err(ApiError::forbidden("Admin access required"))
    }
}

pub fn require_staff_or_admin(identity: &Identity) -> Result<(), ApiError> {
    match identity.role {
        Role::Admin | Role::Staff => Ok(()),
        Role::Unknown => Err(ApiError::forbidden("Staff or Admin access required")),
    }
}

/// Admins see every task, everyone else only what is assigned to them.
pub fn can_view_task(identity: &Identity, task: &Task) -> bool {
    identity.is_admin() || task.assignee_id == identity.id
}

pub fn ensure_task_visible(identity: &Identity, task: &Task) -> Result<(), ApiError> {
    if can_view_task(identity, task) {
        Ok(())
    } else {
        Err(ApiError::forbidden("Not allowed"))
    }
}

pub fn ensure_task_mutable(identity: &Identity, task: &Task) -> Result<(), ApiError> {
    if can_view_task(identity, task) {
        Ok(())
    } else {
        Err(ApiError::forbidden("Staff cannot modify others' tasks"))
    }
}

pub fn ensure_task_deletable(identity: &Identity) -> Result<(), ApiError> {
    if identity.is_admin() {
        Ok(())
    } else {
        Err(ApiError::forbidden("Only admin can delete tasks"))
    }
}

/// The assignee a write actually stores. Admins get what they asked for;
/// anyone else is pinned to themselves whatever they sent.
pub fn effective_assignee(identity: &Identity, requested: Option<String>) -> Option<String> {
    if identity.is_admin() {
        requested
    } else {
        requested.map(|_| identity.id.clone())
    }
}

pub fn can_view_file(identity: &Identity, file: &FileRecord) -> bool {
    identity.is_admin() || file.is_public || file.uploaded_by == identity.id
}

pub fn ensure_file_deletable(identity: &Identity, file: &FileRecord) -> Result<(), ApiError> {
    if identity.is_admin() || file.uploaded_by == identity.id {
        Ok(())
    } else {
        Err(ApiError::forbidden("Not allowed to delete this file"))
    }
}
