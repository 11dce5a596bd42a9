// src/store.rs

use std::sync::{Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Utc};
use log::info;

use crate::models::file::FileRecord;
use crate::models::project::Project;
use crate::models::task::Task;

/// Anything kept in an in-memory collection.
pub trait Record: Clone {
    fn id(&self) -> &str;

    /// Refresh the modification stamp. Records without one ignore it.
    fn touch(&mut self, _now: DateTime<Utc>) {}
}

impl Record for Project {
    fn id(&self) -> &str {
        &self.id
    }

    fn touch(&mut self, now: DateTime<Utc>) {
        self.updated_at = now;
    }
}

impl Record for Task {
    fn id(&self) -> &str {
        &self.id
    }

    fn touch(&mut self, now: DateTime<Utc>) {
        self.updated_at = now;
    }
}

impl Record for FileRecord {
    fn id(&self) -> &str {
        &self.id
    }
}

/// An ordered, process-local collection, newest first. Every method holds
/// the lock for exactly one step, so no caller ever sees a half-applied
/// mutation; sequences of calls are not isolated from each other.
pub struct Collection<T> {
    items: Mutex<Vec<T>>,
}

impl<T: Record> Default for Collection<T> {
    fn default() -> Self {
        Self {
            items: Mutex::new(Vec::new()),
        }
    }
}

impl<T: Record> Collection<T> {
    fn lock(&self) -> MutexGuard<'_, Vec<T>> {
        self.items.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn insert_front(&self, item: T) -> T {
        self.lock().insert(0, item.clone());
        item
    }

    pub fn list(&self) -> Vec<T> {
        self.lock().clone()
    }

    pub fn filter<F>(&self, pred: F) -> Vec<T>
    where
        F: Fn(&T) -> bool,
    {
        self.lock().iter().filter(|item| pred(item)).cloned().collect()
    }

    pub fn find(&self, id: &str) -> Option<T> {
        self.lock().iter().find(|item| item.id() == id).cloned()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.lock().iter().any(|item| item.id() == id)
    }

    /// Applies `apply` to the record with `id` and stamps it, returning the
    /// updated copy.
    pub fn update<F>(&self, id: &str, apply: F) -> Option<T>
    where
        F: FnOnce(&mut T),
    {
        let mut items = self.lock();
        let item = items.iter_mut().find(|item| item.id() == id)?;
        apply(item);
        item.touch(Utc::now());
        Some(item.clone())
    }

    pub fn remove(&self, id: &str) -> Option<T> {
        let mut items = self.lock();
        let idx = items.iter().position(|item| item.id() == id)?;
        Some(items.remove(idx))
    }

    /// Removes every record matching `pred` and hands them back.
    pub fn remove_where<F>(&self, pred: F) -> Vec<T>
    where
        F: Fn(&T) -> bool,
    {
        let mut items = self.lock();
        let (removed, kept) = items.drain(..).partition(|item| pred(item));
        *items = kept;
        removed
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }
}

#[derive(Default)]
pub struct Stores {
    pub projects: Collection<Project>,
    pub tasks: Collection<Task>,
    pub files: Collection<FileRecord>,
}

impl Stores {
    pub fn new() -> Self {
        Self::default()
    }

    /// Removes the project, then every task filed under it. Returns the
    /// removed project and the tasks dropped with it, so their attachment
    /// blobs can be cleaned up.
    pub fn delete_project(&self, project_id: &str) -> Option<(Project, Vec<Task>)> {
        let project = self.projects.remove(project_id)?;
        let removed = self
            .tasks
            .remove_where(|t| t.project_id.as_deref() == Some(project.id.as_str()));
        info!("Project {} deleted along with {} task(s)", project.id, removed.len());
        Some((project, removed))
    }
}

pub fn new_id() -> String {
    uuid::Uuid::new_v4().to_string()
}
