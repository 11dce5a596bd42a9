// src/dashboard.rs

use std::collections::BTreeMap;

use actix_web::{web, HttpResponse};
use chrono::{NaiveDate, Utc};
use serde::Serialize;

use crate::access::{can_view_file, can_view_task};
use crate::app_state::AppState;
use crate::auth::Identity;
use crate::error::ApiError;
use crate::models::task::{Priority, Task, TaskStatus};

#[derive(Debug, Default, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct StatusCounts {
    pub pending: usize,
    pub in_progress: usize,
    pub done: usize,
}

impl StatusCounts {
    fn add(&mut self, status: TaskStatus) {
        match status {
            TaskStatus::Pending => self.pending += 1,
            TaskStatus::InProgress => self.in_progress += 1,
            TaskStatus::Done => self.done += 1,
        }
    }
}

#[derive(Debug, Default, Serialize, PartialEq, Eq)]
pub struct PriorityCounts {
    pub low: usize,
    pub medium: usize,
    pub high: usize,
}

#[derive(Debug, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardSummary {
    pub total_tasks: usize,
    pub by_status: StatusCounts,
    pub by_priority: PriorityCounts,
    pub overdue: usize,
    pub by_assignee: BTreeMap<String, StatusCounts>,
    pub by_project: BTreeMap<String, usize>,
    pub total_projects: usize,
    pub visible_files: usize,
}

/// Deadlines are free-form strings; only their leading `YYYY-MM-DD` counts.
fn deadline_date(deadline: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(deadline.get(..10)?, "%Y-%m-%d").ok()
}

fn is_overdue(task: &Task, today: NaiveDate) -> bool {
    task.status != TaskStatus::Done
        && task
            .deadline
            .as_deref()
            .and_then(deadline_date)
            .is_some_and(|d| d < today)
}

/// Folds a set of tasks into counters. Project and file totals are left for
/// the caller.
pub fn summarize(tasks: &[Task], today: NaiveDate) -> DashboardSummary {
    let mut summary = DashboardSummary {
        total_tasks: tasks.len(),
        ..Default::default()
    };
    for task in tasks {
        summary.by_status.add(task.status);
        match task.priority {
            Priority::Low => summary.by_priority.low += 1,
            Priority::Medium => summary.by_priority.medium += 1,
            Priority::High => summary.by_priority.high += 1,
        }
        if is_overdue(task, today) {
            summary.overdue += 1;
        }
        summary
            .by_assignee
            .entry(task.assignee_id.clone())
            .or_default()
            .add(task.status);
        let project = task.project_id.as_deref().unwrap_or("unassigned");
        *summary.by_project.entry(project.to_string()).or_default() += 1;
    }
    summary
}

/// GET /api/dashboard
pub async fn get_dashboard(
    identity: Identity,
    data: web::Data<AppState>,
) -> Result<HttpResponse, ApiError> {
    let tasks = data.stores.tasks.filter(|t| can_view_task(&identity, t));
    let mut summary = summarize(&tasks, Utc::now().date_naive());
    summary.total_projects = data.stores.projects.len();
    summary.visible_files = data
        .stores
        .files
        .filter(|f| can_view_file(&identity, f))
        .len();
    Ok(HttpResponse::Ok().json(summary))
}
