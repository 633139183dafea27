use crate::{
    db::DbPool,
    entities::{project, project::ProjectStatus, staff},
    errors::ServiceError,
    events::{Event, EventSender},
};
use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, FromQueryResult, PaginatorTrait,
    QueryFilter, QueryOrder, Set, Statement,
};
use serde::Serialize;
use std::sync::Arc;
use tracing::{info, instrument, warn};
use uuid::Uuid;

#[derive(Debug, Clone)]
pub struct NewStaff {
    pub name: String,
    pub email: String,
    pub role: Option<String>,
}

#[derive(Debug, Clone)]
pub struct NewProject {
    pub name: String,
    pub progress: Option<i32>,
    pub due_date: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default)]
pub struct ProjectPatch {
    pub name: Option<String>,
    pub status: Option<String>,
    pub progress: Option<i32>,
    pub due_date: Option<DateTime<Utc>>,
}

/// Workload label derived from active project count and average progress.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, strum::Display, strum::IntoStaticStr,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum WorkloadStatus {
    New,
    Overloaded,
    Excellent,
    Normal,
}

impl WorkloadStatus {
    pub fn as_str(&self) -> &'static str {
        self.into()
    }
}

/// Fixed thresholds from the staffing report: more than five active
/// projects with average progress under 50 reads as overloaded, average
/// progress of 80 or more as excellent, and staff with no assignments at
/// all as new.
pub fn classify_workload(
    total_projects: i64,
    active_projects: i64,
    avg_active_progress: f64,
) -> WorkloadStatus {
    if total_projects == 0 {
        WorkloadStatus::New
    } else if active_projects > 5 && avg_active_progress < 50.0 {
        WorkloadStatus::Overloaded
    } else if avg_active_progress >= 80.0 {
        WorkloadStatus::Excellent
    } else {
        WorkloadStatus::Normal
    }
}

/// One row of the workload report.
#[derive(Debug, Clone, Serialize)]
pub struct StaffWorkload {
    pub staff_id: Uuid,
    pub name: String,
    pub total_projects: i64,
    pub active_projects: i64,
    pub avg_active_progress: f64,
    pub status: WorkloadStatus,
}

#[derive(Debug, FromQueryResult)]
struct WorkloadRow {
    id: Uuid,
    name: String,
    total_projects: i64,
    active_projects: i64,
    avg_active_progress: Option<f64>,
}

/// Service for staff records, project assignments, and the workload report
#[derive(Clone)]
pub struct StaffService {
    db_pool: Arc<DbPool>,
    event_sender: Arc<EventSender>,
}

impl StaffService {
    pub fn new(db_pool: Arc<DbPool>, event_sender: Arc<EventSender>) -> Self {
        Self {
            db_pool,
            event_sender,
        }
    }

    #[instrument(skip(self, input), fields(email = %input.email))]
    pub async fn create_staff(&self, input: NewStaff) -> Result<staff::Model, ServiceError> {
        let db = &*self.db_pool;

        if staff::Entity::find()
            .filter(staff::Column::Email.eq(input.email.clone()))
            .one(db)
            .await?
            .is_some()
        {
            return Err(ServiceError::Conflict(format!(
                "A staff member with email {} already exists",
                input.email
            )));
        }

        let created = staff::ActiveModel {
            id: Set(Uuid::new_v4()),
            name: Set(input.name),
            email: Set(input.email),
            role: Set(input.role),
            created_at: Set(Utc::now()),
        }
        .insert(db)
        .await?;

        info!(staff_id = %created.id, "Staff member created");
        if let Err(e) = self.event_sender.send(Event::StaffCreated(created.id)).await {
            warn!(staff_id = %created.id, error = %e, "Failed to send staff created event");
        }

        Ok(created)
    }

    #[instrument(skip(self))]
    pub async fn list_staff(
        &self,
        page: u64,
        limit: u64,
    ) -> Result<(Vec<staff::Model>, u64), ServiceError> {
        let db = &*self.db_pool;

        let paginator = staff::Entity::find()
            .order_by_asc(staff::Column::Name)
            .paginate(db, limit);
        let total = paginator.num_items().await?;
        let members = paginator.fetch_page(page.saturating_sub(1)).await?;

        Ok((members, total))
    }

    #[instrument(skip(self))]
    pub async fn get_staff(
        &self,
        staff_id: Uuid,
    ) -> Result<Option<(staff::Model, Vec<project::Model>)>, ServiceError> {
        let db = &*self.db_pool;

        let Some(member) = staff::Entity::find_by_id(staff_id).one(db).await? else {
            return Ok(None);
        };
        let projects = project::Entity::find()
            .filter(project::Column::StaffId.eq(staff_id))
            .order_by_desc(project::Column::CreatedAt)
            .all(db)
            .await?;

        Ok(Some((member, projects)))
    }

    #[instrument(skip(self, input), fields(name = %input.name))]
    pub async fn assign_project(
        &self,
        staff_id: Uuid,
        input: NewProject,
    ) -> Result<project::Model, ServiceError> {
        let db = &*self.db_pool;

        staff::Entity::find_by_id(staff_id)
            .one(db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Staff member {} not found", staff_id)))?;

        let created = project::ActiveModel {
            id: Set(Uuid::new_v4()),
            staff_id: Set(Some(staff_id)),
            name: Set(input.name),
            status: Set(ProjectStatus::Active.as_str().to_owned()),
            progress: Set(input.progress.unwrap_or(0).clamp(0, 100)),
            due_date: Set(input.due_date),
            created_at: Set(Utc::now()),
            updated_at: Set(None),
        }
        .insert(db)
        .await?;

        if let Err(e) = self
            .event_sender
            .send(Event::ProjectAssigned {
                staff_id,
                project_id: created.id,
            })
            .await
        {
            warn!(project_id = %created.id, error = %e, "Failed to send project assigned event");
        }

        Ok(created)
    }

    #[instrument(skip(self, patch))]
    pub async fn update_project(
        &self,
        project_id: Uuid,
        patch: ProjectPatch,
    ) -> Result<project::Model, ServiceError> {
        let db = &*self.db_pool;

        let existing = project::Entity::find_by_id(project_id)
            .one(db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Project {} not found", project_id)))?;

        if let Some(status) = &patch.status {
            status.parse::<ProjectStatus>().map_err(|_| {
                ServiceError::InvalidStatus(format!("Unknown project status '{}'", status))
            })?;
        }

        let mut active: project::ActiveModel = existing.into();
        if let Some(name) = patch.name {
            active.name = Set(name);
        }
        if let Some(status) = patch.status {
            active.status = Set(status);
        }
        if let Some(progress) = patch.progress {
            active.progress = Set(progress.clamp(0, 100));
        }
        if let Some(due_date) = patch.due_date {
            active.due_date = Set(Some(due_date));
        }
        active.updated_at = Set(Some(Utc::now()));

        Ok(active.update(db).await?)
    }

    /// The workload report: one grouped read-only query over staff and
    /// their projects, labeled by `classify_workload`.
    #[instrument(skip(self))]
    pub async fn workload_report(&self) -> Result<Vec<StaffWorkload>, ServiceError> {
        let db = &*self.db_pool;
        let backend = db.get_database_backend();

        // CAST keeps the average a float on both Postgres (numeric
        // otherwise) and SQLite.
        let sql = r#"
            SELECT s.id,
                   s.name,
                   COUNT(p.id) AS total_projects,
                   COUNT(CASE WHEN p.status = 'active' THEN 1 END) AS active_projects,
                   CAST(AVG(CASE WHEN p.status = 'active' THEN p.progress END) AS DOUBLE PRECISION)
                       AS avg_active_progress
            FROM staff s
            LEFT JOIN projects p ON p.staff_id = s.id
            GROUP BY s.id, s.name
            ORDER BY s.name
        "#;

        let rows = WorkloadRow::find_by_statement(Statement::from_string(backend, sql))
            .all(db)
            .await?;

        Ok(rows
            .into_iter()
            .map(|row| {
                let avg = row.avg_active_progress.unwrap_or(0.0);
                StaffWorkload {
                    staff_id: row.id,
                    name: row.name,
                    total_projects: row.total_projects,
                    active_projects: row.active_projects,
                    avg_active_progress: avg,
                    status: classify_workload(row.total_projects, row.active_projects, avg),
                }
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case(0, 0, 0.0 => WorkloadStatus::New; "no assignments at all")]
    #[test_case(3, 0, 0.0 => WorkloadStatus::Normal; "history but nothing active")]
    #[test_case(6, 6, 49.9 => WorkloadStatus::Overloaded; "many stalled projects")]
    #[test_case(6, 6, 50.0 => WorkloadStatus::Normal; "many projects moving along")]
    #[test_case(5, 5, 20.0 => WorkloadStatus::Normal; "five projects is not overloaded")]
    #[test_case(4, 2, 80.0 => WorkloadStatus::Excellent; "high average progress")]
    #[test_case(4, 2, 79.9 => WorkloadStatus::Normal; "just under excellent")]
    #[test_case(7, 7, 85.0 => WorkloadStatus::Excellent; "busy but performing")]
    fn classification(total: i64, active: i64, avg: f64) -> WorkloadStatus {
        classify_workload(total, active, avg)
    }
}
