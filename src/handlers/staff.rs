use crate::{
    entities::{project, staff},
    errors::ServiceError,
    services::staff::{NewProject, NewStaff, ProjectPatch, StaffWorkload},
    ApiResponse, ApiResult, AppState, ListQuery, PaginatedResponse,
};
use axum::{
    extract::{Path, Query, State},
    response::Json,
    routing::{get, post, put},
    Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Serialize, ToSchema)]
pub struct StaffSummary {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub role: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<staff::Model> for StaffSummary {
    fn from(model: staff::Model) -> Self {
        Self {
            id: model.id,
            name: model.name,
            email: model.email,
            role: model.role,
            created_at: model.created_at,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ProjectSummary {
    pub id: Uuid,
    pub staff_id: Option<Uuid>,
    pub name: String,
    pub status: String,
    pub progress: i32,
    pub due_date: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl From<project::Model> for ProjectSummary {
    fn from(model: project::Model) -> Self {
        Self {
            id: model.id,
            staff_id: model.staff_id,
            name: model.name,
            status: model.status,
            progress: model.progress,
            due_date: model.due_date,
            created_at: model.created_at,
            updated_at: model.updated_at,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct StaffDetail {
    #[serde(flatten)]
    pub staff: StaffSummary,
    pub projects: Vec<ProjectSummary>,
}

/// One row of the workload report.
#[derive(Debug, Serialize, ToSchema)]
pub struct WorkloadSummary {
    pub staff_id: Uuid,
    pub name: String,
    pub total_projects: i64,
    pub active_projects: i64,
    pub avg_active_progress: f64,
    pub status: String,
}

impl From<StaffWorkload> for WorkloadSummary {
    fn from(row: StaffWorkload) -> Self {
        Self {
            staff_id: row.staff_id,
            name: row.name,
            total_projects: row.total_projects,
            active_projects: row.active_projects,
            avg_active_progress: row.avg_active_progress,
            status: row.status.as_str().to_string(),
        }
    }
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateStaffRequest {
    #[validate(length(min = 1, max = 120, message = "Name must be between 1 and 120 characters"))]
    pub name: String,
    #[validate(email(message = "Email must be a valid address"))]
    pub email: String,
    pub role: Option<String>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct AssignProjectRequest {
    #[validate(length(min = 1, message = "Name cannot be empty"))]
    pub name: String,
    #[validate(range(min = 0, max = 100, message = "Progress must be between 0 and 100"))]
    pub progress: Option<i32>,
    pub due_date: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct UpdateProjectRequest {
    #[validate(length(min = 1, message = "Name cannot be empty"))]
    pub name: Option<String>,
    pub status: Option<String>,
    #[validate(range(min = 0, max = 100, message = "Progress must be between 0 and 100"))]
    pub progress: Option<i32>,
    pub due_date: Option<DateTime<Utc>>,
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/staff", get(list_staff).post(create_staff))
        // Registered before "/staff/:id" would shadow it.
        .route("/staff/workload", get(workload_report))
        .route("/staff/:id", get(get_staff))
        .route("/staff/:id/projects", post(assign_project))
        .route("/projects/:id", put(update_project))
}

pub async fn list_staff(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> ApiResult<PaginatedResponse<StaffSummary>> {
    let (page, limit) = query.pagination();

    let (records, total) = state.staff_service().list_staff(page, limit).await?;

    let items = records.into_iter().map(StaffSummary::from).collect();
    Ok(Json(ApiResponse::success(PaginatedResponse::new(
        items, total, page, limit,
    ))))
}

pub async fn get_staff(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<StaffDetail> {
    match state.staff_service().get_staff(id).await? {
        Some((member, projects)) => Ok(Json(ApiResponse::success(StaffDetail {
            staff: StaffSummary::from(member),
            projects: projects.into_iter().map(ProjectSummary::from).collect(),
        }))),
        None => Err(ServiceError::NotFound(format!(
            "Staff member {} not found",
            id
        ))),
    }
}

pub async fn create_staff(
    State(state): State<AppState>,
    Json(payload): Json<CreateStaffRequest>,
) -> ApiResult<StaffSummary> {
    payload
        .validate()
        .map_err(|e| ServiceError::ValidationError(e.to_string()))?;

    let created = state
        .staff_service()
        .create_staff(NewStaff {
            name: payload.name,
            email: payload.email,
            role: payload.role,
        })
        .await?;

    Ok(Json(ApiResponse::success(StaffSummary::from(created))))
}

pub async fn assign_project(
    State(state): State<AppState>,
    Path(staff_id): Path<Uuid>,
    Json(payload): Json<AssignProjectRequest>,
) -> ApiResult<ProjectSummary> {
    payload
        .validate()
        .map_err(|e| ServiceError::ValidationError(e.to_string()))?;

    let created = state
        .staff_service()
        .assign_project(
            staff_id,
            NewProject {
                name: payload.name,
                progress: payload.progress,
                due_date: payload.due_date,
            },
        )
        .await?;

    Ok(Json(ApiResponse::success(ProjectSummary::from(created))))
}

pub async fn update_project(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateProjectRequest>,
) -> ApiResult<ProjectSummary> {
    payload
        .validate()
        .map_err(|e| ServiceError::ValidationError(e.to_string()))?;

    let updated = state
        .staff_service()
        .update_project(
            id,
            ProjectPatch {
                name: payload.name,
                status: payload.status,
                progress: payload.progress,
                due_date: payload.due_date,
            },
        )
        .await?;

    Ok(Json(ApiResponse::success(ProjectSummary::from(updated))))
}

/// The staffing report: active project count, average progress, and the
/// derived workload label per staff member.
pub async fn workload_report(State(state): State<AppState>) -> ApiResult<Vec<WorkloadSummary>> {
    let rows = state.staff_service().workload_report().await?;
    Ok(Json(ApiResponse::success(
        rows.into_iter().map(WorkloadSummary::from).collect(),
    )))
}
