use axum::extract::{Json, State};
use axum::http::StatusCode;
use diesel::prelude::*;
use rand::{rngs::OsRng, Rng};
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use crate::auth::AuthenticatedUser;
use crate::error::{AppError, AppResult};
use crate::models::{NewProject, Project};
use crate::schema::projects;
use crate::state::AppState;

#[derive(Deserialize)]
pub struct CreateProjectRequest {
    pub title: String,
    pub description: Option<String>,
}

#[derive(Serialize)]
pub struct ProjectResponse {
    pub id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub pr_number: Option<String>,
    pub created_at: String,
}

impl From<Project> for ProjectResponse {
    fn from(project: Project) -> Self {
        Self {
            id: project.id,
            title: project.title,
            description: project.description,
            pr_number: project.pr_number,
            created_at: project.created_at.and_utc().to_rfc3339(),
        }
    }
}

#[derive(Serialize)]
pub struct ProjectDetailResponse {
    pub project: ProjectResponse,
}

pub async fn create_project(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Json(payload): Json<CreateProjectRequest>,
) -> AppResult<(StatusCode, Json<ProjectDetailResponse>)> {
    let title = payload.title.trim().to_string();
    if title.is_empty() {
        return Err(AppError::validation("title must not be blank"));
    }

    let description = payload
        .description
        .as_ref()
        .map(|d| d.trim())
        .filter(|d| !d.is_empty())
        .map(|d| d.to_string());

    let new_project = NewProject {
        id: Uuid::new_v4(),
        owner_id: user.user_id,
        title,
        description,
        pr_number: Some(generate_pr_number()),
    };

    let mut conn = state.db()?;
    diesel::insert_into(projects::table)
        .values(&new_project)
        .execute(&mut conn)?;

    let project: Project = projects::table.find(new_project.id).first(&mut conn)?;

    info!(
        project_id = %project.id,
        pr_number = project.pr_number.as_deref().unwrap_or(""),
        "created project"
    );

    Ok((
        StatusCode::CREATED,
        Json(ProjectDetailResponse {
            project: project.into(),
        }),
    ))
}

pub async fn list_projects(
    State(state): State<AppState>,
    user: AuthenticatedUser,
) -> AppResult<Json<Vec<ProjectResponse>>> {
    let mut conn = state.db()?;

    let rows: Vec<Project> = projects::table
        .filter(projects::owner_id.eq(user.user_id))
        .order(projects::created_at.desc())
        .load(&mut conn)?;

    Ok(Json(rows.into_iter().map(ProjectResponse::from).collect()))
}

/// Display reference shown on dashboards and charge screens. Not a key;
/// collisions are tolerable and only affect presentation.
fn generate_pr_number() -> String {
    let mut rng = OsRng;
    format!("PR-{:06}", rng.gen_range(0..1_000_000))
}
