use axum::extract::{Json, State};
use diesel::prelude::*;
use serde::Serialize;
use uuid::Uuid;

use crate::auth::AuthenticatedUser;
use crate::error::AppResult;
use crate::models::Activity;
use crate::schema::activities;
use crate::state::AppState;

#[derive(Serialize)]
pub struct ActivityResponse {
    pub id: Uuid,
    pub title: String,
    pub status: String,
    pub date: String,
    pub related_type: Option<String>,
    pub related_id: Option<Uuid>,
}

impl From<Activity> for ActivityResponse {
    fn from(activity: Activity) -> Self {
        Self {
            id: activity.id,
            title: activity.title,
            status: activity.status,
            date: activity.date.and_utc().to_rfc3339(),
            related_type: activity.related_type,
            related_id: activity.related_id,
        }
    }
}

pub async fn list_activities(
    State(state): State<AppState>,
    user: AuthenticatedUser,
) -> AppResult<Json<Vec<ActivityResponse>>> {
    let mut conn = state.db()?;

    let rows: Vec<Activity> = activities::table
        .filter(activities::user_id.eq(user.user_id))
        .order(activities::date.desc())
        .load(&mut conn)?;

    Ok(Json(rows.into_iter().map(ActivityResponse::from).collect()))
}
