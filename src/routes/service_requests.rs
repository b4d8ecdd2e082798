use axum::extract::{Json, Path, State};
use axum::http::StatusCode;
use chrono::Utc;
use diesel::{prelude::*, PgConnection};
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use crate::auth::AuthenticatedUser;
use crate::error::{AppError, AppResult};
use crate::models::{
    Document, NewActivity, NewServiceRequest, Project, Property, ServiceRequest,
};
use crate::routes::documents::document_facts;
use crate::schema::{activities, documents, projects, properties, service_requests};
use crate::state::AppState;
use crate::workflow::checklist;

pub const STATUS_DRAFT: &str = "draft";
pub const STATUS_SUBMITTED: &str = "submitted";
pub const STATUS_IN_PROGRESS: &str = "in_progress";

pub const ACTIVITY_PENDING: &str = "Pending";

const RELATED_SERVICE_REQUEST: &str = "service_request";

#[derive(Deserialize)]
pub struct UpsertServiceRequestPayload {
    pub project_id: Uuid,
    pub property_id: Uuid,
    pub main_service: String,
    pub sub_service: Option<String>,
}

#[derive(Deserialize, Default)]
pub struct SubmitPayload {
    pub required_doc_names: Option<Vec<String>>,
    #[serde(default)]
    pub skip_validation: bool,
}

#[derive(Serialize)]
pub struct ServiceRequestResponse {
    pub id: Uuid,
    pub project_id: Uuid,
    pub property_id: Uuid,
    pub main_service: String,
    pub sub_service: Option<String>,
    pub status: String,
    pub created_at: String,
    pub updated_at: String,
}

impl From<ServiceRequest> for ServiceRequestResponse {
    fn from(request: ServiceRequest) -> Self {
        Self {
            id: request.id,
            project_id: request.project_id,
            property_id: request.property_id,
            main_service: request.main_service,
            sub_service: request.sub_service,
            status: request.status,
            created_at: request.created_at.and_utc().to_rfc3339(),
            updated_at: request.updated_at.and_utc().to_rfc3339(),
        }
    }
}

#[derive(Serialize)]
pub struct UpsertServiceRequestResponse {
    pub service_request: ServiceRequestResponse,
    pub created: bool,
}

#[derive(Serialize)]
pub struct ServiceRequestDetailResponse {
    pub service_request: ServiceRequestResponse,
    pub project_title: String,
    pub project_ref: Option<String>,
    pub property_name: String,
}

#[derive(Serialize)]
pub struct ServiceRequestStatusResponse {
    pub service_request: ServiceRequestResponse,
}

/// Create-or-update keyed by (caller, project, property, main service). A
/// repeat call for the same triple updates the existing row instead of
/// inserting a sibling.
pub async fn upsert_service_request(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Json(payload): Json<UpsertServiceRequestPayload>,
) -> AppResult<(StatusCode, Json<UpsertServiceRequestResponse>)> {
    let main_service = payload.main_service.trim().to_string();
    if main_service.is_empty() {
        return Err(AppError::validation("main service is required"));
    }
    let sub_service = payload
        .sub_service
        .as_ref()
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .map(|s| s.to_string());

    let mut conn = state.db()?;

    let project: Option<Project> = projects::table
        .find(payload.project_id)
        .filter(projects::owner_id.eq(user.user_id))
        .first(&mut conn)
        .optional()?;
    if project.is_none() {
        return Err(AppError::not_found());
    }

    let property: Option<Property> = properties::table
        .find(payload.property_id)
        .filter(properties::user_id.eq(user.user_id))
        .filter(properties::project_id.eq(payload.project_id))
        .first(&mut conn)
        .optional()?;
    if property.is_none() {
        return Err(AppError::not_found());
    }

    let user_id = user.user_id;
    let (request, created) = conn.transaction::<(ServiceRequest, bool), AppError, _>(|conn| {
        let existing: Option<ServiceRequest> = service_requests::table
            .filter(service_requests::user_id.eq(user_id))
            .filter(service_requests::project_id.eq(payload.project_id))
            .filter(service_requests::property_id.eq(payload.property_id))
            .filter(service_requests::main_service.eq(&main_service))
            .first(conn)
            .optional()?;

        if let Some(existing) = existing {
            // Keep the previous sub-service when the caller omits one.
            let next_sub = sub_service.clone().or(existing.sub_service.clone());
            diesel::update(service_requests::table.find(existing.id))
                .set((
                    service_requests::sub_service.eq(next_sub),
                    service_requests::updated_at.eq(Utc::now().naive_utc()),
                ))
                .execute(conn)?;
            let updated: ServiceRequest =
                service_requests::table.find(existing.id).first(conn)?;
            Ok((updated, false))
        } else {
            let new_request = NewServiceRequest {
                id: Uuid::new_v4(),
                user_id,
                project_id: payload.project_id,
                property_id: payload.property_id,
                main_service: main_service.clone(),
                sub_service: sub_service.clone(),
                status: STATUS_DRAFT.to_string(),
            };
            diesel::insert_into(service_requests::table)
                .values(&new_request)
                .execute(conn)?;
            let inserted: ServiceRequest =
                service_requests::table.find(new_request.id).first(conn)?;
            Ok((inserted, true))
        }
    })?;

    info!(
        service_request_id = %request.id,
        main_service = %request.main_service,
        created,
        "upserted service request"
    );

    let status = if created {
        StatusCode::CREATED
    } else {
        StatusCode::OK
    };
    Ok((
        status,
        Json(UpsertServiceRequestResponse {
            service_request: request.into(),
            created,
        }),
    ))
}

/// Detail view backing the charge screens: the request joined with its
/// project title/reference and property name.
pub async fn get_service_request(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(service_request_id): Path<Uuid>,
) -> AppResult<Json<ServiceRequestDetailResponse>> {
    let mut conn = state.db()?;

    let request = owned_service_request(&mut conn, user.user_id, service_request_id)?;
    let project: Project = projects::table.find(request.project_id).first(&mut conn)?;
    let property: Property = properties::table
        .find(request.property_id)
        .first(&mut conn)?;

    Ok(Json(ServiceRequestDetailResponse {
        service_request: request.into(),
        project_title: project.title,
        project_ref: project.pr_number,
        property_name: property.property_name,
    }))
}

/// "Save": records the draft without any completeness check and refreshes the
/// dashboard activity.
pub async fn save_draft(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(service_request_id): Path<Uuid>,
) -> AppResult<Json<ServiceRequestStatusResponse>> {
    let mut conn = state.db()?;
    let request = owned_service_request(&mut conn, user.user_id, service_request_id)?;

    let updated = conn.transaction::<ServiceRequest, AppError, _>(|conn| {
        diesel::update(service_requests::table.find(request.id))
            .set((
                service_requests::status.eq(STATUS_DRAFT),
                service_requests::updated_at.eq(Utc::now().naive_utc()),
            ))
            .execute(conn)?;
        let updated: ServiceRequest = service_requests::table.find(request.id).first(conn)?;
        upsert_activity(conn, user.user_id, &updated)?;
        Ok(updated)
    })?;

    info!(service_request_id = %updated.id, "saved service request draft");

    Ok(Json(ServiceRequestStatusResponse {
        service_request: updated.into(),
    }))
}

/// "Save & Submit": the completeness gate. Every required document must be
/// uploaded or marked not-available, unless the caller explicitly skips
/// validation. Failure leaves the request status untouched.
pub async fn submit_service_request(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(service_request_id): Path<Uuid>,
    Json(payload): Json<SubmitPayload>,
) -> AppResult<Json<ServiceRequestStatusResponse>> {
    let mut conn = state.db()?;
    let request = owned_service_request(&mut conn, user.user_id, service_request_id)?;

    if !payload.skip_validation {
        let required_names: Vec<String> = match payload.required_doc_names {
            Some(names) => names,
            None => {
                let sub_service = request.sub_service.as_deref().unwrap_or_default();
                checklist::required_documents(sub_service)
                    .iter()
                    .map(|name| name.to_string())
                    .collect()
            }
        };
        let required: Vec<&str> = required_names.iter().map(String::as_str).collect();

        let rows: Vec<Document> = documents::table
            .filter(documents::service_request_id.eq(request.id))
            .load(&mut conn)?;
        let facts = document_facts(&rows);

        let missing = checklist::missing_documents(&required, &facts);
        if !missing.is_empty() {
            return Err(AppError::validation(format!(
                "required documents missing: {}",
                missing.join(", ")
            )));
        }
    }

    let updated = conn.transaction::<ServiceRequest, AppError, _>(|conn| {
        diesel::update(service_requests::table.find(request.id))
            .set((
                service_requests::status.eq(STATUS_SUBMITTED),
                service_requests::updated_at.eq(Utc::now().naive_utc()),
            ))
            .execute(conn)?;
        let updated: ServiceRequest = service_requests::table.find(request.id).first(conn)?;
        upsert_activity(conn, user.user_id, &updated)?;
        Ok(updated)
    })?;

    info!(service_request_id = %updated.id, "submitted service request");

    Ok(Json(ServiceRequestStatusResponse {
        service_request: updated.into(),
    }))
}

pub(crate) fn owned_service_request(
    conn: &mut PgConnection,
    user_id: Uuid,
    service_request_id: Uuid,
) -> AppResult<ServiceRequest> {
    let request: Option<ServiceRequest> = service_requests::table
        .find(service_request_id)
        .filter(service_requests::user_id.eq(user_id))
        .first(conn)
        .optional()?;
    request.ok_or_else(AppError::not_found)
}

/// One dashboard activity per service request, refreshed on every draft or
/// submit transition.
fn upsert_activity(
    conn: &mut PgConnection,
    user_id: Uuid,
    request: &ServiceRequest,
) -> AppResult<()> {
    let property: Property = properties::table.find(request.property_id).first(conn)?;
    let title = format!("{} - {}", request.main_service, property.property_name);
    let now = Utc::now().naive_utc();

    let existing: Option<Uuid> = activities::table
        .filter(activities::user_id.eq(user_id))
        .filter(activities::related_type.eq(RELATED_SERVICE_REQUEST))
        .filter(activities::related_id.eq(request.id))
        .select(activities::id)
        .first(conn)
        .optional()?;

    match existing {
        Some(activity_id) => {
            diesel::update(activities::table.find(activity_id))
                .set((
                    activities::title.eq(&title),
                    activities::status.eq(ACTIVITY_PENDING),
                    activities::date.eq(now),
                ))
                .execute(conn)?;
        }
        None => {
            let new_activity = NewActivity {
                id: Uuid::new_v4(),
                user_id,
                title,
                status: ACTIVITY_PENDING.to_string(),
                date: now,
                related_type: Some(RELATED_SERVICE_REQUEST.to_string()),
                related_id: Some(request.id),
            };
            diesel::insert_into(activities::table)
                .values(&new_activity)
                .execute(conn)?;
        }
    }

    Ok(())
}
