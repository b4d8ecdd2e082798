use axum::extract::{Json, Multipart, Path, State};
use axum::http::StatusCode;
use chrono::Utc;
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{error, info};
use uuid::Uuid;

use crate::auth::AuthenticatedUser;
use crate::error::{AppError, AppResult};
use crate::models::{Document, NewDocument};
use crate::routes::service_requests::owned_service_request;
use crate::schema::documents;
use crate::state::AppState;
use crate::storage::document_object_key;
use crate::workflow::checklist::{DocumentFacts, GROUP_COMMON, GROUP_OTHER, GROUP_REQUIRED};

pub const DOC_STATUS_PENDING: &str = "pending";
pub const DOC_STATUS_UPLOADED: &str = "uploaded";
pub const DOC_STATUS_NOT_AVAILABLE: &str = "not_available";

#[derive(Serialize)]
pub struct DocumentResponse {
    pub id: Uuid,
    pub service_request_id: Uuid,
    pub doc_group: String,
    pub doc_name: String,
    pub file_url: Option<String>,
    pub not_available: bool,
    pub status: String,
    pub updated_at: String,
}

impl From<Document> for DocumentResponse {
    fn from(doc: Document) -> Self {
        Self {
            id: doc.id,
            service_request_id: doc.service_request_id,
            doc_group: doc.doc_group,
            doc_name: doc.doc_name,
            file_url: doc.file_url,
            not_available: doc.not_available,
            status: doc.status,
            updated_at: doc.updated_at.and_utc().to_rfc3339(),
        }
    }
}

#[derive(Serialize)]
pub struct DocumentDetailResponse {
    pub document: DocumentResponse,
}

#[derive(Deserialize)]
pub struct ToggleNotAvailablePayload {
    pub doc_name: String,
    pub not_available: bool,
}

struct UploadFields {
    bytes: Vec<u8>,
    original_name: String,
    content_type: Option<String>,
    doc_group: String,
    doc_name: String,
}

/// Stores the uploaded bytes, then upserts the document row keyed by
/// (service request, document name). Re-uploading the same name replaces the
/// file reference and clears any not-available mark.
pub async fn upload_document(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(service_request_id): Path<Uuid>,
    multipart: Multipart,
) -> AppResult<(StatusCode, Json<DocumentDetailResponse>)> {
    let fields = read_upload_fields(multipart).await?;

    if !is_valid_doc_group(&fields.doc_group) {
        return Err(AppError::validation(format!(
            "invalid document group '{}'",
            fields.doc_group
        )));
    }

    {
        let mut conn = state.db()?;
        owned_service_request(&mut conn, user.user_id, service_request_id)?;
    }

    let extension = file_extension(&fields.original_name, fields.content_type.as_deref());
    let key = document_object_key(user.user_id, service_request_id, &fields.doc_name, &extension);

    // Storage first. If the bytes cannot be stored the whole operation fails;
    // a row must never exist with a dangling reference that reads like
    // "not available".
    state
        .storage
        .put_object(&key, fields.bytes, fields.content_type.clone())
        .await
        .map_err(|err| {
            error!(error = %err, key = %key, "failed to store document");
            AppError::network(format!("failed to store document: {err}"))
        })?;

    let file_url = state.storage.public_url(&key);

    let mut conn = state.db()?;
    let user_id = user.user_id;
    let doc_name = fields.doc_name.clone();
    let doc_group = fields.doc_group.clone();
    let (document, created) = conn.transaction::<(Document, bool), AppError, _>(|conn| {
        let existing: Option<Document> = documents::table
            .filter(documents::service_request_id.eq(service_request_id))
            .filter(documents::doc_name.eq(&doc_name))
            .filter(documents::user_id.eq(user_id))
            .first(conn)
            .optional()?;

        if let Some(existing) = existing {
            diesel::update(documents::table.find(existing.id))
                .set((
                    documents::file_key.eq(Some(key.as_str())),
                    documents::file_url.eq(Some(file_url.as_str())),
                    documents::not_available.eq(false),
                    documents::status.eq(DOC_STATUS_UPLOADED),
                    documents::updated_at.eq(Utc::now().naive_utc()),
                ))
                .execute(conn)?;
            let updated: Document = documents::table.find(existing.id).first(conn)?;
            Ok((updated, false))
        } else {
            let new_document = NewDocument {
                id: Uuid::new_v4(),
                user_id,
                service_request_id,
                doc_group: doc_group.clone(),
                doc_name: doc_name.clone(),
                file_key: Some(key.clone()),
                file_url: Some(file_url.clone()),
                not_available: false,
                status: DOC_STATUS_UPLOADED.to_string(),
            };
            diesel::insert_into(documents::table)
                .values(&new_document)
                .execute(conn)?;
            let inserted: Document = documents::table.find(new_document.id).first(conn)?;
            Ok((inserted, true))
        }
    })?;

    info!(
        document_id = %document.id,
        service_request_id = %service_request_id,
        doc_name = %document.doc_name,
        created,
        "stored workflow document"
    );

    let status = if created {
        StatusCode::CREATED
    } else {
        StatusCode::OK
    };
    Ok((
        status,
        Json(DocumentDetailResponse {
            document: document.into(),
        }),
    ))
}

/// Marks a document name as not-available (clearing any stored file) or
/// clears the mark. The two flags are mutually exclusive by construction:
/// setting not-available always drops the file reference.
pub async fn toggle_not_available(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(service_request_id): Path<Uuid>,
    Json(payload): Json<ToggleNotAvailablePayload>,
) -> AppResult<Json<DocumentDetailResponse>> {
    let doc_name = payload.doc_name.trim().to_string();
    if doc_name.is_empty() {
        return Err(AppError::validation("doc_name is required"));
    }

    let mut conn = state.db()?;
    owned_service_request(&mut conn, user.user_id, service_request_id)?;

    let existing: Option<Document> = documents::table
        .filter(documents::service_request_id.eq(service_request_id))
        .filter(documents::doc_name.eq(&doc_name))
        .filter(documents::user_id.eq(user.user_id))
        .first(&mut conn)
        .optional()?;

    let document: Document = match existing {
        Some(existing) => {
            let now = Utc::now().naive_utc();
            if payload.not_available {
                diesel::update(documents::table.find(existing.id))
                    .set((
                        documents::file_key.eq(None::<String>),
                        documents::file_url.eq(None::<String>),
                        documents::not_available.eq(true),
                        documents::status.eq(DOC_STATUS_NOT_AVAILABLE),
                        documents::updated_at.eq(now),
                    ))
                    .execute(&mut conn)?;
            } else {
                // Un-toggling leaves any held file in place; the caller
                // uploads separately when there is none.
                let status = if existing.file_url.is_some() {
                    DOC_STATUS_UPLOADED
                } else {
                    DOC_STATUS_PENDING
                };
                diesel::update(documents::table.find(existing.id))
                    .set((
                        documents::not_available.eq(false),
                        documents::status.eq(status),
                        documents::updated_at.eq(now),
                    ))
                    .execute(&mut conn)?;
            }
            documents::table.find(existing.id).first(&mut conn)?
        }
        None => {
            let status = if payload.not_available {
                DOC_STATUS_NOT_AVAILABLE
            } else {
                DOC_STATUS_PENDING
            };
            let new_document = NewDocument {
                id: Uuid::new_v4(),
                user_id: user.user_id,
                service_request_id,
                doc_group: GROUP_COMMON.to_string(),
                doc_name: doc_name.clone(),
                file_key: None,
                file_url: None,
                not_available: payload.not_available,
                status: status.to_string(),
            };
            diesel::insert_into(documents::table)
                .values(&new_document)
                .execute(&mut conn)?;
            documents::table.find(new_document.id).first(&mut conn)?
        }
    };

    info!(
        service_request_id = %service_request_id,
        doc_name = %doc_name,
        not_available = payload.not_available,
        "toggled document availability"
    );

    Ok(Json(DocumentDetailResponse {
        document: DocumentResponse::from(document),
    }))
}

pub async fn list_documents(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(service_request_id): Path<Uuid>,
) -> AppResult<Json<Vec<DocumentResponse>>> {
    let mut conn = state.db()?;
    owned_service_request(&mut conn, user.user_id, service_request_id)?;

    let rows: Vec<Document> = documents::table
        .filter(documents::service_request_id.eq(service_request_id))
        .filter(documents::user_id.eq(user.user_id))
        .order(documents::created_at.asc())
        .load(&mut conn)?;

    Ok(Json(rows.into_iter().map(DocumentResponse::from).collect()))
}

/// Deletes the stored file and resets the row to pending (the tile's
/// delete/retake action). The row itself stays so the name keeps a single
/// history.
pub async fn delete_document(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path((service_request_id, document_id)): Path<(Uuid, Uuid)>,
) -> AppResult<Json<DocumentDetailResponse>> {
    let mut conn = state.db()?;
    owned_service_request(&mut conn, user.user_id, service_request_id)?;

    let existing: Option<Document> = documents::table
        .find(document_id)
        .filter(documents::service_request_id.eq(service_request_id))
        .filter(documents::user_id.eq(user.user_id))
        .first(&mut conn)
        .optional()?;
    let existing = existing.ok_or_else(AppError::not_found)?;

    if let Some(key) = existing.file_key.as_deref() {
        if let Err(err) = state.storage.delete_object(key).await {
            error!(error = %err, key = %key, "failed to delete stored document");
        }
    }

    diesel::update(documents::table.find(existing.id))
        .set((
            documents::file_key.eq(None::<String>),
            documents::file_url.eq(None::<String>),
            documents::not_available.eq(false),
            documents::status.eq(DOC_STATUS_PENDING),
            documents::updated_at.eq(Utc::now().naive_utc()),
        ))
        .execute(&mut conn)?;

    let document: Document = documents::table.find(existing.id).first(&mut conn)?;

    Ok(Json(DocumentDetailResponse {
        document: document.into(),
    }))
}

/// Checklist view of the stored rows.
pub(crate) fn document_facts(rows: &[Document]) -> Vec<DocumentFacts> {
    rows.iter()
        .map(|doc| DocumentFacts {
            name: doc.doc_name.clone(),
            uploaded: doc.status == DOC_STATUS_UPLOADED && doc.file_url.is_some(),
            not_available: doc.not_available,
            document_id: Some(doc.id),
        })
        .collect()
}

fn is_valid_doc_group(group: &str) -> bool {
    matches!(group, GROUP_COMMON | GROUP_REQUIRED | GROUP_OTHER)
}

fn file_extension(original_name: &str, content_type: Option<&str>) -> String {
    if let Some((_, ext)) = original_name.rsplit_once('.') {
        if !ext.is_empty() && ext.len() <= 8 && ext.chars().all(|c| c.is_ascii_alphanumeric()) {
            return ext.to_ascii_lowercase();
        }
    }
    content_type
        .and_then(|ct| mime_guess::get_mime_extensions_str(ct))
        .and_then(|exts| exts.first())
        .map(|ext| ext.to_string())
        .unwrap_or_else(|| "bin".to_string())
}

async fn read_upload_fields(mut multipart: Multipart) -> AppResult<UploadFields> {
    let mut file_bytes: Option<Vec<u8>> = None;
    let mut original_name: Option<String> = None;
    let mut content_type: Option<String> = None;
    let mut doc_group: Option<String> = None;
    let mut doc_name: Option<String> = None;

    while let Some(field) = multipart.next_field().await.map_err(|err| {
        let msg = format!("invalid multipart data: {err}");
        error!(error = %err, "invalid multipart data");
        AppError::validation(msg)
    })? {
        let name = field.name().map(|n| n.to_string());
        match name.as_deref() {
            Some("file") => {
                original_name = field.file_name().map(|n| n.to_string());
                content_type = field.content_type().map(|mime| mime.to_string());
                let data = field.bytes().await.map_err(|err| {
                    let msg = format!("failed to read file bytes: {err}");
                    error!(error = %err, "failed to read file bytes");
                    AppError::validation(msg)
                })?;
                file_bytes = Some(data.to_vec());
            }
            Some("doc_group") => {
                let value = field
                    .text()
                    .await
                    .map_err(|err| AppError::validation(format!("invalid doc_group: {err}")))?;
                doc_group = Some(value.trim().to_string());
            }
            Some("doc_name") => {
                let value = field
                    .text()
                    .await
                    .map_err(|err| AppError::validation(format!("invalid doc_name: {err}")))?;
                doc_name = Some(value.trim().to_string());
            }
            _ => {}
        }
    }

    let bytes = file_bytes.ok_or_else(|| AppError::validation("file field is required"))?;
    if bytes.is_empty() {
        return Err(AppError::validation("file field must not be empty"));
    }
    let original_name =
        original_name.ok_or_else(|| AppError::validation("filename is required"))?;
    let doc_group = doc_group
        .filter(|g| !g.is_empty())
        .ok_or_else(|| AppError::validation("doc_group field is required"))?;
    let doc_name = doc_name
        .filter(|n| !n.is_empty())
        .ok_or_else(|| AppError::validation("doc_name field is required"))?;

    Ok(UploadFields {
        bytes,
        original_name,
        content_type,
        doc_group,
        doc_name,
    })
}
