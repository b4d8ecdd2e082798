use chrono::NaiveDateTime;
use diesel::prelude::*;
use uuid::Uuid;

use crate::schema::*;

#[derive(Debug, Clone, Queryable, Identifiable)]
#[diesel(table_name = users)]
pub struct User {
    pub id: Uuid,
    pub phone: String,
    pub full_name: Option<String>,
    pub email: Option<String>,
    pub registration_type: String,
    pub organization_name: Option<String>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = users)]
pub struct NewUser {
    pub id: Uuid,
    pub phone: String,
    pub full_name: Option<String>,
    pub email: Option<String>,
    pub registration_type: String,
    pub organization_name: Option<String>,
}

#[derive(Debug, Clone, Queryable, Identifiable)]
#[diesel(table_name = otp_codes)]
pub struct OtpCode {
    pub id: Uuid,
    pub phone: String,
    pub code_hash: String,
    pub expires_at: NaiveDateTime,
    pub consumed_at: Option<NaiveDateTime>,
    pub created_at: NaiveDateTime,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = otp_codes)]
pub struct NewOtpCode {
    pub id: Uuid,
    pub phone: String,
    pub code_hash: String,
    pub expires_at: NaiveDateTime,
}

#[derive(Debug, Clone, Queryable, Identifiable, Associations)]
#[diesel(table_name = refresh_tokens)]
#[diesel(belongs_to(User))]
pub struct RefreshToken {
    pub id: Uuid,
    pub user_id: Uuid,
    pub token_hash: String,
    pub issued_at: NaiveDateTime,
    pub expires_at: NaiveDateTime,
    pub revoked_at: Option<NaiveDateTime>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = refresh_tokens)]
pub struct NewRefreshToken {
    pub id: Uuid,
    pub user_id: Uuid,
    pub token_hash: String,
    pub issued_at: NaiveDateTime,
    pub expires_at: NaiveDateTime,
}

#[derive(Debug, Clone, Queryable, Identifiable)]
#[diesel(table_name = projects)]
pub struct Project {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub pr_number: Option<String>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = projects)]
pub struct NewProject {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub pr_number: Option<String>,
}

#[derive(Debug, Clone, Queryable, Identifiable, Associations)]
#[diesel(table_name = properties)]
#[diesel(belongs_to(Project))]
pub struct Property {
    pub id: Uuid,
    pub user_id: Uuid,
    pub project_id: Uuid,
    pub property_type: String,
    pub property_name: String,
    pub address_short: Option<String>,
    pub size_unit: Option<String>,
    pub size_value: Option<f64>,
    pub address_fields: Option<serde_json::Value>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub created_at: NaiveDateTime,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = properties)]
pub struct NewProperty {
    pub id: Uuid,
    pub user_id: Uuid,
    pub project_id: Uuid,
    pub property_type: String,
    pub property_name: String,
    pub address_short: Option<String>,
    pub size_unit: Option<String>,
    pub size_value: Option<f64>,
    pub address_fields: Option<serde_json::Value>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
}

#[derive(Debug, Clone, Queryable, Identifiable, Associations)]
#[diesel(table_name = service_requests)]
#[diesel(belongs_to(Project))]
#[diesel(belongs_to(Property))]
pub struct ServiceRequest {
    pub id: Uuid,
    pub user_id: Uuid,
    pub project_id: Uuid,
    pub property_id: Uuid,
    pub main_service: String,
    pub sub_service: Option<String>,
    pub status: String,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = service_requests)]
pub struct NewServiceRequest {
    pub id: Uuid,
    pub user_id: Uuid,
    pub project_id: Uuid,
    pub property_id: Uuid,
    pub main_service: String,
    pub sub_service: Option<String>,
    pub status: String,
}

#[derive(Debug, Clone, Queryable, Identifiable, Associations)]
#[diesel(table_name = documents)]
#[diesel(belongs_to(ServiceRequest))]
pub struct Document {
    pub id: Uuid,
    pub user_id: Uuid,
    pub service_request_id: Uuid,
    pub doc_group: String,
    pub doc_name: String,
    pub file_key: Option<String>,
    pub file_url: Option<String>,
    pub not_available: bool,
    pub status: String,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = documents)]
pub struct NewDocument {
    pub id: Uuid,
    pub user_id: Uuid,
    pub service_request_id: Uuid,
    pub doc_group: String,
    pub doc_name: String,
    pub file_key: Option<String>,
    pub file_url: Option<String>,
    pub not_available: bool,
    pub status: String,
}

#[derive(Debug, Clone, Queryable, Identifiable)]
#[diesel(table_name = activities)]
pub struct Activity {
    pub id: Uuid,
    pub user_id: Uuid,
    pub title: String,
    pub status: String,
    pub date: NaiveDateTime,
    pub related_type: Option<String>,
    pub related_id: Option<Uuid>,
    pub created_at: NaiveDateTime,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = activities)]
pub struct NewActivity {
    pub id: Uuid,
    pub user_id: Uuid,
    pub title: String,
    pub status: String,
    pub date: NaiveDateTime,
    pub related_type: Option<String>,
    pub related_id: Option<Uuid>,
}

#[derive(Debug, Clone, Queryable, Identifiable, Associations)]
#[diesel(table_name = transactions)]
#[diesel(belongs_to(ServiceRequest))]
pub struct Transaction {
    pub id: Uuid,
    pub user_id: Uuid,
    pub service_request_id: Uuid,
    pub charge_type: String,
    pub status: String,
    pub created_at: NaiveDateTime,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = transactions)]
pub struct NewTransaction {
    pub id: Uuid,
    pub user_id: Uuid,
    pub service_request_id: Uuid,
    pub charge_type: String,
    pub status: String,
}
