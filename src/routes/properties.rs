use axum::extract::{Json, Path, Query, State};
use axum::http::StatusCode;
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use crate::auth::AuthenticatedUser;
use crate::error::{AppError, AppResult};
use crate::models::{NewProperty, Project, Property};
use crate::schema::{projects, properties};
use crate::state::AppState;
use crate::workflow::drafts::AddressFields;

#[derive(Deserialize)]
pub struct CreatePropertyRequest {
    pub project_id: Uuid,
    pub property_type: String,
    pub property_name: String,
    pub size_unit: Option<String>,
    pub size_value: Option<f64>,
    pub address_fields: Option<AddressFields>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
}

#[derive(Deserialize)]
pub struct PropertyListQuery {
    pub project_id: Uuid,
}

#[derive(Serialize)]
pub struct PropertyResponse {
    pub id: Uuid,
    pub project_id: Uuid,
    pub property_type: String,
    pub property_name: String,
    pub address_short: Option<String>,
    pub size_unit: Option<String>,
    pub size_value: Option<f64>,
    pub address_fields: Option<AddressFields>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub created_at: String,
}

impl TryFrom<Property> for PropertyResponse {
    type Error = AppError;

    fn try_from(property: Property) -> Result<Self, Self::Error> {
        let address_fields = property
            .address_fields
            .map(serde_json::from_value)
            .transpose()?;
        Ok(Self {
            id: property.id,
            project_id: property.project_id,
            property_type: property.property_type,
            property_name: property.property_name,
            address_short: property.address_short,
            size_unit: property.size_unit,
            size_value: property.size_value,
            address_fields,
            latitude: property.latitude,
            longitude: property.longitude,
            created_at: property.created_at.and_utc().to_rfc3339(),
        })
    }
}

#[derive(Serialize)]
pub struct PropertyDetailResponse {
    pub property: PropertyResponse,
}

pub async fn create_property(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Json(payload): Json<CreatePropertyRequest>,
) -> AppResult<(StatusCode, Json<PropertyDetailResponse>)> {
    let property_type = payload.property_type.trim().to_string();
    let property_name = payload.property_name.trim().to_string();
    if property_type.is_empty() || property_name.is_empty() {
        return Err(AppError::validation(
            "property type and property name are required",
        ));
    }

    let mut conn = state.db()?;

    // The project must exist and belong to the caller before a property can
    // reference it.
    let project: Option<Project> = projects::table
        .find(payload.project_id)
        .filter(projects::owner_id.eq(user.user_id))
        .first(&mut conn)
        .optional()?;
    let project = project.ok_or_else(AppError::not_found)?;

    let address_short = payload
        .address_fields
        .as_ref()
        .map(format_address_line)
        .filter(|line| !line.is_empty());

    let address_fields = payload
        .address_fields
        .as_ref()
        .map(serde_json::to_value)
        .transpose()?;

    let new_property = NewProperty {
        id: Uuid::new_v4(),
        user_id: user.user_id,
        project_id: project.id,
        property_type,
        property_name,
        address_short,
        size_unit: payload.size_unit,
        size_value: payload.size_value,
        address_fields,
        latitude: payload.latitude,
        longitude: payload.longitude,
    };

    diesel::insert_into(properties::table)
        .values(&new_property)
        .execute(&mut conn)?;

    let property: Property = properties::table.find(new_property.id).first(&mut conn)?;

    info!(
        property_id = %property.id,
        project_id = %property.project_id,
        "created property"
    );

    Ok((
        StatusCode::CREATED,
        Json(PropertyDetailResponse {
            property: property.try_into()?,
        }),
    ))
}

pub async fn list_properties(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Query(params): Query<PropertyListQuery>,
) -> AppResult<Json<Vec<PropertyResponse>>> {
    let mut conn = state.db()?;

    let rows: Vec<Property> = properties::table
        .filter(properties::user_id.eq(user.user_id))
        .filter(properties::project_id.eq(params.project_id))
        .order(properties::created_at.desc())
        .load(&mut conn)?;

    rows.into_iter()
        .map(PropertyResponse::try_from)
        .collect::<Result<Vec<_>, _>>()
        .map(Json)
}

pub async fn get_property(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(property_id): Path<Uuid>,
) -> AppResult<Json<PropertyDetailResponse>> {
    let mut conn = state.db()?;

    let property: Option<Property> = properties::table
        .find(property_id)
        .filter(properties::user_id.eq(user.user_id))
        .first(&mut conn)
        .optional()?;
    let property = property.ok_or_else(AppError::not_found)?;

    Ok(Json(PropertyDetailResponse {
        property: property.try_into()?,
    }))
}

/// Single-line postal rendering of the structured fields. Field order is
/// fixed: door, building, cross road, main road, landmark, area, taluk,
/// district, state, pincode. Blank fields are skipped.
pub fn format_address_line(fields: &AddressFields) -> String {
    [
        &fields.door_no,
        &fields.building_name,
        &fields.cross_road,
        &fields.main_road,
        &fields.landmark,
        &fields.area_name,
        &fields.taluk,
        &fields.district,
        &fields.state,
        &fields.pincode,
    ]
    .into_iter()
    .map(|part| part.trim())
    .filter(|part| !part.is_empty())
    .collect::<Vec<_>>()
    .join(", ")
}

#[cfg(test)]
mod tests {
    use super::{format_address_line, AddressFields};

    fn full_address() -> AddressFields {
        AddressFields {
            door_no: "12A".into(),
            building_name: "Lakeview Residency".into(),
            cross_road: "4th Cross".into(),
            main_road: "80 Feet Road".into(),
            landmark: "Near Metro".into(),
            area_name: "Indiranagar".into(),
            state: "Karnataka".into(),
            zone: "East".into(),
            district: "Bengaluru Urban".into(),
            taluk: "Bengaluru East".into(),
            area_type: "urban".into(),
            municipal_type: "BBMP".into(),
            ward_or_panchayath: "Ward 80".into(),
            post_office: "Indiranagar PO".into(),
            pincode: "560038".into(),
        }
    }

    #[test]
    fn renders_fields_in_fixed_order() {
        let line = format_address_line(&full_address());
        assert_eq!(
            line,
            "12A, Lakeview Residency, 4th Cross, 80 Feet Road, Near Metro, \
             Indiranagar, Bengaluru East, Bengaluru Urban, Karnataka, 560038"
        );
    }

    #[test]
    fn skips_blank_fields() {
        let mut fields = full_address();
        fields.building_name = String::new();
        fields.landmark = "   ".into();
        let line = format_address_line(&fields);
        assert_eq!(
            line,
            "12A, 4th Cross, 80 Feet Road, Indiranagar, Bengaluru East, \
             Bengaluru Urban, Karnataka, 560038"
        );
    }

    #[test]
    fn all_blank_renders_empty() {
        assert_eq!(format_address_line(&AddressFields::default()), "");
    }

    #[test]
    fn zone_and_ward_do_not_appear_in_the_line() {
        let line = format_address_line(&full_address());
        assert!(!line.contains("East,  Ward"));
        assert!(!line.contains("Ward 80"));
        assert!(!line.contains("Indiranagar PO"));
    }
}
