use axum::http::HeaderValue;
use axum::{
    extract::DefaultBodyLimit,
    middleware,
    routing::{delete, get, post},
    Router,
};
use tower_http::cors::{AllowOrigin, CorsLayer};

use crate::{auth::AuthenticatedUser, state::AppState};

pub mod activities;
pub mod auth;
pub mod documents;
pub mod health;
pub mod projects;
pub mod properties;
pub mod service_requests;
pub mod transactions;

pub fn create_router(state: AppState) -> Router<()> {
    let cors = if let Some(origins) = state.config.cors_allowed_origin.as_ref() {
        let headers: Vec<HeaderValue> = origins
            .split(',')
            .filter_map(|value| {
                let trimmed = value.trim();
                (!trimmed.is_empty()).then(|| {
                    trimmed
                        .parse::<HeaderValue>()
                        .expect("invalid CORS allowed origin")
                })
            })
            .collect();

        let allow_origin = AllowOrigin::list(headers);

        CorsLayer::new()
            .allow_origin(allow_origin)
            .allow_methods(tower_http::cors::AllowMethods::mirror_request())
            .allow_headers(tower_http::cors::AllowHeaders::mirror_request())
            .allow_credentials(true)
    } else {
        CorsLayer::new()
            .allow_origin(AllowOrigin::mirror_request())
            .allow_methods(tower_http::cors::AllowMethods::mirror_request())
            .allow_headers(tower_http::cors::AllowHeaders::mirror_request())
            .allow_credentials(true)
    };

    let auth_routes = Router::new()
        .route("/request-code", post(auth::request_code))
        .route("/verify-code", post(auth::verify_code))
        .route("/refresh", post(auth::refresh))
        .route("/logout", post(auth::logout))
        .route("/me", get(auth::me));

    let projects_routes = Router::new().route(
        "/",
        get(projects::list_projects).post(projects::create_project),
    );

    let properties_routes = Router::new()
        .route(
            "/",
            get(properties::list_properties).post(properties::create_property),
        )
        .route("/:id", get(properties::get_property));

    let service_request_routes = Router::new()
        .route("/", post(service_requests::upsert_service_request))
        .route("/:id", get(service_requests::get_service_request))
        .route("/:id/draft", post(service_requests::save_draft))
        .route("/:id/submit", post(service_requests::submit_service_request))
        .route(
            "/:id/documents",
            get(documents::list_documents).post(documents::upload_document),
        )
        .route(
            "/:id/documents/toggle",
            post(documents::toggle_not_available),
        )
        .route(
            "/:id/documents/:document_id",
            delete(documents::delete_document),
        );

    let activities_routes = Router::new().route("/", get(activities::list_activities));

    let transactions_routes = Router::new().route(
        "/",
        get(transactions::list_transactions).post(transactions::record_payment),
    );

    let protected_state = state.clone();
    let protected_routes = Router::new()
        .nest("/api/projects", projects_routes)
        .nest("/api/properties", properties_routes)
        .nest("/api/service-requests", service_request_routes)
        .nest("/api/activities", activities_routes)
        .nest("/api/transactions", transactions_routes)
        .layer(middleware::from_extractor_with_state::<AuthenticatedUser, _>(protected_state));

    Router::new()
        .merge(protected_routes)
        .nest("/api/auth", auth_routes)
        .route("/api/health", get(health::health_check))
        .with_state(state)
        .layer(cors)
        .layer(DefaultBodyLimit::max(1024 * 1024 * 64))
}
