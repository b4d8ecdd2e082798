mod common;

use anyhow::Result;
use axum::http::StatusCode;
use common::{acquire_db_lock, json_body, TestApp};
use serde_json::json;

#[tokio::test]
async fn otp_sign_in_creates_profile_then_reuses_it() -> Result<()> {
    let _guard = acquire_db_lock().await;
    let app = TestApp::new().await?;

    let code = app.request_code("+91 98765 43210").await?;
    let response = app
        .post_json(
            "/api/auth/verify-code",
            &json!({
                "phone": "+91 98765 43210",
                "code": code,
                "full_name": "Asha Rao",
                "registration_type": "individual",
            }),
            None,
        )
        .await?;
    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response.into_body()).await?;
    assert_eq!(body["created"], json!(true));
    let token = body["access_token"].as_str().unwrap().to_string();

    let me = app.get("/api/auth/me", Some(&token)).await?;
    assert_eq!(me.status(), StatusCode::OK);
    let me_body = json_body(me.into_body()).await?;
    // Phone is stored in canonical form regardless of input separators.
    assert_eq!(me_body["phone"], json!("+919876543210"));

    // Second sign-in with a fresh code reuses the profile.
    let code = app.request_code("+919876543210").await?;
    let response = app
        .post_json(
            "/api/auth/verify-code",
            &json!({ "phone": "+919876543210", "code": code }),
            None,
        )
        .await?;
    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response.into_body()).await?;
    assert_eq!(body["created"], json!(false));

    app.cleanup().await?;
    Ok(())
}

#[tokio::test]
async fn wrong_or_reused_code_is_rejected() -> Result<()> {
    let _guard = acquire_db_lock().await;
    let app = TestApp::new().await?;

    let code = app.request_code("+919812345678").await?;

    let response = app
        .post_json(
            "/api/auth/verify-code",
            &json!({ "phone": "+919812345678", "code": "000000" }),
            None,
        )
        .await?;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    // The right code still works after a failed attempt.
    let response = app
        .post_json(
            "/api/auth/verify-code",
            &json!({ "phone": "+919812345678", "code": code }),
            None,
        )
        .await?;
    assert_eq!(response.status(), StatusCode::OK);

    // Codes are single-use.
    let response = app
        .post_json(
            "/api/auth/verify-code",
            &json!({ "phone": "+919812345678", "code": code }),
            None,
        )
        .await?;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    app.cleanup().await?;
    Ok(())
}

#[tokio::test]
async fn protected_routes_require_a_bearer_token() -> Result<()> {
    let _guard = acquire_db_lock().await;
    let app = TestApp::new().await?;

    let response = app.get("/api/projects", None).await?;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = app
        .post_json("/api/projects", &json!({ "title": "Blocked" }), None)
        .await?;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    app.cleanup().await?;
    Ok(())
}
