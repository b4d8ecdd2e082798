use axum::{
    extract::State,
    http::{header::SET_COOKIE, HeaderMap, HeaderValue, StatusCode},
    Json,
};
use axum_extra::{headers::Cookie, typed_header::TypedHeader};
use chrono::{Duration as ChronoDuration, Utc};
use diesel::prelude::*;
use rand::{rngs::OsRng, RngCore};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::info;
use uuid::Uuid;

use crate::{
    auth::{
        otp::{generate_otp_code, hash_otp_code, normalize_phone},
        AuthenticatedUser,
    },
    error::{AppError, AppResult},
    models::{NewOtpCode, NewRefreshToken, NewUser, OtpCode, RefreshToken, User},
    schema::{otp_codes, refresh_tokens, users::dsl},
    state::AppState,
};

use crate::schema::refresh_tokens::dsl as refresh_dsl;
use crate::schema::users;

const REFRESH_COOKIE_NAME: &str = "refresh_token";

pub const REGISTRATION_INDIVIDUAL: &str = "individual";
pub const REGISTRATION_ORGANIZATION: &str = "organization";

#[derive(Deserialize)]
pub struct RequestCodePayload {
    pub phone: String,
}

#[derive(Serialize)]
pub struct RequestCodeResponse {
    pub expires_in: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub debug_code: Option<String>,
}

#[derive(Deserialize)]
pub struct VerifyCodePayload {
    pub phone: String,
    pub code: String,
    pub full_name: Option<String>,
    pub email: Option<String>,
    pub registration_type: Option<String>,
    pub organization_name: Option<String>,
}

#[derive(Serialize)]
pub struct SessionResponse {
    pub access_token: String,
    pub token_type: String,
    pub expires_in: i64,
    pub user_id: Uuid,
    pub created: bool,
}

/// Issues a one-time sign-in code for the given phone number. Delivery is the
/// SMS provider's concern; the code only leaves this service in the response
/// when OTP_DEBUG_RESPONSE is enabled (local development and tests).
pub async fn request_code(
    State(state): State<AppState>,
    Json(payload): Json<RequestCodePayload>,
) -> AppResult<(StatusCode, Json<RequestCodeResponse>)> {
    let phone = normalize_phone(&payload.phone);
    if phone.trim_start_matches('+').len() < 10 {
        return Err(AppError::validation("phone must be a valid mobile number"));
    }

    let code = generate_otp_code();
    let now = Utc::now();
    let expires_at = now + ChronoDuration::minutes(state.config.otp_expiry_minutes);

    let new_code = NewOtpCode {
        id: Uuid::new_v4(),
        phone: phone.clone(),
        code_hash: hash_otp_code(&code),
        expires_at: expires_at.naive_utc(),
    };

    let mut conn = state.db()?;
    diesel::insert_into(otp_codes::table)
        .values(&new_code)
        .execute(&mut conn)?;

    info!(phone = %phone, expires_at = %expires_at, "issued sign-in code");

    let debug_code = state.config.otp_debug_response.then_some(code);
    Ok((
        StatusCode::ACCEPTED,
        Json(RequestCodeResponse {
            expires_in: state.config.otp_expiry_minutes * 60,
            debug_code,
        }),
    ))
}

/// Verifies a one-time code, creating the user profile on first sign-in, and
/// starts a session: a bearer access token plus a rotating refresh cookie.
pub async fn verify_code(
    State(state): State<AppState>,
    Json(payload): Json<VerifyCodePayload>,
) -> AppResult<(HeaderMap, Json<SessionResponse>)> {
    let phone = normalize_phone(&payload.phone);
    let code = payload.code.trim();
    if phone.is_empty() || code.is_empty() {
        return Err(AppError::validation("phone and code are required"));
    }

    let registration_type = match payload.registration_type.as_deref() {
        None => REGISTRATION_INDIVIDUAL.to_string(),
        Some(REGISTRATION_INDIVIDUAL) => REGISTRATION_INDIVIDUAL.to_string(),
        Some(REGISTRATION_ORGANIZATION) => REGISTRATION_ORGANIZATION.to_string(),
        Some(other) => {
            return Err(AppError::validation(format!(
                "unknown registration type '{other}'"
            )))
        }
    };

    let mut conn = state.db()?;
    let now = Utc::now();
    let now_naive = now.naive_utc();

    let candidate: OtpCode = otp_codes::table
        .filter(otp_codes::phone.eq(&phone))
        .filter(otp_codes::consumed_at.is_null())
        .filter(otp_codes::expires_at.gt(now_naive))
        .order(otp_codes::created_at.desc())
        .first(&mut conn)
        .map_err(|_| AppError::auth())?;

    if candidate.code_hash != hash_otp_code(code) {
        return Err(AppError::auth());
    }

    diesel::update(otp_codes::table.find(candidate.id))
        .set(otp_codes::consumed_at.eq(Some(now_naive)))
        .execute(&mut conn)?;

    let existing: Option<User> = dsl::users
        .filter(users::phone.eq(&phone))
        .first(&mut conn)
        .optional()?;

    let (user, created) = match existing {
        Some(user) => (user, false),
        None => {
            let new_user = NewUser {
                id: Uuid::new_v4(),
                phone: phone.clone(),
                full_name: payload.full_name.clone(),
                email: payload.email.clone(),
                registration_type: registration_type.clone(),
                organization_name: payload.organization_name.clone(),
            };
            diesel::insert_into(users::table)
                .values(&new_user)
                .execute(&mut conn)?;
            let user: User = dsl::users.find(new_user.id).first(&mut conn)?;
            info!(user_id = %user.id, registration_type = %user.registration_type, "created user profile");
            (user, true)
        }
    };

    let access_token = state
        .jwt
        .generate_token(user.id, &user.phone, &user.registration_type)
        .map_err(AppError::from)?;

    let refresh_value = generate_refresh_token();
    let refresh_hash = hash_refresh_token(&refresh_value);
    let refresh_expires_at = now + ChronoDuration::days(state.config.refresh_token_expiry_days);

    let new_refresh = NewRefreshToken {
        id: Uuid::new_v4(),
        user_id: user.id,
        token_hash: refresh_hash,
        issued_at: now_naive,
        expires_at: refresh_expires_at.naive_utc(),
    };

    diesel::insert_into(refresh_tokens::table)
        .values(&new_refresh)
        .execute(&mut conn)?;

    let mut headers = HeaderMap::new();
    headers.insert(
        SET_COOKIE,
        build_refresh_cookie(&state, &refresh_value, refresh_expires_at),
    );

    Ok((
        headers,
        Json(SessionResponse {
            access_token,
            token_type: "Bearer".to_string(),
            expires_in: state.config.jwt_expiry_minutes * 60,
            user_id: user.id,
            created,
        }),
    ))
}

pub async fn refresh(
    State(state): State<AppState>,
    jar: Option<TypedHeader<Cookie>>,
) -> AppResult<(HeaderMap, Json<SessionResponse>)> {
    let cookies = jar.ok_or_else(AppError::auth)?;
    let refresh_value = cookies
        .get(REFRESH_COOKIE_NAME)
        .ok_or_else(AppError::auth)?;

    let hashed = hash_refresh_token(refresh_value);
    let mut conn = state.db()?;
    let now = Utc::now();
    let now_naive = now.naive_utc();

    let token = match refresh_dsl::refresh_tokens
        .filter(refresh_dsl::token_hash.eq(&hashed))
        .filter(refresh_dsl::revoked_at.is_null())
        .filter(refresh_dsl::expires_at.gt(now_naive))
        .first::<RefreshToken>(&mut conn)
    {
        Ok(token) => token,
        Err(diesel::result::Error::NotFound) => return Err(AppError::auth()),
        Err(err) => return Err(AppError::from(err)),
    };

    diesel::update(refresh_dsl::refresh_tokens.filter(refresh_dsl::id.eq(token.id)))
        .set((
            refresh_dsl::revoked_at.eq(now_naive),
            refresh_dsl::updated_at.eq(now_naive),
        ))
        .execute(&mut conn)?;

    let user: User = dsl::users
        .find(token.user_id)
        .first(&mut conn)
        .map_err(AppError::from)?;

    let access_token = state
        .jwt
        .generate_token(user.id, &user.phone, &user.registration_type)
        .map_err(AppError::from)?;

    let new_refresh_value = generate_refresh_token();
    let new_refresh_hash = hash_refresh_token(&new_refresh_value);
    let new_refresh_expires = now + ChronoDuration::days(state.config.refresh_token_expiry_days);

    let new_refresh = NewRefreshToken {
        id: Uuid::new_v4(),
        user_id: user.id,
        token_hash: new_refresh_hash,
        issued_at: now_naive,
        expires_at: new_refresh_expires.naive_utc(),
    };

    diesel::insert_into(refresh_tokens::table)
        .values(&new_refresh)
        .execute(&mut conn)?;

    let mut headers = HeaderMap::new();
    headers.insert(
        SET_COOKIE,
        build_refresh_cookie(&state, &new_refresh_value, new_refresh_expires),
    );

    Ok((
        headers,
        Json(SessionResponse {
            access_token,
            token_type: "Bearer".to_string(),
            expires_in: state.config.jwt_expiry_minutes * 60,
            user_id: user.id,
            created: false,
        }),
    ))
}

pub async fn logout(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    jar: Option<TypedHeader<Cookie>>,
) -> AppResult<(HeaderMap, StatusCode)> {
    let mut conn = state.db()?;
    let now = Utc::now().naive_utc();
    let mut rows_affected = 0;

    if let Some(cookies) = jar {
        if let Some(value) = cookies.get(REFRESH_COOKIE_NAME) {
            let hashed = hash_refresh_token(value);
            rows_affected = diesel::update(
                refresh_dsl::refresh_tokens
                    .filter(refresh_dsl::token_hash.eq(hashed))
                    .filter(refresh_dsl::user_id.eq(user.user_id))
                    .filter(refresh_dsl::revoked_at.is_null()),
            )
            .set((
                refresh_dsl::revoked_at.eq(now),
                refresh_dsl::updated_at.eq(now),
            ))
            .execute(&mut conn)
            .unwrap_or(0);
        }
    }

    if rows_affected == 0 {
        let _ = diesel::update(
            refresh_dsl::refresh_tokens
                .filter(refresh_dsl::user_id.eq(user.user_id))
                .filter(refresh_dsl::revoked_at.is_null()),
        )
        .set((
            refresh_dsl::revoked_at.eq(now),
            refresh_dsl::updated_at.eq(now),
        ))
        .execute(&mut conn);
    }

    let mut headers = HeaderMap::new();
    headers.insert(SET_COOKIE, build_clear_refresh_cookie(&state));
    Ok((headers, StatusCode::NO_CONTENT))
}

pub async fn me(user: AuthenticatedUser) -> Json<AuthenticatedUser> {
    Json(user)
}

fn hash_refresh_token(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    hex::encode(hasher.finalize())
}

fn generate_refresh_token() -> String {
    let mut bytes = [0u8; 32];
    OsRng.fill_bytes(&mut bytes);
    hex::encode(bytes)
}

fn build_refresh_cookie(
    state: &AppState,
    token: &str,
    expires_at: chrono::DateTime<Utc>,
) -> HeaderValue {
    let max_age = ChronoDuration::days(state.config.refresh_token_expiry_days).num_seconds();

    let mut parts = vec![format!("{}={}", REFRESH_COOKIE_NAME, token)];
    parts.push("Path=/".into());
    parts.push("HttpOnly".into());
    parts.push("SameSite=Strict".into());
    parts.push(format!("Max-Age={}", max_age));
    parts.push(format!("Expires={}", expires_at.to_rfc2822()));
    if state.config.refresh_cookie_secure {
        parts.push("Secure".into());
    }
    if let Some(domain) = &state.config.refresh_cookie_domain {
        parts.push(format!("Domain={}", domain));
    }

    HeaderValue::from_str(&parts.join("; ")).expect("valid refresh cookie")
}

fn build_clear_refresh_cookie(state: &AppState) -> HeaderValue {
    let mut parts = vec![format!("{}=", REFRESH_COOKIE_NAME)];
    parts.push("Path=/".into());
    parts.push("HttpOnly".into());
    parts.push("SameSite=Strict".into());
    parts.push("Max-Age=0".into());
    parts.push("Expires=Thu, 01 Jan 1970 00:00:00 GMT".into());
    if state.config.refresh_cookie_secure {
        parts.push("Secure".into());
    }
    if let Some(domain) = &state.config.refresh_cookie_domain {
        parts.push(format!("Domain={}", domain));
    }

    HeaderValue::from_str(&parts.join("; ")).expect("valid refresh cookie")
}
