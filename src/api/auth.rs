use actix_web::{web, HttpResponse, ResponseError};
use serde::Deserialize;
use serde_json::json;

use crate::models::Notification;
use crate::services::auth_service::{
    self, AuthResponse, Claims, LoginRequest, RefreshTokenRequest, RegisterRequest, SessionResponse,
};
use crate::state::AppState;

#[derive(Debug, Deserialize, utoipa::IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ConfirmQuery {
    pub token: String,
}

#[utoipa::path(
    post,
    path = "/api/v1/auth/login",
    tag = "Auth",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Login successful", body = AuthResponse),
        (status = 401, description = "Invalid credentials")
    )
)]
pub async fn login(state: web::Data<AppState>, request: web::Json<LoginRequest>) -> HttpResponse {
    log::info!("🔐 POST /auth/login - email: {}", request.email);

    match auth_service::login(&state, &request).await {
        Ok(response) => {
            log::info!("✅ Login successful: {} ({:?})", request.email, response.session);
            HttpResponse::Ok().json(response)
        }
        Err(e) => {
            log::warn!("❌ Login failed: {} - {}", request.email, e);
            e.error_response()
        }
    }
}

#[utoipa::path(
    post,
    path = "/api/v1/auth/register",
    tag = "Auth",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "Registration successful", body = AuthResponse),
        (status = 400, description = "Invalid request or user already exists")
    )
)]
pub async fn register(state: web::Data<AppState>, request: web::Json<RegisterRequest>) -> HttpResponse {
    log::info!("📝 POST /auth/register - email: {}", request.email);

    match auth_service::register(&state, &request).await {
        Ok(response) => HttpResponse::Created().json(response),
        Err(e) => {
            log::warn!("❌ Registration failed: {} - {}", request.email, e);
            e.error_response()
        }
    }
}

#[utoipa::path(
    post,
    path = "/api/v1/auth/refresh",
    tag = "Auth",
    request_body = RefreshTokenRequest,
    responses(
        (status = 200, description = "New token pair", body = AuthResponse),
        (status = 401, description = "Refresh token invalid, expired or already used")
    )
)]
pub async fn refresh_token(state: web::Data<AppState>, request: web::Json<RefreshTokenRequest>) -> HttpResponse {
    log::info!("🔄 POST /auth/refresh");

    match auth_service::refresh_token(&state, &request).await {
        Ok(response) => HttpResponse::Ok().json(response),
        Err(e) => {
            log::warn!("❌ Token refresh failed: {}", e);
            e.error_response()
        }
    }
}

#[utoipa::path(
    post,
    path = "/api/v1/auth/logout",
    tag = "Auth",
    responses((status = 200, description = "Token revoked")),
    security(("bearer_auth" = []))
)]
pub async fn logout(state: web::Data<AppState>, claims: web::ReqData<Claims>) -> HttpResponse {
    auth_service::logout(&state, &claims);
    HttpResponse::Ok().json(json!({
        "success": true,
        "notification": Notification::success("Signed out", "You have been signed out."),
    }))
}

#[utoipa::path(
    get,
    path = "/api/v1/auth/session",
    tag = "Auth",
    responses(
        (status = 200, description = "Current session", body = SessionResponse),
        (status = 401, description = "Signed out")
    ),
    security(("bearer_auth" = []))
)]
pub async fn session(state: web::Data<AppState>, claims: web::ReqData<Claims>) -> HttpResponse {
    match auth_service::session(&state, &claims).await {
        Ok(response) => HttpResponse::Ok().json(response),
        Err(e) => e.error_response(),
    }
}

#[utoipa::path(
    post,
    path = "/api/v1/auth/verification/resend",
    tag = "Auth",
    responses(
        (status = 200, description = "Verification email sent, or already verified"),
        (status = 401, description = "Signed out")
    ),
    security(("bearer_auth" = []))
)]
pub async fn resend_verification(state: web::Data<AppState>, claims: web::ReqData<Claims>) -> HttpResponse {
    log::info!("📧 POST /auth/verification/resend - user: {}", claims.sub);

    match auth_service::resend_verification(&state, &claims).await {
        Ok(true) => HttpResponse::Ok().json(json!({
            "success": true,
            "sent": true,
            "notification": Notification::success(
                "Verification email sent",
                "Please check your inbox for the verification link.",
            ),
        })),
        Ok(false) => HttpResponse::Ok().json(json!({
            "success": true,
            "sent": false,
            "notification": Notification::success("Already verified", "Your email is already verified."),
        })),
        Err(e) => {
            log::error!("❌ Verification resend failed for {}: {}", claims.sub, e);
            HttpResponse::build(e.status_code()).json(json!({
                "success": false,
                "error": e.to_string(),
                "notification": Notification::destructive(
                    "Error",
                    "Failed to send verification email. Please try again.",
                ),
            }))
        }
    }
}

#[utoipa::path(
    get,
    path = "/api/v1/auth/verification/confirm",
    tag = "Auth",
    params(ConfirmQuery),
    responses(
        (status = 200, description = "Email verified"),
        (status = 401, description = "Invalid or expired link")
    )
)]
pub async fn confirm_verification(state: web::Data<AppState>, query: web::Query<ConfirmQuery>) -> HttpResponse {
    match auth_service::confirm_verification(&state, &query.token).await {
        Ok(user) => HttpResponse::Ok().json(json!({
            "success": true,
            "user": user,
            "notification": Notification::success("Email verified", "Your email address has been verified."),
        })),
        Err(e) => {
            log::warn!("❌ Email verification failed: {}", e);
            e.error_response()
        }
    }
}
