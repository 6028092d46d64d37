use bcrypt::{hash, verify};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use mongodb::bson::oid::ObjectId;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Mutex;
use uuid::Uuid;

use crate::config::AuthConfig;
use crate::models::{Notification, User, UserPatch, UserProfile};
use crate::services::{mail_service::OutgoingMail, role_service};
use crate::state::AppState;
use crate::utils::error::AppError;

/// What a token may be used for
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TokenKind {
    Access,
    Refresh,
    Verification,
    UserInvite,
    RecipeInvite,
}

// JWT Claims
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    pub sub: String,           // user id (recipe id for recipe invites)
    pub email: String,
    pub name: Option<String>,
    pub role: String,
    pub email_verified: bool,
    pub tenant: String,
    pub kind: TokenKind,
    pub iat: usize,            // issued at
    pub exp: usize,            // expiration
    pub jti: String,           // JWT ID
    #[serde(default)]
    pub sid: String,           // login session shared by an access/refresh pair
    pub aud: String,           // audience
    pub iss: String,           // issuer
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    SignedOut,
    SignedInUnverified,
    SignedInVerified,
}

impl SessionState {
    pub fn for_user(user: &User) -> Self {
        if user.email_verified {
            SessionState::SignedInVerified
        } else {
            SessionState::SignedInUnverified
        }
    }
}

// Request/Response structures
#[derive(Debug, Deserialize, utoipa::ToSchema)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize, utoipa::ToSchema)]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
    pub name: String,
    /// Token from an invitation email; grants the invited role
    pub invite_token: Option<String>,
}

#[derive(Debug, Deserialize, utoipa::ToSchema)]
pub struct RefreshTokenRequest {
    pub refresh_token: String,
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct AuthResponse {
    pub success: bool,
    pub token: String,
    pub refresh_token: String,
    pub user: UserProfile,
    pub session: SessionState,
    pub available_roles: Vec<String>,
    pub verification_sent: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notification: Option<Notification>,
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct SessionResponse {
    pub success: bool,
    pub session: SessionState,
    pub user: UserProfile,
    pub available_roles: Vec<String>,
}

/// Token ids revoked by logout, kept until the token would have expired
#[derive(Default)]
pub struct RevokedTokens {
    inner: Mutex<HashMap<String, usize>>,
}

impl RevokedTokens {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn revoke(&self, jti: &str, exp: usize) {
        if let Ok(mut revoked) = self.inner.lock() {
            revoked.insert(jti.to_string(), exp);
        }
    }

    pub fn is_revoked(&self, jti: &str) -> bool {
        self.inner
            .lock()
            .map(|revoked| revoked.contains_key(jti))
            .unwrap_or(false)
    }

    /// True when the token itself or its login session was revoked
    pub fn covers(&self, claims: &Claims) -> bool {
        self.is_revoked(&claims.jti) || (!claims.sid.is_empty() && self.is_revoked(&claims.sid))
    }

    pub fn purge_expired(&self, now: usize) -> usize {
        match self.inner.lock() {
            Ok(mut revoked) => {
                let before = revoked.len();
                revoked.retain(|_, exp| *exp > now);
                before - revoked.len()
            }
            Err(_) => 0,
        }
    }
}

struct TokenParams<'a> {
    kind: TokenKind,
    sub: &'a str,
    email: &'a str,
    name: Option<&'a str>,
    role: &'a str,
    email_verified: bool,
    tenant: &'a str,
    sid: &'a str,
    ttl: Duration,
}

fn issue(config: &AuthConfig, params: TokenParams<'_>) -> Result<String, AppError> {
    let now = Utc::now();
    let claims = Claims {
        sub: params.sub.to_string(),
        email: params.email.to_string(),
        name: params.name.map(String::from),
        role: params.role.to_string(),
        email_verified: params.email_verified,
        tenant: params.tenant.to_string(),
        kind: params.kind,
        iat: now.timestamp() as usize,
        exp: (now + params.ttl).timestamp() as usize,
        jti: Uuid::new_v4().to_string(),
        sid: params.sid.to_string(),
        aud: config.jwt_audience.clone(),
        iss: config.jwt_issuer.clone(),
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(config.jwt_secret.as_ref()),
    )
    .map_err(|e| AppError::InvalidRequest(format!("Failed to generate token: {}", e)))
}

// Generate JWT access token
pub fn generate_jwt(config: &AuthConfig, user: &User, tenant: &str, sid: &str) -> Result<String, AppError> {
    issue(
        config,
        TokenParams {
            kind: TokenKind::Access,
            sub: &user.id,
            email: &user.email,
            name: Some(&user.name),
            role: &user.role,
            email_verified: user.email_verified,
            tenant,
            sid,
            ttl: Duration::hours(config.token_ttl_hours),
        },
    )
}

// Generate refresh token (longer expiry)
pub fn generate_refresh_token(config: &AuthConfig, user: &User, tenant: &str, sid: &str) -> Result<String, AppError> {
    issue(
        config,
        TokenParams {
            kind: TokenKind::Refresh,
            sub: &user.id,
            email: &user.email,
            name: None,
            role: &user.role,
            email_verified: user.email_verified,
            tenant,
            sid,
            ttl: Duration::days(config.refresh_ttl_days),
        },
    )
}

pub fn generate_verification_token(config: &AuthConfig, user: &User, tenant: &str) -> Result<String, AppError> {
    issue(
        config,
        TokenParams {
            kind: TokenKind::Verification,
            sub: &user.id,
            email: &user.email,
            name: None,
            role: &user.role,
            email_verified: false,
            tenant,
            sid: "",
            ttl: Duration::hours(config.verification_ttl_hours),
        },
    )
}

/// Invitation to create an account with `role`
pub fn generate_user_invite_token(config: &AuthConfig, email: &str, role: &str, tenant: &str) -> Result<String, AppError> {
    issue(
        config,
        TokenParams {
            kind: TokenKind::UserInvite,
            sub: email,
            email,
            name: None,
            role,
            email_verified: false,
            tenant,
            sid: "",
            ttl: Duration::days(config.invite_ttl_days),
        },
    )
}

/// Invitation for `email` to recipe `recipe_id`
pub fn generate_recipe_invite_token(config: &AuthConfig, recipe_id: &str, email: &str, tenant: &str) -> Result<String, AppError> {
    issue(
        config,
        TokenParams {
            kind: TokenKind::RecipeInvite,
            sub: recipe_id,
            email,
            name: None,
            role: "",
            email_verified: false,
            tenant,
            sid: "",
            ttl: Duration::days(config.invite_ttl_days),
        },
    )
}

// Verify JWT token
pub fn verify_token(config: &AuthConfig, token: &str) -> Result<Claims, AppError> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.set_audience(&[config.jwt_audience.as_str()]);
    validation.set_issuer(&[config.jwt_issuer.as_str()]);

    decode::<Claims>(
        token,
        &DecodingKey::from_secret(config.jwt_secret.as_ref()),
        &validation,
    )
    .map(|data| data.claims)
    .map_err(|e| AppError::Unauthorized(format!("Invalid token: {}", e)))
}

/// Verifies a token and checks it is meant for `kind`
pub fn verify_token_kind(config: &AuthConfig, token: &str, kind: TokenKind) -> Result<Claims, AppError> {
    let claims = verify_token(config, token)?;
    if claims.kind != kind {
        return Err(AppError::Unauthorized(format!(
            "Token is a {:?} token, expected {:?}",
            claims.kind, kind
        )));
    }
    Ok(claims)
}

fn verification_link(state: &AppState, token: &str) -> String {
    format!(
        "{}/verify-email?token={}",
        state.config.public_url.trim_end_matches('/'),
        urlencoding::encode(token)
    )
}

/// Sends one verification email to `user`
pub async fn dispatch_verification(state: &AppState, user: &User) -> Result<(), AppError> {
    let token = generate_verification_token(&state.config.auth, user, &state.config.tenant)?;
    let link = verification_link(state, &token);

    log::info!("📧 Sending verification email to: {}", user.email);
    state
        .mailer
        .send(&OutgoingMail::verification(&user.email, &link))
        .await
}

/// Issues a token pair. `sid` is carried over on refresh, new otherwise.
async fn build_session(
    state: &AppState,
    user: &User,
    sid: Option<&str>,
    verification_sent: bool,
    notification: Option<Notification>,
) -> Result<AuthResponse, AppError> {
    // Role set is read once per session start
    let roles = role_service::load_roles(state.store.as_ref(), &state.config.tenant).await?;
    let sid = sid.map(String::from).unwrap_or_else(|| Uuid::new_v4().to_string());

    Ok(AuthResponse {
        success: true,
        token: generate_jwt(&state.config.auth, user, &state.config.tenant, &sid)?,
        refresh_token: generate_refresh_token(&state.config.auth, user, &state.config.tenant, &sid)?,
        user: UserProfile::from(user),
        session: SessionState::for_user(user),
        available_roles: roles.roles,
        verification_sent,
        notification,
    })
}

// User login
pub async fn login(state: &AppState, request: &LoginRequest) -> Result<AuthResponse, AppError> {
    let email = request.email.trim().to_lowercase();

    let user = state
        .store
        .find_user_by_email(&email)
        .await?
        .ok_or_else(|| AppError::Unauthorized("Invalid credentials".to_string()))?;

    let stored_password = user
        .password_hash
        .as_ref()
        .ok_or_else(|| AppError::Unauthorized("Invalid credentials".to_string()))?;

    let valid = verify(&request.password, stored_password)
        .map_err(|e| AppError::Unauthorized(format!("Password verification error: {}", e)))?;

    if !valid {
        return Err(AppError::Unauthorized("Invalid credentials".to_string()));
    }

    if user.email_verified {
        return build_session(state, &user, None, false, None).await;
    }

    // Exactly one dispatch per unverified login
    dispatch_verification(state, &user).await?;
    let notification = Notification::success(
        "Email verification required",
        "Please check your inbox and verify your email to access all features.",
    );
    build_session(state, &user, None, true, Some(notification)).await
}

fn validate_registration(request: &RegisterRequest) -> Result<(String, String), AppError> {
    let email = request.email.trim().to_lowercase();
    let name = request.name.trim().to_string();

    if email.is_empty() || !email.contains('@') {
        return Err(AppError::InvalidRequest("A valid email is required".to_string()));
    }
    if request.password.len() < 6 {
        return Err(AppError::InvalidRequest(
            "Password must be at least 6 characters".to_string(),
        ));
    }
    if name.is_empty() {
        return Err(AppError::InvalidRequest("Name is required".to_string()));
    }

    Ok((email, name))
}

// User registration
pub async fn register(state: &AppState, request: &RegisterRequest) -> Result<AuthResponse, AppError> {
    let (email, name) = validate_registration(request)?;

    let invite = match &request.invite_token {
        Some(token) => {
            let claims = verify_token_kind(&state.config.auth, token, TokenKind::UserInvite)?;
            if claims.email != email {
                return Err(AppError::Forbidden(
                    "Invitation was issued for a different email".to_string(),
                ));
            }
            Some(claims)
        }
        None => None,
    };

    if state.store.find_user_by_email(&email).await?.is_some() {
        return Err(AppError::InvalidRequest("User already exists".to_string()));
    }

    let password_hash = hash(&request.password, state.config.auth.bcrypt_cost)
        .map_err(|e| AppError::InvalidRequest(format!("Failed to hash password: {}", e)))?;

    // An accepted invitation proves ownership of the address
    let (role, email_verified) = match &invite {
        Some(claims) => {
            role_service::ensure_role_exists(state.store.as_ref(), &state.config.tenant, &claims.role).await?;
            (claims.role.clone(), true)
        }
        None => ("user".to_string(), false),
    };

    let user = User {
        id: ObjectId::new().to_hex(),
        email: email.clone(),
        name,
        role,
        created_at: Utc::now().timestamp(),
        avatar_url: None,
        password_hash: Some(password_hash),
        email_verified,
    };

    state.store.insert_user(&user).await?;
    log::info!("✅ User registered successfully: {} (role: {})", email, user.role);

    let verification_sent = if user.email_verified {
        false
    } else {
        dispatch_verification(state, &user).await?;
        true
    };

    let notification = Notification::success(
        "Account created successfully",
        if verification_sent {
            "Please check your inbox and verify your email address to access all features."
        } else {
            "Welcome aboard."
        },
    );

    build_session(state, &user, None, verification_sent, Some(notification)).await
}

/// Sends another verification email. No limit on how often this may be called.
/// Returns `false` when the address is already verified.
pub async fn resend_verification(state: &AppState, claims: &Claims) -> Result<bool, AppError> {
    let user = state
        .store
        .find_user(&claims.sub)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;

    if user.email_verified {
        return Ok(false);
    }

    dispatch_verification(state, &user).await?;
    Ok(true)
}

pub async fn confirm_verification(state: &AppState, token: &str) -> Result<UserProfile, AppError> {
    let claims = verify_token_kind(&state.config.auth, token, TokenKind::Verification)?;

    let patch = UserPatch {
        email_verified: Some(true),
        ..UserPatch::default()
    };
    if !state.store.update_user(&claims.sub, &patch).await? {
        return Err(AppError::NotFound("User not found".to_string()));
    }

    let user = state
        .store
        .find_user(&claims.sub)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;

    log::info!("✅ Email verified: {}", user.email);
    Ok(UserProfile::from(&user))
}

/// Ends the login session: the access token and every refresh token
/// sharing its `sid` stop working.
pub fn logout(state: &AppState, claims: &Claims) {
    state.revoked.revoke(&claims.jti, claims.exp);
    if !claims.sid.is_empty() {
        let until = (Utc::now() + Duration::days(state.config.auth.refresh_ttl_days)).timestamp() as usize;
        state.revoked.revoke(&claims.sid, until);
    }
    log::info!("👋 Session closed for user {}", claims.sub);
}

/// Current session for an access token's subject
pub async fn session(state: &AppState, claims: &Claims) -> Result<SessionResponse, AppError> {
    let user = state
        .store
        .find_user(&claims.sub)
        .await?
        .ok_or_else(|| AppError::Unauthorized("User no longer exists".to_string()))?;

    let roles = role_service::load_roles(state.store.as_ref(), &state.config.tenant).await?;

    Ok(SessionResponse {
        success: true,
        session: SessionState::for_user(&user),
        user: UserProfile::from(&user),
        available_roles: roles.roles,
    })
}

// Refresh token
pub async fn refresh_token(state: &AppState, request: &RefreshTokenRequest) -> Result<AuthResponse, AppError> {
    let claims = verify_token_kind(&state.config.auth, &request.refresh_token, TokenKind::Refresh)?;

    if state.revoked.covers(&claims) {
        return Err(AppError::Unauthorized("Token has been revoked".to_string()));
    }

    let user = state
        .store
        .find_user(&claims.sub)
        .await?
        .ok_or_else(|| AppError::Unauthorized("User not found".to_string()))?;

    // Single use
    state.revoked.revoke(&claims.jti, claims.exp);

    let sid = Some(claims.sid.as_str()).filter(|sid| !sid.is_empty());
    build_session(state, &user, sid, false, None).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AppConfig;

    fn user() -> User {
        User {
            id: "u1".into(),
            email: "ana@example.com".into(),
            name: "Ana".into(),
            role: "admin".into(),
            created_at: 0,
            avatar_url: None,
            password_hash: None,
            email_verified: false,
        }
    }

    #[test]
    fn test_access_token_round_trip_carries_role() {
        let config = AppConfig::for_tests().auth;
        let token = generate_jwt(&config, &user(), "t1", "s1").unwrap();
        let claims = verify_token_kind(&config, &token, TokenKind::Access).unwrap();

        assert_eq!(claims.sub, "u1");
        assert_eq!(claims.role, "admin");
        assert_eq!(claims.tenant, "t1");
        assert!(!claims.email_verified);
    }

    #[test]
    fn test_refresh_token_is_not_an_access_token() {
        let config = AppConfig::for_tests().auth;
        let token = generate_refresh_token(&config, &user(), "t1", "s1").unwrap();
        assert!(verify_token_kind(&config, &token, TokenKind::Access).is_err());
    }

    #[test]
    fn test_wrong_secret_is_rejected() {
        let config = AppConfig::for_tests().auth;
        let token = generate_jwt(&config, &user(), "t1", "s1").unwrap();

        let mut other = config.clone();
        other.jwt_secret = "another".into();
        assert!(matches!(verify_token(&other, &token), Err(AppError::Unauthorized(_))));
    }

    #[test]
    fn test_revoked_tokens_purge() {
        let revoked = RevokedTokens::new();
        revoked.revoke("a", 10);
        revoked.revoke("b", 100);
        assert!(revoked.is_revoked("a"));

        assert_eq!(revoked.purge_expired(50), 1);
        assert!(!revoked.is_revoked("a"));
        assert!(revoked.is_revoked("b"));
    }

    #[test]
    fn test_logout_revokes_refresh_token_of_same_session() {
        let state = AppState::new(
            AppConfig::for_tests(),
            std::sync::Arc::new(crate::database::MemoryStore::new()),
            std::sync::Arc::new(crate::services::OutboxMailer::new()),
        );
        let config = &state.config.auth;
        let access = verify_token(config, &generate_jwt(config, &user(), "t1", "s1").unwrap()).unwrap();
        let refresh = verify_token(config, &generate_refresh_token(config, &user(), "t1", "s1").unwrap()).unwrap();
        let other = verify_token(config, &generate_refresh_token(config, &user(), "t1", "s2").unwrap()).unwrap();

        logout(&state, &access);

        assert!(state.revoked.covers(&access));
        assert!(state.revoked.covers(&refresh));
        assert!(!state.revoked.covers(&other));
    }

    #[test]
    fn test_registration_validation() {
        let request = RegisterRequest {
            email: " Ana@Example.com ".into(),
            password: "secret1".into(),
            name: " Ana ".into(),
            invite_token: None,
        };
        assert_eq!(
            validate_registration(&request).unwrap(),
            ("ana@example.com".to_string(), "Ana".to_string())
        );

        let short = RegisterRequest { password: "123".into(), ..request };
        assert!(validate_registration(&short).is_err());
    }
}
