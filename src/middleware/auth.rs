use actix_web::{
    dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform},
    web, Error, HttpMessage,
};
use futures::future::LocalBoxFuture;
use std::future::{ready, Ready};
use std::rc::Rc;

use crate::models::is_admin_role;
use crate::services::auth_service::{self, Claims, TokenKind};
use crate::state::AppState;
use crate::utils::error::AppError;

/// Requires a valid access token; with `admin_only`, also that the stored
/// user still exists and holds an admin role.
/// On success the token's `Claims` are placed in the request extensions.
#[derive(Clone, Copy)]
pub struct AuthMiddleware {
    admin_only: bool,
}

impl AuthMiddleware {
    pub fn authenticated() -> Self {
        AuthMiddleware { admin_only: false }
    }

    pub fn admin() -> Self {
        AuthMiddleware { admin_only: true }
    }
}

impl<S, B> Transform<S, ServiceRequest> for AuthMiddleware
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type InitError = ();
    type Transform = AuthMiddlewareService<S>;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(AuthMiddlewareService {
            service: Rc::new(service),
            admin_only: self.admin_only,
        }))
    }
}

pub struct AuthMiddlewareService<S> {
    service: Rc<S>,
    admin_only: bool,
}

fn bearer_token(req: &ServiceRequest) -> Result<&str, AppError> {
    let header = req
        .headers()
        .get("Authorization")
        .ok_or_else(|| AppError::Unauthorized("Missing authorization token".to_string()))?;

    header
        .to_str()
        .ok()
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .ok_or_else(|| AppError::Unauthorized("Invalid token format".to_string()))
}

fn authorize(req: &ServiceRequest, state: &AppState) -> Result<Claims, AppError> {
    let token = bearer_token(req)?;
    let claims = auth_service::verify_token_kind(&state.config.auth, token, TokenKind::Access)?;

    if state.revoked.covers(&claims) {
        return Err(AppError::Unauthorized("Token has been revoked".to_string()));
    }
    if claims.tenant != state.config.tenant {
        return Err(AppError::Unauthorized("Token was issued for another tenant".to_string()));
    }

    Ok(claims)
}

/// The profile document, not the token, decides backoffice access
async fn confirm_admin(state: &AppState, claims: &mut Claims) -> Result<(), AppError> {
    let user = state
        .store
        .find_user(&claims.sub)
        .await?
        .ok_or_else(|| AppError::Unauthorized("User no longer exists".to_string()))?;

    if !is_admin_role(&user.role) {
        return Err(AppError::Forbidden("Backoffice access requires an admin role".to_string()));
    }
    claims.role = user.role;
    Ok(())
}

async fn admit(req: &ServiceRequest, admin_only: bool) -> Result<Claims, AppError> {
    let state = req
        .app_data::<web::Data<AppState>>()
        .cloned()
        .ok_or_else(|| AppError::Unauthorized("Authentication is not configured".to_string()))?;

    let mut claims = authorize(req, &state)?;
    if admin_only {
        confirm_admin(&state, &mut claims).await?;
    }
    Ok(claims)
}

impl<S, B> Service<ServiceRequest> for AuthMiddlewareService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let service = self.service.clone();
        let admin_only = self.admin_only;

        Box::pin(async move {
            match admit(&req, admin_only).await {
                Ok(claims) => {
                    req.extensions_mut().insert(claims);
                    service.call(req).await
                }
                Err(e) => {
                    log::warn!("🔒 {} {} rejected: {}", req.method(), req.path(), e);
                    Err(e.into())
                }
            }
        })
    }
}
