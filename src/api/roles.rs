use actix_web::{web, HttpRequest, HttpResponse};
use serde::Deserialize;
use serde_json::json;

use crate::api::mutation::{self, Mutated};
use crate::models::{Notification, RoleSettings};
use crate::services::role_service;
use crate::state::AppState;

#[derive(Debug, Deserialize, utoipa::ToSchema)]
pub struct RoleRequest {
    pub role: String,
}

fn settings_record(state: &AppState) -> String {
    format!("settings/{}", state.config.tenant)
}

#[utoipa::path(
    get,
    path = "/api/v1/backoffice/roles",
    tag = "Backoffice",
    responses((status = 200, description = "Tenant role set", body = RoleSettings)),
    security(("bearer_auth" = []))
)]
pub async fn list_roles(state: web::Data<AppState>) -> HttpResponse {
    match role_service::load_roles(state.store.as_ref(), &state.config.tenant).await {
        Ok(settings) => HttpResponse::Ok().json(json!({ "success": true, "roles": settings.roles })),
        Err(e) => mutation::failure(&e, "load roles"),
    }
}

#[utoipa::path(
    post,
    path = "/api/v1/backoffice/roles",
    tag = "Backoffice",
    request_body = RoleRequest,
    responses(
        (status = 200, description = "Role added, or already present"),
        (status = 400, description = "Blank role name")
    ),
    security(("bearer_auth" = []))
)]
pub async fn add_role(state: web::Data<AppState>, req: HttpRequest, request: web::Json<RoleRequest>) -> HttpResponse {
    log::info!("🛡️  POST /backoffice/roles - role: {}", request.role);

    let op = async {
        role_service::add_role(state.store.as_ref(), &state.config.tenant, &request.role)
            .await
            .map(|(settings, added)| {
                let notification = if added {
                    Notification::success("Role added", &format!("Role '{}' is now available.", request.role.trim()))
                } else {
                    Notification::success("No changes", &format!("Role '{}' already exists.", request.role.trim()))
                };
                Mutated::ok(notification, json!({ "added": added, "roles": settings.roles }))
            })
    };
    mutation::run(&state, &req, &settings_record(&state), "add role", op).await
}

#[utoipa::path(
    put,
    path = "/api/v1/backoffice/roles/{role}",
    tag = "Backoffice",
    params(("role" = String, Path, description = "Role to rename")),
    request_body = RoleRequest,
    responses(
        (status = 200, description = "Role renamed and users moved"),
        (status = 403, description = "Built-in roles cannot be renamed"),
        (status = 404, description = "Unknown role")
    ),
    security(("bearer_auth" = []))
)]
pub async fn rename_role(
    state: web::Data<AppState>,
    req: HttpRequest,
    path: web::Path<String>,
    request: web::Json<RoleRequest>,
) -> HttpResponse {
    let old_role = path.into_inner();
    log::info!("🛡️  PUT /backoffice/roles/{} -> {}", old_role, request.role);

    let op = async {
        role_service::rename_role(state.store.as_ref(), &state.config.tenant, &old_role, &request.role)
            .await
            .map(|(settings, moved)| {
                Mutated::ok(
                    Notification::success("Success", "Role updated successfully"),
                    json!({ "roles": settings.roles, "usersMoved": moved }),
                )
            })
    };
    mutation::run(&state, &req, &settings_record(&state), "update role", op).await
}
