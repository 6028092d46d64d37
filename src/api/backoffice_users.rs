use actix_web::{web, HttpRequest, HttpResponse};
use serde::Deserialize;
use serde_json::json;

use crate::api::mutation::{self, Mutated};
use crate::models::{Notification, UserRow};
use crate::services::auth_service::Claims;
use crate::services::user_service::{
    self, ChangeRoleRequest, InviteOutcome, InviteUsersRequest, MessageUserRequest, RenameUserRequest,
};
use crate::state::AppState;

#[derive(Debug, Deserialize, utoipa::IntoParams)]
#[into_params(parameter_in = Query)]
pub struct UserSearchQuery {
    /// Email prefix
    pub search: Option<String>,
}

fn user_record(id: &str) -> String {
    format!("users/{}", id)
}

#[utoipa::path(
    get,
    path = "/api/v1/backoffice/users",
    tag = "Backoffice",
    params(UserSearchQuery),
    responses(
        (status = 200, description = "Users with their recipes", body = [UserRow]),
        (status = 403, description = "Not an admin")
    ),
    security(("bearer_auth" = []))
)]
pub async fn list_users(
    state: web::Data<AppState>,
    claims: web::ReqData<Claims>,
    query: web::Query<UserSearchQuery>,
) -> HttpResponse {
    log::info!("👥 GET /backoffice/users - search: {:?}", query.search);

    match user_service::list_users_with_recipes(&state, &claims.sub, query.search.as_deref()).await {
        Ok(users) => HttpResponse::Ok().json(json!({
            "success": true,
            "count": users.len(),
            "users": users,
        })),
        Err(e) => {
            log::error!("❌ Failed to list users: {}", e);
            mutation::failure(&e, "load users")
        }
    }
}

#[utoipa::path(
    patch,
    path = "/api/v1/backoffice/users/{id}/name",
    tag = "Backoffice",
    params(("id" = String, Path, description = "User id")),
    request_body = RenameUserRequest,
    responses(
        (status = 200, description = "Renamed, or left untouched for a blank name"),
        (status = 409, description = "Another write to this user is in progress")
    ),
    security(("bearer_auth" = []))
)]
pub async fn rename_user(
    state: web::Data<AppState>,
    req: HttpRequest,
    path: web::Path<String>,
    request: web::Json<RenameUserRequest>,
) -> HttpResponse {
    let id = path.into_inner();

    let op = async {
        user_service::rename_user(&state, &id, &request.name)
            .await
            .map(|updated| match updated {
                true => Mutated::ok(
                    Notification::success("Success", "User name updated successfully"),
                    json!({ "updated": true }),
                ),
                false => Mutated {
                    status: actix_web::http::StatusCode::OK,
                    body: json!({ "success": true, "updated": false }),
                },
            })
    };
    mutation::run(&state, &req, &user_record(&id), "update user name", op).await
}

#[utoipa::path(
    patch,
    path = "/api/v1/backoffice/users/{id}/role",
    tag = "Backoffice",
    params(("id" = String, Path, description = "User id")),
    request_body = ChangeRoleRequest,
    responses(
        (status = 200, description = "Role updated"),
        (status = 400, description = "Role is not in the tenant's role set")
    ),
    security(("bearer_auth" = []))
)]
pub async fn change_role(
    state: web::Data<AppState>,
    req: HttpRequest,
    path: web::Path<String>,
    request: web::Json<ChangeRoleRequest>,
) -> HttpResponse {
    let id = path.into_inner();
    log::info!("🛡️  PATCH /backoffice/users/{}/role - role: {}", id, request.role);

    let op = async {
        user_service::change_role(&state, &id, &request.role).await.map(|_| {
            Mutated::ok(
                Notification::success("Success", "User role updated successfully"),
                json!({ "role": request.role.trim() }),
            )
        })
    };
    mutation::run(&state, &req, &user_record(&id), "update user role", op).await
}

#[utoipa::path(
    delete,
    path = "/api/v1/backoffice/users/{id}",
    tag = "Backoffice",
    params(("id" = String, Path, description = "User id")),
    responses(
        (status = 200, description = "User deleted; their recipes are kept"),
        (status = 404, description = "User not found")
    ),
    security(("bearer_auth" = []))
)]
pub async fn delete_user(state: web::Data<AppState>, req: HttpRequest, path: web::Path<String>) -> HttpResponse {
    let id = path.into_inner();
    log::info!("🗑️  DELETE /backoffice/users/{}", id);

    let op = async {
        user_service::delete_user(&state, &id).await.map(|_| {
            Mutated::ok(
                Notification::success("User deleted", "The user has been deleted."),
                json!({ "deleted": true, "undoAvailable": false }),
            )
        })
    };
    mutation::run(&state, &req, &user_record(&id), "delete user", op).await
}

#[utoipa::path(
    post,
    path = "/api/v1/backoffice/users/{id}/undo-delete",
    tag = "Backoffice",
    params(("id" = String, Path, description = "User id")),
    responses((status = 200, description = "Acknowledged; deleted users are never restored")),
    security(("bearer_auth" = []))
)]
pub async fn undo_delete_user(path: web::Path<String>) -> HttpResponse {
    let restored = user_service::undo_delete_user(&path);
    HttpResponse::Ok().json(json!({
        "success": true,
        "restored": restored,
        "notification": Notification::success(
            "Undo unavailable",
            "Deleted users cannot be restored.",
        ),
    }))
}

#[utoipa::path(
    post,
    path = "/api/v1/backoffice/users/{id}/message",
    tag = "Backoffice",
    params(("id" = String, Path, description = "User id")),
    request_body = MessageUserRequest,
    responses(
        (status = 200, description = "Message sent"),
        (status = 404, description = "User not found")
    ),
    security(("bearer_auth" = []))
)]
pub async fn message_user(
    state: web::Data<AppState>,
    req: HttpRequest,
    path: web::Path<String>,
    request: web::Json<MessageUserRequest>,
) -> HttpResponse {
    let id = path.into_inner();

    let op = async {
        user_service::message_user(&state, &id, &request).await.map(|_| {
            Mutated::ok(
                Notification::success("Message sent", "Your message has been sent to the user."),
                json!({ "sent": true }),
            )
        })
    };
    mutation::run(&state, &req, &format!("{}/messages", user_record(&id)), "send message", op).await
}

#[utoipa::path(
    post,
    path = "/api/v1/backoffice/users/invite",
    tag = "Backoffice",
    request_body = InviteUsersRequest,
    responses(
        (status = 200, description = "Invitations sent", body = InviteOutcome),
        (status = 400, description = "No valid addresses, or unknown role")
    ),
    security(("bearer_auth" = []))
)]
pub async fn invite_users(
    state: web::Data<AppState>,
    req: HttpRequest,
    claims: web::ReqData<Claims>,
    request: web::Json<InviteUsersRequest>,
) -> HttpResponse {
    log::info!("📨 POST /backoffice/users/invite - {} addresses", request.emails.len());

    let op = async {
        user_service::invite_users(&state, &request).await.map(|outcome| {
            Mutated::ok(
                Notification::success(
                    "Invitations sent",
                    &format!("{} invitation(s) have been sent.", outcome.invited.len()),
                ),
                json!({ "invited": outcome.invited, "skipped": outcome.skipped }),
            )
        })
    };
    mutation::run(&state, &req, &format!("invites/{}", claims.sub), "send invitations", op).await
}

#[utoipa::path(
    post,
    path = "/api/v1/backoffice/users/{id}/toggle-expand",
    tag = "Backoffice",
    params(("id" = String, Path, description = "User id")),
    responses((status = 200, description = "New expansion state of that row")),
    security(("bearer_auth" = []))
)]
pub async fn toggle_expand(
    state: web::Data<AppState>,
    claims: web::ReqData<Claims>,
    path: web::Path<String>,
) -> HttpResponse {
    match user_service::toggle_expand(&state, &claims.sub, &path).await {
        Ok(expanded) => HttpResponse::Ok().json(json!({
            "success": true,
            "id": path.as_str(),
            "expanded": expanded,
        })),
        Err(e) => mutation::failure(&e, "expand row"),
    }
}
