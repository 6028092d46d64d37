use actix_web::{web, HttpRequest, HttpResponse};
use serde_json::json;

use crate::api::mutation::{self, Mutated};
use crate::models::{Notification, RecipePatch, RecipeRow};
use crate::services::auth_service::Claims;
use crate::services::recipe_service::{self, RecipeInviteRequest};
use crate::state::AppState;

fn recipe_record(id: &str) -> String {
    format!("recipes/{}", id)
}

#[utoipa::path(
    get,
    path = "/api/v1/backoffice/recipes",
    tag = "Backoffice",
    responses(
        (status = 200, description = "Recipe rows; expanded rows carry the full document", body = [RecipeRow]),
        (status = 403, description = "Not an admin")
    ),
    security(("bearer_auth" = []))
)]
pub async fn list_recipes(state: web::Data<AppState>, claims: web::ReqData<Claims>) -> HttpResponse {
    match recipe_service::list_recipe_rows(&state, &claims.sub).await {
        Ok(rows) => HttpResponse::Ok().json(json!({
            "success": true,
            "count": rows.len(),
            "recipes": rows,
        })),
        Err(e) => {
            log::error!("❌ Failed to list recipes: {}", e);
            mutation::failure(&e, "load recipes")
        }
    }
}

#[utoipa::path(
    patch,
    path = "/api/v1/backoffice/recipes/{id}",
    tag = "Backoffice",
    params(("id" = String, Path, description = "Recipe id")),
    request_body = RecipePatch,
    responses(
        (status = 200, description = "Recipe updated"),
        (status = 404, description = "Recipe not found"),
        (status = 409, description = "Another write to this recipe is in progress")
    ),
    security(("bearer_auth" = []))
)]
pub async fn update_recipe(
    state: web::Data<AppState>,
    req: HttpRequest,
    path: web::Path<String>,
    patch: web::Json<RecipePatch>,
) -> HttpResponse {
    let id = path.into_inner();
    log::info!("✏️  PATCH /backoffice/recipes/{}", id);

    let op = async {
        recipe_service::update_recipe(&state, &id, &patch).await.map(|_| {
            Mutated::ok(
                Notification::success("Success", "Recipe updated successfully"),
                json!({ "updated": true }),
            )
        })
    };
    mutation::run(&state, &req, &recipe_record(&id), "update recipe", op).await
}

#[utoipa::path(
    delete,
    path = "/api/v1/backoffice/recipes/{id}",
    tag = "Backoffice",
    params(("id" = String, Path, description = "Recipe id")),
    responses(
        (status = 200, description = "Recipe deleted"),
        (status = 404, description = "Recipe not found")
    ),
    security(("bearer_auth" = []))
)]
pub async fn delete_recipe(state: web::Data<AppState>, req: HttpRequest, path: web::Path<String>) -> HttpResponse {
    let id = path.into_inner();
    log::info!("🗑️  DELETE /backoffice/recipes/{}", id);

    let op = async {
        recipe_service::delete_recipe(&state, &id).await.map(|_| {
            Mutated::ok(
                Notification::success("Recipe deleted", "The recipe has been deleted."),
                json!({ "deleted": true }),
            )
        })
    };
    mutation::run(&state, &req, &recipe_record(&id), "delete recipe", op).await
}

#[utoipa::path(
    post,
    path = "/api/v1/backoffice/recipes/{id}/invites",
    tag = "Backoffice",
    params(("id" = String, Path, description = "Recipe id")),
    request_body = RecipeInviteRequest,
    responses(
        (status = 200, description = "New invitees added and mailed"),
        (status = 404, description = "Recipe not found")
    ),
    security(("bearer_auth" = []))
)]
pub async fn invite_to_recipe(
    state: web::Data<AppState>,
    req: HttpRequest,
    path: web::Path<String>,
    request: web::Json<RecipeInviteRequest>,
) -> HttpResponse {
    let id = path.into_inner();

    let op = async {
        recipe_service::invite_to_recipe(&state, &id, &request.emails)
            .await
            .map(|added| {
                Mutated::ok(
                    Notification::success(
                        "Invitations sent",
                        &format!("{} new invitation(s) sent.", added.len()),
                    ),
                    json!({ "invited": added }),
                )
            })
    };
    mutation::run(&state, &req, &recipe_record(&id), "send invitations", op).await
}

#[utoipa::path(
    post,
    path = "/api/v1/backoffice/recipes/{id}/toggle-expand",
    tag = "Backoffice",
    params(("id" = String, Path, description = "Recipe id")),
    responses((status = 200, description = "New expansion state of that row")),
    security(("bearer_auth" = []))
)]
pub async fn toggle_expand(
    state: web::Data<AppState>,
    claims: web::ReqData<Claims>,
    path: web::Path<String>,
) -> HttpResponse {
    match recipe_service::toggle_expand(&state, &claims.sub, &path).await {
        Ok(expanded) => HttpResponse::Ok().json(json!({
            "success": true,
            "id": path.as_str(),
            "expanded": expanded,
        })),
        Err(e) => mutation::failure(&e, "expand row"),
    }
}
