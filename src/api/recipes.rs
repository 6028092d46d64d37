use actix_web::{web, HttpRequest, HttpResponse, ResponseError};
use serde::Deserialize;
use serde_json::json;

use crate::api::mutation::{self, Mutated};
use crate::models::{CreateRecipeRequest, Notification, Recipe};
use crate::services::auth_service::Claims;
use crate::services::recipe_service::{
    self, AcceptInviteRequest, CreationOption, ImportRecipeRequest, ImportUrlRequest, TagOption,
};
use crate::state::AppState;

#[derive(Debug, Deserialize, utoipa::IntoParams)]
#[into_params(parameter_in = Query)]
pub struct TagQuery {
    /// Case-insensitive text filter
    pub q: Option<String>,
    /// Comma-separated tags already chosen
    pub selected: Option<String>,
}

#[utoipa::path(
    get,
    path = "/api/v1/recipes",
    tag = "Recipes",
    responses(
        (status = 200, description = "All recipes", body = [Recipe]),
        (status = 500, description = "Store unavailable")
    )
)]
pub async fn list_recipes(state: web::Data<AppState>) -> HttpResponse {
    match recipe_service::list_recipes(&state).await {
        Ok(recipes) => HttpResponse::Ok().json(json!({
            "success": true,
            "count": recipes.len(),
            "recipes": recipes,
        })),
        Err(e) => {
            log::error!("❌ Failed to list recipes: {}", e);
            e.error_response()
        }
    }
}

#[utoipa::path(
    get,
    path = "/api/v1/recipes/{id}",
    tag = "Recipes",
    params(("id" = String, Path, description = "Recipe id")),
    responses(
        (status = 200, description = "Recipe", body = Recipe),
        (status = 404, description = "Recipe not found")
    )
)]
pub async fn get_recipe(state: web::Data<AppState>, path: web::Path<String>) -> HttpResponse {
    match recipe_service::get_recipe(&state, &path).await {
        Ok(recipe) => HttpResponse::Ok().json(json!({ "success": true, "recipe": recipe })),
        Err(e) => e.error_response(),
    }
}

#[utoipa::path(
    get,
    path = "/api/v1/recipes/creation-options",
    tag = "Recipes",
    responses((status = 200, description = "Ways to start a recipe", body = [CreationOption]))
)]
pub async fn creation_options() -> HttpResponse {
    HttpResponse::Ok().json(json!({
        "success": true,
        "options": recipe_service::creation_options(),
    }))
}

#[utoipa::path(
    get,
    path = "/api/v1/recipes/tags",
    tag = "Recipes",
    params(TagQuery),
    responses((status = 200, description = "Matching tag options", body = [TagOption]))
)]
pub async fn tag_options(state: web::Data<AppState>, query: web::Query<TagQuery>) -> HttpResponse {
    let selected: Vec<String> = query
        .selected
        .as_deref()
        .unwrap_or_default()
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect();

    let options = recipe_service::tag_options(&state, query.q.as_deref().unwrap_or_default(), &selected);
    HttpResponse::Ok().json(json!({ "success": true, "tags": options }))
}

fn creator_record(claims: &Claims) -> String {
    format!("users/{}/recipes", claims.sub)
}

fn imported(recipe: Recipe) -> Mutated {
    Mutated::created(
        Notification::success("Recipe imported", &format!("\"{}\" has been imported.", recipe.title)),
        json!({ "recipe": recipe }),
    )
}

#[utoipa::path(
    post,
    path = "/api/v1/recipes",
    tag = "Recipes",
    request_body = CreateRecipeRequest,
    responses(
        (status = 201, description = "Recipe created", body = Recipe),
        (status = 400, description = "Missing title")
    ),
    security(("bearer_auth" = []))
)]
pub async fn create_recipe(
    state: web::Data<AppState>,
    req: HttpRequest,
    claims: web::ReqData<Claims>,
    request: web::Json<CreateRecipeRequest>,
) -> HttpResponse {
    log::info!("📝 POST /recipes - user: {}", claims.sub);

    let op = async {
        recipe_service::create_manual(&state, &claims.sub, &request)
            .await
            .map(|recipe| {
                Mutated::created(
                    Notification::success("Recipe created", &format!("\"{}\" has been saved.", recipe.title)),
                    json!({ "recipe": recipe }),
                )
            })
    };
    mutation::run(&state, &req, &creator_record(&claims), "create recipe", op).await
}

#[utoipa::path(
    post,
    path = "/api/v1/recipes/import/url",
    tag = "Recipes",
    request_body = ImportUrlRequest,
    responses(
        (status = 201, description = "Recipe scraped and saved", body = Recipe),
        (status = 400, description = "Invalid URL or no recipe on the page"),
        (status = 502, description = "Page could not be fetched")
    ),
    security(("bearer_auth" = []))
)]
pub async fn import_from_url(
    state: web::Data<AppState>,
    req: HttpRequest,
    claims: web::ReqData<Claims>,
    request: web::Json<ImportUrlRequest>,
) -> HttpResponse {
    log::info!("🌐 POST /recipes/import/url - url: {}", request.url);

    let op = async {
        recipe_service::import_from_url(&state, &claims.sub, &request.url)
            .await
            .map(imported)
    };
    mutation::run(&state, &req, &creator_record(&claims), "import recipe", op).await
}

#[utoipa::path(
    post,
    path = "/api/v1/recipes/import",
    tag = "Recipes",
    request_body = ImportRecipeRequest,
    responses(
        (status = 201, description = "Recipe saved", body = Recipe),
        (status = 400, description = "Missing title")
    ),
    security(("bearer_auth" = []))
)]
pub async fn import_partial(
    state: web::Data<AppState>,
    req: HttpRequest,
    claims: web::ReqData<Claims>,
    request: web::Json<ImportRecipeRequest>,
) -> HttpResponse {
    let op = async {
        recipe_service::import_partial(&state, &claims.sub, &request)
            .await
            .map(imported)
    };
    mutation::run(&state, &req, &creator_record(&claims), "import recipe", op).await
}

#[utoipa::path(
    post,
    path = "/api/v1/recipes/invites/accept",
    tag = "Recipes",
    request_body = AcceptInviteRequest,
    responses(
        (status = 200, description = "Invitation accepted", body = Recipe),
        (status = 403, description = "Invitation belongs to another email")
    ),
    security(("bearer_auth" = []))
)]
pub async fn accept_invite(
    state: web::Data<AppState>,
    req: HttpRequest,
    claims: web::ReqData<Claims>,
    request: web::Json<AcceptInviteRequest>,
) -> HttpResponse {
    let invite = match recipe_service::open_invite(&state, &claims, &request.token) {
        Ok(invite) => invite,
        Err(e) => {
            log::warn!("❌ Invitation rejected for {}: {}", claims.email, e);
            return mutation::failure(&e, "accept invitation");
        }
    };
    log::info!("🤝 POST /recipes/invites/accept - recipe: {}", invite.sub);

    let op = async {
        recipe_service::accept_invite(&state, &invite)
            .await
            .map(|recipe| {
                Mutated::ok(
                    Notification::success(
                        "Invitation accepted",
                        &format!("You now have access to \"{}\".", recipe.title),
                    ),
                    json!({ "recipe": recipe }),
                )
            })
    };
    mutation::run(&state, &req, &format!("recipes/{}", invite.sub), "accept invitation", op).await
}
