use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Recipe Service API",
        version = "1.0.0",
        description = "Recipe sharing backend with an administrative backoffice.\n\n**Authentication:** write endpoints and the backoffice require a JWT Bearer token. Backoffice endpoints additionally require the `admin` or `superadmin` role.\n\n**Writes:** send an `Idempotency-Key` header to make a retried write replay its first outcome. Every write answers with a `notification` to show the user."
    ),
    paths(
        // Auth
        crate::api::auth::login,
        crate::api::auth::register,
        crate::api::auth::refresh_token,
        crate::api::auth::logout,
        crate::api::auth::session,
        crate::api::auth::resend_verification,
        crate::api::auth::confirm_verification,

        // Recipes
        crate::api::recipes::list_recipes,
        crate::api::recipes::get_recipe,
        crate::api::recipes::creation_options,
        crate::api::recipes::tag_options,
        crate::api::recipes::create_recipe,
        crate::api::recipes::import_from_url,
        crate::api::recipes::import_partial,
        crate::api::recipes::accept_invite,

        // Backoffice
        crate::api::backoffice_users::list_users,
        crate::api::backoffice_users::rename_user,
        crate::api::backoffice_users::change_role,
        crate::api::backoffice_users::delete_user,
        crate::api::backoffice_users::undo_delete_user,
        crate::api::backoffice_users::message_user,
        crate::api::backoffice_users::invite_users,
        crate::api::backoffice_users::toggle_expand,
        crate::api::backoffice_recipes::list_recipes,
        crate::api::backoffice_recipes::update_recipe,
        crate::api::backoffice_recipes::delete_recipe,
        crate::api::backoffice_recipes::invite_to_recipe,
        crate::api::backoffice_recipes::toggle_expand,
        crate::api::roles::list_roles,
        crate::api::roles::add_role,
        crate::api::roles::rename_role,

        // Health & Metrics
        crate::api::health::health_check,
        crate::api::metrics::get_metrics,
    ),
    components(
        schemas(
            crate::services::auth_service::LoginRequest,
            crate::services::auth_service::RegisterRequest,
            crate::services::auth_service::RefreshTokenRequest,
            crate::services::auth_service::AuthResponse,
            crate::services::auth_service::SessionResponse,
            crate::services::auth_service::SessionState,

            crate::models::UserProfile,
            crate::models::UserRow,
            crate::models::Recipe,
            crate::models::RecipeRow,
            crate::models::RecipeSummary,
            crate::models::RecipePatch,
            crate::models::CreateRecipeRequest,
            crate::models::RoleSettings,
            crate::models::Notification,
            crate::models::NotificationVariant,

            crate::services::recipe_service::ImportUrlRequest,
            crate::services::recipe_service::ImportRecipeRequest,
            crate::services::recipe_service::RecipeInviteRequest,
            crate::services::recipe_service::AcceptInviteRequest,
            crate::services::recipe_service::CreationOption,
            crate::services::recipe_service::TagOption,
            crate::services::user_service::RenameUserRequest,
            crate::services::user_service::ChangeRoleRequest,
            crate::services::user_service::MessageUserRequest,
            crate::services::user_service::InviteUsersRequest,
            crate::services::user_service::InviteOutcome,
            crate::api::roles::RoleRequest,

            crate::api::health::HealthResponse,
            crate::api::metrics::MetricsResponse,
        )
    ),
    tags(
        (name = "Auth", description = "Email/password sessions, email verification and token refresh."),
        (name = "Recipes", description = "Recipe feed, manual creation and imports."),
        (name = "Backoffice", description = "User, recipe and role administration. Admin roles only."),
        (name = "Health", description = "Health check and service counters."),
    ),
    modifiers(&SecurityAddon)
)]
pub struct ApiDoc;

struct SecurityAddon;

impl utoipa::Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .description(Some("Access token from /api/v1/auth/login"))
                        .build(),
                ),
            );
        }
    }
}
