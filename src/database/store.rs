use async_trait::async_trait;

use crate::models::{Recipe, RecipeInvite, RecipePatch, RoleSettings, User, UserPatch};
use crate::utils::error::AppError;

pub const USERS: &str = "users";
pub const RECIPES: &str = "recipes";
pub const SETTINGS: &str = "settings";

/// Document store holding the `users`, `recipes` and `settings` collections.
///
/// One store serves one tenant: users and recipes carry no tenant field, so
/// user-wide writes such as `reassign_role` touch the whole store.
/// `configured_tenants` lets startup refuse a store claimed by another tenant.
///
/// Updates are partial: only the fields present in a patch are written.
/// `update_*`/`delete_*` return `false` when no document matched.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    fn backend_tag(&self) -> &'static str;

    async fn ping(&self) -> Result<(), AppError>;

    // users
    async fn list_users(&self, email_prefix: Option<&str>) -> Result<Vec<User>, AppError>;
    async fn find_user(&self, id: &str) -> Result<Option<User>, AppError>;
    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, AppError>;
    async fn insert_user(&self, user: &User) -> Result<(), AppError>;
    async fn update_user(&self, id: &str, patch: &UserPatch) -> Result<bool, AppError>;
    /// Moves every user holding `from` onto `to`; returns the number moved
    async fn reassign_role(&self, from: &str, to: &str) -> Result<u64, AppError>;
    async fn delete_user(&self, id: &str) -> Result<bool, AppError>;

    // recipes
    async fn list_recipes(&self) -> Result<Vec<Recipe>, AppError>;
    async fn recipes_by_creators(&self, creator_ids: &[String]) -> Result<Vec<Recipe>, AppError>;
    async fn find_recipe(&self, id: &str) -> Result<Option<Recipe>, AppError>;
    async fn insert_recipe(&self, recipe: &Recipe) -> Result<(), AppError>;
    async fn update_recipe(&self, id: &str, patch: &RecipePatch, updated_at: i64) -> Result<bool, AppError>;
    async fn replace_recipe_invites(&self, id: &str, invites: &[RecipeInvite]) -> Result<bool, AppError>;
    async fn delete_recipe(&self, id: &str) -> Result<bool, AppError>;

    // settings
    async fn role_settings(&self, tenant: &str) -> Result<Option<RoleSettings>, AppError>;
    async fn save_role_settings(&self, settings: &RoleSettings) -> Result<(), AppError>;
    /// Tenants with a stored role set
    async fn configured_tenants(&self) -> Result<Vec<String>, AppError>;
}
