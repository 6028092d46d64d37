use chrono::Utc;
use mongodb::bson::oid::ObjectId;
use serde::{Deserialize, Serialize};

use crate::models::{
    CreateRecipeRequest, InviteStatus, Recipe, RecipeInvite, RecipePatch, RecipeRow, RecipeSource,
    RecipeStats,
};
use crate::services::auth_service::{self, Claims, TokenKind};
use crate::services::{import_service, mail_service::OutgoingMail};
use crate::state::AppState;
use crate::utils::error::AppError;
use crate::utils::{BackofficeTable, MultiSelect};

#[derive(Debug, Deserialize, utoipa::ToSchema)]
pub struct ImportUrlRequest {
    pub url: String,
}

/// Partial recipe coming from an external import
#[derive(Debug, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ImportRecipeRequest {
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub ingredients: Option<Vec<String>>,
    #[serde(default)]
    pub instructions: Option<Vec<String>>,
    #[serde(default)]
    pub tags: Option<Vec<String>>,
    #[serde(default)]
    pub source_url: Option<String>,
}

#[derive(Debug, Deserialize, utoipa::ToSchema)]
pub struct RecipeInviteRequest {
    pub emails: Vec<String>,
}

#[derive(Debug, Deserialize, utoipa::ToSchema)]
pub struct AcceptInviteRequest {
    pub token: String,
}

#[derive(Debug, Clone, Serialize, utoipa::ToSchema)]
pub struct CreationOption {
    pub id: String,
    pub label: String,
    pub available: bool,
}

#[derive(Debug, Clone, Serialize, utoipa::ToSchema)]
pub struct TagOption {
    pub tag: String,
    pub selected: bool,
}

/// Ways a recipe can be started. Only manual entry and page import are wired up.
pub fn creation_options() -> Vec<CreationOption> {
    [
        ("manual", "Create manually", true),
        ("url", "Import from website", true),
        ("ai", "Create with AI assistant", false),
        ("instagram", "Import from Instagram", false),
        ("youtube", "Import from YouTube", false),
    ]
    .iter()
    .map(|(id, label, available)| CreationOption {
        id: id.to_string(),
        label: label.to_string(),
        available: *available,
    })
    .collect()
}

/// Tag options matching `query`, flagged with the ones in `selected`
pub fn tag_options(state: &AppState, query: &str, selected: &[String]) -> Vec<TagOption> {
    let select = MultiSelect::with_selected(state.config.recipe_tags.clone(), selected.to_vec());
    select
        .filter(query)
        .into_iter()
        .map(|tag| TagOption {
            tag: tag.to_string(),
            selected: select.is_selected(tag),
        })
        .collect()
}

/// Keeps only tags from the closed option list, in request order, without repeats
pub fn normalise_tags(state: &AppState, tags: &[String]) -> Vec<String> {
    let mut select = MultiSelect::new(state.config.recipe_tags.clone());
    for tag in tags {
        let tag = tag.trim().to_lowercase();
        if !select.is_selected(&tag) {
            select.toggle(&tag);
        }
    }
    select.into_selected()
}

fn clean_lines(lines: &[String]) -> Vec<String> {
    lines
        .iter()
        .map(|l| l.trim())
        .filter(|l| !l.is_empty())
        .map(String::from)
        .collect()
}

fn new_recipe(creator_id: &str, title: &str, source: RecipeSource) -> Recipe {
    let now = Utc::now().timestamp();
    Recipe {
        id: ObjectId::new().to_hex(),
        title: title.trim().to_string(),
        creator_id: creator_id.to_string(),
        source,
        source_url: None,
        description: String::new(),
        ingredients: Vec::new(),
        instructions: Vec::new(),
        tags: Vec::new(),
        created_at: now,
        updated_at: now,
        stats: RecipeStats::default(),
        invites: Vec::new(),
    }
}

pub async fn list_recipes(state: &AppState) -> Result<Vec<Recipe>, AppError> {
    state.store.list_recipes().await
}

pub async fn get_recipe(state: &AppState, id: &str) -> Result<Recipe, AppError> {
    state
        .store
        .find_recipe(id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Recipe {}", id)))
}

pub async fn create_manual(state: &AppState, creator_id: &str, request: &CreateRecipeRequest) -> Result<Recipe, AppError> {
    if request.title.trim().is_empty() {
        return Err(AppError::InvalidRequest("Title is required".to_string()));
    }

    let mut recipe = new_recipe(creator_id, &request.title, RecipeSource::Manual);
    recipe.description = request.description.trim().to_string();
    recipe.ingredients = clean_lines(&request.ingredients);
    recipe.instructions = clean_lines(&request.instructions);
    recipe.tags = normalise_tags(state, &request.tags);

    state.store.insert_recipe(&recipe).await?;
    log::info!("✅ Recipe created: {} ({})", recipe.title, recipe.id);
    Ok(recipe)
}

pub async fn import_partial(state: &AppState, creator_id: &str, request: &ImportRecipeRequest) -> Result<Recipe, AppError> {
    if request.title.trim().is_empty() {
        return Err(AppError::InvalidRequest("Title is required".to_string()));
    }

    let mut recipe = new_recipe(creator_id, &request.title, RecipeSource::Imported);
    recipe.source_url = request.source_url.clone();
    recipe.description = request.description.clone().unwrap_or_default();
    recipe.ingredients = clean_lines(request.ingredients.as_deref().unwrap_or_default());
    recipe.instructions = clean_lines(request.instructions.as_deref().unwrap_or_default());
    recipe.tags = normalise_tags(state, request.tags.as_deref().unwrap_or_default());

    state.store.insert_recipe(&recipe).await?;
    log::info!("📥 Recipe imported: {} ({})", recipe.title, recipe.id);
    Ok(recipe)
}

pub async fn import_from_url(state: &AppState, creator_id: &str, url: &str) -> Result<Recipe, AppError> {
    let extracted = import_service::scrape_url(url).await?;
    if extracted.title.is_empty() {
        return Err(AppError::InvalidRequest("No recipe found on that page".to_string()));
    }

    let mut recipe = new_recipe(creator_id, &extracted.title, RecipeSource::Scraped);
    recipe.source_url = Some(url.to_string());
    recipe.description = extracted.description;
    recipe.ingredients = extracted.ingredients;
    recipe.instructions = extracted.instructions;
    recipe.tags = normalise_tags(state, &extracted.keywords);

    state.store.insert_recipe(&recipe).await?;
    log::info!("🌐 Recipe scraped: {} from {}", recipe.title, url);
    Ok(recipe)
}

/// Backoffice listing with detail attached to the rows `viewer` expanded
pub async fn list_recipe_rows(state: &AppState, viewer: &str) -> Result<Vec<RecipeRow>, AppError> {
    let recipes = state.store.list_recipes().await?;
    let expansion = state.views.snapshot(viewer, BackofficeTable::Recipes).await;

    Ok(recipes
        .into_iter()
        .map(|recipe| {
            let expanded = expansion.is_expanded(&recipe.id);
            RecipeRow::new(recipe, expanded)
        })
        .collect())
}

/// Writes the patch as given and refreshes `updatedAt`
pub async fn update_recipe(state: &AppState, id: &str, patch: &RecipePatch) -> Result<(), AppError> {
    let now = Utc::now().timestamp();
    if !state.store.update_recipe(id, patch, now).await? {
        return Err(AppError::NotFound(format!("Recipe {}", id)));
    }
    log::info!("✅ Recipe {} updated", id);
    Ok(())
}

pub async fn delete_recipe(state: &AppState, id: &str) -> Result<(), AppError> {
    if !state.store.delete_recipe(id).await? {
        return Err(AppError::NotFound(format!("Recipe {}", id)));
    }
    state.views.forget(BackofficeTable::Recipes, id).await;
    log::info!("🗑️  Recipe {} deleted", id);
    Ok(())
}

/// Adds pending invites for new addresses and mails each of them.
/// Returns the addresses that were newly invited.
pub async fn invite_to_recipe(state: &AppState, id: &str, emails: &[String]) -> Result<Vec<String>, AppError> {
    let recipe = get_recipe(state, id).await?;
    let now = Utc::now().timestamp();

    let mut invites = recipe.invites.clone();
    let mut added = Vec::new();
    for raw in emails {
        let email = raw.trim().to_lowercase();
        if !email.contains('@') || invites.iter().any(|i| i.email == email) {
            continue;
        }
        invites.push(RecipeInvite {
            email: email.clone(),
            status: InviteStatus::Pending,
            invited_at: now,
        });
        added.push(email);
    }

    if added.is_empty() {
        return Ok(added);
    }

    if !state.store.replace_recipe_invites(id, &invites).await? {
        return Err(AppError::NotFound(format!("Recipe {}", id)));
    }

    let base = state.config.public_url.trim_end_matches('/');
    for email in &added {
        let token = auth_service::generate_recipe_invite_token(&state.config.auth, id, email, &state.config.tenant)?;
        let link = format!("{}/recipe/{}?invite={}", base, id, urlencoding::encode(&token));
        state
            .mailer
            .send(&OutgoingMail::recipe_invitation(email, &recipe.title, &link))
            .await?;
    }

    log::info!("📨 {} invites added to recipe {}", added.len(), id);
    Ok(added)
}

/// Checks a recipe invitation token belongs to the signed-in user.
/// The returned claims carry the recipe id in `sub`.
pub fn open_invite(state: &AppState, claims: &Claims, token: &str) -> Result<Claims, AppError> {
    let invite = auth_service::verify_token_kind(&state.config.auth, token, TokenKind::RecipeInvite)?;
    if invite.email != claims.email {
        return Err(AppError::Forbidden("Invitation was issued for a different email".to_string()));
    }
    Ok(invite)
}

/// Marks the invitee's pending invite on the recipe as accepted
pub async fn accept_invite(state: &AppState, invite: &Claims) -> Result<Recipe, AppError> {
    let mut recipe = get_recipe(state, &invite.sub).await?;
    let entry = recipe
        .invites
        .iter_mut()
        .find(|i| i.email == invite.email)
        .ok_or_else(|| AppError::NotFound("Invitation no longer exists".to_string()))?;

    if entry.status == InviteStatus::Accepted {
        return Ok(recipe);
    }
    entry.status = InviteStatus::Accepted;

    if !state.store.replace_recipe_invites(&recipe.id, &recipe.invites).await? {
        return Err(AppError::NotFound(format!("Recipe {}", recipe.id)));
    }
    log::info!("🤝 {} accepted invite to recipe {}", invite.email, recipe.id);
    Ok(recipe)
}

pub async fn toggle_expand(state: &AppState, viewer: &str, id: &str) -> Result<bool, AppError> {
    get_recipe(state, id).await?;
    Ok(state.views.toggle(viewer, BackofficeTable::Recipes, id).await)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AppConfig;
    use crate::database::{DocumentStore, MemoryStore};
    use crate::services::mail_service::{MailKind, OutboxMailer};
    use std::sync::Arc;

    fn fixture() -> (AppState, Arc<MemoryStore>, Arc<OutboxMailer>) {
        let store = Arc::new(MemoryStore::new());
        let outbox = Arc::new(OutboxMailer::new());
        let state = AppState::new(AppConfig::for_tests(), store.clone(), outbox.clone());
        (state, store, outbox)
    }

    fn request(title: &str, tags: &[&str]) -> CreateRecipeRequest {
        CreateRecipeRequest {
            title: title.into(),
            description: String::new(),
            ingredients: vec!["  flour ".into(), "".into()],
            instructions: vec![],
            tags: tags.iter().map(|t| t.to_string()).collect(),
        }
    }

    #[tokio::test]
    async fn test_create_manual_normalises_tags_and_lines() {
        let (state, _, _) = fixture();
        let recipe = create_manual(&state, "u1", &request("Bread", &["Baking", "made-up", "baking", "quick"]))
            .await
            .unwrap();

        assert_eq!(recipe.source, RecipeSource::Manual);
        assert_eq!(recipe.tags, vec!["baking", "quick"]);
        assert_eq!(recipe.ingredients, vec!["flour"]);
    }

    #[tokio::test]
    async fn test_create_requires_title() {
        let (state, _, _) = fixture();
        assert!(create_manual(&state, "u1", &request("  ", &[])).await.is_err());
    }

    #[tokio::test]
    async fn test_update_refreshes_updated_at_without_validation() {
        let (state, store, _) = fixture();
        let mut recipe = new_recipe("u1", "Soup", RecipeSource::Manual);
        recipe.updated_at = 0;
        store.insert_recipe(&recipe).await.unwrap();

        let patch = RecipePatch {
            title: Some(String::new()),
            ..RecipePatch::default()
        };
        update_recipe(&state, &recipe.id, &patch).await.unwrap();

        let stored = store.find_recipe(&recipe.id).await.unwrap().unwrap();
        assert_eq!(stored.title, "");
        assert!(stored.updated_at > 0);
    }

    #[tokio::test]
    async fn test_invites_are_deduplicated_and_mailed() {
        let (state, store, outbox) = fixture();
        let recipe = new_recipe("u1", "Soup", RecipeSource::Manual);
        store.insert_recipe(&recipe).await.unwrap();

        let emails = vec!["a@x.io".to_string(), "A@x.io".to_string()];
        assert_eq!(invite_to_recipe(&state, &recipe.id, &emails).await.unwrap(), vec!["a@x.io"]);
        assert!(invite_to_recipe(&state, &recipe.id, &emails).await.unwrap().is_empty());

        let stored = store.find_recipe(&recipe.id).await.unwrap().unwrap();
        assert_eq!(stored.invites.len(), 1);
        assert_eq!(outbox.count(MailKind::RecipeInvitation), 1);
    }

    #[test]
    fn test_only_manual_and_url_creation_are_available() {
        let available: Vec<String> = creation_options()
            .into_iter()
            .filter(|o| o.available)
            .map(|o| o.id)
            .collect();
        assert_eq!(available, vec!["manual", "url"]);
    }

    #[test]
    fn test_tag_options_filter_and_flag_selection() {
        let (state, _, _) = fixture();
        let options = tag_options(&state, "VEG", &["vegan".to_string()]);
        let tags: Vec<(&str, bool)> = options.iter().map(|o| (o.tag.as_str(), o.selected)).collect();
        assert_eq!(tags, vec![("vegan", true), ("vegetarian", false)]);
    }
}
