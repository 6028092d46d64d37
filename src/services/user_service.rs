use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::models::{RecipeSummary, User, UserPatch, UserProfile, UserRow};
use crate::services::{auth_service, mail_service::OutgoingMail, role_service};
use crate::state::AppState;
use crate::utils::error::AppError;
use crate::utils::BackofficeTable;

#[derive(Debug, Deserialize, utoipa::ToSchema)]
pub struct RenameUserRequest {
    pub name: String,
}

#[derive(Debug, Deserialize, utoipa::ToSchema)]
pub struct ChangeRoleRequest {
    pub role: String,
}

#[derive(Debug, Deserialize, utoipa::ToSchema)]
pub struct MessageUserRequest {
    pub subject: String,
    pub body: String,
}

#[derive(Debug, Deserialize, utoipa::ToSchema)]
pub struct InviteUsersRequest {
    pub emails: Vec<String>,
    /// Role granted on sign-up; defaults to `user`
    pub role: Option<String>,
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct InviteOutcome {
    pub invited: Vec<String>,
    pub skipped: Vec<String>,
}

/// Lists users (optionally by email prefix) with the recipes each authored.
///
/// Two reads: the users, then every recipe whose creator is among them.
/// Either both succeed or the listing fails.
pub async fn list_users_with_recipes(
    state: &AppState,
    viewer: &str,
    search: Option<&str>,
) -> Result<Vec<UserRow>, AppError> {
    let search = search.map(str::trim).filter(|s| !s.is_empty());
    let users = state.store.list_users(search).await?;

    let ids: Vec<String> = users.iter().map(|u| u.id.clone()).collect();
    let recipes = if ids.is_empty() {
        Vec::new()
    } else {
        state.store.recipes_by_creators(&ids).await?
    };

    let mut by_creator: HashMap<&str, Vec<RecipeSummary>> = HashMap::new();
    for recipe in &recipes {
        by_creator
            .entry(recipe.creator_id.as_str())
            .or_default()
            .push(RecipeSummary::from(recipe));
    }

    let expansion = state.views.snapshot(viewer, BackofficeTable::Users).await;

    Ok(users
        .iter()
        .map(|user| {
            let authored = by_creator.remove(user.id.as_str()).unwrap_or_default();
            let expanded = expansion.is_expanded(&user.id);
            UserRow {
                profile: UserProfile::from(user),
                recipe_count: authored.len(),
                expanded,
                recipes: if expanded { Some(authored) } else { None },
            }
        })
        .collect())
}

async fn require_user(state: &AppState, id: &str) -> Result<User, AppError> {
    state
        .store
        .find_user(id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("User {}", id)))
}

/// Returns `false` without writing when the name is blank
pub async fn rename_user(state: &AppState, id: &str, name: &str) -> Result<bool, AppError> {
    let name = name.trim();
    if name.is_empty() {
        return Ok(false);
    }

    let patch = UserPatch {
        name: Some(name.to_string()),
        ..UserPatch::default()
    };
    if !state.store.update_user(id, &patch).await? {
        return Err(AppError::NotFound(format!("User {}", id)));
    }

    log::info!("✅ User {} renamed", id);
    Ok(true)
}

pub async fn change_role(state: &AppState, id: &str, role: &str) -> Result<(), AppError> {
    let role = role.trim();
    role_service::ensure_role_exists(state.store.as_ref(), &state.config.tenant, role).await?;

    let patch = UserPatch {
        role: Some(role.to_string()),
        ..UserPatch::default()
    };
    if !state.store.update_user(id, &patch).await? {
        return Err(AppError::NotFound(format!("User {}", id)));
    }

    log::info!("✅ User {} role changed to {}", id, role);
    Ok(())
}

/// Hard delete. The user's recipes are left in place.
pub async fn delete_user(state: &AppState, id: &str) -> Result<(), AppError> {
    if !state.store.delete_user(id).await? {
        return Err(AppError::NotFound(format!("User {}", id)));
    }
    state.views.forget(BackofficeTable::Users, id).await;
    log::info!("🗑️  User {} deleted", id);
    Ok(())
}

/// Acknowledges an undo request. Deletes are final, so nothing is restored.
pub fn undo_delete_user(id: &str) -> bool {
    log::warn!("↩️  Undo requested for deleted user {} (deletes are permanent)", id);
    false
}

pub async fn message_user(state: &AppState, id: &str, request: &MessageUserRequest) -> Result<(), AppError> {
    let subject = request.subject.trim();
    let body = request.body.trim();
    if subject.is_empty() || body.is_empty() {
        return Err(AppError::InvalidRequest("Subject and message are required".to_string()));
    }

    let user = require_user(state, id).await?;
    state
        .mailer
        .send(&OutgoingMail::direct_message(&user.email, subject, body))
        .await?;

    log::info!("✉️  Message sent to user {}", id);
    Ok(())
}

/// Sends one invitation per distinct, well-formed address
pub async fn invite_users(state: &AppState, request: &InviteUsersRequest) -> Result<InviteOutcome, AppError> {
    let role = request
        .role
        .as_deref()
        .map(str::trim)
        .filter(|r| !r.is_empty())
        .unwrap_or("user");
    role_service::ensure_role_exists(state.store.as_ref(), &state.config.tenant, role).await?;

    let mut outcome = InviteOutcome {
        invited: Vec::new(),
        skipped: Vec::new(),
    };

    for raw in &request.emails {
        let email = raw.trim().to_lowercase();
        if !email.contains('@') || outcome.invited.contains(&email) {
            outcome.skipped.push(raw.clone());
            continue;
        }

        let token = auth_service::generate_user_invite_token(
            &state.config.auth,
            &email,
            role,
            &state.config.tenant,
        )?;
        let link = format!(
            "{}/register?invite={}",
            state.config.public_url.trim_end_matches('/'),
            urlencoding::encode(&token)
        );

        state
            .mailer
            .send(&OutgoingMail::invitation(&email, role, &link))
            .await?;
        outcome.invited.push(email);
    }

    if outcome.invited.is_empty() {
        return Err(AppError::InvalidRequest("No valid email addresses to invite".to_string()));
    }

    log::info!("📨 Invited {} users as '{}'", outcome.invited.len(), role);
    Ok(outcome)
}

pub async fn toggle_expand(state: &AppState, viewer: &str, id: &str) -> Result<bool, AppError> {
    require_user(state, id).await?;
    Ok(state.views.toggle(viewer, BackofficeTable::Users, id).await)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AppConfig;
    use crate::database::{DocumentStore, MemoryStore};
    use crate::models::{Recipe, RecipeSource, RecipeStats};
    use crate::services::mail_service::{MailKind, OutboxMailer};
    use std::sync::Arc;

    fn user(id: &str, email: &str) -> User {
        User {
            id: id.into(),
            email: email.into(),
            name: id.to_uppercase(),
            role: "user".into(),
            created_at: 1,
            avatar_url: None,
            password_hash: None,
            email_verified: true,
        }
    }

    fn recipe(id: &str, creator: &str) -> Recipe {
        Recipe {
            id: id.into(),
            title: format!("Recipe {}", id),
            creator_id: creator.into(),
            source: RecipeSource::Manual,
            source_url: None,
            description: String::new(),
            ingredients: vec![],
            instructions: vec![],
            tags: vec![],
            created_at: 1,
            updated_at: 1,
            stats: RecipeStats::default(),
            invites: vec![],
        }
    }

    async fn fixture() -> (AppState, Arc<MemoryStore>, Arc<OutboxMailer>) {
        let store = Arc::new(MemoryStore::new());
        let outbox = Arc::new(OutboxMailer::new());
        store.insert_user(&user("u1", "ana@x.io")).await.unwrap();
        store.insert_user(&user("u2", "bob@x.io")).await.unwrap();
        store.insert_recipe(&recipe("r1", "u1")).await.unwrap();
        store.insert_recipe(&recipe("r2", "u1")).await.unwrap();
        let state = AppState::new(AppConfig::for_tests(), store.clone(), outbox.clone());
        (state, store, outbox)
    }

    #[tokio::test]
    async fn test_listing_groups_recipes_and_hides_collapsed_detail() {
        let (state, _, _) = fixture().await;
        toggle_expand(&state, "admin", "u1").await.unwrap();

        let rows = list_users_with_recipes(&state, "admin", None).await.unwrap();
        let ana = rows.iter().find(|r| r.profile.id == "u1").unwrap();
        let bob = rows.iter().find(|r| r.profile.id == "u2").unwrap();

        assert_eq!(ana.recipe_count, 2);
        assert_eq!(ana.recipes.as_ref().map(Vec::len), Some(2));
        assert_eq!(bob.recipe_count, 0);
        assert!(bob.recipes.is_none());
    }

    #[tokio::test]
    async fn test_listing_fails_whole_when_store_fails() {
        let (state, store, _) = fixture().await;
        store.set_fail_reads(true);
        assert!(list_users_with_recipes(&state, "admin", None).await.is_err());
    }

    #[tokio::test]
    async fn test_blank_rename_is_a_no_op() {
        let (state, store, _) = fixture().await;
        assert!(!rename_user(&state, "u1", "   ").await.unwrap());
        assert_eq!(store.find_user("u1").await.unwrap().unwrap().name, "U1");
    }

    #[tokio::test]
    async fn test_change_role_rejects_unknown_role() {
        let (state, _, _) = fixture().await;
        let err = change_role(&state, "u1", "pirate").await.unwrap_err();
        assert!(matches!(err, AppError::InvalidRequest(_)));
    }

    #[tokio::test]
    async fn test_delete_keeps_recipes() {
        let (state, store, _) = fixture().await;
        toggle_expand(&state, "admin", "u1").await.unwrap();
        delete_user(&state, "u1").await.unwrap();
        assert!(store.find_user("u1").await.unwrap().is_none());
        assert!(state.views.snapshot("admin", BackofficeTable::Users).await.is_empty());
        assert!(store.find_recipe("r1").await.unwrap().is_some());
        assert!(!undo_delete_user("u1"));
    }

    #[tokio::test]
    async fn test_invite_skips_duplicates_and_malformed() {
        let (state, _, outbox) = fixture().await;
        let request = InviteUsersRequest {
            emails: vec!["new@x.io".into(), "NEW@x.io".into(), "nope".into()],
            role: Some("admin".into()),
        };
        let outcome = invite_users(&state, &request).await.unwrap();

        assert_eq!(outcome.invited, vec!["new@x.io"]);
        assert_eq!(outcome.skipped.len(), 2);
        assert_eq!(outbox.count(MailKind::Invitation), 1);
    }
}
