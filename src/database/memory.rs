use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::RwLock;

use super::store::DocumentStore;
use crate::models::{Recipe, RecipeInvite, RecipePatch, RoleSettings, User, UserPatch};
use crate::utils::error::AppError;
use crate::utils::query::in_prefix_range;

/// In-process document store used by tests and `STORE_BACKEND=memory`
#[derive(Default)]
pub struct MemoryStore {
    users: RwLock<HashMap<String, User>>,
    recipes: RwLock<HashMap<String, Recipe>>,
    settings: RwLock<HashMap<String, RoleSettings>>,
    fail_writes: AtomicBool,
    fail_reads: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every subsequent write fail, to exercise error paths
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::Relaxed);
    }

    /// Makes every subsequent read fail
    pub fn set_fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::Relaxed);
    }

    fn check_readable(&self) -> Result<(), AppError> {
        if self.fail_reads.load(Ordering::Relaxed) {
            return Err(AppError::StoreRead("memory store is unavailable".to_string()));
        }
        Ok(())
    }

    fn check_writable(&self) -> Result<(), AppError> {
        if self.fail_writes.load(Ordering::Relaxed) {
            return Err(AppError::StoreWrite("memory store is read-only".to_string()));
        }
        Ok(())
    }
}

fn sort_users(users: &mut [User]) {
    users.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));
}

fn sort_recipes(recipes: &mut [Recipe]) {
    recipes.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));
}

#[async_trait]
impl DocumentStore for MemoryStore {
    fn backend_tag(&self) -> &'static str {
        "memory"
    }

    async fn ping(&self) -> Result<(), AppError> {
        Ok(())
    }

    async fn list_users(&self, email_prefix: Option<&str>) -> Result<Vec<User>, AppError> {
        self.check_readable()?;
        let users = self.users.read().await;
        let mut out: Vec<User> = users
            .values()
            .filter(|u| email_prefix.map_or(true, |p| in_prefix_range(&u.email, p)))
            .cloned()
            .collect();
        sort_users(&mut out);
        Ok(out)
    }

    async fn find_user(&self, id: &str) -> Result<Option<User>, AppError> {
        self.check_readable()?;
        Ok(self.users.read().await.get(id).cloned())
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, AppError> {
        self.check_readable()?;
        Ok(self
            .users
            .read()
            .await
            .values()
            .find(|u| u.email == email)
            .cloned())
    }

    async fn insert_user(&self, user: &User) -> Result<(), AppError> {
        self.check_writable()?;
        let mut users = self.users.write().await;
        if users.contains_key(&user.id) || users.values().any(|u| u.email == user.email) {
            return Err(AppError::StoreWrite(format!("duplicate user {}", user.email)));
        }
        users.insert(user.id.clone(), user.clone());
        Ok(())
    }

    async fn update_user(&self, id: &str, patch: &UserPatch) -> Result<bool, AppError> {
        self.check_writable()?;
        match self.users.write().await.get_mut(id) {
            Some(user) => {
                patch.apply(user);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn reassign_role(&self, from: &str, to: &str) -> Result<u64, AppError> {
        self.check_writable()?;
        let mut moved = 0;
        for user in self.users.write().await.values_mut() {
            if user.role == from {
                user.role = to.to_string();
                moved += 1;
            }
        }
        Ok(moved)
    }

    async fn delete_user(&self, id: &str) -> Result<bool, AppError> {
        self.check_writable()?;
        Ok(self.users.write().await.remove(id).is_some())
    }

    async fn list_recipes(&self) -> Result<Vec<Recipe>, AppError> {
        self.check_readable()?;
        let mut out: Vec<Recipe> = self.recipes.read().await.values().cloned().collect();
        sort_recipes(&mut out);
        Ok(out)
    }

    async fn recipes_by_creators(&self, creator_ids: &[String]) -> Result<Vec<Recipe>, AppError> {
        self.check_readable()?;
        let mut out: Vec<Recipe> = self
            .recipes
            .read()
            .await
            .values()
            .filter(|r| creator_ids.contains(&r.creator_id))
            .cloned()
            .collect();
        sort_recipes(&mut out);
        Ok(out)
    }

    async fn find_recipe(&self, id: &str) -> Result<Option<Recipe>, AppError> {
        self.check_readable()?;
        Ok(self.recipes.read().await.get(id).cloned())
    }

    async fn insert_recipe(&self, recipe: &Recipe) -> Result<(), AppError> {
        self.check_writable()?;
        self.recipes
            .write()
            .await
            .insert(recipe.id.clone(), recipe.clone());
        Ok(())
    }

    async fn update_recipe(&self, id: &str, patch: &RecipePatch, updated_at: i64) -> Result<bool, AppError> {
        self.check_writable()?;
        match self.recipes.write().await.get_mut(id) {
            Some(recipe) => {
                patch.apply(recipe);
                recipe.updated_at = updated_at;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn replace_recipe_invites(&self, id: &str, invites: &[RecipeInvite]) -> Result<bool, AppError> {
        self.check_writable()?;
        match self.recipes.write().await.get_mut(id) {
            Some(recipe) => {
                recipe.invites = invites.to_vec();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn delete_recipe(&self, id: &str) -> Result<bool, AppError> {
        self.check_writable()?;
        Ok(self.recipes.write().await.remove(id).is_some())
    }

    async fn role_settings(&self, tenant: &str) -> Result<Option<RoleSettings>, AppError> {
        self.check_readable()?;
        Ok(self.settings.read().await.get(tenant).cloned())
    }

    async fn save_role_settings(&self, settings: &RoleSettings) -> Result<(), AppError> {
        self.check_writable()?;
        self.settings
            .write()
            .await
            .insert(settings.tenant.clone(), settings.clone());
        Ok(())
    }

    async fn configured_tenants(&self) -> Result<Vec<String>, AppError> {
        self.check_readable()?;
        Ok(self.settings.read().await.keys().cloned().collect())
    }
}
