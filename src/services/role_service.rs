// ==================== ROLE SETTINGS ====================
// The role set is a per-tenant document in `settings`, seeded with the
// built-in roles and extended by admins.

use crate::database::DocumentStore;
use crate::models::{RoleSettings, DEFAULT_ROLES};
use crate::utils::error::AppError;

/// Stored role set for `tenant`, or the built-in defaults when none is stored yet
pub async fn load_roles(store: &dyn DocumentStore, tenant: &str) -> Result<RoleSettings, AppError> {
    let now = chrono::Utc::now().timestamp();
    Ok(store
        .role_settings(tenant)
        .await?
        .unwrap_or_else(|| RoleSettings::defaults(tenant, now)))
}

/// Persists the default role set if the tenant has none. Returns `true` if it wrote.
pub async fn ensure_defaults(store: &dyn DocumentStore, tenant: &str) -> Result<bool, AppError> {
    if store.role_settings(tenant).await?.is_some() {
        return Ok(false);
    }
    let now = chrono::Utc::now().timestamp();
    store.save_role_settings(&RoleSettings::defaults(tenant, now)).await?;
    Ok(true)
}

/// Fails when the store already holds another tenant's role set.
/// Role renames move users store-wide, so a store must not be shared.
pub async fn claim_store(store: &dyn DocumentStore, tenant: &str) -> Result<(), AppError> {
    let others: Vec<String> = store
        .configured_tenants()
        .await?
        .into_iter()
        .filter(|t| t != tenant)
        .collect();

    if !others.is_empty() {
        return Err(AppError::Forbidden(format!(
            "Store already belongs to tenant(s) {}; use a separate database per tenant",
            others.join(", ")
        )));
    }
    Ok(())
}

pub async fn ensure_role_exists(store: &dyn DocumentStore, tenant: &str, role: &str) -> Result<(), AppError> {
    let settings = load_roles(store, tenant).await?;
    if !settings.contains(role) {
        return Err(AppError::InvalidRequest(format!("Unknown role '{}'", role)));
    }
    Ok(())
}

/// Adds a custom role. Adding an existing role is a no-op (`added == false`).
pub async fn add_role(
    store: &dyn DocumentStore,
    tenant: &str,
    role: &str,
) -> Result<(RoleSettings, bool), AppError> {
    let role = role.trim();
    if role.is_empty() {
        return Err(AppError::InvalidRequest("Role name is required".to_string()));
    }

    let mut settings = load_roles(store, tenant).await?;
    if settings.contains(role) {
        return Ok((settings, false));
    }

    settings.roles.push(role.to_string());
    settings.updated_at = chrono::Utc::now().timestamp();
    store.save_role_settings(&settings).await?;

    log::info!("✅ Role '{}' added for tenant {}", role, tenant);
    Ok((settings, true))
}

/// Renames a custom role and moves every user holding it. Built-in roles are fixed.
pub async fn rename_role(
    store: &dyn DocumentStore,
    tenant: &str,
    old_role: &str,
    new_role: &str,
) -> Result<(RoleSettings, u64), AppError> {
    let new_role = new_role.trim();
    if new_role.is_empty() {
        return Err(AppError::InvalidRequest("Role name is required".to_string()));
    }
    if DEFAULT_ROLES.contains(&old_role) {
        return Err(AppError::Forbidden(format!("Built-in role '{}' cannot be renamed", old_role)));
    }

    let mut settings = load_roles(store, tenant).await?;
    if !settings.contains(old_role) {
        return Err(AppError::NotFound(format!("Role '{}'", old_role)));
    }
    if old_role == new_role {
        return Ok((settings, 0));
    }

    let already_present = settings.contains(new_role);
    settings.roles = settings
        .roles
        .into_iter()
        .filter_map(|r| match r == old_role {
            true if already_present => None,
            true => Some(new_role.to_string()),
            false => Some(r),
        })
        .collect();
    settings.updated_at = chrono::Utc::now().timestamp();
    store.save_role_settings(&settings).await?;

    let moved = store.reassign_role(old_role, new_role).await?;
    log::info!(
        "✅ Role '{}' renamed to '{}' for tenant {} ({} users moved)",
        old_role, new_role, tenant, moved
    );

    Ok((settings, moved))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::MemoryStore;

    #[tokio::test]
    async fn test_defaults_until_persisted() {
        let store = MemoryStore::new();
        let roles = load_roles(&store, "t1").await.unwrap();
        assert_eq!(roles.roles, vec!["user", "admin", "superadmin"]);
        assert!(store.role_settings("t1").await.unwrap().is_none());

        assert!(ensure_defaults(&store, "t1").await.unwrap());
        assert!(!ensure_defaults(&store, "t1").await.unwrap());
    }

    #[tokio::test]
    async fn test_add_role_is_persisted_per_tenant() {
        let store = MemoryStore::new();
        let (settings, added) = add_role(&store, "t1", " editor ").await.unwrap();
        assert!(added);
        assert!(settings.contains("editor"));

        let (_, added_again) = add_role(&store, "t1", "editor").await.unwrap();
        assert!(!added_again);

        assert!(load_roles(&store, "t1").await.unwrap().contains("editor"));
        assert!(!load_roles(&store, "t2").await.unwrap().contains("editor"));
    }

    #[tokio::test]
    async fn test_rename_builtin_role_is_forbidden() {
        let store = MemoryStore::new();
        let err = rename_role(&store, "t1", "admin", "owner").await.unwrap_err();
        assert!(matches!(err, AppError::Forbidden(_)));
    }

    #[tokio::test]
    async fn test_rename_into_existing_role_merges() {
        let store = MemoryStore::new();
        add_role(&store, "t1", "editor").await.unwrap();
        add_role(&store, "t1", "writer").await.unwrap();

        let (settings, _) = rename_role(&store, "t1", "editor", "writer").await.unwrap();
        assert_eq!(settings.roles, vec!["user", "admin", "superadmin", "writer"]);
    }

    #[tokio::test]
    async fn test_store_claimed_by_another_tenant_is_refused() {
        let store = MemoryStore::new();
        ensure_defaults(&store, "t1").await.unwrap();

        assert!(claim_store(&store, "t1").await.is_ok());
        let err = claim_store(&store, "t2").await.unwrap_err();
        assert!(matches!(err, AppError::Forbidden(_)));
    }
}
