use crate::database::DocumentStore;
use crate::services::role_service;

/// Stores the built-in role set for `tenant` unless one already exists.
pub async fn seed_default_roles(store: &dyn DocumentStore, tenant: &str) {
    match role_service::ensure_defaults(store, tenant).await {
        Ok(true) => log::info!("🛡️  Roles: seeded defaults for tenant {}", tenant),
        Ok(false) => log::info!("🛡️  Roles: tenant {} already configured, skipping seed", tenant),
        Err(e) => log::error!("   ❌ Failed to seed default roles for {}: {}", tenant, e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::MemoryStore;

    #[tokio::test]
    async fn test_seed_keeps_existing_roles() {
        let store = MemoryStore::new();
        role_service::add_role(&store, "t1", "editor").await.unwrap();

        seed_default_roles(&store, "t1").await;
        let stored = store.role_settings("t1").await.unwrap().unwrap();
        assert!(stored.contains("editor"));
    }
}
