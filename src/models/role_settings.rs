use serde::{Deserialize, Serialize};

pub const DEFAULT_ROLES: [&str; 3] = ["user", "admin", "superadmin"];

/// Roles allowed into the backoffice
pub const ADMIN_ROLES: [&str; 2] = ["admin", "superadmin"];

/// Per-tenant role set (stored in the `settings` collection, keyed by tenant)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RoleSettings {
    #[serde(rename = "_id")]
    pub tenant: String,
    pub roles: Vec<String>,
    pub updated_at: i64,
}

impl RoleSettings {
    pub fn defaults(tenant: &str, now: i64) -> Self {
        RoleSettings {
            tenant: tenant.to_string(),
            roles: DEFAULT_ROLES.iter().map(|r| r.to_string()).collect(),
            updated_at: now,
        }
    }

    pub fn contains(&self, role: &str) -> bool {
        self.roles.iter().any(|r| r == role)
    }
}

pub fn is_admin_role(role: &str) -> bool {
    ADMIN_ROLES.contains(&role)
}
