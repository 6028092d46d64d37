use std::sync::Arc;

use crate::config::AppConfig;
use crate::database::DocumentStore;
use crate::services::auth_service::RevokedTokens;
use crate::services::mail_service::Mailer;
use crate::utils::{MutationGuard, ViewStates};

/// Shared state handed to every handler through `web::Data`
pub struct AppState {
    pub config: AppConfig,
    pub store: Arc<dyn DocumentStore>,
    pub mailer: Arc<dyn Mailer>,
    pub mutations: MutationGuard,
    pub views: ViewStates,
    pub revoked: RevokedTokens,
}

impl AppState {
    pub fn new(config: AppConfig, store: Arc<dyn DocumentStore>, mailer: Arc<dyn Mailer>) -> Self {
        let mutations = MutationGuard::new(config.idempotency_ttl);
        AppState {
            config,
            store,
            mailer,
            mutations,
            views: ViewStates::new(),
            revoked: RevokedTokens::new(),
        }
    }
}
