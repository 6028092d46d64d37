pub mod auth_service;
pub mod import_service;
pub mod mail_service;
pub mod recipe_service;
pub mod role_service;
pub mod user_service;

pub use mail_service::{Mailer, OutboxMailer, WebhookMailer};
