pub mod notification;
pub mod recipe;
pub mod role_settings;
pub mod user;

pub use notification::*;
pub use recipe::*;
pub use role_settings::*;
pub use user::*;
