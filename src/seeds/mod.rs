pub mod role_settings_seed;
