pub mod api;
pub mod config;
pub mod database;
pub mod jobs;
pub mod middleware;
pub mod models;
pub mod seeds;
pub mod services;
pub mod state;
pub mod utils;
