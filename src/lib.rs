pub mod auth;
pub mod config;
pub mod db;
pub mod errors;
pub mod handlers;
pub mod jobs;
pub mod models;
pub mod services;
pub mod state;
